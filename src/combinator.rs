use std::rc::Rc;

use crate::selector::CombinatorKind;
use crate::style::ConditionId;
use crate::view::ViewConditionMatcher;

/// Effect of one traversal event on a tracker's condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shift {
    Activate,
    Deactivate,
    Idle,
}

/// Per-firing state for one combinator. Events carry the depth relative to
/// the anchor element: 0 for the anchor level, 1 for its children, -1 when
/// the anchor's parent is left.
pub(crate) struct Tracker {
    pub kind: CombinatorKind,
    pub condition: ConditionId,
    pub view: Option<Rc<dyn ViewConditionMatcher>>,
    fired: bool,
}

impl Tracker {
    pub fn new(
        kind: CombinatorKind,
        condition: ConditionId,
        view: Option<Rc<dyn ViewConditionMatcher>>,
    ) -> Tracker {
        Tracker {
            kind,
            condition,
            view,
            fired: false,
        }
    }

    /// Returns the condition change and whether the tracker wants further
    /// events.
    pub fn enter(&mut self, depth: i32) -> (Shift, bool) {
        match (self.kind, depth) {
            (CombinatorKind::Descendant, 0) | (CombinatorKind::Child, 0) => {
                (Shift::Activate, true)
            }
            (CombinatorKind::Child, 1) => (Shift::Deactivate, true),
            (CombinatorKind::Adjacent, 0) if self.fired => (Shift::Deactivate, false),
            (CombinatorKind::Following, 1) if self.fired => (Shift::Deactivate, true),
            _ => (Shift::Idle, true),
        }
    }

    pub fn leave(&mut self, depth: i32) -> (Shift, bool) {
        match (self.kind, depth) {
            (CombinatorKind::Descendant, 0) | (CombinatorKind::Child, 0) => {
                (Shift::Deactivate, false)
            }
            (CombinatorKind::Child, 1) => (Shift::Activate, true),
            (CombinatorKind::Adjacent | CombinatorKind::Following, 0) if !self.fired => {
                self.fired = true;
                (Shift::Activate, true)
            }
            (CombinatorKind::Following, 1) if self.fired => (Shift::Activate, true),
            (CombinatorKind::Adjacent | CombinatorKind::Following, -1) => {
                if self.fired {
                    (Shift::Deactivate, false)
                } else {
                    (Shift::Idle, false)
                }
            }
            _ => (Shift::Idle, true),
        }
    }
}
