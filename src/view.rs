use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::selector::nth_matches;

/// Which fragment of each element the layout side is currently producing,
/// keyed by the element offset passed to `push_element`.
#[derive(Debug, Clone, Default)]
pub struct FragmentContext {
    fragments: HashMap<usize, usize>,
}

impl FragmentContext {
    pub fn new() -> FragmentContext {
        FragmentContext::default()
    }

    pub fn with_fragment(mut self, offset: usize, index: usize) -> FragmentContext {
        self.fragments.insert(offset, index);
        self
    }

    pub fn fragment_index(&self, offset: usize) -> usize {
        self.fragments.get(&offset).copied().unwrap_or(1)
    }
}

pub trait ViewConditionMatcher {
    fn matches(&self, context: &FragmentContext) -> bool;

    /// Stable identity, recorded in the `fragment-selector-id` special.
    fn key(&self) -> String;
}

impl fmt::Debug for dyn ViewConditionMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ViewConditionMatcher({})", self.key())
    }
}

/// `::nth-fragment(an+b)` on the element at `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NthFragmentMatcher {
    pub offset: usize,
    pub a: i32,
    pub b: i32,
}

impl ViewConditionMatcher for NthFragmentMatcher {
    fn matches(&self, context: &FragmentContext) -> bool {
        nth_matches(context.fragment_index(self.offset) as i64, self.a, self.b)
    }

    fn key(&self) -> String {
        format!("nth-fragment:{}:{}n+{}", self.offset, self.a, self.b)
    }
}

/// Every inner matcher must hold.
pub struct AllMatcher(pub Vec<Rc<dyn ViewConditionMatcher>>);

impl ViewConditionMatcher for AllMatcher {
    fn matches(&self, context: &FragmentContext) -> bool {
        self.0.iter().all(|matcher| matcher.matches(context))
    }

    fn key(&self) -> String {
        self.0
            .iter()
            .map(|matcher| matcher.key())
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Matcher template produced at compile time, bound to an element offset
/// when a rule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewCondition {
    NthFragment { a: i32, b: i32 },
}

impl ViewCondition {
    pub fn key(&self) -> String {
        match self {
            ViewCondition::NthFragment { a, b } => format!("nth-fragment({}n+{})", a, b),
        }
    }
}

pub trait ViewConditionBuilder {
    /// Turns a fragment pseudo-element into a template, or `None` when the
    /// pseudo-element is not a view condition.
    fn template(&self, pseudo: &str, args: &[String]) -> Option<ViewCondition>;

    fn bind(&self, condition: ViewCondition, offset: usize) -> Rc<dyn ViewConditionMatcher>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultViewConditionBuilder;

impl ViewConditionBuilder for DefaultViewConditionBuilder {
    fn template(&self, pseudo: &str, args: &[String]) -> Option<ViewCondition> {
        if !pseudo.eq_ignore_ascii_case("nth-fragment") {
            return None;
        }
        let raw = args.join(" ");
        let (a, b) = crate::selector::parse_nth_formula(&raw)?;
        Some(ViewCondition::NthFragment { a, b })
    }

    fn bind(&self, condition: ViewCondition, offset: usize) -> Rc<dyn ViewConditionMatcher> {
        match condition {
            ViewCondition::NthFragment { a, b } => Rc::new(NthFragmentMatcher { offset, a, b }),
        }
    }
}
