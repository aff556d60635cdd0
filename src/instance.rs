use std::cell::OnceCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use crate::cascade::{Cascade, UNIVERSAL_KEY};
use crate::combinator::{Shift, Tracker};
use crate::counters::{
    ContentEvaluator, CounterListener, CounterResolver, CounterState, QuoteState, counter_pairs,
};
use crate::debug::DebugLogger;
use crate::dom::StyledElement;
use crate::selector::{
    Action, ApplyRule, Chain, EPUB_NS, IndexName, Predicate, XHTML_NS, XML_NS, nth_matches,
};
use crate::style::{CascadeValue, ConditionId, ElementStyle, merge_in};
use crate::value::CssValue;
use crate::view::{AllMatcher, ViewConditionBuilder, ViewConditionMatcher};

/// Pseudo-elements handled while entering an element, in order. The
/// element's own `content` follows them.
const PSEUDOS_BEFORE_CONTENT: &[&str] = &[
    "before",
    "transclusion-before",
    "footnote-call",
    "footnote-marker",
    "inner",
    "first-letter",
    "first-line",
];

/// Pseudo-elements handled only after the element's subtree.
const PSEUDOS_AFTER_CONTENT: &[&str] = &["transclusion-after", "after"];

/// Counter behind list item numbering.
pub const LIST_ITEM_COUNTER: &str = "ua-list-item";

const FORM_CONTROLS: &[&str] = &[
    "button", "input", "select", "textarea", "option", "optgroup", "fieldset",
];

#[derive(Debug, Default)]
struct FollowingCache {
    total: usize,
    types: HashMap<String, usize>,
}

/// What predicates test: the element being entered, or a page.
struct Subject<E> {
    element: Option<E>,
    depth: usize,
    type_key: String,
    local: String,
    ids: Vec<String>,
    classes: Vec<String>,
    epub_types: Vec<String>,
    lang: String,
    child_index: usize,
    type_index: usize,
    page_type: Option<String>,
    following: OnceCell<FollowingCache>,
}

impl<E: StyledElement> Subject<E> {
    fn page(classes: &[String], page_type: &str) -> Subject<E> {
        Subject {
            element: None,
            depth: 0,
            type_key: String::new(),
            local: String::new(),
            ids: Vec::new(),
            classes: classes.to_vec(),
            epub_types: Vec::new(),
            lang: String::new(),
            child_index: 0,
            type_index: 0,
            page_type: Some(page_type.to_string()),
            following: OnceCell::new(),
        }
    }

    // Siblings after this element, counted on first use. The tree is
    // assumed not to change during the walk.
    fn following(&self) -> &FollowingCache {
        self.following.get_or_init(|| {
            let mut cache = FollowingCache::default();
            let mut next = self.element.as_ref().and_then(StyledElement::next_sibling_element);
            while let Some(sibling) = next {
                cache.total += 1;
                *cache.types.entry(type_key(&sibling)).or_default() += 1;
                next = sibling.next_sibling_element();
            }
            cache
        })
    }
}

struct Frame<E> {
    subject: Subject<E>,
    quotes_pushed: bool,
    reversed_list: bool,
}

/// Trackers anchored at one depth plus sibling bookkeeping for the elements
/// entered there under the current parent.
#[derive(Default)]
struct Level {
    trackers: Vec<Tracker>,
    children: usize,
    types: HashMap<String, usize>,
}

// Namespace-qualified name; HTML names compare case-insensitively.
fn type_key<E: StyledElement>(element: &E) -> String {
    let ns = element.namespace();
    let local = element.local_name();
    if ns == XHTML_NS {
        format!("{ns}|{}", local.to_ascii_lowercase())
    } else {
        format!("{ns}|{local}")
    }
}

fn tokens(raw: Option<String>) -> Vec<String> {
    raw.map(|raw| raw.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

fn combine_views(
    mut views: Vec<Rc<dyn ViewConditionMatcher>>,
) -> Option<Rc<dyn ViewConditionMatcher>> {
    match views.len() {
        0 => None,
        1 => views.pop(),
        _ => Some(Rc::new(AllMatcher(views))),
    }
}

fn is_generated(style: &ElementStyle) -> bool {
    match style.get("content") {
        None => false,
        Some(content) => !(content.is_ident("none") || content.is_ident("normal")),
    }
}

/// Traversal-time evaluator for one walk over one document. Driven by
/// `push_element`/`pop_element` in document order, or by
/// `push_rule`/`pop_rule` for pages.
pub struct CascadeInstance<'a, E: StyledElement> {
    cascade: &'a Cascade,
    views: &'a dyn ViewConditionBuilder,
    listener: Option<&'a mut dyn CounterListener>,
    resolver: Option<&'a dyn CounterResolver>,
    logger: Option<Arc<DebugLogger>>,
    default_lang: String,
    frames: Vec<Frame<E>>,
    pages: Vec<Subject<E>>,
    levels: Vec<Level>,
    active: HashMap<ConditionId, u32>,
    active_views: HashMap<ConditionId, Vec<Rc<dyn ViewConditionMatcher>>>,
    counters: CounterState,
    quotes: QuoteState,
}

impl<'a, E: StyledElement> CascadeInstance<'a, E> {
    pub fn new(
        cascade: &'a Cascade,
        views: &'a dyn ViewConditionBuilder,
        listener: Option<&'a mut dyn CounterListener>,
        resolver: Option<&'a dyn CounterResolver>,
        lang: &str,
    ) -> CascadeInstance<'a, E> {
        CascadeInstance {
            cascade,
            views,
            listener,
            resolver,
            logger: None,
            default_lang: lang.to_ascii_lowercase(),
            frames: Vec::new(),
            pages: Vec::new(),
            levels: vec![Level::default()],
            active: HashMap::new(),
            active_views: HashMap::new(),
            counters: CounterState::new(),
            quotes: QuoteState::default(),
        }
    }

    pub(crate) fn with_logger(mut self, logger: Option<Arc<DebugLogger>>) -> Self {
        self.logger = logger;
        self
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_active(&self, condition: ConditionId) -> bool {
        self.active.get(&condition).copied().unwrap_or(0) > 0
    }

    pub fn counters(&self) -> &CounterState {
        &self.counters
    }

    /// Enters `element`, merging every matching rule into `style`. `offset`
    /// identifies the element for fragment conditions.
    pub fn push_element(&mut self, element: &E, style: &mut ElementStyle, offset: usize) {
        let depth = self.frames.len();
        let subject = self.identify(element, depth);
        self.frames.push(Frame {
            subject,
            quotes_pushed: false,
            reversed_list: false,
        });
        self.levels.push(Level::default());

        self.match_element(style, offset, depth);
        self.dispatch_enter(depth);

        substitute_attributes(style, element);
        if let Some(quotes) = style.get("quotes").cloned() {
            self.quotes.push(&quotes);
            if let Some(frame) = self.frames.last_mut() {
                frame.quotes_pushed = true;
            }
        }
        self.counters.push_scope();
        self.apply_counters(element, style, depth);
        self.notify_listener(element, depth);
        for pseudo in PSEUDOS_BEFORE_CONTENT {
            self.process_pseudo(element, style, pseudo);
        }
        self.evaluate_content(element, style);
        if let Some(logger) = &self.logger {
            logger.increment("cascade.element", 1);
        }
    }

    /// Leaves `element`: generated content after the subtree is resolved
    /// and all per-element state is torn down in reverse order.
    pub fn pop_element(&mut self, element: &E, style: &mut ElementStyle) {
        let Some(depth) = self.frames.len().checked_sub(1) else {
            debug_assert!(false, "pop_element without a matching push_element");
            return;
        };
        for pseudo in PSEUDOS_AFTER_CONTENT {
            self.process_pseudo(element, style, pseudo);
        }
        self.dispatch_leave(depth);
        self.levels.pop();
        self.counters.pop_scope();
        if let Some(frame) = self.frames.pop() {
            if frame.quotes_pushed {
                self.quotes.pop();
            }
        }
    }

    /// Enters a page context. Page rules are matched against the page's
    /// classes (`first`, `left`, ...) and its named type.
    pub fn push_rule(&mut self, classes: &[String], page_type: &str, style: &mut ElementStyle) {
        let subject = Subject::page(classes, page_type);
        let cascade = self.cascade;
        let mut keys = vec![page_type];
        if page_type != UNIVERSAL_KEY {
            keys.push(UNIVERSAL_KEY);
        }
        for key in keys {
            for chain in cascade.lookup(IndexName::PageType, key) {
                self.run_chain(chain, &subject, style, 0, 0);
            }
        }
        self.pages.push(subject);
        if let Some(logger) = &self.logger {
            logger.increment("cascade.page", 1);
        }
    }

    pub fn pop_rule(&mut self) {
        let popped = self.pages.pop();
        debug_assert!(popped.is_some(), "pop_rule without a matching push_rule");
    }

    fn identify(&mut self, element: &E, depth: usize) -> Subject<E> {
        let local = element.local_name().to_ascii_lowercase();
        let type_key = type_key(element);
        let level = &mut self.levels[depth];
        level.children += 1;
        let child_index = level.children;
        let type_count = level.types.entry(type_key.clone()).or_default();
        *type_count += 1;
        let type_index = *type_count;

        let mut ids = Vec::new();
        for id in [element.attribute("", "id"), element.attribute(XML_NS, "id")]
            .into_iter()
            .flatten()
        {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        let lang = element
            .attribute(XML_NS, "lang")
            .or_else(|| element.attribute("", "lang"))
            .map(|lang| lang.to_ascii_lowercase())
            .or_else(|| self.frames.last().map(|frame| frame.subject.lang.clone()))
            .unwrap_or_else(|| self.default_lang.clone());

        Subject {
            element: Some(element.clone()),
            depth,
            type_key,
            local,
            ids,
            classes: tokens(element.attribute("", "class")),
            epub_types: tokens(element.attribute(EPUB_NS, "type")),
            lang,
            child_index,
            type_index,
            page_type: None,
            following: OnceCell::new(),
        }
    }

    fn match_element(&mut self, style: &mut ElementStyle, offset: usize, depth: usize) {
        let cascade = self.cascade;
        let Some(frame) = self.frames.pop() else {
            return;
        };
        let subject = &frame.subject;
        let mut lookups: Vec<(IndexName, &str)> = vec![
            (IndexName::Tag, UNIVERSAL_KEY),
            (IndexName::Tag, subject.local.as_str()),
            (IndexName::NsTag, subject.type_key.as_str()),
        ];
        lookups.extend(subject.ids.iter().map(|id| (IndexName::Id, id.as_str())));
        lookups.extend(subject.classes.iter().map(|c| (IndexName::Class, c.as_str())));
        lookups.extend(subject.epub_types.iter().map(|t| (IndexName::EpubType, t.as_str())));
        for (index, key) in lookups {
            for chain in cascade.lookup(index, key) {
                self.run_chain(chain, subject, style, offset, depth);
            }
        }
        self.frames.push(frame);
    }

    fn run_chain(
        &mut self,
        chain: &Chain,
        subject: &Subject<E>,
        style: &mut ElementStyle,
        offset: usize,
        depth: usize,
    ) {
        let mut dependent: Vec<Rc<dyn ViewConditionMatcher>> = Vec::new();
        if !chain
            .steps
            .iter()
            .all(|step| self.test(step, subject, &mut dependent))
        {
            return;
        }
        match &chain.action {
            Action::Apply(rule) => self.apply(rule, style, offset, dependent),
            Action::Track {
                kind,
                condition,
                view,
            } => {
                if let Some(view) = view {
                    dependent.push(self.views.bind(*view, offset));
                }
                if let Some(level) = self.levels.get_mut(depth) {
                    level
                        .trackers
                        .push(Tracker::new(*kind, *condition, combine_views(dependent)));
                }
            }
            Action::MarkApplied => {}
        }
    }

    fn apply(
        &self,
        rule: &ApplyRule,
        style: &mut ElementStyle,
        offset: usize,
        mut dependent: Vec<Rc<dyn ViewConditionMatcher>>,
    ) {
        if let Some(view) = rule.view {
            dependent.push(self.views.bind(view, offset));
        }
        let mut target = style;
        if let Some(pseudo) = &rule.pseudo {
            target = target.pseudo_mut(pseudo);
        }
        if let Some(region) = &rule.region {
            target = target.region_mut(region);
        }
        if let Some(matcher) = combine_views(dependent) {
            target = target.view_conditional_mut(matcher);
        }
        merge_in(target, &rule.declarations, &|condition| {
            self.is_active(condition)
        });
    }

    // A negated chain ends in `MarkApplied`; it counts as applied when every
    // step holds.
    fn negation_applied(&self, inner: &Chain, subject: &Subject<E>) -> bool {
        let mut ignored = Vec::new();
        let matched = inner
            .steps
            .iter()
            .all(|step| self.test(step, subject, &mut ignored));
        matched && matches!(inner.action, Action::MarkApplied)
    }

    fn test(
        &self,
        step: &Predicate,
        subject: &Subject<E>,
        dependent: &mut Vec<Rc<dyn ViewConditionMatcher>>,
    ) -> bool {
        match step {
            Predicate::Never => false,
            Predicate::PageType(name) => subject
                .page_type
                .as_deref()
                .is_some_and(|page| name == UNIVERSAL_KEY || page == name),
            Predicate::Class(class) => subject.classes.iter().any(|c| c == class),
            Predicate::Condition(condition) => {
                if !self.is_active(*condition) {
                    return false;
                }
                if let Some(view) = self
                    .active_views
                    .get(condition)
                    .and_then(|views| views.last())
                {
                    dependent.push(Rc::clone(view));
                }
                true
            }
            Predicate::Not(inner) => !self.negation_applied(inner, subject),
            _ => {
                let Some(element) = subject.element.as_ref() else {
                    return false;
                };
                self.test_element(step, subject, element)
            }
        }
    }

    fn test_element(&self, step: &Predicate, subject: &Subject<E>, element: &E) -> bool {
        match step {
            Predicate::Tag(local) => subject.local == *local,
            Predicate::NsTag { ns, local } => subject.type_key == format!("{ns}|{local}"),
            Predicate::Namespace(ns) => element.namespace() == *ns,
            Predicate::Id(id) => subject.ids.iter().any(|own| own == id),
            Predicate::EpubType(value) => subject.epub_types.iter().any(|t| t == value),
            Predicate::Attribute {
                ns,
                name,
                op,
                value,
            } => element
                .attribute(ns, name)
                .is_some_and(|actual| op.test(&actual, value)),
            Predicate::Lang(lang) => {
                subject.lang == *lang
                    || (subject.lang.starts_with(lang.as_str())
                        && subject.lang[lang.len()..].starts_with('-'))
            }
            Predicate::HrefEpubType(wanted) => element
                .attribute("", "href")
                .and_then(|href| href.strip_prefix('#').map(str::to_string))
                .and_then(|id| element.element_by_id(&id))
                .is_some_and(|target| {
                    tokens(target.attribute(EPUB_NS, "type"))
                        .iter()
                        .any(|t| t == wanted)
                }),
            Predicate::Root => subject.depth == 0,
            Predicate::NthChild { a, b } => nth_matches(subject.child_index as i64, *a, *b),
            Predicate::NthOfType { a, b } => nth_matches(subject.type_index as i64, *a, *b),
            Predicate::NthLastChild { a, b } => {
                nth_matches(subject.following().total as i64 + 1, *a, *b)
            }
            Predicate::NthLastOfType { a, b } => {
                let after = subject
                    .following()
                    .types
                    .get(&subject.type_key)
                    .copied()
                    .unwrap_or(0);
                nth_matches(after as i64 + 1, *a, *b)
            }
            Predicate::Empty => !element.has_child_content(),
            Predicate::Enabled => {
                FORM_CONTROLS.contains(&subject.local.as_str())
                    && element.attribute("", "disabled").is_none()
            }
            Predicate::Disabled => {
                FORM_CONTROLS.contains(&subject.local.as_str())
                    && element.attribute("", "disabled").is_some()
            }
            Predicate::Checked => match subject.local.as_str() {
                "input" => element.attribute("", "checked").is_some(),
                "option" => element.attribute("", "selected").is_some(),
                _ => false,
            },
            // Handled without an element in `test`.
            Predicate::Never
            | Predicate::PageType(_)
            | Predicate::Class(_)
            | Predicate::Condition(_)
            | Predicate::Not(_) => false,
        }
    }

    fn shift(&mut self, tracker: &Tracker, shift: Shift) {
        match shift {
            Shift::Activate => {
                *self.active.entry(tracker.condition).or_default() += 1;
                if let Some(view) = &tracker.view {
                    self.active_views
                        .entry(tracker.condition)
                        .or_default()
                        .push(Rc::clone(view));
                }
            }
            Shift::Deactivate => {
                let count = self.active.entry(tracker.condition).or_default();
                debug_assert!(*count > 0, "condition deactivated below zero");
                *count = count.saturating_sub(1);
                if let Some(view) = &tracker.view {
                    if let Some(views) = self.active_views.get_mut(&tracker.condition) {
                        if let Some(pos) = views.iter().rposition(|v| Rc::ptr_eq(v, view)) {
                            views.remove(pos);
                        }
                    }
                }
            }
            Shift::Idle => {}
        }
    }

    fn notify(&mut self, level: usize, depth: i32, entering: bool) {
        let Some(slot) = self.levels.get_mut(level) else {
            return;
        };
        let trackers = std::mem::take(&mut slot.trackers);
        let mut kept = Vec::with_capacity(trackers.len());
        for mut tracker in trackers {
            let (shift, keep) = if entering {
                tracker.enter(depth)
            } else {
                tracker.leave(depth)
            };
            self.shift(&tracker, shift);
            if keep {
                kept.push(tracker);
            }
        }
        if let Some(slot) = self.levels.get_mut(level) {
            kept.append(&mut slot.trackers);
            slot.trackers = kept;
        }
    }

    fn dispatch_enter(&mut self, depth: usize) {
        self.notify(depth, 0, true);
        if depth > 0 {
            self.notify(depth - 1, 1, true);
        }
    }

    fn dispatch_leave(&mut self, depth: usize) {
        self.notify(depth + 1, -1, false);
        self.notify(depth, 0, false);
        if depth > 0 {
            self.notify(depth - 1, 1, false);
        }
    }

    fn apply_counters(&mut self, element: &E, style: &ElementStyle, depth: usize) {
        let local = self
            .frames
            .last()
            .map(|frame| frame.subject.local.clone())
            .unwrap_or_default();
        let html = matches!(element.namespace().as_str(), XHTML_NS | "");
        if html && (local == "ol" || local == "ul") {
            let reversed = element.attribute("", "reversed").is_some();
            let start = element
                .attribute("", "start")
                .and_then(|raw| raw.trim().parse::<i64>().ok());
            let initial = if reversed {
                let items = start.unwrap_or_else(|| count_list_items(element));
                items + 1
            } else {
                start.unwrap_or(1) - 1
            };
            self.counters.reset(LIST_ITEM_COUNTER, initial);
            if let Some(frame) = self.frames.last_mut() {
                frame.reversed_list = reversed;
            }
        }
        if let Some(value) = style.get("counter-reset") {
            for (name, value) in counter_pairs(value, 0) {
                self.counters.reset(&name, value);
            }
        }
        if let Some(value) = style.get("counter-set") {
            for (name, value) in counter_pairs(value, 0) {
                self.counters.set(&name, value);
            }
        }
        if let Some(value) = style.get("counter-increment") {
            for (name, value) in counter_pairs(value, 1) {
                self.counters.increment(&name, value);
            }
        }
        let list_item = style
            .get("display")
            .is_some_and(|display| display.items().iter().any(|v| v.is_ident("list-item")));
        if list_item {
            let explicit = element
                .attribute("", "value")
                .and_then(|raw| raw.trim().parse::<i64>().ok());
            match explicit {
                Some(value) => self.counters.set(LIST_ITEM_COUNTER, value),
                None => {
                    let reversed = depth > 0
                        && self
                            .frames
                            .get(depth - 1)
                            .is_some_and(|parent| parent.reversed_list);
                    self.counters
                        .increment(LIST_ITEM_COUNTER, if reversed { -1 } else { 1 });
                }
            }
        }
    }

    fn notify_listener(&mut self, element: &E, depth: usize) {
        let id = element
            .attribute("", "id")
            .or_else(|| element.attribute(XML_NS, "id"));
        if depth != 0 && id.is_none() {
            return;
        }
        if let Some(listener) = self.listener.as_deref_mut() {
            listener.counters_of_id(id.as_deref(), self.counters.snapshot());
        }
    }

    fn process_pseudo(&mut self, element: &E, style: &mut ElementStyle, name: &str) {
        let Some(pseudo) = style.pseudos.get_mut(name) else {
            return;
        };
        if !is_generated(pseudo) {
            return;
        }
        substitute_attributes(pseudo, element);
        self.counters.push_scope();
        if let Some(value) = pseudo.get("counter-reset") {
            for (counter, value) in counter_pairs(value, 0) {
                self.counters.reset(&counter, value);
            }
        }
        if let Some(value) = pseudo.get("counter-set") {
            for (counter, value) in counter_pairs(value, 0) {
                self.counters.set(&counter, value);
            }
        }
        if let Some(value) = pseudo.get("counter-increment") {
            for (counter, value) in counter_pairs(value, 1) {
                self.counters.increment(&counter, value);
            }
        }
        self.evaluate_content(element, pseudo);
        self.counters.pop_scope();
    }

    fn evaluate_content(&mut self, element: &E, style: &mut ElementStyle) {
        let Some(content) = style.props.get_mut("content") else {
            return;
        };
        let attribute = |name: &str| element.attribute("", name);
        let mut evaluator = ContentEvaluator {
            counters: &self.counters,
            quotes: &mut self.quotes,
            resolver: self.resolver,
            attribute: &attribute,
        };
        let evaluated = evaluator.evaluate(&content.value);
        *content = CascadeValue {
            value: evaluated,
            priority: content.priority,
            condition: content.condition,
        };
    }
}

fn count_list_items<E: StyledElement>(list: &E) -> i64 {
    let mut count = 0;
    let mut next = list.first_child_element();
    while let Some(child) = next {
        if child.local_name().eq_ignore_ascii_case("li") {
            count += 1;
        }
        next = child.next_sibling_element();
    }
    count
}

// Replaces `attr()` in every property but `content`, which is evaluated
// together with counters and quotes.
fn substitute_attributes<E: StyledElement>(style: &mut ElementStyle, element: &E) {
    for (name, cascaded) in style.props.iter_mut() {
        if name == "content" || !cascaded.value.contains_function("attr") {
            continue;
        }
        cascaded.value = cascaded.value.map_functions(&mut |function, args| {
            if !function.eq_ignore_ascii_case("attr") {
                return None;
            }
            let spec = args.first()?.items();
            let attr = spec.first()?.as_ident()?;
            let as_url = spec.get(1).is_some_and(|kind| kind.is_ident("url"));
            let text = element.attribute("", attr).or_else(|| match args.get(1) {
                Some(CssValue::Str(fallback)) => Some(fallback.clone()),
                _ => None,
            });
            let text = text.unwrap_or_default();
            Some(if as_url {
                CssValue::Url(text)
            } else {
                CssValue::Str(text)
            })
        });
    }
}
