use std::collections::HashMap;
use std::mem;
use std::rc::Rc;

use crate::cascade::{Cascade, CompileContext};
use crate::debug::{DebugLogger, json_string};
use crate::properties::PropertyValidator;
use crate::selector::{
    Action, ApplyRule, AttrOp, Chain, CombinatorKind, EPUB_NS, Predicate, XHTML_NS,
    parse_nth_formula,
};
use crate::style::{CascadeValue, ConditionId};
use crate::types::{Origin, Priority, SPECIFICITY_CLASS, SPECIFICITY_ID, SPECIFICITY_TAG};
use crate::value::CssValue;
use crate::view::{ViewCondition, ViewConditionBuilder};

pub const PSEUDO_ELEMENTS: &[&str] = &[
    "before",
    "transclusion-before",
    "footnote-call",
    "footnote-marker",
    "inner",
    "first-letter",
    "first-line",
    "transclusion-after",
    "after",
];

#[derive(Debug, Default)]
struct SelectorState {
    steps: Vec<Predicate>,
    specificity: u32,
    pseudo: Option<String>,
    view: Option<ViewCondition>,
    text: String,
    started: bool,
}

#[derive(Debug)]
struct PendingDeclaration {
    name: String,
    value: CssValue,
    important: bool,
}

/// Receives selector and declaration events from a stylesheet front end and
/// compiles them into predicate chains installed in a `Cascade`.
pub struct StyleCompiler<'c> {
    cascade: &'c mut Cascade,
    context: &'c mut CompileContext,
    validator: &'c dyn PropertyValidator,
    views: &'c dyn ViewConditionBuilder,
    logger: Option<&'c DebugLogger>,
    origin: Origin,
    namespaces: HashMap<String, String>,
    default_namespace: Option<String>,
    regions: Vec<String>,
    conditions: Vec<ConditionId>,
    current: SelectorState,
    // Outer selector while a `:not(...)` argument is being compiled.
    outer: Option<SelectorState>,
    nested_not: usize,
    selectors: Vec<SelectorState>,
    declarations: Vec<PendingDeclaration>,
}

impl<'c> StyleCompiler<'c> {
    pub fn new(
        cascade: &'c mut Cascade,
        context: &'c mut CompileContext,
        validator: &'c dyn PropertyValidator,
        views: &'c dyn ViewConditionBuilder,
    ) -> StyleCompiler<'c> {
        StyleCompiler {
            cascade,
            context,
            validator,
            views,
            logger: None,
            origin: Origin::Author,
            namespaces: HashMap::new(),
            default_namespace: None,
            regions: Vec::new(),
            conditions: Vec::new(),
            current: SelectorState::default(),
            outer: None,
            nested_not: 0,
            selectors: Vec::new(),
            declarations: Vec::new(),
        }
    }

    pub(crate) fn with_logger(mut self, logger: Option<&'c DebugLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn origin(&mut self, origin: Origin) {
        self.origin = origin;
    }

    /// Starts a new stylesheet. `@namespace` declarations are scoped to the
    /// sheet that makes them.
    pub fn begin_stylesheet(&mut self, origin: Origin) {
        self.origin = origin;
        self.namespaces.clear();
        self.default_namespace = None;
    }

    /// `@namespace prefix url(...)`; no prefix sets the default namespace.
    pub fn namespace(&mut self, prefix: Option<&str>, uri: &str) {
        match prefix {
            Some(prefix) => {
                self.namespaces.insert(prefix.to_string(), uri.to_string());
            }
            None => self.default_namespace = Some(uri.to_string()),
        }
    }

    fn fail(&mut self, reason: &str) {
        let target = match self.outer.as_mut() {
            Some(outer) => outer,
            None => &mut self.current,
        };
        target.steps.push(Predicate::Never);
        target.started = true;
        if let Some(logger) = self.logger {
            let mut text = self
                .outer
                .as_ref()
                .map(|outer| outer.text.clone())
                .unwrap_or_default();
            text.push_str(&self.current.text);
            logger.selector_unsupported(&text, reason);
        }
    }

    fn simple(&mut self, step: Option<Predicate>, specificity: u32, text: &str) {
        self.current.started = true;
        self.current.text.push_str(text);
        if self.current.pseudo.is_some() || self.current.view.is_some() {
            self.fail("simple selector after pseudo-element");
            return;
        }
        if let Some(step) = step {
            self.current.steps.push(step);
        }
        self.current.specificity += specificity;
    }

    fn resolve_prefix(&mut self, prefix: &str) -> Option<String> {
        let uri = self.namespaces.get(prefix).cloned();
        if uri.is_none() {
            self.fail("undeclared namespace prefix");
        }
        uri
    }

    /// Type selector. `prefix` is `None` when absent, `Some("*")` for any
    /// namespace and `Some("")` for no namespace.
    pub fn tag(&mut self, prefix: Option<&str>, local: &str) {
        let universal = local == "*";
        let ns = match prefix {
            None => self.default_namespace.clone(),
            Some("*") => None,
            Some("") => Some(String::new()),
            Some(prefix) => match self.resolve_prefix(prefix) {
                Some(uri) => Some(uri),
                None => return,
            },
        };
        let text = match prefix {
            Some(p) => format!("{p}|{local}"),
            None => local.to_string(),
        };
        let step = match (ns, universal) {
            (None, true) => None,
            (Some(ns), true) => Some(Predicate::Namespace(ns)),
            (None, false) => Some(Predicate::Tag(local.to_ascii_lowercase())),
            (Some(ns), false) => {
                let local = if ns == XHTML_NS {
                    local.to_ascii_lowercase()
                } else {
                    local.to_string()
                };
                Some(Predicate::NsTag { ns, local })
            }
        };
        let weight = if universal { 0 } else { SPECIFICITY_TAG };
        self.simple(step, weight, &text);
    }

    pub fn id(&mut self, id: &str) {
        self.simple(
            Some(Predicate::Id(id.to_string())),
            SPECIFICITY_ID,
            &format!("#{id}"),
        );
    }

    pub fn class(&mut self, class: &str) {
        self.simple(
            Some(Predicate::Class(class.to_string())),
            SPECIFICITY_CLASS,
            &format!(".{class}"),
        );
    }

    pub fn attribute(&mut self, prefix: Option<&str>, name: &str, op: &str, value: Option<&str>) {
        let text = format!(
            "[{}{}{}{}]",
            prefix.map(|p| format!("{p}|")).unwrap_or_default(),
            name,
            op,
            value.unwrap_or_default()
        );
        let Some(op) = AttrOp::parse(op) else {
            self.current.text.push_str(&text);
            self.current.started = true;
            self.fail("unsupported attribute operator");
            return;
        };
        let ns = match prefix {
            None | Some("") => String::new(),
            Some("*") => {
                self.current.text.push_str(&text);
                self.fail("wildcard attribute namespace");
                return;
            }
            Some(prefix) => match self.resolve_prefix(prefix) {
                Some(uri) => uri,
                None => return,
            },
        };
        let value = value.unwrap_or_default().to_string();
        let step = if ns == EPUB_NS && name == "type" && op == AttrOp::Includes {
            Predicate::EpubType(value)
        } else {
            Predicate::Attribute {
                ns,
                name: name.to_string(),
                op,
                value,
            }
        };
        self.simple(Some(step), SPECIFICITY_CLASS, &text);
    }

    pub fn pseudo_class(&mut self, name: &str, args: &[String]) {
        let lower = name.to_ascii_lowercase();
        if matches!(
            lower.as_str(),
            "before" | "after" | "first-line" | "first-letter"
        ) {
            self.pseudo_element(&lower, args);
            return;
        }
        let text = if args.is_empty() {
            format!(":{name}")
        } else {
            format!(":{name}({})", args.join(","))
        };
        let arg = args.join(" ");
        let nth = |arg: &str| parse_nth_formula(arg);
        let steps: Option<Vec<Predicate>> = match lower.as_str() {
            "root" => Some(vec![Predicate::Root]),
            "first-child" => Some(vec![Predicate::NthChild { a: 0, b: 1 }]),
            "last-child" => Some(vec![Predicate::NthLastChild { a: 0, b: 1 }]),
            "only-child" => Some(vec![
                Predicate::NthChild { a: 0, b: 1 },
                Predicate::NthLastChild { a: 0, b: 1 },
            ]),
            "first-of-type" => Some(vec![Predicate::NthOfType { a: 0, b: 1 }]),
            "last-of-type" => Some(vec![Predicate::NthLastOfType { a: 0, b: 1 }]),
            "only-of-type" => Some(vec![
                Predicate::NthOfType { a: 0, b: 1 },
                Predicate::NthLastOfType { a: 0, b: 1 },
            ]),
            "nth-child" => nth(&arg).map(|(a, b)| vec![Predicate::NthChild { a, b }]),
            "nth-last-child" => nth(&arg).map(|(a, b)| vec![Predicate::NthLastChild { a, b }]),
            "nth-of-type" => nth(&arg).map(|(a, b)| vec![Predicate::NthOfType { a, b }]),
            "nth-last-of-type" => {
                nth(&arg).map(|(a, b)| vec![Predicate::NthLastOfType { a, b }])
            }
            "empty" => Some(vec![Predicate::Empty]),
            "enabled" => Some(vec![Predicate::Enabled]),
            "disabled" => Some(vec![Predicate::Disabled]),
            "checked" => Some(vec![Predicate::Checked]),
            "lang" if !arg.trim().is_empty() => {
                Some(vec![Predicate::Lang(unquote(&arg).to_ascii_lowercase())])
            }
            "href-epub-type" if !arg.trim().is_empty() => {
                Some(vec![Predicate::HrefEpubType(unquote(&arg))])
            }
            _ => None,
        };
        match steps {
            Some(steps) => {
                let mut first = true;
                for step in steps {
                    let weight = if first { SPECIFICITY_CLASS } else { 0 };
                    self.simple(Some(step), weight, if first { text.as_str() } else { "" });
                    first = false;
                }
            }
            None => {
                self.current.text.push_str(&text);
                self.current.started = true;
                self.fail("unsupported pseudo-class");
            }
        }
    }

    pub fn pseudo_element(&mut self, name: &str, args: &[String]) {
        let lower = name.to_ascii_lowercase();
        self.current.started = true;
        self.current.text.push_str(&format!("::{lower}"));
        if self.outer.is_some() {
            self.fail("pseudo-element inside :not");
            return;
        }
        if let Some(view) = self.views.template(&lower, args) {
            if self.current.view.is_some() || self.current.pseudo.is_some() {
                self.fail("double pseudo-element");
                return;
            }
            self.current.view = Some(view);
            self.current.specificity += SPECIFICITY_TAG;
            return;
        }
        if !PSEUDO_ELEMENTS.contains(&lower.as_str()) {
            self.fail("unsupported pseudo-element");
            return;
        }
        if self.current.pseudo.is_some() {
            self.fail("double pseudo-element");
            return;
        }
        self.current.pseudo = Some(lower);
        self.current.specificity += SPECIFICITY_TAG;
    }

    fn combinator(&mut self, kind: CombinatorKind, text: &str) {
        self.current.text.push_str(text);
        if self.outer.is_some() {
            self.fail("combinator inside :not");
            return;
        }
        if self.current.pseudo.is_some() {
            self.fail("pseudo-element before a combinator");
        }
        let condition = self.context.new_condition();
        let steps = mem::take(&mut self.current.steps);
        // A fragment pseudo-element scopes everything the combinator reaches.
        let view = self.current.view.take();
        self.cascade.install(Chain::sorted(
            steps,
            Action::Track {
                kind,
                condition,
                view,
            },
        ));
        self.current.steps.push(Predicate::Condition(condition));
        self.current.started = true;
    }

    pub fn descendant(&mut self) {
        self.combinator(CombinatorKind::Descendant, " ");
    }

    pub fn child(&mut self) {
        self.combinator(CombinatorKind::Child, " > ");
    }

    pub fn adjacent(&mut self) {
        self.combinator(CombinatorKind::Adjacent, " + ");
    }

    pub fn following(&mut self) {
        self.combinator(CombinatorKind::Following, " ~ ");
    }

    pub fn begin_not(&mut self) {
        self.current.started = true;
        if self.outer.is_some() {
            self.nested_not += 1;
            self.fail("nested :not");
            return;
        }
        let mut outer = mem::take(&mut self.current);
        outer.text.push_str(":not(");
        self.outer = Some(outer);
    }

    pub fn end_not(&mut self) {
        if self.nested_not > 0 {
            self.nested_not -= 1;
            return;
        }
        let Some(mut outer) = self.outer.take() else {
            self.fail("unbalanced :not");
            return;
        };
        let inner = mem::take(&mut self.current);
        outer.text.push_str(&inner.text);
        outer.text.push(')');
        outer.specificity += inner.specificity;
        outer.steps.push(Predicate::Not(Box::new(Chain::sorted(
            inner.steps,
            Action::MarkApplied,
        ))));
        self.current = outer;
    }

    /// Ends one selector of a comma-separated group.
    pub fn next_selector(&mut self) {
        if self.outer.is_some() {
            self.fail("selector list inside :not");
            return;
        }
        let finished = mem::take(&mut self.current);
        if finished.started {
            self.selectors.push(finished);
        }
    }

    /// Starts an `@page` selector.
    pub fn page_rule(&mut self, name: Option<&str>, pseudo_classes: &[String]) {
        self.current = SelectorState {
            started: true,
            text: format!("@page {}", name.unwrap_or("")),
            ..SelectorState::default()
        };
        self.current
            .steps
            .push(Predicate::PageType(name.unwrap_or("*").to_string()));
        if name.is_some() {
            self.current.specificity += SPECIFICITY_ID;
        }
        for pseudo in pseudo_classes {
            let lower = pseudo.to_ascii_lowercase();
            let weight = match lower.as_str() {
                "first" | "blank" => SPECIFICITY_CLASS,
                "left" | "right" => SPECIFICITY_TAG,
                _ => {
                    self.current.text.push_str(&format!(":{lower}"));
                    self.fail("unsupported page pseudo-class");
                    continue;
                }
            };
            self.current.text.push_str(&format!(":{lower}"));
            self.current.steps.push(Predicate::Class(lower));
            self.current.specificity += weight;
        }
    }

    pub fn begin_region(&mut self, region: &str) {
        self.regions.push(region.to_string());
    }

    pub fn end_region(&mut self) {
        self.regions.pop();
    }

    pub fn begin_condition(&mut self, condition: ConditionId) {
        self.conditions.push(condition);
    }

    pub fn end_condition(&mut self) {
        self.conditions.pop();
    }

    /// Compiles the pending compound selector into a descendant tracker and
    /// returns the condition it maintains, for use with `begin_condition`.
    pub fn scope_condition(&mut self) -> ConditionId {
        let condition = self.context.new_condition();
        let state = mem::take(&mut self.current);
        self.cascade.install(Chain::sorted(
            state.steps,
            Action::Track {
                kind: CombinatorKind::Descendant,
                condition,
                view: None,
            },
        ));
        condition
    }

    pub fn property(&mut self, name: &str, value: &str, important: bool) {
        self.declare(name, &CssValue::parse(value), important);
    }

    pub fn declare(&mut self, name: &str, value: &CssValue, important: bool) {
        match self.validator.expand(name, value) {
            Ok(longhands) => {
                for (name, value) in longhands {
                    self.declarations.push(PendingDeclaration {
                        name,
                        value,
                        important,
                    });
                }
            }
            Err(reason) => {
                if let Some(logger) = self.logger {
                    logger.declaration_dropped(name, &reason);
                }
            }
        }
    }

    fn stamp(&mut self, specificity: u32, important: bool) -> Priority {
        let band = self.origin.band(important);
        Priority::from_specificity(band + specificity).with_order(self.cascade.next_order())
    }

    fn build_declarations(
        &mut self,
        specificity: u32,
        pending: &[PendingDeclaration],
    ) -> Vec<(String, CascadeValue)> {
        let condition = self.conditions.last().copied();
        let mut out = Vec::with_capacity(pending.len());
        for decl in pending {
            let priority = self.stamp(specificity, decl.important);
            out.push((
                decl.name.clone(),
                CascadeValue {
                    value: decl.value.clone(),
                    priority,
                    condition,
                },
            ));
        }
        out
    }

    pub fn end_rule(&mut self) {
        while self.outer.is_some() {
            self.fail("unterminated :not");
            self.nested_not = 0;
            self.end_not();
        }
        self.next_selector();
        let selectors = mem::take(&mut self.selectors);
        let pending = mem::take(&mut self.declarations);
        for selector in selectors {
            let mut declarations = self.build_declarations(selector.specificity, &pending);
            if declarations.is_empty() {
                continue;
            }
            let region = self.regions.last().cloned();
            if let Some(region) = &region {
                let priority = self.stamp(selector.specificity, false);
                declarations.push((
                    "region-id".to_string(),
                    CascadeValue::new(CssValue::Str(region.clone()), priority),
                ));
            }
            if let Some(view) = &selector.view {
                let priority = self.stamp(selector.specificity, false);
                declarations.push((
                    "fragment-selector-id".to_string(),
                    CascadeValue::new(CssValue::Str(view.key()), priority),
                ));
            }
            if let Some(logger) = self.logger {
                logger.log_json(&format!(
                    "{{\"type\":\"css.rule\",\"selector\":{},\"declarations\":{}}}",
                    json_string(&selector.text),
                    declarations.len()
                ));
                logger.increment("css.rule", 1);
            }
            let rule = ApplyRule {
                declarations,
                pseudo: selector.pseudo,
                region,
                view: selector.view,
            };
            self.cascade
                .install(Chain::sorted(selector.steps, Action::Apply(Rc::new(rule))));
        }
    }

    /// Declarations collected without a selector, stamped at this compiler's
    /// origin with zero specificity.
    pub fn take_inline(&mut self) -> Vec<(String, CascadeValue)> {
        let pending = mem::take(&mut self.declarations);
        self.build_declarations(0, &pending)
    }
}

fn unquote(raw: &str) -> String {
    raw.trim().trim_matches('"').trim_matches('\'').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::DefaultValidator;
    use crate::selector::IndexName;
    use crate::view::DefaultViewConditionBuilder;

    fn compile(build: impl FnOnce(&mut StyleCompiler<'_>)) -> Cascade {
        let mut cascade = Cascade::new();
        let mut context = CompileContext::new();
        let validator = DefaultValidator;
        let views = DefaultViewConditionBuilder;
        let mut compiler = StyleCompiler::new(&mut cascade, &mut context, &validator, &views);
        build(&mut compiler);
        cascade
    }

    fn apply_rule(chain: &Chain) -> &ApplyRule {
        match &chain.action {
            Action::Apply(rule) => rule,
            other => panic!("expected apply action, got {other:?}"),
        }
    }

    #[test]
    fn class_outranks_tag_regardless_of_order() {
        let cascade = compile(|c| {
            c.tag(None, "div");
            c.class("foo");
            c.property("color", "red", false);
            c.end_rule();
            c.tag(None, "div");
            c.property("color", "blue", false);
            c.end_rule();
        });
        let by_class = apply_rule(&cascade.lookup(IndexName::Class, "foo")[0]);
        let by_tag = apply_rule(&cascade.lookup(IndexName::Tag, "div")[0]);
        assert!(by_class.declarations[0].1.priority > by_tag.declarations[0].1.priority);
    }

    #[test]
    fn combinators_install_trackers_and_condition_steps() {
        let cascade = compile(|c| {
            c.tag(None, "ul");
            c.child();
            c.tag(None, "li");
            c.property("color", "red", false);
            c.end_rule();
        });
        let trackers = cascade.lookup(IndexName::Tag, "ul");
        assert!(matches!(
            trackers[0].action,
            Action::Track {
                kind: CombinatorKind::Child,
                ..
            }
        ));
        let li = &cascade.lookup(IndexName::Tag, "li")[0];
        assert!(matches!(li.steps[0], Predicate::Condition(_)));
        let priority = apply_rule(li).declarations[0].1.priority;
        assert_eq!(
            priority.specificity(),
            Origin::Author.band(false) + 2 * SPECIFICITY_TAG
        );
    }

    #[test]
    fn unsupported_fragments_compile_to_never() {
        let cascade = compile(|c| {
            c.tag(None, "p");
            c.pseudo_class("hover", &[]);
            c.property("color", "red", false);
            c.next_selector();
            c.tag(None, "p");
            c.begin_not();
            c.begin_not();
            c.class("x");
            c.end_not();
            c.end_not();
            c.property("color", "red", false);
            c.next_selector();
            c.tag(None, "p");
            c.pseudo_element("before", &[]);
            c.pseudo_element("after", &[]);
            c.property("color", "red", false);
            c.next_selector();
            c.tag(None, "p");
            c.attribute(None, "title", "!=", Some("x"));
            c.property("color", "red", false);
            c.end_rule();
        });
        let universal = cascade.lookup(IndexName::Tag, "*");
        assert_eq!(universal.len(), 4);
        for chain in universal {
            assert!(matches!(chain.steps[0], Predicate::Never));
        }
    }

    #[test]
    fn negation_wraps_inner_chain() {
        let cascade = compile(|c| {
            c.tag(None, "p");
            c.begin_not();
            c.class("x");
            c.end_not();
            c.property("color", "red", false);
            c.end_rule();
        });
        let chain = &cascade.lookup(IndexName::Tag, "p")[0];
        match &chain.steps[0] {
            Predicate::Not(inner) => {
                assert!(matches!(inner.action, Action::MarkApplied));
                assert!(matches!(inner.steps[0], Predicate::Class(_)));
            }
            other => panic!("expected negation, got {other:?}"),
        }
        assert_eq!(
            apply_rule(chain).declarations[0].1.priority.specificity(),
            Origin::Author.band(false) + SPECIFICITY_TAG + SPECIFICITY_CLASS
        );
    }

    #[test]
    fn epub_type_attribute_becomes_an_index_key() {
        let cascade = compile(|c| {
            c.namespace(Some("epub"), EPUB_NS);
            c.attribute(Some("epub"), "type", "~=", Some("footnote"));
            c.property("display", "none", false);
            c.end_rule();
        });
        assert_eq!(cascade.lookup(IndexName::EpubType, "footnote").len(), 1);
    }

    #[test]
    fn page_rules_index_by_page_type() {
        let cascade = compile(|c| {
            c.page_rule(None, &["first".to_string()]);
            c.property("margin", "1in", false);
            c.end_rule();
            c.page_rule(Some("cover"), &[]);
            c.property("size", "a4", false);
            c.end_rule();
        });
        let unnamed = &cascade.lookup(IndexName::PageType, "*")[0];
        assert!(matches!(unnamed.steps[0], Predicate::Class(_)));
        assert_eq!(apply_rule(unnamed).declarations.len(), 4);
        assert_eq!(cascade.lookup(IndexName::PageType, "cover").len(), 1);
    }

    #[test]
    fn regions_and_fragments_add_specials() {
        let cascade = compile(|c| {
            c.begin_region("sidebar");
            c.tag(None, "p");
            c.pseudo_element("nth-fragment", &["2".to_string()]);
            c.property("color", "gray", false);
            c.end_rule();
            c.end_region();
        });
        let rule = apply_rule(&cascade.lookup(IndexName::Tag, "p")[0]);
        assert_eq!(rule.region.as_deref(), Some("sidebar"));
        assert_eq!(rule.view, Some(ViewCondition::NthFragment { a: 0, b: 2 }));
        let names: Vec<&str> = rule.declarations.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["color", "region-id", "fragment-selector-id"]);
    }

    #[test]
    fn conditional_blocks_gate_declarations() {
        let mut captured = None;
        let cascade = compile(|c| {
            c.class("scope");
            let condition = c.scope_condition();
            captured = Some(condition);
            c.begin_condition(condition);
            c.tag(None, "em");
            c.property("font-weight", "bold", false);
            c.end_rule();
            c.end_condition();
        });
        let rule = apply_rule(&cascade.lookup(IndexName::Tag, "em")[0]);
        assert_eq!(rule.declarations[0].1.condition, captured);
        assert!(matches!(
            cascade.lookup(IndexName::Class, "scope")[0].action,
            Action::Track {
                kind: CombinatorKind::Descendant,
                ..
            }
        ));
    }

    #[test]
    fn important_declarations_use_the_important_band() {
        let mut cascade = Cascade::new();
        let mut context = CompileContext::new();
        let validator = DefaultValidator;
        let views = DefaultViewConditionBuilder;
        let mut compiler = StyleCompiler::new(&mut cascade, &mut context, &validator, &views);
        compiler.origin(Origin::StyleAttribute);
        compiler.property("color", "red", true);
        compiler.property("margin", "0", false);
        let inline = compiler.take_inline();
        assert_eq!(inline.len(), 5);
        assert_eq!(inline[0].1.priority.specificity(), Origin::StyleAttribute.band(true));
        assert!(inline[4].1.priority > inline[1].1.priority);
    }
}
