use std::collections::HashMap;
use std::rc::Rc;

use crate::types::Priority;
use crate::value::{CssValue, ValueContext, absolute_unit_px, is_font_relative};
use crate::view::{FragmentContext, ViewConditionMatcher};

/// Name of a combinator-maintained boolean condition. Allocated by
/// `CompileContext`, counted by `CascadeInstance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConditionId(pub(crate) u32);

/// Internal markers that accumulate instead of overriding.
pub const SPECIAL_PROPERTIES: &[&str] = &["region-id", "fragment-selector-id"];

pub fn is_special(name: &str) -> bool {
    SPECIAL_PROPERTIES.contains(&name)
}

// Region id a footnote inside a region is routed to. No region carries it.
const FOOTNOTE_IN_REGION_SENTINEL: &str = "\u{0}footnote-in-region";

#[derive(Debug, Clone, PartialEq)]
pub struct CascadeValue {
    pub value: CssValue,
    pub priority: Priority,
    pub condition: Option<ConditionId>,
}

impl CascadeValue {
    pub fn new(value: CssValue, priority: Priority) -> CascadeValue {
        CascadeValue {
            value,
            priority,
            condition: None,
        }
    }

    pub fn conditional(value: CssValue, priority: Priority, condition: ConditionId) -> CascadeValue {
        CascadeValue {
            value,
            priority,
            condition: Some(condition),
        }
    }

    pub fn is_enabled(&self, is_active: &dyn Fn(ConditionId) -> bool) -> bool {
        self.condition.map(is_active).unwrap_or(true)
    }

    /// Drops the gate; the condition was checked at selection time.
    pub fn settled(&self) -> CascadeValue {
        CascadeValue {
            value: self.value.clone(),
            priority: self.priority,
            condition: None,
        }
    }
}

/// Style view scoped to a fragment condition.
#[derive(Debug, Clone)]
pub struct ViewConditionalStyle {
    pub matcher: Rc<dyn ViewConditionMatcher>,
    pub style: ElementStyle,
}

#[derive(Debug, Clone, Default)]
pub struct ElementStyle {
    pub props: HashMap<String, CascadeValue>,
    pub pseudos: HashMap<String, ElementStyle>,
    pub regions: HashMap<String, ElementStyle>,
    pub view_conditional: Vec<ViewConditionalStyle>,
    pub specials: HashMap<String, Vec<CascadeValue>>,
}

impl ElementStyle {
    pub fn new() -> ElementStyle {
        ElementStyle::default()
    }

    pub fn get(&self, name: &str) -> Option<&CssValue> {
        self.props.get(name).map(|v| &v.value)
    }

    pub fn pseudo(&self, name: &str) -> Option<&ElementStyle> {
        self.pseudos.get(name)
    }

    pub fn pseudo_mut(&mut self, name: &str) -> &mut ElementStyle {
        self.pseudos.entry(name.to_string()).or_default()
    }

    pub fn region_mut(&mut self, region: &str) -> &mut ElementStyle {
        self.regions.entry(region.to_string()).or_default()
    }

    pub fn view_conditional_mut(
        &mut self,
        matcher: Rc<dyn ViewConditionMatcher>,
    ) -> &mut ElementStyle {
        let key = matcher.key();
        let idx = match self
            .view_conditional
            .iter()
            .position(|entry| entry.matcher.key() == key)
        {
            Some(idx) => idx,
            None => {
                self.view_conditional.push(ViewConditionalStyle {
                    matcher,
                    style: ElementStyle::default(),
                });
                self.view_conditional.len() - 1
            }
        };
        &mut self.view_conditional[idx].style
    }

    pub fn special(&self, name: &str) -> &[CascadeValue] {
        self.specials.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Picks the winner between the current value and a candidate. The
/// candidate wins only with a strictly higher priority and an active gate.
pub fn cascade_values(
    current: Option<&CascadeValue>,
    candidate: &CascadeValue,
    is_active: &dyn Fn(ConditionId) -> bool,
) -> Option<CascadeValue> {
    if !candidate.is_enabled(is_active) {
        return None;
    }
    match current {
        Some(existing) if existing.priority >= candidate.priority => None,
        _ => Some(candidate.settled()),
    }
}

pub fn merge_in(
    target: &mut ElementStyle,
    declarations: &[(String, CascadeValue)],
    is_active: &dyn Fn(ConditionId) -> bool,
) {
    for (name, candidate) in declarations {
        if is_special(name) {
            if candidate.is_enabled(is_active) {
                target
                    .specials
                    .entry(name.clone())
                    .or_default()
                    .push(candidate.settled());
            }
            continue;
        }
        if let Some(winner) = cascade_values(target.props.get(name), candidate, is_active) {
            target.props.insert(name.clone(), winner);
        }
    }
}

fn merge_props(
    into: &mut HashMap<String, CascadeValue>,
    from: &HashMap<String, CascadeValue>,
) {
    let always = |_: ConditionId| true;
    for (name, candidate) in from {
        if let Some(winner) = cascade_values(into.get(name), candidate, &always) {
            into.insert(name.clone(), winner);
        }
    }
}

/// Flat property map for one element as seen from one region/fragment.
pub fn flatten_cascaded_style(
    style: &ElementStyle,
    region_ids: &[String],
    is_footnote: bool,
    node_context: &FragmentContext,
) -> HashMap<String, CascadeValue> {
    let mut flat = style.props.clone();
    for entry in &style.view_conditional {
        if entry.matcher.matches(node_context) {
            merge_props(&mut flat, &entry.style.props);
        }
    }
    let footnote_region = ["footnote".to_string()];
    let sentinel = [FOOTNOTE_IN_REGION_SENTINEL.to_string()];
    let regions: &[String] = match (is_footnote, region_ids.is_empty()) {
        (true, true) => &footnote_region,
        (true, false) => &sentinel,
        (false, _) => region_ids,
    };
    for region in regions {
        if let Some(region_style) = style.regions.get(region) {
            merge_props(&mut flat, &region_style.props);
            for entry in &region_style.view_conditional {
                if entry.matcher.matches(node_context) {
                    merge_props(&mut flat, &entry.style.props);
                }
            }
        }
    }
    flat
}

/// Resolves lengths to px. `font-size` is resolved first against the
/// parent's font size; every other font-relative length uses the result.
pub fn evaluate_style(
    flat: &HashMap<String, CascadeValue>,
    parent_font_size: f64,
    context: &dyn ValueContext,
) -> HashMap<String, CssValue> {
    let mut evaluator = Evaluator {
        context,
        font_size: None,
    };
    let font_size = flat
        .get("font-size")
        .and_then(|v| evaluator.font_size_of(&v.value, parent_font_size))
        .unwrap_or(parent_font_size);
    evaluator.font_size = Some(font_size);
    let mut out = HashMap::with_capacity(flat.len());
    for (name, cascaded) in flat {
        let value = if name == "font-size" {
            px(font_size)
        } else {
            evaluator.resolve(&cascaded.value)
        };
        out.insert(name.clone(), value);
    }
    out
}

struct Evaluator<'a> {
    context: &'a dyn ValueContext,
    font_size: Option<f64>,
}

impl Evaluator<'_> {
    fn font_size_of(&self, value: &CssValue, parent: f64) -> Option<f64> {
        match value {
            CssValue::Numeric { num, unit } => match unit.as_str() {
                "%" => Some(parent * num / 100.0),
                "em" => Some(parent * num),
                "ex" | "ch" => Some(parent * num / 2.0),
                "rem" => Some(self.context.root_font_size() * num),
                other => self.length_px(*num, other),
            },
            CssValue::Ident(keyword) => font_size_keyword(keyword, parent),
            _ => None,
        }
    }

    fn length_px(&self, num: f64, unit: &str) -> Option<f64> {
        if let Some(scale) = absolute_unit_px(unit) {
            return Some(num * scale);
        }
        if unit == "rem" {
            return Some(num * self.context.root_font_size());
        }
        if is_font_relative(unit) {
            debug_assert!(
                self.font_size.is_some(),
                "font-relative length resolved before font-size"
            );
            let font_size = self.font_size?;
            return Some(if unit == "em" {
                num * font_size
            } else {
                num * font_size / 2.0
            });
        }
        self.context.unit_size(unit).map(|scale| num * scale)
    }

    fn resolve(&self, value: &CssValue) -> CssValue {
        match value {
            CssValue::Numeric { num, unit } if unit != "%" => match self.length_px(*num, unit) {
                Some(resolved) => px(resolved),
                None => value.clone(),
            },
            CssValue::SpaceList(items) => {
                CssValue::SpaceList(items.iter().map(|item| self.resolve(item)).collect())
            }
            CssValue::CommaList(items) => {
                CssValue::CommaList(items.iter().map(|item| self.resolve(item)).collect())
            }
            other => other.clone(),
        }
    }
}

fn px(num: f64) -> CssValue {
    CssValue::Numeric {
        num,
        unit: "px".to_string(),
    }
}

fn font_size_keyword(keyword: &str, parent: f64) -> Option<f64> {
    let size = match keyword.to_ascii_lowercase().as_str() {
        "xx-small" => 9.0,
        "x-small" => 10.0,
        "small" => 13.0,
        "medium" => 16.0,
        "large" => 18.0,
        "x-large" => 24.0,
        "xx-large" => 32.0,
        "smaller" => parent / 1.2,
        "larger" => parent * 1.2,
        _ => return None,
    };
    Some(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FixedContext;
    use crate::view::NthFragmentMatcher;

    fn value(text: &str, priority: u32) -> CascadeValue {
        CascadeValue::new(CssValue::parse(text), Priority::from_specificity(priority))
    }

    #[test]
    fn higher_priority_replaces_lower() {
        let mut style = ElementStyle::new();
        let active = |_: ConditionId| true;
        merge_in(&mut style, &[("color".to_string(), value("red", 10))], &active);
        merge_in(&mut style, &[("color".to_string(), value("blue", 1))], &active);
        assert_eq!(style.get("color"), Some(&CssValue::ident("red")));
        merge_in(&mut style, &[("color".to_string(), value("green", 11))], &active);
        assert_eq!(style.get("color"), Some(&CssValue::ident("green")));
    }

    #[test]
    fn equal_priority_keeps_the_existing_value() {
        let mut style = ElementStyle::new();
        let active = |_: ConditionId| true;
        merge_in(&mut style, &[("color".to_string(), value("red", 10))], &active);
        merge_in(&mut style, &[("color".to_string(), value("blue", 10))], &active);
        assert_eq!(style.get("color"), Some(&CssValue::ident("red")));
    }

    #[test]
    fn conditional_values_need_an_active_condition() {
        let gate = ConditionId(4);
        let candidate = CascadeValue::conditional(
            CssValue::ident("bold"),
            Priority::from_specificity(5),
            gate,
        );
        let mut style = ElementStyle::new();
        merge_in(
            &mut style,
            &[("font-weight".to_string(), candidate.clone())],
            &|_| false,
        );
        assert!(style.get("font-weight").is_none());
        merge_in(
            &mut style,
            &[("font-weight".to_string(), candidate)],
            &|id| id == gate,
        );
        let stored = style.props.get("font-weight").expect("selected");
        assert_eq!(stored.condition, None);
    }

    #[test]
    fn specials_accumulate() {
        let mut style = ElementStyle::new();
        let active = |_: ConditionId| true;
        merge_in(&mut style, &[("region-id".to_string(), value("\"a\"", 1))], &active);
        merge_in(&mut style, &[("region-id".to_string(), value("\"b\"", 9))], &active);
        merge_in(&mut style, &[("region-id".to_string(), value("\"c\"", 2))], &active);
        assert_eq!(style.special("region-id").len(), 3);
        assert!(style.props.is_empty());
    }

    #[test]
    fn flatten_merges_regions_and_fragments() {
        let mut style = ElementStyle::new();
        style.props.insert("color".to_string(), value("black", 1));
        style
            .region_mut("sidebar")
            .props
            .insert("color".to_string(), value("gray", 2));
        style
            .region_mut("footnote")
            .props
            .insert("font-size".to_string(), value("8pt", 2));
        let matcher: Rc<dyn ViewConditionMatcher> = Rc::new(NthFragmentMatcher {
            offset: 0,
            a: 0,
            b: 2,
        });
        style
            .view_conditional_mut(matcher)
            .props
            .insert("margin-top".to_string(), value("0", 3));

        let first = FragmentContext::new();
        let flat = flatten_cascaded_style(&style, &[], false, &first);
        assert_eq!(flat["color"].value, CssValue::ident("black"));
        assert!(!flat.contains_key("margin-top"));

        let second = FragmentContext::new().with_fragment(0, 2);
        let flat = flatten_cascaded_style(&style, &["sidebar".to_string()], false, &second);
        assert_eq!(flat["color"].value, CssValue::ident("gray"));
        assert!(flat.contains_key("margin-top"));

        let flat = flatten_cascaded_style(&style, &[], true, &first);
        assert!(flat.contains_key("font-size"));
    }

    #[test]
    fn region_fragment_rules_apply_in_their_fragment() {
        let mut style = ElementStyle::new();
        style.props.insert("color".to_string(), value("black", 1));
        let matcher: Rc<dyn ViewConditionMatcher> = Rc::new(NthFragmentMatcher {
            offset: 0,
            a: 0,
            b: 2,
        });
        style
            .region_mut("sidebar")
            .view_conditional_mut(matcher)
            .props
            .insert("color".to_string(), value("gray", 5));
        let regions = ["sidebar".to_string()];

        let first = FragmentContext::new();
        let flat = flatten_cascaded_style(&style, &regions, false, &first);
        assert_eq!(flat["color"].value, CssValue::ident("black"));

        let second = FragmentContext::new().with_fragment(0, 2);
        let flat = flatten_cascaded_style(&style, &regions, false, &second);
        assert_eq!(flat["color"].value, CssValue::ident("gray"));

        let flat = flatten_cascaded_style(&style, &[], false, &second);
        assert_eq!(flat["color"].value, CssValue::ident("black"));
    }

    #[test]
    fn footnote_inside_a_region_never_matches_region_rules() {
        let mut style = ElementStyle::new();
        style
            .region_mut("sidebar")
            .props
            .insert("color".to_string(), value("gray", 2));
        style
            .region_mut("footnote")
            .props
            .insert("color".to_string(), value("blue", 2));
        let flat = flatten_cascaded_style(
            &style,
            &["sidebar".to_string()],
            true,
            &FragmentContext::new(),
        );
        assert!(!flat.contains_key("color"));
    }

    #[test]
    fn evaluate_resolves_font_size_before_em_lengths() {
        let mut flat = HashMap::new();
        flat.insert("margin-top".to_string(), value("2em", 1));
        flat.insert("font-size".to_string(), value("150%", 1));
        flat.insert("width".to_string(), value("1in", 1));
        flat.insert("color".to_string(), value("red", 1));
        let evaluated = evaluate_style(&flat, 10.0, &FixedContext::default());
        assert_eq!(evaluated["font-size"], px(15.0));
        assert_eq!(evaluated["margin-top"], px(30.0));
        assert_eq!(evaluated["width"], px(96.0));
        assert_eq!(evaluated["color"], CssValue::ident("red"));
    }
}
