use std::rc::Rc;

use crate::style::{CascadeValue, ConditionId};
use crate::view::ViewCondition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOp {
    Exists,
    Equals,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
    /// `[ns|attr::supported]`: the value names a namespace this engine handles.
    Supported,
}

impl AttrOp {
    pub fn parse(raw: &str) -> Option<AttrOp> {
        match raw.trim() {
            "" => Some(AttrOp::Exists),
            "=" => Some(AttrOp::Equals),
            "~=" => Some(AttrOp::Includes),
            "|=" => Some(AttrOp::DashMatch),
            "^=" => Some(AttrOp::Prefix),
            "$=" => Some(AttrOp::Suffix),
            "*=" => Some(AttrOp::Substring),
            "::supported" => Some(AttrOp::Supported),
            _ => None,
        }
    }

    pub fn test(self, actual: &str, expected: &str) -> bool {
        match self {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == expected,
            AttrOp::Includes => {
                !expected.is_empty() && actual.split_whitespace().any(|token| token == expected)
            }
            AttrOp::DashMatch => {
                actual == expected
                    || (actual.starts_with(expected)
                        && actual[expected.len()..].starts_with('-'))
            }
            AttrOp::Prefix => !expected.is_empty() && actual.starts_with(expected),
            AttrOp::Suffix => !expected.is_empty() && actual.ends_with(expected),
            AttrOp::Substring => !expected.is_empty() && actual.contains(expected),
            AttrOp::Supported => SUPPORTED_NAMESPACES.contains(&actual.trim()),
        }
    }
}

pub const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";
pub const EPUB_NS: &str = "http://www.idpf.org/2007/ops";
pub const SVG_NS: &str = "http://www.w3.org/2000/svg";

pub const SUPPORTED_NAMESPACES: &[&str] = &[XHTML_NS, SVG_NS, EPUB_NS];

/// One compiled check of a compound selector.
#[derive(Debug, Clone)]
pub enum Predicate {
    Tag(String),
    NsTag { ns: String, local: String },
    Namespace(String),
    Id(String),
    Class(String),
    EpubType(String),
    Attribute {
        ns: String,
        name: String,
        op: AttrOp,
        value: String,
    },
    Lang(String),
    HrefEpubType(String),
    Root,
    /// `:nth-child(an+b)`; `:first-child` is `(0, 1)`.
    NthChild { a: i32, b: i32 },
    NthLastChild { a: i32, b: i32 },
    NthOfType { a: i32, b: i32 },
    NthLastOfType { a: i32, b: i32 },
    Empty,
    Enabled,
    Disabled,
    Checked,
    Condition(ConditionId),
    Not(Box<Chain>),
    PageType(String),
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexName {
    Tag,
    NsTag,
    Id,
    Class,
    EpubType,
    PageType,
}

impl Predicate {
    /// Evaluation-order rank: higher ranks are tested first.
    pub fn priority(&self) -> u8 {
        match self {
            Predicate::Never => 14,
            Predicate::PageType(_) => 13,
            Predicate::Root => 12,
            Predicate::Id(_) => 11,
            Predicate::Class(_) => 10,
            Predicate::EpubType(_) => 9,
            Predicate::Tag(_) | Predicate::NsTag { .. } => 8,
            Predicate::NthChild { a: 0, b: 1 } => 6,
            Predicate::Enabled | Predicate::Disabled | Predicate::Checked => 5,
            Predicate::Empty
            | Predicate::NthLastChild { a: 0, b: 1 }
            | Predicate::NthLastOfType { a: 0, b: 1 } => 4,
            _ => 0,
        }
    }

    pub fn index_key(&self) -> Option<(IndexName, String)> {
        match self {
            Predicate::Tag(local) => Some((IndexName::Tag, local.clone())),
            Predicate::NsTag { ns, local } => Some((IndexName::NsTag, ns_key(ns, local))),
            Predicate::Id(id) => Some((IndexName::Id, id.clone())),
            Predicate::Class(class) => Some((IndexName::Class, class.clone())),
            Predicate::EpubType(value) => Some((IndexName::EpubType, value.clone())),
            Predicate::PageType(name) => Some((IndexName::PageType, name.clone())),
            _ => None,
        }
    }
}

pub fn ns_key(ns: &str, local: &str) -> String {
    format!("{}|{}", ns, local)
}

/// Declarations attached to a matched selector.
#[derive(Debug, Clone)]
pub struct ApplyRule {
    pub declarations: Vec<(String, CascadeValue)>,
    pub pseudo: Option<String>,
    pub region: Option<String>,
    pub view: Option<ViewCondition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinatorKind {
    Descendant,
    Child,
    Adjacent,
    Following,
}

#[derive(Debug, Clone)]
pub enum Action {
    Apply(Rc<ApplyRule>),
    /// Start a combinator tracker that keeps `condition` active while the
    /// relationship holds.
    Track {
        kind: CombinatorKind,
        condition: ConditionId,
        view: Option<ViewCondition>,
    },
    /// Terminal of a negated inner selector.
    MarkApplied,
}

#[derive(Debug, Clone)]
pub struct Chain {
    pub steps: Vec<Predicate>,
    pub action: Action,
}

impl Chain {
    /// Orders steps so cheap, discriminating checks run first. Stable, so
    /// equal ranks keep source order.
    pub fn sorted(mut steps: Vec<Predicate>, action: Action) -> Chain {
        steps.sort_by(|a, b| b.priority().cmp(&a.priority()));
        Chain { steps, action }
    }

    /// Splits off an index-representable leading step.
    pub fn make_primary(mut self) -> (Option<(IndexName, String)>, Chain) {
        let key = self.steps.first().and_then(Predicate::index_key);
        if key.is_some() {
            self.steps.remove(0);
        }
        (key, self)
    }
}

/// `an+b` membership for 1-based position `k`.
pub fn nth_matches(k: i64, a: i32, b: i32) -> bool {
    let (a, b) = (a as i64, b as i64);
    if a == 0 {
        return k == b;
    }
    let diff = k - b;
    diff % a == 0 && diff / a >= 0
}

pub fn parse_nth_formula(raw: &str) -> Option<(i32, i32)> {
    let s = raw.replace(char::is_whitespace, "").to_ascii_lowercase();
    if s.is_empty() {
        return None;
    }
    match s.as_str() {
        "odd" => return Some((2, 1)),
        "even" => return Some((2, 0)),
        _ => {}
    }
    let Some(n_pos) = s.find('n') else {
        let b = s.trim_start_matches('+').parse::<i32>().ok()?;
        return Some((0, b));
    };
    let (a_str, b_str) = s.split_at(n_pos);
    let b_str = &b_str[1..];
    let a = match a_str {
        "" | "+" => 1,
        "-" => -1,
        other => other.trim_start_matches('+').parse::<i32>().ok()?,
    };
    let b = if b_str.is_empty() {
        0
    } else {
        if !b_str.starts_with('+') && !b_str.starts_with('-') {
            return None;
        }
        b_str.trim_start_matches('+').parse::<i32>().ok()?
    };
    Some((a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nth_matcher_follows_an_plus_b() {
        for k in 1..10 {
            assert_eq!(nth_matches(k, 2, 0), k % 2 == 0, "k={k}");
            assert_eq!(nth_matches(k, 0, 3), k == 3, "k={k}");
            assert_eq!(nth_matches(k, 0, 1), k == 1, "k={k}");
        }
        assert!(nth_matches(1, 2, 1));
        assert!(!nth_matches(1, 2, 3));
        // -n+3 selects the first three.
        assert!(nth_matches(3, -1, 3));
        assert!(nth_matches(1, -1, 3));
        assert!(!nth_matches(4, -1, 3));
    }

    #[test]
    fn parses_nth_formulas() {
        assert_eq!(parse_nth_formula("odd"), Some((2, 1)));
        assert_eq!(parse_nth_formula("EVEN"), Some((2, 0)));
        assert_eq!(parse_nth_formula("3"), Some((0, 3)));
        assert_eq!(parse_nth_formula("-n + 3"), Some((-1, 3)));
        assert_eq!(parse_nth_formula("2n-1"), Some((2, -1)));
        assert_eq!(parse_nth_formula("n"), Some((1, 0)));
        assert_eq!(parse_nth_formula("2n3"), None);
        assert_eq!(parse_nth_formula("x"), None);
    }

    #[test]
    fn attribute_operators() {
        assert!(AttrOp::Includes.test("a b c", "b"));
        assert!(!AttrOp::Includes.test("abc", "b"));
        assert!(AttrOp::DashMatch.test("en-US", "en"));
        assert!(!AttrOp::DashMatch.test("english", "en"));
        assert!(AttrOp::Prefix.test("chapter-1", "chap"));
        assert!(AttrOp::Suffix.test("chapter-1", "-1"));
        assert!(AttrOp::Substring.test("chapter-1", "ter"));
        assert!(!AttrOp::Substring.test("chapter-1", ""));
        assert!(AttrOp::Supported.test(SVG_NS, ""));
        assert!(!AttrOp::Supported.test("urn:unknown", ""));
        assert_eq!(AttrOp::parse("!="), None);
    }

    #[test]
    fn sorting_is_stable_and_descending() {
        let chain = Chain::sorted(
            vec![
                Predicate::Lang("en".to_string()),
                Predicate::Tag("p".to_string()),
                Predicate::Class("a".to_string()),
                Predicate::Class("b".to_string()),
                Predicate::Root,
            ],
            Action::MarkApplied,
        );
        let ranks: Vec<u8> = chain.steps.iter().map(Predicate::priority).collect();
        assert_eq!(ranks, vec![12, 10, 10, 8, 0]);
        match (&chain.steps[1], &chain.steps[2]) {
            (Predicate::Class(first), Predicate::Class(second)) => {
                assert_eq!((first.as_str(), second.as_str()), ("a", "b"));
            }
            other => panic!("unexpected order {other:?}"),
        }
    }

    #[test]
    fn make_primary_folds_the_leading_index_step() {
        let chain = Chain::sorted(
            vec![Predicate::Tag("p".to_string()), Predicate::Class("x".to_string())],
            Action::MarkApplied,
        );
        let (key, rest) = chain.make_primary();
        assert_eq!(key, Some((IndexName::Class, "x".to_string())));
        assert_eq!(rest.steps.len(), 1);

        let chain = Chain::sorted(vec![Predicate::Root], Action::MarkApplied);
        let (key, rest) = chain.make_primary();
        assert_eq!(key, None);
        assert_eq!(rest.steps.len(), 1);
    }
}
