use std::collections::HashMap;

use crate::numbering::format_counter;
use crate::value::{CssValue, DeferredValue};

/// Answers counter references the tree walk cannot: counters that live on
/// pages, and counters at the target of a link.
pub trait CounterResolver {
    fn page_counter(&self, name: &str, style: &str) -> DeferredValue;

    fn page_counters(&self, name: &str, separator: &str, style: &str) -> DeferredValue;

    fn target_counter(&self, url: &str, name: &str, style: &str) -> DeferredValue;

    fn target_counters(&self, url: &str, name: &str, separator: &str, style: &str)
    -> DeferredValue;
}

/// Receives the counter snapshot at the root and at every element with an
/// id, so cross-references can be resolved later.
pub trait CounterListener {
    fn counters_of_id(&mut self, id: Option<&str>, counters: &HashMap<String, Vec<i64>>);
}

/// Counter stacks plus one scope per open element recording which counters
/// that element introduced.
#[derive(Debug, Default, Clone)]
pub struct CounterState {
    values: HashMap<String, Vec<i64>>,
    scopes: Vec<Vec<String>>,
}

impl CounterState {
    pub fn new() -> CounterState {
        CounterState::default()
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    pub fn pop_scope(&mut self) {
        let Some(introduced) = self.scopes.pop() else {
            debug_assert!(false, "counter scope popped without a matching push");
            return;
        };
        for name in introduced {
            if let Some(stack) = self.values.get_mut(&name) {
                stack.pop();
                if stack.is_empty() {
                    self.values.remove(&name);
                }
            }
        }
    }

    /// `counter-reset`: a new instance owned by the current element.
    pub fn reset(&mut self, name: &str, value: i64) {
        let owned_here = self
            .scopes
            .last()
            .is_some_and(|scope| scope.iter().any(|n| n == name));
        let stack = self.values.entry(name.to_string()).or_default();
        if owned_here {
            if let Some(top) = stack.last_mut() {
                *top = value;
                return;
            }
        }
        stack.push(value);
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(name.to_string());
        }
    }

    // Counters used before any reset are instantiated for the whole document.
    fn instantiate(&mut self, name: &str) -> &mut i64 {
        if !self.values.contains_key(name) {
            if let Some(root) = self.scopes.first_mut() {
                root.push(name.to_string());
            }
        }
        let stack = self.values.entry(name.to_string()).or_default();
        if stack.is_empty() {
            stack.push(0);
        }
        let last = stack.len() - 1;
        &mut stack[last]
    }

    pub fn set(&mut self, name: &str, value: i64) {
        *self.instantiate(name) = value;
    }

    pub fn increment(&mut self, name: &str, by: i64) {
        let slot = self.instantiate(name);
        *slot = slot.saturating_add(by);
    }

    pub fn value(&self, name: &str) -> Option<i64> {
        self.values.get(name).and_then(|stack| stack.last().copied())
    }

    pub fn values(&self, name: &str) -> Option<&[i64]> {
        self.values.get(name).map(Vec::as_slice)
    }

    pub fn snapshot(&self) -> &HashMap<String, Vec<i64>> {
        &self.values
    }
}

/// Reads `counter-reset`/`counter-set`/`counter-increment` values into
/// (name, number) pairs. A name without a number takes `default`.
pub fn counter_pairs(value: &CssValue, default: i64) -> Vec<(String, i64)> {
    let mut out: Vec<(String, i64)> = Vec::new();
    for item in value.items() {
        match item {
            CssValue::Ident(name) if !name.eq_ignore_ascii_case("none") => {
                out.push((name.clone(), default));
            }
            CssValue::Number(num) => {
                if let Some(last) = out.last_mut() {
                    last.1 = *num as i64;
                }
            }
            _ => {}
        }
    }
    out
}

const DEFAULT_QUOTES: &[(&str, &str)] = &[("\u{201C}", "\u{201D}"), ("\u{2018}", "\u{2019}")];

/// Active quote pairs, one entry per element that set `quotes`.
#[derive(Debug, Clone)]
pub struct QuoteState {
    stack: Vec<Vec<(String, String)>>,
    depth: usize,
}

impl Default for QuoteState {
    fn default() -> Self {
        QuoteState {
            stack: vec![
                DEFAULT_QUOTES
                    .iter()
                    .map(|(open, close)| (open.to_string(), close.to_string()))
                    .collect(),
            ],
            depth: 0,
        }
    }
}

impl QuoteState {
    pub fn push(&mut self, quotes: &CssValue) {
        let strings: Vec<String> = quotes
            .items()
            .iter()
            .filter_map(|item| match item {
                CssValue::Str(text) => Some(text.clone()),
                _ => None,
            })
            .collect();
        let pairs = strings
            .chunks_exact(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect();
        self.stack.push(pairs);
    }

    pub fn pop(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    fn pair(&self, level: usize) -> Option<&(String, String)> {
        let pairs = self.stack.last()?;
        pairs.get(level.min(pairs.len().checked_sub(1)?))
    }

    pub fn open(&mut self) -> String {
        let glyph = self
            .pair(self.depth)
            .map(|pair| pair.0.clone())
            .unwrap_or_default();
        self.depth += 1;
        glyph
    }

    pub fn close(&mut self) -> String {
        if self.depth == 0 {
            return String::new();
        }
        self.depth -= 1;
        self.pair(self.depth)
            .map(|pair| pair.1.clone())
            .unwrap_or_default()
    }

    pub fn skip_open(&mut self) {
        self.depth += 1;
    }

    pub fn skip_close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

/// Turns a `content` value into literal strings and deferred values.
pub(crate) struct ContentEvaluator<'a> {
    pub counters: &'a CounterState,
    pub quotes: &'a mut QuoteState,
    pub resolver: Option<&'a dyn CounterResolver>,
    pub attribute: &'a dyn Fn(&str) -> Option<String>,
}

impl ContentEvaluator<'_> {
    pub fn evaluate(&mut self, content: &CssValue) -> CssValue {
        let items = content.items();
        if let [CssValue::Ident(keyword)] = items {
            if keyword.eq_ignore_ascii_case("normal") || keyword.eq_ignore_ascii_case("none") {
                return content.clone();
            }
        }
        let mut out: Vec<CssValue> = items.iter().filter_map(|item| self.item(item)).collect();
        match out.len() {
            0 => CssValue::Str(String::new()),
            1 => out.pop().unwrap_or(CssValue::Empty),
            _ => CssValue::SpaceList(out),
        }
    }

    fn item(&mut self, item: &CssValue) -> Option<CssValue> {
        match item {
            CssValue::Ident(keyword) => match keyword.to_ascii_lowercase().as_str() {
                "open-quote" => Some(CssValue::Str(self.quotes.open())),
                "close-quote" => Some(CssValue::Str(self.quotes.close())),
                "no-open-quote" => {
                    self.quotes.skip_open();
                    None
                }
                "no-close-quote" => {
                    self.quotes.skip_close();
                    None
                }
                _ => Some(item.clone()),
            },
            CssValue::Func { name, args } => Some(self.function(name, args)),
            other => Some(other.clone()),
        }
    }

    fn text_arg(&self, arg: Option<&CssValue>) -> Option<String> {
        match arg? {
            CssValue::Ident(text) | CssValue::Str(text) | CssValue::Url(text) => Some(text.clone()),
            CssValue::Func { name, args } if name.eq_ignore_ascii_case("attr") => {
                let attr = args.first()?.items().first()?.as_ident()?.to_string();
                (self.attribute)(&attr)
            }
            _ => None,
        }
    }

    fn function(&mut self, name: &str, args: &[CssValue]) -> CssValue {
        let text = |idx: usize| self.text_arg(args.get(idx));
        match name.to_ascii_lowercase().as_str() {
            "attr" => {
                let Some(attr) = args.first().and_then(|arg| arg.items().first()?.as_ident())
                else {
                    return CssValue::Str(String::new());
                };
                let fallback = args.get(1).and_then(|arg| match arg {
                    CssValue::Str(text) => Some(text.clone()),
                    _ => None,
                });
                CssValue::Str(
                    (self.attribute)(attr)
                        .or(fallback)
                        .unwrap_or_default(),
                )
            }
            "counter" => {
                let counter = text(0).unwrap_or_default();
                let style = text(1).unwrap_or_else(|| "decimal".to_string());
                match self.counters.value(&counter) {
                    Some(value) => CssValue::Str(format_counter(value, &style)),
                    None => match self.resolver {
                        Some(resolver) => {
                            CssValue::Deferred(resolver.page_counter(&counter, &style))
                        }
                        None => CssValue::Str(format_counter(0, &style)),
                    },
                }
            }
            "counters" => {
                let counter = text(0).unwrap_or_default();
                let separator = text(1).unwrap_or_default();
                let style = text(2).unwrap_or_else(|| "decimal".to_string());
                match self.counters.values(&counter) {
                    Some(values) => CssValue::Str(
                        values
                            .iter()
                            .map(|value| format_counter(*value, &style))
                            .collect::<Vec<_>>()
                            .join(&separator),
                    ),
                    None => match self.resolver {
                        Some(resolver) => CssValue::Deferred(
                            resolver.page_counters(&counter, &separator, &style),
                        ),
                        None => CssValue::Str(format_counter(0, &style)),
                    },
                }
            }
            "target-counter" => {
                let (Some(url), Some(counter)) = (text(0), text(1)) else {
                    return CssValue::Str(String::new());
                };
                let style = text(2).unwrap_or_else(|| "decimal".to_string());
                match self.resolver {
                    Some(resolver) => {
                        CssValue::Deferred(resolver.target_counter(&url, &counter, &style))
                    }
                    None => CssValue::Str(String::new()),
                }
            }
            "target-counters" => {
                let (Some(url), Some(counter), Some(separator)) = (text(0), text(1), text(2))
                else {
                    return CssValue::Str(String::new());
                };
                let style = text(3).unwrap_or_else(|| "decimal".to_string());
                match self.resolver {
                    Some(resolver) => CssValue::Deferred(resolver.target_counters(
                        &url, &counter, &separator, &style,
                    )),
                    None => CssValue::Str(String::new()),
                }
            }
            _ => CssValue::Func {
                name: name.to_string(),
                args: args.to_vec(),
            },
        }
    }
}
