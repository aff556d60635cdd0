use std::fmt;
use std::rc::Rc;

/// Declared value as read from serialized declaration text.
#[derive(Clone, Debug, PartialEq)]
pub enum CssValue {
    Ident(String),
    Number(f64),
    Numeric { num: f64, unit: String },
    Str(String),
    Url(String),
    Hash(String),
    Func { name: String, args: Vec<CssValue> },
    SpaceList(Vec<CssValue>),
    CommaList(Vec<CssValue>),
    Deferred(DeferredValue),
    Empty,
}

/// Value whose text only becomes known later in the pipeline (page counters,
/// cross-reference counters). Equality is by key.
#[derive(Clone)]
pub struct DeferredValue {
    key: String,
    eval: Rc<dyn Fn() -> String>,
}

impl DeferredValue {
    pub fn new(key: impl Into<String>, eval: impl Fn() -> String + 'static) -> DeferredValue {
        DeferredValue {
            key: key.into(),
            eval: Rc::new(eval),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn evaluate(&self) -> String {
        (self.eval)()
    }
}

impl fmt::Debug for DeferredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredValue").field("key", &self.key).finish()
    }
}

impl PartialEq for DeferredValue {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl CssValue {
    pub fn parse(raw: &str) -> CssValue {
        let chars: Vec<char> = raw.chars().collect();
        let mut pos = 0usize;
        let groups = parse_groups(&chars, &mut pos, false);
        join_groups(groups)
    }

    pub fn ident(name: &str) -> CssValue {
        CssValue::Ident(name.to_string())
    }

    pub fn as_ident(&self) -> Option<&str> {
        match self {
            CssValue::Ident(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_ident(&self, name: &str) -> bool {
        self.as_ident()
            .map(|ident| ident.eq_ignore_ascii_case(name))
            .unwrap_or(false)
    }

    /// The space-separated members, treating a lone value as a one-item list.
    pub fn items(&self) -> &[CssValue] {
        match self {
            CssValue::SpaceList(items) => items,
            CssValue::Empty => &[],
            other => std::slice::from_ref(other),
        }
    }

    pub fn comma_items(&self) -> &[CssValue] {
        match self {
            CssValue::CommaList(items) => items,
            CssValue::Empty => &[],
            other => std::slice::from_ref(other),
        }
    }

    /// Rebuilds the value, letting `f` replace any functional notation.
    pub fn map_functions(
        &self,
        f: &mut dyn FnMut(&str, &[CssValue]) -> Option<CssValue>,
    ) -> CssValue {
        match self {
            CssValue::Func { name, args } => {
                if let Some(replaced) = f(name, args) {
                    return replaced;
                }
                CssValue::Func {
                    name: name.clone(),
                    args: args.iter().map(|arg| arg.map_functions(f)).collect(),
                }
            }
            CssValue::SpaceList(items) => {
                CssValue::SpaceList(items.iter().map(|item| item.map_functions(f)).collect())
            }
            CssValue::CommaList(items) => {
                CssValue::CommaList(items.iter().map(|item| item.map_functions(f)).collect())
            }
            other => other.clone(),
        }
    }

    pub fn contains_function(&self, wanted: &str) -> bool {
        match self {
            CssValue::Func { name, args } => {
                name.eq_ignore_ascii_case(wanted)
                    || args.iter().any(|arg| arg.contains_function(wanted))
            }
            CssValue::SpaceList(items) | CssValue::CommaList(items) => {
                items.iter().any(|item| item.contains_function(wanted))
            }
            _ => false,
        }
    }
}

fn join_groups(mut groups: Vec<Vec<CssValue>>) -> CssValue {
    let mut joined: Vec<CssValue> = groups.drain(..).map(join_space).collect();
    match joined.len() {
        0 => CssValue::Empty,
        1 => joined.pop().unwrap_or(CssValue::Empty),
        _ => CssValue::CommaList(joined),
    }
}

fn join_space(mut items: Vec<CssValue>) -> CssValue {
    match items.len() {
        0 => CssValue::Empty,
        1 => items.pop().unwrap_or(CssValue::Empty),
        _ => CssValue::SpaceList(items),
    }
}

fn parse_groups(chars: &[char], pos: &mut usize, in_function: bool) -> Vec<Vec<CssValue>> {
    let mut groups: Vec<Vec<CssValue>> = vec![Vec::new()];
    while *pos < chars.len() {
        let ch = chars[*pos];
        if ch.is_whitespace() {
            *pos += 1;
            continue;
        }
        if ch == ')' {
            *pos += 1;
            if in_function {
                break;
            }
            continue;
        }
        if ch == ',' {
            *pos += 1;
            groups.push(Vec::new());
            continue;
        }
        let value = parse_component(chars, pos);
        if let Some(group) = groups.last_mut() {
            group.push(value);
        }
    }
    if groups.len() == 1 && groups[0].is_empty() {
        groups.clear();
    }
    groups
}

fn parse_component(chars: &[char], pos: &mut usize) -> CssValue {
    let ch = chars[*pos];
    if ch == '"' || ch == '\'' {
        *pos += 1;
        return CssValue::Str(read_string(chars, pos, ch));
    }
    if ch == '#' {
        *pos += 1;
        return CssValue::Hash(read_name(chars, pos));
    }
    if starts_number(chars, *pos) {
        return read_numeric(chars, pos);
    }
    if is_name_start(ch) || (ch == '-' && chars.get(*pos + 1).is_some_and(|c| is_name_start(*c)))
    {
        let name = read_name(chars, pos);
        if chars.get(*pos) == Some(&'(') {
            *pos += 1;
            if name.eq_ignore_ascii_case("url") {
                return CssValue::Url(read_url(chars, pos));
            }
            let args = parse_groups(chars, pos, true)
                .into_iter()
                .map(join_space)
                .collect();
            return CssValue::Func { name, args };
        }
        return CssValue::Ident(name);
    }
    *pos += 1;
    CssValue::Ident(ch.to_string())
}

fn is_name_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '\\' || !ch.is_ascii()
}

fn is_name_char(ch: char) -> bool {
    is_name_start(ch) || ch.is_ascii_digit() || ch == '-'
}

fn starts_number(chars: &[char], pos: usize) -> bool {
    let at = |i: usize| chars.get(i).copied();
    match at(pos) {
        Some(c) if c.is_ascii_digit() => true,
        Some('.') => at(pos + 1).is_some_and(|c| c.is_ascii_digit()),
        Some('+') | Some('-') => match at(pos + 1) {
            Some(c) if c.is_ascii_digit() => true,
            Some('.') => at(pos + 2).is_some_and(|c| c.is_ascii_digit()),
            _ => false,
        },
        _ => false,
    }
}

fn read_numeric(chars: &[char], pos: &mut usize) -> CssValue {
    let start = *pos;
    if matches!(chars[*pos], '+' | '-') {
        *pos += 1;
    }
    let mut seen_dot = false;
    let mut seen_exp = false;
    while *pos < chars.len() {
        let c = chars[*pos];
        if c.is_ascii_digit() {
            *pos += 1;
        } else if c == '.' && !seen_dot && !seen_exp {
            seen_dot = true;
            *pos += 1;
        } else if (c == 'e' || c == 'E')
            && !seen_exp
            && chars
                .get(*pos + 1)
                .is_some_and(|n| n.is_ascii_digit() || *n == '-' || *n == '+')
        {
            seen_exp = true;
            *pos += 2;
        } else {
            break;
        }
    }
    let text: String = chars[start..*pos].iter().collect();
    let num = text.parse::<f64>().unwrap_or(0.0);
    if chars.get(*pos) == Some(&'%') {
        *pos += 1;
        return CssValue::Numeric {
            num,
            unit: "%".to_string(),
        };
    }
    if chars.get(*pos).is_some_and(|c| is_name_start(*c)) {
        let unit = read_name(chars, pos).to_ascii_lowercase();
        return CssValue::Numeric { num, unit };
    }
    CssValue::Number(num)
}

fn read_name(chars: &[char], pos: &mut usize) -> String {
    let mut out = String::new();
    while *pos < chars.len() {
        let c = chars[*pos];
        if c == '\\' {
            *pos += 1;
            if let Some(escaped) = read_escape(chars, pos) {
                out.push(escaped);
            }
            continue;
        }
        if !is_name_char(c) {
            break;
        }
        out.push(c);
        *pos += 1;
    }
    out
}

fn read_string(chars: &[char], pos: &mut usize, quote: char) -> String {
    let mut out = String::new();
    while *pos < chars.len() {
        let c = chars[*pos];
        *pos += 1;
        if c == quote {
            break;
        }
        if c == '\\' {
            if chars.get(*pos) == Some(&'\n') {
                *pos += 1;
                continue;
            }
            if let Some(escaped) = read_escape(chars, pos) {
                out.push(escaped);
            }
            continue;
        }
        out.push(c);
    }
    out
}

// Reads the escape body after a backslash.
fn read_escape(chars: &[char], pos: &mut usize) -> Option<char> {
    let first = *chars.get(*pos)?;
    if !first.is_ascii_hexdigit() {
        *pos += 1;
        return Some(first);
    }
    let mut code = 0u32;
    let mut digits = 0;
    while digits < 6 {
        match chars.get(*pos).and_then(|c| c.to_digit(16)) {
            Some(d) => {
                code = code * 16 + d;
                *pos += 1;
                digits += 1;
            }
            None => break,
        }
    }
    if chars.get(*pos).is_some_and(|c| c.is_whitespace()) {
        *pos += 1;
    }
    Some(char::from_u32(code).unwrap_or('\u{FFFD}'))
}

fn read_url(chars: &[char], pos: &mut usize) -> String {
    while chars.get(*pos).is_some_and(|c| c.is_whitespace()) {
        *pos += 1;
    }
    let url = match chars.get(*pos) {
        Some(&q) if q == '"' || q == '\'' => {
            *pos += 1;
            read_string(chars, pos, q)
        }
        _ => {
            let mut out = String::new();
            while let Some(&c) = chars.get(*pos) {
                if c == ')' || c.is_whitespace() {
                    break;
                }
                out.push(c);
                *pos += 1;
            }
            out
        }
    };
    while let Some(&c) = chars.get(*pos) {
        *pos += 1;
        if c == ')' {
            break;
        }
    }
    url
}

fn write_number(f: &mut fmt::Formatter<'_>, num: f64) -> fmt::Result {
    if num.fract() == 0.0 && num.abs() < 1e15 {
        write!(f, "{}", num as i64)
    } else {
        write!(f, "{}", num)
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[CssValue], sep: &str) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_quoted(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    f.write_str("\"")?;
    for ch in text.chars() {
        match ch {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\a ")?,
            _ => write!(f, "{}", ch)?,
        }
    }
    f.write_str("\"")
}

impl fmt::Display for CssValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CssValue::Ident(name) => f.write_str(name),
            CssValue::Number(num) => write_number(f, *num),
            CssValue::Numeric { num, unit } => {
                write_number(f, *num)?;
                f.write_str(unit)
            }
            CssValue::Str(text) => write_quoted(f, text),
            CssValue::Url(url) => {
                f.write_str("url(")?;
                write_quoted(f, url)?;
                f.write_str(")")
            }
            CssValue::Hash(name) => write!(f, "#{}", name),
            CssValue::Func { name, args } => {
                write!(f, "{}(", name)?;
                write_joined(f, args, ", ")?;
                f.write_str(")")
            }
            CssValue::SpaceList(items) => write_joined(f, items, " "),
            CssValue::CommaList(items) => write_joined(f, items, ", "),
            CssValue::Deferred(deferred) => f.write_str(&deferred.evaluate()),
            CssValue::Empty => Ok(()),
        }
    }
}

/// Length-resolution queries answered by the layout side.
pub trait ValueContext {
    fn root_font_size(&self) -> f64;

    /// Pixel size of one `unit` for units that depend on the viewing
    /// context (viewport and page units). Absolute and font-relative units
    /// never reach this.
    fn unit_size(&self, unit: &str) -> Option<f64>;
}

/// Fixed-size context for callers without a layout engine behind them.
#[derive(Debug, Clone, Copy)]
pub struct FixedContext {
    pub root_font_size: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
}

impl Default for FixedContext {
    fn default() -> Self {
        FixedContext {
            root_font_size: 16.0,
            viewport_width: 816.0,
            viewport_height: 1056.0,
        }
    }
}

impl ValueContext for FixedContext {
    fn root_font_size(&self) -> f64 {
        self.root_font_size
    }

    fn unit_size(&self, unit: &str) -> Option<f64> {
        match unit {
            "vw" => Some(self.viewport_width / 100.0),
            "vh" => Some(self.viewport_height / 100.0),
            "vmin" => Some(self.viewport_width.min(self.viewport_height) / 100.0),
            "vmax" => Some(self.viewport_width.max(self.viewport_height) / 100.0),
            _ => None,
        }
    }
}

pub(crate) fn absolute_unit_px(unit: &str) -> Option<f64> {
    match unit {
        "px" => Some(1.0),
        "pt" => Some(96.0 / 72.0),
        "pc" => Some(16.0),
        "in" => Some(96.0),
        "cm" => Some(96.0 / 2.54),
        "mm" => Some(96.0 / 25.4),
        "q" => Some(96.0 / 101.6),
        _ => None,
    }
}

pub(crate) fn is_font_relative(unit: &str) -> bool {
    matches!(unit, "em" | "ex" | "ch")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_space_and_comma_lists() {
        let value = CssValue::parse("1px solid red, 2em");
        assert_eq!(
            value,
            CssValue::CommaList(vec![
                CssValue::SpaceList(vec![
                    CssValue::Numeric {
                        num: 1.0,
                        unit: "px".to_string()
                    },
                    CssValue::ident("solid"),
                    CssValue::ident("red"),
                ]),
                CssValue::Numeric {
                    num: 2.0,
                    unit: "em".to_string()
                },
            ])
        );
    }

    #[test]
    fn parses_content_functions() {
        let value = CssValue::parse("counter(chapter, upper-roman) \". \" attr(title)");
        let items = value.items();
        assert_eq!(items.len(), 3);
        assert_eq!(
            items[0],
            CssValue::Func {
                name: "counter".to_string(),
                args: vec![CssValue::ident("chapter"), CssValue::ident("upper-roman")],
            }
        );
        assert_eq!(items[1], CssValue::Str(". ".to_string()));
        assert!(value.contains_function("attr"));
    }

    #[test]
    fn reads_escapes_and_urls() {
        assert_eq!(
            CssValue::parse("\"\\201C\""),
            CssValue::Str("\u{201C}".to_string())
        );
        assert_eq!(
            CssValue::parse("url(images/a.png)"),
            CssValue::Url("images/a.png".to_string())
        );
        assert_eq!(CssValue::parse("-5"), CssValue::Number(-5.0));
        assert_eq!(CssValue::parse("#fff"), CssValue::Hash("fff".to_string()));
    }

    #[test]
    fn display_writes_css_text() {
        let value = CssValue::parse("counters(item, \".\") 50%");
        assert_eq!(value.to_string(), "counters(item, \".\") 50%");
        assert_eq!(CssValue::Number(1.5).to_string(), "1.5");
    }

    #[test]
    fn deferred_values_compare_by_key() {
        let a = CssValue::Deferred(DeferredValue::new("page", || "3".to_string()));
        let b = CssValue::Deferred(DeferredValue::new("page", || "4".to_string()));
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "3");
    }

    #[test]
    fn map_functions_replaces_nested_calls() {
        let value = CssValue::parse("\"[\" attr(id) \"]\"");
        let mapped = value.map_functions(&mut |name, _| {
            (name == "attr").then(|| CssValue::Str("x".to_string()))
        });
        assert_eq!(mapped.to_string(), "\"[\" \"x\" \"]\"");
    }
}
