//! Replays serialized selector text as `StyleCompiler` events.

use crate::compiler::StyleCompiler;

#[derive(Clone, Copy)]
enum Pending {
    Descendant,
    Child,
    Adjacent,
    Following,
}

/// Feeds a comma-separated selector list into `compiler`. The caller ends
/// the rule after adding declarations.
pub fn replay_selector_list(text: &str, compiler: &mut StyleCompiler<'_>) {
    let chars: Vec<char> = text.chars().collect();
    let mut pos = 0usize;
    replay(&chars, &mut pos, compiler, false);
}

fn replay(chars: &[char], pos: &mut usize, compiler: &mut StyleCompiler<'_>, in_not: bool) {
    let mut pending: Option<Pending> = None;
    let mut in_compound = false;
    while *pos < chars.len() {
        let ch = chars[*pos];
        match ch {
            ')' if in_not => {
                *pos += 1;
                return;
            }
            c if c.is_whitespace() => {
                *pos += 1;
                if in_compound && pending.is_none() {
                    pending = Some(Pending::Descendant);
                }
                in_compound = false;
            }
            '>' | '+' | '~' => {
                *pos += 1;
                pending = Some(match ch {
                    '>' => Pending::Child,
                    '+' => Pending::Adjacent,
                    _ => Pending::Following,
                });
                in_compound = false;
            }
            ',' => {
                *pos += 1;
                pending = None;
                in_compound = false;
                compiler.next_selector();
            }
            _ => {
                if !in_compound {
                    if let Some(kind) = pending.take() {
                        match kind {
                            Pending::Descendant => compiler.descendant(),
                            Pending::Child => compiler.child(),
                            Pending::Adjacent => compiler.adjacent(),
                            Pending::Following => compiler.following(),
                        }
                    }
                    in_compound = true;
                }
                replay_simple(chars, pos, compiler);
            }
        }
    }
}

fn replay_simple(chars: &[char], pos: &mut usize, compiler: &mut StyleCompiler<'_>) {
    let ch = chars[*pos];
    match ch {
        '.' => {
            *pos += 1;
            let name = read_name(chars, pos);
            compiler.class(&name);
        }
        '#' => {
            *pos += 1;
            let name = read_name(chars, pos);
            compiler.id(&name);
        }
        '[' => {
            *pos += 1;
            let raw = read_until_bracket(chars, pos);
            replay_attribute(&raw, compiler);
        }
        ':' => {
            *pos += 1;
            let element = chars.get(*pos) == Some(&':');
            if element {
                *pos += 1;
            }
            let name = read_name(chars, pos);
            if chars.get(*pos) == Some(&'(') {
                *pos += 1;
                if !element && name.eq_ignore_ascii_case("not") {
                    compiler.begin_not();
                    replay(chars, pos, compiler, true);
                    compiler.end_not();
                    return;
                }
                let args = read_balanced(chars, pos);
                let args = vec![args.trim().to_string()];
                if element {
                    compiler.pseudo_element(&name, &args);
                } else {
                    compiler.pseudo_class(&name, &args);
                }
            } else if element {
                compiler.pseudo_element(&name, &[]);
            } else {
                compiler.pseudo_class(&name, &[]);
            }
        }
        _ => {
            let (prefix, local) = read_qualified(chars, pos);
            if local.is_empty() {
                // Unrecognised character; skip so the reader always advances.
                *pos += 1;
                compiler.pseudo_class(&ch.to_string(), &[]);
                return;
            }
            compiler.tag(prefix.as_deref(), &local);
        }
    }
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || !ch.is_ascii()
}

fn read_name(chars: &[char], pos: &mut usize) -> String {
    let mut out = String::new();
    while let Some(&c) = chars.get(*pos) {
        if c == '\\' {
            *pos += 1;
            if let Some(&escaped) = chars.get(*pos) {
                out.push(escaped);
                *pos += 1;
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

// `prefix|local`, `*|local`, `|local`, `local` or `*`.
fn read_qualified(chars: &[char], pos: &mut usize) -> (Option<String>, String) {
    let first = if chars.get(*pos) == Some(&'*') {
        *pos += 1;
        "*".to_string()
    } else {
        read_name(chars, pos)
    };
    if chars.get(*pos) == Some(&'|') && chars.get(*pos + 1) != Some(&'=') {
        *pos += 1;
        let local = if chars.get(*pos) == Some(&'*') {
            *pos += 1;
            "*".to_string()
        } else {
            read_name(chars, pos)
        };
        return (Some(first), local);
    }
    (None, first)
}

fn read_until_bracket(chars: &[char], pos: &mut usize) -> String {
    let mut buf = String::new();
    let mut in_quote: Option<char> = None;
    while let Some(&c) = chars.get(*pos) {
        *pos += 1;
        if let Some(q) = in_quote {
            if c == q {
                in_quote = None;
            }
            buf.push(c);
            continue;
        }
        if c == '"' || c == '\'' {
            in_quote = Some(c);
            buf.push(c);
            continue;
        }
        if c == ']' {
            break;
        }
        buf.push(c);
    }
    buf
}

fn read_balanced(chars: &[char], pos: &mut usize) -> String {
    let mut depth = 1usize;
    let mut buf = String::new();
    while let Some(&c) = chars.get(*pos) {
        *pos += 1;
        if c == '(' {
            depth += 1;
        } else if c == ')' {
            depth -= 1;
            if depth == 0 {
                break;
            }
        }
        buf.push(c);
    }
    buf
}

fn replay_attribute(raw: &str, compiler: &mut StyleCompiler<'_>) {
    let chars: Vec<char> = raw.trim().chars().collect();
    let mut pos = 0usize;
    let (prefix, name) = read_qualified(&chars, &mut pos);
    let rest: String = chars[pos..].iter().collect();
    let rest = rest.trim();
    if rest.is_empty() {
        compiler.attribute(prefix.as_deref(), &name, "", None);
        return;
    }
    let op_len = rest
        .char_indices()
        .find(|(_, c)| !matches!(c, '~' | '|' | '^' | '$' | '*' | '=' | '!' | ':'))
        .map(|(idx, _)| idx)
        .unwrap_or(rest.len());
    let (op, value) = rest.split_at(op_len);
    let op = if op == "::" && value.trim() == "supported" {
        "::supported"
    } else {
        op
    };
    let value = value.trim();
    let value = if op == "::supported" {
        None
    } else {
        Some(strip_case_flag(value))
    };
    compiler.attribute(prefix.as_deref(), &name, op, value.as_deref());
}

fn strip_case_flag(value: &str) -> String {
    let value = value.trim();
    let unflagged = match value.rsplit_once(char::is_whitespace) {
        Some((head, flag)) if flag.eq_ignore_ascii_case("i") || flag.eq_ignore_ascii_case("s") => {
            head.trim()
        }
        _ => value,
    };
    let quoted = unflagged.len() >= 2
        && ((unflagged.starts_with('"') && unflagged.ends_with('"'))
            || (unflagged.starts_with('\'') && unflagged.ends_with('\'')));
    if quoted {
        unflagged[1..unflagged.len() - 1].to_string()
    } else {
        unflagged.to_string()
    }
}
