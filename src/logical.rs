use std::collections::HashMap;
use std::sync::OnceLock;

use crate::style::CascadeValue;

const SIDE_PATTERNS: &[(&str, &str)] = &[
    ("margin-%", "margin-%"),
    ("padding-%", "padding-%"),
    ("border-%-width", "border-%-width"),
    ("border-%-style", "border-%-style"),
    ("border-%-color", "border-%-color"),
    ("inset-%", "%"),
];

const EXTENT_PATTERNS: &[&str] = &["%", "min-%", "max-%"];

// (logical side, legacy spelling)
const LOGICAL_SIDES: [(&str, &str); 4] = [
    ("block-start", "before"),
    ("block-end", "after"),
    ("inline-start", "start"),
    ("inline-end", "end"),
];

/// Physical sides for block-start, block-end, inline-start, inline-end.
fn physical_sides(vertical: bool, rtl: bool) -> [&'static str; 4] {
    match (vertical, rtl) {
        (false, false) => ["top", "bottom", "left", "right"],
        (false, true) => ["top", "bottom", "right", "left"],
        (true, false) => ["right", "left", "top", "bottom"],
        (true, true) => ["right", "left", "bottom", "top"],
    }
}

fn build_coupling(vertical: bool, rtl: bool) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let physical = physical_sides(vertical, rtl);
    for ((logical, legacy), side) in LOGICAL_SIDES.iter().zip(physical) {
        for (from, to) in SIDE_PATTERNS {
            let target = to.replace('%', side);
            map.insert(from.replace('%', logical), target.clone());
            map.insert(from.replace('%', legacy), target);
        }
    }
    let (block, inline) = if vertical {
        ("width", "height")
    } else {
        ("height", "width")
    };
    for pattern in EXTENT_PATTERNS {
        map.insert(pattern.replace('%', "block-size"), pattern.replace('%', block));
        map.insert(pattern.replace('%', "inline-size"), pattern.replace('%', inline));
    }
    map
}

fn coupling(vertical: bool, rtl: bool) -> &'static HashMap<String, String> {
    static TABLES: OnceLock<[HashMap<String, String>; 4]> = OnceLock::new();
    let tables = TABLES.get_or_init(|| {
        [
            build_coupling(true, false),
            build_coupling(true, true),
            build_coupling(false, false),
            build_coupling(false, true),
        ]
    });
    match (vertical, rtl) {
        (true, false) => &tables[0],
        (true, true) => &tables[1],
        (false, false) => &tables[2],
        (false, true) => &tables[3],
    }
}

/// Physical name for `name` under the given writing mode and direction;
/// names without a logical meaning come back unchanged.
pub fn physical_name(name: &str, vertical: bool, rtl: bool) -> &str {
    coupling(vertical, rtl)
        .get(name)
        .map(String::as_str)
        .unwrap_or(name)
}

/// Rewrites logical properties to physical ones. When a logical property
/// and its physical counterpart are both present, the higher priority
/// wins.
pub fn convert_to_physical(
    props: &HashMap<String, CascadeValue>,
    vertical: bool,
    rtl: bool,
) -> HashMap<String, CascadeValue> {
    let mut out: HashMap<String, CascadeValue> = HashMap::with_capacity(props.len());
    for (name, value) in props {
        let target = physical_name(name, vertical, rtl);
        match out.get(target) {
            Some(existing) if existing.priority >= value.priority => {}
            _ => {
                out.insert(target.to_string(), value.clone());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Priority;
    use crate::value::CssValue;

    fn props(entries: &[(&str, &str, u32)]) -> HashMap<String, CascadeValue> {
        entries
            .iter()
            .map(|(name, value, priority)| {
                (
                    name.to_string(),
                    CascadeValue::new(CssValue::parse(value), Priority::from_specificity(*priority)),
                )
            })
            .collect()
    }

    #[test]
    fn higher_priority_member_of_a_pair_wins() {
        let source = props(&[("margin-inline-start", "4px", 20), ("margin-left", "1px", 10)]);
        let out = convert_to_physical(&source, false, false);
        assert_eq!(out["margin-left"].value.to_string(), "4px");
        assert!(!out.contains_key("margin-inline-start"));

        let source = props(&[("margin-inline-start", "4px", 5), ("margin-left", "1px", 10)]);
        let out = convert_to_physical(&source, false, false);
        assert_eq!(out["margin-left"].value.to_string(), "1px");
    }

    #[test]
    fn writing_mode_selects_the_table() {
        assert_eq!(physical_name("padding-inline-start", false, true), "padding-right");
        assert_eq!(physical_name("padding-block-start", true, false), "padding-right");
        assert_eq!(physical_name("border-inline-end-color", true, true), "border-top-color");
        assert_eq!(physical_name("inset-block-end", false, false), "bottom");
        assert_eq!(physical_name("max-inline-size", true, false), "max-height");
        assert_eq!(physical_name("block-size", false, false), "height");
        assert_eq!(physical_name("margin-before", false, false), "margin-top");
        assert_eq!(physical_name("border-end-width", false, false), "border-right-width");
    }

    #[test]
    fn unpaired_properties_pass_through() {
        let source = props(&[("color", "red", 1), ("margin-top", "2px", 1)]);
        let out = convert_to_physical(&source, true, false);
        assert_eq!(out.len(), 2);
        assert_eq!(out["color"].value.to_string(), "red");
        assert_eq!(out["margin-top"].value.to_string(), "2px");
    }
}
