use crate::value::CssValue;

/// Declaration gatekeeper between the compiler and the cascade. Returns the
/// longhands to store, or a reason the declaration is dropped.
pub trait PropertyValidator {
    fn expand(&self, name: &str, value: &CssValue) -> Result<Vec<(String, CssValue)>, String>;
}

const KNOWN_PROPERTIES: &[&str] = &[
    "background-attachment",
    "background-clip",
    "background-color",
    "background-image",
    "background-origin",
    "background-position",
    "background-repeat",
    "background-size",
    "block-size",
    "border-bottom-left-radius",
    "border-bottom-right-radius",
    "border-collapse",
    "border-spacing",
    "border-top-left-radius",
    "border-top-right-radius",
    "bottom",
    "box-decoration-break",
    "box-sizing",
    "break-after",
    "break-before",
    "break-inside",
    "caption-side",
    "clear",
    "color",
    "column-count",
    "column-gap",
    "column-width",
    "content",
    "counter-increment",
    "counter-reset",
    "counter-set",
    "direction",
    "display",
    "empty-cells",
    "float",
    "float-reference",
    "flow-from",
    "flow-into",
    "font-family",
    "font-size",
    "font-stretch",
    "font-style",
    "font-variant",
    "font-weight",
    "footnote-display",
    "footnote-policy",
    "height",
    "hyphens",
    "inline-size",
    "left",
    "letter-spacing",
    "line-height",
    "list-style-image",
    "list-style-position",
    "list-style-type",
    "max-block-size",
    "max-height",
    "max-inline-size",
    "max-width",
    "min-block-size",
    "min-height",
    "min-inline-size",
    "min-width",
    "opacity",
    "orphans",
    "overflow",
    "page",
    "page-break-after",
    "page-break-before",
    "page-break-inside",
    "position",
    "quotes",
    "right",
    "size",
    "string-set",
    "table-layout",
    "text-align",
    "text-decoration",
    "text-indent",
    "text-transform",
    "top",
    "unicode-bidi",
    "vertical-align",
    "visibility",
    "white-space",
    "widows",
    "width",
    "word-spacing",
    "writing-mode",
    "z-index",
];

const BOX_SIDES: [&str; 4] = ["top", "right", "bottom", "left"];
const LOGICAL_SIDES: [&str; 4] = ["block-start", "inline-end", "block-end", "inline-start"];
const LEGACY_SIDES: [&str; 4] = ["before", "end", "after", "start"];

const CORNERS: [&str; 4] = ["top-left", "top-right", "bottom-right", "bottom-left"];

const FONT_STRETCHES: &[&str] = &[
    "ultra-condensed",
    "extra-condensed",
    "condensed",
    "semi-condensed",
    "semi-expanded",
    "expanded",
    "extra-expanded",
    "ultra-expanded",
];

const FONT_SIZES: &[&str] = &[
    "xx-small", "x-small", "small", "medium", "large", "x-large", "xx-large", "smaller", "larger",
];

// Longhands reset by `background`, per layer, with their initial values.
const BACKGROUND_LAYERED: [(&str, &str); 7] = [
    ("background-image", "none"),
    ("background-position", "0% 0%"),
    ("background-size", "auto"),
    ("background-repeat", "repeat"),
    ("background-attachment", "scroll"),
    ("background-origin", "padding-box"),
    ("background-clip", "border-box"),
];

const BORDER_STYLES: &[&str] = &[
    "none", "hidden", "dotted", "dashed", "solid", "double", "groove", "ridge", "inset", "outset",
];

/// Validates against a fixed property list and expands the box and border
/// shorthands into longhands.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultValidator;

impl DefaultValidator {
    fn is_known_longhand(name: &str) -> bool {
        if KNOWN_PROPERTIES.contains(&name) {
            return true;
        }
        let sided = |prefix: &str, suffix: &str| {
            name.strip_prefix(prefix)
                .and_then(|rest| rest.strip_suffix(suffix))
                .is_some_and(|side| {
                    BOX_SIDES.contains(&side)
                        || LOGICAL_SIDES.contains(&side)
                        || LEGACY_SIDES.contains(&side)
                })
        };
        sided("margin-", "")
            || sided("padding-", "")
            || sided("inset-", "")
            || sided("border-", "-width")
            || sided("border-", "-style")
            || sided("border-", "-color")
    }
}

impl PropertyValidator for DefaultValidator {
    fn expand(&self, name: &str, value: &CssValue) -> Result<Vec<(String, CssValue)>, String> {
        let name = name.trim().to_ascii_lowercase();
        if matches!(value, CssValue::Empty) {
            return Err("empty value".to_string());
        }
        if name.starts_with("--") {
            return Ok(vec![(name, value.clone())]);
        }
        match name.as_str() {
            "margin" | "padding" => expand_four(&name, "", value, &BOX_SIDES),
            "inset" => expand_four("", "", value, &BOX_SIDES),
            "border-width" | "border-style" | "border-color" => {
                let suffix = &name["border".len()..];
                expand_four("border", suffix, value, &BOX_SIDES)
            }
            "margin-block" | "padding-block" | "inset-block" => {
                let prefix = &name[..name.len() - "-block".len()];
                expand_pair(prefix, value, "block-start", "block-end")
            }
            "margin-inline" | "padding-inline" | "inset-inline" => {
                let prefix = &name[..name.len() - "-inline".len()];
                expand_pair(prefix, value, "inline-start", "inline-end")
            }
            "border" => {
                let (width, style, color) = split_border(value)?;
                let mut out = Vec::with_capacity(12);
                for side in BOX_SIDES {
                    out.push((format!("border-{side}-width"), width.clone()));
                    out.push((format!("border-{side}-style"), style.clone()));
                    out.push((format!("border-{side}-color"), color.clone()));
                }
                Ok(out)
            }
            "font" | "background" | "border-radius" if is_wide_keyword(value) => {
                let longhands: Vec<String> = match name.as_str() {
                    "font" => FONT_LONGHANDS.iter().map(|n| n.to_string()).collect(),
                    "background" => std::iter::once("background-color")
                        .chain(BACKGROUND_LAYERED.iter().map(|(n, _)| *n))
                        .map(str::to_string)
                        .collect(),
                    _ => CORNERS
                        .iter()
                        .map(|corner| format!("border-{corner}-radius"))
                        .collect(),
                };
                Ok(longhands
                    .into_iter()
                    .map(|longhand| (longhand, value.clone()))
                    .collect())
            }
            "font" => expand_font(value),
            "background" => expand_background(value),
            "border-radius" => expand_radius(value),
            "list-style" => Ok(value
                .items()
                .iter()
                .map(|item| {
                    let target = match item {
                        CssValue::Url(_) => "list-style-image",
                        CssValue::Ident(k)
                            if k.eq_ignore_ascii_case("inside")
                                || k.eq_ignore_ascii_case("outside") =>
                        {
                            "list-style-position"
                        }
                        _ => "list-style-type",
                    };
                    (target.to_string(), item.clone())
                })
                .collect()),
            other => {
                if let Some(side) = other
                    .strip_prefix("border-")
                    .filter(|side| BOX_SIDES.contains(side) || LOGICAL_SIDES.contains(side))
                {
                    let (width, style, color) = split_border(value)?;
                    return Ok(vec![
                        (format!("border-{side}-width"), width),
                        (format!("border-{side}-style"), style),
                        (format!("border-{side}-color"), color),
                    ]);
                }
                if Self::is_known_longhand(other) {
                    Ok(vec![(other.to_string(), value.clone())])
                } else {
                    Err("unknown property".to_string())
                }
            }
        }
    }
}

fn side_name(prefix: &str, side: &str, suffix: &str) -> String {
    if prefix.is_empty() {
        format!("{side}{suffix}")
    } else {
        format!("{prefix}-{side}{suffix}")
    }
}

fn expand_four(
    prefix: &str,
    suffix: &str,
    value: &CssValue,
    sides: &[&str; 4],
) -> Result<Vec<(String, CssValue)>, String> {
    let items = value.items();
    let [top, right, bottom, left] = match items {
        [all] => [all, all, all, all],
        [v, h] => [v, h, v, h],
        [t, h, b] => [t, h, b, h],
        [t, r, b, l] => [t, r, b, l],
        _ => return Err("expected one to four values".to_string()),
    };
    Ok(sides
        .iter()
        .zip([top, right, bottom, left])
        .map(|(side, v)| (side_name(prefix, side, suffix), v.clone()))
        .collect())
}

fn expand_pair(
    prefix: &str,
    value: &CssValue,
    start: &str,
    end: &str,
) -> Result<Vec<(String, CssValue)>, String> {
    let (first, second) = match value.items() {
        [both] => (both, both),
        [first, second] => (first, second),
        _ => return Err("expected one or two values".to_string()),
    };
    Ok(vec![
        (side_name(prefix, start, ""), first.clone()),
        (side_name(prefix, end, ""), second.clone()),
    ])
}

fn split_border(value: &CssValue) -> Result<(CssValue, CssValue, CssValue), String> {
    let mut width = None;
    let mut style = None;
    let mut color = None;
    for item in value.items() {
        let slot = match item {
            CssValue::Numeric { .. } | CssValue::Number(_) => &mut width,
            CssValue::Ident(k) if matches!(k.as_str(), "thin" | "medium" | "thick") => &mut width,
            CssValue::Ident(k) if BORDER_STYLES.contains(&k.as_str()) => &mut style,
            _ => &mut color,
        };
        if slot.is_some() {
            return Err("repeated border component".to_string());
        }
        *slot = Some(item.clone());
    }
    Ok((
        width.unwrap_or_else(|| CssValue::ident("medium")),
        style.unwrap_or_else(|| CssValue::ident("none")),
        color.unwrap_or_else(|| CssValue::ident("currentcolor")),
    ))
}

fn is_wide_keyword(value: &CssValue) -> bool {
    matches!(value.items(), [only] if ["inherit", "initial", "unset", "revert"]
        .iter()
        .any(|keyword| only.is_ident(keyword)))
}

const FONT_LONGHANDS: [&str; 7] = [
    "font-style",
    "font-variant",
    "font-weight",
    "font-stretch",
    "font-size",
    "line-height",
    "font-family",
];

// `[style || variant || weight || stretch]? size [/ line-height]? family#`
fn expand_font(value: &CssValue) -> Result<Vec<(String, CssValue)>, String> {
    let Some((first, other_families)) = value.comma_items().split_first() else {
        return Err("empty font".to_string());
    };
    let items = first.items();
    let mut style = None;
    let mut variant = None;
    let mut weight = None;
    let mut stretch = None;
    let mut size = None;
    let mut idx = 0;
    while idx < items.len() {
        let item = &items[idx];
        idx += 1;
        let slot = match item {
            CssValue::Ident(keyword) => match keyword.to_ascii_lowercase().as_str() {
                "normal" => continue,
                "italic" | "oblique" => &mut style,
                "small-caps" => &mut variant,
                "bold" | "bolder" | "lighter" => &mut weight,
                other if FONT_STRETCHES.contains(&other) => &mut stretch,
                other if FONT_SIZES.contains(&other) => {
                    size = Some(item.clone());
                    break;
                }
                _ => return Err("font needs a size before the family".to_string()),
            },
            CssValue::Number(num) if (1.0..=1000.0).contains(num) => &mut weight,
            CssValue::Numeric { .. } => {
                size = Some(item.clone());
                break;
            }
            _ => return Err("unexpected font component".to_string()),
        };
        if slot.is_some() {
            return Err("repeated font component".to_string());
        }
        *slot = Some(item.clone());
    }
    let size = size.ok_or_else(|| "font needs a size".to_string())?;
    let mut line_height = None;
    if items.get(idx).is_some_and(|item| item.is_ident("/")) {
        line_height = Some(
            items
                .get(idx + 1)
                .cloned()
                .ok_or_else(|| "missing line-height after '/'".to_string())?,
        );
        idx += 2;
    }
    let mut families = Vec::with_capacity(other_families.len() + 1);
    match &items[idx..] {
        [] => {}
        [one] => families.push(one.clone()),
        many => families.push(CssValue::SpaceList(many.to_vec())),
    }
    families.extend(other_families.iter().cloned());
    let family = match families.len() {
        0 => return Err("font needs a family".to_string()),
        1 => families.remove(0),
        _ => CssValue::CommaList(families),
    };
    let normal = || CssValue::ident("normal");
    let values = [
        style.unwrap_or_else(normal),
        variant.unwrap_or_else(normal),
        weight.unwrap_or_else(normal),
        stretch.unwrap_or_else(normal),
        size,
        line_height.unwrap_or_else(normal),
        family,
    ];
    Ok(FONT_LONGHANDS
        .iter()
        .map(|name| name.to_string())
        .zip(values)
        .collect())
}

fn space_or_default(mut items: Vec<CssValue>, default: &str) -> CssValue {
    match items.len() {
        0 => CssValue::parse(default),
        1 => items.remove(0),
        _ => CssValue::SpaceList(items),
    }
}

fn is_background_size(item: &CssValue) -> bool {
    match item {
        CssValue::Numeric { .. } | CssValue::Number(_) => true,
        CssValue::Ident(keyword) => matches!(
            keyword.to_ascii_lowercase().as_str(),
            "auto" | "cover" | "contain"
        ),
        _ => false,
    }
}

// One entry per `BACKGROUND_LAYERED` longhand, plus the layer's color.
fn background_layer(layer: &CssValue) -> Result<([CssValue; 7], Option<CssValue>), String> {
    let mut image = None;
    let mut attachment = None;
    let mut color = None;
    let mut position = Vec::new();
    let mut size = Vec::new();
    let mut repeat = Vec::new();
    let mut boxes = Vec::new();
    let mut in_size = false;
    for item in layer.items() {
        if item.is_ident("/") {
            if position.is_empty() {
                return Err("background-size needs a position".to_string());
            }
            in_size = true;
            continue;
        }
        if in_size && is_background_size(item) {
            size.push(item.clone());
            continue;
        }
        in_size = false;
        let slot = match item {
            CssValue::Url(_) => &mut image,
            CssValue::Func { name, .. } if name.to_ascii_lowercase().ends_with("gradient") => {
                &mut image
            }
            CssValue::Numeric { .. } | CssValue::Number(_) => {
                position.push(item.clone());
                continue;
            }
            CssValue::Ident(keyword) => match keyword.to_ascii_lowercase().as_str() {
                "none" => &mut image,
                "repeat" | "repeat-x" | "repeat-y" | "no-repeat" | "space" | "round" => {
                    repeat.push(item.clone());
                    continue;
                }
                "scroll" | "fixed" | "local" => &mut attachment,
                "border-box" | "padding-box" | "content-box" => {
                    boxes.push(item.clone());
                    continue;
                }
                "left" | "right" | "top" | "bottom" | "center" => {
                    position.push(item.clone());
                    continue;
                }
                _ => &mut color,
            },
            _ => &mut color,
        };
        if slot.is_some() {
            return Err("repeated background component".to_string());
        }
        *slot = Some(item.clone());
    }
    if boxes.len() > 2 || repeat.len() > 2 {
        return Err("too many background keywords".to_string());
    }
    let origin = boxes.first().cloned();
    let clip = boxes.get(1).cloned().or_else(|| origin.clone());
    let layer = [
        image.unwrap_or_else(|| CssValue::ident("none")),
        space_or_default(position, "0% 0%"),
        space_or_default(size, "auto"),
        space_or_default(repeat, "repeat"),
        attachment.unwrap_or_else(|| CssValue::ident("scroll")),
        origin.unwrap_or_else(|| CssValue::ident("padding-box")),
        clip.unwrap_or_else(|| CssValue::ident("border-box")),
    ];
    Ok((layer, color))
}

fn expand_background(value: &CssValue) -> Result<Vec<(String, CssValue)>, String> {
    let layers = value.comma_items();
    let mut columns: Vec<Vec<CssValue>> = vec![Vec::with_capacity(layers.len()); 7];
    let mut color = None;
    for (index, layer) in layers.iter().enumerate() {
        let (values, layer_color) = background_layer(layer)?;
        if layer_color.is_some() {
            if index + 1 != layers.len() {
                return Err("only the final background layer may set a color".to_string());
            }
            color = layer_color;
        }
        for (column, value) in columns.iter_mut().zip(values) {
            column.push(value);
        }
    }
    if layers.is_empty() {
        return Err("empty background".to_string());
    }
    let mut out = vec![(
        "background-color".to_string(),
        color.unwrap_or_else(|| CssValue::ident("transparent")),
    )];
    for ((name, _), mut column) in BACKGROUND_LAYERED.iter().zip(columns) {
        let value = if column.len() == 1 {
            column.remove(0)
        } else {
            CssValue::CommaList(column)
        };
        out.push((name.to_string(), value));
    }
    Ok(out)
}

fn four_corners(items: &[CssValue]) -> Result<[CssValue; 4], String> {
    let corners = match items {
        [all] => [all, all, all, all],
        [a, b] => [a, b, a, b],
        [a, b, c] => [a, b, c, b],
        [a, b, c, d] => [a, b, c, d],
        _ => return Err("expected one to four radii".to_string()),
    };
    Ok(corners.map(CssValue::clone))
}

// `h{1,4} [/ v{1,4}]?`; an elliptical corner keeps both radii.
fn expand_radius(value: &CssValue) -> Result<Vec<(String, CssValue)>, String> {
    let items = value.items();
    let empty: &[CssValue] = &[];
    let (horizontal, vertical) = match items.iter().position(|item| item.is_ident("/")) {
        Some(at) => (&items[..at], &items[at + 1..]),
        None => (items, empty),
    };
    let horizontal = four_corners(horizontal)?;
    let vertical = if vertical.is_empty() {
        None
    } else {
        Some(four_corners(vertical)?)
    };
    Ok(CORNERS
        .iter()
        .enumerate()
        .map(|(idx, corner)| {
            let h = horizontal[idx].clone();
            let radius = match &vertical {
                Some(v) if v[idx] != h => CssValue::SpaceList(vec![h, v[idx].clone()]),
                _ => h,
            };
            (format!("border-{corner}-radius"), radius)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(name: &str, value: &str) -> Result<Vec<(String, String)>, String> {
        DefaultValidator
            .expand(name, &CssValue::parse(value))
            .map(|list| list.into_iter().map(|(n, v)| (n, v.to_string())).collect())
    }

    #[test]
    fn margin_shorthand_uses_box_order() {
        let out = expand("margin", "1px 2px 3px").expect("valid");
        assert_eq!(
            out,
            vec![
                ("margin-top".to_string(), "1px".to_string()),
                ("margin-right".to_string(), "2px".to_string()),
                ("margin-bottom".to_string(), "3px".to_string()),
                ("margin-left".to_string(), "2px".to_string()),
            ]
        );
        assert!(expand("margin", "1px 2px 3px 4px 5px").is_err());
    }

    #[test]
    fn border_shorthand_fills_defaults() {
        let out = expand("border-top", "solid red").expect("valid");
        assert_eq!(out[0], ("border-top-width".to_string(), "medium".to_string()));
        assert_eq!(out[1], ("border-top-style".to_string(), "solid".to_string()));
        assert_eq!(out[2], ("border-top-color".to_string(), "red".to_string()));
        assert_eq!(expand("border", "1px solid").expect("valid").len(), 12);
        assert!(expand("border", "1px 2px").is_err());
    }

    #[test]
    fn logical_pairs_expand() {
        let out = expand("margin-inline", "1em 2em").expect("valid");
        assert_eq!(out[0].0, "margin-inline-start");
        assert_eq!(out[1].0, "margin-inline-end");
        assert_eq!(expand("inset-block", "0").expect("valid")[0].0, "inset-block-start");
    }

    #[test]
    fn font_shorthand_sets_every_longhand() {
        let out = expand("font", "bold 12px serif").expect("valid");
        let get = |name: &str| {
            out.iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone())
                .expect(name)
        };
        assert_eq!(out.len(), 7);
        assert_eq!(get("font-weight"), "bold");
        assert_eq!(get("font-size"), "12px");
        assert_eq!(get("font-family"), "serif");
        assert_eq!(get("font-style"), "normal");
        assert_eq!(get("line-height"), "normal");

        let out = expand("font", "italic small-caps 700 1.2em/1.5 Times New Roman, serif")
            .expect("valid");
        assert_eq!(out[0].1, "italic");
        assert_eq!(out[1].1, "small-caps");
        assert_eq!(out[2].1, "700");
        assert_eq!(out[4].1, "1.2em");
        assert_eq!(out[5].1, "1.5");
        assert_eq!(out[6].1, "Times New Roman, serif");

        assert!(expand("font", "bold serif").is_err());
        assert!(expand("font", "12px").is_err());
        assert!(expand("font", "inherit").expect("valid").iter().all(|(_, v)| v == "inherit"));
    }

    #[test]
    fn background_shorthand_resets_layers() {
        let out = expand("background", "red").expect("valid");
        assert_eq!(out[0], ("background-color".to_string(), "red".to_string()));
        assert_eq!(out[1], ("background-image".to_string(), "none".to_string()));
        assert_eq!(out[4], ("background-repeat".to_string(), "repeat".to_string()));
        assert_eq!(out.len(), 8);

        let out = expand("background", "url(a.png) no-repeat center / cover, green")
            .expect("valid");
        let get = |name: &str| {
            out.iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone())
                .expect(name)
        };
        assert_eq!(get("background-color"), "green");
        assert_eq!(get("background-repeat"), "no-repeat, repeat");
        assert_eq!(get("background-position"), "center, 0% 0%");
        assert_eq!(get("background-size"), "cover, auto");

        assert!(expand("background", "red, url(a.png)").is_err());
    }

    #[test]
    fn border_radius_fills_corners() {
        let out = expand("border-radius", "4px 8px").expect("valid");
        assert_eq!(out[0], ("border-top-left-radius".to_string(), "4px".to_string()));
        assert_eq!(out[1], ("border-top-right-radius".to_string(), "8px".to_string()));
        assert_eq!(out[2], ("border-bottom-right-radius".to_string(), "4px".to_string()));
        let out = expand("border-radius", "4px / 2px").expect("valid");
        assert_eq!(out[3].1, "4px 2px");
        assert!(expand("border-radius", "1px 2px 3px 4px 5px").is_err());
    }

    #[test]
    fn unknown_properties_are_rejected_and_custom_ones_kept() {
        assert!(expand("vendor-unknown-prop", "12px").is_err());
        assert_eq!(expand("--accent", "red").expect("valid")[0].0, "--accent");
        assert_eq!(expand("COLOR", "red").expect("valid")[0].0, "color");
        assert_eq!(expand("border-inline-start-width", "2px").expect("valid").len(), 1);
    }
}
