use lightningcss::media_query::{MediaList, MediaType, Qualifier};
use lightningcss::properties::Property;
use lightningcss::rules::{CssRule, CssRuleList};
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleAttribute, StyleSheet};
use lightningcss::traits::ToCss;

use crate::compiler::StyleCompiler;
use crate::error::CascadeError;
use crate::selector_text::replay_selector_list;
use crate::style::CascadeValue;
use crate::types::Origin;
use crate::value::CssValue;

fn parser_options<'i>() -> ParserOptions<'i> {
    ParserOptions {
        error_recovery: true,
        ..ParserOptions::default()
    }
}

/// Parses `css` with lightningcss and compiles every style, page and
/// print-applicable media rule at `origin`.
pub fn compile_stylesheet(
    css: &str,
    origin: Origin,
    compiler: &mut StyleCompiler<'_>,
) -> Result<(), CascadeError> {
    if css.trim().is_empty() {
        return Ok(());
    }
    let sheet = StyleSheet::parse(css, parser_options())
        .map_err(|err| CascadeError::Stylesheet(err.to_string()))?;
    compiler.begin_stylesheet(origin);
    compile_rules(&sheet.rules, compiler);
    Ok(())
}

fn compile_rules(rules: &CssRuleList, compiler: &mut StyleCompiler<'_>) {
    for rule in &rules.0 {
        match rule {
            CssRule::Style(style) => {
                let selectors = style
                    .selectors
                    .to_css_string(PrinterOptions::default())
                    .unwrap_or_default();
                replay_selector_list(&selectors, compiler);
                declare_block(&style.declarations, compiler);
                compiler.end_rule();
            }
            CssRule::Media(media) => {
                if media_applies_to_print(&media.query) {
                    compile_rules(&media.rules, compiler);
                }
            }
            CssRule::Page(page) => {
                if page.selectors.is_empty() {
                    compiler.page_rule(None, &[]);
                    compiler.next_selector();
                }
                for selector in &page.selectors {
                    let name = selector.name.as_ref().map(|name| {
                        let name: &str = name;
                        name.to_string()
                    });
                    let text = selector
                        .to_css_string(PrinterOptions::default())
                        .unwrap_or_default();
                    let pseudo_classes: Vec<String> = text
                        .split(':')
                        .skip(1)
                        .map(|pc| pc.trim().to_string())
                        .filter(|pc| !pc.is_empty())
                        .collect();
                    compiler.page_rule(name.as_deref(), &pseudo_classes);
                    compiler.next_selector();
                }
                declare_block(&page.declarations, compiler);
                compiler.end_rule();
            }
            CssRule::Namespace(_) => {
                let text = rule
                    .to_css_string(PrinterOptions::default())
                    .unwrap_or_default();
                if let Some((prefix, uri)) = parse_namespace_rule(&text) {
                    compiler.namespace(prefix.as_deref(), &uri);
                }
            }
            _ => {}
        }
    }
}

fn declare_block(
    block: &lightningcss::declaration::DeclarationBlock,
    compiler: &mut StyleCompiler<'_>,
) {
    for property in &block.declarations {
        declare_property(property, false, compiler);
    }
    for property in &block.important_declarations {
        declare_property(property, true, compiler);
    }
}

fn declare_property(property: &Property, important: bool, compiler: &mut StyleCompiler<'_>) {
    let id = property.property_id();
    let Ok(value) = property.value_to_css_string(PrinterOptions::default()) else {
        return;
    };
    compiler.property(id.name(), &value, important);
}

// Paged output: print and all apply, screen-only does not. Feature
// conditions are not evaluated.
fn media_applies_to_print(list: &MediaList) -> bool {
    if list.media_queries.is_empty() {
        return true;
    }
    list.media_queries.iter().any(|query| {
        let typed = matches!(query.media_type, MediaType::All | MediaType::Print);
        match query.qualifier {
            Some(Qualifier::Not) => !typed,
            _ => typed,
        }
    })
}

// `@namespace [prefix] "uri" | url(uri);`
fn parse_namespace_rule(text: &str) -> Option<(Option<String>, String)> {
    let body = text
        .trim()
        .strip_prefix("@namespace")?
        .trim()
        .trim_end_matches(';');
    let value = CssValue::parse(body);
    let uri_of = |value: &CssValue| match value {
        CssValue::Str(uri) | CssValue::Url(uri) => Some(uri.clone()),
        _ => None,
    };
    match value.items() {
        [uri] => Some((None, uri_of(uri)?)),
        [CssValue::Ident(prefix), uri] => Some((Some(prefix.clone()), uri_of(uri)?)),
        _ => None,
    }
}

/// Compiles an inline `style` attribute into declarations stamped at the
/// style-attribute band. No selector matching is involved.
pub fn parse_style_attribute(
    text: &str,
    compiler: &mut StyleCompiler<'_>,
) -> Vec<(String, CascadeValue)> {
    compiler.origin(Origin::StyleAttribute);
    if let Ok(attribute) = StyleAttribute::parse(text, parser_options()) {
        declare_block(&attribute.declarations, compiler);
    }
    compiler.take_inline()
}

pub(crate) fn default_ua_css() -> &'static str {
    r#"
    @namespace epub "http://www.idpf.org/2007/ops";
    html, body, div, p, section, article, header, footer, aside, nav, main, blockquote,
    h1, h2, h3, h4, h5, h6, ul, ol, dl, dt, dd, figure, figcaption, pre, hr, address { display: block; }
    head, script, style, title, meta, link { display: none; }
    li { display: list-item; }
    table { display: table; }
    tr { display: table-row; }
    td, th { display: table-cell; }
    body { margin: 8px; }
    h1 { font-size: 2em; }
    h2 { font-size: 1.5em; }
    h3 { font-size: 1.17em; }
    h5 { font-size: 0.83em; }
    h6 { font-size: 0.67em; }
    b, strong, th { font-weight: bold; }
    i, em, cite, var { font-style: italic; }
    pre, code, kbd, samp { white-space: pre; }
    ol { list-style-type: decimal; }
    ul { list-style-type: disc; }
    ul ul, ol ul { list-style-type: circle; }
    q::before { content: open-quote; }
    q::after { content: close-quote; }
    aside[epub|type~="footnote"] { float: footnote; }
    *::footnote-call { content: counter(footnote); }
    *::footnote-marker { content: counter(footnote) ". "; }
    "#
}
