mod cascade;
mod combinator;
mod compiler;
mod counters;
mod debug;
mod dom;
mod error;
mod instance;
mod logical;
mod numbering;
mod properties;
mod selector;
mod selector_text;
mod style;
mod stylesheet;
mod types;
mod value;
mod view;

pub use cascade::{Cascade, CompileContext, UNIVERSAL_KEY};
pub use compiler::{PSEUDO_ELEMENTS, StyleCompiler};
pub use counters::{CounterListener, CounterResolver, CounterState, QuoteState, counter_pairs};
use debug::{DebugLogger, json_string};
pub use dom::{StyledElement, style_tree};
pub use error::CascadeError;
pub use instance::{CascadeInstance, LIST_ITEM_COUNTER};
pub use logical::{convert_to_physical, physical_name};
pub use numbering::format_counter;
pub use properties::{DefaultValidator, PropertyValidator};
pub use selector::{
    Action, ApplyRule, AttrOp, Chain, CombinatorKind, EPUB_NS, IndexName, Predicate,
    SVG_NS, XHTML_NS, XML_NS, nth_matches, parse_nth_formula,
};
pub use selector_text::replay_selector_list;
pub use style::{
    CascadeValue, ConditionId, ElementStyle, SPECIAL_PROPERTIES, ViewConditionalStyle,
    cascade_values, evaluate_style, flatten_cascaded_style, is_special, merge_in,
};
pub use stylesheet::{compile_stylesheet, parse_style_attribute};
pub use types::{Order, Origin, Priority, SPECIFICITY_CLASS, SPECIFICITY_ID, SPECIFICITY_TAG};
pub use value::{CssValue, DeferredValue, FixedContext, ValueContext};
pub use view::{
    AllMatcher, DefaultViewConditionBuilder, FragmentContext, NthFragmentMatcher, ViewCondition,
    ViewConditionBuilder, ViewConditionMatcher,
};

use std::sync::Arc;

/// Compiled base cascade (user agent and user sheets) plus the collaborators
/// used for every author compilation.
pub struct StyleEngine {
    base: Cascade,
    base_context: CompileContext,
    validator: Box<dyn PropertyValidator>,
    views: Box<dyn ViewConditionBuilder>,
    default_lang: String,
    debug: Option<Arc<DebugLogger>>,
}

pub struct StyleEngineBuilder {
    user_agent_sheet: bool,
    sheets: Vec<(String, String)>,
    default_lang: String,
    debug_path: Option<std::path::PathBuf>,
    validator: Option<Box<dyn PropertyValidator>>,
    views: Option<Box<dyn ViewConditionBuilder>>,
}

impl StyleEngineBuilder {
    pub fn new() -> Self {
        Self {
            user_agent_sheet: true,
            sheets: Vec::new(),
            default_lang: "en".to_string(),
            debug_path: None,
            validator: None,
            views: None,
        }
    }

    // Compile the bundled user agent sheet into the base cascade.
    pub fn user_agent_sheet(mut self, enabled: bool) -> Self {
        self.user_agent_sheet = enabled;
        self
    }

    pub fn user_css(mut self, css: impl Into<String>) -> Self {
        self.sheets.push(("user".to_string(), css.into()));
        self
    }

    /// Adds a base stylesheet at a named origin (`ua`, `user`, `author`).
    pub fn origin_css(mut self, origin: impl Into<String>, css: impl Into<String>) -> Self {
        self.sheets.push((origin.into(), css.into()));
        self
    }

    // Language for elements without `lang`/`xml:lang` up the tree.
    pub fn default_lang(mut self, lang: impl Into<String>) -> Self {
        self.default_lang = lang.into();
        self
    }

    // Enable debug logging to a JSONL file for selector/declaration inspection.
    pub fn debug_log(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn validator(mut self, validator: Box<dyn PropertyValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn view_condition_builder(mut self, views: Box<dyn ViewConditionBuilder>) -> Self {
        self.views = Some(views);
        self
    }

    pub fn build(self) -> Result<StyleEngine, CascadeError> {
        let lang = self.default_lang.trim().to_ascii_lowercase();
        if lang.is_empty() || lang.contains(char::is_whitespace) {
            return Err(CascadeError::InvalidConfiguration(format!(
                "default_lang must be a single language tag, got {:?}",
                self.default_lang
            )));
        }
        let mut sheets = Vec::with_capacity(self.sheets.len() + 1);
        if self.user_agent_sheet {
            sheets.push((Origin::UserAgent, stylesheet::default_ua_css().to_string()));
        }
        for (name, css) in self.sheets {
            let origin = match Origin::parse(&name) {
                Some(Origin::StyleAttribute) | None => {
                    return Err(CascadeError::InvalidConfiguration(format!(
                        "unknown stylesheet origin {name:?}"
                    )));
                }
                Some(origin) => origin,
            };
            sheets.push((origin, css));
        }
        let debug = if let Some(path) = self.debug_path {
            Some(Arc::new(DebugLogger::new(path)?))
        } else {
            None
        };
        let validator = self.validator.unwrap_or_else(|| Box::new(DefaultValidator));
        let views = self
            .views
            .unwrap_or_else(|| Box::new(DefaultViewConditionBuilder));

        let mut base = Cascade::new();
        let mut base_context = CompileContext::new();
        {
            let mut compiler =
                StyleCompiler::new(&mut base, &mut base_context, validator.as_ref(), views.as_ref())
                    .with_logger(debug.as_deref());
            for (origin, css) in &sheets {
                compile_stylesheet(css, *origin, &mut compiler)?;
            }
        }
        if let Some(logger) = &debug {
            logger.log_json(&format!(
                "{{\"type\":\"cascade.base\",\"sheets\":{},\"chains\":{}}}",
                sheets.len(),
                base.rule_count()
            ));
        }
        Ok(StyleEngine {
            base,
            base_context,
            validator,
            views,
            default_lang: lang,
            debug,
        })
    }
}

impl Default for StyleEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleEngine {
    pub fn builder() -> StyleEngineBuilder {
        StyleEngineBuilder::new()
    }

    /// Fresh copy of the base cascade and a context that continues its
    /// condition numbering, for callers that drive `StyleCompiler` directly.
    pub fn begin_compilation(&self) -> (Cascade, CompileContext) {
        (
            self.base.clone(),
            CompileContext::continuing(&self.base_context),
        )
    }

    pub fn compiler<'c>(
        &'c self,
        cascade: &'c mut Cascade,
        context: &'c mut CompileContext,
    ) -> StyleCompiler<'c> {
        StyleCompiler::new(cascade, context, self.validator.as_ref(), self.views.as_ref())
            .with_logger(self.debug.as_deref())
    }

    /// Compiles an author stylesheet on top of the base cascade. The base is
    /// left untouched.
    pub fn compile(&self, css: &str) -> Result<Cascade, CascadeError> {
        let (mut cascade, mut context) = self.begin_compilation();
        {
            let mut compiler = self.compiler(&mut cascade, &mut context);
            compile_stylesheet(css, Origin::Author, &mut compiler)?;
        }
        if let Some(logger) = &self.debug {
            logger.log_json(&format!(
                "{{\"type\":\"css.stylesheet\",\"origin\":{},\"chains\":{}}}",
                json_string("author"),
                cascade.rule_count()
            ));
        }
        Ok(cascade)
    }

    /// Evaluator for one walk over one document. `lang` overrides the
    /// configured default language.
    pub fn create_instance<'a, E: StyledElement>(
        &'a self,
        cascade: &'a Cascade,
        listener: Option<&'a mut dyn CounterListener>,
        resolver: Option<&'a dyn CounterResolver>,
        lang: Option<&str>,
    ) -> CascadeInstance<'a, E> {
        let lang = lang.unwrap_or(&self.default_lang);
        CascadeInstance::new(cascade, self.views.as_ref(), listener, resolver, lang)
            .with_logger(self.debug.clone())
    }

    /// Declarations of an inline `style` attribute, as an element's starting
    /// style.
    pub fn parse_style_attribute(&self, text: &str) -> ElementStyle {
        let mut scratch = Cascade::new();
        let mut context = CompileContext::new();
        let declarations = {
            let mut compiler = self.compiler(&mut scratch, &mut context);
            parse_style_attribute(text, &mut compiler)
        };
        let mut style = ElementStyle::new();
        merge_in(&mut style, &declarations, &|_| true);
        style
    }

    /// Walks `root` with `instance`, seeding each element with its inline
    /// style and handing every finished style to `visit`.
    pub fn style_tree<E: StyledElement>(
        &self,
        instance: &mut CascadeInstance<'_, E>,
        root: &E,
        visit: &mut dyn FnMut(&E, ElementStyle),
    ) {
        let mut base = |element: &E| {
            element
                .attribute("", "style")
                .map(|text| self.parse_style_attribute(&text))
                .unwrap_or_default()
        };
        style_tree(instance, root, &mut base, visit);
    }

    pub fn flush_debug(&self) {
        if let Some(logger) = &self.debug {
            logger.emit_summary("cascade");
            logger.flush();
        }
    }
}

impl Drop for StyleEngine {
    fn drop(&mut self) {
        self.flush_debug();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuchiki::NodeRef;
    use kuchiki::traits::TendrilSink;

    fn temp_log(label: &str) -> std::path::PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!(
            "pagecascade_{}_{}_{}.jsonl",
            label,
            std::process::id(),
            nanos
        ))
    }

    fn html_root(html: &str) -> NodeRef {
        kuchiki::parse_html()
            .one(html)
            .inclusive_descendants()
            .find(|node| {
                node.as_element()
                    .is_some_and(|element| element.name.local.as_ref() == "html")
            })
            .expect("html element")
    }

    fn styles_by_id(engine: &StyleEngine, css: &str, html: &str) -> Vec<(String, ElementStyle)> {
        let cascade = engine.compile(css).expect("compile");
        let root = html_root(html);
        let mut instance = engine.create_instance(&cascade, None, None, None);
        let mut out = Vec::new();
        engine.style_tree(&mut instance, &root, &mut |element, style| {
            if let Some(id) = element.attribute("", "id") {
                out.push((id, style));
            }
        });
        out
    }

    fn text(styles: &[(String, ElementStyle)], id: &str, property: &str) -> Option<String> {
        styles
            .iter()
            .find(|(own, _)| own == id)
            .and_then(|(_, style)| style.get(property))
            .map(|value| value.to_string())
    }

    #[test]
    fn odd_children_are_green() {
        let engine = StyleEngine::builder().build().expect("engine");
        let styles = styles_by_id(
            &engine,
            "p:nth-child(odd) { color: green }",
            "<body><div><p id=p1>a</p><p id=p2>b</p><p id=p3>c</p><p id=p4>d</p><p id=p5>e</p></div></body>",
        );
        let green: Vec<bool> = ["p1", "p2", "p3", "p4", "p5"]
            .iter()
            .map(|id| text(&styles, id, "color").as_deref() == Some("green"))
            .collect();
        assert_eq!(green, vec![true, false, true, false, true]);
    }

    #[test]
    fn origins_and_inline_styles_rank_by_band() {
        let engine = StyleEngine::builder()
            .user_css("p { color: purple !important; margin-top: 3px }")
            .build()
            .expect("engine");
        let styles = styles_by_id(
            &engine,
            "p { color: red; margin-top: 1px } #x { margin-top: 2px }",
            "<body><p id=x style=\"color: blue; margin-top: 9px\"></p><p id=y></p></body>",
        );
        assert_eq!(text(&styles, "x", "color").as_deref(), Some("purple"));
        assert_eq!(text(&styles, "x", "margin-top").as_deref(), Some("9px"));
        assert_eq!(text(&styles, "y", "margin-top").as_deref(), Some("1px"));
    }

    #[test]
    fn user_agent_sheet_supplies_defaults() {
        let engine = StyleEngine::builder().build().expect("engine");
        let styles = styles_by_id(&engine, "", "<body><div id=d></div><span id=s></span></body>");
        assert_eq!(text(&styles, "d", "display").as_deref(), Some("block"));
        assert_eq!(text(&styles, "s", "display"), None);

        let bare = StyleEngine::builder()
            .user_agent_sheet(false)
            .build()
            .expect("engine");
        let styles = styles_by_id(&bare, "", "<body><div id=d></div></body>");
        assert_eq!(text(&styles, "d", "display"), None);
    }

    #[test]
    fn compiling_does_not_touch_the_base_cascade() {
        let engine = StyleEngine::builder().build().expect("engine");
        let before = engine.begin_compilation().0.rule_count();
        let compiled = engine.compile("p { color: red } p em { color: blue }").expect("css");
        assert!(compiled.rule_count() > before);
        assert_eq!(engine.begin_compilation().0.rule_count(), before);
    }

    #[test]
    fn epub_footnotes_in_namespaced_documents() {
        let engine = StyleEngine::builder().build().expect("engine");
        let cascade = engine
            .compile(
                "@namespace epub \"http://www.idpf.org/2007/ops\";\
                 a:href-epub-type(footnote) { color: navy }",
            )
            .expect("css");
        let xml = "<html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\">\
                   <body><p><a id=\"ref\" href=\"#fn\">1</a></p>\
                   <aside id=\"fn\" epub:type=\"footnote\">Note</aside></body></html>";
        let doc = roxmltree::Document::parse(xml).expect("xml");
        let mut instance = engine.create_instance(&cascade, None, None, None);
        let mut seen = Vec::new();
        engine.style_tree(&mut instance, &doc.root_element(), &mut |element, style| {
            if let Some(id) = StyledElement::attribute(element, "", "id") {
                seen.push((id, style));
            }
        });
        assert_eq!(text(&seen, "fn", "float").as_deref(), Some("footnote"));
        assert_eq!(text(&seen, "ref", "color").as_deref(), Some("navy"));
    }

    struct ContinuedFragments;

    impl ViewConditionBuilder for ContinuedFragments {
        fn template(&self, pseudo: &str, args: &[String]) -> Option<ViewCondition> {
            match pseudo {
                "continued" => Some(ViewCondition::NthFragment { a: 1, b: 2 }),
                _ => DefaultViewConditionBuilder.template(pseudo, args),
            }
        }

        fn bind(
            &self,
            condition: ViewCondition,
            offset: usize,
        ) -> std::rc::Rc<dyn ViewConditionMatcher> {
            DefaultViewConditionBuilder.bind(condition, offset)
        }
    }

    #[test]
    fn custom_view_builders_scope_fragment_rules() {
        let engine = StyleEngine::builder()
            .view_condition_builder(Box::new(ContinuedFragments))
            .build()
            .expect("engine");
        let styles = styles_by_id(
            &engine,
            "p::continued { margin-top: 0 } p { margin-top: 4px }",
            "<body><p id=x></p></body>",
        );
        let (_, style) = styles.iter().find(|(id, _)| id == "x").expect("p");
        let first = flatten_cascaded_style(style, &[], false, &FragmentContext::new());
        assert_eq!(first["margin-top"].value.to_string(), "4px");
        // html, head and body come first in document order.
        let later = FragmentContext::new().with_fragment(3, 3);
        let later = flatten_cascaded_style(style, &[], false, &later);
        assert_eq!(later["margin-top"].value.to_string(), "0");
    }

    #[test]
    fn rejects_bad_configuration() {
        let err = StyleEngine::builder()
            .origin_css("style-attribute", "p { color: red }")
            .build()
            .err()
            .expect("error");
        assert!(matches!(err, CascadeError::InvalidConfiguration(_)));
        let err = StyleEngine::builder()
            .default_lang("en us")
            .build()
            .err()
            .expect("error");
        assert!(err.to_string().contains("default_lang"));
    }

    #[test]
    fn debug_log_records_unsupported_selectors_and_dropped_declarations() {
        let path = temp_log("engine");
        {
            let engine = StyleEngine::builder()
                .user_agent_sheet(false)
                .debug_log(&path)
                .build()
                .expect("engine");
            engine
                .compile("p:hover { color: red } p { colour: red; color: blue }")
                .expect("css");
        }
        let log = std::fs::read_to_string(&path).expect("log");
        let _ = std::fs::remove_file(&path);
        assert!(log.contains("\"type\":\"css.selector.unsupported\""));
        assert!(log.contains("\"type\":\"css.declaration.dropped\""));
        assert!(log.contains("\"property\":\"colour\""));
        assert!(log.contains("\"css.declaration_dropped\":1"));
        assert!(log.contains("\"type\":\"cascade.summary\""));
    }

    #[test]
    fn lang_override_reaches_lang_selectors() {
        let engine = StyleEngine::builder()
            .default_lang("de")
            .build()
            .expect("engine");
        let cascade = engine.compile(":lang(ja) p { color: red }").expect("css");
        let root = html_root("<body><p id=p></p></body>");
        let mut with_default = Vec::new();
        let mut instance = engine.create_instance(&cascade, None, None, None);
        engine.style_tree(&mut instance, &root, &mut |element, style| {
            if element.attribute("", "id").is_some() {
                with_default.push(style.get("color").map(|v| v.to_string()));
            }
        });
        assert_eq!(with_default, vec![None]);
        let mut overridden = Vec::new();
        let mut instance = engine.create_instance(&cascade, None, None, Some("ja"));
        engine.style_tree(&mut instance, &root, &mut |element, style| {
            if element.attribute("", "id").is_some() {
                overridden.push(style.get("color").map(|v| v.to_string()));
            }
        });
        assert_eq!(overridden, vec![Some("red".to_string())]);
    }
}
