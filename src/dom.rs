use kuchiki::NodeRef;

use crate::instance::CascadeInstance;
use crate::selector::{EPUB_NS, XML_NS};
use crate::style::ElementStyle;

/// Read-only view of a document element, as the cascade needs it.
/// `ns` is `""` for attributes without a namespace.
pub trait StyledElement: Clone {
    fn namespace(&self) -> String;

    fn local_name(&self) -> String;

    fn attribute(&self, ns: &str, name: &str) -> Option<String>;

    fn parent_element(&self) -> Option<Self>;

    fn first_child_element(&self) -> Option<Self>;

    fn next_sibling_element(&self) -> Option<Self>;

    /// True when the element has any element or text child (`:empty` is the
    /// negation).
    fn has_child_content(&self) -> bool;

    /// Looks up an element of the same document by `id`.
    fn element_by_id(&self, id: &str) -> Option<Self>;
}

fn is_element(node: &NodeRef) -> bool {
    node.as_element().is_some()
}

// HTML parsing keeps `epub:type` and `xml:lang` as plain prefixed names.
fn prefixed_fallback(ns: &str, name: &str) -> Option<String> {
    match ns {
        EPUB_NS => Some(format!("epub:{name}")),
        XML_NS => Some(format!("xml:{name}")),
        _ => None,
    }
}

impl StyledElement for NodeRef {
    fn namespace(&self) -> String {
        self.as_element()
            .map(|element| element.name.ns.as_ref().to_string())
            .unwrap_or_default()
    }

    fn local_name(&self) -> String {
        self.as_element()
            .map(|element| element.name.local.as_ref().to_string())
            .unwrap_or_default()
    }

    fn attribute(&self, ns: &str, name: &str) -> Option<String> {
        let element = self.as_element()?;
        let attrs = element.attributes.borrow();
        if ns.is_empty() {
            return attrs.get(name).map(str::to_string);
        }
        let exact = attrs
            .map
            .iter()
            .find(|(key, _)| key.ns.as_ref() == ns && key.local.as_ref() == name)
            .map(|(_, attr)| attr.value.clone());
        exact.or_else(|| {
            let prefixed = prefixed_fallback(ns, name)?;
            attrs.get(prefixed.as_str()).map(str::to_string)
        })
    }

    fn parent_element(&self) -> Option<Self> {
        self.parent().filter(is_element)
    }

    fn first_child_element(&self) -> Option<Self> {
        self.children().find(is_element)
    }

    fn next_sibling_element(&self) -> Option<Self> {
        self.following_siblings().find(is_element)
    }

    fn has_child_content(&self) -> bool {
        self.children().any(|child| {
            is_element(&child)
                || child
                    .as_text()
                    .is_some_and(|text| !text.borrow().is_empty())
        })
    }

    fn element_by_id(&self, id: &str) -> Option<Self> {
        let root = self.ancestors().last().unwrap_or_else(|| self.clone());
        root.inclusive_descendants().find(|node| {
            node.as_element()
                .is_some_and(|element| element.attributes.borrow().get("id") == Some(id))
        })
    }
}

impl StyledElement for roxmltree::Node<'_, '_> {
    fn namespace(&self) -> String {
        self.tag_name().namespace().unwrap_or_default().to_string()
    }

    fn local_name(&self) -> String {
        self.tag_name().name().to_string()
    }

    fn attribute(&self, ns: &str, name: &str) -> Option<String> {
        let value = if ns.is_empty() {
            roxmltree::Node::attribute(self, name)
        } else {
            roxmltree::Node::attribute(self, (ns, name))
        };
        value.map(str::to_string)
    }

    fn parent_element(&self) -> Option<Self> {
        roxmltree::Node::parent_element(self)
    }

    fn first_child_element(&self) -> Option<Self> {
        roxmltree::Node::first_element_child(self)
    }

    fn next_sibling_element(&self) -> Option<Self> {
        roxmltree::Node::next_sibling_element(self)
    }

    fn has_child_content(&self) -> bool {
        self.children()
            .any(|child| child.is_element() || child.text().is_some_and(|text| !text.is_empty()))
    }

    fn element_by_id(&self, id: &str) -> Option<Self> {
        self.document().descendants().find(|node| {
            node.is_element() && roxmltree::Node::attribute(node, "id") == Some(id)
        })
    }
}

/// Depth-first walk of `root` and its element descendants. `base` supplies
/// each element's starting style (inline declarations); `visit` receives the
/// finished style once the element and its subtree have been left.
pub fn style_tree<E: StyledElement>(
    instance: &mut CascadeInstance<'_, E>,
    root: &E,
    base: &mut dyn FnMut(&E) -> ElementStyle,
    visit: &mut dyn FnMut(&E, ElementStyle),
) {
    // Explicit stack: (element, style, next child to enter).
    let mut stack: Vec<(E, ElementStyle)> = Vec::new();
    let mut offset = 0usize;
    let mut next = Some(root.clone());
    loop {
        if let Some(element) = next.take() {
            let mut style = base(&element);
            instance.push_element(&element, &mut style, offset);
            offset += 1;
            next = element.first_child_element();
            stack.push((element, style));
            continue;
        }
        let Some((element, mut style)) = stack.pop() else {
            break;
        };
        instance.pop_element(&element, &mut style);
        if stack.is_empty() {
            visit(&element, style);
            break;
        }
        next = element.next_sibling_element();
        visit(&element, style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuchiki::traits::TendrilSink;

    use crate::selector::XHTML_NS;

    fn first_by_tag(root: &NodeRef, tag: &str) -> NodeRef {
        root.inclusive_descendants()
            .find(|node| {
                node.as_element()
                    .is_some_and(|element| element.name.local.as_ref() == tag)
            })
            .expect("element")
    }

    #[test]
    fn kuchiki_adapter_reads_prefixed_attributes() {
        let doc = kuchiki::parse_html().one(
            "<html lang=\"en\"><body><aside epub:type=\"footnote\" xml:lang=\"fr\" id=\"n1\"></aside>\
             <p><a href=\"#n1\">1</a></p></body></html>",
        );
        let aside = first_by_tag(&doc, "aside");
        assert_eq!(aside.namespace(), XHTML_NS);
        assert_eq!(aside.local_name(), "aside");
        assert_eq!(aside.attribute(EPUB_NS, "type").as_deref(), Some("footnote"));
        assert_eq!(aside.attribute(XML_NS, "lang").as_deref(), Some("fr"));
        assert!(!aside.has_child_content());
        let link = first_by_tag(&doc, "a");
        let target = link.element_by_id("n1").expect("target");
        assert_eq!(target.local_name(), "aside");
        let p = link.parent_element().expect("parent");
        assert_eq!(p.local_name(), "p");
        assert!(p.has_child_content());
        assert_eq!(aside.next_sibling_element().map(|n| n.local_name()), Some("p".to_string()));
    }

    #[test]
    fn roxmltree_adapter_uses_real_namespaces() {
        let xml = "<html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\">\
                   <body><section epub:type=\"chapter\" id=\"c1\"><h1>T</h1><p/></section></body></html>";
        let doc = roxmltree::Document::parse(xml).expect("xml");
        let root = doc.root_element();
        assert_eq!(root.namespace(), XHTML_NS);
        let body = StyledElement::first_child_element(&root).expect("body");
        let section = StyledElement::first_child_element(&body).expect("section");
        assert_eq!(
            StyledElement::attribute(&section, EPUB_NS, "type").as_deref(),
            Some("chapter")
        );
        let h1 = StyledElement::first_child_element(&section).expect("h1");
        let p = StyledElement::next_sibling_element(&h1).expect("p");
        assert!(h1.has_child_content());
        assert!(!p.has_child_content());
        assert_eq!(
            p.element_by_id("c1").map(|n| StyledElement::local_name(&n)),
            Some("section".to_string())
        );
    }
}
