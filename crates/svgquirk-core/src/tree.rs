//! Owned SVG document tree.
//!
//! The tree is a strict ownership hierarchy: a [`Document`] owns its root [`Element`], and each
//! element exclusively owns its attribute map and child list. There are no parent pointers and
//! no shared node handles, so mutation never aliases and a deep copy is a plain `clone()`.

use crate::{Error, Result};
use indexmap::IndexMap;

pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// A tagged node with ordered attributes and either direct text content or a child list.
///
/// An element whose content is text only holds it in `text` with no children; an element with
/// child elements keeps any interleaved text as [`Node::Text`] children. Accessors that see both
/// at once report [`Error::MalformedDocument`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    name: String,
    attributes: IndexMap<String, String>,
    text: Option<String>,
    children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Qualified tag name as written (`text`, `svg:text`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tag name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map(|(_, local)| local)
            .unwrap_or(&self.name)
    }

    pub fn is(&self, tag: &str) -> bool {
        self.local_name() == tag
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Sets an attribute, keeping its position if it already exists.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Sets an attribute and moves it to the front, where namespace declarations are written.
    pub fn prepend_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.shift_insert(0, name.into(), value.into());
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        self.attributes.shift_remove(name)
    }

    /// Direct text content, `None` when the element has no text of its own.
    pub fn text(&self) -> Result<Option<&str>> {
        self.check()?;
        Ok(self.text.as_deref())
    }

    /// Replaces the direct text content. An empty string clears it.
    pub fn set_text(&mut self, text: impl Into<String>) -> Result<()> {
        self.check()?;
        if self.has_child_elements() {
            return Err(Error::malformed(format!(
                "<{}> has child elements; cannot set direct text",
                self.name
            )));
        }
        let text = text.into();
        self.children.clear();
        self.text = if text.is_empty() { None } else { Some(text) };
        Ok(())
    }

    pub fn take_text(&mut self) -> Result<Option<String>> {
        self.check()?;
        Ok(self.text.take())
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Raw access to the child list. Callers are responsible for not combining child elements
    /// with direct text.
    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|c| match c {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    pub fn child_element_count(&self) -> usize {
        self.child_elements().count()
    }

    pub fn has_child_elements(&self) -> bool {
        self.child_elements().next().is_some()
    }

    pub fn append_child(&mut self, child: Element) -> Result<()> {
        self.check()?;
        if self.text.is_some() {
            return Err(Error::malformed(format!(
                "<{}> holds direct text; cannot append <{}>",
                self.name, child.name
            )));
        }
        self.children.push(Node::Element(child));
        Ok(())
    }

    pub fn insert_child(&mut self, index: usize, child: Element) -> Result<()> {
        self.check()?;
        if self.text.is_some() {
            return Err(Error::malformed(format!(
                "<{}> holds direct text; cannot insert <{}>",
                self.name, child.name
            )));
        }
        let index = index.min(self.children.len());
        self.children.insert(index, Node::Element(child));
        Ok(())
    }

    /// Pre-order, depth-first iterator over this element and all descendant elements.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Pre-order iterator over this element and its descendants whose local name is `tag`.
    pub fn elements_by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> {
        self.descendants().filter(move |e| e.is(tag))
    }

    /// Visits this element and every descendant element in pre-order, stopping at the first
    /// error returned by `visit`.
    ///
    /// Children appended by `visit` to the element being visited are themselves visited.
    pub fn walk_mut<F>(&mut self, visit: &mut F) -> Result<()>
    where
        F: FnMut(&mut Element) -> Result<()>,
    {
        visit(self)?;
        for child in &mut self.children {
            if let Node::Element(e) = child {
                e.walk_mut(visit)?;
            }
        }
        Ok(())
    }

    fn check(&self) -> Result<()> {
        if self.text.is_some() && !self.children.is_empty() {
            return Err(Error::malformed(format!(
                "<{}> has both direct text and child nodes",
                self.name
            )));
        }
        Ok(())
    }

    fn write_markup(&self, out: &mut String) -> Result<()> {
        self.check()?;
        out.push('<');
        out.push_str(&self.name);
        for (k, v) in &self.attributes {
            out.push(' ');
            out.push_str(k);
            out.push_str("=\"");
            escape_into(out, v, true);
            out.push('"');
        }
        if self.text.is_none() && self.children.is_empty() {
            out.push_str("/>");
            return Ok(());
        }
        out.push('>');
        if let Some(text) = &self.text {
            escape_into(out, text, false);
        }
        for child in &self.children {
            match child {
                Node::Element(e) => e.write_markup(out)?,
                Node::Text(t) => escape_into(out, t, false),
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
        Ok(())
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        for child in next.children.iter().rev() {
            if let Node::Element(e) = child {
                self.stack.push(e);
            }
        }
        Some(next)
    }
}

/// A parsed SVG document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Element,
}

impl Document {
    /// Parses SVG markup. The root element must be `<svg>` (unqualified or in the SVG namespace).
    pub fn parse(text: &str) -> Result<Self> {
        let opt = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let xml = roxmltree::Document::parse_with_options(text, opt)
            .map_err(|e| Error::invalid(e.to_string()))?;
        let root = xml.root_element();
        let tag = root.tag_name();
        if tag.name() != "svg" || tag.namespace().is_some_and(|ns| ns != SVG_NS) {
            return Err(Error::invalid(format!(
                "expected <svg> root element, found <{}>",
                tag.name()
            )));
        }
        Ok(Self {
            root: build_element(root, &[]),
        })
    }

    pub fn from_root(root: Element) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    pub fn into_root(self) -> Element {
        self.root
    }

    pub fn to_markup(&self) -> Result<String> {
        let mut out = String::new();
        self.root.write_markup(&mut out)?;
        Ok(out)
    }
}

type NamespaceScope = Vec<(Option<String>, String)>;

fn build_element(node: roxmltree::Node<'_, '_>, parent_scope: &[(Option<String>, String)]) -> Element {
    let mut el = Element::new(qualified_name(
        node,
        node.tag_name().namespace(),
        node.tag_name().name(),
    ));

    let scope: NamespaceScope = node
        .namespaces()
        .map(|ns| (ns.name().map(str::to_string), ns.uri().to_string()))
        .collect();
    for (prefix, uri) in &scope {
        if prefix.as_deref() == Some("xml") {
            continue;
        }
        if parent_scope.iter().any(|(p, u)| p == prefix && u == uri) {
            continue;
        }
        let key = match prefix {
            Some(p) => format!("xmlns:{p}"),
            None => "xmlns".to_string(),
        };
        el.set_attr(key, uri.clone());
    }

    for a in node.attributes() {
        el.set_attr(qualified_name(node, a.namespace(), a.name()), a.value());
    }

    let mut children: Vec<Node> = Vec::new();
    for c in node.children() {
        if c.is_element() {
            children.push(Node::Element(build_element(c, &scope)));
        } else if c.is_text() {
            if let Some(t) = c.text() {
                children.push(Node::Text(t.to_string()));
            }
        }
    }

    if children.iter().any(|c| matches!(c, Node::Element(_))) {
        el.children = children;
    } else {
        let text: String = children
            .into_iter()
            .filter_map(|c| match c {
                Node::Text(t) => Some(t),
                Node::Element(_) => None,
            })
            .collect();
        if !text.is_empty() {
            el.text = Some(text);
        }
    }
    el
}

fn qualified_name(node: roxmltree::Node<'_, '_>, namespace: Option<&str>, local: &str) -> String {
    let prefix = match namespace {
        Some(XML_NS) => Some("xml"),
        Some(uri) => node.lookup_prefix(uri),
        None => None,
    };
    match prefix {
        Some(p) if !p.is_empty() => format!("{p}:{local}"),
        _ => local.to_string(),
    }
}

fn escape_into(out: &mut String, s: &str, attr: bool) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attr => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_non_svg_root() {
        let err = Document::parse("<notsvg/>").unwrap_err();
        assert!(matches!(err, Error::InvalidDocument { .. }));
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = Document::parse("not xml at all <<<").unwrap_err();
        assert!(matches!(err, Error::InvalidDocument { .. }));
    }

    #[test]
    fn parse_rejects_svg_local_name_in_foreign_namespace() {
        let err = Document::parse(r#"<svg xmlns="urn:other"/>"#).unwrap_err();
        assert!(matches!(err, Error::InvalidDocument { .. }));
    }

    #[test]
    fn text_only_element_holds_text_directly() {
        let doc = Document::parse("<svg><text>Hi\nThere</text></svg>").unwrap();
        let text = doc.root().elements_by_tag("text").next().unwrap();
        assert_eq!(text.text().unwrap(), Some("Hi\nThere"));
        assert!(text.children().is_empty());
    }

    #[test]
    fn mixed_content_keeps_text_as_children() {
        let doc = Document::parse("<svg><text>a<tspan>b</tspan>c</text></svg>").unwrap();
        let text = doc.root().elements_by_tag("text").next().unwrap();
        assert_eq!(text.text().unwrap(), None);
        assert_eq!(text.children().len(), 3);
        assert_eq!(text.child_element_count(), 1);
    }

    #[test]
    fn descendants_are_pre_order_and_include_root() {
        let doc = Document::parse(r#"<svg><g id="a"><rect id="b"/></g><circle id="c"/></svg>"#)
            .unwrap();
        let names: Vec<&str> = doc.root().descendants().map(|e| e.name()).collect();
        assert_eq!(names, vec!["svg", "g", "rect", "circle"]);
    }

    #[test]
    fn absent_attribute_is_distinct_from_empty() {
        let doc = Document::parse(r#"<svg><rect fill=""/></svg>"#).unwrap();
        let rect = doc.root().elements_by_tag("rect").next().unwrap();
        assert_eq!(rect.attr("fill"), Some(""));
        assert_eq!(rect.attr("stroke"), None);
    }

    #[test]
    fn markup_round_trips_namespaces_and_escapes() {
        let src = r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink"><use xlink:href="#a"/><text xml:space="preserve" title="a&quot;b">x &amp; y &lt; z</text></svg>"##;
        let doc = Document::parse(src).unwrap();
        assert_eq!(doc.to_markup().unwrap(), src);
    }

    #[test]
    fn malformed_child_set_is_reported() {
        let mut el = Element::new("text");
        el.set_text("hello").unwrap();
        el.children_mut().push(Node::Element(Element::new("tspan")));
        assert!(matches!(el.text(), Err(Error::MalformedDocument { .. })));
        assert!(matches!(
            el.append_child(Element::new("tspan")),
            Err(Error::MalformedDocument { .. })
        ));
        let doc = Document::from_root(el);
        assert!(matches!(doc.to_markup(), Err(Error::MalformedDocument { .. })));
    }

    #[test]
    fn clone_is_deep() {
        let doc = Document::parse(r#"<svg><rect width="1"/></svg>"#).unwrap();
        let mut copy = doc.clone();
        copy.root_mut()
            .walk_mut(&mut |e| {
                e.set_attr("width", "2");
                Ok(())
            })
            .unwrap();
        let rect = doc.root().elements_by_tag("rect").next().unwrap();
        assert_eq!(rect.attr("width"), Some("1"));
    }
}
