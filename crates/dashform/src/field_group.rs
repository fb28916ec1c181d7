// File: src/field_group.rs
// Purpose: Label/control association for arbitrary child trees

use crate::binding::{Feedback, FieldIds};
use crate::form::{Form, FormSnapshot};
use maud::{html, Escaper, Markup, Render};
use std::collections::BTreeMap;
use std::fmt::Write;

const VOID_TAGS: &[&str] = &["area", "br", "col", "hr", "img", "input", "link", "meta", "source", "wbr"];
const NATIVE_CONTROLS: &[&str] = &["input", "select", "textarea"];

/// HTML element in a child tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.attrs.get("id").map(String::as_str)
    }
}

/// A child tree passed to [`FormField`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl Node {
    pub fn element(tag: impl Into<String>) -> Element {
        Element::new(tag)
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(element) => Some(element),
            Self::Text(_) => None,
        }
    }

    /// Depth-first search for the element carrying `id`
    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        let element = self.as_element()?;
        if element.id() == Some(id) {
            return Some(element);
        }
        element.children.iter().find_map(|child| child.find_by_id(id))
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

impl Render for Node {
    fn render_to(&self, buffer: &mut String) {
        match self {
            Node::Text(text) => {
                let _ = Escaper::new(buffer).write_str(text);
            }
            // A tag that can't be written safely is dropped, its children kept
            Node::Element(element) if !is_markup_name(&element.tag) => {
                for child in &element.children {
                    child.render_to(buffer);
                }
            }
            Node::Element(element) => {
                buffer.push('<');
                buffer.push_str(&element.tag);
                for (name, value) in element.attrs.iter().filter(|(name, _)| is_markup_name(name)) {
                    buffer.push(' ');
                    buffer.push_str(name);
                    buffer.push_str("=\"");
                    let _ = Escaper::new(buffer).write_str(value);
                    buffer.push('"');
                }
                buffer.push('>');

                if VOID_TAGS.contains(&element.tag.as_str()) {
                    return;
                }
                for child in &element.children {
                    child.render_to(buffer);
                }
                buffer.push_str("</");
                buffer.push_str(&element.tag);
                buffer.push('>');
            }
        }
    }
}

/// Tag and attribute names are written unescaped, so only plain names pass:
/// a leading letter followed by letters, digits, `-` or `:`
fn is_markup_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == ':')
}

/// Whether `node` can receive the field's id: a native control, or any
/// element already named after the field
pub fn is_injectable(node: &Node, field_name: &str) -> bool {
    match node {
        Node::Element(element) => {
            NATIVE_CONTROLS.contains(&element.tag.as_str())
                || element.attrs.get("name").is_some_and(|name| name == field_name)
        }
        Node::Text(_) => false,
    }
}

/// Gives exactly one element of `node` a DOM id so a label can target it.
///
/// An id declared on the root child wins. Otherwise the first injectable
/// element in depth-first order keeps its own id or receives `fallback`.
/// Returns the resolved id, or `None` when nothing in the tree qualifies.
pub fn inject_id(node: Node, fallback: &str, field_name: &str) -> (Node, Option<String>) {
    inject_with(node, fallback, field_name, &[])
}

/// Like [`inject_id`], also setting `extra` attributes on the matched element
fn inject_with(mut node: Node, fallback: &str, field_name: &str, extra: &[(&str, String)]) -> (Node, Option<String>) {
    if let Node::Element(root) = &mut node {
        if let Some(id) = root.id().map(str::to_string) {
            apply_attrs(root, extra);
            return (node, Some(id));
        }
    }

    let id = inject_first(&mut node, fallback, field_name, extra);
    (node, id)
}

fn inject_first(node: &mut Node, fallback: &str, field_name: &str, extra: &[(&str, String)]) -> Option<String> {
    if is_injectable(node, field_name) {
        let Node::Element(element) = node else {
            return None;
        };
        let id = element
            .attrs
            .entry("id".to_string())
            .or_insert_with(|| fallback.to_string())
            .clone();
        apply_attrs(element, extra);
        return Some(id);
    }

    match node {
        Node::Element(element) => element
            .children
            .iter_mut()
            .find_map(|child| inject_first(child, fallback, field_name, extra)),
        Node::Text(_) => None,
    }
}

fn apply_attrs(element: &mut Element, extra: &[(&str, String)]) {
    for (name, value) in extra {
        element.attrs.insert((*name).to_string(), value.clone());
    }
}

/// Label + arbitrary control tree + error-or-description
#[derive(Debug, Clone)]
pub struct FormField {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub required: bool,
    pub id: Option<String>,
    pub child: Node,
}

impl FormField {
    pub fn new(name: impl Into<String>, child: impl Into<Node>) -> Self {
        Self {
            name: name.into(),
            label: None,
            description: None,
            required: false,
            id: None,
            child: child.into(),
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn render(&self, form: &Form) -> Markup {
        self.render_with(&form.snapshot(), &form.options().id_prefix)
    }

    pub fn render_with(&self, snapshot: &FormSnapshot, id_prefix: &str) -> Markup {
        let fallback = FieldIds::new(id_prefix, &self.name, self.id.as_deref());
        let feedback = Feedback::resolve(snapshot, &self.name, self.description.as_deref());

        // Feedback ids must follow whatever id the control ends up with
        let resolved_id = match &self.child {
            Node::Element(root) => root.id().map(str::to_string),
            Node::Text(_) => None,
        };
        let ids = FieldIds::new(id_prefix, &self.name, Some(resolved_id.as_deref().unwrap_or(&fallback.control)));

        let mut extra = Vec::new();
        if feedback.is_error() {
            extra.push(("aria-invalid", "true".to_string()));
        }

        let (child, target) = inject_with(self.child.clone(), &ids.control, &self.name, &extra);
        let ids = match &target {
            Some(id) if *id != ids.control => FieldIds::new(id_prefix, &self.name, Some(id.as_str())),
            _ => ids,
        };
        let child = match (&target, feedback.described_by(&ids)) {
            (Some(id), Some(described_by)) => set_attr_by_id(child, id, "aria-describedby", described_by),
            _ => child,
        };

        html! {
            div class="form-field" data-field=(self.name) {
                @if let Some(label) = &self.label {
                    label for=[target.as_deref()] {
                        (label)
                        @if self.required {
                            span class="required" aria-hidden="true" { " *" }
                        }
                    }
                }
                (child)
                (feedback.render(&ids))
            }
        }
    }
}

fn set_attr_by_id(mut node: Node, id: &str, name: &str, value: String) -> Node {
    fn walk(node: &mut Node, id: &str, name: &str, value: &str) -> bool {
        let Node::Element(element) = node else {
            return false;
        };
        if element.id() == Some(id) {
            element.attrs.insert(name.to_string(), value.to_string());
            return true;
        }
        element.children.iter_mut().any(|child| walk(child, id, name, value))
    }

    walk(&mut node, id, name, &value);
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::NoopResolver;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn wrapper(inner: Element) -> Node {
        Node::element("div")
            .attr("class", "input-group")
            .child(Node::element("span").child(Node::text("$")))
            .child(inner)
            .into()
    }

    #[test]
    fn injects_into_nested_native_control() {
        let tree = wrapper(Node::element("input").attr("name", "amount"));
        let (tree, id) = inject_id(tree, "field-amount", "amount");

        assert_eq!(id.as_deref(), Some("field-amount"));
        assert_eq!(tree.find_by_id("field-amount").map(|e| e.tag.as_str()), Some("input"));
    }

    #[test]
    fn prefers_declared_ids() {
        let root = Node::from(Node::element("select").attr("id", "plan-picker"));
        let (_, id) = inject_id(root, "field-plan", "plan");
        assert_eq!(id.as_deref(), Some("plan-picker"));

        let nested = wrapper(Node::element("textarea").attr("id", "notes-box"));
        let (tree, id) = inject_id(nested, "field-notes", "notes");
        assert_eq!(id.as_deref(), Some("notes-box"));
        assert!(tree.find_by_id("field-notes").is_none());
    }

    #[test]
    fn matches_custom_elements_by_name() {
        let tree = wrapper(Node::element("date-picker").attr("name", "startsAt"));
        let (tree, id) = inject_id(tree, "field-startsAt", "startsAt");
        assert_eq!(id.as_deref(), Some("field-startsAt"));
        assert_eq!(tree.find_by_id("field-startsAt").map(|e| e.tag.as_str()), Some("date-picker"));
    }

    #[test]
    fn stops_at_first_match_and_leaves_siblings_alone() {
        let tree: Node = Node::element("div")
            .child(Node::element("input").attr("name", "first"))
            .child(Node::element("input").attr("name", "second"))
            .into();
        let original = tree.clone();
        let (tree, _) = inject_id(tree, "field-first", "first");

        let Node::Element(root) = &tree else { panic!("root is an element") };
        let Node::Element(original_root) = &original else { panic!("root is an element") };
        assert_eq!(root.children[0].as_element().and_then(Element::id), Some("field-first"));
        assert_eq!(root.children[1], original_root.children[1]);
        assert_eq!(root.attrs, original_root.attrs);
    }

    #[test]
    fn no_injectable_descendant_is_not_an_error() {
        let tree = wrapper(Node::element("span"));
        let (out, id) = inject_id(tree.clone(), "field-x", "x");
        assert_eq!(id, None);
        assert_eq!(out, tree);
    }

    #[test]
    fn renders_escaped_markup() {
        let node: Node = Node::element("p").attr("title", "a\"b").child(Node::text("<b>")).into();
        assert_eq!(node.render().into_string(), r#"<p title="a&quot;b">&lt;b&gt;</p>"#);
        let input: Node = Node::element("input").attr("type", "text").into();
        assert_eq!(input.render().into_string(), r#"<input type="text">"#);
    }

    #[test]
    fn skips_names_that_would_break_out_of_markup() {
        let node: Node = Node::element("span")
            .attr("onclick=\"steal()\" x", "1")
            .attr("aria-label", "Amount")
            .attr("xlink:href", "#a")
            .into();
        assert_eq!(
            node.render().into_string(),
            r##"<span aria-label="Amount" xlink:href="#a"></span>"##
        );

        let bad_tag: Node = Node::element("script><img")
            .child(Node::text("kept"))
            .into();
        assert_eq!(bad_tag.render().into_string(), "kept");
        assert!(!is_markup_name(""));
        assert!(!is_markup_name("1div"));
    }

    #[test]
    fn form_field_targets_injected_control() {
        let form = Form::new(json!({ "amount": 0 }), NoopResolver).unwrap();
        let field = FormField::new("amount", wrapper(Node::element("input").attr("type", "number")))
            .label("Amount")
            .description("In USD");

        let html = field.render(&form).into_string();
        assert!(html.contains(r#"<label for="field-amount">Amount"#));
        assert!(html.contains(r#"id="field-amount""#));
        assert!(html.contains(r#"aria-describedby="field-amount-description""#));
        assert!(html.contains("In USD"));
    }

    #[test]
    fn form_field_error_replaces_description() {
        let form = Form::new(json!({ "amount": 0 }), NoopResolver).unwrap();
        form.touch("amount").unwrap();
        form.set_error("amount", "Must be positive").unwrap();

        let field = FormField::new("amount", Node::element("input"))
            .label("Amount")
            .description("In USD");
        let html = field.render(&form).into_string();
        assert!(html.contains("Must be positive"));
        assert!(!html.contains("In USD"));
        assert!(html.contains(r#"aria-invalid="true""#));
        assert!(html.contains(r#"aria-describedby="field-amount-error""#));
    }

    #[test]
    fn label_without_target_has_no_for() {
        let form = Form::new(json!({ "terms": false }), NoopResolver).unwrap();
        let field = FormField::new("terms", Node::element("p").child(Node::text("Read the terms"))).label("Terms");
        let html = field.render(&form).into_string();
        assert!(html.contains("<label>Terms</label>"));
    }
}
