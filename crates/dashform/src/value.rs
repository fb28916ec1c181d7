// File: src/value.rs
// Purpose: Field values, dot-path addressing and input coercion

use crate::error::{FormError, FormResult};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::fmt;

/// A single field value. Forms hold a tree of these rooted at an object.
pub type FieldValue = Value;

/// Parsed dot-addressable field name (`lineItems.0.quantity`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    raw: String,
    segments: Vec<String>,
}

impl FieldPath {
    pub fn parse(raw: &str) -> FormResult<Self> {
        if raw.is_empty() {
            return Err(FormError::InvalidPath(raw.to_string()));
        }

        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(FormError::InvalidPath(raw.to_string()));
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Appends an index or key segment
    pub fn child(&self, segment: impl fmt::Display) -> Self {
        let segment = segment.to_string();
        let mut segments = self.segments.clone();
        segments.push(segment.clone());
        Self {
            raw: format!("{}.{}", self.raw, segment),
            segments,
        }
    }

    /// The DOM-safe form of this path (`lineItems-0-quantity`)
    pub fn dom_id(&self) -> String {
        self.segments.join("-")
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn step<'a>(current: &'a Value, segment: &str) -> Option<&'a Value> {
    match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn step_mut<'a>(current: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match current {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(move |i| items.get_mut(i)),
        _ => None,
    }
}

/// Looks up a path in a value tree
pub fn get_path<'a>(root: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(root, |current, segment| step(current, segment))
}

pub fn get_path_mut<'a>(root: &'a mut Value, path: &FieldPath) -> Option<&'a mut Value> {
    let mut current = root;
    for segment in path.segments() {
        current = step_mut(current, segment)?;
    }
    Some(current)
}

/// Replaces the value at `path`. Never creates keys: a path missing from the
/// tree is an `UnknownField`, and the new value must [`conform`] to the one
/// it replaces.
pub fn set_path(root: &mut Value, path: &FieldPath, value: Value) -> FormResult<()> {
    let slot = get_path_mut(root, path)
        .ok_or_else(|| FormError::UnknownField(path.as_str().to_string()))?;
    conform(slot, &value, path.as_str())?;
    *slot = value;
    Ok(())
}

/// Checks that `incoming` has the structure of `template`.
///
/// Objects keep exactly the same keys, recursively. Scalars (including
/// `null`) never become containers. Arrays may change length; each item must
/// conform to the template's first item, and an empty template array accepts
/// any items.
pub fn conform(template: &Value, incoming: &Value, at: &str) -> FormResult<()> {
    let join = |key: &str| {
        if at.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", at, key)
        }
    };

    match (template, incoming) {
        (Value::Object(expected), Value::Object(given)) => {
            if let Some(extra) = given.keys().find(|k| !expected.contains_key(*k)) {
                return Err(FormError::UnknownField(join(extra)));
            }
            if let Some(missing) = expected.keys().find(|k| !given.contains_key(*k)) {
                return Err(FormError::MissingField(join(missing)));
            }
            expected
                .iter()
                .try_for_each(|(key, child)| conform(child, &given[key], &join(key)))
        }
        (Value::Array(expected), Value::Array(given)) => match expected.first() {
            Some(item) => given
                .iter()
                .enumerate()
                .try_for_each(|(i, child)| conform(item, child, &join(&i.to_string()))),
            None => Ok(()),
        },
        (Value::Object(_) | Value::Array(_), _) | (_, Value::Object(_) | Value::Array(_)) => {
            Err(FormError::ShapeMismatch {
                path: at.to_string(),
                expected: type_name(template),
                found: type_name(incoming),
            })
        }
        _ => Ok(()),
    }
}

/// Lists every leaf of the tree by its dot path.
///
/// Empty objects and arrays count as leaves so that they stay comparable.
pub fn flatten(root: &Value) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    flatten_into(root, None, &mut out);
    out
}

fn flatten_into(value: &Value, prefix: Option<&str>, out: &mut BTreeMap<String, Value>) {
    let join = |key: &str| match prefix {
        Some(p) => format!("{}.{}", p, key),
        None => key.to_string(),
    };

    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                flatten_into(child, Some(&join(key)), out);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(child, Some(&join(&index.to_string())), out);
            }
        }
        _ => {
            if let Some(p) = prefix {
                out.insert(p.to_string(), value.clone());
            }
        }
    }
}

/// Short type name used in error messages
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Renders a value for display inside an input
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(display_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => String::new(),
    }
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Whether a value counts as "not filled in" for the required rule
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Number(_) => false,
    }
}

/// The kind of native control a field is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputKind {
    #[default]
    Text,
    Email,
    Password,
    Number,
    Tel,
    Url,
    Date,
    Hidden,
    TextArea,
    Select,
    Checkbox,
}

impl InputKind {
    /// The `type` attribute for `<input>` controls
    pub fn html_type(&self) -> &'static str {
        match self {
            Self::Text | Self::TextArea | Self::Select => "text",
            Self::Email => "email",
            Self::Password => "password",
            Self::Number => "number",
            Self::Tel => "tel",
            Self::Url => "url",
            Self::Date => "date",
            Self::Hidden => "hidden",
            Self::Checkbox => "checkbox",
        }
    }
}

/// What a native control reports on a change event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementInput {
    Text(String),
    Checked(bool),
}

/// Converts a native control's state into a field value.
///
/// Both binding modes go through this function, which is what keeps their
/// resulting values identical.
pub fn coerce_input(input: &ElementInput, kind: InputKind) -> Value {
    match (kind, input) {
        (InputKind::Checkbox, ElementInput::Checked(checked)) => Value::Bool(*checked),
        (InputKind::Checkbox, ElementInput::Text(raw)) => {
            Value::Bool(matches!(raw.trim(), "on" | "true" | "1" | "yes"))
        }
        (InputKind::Number, ElementInput::Text(raw)) => coerce_number(raw),
        (_, ElementInput::Checked(checked)) => Value::Bool(*checked),
        (_, ElementInput::Text(raw)) => Value::String(raw.clone()),
    }
}

fn coerce_number(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }

    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::from(int);
    }

    match trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
        Some(n) => Value::Number(n),
        // Left as text so the resolver can report it
        None => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn invoice() -> Value {
        json!({
            "customer": { "name": "Acme", "email": "" },
            "lineItems": [
                { "sku": "A-1", "quantity": 1 },
                { "sku": "B-2", "quantity": 3 }
            ],
            "notes": ""
        })
    }

    #[test]
    fn parses_paths() {
        let path = FieldPath::parse("lineItems.0.quantity").unwrap();
        assert_eq!(path.segments(), &["lineItems", "0", "quantity"]);
        assert_eq!(path.dom_id(), "lineItems-0-quantity");
        assert_eq!(path.child(2).as_str(), "lineItems.0.quantity.2");
    }

    #[test]
    fn rejects_empty_segments() {
        assert_eq!(
            FieldPath::parse("a..b"),
            Err(FormError::InvalidPath("a..b".to_string()))
        );
        assert!(FieldPath::parse("").is_err());
        assert!(FieldPath::parse(".a").is_err());
    }

    #[test]
    fn gets_nested_and_indexed_values() {
        let tree = invoice();
        let qty = FieldPath::parse("lineItems.1.quantity").unwrap();
        assert_eq!(get_path(&tree, &qty), Some(&json!(3)));

        let missing = FieldPath::parse("lineItems.5.quantity").unwrap();
        assert_eq!(get_path(&tree, &missing), None);
    }

    #[test]
    fn set_never_creates_keys() {
        let mut tree = invoice();
        let name = FieldPath::parse("customer.name").unwrap();
        set_path(&mut tree, &name, json!("Globex")).unwrap();
        assert_eq!(tree["customer"]["name"], json!("Globex"));

        let unknown = FieldPath::parse("customer.phone").unwrap();
        assert_eq!(
            set_path(&mut tree, &unknown, json!("555")),
            Err(FormError::UnknownField("customer.phone".to_string()))
        );
        assert!(tree["customer"].get("phone").is_none());
    }

    #[test]
    fn set_keeps_the_declared_shape() {
        let mut tree = json!({ "email": "", "customer": { "name": "", "email": "" } });
        let email = FieldPath::parse("email").unwrap();
        let customer = FieldPath::parse("customer").unwrap();

        assert_eq!(
            set_path(&mut tree, &email, json!({ "injected": 1 })),
            Err(FormError::ShapeMismatch {
                path: "email".to_string(),
                expected: "string",
                found: "object",
            })
        );
        assert_eq!(
            set_path(&mut tree, &customer, json!({ "phone": "555" })),
            Err(FormError::UnknownField("customer.phone".to_string()))
        );
        assert_eq!(
            set_path(&mut tree, &customer, json!({ "name": "Acme" })),
            Err(FormError::MissingField("customer.email".to_string()))
        );
        assert_eq!(
            tree,
            json!({ "email": "", "customer": { "name": "", "email": "" } })
        );

        set_path(&mut tree, &customer, json!({ "name": "Acme", "email": "ap@acme.io" })).unwrap();
        assert_eq!(tree["customer"]["name"], json!("Acme"));
    }

    #[test]
    fn whole_arrays_may_change_length_but_not_item_shape() {
        let mut tree = invoice();
        let items = FieldPath::parse("lineItems").unwrap();

        set_path(&mut tree, &items, json!([{ "sku": "C-3", "quantity": 2 }])).unwrap();
        assert_eq!(tree["lineItems"].as_array().map(Vec::len), Some(1));

        assert_eq!(
            set_path(&mut tree, &items, json!([{ "sku": "D-4" }])),
            Err(FormError::MissingField("lineItems.0.quantity".to_string()))
        );
        assert_eq!(
            set_path(&mut tree, &items, json!("none")),
            Err(FormError::ShapeMismatch {
                path: "lineItems".to_string(),
                expected: "array",
                found: "string",
            })
        );
    }

    #[test]
    fn scalars_may_change_type() {
        let mut tree = json!({ "quantity": null });
        let quantity = FieldPath::parse("quantity").unwrap();
        set_path(&mut tree, &quantity, json!(3)).unwrap();
        set_path(&mut tree, &quantity, json!("3")).unwrap();
        assert_eq!(tree["quantity"], json!("3"));
    }

    #[test]
    fn flattens_leaves() {
        let flat = flatten(&invoice());
        let keys: Vec<&str> = flat.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "customer.email",
                "customer.name",
                "lineItems.0.quantity",
                "lineItems.0.sku",
                "lineItems.1.quantity",
                "lineItems.1.sku",
                "notes",
            ]
        );
    }

    #[test]
    fn flatten_keeps_empty_containers() {
        let flat = flatten(&json!({ "tags": [], "meta": {} }));
        assert_eq!(flat.get("tags"), Some(&json!([])));
        assert_eq!(flat.get("meta"), Some(&json!({})));
    }

    #[test]
    fn displays_values() {
        assert_eq!(display_value(&json!(3.0)), "3");
        assert_eq!(display_value(&json!(2.5)), "2.5");
        assert_eq!(display_value(&Value::Null), "");
        assert_eq!(display_value(&json!(["a", "b"])), "a, b");
    }

    #[test]
    fn coerces_inputs() {
        let text = |s: &str| ElementInput::Text(s.to_string());
        assert_eq!(coerce_input(&text("12"), InputKind::Number), json!(12));
        assert_eq!(coerce_input(&text("1.5"), InputKind::Number), json!(1.5));
        assert_eq!(coerce_input(&text(" "), InputKind::Number), Value::Null);
        assert_eq!(coerce_input(&text("abc"), InputKind::Number), json!("abc"));
        assert_eq!(coerce_input(&text("on"), InputKind::Checkbox), json!(true));
        assert_eq!(
            coerce_input(&ElementInput::Checked(false), InputKind::Checkbox),
            json!(false)
        );
        assert_eq!(coerce_input(&text("a@b.com"), InputKind::Email), json!("a@b.com"));
    }

    #[test]
    fn blank_values() {
        assert!(is_blank(&json!("  ")));
        assert!(is_blank(&Value::Null));
        assert!(is_blank(&json!(false)));
        assert!(!is_blank(&json!(0)));
        assert!(is_truthy(&json!("x")));
        assert!(!is_truthy(&json!(0)));
    }
}
