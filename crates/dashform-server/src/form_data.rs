// File: src/form_data.rs
// Purpose: Decoding urlencoded posts into form values

use axum::http::HeaderMap;
use dashform::{coerce_input, ElementInput, Form, FormResult, InputKind};
use std::collections::HashMap;
use tracing::debug;

/// Decoded `application/x-www-form-urlencoded` fields. Later duplicates win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    fields: HashMap<String, String>,
}

impl FormData {
    pub fn parse(body: &[u8]) -> Self {
        let raw = String::from_utf8_lossy(body);
        let fields = raw
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
                (decode(k), decode(v))
            })
            .collect();
        Self { fields }
    }

    /// Parses the body only when the request declares an urlencoded form
    pub fn from_request(headers: &HeaderMap, body: &[u8]) -> Self {
        let is_form = headers
            .get("content-type")
            .and_then(|ct| ct.to_str().ok())
            .is_some_and(|ct| ct.contains("application/x-www-form-urlencoded"));

        if is_form {
            Self::parse(body)
        } else {
            Self::default()
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Writes the declared fields into `form` the way a native control
    /// would report them. An unchecked checkbox is absent from a post and
    /// reads as `false`; other absent fields keep their defaults. Posted
    /// fields the form does not declare are dropped.
    pub fn apply(&self, form: &Form, fields: &[(&str, InputKind)]) -> FormResult<()> {
        for (name, kind) in fields {
            let input = match (self.get(name), kind) {
                (Some(raw), _) => ElementInput::Text(raw.to_string()),
                (None, InputKind::Checkbox) => ElementInput::Checked(false),
                (None, _) => continue,
            };
            form.set_value(name, coerce_input(&input, *kind))?;
        }

        let ignored = self
            .fields
            .keys()
            .filter(|key| !fields.iter().any(|(name, _)| *name == key.as_str()))
            .count();
        if ignored > 0 {
            debug!(form_id = %form.id(), ignored, "dropped undeclared form fields");
        }
        Ok(())
    }
}

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashform::NoopResolver;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn decodes_pairs() {
        let data = FormData::parse(b"email=ops%40dotmac.io&password=hunter+22&remember=on&flag");
        assert_eq!(data.get("email"), Some("ops@dotmac.io"));
        assert_eq!(data.get("password"), Some("hunter 22"));
        assert_eq!(data.get("flag"), Some(""));
        assert_eq!(data.len(), 4);
    }

    #[test]
    fn non_form_bodies_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "application/json".parse().unwrap());
        assert!(FormData::from_request(&headers, b"email=x").is_empty());
    }

    #[test]
    fn applies_declared_fields_only() {
        let form = Form::new(json!({ "email": "", "seats": 1, "remember": true }), NoopResolver).unwrap();
        let data = FormData::parse(b"email=a%40b.com&seats=7&admin=true");

        data.apply(
            &form,
            &[("email", InputKind::Email), ("seats", InputKind::Number), ("remember", InputKind::Checkbox)],
        )
        .unwrap();

        assert_eq!(form.get_values(), json!({ "email": "a@b.com", "seats": 7, "remember": false }));
    }
}
