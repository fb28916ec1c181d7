// File: src/binding.rs
// Purpose: Field binding primitives (input/textarea/select/checkbox) and
// the controlled / uncontrolled binding adapters behind them

use crate::error::FormResult;
use crate::form::{Form, FormSnapshot};
use crate::rules::FieldRules;
use crate::value::{coerce_input, display_value, get_path, is_truthy, ElementInput, FieldPath, InputKind};
use maud::{html, Markup};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// ============================================================================
// Ids and feedback
// ============================================================================

/// DOM ids derived for one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIds {
    pub control: String,
    pub description: String,
    pub error: String,
}

impl FieldIds {
    /// `explicit` wins; otherwise `{prefix}-{path with dots as dashes}`
    pub fn new(prefix: &str, name: &str, explicit: Option<&str>) -> Self {
        let control = match explicit {
            Some(id) => id.to_string(),
            None => {
                let dom = FieldPath::parse(name)
                    .map(|p| p.dom_id())
                    .unwrap_or_else(|_| name.replace('.', "-"));
                format!("{}-{}", prefix, dom)
            }
        };

        Self {
            description: format!("{}-description", control),
            error: format!("{}-error", control),
            control,
        }
    }
}

/// The message shown under a field. An active error always hides the
/// description; the two are never rendered together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback<'a> {
    Error(&'a str),
    Description(&'a str),
    None,
}

impl<'a> Feedback<'a> {
    pub fn resolve(snapshot: &'a FormSnapshot, name: &str, description: Option<&'a str>) -> Self {
        match (snapshot.visible_error(name), description) {
            (Some(error), _) => Self::Error(error),
            (None, Some(description)) => Self::Description(description),
            (None, None) => Self::None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Value for `aria-describedby`
    pub fn described_by(&self, ids: &FieldIds) -> Option<String> {
        match self {
            Self::Error(_) => Some(ids.error.clone()),
            Self::Description(_) => Some(ids.description.clone()),
            Self::None => None,
        }
    }

    pub fn render(&self, ids: &FieldIds) -> Markup {
        html! {
            @match self {
                Feedback::Error(message) => {
                    p id=(ids.error) class="field-error" role="alert" { (message) }
                }
                Feedback::Description(text) => {
                    p id=(ids.description) class="field-description" { (text) }
                }
                Feedback::None => {}
            }
        }
    }
}

/// HTML5 constraint attributes derived from a rule chain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Constraints {
    required: bool,
    minlength: Option<String>,
    maxlength: Option<String>,
    min: Option<String>,
    max: Option<String>,
    pattern: Option<String>,
}

impl Constraints {
    fn from_rules(rules: Option<&FieldRules>, kind: InputKind) -> Self {
        let mut out = Self::default();
        for (attr, value) in rules.map(|r| r.html5_attrs(kind)).unwrap_or_default() {
            match attr {
                "required" => out.required = true,
                "minlength" => out.minlength = Some(value),
                "maxlength" => out.maxlength = Some(value),
                "min" => out.min = Some(value),
                "max" => out.max = Some(value),
                "pattern" => out.pattern = Some(value),
                _ => {}
            }
        }
        out
    }
}

// ============================================================================
// Props
// ============================================================================

/// Inputs shared by every binding primitive
#[derive(Debug, Clone, Default)]
pub struct FieldProps {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub rules: Option<FieldRules>,
    pub placeholder: Option<String>,
    pub id: Option<String>,
    pub disabled: bool,
    pub autocomplete: Option<String>,
}

impl FieldProps {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
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

    /// Rules used for HTML5 attributes. Falls back to the form resolver's
    /// rules for this field when unset.
    pub fn rules(mut self, rules: FieldRules) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn autocomplete(mut self, autocomplete: impl Into<String>) -> Self {
        self.autocomplete = Some(autocomplete.into());
        self
    }
}

/// Everything a primitive reads from the form on each render
pub struct RenderContext<'a> {
    pub snapshot: &'a FormSnapshot,
    pub id_prefix: &'a str,
    pub disable_on_submit: bool,
    pub rules: Option<&'a FieldRules>,
}

/// Per-render values resolved from props and form state
struct Resolved<'a> {
    ids: FieldIds,
    value: Value,
    feedback: Feedback<'a>,
    described_by: Option<String>,
    disabled: bool,
    constraints: Constraints,
}

impl<'a> Resolved<'a> {
    fn new(props: &'a FieldProps, ctx: &RenderContext<'a>, kind: InputKind) -> Self {
        let ids = FieldIds::new(ctx.id_prefix, &props.name, props.id.as_deref());
        let feedback = Feedback::resolve(ctx.snapshot, &props.name, props.description.as_deref());
        let rules = props.rules.as_ref().or(ctx.rules);

        Self {
            value: ctx.snapshot.value(&props.name).cloned().unwrap_or(Value::Null),
            described_by: feedback.described_by(&ids),
            disabled: props.disabled || !ctx.snapshot.is_interactive(ctx.disable_on_submit),
            constraints: Constraints::from_rules(rules, kind),
            feedback,
            ids,
        }
    }

    fn invalid(&self) -> Option<&'static str> {
        self.feedback.is_error().then_some("true")
    }
}

fn render_label(props: &FieldProps, ids: &FieldIds, required: bool) -> Markup {
    html! {
        @if let Some(label) = &props.label {
            label for=(ids.control) {
                (label)
                @if required {
                    span class="required" aria-hidden="true" { " *" }
                }
            }
        }
    }
}

/// Reads the current snapshot and options, then renders with them
fn render_from_form(form: &Form, props: &FieldProps, f: impl FnOnce(&RenderContext<'_>) -> Markup) -> Markup {
    let snapshot = form.snapshot();
    let options = form.options();
    let ctx = RenderContext {
        snapshot: &snapshot,
        id_prefix: &options.id_prefix,
        disable_on_submit: options.submit.disable_on_submit,
        rules: form.resolver().rules_for(&props.name),
    };
    f(&ctx)
}

// ============================================================================
// Primitives
// ============================================================================

/// `<input>` bound to one field
#[derive(Debug, Clone)]
pub struct TextInput {
    pub props: FieldProps,
    pub kind: InputKind,
}

impl TextInput {
    pub fn new(props: FieldProps) -> Self {
        Self {
            props,
            kind: InputKind::Text,
        }
    }

    pub fn kind(mut self, kind: InputKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn render(&self, form: &Form) -> Markup {
        render_from_form(form, &self.props, |ctx| self.render_with(ctx))
    }

    pub fn render_with(&self, ctx: &RenderContext<'_>) -> Markup {
        let r = Resolved::new(&self.props, ctx, self.kind);
        let c = &r.constraints;

        html! {
            div class="form-field" data-field=(self.props.name) {
                (render_label(&self.props, &r.ids, c.required))
                input
                    id=(r.ids.control)
                    name=(self.props.name)
                    type=(self.kind.html_type())
                    value=(display_value(&r.value))
                    placeholder=[self.props.placeholder.as_deref()]
                    autocomplete=[self.props.autocomplete.as_deref()]
                    required[c.required]
                    minlength=[c.minlength.as_deref()]
                    maxlength=[c.maxlength.as_deref()]
                    min=[c.min.as_deref()]
                    max=[c.max.as_deref()]
                    pattern=[c.pattern.as_deref()]
                    aria-invalid=[r.invalid()]
                    aria-describedby=[r.described_by.as_deref()]
                    disabled[r.disabled];
                (r.feedback.render(&r.ids))
            }
        }
    }
}

/// `<textarea>` bound to one field
#[derive(Debug, Clone)]
pub struct TextArea {
    pub props: FieldProps,
    pub rows: u32,
}

impl TextArea {
    pub fn new(props: FieldProps) -> Self {
        Self { props, rows: 4 }
    }

    pub fn rows(mut self, rows: u32) -> Self {
        self.rows = rows;
        self
    }

    pub fn render(&self, form: &Form) -> Markup {
        render_from_form(form, &self.props, |ctx| self.render_with(ctx))
    }

    pub fn render_with(&self, ctx: &RenderContext<'_>) -> Markup {
        let r = Resolved::new(&self.props, ctx, InputKind::TextArea);
        let c = &r.constraints;

        html! {
            div class="form-field" data-field=(self.props.name) {
                (render_label(&self.props, &r.ids, c.required))
                textarea
                    id=(r.ids.control)
                    name=(self.props.name)
                    rows=(self.rows)
                    placeholder=[self.props.placeholder.as_deref()]
                    required[c.required]
                    minlength=[c.minlength.as_deref()]
                    maxlength=[c.maxlength.as_deref()]
                    aria-invalid=[r.invalid()]
                    aria-describedby=[r.described_by.as_deref()]
                    disabled[r.disabled] { (display_value(&r.value)) }
                (r.feedback.render(&r.ids))
            }
        }
    }
}

/// One `<option>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub disabled: bool,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            disabled: false,
        }
    }
}

/// `<select>` bound to one field
#[derive(Debug, Clone)]
pub struct Select {
    pub props: FieldProps,
    pub options: Vec<SelectOption>,
}

impl Select {
    pub fn new(props: FieldProps, options: Vec<SelectOption>) -> Self {
        Self { props, options }
    }

    pub fn render(&self, form: &Form) -> Markup {
        render_from_form(form, &self.props, |ctx| self.render_with(ctx))
    }

    pub fn render_with(&self, ctx: &RenderContext<'_>) -> Markup {
        let r = Resolved::new(&self.props, ctx, InputKind::Select);
        let current = display_value(&r.value);

        html! {
            div class="form-field" data-field=(self.props.name) {
                (render_label(&self.props, &r.ids, r.constraints.required))
                select
                    id=(r.ids.control)
                    name=(self.props.name)
                    required[r.constraints.required]
                    aria-invalid=[r.invalid()]
                    aria-describedby=[r.described_by.as_deref()]
                    disabled[r.disabled] {
                    @if let Some(placeholder) = &self.props.placeholder {
                        option value="" disabled selected[current.is_empty()] { (placeholder) }
                    }
                    @for option in &self.options {
                        option
                            value=(option.value)
                            selected[option.value == current]
                            disabled[option.disabled] { (option.label) }
                    }
                }
                (r.feedback.render(&r.ids))
            }
        }
    }
}

/// `<input type="checkbox">` bound to a boolean field
#[derive(Debug, Clone)]
pub struct Checkbox {
    pub props: FieldProps,
}

impl Checkbox {
    pub fn new(props: FieldProps) -> Self {
        Self { props }
    }

    pub fn render(&self, form: &Form) -> Markup {
        render_from_form(form, &self.props, |ctx| self.render_with(ctx))
    }

    pub fn render_with(&self, ctx: &RenderContext<'_>) -> Markup {
        let r = Resolved::new(&self.props, ctx, InputKind::Checkbox);

        html! {
            div class="form-field form-field-checkbox" data-field=(self.props.name) {
                input
                    id=(r.ids.control)
                    name=(self.props.name)
                    type="checkbox"
                    value="true"
                    checked[is_truthy(&r.value)]
                    required[r.constraints.required]
                    aria-invalid=[r.invalid()]
                    aria-describedby=[r.described_by.as_deref()]
                    disabled[r.disabled];
                (render_label(&self.props, &r.ids, r.constraints.required))
                (r.feedback.render(&r.ids))
            }
        }
    }
}

/// Submit / reset button pair, disabled while a submission is in flight
#[derive(Debug, Clone)]
pub struct FormActions {
    pub submit_label: String,
    pub submitting_label: String,
    pub reset_label: Option<String>,
}

impl Default for FormActions {
    fn default() -> Self {
        Self {
            submit_label: "Save".to_string(),
            submitting_label: "Saving...".to_string(),
            reset_label: None,
        }
    }
}

impl FormActions {
    pub fn new(submit_label: impl Into<String>) -> Self {
        Self {
            submit_label: submit_label.into(),
            ..Self::default()
        }
    }

    pub fn submitting_label(mut self, label: impl Into<String>) -> Self {
        self.submitting_label = label.into();
        self
    }

    pub fn reset_label(mut self, label: impl Into<String>) -> Self {
        self.reset_label = Some(label.into());
        self
    }

    pub fn render(&self, snapshot: &FormSnapshot) -> Markup {
        let busy = snapshot.is_submitting();

        html! {
            div class="form-actions" {
                button type="submit" disabled[busy] aria-busy=[busy.then_some("true")] {
                    @if busy { (self.submitting_label) } @else { (self.submit_label) }
                }
                @if let Some(reset) = &self.reset_label {
                    button type="reset" disabled[busy] { (reset) }
                }
            }
        }
    }
}

/// Form-level error banner (failed submit handler, server errors)
pub fn root_error_alert(snapshot: &FormSnapshot) -> Markup {
    html! {
        @if let Some(message) = snapshot.root_error() {
            div class="form-alert" role="alert" { (message) }
        }
    }
}

// ============================================================================
// Binding adapters
// ============================================================================

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ElementInput {
    /// What a native control displays for a stored value
    pub fn from_value(value: &Value, kind: InputKind) -> Self {
        match kind {
            InputKind::Checkbox => Self::Checked(is_truthy(value)),
            _ => Self::Text(display_value(value)),
        }
    }
}

/// A self-registered control. Holds its own raw state the way a DOM
/// element does; the form reads it on every change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeElement {
    pub name: String,
    pub kind: InputKind,
    pub input: ElementInput,
}

type ElementHandle = Arc<Mutex<NativeElement>>;

/// Controls registered with a form in uncontrolled mode. A field may have
/// several controls; each is tracked by its own handle.
#[derive(Debug, Default)]
pub(crate) struct ElementRegistry {
    elements: Mutex<Vec<ElementHandle>>,
}

impl ElementRegistry {
    fn attach(&self, element: ElementHandle) {
        lock(&self.elements).push(element);
    }

    /// Removes exactly this handle, leaving other controls for the same field
    fn detach(&self, element: &ElementHandle) {
        lock(&self.elements).retain(|e| !Arc::ptr_eq(e, element));
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.elements).len()
    }

    /// Writes form values back into registered controls (after a reset)
    pub(crate) fn sync_from(&self, values: &Value) {
        for element in lock(&self.elements).iter() {
            let mut element = lock(element);
            let value = FieldPath::parse(&element.name)
                .ok()
                .and_then(|path| get_path(values, &path).cloned())
                .unwrap_or(Value::Null);
            element.input = ElementInput::from_value(&value, element.kind);
        }
    }
}

/// Controlled mode: the caller passes values explicitly through this adapter
#[derive(Debug, Clone)]
pub struct ControlledBinding {
    form: Form,
    name: String,
    kind: InputKind,
}

impl ControlledBinding {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current canonical value; there is no local copy
    pub fn value(&self) -> Value {
        self.form.get_value(&self.name).unwrap_or(Value::Null)
    }

    pub fn error(&self) -> Option<String> {
        self.form.snapshot().visible_error(&self.name).map(str::to_string)
    }

    pub async fn on_change(&self, value: Value) -> FormResult<()> {
        self.form.handle_change(&self.name, value).await
    }

    /// Change event carrying a native control's raw state
    pub async fn on_input(&self, input: ElementInput) -> FormResult<()> {
        self.on_change(coerce_input(&input, self.kind)).await
    }

    pub async fn on_blur(&self) -> FormResult<()> {
        self.form.handle_blur(&self.name).await
    }
}

/// Uncontrolled mode: the control registers itself and the form tracks it
#[derive(Debug)]
pub struct UncontrolledBinding {
    form: Form,
    element: ElementHandle,
}

impl UncontrolledBinding {
    pub fn name(&self) -> String {
        lock(&self.element).name.clone()
    }

    /// The control's own raw state
    pub fn element(&self) -> NativeElement {
        lock(&self.element).clone()
    }

    /// User types into the control
    pub async fn input(&self, raw: impl Into<String>) -> FormResult<()> {
        lock(&self.element).input = ElementInput::Text(raw.into());
        self.form.read_element(&self.element).await
    }

    /// User toggles a checkbox
    pub async fn set_checked(&self, checked: bool) -> FormResult<()> {
        lock(&self.element).input = ElementInput::Checked(checked);
        self.form.read_element(&self.element).await
    }

    pub async fn blur(&self) -> FormResult<()> {
        let name = self.name();
        self.form.handle_blur(&name).await
    }

    /// Detaches the control; the field's value stays in the form
    pub fn unregister(self) {
        self.form.elements().detach(&self.element);
    }
}

impl Form {
    /// Binds `name` in controlled mode
    pub fn controller(&self, name: &str, kind: InputKind) -> FormResult<ControlledBinding> {
        self.get_value(name)?;
        Ok(ControlledBinding {
            form: self.clone(),
            name: name.to_string(),
            kind,
        })
    }

    /// Binds `name` in uncontrolled mode. The control starts out showing
    /// the field's current value.
    pub fn register(&self, name: &str, kind: InputKind) -> FormResult<UncontrolledBinding> {
        let value = self.get_value(name)?;
        let element = Arc::new(Mutex::new(NativeElement {
            name: name.to_string(),
            kind,
            input: ElementInput::from_value(&value, kind),
        }));
        self.elements().attach(element.clone());

        Ok(UncontrolledBinding {
            form: self.clone(),
            element,
        })
    }

    /// Number of self-registered controls
    pub fn registered_count(&self) -> usize {
        self.elements().len()
    }

    /// Change event from a registered control: read it, coerce, store
    async fn read_element(&self, element: &ElementHandle) -> FormResult<()> {
        let (name, value) = {
            let element = lock(element);
            (element.name.clone(), coerce_input(&element.input, element.kind))
        };
        self.handle_change(&name, value).await
    }
}
