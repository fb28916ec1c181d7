// File: src/views.rs
// Purpose: Maud pages for the login form and tenant switcher

use dashform::{
    root_error_alert, Checkbox, FieldProps, Form, FormActions, InputKind, Permissions, TenantSnapshot, TextInput,
};
use maud::{html, Markup, DOCTYPE};

pub fn layout(title: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " | Dashform" }
            }
            body {
                main { (body) }
            }
        }
    }
}

pub fn login_page(form: &Form) -> Markup {
    let snapshot = form.snapshot();

    layout(
        "Sign in",
        html! {
            h1 { "Sign in" }
            form method="post" action="/login" novalidate {
                (root_error_alert(&snapshot))
                (TextInput::new(
                    FieldProps::new("email")
                        .label("Email")
                        .placeholder("you@company.com")
                        .autocomplete("email"),
                )
                .kind(InputKind::Email)
                .render(form))
                (TextInput::new(
                    FieldProps::new("password")
                        .label("Password")
                        .description("At least 8 characters")
                        .autocomplete("current-password"),
                )
                .kind(InputKind::Password)
                .render(form))
                (Checkbox::new(FieldProps::new("remember").label("Keep me signed in")).render(form))
                (FormActions::new("Sign in").submitting_label("Signing in...").render(&snapshot))
            }
        },
    )
}

pub fn welcome_page(email: &str) -> Markup {
    layout(
        "Welcome",
        html! {
            h1 { "Welcome back" }
            p { "Signed in as " strong { (email) } "." }
            a href="/tenants" { "Choose a workspace" }
        },
    )
}

pub fn tenants_page(snapshot: &TenantSnapshot, permissions: &Permissions) -> Markup {
    let can_switch = permissions.has_permission("tenants:switch");

    layout(
        "Workspaces",
        html! {
            h1 { "Workspaces" }
            ul class="tenants" {
                @for tenant in &snapshot.tenants {
                    @let current = snapshot.current_tenant_id.as_deref() == Some(tenant.id.as_str());
                    li data-tenant=(tenant.id) aria-current=[current.then_some("true")] {
                        span class="tenant-name" { (tenant.name) }
                        " "
                        span class="tenant-plan" { (tenant.plan) }
                        @if can_switch && !current {
                            form method="post" action="/tenants/switch" {
                                input type="hidden" name="tenant_id" value=(tenant.id);
                                button type="submit" { "Switch" }
                            }
                        }
                    }
                }
            }
        },
    )
}

pub fn message_page(title: &str, message: &str) -> Markup {
    layout(
        title,
        html! {
            h1 { (title) }
            p { (message) }
        },
    )
}
