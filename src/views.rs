use axum::response::Html;
use serde::Serialize;
use std::sync::Arc;

use crate::error::AppError;
use crate::models::{Acronym, Category, PublicUser};

// 1. Rendering Contract

/// ViewRenderer
///
/// The boundary to the template engine. The web surface builds one of the
/// context structs below, serializes it, and asks the renderer for a page.
/// Swapping the renderer does not touch any handler.
pub trait ViewRenderer: Send + Sync {
    fn render(&self, template: &str, context: serde_json::Value) -> Result<String, AppError>;
}

/// ViewState
///
/// The concrete type used to share the renderer across the application state.
pub type ViewState = Arc<dyn ViewRenderer>;

/// Serializes `context` and renders `template` with it.
pub fn render_page<C: Serialize>(
    views: &dyn ViewRenderer,
    template: &str,
    context: &C,
) -> Result<Html<String>, AppError> {
    let value = serde_json::to_value(context)
        .map_err(|e| AppError::Internal(format!("view context for {template}: {e}")))?;
    views.render(template, value).map(Html)
}

/// Templates treat an absent list and an empty list differently; empty lists
/// are handed over as `None` so they render as "nothing here yet".
pub fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() { None } else { Some(items) }
}

// 2. Page Contexts

#[derive(Debug, Serialize)]
pub struct IndexContext {
    pub title: String,
    pub acronyms: Option<Vec<Acronym>>,
    pub user_logged_in: bool,
}

#[derive(Debug, Serialize)]
pub struct AcronymContext {
    pub title: String,
    pub acronym: Acronym,
    // `None` when the creator has been deleted since the acronym was written.
    pub creator: Option<PublicUser>,
    pub categories: Option<Vec<Category>>,
}

#[derive(Debug, Serialize)]
pub struct UserContext {
    pub title: String,
    pub user: PublicUser,
    pub acronyms: Option<Vec<Acronym>>,
}

#[derive(Debug, Serialize)]
pub struct AllUsersContext {
    pub title: String,
    pub users: Option<Vec<PublicUser>>,
}

#[derive(Debug, Serialize)]
pub struct AllCategoriesContext {
    pub title: String,
    pub categories: Option<Vec<Category>>,
}

#[derive(Debug, Serialize)]
pub struct CategoryContext {
    pub title: String,
    pub category: Category,
    pub acronyms: Option<Vec<Acronym>>,
}

/// Shared by the create and edit forms; `acronym` is set when editing.
#[derive(Debug, Serialize)]
pub struct AcronymFormContext {
    pub title: String,
    pub acronym: Option<Acronym>,
    pub editing: bool,
}

#[derive(Debug, Serialize)]
pub struct LoginContext {
    pub title: String,
    pub login_error: bool,
}

// 3. Default Renderer

/// PlainHtmlRenderer
///
/// Minimal stand-in for a real template engine: emits a valid HTML document
/// whose title comes from the context and whose body is the escaped,
/// pretty-printed context. Useful for local runs and for asserting what a
/// page was given.
#[derive(Clone, Default)]
pub struct PlainHtmlRenderer;

impl ViewRenderer for PlainHtmlRenderer {
    fn render(&self, template: &str, context: serde_json::Value) -> Result<String, AppError> {
        let title = context
            .get("title")
            .and_then(|t| t.as_str())
            .unwrap_or(template)
            .to_string();
        let body = serde_json::to_string_pretty(&context)
            .map_err(|e| AppError::Internal(format!("rendering {template}: {e}")))?;

        Ok(format!(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{} | Acronyms</title></head>\n\
             <body data-template=\"{}\">\n<pre>{}</pre>\n</body>\n</html>\n",
            escape_html(&title),
            escape_html(template),
            escape_html(&body),
        ))
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
