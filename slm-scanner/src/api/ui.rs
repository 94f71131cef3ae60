//! Correction UI
//!
//! Lists what has been scanned and lets the user fix names the pipeline got
//! wrong (or never got). Saving a correction also renames the matching
//! placeholder entries on the shopping list.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Form, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use slm_common::{ProductRecord, ScanCode};
use std::fmt::Write;

use crate::error::{ApiError, ApiResult};
use crate::shopping_list::{item_path, APP_HOME_ROUTE};
use crate::AppState;

/// Build UI routes
pub fn ui_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root_redirect))
        .route(APP_HOME_ROUTE, get(home_page))
        .route(
            "/shopping-list-manager/item/:code",
            get(item_page).post(item_update),
        )
}

/// GET / redirects to the UI home
async fn root_redirect() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, APP_HOME_ROUTE)])
}

#[derive(Debug, Deserialize)]
pub struct HomeQuery {
    /// Handle this code as if it had been scanned
    beep: Option<String>,
    /// Show only products in this exact category
    category: Option<String>,
}

/// GET /shopping-list-manager/
async fn home_page(State(state): State<AppState>, Query(query): Query<HomeQuery>) -> Response {
    if let Some(code) = query.beep {
        return beep(&state, ScanCode::new(code)).await;
    }

    match render_home(&state, query.category.as_deref()) {
        Ok(html) => Html(html).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Remote scan: replies "ok" or the error text as plain text
async fn beep(state: &AppState, code: ScanCode) -> Response {
    match state.service.handle_scan(&code).await {
        Ok(_) => (StatusCode::OK, "ok".to_string()).into_response(),
        Err(e) => {
            let message = e.to_string();
            let status = ApiError::from(e).into_response().status();
            (status, message).into_response()
        }
    }
}

fn render_home(state: &AppState, category: Option<&str>) -> ApiResult<String> {
    let cache = state.service.load_cache()?;
    let products = match category {
        Some(category) => cache.recently_scanned_in(category),
        None => cache.recently_scanned(),
    };

    let mut rows = String::new();
    for (code, record) in &products {
        let _ = write!(
            rows,
            r#"<tr><td><a href="{href}">{name}</a></td><td>{product_type}</td><td>{category}</td><td>{last}</td></tr>"#,
            href = escape_html(&item_path(code)),
            name = escape_html(&record.name),
            product_type = escape_html(&record.product_type),
            category = escape_html(&record.product_category),
            last = format_time(record.last_scanned),
        );
    }

    let mut filters = format!(r#"<a href="{}">All</a>"#, APP_HOME_ROUTE);
    for c in state.categories.iter() {
        let _ = write!(
            filters,
            r#" | <a href="{}?category={}">{} {}</a>"#,
            APP_HOME_ROUTE,
            url::form_urlencoded::byte_serialize(c.label.as_bytes()).collect::<String>(),
            c.emoji,
            escape_html(c.label),
        );
    }

    let heading = match category {
        Some(category) => format!("Products in {}", escape_html(category)),
        None => "Recently scanned products".to_string(),
    };

    Ok(page(
        "Shopping list manager",
        &format!(
            r#"<h1>{heading}</h1>
    <p class="filters">{filters}</p>
    <table>
        <thead><tr><th>Name</th><th>Type</th><th>Category</th><th>Last scanned</th></tr></thead>
        <tbody>{rows}</tbody>
    </table>
    <p><small>{count} products</small></p>"#,
            count = products.len(),
        ),
    ))
}

/// GET /shopping-list-manager/item/:code
async fn item_page(State(state): State<AppState>, Path(code): Path<String>) -> ApiResult<Html<String>> {
    let code = ScanCode::new(code);
    let cache = state.service.load_cache()?;

    let record = match cache.lookup(&code) {
        Some(record) => record.clone(),
        None => ProductRecord::placeholder(&code),
    };

    let mut options = String::from(r#"<option value=""></option>"#);
    for c in state.categories.iter() {
        let selected = if c.label == record.product_category { " selected" } else { "" };
        let _ = write!(
            options,
            r#"<option value="{label}"{selected}>{emoji} {label}</option>"#,
            label = escape_html(c.label),
            emoji = c.emoji,
        );
    }

    Ok(Html(page(
        &format!("Edit {}", escape_html(code.as_str())),
        &format!(
            r#"<h1>{code}</h1>
    <p><a href="{home}">Back to products</a></p>
    <form method="post">
        <label>Name <input name="name" value="{name}" required></label>
        <label>Link <input name="link" value="{link}"></label>
        <label>Type <input name="product_type" value="{product_type}"></label>
        <label>Category <select name="product_category">{options}</select></label>
        <label>Notes <textarea name="notes">{notes}</textarea></label>
        <p>First scanned: {first} | Last scanned: {last}</p>
        <button type="submit">Save</button>
    </form>"#,
            code = escape_html(code.as_str()),
            home = APP_HOME_ROUTE,
            name = escape_html(&record.name),
            link = escape_html(&record.link),
            product_type = escape_html(&record.product_type),
            notes = escape_html(&record.notes),
            first = format_time(record.first_scanned),
            last = format_time(record.last_scanned),
        ),
    )))
}

/// Submitted correction form
#[derive(Debug, Deserialize)]
pub struct ItemForm {
    name: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    product_type: String,
    #[serde(default)]
    product_category: String,
    #[serde(default)]
    notes: String,
}

/// POST /shopping-list-manager/item/:code
async fn item_update(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Form(form): Form<ItemForm>,
) -> ApiResult<String> {
    let code = ScanCode::new(code);

    let name = form.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".to_string()));
    }

    let cache = state.service.load_cache()?;
    let mut record = match cache.lookup(&code) {
        Some(record) => record.clone(),
        None => ProductRecord::new("", ""),
    };

    record.name = name;
    record.link = form.link.trim().to_string();
    record.product_type = form.product_type.trim().to_string();
    record.product_category = form.product_category.trim().to_string();
    record.notes = form.notes.trim().to_string();

    state.service.record_correction(&code, &record).await?;

    tracing::info!(code = %code, name = %record.name, "Product corrected through UI");
    Ok(format!("updated: {}", record.name))
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Escape text for HTML element content and quoted attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
        body {{
            font-family: system-ui, -apple-system, sans-serif;
            max-width: 900px;
            margin: 40px auto;
            padding: 20px;
            line-height: 1.6;
        }}
        h1 {{
            color: #333;
            border-bottom: 2px solid #0066cc;
            padding-bottom: 10px;
            word-break: break-all;
        }}
        table {{ width: 100%; border-collapse: collapse; }}
        th, td {{ text-align: left; padding: 4px 8px; border-bottom: 1px solid #ddd; }}
        label {{ display: block; margin: 10px 0; }}
        input, select, textarea {{ width: 100%; padding: 6px; }}
        .filters {{ font-size: 0.9em; }}
    </style>
</head>
<body>
    {body}
</body>
</html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"Fish & Chips"</b> 'x'"#),
            "&lt;b&gt;&quot;Fish &amp; Chips&quot;&lt;/b&gt; &#39;x&#39;"
        );
        assert_eq!(escape_html("Maito"), "Maito");
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(None), "-");
        let t = DateTime::parse_from_rfc3339("2025-01-02T03:04:05Z").unwrap().with_timezone(&Utc);
        assert_eq!(format_time(Some(t)), "2025-01-02 03:04");
    }
}
