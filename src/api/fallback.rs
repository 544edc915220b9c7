use crate::api::middleware::ApiAuth;
use crate::services::templates::escape_html;
use axum::{
    Json,
    http::{HeaderMap, StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
};
use serde_json::json;

/// Representation chosen for a response from the request's `Accept` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    Html,
    Json,
    Text,
}

/// Whether `accept` admits `kind/subtype`. A missing header accepts anything.
fn accepts(accept: Option<&str>, kind: &str, subtype: &str) -> bool {
    let Some(accept) = accept else {
        return true;
    };

    accept.split(',').any(|range| {
        let mut params = range.split(';');
        let media = params.next().unwrap_or_default().trim();
        let quality = params
            .filter_map(|p| p.trim().strip_prefix("q="))
            .find_map(|q| q.trim().parse::<f32>().ok())
            .unwrap_or(1.0);
        if quality <= 0.0 {
            return false;
        }

        let (range_kind, range_subtype) = media.split_once('/').unwrap_or((media, ""));
        (range_kind == "*" || range_kind.eq_ignore_ascii_case(kind))
            && (range_subtype == "*" || range_subtype.eq_ignore_ascii_case(subtype))
    })
}

/// HTML first, then JSON, then plain text.
#[must_use]
pub fn negotiate(accept: Option<&str>) -> Representation {
    if accepts(accept, "text", "html") {
        Representation::Html
    } else if accepts(accept, "application", "json") {
        Representation::Json
    } else {
        Representation::Text
    }
}

fn not_found_page(url: &str) -> String {
    format!(
        r#"<!doctype html>
<html>
  <head>
    <meta charset="utf-8" />
    <title>404 Not Found</title>
  </head>
  <body>
    <h1>Not found</h1>
    <p>The requested URL {} was not found on this server.</p>
  </body>
</html>"#,
        escape_html(url)
    )
}

/// Fallback for unmatched routes and methods. Credentials are checked first,
/// so unauthenticated callers get 401 whatever the path.
pub async fn not_found(_auth: ApiAuth, uri: Uri, headers: HeaderMap) -> Response {
    let accept = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok());
    tracing::debug!(path = %uri.path(), "Route not found");

    match negotiate(accept) {
        Representation::Html => (StatusCode::NOT_FOUND, Html(not_found_page(&uri.to_string()))).into_response(),
        Representation::Json => (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response(),
        Representation::Text => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}
