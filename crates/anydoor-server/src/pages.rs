//! Fixed pages: home shell, generation shell, robots, sitemap.
//!
//! Presentation lives in the external front end; these shells only carry the
//! data it needs.

use anydoor_core::decode_path;
use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
};

use crate::api::AppState;
use crate::landing::escape_html;

pub(crate) async fn home(State(state): State<AppState>) -> Html<String> {
    Html(shell(&state.config.site_name, "/", ""))
}

/// Shell for a page that passed the gateway; the front end opens the
/// generation stream for `data-path`.
pub(crate) async fn generation_shell(State(state): State<AppState>, uri: Uri) -> Response {
    let raw_path = uri.path();
    let decoded = decode_path(raw_path);
    Html(shell(&state.config.site_name, raw_path, &decoded)).into_response()
}

pub(crate) async fn robots(State(state): State<AppState>) -> Response {
    let host = &state.config.host_url;
    let body = format!(
        "User-agent: *\nAllow: /\nDisallow: /api/\n\nHost: https://{host}\nSitemap: https://{host}/sitemap.xml\n"
    );
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}

pub(crate) async fn sitemap(State(state): State<AppState>) -> Response {
    let host = escape_html(&state.config.host_url);
    let body = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url>
    <loc>https://{host}/</loc>
    <changefreq>daily</changefreq>
    <priority>1.0</priority>
  </url>
</urlset>
"#
    );
    ([(header::CONTENT_TYPE, "application/xml; charset=utf-8")], body).into_response()
}

/// Static assets are served by the external front end.
pub(crate) async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

fn shell(site_name: &str, raw_path: &str, title_path: &str) -> String {
    let site = escape_html(site_name);
    let title = if title_path.is_empty() {
        site.clone()
    } else {
        format!("{} - {site}", escape_html(title_path))
    };
    let path = escape_html(raw_path);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{title}</title>
</head>
<body>
  <div id="anydoor-root" data-path="{path}" data-stream-endpoint="/api/stream"></div>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_carries_escaped_path() {
        let html = shell("Any Door", "/a/%22b", "/a/\"b");
        assert!(html.contains(r#"data-path="/a/%22b""#));
        assert!(html.contains("<title>/a/&quot;b - Any Door</title>"));
    }

    #[test]
    fn home_shell_title_is_site_name() {
        assert!(shell("Any Door", "/", "").contains("<title>Any Door</title>"));
    }
}
