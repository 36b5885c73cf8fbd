//! Static landing document served to search and social crawlers instead of a
//! generated page.

use anydoor_core::{decode_path, AppConfig};
use axum::{
    http::{header, HeaderValue},
    response::{Html, IntoResponse, Response},
};

/// Crawlers may reuse the landing document for an hour.
const LANDING_CACHE_CONTROL: &str = "public, max-age=3600";

pub(crate) fn render_landing(raw_path: &str, config: &AppConfig) -> Response {
    let mut response = Html(landing_html(raw_path, config)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(LANDING_CACHE_CONTROL),
    );
    response
}

fn landing_html(raw_path: &str, config: &AppConfig) -> String {
    let decoded = decode_path(raw_path);
    let path = escape_html(&decoded);
    let site = escape_html(&config.site_name);
    let host = escape_html(&config.host_url);
    let url_path = escape_html(raw_path);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{path} - {site}</title>
  <meta name="description" content="{site}: type any path and a page for it is generated in real time.">
  <meta property="og:title" content="{path} - {site}">
  <meta property="og:description" content="Type any path and a unique page for it is generated in real time.">
  <meta property="og:type" content="website">
  <meta property="og:url" content="https://{host}{url_path}">
</head>
<body style="font-family: system-ui, sans-serif; max-width: 600px; margin: 40px auto; padding: 0 20px; color: #333;">
  <h1>{site}</h1>
  <p>Every URL path on this site is a door: open one and a page for it is generated as you watch.</p>
  <p>Current path: <strong>{path}</strong></p>
  <p>Visit in a browser to see the generated page.</p>
  <p><a href="https://{host}">Go to the {site} home page</a></p>
</body>
</html>
"#
    )
}

/// Escape HTML special characters.
pub(crate) fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::test_config;

    #[test]
    fn landing_uses_decoded_path_and_og_tags() {
        let html = landing_html("/%E7%A7%8B%E5%A4%A9/%E8%90%BD%E5%8F%B6", &test_config());
        assert!(html.contains("<title>/秋天/落叶 - Any Door</title>"));
        assert!(html.contains(r#"<meta property="og:title" content="/秋天/落叶 - Any Door">"#));
        assert!(html.contains(r#"<meta property="og:type" content="website">"#));
        assert!(html.contains(
            r#"content="https://localhost:3000/%E7%A7%8B%E5%A4%A9/%E8%90%BD%E5%8F%B6""#
        ));
    }

    #[test]
    fn landing_escapes_markup_in_path() {
        let html = landing_html("/%3Cscript%3Ealert(1)%3C%2Fscript%3E", &test_config());
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    }

    #[test]
    fn escape_html_covers_quotes() {
        assert_eq!(escape_html(r#"a&b"c'd"#), "a&amp;b&quot;c&#39;d");
    }
}
