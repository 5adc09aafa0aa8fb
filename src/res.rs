use axum::{debug_handler, http::header, response::IntoResponse};

#[macro_export]
macro_rules! include_res {
    (bytes, $p:expr) => {
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
    (str, $p:expr) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
}

#[debug_handler]
pub async fn stylesheet() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css")], include_res!(str, "/static/style.css"))
}

/// Minimal html escaping for user text spliced into templates. Braces are
/// escaped too, so spliced text never forms a `{placeholder}`.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '{' => out.push_str("&#123;"),
            '}' => out.push_str("&#125;"),
            _ => out.push(c),
        }
    }
    out
}

/// Fills `{error}` in a form page, or blanks it.
pub fn with_error(page: &str, error: Option<&str>) -> String {
    let error = match error {
        Some(msg) => format!(r#"<div class="error" role="alert">{}</div>"#, escape(msg)),
        None => String::new(),
    };
    page.replace("{error}", &error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("<b>\"hi\" & 'bye'</b>"), "&lt;b&gt;&quot;hi&quot; &amp; &#39;bye&#39;&lt;/b&gt;");
    }

    #[test]
    fn spliced_text_is_not_a_placeholder() {
        let page = "<h1>{username}</h1><p>{bio}</p>"
            .replace("{username}", &escape("{bio}"))
            .replace("{bio}", "secret");
        assert_eq!(page, "<h1>&#123;bio&#125;</h1><p>secret</p>");
    }

    #[test]
    fn blanks_missing_error() {
        assert_eq!(with_error("<p>{error}</p>", None), "<p></p>");
        assert!(with_error("{error}", Some("User not found")).contains("User not found"));
    }
}
