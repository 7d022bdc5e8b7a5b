//! Auto-submitting HTML form for the `form_post` response modes.

/// Renders a document that posts `inputs` as hidden fields to `action` on
/// load.
#[must_use]
pub fn render_form<'a>(action: &str, inputs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut html = format!(
        r#"<html><head><title>Submit This Form</title></head><body onload="javascript:document.forms[0].submit()"><form method="post" action="{}">"#,
        html_escape(action)
    );
    for (name, value) in inputs {
        html.push_str(&format!(
            r#"<input type="hidden" name="{}" value="{}"/>"#,
            html_escape(name),
            html_escape(value)
        ));
    }
    html.push_str("</form></body></html>");
    html
}

/// Escapes HTML special characters.
#[must_use]
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_form() {
        let html = render_form("http://redirecturl.com/", [("response", "a.b.c")]);
        assert_eq!(
            html,
            r#"<html><head><title>Submit This Form</title></head><body onload="javascript:document.forms[0].submit()"><form method="post" action="http://redirecturl.com/"><input type="hidden" name="response" value="a.b.c"/></form></body></html>"#
        );
    }

    #[test]
    fn test_render_form_without_inputs() {
        let html = render_form("https://rp.example.com/cb", []);
        assert!(html.contains(r#"action="https://rp.example.com/cb"></form>"#));
        assert!(!html.contains("<input"));
    }

    #[test]
    fn test_render_form_escapes_values() {
        let html = render_form(
            "https://rp.example.com/cb?a=1&b=2",
            [("state", r#""><script>alert('x')</script>"#)],
        );
        assert!(html.contains("action=\"https://rp.example.com/cb?a=1&amp;b=2\""));
        assert!(html.contains("&quot;&gt;&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape("a&b"), "a&amp;b");
        assert_eq!(html_escape("\"quoted\""), "&quot;quoted&quot;");
    }
}
