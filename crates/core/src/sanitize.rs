//! Streaming markup sanitizer.
//!
//! An optional pass over the raw HTML, before it is parsed, that drops active
//! content: executable and embedding elements, `on*` event handlers and
//! `javascript:` URLs.

/// Elements removed together with their content.
const ACTIVE_ELEMENTS: &[&str] = &["script", "iframe", "frame", "frameset", "object", "applet", "base"];

/// Attributes that may carry a navigable URL.
const URL_ATTRIBUTES: &[&str] = &["href", "src", "action", "formaction", "xlink:href"];

/// Removes active content from `html`.
///
/// Returns the input unchanged if the rewriter fails.
///
/// # Example
///
/// ```rust
/// use legible_core::sanitize_markup;
///
/// let clean = sanitize_markup(r#"<p onclick="steal()">Hi<script>x()</script></p>"#);
/// assert_eq!(clean, "<p>Hi</p>");
/// ```
pub fn sanitize_markup(html: &str) -> String {
    let mut handlers = vec![
        lol_html::element!("meta[http-equiv]", |el| {
            if el
                .get_attribute("http-equiv")
                .is_some_and(|value| value.eq_ignore_ascii_case("refresh"))
            {
                el.remove();
            }
            Ok(())
        }),
        lol_html::element!("*", |el| {
            let unsafe_attributes: Vec<String> = el
                .attributes()
                .iter()
                .filter(|attr| {
                    let name = attr.name();
                    name.starts_with("on")
                        || (URL_ATTRIBUTES.contains(&name.as_str()) && is_javascript_url(&attr.value()))
                })
                .map(|attr| attr.name())
                .collect();
            for name in unsafe_attributes {
                el.remove_attribute(&name);
            }
            Ok(())
        }),
    ];
    handlers.extend(ACTIVE_ELEMENTS.iter().map(|tag| {
        lol_html::element!(*tag, |el| {
            el.remove();
            Ok(())
        })
    }));

    let mut output = String::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings { element_content_handlers: handlers, ..Default::default() },
        |c: &[u8]| {
            output.push_str(&String::from_utf8_lossy(c));
        },
    );

    if rewriter.write(html.as_bytes()).is_err() {
        return html.to_string();
    }
    if rewriter.end().is_err() {
        return html.to_string();
    }

    output
}

fn is_javascript_url(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    compact.starts_with("javascript:") || compact.starts_with("vbscript:")
}
