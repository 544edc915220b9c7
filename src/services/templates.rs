//! HTML bodies for outgoing mail.

/// Escapes text for inclusion in HTML element content or attribute values.
#[must_use]
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
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

/// Wraps `body` (already HTML) in the support page layout.
#[must_use]
pub fn support_page(brand: &str, body: &str) -> String {
    let title = escape_html(brand);
    format!(
        r#"<!doctype html>
<html>
  <head>
    <meta name="viewport" content="width=device-width" />
    <meta http-equiv="Content-Type" content="text/html; charset=UTF-8" />
    <title>{title} - Support</title>
  </head>
  <body>
    {body}
  </body>
</html>"#
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Account verification mail sent by `/create-user`.
#[must_use]
pub fn verification_mail(brand: &str, name: &str, activation_link: &str) -> RenderedMail {
    let subject = format!("Hi {name}, please verify your {brand} account");

    let text = format!(
        "Hi {name},\n\n\
         Thanks for joining {brand}! Please confirm your email address by clicking on the link below.\n\
         We'll communicate with you from time to time via email so it's important that we have an up-to-date email address on file.\n\n\
         {activation_link}\n\n\
         If you did not sign up for an {brand} account please disregard this email.\n\n\
         Happy Earning,\n\
         {brand} Support\n"
    );

    let (name_html, brand_html, link_html) = (escape_html(name), escape_html(brand), escape_html(activation_link));
    let body = format!(
        r#"<p>Hi {name_html},</p>
    <p>Thanks for joining {brand_html}! Please confirm your email address by clicking on the link below.
    We'll communicate with you from time to time via email so it's important that we have an up-to-date email address on file.</p>
    <a href="{link_html}">Click here to verify your account</a>
    <p>If you did not sign up for an {brand_html} account please disregard this email.</p>
    <p>Happy Earning,<br />{brand_html} Support</p>"#
    );

    RenderedMail { subject, text, html: support_page(brand, &body) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#), "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;");
    }

    #[test]
    fn test_verification_mail_contains_link_in_both_bodies() {
        let mail = verification_mail("Errandspay", "Jane", "https://example.com/activate/abc123");

        assert_eq!(mail.subject, "Hi Jane, please verify your Errandspay account");
        assert!(mail.text.contains("https://example.com/activate/abc123"));
        assert!(mail.html.contains(r#"href="https://example.com/activate/abc123""#));
        assert!(mail.html.contains("<title>Errandspay - Support</title>"));
    }

    #[test]
    fn test_verification_mail_escapes_name_in_html() {
        let mail = verification_mail("Errandspay", "<script>", "https://example.com/a/b");
        assert!(mail.html.contains("Hi &lt;script&gt;,"));
        assert!(!mail.html.contains("<script>"));
    }
}
