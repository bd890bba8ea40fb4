use axum::response::{Html, Redirect};
use serde::Deserialize;
use crate::errors::{AppError, AppResult};

const TEMPLATE_DIR: &str = "templates";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Info,
    Warning,
    Danger,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Danger => "danger",
        }
    }

    // Unknown levels fall back to Info rather than rejecting the request
    pub fn parse(raw: &str) -> Self {
        match raw {
            "success" => Level::Success,
            "warning" => Level::Warning,
            "danger" => Level::Danger,
            _ => Level::Info,
        }
    }
}

/// A one-shot message shown on the page a redirect lands on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: Level,
    pub message: String,
}

impl Notice {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self { level, message: message.into() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Level::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Level::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Level::Warning, message)
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self::new(Level::Danger, message)
    }

    pub fn location(&self, path: &str) -> String {
        format!(
            "{}?notice={}&level={}",
            path,
            urlencoding::encode(&self.message),
            self.level.as_str()
        )
    }

    pub fn redirect(&self, path: &str) -> Redirect {
        Redirect::to(&self.location(path))
    }

    pub fn to_html(&self) -> String {
        format!(
            r#"<div class="notice notice-{}">{}</div>"#,
            self.level.as_str(),
            escape_html(&self.message)
        )
    }
}

/// Query parameters carried by a redirect with a notice.
#[derive(Debug, Default, Deserialize)]
pub struct NoticeQuery {
    pub notice: Option<String>,
    pub level: Option<String>,
}

impl NoticeQuery {
    pub fn into_notice(self) -> Option<Notice> {
        self.notice
            .filter(|m| !m.is_empty())
            .map(|m| Notice::new(self.level.as_deref().map(Level::parse).unwrap_or(Level::Info), m))
    }
}

pub fn notice_html(notice: Option<&Notice>) -> String {
    notice.map(Notice::to_html).unwrap_or_default()
}

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

/// Loads `templates/<name>.html` and substitutes `{{key}}` placeholders.
/// Values are inserted verbatim, so callers escape user-supplied text.
pub fn render(name: &str, vars: &[(&str, String)]) -> AppResult<Html<String>> {
    let path = format!("{}/{}.html", TEMPLATE_DIR, name);
    let template = std::fs::read_to_string(&path).map_err(|e| {
        tracing::error!("Failed to read template {}: {}", path, e);
        AppError::File(e)
    })?;

    Ok(Html(fill(&template, vars)))
}

// One pass over the template: inserted values are never scanned again, and
// placeholders with no matching var are left as they are.
fn fill(template: &str, vars: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let value = after.find("}}").and_then(|end| {
            let key = &after[..end];
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (value, end))
        });

        match value {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + 2..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_notice_location_is_encoded() {
        let notice = Notice::danger("Bad password & name");
        assert_eq!(
            notice.location("/login"),
            "/login?notice=Bad%20password%20%26%20name&level=danger"
        );
    }

    #[test]
    fn test_notice_query() {
        let query = NoticeQuery { notice: Some("hi".into()), level: None };
        assert_eq!(query.into_notice(), Some(Notice::info("hi")));

        let query = NoticeQuery { notice: Some("oops".into()), level: Some("danger".into()) };
        assert_eq!(query.into_notice(), Some(Notice::danger("oops")));

        let odd = NoticeQuery { notice: Some("x".into()), level: Some("shouting".into()) };
        assert_eq!(odd.into_notice().map(|n| n.level), Some(Level::Info));

        let empty = NoticeQuery { notice: Some(String::new()), level: Some("danger".into()) };
        assert_eq!(empty.into_notice(), None);
    }

    #[test]
    fn test_notice_html_escapes_message() {
        let html = Notice::warning("<script>").to_html();
        assert_eq!(html, r#"<div class="notice notice-warning">&lt;script&gt;</div>"#);
        assert_eq!(notice_html(None), "");
    }

    #[test]
    fn test_render_substitutes_placeholders() {
        let Html(page) = render("login", &[("notice", "<p>hello</p>".to_string())]).unwrap();
        assert!(page.contains("<p>hello</p>"));
        assert!(!page.contains("{{notice}}"));
    }

    #[test]
    fn test_fill_does_not_expand_inserted_values() {
        let page = fill(
            "<h1>{{username}}</h1><table>{{rows}}</table>",
            &[
                ("username", "{{rows}}".to_string()),
                ("rows", "<tr></tr>".to_string()),
            ],
        );
        assert_eq!(page, "<h1>{{rows}}</h1><table><tr></tr></table>");
    }

    #[test]
    fn test_fill_keeps_unknown_placeholders() {
        assert_eq!(fill("a {{missing}} b {{x}}", &[("x", "1".to_string())]), "a {{missing}} b 1");
        assert_eq!(fill("open {{ only", &[]), "open {{ only");
        assert_eq!(fill("{{x}}{{x}}", &[("x", "y".to_string())]), "yy");
    }
}
