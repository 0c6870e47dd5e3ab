use super::text::decode_best_effort;
use crate::domain::error::Result;
use crate::domain::ports::parser::{DocumentParser, ParsedDocument, ParsedPage};
use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;

/// HTML, decoded honoring a declared `<meta charset>`/`Content-Type` before falling back to the
/// same encoding ladder as [`super::TextParser`]. Script/style blocks and tags are stripped with
/// a tag-stripping pass rather than a full DOM parse, matching the fallback path of the
/// system this was modeled on.
pub struct HtmlParser;

#[async_trait]
impl DocumentParser for HtmlParser {
    async fn parse(&self, bytes: &[u8]) -> Result<ParsedDocument> {
        let content = decode_html(bytes);
        let title = extract_title(&content);
        let text = strip_tags(&content);

        let mut metadata = serde_json::Map::new();
        if let Some(title) = title {
            metadata.insert("title".to_string(), serde_json::Value::String(title));
        }

        Ok(ParsedDocument {
            pages: vec![ParsedPage { index: 0, text }],
            metadata,
        })
    }

    fn extensions(&self) -> &[&'static str] {
        &["html", "htm", "xhtml"]
    }

    fn parser_name(&self) -> &'static str {
        "html"
    }
}

fn decode_html(bytes: &[u8]) -> String {
    if let Some(label) = declared_charset(bytes) {
        if let Some(encoding) = encoding_rs::Encoding::for_label(label.as_bytes()) {
            let (decoded, _, had_errors) = encoding.decode(bytes);
            if !had_errors {
                return decoded.into_owned();
            }
        }
    }
    decode_best_effort(bytes)
}

/// Looks for a `<meta charset="...">` or `<meta http-equiv="Content-Type" content="...charset=...">`
/// declaration in the first 1024 bytes, ASCII-decoded (charset names are always ASCII).
fn declared_charset(bytes: &[u8]) -> Option<String> {
    static CHARSET_RE: OnceLock<Regex> = OnceLock::new();
    static CONTENT_TYPE_RE: OnceLock<Regex> = OnceLock::new();

    let head_len = bytes.len().min(1024);
    let head: String = bytes[..head_len].iter().map(|&b| b as char).collect();

    let charset_re =
        CHARSET_RE.get_or_init(|| Regex::new(r#"(?i)<meta[^>]+charset=["']?([^"'\s>]+)"#).unwrap());
    if let Some(cap) = charset_re.captures(&head) {
        return Some(cap[1].to_string());
    }

    let content_type_re = CONTENT_TYPE_RE
        .get_or_init(|| Regex::new(r#"(?i)<meta[^>]+content=["'][^"']*charset=([^"'\s;]+)"#).unwrap());
    content_type_re.captures(&head).map(|cap| cap[1].to_string())
}

fn extract_title(html: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?is)<title[^>]*>([^<]+)</title>").unwrap());
    re.captures(html).map(|cap| cap[1].trim().to_string())
}

fn strip_tags(html: &str) -> String {
    static SCRIPT_RE: OnceLock<Regex> = OnceLock::new();
    static STYLE_RE: OnceLock<Regex> = OnceLock::new();
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

    let script_re =
        SCRIPT_RE.get_or_init(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").unwrap());
    let style_re = STYLE_RE.get_or_init(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").unwrap());
    let tag_re = TAG_RE.get_or_init(|| Regex::new(r"<[^>]+>").unwrap());
    let whitespace_re = WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").unwrap());

    let text = script_re.replace_all(html, "");
    let text = style_re.replace_all(&text, "");
    let text = tag_re.replace_all(&text, " ");
    let text = decode_entities(&text);
    whitespace_re.replace_all(text.trim(), " ").to_string()
}

/// Decodes the handful of HTML entities that actually show up in extracted body text. Not a
/// full entity table — numeric/named references beyond these are left as-is, which is harmless
/// since they only ever appear in markup we've already stripped.
fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn strips_script_and_tags() {
        let parser = HtmlParser;
        let html = b"<html><head><title>Hi</title></head><body><script>evil()</script><p>hello</p></body></html>";
        let doc = parser.parse(html).await.unwrap();
        assert_eq!(doc.full_text(), "hello");
        assert_eq!(doc.metadata.get("title").unwrap(), "Hi");
    }

    #[test]
    fn finds_declared_meta_charset() {
        let html = br#"<html><head><meta charset="gbk"></head></html>"#;
        assert_eq!(declared_charset(html), Some("gbk".to_string()));
    }
}
