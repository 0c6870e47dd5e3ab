use crate::domain::error::Result;
use crate::domain::ports::parser::{DocumentParser, ParsedDocument, ParsedPage};
use async_trait::async_trait;

/// Plain text and Markdown, with a best-effort encoding ladder since uploads are not guaranteed
/// to be UTF-8: UTF-8, UTF-8 with a BOM, GBK, GB18030, falling back to Latin-1 (which never
/// fails to decode, used as the last resort).
pub struct TextParser;

#[async_trait]
impl DocumentParser for TextParser {
    async fn parse(&self, bytes: &[u8]) -> Result<ParsedDocument> {
        let text = decode_best_effort(bytes);
        Ok(ParsedDocument {
            pages: vec![ParsedPage { index: 0, text }],
            metadata: Default::default(),
        })
    }

    fn extensions(&self) -> &[&'static str] {
        &["txt", "text", "log", "md", "markdown"]
    }

    fn parser_name(&self) -> &'static str {
        "text"
    }
}

/// Decodes `bytes` trying, in order: UTF-8, UTF-8 with a leading BOM stripped, GBK, GB18030, and
/// finally Latin-1 (via `encoding_rs::WINDOWS_1252`, which agrees with Latin-1 on bytes 0x00-0x7F
/// and never reports a decode error).
pub(crate) fn decode_best_effort(bytes: &[u8]) -> String {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    let stripped = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    if let Ok(s) = std::str::from_utf8(stripped) {
        return s.to_string();
    }

    for encoding in [encoding_rs::GBK, encoding_rs::GB18030] {
        let (decoded, _, had_errors) = encoding.decode(bytes);
        if !had_errors {
            return decoded.into_owned();
        }
    }

    let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    decoded.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn decodes_plain_utf8() {
        let parser = TextParser;
        let doc = parser.parse("hello world".as_bytes()).await.unwrap();
        assert_eq!(doc.full_text(), "hello world");
    }

    #[tokio::test]
    async fn strips_utf8_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("bom text".as_bytes());
        let parser = TextParser;
        let doc = parser.parse(&bytes).await.unwrap();
        assert_eq!(doc.full_text(), "bom text");
    }

    #[tokio::test]
    async fn falls_back_to_latin1_without_panicking() {
        let bytes = vec![0xFF, 0xFE, 0x00, 0x01];
        let parser = TextParser;
        let doc = parser.parse(&bytes).await.unwrap();
        assert!(!doc.full_text().is_empty());
    }
}
