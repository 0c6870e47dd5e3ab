use crate::domain::error::{Error, Result};
use crate::domain::ports::parser::{DocumentParser, ParsedDocument, ParsedPage};
use async_trait::async_trait;
use lopdf::Document as PdfDocument;

/// PDF, via `lopdf`. One [`ParsedPage`] per physical page, in page-number order.
pub struct PdfParser;

#[async_trait]
impl DocumentParser for PdfParser {
    async fn parse(&self, bytes: &[u8]) -> Result<ParsedDocument> {
        let doc = PdfDocument::load_mem(bytes)
            .map_err(|e| Error::parse_error(format!("failed to load PDF: {e}")))?;

        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        let mut pages = Vec::with_capacity(page_numbers.len());
        for (index, page_num) in page_numbers.iter().enumerate() {
            let text = doc
                .extract_text(&[*page_num])
                .unwrap_or_default();
            pages.push(ParsedPage {
                index: index as u32,
                text,
            });
        }

        let mut metadata = serde_json::Map::new();
        if let Some(info) = pdf_info_dict(&doc) {
            for (key, pdf_key) in [("title", "Title"), ("author", "Author"), ("subject", "Subject")] {
                if let Ok(value) = info.get(pdf_key.as_bytes()) {
                    if let Ok(s) = value.as_str() {
                        metadata.insert(key.to_string(), serde_json::Value::String(s.to_string()));
                    }
                }
            }
            for (key, pdf_key) in [("created_at", "CreationDate"), ("modified_at", "ModDate")] {
                if let Ok(value) = info.get(pdf_key.as_bytes()) {
                    if let Ok(raw) = value.as_str() {
                        if let Some(parsed) = parse_pdf_date(raw) {
                            metadata.insert(
                                key.to_string(),
                                serde_json::Value::String(parsed.to_rfc3339()),
                            );
                        }
                    }
                }
            }
        }
        metadata.insert(
            "page_count".to_string(),
            serde_json::Value::from(page_numbers.len()),
        );

        Ok(ParsedDocument { pages, metadata })
    }

    fn extensions(&self) -> &[&'static str] {
        &["pdf"]
    }

    fn parser_name(&self) -> &'static str {
        "pdf"
    }
}

fn pdf_info_dict(doc: &PdfDocument) -> Option<lopdf::Dictionary> {
    let info_ref = doc.trailer.get(b"Info").ok()?;
    let obj = doc.get_object(info_ref.as_reference().ok()?).ok()?;
    obj.as_dict().ok().cloned()
}

/// Parses the PDF date format `D:YYYYMMDDHHmmSS` (timezone suffix, if present, is ignored —
/// callers only need a best-effort timestamp for metadata, not an authoritative one).
fn parse_pdf_date(raw: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    let digits = raw.strip_prefix("D:").unwrap_or(raw);
    if digits.len() >= 14 {
        chrono::NaiveDateTime::parse_from_str(&digits[..14], "%Y%m%d%H%M%S")
            .ok()
            .map(|naive| naive.and_utc())
    } else if digits.len() >= 8 {
        chrono::NaiveDate::parse_from_str(&digits[..8], "%Y%m%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_pdf_date() {
        let parsed = parse_pdf_date("D:20240115103000+00'00'").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-01-15T10:30:00+00:00");
    }

    #[test]
    fn parses_date_only_pdf_date() {
        let parsed = parse_pdf_date("D:20240115").unwrap();
        assert_eq!(parsed.format("%Y-%m-%d").to_string(), "2024-01-15");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_pdf_date("not a date").is_none());
    }
}
