use crate::domain::error::{Error, Result};
use crate::domain::ports::parser::{DocumentParser, ParsedDocument, ParsedPage};
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};

/// Word `.docx`, via `zip` (the format is a zip of XML parts) and `quick-xml` for
/// `word/document.xml`. Splits into virtual pages at `Heading 1`/`Heading 2` paragraphs,
/// falling back to a single page when the document has no headings.
pub struct DocxParser;

#[async_trait]
impl DocumentParser for DocxParser {
    async fn parse(&self, bytes: &[u8]) -> Result<ParsedDocument> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| Error::parse_error(format!("not a valid docx/zip: {e}")))?;

        let document_xml = read_zip_entry(&mut archive, "word/document.xml")
            .ok_or_else(|| Error::parse_error("docx missing word/document.xml"))?;
        let core_xml = read_zip_entry(&mut archive, "docProps/core.xml");

        let paragraphs = extract_paragraphs(&document_xml)?;
        let pages = split_into_pages(&paragraphs);

        let mut metadata = serde_json::Map::new();
        if let Some(core_xml) = core_xml {
            for (key, value) in extract_core_properties(&core_xml) {
                metadata.insert(key, serde_json::Value::String(value));
            }
        }
        metadata.insert(
            "paragraph_count".to_string(),
            serde_json::Value::from(paragraphs.len()),
        );

        Ok(ParsedDocument { pages, metadata })
    }

    fn extensions(&self) -> &[&'static str] {
        &["docx"]
    }

    fn parser_name(&self) -> &'static str {
        "docx"
    }
}

struct Paragraph {
    text: String,
    heading_level: Option<u8>,
}

fn read_zip_entry<R: Read + std::io::Seek>(
    archive: &mut zip::ZipArchive<R>,
    name: &str,
) -> Option<String> {
    let mut file = archive.by_name(name).ok()?;
    let mut buf = String::new();
    file.read_to_string(&mut buf).ok()?;
    Some(buf)
}

fn extract_paragraphs(xml: &str) -> Result<Vec<Paragraph>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut paragraphs = Vec::new();
    let mut current_text = String::new();
    let mut current_style: Option<String> = None;
    let mut in_text_run = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = e.name();
                let local = name.as_ref();
                if local.ends_with(b"pStyle") {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref().ends_with(b"val") {
                            current_style = Some(
                                String::from_utf8_lossy(&attr.value).to_string(),
                            );
                        }
                    }
                } else if local.ends_with(b":t") || local == b"t" {
                    in_text_run = true;
                } else if local.ends_with(b":p") || local == b"p" {
                    current_text.clear();
                    current_style = None;
                }
            }
            Ok(Event::Text(e)) if in_text_run => {
                current_text.push_str(&e.unescape().unwrap_or_default());
            }
            Ok(Event::End(e)) => {
                let local = e.name();
                let local = local.as_ref();
                if local.ends_with(b":t") || local == b"t" {
                    in_text_run = false;
                } else if local.ends_with(b":p") || local == b"p" {
                    let heading_level = current_style.as_deref().and_then(heading_level_of);
                    let text = current_text.trim().to_string();
                    if !text.is_empty() || heading_level.is_some() {
                        paragraphs.push(Paragraph { text, heading_level });
                    }
                    current_text.clear();
                    current_style = None;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::parse_error(format!("malformed docx XML: {e}"))),
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}

fn heading_level_of(style: &str) -> Option<u8> {
    let lower = style.to_lowercase();
    if lower.contains("heading") || lower.contains('\u{6807}') {
        if lower.contains('1') {
            return Some(1);
        }
        if lower.contains('2') {
            return Some(2);
        }
    }
    None
}

fn split_into_pages(paragraphs: &[Paragraph]) -> Vec<ParsedPage> {
    let mut pages = Vec::new();
    let mut current = Vec::new();

    for para in paragraphs {
        if para.heading_level.is_some() && !current.is_empty() {
            pages.push(make_page(pages.len() as u32, &current));
            current.clear();
        }
        if !para.text.is_empty() {
            current.push(para.text.as_str());
        }
    }
    if !current.is_empty() {
        pages.push(make_page(pages.len() as u32, &current));
    }

    if pages.is_empty() {
        let all: Vec<&str> = paragraphs
            .iter()
            .map(|p| p.text.as_str())
            .filter(|t| !t.is_empty())
            .collect();
        pages.push(make_page(0, &all));
    }

    pages
}

fn make_page(index: u32, paragraphs: &[&str]) -> ParsedPage {
    ParsedPage {
        index,
        text: paragraphs.join("\n\n"),
    }
}

fn extract_core_properties(xml: &str) -> Vec<(String, String)> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut out = Vec::new();
    let mut current_tag: Option<&'static str> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let local = e.name();
                let local = local.as_ref();
                current_tag = if local.ends_with(b":title") {
                    Some("title")
                } else if local.ends_with(b":creator") {
                    Some("author")
                } else if local.ends_with(b":created") {
                    Some("created_at")
                } else {
                    None
                };
            }
            Ok(Event::Text(e)) => {
                if let Some(tag) = current_tag {
                    let value = e.unescape().unwrap_or_default().to_string();
                    if !value.is_empty() {
                        out.push((tag.to_string(), value));
                    }
                }
            }
            Ok(Event::End(_)) => current_tag = None,
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    out
}
