use crate::domain::error::{Error, Result};
use crate::domain::ports::parser::{DocumentParser, ParsedDocument, ParsedPage};
use async_trait::async_trait;
use calamine::{Data, Reader as _, Xlsx};
use std::io::Cursor;

/// Excel `.xlsx`/`.xlsm`, via `calamine`. One virtual page per worksheet, rendered as
/// pipe-delimited rows with a `## {sheet name}` heading, matching the textual shape callers of
/// the other parsers already expect.
pub struct XlsxParser;

#[async_trait]
impl DocumentParser for XlsxParser {
    async fn parse(&self, bytes: &[u8]) -> Result<ParsedDocument> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
            .map_err(|e| Error::parse_error(format!("failed to open workbook: {e}")))?;

        let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
        let mut pages = Vec::with_capacity(sheet_names.len());

        for (index, sheet_name) in sheet_names.iter().enumerate() {
            let range = workbook
                .worksheet_range(sheet_name)
                .map_err(|e| Error::parse_error(format!("failed to read sheet {sheet_name}: {e}")))?;

            let body = render_sheet(&range);
            pages.push(ParsedPage {
                index: index as u32,
                text: format!("## {sheet_name}\n\n{body}"),
            });
        }

        let mut metadata = serde_json::Map::new();
        metadata.insert(
            "sheet_names".to_string(),
            serde_json::Value::Array(
                sheet_names.iter().cloned().map(serde_json::Value::String).collect(),
            ),
        );
        metadata.insert("sheet_count".to_string(), serde_json::Value::from(sheet_names.len()));

        Ok(ParsedDocument { pages, metadata })
    }

    fn extensions(&self) -> &[&'static str] {
        &["xlsx", "xlsm", "xltx", "xltm"]
    }

    fn parser_name(&self) -> &'static str {
        "xlsx"
    }
}

fn render_sheet(range: &calamine::Range<Data>) -> String {
    let mut rows_text = Vec::new();
    for row in range.rows() {
        let cells: Vec<String> = row.iter().map(cell_to_string).collect();
        if cells.iter().any(|c| !c.trim().is_empty()) {
            rows_text.push(cells.join(" | "));
        }
    }
    rows_text.join("\n")
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(d) => d.to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#ERROR:{e:?}"),
    }
}
