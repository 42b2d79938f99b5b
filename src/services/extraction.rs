//! Best-effort text extraction for uploaded files.
//!
//! Dispatches on the declared MIME type, falling back to the file extension.
//! Every branch degrades to an empty string on failure.

use crate::connectors::OcrConnector;
use crate::models::UploadedFile;
use actix_web::web::Bytes;
use calamine::Reader as _;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const XLS_MIME: &str = "application/vnd.ms-excel";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Word,
    Spreadsheet,
    Csv,
    Image,
    PlainText,
    Unsupported,
}

fn extension(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

fn kind_from_mime(content_type: &str, ext: Option<&str>) -> Option<FileKind> {
    // drop parameters such as "; charset=utf-8"
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "application/pdf" => Some(FileKind::Pdf),
        DOCX_MIME => Some(FileKind::Word),
        XLSX_MIME => Some(FileKind::Spreadsheet),
        // browsers on Windows label .csv files as Excel
        XLS_MIME if ext == Some("csv") => Some(FileKind::Csv),
        XLS_MIME => Some(FileKind::Spreadsheet),
        "text/csv" => Some(FileKind::Csv),
        "application/json" => Some(FileKind::PlainText),
        m if m.starts_with("image/") => Some(FileKind::Image),
        m if m.starts_with("text/") => Some(FileKind::PlainText),
        _ => None,
    }
}

fn kind_from_extension(ext: &str) -> Option<FileKind> {
    match ext {
        "pdf" => Some(FileKind::Pdf),
        "docx" => Some(FileKind::Word),
        "xlsx" | "xls" | "ods" => Some(FileKind::Spreadsheet),
        "csv" => Some(FileKind::Csv),
        "png" | "jpg" | "jpeg" | "gif" | "bmp" | "tif" | "tiff" | "webp" => Some(FileKind::Image),
        "txt" | "md" | "json" | "log" => Some(FileKind::PlainText),
        _ => None,
    }
}

/// MIME type first, extension second.
pub fn classify(content_type: &str, file_name: &str) -> FileKind {
    let ext = extension(file_name);
    kind_from_mime(content_type, ext.as_deref())
        .or_else(|| ext.as_deref().and_then(kind_from_extension))
        .unwrap_or(FileKind::Unsupported)
}

/// Extracts text from `file`, or returns an empty string.
#[tracing::instrument(name = "Extract text from upload.", skip_all, fields(file_name = %file.file_name))]
pub async fn extract_text(file: &UploadedFile, ocr: &dyn OcrConnector) -> String {
    let kind = classify(&file.content_type, &file.file_name);
    tracing::debug!(?kind, content_type = %file.content_type, "Dispatching extraction");

    match kind {
        FileKind::Unsupported => String::new(),
        FileKind::Image => ocr.recognize(file).await.unwrap_or_else(|err| {
            tracing::error!("OCR failed: {}", err);
            String::new()
        }),
        kind => {
            let bytes = file.bytes.clone();
            // parsers are CPU bound and may panic on malformed input
            match tokio::task::spawn_blocking(move || extract_blocking(kind, bytes)).await {
                Ok(Ok(text)) => text,
                Ok(Err(err)) => {
                    tracing::error!("Text extraction failed: {}", err);
                    String::new()
                }
                Err(err) => {
                    tracing::error!("Text extraction task aborted: {}", err);
                    String::new()
                }
            }
        }
    }
}

pub(crate) fn extract_blocking(kind: FileKind, bytes: Bytes) -> Result<String, String> {
    match kind {
        FileKind::Pdf => {
            pdf_extract::extract_text_from_mem(&bytes).map_err(|err| format!("pdf: {}", err))
        }
        FileKind::Word => docx_text(&bytes),
        FileKind::Spreadsheet => spreadsheet_csv(&bytes),
        FileKind::Csv | FileKind::PlainText => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        FileKind::Image | FileKind::Unsupported => Ok(String::new()),
    }
}

/// Raw text of a WordprocessingML body: runs concatenated, one line per paragraph.
/// Tabs and breaks count only inside runs; `w:tab` in paragraph properties is a tab stop.
pub(crate) fn document_xml_text(xml: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_run = false;
    let mut in_text = false;

    loop {
        match reader
            .read_event()
            .map_err(|err| format!("docx xml at {}: {}", reader.buffer_position(), err))?
        {
            Event::Start(tag) => match tag.name().as_ref() {
                b"w:r" => in_run = true,
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::End(tag) => match tag.name().as_ref() {
                b"w:r" => in_run = false,
                b"w:t" => in_text = false,
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Event::Empty(tag) if in_run => match tag.name().as_ref() {
                b"w:tab" => out.push('\t'),
                b"w:br" | b"w:cr" => out.push('\n'),
                _ => {}
            },
            Event::Text(text) if in_text => {
                let text = text
                    .unescape()
                    .map_err(|err| format!("docx xml: {}", err))?;
                out.push_str(&text);
            }
            Event::CData(data) if in_text => {
                out.push_str(&String::from_utf8_lossy(&data));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(out.trim_end().to_string())
}

fn docx_text(bytes: &[u8]) -> Result<String, String> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|err| format!("docx: {}", err))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|err| format!("docx: {}", err))?
        .read_to_string(&mut xml)
        .map_err(|err| format!("docx: {}", err))?;
    document_xml_text(&xml)
}

/// Every sheet as CSV, sheets joined by a newline.
fn spreadsheet_csv(bytes: &[u8]) -> Result<String, String> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|err| format!("spreadsheet: {}", err))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names().to_owned() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|err| format!("spreadsheet {}: {}", name, err))?;
        sheets.push(rows_to_csv(
            range
                .rows()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect()),
        )?);
    }
    Ok(sheets.join("\n"))
}

pub(crate) fn rows_to_csv<I>(rows: I) -> Result<String, String>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(vec![]);
    for row in rows {
        writer
            .write_record(&row)
            .map_err(|err| format!("csv: {}", err))?;
    }
    let bytes = writer.into_inner().map_err(|err| format!("csv: {}", err))?;
    let text = String::from_utf8(bytes).map_err(|err| format!("csv: {}", err))?;
    Ok(text.trim_end_matches('\n').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::ocr::mock::MockOcrConnector;
    use std::io::Write;

    fn file(name: &str, content_type: &str, bytes: &[u8]) -> UploadedFile {
        UploadedFile::new(name, content_type, bytes.to_vec())
    }

    fn docx_bytes(document_xml: &str) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buffer);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("word/document.xml", options).unwrap();
            zip.write_all(document_xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buffer.into_inner()
    }

    #[test]
    fn classify_by_mime() {
        assert_eq!(classify("application/pdf", "x.bin"), FileKind::Pdf);
        assert_eq!(classify(DOCX_MIME, "x"), FileKind::Word);
        assert_eq!(classify(XLSX_MIME, "x"), FileKind::Spreadsheet);
        assert_eq!(classify("text/csv", "x"), FileKind::Csv);
        assert_eq!(classify("image/png", "x"), FileKind::Image);
        assert_eq!(classify("text/plain; charset=utf-8", "x"), FileKind::PlainText);
    }

    #[test]
    fn classify_falls_back_to_extension() {
        assert_eq!(classify("application/octet-stream", "Report.DOCX"), FileKind::Word);
        assert_eq!(classify("", "data.csv"), FileKind::Csv);
        assert_eq!(classify("", "book.xlsx"), FileKind::Spreadsheet);
        assert_eq!(classify("", "scan.jpeg"), FileKind::Image);
        assert_eq!(classify(XLS_MIME, "export.csv"), FileKind::Csv);
    }

    #[test]
    fn classify_unknown() {
        assert_eq!(classify("application/zip", "archive.zip"), FileKind::Unsupported);
        assert_eq!(classify("", "noextension"), FileKind::Unsupported);
    }

    #[tokio::test]
    async fn csv_output_equals_input() {
        let csv = "name,qty\napple,3\n\"pear, green\",5";
        let text = extract_text(&file("fruit.csv", "text/csv", csv.as_bytes()), &MockOcrConnector::default()).await;
        assert_eq!(text, csv);
    }

    #[tokio::test]
    async fn unsupported_yields_empty_string() {
        let text = extract_text(
            &file("blob.bin", "application/x-unknown", b"\x00\x01\x02"),
            &MockOcrConnector::default(),
        )
        .await;
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn images_go_through_ocr() {
        let ocr = MockOcrConnector::new("recognized words");
        let text = extract_text(&file("scan.png", "image/png", b"\x89PNG"), &ocr).await;
        assert_eq!(text, "recognized words");
    }

    #[tokio::test]
    async fn broken_pdf_degrades_to_empty() {
        let text = extract_text(
            &file("broken.pdf", "application/pdf", b"not a pdf at all"),
            &MockOcrConnector::default(),
        )
        .await;
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn docx_paragraphs_become_lines() {
        let xml = r#"<?xml version="1.0"?><w:document><w:body><w:p><w:r><w:t>Hello</w:t></w:r><w:r><w:t xml:space="preserve"> world</w:t></w:r></w:p><w:p><w:r><w:t>A &amp; B</w:t><w:tab/><w:t>&#233;</w:t></w:r></w:p></w:body></w:document>"#;
        let bytes = docx_bytes(xml);
        let text = extract_text(&file("doc.docx", DOCX_MIME, &bytes), &MockOcrConnector::default()).await;
        assert_eq!(text, "Hello world\nA & B\té");
    }

    #[test]
    fn document_xml_ignores_tab_stops() {
        let xml = "<w:p><w:pPr><w:tabs><w:tab w:val=\"left\" w:pos=\"720\"/></w:tabs></w:pPr><w:r><w:t>x</w:t></w:r></w:p>";
        assert_eq!(document_xml_text(xml).unwrap(), "x");
    }

    #[test]
    fn document_xml_skips_empty_text_elements() {
        let xml = r#"<w:p><w:r><w:t xml:space="preserve"/></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>Bold</w:t></w:r></w:p>"#;
        assert_eq!(document_xml_text(xml).unwrap(), "Bold");
    }

    #[test]
    fn document_xml_keeps_breaks_inside_runs() {
        let xml = "<w:p><w:r><w:t>one</w:t><w:br/><w:t>two</w:t></w:r></w:p><w:p><w:r><w:t>three</w:t></w:r></w:p>";
        assert_eq!(document_xml_text(xml).unwrap(), "one\ntwo\nthree");
    }

    #[test]
    fn malformed_document_xml_is_an_error() {
        assert!(document_xml_text("<w:p><w:r><w:t>x</w:r></w:p>").is_err());
    }

    #[test]
    fn rows_to_csv_quotes_when_needed() {
        let csv = rows_to_csv(vec![
            vec!["a".to_string(), "b,c".to_string()],
            vec!["1".to_string(), "say \"hi\"".to_string()],
        ])
        .unwrap();
        assert_eq!(csv, "a,\"b,c\"\n1,\"say \"\"hi\"\"\"");
    }

    #[test]
    fn garbage_spreadsheet_is_an_error() {
        assert!(extract_blocking(FileKind::Spreadsheet, Bytes::from_static(b"nope")).is_err());
    }
}
