//! Plain-text extraction for corpus files.
//!
//! Dispatches on the file extension: plain-text formats are read as UTF-8,
//! PDF goes through `pdf-extract`, and the OOXML family (docx, pptx, xlsx) is
//! unpacked with `zip` and scanned with `quick-xml`. Anything else is
//! [`LabelError::UnsupportedFormat`].

use std::io::{ErrorKind, Read};
use std::path::Path;

use thiserror::Error;

use crate::error::LabelError;

/// Extensions read verbatim as (lossy) UTF-8.
const PLAIN_TEXT_EXTENSIONS: &[&str] = &[
    "txt", "text", "md", "markdown", "rst", "csv", "tsv", "log", "json", "toml", "yaml", "yml",
    "xml", "html", "htm", "tex", "org",
];

/// Maximum sheets to read from an xlsx.
const XLSX_MAX_SHEETS: usize = 100;
/// Maximum cells to read per sheet.
const XLSX_MAX_CELLS_PER_SHEET: usize = 100_000;
/// Maximum decompressed bytes read from a single ZIP entry.
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Document kinds the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    PlainText,
    Pdf,
    Docx,
    Pptx,
    Xlsx,
}

impl Format {
    /// Classify a path by extension; `None` means unsupported.
    pub fn from_path(path: &Path) -> Option<Format> {
        let ext = match path.extension() {
            Some(ext) => ext.to_string_lossy().to_lowercase(),
            None => return Some(Format::PlainText),
        };
        match ext.as_str() {
            "pdf" => Some(Format::Pdf),
            "docx" => Some(Format::Docx),
            "pptx" => Some(Format::Pptx),
            "xlsx" => Some(Format::Xlsx),
            e if PLAIN_TEXT_EXTENSIONS.contains(&e) => Some(Format::PlainText),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
enum ExtractError {
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("OOXML extraction failed: {0}")]
    Ooxml(String),
}

/// Extract the plain text of the file at `path`.
///
/// Files larger than `max_bytes` are refused as unsupported rather than
/// loaded into memory.
pub fn extract_file(path: &Path, max_bytes: u64) -> Result<String, LabelError> {
    let unsupported = |reason: String| LabelError::UnsupportedFormat {
        path: path.to_path_buf(),
        reason,
    };

    let format = Format::from_path(path).ok_or_else(|| {
        unsupported(format!(
            "no extractor for .{} files",
            path.extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default()
        ))
    })?;

    let bytes = read_bounded(path, max_bytes)?;

    let text = match format {
        Format::PlainText => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Format::Pdf => extract_pdf(&bytes),
        Format::Docx => extract_docx(&bytes),
        Format::Pptx => extract_pptx(&bytes),
        Format::Xlsx => extract_xlsx(&bytes),
    };
    text.map_err(|e| unsupported(e.to_string()))
}

fn read_bounded(path: &Path, max_bytes: u64) -> Result<Vec<u8>, LabelError> {
    let file = std::fs::File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => LabelError::FileNotFound(path.to_path_buf()),
        _ => LabelError::UnsupportedFormat {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    })?;

    let mut out = Vec::new();
    file.take(max_bytes.saturating_add(1))
        .read_to_end(&mut out)
        .map_err(|e| LabelError::UnsupportedFormat {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    if out.len() as u64 > max_bytes {
        return Err(LabelError::UnsupportedFormat {
            path: path.to_path_buf(),
            reason: format!("file exceeds size limit ({} bytes)", max_bytes),
        });
    }
    Ok(out)
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

type Archive<'a> = zip::ZipArchive<std::io::Cursor<&'a [u8]>>;

fn open_archive(bytes: &[u8]) -> Result<Archive<'_>, ExtractError> {
    zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| ExtractError::Ooxml(e.to_string()))
}

fn read_zip_entry_bounded(
    archive: &mut Archive<'_>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, ExtractError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| ExtractError::Ooxml(format!("{}: {}", name, e)))?;
    let mut out = Vec::new();
    entry
        .take(max_bytes)
        .read_to_end(&mut out)
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    if out.len() as u64 >= max_bytes {
        return Err(ExtractError::Ooxml(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, max_bytes
        )));
    }
    Ok(out)
}

/// Entries matching `prefix<N>.xml`, ordered by N.
fn numbered_entries(archive: &Archive<'_>, prefix: &str) -> Vec<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with(prefix) && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    names.sort_by_key(|name| {
        name.trim_start_matches(prefix)
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    names
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = open_archive(bytes)?;
    let xml = read_zip_entry_bounded(&mut archive, "word/document.xml", MAX_XML_ENTRY_BYTES)?;
    collect_text_runs(&xml, " ")
}

fn extract_pptx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = open_archive(bytes)?;
    let mut out = String::new();
    for name in numbered_entries(&archive, "ppt/slides/slide") {
        let xml = read_zip_entry_bounded(&mut archive, &name, MAX_XML_ENTRY_BYTES)?;
        let text = collect_text_runs(&xml, " ")?;
        if !out.is_empty() && !text.is_empty() {
            out.push('\n');
        }
        out.push_str(&text);
    }
    Ok(out)
}

/// Concatenate the text of every `<*:t>` element (Word `w:t`, DrawingML `a:t`).
fn collect_text_runs(xml: &[u8], separator: &str) -> Result<String, ExtractError> {
    use quick_xml::events::Event;

    let mut runs: Vec<String> = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_t = true,
            Ok(Event::End(e)) if e.local_name().as_ref() == b"t" => in_t = false,
            Ok(Event::Text(te)) if in_t => {
                let text = te
                    .unescape()
                    .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
                if !text.is_empty() {
                    runs.push(text.into_owned());
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(runs.join(separator))
}

fn extract_xlsx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = open_archive(bytes)?;
    let has_shared_strings = archive
        .file_names()
        .any(|n| n == "xl/sharedStrings.xml");
    let shared_strings = if has_shared_strings {
        read_shared_strings(&mut archive)?
    } else {
        Vec::new()
    };

    let mut out = String::new();
    for name in numbered_entries(&archive, "xl/worksheets/sheet")
        .into_iter()
        .take(XLSX_MAX_SHEETS)
    {
        let sheet_xml = read_zip_entry_bounded(&mut archive, &name, MAX_XML_ENTRY_BYTES)?;
        let cells = extract_sheet_cells(&sheet_xml, &shared_strings)?;
        if !out.is_empty() && !cells.is_empty() {
            out.push('\n');
        }
        out.push_str(&cells);
    }
    Ok(out)
}

fn read_shared_strings(archive: &mut Archive<'_>) -> Result<Vec<String>, ExtractError> {
    use quick_xml::events::Event;

    let xml = read_zip_entry_bounded(archive, "xl/sharedStrings.xml", MAX_XML_ENTRY_BYTES)?;
    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut current: Option<String> = None;
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_t = true,
                _ => {}
            },
            Ok(Event::Text(te)) if in_t => {
                if let Some(s) = current.as_mut() {
                    let text = te
                        .unescape()
                        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
                    s.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"si" => strings.extend(current.take()),
                b"t" => in_t = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// Text of shared-string and inline-string cells; numeric cells are dropped.
fn extract_sheet_cells(xml: &[u8], shared_strings: &[String]) -> Result<String, ExtractError> {
    use quick_xml::events::Event;

    let mut cells: Vec<String> = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut cell_type: Option<Vec<u8>> = None;
    let mut in_value = false;
    loop {
        if cells.len() >= XLSX_MAX_CELLS_PER_SHEET {
            break;
        }
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"c" => {
                    cell_type = e
                        .attributes()
                        .flatten()
                        .find(|a| a.key.as_ref() == b"t")
                        .map(|a| a.value.into_owned());
                }
                b"v" | b"t" => in_value = true,
                _ => {}
            },
            Ok(Event::Text(te)) if in_value => {
                let raw = te
                    .unescape()
                    .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
                let value = raw.trim();
                match cell_type.as_deref() {
                    Some(b"s") => {
                        if let Some(s) = value
                            .parse::<usize>()
                            .ok()
                            .and_then(|i| shared_strings.get(i))
                        {
                            cells.push(s.clone());
                        }
                    }
                    Some(b"inlineStr") | Some(b"str") if !value.is_empty() => {
                        cells.push(value.to_string());
                    }
                    _ => {}
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => cell_type = None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(cells.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn zip_with(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::SimpleFileOptions::default();
            for (name, body) in entries {
                zip.start_file(*name, options).unwrap();
                zip.write_all(body.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn format_dispatch_by_extension() {
        assert_eq!(Format::from_path(Path::new("a.TXT")), Some(Format::PlainText));
        assert_eq!(Format::from_path(Path::new("README")), Some(Format::PlainText));
        assert_eq!(Format::from_path(Path::new("x.pdf")), Some(Format::Pdf));
        assert_eq!(Format::from_path(Path::new("x.Docx")), Some(Format::Docx));
        assert_eq!(Format::from_path(Path::new("photo.jpg")), None);
    }

    #[test]
    fn plain_text_is_read_verbatim() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("notes.md");
        std::fs::write(&path, "quarterly budget review").unwrap();
        assert_eq!(
            extract_file(&path, 1024).unwrap(),
            "quarterly budget review"
        );
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("image.png");
        std::fs::write(&path, [0x89u8, b'P', b'N', b'G']).unwrap();
        assert!(matches!(
            extract_file(&path, 1024),
            Err(LabelError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn missing_file_is_not_found() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            extract_file(&tmp.path().join("gone.txt"), 1024),
            Err(LabelError::FileNotFound(_))
        ));
    }

    #[test]
    fn oversized_file_is_refused() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("big.txt");
        std::fs::write(&path, "0123456789").unwrap();
        assert!(matches!(
            extract_file(&path, 4),
            Err(LabelError::UnsupportedFormat { .. })
        ));
        assert!(extract_file(&path, 10).is_ok());
    }

    #[test]
    fn invalid_pdf_is_unsupported() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.pdf");
        std::fs::write(&path, "not a pdf").unwrap();
        assert!(matches!(
            extract_file(&path, 1024),
            Err(LabelError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn docx_text_runs_are_joined() {
        let bytes = zip_with(&[(
            "word/document.xml",
            r#"<w:document xmlns:w="w"><w:body><w:p><w:r><w:t>invoice</w:t></w:r><w:r><w:t>overdue</w:t></w:r></w:p></w:body></w:document>"#,
        )]);
        assert_eq!(extract_docx(&bytes).unwrap(), "invoice overdue");
    }

    #[test]
    fn pptx_slides_are_read_in_order() {
        let bytes = zip_with(&[
            (
                "ppt/slides/slide10.xml",
                r#"<p:sld xmlns:a="a" xmlns:p="p"><a:t>last</a:t></p:sld>"#,
            ),
            (
                "ppt/slides/slide2.xml",
                r#"<p:sld xmlns:a="a" xmlns:p="p"><a:t>first</a:t></p:sld>"#,
            ),
        ]);
        assert_eq!(extract_pptx(&bytes).unwrap(), "first\nlast");
    }

    #[test]
    fn xlsx_shared_strings_resolve() {
        let bytes = zip_with(&[
            (
                "xl/sharedStrings.xml",
                r#"<sst><si><t>rent</t></si><si><t>groceries</t></si></sst>"#,
            ),
            (
                "xl/worksheets/sheet1.xml",
                r#"<worksheet><sheetData><row><c t="s"><v>1</v></c><c><v>42</v></c><c t="s"><v>0</v></c></row></sheetData></worksheet>"#,
            ),
        ]);
        assert_eq!(extract_xlsx(&bytes).unwrap(), "groceries rent");
    }
}
