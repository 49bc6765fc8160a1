//! Per-format extraction of study documents into titled chunks.
//!
//! Each extractor reduces its format to titled sections and hands them
//! to the shared windowing pass in `study_harness_core::segment`.
//! OOXML formats (docx, pptx, xlsx) are ZIP archives of XML parts read
//! with `zip` + `quick-xml`; PDF text comes from `pdf-extract` and
//! embedded PDF images from `lopdf`. Extractors take bytes, not paths,
//! so tests can feed in-memory archives.
//!
//! Extraction errors are returned, never panicked; the pipeline catches
//! them per file and continues the batch.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::OnceLock;

use anyhow::{anyhow, bail, Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;

use study_harness_core::models::Chunk;
use study_harness_core::segment::{section_to_chunks, segment_markdown, segment_plain_text, WindowPolicy};

use crate::config::Config;
use crate::images;

/// Extensions the pipeline accepts. Anything else is skipped with a
/// diagnostic rather than failing the batch.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "docx", "pptx", "pdf", "xlsx", "xls", "txt", "md", "markdown", "csv",
];

pub fn is_supported(ext: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&ext)
}

/// Zip-bomb guard for a single decompressed archive entry.
const MAX_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Extract a file into raw (unfiltered, unindexed) chunks.
pub fn extract_file(path: &Path, config: &Config) -> Result<Vec<Chunk>> {
    let fname = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("invalid file name: {}", path.display()))?
        .to_string();
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document")
        .to_string();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let policy = config.window_policy();
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    match ext.as_str() {
        "docx" => extract_docx(&bytes, &fname, policy),
        "pptx" => extract_pptx(&bytes, &fname, &stem, policy, &config.images_dir()),
        "pdf" => extract_pdf(
            &bytes,
            &fname,
            &stem,
            &config.images_dir(),
            config.images.min_pixel_area,
        ),
        "xlsx" | "xls" => extract_xlsx(&bytes, &fname),
        "md" | "markdown" => {
            let content = String::from_utf8_lossy(&bytes);
            Ok(segment_markdown(&fname, &content, policy))
        }
        "txt" | "csv" => {
            let content = String::from_utf8_lossy(&bytes);
            Ok(segment_plain_text(&fname, &content, policy))
        }
        other => bail!("unsupported extension: .{}", other),
    }
}

fn read_zip_entry(
    archive: &mut zip::ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<Vec<u8>> {
    let entry = archive
        .by_name(name)
        .with_context(|| format!("archive entry not found: {}", name))?;
    let mut out = Vec::new();
    entry.take(MAX_ENTRY_BYTES).read_to_end(&mut out)?;
    if out.len() as u64 >= MAX_ENTRY_BYTES {
        bail!("archive entry {} exceeds size limit", name);
    }
    Ok(out)
}

fn attr_value(e: &quick_xml::events::BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes().flatten().find_map(|a| {
        if a.key.local_name().as_ref() == key {
            Some(String::from_utf8_lossy(&a.value).into_owned())
        } else {
            None
        }
    })
}

// ---------------------------------------------------------------------------
// Word documents
// ---------------------------------------------------------------------------

/// Split a .docx on heading-style paragraphs. Body runs between
/// headings window into chunks under that heading (content before the
/// first heading is `Introduction`); each table becomes one `Table N`
/// chunk of `cell | cell | …` rows.
pub fn extract_docx(bytes: &[u8], fname: &str, policy: WindowPolicy) -> Result<Vec<Chunk>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let doc_xml = read_zip_entry(&mut archive, "word/document.xml")?;

    let mut chunks: Vec<Chunk> = Vec::new();
    let mut tables: Vec<String> = Vec::new();

    let mut current_heading = "Introduction".to_string();
    let mut current_text: Vec<String> = Vec::new();
    let mut para_buf = String::new();
    let mut para_style: Option<String> = None;

    let mut tbl_depth = 0usize;
    let mut table_rows: Vec<String> = Vec::new();
    let mut row_cells: Vec<String> = Vec::new();
    let mut cell_buf = String::new();
    let mut in_t = false;

    let mut flush_section =
        |heading: &str, text: &mut Vec<String>, chunks: &mut Vec<Chunk>| {
            if text.is_empty() {
                return;
            }
            let body = text.join("\n");
            chunks.extend(section_to_chunks(fname, "docx", heading, &body, None, policy));
            text.clear();
        };

    let mut reader = Reader::from_reader(doc_xml.as_slice());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"tbl" => {
                    tbl_depth += 1;
                    if tbl_depth == 1 {
                        table_rows.clear();
                    }
                }
                b"tr" if tbl_depth > 0 => row_cells.clear(),
                b"tc" if tbl_depth > 0 => cell_buf.clear(),
                b"p" if tbl_depth == 0 => {
                    para_buf.clear();
                    para_style = None;
                }
                b"pStyle" => para_style = attr_value(&e, b"val"),
                b"t" => in_t = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"pStyle" {
                    para_style = attr_value(&e, b"val");
                }
            }
            Ok(Event::Text(t)) if in_t => {
                let text = t.unescape().unwrap_or_default();
                if tbl_depth > 0 {
                    cell_buf.push_str(&text);
                } else {
                    para_buf.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"tc" if tbl_depth > 0 => row_cells.push(cell_buf.trim().to_string()),
                b"tr" if tbl_depth > 0 => table_rows.push(row_cells.join(" | ")),
                b"tbl" => {
                    tbl_depth = tbl_depth.saturating_sub(1);
                    if tbl_depth == 0 && !table_rows.is_empty() {
                        tables.push(table_rows.join("\n"));
                        table_rows.clear();
                    }
                }
                b"p" if tbl_depth == 0 => {
                    let text = para_buf.trim().to_string();
                    if !text.is_empty() {
                        let is_heading = para_style
                            .as_deref()
                            .map(|s| s.starts_with("Heading"))
                            .unwrap_or(false);
                        if is_heading {
                            flush_section(&current_heading, &mut current_text, &mut chunks);
                            current_heading = text;
                        } else {
                            current_text.push(text);
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => bail!("docx parse error: {}", e),
            _ => {}
        }
        buf.clear();
    }
    flush_section(&current_heading, &mut current_text, &mut chunks);

    for (i, table) in tables.into_iter().enumerate() {
        chunks.push(Chunk::new(
            fname,
            "docx",
            format!("Table {}", i + 1),
            table,
            None,
        ));
    }

    Ok(chunks)
}

// ---------------------------------------------------------------------------
// Slide decks
// ---------------------------------------------------------------------------

/// Numerically ordered entries matching `prefix<N>suffix`.
fn numbered_entries(archive: &zip::ZipArchive<Cursor<&[u8]>>, prefix: &str, suffix: &str) -> Vec<(u32, String)> {
    let mut entries: Vec<(u32, String)> = archive
        .file_names()
        .filter(|n| n.starts_with(prefix) && n.ends_with(suffix))
        .filter_map(|n| {
            n.trim_start_matches(prefix)
                .trim_end_matches(suffix)
                .parse::<u32>()
                .ok()
                .map(|num| (num, n.to_string()))
        })
        .collect();
    entries.sort_by_key(|(num, _)| *num);
    entries
}

/// Text content of one parsed slide part.
#[derive(Default)]
struct SlideText {
    title: Option<String>,
    body_parts: Vec<String>,
}

fn parse_slide_xml(xml: &[u8]) -> Result<SlideText> {
    let mut out = SlideText::default();

    let mut in_sp = false;
    let mut sp_is_title = false;
    let mut sp_paras: Vec<String> = Vec::new();
    let mut para_buf = String::new();
    let mut in_t = false;

    let mut tbl_depth = 0usize;
    let mut row_cells: Vec<String> = Vec::new();
    let mut cell_buf = String::new();

    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"sp" => {
                    in_sp = true;
                    sp_is_title = false;
                    sp_paras.clear();
                }
                b"ph" => {
                    if matches!(attr_value(&e, b"type").as_deref(), Some("title" | "ctrTitle")) {
                        sp_is_title = true;
                    }
                }
                b"tbl" => tbl_depth += 1,
                b"tr" if tbl_depth > 0 => row_cells.clear(),
                b"tc" if tbl_depth > 0 => cell_buf.clear(),
                b"p" if tbl_depth == 0 => para_buf.clear(),
                b"t" => in_t = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"ph"
                    && matches!(attr_value(&e, b"type").as_deref(), Some("title" | "ctrTitle"))
                {
                    sp_is_title = true;
                }
            }
            Ok(Event::Text(t)) if in_t => {
                let text = t.unescape().unwrap_or_default();
                if tbl_depth > 0 {
                    cell_buf.push_str(&text);
                } else {
                    para_buf.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"sp" => {
                    in_sp = false;
                    if sp_is_title {
                        if out.title.is_none() {
                            let title = sp_paras.join(" ").trim().to_string();
                            if !title.is_empty() {
                                out.title = Some(title);
                            }
                        }
                    } else {
                        out.body_parts.append(&mut sp_paras);
                    }
                    sp_paras.clear();
                }
                b"tc" if tbl_depth > 0 => row_cells.push(cell_buf.trim().to_string()),
                b"tr" if tbl_depth > 0 => out.body_parts.push(row_cells.join(" | ")),
                b"tbl" => tbl_depth = tbl_depth.saturating_sub(1),
                b"p" if tbl_depth == 0 => {
                    let text = para_buf.trim().to_string();
                    if in_sp && !text.is_empty() {
                        sp_paras.push(text);
                    }
                }
                b"p" if tbl_depth > 0 => {
                    if !cell_buf.is_empty() && !cell_buf.ends_with(' ') {
                        cell_buf.push(' ');
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => bail!("pptx parse error: {}", e),
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

/// Image relationship targets of one slide, in `rId` order.
fn slide_image_targets(rels_xml: &[u8]) -> Result<Vec<String>> {
    let mut targets: Vec<(u32, String)> = Vec::new();
    let mut reader = Reader::from_reader(rels_xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"Relationship" {
                    let rel_type = attr_value(&e, b"Type").unwrap_or_default();
                    if rel_type.ends_with("/image") {
                        let id = attr_value(&e, b"Id")
                            .and_then(|id| id.trim_start_matches("rId").parse::<u32>().ok())
                            .unwrap_or(u32::MAX);
                        if let Some(target) = attr_value(&e, b"Target") {
                            targets.push((id, target));
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => bail!("rels parse error: {}", e),
            _ => {}
        }
        buf.clear();
    }
    targets.sort_by_key(|(id, _)| *id);
    Ok(targets.into_iter().map(|(_, t)| t).collect())
}

/// Resolve a slide-relative relationship target to an archive path.
fn resolve_slide_target(target: &str) -> String {
    if let Some(stripped) = target.strip_prefix("../") {
        format!("ppt/{}", stripped)
    } else if let Some(stripped) = target.strip_prefix('/') {
        stripped.to_string()
    } else {
        format!("ppt/slides/{}", target)
    }
}

/// One chunk per slide body plus one per speaker-notes block. Slide
/// titles become section titles; embedded raster images are persisted
/// as side files and referenced from the body as markdown image tags.
pub fn extract_pptx(
    bytes: &[u8],
    fname: &str,
    stem: &str,
    policy: WindowPolicy,
    images_dir: &Path,
) -> Result<Vec<Chunk>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let slides = numbered_entries(&archive, "ppt/slides/slide", ".xml");

    let mut chunks: Vec<Chunk> = Vec::new();
    for (slide_num, entry) in slides {
        let slide_xml = read_zip_entry(&mut archive, &entry)?;
        let parsed = parse_slide_xml(&slide_xml)?;
        let title = parsed
            .title
            .unwrap_or_else(|| format!("Slide {}", slide_num));

        let mut body_parts = parsed.body_parts;

        // Persist embedded images and reference them from the body.
        let rels_entry = format!("ppt/slides/_rels/slide{}.xml.rels", slide_num);
        if archive.by_name(&rels_entry).is_ok() {
            let rels_xml = read_zip_entry(&mut archive, &rels_entry)?;
            for (idx, target) in slide_image_targets(&rels_xml)?.iter().enumerate() {
                let media_entry = resolve_slide_target(target);
                let image_bytes = match read_zip_entry(&mut archive, &media_entry) {
                    Ok(b) => b,
                    Err(_) => continue,
                };
                let ext = media_entry.rsplit('.').next().unwrap_or("png");
                let filename =
                    images::side_image_name(stem, "slide", slide_num, idx + 1, ext);
                images::persist_image(images_dir, &filename, &image_bytes)?;
                body_parts.push(images::image_ref(
                    &format!("Slide {} image {}", slide_num, idx + 1),
                    &filename,
                ));
            }
        }

        let body = body_parts.join("\n");
        if !body.trim().is_empty() {
            chunks.extend(section_to_chunks(
                fname,
                "pptx",
                &title,
                &body,
                Some(slide_num),
                policy,
            ));
        }

        // Speaker notes often carry extra study detail.
        let notes_entry = format!("ppt/notesSlides/notesSlide{}.xml", slide_num);
        if archive.by_name(&notes_entry).is_ok() {
            let notes_xml = read_zip_entry(&mut archive, &notes_entry)?;
            let notes = parse_slide_xml(&notes_xml)?;
            let notes_text = notes.body_parts.join("\n");
            if !notes_text.trim().is_empty() {
                chunks.extend(section_to_chunks(
                    fname,
                    "pptx",
                    &format!("Notes — {}", title),
                    &notes_text,
                    Some(slide_num),
                    policy,
                ));
            }
        }
    }

    Ok(chunks)
}

// ---------------------------------------------------------------------------
// PDF
// ---------------------------------------------------------------------------

fn column_gap_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\t+| {2,}").unwrap())
}

fn split_columns(line: &str) -> Vec<String> {
    column_gap_re()
        .split(line.trim())
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// Detect table-like regions in extracted page text: two or more
/// consecutive lines that each break into two or more columns. Each
/// region renders as `cell | cell | …` rows.
fn detect_tables(page_text: &str) -> Vec<String> {
    let mut tables = Vec::new();
    let mut rows: Vec<String> = Vec::new();
    for line in page_text.lines() {
        let cells = split_columns(line);
        if cells.len() >= 2 {
            rows.push(cells.join(" | "));
        } else {
            if rows.len() >= 2 {
                tables.push(rows.join("\n"));
            }
            rows.clear();
        }
    }
    if rows.len() >= 2 {
        tables.push(rows.join("\n"));
    }
    tables
}

fn resolve<'a>(doc: &'a lopdf::Document, obj: &'a lopdf::Object) -> &'a lopdf::Object {
    let mut current = obj;
    for _ in 0..8 {
        match current {
            lopdf::Object::Reference(id) => match doc.get_object(*id) {
                Ok(next) => current = next,
                Err(_) => return current,
            },
            _ => return current,
        }
    }
    current
}

fn stream_is_jpeg_image(stream: &lopdf::Stream) -> bool {
    let is_image = stream
        .dict
        .get(b"Subtype")
        .and_then(|o| o.as_name())
        .map(|n| n == b"Image")
        .unwrap_or(false);
    if !is_image {
        return false;
    }
    match stream.dict.get(b"Filter") {
        Ok(lopdf::Object::Name(name)) => name == b"DCTDecode",
        Ok(lopdf::Object::Array(filters)) => filters
            .iter()
            .any(|f| f.as_name().map(|n| n == b"DCTDecode").unwrap_or(false)),
        _ => false,
    }
}

fn image_area(stream: &lopdf::Stream) -> u64 {
    let width = stream
        .dict
        .get(b"Width")
        .and_then(|o| o.as_i64())
        .unwrap_or(0);
    let height = stream
        .dict
        .get(b"Height")
        .and_then(|o| o.as_i64())
        .unwrap_or(0);
    (width.max(0) as u64) * (height.max(0) as u64)
}

/// The largest embedded JPEG per page whose pixel area meets the
/// threshold. Non-JPEG image encodings are skipped; they would need a
/// raster re-encode to be servable as-is.
fn largest_jpeg_per_page(doc: &lopdf::Document, min_pixel_area: u32) -> HashMap<u32, Vec<u8>> {
    let mut out: HashMap<u32, Vec<u8>> = HashMap::new();

    for (page_num, page_id) in doc.get_pages() {
        // Resources may live on the page or be inherited from a parent
        // Pages node.
        let mut resources: Option<&lopdf::Dictionary> = None;
        let mut node_id = page_id;
        for _ in 0..8 {
            let Ok(dict) = doc.get_dictionary(node_id) else {
                break;
            };
            if let Ok(res) = dict.get(b"Resources") {
                if let Ok(res_dict) = resolve(doc, res).as_dict() {
                    resources = Some(res_dict);
                    break;
                }
            }
            match dict.get(b"Parent").and_then(|p| p.as_reference()) {
                Ok(parent) => node_id = parent,
                Err(_) => break,
            }
        }
        let Some(resources) = resources else { continue };
        let Ok(xobjects) = resources.get(b"XObject") else {
            continue;
        };
        let Ok(xobjects) = resolve(doc, xobjects).as_dict() else {
            continue;
        };

        let mut best: Option<(u64, Vec<u8>)> = None;
        for (_, obj) in xobjects.iter() {
            let Ok(stream) = resolve(doc, obj).as_stream() else {
                continue;
            };
            if !stream_is_jpeg_image(stream) {
                continue;
            }
            let area = image_area(stream);
            if area < min_pixel_area as u64 {
                continue;
            }
            if best.as_ref().map(|(a, _)| area > *a).unwrap_or(true) {
                best = Some((area, stream.content.clone()));
            }
        }
        if let Some((_, bytes)) = best {
            out.insert(page_num, bytes);
        }
    }

    out
}

/// One chunk per PDF page. Pages carrying a sufficiently large embedded
/// JPEG get it persisted as a side file and the chunk content prefixed
/// with its markdown reference; columnar line runs become extra
/// `Page N — Table M` chunks.
pub fn extract_pdf(
    bytes: &[u8],
    fname: &str,
    stem: &str,
    images_dir: &Path,
    min_pixel_area: u32,
) -> Result<Vec<Chunk>> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| anyhow!("PDF text extraction failed: {}", e))?;

    // Image scanning is best-effort once text extraction has succeeded.
    let page_images = match lopdf::Document::load_mem(bytes) {
        Ok(doc) => largest_jpeg_per_page(&doc, min_pixel_area),
        Err(_) => HashMap::new(),
    };

    let mut chunks: Vec<Chunk> = Vec::new();
    for (i, page_text) in pages.iter().enumerate() {
        let page_num = (i + 1) as u32;
        let text = page_text.trim();

        let mut content = text.to_string();
        if let Some(image_bytes) = page_images.get(&page_num) {
            let filename = images::side_image_name(stem, "page", page_num, 1, "jpg");
            images::persist_image(images_dir, &filename, image_bytes)?;
            let reference =
                images::image_ref(&format!("Page {} image", page_num), &filename);
            content = if content.is_empty() {
                reference
            } else {
                format!("{}\n{}", reference, content)
            };
        }

        if !content.is_empty() {
            chunks.push(Chunk::new(
                fname,
                "pdf",
                format!("Page {}", page_num),
                content,
                Some(page_num),
            ));
        }

        for (t_idx, table) in detect_tables(text).into_iter().enumerate() {
            chunks.push(Chunk::new(
                fname,
                "pdf",
                format!("Page {} — Table {}", page_num, t_idx + 1),
                table,
                Some(page_num),
            ));
        }
    }

    Ok(chunks)
}

// ---------------------------------------------------------------------------
// Spreadsheets
// ---------------------------------------------------------------------------

fn read_shared_strings(archive: &mut zip::ZipArchive<Cursor<&[u8]>>) -> Result<Vec<String>> {
    if archive.by_name("xl/sharedStrings.xml").is_err() {
        return Ok(Vec::new());
    }
    let xml = read_zip_entry(archive, "xl/sharedStrings.xml")?;

    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_si = false;
    let mut in_t = false;

    let mut reader = Reader::from_reader(xml.as_slice());
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"t" if in_si => in_t = true,
                _ => {}
            },
            Ok(Event::Text(t)) if in_t => {
                current.push_str(&t.unescape().unwrap_or_default());
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"si" => {
                    in_si = false;
                    strings.push(current.clone());
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => bail!("sharedStrings parse error: {}", e),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// Workbook sheets as `(name, relationship id)` in workbook order.
fn workbook_sheets(xml: &[u8]) -> Result<Vec<(String, String)>> {
    let mut sheets = Vec::new();
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"sheet" {
                    let name = attr_value(&e, b"name").unwrap_or_default();
                    let rid = attr_value(&e, b"id").unwrap_or_default();
                    sheets.push((name, rid));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => bail!("workbook parse error: {}", e),
            _ => {}
        }
        buf.clear();
    }
    Ok(sheets)
}

fn workbook_rel_targets(xml: &[u8]) -> Result<HashMap<String, String>> {
    let mut targets = HashMap::new();
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"Relationship" {
                    if let (Some(id), Some(target)) =
                        (attr_value(&e, b"Id"), attr_value(&e, b"Target"))
                    {
                        targets.insert(id, target);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => bail!("workbook rels parse error: {}", e),
            _ => {}
        }
        buf.clear();
    }
    Ok(targets)
}

/// `"C"` in `"C7"` → column 2.
fn column_index(cell_ref: &str) -> usize {
    let mut idx = 0usize;
    for c in cell_ref.chars().take_while(|c| c.is_ascii_alphabetic()) {
        idx = idx * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1);
    }
    idx.saturating_sub(1)
}

fn extract_sheet_rows(xml: &[u8], shared: &[String]) -> Result<Vec<String>> {
    let mut lines: Vec<String> = Vec::new();
    let mut cells: Vec<String> = Vec::new();

    let mut col = 0usize;
    let mut cell_type = String::new();
    let mut in_v = false;
    let mut in_inline_t = false;

    let mut place = |cells: &mut Vec<String>, col: usize, value: String| {
        while cells.len() <= col {
            cells.push(String::new());
        }
        cells[col] = value;
    };

    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"row" => cells.clear(),
                b"c" => {
                    col = attr_value(&e, b"r")
                        .map(|r| column_index(&r))
                        .unwrap_or(cells.len());
                    cell_type = attr_value(&e, b"t").unwrap_or_default();
                }
                b"v" => in_v = true,
                b"t" if cell_type == "inlineStr" => in_inline_t = true,
                _ => {}
            },
            Ok(Event::Text(t)) => {
                let text = t.unescape().unwrap_or_default();
                if in_v {
                    let value = if cell_type == "s" {
                        text.trim()
                            .parse::<usize>()
                            .ok()
                            .and_then(|i| shared.get(i).cloned())
                            .unwrap_or_default()
                    } else {
                        text.trim().to_string()
                    };
                    place(&mut cells, col, value);
                    in_v = false;
                } else if in_inline_t {
                    place(&mut cells, col, text.trim().to_string());
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" => in_v = false,
                b"t" => in_inline_t = false,
                b"row" => {
                    if cells.iter().any(|c| !c.trim().is_empty()) {
                        lines.push(cells.join(" | "));
                    }
                    cells.clear();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => bail!("sheet parse error: {}", e),
            _ => {}
        }
        buf.clear();
    }
    Ok(lines)
}

/// One chunk per sheet, titled with the sheet name, rows rendered as
/// `cell | cell | …` lines with empty rows dropped.
pub fn extract_xlsx(bytes: &[u8], fname: &str) -> Result<Vec<Chunk>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let shared = read_shared_strings(&mut archive)?;
    let workbook_xml = read_zip_entry(&mut archive, "xl/workbook.xml")?;
    let rels_xml = read_zip_entry(&mut archive, "xl/_rels/workbook.xml.rels")?;
    let sheets = workbook_sheets(&workbook_xml)?;
    let targets = workbook_rel_targets(&rels_xml)?;

    let mut chunks: Vec<Chunk> = Vec::new();
    for (sheet_name, rid) in sheets {
        let Some(target) = targets.get(&rid) else {
            continue;
        };
        let entry = if let Some(stripped) = target.strip_prefix('/') {
            stripped.to_string()
        } else {
            format!("xl/{}", target)
        };
        let sheet_xml = match read_zip_entry(&mut archive, &entry) {
            Ok(xml) => xml,
            Err(_) => continue,
        };
        let lines = extract_sheet_rows(&sheet_xml, &shared)?;
        if !lines.is_empty() {
            chunks.push(Chunk::new(
                fname,
                "xlsx",
                sheet_name,
                lines.join("\n"),
                None,
            ));
        }
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            for (name, content) in entries {
                writer
                    .start_file(name.to_string(), SimpleFileOptions::default())
                    .unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    fn docx_body(xml: &str) -> Vec<u8> {
        build_zip(&[(
            "word/document.xml",
            &format!(
                r#"<?xml version="1.0"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
                xml
            ),
        )])
    }

    fn para(style: Option<&str>, text: &str) -> String {
        let style_xml = style
            .map(|s| format!(r#"<w:pPr><w:pStyle w:val="{}"/></w:pPr>"#, s))
            .unwrap_or_default();
        format!(r#"<w:p>{}<w:r><w:t>{}</w:t></w:r></w:p>"#, style_xml, text)
    }

    #[test]
    fn docx_splits_on_headings() {
        let body = format!(
            "{}{}{}{}",
            para(Some("Heading1"), "Photosynthesis"),
            para(None, "Light reactions happen in the thylakoid membrane of the chloroplast."),
            para(Some("Heading2"), "Respiration"),
            para(None, "Cellular respiration converts glucose into usable ATP energy."),
        );
        let chunks = extract_docx(&docx_body(&body), "bio.docx", WindowPolicy::default()).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].section_title, "Photosynthesis");
        assert_eq!(chunks[1].section_title, "Respiration");
        assert!(chunks[1].content.contains("ATP"));
    }

    #[test]
    fn docx_body_before_first_heading_is_introduction() {
        let body = format!(
            "{}{}",
            para(None, "Course overview text appears before any heading."),
            para(Some("Heading1"), "Unit One"),
        );
        let chunks = extract_docx(&docx_body(&body), "bio.docx", WindowPolicy::default()).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].section_title, "Introduction");
    }

    #[test]
    fn docx_tables_become_titled_chunks() {
        let table = r#"<w:tbl>
            <w:tr><w:tc><w:p><w:r><w:t>Organ</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Function</w:t></w:r></w:p></w:tc></w:tr>
            <w:tr><w:tc><w:p><w:r><w:t>Heart</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Pumps blood</w:t></w:r></w:p></w:tc></w:tr>
        </w:tbl>"#;
        let body = format!("{}{}", para(None, "Some body text."), table);
        let chunks = extract_docx(&docx_body(&body), "bio.docx", WindowPolicy::default()).unwrap();
        let table_chunk = chunks.iter().find(|c| c.section_title == "Table 1").unwrap();
        assert!(table_chunk.content.contains("Organ | Function"));
        assert!(table_chunk.content.contains("Heart | Pumps blood"));
    }

    #[test]
    fn docx_invalid_zip_is_an_error() {
        assert!(extract_docx(b"not a zip", "x.docx", WindowPolicy::default()).is_err());
    }

    fn slide_xml(title: Option<&str>, body: &[&str]) -> String {
        let title_sp = title
            .map(|t| {
                format!(
                    r#"<p:sp><p:nvSpPr><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:txBody><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp>"#,
                    t
                )
            })
            .unwrap_or_default();
        let body_paras: String = body
            .iter()
            .map(|b| format!("<a:p><a:r><a:t>{}</a:t></a:r></a:p>", b))
            .collect();
        format!(
            r#"<?xml version="1.0"?><p:sld xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"><p:cSld><p:spTree>{}<p:sp><p:txBody>{}</p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#,
            title_sp, body_paras
        )
    }

    #[test]
    fn pptx_one_chunk_per_slide_with_title() {
        let tmp = tempfile::tempdir().unwrap();
        let bytes = build_zip(&[
            (
                "ppt/slides/slide1.xml",
                &slide_xml(Some("Cell Structure"), &["The nucleus stores genetic material."]),
            ),
            (
                "ppt/slides/slide2.xml",
                &slide_xml(None, &["Mitochondria produce most cellular ATP."]),
            ),
        ]);
        let chunks = extract_pptx(
            &bytes,
            "deck.pptx",
            "deck",
            WindowPolicy::default(),
            tmp.path(),
        )
        .unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].section_title, "Cell Structure");
        assert_eq!(chunks[0].page_or_slide, Some(1));
        assert_eq!(chunks[1].section_title, "Slide 2");
        assert!(!chunks[0].content.contains("Cell Structure"));
    }

    #[test]
    fn pptx_notes_become_their_own_chunk() {
        let tmp = tempfile::tempdir().unwrap();
        let bytes = build_zip(&[
            (
                "ppt/slides/slide1.xml",
                &slide_xml(Some("Optics"), &["Light bends at media boundaries."]),
            ),
            (
                "ppt/notesSlides/notesSlide1.xml",
                &slide_xml(None, &["Mention Snell's law worked example here."]),
            ),
        ]);
        let chunks = extract_pptx(
            &bytes,
            "deck.pptx",
            "deck",
            WindowPolicy::default(),
            tmp.path(),
        )
        .unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].section_title, "Notes — Optics");
        assert!(chunks[1].content.contains("Snell"));
    }

    #[test]
    fn pptx_images_are_persisted_and_referenced() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            writer
                .start_file("ppt/slides/slide1.xml", SimpleFileOptions::default())
                .unwrap();
            writer
                .write_all(slide_xml(Some("Diagrams"), &["See figure."]).as_bytes())
                .unwrap();
            writer
                .start_file("ppt/slides/_rels/slide1.xml.rels", SimpleFileOptions::default())
                .unwrap();
            writer.write_all(br#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image1.png"/></Relationships>"#).unwrap();
            writer
                .start_file("ppt/media/image1.png", SimpleFileOptions::default())
                .unwrap();
            writer.write_all(&[0x89, b'P', b'N', b'G']).unwrap();
            writer.finish().unwrap();
        }
        let chunks = extract_pptx(
            &cursor.into_inner(),
            "deck.pptx",
            "deck",
            WindowPolicy::default(),
            tmp.path(),
        )
        .unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0]
            .content
            .contains("![Slide 1 image 1](/api/images/deck_slide1_img1.png)"));
        assert!(tmp.path().join("deck_slide1_img1.png").exists());
    }

    fn xlsx_bytes() -> Vec<u8> {
        build_zip(&[
            (
                "xl/workbook.xml",
                r#"<?xml version="1.0"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Results" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
            ),
            (
                "xl/_rels/workbook.xml.rels",
                r#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#,
            ),
            (
                "xl/sharedStrings.xml",
                r#"<?xml version="1.0"?><sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><si><t>Trial</t></si><si><t>Speed</t></si></sst>"#,
            ),
            (
                "xl/worksheets/sheet1.xml",
                r#"<?xml version="1.0"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>
                <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
                <row r="2"><c r="A2"><v>1</v></c><c r="C2"><v>9.8</v></c></row>
                <row r="3"></row>
                </sheetData></worksheet>"#,
            ),
        ])
    }

    #[test]
    fn xlsx_one_chunk_per_sheet_with_piped_rows() {
        let chunks = extract_xlsx(&xlsx_bytes(), "data.xlsx").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].section_title, "Results");
        let lines: Vec<&str> = chunks[0].content.lines().collect();
        assert_eq!(lines[0], "Trial | Speed");
        // Column gap preserved as an empty cell.
        assert_eq!(lines[1], "1 |  | 9.8");
        // Blank row dropped.
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn pdf_table_detection_groups_columnar_runs() {
        let text = "Narrative line about results\nTrial  Speed  Error\n1  9.8  0.1\n2  9.7  0.2\nClosing narrative";
        let tables = detect_tables(text);
        assert_eq!(tables.len(), 1);
        assert!(tables[0].contains("Trial | Speed | Error"));
        assert!(tables[0].contains("2 | 9.7 | 0.2"));
    }

    #[test]
    fn pdf_single_columnar_line_is_not_a_table() {
        assert!(detect_tables("one  lonely  columnar line\nplain text").is_empty());
    }

    #[test]
    fn column_index_decodes_letters() {
        assert_eq!(column_index("A1"), 0);
        assert_eq!(column_index("C7"), 2);
        assert_eq!(column_index("AA3"), 26);
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("notes.xyz");
        std::fs::write(&path, b"payload").unwrap();
        let config: Config = toml::from_str("").unwrap();
        assert!(extract_file(&path, &config).is_err());
    }
}
