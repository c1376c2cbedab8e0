//! Record presentation for the CLI and the MCP server.
//!
//! Serialization is driven by [`RECORD_FIELDS`], a static table of field
//! names and accessors. `raw` is not in the table; callers that want the
//! upstream hit use [`display_hit`].

use serde_json::{json, Value};
use std::io::Write;

use crate::models::Record;

/// Width that file headers are padded to with dashes.
const HEADER_WIDTH: usize = 55;

type FieldGetter = fn(&Record) -> Value;

/// Every presentable [`Record`] field.
pub static RECORD_FIELDS: &[(&str, FieldGetter)] = &[
    ("document_id", |r| json!(r.document_id)),
    ("filename", |r| json!(r.filename)),
    ("url", |r| json!(r.url)),
    ("key", |r| json!(r.key)),
    ("bucket", |r| json!(r.bucket)),
    ("content_type", |r| json!(r.content_type)),
    ("file_size", |r| json!(r.file_size)),
    ("total_words", |r| json!(r.total_words)),
    ("total_characters", |r| json!(r.total_characters)),
    ("start_page", |r| json!(r.start_page)),
    ("end_page", |r| json!(r.end_page)),
    ("chunk_index", |r| json!(r.chunk_index)),
    ("total_chunks", |r| json!(r.total_chunks)),
    ("chunk_size", |r| json!(r.chunk_size)),
    ("char_start", |r| json!(r.char_start)),
    ("char_end", |r| json!(r.char_end)),
    ("is_chunked", |r| json!(r.is_chunked)),
    ("processed_at", |r| json!(r.processed_at)),
    ("indexed_at", |r| json!(r.indexed_at)),
    ("source", |r| json!(r.source)),
    ("score", |r| json!(r.score)),
    ("highlights", |r| json!(r.highlights)),
    ("text", |r| json!(r.text)),
    ("events", |r| json!(r.events)),
];

/// Fields shown by `es search --verbose`. Highlights are printed separately.
const VERBOSE_SKIP: &[&str] = &["highlights", "text", "events"];

/// Make a URL clickable in a terminal by encoding spaces.
pub fn encode_url(url: &str) -> String {
    url.replace(' ', "%20")
}

/// A record as a JSON object with every field in [`RECORD_FIELDS`].
pub fn record_to_json(record: &Record) -> Value {
    let map = RECORD_FIELDS
        .iter()
        .map(|(name, get)| (name.to_string(), get(record)))
        .collect::<serde_json::Map<String, Value>>();
    Value::Object(map)
}

/// The upstream hit with `_source.ORIGIN_FILE_URI` space-encoded.
pub fn display_hit(record: &Record) -> Value {
    let mut raw = record.raw.clone();
    if let Some(uri) = raw
        .get_mut("_source")
        .and_then(|src| src.get_mut("ORIGIN_FILE_URI"))
    {
        if let Some(s) = uri.as_str() {
            *uri = Value::String(encode_url(s));
        }
    }
    raw
}

/// `{filename, url, events}` for records that have events.
pub fn events_entry(record: &Record) -> Option<Value> {
    let events = record.events.as_ref().filter(|e| !e.is_empty())?;
    Some(json!({
        "filename": record.filename,
        "url": encode_url(&record.url),
        "events": events,
    }))
}

/// `--- name ------...` padded to a fixed width.
pub fn header(filename: &str) -> String {
    let pad = HEADER_WIDTH.saturating_sub(filename.chars().count());
    format!("--- {} {}", filename, "-".repeat(pad))
}

fn flatten_highlight(h: &str) -> String {
    h.replace('\n', " ").trim().to_string()
}

/// Default search listing: URL plus indented highlight lines.
pub fn format_plain(record: &Record) -> String {
    let mut out = encode_url(&record.url);
    out.push('\n');
    for h in record.highlights.iter().flatten() {
        out.push_str("  ");
        out.push_str(&flatten_highlight(h));
        out.push('\n');
    }
    out
}

/// Field table for `es search --verbose`.
pub fn format_verbose(record: &Record) -> String {
    let fields: Vec<&(&str, FieldGetter)> = RECORD_FIELDS
        .iter()
        .filter(|(name, _)| !VERBOSE_SKIP.contains(name))
        .collect();
    let width = fields.iter().map(|(name, _)| name.len()).max().unwrap_or(0);

    let mut out = format!("\n\n{}\n\n", header(&record.filename));
    for (name, get) in fields {
        let value = match get(record) {
            Value::Null => String::new(),
            Value::String(s) if *name == "url" => encode_url(&s),
            Value::String(s) => s,
            other => other.to_string(),
        };
        out.push_str(&format!("{}:{}{}\n", name, " ".repeat(width - name.len() + 1), value));
    }
    if let Some(highlights) = record.highlights.as_ref() {
        out.push_str("highlights:\n");
        for h in highlights {
            out.push_str(&format!("  {}\n", flatten_highlight(h)));
        }
    }
    out
}

/// Header, URL and extracted text for `es text`.
pub fn format_text(record: &Record) -> String {
    format!(
        "\n\n{}\n{}\n\n{}\n",
        header(&record.filename),
        encode_url(&record.url),
        record.text.as_deref().unwrap_or_default()
    )
}

/// Header, URL and one line per event for `es events`.
pub fn format_events(record: &Record) -> String {
    let mut out = format!("\n{}\n{}\n", header(&record.filename), encode_url(&record.url));
    for e in record.events.iter().flatten() {
        let loc = e
            .location
            .as_deref()
            .map(|l| format!(" @ {}", l))
            .unwrap_or_default();
        out.push_str(&format!("  [{}]{} {}\n", e.timestamp, loc, e.summary));
    }
    out
}

/// Writes a JSON array one element at a time, so output appears while
/// results are still arriving.
pub struct JsonArrayWriter<W: Write> {
    out: W,
    first: bool,
}

impl<W: Write> JsonArrayWriter<W> {
    pub fn start(mut out: W) -> std::io::Result<Self> {
        writeln!(out, "[")?;
        out.flush()?;
        Ok(Self { out, first: true })
    }

    pub fn push(&mut self, value: &Value) -> std::io::Result<()> {
        if !self.first {
            writeln!(self.out, ",")?;
        }
        self.first = false;
        let pretty = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
        write!(self.out, "{}", pretty)?;
        self.out.flush()
    }

    pub fn finish(mut self) -> std::io::Result<W> {
        writeln!(self.out, "\n]")?;
        self.out.flush()?;
        Ok(self.out)
    }
}
