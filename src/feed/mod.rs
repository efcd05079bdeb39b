// src/feed/mod.rs
pub mod source;

use chrono::NaiveDateTime;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;

/// Timestamp layout used by the feed, e.g. `5/27/2025 13:36`.
pub const FEED_TIME_FORMAT: &str = "%m/%d/%Y %H:%M";

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
// BOM bytes that went through a Latin-1 decode somewhere upstream.
const MISDECODED_BOM: &str = "\u{00EF}\u{00BB}\u{00BF}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentRecord {
    pub incident_id: String,
    /// Timestamp exactly as the feed wrote it.
    pub occurred_text: String,
    /// Best-effort parse of `occurred_text` (local time, no zone in the feed).
    pub occurred_at: Option<NaiveDateTime>,
    pub call_type: String,
    pub location: String,
    pub district: String,
}

impl IncidentRecord {
    pub fn new(
        incident_id: impl Into<String>,
        occurred_text: impl Into<String>,
        call_type: impl Into<String>,
        location: impl Into<String>,
        district: impl Into<String>,
    ) -> Self {
        let occurred_text = occurred_text.into();
        Self {
            incident_id: incident_id.into(),
            occurred_at: parse_feed_time(&occurred_text),
            occurred_text,
            call_type: call_type.into(),
            location: location.into(),
            district: district.into(),
        }
    }
}

pub fn parse_feed_time(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), FEED_TIME_FORMAT).ok()
}

#[derive(Debug, Deserialize)]
struct Calls {
    #[serde(rename = "CALL", default)]
    call: Vec<Call>,
}

/// Child elements are lists so a repeated tag cannot fail the whole document;
/// the first occurrence wins.
#[derive(Debug, Deserialize)]
struct Call {
    #[serde(rename = "@incident")]
    incident: Option<String>,
    #[serde(rename = "DATE", default)]
    date: Vec<String>,
    #[serde(rename = "DESC", default)]
    desc: Vec<String>,
    #[serde(rename = "LOCATION", default)]
    location: Vec<String>,
    #[serde(rename = "DISTRICT", default)]
    district: Vec<String>,
}

/// Markup that could not be read as a `<CALLS>` document at all.
#[derive(Debug, thiserror::Error)]
#[error("malformed feed markup: {0}")]
pub struct FeedParseError(#[from] quick_xml::de::DeError);

/// Outcome of a structurally valid parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFeed {
    pub records: Vec<IncidentRecord>,
    /// `<CALL>` entries dropped for a missing or empty field.
    pub skipped: usize,
}

fn strip_bom_bytes(raw: &[u8]) -> &[u8] {
    raw.strip_prefix(UTF8_BOM).unwrap_or(raw)
}

fn strip_bom_str(s: &str) -> &str {
    let s = s.strip_prefix('\u{FEFF}').unwrap_or(s);
    s.strip_prefix(MISDECODED_BOM).unwrap_or(s)
}

fn field(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn first(v: Vec<String>) -> Option<String> {
    field(v.into_iter().next())
}

/// Parse feed text, telling a corrupt document apart from an empty one.
/// Empty or whitespace-only input is `Ok` with no records.
pub fn try_parse(raw: &str) -> Result<ParsedFeed, FeedParseError> {
    let t0 = std::time::Instant::now();
    let clean = strip_bom_str(raw);
    if clean.trim().is_empty() {
        tracing::warn!("no data received from feed");
        return Ok(ParsedFeed::default());
    }

    let doc: Calls = from_str(clean)?;

    let mut out = ParsedFeed {
        records: Vec::with_capacity(doc.call.len()),
        skipped: 0,
    };
    for c in doc.call {
        match (
            field(c.incident),
            first(c.date),
            first(c.desc),
            first(c.location),
            first(c.district),
        ) {
            (Some(id), Some(date), Some(desc), Some(location), Some(district)) => {
                let rec = IncidentRecord::new(id, date, desc, location, district);
                tracing::debug!(
                    incident = %rec.incident_id,
                    time = %rec.occurred_text,
                    call_type = %rec.call_type,
                    location = %rec.location,
                    district = %rec.district,
                    "parsed call"
                );
                out.records.push(rec);
            }
            (id, ..) => {
                tracing::debug!(
                    incident = id.as_deref().unwrap_or("?"),
                    "skipping incomplete call record"
                );
                out.skipped += 1;
            }
        }
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("feed_parse_ms").record(ms);
    counter!("feed_records_total").increment(out.records.len() as u64);
    tracing::info!(records = out.records.len(), skipped = out.skipped, "parsed active calls");
    Ok(out)
}

/// Same as [`try_parse`], but starting from raw response bytes.
pub fn try_parse_bytes(raw: &[u8]) -> Result<ParsedFeed, FeedParseError> {
    let text = String::from_utf8_lossy(strip_bom_bytes(raw));
    try_parse(&text)
}

/// Lenient form: a malformed document is logged and yields no records.
pub fn parse(raw: &str) -> Vec<IncidentRecord> {
    match try_parse(raw) {
        Ok(feed) => feed.records,
        Err(e) => {
            tracing::error!(error = %e, "feed parse failed");
            tracing::debug!(sample = %raw.chars().take(500).collect::<String>(), "raw feed sample");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_CALL: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<CALLS>
  <CALL incident="2025-00192513">
    <DATE>5/27/2025 13:36</DATE>
    <DESC>General investigation</DESC>
    <LOCATION>2400 BLOCK 29TH ST</LOCATION>
    <DISTRICT>G8</DISTRICT>
  </CALL>
</CALLS>"#;

    #[test]
    fn parses_single_call() {
        let feed = try_parse(ONE_CALL).unwrap();
        assert_eq!(feed.skipped, 0);
        assert_eq!(feed.records.len(), 1);
        let r = &feed.records[0];
        assert_eq!(r.incident_id, "2025-00192513");
        assert_eq!(r.occurred_text, "5/27/2025 13:36");
        assert_eq!(r.call_type, "General investigation");
        assert_eq!(r.location, "2400 BLOCK 29TH ST");
        assert_eq!(r.district, "G8");
        let expected = chrono::NaiveDate::from_ymd_opt(2025, 5, 27)
            .unwrap()
            .and_hms_opt(13, 36, 0)
            .unwrap();
        assert_eq!(r.occurred_at, Some(expected));
    }

    #[test]
    fn blank_input_is_empty_not_error() {
        assert_eq!(try_parse("").unwrap(), ParsedFeed::default());
        assert_eq!(try_parse("  \n\t ").unwrap(), ParsedFeed::default());
        assert!(parse("").is_empty());
    }

    #[test]
    fn bom_prefixed_input_parses_the_same() {
        let plain = try_parse(ONE_CALL).unwrap();
        let with_char = format!("\u{FEFF}{ONE_CALL}");
        assert_eq!(try_parse(&with_char).unwrap(), plain);
        let misdecoded = format!("{MISDECODED_BOM}{ONE_CALL}");
        assert_eq!(try_parse(&misdecoded).unwrap(), plain);

        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(ONE_CALL.as_bytes());
        assert_eq!(try_parse_bytes(&bytes).unwrap(), plain);
    }

    #[test]
    fn unparseable_time_keeps_record() {
        let xml = r#"<CALLS><CALL incident="X1"><DATE>yesterday-ish</DATE><DESC>Noise</DESC><LOCATION>1 MAIN ST</LOCATION><DISTRICT>A1</DISTRICT></CALL></CALLS>"#;
        let recs = parse(xml);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].occurred_text, "yesterday-ish");
        assert!(recs[0].occurred_at.is_none());
    }

    #[test]
    fn truncated_markup_is_a_parse_error() {
        let xml = r#"<CALLS><CALL incident="X1"><DATE>5/27/2025 13:36</DATE><DESC>Noi"#;
        assert!(try_parse(xml).is_err());
        assert!(parse(xml).is_empty());
    }

    #[test]
    fn field_text_is_trimmed() {
        let xml = r#"<CALLS><CALL incident=" X2 "><DATE>
            5/1/2025 08:05 </DATE><DESC>  Alarm </DESC><LOCATION> 9 FORELAND RD </LOCATION><DISTRICT> B2</DISTRICT></CALL></CALLS>"#;
        let recs = parse(xml);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].incident_id, "X2");
        assert_eq!(recs[0].call_type, "Alarm");
        assert_eq!(recs[0].location, "9 FORELAND RD");
        assert_eq!(recs[0].district, "B2");
        assert!(recs[0].occurred_at.is_some());
    }
}
