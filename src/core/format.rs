// Data structures for capture documents and views

use crate::core::constants::*;
use crate::core::error::{DropletError, Result};
use crate::core::streams::StreamKey;
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// Capture document as produced by the packet decoder.
#[derive(Debug, Clone, Deserialize)]
pub struct Capture {
    pub filename: String,
    #[serde(default)]
    pub js_packets: Vec<Map<String, Value>>,
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

/// A single attribute value of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Booleans collapse to 1/0 and nulls, arrays and objects are treated as missing.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(FieldValue::Number),
            Value::Bool(b) => Some(FieldValue::Number(if *b { 1.0 } else { 0.0 })),
            Value::String(s) => Some(FieldValue::Text(s.clone())),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Number(_) => None,
        }
    }

    /// Key under which the value is placed in a categorical lane ordering.
    pub fn lane_key(&self) -> String {
        match self {
            FieldValue::Number(n) if n.fract() == 0.0 && n.is_finite() => format!("{}", *n as i64),
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Text(s) => s.clone(),
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.lane_key())
    }
}

/// One decoded frame. Immutable once ingestion has finished.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub pcap_secs: f64,
    pub ta: String,
    pub ra: String,
    pub stream: StreamKey,
    pub attributes: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new(pcap_secs: f64, ta: &str, ra: &str) -> Self {
        let stream = StreamKey::new(ta, ra);
        let mut attributes = BTreeMap::new();
        attributes.insert("streamId".to_string(), FieldValue::Text(stream.to_string()));
        Self {
            pcap_secs,
            ta: ta.to_string(),
            ra: ra.to_string(),
            stream,
            attributes,
        }
    }

    pub fn with(mut self, field: &str, value: FieldValue) -> Self {
        self.attributes.insert(field.to_string(), value);
        self
    }

    pub fn value(&self, field: &str) -> Option<&FieldValue> {
        self.attributes.get(field)
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        if field == TIME_FIELD {
            return Some(self.pcap_secs);
        }
        self.value(field).and_then(FieldValue::as_number)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.value(field).and_then(FieldValue::as_text)
    }

    pub fn is_bad(&self) -> bool {
        self.number("bad") == Some(1.0)
    }

    pub fn shares_endpoint(&self, addr: &str) -> bool {
        self.ta == addr || self.ra == addr
    }
}

/// View configuration carried in the page URL fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewQuery {
    pub key: String,
    pub to_plot: Vec<String>,
    pub show_ack: bool,
}

impl ViewQuery {
    /// Parses `key=..&to_plot=a,b&ack=false`, with or without a leading `#`.
    pub fn from_fragment(fragment: &str) -> Result<Self> {
        let fragment = fragment.trim_start_matches('#');
        let mut pairs: HashMap<&str, &str> = HashMap::new();
        for part in fragment.split('&').filter(|p| !p.is_empty()) {
            let (k, v) = part.split_once('=').unwrap_or((part, ""));
            pairs.insert(k, v);
        }

        let key = pairs
            .get("key")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| DropletError::MalformedQuery("missing key".to_string()))?;
        let key = urlencoding::decode(key)
            .map_err(|e| DropletError::MalformedQuery(format!("key: {}", e)))?
            .into_owned();

        let to_plot = pairs
            .get("to_plot")
            .map(|v| {
                v.split(',')
                    .filter(|f| !f.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let show_ack = match pairs.get("ack").copied() {
            None | Some("") | Some("true") => true,
            Some("false") => false,
            Some(other) => {
                return Err(DropletError::MalformedQuery(format!("ack: {}", other)));
            }
        };

        Ok(Self {
            key,
            to_plot,
            show_ack,
        })
    }
}

/// Layout and interaction tuning for a view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    pub chart_width: f64,
    pub total_height: f64,
    pub overview_height: f64,
    pub bucket_resolution: f64,
    pub search_window: usize,
    pub x_range: f64,
    pub click_timeout_ms: u64,
    pub zoom_duration_ms: u64,
    pub histogram_bins: usize,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            chart_width: CHART_WIDTH,
            total_height: TOTAL_HEIGHT,
            overview_height: OVERVIEW_HEIGHT,
            bucket_resolution: BUCKET_RESOLUTION,
            search_window: SEARCH_WINDOW,
            x_range: X_RANGE,
            click_timeout_ms: CLICK_TIMEOUT_MS,
            zoom_duration_ms: ZOOM_DURATION_MS,
            histogram_bins: HISTOGRAM_BINS,
        }
    }
}

fn to_datetime(secs: f64) -> Option<DateTime<chrono::Utc>> {
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}

/// Wall-clock label used on the overview axis.
pub fn format_clock(secs: f64) -> String {
    to_datetime(secs)
        .map(|d| d.format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

/// Seconds and milliseconds label used on chart axes and in record details.
pub fn format_offset(secs: f64) -> String {
    to_datetime(secs)
        .map(|d| format!("{}s {}ms", d.format("%S"), d.format("%3f")))
        .unwrap_or_default()
}
