// Capture document reader: decoding, sanitising and sorting packets

use crate::core::compression::{decompress, CompressionType};
use crate::core::constants::*;
use crate::core::error::Result;
use crate::core::format::*;
use crate::core::hosts::HostCounts;
use crate::core::pcap;
use crate::core::streams::{strip_colons, AddressBook};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Keep `1D ACK` frames.
    pub show_ack: bool,
    /// Fields that will be charted; records missing them are counted.
    pub to_plot: Vec<String>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            show_ack: true,
            to_plot: Vec::new(),
        }
    }
}

impl From<&ViewQuery> for IngestOptions {
    fn from(query: &ViewQuery) -> Self {
        Self {
            show_ack: query.show_ack,
            to_plot: query.to_plot.clone(),
        }
    }
}

/// Sanitised capture, sorted ascending by timestamp.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub filename: String,
    pub records: Vec<Record>,
    pub addresses: AddressBook,
    /// Good packets per endpoint.
    pub hosts: HostCounts,
    /// Type strings of good packets, sorted.
    pub type_strings: Vec<String>,
    /// Per plotted field, how many records lack it.
    pub missing: BTreeMap<String, usize>,
    /// Packets dropped for having no usable timestamp.
    pub dropped: usize,
}

pub struct CaptureReader {
    path: Option<PathBuf>,
    capture: Capture,
}

impl CaptureReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let raw = std::fs::read(&path)?;
        let data = decompress(&raw, CompressionType::from_path(&path))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut reader = Self::from_bytes(&data, &filename)?;
        debug!("opened capture {}", path.display());
        reader.path = Some(path);
        Ok(reader)
    }

    /// Parses a capture document, or decodes a radiotap pcap capture named
    /// `filename`. Gzip data is recognised by its magic whatever the name.
    pub fn from_bytes(data: &[u8], filename: &str) -> Result<Self> {
        let data = if data.starts_with(GZIP_MAGIC) {
            Cow::Owned(decompress(data, CompressionType::Gzip)?)
        } else {
            Cow::Borrowed(data)
        };
        if !pcap::is_pcap(&data) {
            return Self::from_slice(&data);
        }
        let capture = Capture {
            filename: filename.to_string(),
            js_packets: pcap::packetize(&data)?,
            aliases: HashMap::new(),
        };
        Ok(Self {
            path: None,
            capture,
        })
    }

    /// Parses a JSON capture document.
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        Ok(Self {
            path: None,
            capture: serde_json::from_slice(data)?,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn filename(&self) -> &str {
        &self.capture.filename
    }

    pub fn packet_count(&self) -> usize {
        self.capture.js_packets.len()
    }

    pub fn ingest(&self, options: &IngestOptions) -> Dataset {
        let mut dropped = 0;
        let mut packets: Vec<(f64, &Map<String, Value>)> = Vec::with_capacity(self.packet_count());
        for packet in &self.capture.js_packets {
            match packet.get(TIME_FIELD).and_then(Value::as_f64) {
                Some(t) if t.is_finite() => packets.push((t, packet)),
                _ => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!("{} packets without {} dropped", dropped, TIME_FIELD);
        }
        packets.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut addresses = AddressBook::with_aliases(&self.capture.aliases);
        let mut type_strings = BTreeSet::new();
        let mut missing: BTreeMap<String, usize> = BTreeMap::new();
        let mut records = Vec::with_capacity(packets.len());

        for (t, packet) in packets {
            let typestr = packet.get("typestr").and_then(Value::as_str);
            if !options.show_ack && typestr == Some(ACK_TYPESTR) {
                continue;
            }

            let record = to_record(t, packet);
            if !record.is_bad() {
                if let Some(ts) = typestr {
                    type_strings.insert(ts.to_string());
                }
            }
            addresses.observe(&record.ta);
            addresses.observe(&record.ra);

            for field in &options.to_plot {
                if field != TIME_FIELD && record.value(field).is_none() {
                    *missing.entry(field.clone()).or_default() += 1;
                }
            }
            records.push(record);
        }

        for (field, count) in &missing {
            warn!("{} of {} records have no {}", count, records.len(), field);
        }

        addresses.infer_roles(&records);
        let hosts = HostCounts::build(&records);

        info!(
            "ingested {}: {} records ({} dropped)",
            self.capture.filename,
            records.len(),
            dropped
        );

        Dataset {
            filename: self.capture.filename.clone(),
            records,
            addresses,
            hosts,
            type_strings: type_strings.into_iter().collect(),
            missing,
            dropped,
        }
    }
}

fn endpoint(packet: &Map<String, Value>, field: &str) -> String {
    packet
        .get(field)
        .and_then(Value::as_str)
        .map(strip_colons)
        .unwrap_or_else(|| NULL_ADDR.to_string())
}

fn to_record(t: f64, packet: &Map<String, Value>) -> Record {
    let bad = packet.get("bad").and_then(FieldValue::from_json) == Some(FieldValue::Number(1.0));
    let (ta, ra) = if bad {
        (BAD_PACKET_ADDR.to_string(), BAD_PACKET_ADDR.to_string())
    } else {
        (endpoint(packet, "ta"), endpoint(packet, "ra"))
    };

    let mut record = Record::new(t, &ta, &ra);
    for (key, value) in packet {
        if matches!(key.as_str(), "ta" | "ra" | "streamId" | TIME_FIELD) {
            continue;
        }
        if let Some(v) = FieldValue::from_json(value) {
            record.attributes.insert(key.clone(), v);
        }
    }

    let retry = record.number("retry") == Some(1.0);
    let retry_bad = match (bad, retry) {
        (true, _) => "bad",
        (false, true) => "retry",
        (false, false) => "good",
    };
    record
        .attributes
        .insert("retry_bad".to_string(), FieldValue::Text(retry_bad.to_string()));
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::streams::Role;
    use serde_json::json;

    fn capture() -> Vec<u8> {
        serde_json::to_vec(&json!({
            "filename": "office.pcap",
            "aliases": {"aa:aa": "router"},
            "js_packets": [
                {"pcap_secs": 0.5, "ta": "bb:bb", "ra": "aa:aa", "dsmode": 1, "seq": 3, "typestr": "08 Data", "retry": 1},
                {"pcap_secs": 0.1, "ta": "aa:aa", "ra": "bb:bb", "dsmode": 2, "seq": 1, "typestr": "08 Data"},
                {"pcap_secs": 0.3, "ta": "aa:aa", "ra": "bb:bb", "typestr": "1D ACK"},
                {"pcap_secs": 0.2, "ta": "cc:cc", "ra": "dd:dd", "bad": 1, "typestr": "zz Junk"},
                {"ta": "aa:aa", "ra": "bb:bb"},
                {"pcap_secs": 0.4, "ra": "bb:bb", "typestr": "04 ProbeReq", "seq": 2}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_ingest_sorts_and_sanitises() {
        let reader = CaptureReader::from_slice(&capture()).unwrap();
        assert_eq!(reader.filename(), "office.pcap");
        let ds = reader.ingest(&IngestOptions {
            show_ack: true,
            to_plot: vec!["seq".to_string()],
        });

        assert_eq!(ds.dropped, 1);
        let ts: Vec<f64> = ds.records.iter().map(|r| r.pcap_secs).collect();
        assert_eq!(ts, vec![0.1, 0.2, 0.3, 0.4, 0.5]);

        let bad = &ds.records[1];
        assert_eq!(bad.stream.to_string(), "badpacket---badpacket");
        assert_eq!(bad.text("retry_bad"), Some("bad"));

        assert_eq!(ds.records[0].stream.to_string(), "aaaa---bbbb");
        assert_eq!(ds.records[3].ta, "null");
        assert_eq!(ds.records[4].text("retry_bad"), Some("retry"));
        assert_eq!(ds.records[0].text("retry_bad"), Some("good"));

        assert_eq!(ds.type_strings, vec!["04 ProbeReq", "08 Data", "1D ACK"]);
        assert_eq!(ds.missing.get("seq"), Some(&2));
        assert_eq!(ds.addresses.name("aaaa"), "router");
        assert_eq!(ds.addresses.role("aaaa"), Role::Access);
        assert_eq!(ds.addresses.role("bbbb"), Role::Station);
    }

    #[test]
    fn test_ingest_drops_acks_when_hidden() {
        let reader = CaptureReader::from_slice(&capture()).unwrap();
        let ds = reader.ingest(&IngestOptions {
            show_ack: false,
            to_plot: Vec::new(),
        });
        assert_eq!(ds.records.len(), 4);
        assert!(ds.records.iter().all(|r| r.text("typestr") != Some("1D ACK")));
    }

    #[test]
    fn test_open_gzip_file() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let path = std::env::temp_dir().join(format!("droplet-{}.json.gz", std::process::id()));
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&capture()).unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let reader = CaptureReader::open(&path).unwrap();
        assert_eq!(reader.packet_count(), 6);
        assert_eq!(reader.path(), Some(path.as_path()));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_open_pcap_file() {
        use crate::core::pcap::tests::{ack_frame, data_frame, legacy_radiotap, pcap, AP, STA};

        let frame = |body: Vec<u8>| [legacy_radiotap(0, 12, -45), body].concat();
        let data = pcap(&[
            (10.5, frame(data_frame(STA, AP, 7, false))),
            (10.25, frame(data_frame(AP, STA, 3, true))),
            (10.2505, frame(ack_frame(AP))),
        ]);
        let path = std::env::temp_dir().join(format!("droplet-{}.pcap", std::process::id()));
        std::fs::write(&path, &data).unwrap();

        let reader = CaptureReader::open(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(reader.filename(), path.file_name().unwrap().to_str().unwrap());
        assert_eq!(reader.packet_count(), 3);

        let ds = reader.ingest(&IngestOptions::default());
        let streams: Vec<String> = ds.records.iter().map(|r| r.stream.to_string()).collect();
        assert_eq!(
            streams,
            vec![
                "001122334455---aabbccddee01",
                "aabbccddee01---001122334455",
                "aabbccddee01---001122334455",
            ]
        );
        assert_eq!(ds.records[0].text("retry_bad"), Some("retry"));
        assert_eq!(ds.records[0].number("rate"), Some(6.0));
        assert_eq!(ds.addresses.role("001122334455"), Role::Access);
        assert_eq!(ds.hosts.get("001122334455"), 3);
        assert_eq!(ds.type_strings, vec!["1D ACK", "20 Data"]);
    }

    #[test]
    fn test_gzip_recognised_by_content() {
        use crate::core::pcap::tests::{ack_frame, legacy_radiotap, pcap, AP};
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let data = pcap(&[(1.0, [legacy_radiotap(0, 2, -50), ack_frame(AP)].concat())]);
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&data).unwrap();
        let reader = CaptureReader::from_bytes(&encoder.finish().unwrap(), "upload.cap").unwrap();
        assert_eq!(reader.filename(), "upload.cap");
        assert_eq!(reader.packet_count(), 1);

        let doc = CaptureReader::from_bytes(&capture(), "ignored").unwrap();
        assert_eq!(doc.filename(), "office.pcap");
    }

    #[test]
    fn test_malformed_document() {
        assert!(CaptureReader::from_slice(b"{\"js_packets\": 3}").is_err());
    }
}
