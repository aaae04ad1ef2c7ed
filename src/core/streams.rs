// Conversation grouping, endpoint roles and stream direction

use crate::core::constants::{BAD_PACKET_ADDR, NULL_ADDR, STREAM_SEPARATOR};
use crate::core::error::{DropletError, Result};
use crate::core::format::Record;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Direction-tagged conversation key: transmitter then receiver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamKey {
    pub ta: String,
    pub ra: String,
}

impl StreamKey {
    pub fn new(ta: &str, ra: &str) -> Self {
        Self {
            ta: ta.to_string(),
            ra: ra.to_string(),
        }
    }

    /// The same conversation in the opposite direction.
    pub fn complement(&self) -> Self {
        Self {
            ta: self.ra.clone(),
            ra: self.ta.clone(),
        }
    }

    pub fn contains(&self, addr: &str) -> bool {
        self.ta == addr || self.ra == addr
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.ta, STREAM_SEPARATOR, self.ra)
    }
}

impl FromStr for StreamKey {
    type Err = DropletError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(STREAM_SEPARATOR) {
            Some((ta, ra)) if !ta.is_empty() && !ra.is_empty() && !ra.contains(STREAM_SEPARATOR) => {
                Ok(Self::new(ta, ra))
            }
            _ => Err(DropletError::MalformedStreamKey(s.to_string())),
        }
    }
}

impl Serialize for StreamKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Access,
    Station,
    Unknown,
}

impl Role {
    fn opposite(self) -> Role {
        match self {
            Role::Access => Role::Station,
            Role::Station => Role::Access,
            Role::Unknown => Role::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Upstream,
    Downstream,
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct Address {
    pub name: String,
    pub role: Role,
}

/// Display names and inferred roles of every endpoint seen in a capture.
#[derive(Debug, Clone, Default)]
pub struct AddressBook {
    entries: HashMap<String, Address>,
}

impl AddressBook {
    pub fn with_aliases(aliases: &HashMap<String, String>) -> Self {
        let mut book = Self::default();
        book.insert(BAD_PACKET_ADDR, "bad_packet");
        book.insert(NULL_ADDR, NULL_ADDR);
        for (addr, alias) in aliases {
            book.insert(&strip_colons(addr), alias);
        }
        book
    }

    fn insert(&mut self, addr: &str, name: &str) {
        self.entries.insert(
            addr.to_string(),
            Address {
                name: name.to_string(),
                role: Role::Unknown,
            },
        );
    }

    /// Registers an endpoint under its raw id unless it is already known.
    pub fn observe(&mut self, addr: &str) {
        if !self.entries.contains_key(addr) {
            self.insert(addr, addr);
        }
    }

    pub fn name<'a>(&'a self, addr: &'a str) -> &'a str {
        self.entries.get(addr).map(|a| a.name.as_str()).unwrap_or(addr)
    }

    pub fn role(&self, addr: &str) -> Role {
        self.entries.get(addr).map(|a| a.role).unwrap_or(Role::Unknown)
    }

    fn set_role(&mut self, addr: &str, role: Role) {
        self.observe(addr);
        if let Some(entry) = self.entries.get_mut(addr) {
            entry.role = role;
        }
    }

    pub fn display_stream(&self, key: &StreamKey) -> String {
        format!("{}→{}", self.name(&key.ta), self.name(&key.ra))
    }

    pub fn get(&self, addr: &str) -> Option<&Address> {
        self.entries.get(addr)
    }

    /// Assigns access/station roles from the records' `dsmode`.
    ///
    /// The first pass trusts only unambiguous frames (`dsmode` 1 or 2). The
    /// second pass repeatedly propagates roles across `dsmode` 0 frames where
    /// exactly one endpoint is known. Endpoints reached by neither stay
    /// [`Role::Unknown`].
    pub fn infer_roles(&mut self, records: &[Record]) {
        for record in records {
            match record.number("dsmode") {
                Some(d) if d == 2.0 => {
                    self.set_role(&record.ta, Role::Access);
                    self.set_role(&record.ra, Role::Station);
                }
                Some(d) if d == 1.0 => {
                    self.set_role(&record.ra, Role::Access);
                    self.set_role(&record.ta, Role::Station);
                }
                _ => {}
            }
        }

        let neutral: Vec<&Record> = records
            .iter()
            .filter(|r| r.number("dsmode") == Some(0.0))
            .collect();
        loop {
            let mut changed = false;
            for record in &neutral {
                let (ta_role, ra_role) = (self.role(&record.ta), self.role(&record.ra));
                match (ta_role, ra_role) {
                    (Role::Unknown, known) if known != Role::Unknown => {
                        self.set_role(&record.ta, known.opposite());
                        changed = true;
                    }
                    (known, Role::Unknown) if known != Role::Unknown => {
                        self.set_role(&record.ra, known.opposite());
                        changed = true;
                    }
                    _ => {}
                }
            }
            if !changed {
                break;
            }
        }
    }
}

pub fn strip_colons(addr: &str) -> String {
    addr.replace(':', "")
}

#[derive(Debug, Clone, Serialize)]
pub struct StreamInfo {
    pub key: StreamKey,
    #[serde(skip)]
    pub records: Vec<usize>,
    pub packets: usize,
    pub direction: Direction,
    pub access: Option<String>,
    pub station: Option<String>,
}

/// Records grouped by stream key, each group in dataset order.
#[derive(Debug, Default)]
pub struct StreamIndex {
    streams: HashMap<StreamKey, StreamInfo>,
    first_seen: Vec<StreamKey>,
}

impl StreamIndex {
    pub fn build(records: &[Record], book: &AddressBook) -> Self {
        let mut index = Self::default();
        for (i, record) in records.iter().enumerate() {
            match index.streams.get_mut(&record.stream) {
                Some(info) => info.records.push(i),
                None => {
                    index.first_seen.push(record.stream.clone());
                    index.streams.insert(
                        record.stream.clone(),
                        StreamInfo {
                            key: record.stream.clone(),
                            records: vec![i],
                            packets: 0,
                            direction: Direction::Unknown,
                            access: None,
                            station: None,
                        },
                    );
                }
            }
        }

        for info in index.streams.values_mut() {
            info.packets = info.records.len();
            let (ta, ra) = (&info.key.ta, &info.key.ra);
            if book.role(ta) == Role::Access || book.role(ra) == Role::Station {
                info.direction = Direction::Downstream;
                info.access = Some(ta.clone());
                info.station = Some(ra.clone());
            } else if book.role(ra) == Role::Access || book.role(ta) == Role::Station {
                info.direction = Direction::Upstream;
                info.access = Some(ra.clone());
                info.station = Some(ta.clone());
            } else {
                debug!("direction not found for stream {}", info.key);
            }
        }

        index
    }

    pub fn get(&self, key: &StreamKey) -> Option<&StreamInfo> {
        self.streams.get(key)
    }

    /// Records of one stream; empty for unknown keys.
    pub fn records_of(&self, key: &StreamKey) -> &[usize] {
        self.streams
            .get(key)
            .map(|s| s.records.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StreamInfo> {
        self.first_seen.iter().filter_map(|k| self.streams.get(k))
    }

    /// Legend order: most packets first, ties by first appearance.
    pub fn legend_order(&self) -> Vec<&StreamInfo> {
        let mut out: Vec<&StreamInfo> = self.iter().collect();
        out.sort_by(|a, b| b.packets.cmp(&a.packets));
        out
    }

    /// Lane order for the stream chart: by access point, then station.
    pub fn lane_order(&self) -> Vec<&StreamKey> {
        let mut out: Vec<&StreamInfo> = self.iter().collect();
        out.sort_by(|a, b| {
            a.access
                .cmp(&b.access)
                .then_with(|| a.station.cmp(&b.station))
        });
        out.into_iter().map(|s| &s.key).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::format::FieldValue;

    fn frame(t: f64, ta: &str, ra: &str, dsmode: f64) -> Record {
        Record::new(t, ta, ra).with("dsmode", FieldValue::Number(dsmode))
    }

    #[test]
    fn test_stream_key_parse_and_complement() {
        let key: StreamKey = "A---B".parse().unwrap();
        assert_eq!(key, StreamKey::new("A", "B"));
        assert_eq!(key.complement().to_string(), "B---A");
        assert!("AB".parse::<StreamKey>().is_err());
        assert!("---B".parse::<StreamKey>().is_err());
    }

    #[test]
    fn test_two_pass_role_inference() {
        // ap-sta is unambiguous, sta-other only resolvable through propagation,
        // x-y never touches a known endpoint.
        let data = vec![
            frame(0.1, "sta", "other", 0.0),
            frame(0.2, "ap", "sta", 2.0),
            frame(0.3, "x", "y", 0.0),
        ];
        let mut book = AddressBook::default();
        for r in &data {
            book.observe(&r.ta);
            book.observe(&r.ra);
        }
        book.infer_roles(&data);

        assert_eq!(book.role("ap"), Role::Access);
        assert_eq!(book.role("sta"), Role::Station);
        assert_eq!(book.role("other"), Role::Access);
        assert_eq!(book.role("x"), Role::Unknown);
        assert_eq!(book.role("y"), Role::Unknown);
    }

    #[test]
    fn test_group_partition_and_direction() {
        let data = vec![
            frame(0.1, "ap", "sta", 2.0),
            frame(0.2, "sta", "ap", 1.0),
            frame(0.3, "ap", "sta", 2.0),
            frame(0.4, "x", "y", 0.0),
        ];
        let mut book = AddressBook::default();
        book.infer_roles(&data);
        let index = StreamIndex::build(&data, &book);

        let total: usize = index.iter().map(|s| s.records.len()).sum();
        assert_eq!(total, data.len());
        assert_eq!(index.len(), 3);

        let down = index.get(&StreamKey::new("ap", "sta")).unwrap();
        assert_eq!(down.records, vec![0, 2]);
        assert_eq!(down.direction, Direction::Downstream);
        assert_eq!(down.access.as_deref(), Some("ap"));

        let up = index.get(&StreamKey::new("sta", "ap")).unwrap();
        assert_eq!(up.direction, Direction::Upstream);
        assert_eq!(up.access.as_deref(), Some("ap"));
        assert_eq!(up.station.as_deref(), Some("sta"));

        let unknown = index.get(&StreamKey::new("x", "y")).unwrap();
        assert_eq!(unknown.direction, Direction::Unknown);
        assert!(unknown.access.is_none());

        assert!(index.records_of(&StreamKey::new("q", "r")).is_empty());
    }

    #[test]
    fn test_legend_and_lane_order() {
        let data = vec![
            frame(0.1, "x", "y", 0.0),
            frame(0.2, "b", "s1", 2.0),
            frame(0.3, "b", "s1", 2.0),
            frame(0.4, "a", "s2", 2.0),
        ];
        let mut book = AddressBook::default();
        book.infer_roles(&data);
        let index = StreamIndex::build(&data, &book);

        let legend: Vec<String> = index.legend_order().iter().map(|s| s.key.to_string()).collect();
        assert_eq!(legend, vec!["b---s1", "x---y", "a---s2"]);

        let lanes: Vec<String> = index.lane_order().iter().map(|k| k.to_string()).collect();
        assert_eq!(lanes, vec!["x---y", "a---s2", "b---s1"]);
    }

    #[test]
    fn test_alias_names() {
        let mut aliases = HashMap::new();
        aliases.insert("aa:bb".to_string(), "router".to_string());
        let mut book = AddressBook::with_aliases(&aliases);
        book.observe("ccdd");
        assert_eq!(book.name("aabb"), "router");
        assert_eq!(book.name("ccdd"), "ccdd");
        assert_eq!(book.name("badpacket"), "bad_packet");
        assert_eq!(book.display_stream(&StreamKey::new("aabb", "ccdd")), "router→ccdd");
    }
}
