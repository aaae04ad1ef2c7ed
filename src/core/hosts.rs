// Per-endpoint packet counts for picking which hosts are worth showing

use crate::core::constants::{BROADCAST_ADDR, HOST_CUTOFF_RATIO, NULL_ADDR};
use crate::core::format::Record;
use crate::core::streams::AddressBook;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct HostCounts {
    counts: HashMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostRow {
    pub addr: String,
    pub name: String,
    pub packets: usize,
    /// Busy enough to be shown without asking.
    pub shown: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostSummary {
    pub cutoff: f64,
    /// Hosts at or above the cutoff, busiest first, broadcast excluded.
    pub hosts: Vec<HostRow>,
    /// Packets counted against hosts below the cutoff.
    pub other: usize,
}

impl HostCounts {
    /// Counts every good packet once for its transmitter and once for its
    /// receiver. Bad packets and packets with a missing endpoint are skipped.
    pub fn build(records: &[Record]) -> Self {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for record in records {
            if record.is_bad() || record.ta == NULL_ADDR || record.ra == NULL_ADDR {
                continue;
            }
            *counts.entry(record.ta.clone()).or_default() += 1;
            *counts.entry(record.ra.clone()).or_default() += 1;
        }
        Self { counts }
    }

    pub fn get(&self, addr: &str) -> usize {
        self.counts.get(addr).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn summary(&self, book: &AddressBook) -> HostSummary {
        let busiest = self.counts.values().copied().max().unwrap_or(0);
        let cutoff = busiest as f64 * HOST_CUTOFF_RATIO;

        let mut hosts: Vec<HostRow> = self
            .counts
            .iter()
            .filter(|&(addr, &n)| n as f64 >= cutoff && addr != BROADCAST_ADDR)
            .map(|(addr, &n)| HostRow {
                addr: addr.clone(),
                name: book.name(addr).to_string(),
                packets: n,
                shown: n as f64 > cutoff * 10.0,
            })
            .collect();
        hosts.sort_by(|a, b| b.packets.cmp(&a.packets).then_with(|| a.addr.cmp(&b.addr)));

        let other = self
            .counts
            .values()
            .filter(|&&n| (n as f64) < cutoff)
            .sum();

        HostSummary { cutoff, hosts, other }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::format::FieldValue;

    fn records() -> Vec<Record> {
        let mut out = Vec::new();
        for i in 0..300 {
            out.push(Record::new(i as f64, "ap", "sta1"));
        }
        for i in 0..20 {
            out.push(Record::new(i as f64, "sta2", "ap"));
        }
        out.push(Record::new(0.0, "sta3", "ap"));
        for i in 0..5 {
            out.push(Record::new(i as f64, "ap", BROADCAST_ADDR));
        }
        out.push(Record::new(1.0, "ap", NULL_ADDR));
        out.push(Record::new(1.0, "evil", "ap").with("bad", FieldValue::Number(1.0)));
        out
    }

    #[test]
    fn test_counts_skip_bad_and_unknown_endpoints() {
        let counts = HostCounts::build(&records());
        assert_eq!(counts.get("ap"), 326);
        assert_eq!(counts.get("sta1"), 300);
        assert_eq!(counts.get(BROADCAST_ADDR), 5);
        assert_eq!(counts.get("evil"), 0);
        assert_eq!(counts.get(NULL_ADDR), 0);
        assert_eq!(counts.len(), 5);
    }

    #[test]
    fn test_summary_applies_cutoff() {
        let counts = HostCounts::build(&records());
        let mut aliases = HashMap::new();
        aliases.insert("ap".to_string(), "router".to_string());
        let summary = counts.summary(&AddressBook::with_aliases(&aliases));

        assert!((summary.cutoff - 3.26).abs() < 1e-9);
        let listed: Vec<(&str, bool)> = summary
            .hosts
            .iter()
            .map(|h| (h.addr.as_str(), h.shown))
            .collect();
        // broadcast clears the cutoff but is never listed; sta2 is listed but not shown
        assert_eq!(listed, vec![("ap", true), ("sta1", true), ("sta2", false)]);
        assert_eq!(summary.hosts[0].name, "router");
        assert_eq!(summary.other, 1);
    }

    #[test]
    fn test_empty_summary() {
        let summary = HostCounts::default().summary(&AddressBook::default());
        assert!(summary.hosts.is_empty());
        assert_eq!(summary.other, 0);
    }
}
