// Global record filter applied to every chart

use crate::core::format::{FieldValue, Record};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Filter {
    /// Records whose field shows the given value (compared as lane keys).
    FieldEquals { field: String, value: FieldValue },
    /// Records sent or received by one access point.
    AccessPoint { addr: String },
}

impl Filter {
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Filter::FieldEquals { field, value } => record
                .value(field)
                .is_some_and(|v| v.lane_key() == value.lane_key()),
            Filter::AccessPoint { addr } => record.shares_endpoint(addr),
        }
    }
}

#[derive(Debug, Default)]
pub struct FilterState {
    active: Option<Filter>,
    filtered: Vec<usize>,
}

impl FilterState {
    pub fn active(&self) -> Option<&Filter> {
        self.active.as_ref()
    }

    /// Applies `filter`, or clears it when it is already the active one.
    /// Returns whether a filter is active afterwards.
    pub fn toggle(&mut self, filter: Filter, records: &[Record]) -> bool {
        if self.active.as_ref() == Some(&filter) {
            self.clear();
            return false;
        }
        self.filtered = records
            .iter()
            .enumerate()
            .filter(|(_, r)| filter.matches(r))
            .map(|(i, _)| i)
            .collect();
        info!("filter {:?} keeps {} of {} records", filter, self.filtered.len(), records.len());
        self.active = Some(filter);
        true
    }

    pub fn clear(&mut self) {
        self.active = None;
        self.filtered.clear();
    }

    /// Filtered record indices, or `None` when no filter is active.
    pub fn subset(&self) -> Option<&[usize]> {
        self.active.as_ref().map(|_| self.filtered.as_slice())
    }

    /// Narrows an ordered index list to the records the filter keeps.
    pub fn restrict<'a>(&self, ids: &'a [usize], records: &[Record]) -> Cow<'a, [usize]> {
        match &self.active {
            None => Cow::Borrowed(ids),
            Some(filter) => Cow::Owned(
                ids.iter()
                    .copied()
                    .filter(|&i| filter.matches(&records[i]))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> Vec<Record> {
        vec![
            Record::new(0.1, "ap", "s1").with("typestr", FieldValue::Text("04 ProbeReq".into())),
            Record::new(0.2, "s2", "x").with("typestr", FieldValue::Text("08 Beacon".into())),
            Record::new(0.3, "s1", "ap").with("retry", FieldValue::Number(1.0)),
        ]
    }

    #[test]
    fn test_field_filter_toggles() {
        let records = data();
        let mut state = FilterState::default();
        let f = Filter::FieldEquals {
            field: "typestr".into(),
            value: FieldValue::Text("08 Beacon".into()),
        };
        assert!(state.toggle(f.clone(), &records));
        assert_eq!(state.subset(), Some(&[1][..]));
        assert!(!state.toggle(f, &records));
        assert_eq!(state.subset(), None);
    }

    #[test]
    fn test_numeric_value_matches_lane_key() {
        let records = data();
        let mut state = FilterState::default();
        state.toggle(
            Filter::FieldEquals {
                field: "retry".into(),
                value: FieldValue::Text("1".into()),
            },
            &records,
        );
        assert_eq!(state.subset(), Some(&[2][..]));
    }

    #[test]
    fn test_access_point_filter_and_restrict() {
        let records = data();
        let mut state = FilterState::default();
        assert_eq!(state.restrict(&[0, 1, 2], &records).as_ref(), &[0, 1, 2]);

        state.toggle(Filter::AccessPoint { addr: "ap".into() }, &records);
        assert_eq!(state.subset(), Some(&[0, 2][..]));
        assert_eq!(state.restrict(&[1, 2], &records).as_ref(), &[2]);
    }
}
