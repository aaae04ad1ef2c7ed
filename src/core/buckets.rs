// Fixed-width time buckets for pointer lookups without a locked stream

use crate::core::format::Record;
use std::collections::HashMap;

pub struct TimeBucketMap {
    resolution: f64,
    buckets: HashMap<i64, Vec<usize>>,
}

impl TimeBucketMap {
    /// Groups record indices by `floor(t / resolution)`, preserving dataset order.
    pub fn build(records: &[Record], resolution: f64) -> Self {
        let mut buckets: HashMap<i64, Vec<usize>> = HashMap::new();
        for (i, record) in records.iter().enumerate() {
            buckets
                .entry(bucket_id(record.pcap_secs, resolution))
                .or_default()
                .push(i);
        }
        Self {
            resolution,
            buckets,
        }
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Records in the bucket containing `t`; empty when nothing falls there.
    pub fn lookup(&self, t: f64) -> &[usize] {
        self.buckets
            .get(&bucket_id(t, self.resolution))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

pub fn bucket_id(t: f64, resolution: f64) -> i64 {
    (t / resolution).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets_partition_in_order() {
        let data: Vec<Record> = [0.01, 0.05, 0.12, 0.19, 0.31]
            .iter()
            .map(|&t| Record::new(t, "a", "b"))
            .collect();
        let map = TimeBucketMap::build(&data, 0.1);

        assert_eq!(map.len(), 3);
        assert_eq!(map.lookup(0.0), &[0, 1]);
        assert_eq!(map.lookup(0.15), &[2, 3]);
        assert_eq!(map.lookup(0.35), &[4]);

        let total: usize = [0.0, 0.15, 0.35].iter().map(|&t| map.lookup(t).len()).sum();
        assert_eq!(total, data.len());
    }

    #[test]
    fn test_empty_bucket_is_empty_slice() {
        let data = vec![Record::new(1.0, "a", "b")];
        let map = TimeBucketMap::build(&data, 0.1);
        assert!(map.lookup(5.0).is_empty());
        assert!(map.lookup(-3.0).is_empty());
    }
}
