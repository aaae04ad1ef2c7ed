// Bisection over timestamp-sorted records

use crate::core::format::Record;

/// Leftmost insertion point of `t`: the first index whose timestamp is >= `t`,
/// or `items.len()` when every timestamp is smaller.
pub fn locate_by<T, F>(items: &[T], t: f64, timestamp: F) -> usize
where
    F: Fn(&T) -> f64,
{
    items.partition_point(|item| timestamp(item) < t)
}

pub fn locate(records: &[Record], t: f64) -> usize {
    locate_by(records, t, |r| r.pcap_secs)
}

/// Same as [`locate`] for a sorted list of record indices into `records`.
pub fn locate_ids(records: &[Record], ids: &[usize], t: f64) -> usize {
    locate_by(ids, t, |&i| records[i].pcap_secs)
}

/// Indices whose timestamps fall in `[t0, t1]`. The upper bound is inclusive
/// so the full-dataset domain keeps its last record.
pub fn slice_domain<'a>(records: &[Record], ids: &'a [usize], t0: f64, t1: f64) -> &'a [usize] {
    let start = locate_ids(records, ids, t0);
    let end = ids.partition_point(|&i| records[i].pcap_secs <= t1).max(start);
    &ids[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn records(ts: &[f64]) -> Vec<Record> {
        ts.iter().map(|&t| Record::new(t, "a", "b")).collect()
    }

    #[test]
    fn test_locate_leftmost_tie() {
        let data = records(&[0.1, 0.2, 0.2, 0.5, 0.9]);
        assert_eq!(locate(&data, 0.2), 1);
        assert_eq!(locate(&data, 1.0), 5);
        assert_eq!(locate(&data, 0.0), 0);
        assert_eq!(locate(&data, 0.3), 3);
    }

    #[test]
    fn test_locate_empty() {
        assert_eq!(locate(&[], 1.0), 0);
    }

    #[test]
    fn test_locate_leftmost_property_random() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let n = rng.gen_range(1..200);
            let mut ts: Vec<f64> = (0..n).map(|_| (rng.gen_range(0..500) as f64) / 10.0).collect();
            ts.sort_by(f64::total_cmp);
            let data = records(&ts);
            for _ in 0..20 {
                let t = ts[0] + rng.gen::<f64>() * (ts[n - 1] - ts[0]);
                let i = locate(&data, t);
                if i > 0 {
                    assert!(data[i - 1].pcap_secs < t);
                }
                if i < n {
                    assert!(t <= data[i].pcap_secs);
                }
            }
        }
    }

    #[test]
    fn test_slice_domain() {
        let data = records(&[0.1, 0.2, 0.2, 0.5, 0.9]);
        let ids: Vec<usize> = (0..data.len()).collect();
        assert_eq!(slice_domain(&data, &ids, 0.2, 0.9), &[1, 2, 3, 4]);
        assert_eq!(slice_domain(&data, &ids, 0.2, 0.5), &[1, 2, 3]);
        assert_eq!(slice_domain(&data, &ids, 0.0, 10.0), &[0, 1, 2, 3, 4]);
        assert!(slice_domain(&data, &ids, 0.6, 0.7).is_empty());

        let sub = vec![0, 3, 4];
        assert_eq!(locate_ids(&data, &sub, 0.3), 1);
        assert_eq!(slice_domain(&data, &sub, 0.1, 0.6), &[0, 3]);
    }
}
