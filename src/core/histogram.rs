// Overview histogram of packet counts over the full time domain

use crate::core::format::Record;
use crate::core::scale::Scale;
use crate::core::viewport::Domain;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub x: f64,
    pub dx: f64,
    pub count: usize,
    /// Records in all earlier bins, i.e. the dataset index where this bin starts.
    pub offset: usize,
}

#[derive(Debug, Clone)]
pub struct Histogram {
    bins: Vec<Bin>,
    y_scale: Scale,
}

impl Histogram {
    /// Equal-width bins over `domain`; the last bin is closed on the right.
    pub fn build(records: &[Record], domain: Domain, bin_count: usize, height: f64) -> Self {
        let bin_count = bin_count.max(1);
        let dx = (domain.1 - domain.0) / bin_count as f64;
        let mut counts = vec![0usize; bin_count];
        for record in records {
            let pos = ((record.pcap_secs - domain.0) / dx).floor();
            let i = if pos <= 0.0 { 0 } else { (pos as usize).min(bin_count - 1) };
            counts[i] += 1;
        }

        let mut offset = 0;
        let bins: Vec<Bin> = counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| {
                let bin = Bin {
                    x: domain.0 + i as f64 * dx,
                    dx,
                    count,
                    offset,
                };
                offset += count;
                bin
            })
            .collect();

        let max = bins.iter().map(|b| b.count).max().unwrap_or(0);
        let y_scale = Scale::linear((0.0, max as f64), (height, 0.0));
        Self { bins, y_scale }
    }

    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    pub fn y_scale(&self) -> &Scale {
        &self.y_scale
    }

    pub fn max_count(&self) -> usize {
        self.y_scale.domain().1 as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bins_and_offsets() {
        let data: Vec<Record> = [0.0, 0.1, 0.5, 0.99, 1.0]
            .iter()
            .map(|&t| Record::new(t, "a", "b"))
            .collect();
        let h = Histogram::build(&data, (0.0, 1.0), 4, 80.0);
        let counts: Vec<usize> = h.bins().iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![2, 0, 1, 2]);
        let offsets: Vec<usize> = h.bins().iter().map(|b| b.offset).collect();
        assert_eq!(offsets, vec![0, 2, 2, 3]);
        assert_eq!(h.bins()[2].x, 0.5);
        assert_eq!(h.max_count(), 2);
        assert_eq!(h.y_scale().apply(2.0), 0.0);
        assert_eq!(h.y_scale().apply(0.0), 80.0);
    }

    #[test]
    fn test_counts_cover_dataset() {
        let data: Vec<Record> = (0..500).map(|i| Record::new(i as f64 * 0.01, "a", "b")).collect();
        let h = Histogram::build(&data, (0.0, 4.99), 1000, 80.0);
        assert_eq!(h.bins().len(), 1000);
        assert_eq!(h.bins().iter().map(|b| b.count).sum::<usize>(), 500);
    }
}
