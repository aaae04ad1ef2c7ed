// Nearest-sample lookup for crosshair and tooltip interaction

use crate::core::fields::Placement;
use crate::core::format::{Record, ViewSettings};
use crate::core::scale::Scale;
use crate::core::time_index::locate_ids;
use tracing::debug;

/// Finds the record closest to a pointer position on one chart.
///
/// The search is seeded by bisecting the search set on the pointer's
/// timestamp and then scans a fixed window of neighbours around the seed, so
/// the cost per pointer event does not grow with the dataset. Candidates
/// further than `x_range` pixels away horizontally are never picked; among the
/// rest the smallest vertical distance wins, then the smallest horizontal
/// distance, then the lowest position in the search set.
#[derive(Debug, Clone, Copy)]
pub struct Resolver {
    pub search_window: usize,
    pub x_range: f64,
    pub max_y: f64,
}

impl Resolver {
    pub fn new(settings: &ViewSettings) -> Self {
        Self {
            search_window: settings.search_window,
            x_range: settings.x_range,
            max_y: settings.total_height,
        }
    }

    /// Returns the dataset index of the nearest record in `search_set`, a
    /// timestamp-ordered list of indices into `records`.
    ///
    /// A single-element search set resolves to that element once the pointer
    /// passes the plotting-area check, provided the element is placed on the
    /// chart at all.
    pub fn resolve(
        &self,
        x: f64,
        y: f64,
        records: &[Record],
        search_set: &[usize],
        time: &Scale,
        placement: &Placement<'_>,
    ) -> Option<usize> {
        if !time.covers_pixel(x) || y > self.max_y {
            return None;
        }

        let n = search_set.len();
        match n {
            0 => return None,
            1 => {
                let only = search_set[0];
                return placement.y(&records[only]).map(|_| only);
            }
            _ => {}
        }

        let x_of = |i: usize| time.apply(records[search_set[i]].pcap_secs);
        let target = time.invert(x);

        let seed = locate_ids(records, search_set, target);
        let seed = if seed == 0 {
            0
        } else if seed >= n {
            n - 1
        } else if (x - x_of(seed - 1)).abs() > (x - x_of(seed)).abs() {
            seed
        } else {
            seed - 1
        };

        let begin = seed.saturating_sub(self.search_window);
        let end = seed.saturating_add(self.search_window).min(n - 1);

        // (position, dy, dx)
        let mut best: Option<(usize, f64, f64)> = None;
        for i in begin..=end {
            let dx = (x - x_of(i)).abs();
            if dx > self.x_range {
                continue;
            }
            let Some(py) = placement.y(&records[search_set[i]]) else {
                continue;
            };
            let dy = (y - py).abs();
            let closer = match best {
                None => true,
                Some((_, best_dy, best_dx)) => dy < best_dy || (dy == best_dy && dx < best_dx),
            };
            if closer {
                best = Some((i, dy, dx));
            }
        }

        if best.is_none() {
            debug!("no sample within {}px of x={}", self.x_range, x);
        }
        best.map(|(i, _, _)| search_set[i])
    }
}
