// Visible time domain and zoom history

use crate::core::error::{DropletError, Result};
use crate::core::format::Record;
use tracing::debug;

pub type Domain = (f64, f64);

/// Full timestamp range of a sorted dataset, widened so that `t0 < t1`
/// always holds.
pub fn full_domain(records: &[Record]) -> Domain {
    match (records.first(), records.last()) {
        (Some(first), Some(last)) if first.pcap_secs < last.pcap_secs => {
            (first.pcap_secs, last.pcap_secs)
        }
        (Some(only), _) => (only.pcap_secs - 0.5, only.pcap_secs + 0.5),
        _ => (0.0, 1.0),
    }
}

#[derive(Debug, Clone)]
pub struct Viewport {
    full: Domain,
    domain: Domain,
    stack: Vec<Domain>,
}

impl Viewport {
    pub fn new(full: Domain) -> Self {
        Self {
            full,
            domain: full,
            stack: Vec::new(),
        }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn full_domain(&self) -> Domain {
        self.full
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Pushes the current domain and moves to `target`. The bounds may come
    /// in either order; an empty interval is rejected and leaves the state
    /// untouched.
    pub fn zoom_in(&mut self, target: Domain) -> Result<Domain> {
        let (t0, t1) = if target.0 <= target.1 {
            target
        } else {
            (target.1, target.0)
        };
        if !(t0 < t1) {
            return Err(DropletError::EmptyDomain(t0, t1));
        }
        self.stack.push(self.domain);
        self.domain = (t0, t1);
        debug!("zoom in to [{}, {}] (depth {})", t0, t1, self.stack.len());
        Ok(self.domain)
    }

    /// Returns to the previous domain, settling at the full domain once the
    /// history is exhausted.
    pub fn zoom_out(&mut self) -> Domain {
        self.domain = self.stack.pop().unwrap_or(self.full);
        debug!("zoom out to [{}, {}] (depth {})", self.domain.0, self.domain.1, self.stack.len());
        self.domain
    }

    /// Drops the history and shows the full domain.
    pub fn reset(&mut self) -> Domain {
        self.stack.clear();
        self.domain = self.full;
        self.domain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_in_out_restores_prior() {
        let mut vp = Viewport::new((0.0, 10.0));
        vp.zoom_in((2.0, 8.0)).unwrap();
        vp.zoom_in((3.0, 4.0)).unwrap();
        assert_eq!(vp.depth(), 2);

        assert_eq!(vp.zoom_out(), (2.0, 8.0));
        assert_eq!(vp.zoom_out(), (0.0, 10.0));
        assert_eq!(vp.zoom_out(), (0.0, 10.0));
        assert_eq!(vp.zoom_out(), (0.0, 10.0));
        assert_eq!(vp.depth(), 0);
    }

    #[test]
    fn test_zoom_in_orders_bounds_and_rejects_empty() {
        let mut vp = Viewport::new((0.0, 10.0));
        assert_eq!(vp.zoom_in((6.0, 1.0)).unwrap(), (1.0, 6.0));
        assert!(vp.zoom_in((3.0, 3.0)).is_err());
        assert_eq!(vp.domain(), (1.0, 6.0));
        assert_eq!(vp.depth(), 1);
    }

    #[test]
    fn test_reset() {
        let mut vp = Viewport::new((0.0, 10.0));
        vp.zoom_in((2.0, 8.0)).unwrap();
        assert_eq!(vp.reset(), (0.0, 10.0));
        assert_eq!(vp.depth(), 0);
    }

    #[test]
    fn test_full_domain_widens_degenerate() {
        assert_eq!(full_domain(&[]), (0.0, 1.0));
        assert_eq!(full_domain(&[Record::new(2.0, "a", "b")]), (1.5, 2.5));
        let data = vec![Record::new(1.0, "a", "b"), Record::new(3.0, "a", "b")];
        assert_eq!(full_domain(&data), (1.0, 3.0));
    }
}
