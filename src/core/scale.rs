// Domain-to-pixel transforms for the time axis and plotted fields

use crate::core::error::{DropletError, Result};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleKind {
    Linear,
    Log,
}

#[derive(Debug, Clone, Serialize)]
pub struct Scale {
    kind: ScaleKind,
    domain: (f64, f64),
    range: (f64, f64),
}

impl Scale {
    pub fn new(kind: ScaleKind, domain: (f64, f64), range: (f64, f64)) -> Result<Self> {
        if kind == ScaleKind::Log && (domain.0 <= 0.0 || domain.1 <= 0.0) {
            return Err(DropletError::InvalidLogDomain {
                min: domain.0,
                max: domain.1,
            });
        }
        Ok(Self {
            kind,
            domain,
            range,
        })
    }

    pub fn linear(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self {
            kind: ScaleKind::Linear,
            domain,
            range,
        }
    }

    pub fn kind(&self) -> ScaleKind {
        self.kind
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    fn forward(&self, v: f64) -> f64 {
        match self.kind {
            ScaleKind::Linear => v,
            ScaleKind::Log => v.ln(),
        }
    }

    fn backward(&self, v: f64) -> f64 {
        match self.kind {
            ScaleKind::Linear => v,
            ScaleKind::Log => v.exp(),
        }
    }

    /// Maps a domain value to a pixel. A zero-width domain maps everything to
    /// the start of the range.
    pub fn apply(&self, value: f64) -> f64 {
        let (d0, d1) = (self.forward(self.domain.0), self.forward(self.domain.1));
        let span = d1 - d0;
        let t = if span == 0.0 { 0.0 } else { (self.forward(value) - d0) / span };
        self.range.0 + t * (self.range.1 - self.range.0)
    }

    pub fn invert(&self, pixel: f64) -> f64 {
        let (d0, d1) = (self.forward(self.domain.0), self.forward(self.domain.1));
        let span = self.range.1 - self.range.0;
        let t = if span == 0.0 { 0.0 } else { (pixel - self.range.0) / span };
        self.backward(d0 + t * (d1 - d0))
    }

    /// True when `pixel` lies within the range, whichever way round it runs.
    pub fn covers_pixel(&self, pixel: f64) -> bool {
        let (lo, hi) = if self.range.0 <= self.range.1 {
            (self.range.0, self.range.1)
        } else {
            (self.range.1, self.range.0)
        };
        pixel >= lo && pixel <= hi
    }

    /// Replaces the domain in place; later applications see the new mapping.
    pub fn rescale(&mut self, domain: (f64, f64)) {
        self.domain = domain;
    }
}

/// One scale per plotted field plus the shared time scale and its fixed
/// full-domain twin used by the overview.
#[derive(Debug, Clone)]
pub struct ScaleRegistry {
    time: Scale,
    time_fixed: Scale,
    fields: HashMap<String, Scale>,
}

impl ScaleRegistry {
    pub fn new(time: Scale) -> Self {
        Self {
            time_fixed: time.clone(),
            time,
            fields: HashMap::new(),
        }
    }

    pub fn create_scale(
        &mut self,
        field: &str,
        domain_min: f64,
        domain_max: f64,
        pixel_range: (f64, f64),
        kind: ScaleKind,
    ) -> Result<&Scale> {
        let scale = Scale::new(kind, (domain_min, domain_max), pixel_range)?;
        self.fields.insert(field.to_string(), scale);
        self.field(field)
    }

    pub fn field(&self, field: &str) -> Result<&Scale> {
        self.fields
            .get(field)
            .ok_or_else(|| DropletError::UnknownField(field.to_string()))
    }

    pub fn time(&self) -> &Scale {
        &self.time
    }

    pub fn time_fixed(&self) -> &Scale {
        &self.time_fixed
    }

    pub fn rescale_time(&mut self, domain: (f64, f64)) {
        self.time.rescale(domain);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_round_trip() {
        let s = Scale::linear((10.0, 60.0), (100.0, 0.0));
        assert_eq!(s.apply(10.0), 100.0);
        assert_eq!(s.apply(60.0), 0.0);
        for v in [10.0, 12.5, 33.3, 59.99] {
            assert!((s.invert(s.apply(v)) - v).abs() < 1e-9);
        }
    }

    #[test]
    fn test_log_monotonic() {
        let s = Scale::new(ScaleKind::Log, (1.0, 1000.0), (0.0, 300.0)).unwrap();
        assert!((s.apply(10.0) - 100.0).abs() < 1e-9);
        let mut last = f64::MIN;
        for v in [1.0, 2.0, 5.0, 50.0, 999.0] {
            let px = s.apply(v);
            assert!(px > last);
            last = px;
        }
        assert!((s.invert(200.0) - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_log_rejects_non_positive_domain() {
        assert!(Scale::new(ScaleKind::Log, (0.0, 10.0), (0.0, 1.0)).is_err());
    }

    #[test]
    fn test_degenerate_domain() {
        let s = Scale::linear((5.0, 5.0), (0.0, 100.0));
        assert_eq!(s.apply(5.0), 0.0);
        assert_eq!(s.apply(7.0), 0.0);
    }

    #[test]
    fn test_registry_rescale_time_only() {
        let mut reg = ScaleRegistry::new(Scale::linear((0.0, 10.0), (0.0, 1000.0)));
        reg.create_scale("seq", 0.0, 4095.0, (120.0, 0.0), ScaleKind::Linear)
            .unwrap();
        reg.rescale_time((2.0, 4.0));

        assert_eq!(reg.time().apply(3.0), 500.0);
        assert_eq!(reg.time_fixed().domain(), (0.0, 10.0));
        assert_eq!(reg.field("seq").unwrap().domain(), (0.0, 4095.0));
        assert!(reg.field("rate").is_err());
    }

    #[test]
    fn test_covers_pixel_either_orientation() {
        let s = Scale::linear((0.0, 1.0), (100.0, 0.0));
        assert!(s.covers_pixel(50.0));
        assert!(!s.covers_pixel(101.0));
    }
}
