// Plotted field catalogue and per-chart vertical mapping

use crate::core::constants::{BAR_HEIGHT_SELECTED, UNDEFINED_LANE};
use crate::core::error::Result;
use crate::core::format::{FieldValue, Record};
use crate::core::scale::{Scale, ScaleRegistry};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Numeric,
    Boolean,
    Categorical,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSettings {
    pub kind: FieldKind,
    pub chart_height: f64,
    pub element_height: f64,
}

impl FieldSettings {
    const fn new(kind: FieldKind, chart_height: f64, element_height: f64) -> Self {
        Self {
            kind,
            chart_height,
            element_height,
        }
    }

    /// Built-in settings; unlisted fields are plotted as numbers.
    pub fn lookup(field: &str) -> Self {
        let box_height = BAR_HEIGHT_SELECTED + 2.0;
        match field {
            "seq" => Self::new(FieldKind::Numeric, 120.0, 0.0),
            "rate" => Self::new(FieldKind::Numeric, 100.0, 0.0),
            "retry" => Self::new(FieldKind::Boolean, 40.0, 16.0),
            "bad" | "bw" => Self::new(FieldKind::Boolean, 40.0, box_height),
            "spatialstreams" => Self::new(FieldKind::Boolean, 60.0, box_height),
            "retry_bad" | "typestr" => Self::new(FieldKind::Categorical, 60.0, box_height),
            "streamId" => Self::new(FieldKind::Categorical, 200.0, 5.0),
            _ => Self::new(FieldKind::Numeric, 100.0, 0.0),
        }
    }
}

/// Ordered categorical lanes, top to bottom.
#[derive(Debug, Clone, Serialize)]
pub struct Lanes {
    order: Vec<String>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    element_height: f64,
}

impl Lanes {
    pub fn new(order: Vec<String>, element_height: f64) -> Self {
        let index = order
            .iter()
            .enumerate()
            .map(|(i, k)| (k.clone(), i))
            .collect();
        Self {
            order,
            index,
            element_height,
        }
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Lane of a value, falling back to the `undefined` lane when present.
    pub fn lane_of(&self, value: Option<&FieldValue>) -> Option<usize> {
        value
            .and_then(|v| self.index.get(&v.lane_key()))
            .or_else(|| self.index.get(UNDEFINED_LANE))
            .copied()
    }

    pub fn y(&self, value: Option<&FieldValue>) -> Option<f64> {
        self.lane_of(value).map(|i| i as f64 * self.element_height)
    }
}

/// How a chart places records vertically, fixed when the chart is built.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChartKind {
    Numeric,
    Boolean { lanes: Lanes },
    Categorical { lanes: Lanes },
}

#[derive(Debug, Clone, Serialize)]
pub struct Chart {
    pub field: String,
    #[serde(flatten)]
    pub kind: ChartKind,
    pub chart_height: f64,
}

impl Chart {
    pub fn numeric(field: &str, chart_height: f64) -> Self {
        Self {
            field: field.to_string(),
            kind: ChartKind::Numeric,
            chart_height,
        }
    }

    /// Boolean charts put the "set" lane on top.
    pub fn boolean(field: &str, settings: FieldSettings) -> Self {
        let order = if field == "spatialstreams" {
            vec!["2".to_string(), "1".to_string()]
        } else {
            vec!["1".to_string(), "0".to_string()]
        };
        Self {
            field: field.to_string(),
            kind: ChartKind::Boolean {
                lanes: Lanes::new(order, settings.element_height),
            },
            chart_height: settings.chart_height,
        }
    }

    /// Categorical charts are as tall as their lanes.
    pub fn categorical(field: &str, order: Vec<String>, settings: FieldSettings) -> Self {
        let lanes = Lanes::new(order, settings.element_height);
        Self {
            field: field.to_string(),
            chart_height: lanes.len() as f64 * settings.element_height,
            kind: ChartKind::Categorical { lanes },
        }
    }

    pub fn lanes(&self) -> Option<&Lanes> {
        match &self.kind {
            ChartKind::Numeric => None,
            ChartKind::Boolean { lanes } | ChartKind::Categorical { lanes } => Some(lanes),
        }
    }

    /// Resolves the vertical mapping once so it can be applied per record.
    pub fn placement<'a>(&'a self, scales: &'a ScaleRegistry) -> Result<Placement<'a>> {
        let mode = match &self.kind {
            ChartKind::Numeric => PlacementMode::Scale(scales.field(&self.field)?),
            ChartKind::Boolean { lanes } | ChartKind::Categorical { lanes } => PlacementMode::Lanes(lanes),
        };
        Ok(Placement {
            field: &self.field,
            mode,
        })
    }

    /// Vertical pixel of a record on this chart, or `None` when the record
    /// has no placement here.
    pub fn y(&self, record: &Record, scales: &ScaleRegistry) -> Result<Option<f64>> {
        Ok(self.placement(scales)?.y(record))
    }
}

enum PlacementMode<'a> {
    Scale(&'a Scale),
    Lanes(&'a Lanes),
}

pub struct Placement<'a> {
    field: &'a str,
    mode: PlacementMode<'a>,
}

impl Placement<'_> {
    pub fn y(&self, record: &Record) -> Option<f64> {
        match self.mode {
            PlacementMode::Scale(scale) => record.number(self.field).map(|v| scale.apply(v)),
            PlacementMode::Lanes(lanes) => lanes.y(record.value(self.field)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scale::ScaleKind;

    #[test]
    fn test_settings_lookup() {
        assert_eq!(FieldSettings::lookup("retry").kind, FieldKind::Boolean);
        assert_eq!(FieldSettings::lookup("typestr").kind, FieldKind::Categorical);
        assert_eq!(FieldSettings::lookup("dbm_antsignal").kind, FieldKind::Numeric);
        assert_eq!(FieldSettings::lookup("dbm_antsignal").chart_height, 100.0);
    }

    #[test]
    fn test_boolean_lanes() {
        let chart = Chart::boolean("retry", FieldSettings::lookup("retry"));
        let scales = ScaleRegistry::new(Scale::linear((0.0, 1.0), (0.0, 100.0)));
        let set = Record::new(0.0, "a", "b").with("retry", FieldValue::Number(1.0));
        let clear = Record::new(0.0, "a", "b").with("retry", FieldValue::Number(0.0));
        let missing = Record::new(0.0, "a", "b");

        assert_eq!(chart.y(&set, &scales).unwrap(), Some(0.0));
        assert_eq!(chart.y(&clear, &scales).unwrap(), Some(16.0));
        assert_eq!(chart.y(&missing, &scales).unwrap(), None);
    }

    #[test]
    fn test_categorical_undefined_lane() {
        let order = vec!["a".to_string(), "b".to_string(), UNDEFINED_LANE.to_string()];
        let chart = Chart::categorical("typestr", order, FieldSettings::lookup("typestr"));
        assert_eq!(chart.chart_height, 48.0);

        let lanes = chart.lanes().unwrap();
        assert_eq!(lanes.lane_of(Some(&FieldValue::Text("b".into()))), Some(1));
        assert_eq!(lanes.lane_of(Some(&FieldValue::Text("zz".into()))), Some(2));
        assert_eq!(lanes.lane_of(None), Some(2));
    }

    #[test]
    fn test_numeric_uses_field_scale() {
        let mut scales = ScaleRegistry::new(Scale::linear((0.0, 1.0), (0.0, 100.0)));
        scales
            .create_scale("seq", 0.0, 100.0, (120.0, 0.0), ScaleKind::Linear)
            .unwrap();
        let chart = Chart::numeric("seq", 120.0);
        let r = Record::new(0.0, "a", "b").with("seq", FieldValue::Number(50.0));
        assert_eq!(chart.y(&r, &scales).unwrap(), Some(60.0));
        assert_eq!(chart.y(&Record::new(0.0, "a", "b"), &scales).unwrap(), None);
    }
}
