// View context: one capture, its indices, scales and interaction state

use crate::core::buckets::TimeBucketMap;
use crate::core::constants::{DETAIL_FIELDS, UNDEFINED_LANE};
use crate::core::error::{DropletError, Result};
use crate::core::fields::{Chart, FieldKind, FieldSettings};
use crate::core::filter::{Filter, FilterState};
use crate::core::format::{format_offset, Record, ViewSettings};
use crate::core::gesture::{Gesture, GestureAction};
use crate::core::histogram::Histogram;
use crate::core::hosts::HostSummary;
use crate::core::reader::Dataset;
use crate::core::resolver::Resolver;
use crate::core::scale::{Scale, ScaleKind, ScaleRegistry};
use crate::core::selection::{Classification, LockOutcome, Selection, SelectionState};
use crate::core::streams::{StreamIndex, StreamInfo, StreamKey};
use crate::core::time_index::slice_domain;
use crate::core::viewport::{full_domain, Domain, Viewport};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Receiver of chart data whenever the visible domain changes.
pub trait ChartSink {
    fn rebind(&mut self, chart: &Chart, visible: &[usize], time: &Scale, transition: Option<Duration>);
}

/// Sink that only records how many points each chart received.
#[derive(Debug, Default, Serialize)]
pub struct RebindSummary {
    pub charts: Vec<(String, usize)>,
    pub transition_ms: Option<u64>,
}

impl ChartSink for RebindSummary {
    fn rebind(&mut self, chart: &Chart, visible: &[usize], _time: &Scale, transition: Option<Duration>) {
        self.charts.push((chart.field.clone(), visible.len()));
        self.transition_ms = transition.map(|d| d.as_millis() as u64);
    }
}

/// Result of feeding a pointer event through the view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Interaction {
    Nothing,
    Hover { record: Option<usize> },
    DragPreview { from: f64, to: f64 },
    Zoomed { domain: Domain },
    ClickPending { token: u64, deadline_ms: u64 },
    Selected { record: Option<usize>, outcome: Option<LockOutcome> },
}

/// Position of a record on one chart, for drawing synchronized crosshairs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Crosshair {
    pub field: String,
    pub x: f64,
    pub y: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ViewSummary<'a> {
    pub filename: &'a str,
    pub records: usize,
    pub streams: usize,
    pub domain: Domain,
    pub full_domain: Domain,
    pub zoom_depth: usize,
    pub visible: usize,
    pub selection: Option<&'a Selection>,
    pub filter: Option<&'a Filter>,
    pub charts: &'a [Chart],
}

pub struct ViewContext {
    settings: ViewSettings,
    dataset: Dataset,
    all: Vec<usize>,
    buckets: TimeBucketMap,
    streams: StreamIndex,
    scales: ScaleRegistry,
    charts: Vec<Chart>,
    histogram: Histogram,
    viewport: Viewport,
    selection: SelectionState,
    filter: FilterState,
    gesture: Gesture,
    pending_field: Option<String>,
    resolver: Resolver,
}

impl ViewContext {
    /// Builds every index and scale for `dataset` and lays out one chart per
    /// field in `to_plot`.
    pub fn new(dataset: Dataset, to_plot: &[String], settings: ViewSettings) -> Result<Self> {
        let records = &dataset.records;
        let all: Vec<usize> = (0..records.len()).collect();
        let full = full_domain(records);
        let buckets = TimeBucketMap::build(records, settings.bucket_resolution);
        let streams = StreamIndex::build(records, &dataset.addresses);
        let mut scales = ScaleRegistry::new(Scale::linear(full, (0.0, settings.chart_width)));
        let histogram = Histogram::build(
            records,
            full,
            settings.histogram_bins,
            settings.overview_height,
        );

        let mut charts = Vec::with_capacity(to_plot.len());
        for field in to_plot {
            let chart = build_chart(field, &dataset, &streams, &mut scales)?;
            debug!("chart {} height {}", field, chart.chart_height);
            charts.push(chart);
        }

        info!(
            "view over {}: {} records, {} streams, {} buckets, {} charts",
            dataset.filename,
            records.len(),
            streams.len(),
            buckets.len(),
            charts.len()
        );

        Ok(Self {
            all,
            resolver: Resolver::new(&settings),
            gesture: Gesture::new(Duration::from_millis(settings.click_timeout_ms)),
            viewport: Viewport::new(full),
            selection: SelectionState::default(),
            filter: FilterState::default(),
            pending_field: None,
            settings,
            dataset,
            buckets,
            streams,
            scales,
            charts,
            histogram,
        })
    }

    pub fn settings(&self) -> &ViewSettings {
        &self.settings
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn record(&self, index: usize) -> Option<&Record> {
        self.dataset.records.get(index)
    }

    pub fn charts(&self) -> &[Chart] {
        &self.charts
    }

    pub fn chart(&self, field: &str) -> Result<&Chart> {
        self.charts
            .iter()
            .find(|c| c.field == field)
            .ok_or_else(|| DropletError::UnknownField(field.to_string()))
    }

    pub fn scales(&self) -> &ScaleRegistry {
        &self.scales
    }

    pub fn streams(&self) -> &StreamIndex {
        &self.streams
    }

    /// Endpoints busy enough to list, with display names applied.
    pub fn hosts(&self) -> HostSummary {
        self.dataset.hosts.summary(&self.dataset.addresses)
    }

    pub fn histogram(&self) -> &Histogram {
        &self.histogram
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.current()
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.filter.active()
    }

    pub fn summary(&self) -> ViewSummary<'_> {
        ViewSummary {
            filename: &self.dataset.filename,
            records: self.dataset.records.len(),
            streams: self.streams.len(),
            domain: self.viewport.domain(),
            full_domain: self.viewport.full_domain(),
            zoom_depth: self.viewport.depth(),
            visible: self.visible().len(),
            selection: self.selection.current(),
            filter: self.filter.active(),
            charts: &self.charts,
        }
    }

    /// Records in the current domain, honouring the global filter.
    pub fn visible(&self) -> &[usize] {
        let base = self.filter.subset().unwrap_or(&self.all);
        let (t0, t1) = self.viewport.domain();
        slice_domain(&self.dataset.records, base, t0, t1)
    }

    /// Visible records that have a placement on the given chart.
    pub fn visible_for(&self, field: &str) -> Result<Vec<usize>> {
        let placement = self.chart(field)?.placement(&self.scales)?;
        Ok(self
            .visible()
            .iter()
            .copied()
            .filter(|&i| placement.y(&self.dataset.records[i]).is_some())
            .collect())
    }

    pub fn rebind_all(&self, sink: &mut dyn ChartSink, transition: Option<Duration>) -> Result<()> {
        for chart in &self.charts {
            let visible = self.visible_for(&chart.field)?;
            sink.rebind(chart, &visible, self.scales.time(), transition);
        }
        Ok(())
    }

    fn transition(&self) -> Option<Duration> {
        Some(Duration::from_millis(self.settings.zoom_duration_ms))
    }

    fn show_domain(
        &mut self,
        domain: Domain,
        sink: &mut dyn ChartSink,
        transition: Option<Duration>,
    ) -> Result<Domain> {
        self.scales.rescale_time(domain);
        self.rebind_all(sink, transition)?;
        Ok(domain)
    }

    /// Zooms to a time domain; every zoom gesture ends up here.
    pub fn zoom_in(
        &mut self,
        target: Domain,
        sink: &mut dyn ChartSink,
        transition: Option<Duration>,
    ) -> Result<Domain> {
        let domain = self.viewport.zoom_in(target)?;
        self.show_domain(domain, sink, transition)
    }

    /// Zooms to the span between two chart pixels of a drag.
    pub fn zoom_drag(&mut self, start_x: f64, end_x: f64, sink: &mut dyn ChartSink) -> Result<Domain> {
        let time = self.scales.time();
        let target = (time.invert(start_x), time.invert(end_x));
        let transition = self.transition();
        self.zoom_in(target, sink, transition)
    }

    /// Applies a brush on the overview histogram, given in overview pixels.
    /// An empty brush goes back to the full domain.
    pub fn brush(&mut self, extent: Option<(f64, f64)>, sink: &mut dyn ChartSink) -> Result<Domain> {
        match extent {
            Some((a, b)) if a != b => {
                let fixed = self.scales.time_fixed();
                let target = (fixed.invert(a), fixed.invert(b));
                self.zoom_in(target, sink, None)
            }
            _ => {
                let domain = self.viewport.reset();
                self.show_domain(domain, sink, None)
            }
        }
    }

    pub fn zoom_out(&mut self, sink: &mut dyn ChartSink) -> Result<Domain> {
        let domain = self.viewport.zoom_out();
        let transition = self.transition();
        self.show_domain(domain, sink, transition)
    }

    /// Candidate records for a pointer at time `t`.
    fn search_set(&self, t: f64, restrict_to_selection: bool) -> Cow<'_, [usize]> {
        let records = &self.dataset.records;
        match self.selection.locked_stream() {
            Some(stream) if restrict_to_selection => {
                self.filter.restrict(self.streams.records_of(stream), records)
            }
            _ => match self.filter.subset() {
                Some(subset) => Cow::Borrowed(subset),
                None => Cow::Borrowed(self.buckets.lookup(t)),
            },
        }
    }

    /// Nearest record to a pointer position on the chart for `field`.
    pub fn resolve(&self, x: f64, y: f64, field: &str, restrict_to_selection: bool) -> Result<Option<usize>> {
        let placement = self.chart(field)?.placement(&self.scales)?;
        let time = self.scales.time();
        let search_set = self.search_set(time.invert(x), restrict_to_selection);
        Ok(self.resolver.resolve(
            x,
            y,
            &self.dataset.records,
            &search_set,
            time,
            &placement,
        ))
    }

    /// Hover: nearest record, restricted to the locked stream when there is one.
    pub fn hover(&self, x: f64, y: f64, field: &str) -> Result<Interaction> {
        Ok(Interaction::Hover {
            record: self.resolve(x, y, field, true)?,
        })
    }

    /// Crosshair position of a record on every chart.
    pub fn crosshairs(&self, index: usize) -> Result<Vec<Crosshair>> {
        let record = self
            .record(index)
            .ok_or(DropletError::UnknownRecord(index))?;
        let x = self.scales.time().apply(record.pcap_secs);
        self.charts
            .iter()
            .map(|chart| {
                Ok(Crosshair {
                    field: chart.field.clone(),
                    x,
                    y: chart.y(record, &self.scales)?,
                })
            })
            .collect()
    }

    /// Label/value pairs describing a record, with endpoint aliases applied.
    pub fn detail(&self, index: usize) -> Option<Vec<(String, String)>> {
        let record = self.record(index)?;
        let book = &self.dataset.addresses;
        let lines = DETAIL_FIELDS
            .iter()
            .map(|&field| {
                let value = match field {
                    "ta" => book.name(&record.ta).to_string(),
                    "ra" => book.name(&record.ra).to_string(),
                    "streamId" => book.display_stream(&record.stream),
                    "pcap_secs" => format!("{} ({})", record.pcap_secs, format_offset(record.pcap_secs)),
                    _ => record.value(field).map(|v| v.to_string()).unwrap_or_default(),
                };
                (field.to_string(), value)
            })
            .collect();
        Some(lines)
    }

    pub fn stream_info(&self, key: &StreamKey) -> Result<&StreamInfo> {
        self.streams
            .get(key)
            .ok_or_else(|| DropletError::UnknownStream(key.to_string()))
    }

    pub fn lock_stream(&mut self, key: &StreamKey) -> Result<LockOutcome> {
        let info = self
            .streams
            .get(key)
            .ok_or_else(|| DropletError::UnknownStream(key.to_string()))?;
        Ok(self.selection.lock(info))
    }

    pub fn lock_record(&mut self, index: usize) -> Result<LockOutcome> {
        let key = self
            .record(index)
            .map(|r| r.stream.clone())
            .ok_or(DropletError::UnknownRecord(index))?;
        self.lock_stream(&key)
    }

    pub fn unlock(&mut self) {
        self.selection.unlock();
    }

    pub fn classify(&self, index: usize) -> Classification {
        self.record(index)
            .map(|r| self.selection.classify(r))
            .unwrap_or(Classification::None)
    }

    /// Toggles a global filter and redraws the current domain in place.
    pub fn apply_filter(&mut self, filter: Filter, sink: &mut dyn ChartSink) -> Result<bool> {
        let active = self.filter.toggle(filter, &self.dataset.records);
        self.rebind_all(sink, None)?;
        Ok(active)
    }

    /// Single click: pick the nearest record anywhere and toggle its stream.
    pub fn click(&mut self, x: f64, y: f64, field: &str) -> Result<Interaction> {
        let record = self.resolve(x, y, field, false)?;
        let outcome = match record {
            Some(i) => Some(self.lock_record(i)?),
            None => None,
        };
        Ok(Interaction::Selected { record, outcome })
    }

    pub fn pointer_down(&mut self, x: f64, at: Duration, sink: &mut dyn ChartSink) -> Result<Interaction> {
        let action = self.gesture.pointer_down(x, at);
        self.dispatch(action, sink)
    }

    pub fn pointer_move(&mut self, x: f64, y: f64, field: &str, sink: &mut dyn ChartSink) -> Result<Interaction> {
        match self.gesture.pointer_move(x, y) {
            Some(GestureAction::Hover { x, y }) => self.hover(x, y, field),
            action => self.dispatch(action, sink),
        }
    }

    pub fn pointer_up(
        &mut self,
        x: f64,
        y: f64,
        field: &str,
        at: Duration,
        sink: &mut dyn ChartSink,
    ) -> Result<Interaction> {
        let action = self.gesture.pointer_up(x, y, at);
        if matches!(action, Some(GestureAction::ClickPending { .. })) {
            self.pending_field = Some(field.to_string());
        }
        self.dispatch(action, sink)
    }

    pub fn tick(&mut self, at: Duration, sink: &mut dyn ChartSink) -> Result<Interaction> {
        let action = self.gesture.tick(at);
        self.dispatch(action, sink)
    }

    /// Fires the pending click scheduled under `token` if nothing cancelled it.
    pub fn fire_click(&mut self, token: u64, sink: &mut dyn ChartSink) -> Result<Interaction> {
        let action = self.gesture.fire(token);
        self.dispatch(action, sink)
    }

    pub fn pointer_leave(&mut self) {
        self.gesture.leave();
    }

    fn dispatch(&mut self, action: Option<GestureAction>, sink: &mut dyn ChartSink) -> Result<Interaction> {
        let Some(action) = action else {
            return Ok(Interaction::Nothing);
        };
        match action {
            GestureAction::Hover { .. } => Ok(Interaction::Nothing),
            GestureAction::DragStarted { start_x } => Ok(Interaction::DragPreview {
                from: start_x,
                to: start_x,
            }),
            GestureAction::DragUpdate { from, to } => Ok(Interaction::DragPreview { from, to }),
            GestureAction::DragZoom { start_x, end_x } => match self.zoom_drag(start_x, end_x, sink) {
                Ok(domain) => Ok(Interaction::Zoomed { domain }),
                Err(DropletError::EmptyDomain(..)) => Ok(Interaction::Nothing),
                Err(e) => Err(e),
            },
            GestureAction::ClickPending { deadline_ms, token } => {
                Ok(Interaction::ClickPending { token, deadline_ms })
            }
            GestureAction::Click { x, y } => match self.pending_field.take() {
                Some(field) => self.click(x, y, &field),
                None => {
                    warn!("click without a chart");
                    Ok(Interaction::Nothing)
                }
            },
            GestureAction::DoubleClick => {
                self.pending_field = None;
                Ok(Interaction::Zoomed {
                    domain: self.zoom_out(sink)?,
                })
            }
        }
    }
}

fn build_chart(
    field: &str,
    dataset: &Dataset,
    streams: &StreamIndex,
    scales: &mut ScaleRegistry,
) -> Result<Chart> {
    let settings = FieldSettings::lookup(field);
    let chart = match settings.kind {
        FieldKind::Numeric => {
            let (min, max) = dataset
                .records
                .iter()
                .filter_map(|r| r.number(field))
                .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                    None => Some((v, v)),
                    Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                })
                .unwrap_or_else(|| {
                    warn!("{} is missing from every record", field);
                    (0.0, 1.0)
                });
            scales.create_scale(field, min, max, (settings.chart_height, 0.0), ScaleKind::Linear)?;
            Chart::numeric(field, settings.chart_height)
        }
        FieldKind::Boolean => Chart::boolean(field, settings),
        FieldKind::Categorical => {
            let order = match field {
                "retry_bad" => vec!["bad".to_string(), "retry".to_string(), "good".to_string()],
                "streamId" => streams.lane_order().iter().map(|k| k.to_string()).collect(),
                "typestr" => with_undefined(dataset.type_strings.clone()),
                _ => {
                    let seen: BTreeSet<String> = dataset
                        .records
                        .iter()
                        .filter_map(|r| r.value(field).map(|v| v.lane_key()))
                        .collect();
                    with_undefined(seen.into_iter().collect())
                }
            };
            Chart::categorical(field, order, settings)
        }
    };
    Ok(chart)
}

fn with_undefined(mut order: Vec<String>) -> Vec<String> {
    order.push(UNDEFINED_LANE.to_string());
    order
}
