use droplet::core::histogram::Bin;
use droplet::core::selection::{Classification, LockOutcome, Selection};
use droplet::core::streams::StreamInfo;
use droplet::core::view::{Crosshair, ViewSummary};
use droplet::core::viewport::Domain;
use droplet::{Interaction, RebindSummary};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug)]
pub struct CreateViewRequest {
    /// `key=..&to_plot=..&ack=..`, with or without the leading `#`.
    pub fragment: String,
}

#[derive(Serialize)]
pub struct ViewResponse<'a> {
    pub id: &'a str,
    pub source: &'a str,
    #[serde(flatten)]
    pub summary: ViewSummary<'a>,
}

#[derive(Serialize)]
pub struct ViewListing {
    pub id: String,
    pub source: String,
}

#[derive(Serialize)]
pub struct StreamRow<'a> {
    pub display: String,
    #[serde(flatten)]
    pub info: &'a StreamInfo,
}

#[derive(Serialize)]
pub struct HistogramResponse<'a> {
    pub bins: &'a [Bin],
    pub max_count: usize,
    pub full_domain: Domain,
    pub start_label: String,
    pub end_label: String,
}

#[derive(Deserialize, Debug)]
pub struct ResolveRequest {
    pub x: f64,
    pub y: f64,
    pub field: String,
    /// Restrict to the locked stream, as hovering does.
    #[serde(default = "default_true")]
    pub lock: bool,
}

#[derive(Serialize)]
pub struct ResolveResponse {
    pub record: Option<usize>,
    pub classification: Option<Classification>,
    pub crosshairs: Vec<Crosshair>,
    pub detail: Option<Vec<(String, String)>>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PointerKind {
    Down,
    Move,
    Up,
    Leave,
}

#[derive(Deserialize, Debug)]
pub struct PointerRequest {
    pub kind: PointerKind,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub field: String,
}

#[derive(Serialize)]
pub struct InteractionResponse {
    pub interaction: Interaction,
    pub domain: Domain,
    pub rebind: RebindSummary,
}

#[derive(Deserialize, Debug)]
pub struct ZoomRequest {
    pub start_x: f64,
    pub end_x: f64,
}

#[derive(Deserialize, Debug)]
pub struct BrushRequest {
    /// Overview pixels; absent or zero width clears the brush.
    #[serde(default)]
    pub extent: Option<(f64, f64)>,
}

#[derive(Serialize)]
pub struct DomainResponse {
    pub domain: Domain,
    pub zoom_depth: usize,
    pub rebind: RebindSummary,
}

#[derive(Deserialize, Debug)]
pub struct SelectRequest {
    #[serde(default)]
    pub stream: Option<String>,
    #[serde(default)]
    pub record: Option<usize>,
}

#[derive(Serialize)]
pub struct SelectResponse<'a> {
    pub outcome: Option<LockOutcome>,
    pub selection: Option<&'a Selection>,
}

#[derive(Serialize)]
pub struct FilterResponse {
    pub active: bool,
    pub visible: usize,
    pub rebind: RebindSummary,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_request_defaults() {
        let req: PointerRequest = serde_json::from_str(r#"{"kind": "leave"}"#).unwrap();
        assert_eq!(req.kind, PointerKind::Leave);
        assert!(req.field.is_empty());

        let req: ResolveRequest = serde_json::from_str(r#"{"x": 1, "y": 2, "field": "seq"}"#).unwrap();
        assert!(req.lock);
    }

    #[test]
    fn test_brush_request_empty() {
        let req: BrushRequest = serde_json::from_str("{}").unwrap();
        assert!(req.extent.is_none());
        let req: BrushRequest = serde_json::from_str(r#"{"extent": [10, 40]}"#).unwrap();
        assert_eq!(req.extent, Some((10.0, 40.0)));
    }
}
