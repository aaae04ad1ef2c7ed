use axum::{
    extract::{ws::WebSocketUpgrade, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use serde_json::json;
use std::path::{Component, Path as FsPath, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use droplet::core::format::format_clock;
use droplet::core::selection::LockOutcome;
use droplet::{
    handle_ws_fetch, CaptureReader, DropletError, Filter, IngestOptions, Interaction, RebindSummary,
    StreamKey, ViewContext, ViewQuery,
};

use crate::client::fetch;
use crate::models::view_model::*;
use crate::state::app_state::{AppState, ViewEntry};
use crate::utils::conf_helper::get_cached_config;

/// Error body returned by every view endpoint.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<DropletError> for ApiError {
    fn from(e: DropletError) -> Self {
        let status = match &e {
            DropletError::UnknownField(_)
            | DropletError::UnknownStream(_)
            | DropletError::UnknownRecord(_) => StatusCode::NOT_FOUND,
            DropletError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
            DropletError::MalformedQuery(_)
            | DropletError::MalformedStreamKey(_)
            | DropletError::EmptyDomain(..)
            | DropletError::InvalidLogDomain { .. }
            | DropletError::Json(_)
            | DropletError::InvalidMagic { .. }
            | DropletError::UnsupportedCapture(_)
            | DropletError::CorruptedData(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("{}: {}", self.status, self.message);
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type ApiResult = Result<Response, ApiError>;

/// =======================
/// ROUTER
/// =======================

pub fn data_routes(state: AppState) -> Router {
    Router::new()
        .route("/views", get(list_views).post(create_view))
        .route("/views/{id}", get(get_view).delete(close_view))
        .route("/views/{id}/streams", get(list_streams))
        .route("/views/{id}/hosts", get(list_hosts))
        .route("/views/{id}/histogram", get(histogram))
        .route("/views/{id}/resolve", post(resolve))
        .route("/views/{id}/pointer", post(pointer))
        .route("/views/{id}/zoom", post(zoom))
        .route("/views/{id}/brush", post(brush))
        .route("/views/{id}/zoom-out", post(zoom_out))
        .route("/views/{id}/select", post(select).delete(unselect))
        .route("/views/{id}/filter", post(filter))
        .route("/views/{id}/fetch/{field}", get(ws_fetch))
        .with_state(state)
}

async fn entry(state: &AppState, id: &str) -> Result<ViewEntry, ApiError> {
    state
        .get(id)
        .await
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("view not found: {}", id)))
}

/// Capture keys are relative paths under the data directory.
fn local_path(data_dir: &FsPath, key: &str) -> Result<PathBuf, ApiError> {
    let relative = FsPath::new(key);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes || key.is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("capture key outside data dir: {}", key),
        ));
    }
    Ok(data_dir.join(relative))
}

/// =======================
/// HANDLERS
/// =======================

async fn create_view(State(state): State<AppState>, Json(request): Json<CreateViewRequest>) -> ApiResult {
    let query = ViewQuery::from_fragment(&request.fragment)?;
    let config = get_cached_config();
    debug!("Creating view: key={}, fields={:?}, ack={}", query.key, query.to_plot, query.show_ack);

    let reader = if fetch::is_remote(&query.key) {
        fetch::fetch_capture(&query.key)
            .await
            .map_err(|e| ApiError::new(StatusCode::BAD_GATEWAY, format!("{:#}", e)))?
    } else {
        CaptureReader::open(local_path(&config.data_dir, &query.key)?)?
    };

    let dataset = reader.ingest(&IngestOptions::from(&query));
    let view = ViewContext::new(dataset, &query.to_plot, config.view.clone())?;

    let id = Uuid::new_v4().to_string();
    let entry = ViewEntry::new(view, query.key.clone());
    state.views.write().await.insert(id.clone(), entry.clone());
    info!("View {} created from {}", id, query.key);

    let view = entry.view.lock().await;
    Ok(Json(ViewResponse {
        id: &id,
        source: &entry.source,
        summary: view.summary(),
    })
    .into_response())
}

async fn list_views(State(state): State<AppState>) -> impl IntoResponse {
    let views = state.views.read().await;
    let mut out: Vec<ViewListing> = views
        .iter()
        .map(|(id, entry)| ViewListing {
            id: id.clone(),
            source: entry.source.clone(),
        })
        .collect();
    out.sort_by(|a, b| a.id.cmp(&b.id));
    Json(out)
}

async fn get_view(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let entry = entry(&state, &id).await?;
    let view = entry.view.lock().await;
    Ok(Json(ViewResponse {
        id: &id,
        source: &entry.source,
        summary: view.summary(),
    })
    .into_response())
}

async fn close_view(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    match state.views.write().await.remove(&id) {
        Some(_) => {
            info!("View {} closed", id);
            Ok(StatusCode::NO_CONTENT.into_response())
        }
        None => Err(ApiError::new(StatusCode::NOT_FOUND, format!("view not found: {}", id))),
    }
}

async fn list_streams(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let entry = entry(&state, &id).await?;
    let view = entry.view.lock().await;
    let book = &view.dataset().addresses;
    let rows: Vec<StreamRow> = view
        .streams()
        .legend_order()
        .into_iter()
        .map(|info| StreamRow {
            display: book.display_stream(&info.key),
            info,
        })
        .collect();
    Ok(Json(rows).into_response())
}

async fn list_hosts(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let entry = entry(&state, &id).await?;
    let view = entry.view.lock().await;
    Ok(Json(view.hosts()).into_response())
}

async fn histogram(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let entry = entry(&state, &id).await?;
    let view = entry.view.lock().await;
    let histogram = view.histogram();
    let full = view.viewport().full_domain();
    Ok(Json(HistogramResponse {
        bins: histogram.bins(),
        max_count: histogram.max_count(),
        full_domain: full,
        start_label: format_clock(full.0),
        end_label: format_clock(full.1),
    })
    .into_response())
}

async fn resolve(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ResolveRequest>,
) -> ApiResult {
    let entry = entry(&state, &id).await?;
    let view = entry.view.lock().await;

    let record = view.resolve(request.x, request.y, &request.field, request.lock)?;
    let crosshairs = match record {
        Some(i) => view.crosshairs(i)?,
        None => {
            debug!("no record near ({}, {}) on {}", request.x, request.y, request.field);
            Vec::new()
        }
    };

    Ok(Json(ResolveResponse {
        record,
        classification: record.map(|i| view.classify(i)),
        crosshairs,
        detail: record.and_then(|i| view.detail(i)),
    })
    .into_response())
}

async fn pointer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<PointerRequest>,
) -> ApiResult {
    let entry = entry(&state, &id).await?;
    let at = entry.now();
    let mut rebind = RebindSummary::default();
    let mut view = entry.view.lock().await;

    let interaction = match request.kind {
        PointerKind::Down => view.pointer_down(request.x, at, &mut rebind)?,
        PointerKind::Move => view.pointer_move(request.x, request.y, &request.field, &mut rebind)?,
        PointerKind::Up => view.pointer_up(request.x, request.y, &request.field, at, &mut rebind)?,
        PointerKind::Leave => {
            view.pointer_leave();
            Interaction::Nothing
        }
    };

    if let Interaction::ClickPending { token, .. } = interaction {
        let delay = Duration::from_millis(view.settings().click_timeout_ms);
        schedule_click(entry.clone(), token, delay);
    }

    Ok(Json(InteractionResponse {
        interaction,
        domain: view.viewport().domain(),
        rebind,
    })
    .into_response())
}

/// Fires a single click once the double-click window has passed. A later
/// press or click replaces the pending token, which turns this into a no-op.
fn schedule_click(entry: ViewEntry, token: u64, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let mut rebind = RebindSummary::default();
        let mut view = entry.view.lock().await;
        match view.fire_click(token, &mut rebind) {
            Ok(Interaction::Nothing) => debug!("click {} superseded", token),
            Ok(interaction) => info!("click {} fired: {:?}", token, interaction),
            Err(e) => warn!("click {} failed: {}", token, e),
        }
    });
}

async fn zoom(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ZoomRequest>,
) -> ApiResult {
    let entry = entry(&state, &id).await?;
    let mut rebind = RebindSummary::default();
    let mut view = entry.view.lock().await;
    let domain = view.zoom_drag(request.start_x, request.end_x, &mut rebind)?;
    debug!("view {} zoomed to {:?}", id, domain);
    Ok(Json(DomainResponse {
        domain,
        zoom_depth: view.viewport().depth(),
        rebind,
    })
    .into_response())
}

async fn brush(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<BrushRequest>,
) -> ApiResult {
    let entry = entry(&state, &id).await?;
    let mut rebind = RebindSummary::default();
    let mut view = entry.view.lock().await;
    let domain = view.brush(request.extent, &mut rebind)?;
    Ok(Json(DomainResponse {
        domain,
        zoom_depth: view.viewport().depth(),
        rebind,
    })
    .into_response())
}

async fn zoom_out(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let entry = entry(&state, &id).await?;
    let mut rebind = RebindSummary::default();
    let mut view = entry.view.lock().await;
    let domain = view.zoom_out(&mut rebind)?;
    Ok(Json(DomainResponse {
        domain,
        zoom_depth: view.viewport().depth(),
        rebind,
    })
    .into_response())
}

async fn select(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SelectRequest>,
) -> ApiResult {
    let entry = entry(&state, &id).await?;
    let mut view = entry.view.lock().await;

    let outcome = match (request.stream, request.record) {
        (Some(key), _) => view.lock_stream(&key.parse::<StreamKey>()?)?,
        (None, Some(index)) => view.lock_record(index)?,
        (None, None) => {
            return Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                "select needs a stream or a record",
            ))
        }
    };

    Ok(Json(SelectResponse {
        outcome: Some(outcome),
        selection: view.selection(),
    })
    .into_response())
}

async fn unselect(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let entry = entry(&state, &id).await?;
    let mut view = entry.view.lock().await;
    let outcome = view.selection().map(|_| LockOutcome::Unlocked);
    view.unlock();
    Ok(Json(SelectResponse {
        outcome,
        selection: None,
    })
    .into_response())
}

async fn filter(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(filter): Json<Filter>,
) -> ApiResult {
    let entry = entry(&state, &id).await?;
    let mut rebind = RebindSummary::default();
    let mut view = entry.view.lock().await;
    let active = view.apply_filter(filter, &mut rebind)?;
    Ok(Json(FilterResponse {
        active,
        visible: view.visible().len(),
        rebind,
    })
    .into_response())
}

async fn ws_fetch(
    State(state): State<AppState>,
    Path((id, field)): Path<(String, String)>,
    ws: WebSocketUpgrade,
) -> ApiResult {
    let entry = entry(&state, &id).await?;
    entry.view.lock().await.chart(&field)?;

    // the view is locked again inside the websocket handler
    Ok(ws.on_upgrade(move |socket| handle_ws_fetch(socket, entry.view, field)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_path_stays_in_data_dir() {
        let dir = FsPath::new("data");
        assert_eq!(
            local_path(dir, "office/a.json.gz").unwrap(),
            PathBuf::from("data/office/a.json.gz")
        );
        assert!(local_path(dir, "../secret.json").is_err());
        assert!(local_path(dir, "/etc/passwd").is_err());
        assert!(local_path(dir, "").is_err());
    }

    #[test]
    fn test_error_status_mapping() {
        let status = |e: DropletError| ApiError::from(e).status;
        assert_eq!(status(DropletError::UnknownField("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(DropletError::MalformedQuery("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(DropletError::EmptyDomain(1.0, 1.0)), StatusCode::BAD_REQUEST);
        assert_eq!(status(DropletError::CorruptedData("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(DropletError::DecompressionFailed("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
