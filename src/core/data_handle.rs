use axum::extract::ws::{Message, WebSocket};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::core::selection::Classification;
use crate::core::view::ViewContext;

#[derive(Serialize)]
struct PointPayload {
    index: usize,
    timestamp: f64,
    x: f64,
    y: f64,
    stream: String,
    classification: Classification,
    seq: u64,
    end_flag: bool,
}

/// Streams every visible point of one chart, in time order, followed by an
/// end marker.
pub async fn handle_ws_fetch(
    mut socket: WebSocket,
    view: Arc<tokio::sync::Mutex<ViewContext>>,
    field: String,
) {
    info!("ws_fetch streaming started: {}", field);

    // Snapshot under the lock so pointer traffic is not held up by the socket
    let points = {
        let view = view.lock().await;
        let chart = match view.chart(&field) {
            Ok(chart) => chart,
            Err(e) => {
                error!("ws_fetch: {}", e);
                return;
            }
        };
        let placement = match chart.placement(view.scales()) {
            Ok(p) => p,
            Err(e) => {
                error!("ws_fetch: {}", e);
                return;
            }
        };
        let time = view.scales().time();
        let records = &view.dataset().records;

        let points: Vec<PointPayload> = view
            .visible()
            .iter()
            .filter_map(|&i| {
                let record = &records[i];
                placement.y(record).map(|y| PointPayload {
                    index: i,
                    timestamp: record.pcap_secs,
                    x: time.apply(record.pcap_secs),
                    y,
                    stream: record.stream.to_string(),
                    classification: view.classify(i),
                    seq: 0,
                    end_flag: false,
                })
            })
            .collect();
        points
    };

    let mut seq: u64 = 0;
    for mut payload in points {
        payload.seq = seq;
        let json = match serde_json::to_string(&payload) {
            Ok(j) => j,
            Err(e) => {
                error!("json serialize error: {}", e);
                return;
            }
        };

        if let Err(e) = socket.send(Message::Text(json.into())).await {
            warn!("ws send failed: {}", e);
            return;
        }
        seq += 1;
    }

    let end_payload = PointPayload {
        index: 0,
        timestamp: 0.0,
        x: 0.0,
        y: 0.0,
        stream: String::new(),
        classification: Classification::None,
        seq,
        end_flag: true,
    };

    if let Ok(json) = serde_json::to_string(&end_payload) {
        let _ = socket.send(Message::Text(json.into())).await;
    }

    info!("ws_fetch finished: {} ({} points)", field, seq);
}
