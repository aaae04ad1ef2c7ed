use anyhow::Context;
use droplet::core::compression::{decompress, CompressionType};
use droplet::CaptureReader;
use reqwest::Client;
use std::path::Path;
use tracing::info;

pub fn is_remote(key: &str) -> bool {
    key.starts_with("http://") || key.starts_with("https://")
}

/// Downloads a capture document or pcap capture, decompressing by the URL's
/// extension.
pub async fn fetch_capture(url: &str) -> anyhow::Result<CaptureReader> {
    info!("Fetching capture: {}", url);

    let body = Client::new()
        .get(url)
        .send()
        .await
        .with_context(|| format!("requesting {}", url))?
        .error_for_status()
        .with_context(|| format!("server refused {}", url))?
        .bytes()
        .await
        .context("reading response body")?;

    let path_part = url.split(['?', '#']).next().unwrap_or(url);
    let data = decompress(&body, CompressionType::from_path(Path::new(path_part)))?;
    let filename = path_part.rsplit('/').next().unwrap_or(path_part);
    let reader = CaptureReader::from_bytes(&data, filename)?;

    info!("Fetched {} ({} packets)", reader.filename(), reader.packet_count());
    Ok(reader)
}
