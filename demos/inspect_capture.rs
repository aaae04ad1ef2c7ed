// Opens a capture, builds a view and walks through a few interactions

use droplet::core::format::format_offset;
use droplet::{CaptureReader, IngestOptions, RebindSummary, Result, ViewContext, ViewSettings};
use tracing::{info, Level};

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::DEBUG).init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "data/capture.json.gz".to_string());
    let to_plot: Vec<String> = ["seq", "rate", "retry", "typestr", "streamId"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let reader = CaptureReader::open(&path)?;
    info!("{}: {} packets", reader.filename(), reader.packet_count());

    let dataset = reader.ingest(&IngestOptions {
        show_ack: false,
        to_plot: to_plot.clone(),
    });
    for (field, missing) in &dataset.missing {
        info!("  {} missing from {} records", field, missing);
    }

    let mut view = ViewContext::new(dataset, &to_plot, ViewSettings::default())?;

    let hosts = view.hosts();
    info!("Hosts above {:.1} packets ({} packets elsewhere):", hosts.cutoff, hosts.other);
    for host in &hosts.hosts {
        info!("  {} [{}]: {}", host.name, if host.shown { "x" } else { " " }, host.packets);
    }

    info!("Streams by packet count:");
    for stream in view.streams().legend_order().iter().take(10) {
        info!(
            "  {} ({:?}): {} packets",
            view.dataset().addresses.display_stream(&stream.key),
            stream.direction,
            stream.packets
        );
    }

    // Zoom into the middle third of the chart
    let width = view.settings().chart_width;
    let mut rebind = RebindSummary::default();
    let domain = view.zoom_drag(width / 3.0, 2.0 * width / 3.0, &mut rebind)?;
    info!(
        "Zoomed to {} .. {}: {} visible",
        format_offset(domain.0),
        format_offset(domain.1),
        view.visible().len()
    );

    // Hover the centre of the seq chart and lock whatever is there
    let height = view.chart("seq")?.chart_height;
    if let Some(index) = view.resolve(width / 2.0, height / 2.0, "seq", false)? {
        for (label, value) in view.detail(index).unwrap_or_default() {
            info!("  {}: {}", label, value);
        }
        let outcome = view.lock_record(index)?;
        info!("{:?} {:?}", outcome, view.selection());
    } else {
        info!("Nothing under the pointer");
    }

    let domain = view.zoom_out(&mut RebindSummary::default())?;
    info!("Back to {:?}", domain);

    Ok(())
}
