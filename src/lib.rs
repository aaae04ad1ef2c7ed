// Wavedroplet view engine
// Nearest-sample lookup and synchronized crosshair/zoom over packet captures

pub mod core;

// Re-export main types
pub use crate::core::data_handle::handle_ws_fetch;
pub use crate::core::error::{DropletError, Result};
pub use crate::core::filter::Filter;
pub use crate::core::hosts::HostSummary;
pub use crate::core::format::{Record, ViewQuery, ViewSettings};
pub use crate::core::reader::{CaptureReader, Dataset, IngestOptions};
pub use crate::core::streams::StreamKey;
pub use crate::core::view::{ChartSink, Interaction, RebindSummary, ViewContext};

#[cfg(test)]
mod tests {
    #[test]
    fn test_constants() {
        use crate::core::constants::*;
        assert_eq!(STREAM_SEPARATOR, "---");
        assert_eq!(BUCKET_RESOLUTION, 0.1);
        assert!(X_RANGE > 0.0);
    }
}
