// Tuning constants for the droplet view core

/// Field holding the capture timestamp, in seconds.
pub const TIME_FIELD: &str = "pcap_secs";

/// Width of a time bucket used for unlocked pointer lookups (100ms).
pub const BUCKET_RESOLUTION: f64 = 0.1;

/// Half-width of the index window scanned around the bisection seed.
pub const SEARCH_WINDOW: usize = 50;

/// Horizontal pixel cutoff beyond which a sample is never picked.
pub const X_RANGE: f64 = 30.0;

pub const CLICK_TIMEOUT_MS: u64 = 200;
pub const ZOOM_DURATION_MS: u64 = 750;

pub const HISTOGRAM_BINS: usize = 1000;

// Layout defaults (pixels)
pub const CHART_WIDTH: f64 = 1000.0;
pub const TOTAL_HEIGHT: f64 = 1200.0;
pub const OVERVIEW_HEIGHT: f64 = 80.0;
pub const BAR_HEIGHT_SELECTED: f64 = 14.0;

// Stream key parts
pub const STREAM_SEPARATOR: &str = "---";
pub const BAD_PACKET_ADDR: &str = "badpacket";
pub const NULL_ADDR: &str = "null";

pub const ACK_TYPESTR: &str = "1D ACK";

/// Lane used for categorical values missing from the ordering.
pub const UNDEFINED_LANE: &str = "undefined";

/// Fields described in the record detail tooltip, in display order.
pub const DETAIL_FIELDS: &[&str] = &[
    "ta",
    "ra",
    "typestr",
    "seq",
    "rate",
    "orig_len",
    "pcap_secs",
    "mac_usecs",
    "streamId",
    "antenna",
    "dbm_antnoise",
    "dbm_antsignal",
    "dsmode",
    "duration",
    "powerman",
    "retry",
    "mcs",
];

/// Broadcast endpoint, colons stripped; never listed as a host.
pub const BROADCAST_ADDR: &str = "ffffffffffff";

/// Hosts below this share of the busiest host's packet count are lumped together.
pub const HOST_CUTOFF_RATIO: f64 = 0.01;

// pcap capture layout
pub const GZIP_MAGIC: &[u8; 3] = b"\x1f\x8b\x08";
pub const PCAP_MAGIC: u32 = 0xa1b2_c3d4;
pub const PCAP_VERSION: (u16, u16) = (2, 4);
pub const LINKTYPE_IEEE802_11_RADIOTAP: u32 = 127;
// Global header: magic(4) major(u16) minor(u16) thiszone(i32) sigfigs(u32) snaplen(u32) network(u32)
pub const PCAP_HEADER_SIZE: usize = 24;
// Record header: ts_sec(u32) ts_usec(u32) incl_len(u32) orig_len(u32)
pub const PCAP_RECORD_SIZE: usize = 16;
// Radiotap header: version(u8) pad(u8) len(u16) present(u32), always little-endian
pub const RADIOTAP_HEADER_SIZE: usize = 8;

/// Radiotap `flags` bit set when the frame failed its checksum.
pub const RADIOTAP_BAD_FCS: u8 = 0x40;
