// Radiotap pcap decoding into packet documents

use crate::core::constants::*;
use crate::core::error::{DropletError, Result};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

pub type Packet = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    /// Byte order announced by a pcap global header, if `data` starts with one.
    pub fn detect(data: &[u8]) -> Option<Self> {
        let magic: [u8; 4] = data.get(..4)?.try_into().ok()?;
        if u32::from_le_bytes(magic) == PCAP_MAGIC {
            Some(ByteOrder::Little)
        } else if u32::from_be_bytes(magic) == PCAP_MAGIC {
            Some(ByteOrder::Big)
        } else {
            None
        }
    }

    fn u16(self, b: [u8; 2]) -> u16 {
        match self {
            ByteOrder::Little => u16::from_le_bytes(b),
            ByteOrder::Big => u16::from_be_bytes(b),
        }
    }

    fn u32(self, b: [u8; 4]) -> u32 {
        match self {
            ByteOrder::Little => u32::from_le_bytes(b),
            ByteOrder::Big => u32::from_be_bytes(b),
        }
    }
}

pub fn is_pcap(data: &[u8]) -> bool {
    ByteOrder::detect(data).is_some()
}

fn bytes<const N: usize>(data: &[u8], at: usize) -> Option<[u8; N]> {
    data.get(at..at.checked_add(N)?)?.try_into().ok()
}

fn le_u16(data: &[u8], at: usize) -> Option<u16> {
    bytes(data, at).map(u16::from_le_bytes)
}

fn corrupted(msg: impl Into<String>) -> DropletError {
    DropletError::CorruptedData(msg.into())
}

#[derive(Debug, Clone, Copy)]
enum Layout {
    U8,
    I8,
    U16,
    U64,
    /// freq(u16) channel_flags(u16)
    Channel,
    /// known(u8) flags(u8) mcs(u8)
    Ht,
    /// Multi-part fields that are stepped over.
    Skip { align: usize, size: usize },
}

impl Layout {
    fn align(self) -> usize {
        match self {
            Layout::U8 | Layout::I8 | Layout::Ht => 1,
            Layout::U16 | Layout::Channel => 2,
            Layout::U64 => 8,
            Layout::Skip { align, .. } => align,
        }
    }

    fn size(self) -> usize {
        match self {
            Layout::U8 | Layout::I8 => 1,
            Layout::U16 => 2,
            Layout::Ht => 3,
            Layout::Channel => 4,
            Layout::U64 => 8,
            Layout::Skip { size, .. } => size,
        }
    }
}

/// Radiotap fields in `present` bit order.
const RADIOTAP_FIELDS: [(&str, Layout); 22] = [
    ("mac_usecs", Layout::U64),
    ("flags", Layout::U8),
    ("rate", Layout::U8),
    ("channel", Layout::Channel),
    ("fhss", Layout::Skip { align: 1, size: 2 }),
    ("dbm_antsignal", Layout::I8),
    ("dbm_antnoise", Layout::I8),
    ("lock_quality", Layout::U16),
    ("tx_attenuation", Layout::U16),
    ("db_tx_attenuation", Layout::U8),
    ("dbm_tx_power", Layout::I8),
    ("antenna", Layout::U8),
    ("db_antsignal", Layout::U8),
    ("db_antnoise", Layout::U8),
    ("rx_flags", Layout::U16),
    ("tx_flags", Layout::U16),
    ("rts_retries", Layout::U8),
    ("data_retries", Layout::U8),
    ("channelplus", Layout::Skip { align: 4, size: 8 }),
    ("ht", Layout::Ht),
    ("ampdu_status", Layout::Skip { align: 4, size: 8 }),
    ("vht", Layout::Skip { align: 2, size: 12 }),
];

/// Spatial streams and rates in Mbps per MCS index, indexed by
/// 20MHz long GI, 20MHz short GI, 40MHz long GI, 40MHz short GI.
const MCS_TABLE: [(u8, [f64; 4]); 33] = [
    (1, [6.50, 7.20, 13.50, 15.00]),
    (1, [13.00, 14.40, 27.00, 30.00]),
    (1, [19.50, 21.70, 40.50, 45.00]),
    (1, [26.00, 28.90, 54.00, 60.00]),
    (1, [39.00, 43.30, 81.00, 90.00]),
    (1, [52.00, 57.80, 108.00, 120.00]),
    (1, [58.50, 65.00, 121.50, 135.00]),
    (1, [65.00, 72.20, 135.00, 150.00]),
    (2, [13.00, 14.40, 27.00, 30.00]),
    (2, [26.00, 28.90, 54.00, 60.00]),
    (2, [39.00, 43.30, 81.00, 90.00]),
    (2, [52.00, 57.80, 108.00, 120.00]),
    (2, [78.00, 86.70, 162.00, 180.00]),
    (2, [104.00, 115.60, 216.00, 240.00]),
    (2, [117.00, 130.00, 243.00, 270.00]),
    (2, [130.00, 144.40, 270.00, 300.00]),
    (3, [19.50, 21.70, 40.50, 45.00]),
    (3, [39.00, 43.30, 81.00, 90.00]),
    (3, [58.50, 65.00, 121.50, 135.00]),
    (3, [78.00, 86.70, 162.00, 180.00]),
    (3, [117.00, 130.00, 243.00, 270.00]),
    (3, [156.00, 173.30, 324.00, 360.00]),
    (3, [175.50, 195.00, 364.50, 405.00]),
    (3, [195.00, 216.70, 405.00, 450.00]),
    (4, [26.00, 28.80, 54.00, 60.00]),
    (4, [52.00, 57.60, 108.00, 120.00]),
    (4, [78.00, 86.80, 162.00, 180.00]),
    (4, [104.00, 115.60, 216.00, 240.00]),
    (4, [156.00, 173.20, 324.00, 360.00]),
    (4, [208.00, 231.20, 432.00, 480.00]),
    (4, [234.00, 260.00, 486.00, 540.00]),
    (4, [260.00, 288.80, 540.00, 600.00]),
    (1, [0.0, 0.0, 6.50, 7.20]),
];

// HT `known` bits
const HT_KNOWN_BW: u8 = 0x01;
const HT_KNOWN_MCS: u8 = 0x02;
const HT_KNOWN_GI: u8 = 0x04;

fn ht_bandwidth(known: u8, flags: u8) -> u32 {
    if known & HT_KNOWN_BW != 0 {
        [20, 40, 20, 20][usize::from(flags & 0x3)]
    } else {
        20
    }
}

/// Bitrate in Mbps of an HT frame; unknown bandwidth, GI or index fall back
/// to 20MHz, long GI and MCS 0.
pub fn mcs_rate(known: u8, flags: u8, index: u8) -> Option<f64> {
    let short_gi = known & HT_KNOWN_GI != 0 && flags & 0x4 != 0;
    let mcs = if known & HT_KNOWN_MCS != 0 { index } else { 0 };
    let column = match ht_bandwidth(known, flags) {
        20 => 0,
        _ => 2,
    } + usize::from(short_gi);
    MCS_TABLE.get(usize::from(mcs)).map(|(_, rates)| rates[column])
}

fn decode_field(name: &str, layout: Layout, raw: &[u8], packet: &mut Packet) {
    match layout {
        Layout::U8 => {
            let v = raw[0];
            // legacy rate comes in 500kbps units
            let value = if name == "rate" { json!(f64::from(v) / 2.0) } else { json!(v) };
            packet.insert(name.to_string(), value);
        }
        Layout::I8 => {
            packet.insert(name.to_string(), json!(raw[0] as i8));
        }
        Layout::U16 => {
            packet.insert(name.to_string(), json!(u16::from_le_bytes([raw[0], raw[1]])));
        }
        Layout::U64 => {
            let mut b = [0u8; 8];
            b.copy_from_slice(raw);
            packet.insert(name.to_string(), json!(u64::from_le_bytes(b)));
        }
        Layout::Channel => {
            packet.insert("freq".to_string(), json!(u16::from_le_bytes([raw[0], raw[1]])));
            packet.insert(
                "channel_flags".to_string(),
                json!(u16::from_le_bytes([raw[2], raw[3]])),
            );
        }
        Layout::Ht => {
            let (known, flags, index) = (raw[0], raw[1], raw[2]);
            packet.insert("mcs".to_string(), json!(index));
            if let Some(rate) = mcs_rate(known, flags, index) {
                packet.insert("rate".to_string(), json!(rate));
            }
            if let Some((streams, _)) = MCS_TABLE.get(usize::from(index)) {
                packet.insert("spatialstreams".to_string(), json!(streams));
            }
            if known & HT_KNOWN_BW != 0 {
                packet.insert("bw".to_string(), json!(ht_bandwidth(known, flags)));
            }
        }
        Layout::Skip { .. } => {}
    }
}

/// Decodes the radiotap header into `packet` and returns the 802.11 frame
/// that follows it.
fn decode_radiotap<'a>(body: &'a [u8], packet: &mut Packet) -> Result<&'a [u8]> {
    let header: [u8; RADIOTAP_HEADER_SIZE] =
        bytes(body, 0).ok_or_else(|| corrupted("radiotap header truncated"))?;
    if header[0] != 0 {
        return Err(corrupted(format!("unknown radiotap version {}", header[0])));
    }
    let it_len = usize::from(u16::from_le_bytes([header[2], header[3]]));
    let present = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    let fields = body
        .get(RADIOTAP_HEADER_SIZE..it_len)
        .ok_or_else(|| corrupted(format!("radiotap length {} outside packet of {}", it_len, body.len())))?;

    let mut ofs: usize = 0;
    for (bit, &(name, layout)) in RADIOTAP_FIELDS.iter().enumerate() {
        if present & (1 << bit) == 0 {
            continue;
        }
        ofs = ofs.next_multiple_of(layout.align());
        let Some(raw) = fields.get(ofs..ofs + layout.size()) else {
            debug!("radiotap field {} truncated", name);
            break;
        };
        decode_field(name, layout, raw, packet);
        ofs += layout.size();
    }

    if let Some(flags) = packet.get("flags").and_then(Value::as_u64) {
        let bad = flags & u64::from(RADIOTAP_BAD_FCS) != 0;
        packet.insert("bad".to_string(), json!(u8::from(bad)));
    }
    Ok(&body[it_len..])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameField {
    Ra,
    Ta,
    Xa,
    Seq,
}

const STD_FRAME: &[FrameField] = &[FrameField::Ra, FrameField::Ta, FrameField::Xa, FrameField::Seq];
const RA_TA: &[FrameField] = &[FrameField::Ra, FrameField::Ta];
const RA_ONLY: &[FrameField] = &[FrameField::Ra];

/// Name and address layout of an 802.11 frame by `type << 4 | subtype`.
fn frame_kind(kind: u8) -> (&'static str, &'static [FrameField]) {
    match kind {
        0x00 => ("AssocReq", STD_FRAME),
        0x01 => ("AssocResp", STD_FRAME),
        0x02 => ("ReassocReq", STD_FRAME),
        0x03 => ("ReassocResp", STD_FRAME),
        0x04 => ("ProbeReq", STD_FRAME),
        0x05 => ("ProbeResp", STD_FRAME),
        0x08 => ("Beacon", STD_FRAME),
        0x09 => ("ATIM", STD_FRAME),
        0x0a => ("Disassoc", STD_FRAME),
        0x0b => ("Auth", STD_FRAME),
        0x0c => ("Deauth", STD_FRAME),
        0x0d => ("Action", STD_FRAME),

        0x16 => ("CtlExt", RA_ONLY),
        0x18 => ("BlockAckReq", RA_TA),
        0x19 => ("BlockAck", RA_TA),
        0x1a => ("PsPoll", RA_TA),
        0x1b => ("RTS", RA_TA),
        0x1c => ("CTS", RA_ONLY),
        0x1d => ("ACK", RA_ONLY),
        0x1e => ("CongestionFreeEnd", RA_TA),
        0x1f => ("CongestionFreeEndAck", RA_TA),

        0x20 => ("Data", STD_FRAME),
        0x21 => ("DataCongestionFreeAck", STD_FRAME),
        0x22 => ("DataCongestionFreePoll", STD_FRAME),
        0x23 => ("DataCongestionFreeAckPoll", STD_FRAME),
        0x24 => ("Null", STD_FRAME),
        0x25 => ("CongestionFreeAck", STD_FRAME),
        0x26 => ("CongestionFreePoll", STD_FRAME),
        0x27 => ("CongestionFreeAckPoll", STD_FRAME),
        0x28 => ("QosData", STD_FRAME),
        0x29 => ("QosDataCongestionFreeAck", STD_FRAME),
        0x2a => ("QosDataCongestionFreePoll", STD_FRAME),
        0x2b => ("QosDataCongestionFreeAckPoll", STD_FRAME),
        0x2c => ("QosNull", STD_FRAME),
        0x2d => ("QosCongestionFreeAck", STD_FRAME),
        0x2e => ("QosCongestionFreePoll", STD_FRAME),
        0x2f => ("QosCongestionFreeAckPoll", STD_FRAME),

        _ => ("Unknown", RA_ONLY),
    }
}

pub fn mac_addr(raw: &[u8; 6]) -> String {
    raw.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

fn decode_dot11(frame: &[u8], packet: &mut Packet) {
    let (Some(fctl), Some(duration)) = (le_u16(frame, 0), le_u16(frame, 2)) else {
        debug!("802.11 header truncated ({} bytes)", frame.len());
        return;
    };
    let kind = (((fctl & 0x000c) >> 2) << 4 | (fctl & 0x00f0) >> 4) as u8;
    let (name, layout) = frame_kind(kind);

    packet.insert("type".to_string(), json!(kind));
    packet.insert("duration".to_string(), json!(duration));
    packet.insert("typestr".to_string(), json!(format!("{:02X} {}", kind, name)));
    packet.insert("dsmode".to_string(), json!((fctl & 0x0300) >> 8));
    packet.insert("retry".to_string(), json!((fctl & 0x0800) >> 11));
    packet.insert("powerman".to_string(), json!((fctl & 0x1000) >> 12));
    packet.insert("order".to_string(), json!((fctl & 0x8000) >> 15));
    if name == "PsPoll" {
        packet.insert("aid".to_string(), json!(duration & 0x3fff));
    }

    let mut ofs = 4;
    for field in layout {
        match field {
            FrameField::Seq => {
                let Some(seq) = le_u16(frame, ofs) else { break };
                packet.insert("seq".to_string(), json!((seq & 0xfff0) >> 4));
                packet.insert("frag".to_string(), json!(seq & 0x000f));
                ofs += 2;
            }
            addr => {
                let Some(raw) = bytes::<6>(frame, ofs) else { break };
                let key = match addr {
                    FrameField::Ra => "ra",
                    FrameField::Ta => "ta",
                    _ => "xa",
                };
                packet.insert(key.to_string(), json!(mac_addr(&raw)));
                ofs += 6;
            }
        }
    }
}

fn addr_of<'a>(packet: &'a Packet, field: &str) -> Option<&'a str> {
    packet.get(field).and_then(Value::as_str)
}

/// ACK and CTS frames carry no transmitter. When the frame answers the one
/// before it (its receiver is that frame's transmitter) the transmitter is
/// taken from that frame's receiver.
fn fill_transmitter(packet: &mut Packet, last: &mut Option<(String, String)>) {
    if addr_of(packet, "ta").is_some() {
        *last = match (addr_of(packet, "ta"), addr_of(packet, "ra")) {
            (Some(ta), Some(ra)) => Some((ta.to_string(), ra.to_string())),
            _ => None,
        };
        return;
    }
    let Some((last_ta, last_ra)) = last.take() else {
        return;
    };
    let answers = addr_of(packet, "ra").is_some_and(|ra| last_ta == ra && last_ra != ra);
    if answers {
        packet.insert("ta".to_string(), json!(last_ra));
    }
}

/// Decodes every packet of a radiotap pcap capture.
///
/// A record cut short at the end of the data ends the capture; a record
/// whose lengths contradict the headers is an error.
pub fn packetize(data: &[u8]) -> Result<Vec<Packet>> {
    let order = ByteOrder::detect(data).ok_or_else(|| DropletError::InvalidMagic {
        expected: PCAP_MAGIC.to_le_bytes().to_vec(),
        got: data.iter().take(4).copied().collect(),
    })?;
    let header: [u8; PCAP_HEADER_SIZE] =
        bytes(data, 0).ok_or_else(|| corrupted("pcap header truncated"))?;
    let at2 = |i: usize| [header[i], header[i + 1]];
    let at4 = |i: usize| [header[i], header[i + 1], header[i + 2], header[i + 3]];

    let version = (order.u16(at2(4)), order.u16(at2(6)));
    if version != PCAP_VERSION {
        return Err(DropletError::UnsupportedCapture(format!(
            "pcap version {}.{}",
            version.0, version.1
        )));
    }
    let snaplen = order.u32(at4(16));
    let network = order.u32(at4(20));
    if network != LINKTYPE_IEEE802_11_RADIOTAP {
        return Err(DropletError::UnsupportedCapture(format!("link type {}", network)));
    }

    let mut packets = Vec::new();
    let mut last = None;
    let mut ofs = PCAP_HEADER_SIZE;
    while let Some(record) = bytes::<PCAP_RECORD_SIZE>(data, ofs) {
        let field = |i: usize| order.u32([record[i], record[i + 1], record[i + 2], record[i + 3]]);
        let (ts_sec, ts_usec, incl_len, orig_len) = (field(0), field(4), field(8), field(12));
        if incl_len > orig_len {
            return Err(corrupted(format!(
                "packet incl_len({}) > orig_len({})",
                incl_len, orig_len
            )));
        }
        if incl_len > snaplen {
            return Err(corrupted(format!(
                "packet incl_len({}) > snaplen({})",
                incl_len, snaplen
            )));
        }

        let start = ofs + PCAP_RECORD_SIZE;
        let Some(body) = data.get(start..start + incl_len as usize) else {
            debug!("capture ends inside packet {}", packets.len());
            break;
        };
        ofs = start + incl_len as usize;

        let mut packet = Packet::new();
        packet.insert(
            TIME_FIELD.to_string(),
            json!(f64::from(ts_sec) + f64::from(ts_usec) / 1e6),
        );
        packet.insert("incl_len".to_string(), json!(incl_len));
        packet.insert("orig_len".to_string(), json!(orig_len));

        let frame = decode_radiotap(body, &mut packet)?;
        decode_dot11(frame, &mut packet);
        fill_transmitter(&mut packet, &mut last);
        packets.push(packet);
    }

    info!("decoded {} packets ({:?}-endian pcap)", packets.len(), order);
    Ok(packets)
}
