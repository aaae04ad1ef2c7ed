pub mod buckets;
pub mod compression;
pub mod constants;
pub mod data_handle;
pub mod error;
pub mod fields;
pub mod filter;
pub mod format;
pub mod gesture;
pub mod histogram;
pub mod hosts;
pub mod pcap;
pub mod reader;
pub mod resolver;
pub mod scale;
pub mod selection;
pub mod streams;
pub mod time_index;
pub mod view;
pub mod viewport;
