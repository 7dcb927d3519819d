//! Logger File Decoding
//!
//! Turns raw logger CSV bytes into typed telemetry: metadata block
//! extraction, header-row detection, semantic channel matching and
//! per-lap index ranges.

mod channels;
mod decoder;
mod error;
mod laps;

pub use channels::{Channel, ChannelMap, ChannelMatch, MatchStatus};
pub use decoder::{decode, materialize, DecodedLog, SessionMetadata, Telemetry};
pub use error::DecodeError;
pub use laps::{extract_laps, Lap, IN_LAP_THRESHOLD_S};
