//! Semantic channel matching for logger column headers
//!
//! Logger vendors disagree on column naming, so each semantic channel
//! carries a list of canonical aliases. A header matches a channel when
//! its lowercased form equals an alias or contains one as a substring.

use serde::{Deserialize, Serialize};

/// Semantic channels a logger file can carry.
///
/// The variant order is the canonical order used to break ties when a
/// header matches more than one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Time,
    Distance,
    Rpm,
    Speed,
    LatAcc,
    LonAcc,
    Slope,
    HeadTemp,
    WaterTemp,
    ExhaustTemp,
    AirTemp,
    Lambda,
    Throttle,
    Lap,
}

impl Channel {
    /// All channels in canonical order.
    pub const ALL: [Channel; 14] = [
        Channel::Time,
        Channel::Distance,
        Channel::Rpm,
        Channel::Speed,
        Channel::LatAcc,
        Channel::LonAcc,
        Channel::Slope,
        Channel::HeadTemp,
        Channel::WaterTemp,
        Channel::ExhaustTemp,
        Channel::AirTemp,
        Channel::Lambda,
        Channel::Throttle,
        Channel::Lap,
    ];

    /// Channels the analysis pipeline cannot run without.
    pub fn is_required(self) -> bool {
        matches!(
            self,
            Channel::Time | Channel::Rpm | Channel::Speed | Channel::LonAcc
        )
    }

    /// Display name used in error messages and mapping summaries.
    pub fn name(self) -> &'static str {
        match self {
            Channel::Time => "time",
            Channel::Distance => "distance",
            Channel::Rpm => "rpm",
            Channel::Speed => "speed",
            Channel::LatAcc => "lat_acc",
            Channel::LonAcc => "lon_acc",
            Channel::Slope => "slope",
            Channel::HeadTemp => "head_temp",
            Channel::WaterTemp => "water_temp",
            Channel::ExhaustTemp => "exhaust_temp",
            Channel::AirTemp => "air_temp",
            Channel::Lambda => "lambda",
            Channel::Throttle => "throttle",
            Channel::Lap => "lap",
        }
    }

    /// Header aliases recognised for this channel (lowercase).
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Channel::Time => &["time"],
            Channel::Distance => &["distance", "dist"],
            Channel::Rpm => &["rpm", "engine"],
            Channel::Speed => &["gps_speed", "gps speed", "speed", "velocity"],
            Channel::LatAcc => &["latacc", "lat_acc", "lat acc", "lateral"],
            Channel::LonAcc => &["lonacc", "lon_acc", "lon acc", "longitudinal"],
            Channel::Slope => &["slope", "gradient", "grade"],
            Channel::HeadTemp => &["head", "cht"],
            Channel::WaterTemp => &["water", "coolant", "h2o"],
            Channel::ExhaustTemp => &["exhaust", "egt"],
            Channel::AirTemp => &["air temp", "air_temp", "ambient", "tair"],
            Channel::Lambda => &["lambda", "afr", "o2"],
            Channel::Throttle => &["throttle", "tps"],
            Channel::Lap => &["lap"],
        }
    }

    fn ordinal(self) -> usize {
        Channel::ALL.iter().position(|c| *c == self).unwrap_or(0)
    }
}

/// How a channel mapping entry was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    /// Matched automatically against the alias table.
    Auto,
    /// Pinned by the caller.
    Manual,
    /// No header matched.
    Unmatched,
}

/// One channel's binding to a file column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMatch {
    /// Header text as it appeared in the file (quotes stripped).
    pub header: Option<String>,
    /// Column index into the data rows.
    pub column: Option<usize>,
    pub status: MatchStatus,
    /// Applied to every value during materialisation.
    pub multiplier: f64,
}

impl Default for ChannelMatch {
    fn default() -> Self {
        Self {
            header: None,
            column: None,
            status: MatchStatus::Unmatched,
            multiplier: 1.0,
        }
    }
}

/// Mapping from semantic channel to file column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMap {
    entries: Vec<ChannelMatch>,
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self {
            entries: vec![ChannelMatch::default(); Channel::ALL.len()],
        }
    }
}

impl ChannelMap {
    /// Match headers against the alias table.
    ///
    /// Headers are visited in file order; the first header that matches a
    /// still-unmatched channel claims it. When one header could match
    /// several channels, the earliest channel in canonical order wins.
    /// Headers that look like wall-clock values (`12:34`) never match.
    pub fn resolve(headers: &[String]) -> ChannelMap {
        let mut map = ChannelMap::default();
        for (column, raw) in headers.iter().enumerate() {
            let name = normalize_header(raw);
            if name.is_empty() || looks_like_clock(&name) {
                continue;
            }
            for channel in Channel::ALL {
                let entry = &mut map.entries[channel.ordinal()];
                if entry.status != MatchStatus::Unmatched {
                    continue;
                }
                if header_matches(&name, channel) {
                    *entry = ChannelMatch {
                        header: Some(raw.trim().trim_matches('"').to_string()),
                        column: Some(column),
                        status: MatchStatus::Auto,
                        multiplier: 1.0,
                    };
                    break;
                }
            }
        }
        map
    }

    /// Pin a channel to a named header, overriding any automatic match.
    ///
    /// Returns false when the header is not present in `headers`.
    pub fn set_manual(
        &mut self,
        channel: Channel,
        headers: &[String],
        header: &str,
        multiplier: f64,
    ) -> bool {
        let wanted = normalize_header(header);
        let column = headers
            .iter()
            .position(|h| normalize_header(h) == wanted);
        match column {
            Some(column) => {
                self.entries[channel.ordinal()] = ChannelMatch {
                    header: Some(headers[column].trim().trim_matches('"').to_string()),
                    column: Some(column),
                    status: MatchStatus::Manual,
                    multiplier,
                };
                true
            }
            None => false,
        }
    }

    pub fn get(&self, channel: Channel) -> &ChannelMatch {
        &self.entries[channel.ordinal()]
    }

    pub fn column(&self, channel: Channel) -> Option<usize> {
        self.entries[channel.ordinal()].column
    }

    pub fn multiplier(&self, channel: Channel) -> f64 {
        self.entries[channel.ordinal()].multiplier
    }

    pub fn is_matched(&self, channel: Channel) -> bool {
        self.entries[channel.ordinal()].status != MatchStatus::Unmatched
    }

    /// Required channels that stayed unmatched after resolution.
    pub fn missing_required(&self) -> Vec<Channel> {
        Channel::ALL
            .iter()
            .copied()
            .filter(|c| c.is_required() && !self.is_matched(*c))
            .collect()
    }
}

/// True when `cell` (raw header text) matches any channel alias.
pub(crate) fn cell_matches_any_alias(cell: &str) -> bool {
    let name = normalize_header(cell);
    if name.is_empty() || looks_like_clock(&name) {
        return false;
    }
    Channel::ALL.iter().any(|c| header_matches(&name, *c))
}

fn header_matches(name: &str, channel: Channel) -> bool {
    channel
        .aliases()
        .iter()
        .any(|alias| name == *alias || name.contains(alias))
}

pub(crate) fn normalize_header(raw: &str) -> String {
    raw.trim().trim_matches('"').trim().to_lowercase()
}

/// Clock-like cells (`\d+:\d+`) are timestamps, not channel names.
fn looks_like_clock(name: &str) -> bool {
    let bytes = name.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b':'
            && i > 0
            && i + 1 < bytes.len()
            && bytes[i - 1].is_ascii_digit()
            && bytes[i + 1].is_ascii_digit()
        {
            return true;
        }
    }
    false
}
