//! Logger CSV decoding
//!
//! Logger exports start with a key/value metadata block, then a header
//! row, then (sometimes) unit and channel-index rows, then numeric data.
//! The decoder tokenises everything up front and classifies rows; it
//! never assumes a fixed metadata length.

use crate::channels::{cell_matches_any_alias, normalize_header, Channel, ChannelMap};
use crate::error::DecodeError;
use serde::{Deserialize, Serialize};

/// Metadata keys that can never start a header row.
const RESERVED_KEYS: [&str; 14] = [
    "format",
    "venue",
    "vehicle",
    "user",
    "driver",
    "data source",
    "comment",
    "date",
    "sample rate",
    "duration",
    "segment",
    "beacon markers",
    "segment times",
    "session",
];

/// Cells that mark a row as a unit row (skipped after the header).
const UNIT_CELLS: [&str; 9] = ["sec", "km", "km/h", "rpm", "g", "m/s", "m", "%", "°c"];

/// How many leading rows are searched for the header row.
const HEADER_SCAN_ROWS: usize = 30;

/// Typed view of the metadata block above the header row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    pub format: Option<String>,
    pub venue: Option<String>,
    pub vehicle: Option<String>,
    pub driver: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub sample_rate_hz: Option<f64>,
    pub duration_s: Option<f64>,
    /// Cumulative lap boundaries in seconds, straight from the file.
    pub beacon_markers: Vec<f64>,
    /// Cumulative lap boundaries derived from segment times.
    pub segment_boundaries: Vec<f64>,
    /// Per-lap times when the file listed them individually.
    pub segment_lap_times: Vec<f64>,
}

impl SessionMetadata {
    fn apply(&mut self, key: &str, values: &[String]) {
        let first = values.first().map(|v| v.trim().to_string());
        match key {
            "format" => self.format = first,
            "venue" => self.venue = first,
            "vehicle" => self.vehicle = first,
            "driver" | "user" => {
                if self.driver.is_none() {
                    self.driver = first;
                }
            }
            "date" => self.date = first,
            "time" => self.time = first,
            "sample rate" => self.sample_rate_hz = first.as_deref().and_then(parse_number),
            "duration" => self.duration_s = first.as_deref().and_then(parse_seconds),
            "beacon markers" => {
                self.beacon_markers = values
                    .iter()
                    .filter_map(|v| parse_seconds(v))
                    .filter(|v| v.is_finite())
                    .collect();
            }
            "segment times" => {
                let times: Vec<f64> = values
                    .iter()
                    .filter_map(|v| parse_seconds(v))
                    .filter(|v| v.is_finite())
                    .collect();
                self.set_segment_times(times);
            }
            _ => {}
        }
    }

    /// Segment times are either already-cumulative boundaries or
    /// individual lap times. Strictly increasing values are cumulative;
    /// anything else is a per-lap list converted by prefix sum.
    fn set_segment_times(&mut self, times: Vec<f64>) {
        if times.is_empty() {
            return;
        }
        let cumulative = times.windows(2).all(|w| w[1] > w[0]);
        if cumulative {
            self.segment_boundaries = times;
            self.segment_lap_times = Vec::new();
        } else {
            let mut acc = 0.0;
            self.segment_boundaries = times
                .iter()
                .map(|t| {
                    acc += t;
                    acc
                })
                .collect();
            self.segment_lap_times = times;
        }
    }
}

/// Tokenised logger file: metadata, header names and raw data cells.
#[derive(Debug, Clone)]
pub struct DecodedLog {
    pub metadata: SessionMetadata,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Dense per-channel sample arrays, all of equal length.
///
/// Optional channels that were not mapped stay empty; an empty array is
/// an ordinary value, not an error.
#[derive(Debug, Clone, Default)]
pub struct Telemetry {
    pub time: Vec<f64>,
    pub distance: Vec<f64>,
    pub rpm: Vec<f64>,
    pub speed_kmh: Vec<f64>,
    pub lat_acc_g: Vec<f64>,
    pub lon_acc_g: Vec<f64>,
    pub slope: Vec<f64>,
    pub head_temp: Vec<f64>,
    pub water_temp: Vec<f64>,
    pub exhaust_temp: Vec<f64>,
    pub air_temp: Vec<f64>,
    pub lambda: Vec<f64>,
    pub throttle: Vec<f64>,
    pub lap: Vec<f64>,
}

impl Telemetry {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn channel(&self, channel: Channel) -> &[f64] {
        match channel {
            Channel::Time => &self.time,
            Channel::Distance => &self.distance,
            Channel::Rpm => &self.rpm,
            Channel::Speed => &self.speed_kmh,
            Channel::LatAcc => &self.lat_acc_g,
            Channel::LonAcc => &self.lon_acc_g,
            Channel::Slope => &self.slope,
            Channel::HeadTemp => &self.head_temp,
            Channel::WaterTemp => &self.water_temp,
            Channel::ExhaustTemp => &self.exhaust_temp,
            Channel::AirTemp => &self.air_temp,
            Channel::Lambda => &self.lambda,
            Channel::Throttle => &self.throttle,
            Channel::Lap => &self.lap,
        }
    }

    fn channel_mut(&mut self, channel: Channel) -> &mut Vec<f64> {
        match channel {
            Channel::Time => &mut self.time,
            Channel::Distance => &mut self.distance,
            Channel::Rpm => &mut self.rpm,
            Channel::Speed => &mut self.speed_kmh,
            Channel::LatAcc => &mut self.lat_acc_g,
            Channel::LonAcc => &mut self.lon_acc_g,
            Channel::Slope => &mut self.slope,
            Channel::HeadTemp => &mut self.head_temp,
            Channel::WaterTemp => &mut self.water_temp,
            Channel::ExhaustTemp => &mut self.exhaust_temp,
            Channel::AirTemp => &mut self.air_temp,
            Channel::Lambda => &mut self.lambda,
            Channel::Throttle => &mut self.throttle,
            Channel::Lap => &mut self.lap,
        }
    }
}

/// Decode raw logger bytes into metadata, headers and string rows.
pub fn decode(bytes: &[u8]) -> Result<DecodedLog, DecodeError> {
    let rows = tokenize(bytes)?;

    let header_index = rows
        .iter()
        .take(HEADER_SCAN_ROWS)
        .position(|row| is_header_row(row))
        .ok_or(DecodeError::NoHeaderRow)?;

    let mut metadata = SessionMetadata::default();
    for row in &rows[..header_index] {
        if row.len() >= 2 && !row[0].trim().is_empty() {
            let key = normalize_header(&row[0]);
            metadata.apply(&key, &row[1..]);
        }
    }

    let headers: Vec<String> = rows[header_index].clone();

    // Unit rows, channel-index rows and repeated headers may follow the
    // header row; they stop at the first row that is none of those.
    let mut body = header_index + 1;
    while body < rows.len() {
        let row = &rows[body];
        if is_duplicate_header(row, &headers) || is_unit_row(row) || is_index_row(row) {
            body += 1;
        } else {
            break;
        }
    }

    let min_fields = 3.min(headers.len());
    let data: Vec<Vec<String>> = rows[body..]
        .iter()
        .filter(|row| row.len() >= min_fields && first_cell_is_numeric(row))
        .cloned()
        .collect();

    if data.is_empty() {
        return Err(DecodeError::NoDataRows);
    }

    Ok(DecodedLog {
        metadata,
        headers,
        rows: data,
    })
}

/// Materialise raw string rows into dense numeric channel arrays.
///
/// Every mapped channel ends up with exactly one value per data row;
/// unparseable or missing cells become 0. Multipliers apply here.
pub fn materialize(log: &DecodedLog, map: &ChannelMap) -> Telemetry {
    let mut telemetry = Telemetry::default();
    for channel in Channel::ALL {
        let Some(column) = map.column(channel) else {
            continue;
        };
        let multiplier = map.multiplier(channel);
        let values = telemetry.channel_mut(channel);
        values.reserve(log.rows.len());
        for row in &log.rows {
            let parsed = row
                .get(column)
                .and_then(|cell| cell.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .unwrap_or(0.0);
            values.push(parsed * multiplier);
        }
    }
    telemetry
}

fn tokenize(bytes: &[u8]) -> Result<Vec<Vec<String>>, DecodeError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|cell| cell.to_string()).collect());
    }
    Ok(rows)
}

fn is_header_row(row: &[String]) -> bool {
    let non_empty = row.iter().filter(|c| !c.trim().is_empty()).count();
    if non_empty < 3 {
        return false;
    }
    let first = normalize_header(&row[0]);
    if RESERVED_KEYS.contains(&first.as_str()) {
        return false;
    }
    if first == "time" || first == "distance" {
        return true;
    }
    let alias_hits = row.iter().filter(|c| cell_matches_any_alias(c)).count();
    alias_hits >= 3
}

fn is_duplicate_header(row: &[String], headers: &[String]) -> bool {
    row.len() == headers.len()
        && row
            .iter()
            .zip(headers)
            .all(|(a, b)| normalize_header(a) == normalize_header(b))
}

fn is_unit_row(row: &[String]) -> bool {
    row.iter()
        .any(|cell| UNIT_CELLS.contains(&normalize_header(cell).as_str()))
}

/// Channel-index rows list small integers (one per column).
fn is_index_row(row: &[String]) -> bool {
    let mut saw_any = false;
    for cell in row {
        let cell = cell.trim();
        if cell.is_empty() {
            continue;
        }
        match cell.parse::<i64>() {
            Ok(v) if (0..=20).contains(&v) => saw_any = true,
            _ => return false,
        }
    }
    saw_any
}

fn first_cell_is_numeric(row: &[String]) -> bool {
    row.first()
        .and_then(|c| c.trim().parse::<f64>().ok())
        .map(|v| v.is_finite())
        .unwrap_or(false)
}

fn parse_number(value: &str) -> Option<f64> {
    value
        .split_whitespace()
        .next()
        .and_then(|tok| tok.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Parse `"85.3"` or clock-style `"1:25.300"` into seconds.
fn parse_seconds(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if !value.contains(':') {
        return parse_number(value);
    }
    let mut total = 0.0;
    for part in value.split(':') {
        let part: f64 = part.trim().parse().ok()?;
        total = total * 60.0 + part;
    }
    total.is_finite().then_some(total)
}
