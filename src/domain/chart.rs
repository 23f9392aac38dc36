// Chart data domain models
use crate::domain::measurement::MeasurementSeries;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use thiserror::Error;

/// Lower/upper padding applied to the y axis around the data
const Y_PAD_LOW: f64 = 0.9;
const Y_PAD_HIGH: f64 = 1.1;

#[derive(Debug, Error, PartialEq)]
pub enum ChartError {
    #[error("chart window must start before it ends")]
    InvalidWindow,
    #[error("no data to plot for {0}")]
    NoData(String),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TimeSeriesPoint {
    pub time_ms: i64,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(time_ms: i64, value: f64) -> Self {
        Self { time_ms, value }
    }
}

/// Accepts the API's `YYYY-MM-DD HH:MM:SS`, RFC 3339, ISO without offset,
/// or a bare date (read as midnight).
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Inclusive time range for plotted points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl TimeWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, ChartError> {
        if start >= end {
            return Err(ChartError::InvalidWindow);
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        at >= self.start && at <= self.end
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChartSeries {
    pub parameter: String,
    pub points: Vec<TimeSeriesPoint>,
}

impl ChartSeries {
    /// Plottable points: a reading, a readable timestamp, inside the window.
    pub fn from_series(series: &MeasurementSeries, window: Option<&TimeWindow>) -> Self {
        let points = series
            .present_points()
            .filter_map(|(date, value)| {
                let at = parse_timestamp(date)?;
                if window.is_some_and(|w| !w.contains(at)) {
                    return None;
                }
                Some(TimeSeriesPoint::new(at.and_utc().timestamp_millis(), value))
            })
            .collect();

        Self {
            parameter: series.parameter.clone(),
            points,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChartData {
    pub series: Vec<ChartSeries>,
    pub y_min: f64,
    pub y_max: f64,
}

impl ChartData {
    /// Drops empty series and pads the y range around what remains.
    pub fn build(series: Vec<ChartSeries>) -> Result<Self, ChartError> {
        let requested: Vec<String> = series.iter().map(|s| s.parameter.clone()).collect();
        let series: Vec<ChartSeries> = series.into_iter().filter(|s| !s.points.is_empty()).collect();

        let (min, max) = series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.value))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });

        if series.is_empty() {
            return Err(ChartError::NoData(requested.join(", ")));
        }

        Ok(Self {
            series,
            y_min: min * Y_PAD_LOW,
            y_max: max * Y_PAD_HIGH,
        })
    }
}
