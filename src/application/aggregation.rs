// Aggregation session - per-selection join state for sensor measurement replies
use crate::domain::measurement::MeasurementSeries;
use std::collections::{HashMap, HashSet};

const SUMMARY_HEADER: &str = "Measurement data from station:\n\n";

/// Joined result handed to the presentation boundary once per cycle
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReady {
    pub summary: String,
    pub parameters: Vec<String>,
    pub received: usize,
    pub failed: usize,
}

/// What became of one sensor reply
#[derive(Debug, Clone, PartialEq)]
pub enum Arrival {
    /// Counted towards the join. `excerpt` is set for stored series,
    /// `batch` when this reply settled the join.
    Accepted {
        excerpt: Option<String>,
        batch: Option<BatchReady>,
    },
    /// Not pending: a duplicate, an unknown sensor, or the join already settled
    Ignored,
}

/// State of one station-selection cycle.
///
/// Every sensor listed for the station is pending until its series arrives
/// or its fetch fails. The join settles when
/// `received + failed == expected` with `expected > 0`, and settles once.
#[derive(Debug)]
pub struct AggregationSession {
    epoch: u64,
    station_id: i64,
    expected: Option<usize>,
    received: usize,
    failed: usize,
    pending: HashSet<i64>,
    series_by_parameter: HashMap<String, MeasurementSeries>,
    excerpts: Vec<String>,
    completed: bool,
}

impl AggregationSession {
    pub fn new(epoch: u64, station_id: i64) -> Self {
        Self {
            epoch,
            station_id,
            expected: None,
            received: 0,
            failed: 0,
            pending: HashSet::new(),
            series_by_parameter: HashMap::new(),
            excerpts: Vec::new(),
            completed: false,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn station_id(&self) -> i64 {
        self.station_id
    }

    pub fn expected_count(&self) -> usize {
        self.expected.unwrap_or(0)
    }

    pub fn received_count(&self) -> usize {
        self.received
    }

    pub fn failed_count(&self) -> usize {
        self.failed
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// Record the station's sensors. Returns the distinct ids to fetch,
    /// in first-seen order, or `None` if the count was already known.
    pub fn expect_sensors(&mut self, sensor_ids: impl IntoIterator<Item = i64>) -> Option<Vec<i64>> {
        if self.expected.is_some() {
            return None;
        }

        let mut ordered = Vec::new();
        for id in sensor_ids {
            if self.pending.insert(id) {
                ordered.push(id);
            }
        }
        self.expected = Some(ordered.len());
        Some(ordered)
    }

    pub fn record_series(&mut self, sensor_id: i64, series: MeasurementSeries) -> Arrival {
        if !self.take_pending(sensor_id) {
            return Arrival::Ignored;
        }

        let excerpt = series.excerpt();
        self.excerpts.push(excerpt.clone());
        self.series_by_parameter.insert(series.parameter.clone(), series);
        self.received += 1;

        Arrival::Accepted {
            excerpt: Some(excerpt),
            batch: self.try_settle(),
        }
    }

    /// A sensor whose fetch failed counts as settled with no data.
    pub fn record_failure(&mut self, sensor_id: i64) -> Arrival {
        if !self.take_pending(sensor_id) {
            return Arrival::Ignored;
        }

        self.failed += 1;
        Arrival::Accepted {
            excerpt: None,
            batch: self.try_settle(),
        }
    }

    pub fn series(&self, parameter: &str) -> Option<&MeasurementSeries> {
        self.series_by_parameter.get(parameter)
    }

    pub fn all_series(&self) -> impl Iterator<Item = &MeasurementSeries> {
        self.series_by_parameter.values()
    }

    /// Parameter codes received so far, sorted
    pub fn parameters(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.series_by_parameter.keys().cloned().collect();
        codes.sort();
        codes
    }

    fn take_pending(&mut self, sensor_id: i64) -> bool {
        !self.completed && self.pending.remove(&sensor_id)
    }

    fn try_settle(&mut self) -> Option<BatchReady> {
        let expected = self.expected_count();
        if self.completed || expected == 0 || self.received + self.failed != expected {
            return None;
        }
        self.completed = true;

        let mut summary = format!("{}{}", SUMMARY_HEADER, self.excerpts.join("\n"));
        if self.failed > 0 {
            summary.push_str(&format!(
                "\n{} of {} sensors could not be read.\n",
                self.failed, expected
            ));
        }
        self.excerpts.clear();

        Some(BatchReady {
            summary,
            parameters: self.parameters(),
            received: self.received,
            failed: self.failed,
        })
    }
}
