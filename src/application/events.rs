// Presentation boundary - events published by the browse coordinator
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BrowseEvent {
    StationListReady {
        count: usize,
    },
    SensorCountKnown {
        epoch: u64,
        station_id: i64,
        count: usize,
    },
    ExcerptReady {
        epoch: u64,
        parameter: String,
        excerpt: String,
    },
    AggregationComplete {
        epoch: u64,
        station_id: i64,
        summary: String,
        parameters: Vec<String>,
        failed: usize,
    },
    /// The sensor list for a selection could not be obtained
    CycleAborted {
        epoch: u64,
        station_id: i64,
    },
    FetchFailed {
        epoch: Option<u64>,
        target: String,
        message: String,
    },
    UnknownFormat {
        epoch: Option<u64>,
        message: String,
    },
    StorageFailed {
        path: String,
        message: String,
    },
}

impl BrowseEvent {
    /// Selection cycle the event belongs to, if any
    pub fn epoch(&self) -> Option<u64> {
        match self {
            BrowseEvent::SensorCountKnown { epoch, .. }
            | BrowseEvent::ExcerptReady { epoch, .. }
            | BrowseEvent::AggregationComplete { epoch, .. }
            | BrowseEvent::CycleAborted { epoch, .. } => Some(*epoch),
            BrowseEvent::FetchFailed { epoch, .. } | BrowseEvent::UnknownFormat { epoch, .. } => {
                *epoch
            }
            BrowseEvent::StationListReady { .. } | BrowseEvent::StorageFailed { .. } => None,
        }
    }

    /// True for the event after which a cycle publishes nothing more
    pub fn ends_cycle(&self) -> bool {
        matches!(
            self,
            BrowseEvent::AggregationComplete { .. }
                | BrowseEvent::CycleAborted { .. }
                | BrowseEvent::SensorCountKnown { count: 0, .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_tag() {
        let event = BrowseEvent::SensorCountKnown {
            epoch: 3,
            station_id: 14,
            count: 5,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "sensor_count_known");
        assert_eq!(json["count"], 5);
    }

    #[test]
    fn test_ends_cycle() {
        let empty = BrowseEvent::SensorCountKnown {
            epoch: 1,
            station_id: 1,
            count: 0,
        };
        let some = BrowseEvent::SensorCountKnown {
            epoch: 1,
            station_id: 1,
            count: 2,
        };
        assert!(empty.ends_cycle());
        assert!(!some.ends_cycle());
    }
}
