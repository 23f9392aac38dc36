// Browse session - station list, current selection and its aggregation cycle
use crate::application::aggregation::AggregationSession;
use crate::application::error::BrowseError;
use crate::domain::measurement::MeasurementSeries;
use crate::domain::station::Station;
use serde::Serialize;
use std::collections::HashSet;

/// A started selection cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub epoch: u64,
    pub station: Station,
}

#[derive(Debug, Default)]
pub struct BrowseSession {
    stations: Vec<Station>,
    selected: Option<Station>,
    epoch: u64,
    aggregation: Option<AggregationSession>,
    /// Parameters already charted in the current cycle
    drawn_charts: HashSet<String>,
}

impl BrowseSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_stations(&mut self, stations: Vec<Station>) -> usize {
        self.stations = stations;
        self.stations.len()
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn station(&self, station_id: i64) -> Result<&Station, BrowseError> {
        self.stations
            .iter()
            .find(|s| s.id == station_id)
            .ok_or(BrowseError::UnknownStation(station_id))
    }

    pub fn selected(&self) -> Option<&Station> {
        self.selected.as_ref()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        epoch == self.epoch
    }

    pub fn select(&mut self, station_id: i64) -> Result<Selection, BrowseError> {
        let station = self.station(station_id)?.clone();
        Ok(self.begin_cycle(station))
    }

    pub fn refresh(&mut self) -> Result<Selection, BrowseError> {
        let station = self.selected.clone().ok_or(BrowseError::NoStationSelected)?;
        Ok(self.begin_cycle(station))
    }

    // Replaces every piece of per-cycle state in one step; anything tagged
    // with an older epoch is stale from here on.
    fn begin_cycle(&mut self, station: Station) -> Selection {
        self.epoch += 1;
        self.aggregation = Some(AggregationSession::new(self.epoch, station.id));
        self.drawn_charts.clear();
        self.selected = Some(station.clone());
        Selection {
            epoch: self.epoch,
            station,
        }
    }

    pub fn aggregation(&self) -> Option<&AggregationSession> {
        self.aggregation.as_ref()
    }

    /// The aggregation for `epoch`, if that cycle is still current
    pub fn aggregation_for(&mut self, epoch: u64) -> Option<&mut AggregationSession> {
        self.aggregation
            .as_mut()
            .filter(|aggregation| aggregation.epoch() == epoch)
    }

    pub fn series(&self, parameter: &str) -> Result<&MeasurementSeries, BrowseError> {
        self.aggregation
            .as_ref()
            .and_then(|a| a.series(parameter))
            .ok_or_else(|| BrowseError::NoData(parameter.to_string()))
    }

    pub fn parameters(&self) -> Vec<String> {
        self.aggregation
            .as_ref()
            .map(AggregationSession::parameters)
            .unwrap_or_default()
    }

    /// Marks parameters as charted; refuses any already drawn this cycle.
    pub fn claim_charts(&mut self, parameters: &[String]) -> Result<(), BrowseError> {
        if let Some(drawn) = parameters.iter().find(|p| self.drawn_charts.contains(*p)) {
            return Err(BrowseError::ChartAlreadyDrawn(drawn.clone()));
        }
        self.drawn_charts.extend(parameters.iter().cloned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with_stations() -> BrowseSession {
        let stations: Vec<Station> = serde_json::from_str(
            r#"[
                {"stationName": "A", "id": 1, "city": {"name": "Warszawa"}},
                {"stationName": "B", "id": 2, "city": {"name": "Kraków"}}
            ]"#,
        )
        .unwrap();
        let mut session = BrowseSession::new();
        session.set_stations(stations);
        session
    }

    #[test]
    fn test_select_starts_new_epoch() {
        let mut session = session_with_stations();

        let first = session.select(1).unwrap();
        let second = session.select(2).unwrap();

        assert_eq!(first.epoch, 1);
        assert_eq!(second.epoch, 2);
        assert!(session.is_current(2));
        assert!(session.aggregation_for(1).is_none());
        assert_eq!(session.aggregation_for(2).unwrap().station_id(), 2);
        assert_eq!(session.selected().unwrap().id, 2);
    }

    #[test]
    fn test_unknown_station() {
        let mut session = session_with_stations();
        assert!(matches!(session.select(77), Err(BrowseError::UnknownStation(77))));
        assert_eq!(session.epoch(), 0);
    }

    #[test]
    fn test_refresh_needs_selection() {
        let mut session = session_with_stations();
        assert!(matches!(session.refresh(), Err(BrowseError::NoStationSelected)));

        session.select(1).unwrap();
        let refreshed = session.refresh().unwrap();
        assert_eq!(refreshed.epoch, 2);
        assert_eq!(refreshed.station.id, 1);
    }

    #[test]
    fn test_chart_claims_reset_per_cycle() {
        let mut session = session_with_stations();
        session.select(1).unwrap();

        let pm10 = vec!["PM10".to_string()];
        session.claim_charts(&pm10).unwrap();
        assert!(matches!(
            session.claim_charts(&["NO2".to_string(), "PM10".to_string()]),
            Err(BrowseError::ChartAlreadyDrawn(p)) if p == "PM10"
        ));

        session.refresh().unwrap();
        assert!(session.claim_charts(&pm10).is_ok());
    }
}
