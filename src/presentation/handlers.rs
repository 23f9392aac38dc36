// HTTP request handlers
use crate::application::error::BrowseError;
use crate::domain::chart::{parse_timestamp, ChartData, TimeWindow};
use crate::domain::station::Station;
use crate::infrastructure::event_stream::stream_cycle;
use crate::infrastructure::export::ExportedFiles;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct CityQuery {
    pub city: Option<String>,
}

#[derive(Deserialize)]
pub struct ChartQuery {
    /// Comma-separated parameter codes
    pub parameters: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Deserialize)]
pub struct ExportQuery {
    pub parameter: Option<String>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Fetch the station list from the API (and rewrite the cache)
pub async fn fetch_stations(State(state): State<Arc<AppState>>) -> Result<Json<Value>, BrowseError> {
    let count = state.browse.fetch_stations().await?;
    Ok(Json(json!({ "count": count })))
}

/// Load the station list from the cache file
pub async fn load_stations(State(state): State<Arc<AppState>>) -> Result<Json<Value>, BrowseError> {
    let count = state.browse.load_cached_stations().await?;
    Ok(Json(json!({ "count": count })))
}

pub async fn list_stations(
    Query(query): Query<CityQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Station>>, BrowseError> {
    let city = query.city.unwrap_or_default();
    Ok(Json(state.browse.stations(&city).await?))
}

pub async fn station_details(
    Path(id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, BrowseError> {
    let station = state.browse.station(id).await?;
    Ok(Json(json!({ "details": station.details(), "station": station })))
}

/// Select a station and stream the events of its selection cycle
pub async fn select_station(Path(id): Path<i64>, State(state): State<Arc<AppState>>) -> Response {
    // Subscribe first so no event of the new cycle is missed
    let rx = state.browse.subscribe();
    match state.browse.select_station(id).await {
        Ok(selection) => stream_cycle(rx, selection.epoch).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Re-run the current station's cycle and stream its events
pub async fn refresh(State(state): State<Arc<AppState>>) -> Response {
    let rx = state.browse.subscribe();
    match state.browse.refresh().await {
        Ok(selection) => stream_cycle(rx, selection.epoch).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn list_parameters(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>, BrowseError> {
    Ok(Json(state.browse.parameters().await?))
}

pub async fn analyze_parameter(
    Path(code): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, BrowseError> {
    let analysis = state.browse.analyze(&code).await?;
    let report = analysis.report();
    Ok(Json(json!({ "analysis": analysis, "report": report })))
}

pub async fn chart(
    Query(query): Query<ChartQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ChartData>, BrowseError> {
    let parameters = split_parameters(query.parameters.as_deref());
    let window = parse_window(query.start.as_deref(), query.end.as_deref())?;
    Ok(Json(state.browse.chart(parameters, window).await?))
}

pub async fn export(
    Query(query): Query<ExportQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ExportedFiles>>, BrowseError> {
    Ok(Json(state.browse.export(query.parameter).await?))
}

fn split_parameters(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Both bounds or neither; each must be a readable timestamp.
fn parse_window(start: Option<&str>, end: Option<&str>) -> Result<Option<TimeWindow>, BrowseError> {
    match (start, end) {
        (None, None) => Ok(None),
        (Some(start), Some(end)) => {
            let start = parse_timestamp(start).ok_or(BrowseError::InvalidWindow)?;
            let end = parse_timestamp(end).ok_or(BrowseError::InvalidWindow)?;
            Ok(Some(TimeWindow::new(start, end)?))
        }
        _ => Err(BrowseError::InvalidWindow),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_parameters() {
        assert_eq!(split_parameters(Some("PM10, NO2,,")), vec!["PM10", "NO2"]);
        assert!(split_parameters(None).is_empty());
    }

    #[test]
    fn test_parse_window() {
        assert!(parse_window(None, None).unwrap().is_none());
        assert!(parse_window(Some("2023-10-01"), Some("2023-10-02 12:00:00"))
            .unwrap()
            .is_some());
        assert!(matches!(
            parse_window(Some("2023-10-02"), Some("2023-10-01")),
            Err(BrowseError::InvalidWindow)
        ));
        assert!(matches!(
            parse_window(Some("2023-10-01"), None),
            Err(BrowseError::InvalidWindow)
        ));
        assert!(matches!(
            parse_window(Some("soon"), Some("later")),
            Err(BrowseError::InvalidWindow)
        ));
    }
}
