// HTTP response utilities - maps browse errors onto status codes
use crate::application::error::BrowseError;
use crate::domain::error::AirQualityError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub fn status_for(error: &BrowseError) -> StatusCode {
    match error {
        BrowseError::UnknownStation(_) | BrowseError::NoData(_) => StatusCode::NOT_FOUND,
        BrowseError::NoStationSelected | BrowseError::ChartAlreadyDrawn(_) => StatusCode::CONFLICT,
        BrowseError::InvalidWindow => StatusCode::BAD_REQUEST,
        BrowseError::CoordinatorUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        BrowseError::Source(source) => match source {
            AirQualityError::Transport { .. }
            | AirQualityError::Parse(_)
            | AirQualityError::Classification(_) => StatusCode::BAD_GATEWAY,
            AirQualityError::FileIo { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

impl IntoResponse for BrowseError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            tracing::warn!("Request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
