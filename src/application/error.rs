// Operation-level errors surfaced by the browse session
use crate::domain::chart::ChartError;
use crate::domain::error::AirQualityError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrowseError {
    #[error(transparent)]
    Source(#[from] AirQualityError),

    #[error("no station with id {0} in the loaded station list")]
    UnknownStation(i64),

    #[error("no station selected")]
    NoStationSelected,

    #[error("no data for parameter {0}")]
    NoData(String),

    #[error("chart window must start before it ends")]
    InvalidWindow,

    #[error("chart for {0} is already drawn in this cycle")]
    ChartAlreadyDrawn(String),

    #[error("browse coordinator is not running")]
    CoordinatorUnavailable,
}

impl From<ChartError> for BrowseError {
    fn from(e: ChartError) -> Self {
        match e {
            ChartError::InvalidWindow => BrowseError::InvalidWindow,
            ChartError::NoData(parameters) => BrowseError::NoData(parameters),
        }
    }
}
