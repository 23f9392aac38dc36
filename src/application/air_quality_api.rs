// Transport trait for the air-quality REST API
use crate::domain::error::AirQualityError;
use async_trait::async_trait;

/// Raw access to the three endpoints. Bodies come back undecoded;
/// the response classifier decides what they are.
#[async_trait]
pub trait AirQualityApi: Send + Sync {
    /// Body of the full station list
    async fn fetch_stations(&self) -> Result<String, AirQualityError>;

    /// Body of the sensor list for one station
    async fn fetch_sensors(&self, station_id: i64) -> Result<String, AirQualityError>;

    /// Body of the measurement series for one sensor
    async fn fetch_measurements(&self, sensor_id: i64) -> Result<String, AirQualityError>;
}
