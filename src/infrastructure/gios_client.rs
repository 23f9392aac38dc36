// GIOŚ REST API client
use crate::application::air_quality_api::AirQualityApi;
use crate::domain::error::AirQualityError;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct GiosClient {
    client: reqwest::Client,
    base_url: String,
}

impl GiosClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn stations_url(&self) -> String {
        format!("{}/station/findAll", self.base_url)
    }

    fn sensors_url(&self, station_id: i64) -> String {
        format!("{}/station/sensors/{}", self.base_url, station_id)
    }

    fn measurements_url(&self, sensor_id: i64) -> String {
        format!("{}/data/getData/{}", self.base_url, sensor_id)
    }

    async fn get_body(&self, url: &str) -> Result<String, AirQualityError> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AirQualityError::transport(url, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AirQualityError::transport(
                url,
                format!("HTTP {}: {}", status, body.trim()),
            ));
        }

        response
            .text()
            .await
            .map_err(|e| AirQualityError::transport(url, e))
    }
}

#[async_trait]
impl AirQualityApi for GiosClient {
    async fn fetch_stations(&self) -> Result<String, AirQualityError> {
        self.get_body(&self.stations_url()).await
    }

    async fn fetch_sensors(&self, station_id: i64) -> Result<String, AirQualityError> {
        self.get_body(&self.sensors_url(station_id)).await
    }

    async fn fetch_measurements(&self, sensor_id: i64) -> Result<String, AirQualityError> {
        self.get_body(&self.measurements_url(sensor_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_urls() {
        let client = GiosClient::new("https://api.gios.gov.pl/pjp-api/rest/");

        assert_eq!(
            client.stations_url(),
            "https://api.gios.gov.pl/pjp-api/rest/station/findAll"
        );
        assert_eq!(
            client.sensors_url(114),
            "https://api.gios.gov.pl/pjp-api/rest/station/sensors/114"
        );
        assert_eq!(
            client.measurements_url(642),
            "https://api.gios.gov.pl/pjp-api/rest/data/getData/642"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        // Port 9 (discard) on localhost is expected to refuse connections
        let client = GiosClient::new("http://127.0.0.1:9");
        let err = client.fetch_stations().await.unwrap_err();
        match err {
            AirQualityError::Transport { target, .. } => {
                assert_eq!(target, "http://127.0.0.1:9/station/findAll")
            }
            other => panic!("expected transport error, got {}", other),
        }
    }
}
