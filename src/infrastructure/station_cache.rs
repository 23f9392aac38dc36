// On-disk station list cache
use crate::domain::error::AirQualityError;
use crate::domain::payload::{self, Payload};
use crate::domain::station::Station;
use std::path::{Path, PathBuf};

const CACHE_FILE: &str = "stations.json";

/// The station list as last fetched. Only a station-list reply writes here.
#[derive(Debug, Clone)]
pub struct StationCache {
    path: PathBuf,
}

impl StationCache {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(CACHE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn store(&self, stations: &[Station]) -> Result<(), AirQualityError> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| AirQualityError::file_io(dir, e))?;
        }

        let body = serde_json::to_vec_pretty(stations)?;
        tokio::fs::write(&self.path, body)
            .await
            .map_err(|e| AirQualityError::file_io(&self.path, e))?;

        tracing::debug!("Cached {} stations in {}", stations.len(), self.path.display());
        Ok(())
    }

    /// Reads the cache back through the response classifier.
    pub async fn load(&self) -> Result<Vec<Station>, AirQualityError> {
        let body = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| AirQualityError::file_io(&self.path, e))?;

        match payload::parse(&body)? {
            Payload::StationList(stations) => Ok(stations),
            // An empty array carries no shape to tell it apart
            Payload::SensorList(sensors) if sensors.is_empty() => Ok(Vec::new()),
            other => Err(AirQualityError::Classification(format!(
                "{} does not hold a station list (found {})",
                self.path.display(),
                other.kind()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stations() -> Vec<Station> {
        serde_json::from_str(
            r#"[
                {"stationName": "Stacja Warszawa", "id": 1, "city": {"name": "Warszawa", "commune": {"provinceName": "MAZOWIECKIE", "districtName": "Warszawa"}}},
                {"stationName": "Stacja Kraków", "id": 2, "city": {"name": "Kraków"}}
            ]"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_store_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = StationCache::new(dir.path().join("nested"));

        cache.store(&stations()).await.unwrap();
        let loaded = cache.load().await.unwrap();

        assert_eq!(loaded, stations());
        assert_eq!(loaded[0].province_name(), "MAZOWIECKIE");
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = StationCache::new(dir.path());

        assert!(matches!(cache.load().await, Err(AirQualityError::FileIo { .. })));
    }

    #[tokio::test]
    async fn test_load_rejects_other_payloads() {
        let dir = tempfile::tempdir().unwrap();
        let cache = StationCache::new(dir.path());

        tokio::fs::write(cache.path(), r#"{"key": "PM10", "values": []}"#)
            .await
            .unwrap();
        assert!(matches!(
            cache.load().await,
            Err(AirQualityError::Classification(_))
        ));

        tokio::fs::write(cache.path(), "not json").await.unwrap();
        assert!(matches!(cache.load().await, Err(AirQualityError::Parse(_))));

        tokio::fs::write(cache.path(), "[]").await.unwrap();
        assert!(cache.load().await.unwrap().is_empty());
    }
}
