// Measurement export to JSON and semicolon-delimited CSV
use crate::domain::error::AirQualityError;
use crate::domain::measurement::MeasurementSeries;
use serde::Serialize;
use std::path::{Path, PathBuf};

const CSV_HEADER: &str = "Date;Value";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedFiles {
    pub parameter: String,
    pub json: PathBuf,
    pub csv: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Exporter {
    dir: PathBuf,
}

impl Exporter {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn file_stem(parameter: &str, station_id: i64) -> String {
        format!("measurement_{}_station_{}", parameter, station_id)
    }

    /// Writes both files for one (parameter, station) pair.
    pub async fn export(
        &self,
        station_id: i64,
        series: &MeasurementSeries,
    ) -> Result<ExportedFiles, AirQualityError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AirQualityError::file_io(&self.dir, e))?;

        let stem = Self::file_stem(&series.parameter, station_id);
        let json = self.dir.join(format!("{}.json", stem));
        let csv = self.dir.join(format!("{}.csv", stem));

        let body = serde_json::to_vec_pretty(&series.source)?;
        tokio::fs::write(&json, body)
            .await
            .map_err(|e| AirQualityError::file_io(&json, e))?;

        tokio::fs::write(&csv, csv_contents(series))
            .await
            .map_err(|e| AirQualityError::file_io(&csv, e))?;

        tracing::info!(
            "Exported {} for station {} to {} and {}",
            series.parameter,
            station_id,
            json.display(),
            csv.display()
        );

        Ok(ExportedFiles {
            parameter: series.parameter.clone(),
            json,
            csv,
        })
    }
}

/// Header plus one `date;value` line per reading; gaps are left out.
pub fn csv_contents(series: &MeasurementSeries) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for (date, value) in series.present_points() {
        out.push_str(&format!("{};{}\n", date, value));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payload::{self, Payload};

    const PM10_BODY: &str = r#"{"key": "PM10", "values": [
        {"date": "2023-10-01 03:00:00", "value": 31.5},
        {"date": "2023-10-01 02:00:00", "value": null},
        {"date": "2023-10-01 01:00:00", "value": 20.0}
    ]}"#;

    fn pm10() -> MeasurementSeries {
        match payload::parse(PM10_BODY).unwrap() {
            Payload::MeasurementSeries(series) => series,
            other => panic!("expected measurement series, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_csv_contents() {
        assert_eq!(
            csv_contents(&pm10()),
            "Date;Value\n2023-10-01 03:00:00;31.5\n2023-10-01 01:00:00;20\n"
        );
    }

    #[tokio::test]
    async fn test_export_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(dir.path());
        let series = pm10();

        let files = exporter.export(114, &series).await.unwrap();
        assert_eq!(files.json, dir.path().join("measurement_PM10_station_114.json"));
        assert_eq!(files.csv, dir.path().join("measurement_PM10_station_114.csv"));

        // CSV data lines match the non-null readings of the source JSON
        let csv = tokio::fs::read_to_string(&files.csv).await.unwrap();
        let data_lines = csv.lines().skip(1).count();
        let reparsed: serde_json::Value = serde_json::from_str(PM10_BODY).unwrap();
        let non_null = reparsed["values"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|v| !v["value"].is_null())
            .count();
        assert_eq!(data_lines, non_null);

        let json = tokio::fs::read_to_string(&files.json).await.unwrap();
        let written: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(written, reparsed);
    }

    #[tokio::test]
    async fn test_export_keeps_source_key_order() {
        let body = r#"{"values": [{"value": 12.0, "date": "2023-10-01 01:00:00"}], "key": "NO2"}"#;
        let series = match payload::parse(body).unwrap() {
            Payload::MeasurementSeries(series) => series,
            other => panic!("expected measurement series, got {:?}", other.kind()),
        };

        let dir = tempfile::tempdir().unwrap();
        let files = Exporter::new(dir.path()).export(7, &series).await.unwrap();
        let json = tokio::fs::read_to_string(&files.json).await.unwrap();

        let position = |needle: &str| json.find(needle).unwrap();
        assert!(position("\"values\"") < position("\"key\""));
        assert!(position("\"value\"") < position("\"date\""));
    }

    #[tokio::test]
    async fn test_export_failure_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("exports");
        std::fs::write(&blocker, "a file, not a directory").unwrap();

        let err = Exporter::new(&blocker).export(1, &pm10()).await.unwrap_err();
        match err {
            AirQualityError::FileIo { path, .. } => assert_eq!(path, blocker),
            other => panic!("expected file error, got {}", other),
        }
    }
}
