// Measurement series domain model
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Number of present-value points quoted in a series excerpt
pub const EXCERPT_POINTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementPoint {
    pub date: String,
    /// `None` when the source reports no reading for this timestamp
    #[serde(default)]
    pub value: Option<f64>,
}

impl MeasurementPoint {
    pub fn new(date: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            date: date.into(),
            value,
        }
    }
}

#[derive(Deserialize)]
struct SeriesWire {
    #[serde(default)]
    key: String,
    values: Vec<MeasurementPoint>,
}

/// A per-parameter series, in the order the API delivered it.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementSeries {
    pub parameter: String,
    pub points: Vec<MeasurementPoint>,
    /// Decoded source object, kept for verbatim export
    pub source: Value,
}

impl MeasurementSeries {
    pub fn from_value(source: Value) -> Result<Self, serde_json::Error> {
        let wire = SeriesWire::deserialize(&source)?;
        Ok(Self {
            parameter: wire.key,
            points: wire.values,
            source,
        })
    }

    /// Builds a series from points, synthesising the matching source object.
    pub fn new(parameter: impl Into<String>, points: Vec<MeasurementPoint>) -> Self {
        let parameter = parameter.into();
        let source = serde_json::json!({ "key": parameter, "values": points });
        Self {
            parameter,
            points,
            source,
        }
    }

    /// Points that carry a reading, as (timestamp, value)
    pub fn present_points(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.points
            .iter()
            .filter_map(|p| p.value.map(|v| (p.date.as_str(), v)))
    }

    pub fn present_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().filter_map(|p| p.value)
    }

    pub fn present_count(&self) -> usize {
        self.present_values().count()
    }

    /// Short human-readable preview: the first few readings or "no data".
    pub fn excerpt(&self) -> String {
        let mut text = format!("• {}:\n", self.parameter);
        let mut quoted = 0;
        for (date, value) in self.present_points().take(EXCERPT_POINTS) {
            text.push_str(&format!("  {} → {} µg/m³\n", date, value));
            quoted += 1;
        }
        if quoted == 0 {
            text.push_str("  no data\n");
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pm10_with_gaps() -> MeasurementSeries {
        MeasurementSeries::new(
            "PM10",
            vec![
                MeasurementPoint::new("2023-10-01 10:00:00", None),
                MeasurementPoint::new("2023-10-01 11:00:00", Some(20.0)),
                MeasurementPoint::new("2023-10-01 12:00:00", Some(30.5)),
                MeasurementPoint::new("2023-10-01 13:00:00", None),
                MeasurementPoint::new("2023-10-01 14:00:00", Some(25.0)),
                MeasurementPoint::new("2023-10-01 15:00:00", Some(40.0)),
            ],
        )
    }

    #[test]
    fn test_present_values_skip_gaps() {
        let series = pm10_with_gaps();
        assert_eq!(series.present_count(), 4);
        assert_eq!(
            series.present_values().collect::<Vec<_>>(),
            vec![20.0, 30.5, 25.0, 40.0]
        );
    }

    #[test]
    fn test_excerpt_quotes_first_three_readings() {
        let excerpt = pm10_with_gaps().excerpt();
        assert_eq!(
            excerpt,
            "• PM10:\n  2023-10-01 11:00:00 → 20 µg/m³\n  2023-10-01 12:00:00 → 30.5 µg/m³\n  2023-10-01 14:00:00 → 25 µg/m³\n"
        );
    }

    #[test]
    fn test_excerpt_without_readings() {
        let series = MeasurementSeries::new(
            "NO2",
            vec![MeasurementPoint::new("2023-10-01 10:00:00", None)],
        );
        assert_eq!(series.excerpt(), "• NO2:\n  no data\n");
    }

    #[test]
    fn test_from_value_keeps_source() {
        let source = serde_json::json!({
            "key": "PM10",
            "values": [
                {"date": "2023-10-01", "value": 25.0},
                {"date": "2023-10-02", "value": null}
            ]
        });
        let series = MeasurementSeries::from_value(source.clone()).unwrap();

        assert_eq!(series.parameter, "PM10");
        assert_eq!(series.points.len(), 2);
        assert_eq!(series.points[1].value, None);
        assert_eq!(series.source, source);
    }
}
