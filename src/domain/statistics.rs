// Descriptive statistics over a measurement series
//
// Only present values take part; a missing reading is never read as zero.
use crate::domain::measurement::MeasurementSeries;
use serde::Serialize;
use std::fmt;

/// The one parameter with an exceedance rule
pub const EXCEEDANCE_PARAMETER: &str = "PM10";
/// µg/m³; a reading counts only when strictly above it
pub const EXCEEDANCE_THRESHOLD: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extrema {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Exceedance {
    pub threshold: f64,
    pub count: usize,
    /// `None` when the series has no readings at all
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

impl Trend {
    pub fn from_slope(slope: f64) -> Self {
        if slope > 0.0 {
            Trend::Increasing
        } else if slope < 0.0 {
            Trend::Decreasing
        } else {
            Trend::Stable
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Trend::Increasing => "increasing",
            Trend::Decreasing => "decreasing",
            Trend::Stable => "stable",
        };
        f.write_str(label)
    }
}

pub fn extrema(series: &MeasurementSeries) -> Option<Extrema> {
    let mut values = series.present_values();
    let first = values.next()?;

    let (mut min, mut max, mut sum, mut count) = (first, first, first, 1usize);
    for value in values {
        min = min.min(value);
        max = max.max(value);
        sum += value;
        count += 1;
    }

    Some(Extrema {
        min,
        max,
        mean: sum / count as f64,
        count,
    })
}

/// Threshold exceedances; `None` for parameters without a threshold.
pub fn exceedance(series: &MeasurementSeries, parameter: &str) -> Option<Exceedance> {
    if parameter != EXCEEDANCE_PARAMETER {
        return None;
    }

    let (present, count) = series
        .present_values()
        .fold((0usize, 0usize), |(present, count), value| {
            (present + 1, count + usize::from(value > EXCEEDANCE_THRESHOLD))
        });

    let percentage = (present > 0).then(|| 100.0 * count as f64 / present as f64);

    Some(Exceedance {
        threshold: EXCEEDANCE_THRESHOLD,
        count,
        percentage,
    })
}

/// Least-squares slope of value against the position among present
/// readings (gaps do not consume an index). Zero when undetermined.
pub fn trend_slope(series: &MeasurementSeries) -> f64 {
    let values: Vec<f64> = series.present_values().collect();
    let Some(&first) = values.first() else {
        return 0.0;
    };
    // A flat series must come out exactly flat, rounding noise included
    if values.len() < 2 || values.iter().all(|&v| v == first) {
        return 0.0;
    }

    let n = values.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;

    let (mut covariance, mut variance) = (0.0, 0.0);
    for (index, y) in values.iter().enumerate() {
        let dx = index as f64 - mean_x;
        covariance += dx * (y - mean_y);
        variance += dx * dx;
    }

    if variance == 0.0 {
        return 0.0;
    }
    covariance / variance
}

pub fn trend(series: &MeasurementSeries) -> Trend {
    Trend::from_slope(trend_slope(series))
}

/// Everything the analysis view shows for one parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesAnalysis {
    pub parameter: String,
    pub extrema: Option<Extrema>,
    pub exceedance: Option<Exceedance>,
    pub slope: f64,
    pub trend: Trend,
}

pub fn analyze(series: &MeasurementSeries, parameter: &str) -> SeriesAnalysis {
    let slope = trend_slope(series);
    SeriesAnalysis {
        parameter: parameter.to_string(),
        extrema: extrema(series),
        exceedance: exceedance(series, parameter),
        slope,
        trend: Trend::from_slope(slope),
    }
}

impl SeriesAnalysis {
    pub fn report(&self) -> String {
        let Some(extrema) = self.extrema else {
            return format!("No measurement data available for {}.\n", self.parameter);
        };

        let mut text = format!(
            "Analysis for parameter: {}\n\
             Number of readings: {}\n\
             Minimum: {:.2} µg/m³\n\
             Maximum: {:.2} µg/m³\n\
             Average: {:.2} µg/m³\n",
            self.parameter, extrema.count, extrema.min, extrema.max, extrema.mean
        );

        if let Some(exceedance) = self.exceedance {
            text.push_str(&format!(
                "Readings above {} µg/m³: {}\n",
                exceedance.threshold, exceedance.count
            ));
            if let Some(percentage) = exceedance.percentage {
                text.push_str(&format!("Share of readings above threshold: {:.2}%\n", percentage));
            }
        }

        text.push_str(&format!("Trend: {}\n", self.trend));
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::measurement::MeasurementPoint;

    fn series(parameter: &str, values: &[Option<f64>]) -> MeasurementSeries {
        let points = values
            .iter()
            .enumerate()
            .map(|(i, v)| MeasurementPoint::new(format!("2023-10-{:02}", i + 1), *v))
            .collect();
        MeasurementSeries::new(parameter, points)
    }

    #[test]
    fn test_pm10_extrema_and_exceedance() {
        let s = series("PM10", &[Some(20.0), Some(30.0), Some(25.0)]);

        let e = extrema(&s).unwrap();
        assert_eq!(e.min, 20.0);
        assert_eq!(e.max, 30.0);
        assert_eq!(e.mean, 25.0);
        assert_eq!(e.count, 3);

        // 25.0 sits on the threshold and does not count
        let x = exceedance(&s, "PM10").unwrap();
        assert_eq!(x.count, 1);
        let pct = x.percentage.unwrap();
        assert!((pct - 33.333).abs() < 0.01);
        assert_eq!(format!("{:.2}", pct), "33.33");
    }

    #[test]
    fn test_no_data() {
        let s = series("PM10", &[None, None]);

        assert!(extrema(&s).is_none());
        let x = exceedance(&s, "PM10").unwrap();
        assert_eq!(x.count, 0);
        assert!(x.percentage.is_none());
        assert_eq!(trend(&s), Trend::Stable);
        assert_eq!(
            analyze(&s, "PM10").report(),
            "No measurement data available for PM10.\n"
        );
    }

    #[test]
    fn test_exceedance_only_for_pm10() {
        let s = series("NO2", &[Some(100.0)]);
        assert!(exceedance(&s, "NO2").is_none());
        assert!(exceedance(&s, "PM2.5").is_none());
    }

    #[test]
    fn test_trend() {
        let rising = series("PM10", &[Some(10.0), Some(20.0), Some(30.0)]);
        assert_eq!(trend_slope(&rising), 10.0);
        assert_eq!(trend(&rising), Trend::Increasing);

        let flat = series("PM10", &[Some(10.0), Some(10.0), Some(10.0)]);
        assert_eq!(trend_slope(&flat), 0.0);
        assert_eq!(trend(&flat), Trend::Stable);

        let single = series("PM10", &[None, Some(42.0), None]);
        assert_eq!(trend_slope(&single), 0.0);
        assert_eq!(trend(&single), Trend::Stable);

        let falling = series("PM10", &[Some(30.0), Some(12.0)]);
        assert_eq!(trend(&falling), Trend::Decreasing);
    }

    #[test]
    fn test_constant_fractional_series_is_stable() {
        for (value, len) in [(0.3, 24), (0.1, 10), (0.7, 5)] {
            let flat = series("PM2.5", &vec![Some(value); len]);
            assert_eq!(trend_slope(&flat), 0.0, "{} x {}", value, len);
            assert_eq!(trend(&flat), Trend::Stable);
        }
    }

    #[test]
    fn test_trend_ignores_gap_positions() {
        // Indexed by present readings: 0 -> 10, 1 -> 20, 2 -> 30
        let gappy = series("PM10", &[Some(10.0), None, None, Some(20.0), None, Some(30.0)]);
        assert_eq!(trend_slope(&gappy), 10.0);
    }

    #[test]
    fn test_report() {
        let s = series("PM10", &[Some(20.0), Some(30.0), Some(25.0)]);
        let report = analyze(&s, "PM10").report();

        assert!(report.contains("Analysis for parameter: PM10\n"));
        assert!(report.contains("Number of readings: 3\n"));
        assert!(report.contains("Minimum: 20.00 µg/m³\n"));
        assert!(report.contains("Maximum: 30.00 µg/m³\n"));
        assert!(report.contains("Average: 25.00 µg/m³\n"));
        assert!(report.contains("Readings above 25 µg/m³: 1\n"));
        assert!(report.contains("Share of readings above threshold: 33.33%\n"));
        assert!(report.ends_with("Trend: increasing\n"));

        let no2 = analyze(&series("NO2", &[Some(5.0)]), "NO2").report();
        assert!(!no2.contains("Readings above"));
        assert!(no2.ends_with("Trend: stable\n"));
    }
}
