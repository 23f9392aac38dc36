// Sensor domain model
use serde::{Deserialize, Serialize};

/// One pollutant-measuring instrument at a station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sensor {
    pub id: i64,
    #[serde(default)]
    pub station_id: i64,
    pub param: SensorParam,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorParam {
    pub param_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param_formula: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_param: Option<i64>,
}

impl Sensor {
    pub fn parameter_code(&self) -> &str {
        &self.param.param_code
    }
}
