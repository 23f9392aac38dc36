// Response classifier - turns a raw API body into a typed payload
use crate::domain::error::AirQualityError;
use crate::domain::measurement::MeasurementSeries;
use crate::domain::sensor::Sensor;
use crate::domain::station::Station;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Semantic kind of a decoded API response
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    StationList(Vec<Station>),
    SensorList(Vec<Sensor>),
    MeasurementSeries(MeasurementSeries),
    /// Valid JSON of no known shape; the reason says what was seen
    Unknown(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    StationList,
    SensorList,
    MeasurementSeries,
    Unknown,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PayloadKind::StationList => "station list",
            PayloadKind::SensorList => "sensor list",
            PayloadKind::MeasurementSeries => "measurement series",
            PayloadKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::StationList(_) => PayloadKind::StationList,
            Payload::SensorList(_) => PayloadKind::SensorList,
            Payload::MeasurementSeries(_) => PayloadKind::MeasurementSeries,
            Payload::Unknown(_) => PayloadKind::Unknown,
        }
    }
}

/// Decode and classify a response body. Malformed JSON is rejected
/// before any classification happens.
pub fn parse(body: &str) -> Result<Payload, AirQualityError> {
    let value: Value = serde_json::from_str(body)?;
    Ok(classify(value))
}

pub fn classify(value: Value) -> Payload {
    match value {
        Value::Array(items) => classify_array(items),
        Value::Object(fields) if fields.get("values").is_some_and(Value::is_array) => {
            match MeasurementSeries::from_value(Value::Object(fields)) {
                Ok(series) => Payload::MeasurementSeries(series),
                Err(e) => Payload::Unknown(format!("malformed measurement series: {}", e)),
            }
        }
        Value::Object(_) => Payload::Unknown("object without a values array".to_string()),
        other => Payload::Unknown(format!("unexpected top-level {}", json_type(&other))),
    }
}

// Both lists are arrays, so the element shape decides.
fn classify_array(items: Vec<Value>) -> Payload {
    if items.is_empty() {
        return Payload::SensorList(Vec::new());
    }

    if items.iter().all(is_station_shaped) {
        return decode_list(items, Payload::StationList, "station list");
    }

    if items
        .iter()
        .all(|item| is_sensor_shaped(item) && !is_station_shaped(item))
    {
        return decode_list(items, Payload::SensorList, "sensor list");
    }

    Payload::Unknown(format!(
        "array of {} elements matching neither stations nor sensors",
        items.len()
    ))
}

fn decode_list<T>(items: Vec<Value>, wrap: fn(Vec<T>) -> Payload, what: &str) -> Payload
where
    T: for<'de> Deserialize<'de>,
{
    match Vec::<T>::deserialize(Value::Array(items)) {
        Ok(list) => wrap(list),
        Err(e) => Payload::Unknown(format!("malformed {}: {}", what, e)),
    }
}

fn is_station_shaped(item: &Value) -> bool {
    item.get("stationName").is_some()
}

fn is_sensor_shaped(item: &Value) -> bool {
    item.get("param")
        .and_then(|p| p.get("paramCode"))
        .is_some()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
