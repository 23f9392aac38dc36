// Station domain model
use serde::{Deserialize, Serialize};

/// A monitoring station as published by the station list endpoint.
///
/// Field names follow the wire format so the same struct serves the
/// on-disk station cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: i64,
    #[serde(rename = "stationName")]
    pub name: String,
    #[serde(default, rename = "gegrLat", skip_serializing_if = "Option::is_none")]
    pub latitude: Option<String>,
    #[serde(default, rename = "gegrLon", skip_serializing_if = "Option::is_none")]
    pub longitude: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<City>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_street: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct City {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commune: Option<Commune>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commune {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commune_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province_name: Option<String>,
}

impl Station {
    pub fn city_name(&self) -> &str {
        self.city.as_ref().map(|c| c.name.as_str()).unwrap_or("")
    }

    pub fn province_name(&self) -> &str {
        self.commune()
            .and_then(|c| c.province_name.as_deref())
            .unwrap_or("")
    }

    pub fn district_name(&self) -> &str {
        self.commune()
            .and_then(|c| c.district_name.as_deref())
            .unwrap_or("")
    }

    fn commune(&self) -> Option<&Commune> {
        self.city.as_ref().and_then(|c| c.commune.as_ref())
    }

    /// Multi-line description shown when a station is picked
    pub fn details(&self) -> String {
        format!(
            "Name: {}\nID: {}\nCity: {}\nProvince: {}\nDistrict: {}\n",
            self.name,
            self.id,
            self.city_name(),
            self.province_name(),
            self.district_name()
        )
    }
}

/// Stations whose city name contains `query`, ignoring case.
/// An empty query keeps every station.
pub fn filter_by_city<'a>(stations: &'a [Station], query: &str) -> Vec<&'a Station> {
    let needle = query.trim().to_lowercase();
    stations
        .iter()
        .filter(|s| needle.is_empty() || s.city_name().to_lowercase().contains(&needle))
        .collect()
}
