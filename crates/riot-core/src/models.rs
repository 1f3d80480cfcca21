//! Fleet data as served by the backend's `/api/data` endpoint.
//!
//! Field names follow the backend's camelCase JSON. The client never
//! re-derives `status` or `alert`; both are computed server-side.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Alert substring the backend sets when an animal leaves its herd's polygon.
pub const OUT_OF_AREA_MARKER: &str = "Fora da área designada";

/// Health status, encoded by the backend as 0, 1 or 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AnimalStatus {
    Healthy,
    Warning,
    Danger,
}

impl AnimalStatus {
    pub fn all() -> [AnimalStatus; 3] {
        [AnimalStatus::Healthy, AnimalStatus::Warning, AnimalStatus::Danger]
    }

    /// Label shown to the user and used in the AI context
    pub fn label(&self) -> &'static str {
        match self {
            AnimalStatus::Healthy => "Saudável",
            AnimalStatus::Warning => "Alerta",
            AnimalStatus::Danger => "Perigo",
        }
    }
}

impl TryFrom<u8> for AnimalStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AnimalStatus::Healthy),
            1 => Ok(AnimalStatus::Warning),
            2 => Ok(AnimalStatus::Danger),
            other => Err(format!("unknown animal status {}", other)),
        }
    }
}

impl From<AnimalStatus> for u8 {
    fn from(status: AnimalStatus) -> Self {
        match status {
            AnimalStatus::Healthy => 0,
            AnimalStatus::Warning => 1,
            AnimalStatus::Danger => 2,
        }
    }
}

/// Animal category as labelled by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AnimalKind {
    Cow,
    Bull,
    Calf,
    Other(String),
}

impl From<String> for AnimalKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Vaca" => AnimalKind::Cow,
            "Touro" => AnimalKind::Bull,
            "Bezerro" => AnimalKind::Calf,
            _ => AnimalKind::Other(s),
        }
    }
}

impl From<AnimalKind> for String {
    fn from(kind: AnimalKind) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for AnimalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnimalKind::Cow => f.write_str("Vaca"),
            AnimalKind::Bull => f.write_str("Touro"),
            AnimalKind::Calf => f.write_str("Bezerro"),
            AnimalKind::Other(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

/// One past day of an animal's telemetry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimalHistoryRecord {
    pub date: String,
    pub status: AnimalStatus,
    pub location: Location,
    pub temperature: f64,
    pub steps: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Animal {
    pub id: u32,
    pub collar_id: String,
    pub herd_id: u32,
    pub name: String,
    pub status: AnimalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert: Option<String>,
    pub location: Location,
    pub temperature: f64,
    pub steps: u32,
    #[serde(rename = "type")]
    pub kind: AnimalKind,
    pub breed: String,
    /// Age in months
    pub age: u32,
    /// Weight in kg
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<AnimalHistoryRecord>>,
}

impl Animal {
    /// True when the backend flagged this animal as outside its designated area.
    ///
    /// Literal substring match on the alert text, case-sensitive.
    pub fn is_out_of_area(&self) -> bool {
        self.alert
            .as_deref()
            .map(|alert| alert.contains(OUT_OF_AREA_MARKER))
            .unwrap_or(false)
    }

    pub fn history(&self) -> &[AnimalHistoryRecord] {
        self.history.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Herd {
    pub id: u32,
    pub name: String,
    pub region: String,
    /// Representative center point
    pub location: Location,
    #[serde(default)]
    pub polygon: Vec<Location>,
}

impl Herd {
    /// Name without the "Rebanho " prefix and any parenthesized suffix
    pub fn short_name(&self) -> &str {
        let name = self.name.strip_prefix("Rebanho ").unwrap_or(&self.name);
        match name.find(" (") {
            Some(idx) if name.ends_with(')') => &name[..idx],
            _ => name,
        }
    }

    /// A polygon needs at least three vertices to enclose an area
    pub fn has_designated_area(&self) -> bool {
        self.polygon.len() >= 3
    }
}

/// Animals and herds from one poll cycle, always replaced together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub animals: Vec<Animal>,
    pub herds: Vec<Herd>,
}

impl Snapshot {
    pub fn animal(&self, id: u32) -> Option<&Animal> {
        self.animals.iter().find(|a| a.id == id)
    }

    pub fn herd(&self, id: u32) -> Option<&Herd> {
        self.herds.iter().find(|h| h.id == id)
    }
}

/// Device coordinates used to bias the AI's map grounding
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    pub latitude: f64,
    pub longitude: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANIMAL_JSON: &str = r#"{
        "id": 7,
        "collarId": "COL-007",
        "herdId": 2,
        "name": "Mimosa",
        "status": 2,
        "alert": "Temperatura elevada; Fora da área designada",
        "location": {"lat": -22.1, "lng": -47.9},
        "temperature": 40.2,
        "steps": 1200,
        "type": "Vaca",
        "breed": "Nelore",
        "age": 36,
        "weight": 450.5
    }"#;

    #[test]
    fn test_animal_decodes_backend_shape() {
        let animal: Animal = serde_json::from_str(ANIMAL_JSON).unwrap();
        assert_eq!(animal.collar_id, "COL-007");
        assert_eq!(animal.herd_id, 2);
        assert_eq!(animal.status, AnimalStatus::Danger);
        assert_eq!(animal.kind, AnimalKind::Cow);
        assert!(animal.history.is_none());
        assert!(animal.history().is_empty());
        assert!(animal.is_out_of_area());
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let json = ANIMAL_JSON.replace("\"status\": 2", "\"status\": 9");
        assert!(serde_json::from_str::<Animal>(&json).is_err());
    }

    #[test]
    fn test_unknown_kind_is_kept() {
        let json = ANIMAL_JSON.replace("\"Vaca\"", "\"Novilha\"");
        let animal: Animal = serde_json::from_str(&json).unwrap();
        assert_eq!(animal.kind, AnimalKind::Other("Novilha".to_string()));
        assert_eq!(animal.kind.to_string(), "Novilha");
    }

    #[test]
    fn test_out_of_area_is_case_sensitive() {
        let mut animal: Animal = serde_json::from_str(ANIMAL_JSON).unwrap();
        animal.alert = Some("fora da área designada".to_string());
        assert!(!animal.is_out_of_area());
        animal.alert = Some("Fora da área".to_string());
        assert!(!animal.is_out_of_area());
        animal.alert = None;
        assert!(!animal.is_out_of_area());
    }

    #[test]
    fn test_herd_short_name() {
        let herd = Herd {
            id: 1,
            name: "Rebanho Norte (Pasto 3)".to_string(),
            region: "Norte".to_string(),
            location: Location { lat: 0.0, lng: 0.0 },
            polygon: Vec::new(),
        };
        assert_eq!(herd.short_name(), "Norte");
        assert!(!herd.has_designated_area());
    }

    #[test]
    fn test_herd_without_polygon_field() {
        let json = r#"{"id": 1, "name": "Sul", "region": "R", "location": {"lat": 1.0, "lng": 2.0}}"#;
        let herd: Herd = serde_json::from_str(json).unwrap();
        assert!(herd.polygon.is_empty());
        assert_eq!(herd.short_name(), "Sul");
    }
}
