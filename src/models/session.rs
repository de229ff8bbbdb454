use serde::Serialize;
use serde_json::{Map, Value};

use crate::models::table::Table;

/// A session resolved by the provider but not yet loaded. The display name
/// decides the handler branch: practice sessions are served as grouped laps,
/// everything else as a results table.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    pub session_key: i64,
    pub meeting_key: i64,
    pub name: String,
    pub year: i32,
    pub country: String,
    pub circuit: String,
}

impl SessionInfo {
    pub fn is_practice(&self) -> bool {
        self.name.contains("Practice")
    }
}

/// Tables populated by the provider's load step. Either table may be absent
/// when the provider has nothing for that session.
#[derive(Debug, Clone, Default)]
pub struct SessionData {
    pub laps: Option<Table>,
    pub results: Option<Table>,
}

#[derive(Debug, Serialize)]
pub struct DriverStints {
    #[serde(rename = "Driver")]
    pub driver: String,
    #[serde(rename = "DriverNumber")]
    pub driver_number: String,
    #[serde(rename = "Team")]
    pub team: String,
    #[serde(rename = "Stints")]
    pub stints: Vec<StintLaps>,
}

#[derive(Debug, Serialize)]
pub struct StintLaps {
    // Stint numbers arrive float-typed from the source data and are kept
    // that way in the response.
    #[serde(rename = "Stint")]
    pub stint: f64,
    #[serde(rename = "Laps")]
    pub laps: Vec<Map<String, Value>>,
}
