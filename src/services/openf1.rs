use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::models::session::{SessionData, SessionInfo};
use crate::models::table::{CellValue, Table};
use crate::services::cache::ResponseCache;
use crate::services::{ProviderError, SessionProvider};
use crate::utils::config::Config;

/// Session data client backed by the OpenF1 REST API. Resolves sessions
/// from the per-year session index, then assembles the lap table (laps
/// joined with stints and drivers) and the results table from the
/// session-scoped endpoints, caching each raw response on disk.
pub struct OpenF1Provider {
    http: reqwest::Client,
    base_url: String,
    cache: ResponseCache,
}

#[derive(Debug, Deserialize)]
pub struct SessionRow {
    pub session_key: i64,
    pub meeting_key: i64,
    pub session_name: String,
    pub country_name: Option<String>,
    pub circuit_short_name: Option<String>,
    pub location: Option<String>,
    pub year: i32,
}

#[derive(Debug, Deserialize)]
pub struct LapRow {
    pub driver_number: i64,
    pub lap_number: i64,
    pub lap_duration: Option<f64>,
    pub duration_sector_1: Option<f64>,
    pub duration_sector_2: Option<f64>,
    pub duration_sector_3: Option<f64>,
    pub i1_speed: Option<i64>,
    pub i2_speed: Option<i64>,
    pub st_speed: Option<i64>,
    pub is_pit_out_lap: Option<bool>,
    pub date_start: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StintRow {
    pub driver_number: i64,
    pub stint_number: i64,
    pub lap_start: Option<i64>,
    pub lap_end: Option<i64>,
    pub compound: Option<String>,
    pub tyre_age_at_start: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct DriverRow {
    pub driver_number: i64,
    pub name_acronym: Option<String>,
    pub full_name: Option<String>,
    pub team_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResultRow {
    pub position: Option<i64>,
    pub driver_number: i64,
    pub number_of_laps: Option<i64>,
    pub points: Option<f64>,
    pub dnf: Option<bool>,
    pub dns: Option<bool>,
    pub dsq: Option<bool>,
    // Scalar seconds for races, an array of per-segment seconds for
    // qualifying-style sessions.
    pub duration: Option<Value>,
    pub gap_to_leader: Option<Value>,
}

pub const LAP_COLUMNS: [&str; 16] = [
    "Driver",
    "DriverNumber",
    "Team",
    "LapNumber",
    "Stint",
    "Compound",
    "TyreLife",
    "LapTime",
    "Sector1Time",
    "Sector2Time",
    "Sector3Time",
    "SpeedI1",
    "SpeedI2",
    "SpeedST",
    "IsPitOutLap",
    "LapStartDate",
];

const RESULT_COLUMNS: [&str; 8] = [
    "Position",
    "DriverNumber",
    "Abbreviation",
    "FullName",
    "TeamName",
    "NumberOfLaps",
    "Points",
    "Status",
];

impl OpenF1Provider {
    pub fn new(config: &Config) -> Self {
        OpenF1Provider {
            http: reqwest::Client::new(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            cache: ResponseCache::new(&config.cache_dir),
        }
    }

    async fn fetch_text(&self, url: &str, endpoint: &str) -> Result<String, ProviderError> {
        debug!("GET {url}");
        let res = self.http.get(url).send().await?;
        if !res.status().is_success() {
            return Err(ProviderError::Status {
                status: res.status().as_u16(),
                endpoint: endpoint.to_string(),
            });
        }
        Ok(res.text().await?)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        url: &str,
        endpoint: &str,
    ) -> Result<Vec<T>, ProviderError> {
        let body = self.fetch_text(url, endpoint).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Session-scoped fetch through the response cache. The body is decoded
    /// before it is cached so a bad payload never gets persisted, and a
    /// cached body that no longer decodes is dropped in favor of a refetch,
    /// which overwrites the entry.
    async fn fetch_cached<T: DeserializeOwned>(
        &self,
        session_key: i64,
        endpoint: &str,
    ) -> Result<Vec<T>, ProviderError> {
        let key = format!("{session_key}_{endpoint}");
        if let Some(body) = self.cache.get(&key).await {
            match serde_json::from_str(&body) {
                Ok(rows) => return Ok(rows),
                Err(err) => warn!("discarding unreadable cache entry {key}: {err}"),
            }
        }
        let url = format!("{}/{endpoint}?session_key={session_key}", self.base_url);
        let body = self.fetch_text(&url, endpoint).await?;
        let rows = serde_json::from_str(&body)?;
        self.cache.put(&key, &body).await;
        Ok(rows)
    }
}

#[async_trait]
impl SessionProvider for OpenF1Provider {
    async fn get_session(
        &self,
        year: i32,
        gp: &str,
        session: &str,
    ) -> Result<SessionInfo, ProviderError> {
        let url = format!("{}/sessions?year={year}", self.base_url);
        let rows: Vec<SessionRow> = self.fetch(&url, "sessions").await?;
        let row = find_session(&rows, gp, session).ok_or_else(|| {
            ProviderError::SessionNotFound {
                year,
                gp: gp.to_string(),
                session: session.to_string(),
            }
        })?;
        Ok(SessionInfo {
            session_key: row.session_key,
            meeting_key: row.meeting_key,
            name: row.session_name.clone(),
            year: row.year,
            country: row.country_name.clone().unwrap_or_default(),
            circuit: row.circuit_short_name.clone().unwrap_or_default(),
        })
    }

    async fn load(&self, session: &SessionInfo) -> Result<SessionData, ProviderError> {
        info!(
            "loading {} {} ({}, {}) session_key={} meeting_key={}",
            session.year,
            session.name,
            session.circuit,
            session.country,
            session.session_key,
            session.meeting_key
        );
        let laps: Vec<LapRow> = self.fetch_cached(session.session_key, "laps").await?;
        let stints: Vec<StintRow> = self.fetch_cached(session.session_key, "stints").await?;
        let drivers: Vec<DriverRow> = self.fetch_cached(session.session_key, "drivers").await?;
        let results: Vec<ResultRow> = self
            .fetch_cached(session.session_key, "session_result")
            .await?;
        info!(
            "loaded session {}: {} laps, {} classified rows",
            session.session_key,
            laps.len(),
            results.len()
        );
        Ok(SessionData {
            laps: Some(build_lap_table(&laps, &stints, &drivers)),
            results: Some(build_results_table(&results, &drivers, &session.name)),
        })
    }
}

/// Maps a request session code to the provider's session display name.
/// Accepts the short codes (FP1, Q, SQ, S, R) and the numeric session
/// identifiers 1 through 5; full names are matched directly by the caller.
pub fn resolve_session_name(code: &str) -> Option<&'static str> {
    match code.trim().to_ascii_uppercase().as_str() {
        "FP1" | "1" => Some("Practice 1"),
        "FP2" | "2" => Some("Practice 2"),
        "FP3" | "3" => Some("Practice 3"),
        "Q" | "4" => Some("Qualifying"),
        "SQ" => Some("Sprint Qualifying"),
        "S" => Some("Sprint"),
        "R" | "5" => Some("Race"),
        _ => None,
    }
}

fn matches_gp(row: &SessionRow, gp: &str) -> bool {
    let gp = gp.trim();
    [&row.country_name, &row.circuit_short_name, &row.location]
        .iter()
        .any(|field| {
            field
                .as_deref()
                .is_some_and(|value| value.eq_ignore_ascii_case(gp))
        })
}

fn matches_session(row: &SessionRow, session: &str) -> bool {
    if row.session_name.eq_ignore_ascii_case(session.trim()) {
        return true;
    }
    resolve_session_name(session).is_some_and(|name| row.session_name == name)
}

/// First session row matching the event and session identifiers; the index
/// is chronological, so the first hit is the right one.
pub fn find_session<'a>(rows: &'a [SessionRow], gp: &str, session: &str) -> Option<&'a SessionRow> {
    rows.iter()
        .find(|row| matches_gp(row, gp) && matches_session(row, session))
}

fn stint_for_lap(stints: &[StintRow], driver_number: i64, lap_number: i64) -> Option<&StintRow> {
    stints.iter().find(|stint| {
        stint.driver_number == driver_number
            && stint.lap_start.is_some_and(|start| start <= lap_number)
            && stint.lap_end.is_some_and(|end| lap_number <= end)
    })
}

fn duration_cell(seconds: Option<f64>) -> CellValue {
    match seconds {
        Some(secs) if secs.is_finite() => {
            CellValue::Duration(Duration::microseconds((secs * 1_000_000.0).round() as i64))
        }
        _ => CellValue::Null,
    }
}

fn timestamp_cell(text: Option<&str>) -> CellValue {
    match text.and_then(|t| DateTime::parse_from_rfc3339(t).ok()) {
        Some(ts) => CellValue::Timestamp(ts.with_timezone(&Utc)),
        None => CellValue::Null,
    }
}

fn int_cell(value: Option<i64>) -> CellValue {
    value.map(CellValue::Int).unwrap_or(CellValue::Null)
}

fn str_cell(value: Option<String>) -> CellValue {
    value.map(CellValue::Str).unwrap_or(CellValue::Null)
}

/// Joins laps with their stint and driver records into one table. A lap
/// belongs to the stint whose lap range contains its lap number; laps
/// outside every stint keep a null stint.
pub fn build_lap_table(laps: &[LapRow], stints: &[StintRow], drivers: &[DriverRow]) -> Table {
    let mut table = Table::new(LAP_COLUMNS.iter().map(|c| c.to_string()).collect());
    for lap in laps {
        let driver = drivers
            .iter()
            .find(|d| d.driver_number == lap.driver_number);
        let stint = stint_for_lap(stints, lap.driver_number, lap.lap_number);
        let abbreviation = driver
            .and_then(|d| d.name_acronym.clone())
            .unwrap_or_else(|| lap.driver_number.to_string());
        // Tyre age on this lap: age when the stint started plus the laps
        // completed in the stint so far, counting the current one.
        let tyre_life = stint.and_then(|s| {
            s.tyre_age_at_start
                .zip(s.lap_start)
                .map(|(age, start)| age + (lap.lap_number - start) + 1)
        });
        table.push_row(vec![
            CellValue::Str(abbreviation),
            CellValue::Str(lap.driver_number.to_string()),
            str_cell(driver.and_then(|d| d.team_name.clone())),
            CellValue::Int(lap.lap_number),
            stint
                .map(|s| CellValue::Float(s.stint_number as f64))
                .unwrap_or(CellValue::Null),
            str_cell(stint.and_then(|s| s.compound.clone())),
            int_cell(tyre_life),
            duration_cell(lap.lap_duration),
            duration_cell(lap.duration_sector_1),
            duration_cell(lap.duration_sector_2),
            duration_cell(lap.duration_sector_3),
            int_cell(lap.i1_speed),
            int_cell(lap.i2_speed),
            int_cell(lap.st_speed),
            CellValue::Bool(lap.is_pit_out_lap.unwrap_or(false)),
            timestamp_cell(lap.date_start.as_deref()),
        ]);
    }
    table
}

fn status_text(row: &ResultRow) -> &'static str {
    if row.dsq.unwrap_or(false) {
        "Disqualified"
    } else if row.dns.unwrap_or(false) {
        "Did not start"
    } else if row.dnf.unwrap_or(false) {
        "Retired"
    } else {
        "Finished"
    }
}

fn quali_duration_cells(value: Option<&Value>) -> Vec<CellValue> {
    let mut cells = vec![CellValue::Null, CellValue::Null, CellValue::Null];
    if let Some(Value::Array(items)) = value {
        for (slot, item) in cells.iter_mut().zip(items) {
            *slot = duration_cell(item.as_f64());
        }
    }
    cells
}

fn gap_cell(value: Option<&Value>) -> CellValue {
    match value {
        Some(Value::Number(n)) => n
            .as_f64()
            .map(CellValue::Float)
            .unwrap_or(CellValue::Null),
        Some(Value::String(s)) => CellValue::Str(s.clone()),
        _ => CellValue::Null,
    }
}

/// Classification table in the provider's order. Qualifying-style sessions
/// carry Q1/Q2/Q3 segment times; the rest carry the total time and the gap
/// to the leader.
pub fn build_results_table(
    results: &[ResultRow],
    drivers: &[DriverRow],
    session_name: &str,
) -> Table {
    let qualifying = session_name.contains("Qualifying");
    let mut columns: Vec<String> = RESULT_COLUMNS.iter().map(|c| c.to_string()).collect();
    if qualifying {
        columns.extend(["Q1".to_string(), "Q2".to_string(), "Q3".to_string()]);
    } else {
        columns.extend(["Time".to_string(), "GapToLeader".to_string()]);
    }

    let mut table = Table::new(columns);
    for row in results {
        let driver = drivers
            .iter()
            .find(|d| d.driver_number == row.driver_number);
        let mut cells = vec![
            // Positions are float-typed in the source data model.
            row.position
                .map(|p| CellValue::Float(p as f64))
                .unwrap_or(CellValue::Null),
            CellValue::Str(row.driver_number.to_string()),
            str_cell(driver.and_then(|d| d.name_acronym.clone())),
            str_cell(driver.and_then(|d| d.full_name.clone())),
            str_cell(driver.and_then(|d| d.team_name.clone())),
            int_cell(row.number_of_laps),
            row.points
                .map(CellValue::Float)
                .unwrap_or(CellValue::Null),
            CellValue::Str(status_text(row).to_string()),
        ];
        if qualifying {
            cells.extend(quali_duration_cells(row.duration.as_ref()));
        } else {
            cells.push(duration_cell(
                row.duration.as_ref().and_then(|v| v.as_f64()),
            ));
            cells.push(gap_cell(row.gap_to_leader.as_ref()));
        }
        table.push_row(cells);
    }
    table
}
