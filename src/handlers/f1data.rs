use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;

use crate::models::error::Error;
use crate::models::session::{DriverStints, StintLaps};
use crate::models::table::{CellValue, Table};
use crate::utils::serialize::serialize_rows;
use crate::utils::state::AppState;

const MISSING_PARAMS: &str = "Missing parameters. Required: year, gp, session";

/// GET /f1data?year=&gp=&session=
///
/// Practice sessions come back as driver groups with per-stint laps; every
/// other session type comes back as the normalized results table.
pub async fn get_f1_data(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, Error> {
    // The year must parse as a non-zero integer. The string params only
    // have to be present and non-empty; a blank value still counts and is
    // forwarded as given.
    let year = params
        .get("year")
        .and_then(|y| y.trim().parse::<i32>().ok())
        .filter(|&y| y != 0);
    let gp = params.get("gp").filter(|g| !g.is_empty());
    let session = params.get("session").filter(|s| !s.is_empty());
    let (year, gp, session) = match (year, gp, session) {
        (Some(year), Some(gp), Some(session)) => (year, gp, session),
        _ => return Err(Error::bad_request(MISSING_PARAMS)),
    };

    let info = state.provider.get_session(year, gp, session).await?;
    info!("resolved {year} {gp} {session} -> {}", info.name);
    let data = state.provider.load(&info).await?;

    if info.is_practice() {
        let laps = match data.laps {
            Some(laps) if !laps.is_empty() => laps,
            _ => {
                return Err(Error::not_found(&format!(
                    "No lap data available for {year} {gp} {session}"
                )))
            }
        };
        Ok(Json(group_practice_laps(&laps)).into_response())
    } else {
        let results = match data.results {
            Some(results) if !results.is_empty() => results,
            _ => {
                return Err(Error::not_found(&format!(
                    "No results data available for {year} {gp} {session}"
                )))
            }
        };
        Ok(Json(serialize_rows(&results)).into_response())
    }
}

/// One group per distinct driver, in first-seen order, each split into one
/// entry per distinct stint value, again in first-seen order. Driver number
/// and team are read off the driver's first lap row.
fn group_practice_laps(laps: &Table) -> Vec<DriverStints> {
    laps.partition_by("Driver")
        .into_iter()
        .map(|(driver, driver_laps)| {
            let stints = driver_laps
                .partition_by("Stint")
                .into_iter()
                .map(|(stint, stint_laps)| StintLaps {
                    stint: stint.as_f64().unwrap_or(f64::NAN),
                    laps: serialize_rows(&stint_laps),
                })
                .collect();
            DriverStints {
                driver: driver.display_string(),
                driver_number: driver_laps
                    .first_value("DriverNumber")
                    .map(CellValue::display_string)
                    .unwrap_or_default(),
                team: driver_laps
                    .first_value("Team")
                    .map(CellValue::display_string)
                    .unwrap_or_default(),
                stints,
            }
        })
        .collect()
}
