pub mod cache;
pub mod openf1;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::session::{SessionData, SessionInfo};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to data provider failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("data provider returned status {status} for {endpoint}")]
    Status { status: u16, endpoint: String },
    #[error("could not decode data provider response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("no session found for {year} {gp} {session}")]
    SessionNotFound {
        year: i32,
        gp: String,
        session: String,
    },
}

/// A source of session data addressed by (year, event, session type).
/// Mirrors the upstream two-step shape: resolve the session first, then
/// load its lap and results tables.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn get_session(
        &self,
        year: i32,
        gp: &str,
        session: &str,
    ) -> Result<SessionInfo, ProviderError>;

    async fn load(&self, session: &SessionInfo) -> Result<SessionData, ProviderError>;
}
