use std::sync::Arc;

use crate::services::SessionProvider;

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn SessionProvider>,
}
