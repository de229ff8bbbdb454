mod handlers;
mod models;
mod routes;
mod services;
mod utils;

use axum::serve;
use tokio::net::TcpListener;
use tracing::info;
use utils::config::Config;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    routes::init_tracing();
    let config = Config::init();

    let app = match routes::make_app(&config) {
        Ok(app) => app,
        Err(err) => panic!("Failed to initialize application: {err}"),
    };

    // Bind to a TCP listener
    let listener = TcpListener::bind(&config.bind_addr).await;
    info!("Listening on http://{}", config.bind_addr);

    match listener {
        Ok(res) => serve(res, app).await.unwrap(),
        Err(err) => panic!("{}", err),
    }
}
