pub mod api;
pub mod comments;
pub mod error;
pub mod exec;
pub mod gateway;
pub mod slug;
pub mod state;
pub mod storage;

use std::env;

use tracing_subscriber::{EnvFilter, fmt::time::ChronoLocal};

use crate::{
    exec::PistonClient,
    gateway::{Gateway, GatewayConfig},
    state::{AppState, SiteConfig},
};

pub async fn run() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string()))
        .with_env_filter(EnvFilter::from_env("FOLIO_LOG"))
        .init();

    let app = AppState::new(
        storage::init_db_from_env().await,
        PistonClient::default(),
        SiteConfig::from_env(),
    );
    let gateway = Gateway::new(GatewayConfig::for_host(admin_host()));

    api::run_server(app, gateway).await
}

fn admin_host() -> String {
    env::var("ADMIN_HOST").expect("ADMIN_HOST not set")
}
