/*
    volren_app
    Author: Michal Majer
    Date: 2022-05-05
*/

//! Volume rendering demo app
//!
//! Renders the first frame, orbits the camera and prints render times, for example:
//! `cargo run --release --bin volren_app -- --demo --frames-dir frames`

use anyhow::Result;
use tracing_subscriber::EnvFilter;

mod app;
mod args;
mod config;

use crate::{app::App, args::get_command, config::AppConfig};

pub fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = get_command().get_matches();
    let config = AppConfig::from_args(&args)?;
    tracing::debug!("{:?}", config);

    let app = App::new(config)?;
    app.run()?;

    tracing::info!("App shutting down");
    Ok(())
}
