use anyhow::Result;
use tracing_subscriber::EnvFilter;

mod args;
mod config;
mod file;
mod generators;
mod header;

use crate::{args::get_command, config::Config, generators::generate_vol};

pub fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = get_command().get_matches();
    let cfg = Config::from_args(&args)?;

    tracing::info!("Generating volume");
    tracing::debug!("{:?}", cfg);

    generate_vol(&cfg)
}
