//! Params command - print or write a parameter file

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use fourrow_agent::{AgentParams, PARAM_NAMES};

#[derive(Args)]
pub struct ParamsArgs {
    /// Write the parameters here instead of printing them
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Start from an existing file (named or ordered) instead of the defaults
    #[arg(long, value_name = "FILE")]
    pub from: Option<PathBuf>,
}

pub fn run(args: ParamsArgs) -> Result<()> {
    let params = match &args.from {
        Some(path) => AgentParams::load(path)?,
        None => AgentParams::default(),
    };

    match &args.output {
        Some(path) => {
            params.save(path)?;
            tracing::info!("Wrote parameters to {}", path.display());
        }
        None => {
            println!("{}", serde_json::to_string_pretty(&params)?);
            for (name, value) in PARAM_NAMES.iter().zip(params.to_vec()) {
                tracing::debug!("{} = {}", name, value);
            }
        }
    }

    Ok(())
}
