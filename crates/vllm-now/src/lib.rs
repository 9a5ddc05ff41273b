//! Generates a docker compose deployment of vLLM servers, one per group of
//! GPUs, load balanced by nginx.

pub mod config;
pub mod discovery;
pub mod error;
pub mod output;
pub mod params;
pub mod partition;
pub mod pipeline;
pub mod render;

use std::path::PathBuf;

use anyhow::Result;

use crate::config::{DeploymentOptions, GenerateArgs};
use crate::discovery::DeviceDiscovery;
use crate::params::LaunchParameters;

/// Outcome of a successful run.
#[derive(Debug)]
pub struct RunSummary {
    pub written: Vec<PathBuf>,
    pub servers: usize,
    pub listen_port: u16,
}

/// Runs the whole generator for parsed command line arguments.
///
/// Nothing is written unless every parameter and the device list are valid.
pub fn run(args: &GenerateArgs, discovery: &dyn DeviceDiscovery) -> Result<RunSummary> {
    let mut params = match &args.params_file {
        Some(path) => LaunchParameters::from_file(path)?,
        None => LaunchParameters::new(),
    };
    params.merge(LaunchParameters::from_args(&args.vllm_args)?);
    params.reject_names(GenerateArgs::option_names().iter().map(String::as_str))?;

    let options = DeploymentOptions::from(args);
    let listen_port = options.listen_port;

    let context =
        pipeline::build_context(params, args.visible_devices.as_deref(), options, discovery)?;
    let artifacts = render::render(&context);

    let written = output::write_artifacts(&args.output_dir, &artifacts)
        .map_err(|report| anyhow::anyhow!("{report:?}"))?;

    Ok(RunSummary {
        written,
        servers: context.groups.len(),
        listen_port,
    })
}
