use anyhow::Result;
use clap::Parser;
use utils::version;
use vllm_now::config::GenerateArgs;
use vllm_now::discovery::NvmlDiscovery;
use vllm_now::output::{compose_command, usage_summary};

fn main() -> Result<()> {
    utils::logging::install_panic_hook();

    let args = GenerateArgs::parse();
    utils::logging::init();

    tracing::debug!("vllm-now {}", &**version::VERSION);

    let summary = vllm_now::run(&args, &NvmlDiscovery)?;
    tracing::info!(
        servers = summary.servers,
        files = ?summary.written,
        "Generated deployment"
    );

    print!("{}", usage_summary(compose_command(), summary.listen_port));
    Ok(())
}
