use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use utils::version;

/// Generate docker-compose.yml and nginx.conf to run one vLLM server per
/// GPU group behind an nginx load balancer.
///
/// Everything after the generator's own options is passed to vLLM, e.g.
/// `vllm-now --model facebook/opt-125m --tensor-parallel-size 2`.
#[derive(Parser, Debug, Clone)]
#[command(name = "vllm-now", version = &**version::VERSION)]
pub struct GenerateArgs {
    #[arg(
        long,
        env = "CUDA_VISIBLE_DEVICES",
        help = "Comma separated device indices to use instead of querying NVML, e.g. 0,1,2,3"
    )]
    pub visible_devices: Option<String>,

    #[arg(
        long,
        env = "HF_HOME",
        default_value = crate::config::DEFAULT_HF_HOME,
        help = "Hugging Face cache directory on the host"
    )]
    pub hf_home: String,

    #[arg(
        long,
        env = "HF_TOKEN_PATH",
        value_hint = clap::ValueHint::FilePath,
        help = "Hugging Face token file on the host, mounted into every server"
    )]
    pub hf_token_path: Option<String>,

    #[arg(
        long,
        env = "VLLM_NOW_PORT",
        default_value_t = crate::config::DEFAULT_LISTEN_PORT,
        help = "Host port the load balancer listens on"
    )]
    pub listen_port: u16,

    #[arg(
        long,
        env = "VLLM_NOW_WORKER_CONNECTIONS",
        default_value_t = crate::config::DEFAULT_WORKER_CONNECTIONS,
        help = "nginx worker_connections"
    )]
    pub worker_connections: u32,

    #[arg(
        long,
        env = "VLLM_NOW_COMPOSE_VERSION",
        help = "Pin the top-level compose file `version`, e.g. 3.8"
    )]
    pub compose_version: Option<String>,

    #[arg(
        long,
        default_value = ".",
        value_hint = clap::ValueHint::DirPath,
        help = "Directory docker-compose.yml and nginx.conf are written to"
    )]
    pub output_dir: PathBuf,

    #[arg(
        long,
        value_hint = clap::ValueHint::FilePath,
        help = "YAML or JSON mapping of vLLM parameters; command line parameters take precedence"
    )]
    pub params_file: Option<PathBuf>,

    /// vLLM launch parameters, `--name=value`, `--name value` or `--name`.
    #[arg(
        value_name = "VLLM_ARGS",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub vllm_args: Vec<String>,
}

impl GenerateArgs {
    /// Long names of the generator's own options, e.g. `listen-port`.
    pub fn option_names() -> Vec<String> {
        Self::command()
            .get_arguments()
            .filter_map(|arg| arg.get_long())
            .map(str::to_string)
            .collect()
    }
}
