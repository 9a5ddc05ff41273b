pub mod cli;

pub use cli::*;

pub const DEFAULT_HF_HOME: &str = "~/.cache/huggingface/";
pub const DEFAULT_LISTEN_PORT: u16 = 80;
pub const DEFAULT_WORKER_CONNECTIONS: u32 = 4096;

/// Deployment settings that are not vLLM launch parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentOptions {
    /// Host side Hugging Face cache directory mounted into every server.
    pub hf_home: String,
    /// Host side token file; mounted and exported when set.
    pub hf_token_path: Option<String>,
    /// Host port the load balancer is published on.
    pub listen_port: u16,
    pub worker_connections: u32,
    /// Top-level compose `version:` to pin, if any.
    pub compose_version: Option<String>,
}

impl Default for DeploymentOptions {
    fn default() -> Self {
        Self {
            hf_home: DEFAULT_HF_HOME.to_string(),
            hf_token_path: None,
            listen_port: DEFAULT_LISTEN_PORT,
            worker_connections: DEFAULT_WORKER_CONNECTIONS,
            compose_version: None,
        }
    }
}

impl From<&GenerateArgs> for DeploymentOptions {
    fn from(args: &GenerateArgs) -> Self {
        Self {
            hf_home: args.hf_home.clone(),
            hf_token_path: args.hf_token_path.clone().filter(|path| !path.is_empty()),
            listen_port: args.listen_port,
            worker_connections: args.worker_connections,
            compose_version: args
                .compose_version
                .clone()
                .filter(|version| !version.is_empty()),
        }
    }
}
