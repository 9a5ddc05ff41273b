use std::fmt;

use super::{RenderContext, ServiceDescriptor, NGINX_FILE_NAME};
use crate::params::GROUP_SIZE;

const VLLM_IMAGE: &str = "vllm/vllm-openai";
const PROXY_IMAGE: &str = "nginx:latest";
const BASE_ANCHOR: &str = "vllm-server-base";
const LOAD_BALANCER: &str = "load-balancer";

const DISABLE_LOG_REQUESTS: &str = "--disable-log-requests";
const HF_CACHE_MOUNT: &str = "/root/.cache/huggingface";
const HF_TOKEN_MOUNT: &str = "/root/.cache/hf_hub_token";

/// docker compose manifest: a shared server template, one service per
/// device group and an nginx load balancer in front of them.
pub struct ComposeManifest<'a> {
    context: &'a RenderContext,
}

impl<'a> ComposeManifest<'a> {
    pub fn new(context: &'a RenderContext) -> Self {
        Self { context }
    }

    /// Arguments every server is started with.
    fn command(&self) -> Vec<String> {
        let params = &self.context.params;
        let mut command = Vec::with_capacity(params.flags.len() + 2);
        command.push(DISABLE_LOG_REQUESTS.to_string());
        command.push(format!(
            "--{}={}",
            GROUP_SIZE.replace('_', "-"),
            params.group_size
        ));
        command.extend(params.flags.iter().map(ToString::to_string));
        command
    }

    fn write_base(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let options = &self.context.options;

        writeln!(f, "x-{BASE_ANCHOR}: &{BASE_ANCHOR}")?;
        writeln!(f, "  image: {VLLM_IMAGE}:{}", self.context.params.image_tag)?;
        writeln!(f, "  ipc: host")?;
        writeln!(f, "  command:")?;
        for arg in self.command() {
            writeln!(f, "    - {}", Scalar(&arg))?;
        }

        writeln!(f, "  volumes:")?;
        let cache = format!("{}:{HF_CACHE_MOUNT}:rw", options.hf_home);
        writeln!(f, "    - {}", Scalar(&cache))?;
        if let Some(token_path) = &options.hf_token_path {
            let token = format!("{token_path}:{HF_TOKEN_MOUNT}");
            writeln!(f, "    - {}", Scalar(&token))?;
            writeln!(f, "  environment:")?;
            writeln!(f, "    - HF_TOKEN_PATH={HF_TOKEN_MOUNT}")?;
        }
        Ok(())
    }

    fn write_server(f: &mut fmt::Formatter<'_>, service: &ServiceDescriptor<'_>) -> fmt::Result {
        let device_ids = service
            .group
            .devices()
            .iter()
            .map(|id| format!("'{id}'"))
            .collect::<Vec<_>>()
            .join(", ");

        writeln!(f, "  {}:", service.name)?;
        writeln!(f, "    <<: *{BASE_ANCHOR}")?;
        writeln!(f, "    deploy:")?;
        writeln!(f, "      resources:")?;
        writeln!(f, "        reservations:")?;
        writeln!(f, "          devices:")?;
        writeln!(f, "            - driver: nvidia")?;
        writeln!(f, "              capabilities: [gpu]")?;
        writeln!(f, "              device_ids: [{device_ids}]")
    }

    fn write_load_balancer(
        &self,
        f: &mut fmt::Formatter<'_>,
        services: &[ServiceDescriptor<'_>],
    ) -> fmt::Result {
        writeln!(f, "  {LOAD_BALANCER}:")?;
        writeln!(f, "    image: {PROXY_IMAGE}")?;
        writeln!(f, "    ports:")?;
        writeln!(f, "      - \"{}:80\"", self.context.options.listen_port)?;
        writeln!(f, "    volumes:")?;
        writeln!(f, "      - ./{NGINX_FILE_NAME}:/etc/nginx/nginx.conf:ro")?;
        if !services.is_empty() {
            writeln!(f, "    depends_on:")?;
            for service in services {
                writeln!(f, "      - {}", service.name)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for ComposeManifest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(version) = &self.context.options.compose_version {
            writeln!(f, "version: {}", Quoted(version))?;
            writeln!(f)?;
        }

        self.write_base(f)?;
        writeln!(f)?;

        let services = self.context.services();
        writeln!(f, "services:")?;
        for service in &services {
            Self::write_server(f, service)?;
            writeln!(f)?;
        }
        self.write_load_balancer(f, &services)
    }
}

/// A block sequence item, double quoted only when YAML would misread it plain.
struct Scalar<'a>(&'a str);

impl fmt::Display for Scalar<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if needs_quotes(self.0) {
            fmt::Display::fmt(&Quoted(self.0), f)
        } else {
            f.write_str(self.0)
        }
    }
}

struct Quoted<'a>(&'a str);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // JSON strings are valid YAML double-quoted scalars.
        let quoted = serde_json::to_string(self.0).map_err(|_| fmt::Error)?;
        f.write_str(&quoted)
    }
}

fn needs_quotes(value: &str) -> bool {
    const INDICATORS: &[char] = &[
        '\'', '"', '{', '[', '&', '*', '!', '|', '>', '%', '@', '`', '#', '?', ',', ']', '}',
    ];

    value.is_empty()
        || value.starts_with(INDICATORS)
        || value.starts_with("- ")
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace)
        || value.ends_with(':')
        || value.contains(": ")
        || value.contains(" #")
        || value.contains(char::is_control)
}
