//! Rendering of the compose manifest and the nginx configuration.
//!
//! Both renderers take their service list from [`RenderContext::services`],
//! so the manifest services and the upstream servers always agree on count,
//! names and order.

mod compose;
mod nginx;

pub use compose::ComposeManifest;
pub use nginx::NginxConfig;

use crate::config::DeploymentOptions;
use crate::params::NormalizedParameters;
use crate::partition::DeviceGroup;

pub const COMPOSE_FILE_NAME: &str = "docker-compose.yml";
pub const NGINX_FILE_NAME: &str = "nginx.conf";

pub const SERVICE_PREFIX: &str = "vllm-server";
pub const SERVER_PORT: u16 = 8000;

/// Everything the renderers need, assembled once and then only read.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub params: NormalizedParameters,
    pub groups: Vec<DeviceGroup>,
    pub options: DeploymentOptions,
}

/// A vLLM server bound to one device group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor<'a> {
    pub name: String,
    pub group: &'a DeviceGroup,
}

impl RenderContext {
    pub fn new(
        params: NormalizedParameters,
        groups: Vec<DeviceGroup>,
        options: DeploymentOptions,
    ) -> Self {
        Self {
            params,
            groups,
            options,
        }
    }

    pub fn services(&self) -> Vec<ServiceDescriptor<'_>> {
        self.groups
            .iter()
            .map(|group| ServiceDescriptor {
                name: service_name(group.index()),
                group,
            })
            .collect()
    }
}

pub fn service_name(index: usize) -> String {
    format!("{SERVICE_PREFIX}-{index}")
}

/// The two generated files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifacts {
    pub compose: String,
    pub nginx: String,
}

pub fn render(context: &RenderContext) -> RenderedArtifacts {
    RenderedArtifacts {
        compose: ComposeManifest::new(context).to_string(),
        nginx: NginxConfig::new(context).to_string(),
    }
}
