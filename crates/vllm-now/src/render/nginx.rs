use std::fmt;

use super::{RenderContext, SERVER_PORT};

const UPSTREAM: &str = "vllm_servers";
const TIMEOUT: &str = "600s";

/// nginx configuration round-robining over the generated servers.
pub struct NginxConfig<'a> {
    context: &'a RenderContext,
}

impl<'a> NginxConfig<'a> {
    pub fn new(context: &'a RenderContext) -> Self {
        Self { context }
    }
}

impl fmt::Display for NginxConfig<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "events {{")?;
        writeln!(
            f,
            "    worker_connections {};",
            self.context.options.worker_connections
        )?;
        writeln!(f, "}}")?;

        writeln!(f, "http {{")?;
        writeln!(f, "    upstream {UPSTREAM} {{")?;
        for service in self.context.services() {
            writeln!(f, "        server {}:{SERVER_PORT};", service.name)?;
        }
        writeln!(f, "    }}")?;

        writeln!(f, "    server {{")?;
        writeln!(f, "        gzip on;")?;
        for directive in [
            "keepalive_timeout",
            "proxy_read_timeout",
            "proxy_connect_timeout",
            "proxy_send_timeout",
            "fastcgi_read_timeout",
        ] {
            writeln!(f, "        {directive} {TIMEOUT};")?;
        }
        writeln!(f, "        listen 80;")?;
        writeln!(f, "        location / {{")?;
        writeln!(f, "            proxy_pass http://{UPSTREAM};")?;
        writeln!(f, "        }}")?;
        writeln!(f, "    }}")?;
        writeln!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;
    use crate::config::DeploymentOptions;
    use crate::render::tests::context;

    #[test]
    fn renders_full_config() {
        let ctx = context(
            &["--model=m"],
            &[0, 1, 2],
            DeploymentOptions {
                worker_connections: 1024,
                ..DeploymentOptions::default()
            },
        );

        let expected = r#"events {
    worker_connections 1024;
}
http {
    upstream vllm_servers {
        server vllm-server-0:8000;
        server vllm-server-1:8000;
        server vllm-server-2:8000;
    }
    server {
        gzip on;
        keepalive_timeout 600s;
        proxy_read_timeout 600s;
        proxy_connect_timeout 600s;
        proxy_send_timeout 600s;
        fastcgi_read_timeout 600s;
        listen 80;
        location / {
            proxy_pass http://vllm_servers;
        }
    }
}
"#;
        assert_eq!(NginxConfig::new(&ctx).to_string(), expected);
    }

    #[test]
    fn default_worker_connections() {
        let ctx = context(&["--model=m"], &[0], DeploymentOptions::default());
        assert!(NginxConfig::new(&ctx)
            .to_string()
            .contains("    worker_connections 4096;\n"));
    }

    #[test]
    fn upstream_is_empty_without_groups() {
        let ctx = context(&["--model=m"], &[], DeploymentOptions::default());
        let config = NginxConfig::new(&ctx).to_string();
        assert!(config.contains("    upstream vllm_servers {\n    }\n"));
    }
}
