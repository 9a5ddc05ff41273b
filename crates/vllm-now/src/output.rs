//! Persisting the generated files and telling the user what to run next.

use std::io::Write;
use std::path::{Path, PathBuf};

use error_stack::{Report, ResultExt};
use tempfile::NamedTempFile;

use crate::error::OutputError;
use crate::render::{RenderedArtifacts, COMPOSE_FILE_NAME, NGINX_FILE_NAME};

/// Writes both artifacts into `dir`, replacing existing files.
///
/// Each file is staged in a temporary file next to its destination and only
/// renamed into place after both have been written in full. Destinations
/// that cannot be replaced by a file fail the call before the first rename.
/// A rename failing after that reports the artifacts already replaced.
pub fn write_artifacts(
    dir: &Path,
    artifacts: &RenderedArtifacts,
) -> Result<Vec<PathBuf>, Report<OutputError>> {
    std::fs::create_dir_all(dir)
        .change_context(OutputError::PrepareDirectory)
        .attach_printable_lazy(|| format!("directory: {}", dir.display()))?;

    let files = [
        (COMPOSE_FILE_NAME, artifacts.compose.as_str()),
        (NGINX_FILE_NAME, artifacts.nginx.as_str()),
    ];

    for (file_name, _) in files {
        let path = dir.join(file_name);
        if path.is_dir() {
            return Err(Report::new(OutputError::WriteArtifact { file_name })
                .attach_printable(format!("path: {}", path.display()))
                .attach_printable("destination is a directory"));
        }
    }

    let staged = files
        .into_iter()
        .map(|(file_name, content)| stage(dir, file_name, content).map(|file| (file_name, file)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut written: Vec<PathBuf> = Vec::with_capacity(staged.len());
    for (file_name, file) in staged {
        let path = dir.join(file_name);
        file.persist(&path)
            .change_context(OutputError::WriteArtifact { file_name })
            .attach_printable_lazy(|| format!("path: {}", path.display()))
            .attach_printable_lazy(|| format!("already replaced: {written:?}"))?;
        tracing::info!("Wrote {}", path.display());
        written.push(path);
    }

    Ok(written)
}

fn stage(
    dir: &Path,
    file_name: &'static str,
    content: &str,
) -> Result<NamedTempFile, Report<OutputError>> {
    let mut file = NamedTempFile::new_in(dir)
        .change_context(OutputError::WriteArtifact { file_name })
        .attach_printable_lazy(|| format!("directory: {}", dir.display()))?;
    file.write_all(content.as_bytes())
        .and_then(|()| file.flush())
        .change_context(OutputError::WriteArtifact { file_name })?;
    Ok(file)
}

/// `docker-compose` when the standalone binary is installed, the compose
/// plugin otherwise.
pub fn compose_command() -> &'static str {
    if which::which("docker-compose").is_ok() {
        "docker-compose"
    } else {
        "docker compose"
    }
}

/// The start, logs and stop commands for the generated deployment.
pub fn usage_summary(compose: &str, listen_port: u16) -> String {
    format!(
        "# [Launch] vllm servers for your favorite models\n\
         {compose} up -d\n\
         # [Check] the status\n\
         {compose} logs -t -f\n\
         # [Stop] the servers\n\
         {compose} stop\n\
         \n\
         vLLM API will be launched at http://localhost:{listen_port}/v1 after the model is loaded.\n"
    )
}
