use std::sync::LazyLock;

/// Defines the application version.
pub static VERSION: LazyLock<String> = LazyLock::new(|| {
    format_version(
        env!("RELEASE_VERSION"),
        option_env!("VERGEN_GIT_SHA"),
        option_env!("VERGEN_GIT_DIRTY") == Some("true"),
    )
});

fn format_version(release: &str, sha: Option<&str>, dirty: bool) -> String {
    let sha = sha.map(|sha| &sha[..sha.len().min(8)]).unwrap_or("unknown");
    format!("{release}-{sha}{}", if dirty { "-dirty" } else { "" })
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn version_includes_short_sha() {
        assert_eq!(
            format_version("0.1.0", Some("0123456789abcdef"), false),
            "0.1.0-01234567"
        );
    }

    #[test]
    fn version_marks_dirty_tree_and_missing_sha() {
        assert_eq!(format_version("0.1.0", None, true), "0.1.0-unknown-dirty");
    }
}
