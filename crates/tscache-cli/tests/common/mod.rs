#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::MockServer;

pub const CMD_TIMEOUT: Duration = Duration::from_secs(15);

/// Test config file so a developer's own `global.toml` never leaks into tests.
fn config_file() -> &'static Path {
    static CONFIG: OnceLock<(TempDir, PathBuf)> = OnceLock::new();
    let (_, path) = CONFIG.get_or_init(|| {
        let dir = tempfile::tempdir().expect("failed to create config dir for tests");
        let path = dir.path().join("global.toml");
        std::fs::write(
            &path,
            "[profile]\ninitial_backoff_ms = 5\nmax_backoff_ms = 20\nmax_retry_after_secs = 0\n",
        )
        .expect("failed to write test config");
        (dir, path)
    });
    path
}

/// A `tscache` command isolated from the user's environment.
pub fn tscache_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("tscache"));
    cmd.timeout(CMD_TIMEOUT);
    cmd.env("TSCACHE_CONFIG", config_file());
    cmd.env_remove("TSCACHE_COMMUNITY");
    cmd.env_remove("TSCACHE_REFRESH_SECS");
    cmd.env_remove("TSCACHE_OUTPUT_FORMAT");
    cmd.env("NO_COLOR", "1");
    cmd
}

/// A `tscache` command pointed at a mock registry.
#[allow(dead_code)]
pub fn tscache_against(server: &MockServer) -> Command {
    let mut cmd = tscache_cmd();
    cmd.env("TSCACHE_BASE_URL", server.uri());
    cmd
}
