//! Installer and launcher
//!
//! Fetches (or updates) a CodeAce checkout, records the Azure OpenAI settings
//! in its `.env`, builds the release binary and optionally starts a chat.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Variables the model client needs, in the order they are asked for
pub const REQUIRED_ENV_VARS: [&str; 5] = [
    "AZURE_OPENAI_ENDPOINT",
    "AZ_OPENAI_API_KEY",
    "AZ_OPENAI_API_VERSION",
    "AZ_OPENAI_LLM_4_O_MINI",
    "AZ_OPENAI_LLM_4_O",
];

/// Checkout directory used when none is given
pub const DEFAULT_INSTALL_DIR: &str = "codeace_app";

/// What `clone_or_update` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutOutcome {
    Cloned,
    Updated,
}

/// Installer settings
#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub repo_url: String,
    pub install_dir: PathBuf,
    /// Start a chat once the build succeeds
    pub run_after: bool,
}

impl InstallOptions {
    pub fn new(repo_url: impl Into<String>) -> Self {
        InstallOptions {
            repo_url: repo_url.into(),
            install_dir: PathBuf::from(DEFAULT_INSTALL_DIR),
            run_after: false,
        }
    }
}

/// Locate `git` on the PATH
pub fn check_git() -> Result<PathBuf> {
    which::which("git").map_err(|_| Error::Install("Git is not installed. Please install Git first.".to_string()))
}

/// Locate `cargo` on the PATH
pub fn check_cargo() -> Result<PathBuf> {
    which::which("cargo").map_err(|_| {
        Error::Install("Cargo is not installed. Please install the Rust toolchain first.".to_string())
    })
}

/// Clone `repo_url` into `dir`, or pull if `dir` already is a checkout.
///
/// An existing directory that is not a git checkout is left alone and
/// reported as an error.
pub async fn clone_or_update(repo_url: &str, dir: &Path) -> Result<CheckoutOutcome> {
    if dir.exists() {
        if !dir.join(".git").exists() {
            return Err(Error::Install(format!(
                "Directory {} exists but is not a git repository",
                dir.display()
            )));
        }

        info!("Repository already cloned at {}, pulling latest changes", dir.display());
        run(Command::new("git").arg("-C").arg(dir).arg("pull"), "git pull").await?;
        return Ok(CheckoutOutcome::Updated);
    }

    info!("Cloning repository from {}", repo_url);
    run(Command::new("git").arg("clone").arg(repo_url).arg(dir), "git clone").await?;
    Ok(CheckoutOutcome::Cloned)
}

/// Write `dir/.env` with one `NAME=value` line per required variable.
///
/// Values come from the environment when set and non-empty, otherwise from
/// `prompt`. Returns the path written.
pub fn collect_env_vars<F>(required: &[&str], dir: &Path, mut prompt: F) -> Result<PathBuf>
where
    F: FnMut(&str) -> Result<String>,
{
    let mut content = String::new();

    for &name in required {
        let value = match std::env::var(name) {
            Ok(value) if !value.is_empty() => value,
            _ => prompt(name)?,
        };
        content.push_str(&format!("{}={}\n", name, value));
    }

    let path = dir.join(".env");
    std::fs::write(&path, content)?;
    info!("Environment variables saved to {}", path.display());
    Ok(path)
}

/// Path of the release binary inside a checkout
pub fn release_binary(dir: &Path) -> PathBuf {
    dir.join("target")
        .join("release")
        .join(format!("codeace{}", std::env::consts::EXE_SUFFIX))
}

/// `cargo build --release` inside the checkout
pub async fn build_release(dir: &Path) -> Result<PathBuf> {
    check_cargo()?;
    info!("Building release binary in {}", dir.display());
    run(
        Command::new("cargo").args(["build", "--release"]).current_dir(dir),
        "cargo build",
    )
    .await?;
    Ok(release_binary(dir))
}

/// Start an interactive chat with the checkout's release binary
pub async fn launch(dir: &Path) -> Result<()> {
    let binary = release_binary(dir);
    if !binary.is_file() {
        return Err(Error::Install(format!(
            "{} not found. Please run install first.",
            binary.display()
        )));
    }

    info!("Starting CodeAce from {}", binary.display());
    run(
        Command::new(&binary)
            .arg("chat")
            .current_dir(dir)
            .stdin(Stdio::inherit()),
        "codeace chat",
    )
    .await
}

/// Full installation: check tools, fetch, configure, build, optionally run
pub async fn install<F>(options: &InstallOptions, prompt: F) -> Result<()>
where
    F: FnMut(&str) -> Result<String>,
{
    check_git()?;
    check_cargo()?;

    let outcome = clone_or_update(&options.repo_url, &options.install_dir).await?;
    debug!("Checkout {:?}", outcome);

    collect_env_vars(&REQUIRED_ENV_VARS, &options.install_dir, prompt)?;
    build_release(&options.install_dir).await?;
    info!("Installation completed");

    if options.run_after {
        launch(&options.install_dir).await?;
    }
    Ok(())
}

async fn run(command: &mut Command, what: &str) -> Result<()> {
    let status = command
        .status()
        .await
        .map_err(|e| Error::Install(format!("Failed to start {}: {}", what, e)))?;

    if status.success() {
        Ok(())
    } else {
        Err(Error::Install(format!("{} failed with {}", what, status)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_file_uses_environment_then_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let mut asked = Vec::new();

        let path = collect_env_vars(&["PATH", "CODEACE_TEST_SURELY_UNSET_VAR"], dir.path(), |name| {
            asked.push(name.to_string());
            Ok("typed".to_string())
        })
        .unwrap();

        assert_eq!(asked, vec!["CODEACE_TEST_SURELY_UNSET_VAR"]);
        let content = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("PATH="));
        assert_eq!(lines[1], "CODEACE_TEST_SURELY_UNSET_VAR=typed");
    }

    #[test]
    fn test_prompt_error_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let result = collect_env_vars(&["CODEACE_TEST_SURELY_UNSET_VAR"], dir.path(), |_| {
            Err(Error::Install("cancelled".to_string()))
        });
        assert!(result.is_err());
        assert!(!dir.path().join(".env").exists());
    }

    #[tokio::test]
    async fn test_existing_non_checkout_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = clone_or_update("https://example.invalid/repo.git", dir.path()).await;
        assert!(matches!(result, Err(Error::Install(_))));
    }

    #[tokio::test]
    async fn test_launch_without_build() {
        let dir = tempfile::tempdir().unwrap();
        let result = launch(dir.path()).await;
        match result {
            Err(Error::Install(msg)) => assert!(msg.contains("Please run install first")),
            other => panic!("expected install error, got {:?}", other),
        }
    }

    #[test]
    fn test_release_binary_path() {
        let path = release_binary(Path::new("app"));
        assert!(path.starts_with("app/target/release"));
    }
}
