use anyhow::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

pub struct TestEnvironment {
    temp_dir: TempDir,
}

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("config.toml")
    }

    /// Write a config whose auto-login target lives inside the temp dir.
    pub fn write_config(&self, autologin_config: &Path) -> Result<()> {
        std::fs::write(
            self.config_path(),
            format!("autologin_config = {:?}\n", autologin_config.display().to_string()),
        )?;
        Ok(())
    }

    /// Run the built binary with `--no-color --config <temp>/config.toml`,
    /// feeding `stdin` to it.
    pub fn run(&self, args: &[&str], stdin: &str) -> Result<CommandOutput> {
        let mut child = Command::new(env!("CARGO_BIN_EXE_acctctl"))
            .arg("--no-color")
            .arg("--config")
            .arg(self.config_path())
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut pipe) = child.stdin.take() {
            pipe.write_all(stdin.as_bytes())?;
        }

        let output = child.wait_with_output()?;
        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}
