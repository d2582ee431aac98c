//! The operating system as seen by the account operations.
//!
//! [`AccountSystem`] is the seam between orchestration and the host: the
//! operations in [`crate::accounts`] only talk to this trait, and
//! [`HostSystem`] maps each method to one external program.

use std::path::{Path, PathBuf};

use anyhow::Result;
use sudo::RunningAs;

use crate::exec::{self, CapturedOutput, CommandOutcome, CommandSpec, EmitSink};
use crate::ui::prelude::*;

pub const DEFAULT_AUTOLOGIN_CONFIG: &str = "/etc/lightdm/lightdm.conf";

pub trait AccountSystem {
    /// Whether the process holds effective root.
    fn is_privileged(&self) -> bool;

    /// Whether mutating commands are only being printed.
    fn is_dry_run(&self) -> bool {
        false
    }

    /// Create `username` with a home directory.
    fn create_account(&mut self, username: &str) -> Result<CommandOutcome>;

    fn set_password(&mut self, username: &str, password: &str) -> Result<CommandOutcome>;

    /// Remove `username` together with its home directory.
    fn delete_account(&mut self, username: &str) -> Result<CommandOutcome>;

    /// Append `groupname` to the supplementary groups of `username`.
    fn add_to_group(&mut self, username: &str, groupname: &str) -> Result<CommandOutcome>;

    /// Account names, one per line in `stdout`.
    fn list_accounts(&mut self) -> Result<CapturedOutput>;

    fn config_exists(&self, path: &Path) -> bool;

    /// Copy `path` to its `.bak` sibling.
    fn backup_config(&mut self, path: &Path) -> Result<CommandOutcome>;

    /// Enable auto-login for `username` in the display-manager config at `path`.
    fn patch_config(&mut self, path: &Path, username: &str) -> Result<CommandOutcome>;
}

/// Runs the real tools. With `dry_run` set, mutating commands are only printed.
#[derive(Debug, Default)]
pub struct HostSystem {
    dry_run: bool,
    sink: EmitSink,
}

impl HostSystem {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            sink: EmitSink,
        }
    }

    fn run(&mut self, spec: CommandSpec, shown_as: Option<String>) -> Result<CommandOutcome> {
        if self.dry_run {
            let shown = shown_as.unwrap_or_else(|| spec.display());
            emit(
                Level::Info,
                "system.dry_run",
                &format!("[DRY RUN] {}", shown),
                None,
            );
            return Ok(CommandOutcome { code: Some(0) });
        }
        exec::run_streaming(&spec, &mut self.sink)
    }
}

impl AccountSystem for HostSystem {
    fn is_privileged(&self) -> bool {
        self.dry_run || is_root(sudo::check())
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn create_account(&mut self, username: &str) -> Result<CommandOutcome> {
        self.run(useradd_command(username), None)
    }

    fn set_password(&mut self, username: &str, password: &str) -> Result<CommandOutcome> {
        let spec = chpasswd_command(username, password);
        let masked = format!(
            "echo {} | {}",
            shell_words::quote(&format!("{}:{}", username, "*".repeat(8))),
            spec.display()
        );
        self.run(spec, Some(masked))
    }

    fn delete_account(&mut self, username: &str) -> Result<CommandOutcome> {
        self.run(userdel_command(username), None)
    }

    fn add_to_group(&mut self, username: &str, groupname: &str) -> Result<CommandOutcome> {
        self.run(usermod_command(username, groupname), None)
    }

    fn list_accounts(&mut self) -> Result<CapturedOutput> {
        let mut captured = exec::capture(&getent_command())?;
        captured.stdout = account_names(&captured.stdout);
        Ok(captured)
    }

    fn config_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn backup_config(&mut self, path: &Path) -> Result<CommandOutcome> {
        self.run(backup_command(path), None)
    }

    fn patch_config(&mut self, path: &Path, username: &str) -> Result<CommandOutcome> {
        self.run(autologin_command(path, username), None)
    }
}

/// Effective root counts, including a setuid binary run by an ordinary user.
fn is_root(running: RunningAs) -> bool {
    !matches!(running, RunningAs::User)
}

pub fn useradd_command(username: &str) -> CommandSpec {
    CommandSpec::new("useradd").args(["-m", username])
}

/// The credential goes over stdin so it never shows up in the process list.
pub fn chpasswd_command(username: &str, password: &str) -> CommandSpec {
    CommandSpec::new("chpasswd").stdin(format!("{}:{}\n", username, password))
}

pub fn userdel_command(username: &str) -> CommandSpec {
    CommandSpec::new("userdel").args(["-r", username])
}

pub fn usermod_command(username: &str, groupname: &str) -> CommandSpec {
    CommandSpec::new("usermod").args(["-a", "-G", groupname, username])
}

pub fn getent_command() -> CommandSpec {
    CommandSpec::new("getent").arg("passwd")
}

pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

pub fn backup_command(path: &Path) -> CommandSpec {
    CommandSpec::new("cp").args([
        path.to_string_lossy().into_owned(),
        backup_path(path).to_string_lossy().into_owned(),
    ])
}

/// Both rules run in a single `sed -i` so the file is rewritten once.
pub fn autologin_command(path: &Path, username: &str) -> CommandSpec {
    CommandSpec::new("sed").args([
        "-i".to_string(),
        "-e".to_string(),
        r"s/^[[:space:]]*#\?autologin-user-timeout=.*$/autologin-user-timeout=0/".to_string(),
        "-e".to_string(),
        format!(
            r"s/^[[:space:]]*#\?autologin-user=.*$/autologin-user={}/",
            escape_sed_replacement(username)
        ),
        path.to_string_lossy().into_owned(),
    ])
}

/// Escape text used as the replacement part of a `s/.../.../` expression.
/// Control characters are rejected before this point.
fn escape_sed_replacement(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '/' | '&' => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Reduce `getent passwd` output to the first field of each entry.
pub fn account_names(passwd: &str) -> String {
    passwd
        .lines()
        .filter_map(|line| line.split(':').next())
        .filter(|name| !name.is_empty())
        .map(|name| format!("{}\n", name))
        .collect()
}
