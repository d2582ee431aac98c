//! Account operations
//!
//! Each operation checks privileges first, then drives the [`AccountSystem`]
//! one command at a time. Failures come back as [`AccountError`]; callers
//! report them with [`report_error`] and carry on.

mod error;

use std::path::Path;

use anyhow::Result;

use crate::exec::CommandOutcome;
use crate::system::AccountSystem;
use crate::ui::prelude::*;

pub use error::AccountError;

fn require_privileges(system: &dyn AccountSystem) -> Result<(), AccountError> {
    if system.is_privileged() {
        Ok(())
    } else {
        Err(AccountError::Authorization)
    }
}

/// Prefix for success messages, so a dry run never reads like a real change.
pub fn outcome_prefix(system: &dyn AccountSystem) -> &'static str {
    if system.is_dry_run() { "[DRY RUN] " } else { "" }
}

/// The username ends up inside a config file line; control characters would
/// let it add lines of its own.
fn require_plain_username(username: &str) -> Result<(), AccountError> {
    if username.chars().any(char::is_control) {
        return Err(AccountError::InvalidUsername {
            username: username.to_string(),
        });
    }
    Ok(())
}

/// A command that could not even be started counts as a failed command.
fn succeeded(step: &str, result: Result<CommandOutcome>) -> bool {
    match result {
        Ok(outcome) => outcome.success(),
        Err(err) => {
            emit(
                Level::Error,
                "accounts.exec_error",
                &format!("{} {}: {:#}", char::from(NerdFont::Cross), step, err),
                None,
            );
            false
        }
    }
}

pub fn report_error(err: &AccountError) {
    emit(
        Level::Error,
        err.code(),
        &format!("{} {}", char::from(NerdFont::Cross), err),
        None,
    );
}

/// Create `username` and set its password. If the password cannot be set the
/// new account is deleted again; that cleanup is best effort and its outcome
/// is ignored.
pub fn create_user(
    system: &mut dyn AccountSystem,
    username: &str,
    password: &str,
) -> Result<(), AccountError> {
    require_privileges(system)?;

    if !succeeded("useradd", system.create_account(username)) {
        return Err(AccountError::Creation {
            username: username.to_string(),
        });
    }

    if !succeeded("chpasswd", system.set_password(username, password)) {
        emit(
            Level::Warn,
            "accounts.create.rollback",
            &format!(
                "{} Removing partially created user {}",
                char::from(NerdFont::Warning),
                username
            ),
            None,
        );
        let _ = system.delete_account(username);
        return Err(AccountError::Password {
            username: username.to_string(),
        });
    }

    emit(
        Level::Success,
        "accounts.create.success",
        &format!(
            "{} {}User account '{}' created successfully.",
            char::from(NerdFont::UserPlus),
            outcome_prefix(system),
            username
        ),
        None,
    );
    Ok(())
}

pub fn add_user_to_group(
    system: &mut dyn AccountSystem,
    username: &str,
    groupname: &str,
) -> Result<(), AccountError> {
    require_privileges(system)?;

    if !succeeded("usermod", system.add_to_group(username, groupname)) {
        return Err(AccountError::Group {
            username: username.to_string(),
            groupname: groupname.to_string(),
        });
    }

    emit(
        Level::Success,
        "accounts.group.success",
        &format!(
            "{} {}User {} added to group {}",
            char::from(NerdFont::Users),
            outcome_prefix(system),
            username,
            groupname
        ),
        None,
    );
    Ok(())
}

/// Turn on display-manager auto-login for `username`.
///
/// The config is copied to `<config>.bak` before it is touched. If the
/// substitution itself fails the file may be half rewritten; it is not
/// restored automatically, the backup is left for the administrator.
pub fn enable_auto_login(
    system: &mut dyn AccountSystem,
    username: &str,
    config: &Path,
) -> Result<(), AccountError> {
    require_privileges(system)?;
    require_plain_username(username)?;

    if !system.config_exists(config) {
        return Err(AccountError::Unsupported {
            path: config.to_path_buf(),
        });
    }

    if !succeeded("cp", system.backup_config(config)) {
        return Err(AccountError::Backup {
            path: config.to_path_buf(),
        });
    }

    if !succeeded("sed", system.patch_config(config, username)) {
        return Err(AccountError::Config {
            path: config.to_path_buf(),
        });
    }

    emit(
        Level::Success,
        "accounts.autologin.success",
        &format!(
            "{} {}Automatic login enabled for user '{}'. Please reboot the system.",
            char::from(NerdFont::Key),
            outcome_prefix(system),
            username
        ),
        None,
    );
    Ok(())
}

/// Print every account name and return them.
///
/// An empty listing with a zero exit status is still a success.
pub fn list_users(system: &mut dyn AccountSystem) -> Result<Vec<String>, AccountError> {
    require_privileges(system)?;

    let captured = system
        .list_accounts()
        .map_err(|err| AccountError::List(format!("{:#}", err)))?;

    if !captured.outcome.success() {
        return Err(AccountError::List(captured.stderr));
    }

    let users: Vec<String> = captured
        .stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if users.is_empty() {
        emit(
            Level::Info,
            "accounts.list.empty",
            &format!("{} No users found on the system.", char::from(NerdFont::Info)),
            None,
        );
        return Ok(users);
    }

    emit(
        Level::Info,
        "accounts.list.header",
        "Users on the system:",
        Some(serde_json::json!({ "count": users.len() })),
    );
    for user in &users {
        emit(Level::Info, "accounts.list.user", user, None);
    }

    Ok(users)
}
