use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AccountError {
    #[error("This operation requires root privileges.")]
    Authorization,

    #[error("Failed to create user {username}")]
    Creation { username: String },

    #[error("Failed to set password for user {username}.")]
    Password { username: String },

    #[error("Failed to add user {username} to group {groupname}")]
    Group { username: String, groupname: String },

    #[error(
        "{} does not exist. Auto-login setup is not supported on this system, or LightDM is not the display manager.",
        path.display()
    )]
    Unsupported { path: PathBuf },

    #[error("Failed to backup {}. Aborting auto-login configuration.", path.display())]
    Backup { path: PathBuf },

    #[error(
        "Failed to modify {}. Auto-login may not be configured correctly.",
        path.display()
    )]
    Config { path: PathBuf },

    #[error("Invalid username {username:?}: control characters are not allowed")]
    InvalidUsername { username: String },

    #[error("Error listing users: {0}")]
    List(String),
}

impl AccountError {
    /// Dotted event code used when the error is reported.
    pub fn code(&self) -> &'static str {
        match self {
            AccountError::Authorization => "accounts.unauthorized",
            AccountError::Creation { .. } => "accounts.create.failed",
            AccountError::Password { .. } => "accounts.password.failed",
            AccountError::Group { .. } => "accounts.group.failed",
            AccountError::Unsupported { .. } => "accounts.autologin.unsupported",
            AccountError::Backup { .. } => "accounts.autologin.backup_failed",
            AccountError::Config { .. } => "accounts.autologin.config_failed",
            AccountError::InvalidUsername { .. } => "accounts.invalid_username",
            AccountError::List(_) => "accounts.list.failed",
        }
    }
}
