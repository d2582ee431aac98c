/// Icons used in acctctl output. Requires a nerd font in the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NerdFont {
    // Status and feedback
    Cross,
    Warning,
    Info,

    // Accounts
    Users,
    UserPlus,
    Lock,
    Key,

    // System
    Terminal,
}

impl NerdFont {
    pub const fn unicode(&self) -> char {
        match self {
            Self::Cross => '\u{f00d}',    // fa-times
            Self::Warning => '\u{f071}',  // fa-exclamation-triangle
            Self::Info => '\u{f05a}',     // fa-info-circle
            Self::Users => '\u{f0c0}',    // fa-users
            Self::UserPlus => '\u{f234}', // fa-user-plus
            Self::Lock => '\u{f023}',     // fa-lock
            Self::Key => '\u{f084}',      // fa-key
            Self::Terminal => '\u{f120}', // fa-terminal
        }
    }
}

impl From<NerdFont> for char {
    fn from(icon: NerdFont) -> Self {
        icon.unicode()
    }
}
