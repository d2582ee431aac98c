mod accounts;
mod config;
mod exec;
mod menu;
mod system;
mod ui;

use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::accounts::AccountError;
use crate::config::Config;
use crate::menu::Menu;
use crate::system::HostSystem;
use crate::ui::prelude::*;

/// Create users, manage group membership and configure LightDM auto-login
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Activate debug mode (prints every command before it runs)
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit one JSON object per event instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Print mutating commands instead of running them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Path to config.toml (defaults to the user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive menu (default)
    Menu,
    /// Create a user with a home directory; the password is read from stdin
    CreateUser { username: String },
    /// Append a user to a supplementary group
    AddToGroup { username: String, groupname: String },
    /// Enable display-manager auto-login for a user
    Autologin { username: String },
    /// List account names
    ListUsers,
}

fn main() {
    let cli = Cli::parse();

    ui::set_debug_mode(cli.debug);
    ui::init(
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        },
        !cli.no_color,
    );

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            emit(
                Level::Error,
                "acctctl.error",
                &format!("{} {:#}", char::from(NerdFont::Cross), e),
                None,
            );
            std::process::exit(1);
        }
    }
}

/// Returns whether a single-shot command succeeded. The menu always succeeds.
fn run(cli: Cli) -> Result<bool> {
    let config = Config::load(cli.config.as_deref())?;
    if !config.color || cli.no_color {
        ui::init(get_output_format(), false);
    }
    emit(
        Level::Debug,
        "acctctl.config",
        &format!(
            "{} Auto-login config: {}",
            char::from(NerdFont::Info),
            config.autologin_config.display()
        ),
        None,
    );

    let mut system = HostSystem::new(cli.dry_run);

    let result = match cli.command.unwrap_or(Commands::Menu) {
        Commands::Menu => {
            let stdin = io::stdin();
            Menu::new(
                stdin.lock(),
                io::stdout(),
                &mut system,
                config.autologin_config,
            )
            .run()?;
            return Ok(true);
        }
        Commands::CreateUser { username } => {
            let password = read_password()?;
            accounts::create_user(&mut system, &username, &password)
        }
        Commands::AddToGroup {
            username,
            groupname,
        } => accounts::add_user_to_group(&mut system, &username, &groupname),
        Commands::Autologin { username } => {
            accounts::enable_auto_login(&mut system, &username, &config.autologin_config)
        }
        Commands::ListUsers => accounts::list_users(&mut system).map(|_| ()),
    };

    Ok(conclude(result))
}

fn conclude(result: Result<(), AccountError>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            accounts::report_error(&err);
            false
        }
    }
}

/// One line from stdin, without the trailing newline.
fn read_password() -> Result<String> {
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("reading password from stdin")?;
    Ok(line.trim_end_matches(['\n', '\r']).to_string())
}
