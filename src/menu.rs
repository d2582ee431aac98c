//! Interactive text menu
//!
//! Reads choices line by line from any `BufRead` and writes prompts to any
//! `Write`, so the loop runs the same over a terminal or a pipe. Operation
//! results are reported through [`emit`]; a failed operation never ends the loop.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;

use crate::accounts::{self, AccountError};
use crate::system::AccountSystem;
use crate::ui::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    CreateUser,
    EnableAutoLogin,
    ListUsers,
    AddToGroup,
    Exit,
}

impl MenuChoice {
    pub const ALL: [MenuChoice; 5] = [
        MenuChoice::CreateUser,
        MenuChoice::EnableAutoLogin,
        MenuChoice::ListUsers,
        MenuChoice::AddToGroup,
        MenuChoice::Exit,
    ];

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(MenuChoice::CreateUser),
            "2" => Some(MenuChoice::EnableAutoLogin),
            "3" => Some(MenuChoice::ListUsers),
            "4" => Some(MenuChoice::AddToGroup),
            "5" => Some(MenuChoice::Exit),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MenuChoice::CreateUser => "Create User",
            MenuChoice::EnableAutoLogin => "Enable Auto-Login",
            MenuChoice::ListUsers => "List Users",
            MenuChoice::AddToGroup => "Add user to group",
            MenuChoice::Exit => "Exit",
        }
    }
}

pub struct Menu<'a, R, W> {
    input: R,
    output: W,
    system: &'a mut dyn AccountSystem,
    autologin_config: PathBuf,
}

impl<'a, R: BufRead, W: Write> Menu<'a, R, W> {
    pub fn new(
        input: R,
        output: W,
        system: &'a mut dyn AccountSystem,
        autologin_config: PathBuf,
    ) -> Self {
        Self {
            input,
            output,
            system,
            autologin_config,
        }
    }

    /// Loop until the user picks Exit or input runs out.
    pub fn run(&mut self) -> Result<()> {
        if !self.system.is_privileged() {
            emit(
                Level::Warn,
                "menu.unprivileged",
                &format!(
                    "{} Warning: This tool requires root privileges for most operations.  Some options will be unavailable.",
                    char::from(NerdFont::Lock)
                ),
                None,
            );
        }

        loop {
            self.print_menu()?;
            let Some(line) = self.prompt("Enter your choice: ")? else {
                break;
            };

            match MenuChoice::parse(&line) {
                Some(MenuChoice::Exit) => {
                    writeln!(self.output, "Exiting...")?;
                    break;
                }
                Some(choice) => {
                    if !self.dispatch(choice)? {
                        break;
                    }
                }
                None => writeln!(self.output, "Invalid choice. Please try again.")?,
            }
        }

        Ok(())
    }

    fn print_menu(&mut self) -> Result<()> {
        writeln!(self.output, "\nLinux Login and User Management Menu")?;
        for (index, choice) in MenuChoice::ALL.iter().enumerate() {
            writeln!(self.output, "{}. {}", index + 1, choice.label())?;
        }
        Ok(())
    }

    /// Run one menu entry. Returns `false` if input ended mid-prompt.
    fn dispatch(&mut self, choice: MenuChoice) -> Result<bool> {
        match choice {
            MenuChoice::CreateUser => {
                let Some(username) = self.prompt("Enter the username for the new account: ")?
                else {
                    return Ok(false);
                };
                let Some(password) = self.prompt("Enter the password for the new account: ")?
                else {
                    return Ok(false);
                };
                let result = accounts::create_user(self.system, &username, &password);
                self.conclude(result, "User created successfully.", "User creation failed.")?;
            }
            MenuChoice::EnableAutoLogin => {
                let Some(username) = self.prompt("Enter the username for auto-login: ")? else {
                    return Ok(false);
                };
                let config = self.autologin_config.clone();
                let result = accounts::enable_auto_login(self.system, &username, &config);
                self.conclude(
                    result,
                    "Auto-login configured.  Reboot required.",
                    "Auto-login configuration failed.",
                )?;
            }
            MenuChoice::ListUsers => {
                if let Err(err) = accounts::list_users(self.system) {
                    accounts::report_error(&err);
                }
            }
            MenuChoice::AddToGroup => {
                let Some(username) = self.prompt("Enter the username to add to a group: ")?
                else {
                    return Ok(false);
                };
                let Some(groupname) = self.prompt("Enter the group name: ")? else {
                    return Ok(false);
                };
                if let Err(err) = accounts::add_user_to_group(self.system, &username, &groupname)
                {
                    accounts::report_error(&err);
                }
            }
            MenuChoice::Exit => {}
        }
        Ok(true)
    }

    fn conclude(
        &mut self,
        result: Result<(), AccountError>,
        success: &str,
        failure: &str,
    ) -> Result<()> {
        match result {
            Ok(()) => writeln!(
                self.output,
                "{}{}",
                accounts::outcome_prefix(self.system),
                success
            )?,
            Err(err) => {
                accounts::report_error(&err);
                writeln!(self.output, "{}", failure)?;
            }
        }
        Ok(())
    }

    /// Print `label` and read one line. `None` at end of input.
    fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.output, "{}", label)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.strip_suffix('\n').unwrap_or(&line);
        let trimmed = trimmed.strip_suffix('\r').unwrap_or(trimmed);
        Ok(Some(trimmed.to_string()))
    }
}
