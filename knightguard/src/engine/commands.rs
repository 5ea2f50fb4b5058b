use tracing::info;

use super::bus::{ChatBus, Notice};
use super::knight_engine::KnightEngine;
use super::member_list::canonical_name;
use super::saved::is_reserved_key;

/// Operations exposed to the command layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ToggleWindow,
    Add(String),
    Remove(String),
    Toggle(String),
    ListSaved,
    DebugDump,
    Join,
    Refresh,
    ScrollUp,
    ScrollDown,
    Show,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CommandError {
    /// The name was empty after trimming and sigil stripping.
    EmptyName,
    /// The name collides with a reserved storage key.
    ReservedName(String),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::EmptyName => write!(f, "player name cannot be empty"),
            CommandError::ReservedName(name) => write!(f, "{name} is a reserved name"),
        }
    }
}

impl std::error::Error for CommandError {}

fn player_name(raw: &str) -> Result<String, CommandError> {
    let name = canonical_name(raw).ok_or(CommandError::EmptyName)?;
    if is_reserved_key(name) {
        return Err(CommandError::ReservedName(name.to_string()));
    }
    Ok(name.to_string())
}

impl<B: ChatBus> KnightEngine<B> {
    /// Run a command and return the lines to show the user.
    pub fn execute(&mut self, command: Command) -> Result<Vec<String>, CommandError> {
        info!(?command, "command");
        let lines = match command {
            Command::ToggleWindow => {
                self.toggle_window();
                if self.is_window_shown() {
                    self.render_lines()
                } else {
                    vec!["Window hidden".into()]
                }
            }
            Command::Add(raw) => {
                let name = player_name(&raw)?;
                let line = if self.add_saved(&name) {
                    format!("Saved {name}")
                } else {
                    format!("{name} is already saved")
                };
                self.push_notice(Notice::info(line.clone()));
                vec![line]
            }
            Command::Remove(raw) => {
                let name = player_name(&raw)?;
                let line = if self.remove_saved(&name) {
                    format!("Removed {name}")
                } else {
                    format!("{name} was not saved")
                };
                self.push_notice(Notice::info(line.clone()));
                vec![line]
            }
            Command::Toggle(raw) => {
                let name = player_name(&raw)?;
                if self.toggle_saved(&name) {
                    vec![format!("Saved {name}")]
                } else {
                    vec![format!("Removed {name}")]
                }
            }
            Command::ListSaved => {
                let names = self.list_saved();
                let mut lines = vec![format!("Saved players ({}):", names.len())];
                lines.extend(names.into_iter().map(|n| format!("  {n}")));
                lines
            }
            Command::DebugDump => self.debug_dump(),
            Command::Join => {
                self.join_channel();
                vec![format!("Joining {}...", self.channel().name)]
            }
            Command::Refresh => {
                self.open_view();
                self.render_lines()
            }
            Command::ScrollUp => {
                self.scroll_up();
                self.render_lines()
            }
            Command::ScrollDown => {
                self.scroll_down();
                self.render_lines()
            }
            Command::Show => self.render_lines(),
        };
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_name_canonicalized() {
        assert_eq!(player_name("  *Alice ").unwrap(), "Alice");
        assert_eq!(player_name("+").unwrap_err(), CommandError::EmptyName);
        assert_eq!(
            player_name("__kgBtnX").unwrap_err(),
            CommandError::ReservedName("__kgBtnX".into())
        );
    }

    #[test]
    fn test_command_error_display() {
        assert_eq!(
            format!("{}", CommandError::EmptyName),
            "player name cannot be empty"
        );
    }
}
