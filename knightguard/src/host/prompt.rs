use clap::{Parser, Subcommand};

use super::HostInput;
use crate::engine::commands::Command as EngineCommand;

/// One line typed at the prompt.
#[derive(Debug, Parser)]
#[command(name = "kg", no_binary_name = true, disable_help_flag = true)]
struct PromptLine {
    #[command(subcommand)]
    command: PromptCommand,
}

#[derive(Debug, Subcommand)]
enum PromptCommand {
    /// Show or hide the member window
    #[command(alias = "toggle-window")]
    Window,
    /// Save a player
    Add { name: String },
    /// Forget a saved player
    #[command(alias = "rm")]
    Remove { name: String },
    /// Flip a player's saved state
    Toggle { name: String },
    /// List saved players
    #[command(alias = "list-saved")]
    List,
    /// Dump registry, roster and cache diagnostics
    #[command(alias = "debug-dump")]
    Debug,
    /// Join the managed channel
    Join,
    /// Rescan presence and re-request members
    Refresh,
    Up,
    Down,
    /// Print the current rows
    Show,
    Quit,
}

/// Parse a prompt line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<HostInput>, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return Ok(None);
    }
    let parsed = PromptLine::try_parse_from(words).map_err(|e| e.to_string())?;
    let command = match parsed.command {
        PromptCommand::Window => EngineCommand::ToggleWindow,
        PromptCommand::Add { name } => EngineCommand::Add(name),
        PromptCommand::Remove { name } => EngineCommand::Remove(name),
        PromptCommand::Toggle { name } => EngineCommand::Toggle(name),
        PromptCommand::List => EngineCommand::ListSaved,
        PromptCommand::Debug => EngineCommand::DebugDump,
        PromptCommand::Join => EngineCommand::Join,
        PromptCommand::Refresh => EngineCommand::Refresh,
        PromptCommand::Up => EngineCommand::ScrollUp,
        PromptCommand::Down => EngineCommand::ScrollDown,
        PromptCommand::Show => EngineCommand::Show,
        PromptCommand::Quit => return Ok(Some(HostInput::Quit)),
    };
    Ok(Some(HostInput::Command(command)))
}
