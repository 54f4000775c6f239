use std::str::FromStr;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands that can be invoked by starting a message with a leading slash.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Show help
    Help,
    /// Drop the conversation and start over
    New,
    /// Rebuild the model session after it failed to start
    Retry,
    /// Exit the application
    Quit,
}

pub fn command_entries() -> Vec<CommandEntry> {
    SlashCommand::iter()
        .map(|command| CommandEntry {
            command,
            keyword: command.command(),
            description: command.description(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: SlashCommand,
    pub argument: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    pub command: SlashCommand,
    pub keyword: &'static str,
    pub description: &'static str,
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::Help => "show available commands and keys",
            SlashCommand::New => "start a new conversation",
            SlashCommand::Retry => "reconnect to the model after a failed start",
            SlashCommand::Quit => "exit the application",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }
}

/// Parse a slash command from user input
pub fn parse_slash_command(input: &str) -> Option<ParsedCommand> {
    let rest = input.trim().strip_prefix('/')?;

    let mut parts = rest.split_whitespace();
    let head = parts.next()?.to_lowercase();
    let tail: Vec<&str> = parts.collect();

    let command = SlashCommand::from_str(&head).ok().or_else(|| match head.as_str() {
        "q" | "exit" | "bye" => Some(SlashCommand::Quit),
        "h" | "?" => Some(SlashCommand::Help),
        "reset" | "clear" => Some(SlashCommand::New),
        "r" | "reconnect" => Some(SlashCommand::Retry),
        _ => None,
    })?;

    let argument = if tail.is_empty() {
        None
    } else {
        Some(tail.join(" "))
    };

    Some(ParsedCommand { command, argument })
}

/// Get help text for all available commands
pub fn get_help_text() -> String {
    let mut help = String::from("Commands:\n");
    for entry in command_entries() {
        help.push_str(&format!("  /{:<7} {}\n", entry.keyword, entry.description));
    }

    help.push_str("\nAliases: /q, /exit, /bye for /quit; /h for /help; /reset, /clear for /new; /r for /retry\n");
    help.push_str("\nKeys:\n");
    help.push_str("  Enter       send the message\n");
    help.push_str("  PgUp/PgDn   scroll the conversation\n");
    help.push_str("  Ctrl+C      quit\n");

    help
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_and_aliases() {
        let parsed = parse_slash_command("/help").unwrap();
        assert_eq!(parsed.command, SlashCommand::Help);
        assert_eq!(parsed.argument, None);

        assert_eq!(parse_slash_command("/q").unwrap().command, SlashCommand::Quit);
        assert_eq!(parse_slash_command("/BYE").unwrap().command, SlashCommand::Quit);
        assert_eq!(parse_slash_command("/new").unwrap().command, SlashCommand::New);
        assert_eq!(parse_slash_command("/reset").unwrap().command, SlashCommand::New);
        assert_eq!(parse_slash_command("  /retry now ").unwrap().argument.as_deref(), Some("now"));
    }

    #[test]
    fn plain_text_and_unknown_commands_are_not_commands() {
        assert!(parse_slash_command("hello /help").is_none());
        assert!(parse_slash_command("/unknown").is_none());
        assert!(parse_slash_command("/").is_none());
    }

    #[test]
    fn help_lists_every_command() {
        let help = get_help_text();
        for entry in command_entries() {
            assert!(help.contains(&format!("/{}", entry.keyword)));
        }
    }
}
