pub const HELP_TEXT: &str = "\
Commands:
  /help            show this help
  /new             start a new conversation
  /attach <path>   attach a file to the next message
  /detach <id>     remove a pending attachment
  /agents          list agents available to these credentials
  /cancel          cancel the active run
  /quit            exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    New,
    Attach(String),
    Detach(String),
    Agents,
    Cancel,
    Quit,
    Unknown(String),
}

pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (command, argument) = match trimmed.split_once(char::is_whitespace) {
        Some((command, argument)) => (command, argument.trim()),
        None => (trimmed, ""),
    };

    let parsed = match command {
        "/help" => SlashCommand::Help,
        "/new" => SlashCommand::New,
        "/attach" => SlashCommand::Attach(argument.to_string()),
        "/detach" => SlashCommand::Detach(argument.to_string()),
        "/agents" => SlashCommand::Agents,
        "/cancel" => SlashCommand::Cancel,
        "/quit" | "/exit" => SlashCommand::Quit,
        _ => SlashCommand::Unknown(command.to_string()),
    };

    Some(parsed)
}
