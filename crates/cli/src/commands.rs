use std::collections::HashMap;

use msgboard_core::{Message, Profile, SubjectId};

/// One line of interactive input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Post(String),
    List,
    Refresh,
    WhoAmI,
    Logout,
    Login,
    Help,
    Quit,
    Unknown(String),
    Empty,
}

pub const HELP: &str = "\
Type a message and press enter to post it.
  /list      show messages you can see
  /refresh   renew the session
  /whoami    show the signed-in identity
  /logout    sign out
  /login     sign in (again)
  /quit      exit";

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Post(line.to_string());
        };

        match rest.split_whitespace().next().unwrap_or_default() {
            "list" | "ls" => Command::List,
            "refresh" => Command::Refresh,
            "whoami" => Command::WhoAmI,
            "logout" => Command::Logout,
            "login" => Command::Login,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// `[YYYY-MM-DD HH:MM] name: body`. The name is `@username` when the profile
/// has one, else the profile's display name, else the author id prefix.
pub fn format_message(message: &Message, profiles: &HashMap<SubjectId, Profile>) -> String {
    let author = match profiles.get(&message.author_id) {
        Some(profile) => match profile.username.as_deref().filter(|u| !u.trim().is_empty()) {
            Some(username) => format!("@{username}"),
            None => profile.display_name(),
        },
        None => message.author_id.prefix(8).to_string(),
    };
    format!(
        "[{}] {}: {}",
        message.created_at.format("%Y-%m-%d %H:%M"),
        author,
        message.body
    )
}
