use crate::{database::UserId, outside::ChatId};

/// What one inbound message asks the bot to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Start,
    Help,
    Stats,

    /// Freeform text, treated as a candidate URL.
    Candidate(String),
}

impl Task {
    pub fn parse(text: &str) -> Task {
        let trimmed = text.trim();

        // Group chats suffix commands with the bot's name: "/start@somebot"
        let command = if trimmed.starts_with('/') {
            trimmed.split('@').next().unwrap_or(trimmed)
        } else {
            trimmed
        };

        match command {
            "/start" => Task::Start,
            "/help" => Task::Help,
            "/stats" => Task::Stats,
            _ => Task::Candidate(trimmed.to_string()),
        }
    }
}

/// One unit of work for the fetch workers: a single inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub chat: ChatId,
    pub user: UserId,
    pub task: Task,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse_with_and_without_bot_suffix() {
        assert_eq!(Task::parse("/start"), Task::Start);
        assert_eq!(Task::parse("/help@somebot"), Task::Help);
        assert_eq!(Task::parse("  /stats  "), Task::Stats);
    }

    #[test]
    fn everything_else_is_a_candidate_url() {
        assert_eq!(
            Task::parse(" https://youtu.be/abc "),
            Task::Candidate("https://youtu.be/abc".to_string())
        );
        assert_eq!(
            Task::parse("/unknown"),
            Task::Candidate("/unknown".to_string())
        );
        assert_eq!(
            Task::parse("user@example.com"),
            Task::Candidate("user@example.com".to_string())
        );
    }
}
