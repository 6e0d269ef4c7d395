//! Dashboard command parsing.

use todolist_core::Priority;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFilter {
    All,
    Open,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List(ListFilter),
    Search(String),
    Add { priority: Priority, text: String },
    /// A row number from the last listing, or a task id
    Toggle(String),
    Refresh,
    Whoami,
    Logout,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  list [open|done]               show tasks (both lists by default)
  search <text>                  filter lists by text (empty clears)
  add [low|medium|high] <text>   add a task (priority defaults to medium)
  toggle <n|id>                  mark a task done / not done
  refresh                        reload tasks from the server
  whoami                         show the signed-in account
  logout                         sign out
  help                           show this help
  quit                           exit";

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word.to_lowercase().as_str() {
            "list" | "ls" => match rest.to_lowercase().as_str() {
                "" | "all" => Ok(Command::List(ListFilter::All)),
                "open" | "todo" => Ok(Command::List(ListFilter::Open)),
                "done" | "completed" => Ok(Command::List(ListFilter::Done)),
                other => Err(format!("Unknown list filter: {}", other)),
            },
            "search" | "find" => Ok(Command::Search(rest.to_string())),
            "add" | "new" => Self::parse_add(rest),
            "toggle" | "t" => {
                if rest.is_empty() {
                    Err("Usage: toggle <n|id>".to_string())
                } else {
                    Ok(Command::Toggle(rest.to_string()))
                }
            }
            "refresh" | "reload" => Ok(Command::Refresh),
            "whoami" => Ok(Command::Whoami),
            "logout" => Ok(Command::Logout),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            "" => Err(String::new()),
            other => Err(format!("Unknown command: {} (try 'help')", other)),
        }
    }

    fn parse_add(rest: &str) -> Result<Self, String> {
        let (priority, text) = match rest.split_once(char::is_whitespace) {
            Some((first, tail)) => match first.parse::<Priority>() {
                Ok(priority) => (priority, tail.trim()),
                Err(_) => (Priority::default(), rest),
            },
            None => match rest.parse::<Priority>() {
                Ok(priority) => (priority, ""),
                Err(_) => (Priority::default(), rest),
            },
        };

        if text.is_empty() {
            return Err("Usage: add [low|medium|high] <text>".to_string());
        }
        Ok(Command::Add {
            priority,
            text: text.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        assert_eq!(Command::parse("list"), Ok(Command::List(ListFilter::All)));
        assert_eq!(Command::parse("ls done"), Ok(Command::List(ListFilter::Done)));
        assert_eq!(Command::parse("LIST open"), Ok(Command::List(ListFilter::Open)));
        assert!(Command::parse("list weird").is_err());
    }

    #[test]
    fn test_parse_add() {
        assert_eq!(
            Command::parse("add high Pay rent"),
            Ok(Command::Add {
                priority: Priority::High,
                text: "Pay rent".to_string()
            })
        );
        assert_eq!(
            Command::parse("add Buy milk"),
            Ok(Command::Add {
                priority: Priority::Medium,
                text: "Buy milk".to_string()
            })
        );
        assert_eq!(
            Command::parse("add groceries"),
            Ok(Command::Add {
                priority: Priority::Medium,
                text: "groceries".to_string()
            })
        );
        assert!(Command::parse("add").is_err());
        assert!(Command::parse("add low").is_err());
    }

    #[test]
    fn test_parse_misc() {
        assert_eq!(Command::parse("toggle 2"), Ok(Command::Toggle("2".to_string())));
        assert!(Command::parse("toggle").is_err());
        assert_eq!(Command::parse("search  Milk "), Ok(Command::Search("Milk".to_string())));
        assert_eq!(Command::parse("search"), Ok(Command::Search(String::new())));
        assert_eq!(Command::parse("q"), Ok(Command::Quit));
        assert_eq!(Command::parse("   "), Err(String::new()));
        assert!(Command::parse("dance").is_err());
    }
}
