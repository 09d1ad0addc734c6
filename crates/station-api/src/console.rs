/// One line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    New,
    List,
    Load(String),
    Rename { id: String, name: String },
    Delete(String),
    Clear,
    Agents,
    Rags,
    /// Select a knowledge base; `None` turns grounding off.
    Rag(Option<String>),
    /// Persist the backend environment used from the next start.
    Env(String),
    Help,
    Quit,
    Message(String),
}

impl Command {
    /// Parse a line. Unknown or incomplete slash commands come back as `Err` with a usage hint.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Command::Message(line.to_string()));
        };

        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest, ""),
        };

        match (name, args) {
            ("new", _) => Ok(Command::New),
            ("list", _) => Ok(Command::List),
            ("clear", _) => Ok(Command::Clear),
            ("agents", _) => Ok(Command::Agents),
            ("rags", _) => Ok(Command::Rags),
            ("help", _) => Ok(Command::Help),
            ("quit" | "exit", _) => Ok(Command::Quit),
            ("load", id) if !id.is_empty() => Ok(Command::Load(id.to_string())),
            ("delete", id) if !id.is_empty() => Ok(Command::Delete(id.to_string())),
            ("env", env) if !env.is_empty() => Ok(Command::Env(env.to_string())),
            ("rag", "off" | "none") => Ok(Command::Rag(None)),
            ("rag", id) if !id.is_empty() => Ok(Command::Rag(Some(id.to_string()))),
            ("rename", args) => match args.split_once(char::is_whitespace) {
                Some((id, name)) if !name.trim().is_empty() => Ok(Command::Rename {
                    id: id.to_string(),
                    name: name.trim().to_string(),
                }),
                _ => Err("usage: /rename <id> <name>".to_string()),
            },
            ("load" | "delete" | "env" | "rag", _) => Err(format!("usage: /{} <value>", name)),
            _ => Err(format!("unknown command '/{}', try /help", name)),
        }
    }
}

pub const HELP: &str = "\
/new                  start a new conversation
/list                 list conversations
/load <id>            switch to a conversation
/rename <id> <name>   rename a conversation
/delete <id>          delete a conversation
/clear                delete all conversations
/agents               list chat agents
/rags                 list knowledge bases
/rag <id|off>         select a knowledge base
/env <name>           persist the backend environment for the next start
/quit                 exit";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_message() {
        assert_eq!(Command::parse("  hello there "), Ok(Command::Message("hello there".to_string())));
        assert_eq!(Command::parse(""), Ok(Command::Message(String::new())));
    }

    #[test]
    fn test_commands() {
        assert_eq!(Command::parse("/new"), Ok(Command::New));
        assert_eq!(Command::parse("/load 1700000000000"), Ok(Command::Load("1700000000000".to_string())));
        assert_eq!(
            Command::parse("/rename 17 Trip planning"),
            Ok(Command::Rename {
                id: "17".to_string(),
                name: "Trip planning".to_string()
            })
        );
        assert_eq!(Command::parse("/rag off"), Ok(Command::Rag(None)));
        assert_eq!(Command::parse("/rag 3"), Ok(Command::Rag(Some("3".to_string()))));
        assert_eq!(Command::parse("/exit"), Ok(Command::Quit));
    }

    #[test]
    fn test_incomplete_commands() {
        assert!(Command::parse("/load").is_err());
        assert!(Command::parse("/rename 17").is_err());
        assert!(Command::parse("/bogus").unwrap_err().contains("/help"));
    }
}
