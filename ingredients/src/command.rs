//! Line commands of the terminal front end.

use crate::search::SearchAction;
use crate::types::{Amount, IngredientId, NewIngredient, PantryAction};
use pantry_core::document_store::is_valid_key;
use thiserror::Error;

/// Help text printed by `help`
pub const HELP: &str = "\
Commands:
  add <title> <amount>   add an ingredient (amount is a number)
  filter [text]          filter by exact title (empty shows all)
  remove <id>            remove an ingredient
  dismiss                close error messages
  login                  log in
  list                   show the screen again
  help                   show this help
  quit                   exit";

/// A parsed input line
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Submit the form
    Add(NewIngredient),
    /// Replace the filter text
    Filter(String),
    /// Remove an ingredient
    Remove(IngredientId),
    /// Close both error modals
    Dismiss,
    /// Log in
    Login,
    /// Re-render
    List,
    /// Print usage
    Help,
    /// Exit
    Quit,
}

/// Input that is not a valid command
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    /// First word is not a command
    #[error("unknown command `{0}` (type `help`)")]
    Unknown(String),

    /// Command is missing arguments
    #[error("usage: {0}")]
    Usage(&'static str),

    /// Id cannot name a stored ingredient
    #[error("invalid ingredient id `{0}`")]
    InvalidId(String),
}

impl Command {
    /// Parse one input line
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] for unknown commands and missing arguments.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim_start();
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));

        match word.trim_end() {
            "add" => {
                let rest = rest.trim();
                let (title, amount) = rest
                    .rsplit_once(char::is_whitespace)
                    .ok_or(CommandError::Usage("add <title> <amount>"))?;
                let title = title.trim();
                // The form only accepts numeric amounts; the text is stored as typed
                if title.is_empty() || amount.parse::<serde_json::Number>().is_err() {
                    return Err(CommandError::Usage("add <title> <amount>"));
                }
                Ok(Self::Add(NewIngredient::new(title, Amount::from(amount))))
            },
            // The text is kept verbatim, the filter matches titles exactly
            "filter" => Ok(Self::Filter(rest.trim_end_matches(['\r', '\n']).to_string())),
            "remove" => match rest.trim() {
                "" => Err(CommandError::Usage("remove <id>")),
                id if is_valid_key(id) => Ok(Self::Remove(IngredientId::from(id))),
                id => Err(CommandError::InvalidId(id.to_string())),
            },
            "dismiss" => Ok(Self::Dismiss),
            "login" => Ok(Self::Login),
            "list" | "" => Ok(Self::List),
            "help" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }

    /// Actions this command dispatches
    #[must_use]
    pub fn into_actions(self) -> Vec<PantryAction> {
        match self {
            Self::Add(ingredient) => vec![PantryAction::AddIngredient(ingredient)],
            Self::Filter(text) => vec![PantryAction::Search(SearchAction::FilterChanged(text))],
            Self::Remove(id) => vec![PantryAction::RemoveIngredient(id)],
            Self::Dismiss => vec![
                PantryAction::DismissError,
                PantryAction::Search(SearchAction::DismissError),
            ],
            Self::Login => vec![PantryAction::Login],
            Self::List | Self::Help | Self::Quit => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_takes_last_word_as_amount() {
        assert_eq!(
            Command::parse("add Sea salt 2"),
            Ok(Command::Add(NewIngredient::new("Sea salt", "2")))
        );
        assert_eq!(
            Command::parse("add Salt"),
            Err(CommandError::Usage("add <title> <amount>"))
        );
    }

    #[test]
    fn add_requires_numeric_amount() {
        assert_eq!(
            Command::parse("add Salt lots"),
            Err(CommandError::Usage("add <title> <amount>"))
        );
        assert_eq!(
            Command::parse("add Flour 2.5"),
            Ok(Command::Add(NewIngredient::new("Flour", "2.5")))
        );
    }

    #[test]
    fn filter_keeps_text_verbatim() {
        assert_eq!(Command::parse("filter Sea salt"), Ok(Command::Filter("Sea salt".to_string())));
        assert_eq!(Command::parse("filter"), Ok(Command::Filter(String::new())));
    }

    #[test]
    fn remove_requires_id() {
        assert_eq!(
            Command::parse("remove -Na"),
            Ok(Command::Remove(IngredientId::from("-Na")))
        );
        assert_eq!(Command::parse("remove"), Err(CommandError::Usage("remove <id>")));
    }

    #[test]
    fn remove_rejects_ids_outside_the_collection() {
        for id in ["../users", "a/b", "a#b", ".."] {
            assert_eq!(
                Command::parse(&format!("remove {id}")),
                Err(CommandError::InvalidId(id.to_string()))
            );
        }
        assert_eq!(
            Command::parse("remove a?x=1"),
            Ok(Command::Remove(IngredientId::from("a?x=1")))
        );
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert_eq!(
            Command::parse("bake bread"),
            Err(CommandError::Unknown("bake".to_string()))
        );
    }

    #[test]
    fn dismiss_closes_both_modals() {
        let actions = Command::Dismiss.into_actions();
        assert_eq!(actions.len(), 2);
        assert!(matches!(actions[0], PantryAction::DismissError));
        assert!(matches!(
            actions[1],
            PantryAction::Search(SearchAction::DismissError)
        ));
    }
}
