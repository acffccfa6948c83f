use std::path::PathBuf;

use onepager_core::{AboutField, TurnId};
use thiserror::Error;

pub const HELP: &str = "\
Commands:
  name <text>              company name (suggestions appear as you type)
  url <text>               company website
  find                     look the company up from its website
  pick <n>                 use suggestion n
  dismiss                  hide the suggestion list
  about <field>            toggle year | founder | city | shareholding
  op <n>                   toggle operation n
  heading <n> <text>       rename operation n (empty text reverts)
  desc <n> <text>          rewrite operation n's description
  revert <n>               undo an unsaved heading edit
  add <heading> | <desc>   add your own operation
  query <text>             extra instructions for the operations section
  file <path>              attach the financials workbook
  submit                   answer the current step
  edit <turn>              change an earlier answer
  cancel                   stop a running generation
  restart                  start over
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Name(String),
    Url(String),
    Find,
    Pick(usize),
    Dismiss,
    About(AboutField),
    Toggle(usize),
    Heading { index: usize, text: String },
    Describe { index: usize, text: String },
    Revert(usize),
    Add { heading: String, description: String },
    Query(String),
    File(PathBuf),
    Submit,
    Edit(TurnId),
    Cancel,
    Restart,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown command {0:?}; type `help`")]
    Unknown(String),
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
    #[error("{0:?} is not a number from the list")]
    BadIndex(String),
    #[error("unknown about field {0:?}")]
    BadField(String),
    #[error("use `add <heading> | <description>`")]
    BadAdd,
}

/// Parse one line of user input. List positions are shown from 1 and
/// returned 0-based.
pub fn parse(line: &str) -> Result<Command, ParseError> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let command = match word.to_ascii_lowercase().as_str() {
        // Text fields may be cleared, so an empty argument is allowed.
        "name" => Command::Name(rest.to_string()),
        "url" => Command::Url(rest.to_string()),
        "query" => Command::Query(rest.to_string()),
        "find" => Command::Find,
        "pick" => Command::Pick(position(required("pick", rest)?)?),
        "dismiss" => Command::Dismiss,
        "about" => Command::About(about_field(required("about", rest)?)?),
        "op" => Command::Toggle(position(required("op", rest)?)?),
        "heading" => {
            let (index, text) = indexed("heading", rest)?;
            Command::Heading { index, text }
        }
        "desc" => {
            let (index, text) = indexed("desc", rest)?;
            Command::Describe { index, text }
        }
        "revert" => Command::Revert(position(required("revert", rest)?)?),
        "add" => {
            let (heading, description) = rest.split_once('|').ok_or(ParseError::BadAdd)?;
            Command::Add {
                heading: heading.trim().to_string(),
                description: description.trim().to_string(),
            }
        }
        "file" => Command::File(PathBuf::from(required("file", rest)?)),
        "submit" | "next" => Command::Submit,
        "edit" => {
            let arg = required("edit", rest)?;
            Command::Edit(arg.parse().map_err(|_| ParseError::BadIndex(arg.to_string()))?)
        }
        "cancel" => Command::Cancel,
        "restart" => Command::Restart,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(ParseError::Unknown(other.to_string())),
    };
    Ok(command)
}

fn required<'a>(command: &'static str, rest: &'a str) -> Result<&'a str, ParseError> {
    if rest.is_empty() {
        Err(ParseError::MissingArgument(command))
    } else {
        Ok(rest)
    }
}

fn position(arg: &str) -> Result<usize, ParseError> {
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(ParseError::BadIndex(arg.to_string())),
    }
}

fn indexed(command: &'static str, rest: &str) -> Result<(usize, String), ParseError> {
    let rest = required(command, rest)?;
    let (index, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    Ok((position(index)?, text.trim().to_string()))
}

fn about_field(arg: &str) -> Result<AboutField, ParseError> {
    match arg.to_ascii_lowercase().as_str() {
        "year" | "founding_year" => Ok(AboutField::FoundingYear),
        "founder" | "founder_name" => Ok(AboutField::FounderName),
        "city" | "headquarter_city" => Ok(AboutField::HeadquarterCity),
        "shareholding" | "shareholding_pattern" => Ok(AboutField::ShareholdingPattern),
        _ => Err(ParseError::BadField(arg.to_string())),
    }
}
