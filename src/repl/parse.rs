use super::*;
use chumsky::{error::SimpleReason, prelude::*, text::whitespace};
use itertools::Itertools;

/// Every command word the grammar knows.
pub const COMMANDS: [&str; 19] = [
    "list",
    "search",
    "category",
    "categories",
    "refresh",
    "open",
    "login",
    "logout",
    "cancel",
    "close",
    "retry",
    "pause",
    "play",
    "status",
    "external",
    "material",
    "help",
    "exit",
    "quit",
];

/// A line that is not a valid command.
#[derive(Debug, Snafu)]
#[snafu(display("{}", self.describe()))]
pub struct ParseError {
    input: String,
    errors: Vec<Simple<char>>,
}

impl ParseError {
    /// The first word of the rejected line.
    pub fn command(&self) -> &str {
        self.input.split_whitespace().next().unwrap_or_default()
    }

    pub fn is_unknown_command(&self) -> bool {
        !COMMANDS.contains(&self.command())
    }

    fn describe(&self) -> String {
        if self.is_unknown_command() {
            return format!(
                "unknown command `{}`, expected one of: {}",
                self.command(),
                COMMANDS.join(", ")
            );
        }

        let problems = self.errors.iter().map(problem).unique().join("; ");
        format!("cannot read `{}`: {problems}", self.command())
    }
}

/// Columns count from 1 on the trimmed line.
fn problem(error: &Simple<char>) -> String {
    let column = error.span().start + 1;

    match (error.reason(), error.found()) {
        (SimpleReason::Custom(message), _) => format!("{message} at column {column}"),
        (_, Some(found)) if found.is_whitespace() => {
            format!("unexpected extra argument at column {column}")
        }
        (_, Some(found)) => format!("unexpected `{found}` at column {column}"),
        (_, None) => format!("missing argument at column {column}"),
    }
}

pub fn parse(input: &str) -> Result<Action, ParseError> {
    let input = input.trim();

    if input.is_empty() {
        return Ok(Action::None);
    }

    program().parse(input).map_err(|errors| ParseError {
        input: input.to_string(),
        errors,
    })
}

fn program() -> impl Parser<char, Action, Error = Simple<char>> {
    choice((
        action_list(),
        action_search(),
        action_categories(),
        action_category(),
        action_refresh(),
        action_open(),
        action_login(),
        action_logout(),
        action_cancel(),
        action_close(),
        action_retry(),
        action_pause(),
        action_play(),
        action_status(),
        action_external(),
        action_material(),
        action_help(),
        action_exit(),
    ))
    .then_ignore(end())
}

fn action_list() -> impl Parser<char, Action, Error = Simple<char>> {
    just("list").to(Action::List)
}

fn action_search() -> impl Parser<char, Action, Error = Simple<char>> {
    just("search")
        .ignore_then(argument().or_not())
        .map(|term| Action::Search {
            term: term.unwrap_or_default(),
        })
}

fn action_categories() -> impl Parser<char, Action, Error = Simple<char>> {
    just("categories").to(Action::Categories)
}

fn action_category() -> impl Parser<char, Action, Error = Simple<char>> {
    just("category")
        .ignore_then(argument())
        .map(|name| Action::Category { name })
}

fn action_refresh() -> impl Parser<char, Action, Error = Simple<char>> {
    just("refresh").to(Action::Refresh)
}

fn action_open() -> impl Parser<char, Action, Error = Simple<char>> {
    just("open")
        .then_ignore(whitespace().at_least(1))
        .ignore_then(word())
        .map(|video_id| Action::Open {
            video_id: VideoId::new(video_id),
        })
}

/// Missing credentials parse as empty so the controller can report them.
fn action_login() -> impl Parser<char, Action, Error = Simple<char>> {
    let credential = whitespace().at_least(1).ignore_then(word()).or_not();

    just("login")
        .ignore_then(credential.clone())
        .then(credential)
        .map(|(student_id, password)| Action::Login {
            student_id: student_id.unwrap_or_default(),
            password: password.unwrap_or_default(),
        })
}

fn action_logout() -> impl Parser<char, Action, Error = Simple<char>> {
    just("logout").to(Action::Logout)
}

fn action_cancel() -> impl Parser<char, Action, Error = Simple<char>> {
    just("cancel").to(Action::Cancel)
}

fn action_close() -> impl Parser<char, Action, Error = Simple<char>> {
    just("close").to(Action::Close)
}

fn action_retry() -> impl Parser<char, Action, Error = Simple<char>> {
    just("retry").to(Action::Retry)
}

fn action_pause() -> impl Parser<char, Action, Error = Simple<char>> {
    just("pause").to(Action::Pause)
}

fn action_play() -> impl Parser<char, Action, Error = Simple<char>> {
    just("play").to(Action::Play)
}

fn action_status() -> impl Parser<char, Action, Error = Simple<char>> {
    just("status").to(Action::Status)
}

fn action_external() -> impl Parser<char, Action, Error = Simple<char>> {
    just("external").to(Action::External)
}

fn action_material() -> impl Parser<char, Action, Error = Simple<char>> {
    just("material").to(Action::Material)
}

fn action_help() -> impl Parser<char, Action, Error = Simple<char>> {
    just("help").to(Action::Help)
}

fn action_exit() -> impl Parser<char, Action, Error = Simple<char>> {
    choice((just("exit"), just("quit"))).to(Action::Exit)
}

fn word() -> impl Parser<char, String, Error = Simple<char>> + Clone {
    filter(|c: &char| !c.is_whitespace())
        .repeated()
        .at_least(1)
        .collect()
}

/// Everything after the separating whitespace, trimmed.
fn argument() -> impl Parser<char, String, Error = Simple<char>> {
    whitespace()
        .at_least(1)
        .ignore_then(any().repeated().at_least(1).collect::<String>())
        .map(|text| text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bare_commands() {
        assert_eq!(parse("list").unwrap(), Action::List);
        assert_eq!(parse("  status ").unwrap(), Action::Status);
        assert_eq!(parse("categories").unwrap(), Action::Categories);
        assert_eq!(parse("quit").unwrap(), Action::Exit);
        assert_eq!(parse("").unwrap(), Action::None);
    }

    #[test]
    fn parse_category_with_spaces() {
        assert_eq!(
            parse("category Bab 1").unwrap(),
            Action::Category {
                name: "Bab 1".to_string()
            }
        );
    }

    #[test]
    fn parse_search_with_and_without_term() {
        assert_eq!(
            parse("search source documents").unwrap(),
            Action::Search {
                term: "source documents".to_string()
            }
        );
        assert_eq!(
            parse("search").unwrap(),
            Action::Search {
                term: String::new()
            }
        );
    }

    #[test]
    fn parse_open() {
        assert_eq!(
            parse("open v12").unwrap(),
            Action::Open {
                video_id: VideoId::new("v12")
            }
        );
        assert!(parse("open").is_err());
        assert!(parse("open v1 v2").is_err());
    }

    #[test]
    fn parse_login_keeps_missing_credentials_empty() {
        assert_eq!(
            parse("login S001 secret").unwrap(),
            Action::Login {
                student_id: "S001".to_string(),
                password: "secret".to_string()
            }
        );
        assert_eq!(
            parse("login S001").unwrap(),
            Action::Login {
                student_id: "S001".to_string(),
                password: String::new()
            }
        );
    }

    #[test]
    fn login_and_logout_do_not_collide() {
        assert_eq!(parse("logout").unwrap(), Action::Logout);
    }

    #[test]
    fn unknown_command_lists_known_commands() {
        let error = parse("dance now").unwrap_err();

        assert!(error.is_unknown_command());
        assert_eq!(error.command(), "dance");
        let message = error.to_string();
        assert!(message.starts_with("unknown command `dance`, expected one of: list, search,"));
        assert!(message.ends_with("exit, quit"));
    }

    #[test]
    fn known_command_with_bad_arguments_names_the_command() {
        let missing = parse("open").unwrap_err();
        assert!(!missing.is_unknown_command());
        assert!(missing.to_string().starts_with("cannot read `open`: "));
        assert!(missing.to_string().contains("missing argument"));

        let extra = parse("open v1 v2").unwrap_err();
        assert!(extra.to_string().starts_with("cannot read `open`: "));
        assert!(!extra.to_string().contains("unknown command"));
    }

    #[test]
    fn every_command_word_is_known() {
        for command in COMMANDS {
            let line = match command {
                "open" => "open v1".to_string(),
                "category" => "category Bab 1".to_string(),
                _ => command.to_string(),
            };

            assert!(parse(&line).is_ok(), "`{line}` should parse");
        }
    }
}
