use std::ffi::OsString;

use thiserror::Error;

/// Error returned by a [`Value`](crate::Value) sink or a flag validator when
/// it rejects a raw argument.
pub type ValueError = Box<dyn std::error::Error + Send + Sync>;

/// A structurally invalid command tree, reported by
/// [`CommandBuilder::build`](crate::CommandBuilder::build) before anything is
/// parsed.
///
/// `command` is the space separated path of the offending command.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("command: {command}: flag already declared: {flag}")]
    DuplicateFlag { command: String, flag: String },

    #[error("command: {command}: subcommand already declared: {name}")]
    DuplicateCommand { command: String, name: String },

    #[error("command: {command}: cannot specify both subcommands and positional arguments")]
    PositionalWithSubcommands { command: String },

    #[error(
        "command: {command}: positional arguments cannot follow unbounded positional arguments: {flag}"
    )]
    PositionalAfterUnbounded { command: String, flag: String },

    #[error("command: {command}: {flag}: invalid nargs: min {min} is greater than max {max}")]
    InvalidArity { command: String, flag: String, min: usize, max: usize },

    #[error("command: {command}: invalid short name for {flag}: `{short}`")]
    InvalidShortName { command: String, flag: String, short: String },

    #[error("command: {command}: invalid name: `{name}`")]
    InvalidName { command: String, name: String },

    #[error("command: {command}: flag is reserved for help: {flag}")]
    ReservedFlag { command: String, flag: String },
}

/// Reasons a single parse can fail.
///
/// Every variant carries the path of the command that was active when the
/// failure occurred, plus the token or flag at fault.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A flag-shaped token that the active command does not declare.
    #[error("unrecognized argument: {token}")]
    UnrecognizedArgument { command: String, token: String },

    /// A bare token that names none of the active command's subcommands.
    #[error("unrecognized command: {token}")]
    UnrecognizedCommand { command: String, token: String },

    /// A bare token given to a command with no positional slots left and no
    /// subcommands.
    #[error("unexpected positional argument: {token}")]
    UnexpectedPositional { command: String, token: String },

    #[error("no value specified for flag: {flag}")]
    MissingValue { command: String, flag: String },

    /// The sink or a validator rejected `value`.
    #[error("{flag}: {source}")]
    InvalidValue {
        command: String,
        flag: String,
        value: String,
        #[source]
        source: ValueError,
    },

    #[error("missing argument: {flag}")]
    MissingArgument { command: String, flag: String },

    #[error("argument declared too many times: {flag}")]
    TooManyArguments { command: String, flag: String },

    #[error("invalid utf8 argument: {arg:?}")]
    NonUtf8 { command: String, arg: OsString },
}

impl ParseError {
    /// Path of the command that was active when parsing failed.
    pub fn command(&self) -> &str {
        match self {
            ParseError::UnrecognizedArgument { command, .. }
            | ParseError::UnrecognizedCommand { command, .. }
            | ParseError::UnexpectedPositional { command, .. }
            | ParseError::MissingValue { command, .. }
            | ParseError::InvalidValue { command, .. }
            | ParseError::MissingArgument { command, .. }
            | ParseError::TooManyArguments { command, .. }
            | ParseError::NonUtf8 { command, .. } => command,
        }
    }

    /// Display name of the flag at fault, if the error concerns one.
    pub fn flag(&self) -> Option<&str> {
        match self {
            ParseError::MissingValue { flag, .. }
            | ParseError::InvalidValue { flag, .. }
            | ParseError::MissingArgument { flag, .. }
            | ParseError::TooManyArguments { flag, .. } => Some(flag),
            _ => None,
        }
    }
}
