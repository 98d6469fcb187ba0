//! Command trees with typed flags.
//!
//! A program declares a tree of [`Command`]s, each with [`Flag`]s bound to
//! variables it owns, and parses its arguments against the tree. Parsing
//! stores every flag value, selects the subcommand named by the arguments,
//! and returns any arguments that followed a `--` terminator.
//!
//! ```
//! use std::cell::{Cell, RefCell};
//! use flagtree::{Command, Flag, Parsed};
//!
//! let n = Cell::new(1u32);
//! let name = RefCell::new(String::new());
//!
//! let app = Command::new("widgets", "Manage widgets")
//!     .flags([Flag::new(&n, "n").usage("Affect n widgets")])
//!     .subcommands([
//!         Command::new("create", "Make new widgets")
//!             .flags([Flag::new(&name, "name").required()]),
//!         Command::new("destroy", "Destroy widgets"),
//!     ])
//!     .build()?;
//!
//! match app.parse(["-n=3", "create", "--name", "gizmo"])? {
//!     Parsed::Run { command, args } => {
//!         assert_eq!(command.path(), "widgets create");
//!         assert!(args.is_empty());
//!     }
//!     Parsed::Help { .. } => unreachable!(),
//! }
//! assert_eq!(n.get(), 3);
//! assert_eq!(*name.borrow(), "gizmo");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Command line syntax
//!
//! ```text
//! -f
//! -f=x
//! -fx
//! -f x      // non-boolean flags only
//! --flag
//! --flag=x
//! --flag x  // non-boolean flags only
//! ```
//!
//! Boolean flags never take the next argument as their value, since the
//! meaning of `cmd -x *` would change whenever a file named `false` exists.
//! Use `--flag=false` instead. For the same reason `-xfile` reads as
//! `-x file` when `-x` is boolean.
//!
//! A value starting with a dash is always a flag, attached or not, so
//! `--n=-1` is a missing value for `--n`.
//!
//! Bare arguments fill the positional flags of the current command in
//! declaration order; a command without positional flags treats them as
//! subcommand names. Only the flags of the current command can be named, so
//! flags of a parent command go before the subcommand name.
//!
//! `-h` and `--help` stop parsing and yield [`Parsed::Help`].
//!
//! Parsing stops after `--` only if the current command was built
//! [`with_terminator`](CommandBuilder::with_terminator). All arguments that
//! follow it are returned untouched.
//!
//! Once the arguments are consumed, flags that were not given and have an
//! [environment variable](Flag::env) are read from it, then the occurrence
//! count of every flag of the selected command is checked against its
//! [`nargs`](Flag::nargs).

mod command;
mod error;
mod flag;
mod parser;
mod usage;
mod value;

pub use crate::{
    command::{Command, CommandBuilder, CommandId, CommandRef, FlagGroup, Formatter, Handler},
    error::{BuildError, ParseError, ValueError},
    flag::Flag,
    parser::{is_flag, normalize},
    usage::write_usage,
    value::{parse_bool, parse_duration, BitField, Func, Value},
};

pub type Result<T, E = ParseError> = std::result::Result<T, E>;

/// Outcome of a successful parse.
#[derive(Debug)]
pub enum Parsed<'c, 'a> {
    /// The arguments selected `command`. `args` holds everything after the
    /// `--` terminator.
    Run { command: CommandRef<'c, 'a>, args: Vec<String> },
    /// `-h` or `--help` was given while `command` was active. Environment
    /// variables and occurrence counts were not checked.
    Help { command: CommandRef<'c, 'a> },
}

impl<'c, 'a> Parsed<'c, 'a> {
    pub fn command(&self) -> CommandRef<'c, 'a> {
        match self {
            Parsed::Run { command, .. } | Parsed::Help { command } => *command,
        }
    }

    pub fn is_help(&self) -> bool {
        matches!(self, Parsed::Help { .. })
    }

    /// Arguments that followed the terminator. Empty for help requests.
    pub fn args(&self) -> &[String] {
        match self {
            Parsed::Run { args, .. } => args,
            Parsed::Help { .. } => &[],
        }
    }
}
