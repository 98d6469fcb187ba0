//! Walks the argument list against a [`Command`] tree.
//!
//! Tokens are normalized lazily, one at a time, so that the `--` terminator
//! is recognized according to the command that is active when it shows up.

use std::{
    collections::{HashMap, VecDeque},
    ops::ControlFlow,
};

use tracing::{debug, trace};

use crate::{
    command::{CommandId, FlagId},
    Command, CommandRef, ParseError, Parsed, Result,
};

/// Ends flag parsing for commands declared `with_terminator`.
pub(crate) const TERMINATOR: &str = "--";

fn is_single_dash(arg: &str) -> bool {
    let bytes = arg.as_bytes();
    bytes.len() >= 2 && bytes[0] == b'-' && bytes[1] != b'-'
}

fn is_double_dash(arg: &str) -> bool {
    arg.len() >= 3 && arg.starts_with("--")
}

/// `-x...` and `--x...` are flags. Everything else, including `""`, `-` and
/// `--`, is positional.
pub fn is_flag(arg: &str) -> bool {
    is_single_dash(arg) || is_double_dash(arg)
}

/// How a value shares an argument with its flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attached {
    /// `-x=V`, `--flag=V`
    Equals,
    /// `-xV`
    Glued,
}

/// Splits a flag that carries its own value: `-xV` and `-x=V` into `-x` and
/// `V`, `--flag=V` into `--flag` and `V`.
fn split(arg: &str) -> Option<(&str, &str, Attached)> {
    if is_single_dash(arg) {
        let at = arg[1..].chars().next().map_or(arg.len(), |c| 1 + c.len_utf8());
        let (flag, value) = arg.split_at(at);
        if value.is_empty() {
            return None;
        }
        match value.strip_prefix('=') {
            Some(value) => Some((flag, value, Attached::Equals)),
            None => Some((flag, value, Attached::Glued)),
        }
    } else if is_double_dash(arg) {
        let (at, _) = arg.char_indices().find(|&(i, c)| i >= 3 && c == '=')?;
        Some((&arg[..at], &arg[at + 1..], Attached::Equals))
    } else {
        None
    }
}

/// Splits every argument that declares both a flag and a value into two
/// arguments.
///
/// When `with_terminator` is set, the first `--` and everything after it is
/// copied through unchanged.
///
/// ```
/// let args = ["-x=Var", "--flag=", "--foo=bar", "-vq"];
/// assert_eq!(
///     flagtree::normalize(args.map(String::from), false),
///     ["-x", "Var", "--flag", "", "--foo", "bar", "-v", "q"],
/// );
/// ```
pub fn normalize<I>(args: I, with_terminator: bool) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut res = Vec::with_capacity(args.size_hint().0);
    while let Some(arg) = args.next() {
        if with_terminator && arg == TERMINATOR {
            res.push(arg);
            res.extend(args);
            break;
        }
        match split(&arg) {
            Some((flag, value, _)) => {
                res.push(flag.to_string());
                res.push(value.to_string());
            }
            None => res.push(arg),
        }
    }
    res
}

pub(crate) fn parse<'c, 'a>(tree: &'c Command<'a>, args: Vec<String>) -> Result<Parsed<'c, 'a>> {
    let mut p = Parser::new(tree, args);
    while let Some(arg) = p.next() {
        if p.dispatch(arg)?.is_break() {
            debug!(command = %p.cmd.path(), "help requested");
            return Ok(Parsed::Help { command: p.cmd });
        }
    }
    p.parse_env_vars()?;
    p.check_nargs()?;
    Ok(Parsed::Run { command: p.cmd, args: p.args })
}

struct Parser<'c, 'a> {
    tree: &'c Command<'a>,
    cmd: CommandRef<'c, 'a>,
    /// Commands entered so far, root first.
    scopes: Vec<CommandId>,
    rargs: Vec<String>,
    terminated: bool,
    args: Vec<String>,
    flags_by_name: HashMap<String, FlagId>,
    positionals: VecDeque<FlagId>,
    subcommands_by_name: HashMap<&'c str, CommandId>,
    flags_seen: HashMap<FlagId, usize>,
}

impl<'c, 'a> Parser<'c, 'a> {
    fn new(tree: &'c Command<'a>, mut args: Vec<String>) -> Self {
        args.reverse();
        let mut res = Parser {
            tree,
            cmd: tree.root(),
            scopes: Vec::new(),
            rargs: args,
            terminated: false,
            args: Vec::new(),
            flags_by_name: HashMap::new(),
            positionals: VecDeque::new(),
            subcommands_by_name: HashMap::new(),
            flags_seen: HashMap::new(),
        };
        res.set_command(tree.root().id());
        res
    }

    /// Descends into `id`, replacing every lookup table. Flags of the
    /// commands above are no longer addressable.
    fn set_command(&mut self, id: CommandId) {
        let tree = self.tree;
        let cmd = tree.get(id);
        self.cmd = cmd;
        self.scopes.push(id);

        self.flags_by_name.clear();
        self.positionals.clear();
        for (index, flag) in cmd.flags().iter().enumerate() {
            let flag_id = FlagId { command: id, index };
            if flag.is_positional() {
                self.positionals.push_back(flag_id);
                continue;
            }
            for key in flag.keys() {
                self.flags_by_name.insert(key, flag_id);
            }
        }

        self.subcommands_by_name = cmd.subcommands().map(|it| (it.name(), it.id())).collect();
    }

    fn next(&mut self) -> Option<String> {
        self.rargs.pop()
    }

    fn push_back(&mut self, arg: String) {
        self.rargs.push(arg)
    }

    fn is_terminator(&self, arg: &str) -> bool {
        arg == TERMINATOR && self.cmd.with_terminator()
    }

    fn observe(&mut self, id: FlagId) -> usize {
        let n = self.flags_seen.entry(id).or_insert(0);
        *n += 1;
        *n
    }

    fn seen(&self, id: FlagId) -> usize {
        self.flags_seen.get(&id).copied().unwrap_or(0)
    }

    fn dispatch(&mut self, arg: String) -> Result<ControlFlow<()>> {
        trace!(arg = %arg, terminated = self.terminated, "dispatch");
        if self.terminated {
            self.args.push(arg);
            return Ok(ControlFlow::Continue(()));
        }
        if self.is_terminator(&arg) {
            debug!(command = %self.cmd.path(), "terminator reached");
            self.terminated = true;
            return Ok(ControlFlow::Continue(()));
        }
        if is_flag(&arg) {
            self.dispatch_flag(arg)
        } else {
            self.dispatch_positional(arg)?;
            Ok(ControlFlow::Continue(()))
        }
    }

    fn dispatch_positional(&mut self, arg: String) -> Result<()> {
        if let Some(&id) = self.positionals.front() {
            let tree = self.tree;
            let flag = tree.flag(id);
            let n = self.observe(id);
            if flag.max_count() > 0 && n == flag.max_count() {
                // all done with this positional
                self.positionals.pop_front();
            }
            return self.set_flag(id, arg);
        }

        if !self.cmd.has_subcommands() {
            return Err(ParseError::UnexpectedPositional { command: self.cmd.path(), token: arg });
        }
        match self.subcommands_by_name.get(arg.as_str()) {
            Some(&id) => {
                debug!(command = %self.cmd.path(), subcommand = %arg, "entering subcommand");
                self.set_command(id);
                Ok(())
            }
            None => Err(ParseError::UnrecognizedCommand { command: self.cmd.path(), token: arg }),
        }
    }

    fn dispatch_flag(&mut self, arg: String) -> Result<ControlFlow<()>> {
        let (name, attached) = match split(&arg) {
            Some((flag, value, how)) => (flag.to_string(), Some((value.to_string(), how))),
            None => (arg, None),
        };
        if name == "-h" || name == "--help" {
            return Ok(ControlFlow::Break(()));
        }

        let id = match self.flags_by_name.get(&name) {
            Some(&id) => id,
            None => {
                return Err(ParseError::UnrecognizedArgument {
                    command: self.cmd.path(),
                    token: name,
                })
            }
        };
        let tree = self.tree;
        let flag = tree.flag(id);
        self.observe(id);

        let value = match attached {
            Some((rest, Attached::Glued)) if flag.is_boolean() => {
                // `-vq` reads as `-v q`
                self.push_back(rest);
                "true".to_string()
            }
            Some((value, Attached::Equals)) if flag.is_boolean() => value,
            Some((value, _)) if is_flag(&value) => {
                return Err(ParseError::MissingValue {
                    command: self.cmd.path(),
                    flag: flag.to_string(),
                })
            }
            Some((value, _)) => value,
            None if flag.is_boolean() => "true".to_string(),
            None => self.next_value(&flag.to_string())?,
        };
        self.set_flag(id, value)?;
        Ok(ControlFlow::Continue(()))
    }

    /// Takes the argument following a flag as its value.
    fn next_value(&mut self, flag: &str) -> Result<String> {
        match self.next() {
            Some(arg) if !is_flag(&arg) => Ok(arg),
            next => {
                if let Some(arg) = next {
                    self.push_back(arg);
                }
                Err(ParseError::MissingValue { command: self.cmd.path(), flag: flag.to_string() })
            }
        }
    }

    fn set_flag(&self, id: FlagId, value: String) -> Result<()> {
        let flag = self.tree.flag(id);
        flag.set(&value).map_err(|source| ParseError::InvalidValue {
            command: self.cmd.path(),
            flag: flag.to_string(),
            value,
            source,
        })
    }

    /// Fills flags that were not given on the command line from their
    /// environment variables. Covers every command entered, not only the
    /// last one.
    fn parse_env_vars(&mut self) -> Result<()> {
        let tree = self.tree;
        for &command in &self.scopes.clone() {
            for (index, flag) in tree.get(command).flags().iter().enumerate() {
                let id = FlagId { command, index };
                let var = match flag.env_var() {
                    Some(var) if self.seen(id) == 0 => var,
                    _ => continue,
                };
                let value = match std::env::var(var) {
                    Ok(value) => value,
                    Err(_) => continue,
                };
                debug!(flag = %flag, var, "using environment variable");
                self.observe(id);
                self.set_flag(id, value)?;
            }
        }
        Ok(())
    }

    /// Checks occurrence counts of the selected command's flags.
    fn check_nargs(&self) -> Result<()> {
        let command = self.cmd.id();
        for (index, flag) in self.cmd.flags().iter().enumerate() {
            let n = self.seen(FlagId { command, index });
            if flag.min_count() > 0 && n < flag.min_count() {
                return Err(ParseError::MissingArgument {
                    command: self.cmd.path(),
                    flag: flag.to_string(),
                });
            }
            if flag.max_count() > 0 && n > flag.max_count() {
                return Err(ParseError::TooManyArguments {
                    command: self.cmd.path(),
                    flag: flag.to_string(),
                });
            }
        }
        Ok(())
    }
}
