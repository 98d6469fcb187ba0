use std::{collections::HashSet, fmt, io};

use crate::{parser, usage, BuildError, Flag, ParseError, Parsed, Result};

/// Handler invoked by [`Command::run`] with the arguments that followed the
/// `--` terminator. Its return value becomes the exit code.
pub type Handler<'a> = Box<dyn Fn(&[String]) -> i32 + 'a>;

/// Writes the help message of a command.
pub type Formatter = fn(&mut dyn io::Write, CommandRef<'_, '_>) -> io::Result<()>;

/// Index of a command inside its [`Command`] tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId(pub(crate) usize);

/// Identity of a flag inside its [`Command`] tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct FlagId {
    pub(crate) command: CommandId,
    pub(crate) index: usize,
}

/// A named run of a command's flags, shown under a common heading in help
/// messages.
#[derive(Debug, Clone)]
pub struct FlagGroup {
    name: String,
    usage: String,
    flags: std::ops::Range<usize>,
}

impl FlagGroup {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn usage(&self) -> &str {
        &self.usage
    }
}

pub(crate) struct Node<'a> {
    name: String,
    usage: String,
    synopsis: String,
    hidden: bool,
    with_terminator: bool,
    flags: Vec<Flag<'a>>,
    groups: Vec<FlagGroup>,
    subcommands: Vec<CommandId>,
    parent: Option<CommandId>,
    handler: Option<Handler<'a>>,
    formatter: Option<Formatter>,
}

/// An immutable tree of commands, built with [`Command::new`].
///
/// Parsing borrows the tree and writes only to the value sinks its flags
/// point at, so a tree may be parsed any number of times.
pub struct Command<'a> {
    nodes: Vec<Node<'a>>,
}

impl<'a> Command<'a> {
    /// Starts building a command. `usage` is a one line description.
    pub fn new(name: &str, usage: &str) -> CommandBuilder<'a> {
        CommandBuilder {
            name: name.to_string(),
            usage: usage.to_string(),
            synopsis: String::new(),
            hidden: false,
            with_terminator: false,
            groups: vec![GroupBuilder {
                name: "options".to_string(),
                usage: "Options".to_string(),
                flags: Vec::new(),
            }],
            subcommands: Vec::new(),
            handler: None,
            formatter: None,
        }
    }

    pub fn root(&self) -> CommandRef<'_, 'a> {
        self.get(CommandId(0))
    }

    pub fn get(&self, id: CommandId) -> CommandRef<'_, 'a> {
        CommandRef { tree: self, id }
    }

    pub(crate) fn node(&self, id: CommandId) -> &Node<'a> {
        &self.nodes[id.0]
    }

    pub(crate) fn flag(&self, id: FlagId) -> &Flag<'a> {
        &self.node(id.command).flags[id.index]
    }

    /// Parses `args`, which must not include the program name, and stores
    /// the value of each flag in its sink.
    ///
    /// Returns the command selected by the arguments, or a help request if
    /// `-h` or `--help` was given.
    pub fn parse<I>(&self, args: I) -> Result<Parsed<'_, 'a>>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        parser::parse(self, args.into_iter().map(Into::into).collect())
    }

    /// Parses the arguments of the current process.
    pub fn parse_env(&self) -> Result<Parsed<'_, 'a>> {
        let args = std::env::args_os()
            .skip(1)
            .map(|arg| {
                arg.into_string()
                    .map_err(|arg| ParseError::NonUtf8 { command: self.root().path(), arg })
            })
            .collect::<Result<Vec<_>>>()?;
        parser::parse(self, args)
    }

    /// Parses `args` and calls the handler of the selected command,
    /// returning an exit code.
    ///
    /// Help requests print usage to stdout and return 0. Argument errors,
    /// and commands without a handler, print to stderr and return 1.
    pub fn run<I>(&self, args: I) -> i32
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.dispatch(self.parse(args))
    }

    /// [`Command::run`] with the arguments of the current process.
    pub fn run_env(&self) -> i32 {
        self.dispatch(self.parse_env())
    }

    fn dispatch(&self, parsed: Result<Parsed<'_, 'a>>) -> i32 {
        match parsed {
            Ok(Parsed::Help { command }) => match command.write_usage(&mut io::stdout()) {
                Ok(()) => 0,
                Err(err) => {
                    eprintln!("Error: {err}");
                    1
                }
            },
            Ok(Parsed::Run { command, args }) => match command.handler() {
                Some(handler) => handler(args.as_slice()),
                None => {
                    if let Err(err) = command.write_usage(&mut io::stderr()) {
                        eprintln!("Error: {err}");
                    }
                    1
                }
            },
            Err(err) => {
                eprintln!("Argument error: {err}");
                1
            }
        }
    }
}

impl fmt::Debug for Command<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.root(), f)
    }
}

/// A view of one command inside a [`Command`] tree.
#[derive(Clone, Copy)]
pub struct CommandRef<'c, 'a> {
    tree: &'c Command<'a>,
    id: CommandId,
}

impl<'c, 'a> CommandRef<'c, 'a> {
    fn node(&self) -> &'c Node<'a> {
        self.tree.node(self.id)
    }

    pub fn id(&self) -> CommandId {
        self.id
    }

    pub fn name(&self) -> &'c str {
        &self.node().name
    }

    pub fn usage(&self) -> &'c str {
        &self.node().usage
    }

    pub fn synopsis(&self) -> &'c str {
        &self.node().synopsis
    }

    pub fn is_hidden(&self) -> bool {
        self.node().hidden
    }

    /// Whether arguments after `--` are passed through untouched.
    pub fn with_terminator(&self) -> bool {
        self.node().with_terminator
    }

    /// Flags in declaration order, group by group.
    pub fn flags(&self) -> &'c [Flag<'a>] {
        &self.node().flags
    }

    pub fn flag_groups(&self) -> impl Iterator<Item = (&'c FlagGroup, &'c [Flag<'a>])> {
        let node = self.node();
        node.groups.iter().map(move |group| (group, &node.flags[group.flags.clone()]))
    }

    pub fn positionals(&self) -> impl Iterator<Item = &'c Flag<'a>> {
        self.flags().iter().filter(|it| it.is_positional())
    }

    pub fn subcommands(&self) -> impl Iterator<Item = CommandRef<'c, 'a>> {
        let tree = self.tree;
        self.node().subcommands.iter().map(move |&id| tree.get(id))
    }

    pub fn has_subcommands(&self) -> bool {
        !self.node().subcommands.is_empty()
    }

    pub fn parent(&self) -> Option<CommandRef<'c, 'a>> {
        self.node().parent.map(|id| self.tree.get(id))
    }

    /// This command followed by its parent, up to the root.
    pub fn ancestors(&self) -> impl Iterator<Item = CommandRef<'c, 'a>> {
        std::iter::successors(Some(*self), |it| it.parent())
    }

    /// Space separated names from the root down to this command.
    pub fn path(&self) -> String {
        let mut names = self.ancestors().map(|it| it.name()).collect::<Vec<_>>();
        names.reverse();
        names.join(" ")
    }

    pub fn handler(&self) -> Option<&'c (dyn Fn(&[String]) -> i32 + 'a)> {
        self.node().handler.as_deref()
    }

    /// The formatter of this command or of its closest ancestor that has one.
    pub fn formatter(&self) -> Formatter {
        self.ancestors().find_map(|it| it.node().formatter).unwrap_or(usage::write_usage)
    }

    /// Writes the help message using [`CommandRef::formatter`].
    pub fn write_usage(&self, w: &mut dyn io::Write) -> io::Result<()> {
        (self.formatter())(w, *self)
    }
}

impl fmt::Display for CommandRef<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for CommandRef<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("path", &self.path())
            .field("flags", &self.flags())
            .field("subcommands", &self.subcommands().map(|it| it.name()).collect::<Vec<_>>())
            .finish()
    }
}

struct GroupBuilder<'a> {
    name: String,
    usage: String,
    flags: Vec<Flag<'a>>,
}

/// Declares a command, its flags and its subcommands.
///
/// Nothing is checked until [`CommandBuilder::build`], which rejects trees
/// that could not be parsed unambiguously.
pub struct CommandBuilder<'a> {
    name: String,
    usage: String,
    synopsis: String,
    hidden: bool,
    with_terminator: bool,
    groups: Vec<GroupBuilder<'a>>,
    subcommands: Vec<CommandBuilder<'a>>,
    handler: Option<Handler<'a>>,
    formatter: Option<Formatter>,
}

impl<'a> CommandBuilder<'a> {
    /// Adds flags to the default "Options" group.
    pub fn flags<I>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = Flag<'a>>,
    {
        self.groups[0].flags.extend(flags);
        self
    }

    pub fn flag(self, flag: Flag<'a>) -> Self {
        self.flags([flag])
    }

    /// Adds flags shown under their own `usage` heading in help messages.
    ///
    /// Groups keep the order they were added in, after the default group.
    /// Positional arguments are filled in that same order, so a positional
    /// declared with [`flags`](Self::flags) comes before one in any group.
    pub fn flag_group<I>(mut self, name: &str, usage: &str, flags: I) -> Self
    where
        I: IntoIterator<Item = Flag<'a>>,
    {
        self.groups.push(GroupBuilder {
            name: name.to_string(),
            usage: usage.to_string(),
            flags: flags.into_iter().collect(),
        });
        self
    }

    pub fn subcommand(mut self, cmd: CommandBuilder<'a>) -> Self {
        self.subcommands.push(cmd);
        self
    }

    pub fn subcommands<I>(mut self, cmds: I) -> Self
    where
        I: IntoIterator<Item = CommandBuilder<'a>>,
    {
        self.subcommands.extend(cmds);
        self
    }

    /// Detailed text printed at the end of the help message.
    pub fn synopsis(mut self, synopsis: &str) -> Self {
        self.synopsis = synopsis.to_string();
        self
    }

    /// Hides the command from help messages. It can still be invoked.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Passes every argument after `--` through to the command untouched.
    pub fn with_terminator(mut self) -> Self {
        self.with_terminator = true;
        self
    }

    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&[String]) -> i32 + 'a,
    {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Custom help formatter, inherited by subcommands without their own.
    pub fn formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Checks the whole tree and freezes it.
    pub fn build(self) -> Result<Command<'a>, BuildError> {
        let mut nodes = Vec::new();
        insert(&mut nodes, self, None, "")?;
        Ok(Command { nodes })
    }
}

impl fmt::Debug for CommandBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBuilder").field("name", &self.name).finish_non_exhaustive()
    }
}

fn insert<'a>(
    nodes: &mut Vec<Node<'a>>,
    cmd: CommandBuilder<'a>,
    parent: Option<CommandId>,
    parent_path: &str,
) -> Result<CommandId, BuildError> {
    let path =
        if parent_path.is_empty() { cmd.name.clone() } else { format!("{parent_path} {}", cmd.name) };

    check(&cmd, &path)?;

    let id = CommandId(nodes.len());
    let mut flags = Vec::new();
    let mut groups = Vec::new();
    for group in cmd.groups {
        let start = flags.len();
        flags.extend(group.flags);
        groups.push(FlagGroup { name: group.name, usage: group.usage, flags: start..flags.len() });
    }
    nodes.push(Node {
        name: cmd.name,
        usage: cmd.usage,
        synopsis: cmd.synopsis,
        hidden: cmd.hidden,
        with_terminator: cmd.with_terminator,
        flags,
        groups,
        subcommands: Vec::new(),
        parent,
        handler: cmd.handler,
        formatter: cmd.formatter,
    });

    for sub in cmd.subcommands {
        let sub = insert(nodes, sub, Some(id), &path)?;
        nodes[id.0].subcommands.push(sub);
    }
    Ok(id)
}

fn check(cmd: &CommandBuilder<'_>, path: &str) -> Result<(), BuildError> {
    let command = || path.to_string();
    let flags = cmd.groups.iter().flat_map(|it| &it.flags);

    let mut seen = HashSet::new();
    let mut unbounded_positional = false;
    for flag in flags {
        if flag.name.is_empty() && flag.short.is_none() {
            return Err(BuildError::InvalidName { command: command(), name: String::new() });
        }
        if flag.name.starts_with('-') || flag.name.contains('=') {
            return Err(BuildError::InvalidName { command: command(), name: flag.name.clone() });
        }
        if flag.positional && flag.name.is_empty() {
            return Err(BuildError::InvalidName {
                command: command(),
                name: flag.short.clone().unwrap_or_default(),
            });
        }
        if let Some(short) = &flag.short {
            let mut chars = short.chars();
            let valid = matches!((chars.next(), chars.next()), (Some(c), None) if c != '-' && c != '=');
            if !valid {
                return Err(BuildError::InvalidShortName {
                    command: command(),
                    flag: flag.to_string(),
                    short: short.clone(),
                });
            }
        }
        if flag.max != 0 && flag.min > flag.max {
            return Err(BuildError::InvalidArity {
                command: command(),
                flag: flag.to_string(),
                min: flag.min,
                max: flag.max,
            });
        }

        for key in flag.keys() {
            if key == "--help" || key == "-h" {
                return Err(BuildError::ReservedFlag { command: command(), flag: key });
            }
            if !seen.insert(key.clone()) {
                return Err(BuildError::DuplicateFlag { command: command(), flag: key });
            }
        }

        if flag.positional {
            if !cmd.subcommands.is_empty() {
                return Err(BuildError::PositionalWithSubcommands { command: command() });
            }
            if unbounded_positional {
                return Err(BuildError::PositionalAfterUnbounded {
                    command: command(),
                    flag: flag.to_string(),
                });
            }
            unbounded_positional = flag.max == 0;
        }
    }

    let mut names = HashSet::new();
    for sub in &cmd.subcommands {
        if sub.name.is_empty() || sub.name.starts_with('-') {
            return Err(BuildError::InvalidName { command: command(), name: sub.name.clone() });
        }
        if !names.insert(sub.name.as_str()) {
            return Err(BuildError::DuplicateCommand { command: command(), name: sub.name.clone() });
        }
    }
    Ok(())
}
