//! The default help message.

use std::io;

use crate::{CommandRef, Flag};

/// Writes the help message of `cmd`: a usage line followed by sections for
/// positional arguments, each flag group, subcommands and environment
/// variables.
pub fn write_usage(w: &mut dyn io::Write, cmd: CommandRef<'_, '_>) -> io::Result<()> {
    write_usage_line(w, cmd)?;
    if !cmd.usage().is_empty() {
        write!(w, "\n{}\n", cmd.usage())?;
    }
    write_positionals(w, cmd)?;
    for (group, flags) in cmd.flag_groups() {
        write_flag_group(w, group.usage(), flags)?;
    }
    write_subcommands(w, cmd)?;
    write_env_vars(w, cmd)?;
    if !cmd.synopsis().is_empty() {
        write!(w, "\n{}\n", cmd.synopsis())?;
    }
    Ok(())
}

fn visible_positionals<'c, 'a>(cmd: CommandRef<'c, 'a>) -> impl Iterator<Item = &'c Flag<'a>> {
    cmd.positionals().filter(|it| !it.is_hidden())
}

fn has_options(cmd: CommandRef<'_, '_>) -> bool {
    cmd.ancestors().any(|it| it.flags().iter().any(|flag| !flag.is_hidden() && !flag.is_positional()))
}

fn write_usage_line(w: &mut dyn io::Write, cmd: CommandRef<'_, '_>) -> io::Result<()> {
    write!(w, "Usage: {}", cmd.path())?;
    if has_options(cmd) {
        write!(w, " [OPTIONS]")?;
    }
    if cmd.has_subcommands() {
        write!(w, " COMMAND")?;
    }
    for flag in visible_positionals(cmd) {
        let name = flag.name().to_uppercase();
        match (flag.min_count(), flag.max_count()) {
            (0, 1) => write!(w, " [{name}]")?,
            (0, _) => write!(w, " [{name}...]")?,
            (1, 1) => write!(w, " {name}")?,
            _ => write!(w, " {name}...")?,
        }
    }
    writeln!(w)
}

fn with_default(flag: &Flag<'_>) -> String {
    if flag.shows_default() {
        format!("{} (default: {})", flag.usage_text(), flag.render_value())
    } else {
        flag.usage_text().to_string()
    }
}

fn write_positionals(w: &mut dyn io::Write, cmd: CommandRef<'_, '_>) -> io::Result<()> {
    let mut table = Table::new(2);
    for flag in visible_positionals(cmd) {
        table.row([format!("  {}", flag.name().to_uppercase()), with_default(flag)]);
    }
    if table.is_empty() {
        return Ok(());
    }
    write!(w, "\nPositional arguments:\n")?;
    table.write(w)
}

fn write_flag_group(w: &mut dyn io::Write, heading: &str, flags: &[Flag<'_>]) -> io::Result<()> {
    let mut table = Table::new(1);
    for flag in flags.iter().filter(|it| !it.is_hidden() && !it.is_positional()) {
        let name = if flag.name().is_empty() { String::new() } else { format!("--{}", flag.name()) };
        let short = match flag.short_name() {
            Some(short) if name.is_empty() => format!("-{short}"),
            Some(short) => format!("-{short},"),
            None => String::new(),
        };
        table.row([format!("  {short}"), name, format!(" {}", with_default(flag))]);
    }
    if table.is_empty() {
        return Ok(());
    }
    write!(w, "\n{heading}:\n")?;
    table.write(w)
}

fn write_subcommands(w: &mut dyn io::Write, cmd: CommandRef<'_, '_>) -> io::Result<()> {
    let mut table = Table::new(2);
    for sub in cmd.subcommands().filter(|it| !it.is_hidden()) {
        table.row([format!("  {}", sub.name()), sub.usage().to_string()]);
    }
    if table.is_empty() {
        return Ok(());
    }
    write!(w, "\nCommands:\n")?;
    table.write(w)
}

/// Lists the environment variables of `cmd` and its ancestors, outermost
/// first.
fn write_env_vars(w: &mut dyn io::Write, cmd: CommandRef<'_, '_>) -> io::Result<()> {
    let mut scopes = cmd.ancestors().collect::<Vec<_>>();
    scopes.reverse();

    let mut table = Table::new(2);
    for scope in scopes {
        for flag in scope.flags().iter().filter(|it| !it.is_hidden()) {
            if let Some(var) = flag.env_var() {
                table.row([format!("  {var}"), flag.usage_text().to_string()]);
            }
        }
    }
    if table.is_empty() {
        return Ok(());
    }
    write!(w, "\nEnvironment variables:\n")?;
    table.write(w)
}

/// Left aligned columns. Every cell but the last in a row is padded to the
/// widest cell of its column plus `padding` spaces.
struct Table {
    padding: usize,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn new(padding: usize) -> Table {
        Table { padding, rows: Vec::new() }
    }

    fn row<const N: usize>(&mut self, cells: [String; N]) {
        self.rows.push(cells.into());
    }

    fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn write(&self, w: &mut dyn io::Write) -> io::Result<()> {
        let columns = self.rows.iter().map(|it| it.len()).max().unwrap_or(0);
        let widths = (0..columns.saturating_sub(1))
            .map(|i| {
                self.rows.iter().filter_map(|row| row.get(i)).map(|it| it.chars().count()).max().unwrap_or(0)
            })
            .collect::<Vec<_>>();

        for row in &self.rows {
            let mut line = String::new();
            for (i, cell) in row.iter().enumerate() {
                line.push_str(cell);
                if let Some(&width) = widths.get(i) {
                    let pad = width + self.padding - cell.chars().count();
                    line.extend(std::iter::repeat(' ').take(pad));
                }
            }
            writeln!(w, "{line}")?;
        }
        Ok(())
    }
}
