use std::{cell::RefCell, fmt};

use crate::{Func, Value, ValueError};

pub(crate) const DEFAULT_MIN_COUNT: usize = 0;
pub(crate) const DEFAULT_MAX_COUNT: usize = 1;

type Validator<'a> = Box<dyn Fn(&str) -> Result<(), ValueError> + 'a>;

/// A command line flag: a named option, a short option, a positional
/// argument, or any mix of a name and a short name.
///
/// Flags are plain descriptors. They are configured by chaining methods on
/// the value returned from [`Flag::new`] and are checked for consistency
/// when the owning command is built.
///
/// ```
/// use std::cell::{Cell, RefCell};
/// use flagtree::Flag;
///
/// let verbose = Cell::new(false);
/// let out = RefCell::new(String::from("-"));
///
/// let _ = Flag::new(&verbose, "verbose").short("v").usage("Print more");
/// let _ = Flag::new(&out, "out").env("APP_OUT").show_default();
/// ```
pub struct Flag<'a> {
    pub(crate) name: String,
    pub(crate) short: Option<String>,
    pub(crate) usage: String,
    pub(crate) positional: bool,
    pub(crate) min: usize,
    pub(crate) max: usize,
    pub(crate) env: Option<String>,
    pub(crate) hidden: bool,
    pub(crate) show_default: bool,
    validators: Vec<Validator<'a>>,
    value: Box<dyn Value + 'a>,
}

impl<'a> Flag<'a> {
    /// Declares a flag storing into `value`.
    ///
    /// A one character `name` declares the short form only, so
    /// `Flag::new(&n, "n")` is specified as `-n`.
    pub fn new(value: impl Value + 'a, name: &str) -> Flag<'a> {
        let (name, short) = if name.chars().count() == 1 {
            (String::new(), Some(name.to_string()))
        } else {
            (name.to_string(), None)
        };
        Flag {
            name,
            short,
            usage: String::new(),
            positional: false,
            min: DEFAULT_MIN_COUNT,
            max: DEFAULT_MAX_COUNT,
            env: None,
            hidden: false,
            show_default: false,
            validators: Vec::new(),
            value: Box::new(value),
        }
    }

    /// Declares a repeatable flag appending into `values`, `nargs(0, 0)`.
    pub fn list<T>(values: &'a RefCell<Vec<T>>, name: &str) -> Flag<'a>
    where
        RefCell<Vec<T>>: Value,
    {
        Flag::new(values, name).nargs(0, 0)
    }

    /// Declares a flag which calls `f` with every value it is given.
    pub fn func<F>(name: &str, f: F) -> Flag<'a>
    where
        F: Fn(&str) -> Result<(), ValueError> + 'a,
    {
        Flag::new(Func(f), name)
    }

    /// Alternative single character name, specified as `-x`.
    pub fn short(mut self, name: &str) -> Self {
        self.short = Some(name.to_string());
        self
    }

    /// Short description shown in help messages.
    pub fn usage(mut self, usage: &str) -> Self {
        self.usage = usage.to_string();
        self
    }

    /// Makes this a positional argument, matched by position instead of by
    /// name. The name is still used in help messages and errors.
    pub fn positional(mut self) -> Self {
        self.positional = true;
        self
    }

    /// How many times the flag may be specified. [`Value::set`] is called
    /// once per occurrence. A `max` of 0 means unbounded.
    pub fn nargs(mut self, min: usize, max: usize) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Shorthand for `nargs(1, 1)`.
    pub fn required(self) -> Self {
        self.nargs(1, 1)
    }

    /// Reads the value from the environment variable `var` when the flag is
    /// absent from the command line.
    pub fn env(mut self, var: &str) -> Self {
        self.env = Some(var.to_string());
        self
    }

    /// Parsed but not listed in help messages.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Lists the value held before parsing as the default in help messages.
    pub fn show_default(mut self) -> Self {
        self.show_default = true;
        self
    }

    /// Runs `f` on every raw value before it reaches the sink. Validators run
    /// in the order they were added.
    pub fn validate<F, E>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Result<(), E> + 'a,
        E: Into<ValueError>,
    {
        self.validators.push(Box::new(move |raw| f(raw).map_err(Into::into)));
        self
    }

    /// Restricts the flag to one of `choices`.
    pub fn choices<I, S>(self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let choices = choices.into_iter().map(Into::into).collect::<Vec<String>>();
        self.validate(move |raw| {
            if choices.iter().any(|it| it == raw) {
                Ok(())
            } else {
                Err(format!("invalid value: {raw} (expected one of: {})", choices.join(", ")))
            }
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn short_name(&self) -> Option<&str> {
        self.short.as_deref()
    }

    pub fn usage_text(&self) -> &str {
        &self.usage
    }

    pub fn is_positional(&self) -> bool {
        self.positional
    }

    pub fn min_count(&self) -> usize {
        self.min
    }

    pub fn max_count(&self) -> usize {
        self.max
    }

    pub fn env_var(&self) -> Option<&str> {
        self.env.as_deref()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn shows_default(&self) -> bool {
        self.show_default
    }

    /// Whether the flag is set by its mere presence.
    pub fn is_boolean(&self) -> bool {
        self.value.is_bool_flag()
    }

    /// Current value of the sink.
    pub fn render_value(&self) -> String {
        self.value.render()
    }

    /// Validates `raw` and stores it in the sink.
    pub(crate) fn set(&self, raw: &str) -> Result<(), ValueError> {
        for validate in &self.validators {
            validate(raw)?;
        }
        self.value.set(raw)
    }

    /// Lookup keys in a command's flag namespace, `--name` and `-s`.
    pub(crate) fn keys(&self) -> impl Iterator<Item = String> + '_ {
        let long = (!self.name.is_empty()).then(|| format!("--{}", self.name));
        let short = self.short.as_ref().map(|it| format!("-{it}"));
        long.into_iter().chain(short)
    }
}

impl fmt::Display for Flag<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.positional {
            return write!(f, "{}", self.name.to_uppercase());
        }
        match &self.short {
            Some(short) if self.name.is_empty() => write!(f, "-{short}"),
            _ => write!(f, "--{}", self.name),
        }
    }
}

impl fmt::Debug for Flag<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flag")
            .field("name", &self.name)
            .field("short", &self.short)
            .field("positional", &self.positional)
            .field("min", &self.min)
            .field("max", &self.max)
            .field("env", &self.env)
            .finish()
    }
}
