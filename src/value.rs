//! Value sinks.
//!
//! A flag never owns the variable it writes to. The program keeps its values
//! in [`Cell`]s and [`RefCell`]s and hands the flag a shared reference; the
//! parser calls [`Value::set`] once per occurrence, in command line order.

use std::{
    cell::{Cell, RefCell},
    collections::BTreeSet,
    ffi::OsString,
    fmt,
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use crate::ValueError;

/// The dynamic value stored in a flag.
pub trait Value {
    /// Parses `raw` and stores it.
    fn set(&self, raw: &str) -> Result<(), ValueError>;

    /// Boolean values may be given without an argument, in which case they
    /// are set to `"true"`.
    fn is_bool_flag(&self) -> bool {
        false
    }

    /// The current value, used to show defaults in help output.
    fn render(&self) -> String;
}

impl<T: Value + ?Sized> Value for &T {
    fn set(&self, raw: &str) -> Result<(), ValueError> {
        (**self).set(raw)
    }

    fn is_bool_flag(&self) -> bool {
        (**self).is_bool_flag()
    }

    fn render(&self) -> String {
        (**self).render()
    }
}

/// Accepts `1`, `t`, `T`, `TRUE`, `true`, `True` and their false
/// counterparts.
pub fn parse_bool(raw: &str) -> Result<bool, ValueError> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(format!("invalid boolean value: {raw:?}").into()),
    }
}

impl Value for Cell<bool> {
    fn set(&self, raw: &str) -> Result<(), ValueError> {
        Cell::set(self, parse_bool(raw)?);
        Ok(())
    }

    fn is_bool_flag(&self) -> bool {
        true
    }

    fn render(&self) -> String {
        self.get().to_string()
    }
}

macro_rules! from_str_cell {
    ($($ty:ty),*) => {$(
        impl Value for Cell<$ty> {
            fn set(&self, raw: &str) -> Result<(), ValueError> {
                let value = raw.parse::<$ty>()?;
                Cell::set(self, value);
                Ok(())
            }

            fn render(&self) -> String {
                self.get().to_string()
            }
        }
    )*};
}

from_str_cell!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, char);

impl Value for Cell<Duration> {
    fn set(&self, raw: &str) -> Result<(), ValueError> {
        Cell::set(self, parse_duration(raw)?);
        Ok(())
    }

    fn render(&self) -> String {
        format!("{:?}", self.get())
    }
}

impl Value for RefCell<String> {
    fn set(&self, raw: &str) -> Result<(), ValueError> {
        *self.borrow_mut() = raw.to_string();
        Ok(())
    }

    fn render(&self) -> String {
        self.borrow().clone()
    }
}

impl Value for RefCell<PathBuf> {
    fn set(&self, raw: &str) -> Result<(), ValueError> {
        *self.borrow_mut() = PathBuf::from(raw);
        Ok(())
    }

    fn render(&self) -> String {
        self.borrow().display().to_string()
    }
}

impl Value for RefCell<OsString> {
    fn set(&self, raw: &str) -> Result<(), ValueError> {
        *self.borrow_mut() = OsString::from(raw);
        Ok(())
    }

    fn render(&self) -> String {
        self.borrow().to_string_lossy().into_owned()
    }
}

impl<T> Value for RefCell<Option<T>>
where
    T: FromStr + fmt::Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    fn set(&self, raw: &str) -> Result<(), ValueError> {
        *self.borrow_mut() = Some(raw.parse::<T>()?);
        Ok(())
    }

    fn render(&self) -> String {
        self.borrow().as_ref().map(|it| it.to_string()).unwrap_or_default()
    }
}

/// Each occurrence is appended, so the vector keeps any values it held
/// before parsing.
impl<T> Value for RefCell<Vec<T>>
where
    T: FromStr + fmt::Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    fn set(&self, raw: &str) -> Result<(), ValueError> {
        let value = raw.parse::<T>()?;
        self.borrow_mut().push(value);
        Ok(())
    }

    fn render(&self) -> String {
        let items = self.borrow().iter().map(|it| it.to_string()).collect::<Vec<_>>();
        format!("[{}]", items.join(" "))
    }
}

impl<T> Value for RefCell<BTreeSet<T>>
where
    T: FromStr + Ord + fmt::Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    fn set(&self, raw: &str) -> Result<(), ValueError> {
        let value = raw.parse::<T>()?;
        self.borrow_mut().insert(value);
        Ok(())
    }

    fn render(&self) -> String {
        let items = self.borrow().iter().map(|it| it.to_string()).collect::<Vec<_>>();
        format!("[{}]", items.join(" "))
    }
}

/// Toggles the bits of `mask` in a shared `u64`. Several bit fields may point
/// at the same cell.
pub struct BitField<'a> {
    bits: &'a Cell<u64>,
    mask: u64,
}

impl<'a> BitField<'a> {
    /// Creates the field and applies `default` to the masked bits.
    pub fn new(bits: &'a Cell<u64>, mask: u64, default: bool) -> Self {
        let res = BitField { bits, mask };
        res.apply(default);
        res
    }

    fn apply(&self, on: bool) {
        let bits = self.bits.get();
        self.bits.set(if on { bits | self.mask } else { bits & !self.mask });
    }
}

impl Value for BitField<'_> {
    fn set(&self, raw: &str) -> Result<(), ValueError> {
        self.apply(parse_bool(raw)?);
        Ok(())
    }

    fn is_bool_flag(&self) -> bool {
        true
    }

    fn render(&self) -> String {
        format!("{:#x}", self.bits.get())
    }
}

/// Calls a closure with every raw value.
pub struct Func<F>(pub F);

impl<F> Value for Func<F>
where
    F: Fn(&str) -> Result<(), ValueError>,
{
    fn set(&self, raw: &str) -> Result<(), ValueError> {
        (self.0)(raw)
    }

    fn render(&self) -> String {
        String::new()
    }
}

/// Parses durations such as `300ms`, `1.5h` or `2h45m`.
///
/// Valid units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`. A bare `0`
/// is accepted without a unit.
pub fn parse_duration(raw: &str) -> Result<Duration, ValueError> {
    if raw == "0" {
        return Ok(Duration::ZERO);
    }
    if raw.is_empty() {
        return Err("invalid duration: \"\"".into());
    }

    let invalid = || -> ValueError { format!("invalid duration: {raw:?}").into() };

    let mut nanos: u128 = 0;
    let mut rest = raw;
    while !rest.is_empty() {
        let num_len = rest.find(|c: char| !(c.is_ascii_digit() || c == '.')).unwrap_or(rest.len());
        let (num, tail) = rest.split_at(num_len);
        let unit_len = tail.find(|c: char| c.is_ascii_digit() || c == '.').unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);

        let scale: u128 = match unit {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 60 * 60 * 1_000_000_000,
            "" => return Err(format!("missing unit in duration: {raw:?}").into()),
            _ => return Err(format!("unknown unit {unit:?} in duration: {raw:?}").into()),
        };

        let (int, frac) = num.split_once('.').unwrap_or((num, ""));
        if (int.is_empty() && frac.is_empty()) || frac.contains('.') {
            return Err(invalid());
        }
        if !int.is_empty() {
            let int = int.parse::<u128>().map_err(|_| invalid())?;
            nanos = int.checked_mul(scale).and_then(|it| it.checked_add(nanos)).ok_or_else(invalid)?;
        }
        if !frac.is_empty() {
            let frac = format!("0.{frac}").parse::<f64>().map_err(|_| invalid())?;
            let frac = (frac * scale as f64).round() as u128;
            nanos = nanos.checked_add(frac).ok_or_else(invalid)?;
        }
        rest = tail;
    }

    let secs = u64::try_from(nanos / 1_000_000_000).map_err(|_| invalid())?;
    Ok(Duration::new(secs, (nanos % 1_000_000_000) as u32))
}
