use std::sync::Arc;

use jiff::civil::DateTime;

use crate::ast::{month_number, weekday_number, Combination, FieldKind, Tag};
use crate::error::ScheduleError;
use crate::random::RandomSource;

/// Shape of a token that resolves to a special rule rather than a value set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Special {
    /// `R`
    Random,
    /// `L`
    Last,
    /// `LW`
    LastWeekday,
    /// `?`
    NoValue,
    /// `{d}W`
    NearestWeekday(u16),
    /// `{w}L`
    LastOf(u16),
    /// `{w}#{n}`
    Nth(u16, u16),
}

impl Special {
    fn uses_w(self) -> bool {
        matches!(self, Self::LastWeekday | Self::NearestWeekday(_))
    }
}

/// Classify an upper-cased token as special syntax. `None` means a plain token.
pub fn classify(token: &str) -> Option<Special> {
    match token {
        "R" => return Some(Special::Random),
        "L" => return Some(Special::Last),
        "LW" => return Some(Special::LastWeekday),
        "?" => return Some(Special::NoValue),
        _ => {}
    }

    if let Some(day) = token.strip_suffix('W') {
        // 1-31, optionally zero-padded
        if (1..=2).contains(&day.len()) && is_digits(day) {
            let day: u16 = day.parse().ok()?;
            if (1..=31).contains(&day) {
                return Some(Special::NearestWeekday(day));
            }
        }
        return None;
    }

    if let Some(weekday) = token.strip_suffix('L') {
        return special_weekday(weekday).map(Special::LastOf);
    }

    if let Some((weekday, nth)) = token.split_once('#') {
        let weekday = special_weekday(weekday)?;
        if nth.len() == 1 && is_digits(nth) {
            let nth: u16 = nth.parse().ok()?;
            if (1..=5).contains(&nth) {
                return Some(Special::Nth(weekday, nth));
            }
        }
    }

    None
}

/// Weekday operand of `{w}L` / `{w}#{n}`: a single digit 0-7 or a name, 7 folded to Sunday.
fn special_weekday(s: &str) -> Option<u16> {
    let n = if s.len() == 1 && is_digits(s) {
        s.parse::<u16>().ok().filter(|n| *n <= 7)?
    } else {
        weekday_number(s)?
    };
    Some(n % 7)
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Resolves field tokens to value sets.
///
/// Holds the two inputs that are not a pure function of the token: the startup
/// instant used by `.`, and the random source used by `R`.
#[derive(Clone)]
pub struct Resolver {
    startup: DateTime,
    random: Arc<dyn RandomSource>,
}

impl Resolver {
    pub fn new(startup: DateTime, random: Arc<dyn RandomSource>) -> Self {
        Self { startup, random }
    }

    /// Resolve one upper-cased token of a field into a combination.
    pub fn combination(&self, token: &str, kind: FieldKind) -> Result<Combination, ScheduleError> {
        match classify(token) {
            Some(special) => self.special(special, kind),
            None => self.values(token, kind).map(Combination::Values),
        }
    }

    fn special(&self, special: Special, kind: FieldKind) -> Result<Combination, ScheduleError> {
        if special != Special::Random {
            if !kind.allows_day_specials() {
                return Err(ScheduleError::special(
                    kind,
                    "the special characters 'L', 'W', '?' and '#' are only allowed in the day-of-month and day-of-week fields",
                ));
            }
            if special.uses_w() && kind != FieldKind::DayOfMonth {
                return Err(ScheduleError::special(
                    kind,
                    "the special character 'W' is only allowed in the day-of-month field",
                ));
            }
            if matches!(special, Special::Nth(..)) && kind != FieldKind::DayOfWeek {
                return Err(ScheduleError::special(
                    kind,
                    "the special character '#' is only allowed in the day-of-week field",
                ));
            }
        }

        let combination = match special {
            Special::Random => {
                let (min, max) = kind.bounds();
                Combination::Values(vec![self.random.between(min, max)])
            }
            // Saturday in the day-of-week field
            Special::Last if kind == FieldKind::DayOfWeek => Combination::Values(vec![6]),
            Special::Last => Combination::special(Tag::Last, vec![]),
            Special::LastWeekday => Combination::special(Tag::LastWeekday, vec![]),
            Special::NoValue => Combination::special(Tag::NoValue, vec![]),
            Special::NearestWeekday(day) => Combination::special(Tag::NearestWeekday, vec![day]),
            Special::LastOf(weekday) => {
                if kind != FieldKind::DayOfWeek {
                    return Err(ScheduleError::special(
                        kind,
                        "the '{x}L' is only allowed in the day-of-week field",
                    ));
                }
                Combination::special(Tag::Last, vec![weekday])
            }
            Special::Nth(weekday, nth) => Combination::special(Tag::NthWeekday, vec![weekday, nth]),
        };
        Ok(combination)
    }

    /// Resolve a plain token to its sorted, duplicate-free values.
    ///
    /// Grammar: `*`, `.`, `N`, `A-B`, `*/S`, `A/S`, `A-B/S`, where `N`, `A`, `B`
    /// are numbers or (in the matching field) weekday/month names.
    pub fn values(&self, token: &str, kind: FieldKind) -> Result<Vec<u16>, ScheduleError> {
        let invalid = || ScheduleError::value(kind, token);
        let (min, max) = kind.bounds();

        match token {
            "*" => return Ok((min..=max).collect()),
            "." => return Ok(vec![self.startup_value(kind)]),
            _ => {}
        }

        if let Some((base, step)) = token.split_once('/') {
            let step = parse_step(step).ok_or_else(invalid)?;
            if base == "*" {
                return Ok((min..=max).step_by(step).collect());
            }
            if let Some((start, end)) = base.split_once('-') {
                let start = atom(start, kind).ok_or_else(invalid)?;
                let end = atom(end, kind).ok_or_else(invalid)?;
                return stepped_range(start, end, step, kind).ok_or_else(invalid);
            }
            let start = atom(base, kind).ok_or_else(invalid)?;
            return Ok((start..=max).step_by(step).collect());
        }

        if let Some((start, end)) = token.split_once('-') {
            let start = atom(start, kind).ok_or_else(invalid)?;
            let end = atom(end, kind).ok_or_else(invalid)?;
            return range(start, end, kind).ok_or_else(invalid);
        }

        Ok(vec![atom(token, kind).ok_or_else(invalid)?])
    }

    /// The field's component of the startup instant.
    fn startup_value(&self, kind: FieldKind) -> u16 {
        let at = &self.startup;
        let value = match kind {
            FieldKind::Second => at.second() as i16,
            FieldKind::Minute => at.minute() as i16,
            FieldKind::Hour => at.hour() as i16,
            FieldKind::DayOfMonth => at.day() as i16,
            FieldKind::Month => at.month() as i16,
            FieldKind::DayOfWeek => at.weekday().to_sunday_zero_offset() as i16,
            FieldKind::Year => at.year(),
        };
        value.max(0) as u16
    }
}

/// A single value: a number, or a weekday/month name where the field takes names.
/// Day-of-week accepts 7 and folds it to Sunday.
fn atom(s: &str, kind: FieldKind) -> Option<u16> {
    let n = if is_digits(s) {
        s.parse::<u16>().ok()?
    } else {
        match kind {
            FieldKind::DayOfWeek => weekday_number(s)?,
            FieldKind::Month => month_number(s)?,
            _ => return None,
        }
    };

    let (min, max) = kind.bounds();
    match kind {
        FieldKind::DayOfWeek if n <= 7 => Some(n % 7),
        _ if (min..=max).contains(&n) => Some(n),
        _ => None,
    }
}

fn parse_step(s: &str) -> Option<usize> {
    if !is_digits(s) {
        return None;
    }
    s.parse::<usize>().ok().filter(|step| *step > 0)
}

/// `A-B`. A descending range wraps through the field's maximum, except for years.
fn range(start: u16, end: u16, kind: FieldKind) -> Option<Vec<u16>> {
    if start <= end {
        return Some((start..=end).collect());
    }
    if kind == FieldKind::Year {
        return None;
    }
    let (min, max) = kind.bounds();
    Some((min..=end).chain(start..=max).collect())
}

/// `A-B/S`. For a wrapping range, every S-th value is taken walking from A
/// through the maximum and back around to B.
fn stepped_range(start: u16, end: u16, step: usize, kind: FieldKind) -> Option<Vec<u16>> {
    if start <= end {
        return Some((start..=end).step_by(step).collect());
    }
    if kind == FieldKind::Year {
        return None;
    }

    let (min, max) = kind.bounds();
    let mut values = Vec::new();
    let walk = (min..=max).chain(min..=max).skip_while(|v| *v != start);
    for (i, v) in walk.enumerate() {
        if i % step == 0 {
            values.push(v);
        }
        if v == end {
            break;
        }
    }
    values.sort_unstable();
    Some(values)
}
