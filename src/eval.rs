use jiff::civil::{Date, DateTime, Weekday};
use jiff::{Span, Zoned};

use crate::ast::*;

/// Outcome of a next-fire search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum SearchState {
    /// A fire time was found.
    Found,
    /// `@reboot` schedule: fire once at startup, never again.
    OnceExec,
    /// No future time satisfies every field.
    NoMatches,
    /// The reference instant was unset.
    ZeroTime,
}

impl SearchState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Found => "found",
            Self::OnceExec => "once-exec",
            Self::NoMatches => "no-matches",
            Self::ZeroTime => "zero-time",
        }
    }
}

/// A search result. `time` is set exactly when `state` is [`SearchState::Found`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Next {
    pub time: Option<Zoned>,
    pub state: SearchState,
}

impl Next {
    fn found(time: Zoned) -> Self {
        Self {
            time: Some(time),
            state: SearchState::Found,
        }
    }

    fn empty(state: SearchState) -> Self {
        Self { time: None, state }
    }

    pub fn is_found(&self) -> bool {
        self.state == SearchState::Found
    }
}

/// The six search scopes, outermost first. The discriminant indexes [`Parts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl Scope {
    const ALL: [Scope; 6] = [
        Self::Year,
        Self::Month,
        Self::Day,
        Self::Hour,
        Self::Minute,
        Self::Second,
    ];

    fn inner(self) -> Option<Scope> {
        match self {
            Self::Year => Some(Self::Month),
            Self::Month => Some(Self::Day),
            Self::Day => Some(Self::Hour),
            Self::Hour => Some(Self::Minute),
            Self::Minute => Some(Self::Second),
            Self::Second => None,
        }
    }

    fn outer(self) -> Option<Scope> {
        match self {
            Self::Year => None,
            Self::Month => Some(Self::Year),
            Self::Day => Some(Self::Month),
            Self::Hour => Some(Self::Day),
            Self::Minute => Some(Self::Hour),
            Self::Second => Some(Self::Minute),
        }
    }

    /// Scopes strictly inside this one.
    fn below(self) -> impl Iterator<Item = Scope> {
        std::iter::successors(self.inner(), |s| s.inner())
    }

    /// One unit of this scope.
    fn unit(self) -> Span {
        match self {
            Self::Year => Span::new().years(1),
            Self::Month => Span::new().months(1),
            Self::Day => Span::new().days(1),
            Self::Hour => Span::new().hours(1),
            Self::Minute => Span::new().minutes(1),
            Self::Second => Span::new().seconds(1),
        }
    }

    /// Smallest calendar value of the scope.
    fn minimum(self) -> i16 {
        match self {
            Self::Month | Self::Day => 1,
            _ => 0,
        }
    }
}

/// A civil datetime broken into scope-indexed components.
#[derive(Debug, Clone, Copy)]
struct Parts([i16; 6]);

impl Parts {
    fn of(dt: DateTime) -> Self {
        Self([
            dt.year(),
            dt.month().into(),
            dt.day().into(),
            dt.hour().into(),
            dt.minute().into(),
            dt.second().into(),
        ])
    }

    fn get(&self, scope: Scope) -> i16 {
        self.0[scope as usize]
    }

    fn set(&mut self, scope: Scope, value: i16) {
        self.0[scope as usize] = value;
    }

    fn build(self) -> Option<DateTime> {
        let [year, month, day, hour, minute, second] = self.0;
        DateTime::new(
            year,
            month as i8,
            day as i8,
            hour as i8,
            minute as i8,
            second as i8,
            0,
        )
        .ok()
    }
}

/// Scope-by-scope search over a schedule's fields in civil time.
struct Search<'a> {
    fields: &'a Fields,
}

impl<'a> Search<'a> {
    fn new(fields: &'a Fields) -> Self {
        Self { fields }
    }

    fn field(&self, scope: Scope) -> &'a Field {
        match scope {
            Scope::Year => &self.fields.year,
            Scope::Month => &self.fields.month,
            Scope::Day => &self.fields.day_of_month,
            Scope::Hour => &self.fields.hour,
            Scope::Minute => &self.fields.minute,
            Scope::Second => &self.fields.second,
        }
    }

    fn candidates(&self, scope: Scope, parts: &Parts) -> Vec<u16> {
        match scope {
            Scope::Day => {
                let month = parts.get(Scope::Month) as i8;
                days_of_month(self.fields, parts.get(Scope::Year), month)
            }
            _ => self.field(scope).values().to_vec(),
        }
    }

    /// Value an inner scope takes after an outer scope moved.
    fn first(&self, scope: Scope) -> i16 {
        match scope {
            // resolved against the new month by the day scope itself
            Scope::Day => 1,
            _ => self.field(scope).first() as i16,
        }
    }

    fn reset_below(&self, scope: Scope, mut parts: Parts) -> Parts {
        for inner in scope.below() {
            parts.set(inner, self.first(inner));
        }
        parts
    }

    /// Earliest civil datetime at or after `from` satisfying every field.
    fn run(&self, from: DateTime) -> Option<DateTime> {
        let mut parts = Parts::of(from);
        let mut scope = Scope::Year;

        loop {
            let candidates = self.candidates(scope, &parts);
            let current = parts.get(scope);
            let idx = candidates.partition_point(|v| (*v as i16) < current);

            match candidates.get(idx) {
                None => {
                    parts = self.carry(scope, parts)?;
                    scope = Scope::Year;
                    continue;
                }
                Some(&v) if v as i16 != current => {
                    parts.set(scope, v as i16);
                    parts = self.reset_below(scope, parts);
                }
                Some(_) => {}
            }

            match scope.inner() {
                Some(inner) => scope = inner,
                None => return parts.build(),
            }
        }
    }

    /// Move to the start of the next unit of the enclosing scope.
    /// Carrying out of the year scope ends the search.
    fn carry(&self, scope: Scope, mut parts: Parts) -> Option<Parts> {
        let outer = scope.outer()?;
        for inner in outer.below() {
            parts.set(inner, inner.minimum());
        }
        let next = parts.build()?.checked_add(outer.unit()).ok()?;
        Some(self.reset_below(outer, Parts::of(next)))
    }

    fn matches(&self, dt: DateTime) -> bool {
        let parts = Parts::of(dt);
        Scope::ALL.into_iter().all(|scope| {
            let current = parts.get(scope);
            current >= 0 && self.candidates(scope, &parts).binary_search(&(current as u16)).is_ok()
        })
    }
}

/// Calendar days of `year-month` selected by the day-of-month or day-of-week field.
pub(crate) fn days_of_month(fields: &Fields, year: i16, month: i8) -> Vec<u16> {
    let Ok(first) = Date::new(year, month, 1) else {
        return Vec::new();
    };
    let len = first.days_in_month() as u16;
    let mut days = Vec::new();

    for combination in fields.day_of_month.combinations() {
        match combination {
            Combination::Values(values) => days.extend(values.iter().filter(|d| **d <= len)),
            Combination::Special { tag, values } => match tag {
                Tag::NoValue => break,
                Tag::Last => days.push(len),
                Tag::LastWeekday => days.push(last_weekday(first.last_of_month())),
                Tag::NearestWeekday => {
                    if let Some(day) = values.first().and_then(|d| nearest_weekday(first, *d)) {
                        days.push(day);
                    }
                }
                Tag::NthWeekday => {}
            },
        }
    }

    let offset = first.weekday().to_sunday_zero_offset() as u16;
    for combination in fields.day_of_week.combinations() {
        match combination {
            Combination::Values(weekdays) => {
                days.extend((1..=len).filter(|d| weekdays.contains(&((offset + d - 1) % 7))))
            }
            Combination::Special { tag, values } => match (tag, values.as_slice()) {
                (Tag::NoValue, _) => break,
                (Tag::Last, [weekday]) => days.extend(nth_weekday(first, -1, *weekday)),
                (Tag::NthWeekday, [weekday, nth]) => {
                    days.extend(nth_weekday(first, *nth as i8, *weekday))
                }
                _ => {}
            },
        }
    }

    days.sort_unstable();
    days.dedup();
    days
}

/// Last Monday-to-Friday day of the month whose last day is `last`.
fn last_weekday(last: Date) -> u16 {
    let day = last.day() as u16;
    match last.weekday() {
        Weekday::Saturday => day - 1,
        Weekday::Sunday => day - 2,
        _ => day,
    }
}

/// The weekday closest to `day` without leaving the month. `None` when the
/// month is shorter than `day`.
fn nearest_weekday(first: Date, day: u16) -> Option<u16> {
    let len = first.days_in_month() as u16;
    if day > len {
        return None;
    }
    let date = Date::new(first.year(), first.month(), day as i8).ok()?;
    let nearest = match date.weekday() {
        Weekday::Sunday if day == len => day - 2,
        Weekday::Sunday => day + 1,
        Weekday::Saturday if day == 1 => day + 2,
        Weekday::Saturday => day - 1,
        _ => day,
    };
    Some(nearest)
}

/// Day of the `nth` occurrence of `weekday` (Sunday = 0); `-1` is the last.
fn nth_weekday(first: Date, nth: i8, weekday: u16) -> Option<u16> {
    let weekday = Weekday::from_sunday_zero_offset(weekday as i8).ok()?;
    first
        .nth_weekday_of_month(nth, weekday)
        .ok()
        .map(|date| date.day() as u16)
}

/// Compute the next fire time strictly after `reference`.
///
/// `None` stands for an unset reference and yields [`SearchState::ZeroTime`].
/// The search runs on civil time in the reference's time zone, at whole-second
/// precision.
pub fn next(schedule: &Schedule, reference: Option<&Zoned>) -> Next {
    let Some(reference) = reference else {
        return Next::empty(SearchState::ZeroTime);
    };
    if schedule.is_once() {
        return Next::empty(SearchState::OnceExec);
    }

    let tz = reference.time_zone();
    let Some(mut from) = reference
        .datetime()
        .with()
        .subsec_nanosecond(0)
        .build()
        .ok()
        .and_then(|dt| dt.checked_add(Span::new().seconds(1)).ok())
    else {
        return Next::empty(SearchState::NoMatches);
    };

    let search = Search::new(schedule.fields());
    loop {
        let Some(civil) = search.run(from) else {
            return Next::empty(SearchState::NoMatches);
        };
        // gaps resolve forward; in a fold the later offset may still be ahead
        let ambiguous = tz.to_ambiguous_zoned(civil);
        for zoned in [ambiguous.clone().compatible(), ambiguous.later()]
            .into_iter()
            .flatten()
        {
            if zoned > *reference {
                return Next::found(zoned);
            }
        }
        match civil.checked_add(Span::new().seconds(1)) {
            Ok(dt) => from = dt,
            Err(_) => return Next::empty(SearchState::NoMatches),
        }
    }
}

/// Compute the next `n` fire times after `from`.
pub fn next_n(schedule: &Schedule, from: &Zoned, n: usize) -> Vec<Zoned> {
    Occurrences::new(schedule, from.clone()).take(n).collect()
}

/// Whether `datetime`, truncated to the second, satisfies every field.
pub fn matches(schedule: &Schedule, datetime: &Zoned) -> bool {
    if schedule.is_once() {
        return false;
    }
    Search::new(schedule.fields()).matches(datetime.datetime())
}

/// Lazy iterator over successive fire times after a given instant.
pub struct Occurrences<'a> {
    schedule: &'a Schedule,
    current: Zoned,
}

impl<'a> Occurrences<'a> {
    pub fn new(schedule: &'a Schedule, from: Zoned) -> Self {
        Self {
            schedule,
            current: from,
        }
    }
}

impl Iterator for Occurrences<'_> {
    type Item = Zoned;

    fn next(&mut self) -> Option<Self::Item> {
        let time = next(self.schedule, Some(&self.current)).time?;
        self.current = time.clone();
        Some(time)
    }
}
