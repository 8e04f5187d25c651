//! xcron: extended cron.
//!
//! Seven-field cron expressions (seconds through year) with the `L`, `W`, `#`,
//! `?`, `R` and `.` extensions and the usual `@` macros, plus a search engine
//! that finds the next fire time after a given instant.
//!
//! # Examples
//!
//! ```
//! use jiff::civil::date;
//! use jiff::tz::TimeZone;
//! use xcron::{Schedule, SearchState};
//!
//! let schedule: Schedule = "0 0 0 29 2 ? *".parse().unwrap();
//! let from = date(2022, 12, 31).at(23, 59, 59, 0).to_zoned(TimeZone::UTC).unwrap();
//!
//! let next = schedule.next(Some(&from));
//! assert_eq!(next.state, SearchState::Found);
//! assert_eq!(next.time.unwrap().date(), date(2024, 2, 29));
//! ```

pub mod ast;
pub mod display;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod macros;
pub mod parser;
pub mod random;
#[cfg(feature = "runtime")]
pub mod runtime;
pub mod values;

pub use ast::{Combination, Field, FieldKind, Fields, Schedule, Tag};
pub use error::ScheduleError;
pub use eval::{Next, Occurrences, SearchState};
pub use parser::Parser;
pub use random::{RandomSource, ThreadSafeRng};
#[cfg(feature = "runtime")]
pub use runtime::{watch, Job};

use jiff::Zoned;
#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

// --- Schedule convenience methods ---

impl Schedule {
    /// Parse an expression or macro with the default [`Parser`].
    pub fn parse(input: &str) -> Result<Self, ScheduleError> {
        parser::parse(input)
    }

    /// Next fire time strictly after `reference`; `None` is the unset instant.
    pub fn next(&self, reference: Option<&Zoned>) -> Next {
        eval::next(self, reference)
    }

    /// The next `n` fire times after `from`.
    pub fn next_n(&self, from: &Zoned, n: usize) -> Vec<Zoned> {
        eval::next_n(self, from, n)
    }

    /// Successive fire times after `from`, ending when the schedule runs out.
    pub fn occurrences(&self, from: &Zoned) -> Occurrences<'_> {
        Occurrences::new(self, from.clone())
    }

    /// Check if a datetime (to the second) matches this schedule.
    pub fn matches(&self, datetime: &Zoned) -> bool {
        eval::matches(self, datetime)
    }

    /// Bind a command line to this schedule for periodic execution.
    #[cfg(feature = "runtime")]
    pub fn bind(self, command: &str) -> Result<Job, ScheduleError> {
        Job::new(std::sync::Arc::new(self), command)
    }
}

impl FromStr for Schedule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(feature = "serde")]
impl Serialize for Schedule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("expression", &self.to_string())?;
        map.serialize_entry("once", &self.once)?;
        if self.once {
            map.serialize_entry("fields", &())?;
        } else {
            map.serialize_entry("fields", &FieldMap(&self.fields))?;
        }
        map.end()
    }
}

/// Fields keyed by name, each a list of combinations.
#[cfg(feature = "serde")]
struct FieldMap<'a>(&'a ast::Fields);

#[cfg(feature = "serde")]
impl Serialize for FieldMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(FieldKind::ALL.len()))?;
        for (kind, field) in self.0.iter() {
            map.serialize_entry(kind.name(), field.combinations())?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for Schedule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Deserialize from the expression string
        let s = String::deserialize(deserializer)?;
        Schedule::parse(&s).map_err(serde::de::Error::custom)
    }
}
