use crate::error::ScheduleError;

/// The seven time components of a schedule expression, in expression order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum FieldKind {
    Second,
    Minute,
    Hour,
    DayOfMonth,
    Month,
    DayOfWeek,
    Year,
}

impl FieldKind {
    pub const ALL: [FieldKind; 7] = [
        FieldKind::Second,
        FieldKind::Minute,
        FieldKind::Hour,
        FieldKind::DayOfMonth,
        FieldKind::Month,
        FieldKind::DayOfWeek,
        FieldKind::Year,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Second => "seconds",
            Self::Minute => "minutes",
            Self::Hour => "hours",
            Self::DayOfMonth => "day-of-month",
            Self::Month => "month",
            Self::DayOfWeek => "day-of-week",
            Self::Year => "year",
        }
    }

    /// Look up a field by its [`name`](Self::name).
    pub fn from_name(name: &str) -> Result<Self, ScheduleError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| ScheduleError::UnsupportedFieldKind {
                field: name.to_string(),
            })
    }

    /// Inclusive `(min, max)` bound. Day-of-week additionally accepts `7` as Sunday on input.
    pub fn bounds(self) -> (u16, u16) {
        match self {
            Self::Second | Self::Minute => (0, 59),
            Self::Hour => (0, 23),
            Self::DayOfMonth => (1, 31),
            Self::Month => (1, 12),
            Self::DayOfWeek => (0, 6),
            Self::Year => (1970, 2099),
        }
    }

    pub fn min(self) -> u16 {
        self.bounds().0
    }

    pub fn max(self) -> u16 {
        self.bounds().1
    }

    /// Whether `L`, `W`, `#` and `?` may appear in this field at all.
    pub fn allows_day_specials(self) -> bool {
        matches!(self, Self::DayOfMonth | Self::DayOfWeek)
    }
}

/// Special-syntax tag carried by a non-plain combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Tag {
    /// `L`: last day of month (DoM), or `{w}L` last weekday `w` of month (DoW).
    #[cfg_attr(feature = "serde", serde(rename = "L"))]
    Last,
    /// `LW`: last Monday-to-Friday day of month.
    #[cfg_attr(feature = "serde", serde(rename = "LW"))]
    LastWeekday,
    /// `{d}W`: weekday nearest to day `d`.
    #[cfg_attr(feature = "serde", serde(rename = "W"))]
    NearestWeekday,
    /// `{w}#{n}`: nth weekday `w` of month.
    #[cfg_attr(feature = "serde", serde(rename = "#"))]
    NthWeekday,
    /// `?`: no constraint from this field.
    #[cfg_attr(feature = "serde", serde(rename = "?"))]
    NoValue,
}

impl Tag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Last => "L",
            Self::LastWeekday => "LW",
            Self::NearestWeekday => "W",
            Self::NthWeekday => "#",
            Self::NoValue => "?",
        }
    }
}

/// One resolved clause of a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Combination {
    /// Sorted, duplicate-free values.
    Values(Vec<u16>),
    /// Tagged rule with its auxiliary values (`W` carries `[d]`, `#` carries `[w, n]`).
    Special { tag: Tag, values: Vec<u16> },
}

impl Combination {
    pub fn special(tag: Tag, values: Vec<u16>) -> Self {
        Self::Special { tag, values }
    }

    pub fn tag(&self) -> Option<Tag> {
        match self {
            Self::Values(_) => None,
            Self::Special { tag, .. } => Some(*tag),
        }
    }

    pub fn values(&self) -> &[u16] {
        match self {
            Self::Values(values) | Self::Special { values, .. } => values,
        }
    }

    pub fn is_no_value(&self) -> bool {
        self.tag() == Some(Tag::NoValue)
    }
}

/// One parsed field: its source text and merged combinations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Field {
    pub(crate) expression: String,
    pub(crate) combinations: Vec<Combination>,
}

impl Field {
    pub fn new(expression: impl Into<String>, combinations: Vec<Combination>) -> Self {
        Self {
            expression: expression.into(),
            combinations,
        }
    }

    /// The field text as written in the expression.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn combinations(&self) -> &[Combination] {
        &self.combinations
    }

    /// The merged plain values, empty when the field holds only special rules.
    pub fn values(&self) -> &[u16] {
        self.combinations
            .iter()
            .find_map(|c| match c {
                Combination::Values(values) => Some(values.as_slice()),
                Combination::Special { .. } => None,
            })
            .unwrap_or(&[])
    }

    /// Smallest plain value, used to reset inner scopes during the search.
    pub(crate) fn first(&self) -> u16 {
        self.values().first().copied().unwrap_or(0)
    }
}

/// The seven fields of a schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    pub second: Field,
    pub minute: Field,
    pub hour: Field,
    pub day_of_month: Field,
    pub month: Field,
    pub day_of_week: Field,
    pub year: Field,
}

impl Fields {
    pub fn get(&self, kind: FieldKind) -> &Field {
        match kind {
            FieldKind::Second => &self.second,
            FieldKind::Minute => &self.minute,
            FieldKind::Hour => &self.hour,
            FieldKind::DayOfMonth => &self.day_of_month,
            FieldKind::Month => &self.month,
            FieldKind::DayOfWeek => &self.day_of_week,
            FieldKind::Year => &self.year,
        }
    }

    pub(crate) fn get_mut(&mut self, kind: FieldKind) -> &mut Field {
        match kind {
            FieldKind::Second => &mut self.second,
            FieldKind::Minute => &mut self.minute,
            FieldKind::Hour => &mut self.hour,
            FieldKind::DayOfMonth => &mut self.day_of_month,
            FieldKind::Month => &mut self.month,
            FieldKind::DayOfWeek => &mut self.day_of_week,
            FieldKind::Year => &mut self.year,
        }
    }

    /// Fields paired with their kind, in expression order.
    pub fn iter(&self) -> impl Iterator<Item = (FieldKind, &Field)> {
        FieldKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }

    /// Compare resolved combinations only, ignoring the source text.
    pub fn same_combinations(&self, other: &Fields) -> bool {
        self.iter()
            .zip(other.iter())
            .all(|((_, a), (_, b))| a.combinations == b.combinations)
    }
}

/// A parsed, immutable schedule.
///
/// Built once by the parser and only read afterwards; share it freely across
/// threads (`Schedule: Send + Sync`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub(crate) source: String,
    pub(crate) fields: Fields,
    pub(crate) once: bool,
}

impl Schedule {
    pub(crate) fn new(source: impl Into<String>, fields: Fields) -> Self {
        Self {
            source: source.into(),
            fields,
            once: false,
        }
    }

    pub(crate) fn run_once(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            fields: Fields::default(),
            once: true,
        }
    }

    /// The expression this schedule was parsed from (trimmed).
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Whether this is a `@reboot` schedule that never recurs.
    pub fn is_once(&self) -> bool {
        self.once
    }
}

/// Weekday names, Sunday first (`SUN` = 0).
pub const WEEKDAY_NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// Month names, January first (`JAN` = 1).
pub const MONTH_NAMES: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// Look up an upper-case weekday name.
pub fn weekday_number(name: &str) -> Option<u16> {
    WEEKDAY_NAMES
        .iter()
        .position(|n| *n == name)
        .map(|i| i as u16)
}

/// Look up an upper-case month name.
pub fn month_number(name: &str) -> Option<u16> {
    MONTH_NAMES
        .iter()
        .position(|n| *n == name)
        .map(|i| i as u16 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_tables() {
        assert_eq!(weekday_number("SUN"), Some(0));
        assert_eq!(weekday_number("SAT"), Some(6));
        assert_eq!(weekday_number("sat"), None);
        assert_eq!(month_number("JAN"), Some(1));
        assert_eq!(month_number("DEC"), Some(12));
        assert_eq!(month_number("MON"), None);
    }

    #[test]
    fn test_field_values_skip_specials() {
        let field = Field::new(
            "L,1,2",
            vec![
                Combination::special(Tag::Last, vec![]),
                Combination::Values(vec![1, 2]),
            ],
        );
        assert_eq!(field.values(), &[1, 2]);
        assert_eq!(field.first(), 1);

        let only_special = Field::new("?", vec![Combination::special(Tag::NoValue, vec![])]);
        assert!(only_special.values().is_empty());
        assert!(only_special.combinations()[0].is_no_value());
    }

    #[test]
    fn test_bounds() {
        assert_eq!(FieldKind::Year.bounds(), (1970, 2099));
        assert_eq!(FieldKind::DayOfWeek.max(), 6);
        assert!(FieldKind::DayOfMonth.allows_day_specials());
        assert!(!FieldKind::Hour.allows_day_specials());
    }

    #[test]
    fn test_from_name() {
        assert_eq!(FieldKind::from_name("day-of-week"), Ok(FieldKind::DayOfWeek));
        for kind in FieldKind::ALL {
            assert_eq!(FieldKind::from_name(kind.name()), Ok(kind));
        }
        let err = FieldKind::from_name("weeks").unwrap_err();
        assert_eq!(err.to_string(), "unsupported field kind given: 'weeks'");
    }
}
