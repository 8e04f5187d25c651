use std::fmt;

use crate::ast::FieldKind;

/// Byte range within the input string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Where in an expression a field-level error occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub span: Span,
    pub input: String,
}

/// All errors produced by xcron.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScheduleError {
    /// The expression does not split into 5, 6 or 7 fields.
    InvalidFieldCount { input: String, count: usize },

    /// A token is out of bounds or malformed for its field.
    InvalidValue {
        field: FieldKind,
        value: String,
        location: Option<Location>,
    },

    /// `L`, `W`, `#` or `?` used where the field does not allow it.
    InvalidSpecialCharacterUsage {
        field: FieldKind,
        message: String,
        location: Option<Location>,
    },

    UnsupportedMacro { name: String },

    /// Both day-of-month and day-of-week are `?`.
    ImpossibleSchedule,

    /// A field name that matches no [`FieldKind`].
    UnsupportedFieldKind { field: String },

    /// An empty command line was bound to a schedule.
    InvalidCommand { command: String },
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFieldCount { input, .. } => {
                write!(f, "invalid expression given '{input}'")
            }
            Self::InvalidValue { field, value, .. } => {
                write!(f, "invalid value in field '{field}' given: '{value}'")
            }
            Self::InvalidSpecialCharacterUsage { message, .. } => write!(f, "{message}"),
            Self::UnsupportedMacro { name } => write!(f, "unsupported macro given '{name}'"),
            Self::ImpossibleSchedule => write!(
                f,
                "the cronjob will never run; both day-of-month and day-of-week contain the special character '?'"
            ),
            Self::UnsupportedFieldKind { field } => {
                write!(f, "unsupported field kind given: '{field}'")
            }
            Self::InvalidCommand { command } => write!(f, "invalid command given '{command}'"),
        }
    }
}

impl std::error::Error for ScheduleError {}

impl ScheduleError {
    pub fn field_count(input: impl Into<String>, count: usize) -> Self {
        Self::InvalidFieldCount {
            input: input.into(),
            count,
        }
    }

    pub fn value(field: FieldKind, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            value: value.into(),
            location: None,
        }
    }

    pub fn special(field: FieldKind, message: impl Into<String>) -> Self {
        Self::InvalidSpecialCharacterUsage {
            field,
            message: message.into(),
            location: None,
        }
    }

    pub fn unsupported_macro(name: impl Into<String>) -> Self {
        Self::UnsupportedMacro { name: name.into() }
    }

    pub fn command(command: impl Into<String>) -> Self {
        Self::InvalidCommand {
            command: command.into(),
        }
    }

    /// The field a field-level error belongs to.
    pub fn field(&self) -> Option<FieldKind> {
        match self {
            Self::InvalidValue { field, .. } | Self::InvalidSpecialCharacterUsage { field, .. } => {
                Some(*field)
            }
            _ => None,
        }
    }

    /// Attach the span of the failing field token. Errors without a field are returned as-is.
    pub fn at(mut self, span: Span, input: &str) -> Self {
        match &mut self {
            Self::InvalidValue { location, .. }
            | Self::InvalidSpecialCharacterUsage { location, .. } => {
                *location = Some(Location {
                    span,
                    input: input.to_string(),
                });
            }
            _ => {}
        }
        self
    }

    /// Format a rich error with the failing field underlined.
    pub fn display_rich(&self) -> String {
        match self {
            Self::InvalidValue {
                location: Some(loc),
                ..
            }
            | Self::InvalidSpecialCharacterUsage {
                location: Some(loc),
                ..
            } => format_span_error("error", &self.to_string(), &loc.span, &loc.input),
            Self::InvalidFieldCount { input, count } => {
                format!("error: {self}\n  expected 5, 6 or 7 fields, got {count} in '{input}'")
            }
            _ => format!("error: {self}"),
        }
    }
}

fn format_span_error(prefix: &str, message: &str, span: &Span, input: &str) -> String {
    let mut out = format!("{prefix}: {message}\n");
    out.push_str(&format!("  {input}\n"));
    let padding = " ".repeat(span.start + 2);
    let underline = "^".repeat((span.end - span.start).max(1));
    out.push_str(&padding);
    out.push_str(&underline);
    out
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_message_names_field() {
        let err = ScheduleError::value(FieldKind::Year, "XXX");
        assert_eq!(err.to_string(), "invalid value in field 'year' given: 'XXX'");
        assert_eq!(err.field(), Some(FieldKind::Year));
    }

    #[test]
    fn test_rich_underlines_field() {
        let err = ScheduleError::value(FieldKind::Hour, "25").at(Span::new(4, 6), "0 0 25 * * *");
        let rich = err.display_rich();
        assert!(rich.starts_with("error: invalid value in field 'hours' given: '25'"));
        assert!(rich.ends_with("      ^^"));
    }

    #[test]
    fn test_at_ignores_errors_without_field() {
        let err = ScheduleError::ImpossibleSchedule.at(Span::new(0, 1), "x");
        assert_eq!(err, ScheduleError::ImpossibleSchedule);
    }
}
