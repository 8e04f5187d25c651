// Field parsing, combination merging and whole-expression validation.
//
// An expression is 5, 6 or 7 whitespace-separated fields, or an `@` macro.
// Each field is a comma-separated list of tokens; every token resolves to one
// combination (see `values.rs`) and the combinations of a field are merged.

use std::iter;
use std::sync::{Arc, LazyLock};

use jiff::civil::DateTime;
use jiff::Zoned;

use crate::ast::*;
use crate::error::{ScheduleError, Span};
use crate::lexer;
use crate::macros::{self, Expansion};
use crate::random::{self, RandomSource};
use crate::values::Resolver;

/// Wall-clock snapshot the `.` token reads from, taken on first use.
static STARTUP: LazyLock<DateTime> = LazyLock::new(|| Zoned::now().datetime());

/// The process startup snapshot. Call it early in `main` to pin the snapshot to
/// process start rather than to the first parse.
pub fn startup() -> DateTime {
    *STARTUP
}

/// Parser configuration: the startup snapshot and random source used by `.` and `R`.
#[derive(Clone)]
pub struct Parser {
    startup: DateTime,
    random: Arc<dyn RandomSource>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Process-wide startup snapshot and random source.
    pub fn new() -> Self {
        Self {
            startup: startup(),
            random: random::system(),
        }
    }

    pub fn with_startup(mut self, startup: DateTime) -> Self {
        self.startup = startup;
        self
    }

    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    fn resolver(&self) -> Resolver {
        Resolver::new(self.startup, self.random.clone())
    }

    /// Parse an expression or macro into a schedule.
    pub fn parse(&self, input: &str) -> Result<Schedule, ScheduleError> {
        let input = input.trim();
        let expression = match macros::expand(input)? {
            Expansion::Once => return Ok(Schedule::run_once(input)),
            Expansion::Expression(expression) | Expansion::Verbatim(expression) => expression,
        };

        let tokens = lexer::tokenize(expression);
        let located = tokens.iter().map(|t| (t.text, Some(t.span)));
        // Classic 5-field cron has no seconds; both short forms run every year.
        let parts: Vec<(&str, Option<Span>)> = match tokens.len() {
            5 => iter::once(("0", None))
                .chain(located)
                .chain(iter::once(("*", None)))
                .collect(),
            6 => located.chain(iter::once(("*", None))).collect(),
            7 => located.collect(),
            n => return Err(ScheduleError::field_count(expression, n)),
        };

        let resolver = self.resolver();
        let mut fields = Fields::default();
        for (kind, (text, span)) in FieldKind::ALL.into_iter().zip(parts) {
            let field = parse_field_with(&resolver, text, kind).map_err(|e| match span {
                Some(span) => e.at(span, expression),
                None => e,
            })?;
            *fields.get_mut(kind) = field;
        }

        let no_value = |field: &Field| field.combinations.first().is_some_and(|c| c.is_no_value());
        if no_value(&fields.day_of_month) && no_value(&fields.day_of_week) {
            return Err(ScheduleError::ImpossibleSchedule);
        }

        Ok(Schedule::new(input, fields))
    }

    /// Parse a single field's text.
    pub fn parse_field(&self, text: &str, kind: FieldKind) -> Result<Field, ScheduleError> {
        parse_field_with(&self.resolver(), text, kind)
    }
}

/// Parse an expression with the default [`Parser`].
pub fn parse(input: &str) -> Result<Schedule, ScheduleError> {
    Parser::new().parse(input)
}

fn parse_field_with(
    resolver: &Resolver,
    text: &str,
    kind: FieldKind,
) -> Result<Field, ScheduleError> {
    if text.contains('?') && text != "?" {
        return Err(ScheduleError::special(
            kind,
            format!(
                "the special character '?' must be the only value in field '{kind}', given: '{text}'"
            ),
        ));
    }

    let mut combinations = Vec::new();
    for token in text.split(',') {
        if token.is_empty() {
            return Err(ScheduleError::value(kind, text));
        }
        let token = token.to_ascii_uppercase();
        combinations.push(resolver.combination(&token, kind)?);
    }

    Ok(Field::new(text, merge_combinations(combinations)))
}

/// Fold all plain value lists into one sorted, de-duplicated list placed after
/// the distinct special rules (kept in first-seen order).
pub fn merge_combinations(combinations: Vec<Combination>) -> Vec<Combination> {
    let mut merged = Vec::new();
    let mut values = Vec::new();

    for combination in combinations {
        match combination {
            Combination::Values(v) => values.extend(v),
            special => {
                if !merged.contains(&special) {
                    merged.push(special);
                }
            }
        }
    }

    if !values.is_empty() {
        values.sort_unstable();
        values.dedup();
        merged.push(Combination::Values(values));
    }
    merged
}
