use crate::error::ScheduleError;

/// Result of expanding a possible `@` macro.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expansion<'a> {
    /// Not a macro; parse the input as written.
    Verbatim(&'a str),
    /// Canonical seven-field expression for the macro.
    Expression(&'static str),
    /// `@reboot`: run once, never recur.
    Once,
}

/// Expand a trimmed expression if it is one of the supported macros.
pub fn expand(input: &str) -> Result<Expansion<'_>, ScheduleError> {
    if !input.starts_with('@') {
        return Ok(Expansion::Verbatim(input));
    }

    let expression = match input {
        "@yearly" | "@annually" => "0 0 0 1 1 * *",
        "@monthly" => "0 0 0 1 * * *",
        "@weekly" => "0 0 0 * * 0 *",
        "@daily" | "@midnight" => "0 0 0 * * * *",
        "@hourly" => "0 0 * * * * *",
        "@minutely" | "@every_minute" => "0 * * * * * *",
        "@secondly" | "@every_second" => "* * * * * * *",
        "@reboot" => return Ok(Expansion::Once),
        _ => return Err(ScheduleError::unsupported_macro(input)),
    };
    Ok(Expansion::Expression(expression))
}
