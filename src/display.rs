use std::fmt;

use crate::ast::*;
use crate::eval::SearchState;

/// Renders the canonical seven-field expression. Parsing the output yields the
/// same combinations as the schedule it came from.
impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.once {
            return write!(f, "@reboot");
        }
        for (i, (kind, field)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write_field(f, kind, field)?;
        }
        Ok(())
    }
}

fn write_field(f: &mut fmt::Formatter<'_>, kind: FieldKind, field: &Field) -> fmt::Result {
    for (i, combination) in field.combinations().iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        match combination {
            Combination::Values(values) => write_values(f, kind, values)?,
            Combination::Special { tag, values } => write_special(f, *tag, values)?,
        }
    }
    Ok(())
}

fn write_special(f: &mut fmt::Formatter<'_>, tag: Tag, values: &[u16]) -> fmt::Result {
    match (tag, values) {
        (Tag::Last, [weekday]) => write!(f, "{weekday}L"),
        (Tag::NearestWeekday, [day]) => write!(f, "{day}W"),
        (Tag::NthWeekday, [weekday, nth]) => write!(f, "{weekday}#{nth}"),
        _ => write!(f, "{tag}"),
    }
}

/// `*` for the full bound, `a-b` for runs of three or more, commas otherwise.
fn write_values(f: &mut fmt::Formatter<'_>, kind: FieldKind, values: &[u16]) -> fmt::Result {
    let (min, max) = kind.bounds();
    if values.len() == usize::from(max - min) + 1 && values.first() == Some(&min) {
        return write!(f, "*");
    }

    let mut first = true;
    let mut i = 0;
    while i < values.len() {
        let start = values[i];
        let mut end = i;
        while end + 1 < values.len() && values[end + 1] == values[end] + 1 {
            end += 1;
        }

        if !first {
            write!(f, ",")?;
        }
        first = false;

        if end - i >= 2 {
            write!(f, "{start}-{}", values[end])?;
            i = end + 1;
        } else {
            write!(f, "{start}")?;
            i += 1;
        }
    }
    Ok(())
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SearchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
