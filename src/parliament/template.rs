//! Single-argument prompt templates.
//!
//! Moderator instructions carry exactly one positional slot for the session topic, written
//! `{}` or `{0}`. Literal braces are doubled (`{{`, `}}`). A format spec after the field
//! name (`{:>10}`) is accepted and ignored.

use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The template has no slot for the argument.
    NoSlot,
    /// More automatic `{}` slots than the single argument can fill.
    TooManySlots(usize),
    /// A slot names a field (or an index other than 0) the single argument cannot fill.
    NamedSlot(String),
    /// `{}` and `{0}` used in the same template.
    MixedNumbering,
    /// An unmatched `{` or `}`.
    Unbalanced,
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::NoSlot => write!(f, "template has no substitution slot"),
            FormatError::TooManySlots(n) => {
                write!(f, "template has {} substitution slots but one argument", n)
            }
            FormatError::NamedSlot(name) => {
                write!(f, "template slot '{{{}}}' cannot be filled positionally", name)
            }
            FormatError::MixedNumbering => {
                write!(f, "cannot mix automatic and manual field numbering")
            }
            FormatError::Unbalanced => write!(f, "unbalanced braces in template"),
        }
    }
}

impl Error for FormatError {}

/// Substitute `value` into the template's single positional slot.
pub fn fill_single_slot(template: &str, value: &str) -> Result<String, FormatError> {
    let mut out = String::with_capacity(template.len() + value.len());
    let mut chars = template.chars().peekable();
    let mut automatic = 0;
    let mut manual = 0;

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => return Err(FormatError::Unbalanced),
            '{' => {
                let mut field = String::new();
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == '}' {
                        closed = true;
                        break;
                    }
                    if inner == '{' {
                        return Err(FormatError::Unbalanced);
                    }
                    field.push(inner);
                }
                if !closed {
                    return Err(FormatError::Unbalanced);
                }
                let name = field.split(|ch| ch == ':' || ch == '!').next().unwrap_or("");
                match name.trim() {
                    "" => automatic += 1,
                    "0" => manual += 1,
                    other => return Err(FormatError::NamedSlot(other.to_string())),
                }
                out.push_str(value);
            }
            other => out.push(other),
        }
    }

    if automatic > 0 && manual > 0 {
        return Err(FormatError::MixedNumbering);
    }
    if automatic > 1 {
        return Err(FormatError::TooManySlots(automatic));
    }
    if automatic == 0 && manual == 0 {
        return Err(FormatError::NoSlot);
    }
    Ok(out)
}
