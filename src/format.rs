//! printf-style formatting of runtime values.
//!
//! Supported verbs: `%v` (any value), `%s` (any value, as text), `%d`
//! (integers), `%f`, `%.Nf` and `%g` (numbers) and `%%` for a literal
//! percent sign.

use thiserror::Error;

use crate::value::{Value, format_float};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    #[error("not enough arguments for format \"{0}\"")]
    MissingArgument(String),
    #[error("%{verb} expects {expected}, got {found}")]
    BadArgument {
        verb: char,
        expected: &'static str,
        found: &'static str,
    },
    #[error("unknown format verb %{0}")]
    UnknownVerb(char),
    #[error("format \"{0}\" ends with a lone %")]
    Trailing(String),
}

/// Formats `args` according to `format`.
///
/// # Examples
///
/// ```
/// use ogree_cli::format::sprintf;
/// use ogree_cli::value::Value;
///
/// let s = sprintf("R%v-%.2f%%", &[Value::Int(3), Value::Float(0.5)]).unwrap();
/// assert_eq!(s, "R3-0.50%");
/// ```
pub fn sprintf(format: &str, args: &[Value]) -> Result<String, FormatError> {
    let mut out = String::with_capacity(format.len());
    let mut args = args.iter();
    let mut chars = format.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }

        let mut precision = None;
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut digits = String::new();
            while let Some(d) = chars.peek().filter(|c| c.is_ascii_digit()) {
                digits.push(*d);
                chars.next();
            }
            precision = Some(digits.parse::<usize>().unwrap_or(0));
        }

        let Some(verb) = chars.next() else {
            return Err(FormatError::Trailing(format.to_string()));
        };
        if verb == '%' {
            out.push('%');
            continue;
        }
        let Some(arg) = args.next() else {
            return Err(FormatError::MissingArgument(format.to_string()));
        };

        match verb {
            'v' | 's' => out.push_str(&arg.to_string()),
            'd' => match arg.as_num() {
                Some(Value::Int(n)) => out.push_str(&n.to_string()),
                _ => return Err(bad_argument(verb, "an integer", arg)),
            },
            'f' => {
                let Some(n) = arg.as_float() else {
                    return Err(bad_argument(verb, "a number", arg));
                };
                out.push_str(&format!("{:.*}", precision.unwrap_or(6), n));
            }
            'g' => match arg.as_float() {
                Some(n) => out.push_str(&format_float(n)),
                None => return Err(bad_argument(verb, "a number", arg)),
            },
            other => return Err(FormatError::UnknownVerb(other)),
        }
    }

    Ok(out)
}

fn bad_argument(verb: char, expected: &'static str, found: &Value) -> FormatError {
    FormatError::BadArgument {
        verb,
        expected,
        found: found.type_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolation_template() {
        let s = sprintf("rack%v", &[Value::Int(1)]).unwrap();
        assert_eq!(s, "rack1");
    }

    #[test]
    fn test_escaped_percent() {
        assert_eq!(sprintf("100%%", &[]).unwrap(), "100%");
    }

    #[test]
    fn test_float_precision() {
        assert_eq!(sprintf("%.1f", &[Value::Float(2.26)]).unwrap(), "2.3");
        assert_eq!(sprintf("%f", &[Value::Int(2)]).unwrap(), "2.000000");
    }

    #[test]
    fn test_integer_verb_accepts_numeric_string() {
        assert_eq!(sprintf("%d", &[Value::from("12")]).unwrap(), "12");
        assert!(matches!(
            sprintf("%d", &[Value::Float(1.5)]),
            Err(FormatError::BadArgument { verb: 'd', .. })
        ));
    }

    #[test]
    fn test_missing_argument() {
        assert!(matches!(
            sprintf("%v and %v", &[Value::Int(1)]),
            Err(FormatError::MissingArgument(_))
        ));
    }
}
