use crate::ast::{AttributeValue, Pos};
use crate::source::Location;
use std::fmt;

/// The outcome of a `check-sat`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verdict {
    Sat,
    Unsat,
    Unknown,
}

impl Verdict {
    /// Classify a raw `check` reply. `unsat` is tested first since it
    /// contains `sat`.
    pub fn from_reply(reply: &str) -> Self {
        if reply.contains("unsat") {
            Verdict::Unsat
        } else if reply.contains("sat") {
            Verdict::Sat
        } else {
            Verdict::Unknown
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Verdict::Sat => "sat",
            Verdict::Unsat => "unsat",
            Verdict::Unknown => "unknown",
        })
    }
}

/// A failed command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorResponse {
    pub message: String,
    /// The offending construct, when the failure can be pinned on one.
    pub pos: Option<Pos>,
    /// `pos` resolved against the session's source text, if it has one.
    pub location: Option<Location>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        ErrorResponse {
            message: message.into(),
            pos: None,
            location: None,
        }
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{}: {}", loc, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// What a [`Session`][crate::Session] command reports back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    Success,
    /// The session has ended.
    Exited,
    Verdict(Verdict),
    Str(String),
    Symbol(String),
    /// The value of an option.
    Value(AttributeValue),
    /// Term/value pairs read back from a `get-value`, both as yices printed them.
    Values(Vec<(String, String)>),
    /// The command was carried out but its result cannot be represented.
    Unsupported,
    Error(ErrorResponse),
}

impl Response {
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error(ErrorResponse::new(message))
    }

    pub fn is_ok(&self) -> bool {
        !self.is_error()
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }

    pub fn verdict(&self) -> Option<Verdict> {
        match self {
            Response::Verdict(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorResponse> {
        match self {
            Response::Error(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Verdict> for Response {
    fn from(v: Verdict) -> Self {
        Response::Verdict(v)
    }
}

impl From<ErrorResponse> for Response {
    fn from(e: ErrorResponse) -> Self {
        Response::Error(e)
    }
}

/// SMT-LIB response syntax.
impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Response::Success | Response::Exited => f.write_str("success"),
            Response::Verdict(v) => v.fmt(f),
            Response::Str(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            Response::Symbol(s) => f.write_str(s),
            Response::Value(v) => v.fmt(f),
            Response::Values(pairs) => {
                write!(f, "(")?;
                let mut sep = "";
                for (term, value) in pairs {
                    write!(f, "{}({} {})", sep, term, value)?;
                    sep = " ";
                }
                write!(f, ")")
            }
            Response::Unsupported => f.write_str("unsupported"),
            Response::Error(e) => write!(f, "(error \"{}\")", e.to_string().replace('"', "\"\"")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsat_wins_over_sat() {
        assert_eq!(Verdict::from_reply("unsat\n"), Verdict::Unsat);
        assert_eq!(Verdict::from_reply("sat\n"), Verdict::Sat);
        assert_eq!(Verdict::from_reply("unknown\n"), Verdict::Unknown);
        assert_eq!(Verdict::from_reply(""), Verdict::Unknown);
    }

    #[test]
    fn responses_print_as_smtlib() {
        assert_eq!(Response::Success.to_string(), "success");
        assert_eq!(Response::from(Verdict::Unsat).to_string(), "unsat");
        assert_eq!(Response::Str("yices".into()).to_string(), "\"yices\"");
        assert_eq!(
            Response::Values(vec![("x".into(), "1".into()), ("b".into(), "true".into())]).to_string(),
            "((x 1) (b true))"
        );
        assert_eq!(
            Response::error("Logic is already set").to_string(),
            "(error \"Logic is already set\")"
        );
    }

    #[test]
    fn error_display_includes_location() {
        let err = ErrorResponse {
            message: "The yices solver cannot handle decimal literals".into(),
            pos: Some(Pos::new(12, 15)),
            location: Some(Location {
                name: None,
                line: 2,
                column: 4,
                line_start: 9,
                line_text: "(< x 1.5)\n".into(),
            }),
        };
        assert_eq!(
            err.to_string(),
            "2:4: The yices solver cannot handle decimal literals"
        );
    }

    #[test]
    fn predicates() {
        assert!(Response::Unsupported.is_ok());
        assert!(Response::error("x").is_error());
        assert_eq!(Response::Verdict(Verdict::Sat).verdict(), Some(Verdict::Sat));
        assert_eq!(Response::Success.verdict(), None);
    }
}
