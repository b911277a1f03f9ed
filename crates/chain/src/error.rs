use std::fmt::{Display, Formatter};


/// Failure to turn a raw chain payload into a typed record.
///
/// Parse errors are scoped to a single record: callers skip that record
/// and keep processing the rest of the block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The payload matches none of the known layouts
    Shape {
        record: &'static str,
        reason: String
    },
    /// A required field is absent even after coalescing known locations
    Missing {
        record: &'static str,
        field: &'static str
    },
    /// A field is present, but its value is not a valid number
    Number {
        field: &'static str,
        value: String
    }
}


impl ParseError {
    pub fn shape(record: &'static str, reason: impl Into<String>) -> Self {
        ParseError::Shape {
            record,
            reason: reason.into()
        }
    }

    pub fn missing(record: &'static str, field: &'static str) -> Self {
        ParseError::Missing {
            record,
            field
        }
    }
}


impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Shape { record, reason } => {
                write!(f, "unexpected {} layout: {}", record, reason)
            },
            ParseError::Missing { record, field } => {
                write!(f, "{} has no `{}` field", record, field)
            },
            ParseError::Number { field, value } => {
                write!(f, "`{}` is not a valid number for field `{}`", value, field)
            }
        }
    }
}


impl std::error::Error for ParseError {}
