use std::fmt;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug)]
pub enum Error {
    /// A numeric value fell outside of its encodable range: a varnibble above 4679, a bit length
    /// that isn't a positive multiple of 32, or a counter that outgrew its fixed bit budget.
    Range(String),
    /// Structurally invalid input: an undecodable base-N string, an identifier that doesn't match
    /// the expected shape, or a header/body combination that doesn't decode.
    Malformed(String),
    /// A bit or byte stream ended before the field being decoded was complete.
    LengthTooShort {
        step: &'static str,
        actual: usize,
        expected: usize,
    },
    /// An operation was invoked on the wrong kind of identifier, like composing from an
    /// ISCC-CODE, or comparing identifiers whose headers don't match.
    TypeMismatch(String),
    /// The set of units handed over for composing an ISCC-CODE isn't a valid combination.
    Composition(String),
    /// Reading from a caller-supplied stream failed.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Range(ref err) => write!(f, "Value out of range: {}", err),
            Error::Malformed(ref err) => write!(f, "Malformed input: {}", err),
            Error::LengthTooShort {
                step,
                actual,
                expected,
            } => write!(
                f,
                "Expected data length {}, but got {} on step [{}]",
                expected, actual, step
            ),
            Error::TypeMismatch(ref err) => write!(f, "Type mismatch: {}", err),
            Error::Composition(ref err) => write!(f, "Invalid composition: {}", err),
            Error::Io(_) => f.write_str("Stream read failed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

impl std::convert::From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
