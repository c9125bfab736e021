//! Error types.

use std::fmt;
use std::io;

/// An error that occurred while opening or querying a PDF document.
#[derive(Debug)]
pub enum Error {
    /// The backing file could not be read.
    Io(io::Error),
    /// The file does not start with a `%PDF-1.x` preamble.
    BadPreamble,
    /// No trailer dictionary was found at the end of the file.
    TrailerMissing,
    /// The `startxref` anchor (or the `%%EOF` marker after it) is missing
    /// or malformed.
    StartxrefMissing,
    /// The cross-reference table or stream could not be decoded.
    XrefMalformed,
    /// An indirect object header (`N G obj`) could not be parsed.
    ObjectHeaderMalformed,
    /// A stream payload ended before its declared `/Length`, or could not
    /// be decoded.
    StreamTruncated,
    /// A value could not be parsed.
    Syntax {
        /// Byte offset of the offending input.
        pos: usize,
        /// What went wrong.
        detail: &'static str,
    },
    /// A stream declares a filter the crate does not implement.
    UnknownFilter(String),
    /// The standard security handler rejected the user password.
    InvalidPassword,
    /// The requested entity does not exist in the document.
    NotFound,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "i/o error: {err}"),
            Error::BadPreamble => write!(f, "missing or invalid %PDF-1.x preamble"),
            Error::TrailerMissing => write!(f, "trailer dictionary not found"),
            Error::StartxrefMissing => write!(f, "startxref/%%EOF anchors not found"),
            Error::XrefMalformed => write!(f, "malformed cross-reference data"),
            Error::ObjectHeaderMalformed => write!(f, "malformed indirect object header"),
            Error::StreamTruncated => write!(f, "stream payload truncated or undecodable"),
            Error::Syntax { pos, detail } => write!(f, "syntax error at offset {pos}: {detail}"),
            Error::UnknownFilter(name) => write!(f, "unsupported stream filter {name}"),
            Error::InvalidPassword => write!(f, "invalid password"),
            Error::NotFound => write!(f, "not found"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}
