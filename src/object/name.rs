//! Names.

use crate::reader::Reader;
use crate::trivia::{hex_digit, is_regular_character};
use smallvec::SmallVec;
use std::borrow::Borrow;
use std::fmt::{self, Debug, Formatter};
use std::ops::Deref;

type NameInner = SmallVec<[u8; 31]>;

/// A PDF name object, with `#HH` escapes already resolved.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(NameInner);

impl Name {
    /// Create a new name from a sequence of unescaped bytes.
    pub fn new(data: &[u8]) -> Self {
        Self(SmallVec::from_slice(data))
    }

    /// Return a copy of the name with ASCII letters lowercased.
    ///
    /// Dictionary keys are stored and looked up in this form.
    pub(crate) fn lowercased(&self) -> Name {
        Self(self.0.iter().map(|b| b.to_ascii_lowercase()).collect())
    }

    /// Return a string representation of the name.
    ///
    /// Returns a placeholder in case the name is not UTF-8 encoded.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("{non-ascii name}")
    }
}

impl Deref for Name {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for Name {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Borrow<[u8]> for Name {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl Debug for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) => <str as Debug>::fmt(s, f),
            Err(_) => <[u8] as Debug>::fmt(&self.0, f),
        }
    }
}

/// Parse a name starting at the leading solidus.
///
/// The name runs over regular characters and stops at the first white space
/// or delimiter byte. `#HH` sequences require two hex digits and decode to a
/// single byte.
pub(crate) fn parse(r: &mut Reader<'_>) -> Option<Name> {
    r.forward_tag(b"/")?;

    let mut result = NameInner::new();
    while let Some(b) = r.eat(is_regular_character) {
        if b == b'#' {
            let high = hex_digit(r.eat(|n| n.is_ascii_hexdigit())?)?;
            let low = hex_digit(r.eat(|n| n.is_ascii_hexdigit())?)?;
            result.push(high << 4 | low);
        } else {
            result.push(b);
        }
    }

    Some(Name(result))
}

#[cfg(test)]
mod tests {
    use super::Name;
    use crate::reader::Reader;
    use std::ops::Deref;

    fn name_impl(data: &[u8]) -> Option<Name> {
        super::parse(&mut Reader::new(data))
    }

    #[test]
    fn empty() {
        assert_eq!(name_impl(b"/").unwrap().deref(), b"");
    }

    #[test]
    fn missing_solidus() {
        assert!(name_impl(b"Name").is_none());
    }

    #[test]
    fn simple() {
        assert_eq!(name_impl(b"/Name1").unwrap().deref(), b"Name1");
    }

    #[test]
    fn punctuation() {
        assert_eq!(
            name_impl(b"/A;Name_With-Various***Characters?").unwrap().deref(),
            b"A;Name_With-Various***Characters?"
        );
    }

    #[test]
    fn stops_at_delimiter() {
        assert_eq!(name_impl(b"/Type/Page").unwrap().deref(), b"Type");
        assert_eq!(name_impl(b"/Kids[1 0 R]").unwrap().deref(), b"Kids");
    }

    #[test]
    fn stops_at_white_space() {
        assert_eq!(name_impl(b"/k1  ").unwrap().deref(), b"k1");
    }

    #[test]
    fn hex_escape() {
        assert_eq!(name_impl(b"/lime#20Green").unwrap().deref(), b"lime Green");
        assert_eq!(name_impl(b"/A#42").unwrap().deref(), b"AB");
        assert_eq!(name_impl(b"/A#3b").unwrap().deref(), b"A;");
        assert_eq!(name_impl(b"/A#3B").unwrap().deref(), b"A;");
    }

    #[test]
    fn bad_hex_escape() {
        assert!(name_impl(b"/AB#FG").is_none());
    }

    #[test]
    fn lowercased() {
        assert_eq!(Name::new(b"CreationDate").lowercased().deref(), b"creationdate");
    }
}
