//! PDF values and indirect objects.

use crate::crypto;
use crate::error::Error;
use crate::filter;
use crate::reader::Reader;
use log::warn;

pub mod date;
pub mod dict;
pub mod name;
pub(crate) mod number;
pub(crate) mod string;

pub use date::DateTime;
pub use dict::Dict;
pub use name::Name;

use dict::{keys, names};

/// Nesting depth after which value parsing gives up. Well-formed documents
/// stay far below this; the guard keeps crafted input from exhausting the
/// stack.
const MAX_DEPTH: u32 = 512;

/// An object identifier: the object number and generation number of an
/// indirect object.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Oid {
    /// The object number.
    pub num: u32,
    /// The generation number.
    pub gen: u16,
}

impl Oid {
    /// Create a new object identifier.
    pub fn new(num: u32, gen: u16) -> Self {
        Self { num, gen }
    }
}

/// A primitive PDF value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The null object.
    Null,
    /// A boolean.
    Boolean(bool),
    /// An integer.
    Integer(i64),
    /// A real number.
    Real(f64),
    /// A name.
    Name(Name),
    /// A literal string, decrypted and BOM-decoded where applicable.
    Literal(Vec<u8>),
    /// A hex string, decrypted and BOM-decoded where applicable.
    Hex(Vec<u8>),
    /// An array of values.
    Array(Vec<Value>),
    /// A dictionary.
    Dict(Dict),
    /// A reference to an indirect object.
    Ref(Oid),
}

impl Value {
    /// Return the integer content, if the value is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Return the numeric content as a float, if the value is a number.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(n) => Some(*n),
            Value::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Return the boolean content, if the value is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Return the name bytes, if the value is a name.
    pub fn as_name(&self) -> Option<&Name> {
        match self {
            Value::Name(name) => Some(name),
            _ => None,
        }
    }

    /// Return the string bytes, if the value is a literal or hex string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Literal(bytes) | Value::Hex(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Return the elements, if the value is an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Return the dictionary, if the value is one.
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    /// Return the object identifier, if the value is a reference.
    pub fn as_reference(&self) -> Option<Oid> {
        match self {
            Value::Ref(oid) => Some(*oid),
            _ => None,
        }
    }

    /// Returns `true` for the null object.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Parse a single PDF value.
///
/// When `key` is present, strings are decrypted in place with RC4 before
/// UTF-16 BOM detection.
pub(crate) fn parse_value(r: &mut Reader<'_>, key: Option<&[u8]>) -> Result<Value, Error> {
    parse_value_at(r, key, 0)
}

fn parse_value_at(r: &mut Reader<'_>, key: Option<&[u8]>, depth: u32) -> Result<Value, Error> {
    if depth > MAX_DEPTH {
        return Err(Error::Syntax {
            pos: r.offset(),
            detail: "value nesting too deep",
        });
    }

    r.skip_white_spaces_and_comments();
    let pos = r.offset();

    match r.peek_byte().ok_or(Error::Syntax {
        pos,
        detail: "unexpected end of input",
    })? {
        b'<' => {
            if r.starts_with(b"<<") {
                parse_dict(r, key, depth).map(Value::Dict)
            } else {
                string::parse_hex(r, key).map(Value::Hex)
            }
        }
        b'(' => string::parse_literal(r, key).map(Value::Literal),
        b'[' => parse_array(r, key, depth),
        b'/' => name::parse(r).map(Value::Name).ok_or(Error::Syntax {
            pos,
            detail: "invalid name",
        }),
        b'0'..=b'9' => {
            let value = number::parse(r).ok_or(Error::Syntax {
                pos,
                detail: "invalid number",
            })?;

            // A non-negative integer may be the start of an `N G R`
            // reference; look ahead and rewind when it is not.
            if let Value::Integer(num) = value {
                if let Some(oid) = try_reference(r, num) {
                    return Ok(Value::Ref(oid));
                }
            }

            Ok(value)
        }
        b'+' | b'-' => number::parse(r).ok_or(Error::Syntax {
            pos,
            detail: "invalid number",
        }),
        b if b.is_ascii_alphabetic() => parse_keyword(r),
        _ => Err(Error::Syntax {
            pos,
            detail: "unexpected character",
        }),
    }
}

fn parse_dict(r: &mut Reader<'_>, key: Option<&[u8]>, depth: u32) -> Result<Dict, Error> {
    let start = r.offset();
    r.forward_tag(b"<<").ok_or(Error::Syntax {
        pos: start,
        detail: "expected dictionary",
    })?;

    let mut dict = Dict::new();

    loop {
        r.skip_white_spaces_and_comments();

        if r.forward_tag(b">>").is_some() {
            return Ok(dict);
        }
        if r.at_end() {
            return Err(Error::Syntax {
                pos: start,
                detail: "unterminated dictionary",
            });
        }

        let pos = r.offset();
        let name = name::parse(r).ok_or(Error::Syntax {
            pos,
            detail: "expected name key in dictionary",
        })?;
        let value = parse_value_at(r, key, depth + 1)?;
        dict.insert(name, value);
    }
}

fn parse_array(r: &mut Reader<'_>, key: Option<&[u8]>, depth: u32) -> Result<Value, Error> {
    let start = r.offset();
    r.forward_tag(b"[").ok_or(Error::Syntax {
        pos: start,
        detail: "expected array",
    })?;

    let mut items = Vec::new();

    loop {
        r.skip_white_spaces_and_comments();

        if r.forward_tag(b"]").is_some() {
            return Ok(Value::Array(items));
        }
        if r.at_end() {
            return Err(Error::Syntax {
                pos: start,
                detail: "unterminated array",
            });
        }

        items.push(parse_value_at(r, key, depth + 1)?);
    }
}

fn parse_keyword(r: &mut Reader<'_>) -> Result<Value, Error> {
    let start = r.offset();
    r.forward_while(|b| b.is_ascii_alphabetic());
    let keyword = r.range(start..r.offset()).unwrap_or_default();

    match keyword {
        b"true" => Ok(Value::Boolean(true)),
        b"false" => Ok(Value::Boolean(false)),
        // `obj` slips through when scanning damaged files; treat it like
        // null rather than failing the surrounding parse.
        b"null" | b"obj" => Ok(Value::Null),
        _ => Err(Error::Syntax {
            pos: start,
            detail: "unknown keyword",
        }),
    }
}

fn try_reference(r: &mut Reader<'_>, num: i64) -> Option<Oid> {
    let num = u32::try_from(num).ok()?;
    let start = r.offset();

    let mut attempt = || -> Option<Oid> {
        r.eat(|b| b == b' ')?;
        let gen = u16::try_from(number::parse_unsigned(r)?).ok()?;
        r.eat(|b| b == b' ')?;
        r.eat(|b| b == b'R')?;

        Some(Oid::new(num, gen))
    };

    match attempt() {
        Some(oid) => Some(oid),
        None => {
            r.jump(start);
            None
        }
    }
}

/// An indirect object: its identifier, its dictionary (empty when the body
/// is not a dictionary), a non-dictionary payload when present, and the
/// raw stream bytes (decrypted, still compressed).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Object {
    /// The object identifier.
    pub oid: Oid,
    /// The object's dictionary. Empty for non-dictionary objects.
    pub dict: Dict,
    /// The object's value when the body is not a dictionary.
    pub data: Option<Value>,
    /// The raw stream payload, after decryption and before decompression.
    pub content: Option<Vec<u8>>,
}

impl Default for Oid {
    fn default() -> Self {
        Oid::new(0, 0)
    }
}

impl Object {
    /// Return the `/Type` name of the object's dictionary.
    pub fn type_name(&self) -> &[u8] {
        self.dict.get_name(keys::TYPE)
    }

    /// Returns `true` if the object is a page.
    pub fn is_page(&self) -> bool {
        self.type_name() == names::PAGE
    }

    /// Returns `true` if the object is a signature record.
    pub fn is_signature(&self) -> bool {
        self.type_name() == names::SIG
    }

    /// Returns `true` if the object is an image XObject.
    pub fn is_image(&self) -> bool {
        self.type_name() == names::XOBJECT && self.dict.get_name(keys::SUBTYPE) == names::IMAGE
    }

    /// Returns `true` if the object is an object stream.
    pub fn is_object_stream(&self) -> bool {
        self.type_name() == names::OBJ_STM
    }

    /// Returns `true` if the object is a cross-reference stream.
    pub fn is_xref_stream(&self) -> bool {
        self.type_name() == names::XREF
    }

    pub(crate) fn is_linearized(&self) -> bool {
        self.dict.has(keys::LINEARIZED)
    }

    /// Return the stream payload with the declared filters applied.
    ///
    /// Objects without a stream yield an empty body.
    pub fn body(&self) -> Result<Vec<u8>, Error> {
        match &self.content {
            Some(content) => filter::decode(content, &self.dict),
            None => Ok(Vec::new()),
        }
    }

    /// Extract the object packed at `index` inside this object stream.
    ///
    /// The prefix table of the decoded stream holds `/N` pairs of object
    /// number and offset; the offsets are relative to `/First`. Inner
    /// values inherit the owner's decryption, so no per-object key applies
    /// here.
    pub(crate) fn embedded_object(&self, oid: Oid, index: u32) -> Option<Object> {
        if !self.is_object_stream() {
            return None;
        }

        let body = self.body().ok()?;
        let count = u32::try_from(self.dict.get_int(keys::N)).ok()?;
        let first = usize::try_from(self.dict.get_int(keys::FIRST)).ok()?;

        if index >= count {
            return None;
        }

        let mut r = Reader::new(&body);
        let mut entry = None;
        for _ in 0..=index {
            r.skip_white_spaces_and_comments();
            let num = number::parse_unsigned(&mut r)?;
            r.skip_white_spaces_and_comments();
            let offset = number::parse_unsigned(&mut r)?;
            entry = Some((num, offset));
        }

        let (num, offset) = entry?;
        if u32::try_from(num).ok()? != oid.num {
            warn!(
                "object stream entry {index} names object {num}, expected {}",
                oid.num
            );

            return None;
        }

        let pos = first.checked_add(usize::try_from(offset).ok()?)?;
        if pos > body.len() {
            return None;
        }

        let mut vr = Reader::new_at(&body, pos);
        let value = parse_value(&mut vr, None).ok()?;

        let mut object = Object {
            oid,
            ..Object::default()
        };
        match value {
            Value::Dict(dict) => object.dict = dict,
            other => object.data = Some(other),
        }

        Some(object)
    }
}

/// Read an indirect object (`N G obj … endobj`) at the reader's position.
///
/// `doc_key` is the document-level RC4 key; the per-object key is derived
/// from it once the header has been read. With `full` unset, stream
/// payloads are not materialized (the lazy path for dictionary-only
/// lookups). `resolve_length` supplies the value of an indirect `/Length`.
pub(crate) fn read_object(
    r: &mut Reader<'_>,
    doc_key: Option<&[u8]>,
    full: bool,
    resolve_length: &dyn Fn(Oid) -> Option<i64>,
) -> Result<Object, Error> {
    r.skip_white_spaces_and_comments();

    let num = number::parse_unsigned(r)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or(Error::ObjectHeaderMalformed)?;
    r.skip_white_spaces_and_comments();
    let gen = number::parse_unsigned(r)
        .and_then(|n| u16::try_from(n).ok())
        .ok_or(Error::ObjectHeaderMalformed)?;
    r.skip_white_spaces_and_comments();
    r.forward_tag(b"obj").ok_or(Error::ObjectHeaderMalformed)?;

    let oid = Oid::new(num, gen);
    let object_key = doc_key.map(|k| crypto::object_key(k, oid));

    let value = parse_value(r, object_key.as_deref())?;

    let mut object = Object {
        oid,
        ..Object::default()
    };
    match value {
        Value::Dict(dict) => object.dict = dict,
        other => object.data = Some(other),
    }

    r.skip_white_spaces_and_comments();

    if r.forward_tag(b"endobj").is_some() {
        return Ok(object);
    }

    if r.forward_tag(b"stream").is_some() {
        // The keyword is followed by LF or CRLF; be lenient about a bare CR.
        let _ = r
            .forward_tag(b"\r\n")
            .or_else(|| r.forward_tag(b"\n"))
            .or_else(|| r.forward_tag(b"\r"));

        if !full {
            return Ok(object);
        }

        let length = match object.dict.get(keys::LENGTH) {
            Some(Value::Integer(n)) => *n,
            Some(Value::Ref(len_oid)) => resolve_length(*len_oid).unwrap_or(0),
            _ => 0,
        };
        let length = usize::try_from(length).map_err(|_| Error::StreamTruncated)?;

        let payload = r.read_bytes(length).ok_or(Error::StreamTruncated)?;
        object.content = Some(match &object_key {
            Some(key) => crypto::decrypt(key, payload),
            None => payload.to_vec(),
        });

        r.skip_white_spaces_and_comments();
        r.forward_tag(b"endstream").ok_or(Error::StreamTruncated)?;
        r.skip_white_spaces_and_comments();
        r.forward_tag(b"endobj").ok_or(Error::Syntax {
            pos: r.offset(),
            detail: "missing endobj keyword",
        })?;

        return Ok(object);
    }

    Err(Error::Syntax {
        pos: r.offset(),
        detail: "expected stream or endobj keyword",
    })
}
