//! Dictionaries.

use crate::object::name::Name;
use crate::object::{Oid, Value};
use rustc_hash::FxHashMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::OnceLock;

const EMPTY_VALUES: &[Value] = &[];

fn empty_dict() -> &'static Dict {
    static EMPTY: OnceLock<Dict> = OnceLock::new();
    EMPTY.get_or_init(Dict::new)
}

/// A dictionary mapping names to values.
///
/// Keys are stored ASCII-lowercased and looked up case-insensitively. The
/// typed getters are deliberately lenient: a missing key or a value of the
/// wrong type yields the type's zero value, matching how PDF files in the
/// wild omit and misuse entries.
#[derive(Clone, Default, PartialEq)]
pub struct Dict(FxHashMap<Name, Value>);

impl Dict {
    /// Create a new empty dictionary.
    pub fn new() -> Self {
        Self(FxHashMap::default())
    }

    /// Returns the number of entries in the dictionary.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return whether the dictionary is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Insert an entry, lowercasing the key.
    pub(crate) fn insert(&mut self, key: Name, value: Value) {
        self.0.insert(key.lowercased(), value);
    }

    /// Checks whether the dictionary contains an entry with the given key.
    pub fn has(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Return the raw value for a key, or `None` if it is absent.
    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        self.0.get(Name::new(key).lowercased().as_ref())
    }

    /// Return the string content for a key, or an empty slice.
    pub fn get_str(&self, key: &[u8]) -> &[u8] {
        match self.get(key) {
            Some(Value::Literal(bytes)) | Some(Value::Hex(bytes)) => bytes,
            _ => b"",
        }
    }

    /// Return the string content for a key as (lossy) UTF-8 text.
    pub fn get_text(&self, key: &[u8]) -> String {
        String::from_utf8_lossy(self.get_str(key)).into_owned()
    }

    /// Return the name bytes for a key, or an empty slice.
    pub fn get_name(&self, key: &[u8]) -> &[u8] {
        match self.get(key) {
            Some(Value::Name(name)) => name,
            _ => b"",
        }
    }

    /// Return the integer for a key, or `0`.
    pub fn get_int(&self, key: &[u8]) -> i64 {
        match self.get(key) {
            Some(Value::Integer(n)) => *n,
            _ => 0,
        }
    }

    /// Return the number for a key as a float, or `0.0`.
    pub fn get_real(&self, key: &[u8]) -> f64 {
        match self.get(key) {
            Some(Value::Real(n)) => *n,
            Some(Value::Integer(n)) => *n as f64,
            _ => 0.0,
        }
    }

    /// Return the boolean for a key, or `false`.
    pub fn get_bool(&self, key: &[u8]) -> bool {
        matches!(self.get(key), Some(Value::Boolean(true)))
    }

    /// Return the array for a key, or an empty slice.
    pub fn get_array(&self, key: &[u8]) -> &[Value] {
        match self.get(key) {
            Some(Value::Array(items)) => items,
            _ => EMPTY_VALUES,
        }
    }

    /// Return the nested dictionary for a key, or an empty dictionary.
    pub fn get_dict(&self, key: &[u8]) -> &Dict {
        match self.get(key) {
            Some(Value::Dict(dict)) => dict,
            _ => empty_dict(),
        }
    }

    /// Return the object reference for a key, if the entry is one.
    pub fn get_ref(&self, key: &[u8]) -> Option<Oid> {
        match self.get(key) {
            Some(Value::Ref(oid)) => Some(*oid),
            _ => None,
        }
    }

    /// Return the integers of an array entry, skipping other element types.
    pub fn get_int_array(&self, key: &[u8]) -> Vec<i64> {
        self.get_array(key)
            .iter()
            .filter_map(Value::as_int)
            .collect()
    }

    /// Return the object references of an array entry, skipping other
    /// element types.
    pub fn get_ref_array(&self, key: &[u8]) -> Vec<Oid> {
        self.get_array(key)
            .iter()
            .filter_map(Value::as_reference)
            .collect()
    }

    /// Returns an iterator over all keys in the dictionary.
    pub fn keys(&self) -> impl Iterator<Item = &Name> {
        self.0.keys()
    }

    /// Returns an iterator over all entries in the dictionary.
    pub fn entries(&self) -> impl Iterator<Item = (&Name, &Value)> {
        self.0.iter()
    }
}

impl Debug for Dict {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in &self.0 {
            map.entry(&key.as_str(), value);
        }
        map.finish()
    }
}

/// The dictionary keys the crate reads, in their stored (lowercased) form.
pub mod keys {
    macro_rules! key {
        ($i:ident, $e:expr) => {
            /// Dictionary key.
            pub const $i: &[u8] = $e;
        };
    }

    key!(AUTHOR, b"author");
    key!(COLUMNS, b"columns");
    key!(CONTENTS, b"contents");
    key!(COUNT, b"count");
    key!(CREATION_DATE, b"creationdate");
    key!(CREATOR, b"creator");
    key!(DECODE_PARMS, b"decodeparms");
    key!(ENCRYPT, b"encrypt");
    key!(FILTER, b"filter");
    key!(FIRST, b"first");
    key!(HEIGHT, b"height");
    key!(ID, b"id");
    key!(INDEX, b"index");
    key!(INFO, b"info");
    key!(KEYWORDS, b"keywords");
    key!(KIDS, b"kids");
    key!(LANG, b"lang");
    key!(LAST, b"last");
    key!(LENGTH, b"length");
    key!(LINEARIZED, b"linearized");
    key!(M, b"m");
    key!(METADATA, b"metadata");
    key!(MOD_DATE, b"moddate");
    key!(N, b"n");
    key!(NAME, b"name");
    key!(NEXT, b"next");
    key!(O, b"o");
    key!(OUTLINES, b"outlines");
    key!(P, b"p");
    key!(PAGES, b"pages");
    key!(PREDICTOR, b"predictor");
    key!(PREV, b"prev");
    key!(PRODUCER, b"producer");
    key!(REASON, b"reason");
    key!(RESOURCES, b"resources");
    key!(ROOT, b"root");
    key!(SIZE, b"size");
    key!(SUBJECT, b"subject");
    key!(SUBTYPE, b"subtype");
    key!(TITLE, b"title");
    key!(TRAPPED, b"trapped");
    key!(TYPE, b"type");
    key!(U, b"u");
    key!(V, b"v");
    key!(VERSION, b"version");
    key!(W, b"w");
    key!(WIDTH, b"width");
    key!(XOBJECT, b"xobject");
    key!(XREF_STM, b"xrefstm");
}

/// Name values the crate compares against, in their exact spelling.
pub mod names {
    macro_rules! name {
        ($i:ident, $e:expr) => {
            /// Name value.
            pub const $i: &[u8] = $e;
        };
    }

    name!(DCT_DECODE, b"DCTDecode");
    name!(FLATE_DECODE, b"FlateDecode");
    name!(IMAGE, b"Image");
    name!(OBJ_STM, b"ObjStm");
    name!(PAGE, b"Page");
    name!(SIG, b"Sig");
    name!(STANDARD, b"Standard");
    name!(TRUE, b"True");
    name!(XOBJECT, b"XObject");
    name!(XREF, b"XRef");
}
