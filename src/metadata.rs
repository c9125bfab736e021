//! Document-level record types returned by the facade queries.

use crate::object::{DateTime, Value};
use std::collections::HashMap;

/// The entries of the document information dictionary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileInfo {
    /// The document title.
    pub title: String,
    /// The document author.
    pub author: String,
    /// The document subject.
    pub subject: String,
    /// The document keywords, split on commas.
    pub keywords: Vec<String>,
    /// The tool that created the original document.
    pub creator: String,
    /// The tool that produced the PDF file.
    pub producer: String,
    /// When the document was created.
    pub created: Option<DateTime>,
    /// When the document was last modified.
    pub modified: Option<DateTime>,
    /// Whether the document has been trapped for printing.
    pub trapped: bool,
    /// All remaining information entries, keyed by their lowercased name.
    pub fields: HashMap<String, Value>,
}

/// A node of the document outline tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outline {
    /// The outline item title.
    pub title: String,
    /// The item's children, if any.
    pub children: Vec<Outline>,
}

/// A signature record extracted from the document.
///
/// Only the descriptive fields are read; the cryptographic payload is not
/// verified.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    /// Who signed.
    pub name: String,
    /// The stated reason for signing.
    pub reason: String,
    /// When the signature was applied.
    pub when: Option<DateTime>,
}

/// A decoded raster image.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Raw pixel data as emitted by the JPEG decoder.
    pub data: Vec<u8>,
}
