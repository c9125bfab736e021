/*!
A low-level library for reading PDF files.

`vellum` parses the classic and linearized PDF 1.x file formats and exposes
the document as a lazily-resolved object graph: the cross-reference data is
read once at open time, and individual objects are located, decrypted and
decompressed on demand. On top of those primitives sits a thin facade for
the common document-level questions: version, metadata, outlines, signature
records, page count, per-page content streams and embedded JPEG images.

The crate is strictly read-only. Content-stream interpretation (text
extraction, rendering) is a separate concern for a consumer of the decoded
page streams.

# Example

```no_run
use vellum::Document;

let doc = Document::open("report.pdf")?;

println!("version: {}", doc.version());
println!("title:   {}", doc.info().title);

for n in 1..=doc.page_count() {
    let content = doc.get_page(n)?;
    println!("page {n}: {} content bytes", content.len());
}
# Ok::<(), vellum::Error>(())
```

# Supported features

- Classic xref tables and cross-reference streams, including incremental
  updates (`/Prev` chains), hybrid files (`/XRefStm`) and linearized
  layouts.
- Objects packed into object streams (`/Type /ObjStm`).
- Flate-compressed streams, with the row predictor used by
  cross-reference streams.
- Documents encrypted with the standard security handler V2 (RC4), opened
  with the empty user password.
- JPEG (`DCTDecode`) image extraction.

# Limitations

- No write support of any kind.
- LZW, ASCII85, ASCIIHex and CCITT filters are not decoded; such streams
  are surfaced raw.
- AES-based security handlers (PDF 1.6+/2.0) are not supported.
- Signature records are extracted but not cryptographically verified.
*/

#![deny(missing_docs)]

pub(crate) mod crypto;
pub(crate) mod filter;
pub(crate) mod trivia;

pub mod document;
pub mod error;
pub mod metadata;
pub mod object;
pub mod reader;
pub mod xref;

pub use document::Document;
pub use error::Error;
pub use metadata::{FileInfo, Image, Outline, Signature};
pub use object::{DateTime, Dict, Name, Object, Oid, Value};
pub use xref::{Pointer, PointerKind};
