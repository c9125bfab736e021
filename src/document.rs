//! Opening documents and querying the object graph.

use crate::crypto;
use crate::error::Error;
use crate::filter;
use crate::metadata::{FileInfo, Image, Outline, Signature};
use crate::object::dict::{keys, names};
use crate::object::{self, DateTime, Dict, Object, Oid, Value};
use crate::reader::Reader;
use crate::trivia::is_eol_character;
use crate::xref::{self, Pointer, PointerKind};
use log::warn;
use rustc_hash::FxHashSet;
use std::path::Path;

/// Size of the head window inspected for the preamble and a possible
/// linearization parameter object.
const HEAD_WINDOW: usize = 1024;

/// A read-only PDF document.
///
/// The document owns the file bytes and the object directory built at open
/// time; queries materialize indirect objects on demand and never mutate
/// shared state, so a `Document` can be queried from multiple threads.
pub struct Document {
    data: Vec<u8>,
    directory: Vec<Pointer>,
    catalog: Option<Oid>,
    info: Option<Oid>,
    encrypt: Option<Oid>,
    file_id: Vec<Vec<u8>>,
    key: Vec<u8>,
    header_version: u8,
}

impl Document {
    /// Read and open the PDF file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Document, Error> {
        Self::new(std::fs::read(path)?)
    }

    /// Open a PDF document from its raw bytes.
    ///
    /// This detects the preamble, builds the object directory from the
    /// classic or linearized layout, and derives the decryption key when
    /// the trailer references an encryption dictionary.
    pub fn new(data: Vec<u8>) -> Result<Document, Error> {
        let (header_version, linearized) = read_preamble(&data)?;

        let build = match linearized {
            Some(offset) => xref::build_linearized(&data, offset)?,
            None => xref::build_classic(&data)?,
        };

        let mut document = Document {
            data,
            directory: build.directory,
            catalog: build.trailer.root,
            info: build.trailer.info,
            encrypt: build.trailer.encrypt,
            file_id: build.trailer.file_id,
            key: Vec::new(),
            header_version,
        };
        document.setup_key()?;

        Ok(document)
    }

    /// The object directory, sorted by object identifier.
    pub fn directory(&self) -> &[Pointer] {
        &self.directory
    }

    /// Load the object with the given identifier, including its stream
    /// payload. Returns `None` for unknown or freed identifiers.
    pub fn get(&self, oid: Oid) -> Option<Object> {
        self.load(oid, true)
    }

    /// Visit every live top-level object in directory order. The callback
    /// returns `false` to stop the iteration; objects that fail to load are
    /// skipped.
    pub fn walk(&self, mut visit: impl FnMut(&Object) -> bool) {
        for pointer in &self.directory {
            if pointer.is_embedded() || pointer.is_free() {
                continue;
            }
            let Some(object) = self.get(pointer.oid) else {
                continue;
            };
            if !visit(&object) {
                break;
            }
        }
    }

    /// The document version: the catalog's `/Version` entry when present,
    /// the preamble version otherwise.
    pub fn version(&self) -> String {
        if let Some(catalog) = self.catalog_object() {
            let version = catalog.dict.get_name(keys::VERSION);
            if !version.is_empty() {
                return String::from_utf8_lossy(version).into_owned();
            }
        }

        format!("1.{}", self.header_version)
    }

    /// The catalog's `/Lang` entry, or an empty string.
    pub fn lang(&self) -> String {
        match self.catalog_object() {
            Some(catalog) => catalog.dict.get_text(keys::LANG),
            None => String::new(),
        }
    }

    /// The number of pages, as declared by the pages root.
    pub fn page_count(&self) -> i64 {
        match self.pages_root() {
            Some(root) => root.dict.get_int(keys::COUNT),
            None => 0,
        }
    }

    /// The concatenated content streams of page `n` (1-based).
    pub fn get_page(&self, n: i64) -> Result<Vec<u8>, Error> {
        let root = self.pages_root().ok_or(Error::NotFound)?;
        let page = self.descend(root, n).ok_or(Error::NotFound)?;

        let mut contents = page.dict.get_ref_array(keys::CONTENTS);
        if contents.is_empty() {
            contents.extend(page.dict.get_ref(keys::CONTENTS));
        }

        let mut body = Vec::new();
        for oid in contents {
            let object = self.get(oid).ok_or(Error::NotFound)?;
            body.extend(object.body()?);
        }

        Ok(body)
    }

    /// The document outline tree, or an empty list when the document has
    /// none.
    pub fn outlines(&self) -> Vec<Outline> {
        let Some(catalog) = self.catalog_object() else {
            return Vec::new();
        };
        let Some(oid) = catalog.dict.get_ref(keys::OUTLINES) else {
            return Vec::new();
        };
        let Some(root) = self.load(oid, false) else {
            return Vec::new();
        };

        self.outline_children(&root, &mut FxHashSet::default())
    }

    /// All signature records of the document.
    pub fn signatures(&self) -> Vec<Signature> {
        let mut signatures = Vec::new();

        self.walk(|object| {
            if object.is_signature() {
                signatures.push(Signature {
                    name: String::from_utf8_lossy(object.dict.get_str(keys::NAME)).into_owned(),
                    reason: String::from_utf8_lossy(object.dict.get_str(keys::REASON))
                        .into_owned(),
                    when: DateTime::parse(object.dict.get_str(keys::M)),
                });
            }
            true
        });

        signatures
    }

    /// The document information dictionary. Unknown entries are retained
    /// verbatim in [`FileInfo::fields`].
    pub fn info(&self) -> FileInfo {
        let mut info = FileInfo::default();
        let Some(oid) = self.info else {
            return info;
        };
        let Some(object) = self.load(oid, false) else {
            return info;
        };
        let dict = &object.dict;

        info.title = dict.get_text(keys::TITLE);
        info.author = dict.get_text(keys::AUTHOR);
        info.subject = dict.get_text(keys::SUBJECT);
        info.creator = dict.get_text(keys::CREATOR);
        info.producer = dict.get_text(keys::PRODUCER);
        info.keywords = dict
            .get_text(keys::KEYWORDS)
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        info.created = DateTime::parse(dict.get_str(keys::CREATION_DATE));
        info.modified = DateTime::parse(dict.get_str(keys::MOD_DATE));
        info.trapped = dict.get_name(keys::TRAPPED) == names::TRUE;

        const EXTRACTED: [&[u8]; 9] = [
            keys::TITLE,
            keys::AUTHOR,
            keys::SUBJECT,
            keys::KEYWORDS,
            keys::CREATOR,
            keys::PRODUCER,
            keys::CREATION_DATE,
            keys::MOD_DATE,
            keys::TRAPPED,
        ];
        for (key, value) in dict.entries() {
            if EXTRACTED.contains(&key.as_ref()) {
                continue;
            }
            info.fields
                .insert(String::from_utf8_lossy(key.as_ref()).into_owned(), value.clone());
        }

        info
    }

    /// The raw bytes of the catalog's XMP metadata stream, if any.
    pub fn metadata(&self) -> Option<Vec<u8>> {
        let catalog = self.catalog_object()?;
        let oid = catalog.dict.get_ref(keys::METADATA)?;
        let object = self.get(oid)?;

        object.body().ok()
    }

    /// Decode the image XObject registered under `name` in some page's
    /// resources. Only `DCTDecode` (JPEG) images are supported.
    pub fn get_image(&self, name: &str) -> Result<Image, Error> {
        let oid = self.find_image(name.as_bytes()).ok_or(Error::NotFound)?;
        let object = self.get(oid).ok_or(Error::NotFound)?;

        let filter_name: &[u8] = match object.dict.get(keys::FILTER) {
            Some(Value::Name(n)) => n.as_ref(),
            Some(Value::Array(items)) if items.len() == 1 => {
                items[0].as_name().map(|n| n.as_ref()).unwrap_or(b"")
            }
            _ => b"",
        };
        if filter_name != names::DCT_DECODE {
            return Err(Error::UnknownFilter(
                String::from_utf8_lossy(filter_name).into_owned(),
            ));
        }

        let content = object.content.as_deref().unwrap_or(b"");
        let (width, height, data) =
            filter::dct::decode(content).ok_or(Error::StreamTruncated)?;

        Ok(Image {
            width,
            height,
            data,
        })
    }

    fn load(&self, oid: Oid, full: bool) -> Option<Object> {
        let pointer = xref::find(&self.directory, oid)?;

        match pointer.kind {
            PointerKind::Free => None,
            PointerKind::InUse { offset } => {
                let mut r = Reader::new_at(&self.data, usize::try_from(offset).ok()?);

                // The encryption dictionary itself is stored in the clear.
                let doc_key = if self.key.is_empty() || Some(oid) == self.encrypt {
                    None
                } else {
                    Some(self.key.as_slice())
                };

                let object = object::read_object(&mut r, doc_key, full, &|len_oid| {
                    self.resolve_length(len_oid)
                })
                .ok()?;

                if object.oid != oid {
                    warn!(
                        "object at offset {offset} is {:?}, expected {:?}",
                        object.oid, oid
                    );

                    return None;
                }

                Some(object)
            }
            PointerKind::InStream { owner, index } => {
                // The owner must be a top-level object; anything else would
                // allow reference cycles between object streams.
                match xref::find(&self.directory, owner).map(|p| p.kind) {
                    Some(PointerKind::InUse { .. }) => {}
                    _ => {
                        warn!("object stream owner {owner:?} is not a top-level object");

                        return None;
                    }
                }

                let owner_object = self.load(owner, true)?;
                owner_object.embedded_object(oid, index)
            }
        }
    }

    /// Resolve an indirect `/Length`. Restricted to plain top-level integer
    /// objects, which also keeps crafted files from recursing through
    /// object streams.
    fn resolve_length(&self, oid: Oid) -> Option<i64> {
        let pointer = xref::find(&self.directory, oid)?;
        if !matches!(pointer.kind, PointerKind::InUse { .. }) {
            return None;
        }

        self.load(oid, false)?.data?.as_int()
    }

    fn catalog_object(&self) -> Option<Object> {
        self.load(self.catalog?, false)
    }

    fn pages_root(&self) -> Option<Object> {
        let catalog = self.catalog_object()?;
        self.load(catalog.dict.get_ref(keys::PAGES)?, false)
    }

    /// Walk the pages tree down to the `n`-th leaf (1-based), subtracting
    /// subtree counts along the way. The depth cap keeps reference cycles
    /// in `/Kids` from recursing forever.
    fn descend(&self, node: Object, n: i64) -> Option<Object> {
        self.descend_at(node, n, 0)
    }

    fn descend_at(&self, node: Object, mut n: i64, depth: u32) -> Option<Object> {
        if depth > 64 {
            warn!("pages tree deeper than 64 levels, giving up");

            return None;
        }

        if node.is_page() {
            return Some(node);
        }

        if n < 1 || n > node.dict.get_int(keys::COUNT) {
            return None;
        }

        for kid in node.dict.get_ref_array(keys::KIDS) {
            let child = self.load(kid, false)?;

            if child.is_page() {
                if n == 1 {
                    return Some(child);
                }
                n -= 1;
                continue;
            }

            let count = child.dict.get_int(keys::COUNT);
            if n <= count {
                return self.descend_at(child, n, depth + 1);
            }
            n -= count;
        }

        None
    }

    fn collect_pages(&self, node: &Object, out: &mut Vec<Object>, visited: &mut FxHashSet<Oid>) {
        if node.is_page() {
            out.push(node.clone());

            return;
        }

        for kid in node.dict.get_ref_array(keys::KIDS) {
            if !visited.insert(kid) {
                continue;
            }
            if let Some(child) = self.load(kid, false) {
                self.collect_pages(&child, out, visited);
            }
        }
    }

    fn find_image(&self, name: &[u8]) -> Option<Oid> {
        let root = self.pages_root()?;
        let mut pages = Vec::new();
        self.collect_pages(&root, &mut pages, &mut FxHashSet::default());

        for page in pages {
            let Some(resources) = self.resolve_dict(page.dict.get(keys::RESOURCES)) else {
                continue;
            };
            let Some(xobjects) = self.resolve_dict(resources.get(keys::XOBJECT)) else {
                continue;
            };
            if let Some(oid) = xobjects.get_ref(name) {
                return Some(oid);
            }
        }

        None
    }

    fn resolve_dict(&self, value: Option<&Value>) -> Option<Dict> {
        match value {
            Some(Value::Dict(dict)) => Some(dict.clone()),
            Some(Value::Ref(oid)) => Some(self.load(*oid, false)?.dict),
            _ => None,
        }
    }

    fn outline_children(&self, node: &Object, visited: &mut FxHashSet<Oid>) -> Vec<Outline> {
        let mut items = Vec::new();
        let last = node.dict.get_ref(keys::LAST);
        let mut next = node.dict.get_ref(keys::FIRST);

        while let Some(oid) = next {
            // A malformed /Next chain must not loop forever.
            if !visited.insert(oid) {
                break;
            }
            let Some(item) = self.load(oid, false) else {
                break;
            };

            let children = if item.dict.has(keys::FIRST) {
                self.outline_children(&item, visited)
            } else {
                Vec::new()
            };
            items.push(Outline {
                title: String::from_utf8_lossy(item.dict.get_str(keys::TITLE)).into_owned(),
                children,
            });

            if Some(oid) == last {
                break;
            }
            next = item.dict.get_ref(keys::NEXT);
        }

        items
    }

    /// Derive and validate the document key from the encryption dictionary
    /// referenced by the trailer (standard security handler, empty user
    /// password).
    fn setup_key(&mut self) -> Result<(), Error> {
        let Some(encrypt_oid) = self.encrypt else {
            return Ok(());
        };
        let Some(object) = self.load(encrypt_oid, false) else {
            warn!("encryption dictionary {encrypt_oid:?} could not be loaded");

            return Err(Error::NotFound);
        };
        let dict = &object.dict;

        let version = dict.get_int(keys::V);
        if version > 2 || dict.get_name(keys::FILTER) != names::STANDARD {
            warn!("unsupported security handler (V {version}), attempting RC4 anyway");
        }

        let owner = dict.get_str(keys::O).to_vec();
        let user = dict.get_str(keys::U).to_vec();
        let permissions = dict.get_int(keys::P) as u32;
        let length = match dict.get_int(keys::LENGTH) {
            0 => 40,
            n => n.clamp(40, 128),
        } as u16;
        let file_id = self.file_id.first().cloned().unwrap_or_default();

        let key = crypto::document_key(&owner, permissions, length, &file_id);
        crypto::verify_user_password(&key, &file_id, &user)?;
        self.key = key;

        Ok(())
    }
}

/// Check the `%PDF-1.d` preamble and probe for a linearization parameter
/// object behind it. Returns the version digit and, for linearized files,
/// the offset right after the parameter object (where the first xref
/// section lives).
fn read_preamble(data: &[u8]) -> Result<(u8, Option<usize>), Error> {
    let window = data.len().min(HEAD_WINDOW);
    let mut r = Reader::new(&data[..window]);

    r.forward_tag(b"%PDF-1.").ok_or(Error::BadPreamble)?;
    let digit = r.read_byte().ok_or(Error::BadPreamble)?;
    if !(b'0'..=b'7').contains(&digit) {
        return Err(Error::BadPreamble);
    }

    // The rest of the preamble line, then any binary-marker comments.
    r.forward_while(|b| !is_eol_character(b));
    r.skip_eol_characters();
    while r.peek_byte() == Some(b'%') {
        r.forward_while(|b| !is_eol_character(b));
        r.skip_eol_characters();
    }

    let linearized = match object::read_object(&mut r, None, false, &|_| None) {
        Ok(object) if object.is_linearized() => Some(r.offset()),
        _ => None,
    };

    Ok((digit - b'0', linearized))
}

#[cfg(test)]
mod tests {
    use super::Document;
    use crate::crypto;
    use crate::error::Error;
    use crate::metadata::Outline;
    use crate::object::{Oid, Value};
    use crate::xref::PointerKind;

    /// Assembles a classic-xref PDF in memory, tracking object offsets so
    /// the table is always consistent.
    struct FileBuilder {
        buf: Vec<u8>,
        objects: Vec<(u32, usize)>,
    }

    impl FileBuilder {
        fn new() -> Self {
            Self {
                buf: b"%PDF-1.4\n%\xb5\xb5\xb5\xb5\n".to_vec(),
                objects: Vec::new(),
            }
        }

        fn object(&mut self, num: u32, body: &str) {
            self.objects.push((num, self.buf.len()));
            self.buf
                .extend_from_slice(format!("{num} 0 obj\n{body}\nendobj\n").as_bytes());
        }

        fn stream_object(&mut self, num: u32, dict: &str, content: &[u8]) {
            self.objects.push((num, self.buf.len()));
            self.buf.extend_from_slice(
                format!("{num} 0 obj\n<< /Length {} {dict} >>\nstream\n", content.len())
                    .as_bytes(),
            );
            self.buf.extend_from_slice(content);
            self.buf.extend_from_slice(b"\nendstream\nendobj\n");
        }

        fn finish(mut self, trailer_extra: &str) -> Vec<u8> {
            let max = self.objects.iter().map(|(n, _)| *n).max().unwrap_or(0);
            let xref_offset = self.buf.len();

            self.buf
                .extend_from_slice(format!("xref\n0 {}\n", max + 1).as_bytes());
            self.buf.extend_from_slice(b"0000000000 65535 f \n");
            for num in 1..=max {
                match self.objects.iter().find(|(n, _)| *n == num) {
                    Some((_, offset)) => self
                        .buf
                        .extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes()),
                    None => self.buf.extend_from_slice(b"0000000000 65535 f \n"),
                }
            }
            self.buf.extend_from_slice(
                format!(
                    "trailer\n<< /Size {} {trailer_extra} >>\nstartxref\n{xref_offset}\n%%EOF\n",
                    max + 1
                )
                .as_bytes(),
            );

            self.buf
        }
    }

    fn hex_string(bytes: &[u8]) -> String {
        let digits: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
        format!("<{digits}>")
    }

    fn hello_document() -> Document {
        let mut b = FileBuilder::new();
        b.object(
            1,
            "<< /Type /Catalog /Pages 2 0 R /Outlines 6 0 R /Lang (en-US) /Metadata 11 0 R >>",
        );
        b.object(2, "<< /Type /Pages /Kids [ 3 0 R ] /Count 1 >>");
        b.object(
            3,
            "<< /Type /Page /Parent 2 0 R /Contents 4 0 R \
             /Resources << /XObject << /Im0 9 0 R >> >> >>",
        );
        b.stream_object(4, "", b"BT /F1 24 Tf 72 720 Td (Hello) Tj ET");
        b.object(
            5,
            "<< /Title (Hello) /Author (Jane) /CreationDate (D:20200102150405+0100) \
             /Producer (vellum test) /Keywords (pdf, parsing) /Trapped /True \
             /CustomTag (kept) >>",
        );
        b.object(6, "<< /Type /Outlines /First 7 0 R /Last 8 0 R >>");
        b.object(
            7,
            "<< /Title (A) /Next 8 0 R /First 10 0 R /Last 10 0 R >>",
        );
        b.object(8, "<< /Title (B) >>");
        b.stream_object(
            9,
            "/Type /XObject /Subtype /Image /Width 2 /Height 2 /Filter /DCTDecode",
            b"not actually jpeg data",
        );
        b.object(10, "<< /Title (A.1) >>");
        b.stream_object(11, "/Type /Metadata /Subtype /XML", b"<x:xmpmeta/>");

        Document::new(b.finish("/Root 1 0 R /Info 5 0 R")).unwrap()
    }

    #[test]
    fn document_is_sync() {
        fn assert_sync<T: Sync>() {}
        assert_sync::<Document>();
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            Document::new(b"junk".to_vec()),
            Err(Error::BadPreamble)
        ));
        assert!(Document::new(b"%PDF-1.4\nno structure".to_vec()).is_err());
    }

    #[test]
    fn hello_queries() {
        let doc = hello_document();

        assert_eq!(doc.version(), "1.4");
        assert_eq!(doc.lang(), "en-US");
        assert_eq!(doc.page_count(), 1);

        let info = doc.info();
        assert_eq!(info.title, "Hello");
        assert_eq!(info.author, "Jane");
        assert_eq!(info.producer, "vellum test");
        assert_eq!(info.keywords, vec!["pdf".to_string(), "parsing".to_string()]);
        assert!(info.trapped);
        let created = info.created.unwrap();
        assert_eq!(
            (created.year, created.month, created.day, created.hour),
            (2020, 1, 2, 15)
        );
        assert_eq!(
            info.fields.get("customtag"),
            Some(&Value::Literal(b"kept".to_vec()))
        );
        assert!(!info.fields.contains_key("title"));

        let page = doc.get_page(1).unwrap();
        assert!(page.starts_with(b"BT"));
        assert!(String::from_utf8_lossy(&page).contains("(Hello) Tj"));

        assert_eq!(doc.metadata().as_deref(), Some(b"<x:xmpmeta/>".as_ref()));
    }

    #[test]
    fn directory_round_trip() {
        let doc = hello_document();

        for pointer in doc.directory() {
            if pointer.is_free() || pointer.is_embedded() {
                continue;
            }

            let object = doc.get(pointer.oid).unwrap();
            assert_eq!(object.oid, pointer.oid);

            // Resolution is idempotent.
            assert_eq!(doc.get(pointer.oid).unwrap(), object);
        }
    }

    #[test]
    fn page_range_errors() {
        let doc = hello_document();

        assert!(matches!(doc.get_page(0), Err(Error::NotFound)));
        assert!(matches!(doc.get_page(2), Err(Error::NotFound)));
    }

    #[test]
    fn outline_tree() {
        let doc = hello_document();

        assert_eq!(
            doc.outlines(),
            vec![
                Outline {
                    title: "A".into(),
                    children: vec![Outline {
                        title: "A.1".into(),
                        children: Vec::new(),
                    }],
                },
                Outline {
                    title: "B".into(),
                    children: Vec::new(),
                },
            ]
        );
    }

    #[test]
    fn image_lookup() {
        let doc = hello_document();

        // The XObject resolves (case-insensitively) but its payload is not
        // actual JPEG data.
        assert!(matches!(doc.get_image("Im0"), Err(Error::StreamTruncated)));
        assert!(matches!(doc.get_image("im0"), Err(Error::StreamTruncated)));
        assert!(matches!(doc.get_image("Nope"), Err(Error::NotFound)));
    }

    #[test]
    fn image_with_unsupported_filter() {
        let mut b = FileBuilder::new();
        b.object(1, "<< /Type /Catalog /Pages 2 0 R >>");
        b.object(2, "<< /Type /Pages /Kids [ 3 0 R ] /Count 1 >>");
        b.object(
            3,
            "<< /Type /Page /Contents 4 0 R /Resources << /XObject << /Pic 5 0 R >> >> >>",
        );
        b.stream_object(4, "", b"BT ET");
        b.stream_object(
            5,
            "/Type /XObject /Subtype /Image /Width 1 /Height 1 /Filter /CCITTFaxDecode",
            b"\x00",
        );
        let doc = Document::new(b.finish("/Root 1 0 R")).unwrap();

        match doc.get_image("Pic") {
            Err(Error::UnknownFilter(name)) => assert_eq!(name, "CCITTFaxDecode"),
            other => panic!("expected UnknownFilter, got {other:?}"),
        }
    }

    #[test]
    fn version_from_catalog() {
        let mut b = FileBuilder::new();
        b.object(1, "<< /Type /Catalog /Pages 2 0 R /Version /1.6 >>");
        b.object(2, "<< /Type /Pages /Kids [] /Count 0 >>");
        let doc = Document::new(b.finish("/Root 1 0 R")).unwrap();

        assert_eq!(doc.version(), "1.6");
    }

    #[test]
    fn walk_visits_live_objects() {
        let doc = hello_document();

        let mut count = 0;
        doc.walk(|_| {
            count += 1;
            true
        });
        assert_eq!(count, 11);

        let mut stopped = 0;
        doc.walk(|_| {
            stopped += 1;
            stopped < 3
        });
        assert_eq!(stopped, 3);
    }

    #[test]
    fn signature_records() {
        let mut b = FileBuilder::new();
        b.object(1, "<< /Type /Catalog /Pages 2 0 R >>");
        b.object(2, "<< /Type /Pages /Kids [] /Count 0 >>");
        b.object(
            3,
            "<< /Type /Sig /Name (Alice) /Reason (Approval) /M (D:20200102150405+0100) >>",
        );
        let doc = Document::new(b.finish("/Root 1 0 R")).unwrap();

        let signatures = doc.signatures();
        assert_eq!(signatures.len(), 1);
        assert_eq!(signatures[0].name, "Alice");
        assert_eq!(signatures[0].reason, "Approval");
        assert_eq!(signatures[0].when.unwrap().year, 2020);
    }

    #[test]
    fn multi_level_page_tree() {
        let mut b = FileBuilder::new();
        b.object(1, "<< /Type /Catalog /Pages 2 0 R >>");
        b.object(2, "<< /Type /Pages /Kids [ 3 0 R 4 0 R ] /Count 3 >>");
        b.object(3, "<< /Type /Pages /Kids [ 5 0 R 6 0 R ] /Count 2 >>");
        b.object(4, "<< /Type /Page /Contents 9 0 R >>");
        b.object(5, "<< /Type /Page /Contents 7 0 R >>");
        b.object(6, "<< /Type /Page /Contents 8 0 R >>");
        b.stream_object(7, "", b"P1");
        b.stream_object(8, "", b"P2");
        b.stream_object(9, "", b"P3");
        let doc = Document::new(b.finish("/Root 1 0 R")).unwrap();

        assert_eq!(doc.page_count(), 3);
        assert_eq!(doc.get_page(1).unwrap(), b"P1");
        assert_eq!(doc.get_page(2).unwrap(), b"P2");
        assert_eq!(doc.get_page(3).unwrap(), b"P3");
        assert!(doc.get_page(4).is_err());
    }

    #[test]
    fn utf16_strings_decode() {
        let mut b = FileBuilder::new();
        b.object(1, "<< /Type /Catalog /Pages 2 0 R >>");
        b.object(2, "<< /Type /Pages /Kids [] /Count 0 >>");
        b.object(3, "<< /Title <FEFF00480069> >>");
        let doc = Document::new(b.finish("/Root 1 0 R /Info 3 0 R")).unwrap();

        assert_eq!(doc.info().title, "Hi");
    }

    /// Builds a file whose page and a couple of plain objects live inside
    /// an object stream, addressed through a cross-reference stream with a
    /// row predictor.
    fn objstm_document() -> Document {
        let mut buf = b"%PDF-1.5\n".to_vec();
        let mut offsets: Vec<(u32, usize)> = Vec::new();

        let push_object =
            |buf: &mut Vec<u8>, offsets: &mut Vec<(u32, usize)>, num: u32, body: &str| {
                offsets.push((num, buf.len()));
                buf.extend_from_slice(format!("{num} 0 obj\n{body}\nendobj\n").as_bytes());
            };

        push_object(&mut buf, &mut offsets, 1, "<< /Type /Catalog /Pages 2 0 R >>");
        push_object(
            &mut buf,
            &mut offsets,
            2,
            "<< /Type /Pages /Kids [ 6 0 R ] /Count 1 >>",
        );

        // Content stream for the packed page.
        offsets.push((3, buf.len()));
        let content = b"BT (packed page) Tj ET";
        buf.extend_from_slice(
            format!("3 0 obj\n<< /Length {} >>\nstream\n", content.len()).as_bytes(),
        );
        buf.extend_from_slice(content);
        buf.extend_from_slice(b"\nendstream\nendobj\n");

        // The object stream packs the page (6) and a plain integer (7).
        let packed = b"6 0 7 44 << /Type /Page /Contents 3 0 R /Rotate 0 >> 99";
        let first = 9; // length of the `6 0 7 44 ` prefix table
        offsets.push((4, buf.len()));
        buf.extend_from_slice(
            format!(
                "4 0 obj\n<< /Type /ObjStm /N 2 /First {first} /Length {} >>\nstream\n",
                packed.len()
            )
            .as_bytes(),
        );
        buf.extend_from_slice(packed);
        buf.extend_from_slice(b"\nendstream\nendobj\n");

        // Cross-reference stream: W = [1 4 2], predictor 12 over 7 columns.
        let xref_offset = buf.len();
        let mut rows: Vec<[u8; 7]> = Vec::new();
        let mut record = |kind: u8, f1: u64, f2: u64| {
            let mut row = [0u8; 7];
            row[0] = kind;
            row[1..5].copy_from_slice(&(f1 as u32).to_be_bytes());
            row[5..7].copy_from_slice(&(f2 as u16).to_be_bytes());
            rows.push(row);
        };
        record(0, 0, 0xffff); // 0: free head
        for (num, offset) in &offsets {
            let _ = num;
            record(1, *offset as u64, 0);
        }
        record(1, xref_offset as u64, 0); // 5: this stream
        record(2, 4, 0); // 6: packed page
        record(2, 4, 1); // 7: packed integer

        // Predictor-12 encode: each row stores the difference to the row
        // above, led by the filter-type byte.
        let mut encoded = Vec::new();
        let mut previous = [0u8; 7];
        for row in &rows {
            encoded.push(2u8);
            for (new, old) in row.iter().zip(previous) {
                encoded.push(new.wrapping_sub(old));
            }
            previous = *row;
        }

        buf.extend_from_slice(
            format!(
                "5 0 obj\n<< /Type /XRef /Size 8 /W [ 1 4 2 ] /Root 1 0 R \
                 /DecodeParms << /Predictor 12 /Columns 7 >> /Length {} >>\nstream\n",
                encoded.len()
            )
            .as_bytes(),
        );
        buf.extend_from_slice(&encoded);
        buf.extend_from_slice(b"\nendstream\nendobj\n");
        buf.extend_from_slice(format!("startxref\n{xref_offset}\n%%EOF\n").as_bytes());

        Document::new(buf).unwrap()
    }

    #[test]
    fn object_streams_resolve() {
        let doc = objstm_document();

        let packed = doc
            .directory()
            .iter()
            .find(|p| p.oid == Oid::new(6, 0))
            .unwrap();
        assert!(matches!(
            packed.kind,
            PointerKind::InStream { owner, index: 0 } if owner == Oid::new(4, 0)
        ));

        let page = doc.get(Oid::new(6, 0)).unwrap();
        assert!(page.is_page());
        assert_eq!(page.dict.get_ref(b"contents"), Some(Oid::new(3, 0)));

        let number = doc.get(Oid::new(7, 0)).unwrap();
        assert_eq!(number.data, Some(Value::Integer(99)));

        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.get_page(1).unwrap(), b"BT (packed page) Tj ET");
    }

    /// Builds a linearized-layout file: the linearization parameter object
    /// sits right after the preamble, followed by the cross-reference
    /// stream, followed by the body objects.
    fn linearized_document() -> Document {
        let mut buf = b"%PDF-1.5\n".to_vec();
        buf.extend_from_slice(b"99 0 obj\n<< /Linearized 1 /L 9999 >>\nendobj\n");

        let bodies = [
            (1u32, "<< /Type /Catalog /Pages 2 0 R >>".to_string()),
            (2, "<< /Type /Pages /Kids [ 3 0 R ] /Count 1 >>".to_string()),
            (
                3,
                "<< /Type /Page /Contents 4 0 R >>".to_string(),
            ),
        ];
        let content = b"BT (linear) Tj ET";

        // The xref stream comes before the body objects, so lay it out
        // first with a fixed-size binary record area.
        let record_len = 4 * 7;
        let stream_head = format!(
            "5 0 obj\n<< /Type /XRef /Size 6 /Index [ 1 4 ] /W [ 1 4 2 ] /Root 1 0 R \
             /Length {record_len} >>\nstream\n"
        );
        let stream_tail = b"\nendstream\nendobj\n";

        let mut offset = buf.len() + stream_head.len() + record_len + stream_tail.len();
        let mut records = Vec::new();
        let mut body_bytes = Vec::new();
        for (num, body) in &bodies {
            records.push((1u8, offset as u64, 0u64));
            let text = format!("{num} 0 obj\n{body}\nendobj\n");
            offset += text.len();
            body_bytes.extend_from_slice(text.as_bytes());
        }
        records.push((1, offset as u64, 0));
        let content_text = {
            let mut t = format!("4 0 obj\n<< /Length {} >>\nstream\n", content.len()).into_bytes();
            t.extend_from_slice(content);
            t.extend_from_slice(b"\nendstream\nendobj\n");
            t
        };
        body_bytes.extend_from_slice(&content_text);

        buf.extend_from_slice(stream_head.as_bytes());
        for (kind, f1, f2) in records {
            buf.push(kind);
            buf.extend_from_slice(&(f1 as u32).to_be_bytes());
            buf.extend_from_slice(&(f2 as u16).to_be_bytes());
        }
        buf.extend_from_slice(stream_tail);
        buf.extend_from_slice(&body_bytes);

        Document::new(buf).unwrap()
    }

    #[test]
    fn linearized_layout() {
        let doc = linearized_document();

        assert_eq!(doc.version(), "1.5");
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.get_page(1).unwrap(), b"BT (linear) Tj ET");

        let mut pages = 0;
        doc.walk(|object| {
            if object.is_page() {
                pages += 1;
            }
            true
        });
        assert_eq!(pages, 1);
    }

    /// Builds an RC4-128 encrypted document whose `U` entry is derived with
    /// the crate's own key schedule, then opens it again.
    fn encrypted_file(permissions: i64, tampered_user: bool) -> Vec<u8> {
        let owner: Vec<u8> = (0x40..0x60).collect();

        // Pick a file identifier whose derived values contain no UTF-16
        // byte order marks, which string parsing would decode.
        let mut chosen = None;
        for seed in 0..64u8 {
            let mut id = vec![
                0x10, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd,
                0xee, 0xff, 0x00,
            ];
            id[15] = seed;

            let key = crypto::document_key(&owner, 0xffff_ffd4, 128, &id);
            let user = {
                let mut input = crypto::PASSWORD_PADDING.to_vec();
                input.extend_from_slice(&id);
                let mut check = crypto::decrypt(&key, &crate::crypto::md5::digest(&input));
                for round in 1..=19u8 {
                    let round_key: Vec<u8> = key.iter().map(|b| b ^ round).collect();
                    check = crypto::decrypt(&round_key, &check);
                }
                check.resize(32, 0);
                check
            };
            let title = crypto::decrypt(
                &crypto::object_key(&key, Oid::new(5, 0)),
                b"Confidential",
            );
            let content = crypto::decrypt(
                &crypto::object_key(&key, Oid::new(4, 0)),
                b"BT (Secret) Tj ET",
            );

            let has_bom = |b: &[u8]| {
                b.starts_with(&[0xfe, 0xff]) || b.starts_with(&[0xff, 0xfe])
            };
            if !has_bom(&user) && !has_bom(&title) && !has_bom(&content) && !has_bom(&id) {
                chosen = Some((id, key, user, title, content));
                break;
            }
        }
        let (id, _key, mut user, title, content) =
            chosen.expect("no BOM-free fixture seed found");

        if tampered_user {
            user[0] ^= 0xff;
        }

        let mut b = FileBuilder::new();
        b.object(1, "<< /Type /Catalog /Pages 2 0 R >>");
        b.object(2, "<< /Type /Pages /Kids [ 3 0 R ] /Count 1 >>");
        b.object(3, "<< /Type /Page /Contents 4 0 R >>");
        b.stream_object(4, "", &content);
        b.object(5, &format!("<< /Title {} >>", hex_string(&title)));
        b.object(
            6,
            &format!(
                "<< /Filter /Standard /V 2 /R 3 /Length 128 /P {permissions} /O {} /U {} >>",
                hex_string(&owner),
                hex_string(&user)
            ),
        );

        b.finish(&format!(
            "/Root 1 0 R /Info 5 0 R /Encrypt 6 0 R /ID [ {} {} ]",
            hex_string(&id),
            hex_string(&id)
        ))
    }

    #[test]
    fn encrypted_round_trip() {
        let doc = Document::new(encrypted_file(-44, false)).unwrap();

        assert_eq!(doc.info().title, "Confidential");
        assert_eq!(doc.get_page(1).unwrap(), b"BT (Secret) Tj ET");
    }

    #[test]
    fn encrypted_rejects_tampering() {
        // A flipped permissions value invalidates the derived key.
        assert!(matches!(
            Document::new(encrypted_file(-45, false)),
            Err(Error::InvalidPassword)
        ));
        // As does a tampered U entry.
        assert!(matches!(
            Document::new(encrypted_file(-44, true)),
            Err(Error::InvalidPassword)
        ));
    }
}
