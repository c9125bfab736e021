//! Building and querying the cross-reference directory.

use crate::error::Error;
use crate::object::dict::keys;
use crate::object::{self, Dict, Object, Oid, Value, number};
use crate::reader::Reader;
use log::warn;
use rustc_hash::FxHashSet;

/// The fixed size of one record in a classic xref table.
pub(crate) const XREF_ENTRY_LEN: usize = 20;

/// Initial size of the window searched for the trailer keywords at the file
/// tail. Doubled until the keywords are found or the window spans the file.
const MIN_TAIL_WINDOW: usize = 1024;

/// An entry of the object directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pointer {
    /// The object identifier of the entry.
    pub oid: Oid,
    /// Where the object lives.
    pub kind: PointerKind,
}

/// The location of the object a [`Pointer`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    /// The object has been deleted. Lookups treat the entry as absent, and
    /// it masks live entries of earlier revisions.
    Free,
    /// The object body lives at a byte offset in the file.
    InUse {
        /// Byte offset of the `N G obj` header.
        offset: u64,
    },
    /// The object is packed inside an object stream.
    InStream {
        /// The object stream that owns the entry.
        owner: Oid,
        /// The index within the stream's prefix table.
        index: u32,
    },
}

impl Pointer {
    /// Returns `true` when the entry lives inside an object stream.
    pub fn is_embedded(&self) -> bool {
        matches!(self.kind, PointerKind::InStream { .. })
    }

    /// Returns `true` for free (deleted) entries.
    pub fn is_free(&self) -> bool {
        matches!(self.kind, PointerKind::Free)
    }
}

/// Binary-search a sorted directory for an exact object identifier.
pub(crate) fn find(directory: &[Pointer], oid: Oid) -> Option<&Pointer> {
    let idx = directory
        .binary_search_by(|p| p.oid.num.cmp(&oid.num))
        .ok()?;
    let pointer = &directory[idx];

    (pointer.oid == oid).then_some(pointer)
}

/// Trailer-derived document fields.
///
/// While following `/Prev` chains, each field keeps the value of the newest
/// revision that defines it.
#[derive(Debug, Default, Clone)]
pub(crate) struct TrailerFields {
    pub(crate) root: Option<Oid>,
    pub(crate) info: Option<Oid>,
    pub(crate) encrypt: Option<Oid>,
    pub(crate) file_id: Vec<Vec<u8>>,
}

impl TrailerFields {
    fn absorb(&mut self, dict: &Dict) {
        if self.root.is_none() {
            self.root = dict.get_ref(keys::ROOT);
        }
        if self.info.is_none() {
            self.info = dict.get_ref(keys::INFO);
        }
        if self.encrypt.is_none() {
            self.encrypt = dict.get_ref(keys::ENCRYPT);
        }
        if self.file_id.is_empty() {
            self.file_id = dict
                .get_array(keys::ID)
                .iter()
                .filter_map(|v| v.as_bytes().map(<[u8]>::to_vec))
                .collect();
        }
    }
}

/// The result of walking all xref sections of a file.
pub(crate) struct XRefBuild {
    pub(crate) directory: Vec<Pointer>,
    pub(crate) trailer: TrailerFields,
}

/// Build the directory of a classic file: locate the trailer at the file
/// tail, then follow the declared xref offset and its `/Prev` chain.
pub(crate) fn build_classic(data: &[u8]) -> Result<XRefBuild, Error> {
    let (tail_dict, xref_offset) = locate_tail(data)?;

    let mut builder = Builder::new(data);
    if let Some(dict) = &tail_dict {
        builder.trailer.absorb(dict);
    }
    builder.load_section(xref_offset)?;

    Ok(builder.finish())
}

/// Build the directory starting from an xref section at a known offset, the
/// entry path for linearized files (and for classic tails that only carry
/// `startxref`).
pub(crate) fn build_linearized(data: &[u8], offset: usize) -> Result<XRefBuild, Error> {
    let mut builder = Builder::new(data);
    builder.load_section(offset)?;

    Ok(builder.finish())
}

/// Find the last trailer in the file tail. Returns its dictionary (when one
/// exists) and the xref offset declared after `startxref`.
fn locate_tail(data: &[u8]) -> Result<(Option<Dict>, usize), Error> {
    let len = data.len();
    if len == 0 {
        return Err(Error::TrailerMissing);
    }

    let mut window = MIN_TAIL_WINDOW.min(len);

    loop {
        let tail_start = len - window;
        let tail = Reader::new(&data[tail_start..]);

        if let Some(pos) = tail.rindex(b"trailer") {
            let mut r = Reader::new_at(data, tail_start + pos + b"trailer".len());
            let dict = match object::parse_value(&mut r, None) {
                Ok(Value::Dict(dict)) => dict,
                _ => return Err(Error::TrailerMissing),
            };

            r.skip_white_spaces_and_comments();
            r.forward_tag(b"startxref").ok_or(Error::StartxrefMissing)?;
            let offset = read_startxref(&mut r)?;

            return Ok((Some(dict), offset));
        }

        if let Some(pos) = tail.rindex(b"startxref") {
            let mut r = Reader::new_at(data, tail_start + pos + b"startxref".len());
            let offset = read_startxref(&mut r)?;

            return Ok((None, offset));
        }

        if window == len {
            return Err(Error::TrailerMissing);
        }
        window = (window * 2).min(len);
    }
}

/// Read the decimal offset on the line after `startxref` and require the
/// `%%EOF` marker behind it.
fn read_startxref(r: &mut Reader<'_>) -> Result<usize, Error> {
    let line = r.read_line().ok_or(Error::StartxrefMissing)?;
    let offset = std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or(Error::StartxrefMissing)?;

    r.skip_white_spaces();
    if !r.starts_with(b"%%EOF") {
        return Err(Error::StartxrefMissing);
    }

    Ok(offset)
}

struct Builder<'a> {
    data: &'a [u8],
    directory: Vec<Pointer>,
    seen: FxHashSet<u32>,
    visited_offsets: FxHashSet<usize>,
    trailer: TrailerFields,
}

impl<'a> Builder<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            directory: Vec::new(),
            seen: FxHashSet::default(),
            visited_offsets: FxHashSet::default(),
            trailer: TrailerFields::default(),
        }
    }

    /// Record an entry. Sections are walked newest-first, so the first
    /// entry for an object number wins; later revisions never resurrect an
    /// object a newer revision freed or replaced.
    fn insert(&mut self, pointer: Pointer) {
        if self.seen.insert(pointer.oid.num) {
            self.directory.push(pointer);
        }
    }

    fn finish(mut self) -> XRefBuild {
        self.directory.sort_unstable_by_key(|p| p.oid);

        XRefBuild {
            directory: self.directory,
            trailer: self.trailer,
        }
    }

    /// Load the xref section at `offset`: either a classic `xref` table or
    /// a cross-reference stream object.
    fn load_section(&mut self, offset: usize) -> Result<(), Error> {
        if !self.visited_offsets.insert(offset) {
            warn!("cyclic /Prev chain at offset {offset}");

            return Ok(());
        }
        if offset >= self.data.len() {
            return Err(Error::XrefMalformed);
        }

        let mut r = Reader::new_at(self.data, offset);
        r.skip_white_spaces_and_comments();

        if r.starts_with(b"xref") {
            self.load_table(r)
        } else {
            self.load_stream(r)
        }
    }

    fn load_table(&mut self, mut r: Reader<'a>) -> Result<(), Error> {
        r.forward_tag(b"xref").ok_or(Error::XrefMalformed)?;

        // Collect the records first: in hybrid files the entries of the
        // `/XRefStm` stream outrank this table's records and must land in
        // the directory before them.
        let mut records = Vec::new();

        loop {
            r.skip_white_spaces();
            if r.starts_with(b"trailer") {
                break;
            }

            let first = number::parse_unsigned(&mut r).ok_or(Error::XrefMalformed)?;
            r.skip_white_spaces();
            let count = number::parse_unsigned(&mut r).ok_or(Error::XrefMalformed)?;
            r.skip_white_spaces();

            for i in 0..count {
                let bytes = r.read_bytes(XREF_ENTRY_LEN).ok_or(Error::XrefMalformed)?;
                let num =
                    u32::try_from(first + i).map_err(|_| Error::XrefMalformed)?;
                records.push(parse_table_entry(num, bytes).ok_or(Error::XrefMalformed)?);
            }
        }

        r.forward_tag(b"trailer").ok_or(Error::TrailerMissing)?;
        let dict = match object::parse_value(&mut r, None) {
            Ok(Value::Dict(dict)) => dict,
            _ => return Err(Error::TrailerMissing),
        };

        self.trailer.absorb(&dict);

        let xref_stm = dict.get_int(keys::XREF_STM);
        if xref_stm > 0 {
            self.load_section(xref_stm as usize)?;
        }

        for record in records {
            self.insert(record);
        }

        let prev = dict.get_int(keys::PREV);
        if prev > 0 {
            self.load_section(prev as usize)?;
        }

        Ok(())
    }

    fn load_stream(&mut self, mut r: Reader<'a>) -> Result<(), Error> {
        let object = object::read_object(&mut r, None, true, &|_| None)
            .map_err(|_| Error::XrefMalformed)?;

        self.stream_records(&object)?;
        self.trailer.absorb(&object.dict);

        let prev = object.dict.get_int(keys::PREV);
        if prev > 0 {
            self.load_section(prev as usize)?;
        }

        Ok(())
    }

    /// Walk the fixed-width records of a cross-reference stream. `/W` gives
    /// the widths of the three big-endian fields, `/Index` the `(first,
    /// count)` subsections (defaulting to `[0 /Size]`).
    fn stream_records(&mut self, object: &Object) -> Result<(), Error> {
        let widths = object.dict.get_int_array(keys::W);
        if widths.len() != 3 {
            return Err(Error::XrefMalformed);
        }
        let mut w = [0usize; 3];
        for (target, value) in w.iter_mut().zip(&widths) {
            *target = usize::try_from(*value)
                .ok()
                .filter(|v| *v <= 8)
                .ok_or(Error::XrefMalformed)?;
        }

        let size = object.dict.get_int(keys::SIZE).max(0) as u64;
        let index = object.dict.get_int_array(keys::INDEX);
        let sections: Vec<(u64, u64)> = if index.len() >= 2 {
            index
                .chunks_exact(2)
                .map(|c| (c[0].max(0) as u64, c[1].max(0) as u64))
                .collect()
        } else {
            vec![(0, size)]
        };

        let body = object.body().map_err(|_| Error::XrefMalformed)?;
        let mut r = Reader::new(&body);

        for (first, count) in sections {
            for i in 0..count {
                if r.at_end() {
                    break;
                }

                let kind = if w[0] == 0 {
                    1
                } else {
                    r.read_int_be(w[0]).ok_or(Error::XrefMalformed)?
                };
                let f1 = r.read_int_be(w[1]).ok_or(Error::XrefMalformed)?;
                let f2 = r.read_int_be(w[2]).ok_or(Error::XrefMalformed)?;

                let Ok(num) = u32::try_from(first + i) else {
                    warn!("xref stream object number out of range");
                    continue;
                };

                match kind {
                    0 => {
                        let gen = u16::try_from(f2).unwrap_or(u16::MAX);
                        self.insert(Pointer {
                            oid: Oid::new(num, gen),
                            kind: PointerKind::Free,
                        });
                    }
                    1 => {
                        let Ok(gen) = u16::try_from(f2) else {
                            warn!("generation of object {num} out of range");
                            continue;
                        };
                        self.insert(Pointer {
                            oid: Oid::new(num, gen),
                            kind: PointerKind::InUse { offset: f1 },
                        });
                    }
                    2 => {
                        let Ok(owner) = u32::try_from(f1) else {
                            warn!("object stream number of object {num} out of range");
                            continue;
                        };
                        let Ok(idx) = u32::try_from(f2) else {
                            warn!("object stream index of object {num} out of range");
                            continue;
                        };
                        self.insert(Pointer {
                            oid: Oid::new(num, 0),
                            kind: PointerKind::InStream { owner: Oid::new(owner, 0), index: idx },
                        });
                    }
                    other => {
                        warn!("unknown xref record type {other}");
                    }
                }
            }
        }

        Ok(())
    }
}

/// Decode one fixed 20-byte table record: a 10-digit offset, a 5-digit
/// generation and the `n`/`f` flag.
fn parse_table_entry(num: u32, bytes: &[u8]) -> Option<Pointer> {
    let offset = parse_decimal(bytes.get(0..10)?)?;
    let gen = u16::try_from(parse_decimal(bytes.get(11..16)?)?).ok()?;

    let kind = match bytes.get(17)? {
        b'n' => PointerKind::InUse { offset },
        b'f' => PointerKind::Free,
        _ => return None,
    };

    Some(Pointer {
        oid: Oid::new(num, gen),
        kind,
    })
}

fn parse_decimal(bytes: &[u8]) -> Option<u64> {
    let mut value = 0u64;
    for b in bytes {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value * 10 + u64::from(b - b'0');
    }

    Some(value)
}

#[cfg(test)]
mod tests {
    use super::{Pointer, PointerKind, build_classic, build_linearized, find, parse_table_entry};
    use crate::object::Oid;

    #[test]
    fn table_entry() {
        let entry = parse_table_entry(7, b"0000000017 00003 n \n").unwrap();

        assert_eq!(entry.oid, Oid::new(7, 3));
        assert_eq!(entry.kind, PointerKind::InUse { offset: 17 });

        let free = parse_table_entry(0, b"0000000000 65535 f \n").unwrap();
        assert!(free.is_free());

        assert!(parse_table_entry(1, b"000000001x 00000 n \n").is_none());
        assert!(parse_table_entry(1, b"0000000010 00000 q \n").is_none());
    }

    #[test]
    fn classic_single_section() {
        let mut buf = Vec::new();
        let xref_offset = buf.len();
        buf.extend_from_slice(b"xref\n0 3\n");
        buf.extend_from_slice(b"0000000000 65535 f \n");
        buf.extend_from_slice(b"0000000017 00000 n \n");
        buf.extend_from_slice(b"0000000081 00000 n \n");
        buf.extend_from_slice(b"trailer\n<< /Size 3 /Root 1 0 R /Info 2 0 R >>\n");
        buf.extend_from_slice(format!("startxref\n{xref_offset}\n%%EOF\n").as_bytes());

        let build = build_classic(&buf).unwrap();

        assert_eq!(build.trailer.root, Some(Oid::new(1, 0)));
        assert_eq!(build.trailer.info, Some(Oid::new(2, 0)));
        assert_eq!(build.trailer.encrypt, None);

        assert_eq!(
            find(&build.directory, Oid::new(1, 0)),
            Some(&Pointer {
                oid: Oid::new(1, 0),
                kind: PointerKind::InUse { offset: 17 },
            })
        );
        assert_eq!(
            find(&build.directory, Oid::new(2, 0)).map(|p| p.kind),
            Some(PointerKind::InUse { offset: 81 })
        );
        assert_eq!(find(&build.directory, Oid::new(9, 0)), None);
        // The free head entry is recorded but does not resolve.
        assert!(find(&build.directory, Oid::new(0, 65535)).unwrap().is_free());
    }

    #[test]
    fn classic_multiple_subsections() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"xref\n0 1\n0000000000 65535 f \n");
        buf.extend_from_slice(b"4 2\n0000000100 00000 n \n0000000200 00001 n \n");
        buf.extend_from_slice(b"trailer\n<< /Size 6 /Root 4 0 R >>\nstartxref\n0\n%%EOF");

        let build = build_classic(&buf).unwrap();

        assert_eq!(
            find(&build.directory, Oid::new(5, 1)).map(|p| p.kind),
            Some(PointerKind::InUse { offset: 200 })
        );
    }

    #[test]
    fn incremental_update_newest_wins() {
        let mut buf = Vec::new();

        // Older revision: objects 1 and 2 in use.
        let old_offset = buf.len();
        buf.extend_from_slice(b"xref\n0 3\n");
        buf.extend_from_slice(b"0000000000 65535 f \n");
        buf.extend_from_slice(b"0000000100 00000 n \n");
        buf.extend_from_slice(b"0000000200 00000 n \n");
        buf.extend_from_slice(b"trailer\n<< /Size 3 /Root 1 0 R >>\n");

        // Newer revision: object 1 moved, object 2 deleted.
        let new_offset = buf.len();
        buf.extend_from_slice(b"xref\n1 2\n");
        buf.extend_from_slice(b"0000000300 00000 n \n");
        buf.extend_from_slice(b"0000000000 00001 f \n");
        buf.extend_from_slice(
            format!("trailer\n<< /Size 3 /Root 1 0 R /Prev {old_offset} >>\n").as_bytes(),
        );
        buf.extend_from_slice(format!("startxref\n{new_offset}\n%%EOF\n").as_bytes());

        let build = build_classic(&buf).unwrap();

        assert_eq!(
            find(&build.directory, Oid::new(1, 0)).map(|p| p.kind),
            Some(PointerKind::InUse { offset: 300 })
        );
        // The newer free entry masks the old body of object 2.
        assert_eq!(find(&build.directory, Oid::new(2, 0)), None);
        assert!(
            find(&build.directory, Oid::new(2, 1)).unwrap().is_free()
        );
    }

    #[test]
    fn missing_anchors() {
        assert!(build_classic(b"no pdf structure here").is_err());
        assert!(build_classic(b"trailer\n<< /Size 1 >>\nno anchor").is_err());
        assert!(build_classic(b"trailer\n<< /Size 1 >>\nstartxref\n0\nmissing").is_err());
    }

    #[test]
    fn xref_stream_records() {
        // W = [1 2 1]: one type byte, two offset bytes, one gen/index byte.
        let mut records = Vec::new();
        records.extend_from_slice(&[0, 0x00, 0x00, 0xff]); // free head
        records.extend_from_slice(&[1, 0x00, 0x11, 0x00]); // in use at 0x11
        records.extend_from_slice(&[2, 0x00, 0x05, 0x02]); // packed in stream 5, index 2

        let mut buf = Vec::new();
        buf.extend_from_slice(
            format!(
                "9 0 obj\n<< /Type /XRef /Size 3 /W [1 2 1] /Root 1 0 R /Length {} >>\nstream\n",
                records.len()
            )
            .as_bytes(),
        );
        buf.extend_from_slice(&records);
        buf.extend_from_slice(b"\nendstream\nendobj\n");

        let build = build_linearized(&buf, 0).unwrap();

        assert_eq!(build.trailer.root, Some(Oid::new(1, 0)));
        assert_eq!(
            find(&build.directory, Oid::new(1, 0)).map(|p| p.kind),
            Some(PointerKind::InUse { offset: 0x11 })
        );
        assert_eq!(
            find(&build.directory, Oid::new(2, 0)).map(|p| p.kind),
            Some(PointerKind::InStream {
                owner: Oid::new(5, 0),
                index: 2,
            })
        );
    }

    #[test]
    fn xref_stream_with_index() {
        let mut records = Vec::new();
        records.extend_from_slice(&[1, 0x01, 0x00]); // object 10 at 0x100
        records.extend_from_slice(&[1, 0x02, 0x00]); // object 11 at 0x200

        let mut buf = Vec::new();
        buf.extend_from_slice(
            format!(
                "9 0 obj\n<< /Type /XRef /Size 12 /W [1 2 0] /Index [10 2] /Root 1 0 R /Length {} >>\nstream\n",
                records.len()
            )
            .as_bytes(),
        );
        buf.extend_from_slice(&records);
        buf.extend_from_slice(b"\nendstream\nendobj\n");

        let build = build_linearized(&buf, 0).unwrap();

        assert_eq!(
            find(&build.directory, Oid::new(10, 0)).map(|p| p.kind),
            Some(PointerKind::InUse { offset: 0x100 })
        );
        assert_eq!(
            find(&build.directory, Oid::new(11, 0)).map(|p| p.kind),
            Some(PointerKind::InUse { offset: 0x200 })
        );
        assert_eq!(find(&build.directory, Oid::new(0, 0)), None);
    }
}
