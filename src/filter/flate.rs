//! Flate decompression and the row predictor.

use crate::object::Dict;
use crate::object::dict::keys;
use itertools::izip;
use log::warn;

/// Inflate a Flate-compressed payload.
///
/// Streams are usually zlib-wrapped, but some generators emit bare deflate
/// data, so that is tried second.
pub(crate) fn inflate(data: &[u8]) -> Option<Vec<u8>> {
    zlib(data).or_else(|| deflate(data))
}

fn zlib(data: &[u8]) -> Option<Vec<u8>> {
    miniz_oxide::inflate::decompress_to_vec_zlib(data).ok()
}

fn deflate(data: &[u8]) -> Option<Vec<u8>> {
    miniz_oxide::inflate::decompress_to_vec(data).ok()
}

/// Undo row-wise differencing over `/Columns` bytes.
///
/// The input is a sequence of `columns + 1` byte rows, each led by a
/// filter-type byte that this predictor level ignores. Every output byte is
/// the running column sum of the input bytes, modulo 256.
pub(crate) fn apply_predictor(data: Vec<u8>, params: &Dict) -> Option<Vec<u8>> {
    let columns = usize::try_from(params.get_int(keys::COLUMNS)).ok()?;
    if columns == 0 {
        return Some(data);
    }

    let row_len = columns + 1;
    if data.len() % row_len != 0 {
        warn!("predictor input is not a whole number of {row_len}-byte rows");

        return None;
    }

    let mut row = vec![0u8; columns];
    let mut out = Vec::with_capacity(data.len() / row_len * columns);

    for chunk in data.chunks_exact(row_len) {
        for (acc, byte) in izip!(row.iter_mut(), &chunk[1..]) {
            *acc = acc.wrapping_add(*byte);
        }
        out.extend_from_slice(&row);
    }

    Some(out)
}
