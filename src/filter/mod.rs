//! Stream filters.

use crate::error::Error;
use crate::object::dict::{keys, names};
use crate::object::{Dict, Value};
use log::warn;

pub(crate) mod dct;
pub(crate) mod flate;

/// Apply the filter chain declared by a stream dictionary to its (already
/// decrypted) payload, followed by the row predictor from `/DecodeParms`.
///
/// Filters the crate does not implement are logged and the bytes are passed
/// through unchanged.
pub(crate) fn decode(data: &[u8], dict: &Dict) -> Result<Vec<u8>, Error> {
    let mut current = data.to_vec();

    for name in filter_names(dict) {
        if name == names::FLATE_DECODE {
            current = flate::inflate(&current).ok_or(Error::StreamTruncated)?;
        } else {
            warn!(
                "unsupported stream filter {}, passing raw bytes through",
                String::from_utf8_lossy(name)
            );
            break;
        }
    }

    if let Some(parms) = decode_parms(dict) {
        if parms.get_int(keys::PREDICTOR) > 1 {
            current = flate::apply_predictor(current, parms).ok_or(Error::StreamTruncated)?;
        }
    }

    Ok(current)
}

fn filter_names(dict: &Dict) -> Vec<&[u8]> {
    match dict.get(keys::FILTER) {
        Some(Value::Name(name)) => vec![name.as_ref()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_name().map(|n| n.as_ref()))
            .collect(),
        _ => Vec::new(),
    }
}

fn decode_parms(dict: &Dict) -> Option<&Dict> {
    match dict.get(keys::DECODE_PARMS)? {
        Value::Dict(parms) => Some(parms),
        Value::Array(items) => items.iter().find_map(Value::as_dict),
        _ => None,
    }
}
