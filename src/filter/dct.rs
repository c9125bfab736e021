//! JPEG (`DCTDecode`) streams.

use zune_jpeg::JpegDecoder;

/// Decode a JPEG payload, returning its dimensions and raw pixel data.
pub(crate) fn decode(data: &[u8]) -> Option<(u32, u32, Vec<u8>)> {
    let mut decoder = JpegDecoder::new(data);
    decoder.decode_headers().ok()?;
    let (width, height) = decoder.dimensions()?;
    let pixels = decoder.decode().ok()?;

    Some((width as u32, height as u32, pixels))
}
