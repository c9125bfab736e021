//! The standard security handler (V2: RC4 with MD5 key derivation).
//!
//! **Important note**: these primitives exist solely to decrypt documents
//! that are already encrypted. They have not been audited and must not be
//! used to protect new data.

use crate::error::Error;
use crate::object::Oid;

pub(crate) mod md5;
pub(crate) mod rc4;

/// The fixed 32-byte pad the standard security handler appends to (or
/// substitutes for) the user password.
pub(crate) const PASSWORD_PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// Derive the document key for the empty user password.
///
/// The MD5 input is the password pad, the owner entry `O`, the low-order
/// bytes of the permission flags `P`, and the first file identifier. The
/// digest is then folded 50 times over its first `length / 8` bytes.
pub(crate) fn document_key(
    owner: &[u8],
    permissions: u32,
    length_bits: u16,
    file_id: &[u8],
) -> Vec<u8> {
    let byte_length = usize::from(length_bits / 8).clamp(5, 16);

    let mut input = Vec::with_capacity(PASSWORD_PADDING.len() + owner.len() + 4 + file_id.len());
    input.extend_from_slice(&PASSWORD_PADDING);
    input.extend_from_slice(owner);
    input.extend_from_slice(&permissions.to_le_bytes());
    input.extend_from_slice(file_id);

    let mut hash = md5::digest(&input);
    for _ in 0..50 {
        hash = md5::digest(&hash[..byte_length]);
    }

    hash[..byte_length].to_vec()
}

/// Check the document key against the encryption dictionary's `U` entry.
///
/// The pad and first file identifier are hashed, then run through RC4
/// twenty times: once with the document key itself and nineteen times with
/// the key XOR-ed byte-wise with the round number. `U` must start with the
/// result.
pub(crate) fn verify_user_password(key: &[u8], file_id: &[u8], user: &[u8]) -> Result<(), Error> {
    let mut input = Vec::with_capacity(PASSWORD_PADDING.len() + file_id.len());
    input.extend_from_slice(&PASSWORD_PADDING);
    input.extend_from_slice(file_id);

    let mut check = rc4::apply(key, &md5::digest(&input));
    for round in 1..=19u8 {
        let round_key: Vec<u8> = key.iter().map(|b| b ^ round).collect();
        check = rc4::apply(&round_key, &check);
    }

    if user.len() >= check.len() && user[..check.len()] == check[..] {
        Ok(())
    } else {
        Err(Error::InvalidPassword)
    }
}

/// Derive the key for one object: the document key extended with the three
/// low-order bytes of the object number and the two low-order bytes of the
/// generation number, hashed, and truncated to `min(length / 8 + 5, 16)`.
pub(crate) fn object_key(doc_key: &[u8], oid: Oid) -> Vec<u8> {
    let mut input = Vec::with_capacity(doc_key.len() + 5);
    input.extend_from_slice(doc_key);
    input.extend_from_slice(&oid.num.to_le_bytes()[..3]);
    input.extend_from_slice(&oid.gen.to_le_bytes()[..2]);

    let hash = md5::digest(&input);
    let len = (doc_key.len() + 5).min(16);

    hash[..len].to_vec()
}

/// Decrypt `data` with the given RC4 key. An empty key is the unencrypted
/// case and returns the bytes unchanged.
pub(crate) fn decrypt(key: &[u8], data: &[u8]) -> Vec<u8> {
    if key.is_empty() {
        data.to_vec()
    } else {
        rc4::apply(key, data)
    }
}
