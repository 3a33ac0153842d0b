//! Single-byte XOR checksum over the image bytes.
//!
//! The target computes the same running XOR over every payload byte it
//! receives and sends the result back as the last byte of the transaction.
//! A plain XOR is enough to catch the corruption patterns possible on a
//! short wired serial link (bit drops, truncation); it is not
//! cryptographically meaningful and must stay bit-compatible with the
//! fixed-function bootstrap code on the target side.

/// Compute the XOR reduction of `bytes`, starting from zero.
///
/// An empty slice yields `0`.
pub fn xor_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc ^ b)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn empty_image_checksums_to_zero() {
    assert_eq!(xor_checksum(&[]), 0);
}

#[test]
fn single_byte_is_its_own_checksum() {
    assert_eq!(xor_checksum(&[0xA5]), 0xA5);
}

#[test]
fn known_vector() {
    // 0x10 ^ 0x20 ^ 0x30 == 0x00
    assert_eq!(xor_checksum(&[0x10, 0x20, 0x30]), 0x00);
}

#[test]
fn concatenation_distributes_over_xor() {
    let a = [0xDE, 0xAD, 0xBE, 0xEF];
    let b = [0x01, 0x02, 0x03];
    let mut ab = a.to_vec();
    ab.extend_from_slice(&b);
    assert_eq!(xor_checksum(&ab), xor_checksum(&a) ^ xor_checksum(&b));
}

#[test]
fn pure_and_repeatable() {
    let data = [0x55, 0xAA, 0x0F, 0xF0];
    assert_eq!(xor_checksum(&data), xor_checksum(&data));
}

#[test]
fn duplicated_bytes_cancel_out() {
    assert_eq!(xor_checksum(&[0x42, 0x42]), 0);
}
