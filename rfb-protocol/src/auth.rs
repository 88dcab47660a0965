//! VNC authentication (security type 2).
//!
//! The server sends a 16-byte random challenge; the client DES-encrypts it
//! with a key derived from the password and returns the 16-byte result.
//!
//! The key derivation is a legacy RFB quirk and must be reproduced exactly:
//! the password is truncated or zero-padded to 8 bytes, and then the bits of
//! each byte are reversed (LSB becomes MSB) before the bytes are used as the
//! DES key. The two challenge halves are encrypted independently (ECB).

use cipher::{BlockEncrypt, KeyInit};
use des::Des;

/// Derive the 8-byte DES key from a VNC password.
///
/// Truncates/zero-pads to 8 bytes and reverses the bit order within each
/// byte.
fn derive_key(password: &str) -> [u8; 8] {
    let mut key = [0u8; 8];
    for (slot, &byte) in key.iter_mut().zip(password.as_bytes().iter().take(8)) {
        *slot = byte.reverse_bits();
    }
    key
}

/// Compute the response to a VNC authentication challenge.
pub fn challenge_response(password: &str, challenge: &[u8; 16]) -> [u8; 16] {
    let key = derive_key(password);
    let cipher = Des::new_from_slice(&key).expect("DES key is always 8 bytes");

    let mut response = *challenge;
    let (block0, block1) = response.split_at_mut(8);
    cipher.encrypt_block(block0.into());
    cipher.encrypt_block(block1.into());
    response
}
