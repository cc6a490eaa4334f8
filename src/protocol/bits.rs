//! 7-bit packing
//!
//! Sysex payloads may not contain bytes >= 0x80 (0xF7 ends the frame), so
//! every raw byte travels as two wire bytes: bits 0-6, then bit 7.

/// Encode raw bytes into 7-bit-clean pairs
pub fn encode14(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() * 2);
    for &byte in input {
        out.push(byte & 0x7F);
        out.push(byte >> 7);
    }
    out
}

/// Decode 7-bit pairs back into raw bytes
///
/// A trailing byte without its high half decodes as if the high half were 0.
pub fn decode14(input: &[u8]) -> Vec<u8> {
    input
        .chunks(2)
        .map(|pair| {
            let low = pair[0] & 0x7F;
            let high = pair.get(1).map_or(0, |b| b & 0x7F);
            low | (high << 7)
        })
        .collect()
}

/// Split a value into its low and high 7-bit halves
#[inline]
pub(crate) fn split14(value: u32) -> [u8; 2] {
    [(value & 0x7F) as u8, ((value >> 7) & 0x7F) as u8]
}

/// Join a low/high 7-bit pair
#[inline]
pub(crate) fn join14(low: u8, high: u8) -> u16 {
    u16::from(low & 0x7F) | (u16::from(high & 0x7F) << 7)
}
