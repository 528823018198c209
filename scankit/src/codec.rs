//! SANE word and fixed-point encoding.
//!
//! Integer, boolean and fixed-point option values travel as 4-byte words in the
//! byte order of the host the backend was built for. Fixed-point values use a
//! 16.16 layout.

/// Size of one `SANE_Word` in bytes.
pub const WORD_SIZE: usize = 4;

/// `SANE_FIXED_SCALE_SHIFT`.
pub const FIXED_SCALE_SHIFT: u32 = 16;

/// Smallest difference two fixed-point values can have.
pub const FIXED_PRECISION: f64 = 1.0 / (1 << FIXED_SCALE_SHIFT) as f64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    #[cfg(target_endian = "little")]
    pub const NATIVE: Self = Self::Little;

    #[cfg(target_endian = "big")]
    pub const NATIVE: Self = Self::Big;
}

pub fn word_to_value_in(order: ByteOrder, data: [u8; WORD_SIZE]) -> i32 {
    match order {
        ByteOrder::Little => i32::from_le_bytes(data),
        ByteOrder::Big => i32::from_be_bytes(data),
    }
}

pub fn value_to_word_in(order: ByteOrder, value: i32) -> [u8; WORD_SIZE] {
    match order {
        ByteOrder::Little => value.to_le_bytes(),
        ByteOrder::Big => value.to_be_bytes(),
    }
}

/// Decodes a word in host byte order.
pub fn word_to_value(data: [u8; WORD_SIZE]) -> i32 {
    word_to_value_in(ByteOrder::NATIVE, data)
}

/// Encodes a word in host byte order.
pub fn value_to_word(value: i32) -> [u8; WORD_SIZE] {
    value_to_word_in(ByteOrder::NATIVE, value)
}

/// Reads the first word of a raw option buffer. Short buffers are zero padded.
pub fn read_word(data: &[u8]) -> i32 {
    let mut word = [0u8; WORD_SIZE];
    let len = data.len().min(WORD_SIZE);
    word[..len].copy_from_slice(&data[..len]);
    word_to_value(word)
}

/// Decodes a word array, e.g. a gamma table. Trailing partial words are dropped.
pub fn words_to_values(data: &[u8]) -> Vec<i32> {
    data.chunks_exact(WORD_SIZE)
        .map(|chunk| word_to_value([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

pub fn values_to_words(values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|value| value_to_word(*value)).collect()
}

/// `SANE_UNFIX`.
pub fn fixed_to_double(fixed: i32) -> f64 {
    fixed as f64 / (1 << FIXED_SCALE_SHIFT) as f64
}

/// `SANE_FIX`, truncating toward zero. Out of range values saturate.
pub fn double_to_fixed(value: f64) -> i32 {
    (value * (1 << FIXED_SCALE_SHIFT) as f64) as i32
}

/// Decodes a NUL terminated string buffer.
pub fn bytes_to_string(data: &[u8]) -> String {
    let end = data.iter().position(|byte| *byte == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).into_owned()
}

/// Encodes `text` as a NUL terminated buffer of at least `size` bytes.
pub fn string_to_bytes(text: &str, size: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(size.max(text.len() + 1));
    data.extend_from_slice(text.as_bytes());
    data.resize(size.max(text.len() + 1), 0);
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn explicit_byte_orders() {
        assert_eq!(value_to_word_in(ByteOrder::Little, 0x0102_0304), [4, 3, 2, 1]);
        assert_eq!(value_to_word_in(ByteOrder::Big, 0x0102_0304), [1, 2, 3, 4]);
        assert_eq!(word_to_value_in(ByteOrder::Little, [0xff, 0xff, 0xff, 0xff]), -1);
        assert_eq!(word_to_value_in(ByteOrder::Big, [0, 0, 1, 0]), 256);
    }

    #[test]
    fn fixed_point_known_values() {
        assert_eq!(double_to_fixed(1.0), 65536);
        assert_eq!(double_to_fixed(-0.5), -32768);
        assert_eq!(fixed_to_double(65536 * 300), 300.0);
        assert_eq!(fixed_to_double(double_to_fixed(215.9)), 215.899_993_896_484_4);
    }

    #[test]
    fn short_buffers_are_padded() {
        assert_eq!(read_word(&[]), 0);
        assert_eq!(read_word(&value_to_word(42)[..]), 42);
    }

    #[test]
    fn strings_are_nul_terminated() {
        assert_eq!(string_to_bytes("Color", 8), b"Color\0\0\0");
        assert_eq!(string_to_bytes("Lineart", 4), b"Lineart\0");
        assert_eq!(bytes_to_string(b"Gray\0junk"), "Gray");
        assert_eq!(bytes_to_string(b"Flatbed"), "Flatbed");
    }

    #[test]
    fn word_arrays() {
        let table = vec![0, 1, 255, -7];
        assert_eq!(words_to_values(&values_to_words(&table)), table);
        assert_eq!(words_to_values(&[1, 0, 0, 0, 9]), vec![1]);
    }

    proptest! {
        #[test]
        fn word_round_trip(value in any::<i32>()) {
            prop_assert_eq!(word_to_value(value_to_word(value)), value);
            prop_assert_eq!(word_to_value_in(ByteOrder::Big, value_to_word_in(ByteOrder::Big, value)), value);
        }

        #[test]
        fn fixed_round_trip(value in -32768.0f64..32767.9999) {
            prop_assert!((fixed_to_double(double_to_fixed(value)) - value).abs() < FIXED_PRECISION);
        }
    }
}
