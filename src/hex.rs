use heapless::Vec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeHexError {
    /// An invalid character was found. Valid ones are: `0...9`, `a...f`
    /// or `A...F`.
    InvalidHexCharacter,
    /// A hex string's length needs to be even, as two digits correspond to
    /// one byte.
    OddLength,
    /// Decoded data does not fit the output buffer
    Overflow,
}

fn val(c: u8) -> Result<u8, DecodeHexError> {
    match c {
        b'A'..=b'F' => Ok(c - b'A' + 10),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'0'..=b'9' => Ok(c - b'0'),
        _ => Err(DecodeHexError::InvalidHexCharacter),
    }
}

/// Decodes `hex` into `out`, replacing its previous content.
pub fn decode_hex_into<const N: usize>(
    hex: &str,
    out: &mut Vec<u8, N>,
) -> Result<(), DecodeHexError> {
    let hex = hex.as_bytes();
    if hex.len() % 2 != 0 {
        return Err(DecodeHexError::OddLength);
    }

    out.clear();
    for pair in hex.chunks_exact(2) {
        out.push(val(pair[0])? << 4 | val(pair[1])?)
            .map_err(|_| DecodeHexError::Overflow)?;
    }
    Ok(())
}

/// Parses a big endian hex number such as a tracking area code `"00C3"`.
pub fn parse_hex_u32(hex: &str) -> Option<u32> {
    if hex.is_empty() || hex.len() > 8 {
        return None;
    }
    hex.bytes()
        .try_fold(0u32, |acc, c| Some(acc << 4 | val(c).ok()? as u32))
}
