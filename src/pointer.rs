//! Pointer codec
//!
//! A pointer is an offset into the data region, stored as one control byte
//! followed by 0-4 value bytes. The control byte carries the field kind
//! (`001` in bits 7-5), the size class (bits 4-3) and, for the three short
//! classes, the top three bits of the value (bits 2-0).
//!
//! ```text
//! class  bytes  value                                   bias
//!   0      2    (ctrl & 7) << 8  | b1                   0
//!   1      3    (ctrl & 7) << 16 | b1 << 8 | b2         2048
//!   2      4    (ctrl & 7) << 24 | b1 << 16 | b2 << 8 | b3   526336
//!   3      5    b1 << 24 | b2 << 16 | b3 << 8 | b4      0
//! ```
//!
//! Encoding picks the smallest class whose range holds the offset and
//! stores `offset - bias`, so decoding an encoded offset always yields it
//! back.

use crate::cursor::ReadCursor;
use crate::error::{MmdbError, Result};

/// Field kind stored in the top three bits of a pointer's control byte
pub const POINTER_KIND: u8 = 1;

const CLASS_1_BIAS: u32 = 2048;
const CLASS_2_BIAS: u32 = 526_336;
const CLASS_3_START: u32 = CLASS_2_BIAS + (1 << 27);

/// One of the four pointer widths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeClass {
    /// 11-bit offsets, 2 bytes total
    Class0,
    /// 19-bit offsets biased by 2048, 3 bytes total
    Class1,
    /// 27-bit offsets biased by 526336, 4 bytes total
    Class2,
    /// Full 32-bit offsets, 5 bytes total
    Escape,
}

impl SizeClass {
    /// Smallest class that can represent `offset`
    pub fn for_offset(offset: u32) -> Self {
        if offset < CLASS_1_BIAS {
            SizeClass::Class0
        } else if offset < CLASS_2_BIAS {
            SizeClass::Class1
        } else if offset < CLASS_3_START {
            SizeClass::Class2
        } else {
            SizeClass::Escape
        }
    }

    /// Class named by bits 4-3 of a control byte
    pub fn from_ctrl(ctrl: u8) -> Self {
        match (ctrl >> 3) & 0x3 {
            0 => SizeClass::Class0,
            1 => SizeClass::Class1,
            2 => SizeClass::Class2,
            _ => SizeClass::Escape,
        }
    }

    /// Total encoded length, control byte included
    pub fn encoded_len(self) -> usize {
        match self {
            SizeClass::Class0 => 2,
            SizeClass::Class1 => 3,
            SizeClass::Class2 => 4,
            SizeClass::Escape => 5,
        }
    }

    /// Amount added to the stored value on decode
    pub fn bias(self) -> u32 {
        match self {
            SizeClass::Class0 | SizeClass::Escape => 0,
            SizeClass::Class1 => CLASS_1_BIAS,
            SizeClass::Class2 => CLASS_2_BIAS,
        }
    }

    fn bits(self) -> u8 {
        match self {
            SizeClass::Class0 => 0,
            SizeClass::Class1 => 1,
            SizeClass::Class2 => 2,
            SizeClass::Escape => 3,
        }
    }
}

/// Encode `offset` as a standalone pointer
pub fn encode(offset: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(SizeClass::for_offset(offset).encoded_len());
    encode_into(offset, &mut out);
    out
}

/// Number of bytes `encode(offset)` produces
pub fn encoded_len(offset: u32) -> usize {
    SizeClass::for_offset(offset).encoded_len()
}

/// Append the encoding of `offset` to `out`
pub fn encode_into(offset: u32, out: &mut Vec<u8>) {
    let class = SizeClass::for_offset(offset);
    let ctrl = (POINTER_KIND << 5) | (class.bits() << 3);

    if class == SizeClass::Escape {
        out.push(ctrl);
        out.extend_from_slice(&offset.to_be_bytes());
        return;
    }

    let stored = offset - class.bias();
    let value_bytes = class.encoded_len() - 1;
    // Top three bits of the stored value ride in the control byte
    let high = ((stored >> (8 * value_bytes)) & 0x7) as u8;
    out.push(ctrl | high);
    out.extend_from_slice(&stored.to_be_bytes()[4 - value_bytes..]);
}

/// Decode the pointer whose control byte sits at `position`
///
/// Returns the offset and the number of bytes consumed. Value bytes are
/// always read relative to `position`.
pub fn decode(buffer: &[u8], position: usize) -> Result<(u32, usize)> {
    let overflow = || MmdbError::PointerOverflow {
        position,
        len: buffer.len(),
    };

    let ctrl = *buffer.get(position).ok_or_else(overflow)?;
    let kind = ctrl >> 5;
    if kind != POINTER_KIND {
        return Err(MmdbError::UnknownFieldKind(kind));
    }

    let class = SizeClass::from_ctrl(ctrl);
    let len = class.encoded_len();
    let bytes = position
        .checked_add(len)
        .and_then(|end| buffer.get(position + 1..end))
        .ok_or_else(overflow)?;

    let value = match class {
        SizeClass::Escape => u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        _ => {
            let stored = bytes
                .iter()
                .fold((ctrl & 0x7) as u32, |acc, &b| (acc << 8) | b as u32);
            stored + class.bias()
        }
    };

    Ok((value, len))
}

/// Decode the pointer under `cursor` and step past it
pub fn decode_at(buffer: &[u8], cursor: &mut ReadCursor) -> Result<u32> {
    let (value, consumed) = decode(buffer, cursor.position())?;
    cursor.advance(consumed);
    Ok(value)
}
