//! The LZ77 scheme decoded by the BIOS `SWI 0x11` call (compression
//! type `0x10`).
//!
//! A stream is a four byte header followed by token groups:
//!
//! | Byte num | Description                                      |
//! | :------: | ------------------------------------------------ |
//! | 0        | type byte, always `0x10`                         |
//! | 1..4     | uncompressed length, 24-bit little endian        |
//! | 4..      | token groups, zero padded to a 4 byte boundary   |
//!
//! Each group starts with a flag byte describing the next eight tokens,
//! most significant bit first. A `0` bit stands for one literal byte
//! copied to the output; a `1` bit stands for a two byte back-reference:
//!
//! ```text
//! ┌ length - 3 (4 bits)
//! |    ┌ displacement - 1 (12 bits)
//! LLLL DDDD  DDDDDDDD
//! first byte second byte
//! ```
//!
//! The copy reads `length` bytes starting `displacement` bytes behind
//! the current output position, one byte at a time, so a displacement
//! smaller than the length repeats the tail of the output (the BIOS
//! honors this and encoders exploit it for runs).
//!
//! ## An example
//!
//! The five byte run `41 41 41 41 41` compresses to:
//!
//! ```text
//! 10 05 00 00 <- header, 5 bytes of output
//! 40          <- flag byte: literal, back-reference
//! 41          <- literal 'A'
//! 10 00       <- length = 1 + 3, displacement = 0 + 1
//! ```
//!
//! Decoding stops the moment the declared length has been produced;
//! trailing flag bits of the last group carry no tokens.

use byteorder::{ByteOrder, LittleEndian};

use crate::errors::Lz77Error;

mod decode;
mod encode;

pub use decode::{decompress, Decompressed};
pub use encode::compress;

/// The compression type byte the BIOS decoder accepts.
pub const MAGIC: u8 = 0x10;

/// Header length in bytes: type byte plus 24-bit size.
pub const HEADER_LEN: usize = 4;

/// Farthest back a reference may reach.
pub(crate) const MAX_DISP: usize = 4096;

/// Shortest run worth a back-reference token.
pub(crate) const MIN_MATCH: usize = 3;

/// Longest run one token can express.
pub(crate) const MAX_MATCH: usize = 18;

/// The four byte header in front of every compressed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lz77Header {
    /// Length of the data once decompressed.
    pub len: usize,
}

impl Lz77Header {
    /// Parse a header from the start of `input`.
    ///
    /// The type byte is judged before the length field, so a stream of
    /// the wrong type reports [`Lz77Error::BadMagic`] even when cut
    /// short.
    pub fn parse(input: &[u8]) -> Result<Self, Lz77Error> {
        let magic = *input.first().ok_or(Lz77Error::Truncated)?;
        if magic != MAGIC {
            return Err(Lz77Error::BadMagic(magic));
        }
        if input.len() < HEADER_LEN {
            return Err(Lz77Error::Truncated);
        }

        let len = LittleEndian::read_u24(&input[1..HEADER_LEN]) as usize;
        Ok(Self { len })
    }

    /// Append the header to `out`.
    ///
    /// Fails with [`Lz77Error::TooBig`] when the length does not fit the
    /// 24-bit size field.
    pub fn write_to(&self, out: &mut Vec<u8>) -> Result<(), Lz77Error> {
        if self.len >= 1 << 24 {
            return Err(Lz77Error::TooBig(self.len));
        }

        let mut size = [0u8; 3];
        LittleEndian::write_u24(&mut size, self.len as u32);
        out.push(MAGIC);
        out.extend_from_slice(&size);
        Ok(())
    }
}
