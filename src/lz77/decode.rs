use log::debug;

use crate::errors::Lz77Error;
use crate::lz77::{Lz77Header, HEADER_LEN, MIN_MATCH};

/// The result of decompressing one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decompressed {
    /// The uncompressed payload.
    pub data: Vec<u8>,
    /// How many input bytes the stream occupied, header included but
    /// not any alignment padding behind the last group.
    pub read: usize,
}

/// Decompress the BIOS LZ77 stream at the start of `input`.
///
/// `input` may extend arbitrarily far past the end of the stream; the
/// number of bytes actually consumed is reported in
/// [`Decompressed::read`] so callers can tell how much ROM the stream
/// occupies.
pub fn decompress(input: &[u8]) -> Result<Decompressed, Lz77Error> {
    let header = Lz77Header::parse(input)?;
    debug!("lz77: decompressing {} bytes", header.len);

    let mut data = vec![0u8; header.len];
    let mut pos = 0;
    let mut read = HEADER_LEN;

    while pos < header.len {
        let flags = *input.get(read).ok_or(Lz77Error::Truncated)?;
        read += 1;

        for bit in (0..8).rev() {
            if flags >> bit & 1 == 0 {
                data[pos] = *input.get(read).ok_or(Lz77Error::Truncated)?;
                read += 1;
                pos += 1;
            } else {
                if read + 2 > input.len() {
                    return Err(Lz77Error::Truncated);
                }
                let hi = input[read] as usize;
                let lo = input[read + 1] as usize;
                read += 2;

                let len = (hi >> 4) + MIN_MATCH;
                let disp = ((hi & 0xF) << 8 | lo) + 1;
                if disp > pos {
                    return Err(Lz77Error::BadDisplacement { disp, pos });
                }

                // Copied byte by byte: the source window may overlap the
                // bytes this very token produces.
                for _ in 0..len {
                    if pos == header.len {
                        break;
                    }
                    data[pos] = data[pos - disp];
                    pos += 1;
                }
            }

            if pos >= header.len {
                break;
            }
        }
    }

    Ok(Decompressed { data, read })
}
