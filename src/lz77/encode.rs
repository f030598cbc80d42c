use log::debug;

use crate::errors::Lz77Error;
use crate::lz77::{Lz77Header, HEADER_LEN, MAX_DISP, MAX_MATCH, MIN_MATCH};

/// Compress `raw` into a stream the BIOS decoder accepts.
///
/// The encoder is a greedy longest-match search over the BIOS window
/// (displacements up to 4096, runs of 3 to 18 bytes). It guarantees
/// `decompress(compress(raw)) == raw`, not any particular token
/// sequence another tool would pick. The output is zero padded to a
/// multiple of four bytes.
pub fn compress(raw: &[u8]) -> Result<Vec<u8>, Lz77Error> {
    let mut out = Vec::with_capacity(HEADER_LEN + raw.len() + raw.len() / 8 + 4);
    Lz77Header { len: raw.len() }.write_to(&mut out)?;
    debug!("lz77: compressing {} bytes", raw.len());

    let mut group = GroupBuffer::new();
    let mut pos = 0;
    while pos < raw.len() {
        match find_match(raw, pos) {
            Some(m) => {
                group.push_reference(m, &mut out);
                pos += m.len;
            }
            None => {
                group.push_literal(raw[pos], &mut out);
                pos += 1;
            }
        }
    }
    group.flush(&mut out);

    while out.len() % 4 != 0 {
        out.push(0);
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Match {
    len: usize,
    disp: usize,
}

/// Length of the run at `pos` matching the data `disp` bytes behind it.
///
/// The compared byte may lie at or past `pos` when `disp < len`; that is
/// the rolling self-reference the decoder reproduces byte by byte.
fn match_len(data: &[u8], pos: usize, disp: usize, limit: usize) -> usize {
    (0..limit)
        .take_while(|&j| data[pos + j] == data[pos + j - disp])
        .count()
}

/// Best back-reference for position `pos`, if one is worth a token.
///
/// Every displacement inside the window is tried; a later candidate only
/// replaces the best on a strictly longer run, so ties go to the
/// smallest displacement.
fn find_match(data: &[u8], pos: usize) -> Option<Match> {
    let limit = MAX_MATCH.min(data.len() - pos);
    if limit < MIN_MATCH {
        return None;
    }

    (1..=pos.min(MAX_DISP))
        .map(|disp| Match {
            len: match_len(data, pos, disp, limit),
            disp,
        })
        .filter(|m| m.len >= MIN_MATCH)
        .fold(None, |best: Option<Match>, cur| {
            best.filter(|b| b.len >= cur.len).or(Some(cur))
        })
}

/// Accumulates one flag byte and the bodies of its eight tokens, and
/// appends the finished group to the output.
///
/// The flag bit for the first token is the most significant one. A group
/// holds at most eight tokens of at most two bytes each.
struct GroupBuffer {
    flags: u8,
    tokens: usize,
    body: [u8; 16],
    body_len: usize,
}

impl GroupBuffer {
    fn new() -> Self {
        Self {
            flags: 0,
            tokens: 0,
            body: [0; 16],
            body_len: 0,
        }
    }

    fn push_literal(&mut self, byte: u8, out: &mut Vec<u8>) {
        self.body[self.body_len] = byte;
        self.body_len += 1;
        self.commit(out);
    }

    fn push_reference(&mut self, m: Match, out: &mut Vec<u8>) {
        self.flags |= 1 << (7 - self.tokens);
        self.body[self.body_len] = ((m.len - MIN_MATCH) << 4) as u8 | ((m.disp - 1) >> 8) as u8;
        self.body[self.body_len + 1] = ((m.disp - 1) & 0xFF) as u8;
        self.body_len += 2;
        self.commit(out);
    }

    fn commit(&mut self, out: &mut Vec<u8>) {
        self.tokens += 1;
        if self.tokens == 8 {
            self.flush(out);
        }
    }

    fn flush(&mut self, out: &mut Vec<u8>) {
        if self.tokens > 0 {
            out.push(self.flags);
            out.extend_from_slice(&self.body[..self.body_len]);
            self.flags = 0;
            self.tokens = 0;
            self.body_len = 0;
        }
    }
}
