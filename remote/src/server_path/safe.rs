//! Length-prefixed text serialization of [`ServerPath`](super::ServerPath).
//!
//! Layout: `<type> <prefix_len>[ <prefix>][ <seg_len> <seg>]*`. All lengths count UTF-8 bytes, so
//! fields may contain spaces or any other character. Decoding never trusts a length: every field
//! is bounds-checked against the input and a fixed ceiling before it is sliced.

use super::{Error, PathData};
use crate::server_type::ServerType;
use strum::EnumCount;

/// Upper bound on any single length field.
pub const MAX_FIELD_LEN: usize = 32767;

pub(super) fn encode(server_type: ServerType, data: &PathData) -> String {
    let prefix = data.prefix.as_deref().unwrap_or_default();
    let capacity = data.segments.iter().map(|s| s.len() + 7).sum::<usize>() + prefix.len() + 8;
    let mut out = String::with_capacity(capacity);
    push_number(&mut out, server_type.index());
    out.push(' ');
    push_number(&mut out, prefix.len());
    if !prefix.is_empty() {
        out.push(' ');
        out.push_str(prefix);
    }
    for segment in &data.segments {
        out.push(' ');
        push_number(&mut out, segment.len());
        out.push(' ');
        out.push_str(segment);
    }
    out
}

fn push_number(out: &mut String, mut value: usize) {
    let mut digits = [0u8; 20];
    let mut pos = digits.len();
    loop {
        pos -= 1;
        digits[pos] = b'0' + (value % 10) as u8;
        value /= 10;
        if value == 0 {
            break;
        }
    }
    for &digit in &digits[pos..] {
        out.push(char::from(digit));
    }
}

struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn at_end(&self) -> bool {
        self.pos == self.input.len()
    }

    fn number(&mut self, ceiling: usize) -> Result<usize, Error> {
        let digits = self.input.as_bytes()[self.pos..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if digits == 0 {
            return Err(Error::SafePath("expected a number"));
        }
        let mut value = 0usize;
        for &b in &self.input.as_bytes()[self.pos..self.pos + digits] {
            value = value * 10 + usize::from(b - b'0');
            if value > ceiling {
                return Err(Error::SafePath("number out of range"));
            }
        }
        self.pos += digits;
        Ok(value)
    }

    fn space(&mut self) -> Result<(), Error> {
        if self.input.as_bytes().get(self.pos) != Some(&b' ') {
            return Err(Error::SafePath("expected a space"));
        }
        self.pos += 1;
        Ok(())
    }

    fn field(&mut self, len: usize) -> Result<&'a str, Error> {
        let end = self
            .pos
            .checked_add(len)
            .ok_or(Error::SafePath("field length overflow"))?;
        let field = self
            .input
            .get(self.pos..end)
            .ok_or(Error::SafePath("field runs past the end of the input"))?;
        self.pos = end;
        Ok(field)
    }
}

/// Decode a non-empty safe path. The caller handles the empty string.
pub(super) fn decode(input: &str) -> Result<(ServerType, Option<PathData>), Error> {
    let mut scanner = Scanner { input, pos: 0 };
    let index = scanner.number(ServerType::COUNT - 1)?;
    let server_type =
        ServerType::from_index(index).ok_or(Error::SafePath("unknown server type"))?;
    scanner.space()?;
    let prefix_len = scanner.number(MAX_FIELD_LEN)?;
    let prefix = if prefix_len > 0 {
        scanner.space()?;
        Some(scanner.field(prefix_len)?.to_string())
    } else {
        None
    };
    let mut segments = Vec::new();
    while !scanner.at_end() {
        scanner.space()?;
        let len = scanner.number(MAX_FIELD_LEN)?;
        if len == 0 {
            return Err(Error::SafePath("empty segment"));
        }
        scanner.space()?;
        segments.push(scanner.field(len)?.to_string());
    }
    if segments.is_empty() && !server_type.traits().has_root {
        return Err(Error::SafePath("grammar requires at least one segment"));
    }
    Ok((server_type, Some(PathData { prefix, segments })))
}
