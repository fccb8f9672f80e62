//! `!`-delimited chunk reader
//!
//! The recipe is a byte stream. `!` terminates a chunk, `!!` decodes to a
//! literal `!`. A trailing unterminated non-empty chunk is still yielded.

use crate::error::{SqueakerError, SqueakerResult};

/// Iterate the chunks of a recipe byte stream
pub fn chunks(bytes: &[u8]) -> Chunks<'_> {
    Chunks { bytes, pos: 0 }
}

pub struct Chunks<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Iterator for Chunks<'_> {
    type Item = SqueakerResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.bytes.len() {
            return None;
        }

        let mut buf = Vec::new();
        let mut terminated = false;
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            if b == b'!' {
                if self.bytes.get(self.pos + 1) == Some(&b'!') {
                    buf.push(b'!');
                    self.pos += 2;
                } else {
                    self.pos += 1;
                    terminated = true;
                    break;
                }
            } else {
                buf.push(b);
                self.pos += 1;
            }
        }

        if !terminated && buf.is_empty() {
            return None;
        }

        Some(String::from_utf8(buf).map_err(|e| {
            SqueakerError::recipe(
                String::from_utf8_lossy(e.as_bytes()).into_owned(),
                "chunk is not valid UTF-8",
            )
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(bytes: &[u8]) -> Vec<String> {
        chunks(bytes).map(|c| c.unwrap()).collect()
    }

    /// The inverse of the reader, used to check the round-trip property
    fn encode(parts: &[&str]) -> Vec<u8> {
        let mut out = Vec::new();
        for part in parts {
            out.extend(part.replace('!', "!!").as_bytes());
            out.push(b'!');
        }
        out
    }

    #[test]
    fn splits_on_bang() {
        assert_eq!(collect(b"a!b!c!"), vec!["a", "b", "c"]);
    }

    #[test]
    fn double_bang_is_literal() {
        assert_eq!(collect(b"say !!hello!!!"), vec!["say !hello!"]);
    }

    #[test]
    fn trailing_unterminated_chunk_is_yielded() {
        assert_eq!(collect(b"a!rest"), vec!["a", "rest"]);
    }

    #[test]
    fn trailing_newline_after_last_bang() {
        assert_eq!(collect(b"a!\n"), vec!["a", "\n"]);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(collect(b"").is_empty());
    }

    #[test]
    fn empty_terminated_chunks_are_kept() {
        assert_eq!(collect(b"!!!"), vec!["!"]);
        assert_eq!(collect(b"a!!b!"), vec!["a!b"]);
    }

    #[test]
    fn encode_decode_roundtrip() {
        let cases: Vec<Vec<&str>> = vec![
            vec![],
            vec![""],
            vec!["plain"],
            vec!["with ! bang", "", "with !! two", "trailing!"],
            vec!["from: 'http://x'", "\n", "Transcript showln: 'hi!'"],
        ];
        for parts in cases {
            let encoded = encode(&parts);
            let decoded = collect(&encoded);
            assert_eq!(decoded, parts, "round-trip failed for {:?}", parts);
        }
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let mut result = chunks(&[0xff, 0xfe, b'!']);
        assert!(result.next().unwrap().is_err());
    }
}
