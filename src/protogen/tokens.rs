//! Whitespace/`;`/`{`/`}` tokenizer for the `.proto` subset this crate
//! understands.
//!
//! Grounded on `original_source/proto-gen/tokens.go`'s `TokenReader`: read
//! byte by byte, split on whitespace and `;`, and keep a trailing `;` as
//! its own token so the parser can use it as a statement terminator.

use std::io::{self, Read};

pub struct TokenReader<R> {
    inner: R,
    buffer: String,
}

impl<R: Read> TokenReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: String::new(),
        }
    }

    /// Reads the next token, or `None` on a clean end of input.
    pub fn next_token(&mut self) -> io::Result<Option<String>> {
        let mut byte = [0u8; 1];
        loop {
            let n = self.inner.read(&mut byte)?;
            if n == 0 {
                if !self.buffer.is_empty() {
                    return Ok(Some(std::mem::take(&mut self.buffer)));
                }
                return Ok(None);
            }

            let b = byte[0] as char;
            if b.is_whitespace() || b == ';' || b == '{' || b == '}' {
                if !self.buffer.is_empty() {
                    let out = std::mem::take(&mut self.buffer);
                    if b == ';' || b == '{' || b == '}' {
                        self.buffer.push(b);
                    }
                    return Ok(Some(out));
                }
                if b == ';' || b == '{' || b == '}' {
                    return Ok(Some(b.to_string()));
                }
                continue;
            }

            self.buffer.push(b);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(input: &str) -> Vec<String> {
        let mut reader = TokenReader::new(input.as_bytes());
        let mut out = Vec::new();
        while let Some(tok) = reader.next_token().unwrap() {
            out.push(tok);
        }
        out
    }

    #[test]
    fn splits_on_whitespace_and_punctuation() {
        assert_eq!(
            tokenize("message Foo { string name = 1; }"),
            vec!["message", "Foo", "{", "string", "name", "=", "1", ";", "}"]
        );
    }

    #[test]
    fn trailing_token_without_terminator_is_kept() {
        assert_eq!(tokenize("package chat"), vec!["package", "chat"]);
    }
}
