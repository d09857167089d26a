#[cfg(not(target_arch = "wasm32"))]
use memmap::Mmap;
use std::fmt::{self, Display};
#[cfg(not(target_arch = "wasm32"))]
use std::fs::File;
use std::ops::Deref;

use crate::ws::parser::{ParseError, ParseErrorKind};

pub const SPACE: u8 = b' ';
pub const TAB: u8 = b'\t';
pub const LINE_FEED: u8 = b'\n';

/// One letter of the ternary alphabet. Every other byte of a source is a comment.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Symbol {
    Space,
    Tab,
    LineFeed,
}

impl Symbol {
    pub fn from_byte(byte: u8) -> Option<Symbol> {
        match byte {
            SPACE => Some(Symbol::Space),
            TAB => Some(Symbol::Tab),
            LINE_FEED => Some(Symbol::LineFeed),
            _ => None,
        }
    }

    pub fn as_byte(&self) -> u8 {
        match self {
            Symbol::Space => SPACE,
            Symbol::Tab => TAB,
            Symbol::LineFeed => LINE_FEED,
        }
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Space => write!(f, "[Space]"),
            Symbol::Tab => write!(f, "[Tab]"),
            Symbol::LineFeed => write!(f, "[LF]"),
        }
    }
}

#[derive(Debug)]
enum Source {
    #[cfg(not(target_arch = "wasm32"))]
    Mapped(Mmap),
    Buffered(Vec<u8>),
}

impl Deref for Source {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            #[cfg(not(target_arch = "wasm32"))]
            Source::Mapped(map) => &map[..],
            Source::Buffered(bytes) => &bytes[..],
        }
    }
}

/// Turns raw bytes into symbols
#[derive(Debug)]
pub struct Lexer {
    source: Source,
    token_index: usize,
}

impl Lexer {
    pub fn new(source: impl Into<Vec<u8>>) -> Lexer {
        Lexer {
            source: Source::Buffered(source.into()),
            token_index: 0,
        }
    }

    /// Memory maps the source file at `file_name`
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_file(file_name: &str) -> Result<Lexer, ParseError> {
        let file = match File::open(file_name) {
            Ok(content) => content,
            Err(err) => return ParseErrorKind::FileOpen(file_name.to_string(), err).throw(0),
        };
        let empty = match file.metadata() {
            Ok(meta) => meta.len() == 0,
            Err(err) => return ParseErrorKind::FileOpen(file_name.to_string(), err).throw(0),
        };
        // zero length mappings are rejected by the os
        if empty {
            return Ok(Lexer::new(Vec::new()));
        }
        let source = unsafe {
            match Mmap::map(&file) {
                Ok(content) => content,
                Err(err) => {
                    return ParseErrorKind::MemoryMap(file_name.to_string(), err).throw(0)
                }
            }
        };

        Ok(Lexer {
            source: Source::Mapped(source),
            token_index: 0,
        })
    }

    /// Byte offset of the next unread byte
    pub fn position(&self) -> usize {
        self.token_index
    }

    /// Reads the next symbol, skipping comment bytes.
    ///
    /// At the end of the source this yields `Ok(None)` when `allow_end` is set (between two
    /// instructions) and `UnexpectedEndOfStream` otherwise.
    pub fn next_symbol(&mut self, allow_end: bool) -> Result<Option<Symbol>, ParseError> {
        while self.token_index < self.source.len() {
            let byte = self.source[self.token_index];
            self.token_index += 1;
            if let Some(symbol) = Symbol::from_byte(byte) {
                return Ok(Some(symbol));
            }
        }

        if allow_end {
            Ok(None)
        } else {
            ParseErrorKind::UnexpectedEndOfStream.throw(self.token_index)
        }
    }

    /// Reads the next symbol inside an instruction, where the source must not end
    pub fn symbol(&mut self) -> Result<Symbol, ParseError> {
        match self.next_symbol(false)? {
            Some(symbol) => Ok(symbol),
            None => ParseErrorKind::UnexpectedEndOfStream.throw(self.token_index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Lexer, Symbol};
    use crate::ws::parser::{ParseError, ParseErrorKind};

    #[test]
    fn skips_comments() -> Result<(), ParseError> {
        let mut lexer = Lexer::new("a \tb\r\nc");

        assert_eq!(lexer.next_symbol(true)?, Some(Symbol::Space));
        assert_eq!(lexer.next_symbol(true)?, Some(Symbol::Tab));
        assert_eq!(lexer.next_symbol(true)?, Some(Symbol::LineFeed));
        assert_eq!(lexer.position(), 6);
        assert_eq!(lexer.next_symbol(true)?, None);
        assert_eq!(lexer.position(), 7);

        Ok(())
    }

    #[test]
    fn end_inside_instruction() {
        let mut lexer = Lexer::new("comment only");
        let err = lexer.next_symbol(false).unwrap_err();

        assert!(matches!(err.kind, ParseErrorKind::UnexpectedEndOfStream));
        assert_eq!(err.token_index, 12);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn missing_file() {
        let err = Lexer::from_file("does/not/exist.ws").unwrap_err();

        assert!(matches!(err.kind, ParseErrorKind::FileOpen(..)));
    }

    #[test]
    fn symbol_names() {
        assert_eq!(Symbol::Space.to_string(), "[Space]");
        assert_eq!(Symbol::Tab.to_string(), "[Tab]");
        assert_eq!(Symbol::LineFeed.to_string(), "[LF]");
        assert_eq!(Symbol::from_byte(b'\t').map(|s| s.as_byte()), Some(b'\t'));
        assert_eq!(Symbol::from_byte(b'x'), None);
    }
}
