pub mod encoder;
pub mod lexer;
pub mod parser;

pub use encoder::{encode, encode_instruction, encode_number};
pub use lexer::{Lexer, Symbol};
pub use parser::{ParseError, ParseErrorKind, Parser};

/// Builds whitespace source from a readable pattern: `S` is a space, `T` a tab, `L` a line feed.
/// Every other character is dropped.
#[cfg(test)]
pub(crate) fn source(pattern: &str) -> Vec<u8> {
    pattern
        .chars()
        .filter_map(|c| match c {
            'S' => Some(lexer::SPACE),
            'T' => Some(lexer::TAB),
            'L' => Some(lexer::LINE_FEED),
            _ => None,
        })
        .collect()
}
