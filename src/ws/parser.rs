use std::io;
use thiserror::Error;
use tracing::{debug, trace};
use wasm_bindgen::JsValue;

use crate::ws::lexer::{Lexer, Symbol};
use crate::Instruction;

/// Numeric literals carry at most this many magnitude bits
pub const MAX_NUMBER_BITS: u32 = 31;

#[derive(Debug, Error)]
pub enum ParseErrorKind {
    #[error("source ended in the middle of an instruction")]
    UnexpectedEndOfStream,
    #[error("number has an invalid sign [LF]")]
    InvalidSign,
    #[error("number is larger than 31 bits")]
    NumberTooLarge,
    #[error("stack manipulation encountered an invalid command {0}")]
    InvalidStackCommand(Symbol),
    #[error("arithmetic encountered an invalid command group {0}")]
    InvalidArithmeticGroup(Symbol),
    #[error("arithmetic followed by [Tab] encountered an invalid command {0}")]
    InvalidArithmeticCommand(Symbol),
    #[error("heap access encountered an invalid command {0}")]
    InvalidHeapCommand(Symbol),
    #[error("i/o encountered an invalid command group {0}")]
    InvalidIoGroup(Symbol),
    #[error("i/o followed by [Space] encountered an invalid output command {0}")]
    InvalidOutputCommand(Symbol),
    #[error("i/o followed by [Tab] encountered an invalid input command {0}")]
    InvalidInputCommand(Symbol),
    #[error("flow control followed by [LF] encountered an invalid command {0}")]
    InvalidFlowCommand(Symbol),
    #[error("instructions continue after the end of the program")]
    InstructionsAfterEnd,
    #[error("source ended before the end of the program")]
    UnterminatedProgram,
    #[error("failed to open {0}: {1}")]
    FileOpen(String, #[source] io::Error),
    #[error("failed to memory map {0}: {1}")]
    MemoryMap(String, #[source] io::Error),
}

impl ParseErrorKind {
    pub(crate) fn throw<T>(self, token_index: usize) -> Result<T, ParseError> {
        Err(ParseError {
            kind: self,
            token_index,
        })
    }
}

#[derive(Debug, Error)]
#[error("{kind} (at byte {token_index})")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// Byte offset in the source at which the error was detected
    pub token_index: usize,
}

impl From<ParseError> for JsValue {
    fn from(err: ParseError) -> JsValue {
        JsValue::from(format!("wspace error occurred: {}", err))
    }
}

/// Instruction modification parameter, the first branch of the grammar
#[derive(Debug, PartialEq, Clone, Copy)]
enum ImpKind {
    Stack,
    Arithmetic,
    Heap,
    Flow,
    IO,
}

/// The component responsible for decoding whitespace source into instructions
///
/// Decoding stops at the first error. After `End` was decoded only comment bytes may follow.
#[derive(Debug)]
pub struct Parser {
    lexer: Lexer,
    instruction_index: usize,
    done: bool,
    failed: bool,
}

impl Parser {
    pub fn new(source: impl Into<Vec<u8>>) -> Parser {
        Parser::with_lexer(Lexer::new(source))
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_file(file_name: &str) -> Result<Parser, ParseError> {
        Ok(Parser::with_lexer(Lexer::from_file(file_name)?))
    }

    fn with_lexer(lexer: Lexer) -> Parser {
        Parser {
            lexer,
            instruction_index: 0,
            done: false,
            failed: false,
        }
    }

    /// Whether the terminating `End` has been decoded
    pub fn is_done(&self) -> bool {
        self.done
    }

    fn imp(&mut self, first: Symbol) -> Result<ImpKind, ParseError> {
        match first {
            Symbol::Space => Ok(ImpKind::Stack),
            Symbol::Tab => match self.lexer.symbol()? {
                Symbol::Space => Ok(ImpKind::Arithmetic),
                Symbol::Tab => Ok(ImpKind::Heap),
                Symbol::LineFeed => Ok(ImpKind::IO),
            },
            Symbol::LineFeed => Ok(ImpKind::Flow),
        }
    }

    fn stack(&mut self) -> Result<Instruction, ParseError> {
        match self.lexer.symbol()? {
            Symbol::Space => Ok(Instruction::Push(self.number()?)),
            Symbol::LineFeed => match self.lexer.symbol()? {
                Symbol::Space => Ok(Instruction::Copy),
                Symbol::Tab => Ok(Instruction::Swap),
                Symbol::LineFeed => Ok(Instruction::Pop),
            },
            val => ParseErrorKind::InvalidStackCommand(val).throw(self.lexer.position()),
        }
    }

    fn arithmetic(&mut self) -> Result<Instruction, ParseError> {
        match self.lexer.symbol()? {
            Symbol::Space => match self.lexer.symbol()? {
                Symbol::Space => Ok(Instruction::Add),
                Symbol::Tab => Ok(Instruction::Sub),
                Symbol::LineFeed => Ok(Instruction::Mult),
            },
            Symbol::Tab => match self.lexer.symbol()? {
                Symbol::Space => Ok(Instruction::Div),
                Symbol::Tab => Ok(Instruction::Mod),
                val => ParseErrorKind::InvalidArithmeticCommand(val).throw(self.lexer.position()),
            },
            val => ParseErrorKind::InvalidArithmeticGroup(val).throw(self.lexer.position()),
        }
    }

    fn heap(&mut self) -> Result<Instruction, ParseError> {
        match self.lexer.symbol()? {
            Symbol::Space => Ok(Instruction::Store),
            Symbol::Tab => Ok(Instruction::Load),
            val => ParseErrorKind::InvalidHeapCommand(val).throw(self.lexer.position()),
        }
    }

    fn io(&mut self) -> Result<Instruction, ParseError> {
        match self.lexer.symbol()? {
            Symbol::Space => match self.lexer.symbol()? {
                Symbol::Space => Ok(Instruction::OutC),
                Symbol::Tab => Ok(Instruction::OutN),
                val => ParseErrorKind::InvalidOutputCommand(val).throw(self.lexer.position()),
            },
            Symbol::Tab => match self.lexer.symbol()? {
                Symbol::Space => Ok(Instruction::ReadC),
                Symbol::Tab => Ok(Instruction::ReadN),
                val => ParseErrorKind::InvalidInputCommand(val).throw(self.lexer.position()),
            },
            val => ParseErrorKind::InvalidIoGroup(val).throw(self.lexer.position()),
        }
    }

    fn flow(&mut self) -> Result<Instruction, ParseError> {
        match self.lexer.symbol()? {
            Symbol::Space => match self.lexer.symbol()? {
                Symbol::Space => Ok(Instruction::Label(self.number()?)),
                Symbol::Tab => Ok(Instruction::Call(self.number()?)),
                Symbol::LineFeed => Ok(Instruction::Jump(self.number()?)),
            },
            Symbol::Tab => match self.lexer.symbol()? {
                Symbol::Space => Ok(Instruction::Jz(self.number()?)),
                Symbol::Tab => Ok(Instruction::Jn(self.number()?)),
                Symbol::LineFeed => Ok(Instruction::Ret),
            },
            Symbol::LineFeed => match self.lexer.symbol()? {
                Symbol::LineFeed => Ok(Instruction::End),
                val => ParseErrorKind::InvalidFlowCommand(val).throw(self.lexer.position()),
            },
        }
    }

    /// Sign symbol followed by big endian magnitude bits, terminated by [LF]
    fn number(&mut self) -> Result<i32, ParseError> {
        let negative = match self.lexer.symbol()? {
            Symbol::Space => false,
            Symbol::Tab => true,
            Symbol::LineFeed => return ParseErrorKind::InvalidSign.throw(self.lexer.position()),
        };
        let mut magnitude: i32 = 0;
        let mut bits = 0;
        loop {
            let bit = match self.lexer.symbol()? {
                Symbol::Space => 0,
                Symbol::Tab => 1,
                Symbol::LineFeed => break,
            };
            bits += 1;
            if bits > MAX_NUMBER_BITS {
                return ParseErrorKind::NumberTooLarge.throw(self.lexer.position());
            }
            magnitude = (magnitude << 1) | bit;
        }

        Ok(if negative { -magnitude } else { magnitude })
    }

    /// Decodes the next instruction. `Ok(None)` once the source is exhausted after `End`.
    pub fn instruction(&mut self) -> Result<Option<Instruction>, ParseError> {
        let start_index = self.lexer.position();
        let first = match self.lexer.next_symbol(true)? {
            Some(symbol) => symbol,
            None if self.done => return Ok(None),
            None => return ParseErrorKind::UnterminatedProgram.throw(self.lexer.position()),
        };
        if self.done {
            return ParseErrorKind::InstructionsAfterEnd.throw(self.lexer.position() - 1);
        }

        let instr = match self.imp(first)? {
            ImpKind::Stack => self.stack()?,
            ImpKind::Arithmetic => self.arithmetic()?,
            ImpKind::Heap => self.heap()?,
            ImpKind::Flow => self.flow()?,
            ImpKind::IO => self.io()?,
        };
        trace!(
            index = self.instruction_index,
            token_index = start_index,
            %instr,
            "decoded instruction"
        );
        self.instruction_index += 1;
        if instr == Instruction::End {
            self.done = true;
        }

        Ok(Some(instr))
    }

    /// Decodes the whole source
    pub fn parse(mut self) -> Result<Vec<Instruction>, ParseError> {
        let mut instructions = vec![];
        while let Some(instr) = self.instruction()? {
            instructions.push(instr);
        }
        debug!(count = instructions.len(), "decoded source");

        Ok(instructions)
    }
}

impl Iterator for Parser {
    type Item = Result<Instruction, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.instruction() {
            Ok(instr) => instr.map(Ok),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ParseError, ParseErrorKind, Parser};
    use crate::ws::lexer::Symbol;
    use crate::ws::source;
    use crate::Instruction;

    fn parse(pattern: &str) -> Result<Vec<Instruction>, ParseError> {
        Parser::new(source(pattern)).parse()
    }

    fn parse_err(pattern: &str) -> ParseErrorKind {
        parse(pattern).unwrap_err().kind
    }

    #[test]
    fn parse_scenario() -> Result<(), ParseError> {
        // Push 5, Push 3, Add, OutN, End
        let instructions = parse("SS STSTL  SS STTL  TSSS  TLST  LLL")?;

        assert_eq!(
            instructions,
            vec![
                Instruction::Push(5),
                Instruction::Push(3),
                Instruction::Add,
                Instruction::OutN,
                Instruction::End,
            ]
        );

        Ok(())
    }

    #[test]
    fn parse_stack() -> Result<(), ParseError> {
        let instructions = parse("SS TTSL  SLS  SLT  SLL  LLL")?;

        assert_eq!(
            instructions,
            vec![
                Instruction::Push(-6),
                Instruction::Copy,
                Instruction::Swap,
                Instruction::Pop,
                Instruction::End,
            ]
        );

        Ok(())
    }

    #[test]
    fn parse_arithmetic() -> Result<(), ParseError> {
        let instructions = parse("TSSS  TSST  TSSL  TSTS  TSTT  LLL")?;

        assert_eq!(
            instructions,
            vec![
                Instruction::Add,
                Instruction::Sub,
                Instruction::Mult,
                Instruction::Div,
                Instruction::Mod,
                Instruction::End,
            ]
        );

        Ok(())
    }

    #[test]
    fn parse_heap() -> Result<(), ParseError> {
        let instructions = parse("TTS  TTT  LLL")?;

        assert_eq!(
            instructions,
            vec![Instruction::Store, Instruction::Load, Instruction::End]
        );

        Ok(())
    }

    #[test]
    fn parse_flow() -> Result<(), ParseError> {
        let instructions = parse("LSS STL  LST SL  LSL TTL  LTS STSL  LTT SL  LTL  LLL")?;

        assert_eq!(
            instructions,
            vec![
                Instruction::Label(1),
                Instruction::Call(0),
                Instruction::Jump(-1),
                Instruction::Jz(2),
                Instruction::Jn(0),
                Instruction::Ret,
                Instruction::End,
            ]
        );

        Ok(())
    }

    #[test]
    fn parse_io() -> Result<(), ParseError> {
        let instructions = parse("TLSS  TLST  TLTS  TLTT  LLL")?;

        assert_eq!(
            instructions,
            vec![
                Instruction::OutC,
                Instruction::OutN,
                Instruction::ReadC,
                Instruction::ReadN,
                Instruction::End,
            ]
        );

        Ok(())
    }

    #[test]
    fn comments_are_ignored() -> Result<(), ParseError> {
        let instructions = Parser::new("push  x\t\t 3?\t\n\n\n\nend.trailing_text").parse()?;

        assert_eq!(instructions, vec![Instruction::Push(-5), Instruction::End]);

        Ok(())
    }

    #[test]
    fn done_flag_set_once_at_end() -> Result<(), ParseError> {
        let mut parser = Parser::new(source("SS STL  LLL"));

        assert_eq!(parser.instruction()?, Some(Instruction::Push(1)));
        assert!(!parser.is_done());
        assert_eq!(parser.instruction()?, Some(Instruction::End));
        assert!(parser.is_done());
        assert_eq!(parser.instruction()?, None);

        Ok(())
    }

    #[test]
    fn numbers() -> Result<(), ParseError> {
        assert_eq!(parse("SS SL LLL")?[0], Instruction::Push(0));
        assert_eq!(parse("SS TL LLL")?[0], Instruction::Push(0));
        assert_eq!(parse("SS SSSTL LLL")?[0], Instruction::Push(1));

        let max = format!("SS S{}L LLL", "T".repeat(31));
        assert_eq!(parse(&max)?[0], Instruction::Push(i32::MAX));
        let min = format!("SS T{}L LLL", "T".repeat(31));
        assert_eq!(parse(&min)?[0], Instruction::Push(-i32::MAX));

        Ok(())
    }

    #[test]
    fn number_too_large() {
        let pattern = format!("SS ST{}L LLL", "S".repeat(31));

        assert!(matches!(parse_err(&pattern), ParseErrorKind::NumberTooLarge));
    }

    #[test]
    fn invalid_sign() {
        assert!(matches!(parse_err("SS L LLL"), ParseErrorKind::InvalidSign));
    }

    #[test]
    fn invalid_branches() {
        assert!(matches!(
            parse_err("ST"),
            ParseErrorKind::InvalidStackCommand(Symbol::Tab)
        ));
        assert!(matches!(
            parse_err("TSL"),
            ParseErrorKind::InvalidArithmeticGroup(Symbol::LineFeed)
        ));
        assert!(matches!(
            parse_err("TSTL"),
            ParseErrorKind::InvalidArithmeticCommand(Symbol::LineFeed)
        ));
        assert!(matches!(
            parse_err("TTL"),
            ParseErrorKind::InvalidHeapCommand(Symbol::LineFeed)
        ));
        assert!(matches!(
            parse_err("TLL"),
            ParseErrorKind::InvalidIoGroup(Symbol::LineFeed)
        ));
        assert!(matches!(
            parse_err("TLSL"),
            ParseErrorKind::InvalidOutputCommand(Symbol::LineFeed)
        ));
        assert!(matches!(
            parse_err("TLTL"),
            ParseErrorKind::InvalidInputCommand(Symbol::LineFeed)
        ));
        assert!(matches!(
            parse_err("LLS"),
            ParseErrorKind::InvalidFlowCommand(Symbol::Space)
        ));
        assert!(matches!(
            parse_err("LLT"),
            ParseErrorKind::InvalidFlowCommand(Symbol::Tab)
        ));
    }

    #[test]
    fn instructions_after_end() {
        let err = parse("LLL SLL").unwrap_err();

        assert!(matches!(err.kind, ParseErrorKind::InstructionsAfterEnd));
        assert_eq!(err.token_index, 3);
    }

    #[test]
    fn unterminated_program() {
        assert!(matches!(
            parse_err("SS STL TSSS"),
            ParseErrorKind::UnterminatedProgram
        ));
        assert!(matches!(parse_err(""), ParseErrorKind::UnterminatedProgram));
    }

    #[test]
    fn truncated_instruction() {
        assert!(matches!(
            parse_err("SS STL T"),
            ParseErrorKind::UnexpectedEndOfStream
        ));
        assert!(matches!(
            parse_err("SS STT"),
            ParseErrorKind::UnexpectedEndOfStream
        ));
    }

    #[test]
    fn iterator_stops_after_error() {
        let mut parser = Parser::new(source("TSSS ST LLL"));

        assert!(matches!(parser.next(), Some(Ok(Instruction::Add))));
        assert!(matches!(parser.next(), Some(Err(_))));
        assert!(parser.next().is_none());
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn parse_mapped_file() -> Result<(), Box<dyn std::error::Error>> {
        let file = tempfile::NamedTempFile::new()?;
        std::fs::write(file.path(), source("SS STSTL  TLST  LLL"))?;
        let file_name = file.path().to_str().unwrap();

        assert_eq!(
            Parser::from_file(file_name)?.parse()?,
            vec![Instruction::Push(5), Instruction::OutN, Instruction::End]
        );

        Ok(())
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn empty_file_is_unterminated() -> Result<(), Box<dyn std::error::Error>> {
        let file = tempfile::NamedTempFile::new()?;
        let err = Parser::from_file(file.path().to_str().unwrap())?
            .parse()
            .unwrap_err();

        assert!(matches!(err.kind, ParseErrorKind::UnterminatedProgram));
        assert_eq!(err.token_index, 0);

        Ok(())
    }
}
