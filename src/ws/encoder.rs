use crate::ws::lexer::Symbol;
use crate::Instruction;

use Symbol::{LineFeed, Space, Tab};

/// Sign, minimal big endian magnitude and terminator. Zero has an empty magnitude.
pub fn encode_number(number: i32) -> Vec<Symbol> {
    let mut symbols = vec![if number < 0 { Tab } else { Space }];
    let magnitude = number.unsigned_abs();
    let width = u32::BITS - magnitude.leading_zeros();
    for place in (0..width).rev() {
        symbols.push(if (magnitude >> place) & 1 == 1 { Tab } else { Space });
    }
    symbols.push(LineFeed);

    symbols
}

/// The symbols of a single instruction, operand included
pub fn encode_instruction(instr: &Instruction) -> Vec<Symbol> {
    let mut symbols = match instr {
        Instruction::Push(_) => vec![Space, Space],
        Instruction::Copy => vec![Space, LineFeed, Space],
        Instruction::Swap => vec![Space, LineFeed, Tab],
        Instruction::Pop => vec![Space, LineFeed, LineFeed],
        Instruction::Add => vec![Tab, Space, Space, Space],
        Instruction::Sub => vec![Tab, Space, Space, Tab],
        Instruction::Mult => vec![Tab, Space, Space, LineFeed],
        Instruction::Div => vec![Tab, Space, Tab, Space],
        Instruction::Mod => vec![Tab, Space, Tab, Tab],
        Instruction::Store => vec![Tab, Tab, Space],
        Instruction::Load => vec![Tab, Tab, Tab],
        Instruction::OutC => vec![Tab, LineFeed, Space, Space],
        Instruction::OutN => vec![Tab, LineFeed, Space, Tab],
        Instruction::ReadC => vec![Tab, LineFeed, Tab, Space],
        Instruction::ReadN => vec![Tab, LineFeed, Tab, Tab],
        Instruction::Label(_) => vec![LineFeed, Space, Space],
        Instruction::Call(_) => vec![LineFeed, Space, Tab],
        Instruction::Jump(_) => vec![LineFeed, Space, LineFeed],
        Instruction::Jz(_) => vec![LineFeed, Tab, Space],
        Instruction::Jn(_) => vec![LineFeed, Tab, Tab],
        Instruction::Ret => vec![LineFeed, Tab, LineFeed],
        Instruction::End => vec![LineFeed, LineFeed, LineFeed],
    };
    if let Some(operand) = instr.operand() {
        symbols.extend(encode_number(operand));
    }

    symbols
}

/// Renders instructions as whitespace source
pub fn encode<'a>(instructions: impl IntoIterator<Item = &'a Instruction>) -> String {
    instructions
        .into_iter()
        .flat_map(encode_instruction)
        .map(|symbol| symbol.as_byte() as char)
        .collect()
}
