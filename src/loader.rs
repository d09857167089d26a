use std::collections::HashMap;
use std::fmt::{self, Display};
use tracing::debug;

use crate::ir::{AssemblyError, Instruction};

/// An executable instruction sequence and its label table.
///
/// Labels are not checked for existence here. A jump to an undeclared label only fails once the
/// vm actually takes it.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Program {
    instructions: Vec<Instruction>,
    labels: HashMap<i32, usize>,
}

impl Program {
    /// Strips `Label` directives, pointing each at the index of the instruction following it.
    /// A label declared twice keeps its last position.
    pub fn load(instructions: impl IntoIterator<Item = Instruction>) -> Program {
        let mut program = Program::default();
        for instr in instructions {
            match instr {
                Instruction::Label(label) => {
                    program.labels.insert(label, program.instructions.len());
                }
                _ => program.instructions.push(instr),
            }
        }
        debug!(
            instructions = program.instructions.len(),
            labels = program.labels.len(),
            "loaded program"
        );

        program
    }

    /// Parses an instruction listing, one instruction per line. Blank lines are skipped.
    pub fn parse_listing(listing: &str) -> Result<Vec<Instruction>, AssemblyError> {
        let mut instructions = vec![];
        for (index, line) in listing.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<Instruction>() {
                Ok(instr) => instructions.push(instr),
                Err(kind) => return kind.throw(index + 1),
            }
        }

        Ok(instructions)
    }

    pub fn from_listing(listing: &str) -> Result<Program, AssemblyError> {
        Ok(Program::load(Program::parse_listing(listing)?))
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn labels(&self) -> &HashMap<i32, usize> {
        &self.labels
    }

    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Instruction index a label points at, if it was declared
    pub fn label(&self, label: i32) -> Option<usize> {
        self.labels.get(&label).copied()
    }
}

/// Writes one instruction per line
pub fn write_listing<'a>(
    f: &mut impl fmt::Write,
    instructions: impl IntoIterator<Item = &'a Instruction>,
) -> fmt::Result {
    for instr in instructions {
        writeln!(f, "{}", instr)?;
    }
    Ok(())
}

/// Renders the program as a listing again. Labels are placed before the instruction they point
/// at, in ascending order.
impl Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut labels = self.labels.iter().collect::<Vec<_>>();
        labels.sort_by_key(|(label, index)| (**index, **label));
        let mut labels = labels.into_iter().peekable();
        for (index, instr) in self.instructions.iter().enumerate() {
            while let Some((label, _)) = labels.next_if(|(_, at)| **at == index) {
                writeln!(f, "{}", Instruction::Label(*label))?;
            }
            writeln!(f, "{}", instr)?;
        }
        for (label, _) in labels {
            writeln!(f, "{}", Instruction::Label(*label))?;
        }
        Ok(())
    }
}
