use std::fmt::{self, Display};
use std::str::FromStr;
use thiserror::Error;
use wasm_bindgen::JsValue;

/// Intermediate representation shared by the decoder, the loader and the vm.
///
/// `Label` is a pseudo instruction: the loader consumes it and it never reaches the vm.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Instruction {
    Push(i32),
    Copy,
    Swap,
    Pop,
    Add,
    Sub,
    Mult,
    Div,
    Mod,
    Store,
    Load,
    OutC,
    OutN,
    ReadC,
    ReadN,
    Label(i32),
    Call(i32),
    Jump(i32),
    Jz(i32),
    Jn(i32),
    Ret,
    End,
}

impl Instruction {
    /// The listing mnemonic of this instruction
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Push(_) => "Push",
            Instruction::Copy => "Copy",
            Instruction::Swap => "Swap",
            Instruction::Pop => "Pop",
            Instruction::Add => "Add",
            Instruction::Sub => "Sub",
            Instruction::Mult => "Mult",
            Instruction::Div => "Div",
            Instruction::Mod => "Mod",
            Instruction::Store => "St",
            Instruction::Load => "Ld",
            Instruction::OutC => "OutC",
            Instruction::OutN => "OutN",
            Instruction::ReadC => "ReadC",
            Instruction::ReadN => "ReadN",
            Instruction::Label(_) => "Label",
            Instruction::Call(_) => "Call",
            Instruction::Jump(_) => "Jump",
            Instruction::Jz(_) => "Jz",
            Instruction::Jn(_) => "Jn",
            Instruction::Ret => "Ret",
            Instruction::End => "End",
        }
    }

    /// The numeric operand, for the instructions that carry one
    pub fn operand(&self) -> Option<i32> {
        match *self {
            Instruction::Push(n)
            | Instruction::Label(n)
            | Instruction::Call(n)
            | Instruction::Jump(n)
            | Instruction::Jz(n)
            | Instruction::Jn(n) => Some(n),
            _ => None,
        }
    }

    fn from_parts(mnemonic: &str, operand: Option<i32>) -> Result<Instruction, AssemblyErrorKind> {
        let with_operand = |build: fn(i32) -> Instruction| match operand {
            Some(n) => Ok(build(n)),
            None => Err(AssemblyErrorKind::MissingOperand(mnemonic.to_string())),
        };
        let bare = |instr: Instruction| match operand {
            Some(n) => Err(AssemblyErrorKind::UnexpectedOperand(mnemonic.to_string(), n)),
            None => Ok(instr),
        };

        match mnemonic {
            "Push" => with_operand(Instruction::Push),
            "Copy" => bare(Instruction::Copy),
            "Swap" => bare(Instruction::Swap),
            "Pop" => bare(Instruction::Pop),
            "Add" => bare(Instruction::Add),
            "Sub" => bare(Instruction::Sub),
            "Mult" => bare(Instruction::Mult),
            "Div" => bare(Instruction::Div),
            "Mod" => bare(Instruction::Mod),
            "St" => bare(Instruction::Store),
            "Ld" => bare(Instruction::Load),
            "OutC" => bare(Instruction::OutC),
            "OutN" => bare(Instruction::OutN),
            "ReadC" => bare(Instruction::ReadC),
            "ReadN" => bare(Instruction::ReadN),
            "Label" => with_operand(Instruction::Label),
            "Call" => with_operand(Instruction::Call),
            "Jump" => with_operand(Instruction::Jump),
            "Jz" => with_operand(Instruction::Jz),
            "Jn" => with_operand(Instruction::Jn),
            "Ret" => bare(Instruction::Ret),
            "End" => bare(Instruction::End),
            _ => Err(AssemblyErrorKind::UnknownMnemonic(mnemonic.to_string())),
        }
    }
}

/// Renders one listing line, e.g. `Push -7` or `St`
impl Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operand() {
            Some(n) => write!(f, "{} {}", self.mnemonic(), n),
            None => write!(f, "{}", self.mnemonic()),
        }
    }
}

impl FromStr for Instruction {
    type Err = AssemblyErrorKind;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (mnemonic, operand) = match line.split_once(' ') {
            Some((mnemonic, rest)) => {
                let rest = rest.trim();
                let operand = rest
                    .parse::<i32>()
                    .map_err(|_| AssemblyErrorKind::InvalidOperand(rest.to_string()))?;
                (mnemonic, Some(operand))
            }
            None => (line, None),
        };

        Instruction::from_parts(mnemonic, operand)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssemblyErrorKind {
    #[error("unknown mnemonic `{0}`")]
    UnknownMnemonic(String),
    #[error("`{0}` requires an operand")]
    MissingOperand(String),
    #[error("`{0}` takes no operand, but got {1}")]
    UnexpectedOperand(String, i32),
    #[error("operand `{0}` is not a 32 bit decimal integer")]
    InvalidOperand(String),
}

impl AssemblyErrorKind {
    pub(crate) fn throw<T>(self, line: usize) -> Result<T, AssemblyError> {
        Err(AssemblyError { kind: self, line })
    }
}

/// A malformed line in an instruction listing
#[derive(Debug, Error, PartialEq, Eq)]
#[error("listing line {line}: {kind}")]
pub struct AssemblyError {
    pub kind: AssemblyErrorKind,
    /// 1-based line number in the listing
    pub line: usize,
}

impl From<AssemblyError> for JsValue {
    fn from(err: AssemblyError) -> JsValue {
        JsValue::from(format!("wspace error occurred: {}", err))
    }
}
