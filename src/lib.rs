//! A whitespace toolchain: decode whitespace source into instructions, load them into an
//! executable program, run it on a stack vm, and render instructions back as listing text or
//! whitespace source.

pub mod console;
pub mod ir;
pub mod loader;
pub mod vm;
pub mod wasm;
pub mod ws;

pub use console::{BufferedConsole, Console, Terminal};
pub use ir::{AssemblyError, AssemblyErrorKind, Instruction};
pub use loader::{write_listing, Program};
pub use vm::{Vm, VmConfig, VmError, VmErrorKind};
pub use ws::{encode, ParseError, ParseErrorKind, Parser};
