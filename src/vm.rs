use std::collections::{BTreeMap, HashMap};
use std::io;
use thiserror::Error;
use tracing::{debug, trace};
use wasm_bindgen::JsValue;

use crate::console::{Console, Terminal};
use crate::loader::Program;
use crate::Instruction;

/// Configuration options for the virtual machine
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    suppress_output: bool,
    debug: bool,
    debug_heap: bool,
    raw_input: bool,
}

impl VmConfig {
    /// Creates a new vm config with the given arguments
    ///
    /// - `suppress_output` drop everything the program prints
    /// - `debug` log the vm state before executing an instruction
    /// - `debug_heap` log a heap dump before executing an instruction
    /// - `raw_input` read characters per key press from the terminal
    pub fn new(suppress_output: bool, debug: bool, debug_heap: bool, raw_input: bool) -> VmConfig {
        VmConfig {
            suppress_output,
            debug,
            debug_heap,
            raw_input,
        }
    }

    /// Returns a default configuration, suppressing output
    pub fn suppressed() -> VmConfig {
        VmConfig {
            suppress_output: true,
            ..VmConfig::default()
        }
    }

    /// Returns a default debug configuration
    pub fn debug() -> VmConfig {
        VmConfig {
            debug: true,
            ..VmConfig::default()
        }
    }

    /// Returns a default debug configuration that also dumps the heap
    pub fn debug_heap() -> VmConfig {
        VmConfig {
            debug: true,
            debug_heap: true,
            ..VmConfig::default()
        }
    }

    pub fn raw_input(&self) -> bool {
        self.raw_input
    }
}

#[derive(Debug, Error)]
pub enum VmErrorKind {
    #[error("stack underflow")]
    StackUnderflow,
    #[error("division by zero")]
    DivisionByZero,
    #[error("heap address {0} was never stored to")]
    UnboundHeapAddress(i32),
    #[error("label {0} is not defined")]
    UndefinedLabel(i32),
    #[error("return without a matching call")]
    CallStackUnderflow,
    #[error("execution continued after the program ended")]
    ExecutionAfterHalt,
    #[error("no termination instruction before the end of the program")]
    NoTermination,
    #[error("input ended")]
    EndOfInput,
    #[error("input `{0}` is not a 32 bit decimal integer")]
    InvalidNumberInput(String),
    #[error("{0} is not a valid character")]
    InvalidCharacter(i32),
    #[error("i/o error: {0}")]
    Io(#[source] io::Error),
}

impl VmErrorKind {
    fn throw<T>(
        self,
        instruction_pointer: usize,
        instruction: Option<Instruction>,
    ) -> Result<T, VmError> {
        Err(VmError {
            kind: self,
            instruction_pointer,
            instruction,
        })
    }
}

/// Describes the failing instruction for error messages
fn executing(instruction: &Option<Instruction>) -> String {
    match instruction {
        Some(instr) => format!(" when executing `{}`", instr),
        None => String::new(),
    }
}

/// A fatal runtime error and where it happened
#[derive(Debug, Error)]
#[error("{kind}{} at instruction {instruction_pointer}", executing(.instruction))]
pub struct VmError {
    #[source]
    pub kind: VmErrorKind,
    pub instruction_pointer: usize,
    /// The failing instruction, if the program counter pointed at one
    pub instruction: Option<Instruction>,
}

impl From<VmError> for JsValue {
    fn from(err: VmError) -> JsValue {
        JsValue::from(format!("wspace error occurred: {}", err))
    }
}

/// The root component for the virtual machine
///
/// Owns all runtime state. A program counter that walks off the program is an error, the only
/// way to stop cleanly is `End`.
pub struct Vm<C: Console = Terminal> {
    config: VmConfig,
    program: Program,
    console: C,
    stack: Vec<i32>,
    heap: HashMap<i32, i32>,
    call_stack: Vec<usize>,
    instruction_pointer: usize,
    done: bool,
}

impl Vm<Terminal> {
    /// Creates a vm talking to the process' stdin and stdout
    pub fn new(program: Program, config: VmConfig) -> Vm<Terminal> {
        let console = Terminal::new(config.raw_input);
        Vm::with_console(program, config, console)
    }
}

impl<C: Console> Vm<C> {
    pub fn with_console(program: Program, config: VmConfig, console: C) -> Vm<C> {
        Vm {
            config,
            program,
            console,
            stack: vec![],
            heap: HashMap::new(),
            call_stack: vec![],
            instruction_pointer: 0,
            done: false,
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// The operand stack, top last
    pub fn stack(&self) -> &[i32] {
        &self.stack
    }

    pub fn heap(&self) -> &HashMap<i32, i32> {
        &self.heap
    }

    pub fn call_stack(&self) -> &[usize] {
        &self.call_stack
    }

    pub fn instruction_pointer(&self) -> usize {
        self.instruction_pointer
    }

    pub fn is_halted(&self) -> bool {
        self.done
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn into_console(self) -> C {
        self.console
    }

    /// Resets the runtime state without reloading the program
    pub fn reset(&mut self) {
        self.stack.clear();
        self.heap.clear();
        self.call_stack.clear();
        self.instruction_pointer = 0;
        self.done = false;
    }

    /// Executes instructions until the program ends or fails
    pub fn run(&mut self) -> Result<(), VmError> {
        loop {
            self.step()?;
            if self.done {
                break;
            }
        }
        debug!(
            instruction_pointer = self.instruction_pointer,
            stack = self.stack.len(),
            "program halted"
        );

        Ok(())
    }

    /// Executes the instruction the program counter points at
    pub fn step(&mut self) -> Result<(), VmError> {
        let ip = self.instruction_pointer;
        if self.done {
            return VmErrorKind::ExecutionAfterHalt.throw(ip, None);
        }
        let instr = match self.program.get(ip) {
            Some(instr) => *instr,
            None => return VmErrorKind::NoTermination.throw(ip, None),
        };
        if self.config.debug {
            debug!(
                ip,
                %instr,
                stack = ?self.stack,
                call_stack = ?self.call_stack,
                "executing"
            );
        }
        if self.config.debug_heap {
            trace!(heap = ?self.generate_debug_heap_dump(), "heap dump");
        }

        match self.exec(instr) {
            Ok(next) => {
                self.instruction_pointer = next;
                Ok(())
            }
            Err(kind) => kind.throw(ip, Some(instr)),
        }
    }

    fn pop(&mut self) -> Result<i32, VmErrorKind> {
        self.stack.pop().ok_or(VmErrorKind::StackUnderflow)
    }

    fn top(&self) -> Result<i32, VmErrorKind> {
        self.stack.last().copied().ok_or(VmErrorKind::StackUnderflow)
    }

    /// Pops the right then the left operand and pushes the result
    fn arithmetic(
        &mut self,
        op: impl FnOnce(i32, i32) -> Result<i32, VmErrorKind>,
    ) -> Result<(), VmErrorKind> {
        if self.stack.len() < 2 {
            return Err(VmErrorKind::StackUnderflow);
        }
        let right = self.pop()?;
        let left = self.pop()?;
        self.stack.push(op(left, right)?);

        Ok(())
    }

    /// Labels are resolved lazily, only when a jump is taken
    fn label(&self, label: i32) -> Result<usize, VmErrorKind> {
        self.program
            .label(label)
            .ok_or(VmErrorKind::UndefinedLabel(label))
    }

    fn write(&mut self, text: &str) -> Result<(), VmErrorKind> {
        if self.config.suppress_output {
            return Ok(());
        }
        self.console.write_str(text).map_err(VmErrorKind::Io)
    }

    fn read_character(&mut self) -> Result<(), VmErrorKind> {
        let addr = self.pop()?;
        let character = self
            .console
            .read_char()
            .map_err(VmErrorKind::Io)?
            .ok_or(VmErrorKind::EndOfInput)?;
        self.heap.insert(addr, character as i32);

        Ok(())
    }

    fn read_number(&mut self) -> Result<(), VmErrorKind> {
        let addr = self.pop()?;
        let line = self
            .console
            .read_line()
            .map_err(VmErrorKind::Io)?
            .ok_or(VmErrorKind::EndOfInput)?;
        let num = match line.trim().parse::<i32>() {
            Ok(num) => num,
            Err(_) => return Err(VmErrorKind::InvalidNumberInput(line)),
        };
        self.heap.insert(addr, num);

        Ok(())
    }

    /// Executes a single instruction, returning the index of the next one
    fn exec(&mut self, instr: Instruction) -> Result<usize, VmErrorKind> {
        let next = self.instruction_pointer + 1;
        match instr {
            Instruction::Push(val) => self.stack.push(val),
            Instruction::Copy => {
                let val = self.top()?;
                self.stack.push(val);
            }
            Instruction::Swap => {
                if self.stack.len() < 2 {
                    return Err(VmErrorKind::StackUnderflow);
                }
                let len = self.stack.len();
                self.stack.swap(len - 1, len - 2);
            }
            Instruction::Pop => {
                self.pop()?;
            }
            Instruction::Add => self.arithmetic(|a, b| Ok(a.wrapping_add(b)))?,
            Instruction::Sub => self.arithmetic(|a, b| Ok(a.wrapping_sub(b)))?,
            Instruction::Mult => self.arithmetic(|a, b| Ok(a.wrapping_mul(b)))?,
            // i32 division and remainder truncate toward zero
            Instruction::Div => self.arithmetic(|a, b| match b {
                0 => Err(VmErrorKind::DivisionByZero),
                _ => Ok(a.wrapping_div(b)),
            })?,
            Instruction::Mod => self.arithmetic(|a, b| match b {
                0 => Err(VmErrorKind::DivisionByZero),
                _ => Ok(a.wrapping_rem(b)),
            })?,
            Instruction::Store => {
                if self.stack.len() < 2 {
                    return Err(VmErrorKind::StackUnderflow);
                }
                let val = self.pop()?;
                let addr = self.pop()?;
                self.heap.insert(addr, val);
            }
            Instruction::Load => {
                let addr = self.pop()?;
                match self.heap.get(&addr) {
                    Some(val) => self.stack.push(*val),
                    None => return Err(VmErrorKind::UnboundHeapAddress(addr)),
                }
            }
            Instruction::OutC => {
                let val = self.pop()?;
                let character = u32::try_from(val)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or(VmErrorKind::InvalidCharacter(val))?;
                self.write(character.encode_utf8(&mut [0; 4]))?;
            }
            Instruction::OutN => {
                let val = self.pop()?;
                self.write(&val.to_string())?;
            }
            Instruction::ReadC => self.read_character()?,
            Instruction::ReadN => self.read_number()?,
            // stripped by the loader
            Instruction::Label(_) => {}
            Instruction::Call(label) => {
                let target = self.label(label)?;
                self.call_stack.push(self.instruction_pointer);
                return Ok(target);
            }
            Instruction::Jump(label) => return self.label(label),
            Instruction::Jz(label) => {
                if self.pop()? == 0 {
                    return self.label(label);
                }
            }
            Instruction::Jn(label) => {
                if self.pop()? < 0 {
                    return self.label(label);
                }
            }
            Instruction::Ret => {
                let caller = self
                    .call_stack
                    .pop()
                    .ok_or(VmErrorKind::CallStackUnderflow)?;
                return Ok(caller + 1);
            }
            Instruction::End => self.done = true,
        }

        Ok(next)
    }

    fn generate_debug_heap_dump(&self) -> BTreeMap<i32, i32> {
        self.heap.iter().map(|(addr, val)| (*addr, *val)).collect()
    }
}
