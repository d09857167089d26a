use wasm_bindgen::prelude::wasm_bindgen;
use wasm_bindgen::JsValue;

use crate::console::BufferedConsole;
use crate::loader::{write_listing, Program};
use crate::vm::{Vm, VmConfig};
use crate::ws::{encode, Parser};

/// Decodes whitespace source into an instruction listing
#[wasm_bindgen]
pub fn decode_source(source: &str) -> Result<String, JsValue> {
    let instructions = Parser::new(source).parse()?;
    let mut listing = String::new();
    write_listing(&mut listing, &instructions).map_err(|err| JsValue::from(err.to_string()))?;

    Ok(listing)
}

/// Renders an instruction listing as whitespace source
#[wasm_bindgen]
pub fn encode_listing(listing: &str) -> Result<String, JsValue> {
    let instructions = Program::parse_listing(listing)?;

    Ok(encode(&instructions))
}

/// Decodes and runs whitespace source, feeding it `input` and returning everything it printed
#[wasm_bindgen]
pub fn execute_source(source: &str, input: &str) -> Result<String, JsValue> {
    let program = Program::load(Parser::new(source).parse()?);
    let mut vm = Vm::with_console(program, VmConfig::default(), BufferedConsole::new(input));
    vm.run()?;

    Ok(vm.into_console().into_output())
}

#[cfg(test)]
mod tests {
    use super::{decode_source, encode_listing, execute_source};

    // building a JsValue outside of wasm aborts, so only successful calls are checked here
    #[test]
    fn decode_then_encode() {
        let source = "  \t\t \t\n\t\n \t\n\n\n";
        let listing = decode_source(source).ok();

        assert_eq!(listing.as_deref(), Some("Push -5\nOutN\nEnd\n"));
        assert_eq!(encode_listing("Push -5\nOutN\nEnd\n").ok().as_deref(), Some(source));
    }

    #[test]
    fn execute_with_input() {
        let program = encode_listing("Push 0\nReadN\nPush 0\nLd\nPush 2\nMult\nOutN\nEnd")
            .ok()
            .unwrap_or_default();
        let output = execute_source(&program, "21\n").ok();

        assert_eq!(output.as_deref(), Some("42"));
    }
}
