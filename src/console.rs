#[cfg(not(target_arch = "wasm32"))]
use getch::Getch;
use std::io::{self, BufRead, Cursor, Write};

/// Where the vm reads its input from and writes its output to
pub trait Console {
    fn write_str(&mut self, text: &str) -> io::Result<()>;

    /// One character of input, `None` once input is exhausted
    fn read_char(&mut self) -> io::Result<Option<char>>;

    /// One line of input without its line terminator, `None` once input is exhausted
    fn read_line(&mut self) -> io::Result<Option<String>>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Decodes one utf-8 encoded character, pulling as many bytes as its lead byte announces
fn decode_utf8_char(
    mut next_byte: impl FnMut() -> io::Result<Option<u8>>,
) -> io::Result<Option<char>> {
    let first = match next_byte()? {
        Some(byte) => byte,
        None => return Ok(None),
    };
    let width = match first {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => 0,
    };
    let invalid = || io::Error::new(io::ErrorKind::InvalidData, "input is not valid utf-8");
    if width == 0 {
        return Err(invalid());
    }
    let mut buf = [first, 0, 0, 0];
    for byte in buf.iter_mut().take(width).skip(1) {
        *byte = next_byte()?.ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "input ended inside a character")
        })?;
    }
    match std::str::from_utf8(&buf[..width]) {
        Ok(text) => Ok(text.chars().next()),
        Err(_) => Err(invalid()),
    }
}

fn read_utf8_char(reader: &mut impl BufRead) -> io::Result<Option<char>> {
    decode_utf8_char(|| {
        let mut byte = [0u8; 1];
        match reader.read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    })
}

fn trim_line_end(mut line: String) -> String {
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    line
}

/// The process' standard input and output
#[derive(Debug, Default)]
pub struct Terminal {
    raw_input: bool,
}

impl Terminal {
    /// With `raw_input` set, single characters are read per key press without waiting for a
    /// line to be entered, and echoed back
    pub fn new(raw_input: bool) -> Terminal {
        Terminal { raw_input }
    }
}

impl Console for Terminal {
    fn write_str(&mut self, text: &str) -> io::Result<()> {
        let mut out = io::stdout();
        out.write_all(text.as_bytes())?;
        out.flush()
    }

    fn read_char(&mut self) -> io::Result<Option<char>> {
        self.flush()?;
        #[cfg(not(target_arch = "wasm32"))]
        if self.raw_input {
            // a non-ascii key press arrives as several bytes
            let keys = Getch::new();
            let character = decode_utf8_char(|| keys.getch().map(Some))?;
            if let Some(character) = character {
                self.write_str(character.encode_utf8(&mut [0; 4]))?;
            }
            return Ok(character);
        }
        read_utf8_char(&mut io::stdin().lock())
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        self.flush()?;
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(trim_line_end(line)))
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}

/// In memory input and captured output
#[derive(Debug, Default, Clone)]
pub struct BufferedConsole {
    input: Cursor<Vec<u8>>,
    output: String,
}

impl BufferedConsole {
    pub fn new(input: &str) -> BufferedConsole {
        BufferedConsole {
            input: Cursor::new(input.as_bytes().to_vec()),
            output: String::new(),
        }
    }

    /// Everything written so far
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn into_output(self) -> String {
        self.output
    }
}

impl Console for BufferedConsole {
    fn write_str(&mut self, text: &str) -> io::Result<()> {
        self.output.push_str(text);
        Ok(())
    }

    fn read_char(&mut self) -> io::Result<Option<char>> {
        read_utf8_char(&mut self.input)
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(trim_line_end(line)))
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_utf8_char, BufferedConsole, Console};
    use std::io;

    #[test]
    fn buffered_reads() -> io::Result<()> {
        let mut console = BufferedConsole::new("aé\n-12\r\nlast");

        assert_eq!(console.read_char()?, Some('a'));
        assert_eq!(console.read_char()?, Some('é'));
        assert_eq!(console.read_char()?, Some('\n'));
        assert_eq!(console.read_line()?, Some("-12".to_string()));
        assert_eq!(console.read_line()?, Some("last".to_string()));
        assert_eq!(console.read_line()?, None);
        assert_eq!(console.read_char()?, None);

        Ok(())
    }

    #[test]
    fn buffered_writes() -> io::Result<()> {
        let mut console = BufferedConsole::default();
        console.write_str("8")?;
        console.write_str("\n")?;

        assert_eq!(console.output(), "8\n");
        assert_eq!(console.into_output(), "8\n");

        Ok(())
    }

    #[test]
    fn invalid_utf8_input() {
        let mut console = BufferedConsole {
            input: io::Cursor::new(vec![0xff]),
            output: String::new(),
        };
        let err = console.read_char().unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn multi_byte_key_press() -> io::Result<()> {
        let mut keys = "üa".bytes();
        assert_eq!(decode_utf8_char(|| Ok(keys.next()))?, Some('ü'));
        assert_eq!(decode_utf8_char(|| Ok(keys.next()))?, Some('a'));
        assert_eq!(decode_utf8_char(|| Ok(keys.next()))?, None);

        let mut truncated = vec![0xe2u8, 0x82].into_iter();
        let err = decode_utf8_char(|| Ok(truncated.next())).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

        Ok(())
    }
}
