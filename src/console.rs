//! Line assembly for the serial console that feeds commands to the device.

use heapless::Vec;

use crate::command::MAX_COMMAND_LEN;

const BACKSPACE: u8 = 0x08;
const DEL: u8 = 127;

/// What the console should do after a byte was pushed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Input {
    /// Print the byte back.
    Echo(u8),
    /// Erase the last character on the terminal.
    Erase,
    /// A line is complete; fetch it with [`LineBuffer::line`].
    Line,
    /// The line no longer fits. Further bytes are dropped until the line ends.
    Overflow,
    /// Nothing to do.
    Ignored,
}

impl Input {
    /// Terminal bytes that render this input.
    pub fn echo(self) -> &'static [u8] {
        match self {
            Input::Erase => b"\x08 \x08",
            Input::Line => b"\n",
            Input::Echo(_) | Input::Overflow | Input::Ignored => b"",
        }
    }
}

pub struct LineBuffer {
    buf: Vec<u8, MAX_COMMAND_LEN>,
    overflowed: bool,
}

impl LineBuffer {
    pub const fn new() -> Self {
        LineBuffer {
            buf: Vec::new(),
            overflowed: false,
        }
    }

    pub fn push(&mut self, byte: u8) -> Input {
        match byte {
            b'\r' | b'\n' => Input::Line,
            DEL | BACKSPACE => {
                if self.buf.pop().is_some() {
                    Input::Erase
                } else {
                    Input::Ignored
                }
            }
            _ if self.overflowed => Input::Ignored,
            _ => match self.buf.push(byte) {
                Ok(()) => Input::Echo(byte),
                Err(_) => {
                    self.overflowed = true;
                    Input::Overflow
                }
            },
        }
    }

    /// The current line, or `None` when it overflowed.
    pub fn line(&self) -> Option<&[u8]> {
        if self.overflowed {
            None
        } else {
            Some(&self.buf)
        }
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.overflowed = false;
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(line: &mut LineBuffer, bytes: &[u8]) -> std::vec::Vec<Input> {
        bytes.iter().map(|&b| line.push(b)).collect()
    }

    #[test]
    fn assembles_a_line() {
        let mut line = LineBuffer::new();
        let inputs = feed(&mut line, b"toggle\r");
        assert_eq!(inputs.last(), Some(&Input::Line));
        assert_eq!(inputs[0], Input::Echo(b't'));
        assert_eq!(line.line(), Some(&b"toggle"[..]));

        line.clear();
        assert_eq!(line.line(), Some(&b""[..]));
    }

    #[test]
    fn delete_erases() {
        let mut line = LineBuffer::new();
        feed(&mut line, b"blast ax");
        assert_eq!(line.push(DEL), Input::Erase);
        assert_eq!(Input::Erase.echo(), b"\x08 \x08");
        feed(&mut line, b"1");
        assert_eq!(line.line(), Some(&b"blast a1"[..]));
    }

    #[test]
    fn delete_on_empty_line_is_ignored() {
        let mut line = LineBuffer::new();
        assert_eq!(line.push(BACKSPACE), Input::Ignored);
    }

    #[test]
    fn overflow_drops_the_line() {
        let mut line = LineBuffer::new();
        for _ in 0..MAX_COMMAND_LEN {
            assert_eq!(line.push(b'f'), Input::Echo(b'f'));
        }
        assert_eq!(line.push(b'f'), Input::Overflow);
        assert_eq!(line.push(b'f'), Input::Ignored);
        assert_eq!(line.push(b'\n'), Input::Line);
        assert_eq!(line.line(), None);

        line.clear();
        feed(&mut line, b"toggle");
        assert_eq!(line.line(), Some(&b"toggle"[..]));
    }
}
