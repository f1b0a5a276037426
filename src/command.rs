//! Parsing of the two-command control protocol.
//!
//! ```text
//! toggle            flip the carrier on or off
//! blast <hex>       send each nibble's bits, least significant first
//! ```

use crate::error::CommandError;

/// Longest command accepted, in bytes.
pub const MAX_COMMAND_LEN: usize = 1024;

/// Anything shorter than this cannot hold a command.
const MIN_COMMAND_LEN: usize = 2;

/// Bytes stripped from both ends of a command. NUL is not among them: it ends the command.
fn is_padding(byte: u8) -> bool {
    matches!(byte, 1..=31 | 127 | b' ')
}

fn is_separator(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t')
}

/// The meaningful part of `raw`: everything before the first NUL, without leading or trailing
/// padding.
fn content(raw: &[u8]) -> &[u8] {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let raw = &raw[..end];

    let start = raw.iter().position(|&b| !is_padding(b)).unwrap_or(raw.len());
    let end = raw.iter().rposition(|&b| !is_padding(b)).map_or(start, |i| i + 1);
    &raw[start..end]
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Verb {
    Toggle,
    Blast,
}

impl Verb {
    fn from_word(word: &[u8]) -> Option<Self> {
        match word {
            b"toggle" => Some(Verb::Toggle),
            b"blast" => Some(Verb::Blast),
            _ => None,
        }
    }
}

/// A command whose verb is known but whose arguments have not been checked yet.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Invocation<'a> {
    verb: Verb,
    args: &'a [u8],
    text: &'a [u8],
}

impl<'a> Invocation<'a> {
    /// Checks the size of `raw`, trims it and identifies the verb.
    pub fn split(raw: &'a [u8]) -> Result<Self, CommandError<'a>> {
        if raw.len() < MIN_COMMAND_LEN {
            return Err(CommandError::Empty);
        }
        if raw.len() > MAX_COMMAND_LEN {
            return Err(CommandError::TooLong(raw.len()));
        }

        let text = content(raw);
        if text.is_empty() {
            return Err(CommandError::Empty);
        }

        let word_end = text.iter().position(|&b| is_separator(b)).unwrap_or(text.len());
        let (word, rest) = text.split_at(word_end);
        let verb = Verb::from_word(word).ok_or(CommandError::Unrecognized(text))?;

        let args_start = rest.iter().position(|&b| !is_separator(b)).unwrap_or(rest.len());
        Ok(Invocation {
            verb,
            args: &rest[args_start..],
            text,
        })
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    /// The trimmed command text.
    pub fn text(&self) -> &'a [u8] {
        self.text
    }

    /// Validates the arguments for the verb.
    pub fn into_command(self) -> Result<Command<'a>, CommandError<'a>> {
        match self.verb {
            Verb::Toggle if self.args.is_empty() => Ok(Command::Toggle),
            Verb::Toggle => Err(CommandError::Unrecognized(self.text)),
            Verb::Blast => Payload::parse(self.args)
                .map(Command::Blast)
                .ok_or(CommandError::Unrecognized(self.text)),
        }
    }
}

/// A parsed command.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Toggle,
    Blast(Payload<'a>),
}

impl<'a> Command<'a> {
    pub fn parse(raw: &'a [u8]) -> Result<Self, CommandError<'a>> {
        Invocation::split(raw)?.into_command()
    }
}

/// A non-empty run of lowercase hex digits, one nibble each.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Payload<'a>(&'a [u8]);

impl<'a> Payload<'a> {
    pub fn parse(digits: &'a [u8]) -> Option<Self> {
        if digits.is_empty() || !digits.iter().all(|&b| nibble(b).is_some()) {
            return None;
        }
        Some(Payload(digits))
    }

    /// Number of nibbles.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn nibbles(&self) -> impl Iterator<Item = u8> + 'a {
        self.0.iter().filter_map(|&b| nibble(b))
    }

    /// Every bit to send, in order: for each nibble, bit 0 first and bit 3 last.
    pub fn bits(&self) -> impl Iterator<Item = bool> + 'a {
        self.nibbles()
            .flat_map(|nibble| (0..4).map(move |bit| nibble & (1 << bit) != 0))
    }
}

fn nibble(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;
    use std::vec::Vec;

    #[rstest]
    #[case(b"toggle\n")]
    #[case(b"toggle")]
    #[case(b"  toggle \r\n")]
    #[case(b"\ttoggle\x7f")]
    #[case(b"toggle\0garbage")]
    #[case(b"toggle\n\0")]
    fn parses_toggle(#[case] raw: &[u8]) {
        assert_eq!(Command::parse(raw), Ok(Command::Toggle));
    }

    #[rstest]
    #[case(b"blast a1\n", &[0xa, 0x1])]
    #[case(b"blast\t0f\n", &[0x0, 0xf])]
    #[case(b"blast   deadbeef", &[0xd, 0xe, 0xa, 0xd, 0xb, 0xe, 0xe, 0xf])]
    fn parses_blast(#[case] raw: &[u8], #[case] expected: &[u8]) {
        let Ok(Command::Blast(payload)) = Command::parse(raw) else {
            panic!("not a blast: {:?}", raw);
        };
        assert_eq!(payload.nibbles().collect::<Vec<_>>(), expected);
    }

    #[rstest]
    #[case(b"frobnicate", b"frobnicate")]
    #[case(b"Toggle\n", b"Toggle")]
    #[case(b"toggle now\n", b"toggle now")]
    #[case(b"toggles", b"toggles")]
    #[case(b"blast\n", b"blast")]
    #[case(b"blasta1", b"blasta1")]
    #[case(b"blast A1", b"blast A1")]
    #[case(b"blast a1 b2", b"blast a1 b2")]
    #[case(b"blast 0x1f", b"blast 0x1f")]
    fn rejects_unrecognized(#[case] raw: &[u8], #[case] text: &[u8]) {
        assert_eq!(Command::parse(raw), Err(CommandError::Unrecognized(text)));
    }

    #[rstest]
    #[case(b"")]
    #[case(b"t")]
    #[case(b"\n\n")]
    #[case(b" \t\r\n ")]
    #[case(b"\0toggle")]
    fn rejects_empty(#[case] raw: &[u8]) {
        assert_eq!(Command::parse(raw), Err(CommandError::Empty));
    }

    #[test]
    fn bits_are_lsb_first() {
        let payload = Payload::parse(b"a1").unwrap();
        let bits: Vec<bool> = payload.bits().collect();
        assert_eq!(
            bits,
            [false, true, false, true, true, false, false, false]
        );
    }

    #[test]
    fn longest_command_is_accepted() {
        let mut raw = b"blast ".to_vec();
        raw.resize(MAX_COMMAND_LEN, b'5');
        let Ok(Command::Blast(payload)) = Command::parse(&raw) else {
            panic!("1024 byte blast rejected");
        };
        assert_eq!(payload.len(), MAX_COMMAND_LEN - 6);
    }

    proptest! {
        #[test]
        fn short_input_is_empty(raw in proptest::collection::vec(any::<u8>(), 0..2)) {
            prop_assert_eq!(Command::parse(&raw), Err(CommandError::Empty));
        }

        #[test]
        fn long_input_is_too_long(raw in proptest::collection::vec(any::<u8>(), 1025..2048)) {
            prop_assert_eq!(Command::parse(&raw), Err(CommandError::TooLong(raw.len())));
        }

        #[test]
        fn hex_payloads_parse(hex in "[0-9a-f]{1,64}", sep in "[ \t]{1,3}", tail in "[\r\n]{0,2}") {
            let raw = std::format!("blast{}{}{}", sep, hex, tail);
            let parsed = Command::parse(raw.as_bytes());
            let Ok(Command::Blast(payload)) = parsed else {
                return Err(proptest::test_runner::TestCaseError::fail("hex payload rejected"));
            };
            prop_assert_eq!(payload.len(), hex.len());
            prop_assert_eq!(payload.bits().count(), hex.len() * 4);
        }

        #[test]
        fn non_hex_payloads_are_unrecognized(
            head in "[0-9a-f]{0,8}",
            bad in "[g-zA-Z!#x]",
            tail in "[0-9a-f]{0,8}",
        ) {
            let raw = std::format!("blast {}{}{}\n", head, bad, tail);
            prop_assert!(matches!(
                Command::parse(raw.as_bytes()),
                Err(CommandError::Unrecognized(_))
            ));
        }
    }
}
