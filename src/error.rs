use core::fmt::{self, Display};

use crate::drivers::RegisterId;

/// Failures that prevent the blaster from loading. Nothing is transmitted after one of these.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InitError {
    /// A register could not be mapped.
    InitializationFailed { register: RegisterId },
    /// The clock manager never left its busy state.
    ClockBusyTimeout { polls: u32 },
    Config(ConfigError),
}

impl Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::InitializationFailed { register } => {
                write!(f, "initialization failed: could not map the {} register", register.name())
            }
            InitError::ClockBusyTimeout { polls } => {
                write!(f, "clock manager still busy after {} polls", polls)
            }
            InitError::Config(e) => write!(f, "invalid configuration: {}", e),
        }
    }
}

impl core::error::Error for InitError {}

impl From<ConfigError> for InitError {
    fn from(e: ConfigError) -> Self {
        InitError::Config(e)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    Divisor(u32),
    Fraction(u32),
    Mash(u32),
    ZeroRange,
    DutyAboveRange { data: u32, range: u32 },
    ZeroBitPeriod,
    ZeroPollLimit,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Divisor(divi) => write!(f, "divisor {} outside 2..=4095", divi),
            ConfigError::Fraction(divf) => write!(f, "divisor fraction {} above 4095", divf),
            ConfigError::Mash(mash) => write!(f, "mash {} above 3", mash),
            ConfigError::ZeroRange => write!(f, "pwm range is 0"),
            ConfigError::DutyAboveRange { data, range } => {
                write!(f, "pwm data {} above range {}", data, range)
            }
            ConfigError::ZeroBitPeriod => write!(f, "bit period is 0"),
            ConfigError::ZeroPollLimit => write!(f, "busy poll limit is 0"),
        }
    }
}

impl core::error::Error for ConfigError {}

/// A rejected command. The only side effect a rejected command may have had is turning the
/// carrier off.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CommandError<'a> {
    /// Nothing to act on.
    Empty,
    /// The command was longer than [`crate::command::MAX_COMMAND_LEN`] bytes.
    TooLong(usize),
    /// Not a known command, or a `blast` with a bad payload. Holds the offending text, cut at
    /// the first NUL and trimmed of surrounding whitespace and control bytes.
    Unrecognized(&'a [u8]),
}

impl Display for CommandError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Empty => write!(f, "empty command"),
            CommandError::TooLong(len) => write!(f, "command too long ({} bytes)", len),
            CommandError::Unrecognized(text) => {
                write!(f, "unrecognized command \"{}\"", text.escape_ascii())
            }
        }
    }
}

impl core::error::Error for CommandError<'_> {}

const EBUSY: i32 = 16;
const EINVAL: i32 = 22;
const E2BIG: i32 = 7;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeviceError<'a> {
    /// Another session already holds the device.
    Busy,
    Command(CommandError<'a>),
}

impl DeviceError<'_> {
    /// The negative errno a character device would hand back for this error.
    pub fn code(&self) -> i32 {
        match self {
            DeviceError::Busy => -EBUSY,
            DeviceError::Command(CommandError::TooLong(_)) => -E2BIG,
            DeviceError::Command(_) => -EINVAL,
        }
    }
}

impl Display for DeviceError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::Busy => write!(f, "device busy"),
            DeviceError::Command(e) => Display::fmt(e, f),
        }
    }
}

impl core::error::Error for DeviceError<'_> {}

impl<'a> From<CommandError<'a>> for DeviceError<'a> {
    fn from(e: CommandError<'a>) -> Self {
        DeviceError::Command(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::ToString;

    #[test]
    fn unrecognized_text_is_escaped() {
        let err = CommandError::Unrecognized(b"frob\x01nicate");
        assert_eq!(err.to_string(), "unrecognized command \"frob\\x01nicate\"");
    }

    #[test]
    fn device_errors_map_to_errno() {
        assert_eq!(DeviceError::Busy.code(), -16);
        assert_eq!(DeviceError::Command(CommandError::Empty).code(), -22);
        assert_eq!(DeviceError::Command(CommandError::TooLong(2000)).code(), -7);
        assert_eq!(DeviceError::Command(CommandError::Unrecognized(b"x")).code(), -22);
    }
}
