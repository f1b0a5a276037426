//! The command engine: turns control-protocol commands into carrier timing.

use core::fmt;

use embedded_hal::delay::DelayNs;

use crate::blaster::Blaster;
use crate::command::{Command, Invocation, Payload, Verb};
use crate::drivers::RegisterBus;
use crate::error::CommandError;

/// Whether the carrier is enabled, as reported to readers of the device.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    On,
    Off,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::On => "on",
            Status::Off => "off",
        }
    }

    /// The status line handed to readers, including its NUL terminator.
    pub fn message(self) -> &'static [u8] {
        match self {
            Status::On => b"pwm on\n\0",
            Status::Off => b"pwm off\n\0",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pwm {}", self.as_str())
    }
}

impl<B: RegisterBus, D: DelayNs> Blaster<B, D> {
    /// Parses and runs one command.
    ///
    /// Size and verb errors have no effect on the device. A `blast` with a bad payload turns the
    /// carrier off before it is rejected.
    pub fn handle_command<'a>(&mut self, raw: &'a [u8]) -> Result<(), CommandError<'a>> {
        let invocation = Invocation::split(raw)?;
        let verb = invocation.verb();

        match invocation.into_command() {
            Ok(command) => {
                self.execute(&command);
                Ok(())
            }
            Err(e) => {
                if verb == Verb::Blast {
                    self.set_carrier(false);
                }
                log::warn!("rejected command: {}", e);
                Err(e)
            }
        }
    }

    pub fn execute(&mut self, command: &Command<'_>) {
        match command {
            Command::Toggle => self.toggle(),
            Command::Blast(payload) => self.blast(payload),
        }
    }

    /// Flips the carrier.
    pub fn toggle(&mut self) {
        let on = !self.active;
        self.set_carrier(on);
        self.check_status("just after write");
        log::info!("carrier {}", if on { "on" } else { "off" });
    }

    /// Sends `payload` one bit per period, then leaves the carrier off. Blocks for the whole
    /// transmission.
    pub fn blast(&mut self, payload: &Payload<'_>) {
        let period = self.config.bit_period_us;

        self.set_carrier(false);
        for bit in payload.bits() {
            self.set_carrier(bit);
            self.delay.delay_us(period);
        }
        self.set_carrier(false);

        self.check_status("after blast");
        log::info!("blasted {} nibbles", payload.len());
    }

    pub fn status(&self) -> Status {
        if self.active {
            Status::On
        } else {
            Status::Off
        }
    }
}
