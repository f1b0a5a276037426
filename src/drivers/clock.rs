//! The PWM clock manager.
//!
//! Both registers ignore any write whose top byte is not [`PASSWORD`], so every write built here
//! carries it. The layout comes from the BCM2835 audio clocks errata sheet.

use tock_registers::{register_bitfields, LocalRegisterCopy};

use super::{RegisterBus, RegisterId};
use crate::config::ClockConfig;
use crate::error::InitError;

/// Clock manager password, bits 24..32 of every clock manager write.
pub const PASSWORD: u32 = 0x5a;

register_bitfields! { u32,
    pub CM_PWMCTL [
        SRC OFFSET(0) NUMBITS(4) [],
        ENAB OFFSET(4) NUMBITS(1) [],
        KILL OFFSET(5) NUMBITS(1) [],
        BUSY OFFSET(7) NUMBITS(1) [],
        FLIP OFFSET(8) NUMBITS(1) [],
        MASH OFFSET(9) NUMBITS(2) [],
        PASSWD OFFSET(24) NUMBITS(8) []
    ],
    pub CM_PWMDIV [
        DIVF OFFSET(0) NUMBITS(12) [],
        DIVI OFFSET(12) NUMBITS(12) [],
        PASSWD OFFSET(24) NUMBITS(8) []
    ]
}

/// Clock generator sources selectable through `CM_PWMCTL.SRC`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClockSource {
    Ground = 0,
    Oscillator = 1,
    TestDebug0 = 2,
    TestDebug1 = 3,
    PllA = 4,
    PllC = 5,
    PllD = 6,
    HdmiAux = 7,
}

impl ClockSource {
    /// Nominal frequency of the source on a stock board, if it has a fixed one.
    pub const fn nominal_hz(self) -> Option<u32> {
        match self {
            ClockSource::Oscillator => Some(19_200_000),
            ClockSource::PllC => Some(1_000_000_000),
            ClockSource::PllD => Some(500_000_000),
            ClockSource::HdmiAux => Some(216_000_000),
            ClockSource::Ground
            | ClockSource::TestDebug0
            | ClockSource::TestDebug1
            | ClockSource::PllA => None,
        }
    }
}

type Control = LocalRegisterCopy<u32, CM_PWMCTL::Register>;
type Divisor = LocalRegisterCopy<u32, CM_PWMDIV::Register>;

fn read_control<B: RegisterBus>(bus: &mut B) -> Control {
    Control::new(bus.read(RegisterId::CmPwmCtl))
}

fn write_control<B: RegisterBus>(bus: &mut B, mut ctl: Control) {
    ctl.modify(CM_PWMCTL::PASSWD.val(PASSWORD));
    bus.write(RegisterId::CmPwmCtl, ctl.get());
}

/// Stops the clock generator. The generator only actually stops once `BUSY` drops, see
/// [`wait_while_busy`].
pub fn disable<B: RegisterBus>(bus: &mut B) {
    let mut ctl = read_control(bus);
    ctl.modify(CM_PWMCTL::ENAB::CLEAR);
    write_control(bus, ctl);
}

/// Polls `CM_PWMCTL` until `BUSY` clears, at most `limit` times. Returns the number of polls
/// that saw the flag still set.
pub fn wait_while_busy<B: RegisterBus>(bus: &mut B, limit: u32) -> Result<u32, InitError> {
    for polls in 0..limit {
        if !read_control(bus).is_set(CM_PWMCTL::BUSY) {
            if polls > 0 {
                log::debug!("clock manager idle after {} polls", polls);
            }
            return Ok(polls);
        }
        core::hint::spin_loop();
    }

    log::error!("clock manager still busy after {} polls", limit);
    Err(InitError::ClockBusyTimeout { polls: limit })
}

/// Programs the divisor and the source while the generator is stopped. `ENAB` is left as is.
pub fn program<B: RegisterBus>(bus: &mut B, config: &ClockConfig) {
    let mut div = Divisor::new(bus.read(RegisterId::CmPwmDiv));
    div.modify(
        CM_PWMDIV::DIVI.val(config.divi)
            + CM_PWMDIV::DIVF.val(config.divf)
            + CM_PWMDIV::PASSWD.val(PASSWORD),
    );
    bus.write(RegisterId::CmPwmDiv, div.get());

    let mut ctl = read_control(bus);
    ctl.modify(CM_PWMCTL::SRC.val(config.source as u32) + CM_PWMCTL::MASH.val(config.mash));
    write_control(bus, ctl);

    log::debug!(
        "clock source {:?}, divisor {}+{}/4096, mash {}",
        config.source,
        config.divi,
        config.divf,
        config.mash
    );
}

/// Starts the clock generator again.
pub fn enable<B: RegisterBus>(bus: &mut B) {
    let mut ctl = read_control(bus);
    ctl.modify(CM_PWMCTL::ENAB::SET);
    write_control(bus, ctl);
}
