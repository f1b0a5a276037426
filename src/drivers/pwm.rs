//! PWM controller: channel 1 control flags and the status register.
//!
//! Layouts follow section 9 of the BCM2835 ARM Peripherals manual.

use core::fmt;

use tock_registers::fields::Field;
use tock_registers::{register_bitfields, LocalRegisterCopy};

use super::{RegisterBus, RegisterId};

register_bitfields! { u32,
    pub CTL [
        PWEN1 OFFSET(0) NUMBITS(1) [],
        MODE1 OFFSET(1) NUMBITS(1) [],
        RPTL1 OFFSET(2) NUMBITS(1) [],
        SBIT1 OFFSET(3) NUMBITS(1) [],
        POLA1 OFFSET(4) NUMBITS(1) [],
        USEF1 OFFSET(5) NUMBITS(1) [],
        CLRF1 OFFSET(6) NUMBITS(1) [],
        MSEN1 OFFSET(7) NUMBITS(1) [],
        PWEN2 OFFSET(8) NUMBITS(1) [],
        MODE2 OFFSET(9) NUMBITS(1) [],
        RPTL2 OFFSET(10) NUMBITS(1) [],
        SBIT2 OFFSET(11) NUMBITS(1) [],
        POLA2 OFFSET(12) NUMBITS(1) [],
        USEF2 OFFSET(13) NUMBITS(1) [],
        MSEN2 OFFSET(15) NUMBITS(1) []
    ],
    pub STA [
        FULL1 OFFSET(0) NUMBITS(1) [],
        EMPT1 OFFSET(1) NUMBITS(1) [],
        WERR1 OFFSET(2) NUMBITS(1) [],
        RERR1 OFFSET(3) NUMBITS(1) [],
        GAPO1 OFFSET(4) NUMBITS(1) [],
        GAPO2 OFFSET(5) NUMBITS(1) [],
        GAPO3 OFFSET(6) NUMBITS(1) [],
        GAPO4 OFFSET(7) NUMBITS(1) [],
        BERR OFFSET(8) NUMBITS(1) [],
        STA1 OFFSET(9) NUMBITS(1) [],
        STA2 OFFSET(10) NUMBITS(1) [],
        STA3 OFFSET(11) NUMBITS(1) [],
        STA4 OFFSET(12) NUMBITS(1) []
    ]
}

/// Builds the `CTL` word that gates the carrier on or off.
///
/// Channel 1 always runs in plain mark-space PWM mode from the data register: no serializer, no
/// FIFO, normal polarity, silence low, no repeat. Those flags are asserted again on every write
/// and only `PWEN1` follows `carrier_on`. Channel 2's bits are carried over from `current`.
pub fn control_word(current: u32, carrier_on: bool) -> u32 {
    let mut ctl = LocalRegisterCopy::<u32, CTL::Register>::new(current);
    ctl.modify(
        CTL::MSEN1::SET
            + CTL::CLRF1::CLEAR
            + CTL::USEF1::CLEAR
            + CTL::POLA1::CLEAR
            + CTL::SBIT1::CLEAR
            + CTL::RPTL1::CLEAR
            + CTL::MODE1::CLEAR
            + CTL::PWEN1.val(carrier_on as u32),
    );
    ctl.get()
}

/// Error conditions latched in `STA`. Writing a one clears them.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Fault {
    FifoWrite,
    FifoRead,
    Gap,
    Bus,
}

impl Fault {
    pub const ALL: [Fault; 4] = [Fault::FifoWrite, Fault::FifoRead, Fault::Gap, Fault::Bus];

    pub const fn field(self) -> Field<u32, STA::Register> {
        match self {
            Fault::FifoWrite => STA::WERR1,
            Fault::FifoRead => STA::RERR1,
            Fault::Gap => STA::GAPO1,
            Fault::Bus => STA::BERR,
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::FifoWrite => write!(f, "PWM fifo1 write error"),
            Fault::FifoRead => write!(f, "PWM fifo1 read error"),
            Fault::Gap => write!(f, "PWM fifo1 gap occurred"),
            Fault::Bus => write!(f, "PWM bus error"),
        }
    }
}

/// A decoded snapshot of `STA`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StatusFlags(u32);

impl StatusFlags {
    pub fn new(raw: u32) -> Self {
        StatusFlags(raw)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }

    fn bits(&self) -> LocalRegisterCopy<u32, STA::Register> {
        LocalRegisterCopy::new(self.0)
    }

    pub fn contains(&self, fault: Fault) -> bool {
        self.bits().is_set(fault.field())
    }

    pub fn has_faults(&self) -> bool {
        Fault::ALL.iter().any(|&fault| self.contains(fault))
    }

    pub fn faults(&self) -> impl Iterator<Item = Fault> + '_ {
        Fault::ALL.into_iter().filter(move |&fault| self.contains(fault))
    }

    /// Channel 1 is currently transmitting.
    pub fn channel1_active(&self) -> bool {
        self.bits().is_set(STA::STA1)
    }

    /// The value that clears every latched fault and leaves the rest of `STA` alone.
    fn clear_mask(&self) -> u32 {
        let mut clear = LocalRegisterCopy::<u32, STA::Register>::new(0);
        for fault in self.faults() {
            clear.modify(fault.field().val(1));
        }
        clear.get()
    }
}

/// Reads `STA`, logs any latched fault and clears it. `context` names the step that just ran.
pub fn check_status<B: RegisterBus>(bus: &mut B, context: &str) -> StatusFlags {
    let status = StatusFlags::new(bus.read(RegisterId::PwmSta));
    log::trace!("** {} ** status register: {:#06x}", context, status.raw());

    if status.has_faults() {
        for fault in status.faults() {
            log::warn!("{} ({})", fault, context);
        }
        bus.write(RegisterId::PwmSta, status.clear_mask());
    }
    status
}
