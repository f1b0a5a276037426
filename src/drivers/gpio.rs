use tock_registers::fields::Field;
use tock_registers::{register_bitfields, LocalRegisterCopy};

use super::{RegisterBus, RegisterId};

// GPIO function select 1, pins 10 to 19.
register_bitfields! { u32,
    pub GPFSEL1 [
        FSEL10 OFFSET(0) NUMBITS(3) [],
        FSEL11 OFFSET(3) NUMBITS(3) [],
        FSEL12 OFFSET(6) NUMBITS(3) [],
        FSEL13 OFFSET(9) NUMBITS(3) [],
        FSEL14 OFFSET(12) NUMBITS(3) [],
        FSEL15 OFFSET(15) NUMBITS(3) [],
        FSEL16 OFFSET(18) NUMBITS(3) [],
        FSEL17 OFFSET(21) NUMBITS(3) [],
        FSEL18 OFFSET(24) NUMBITS(3) [],
        FSEL19 OFFSET(27) NUMBITS(3) []
    ]
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GPIOFunc {
    Input = 0b000,
    Output = 0b001,
    AltFn0 = 0b100,
    AltFn1 = 0b101,
    AltFn2 = 0b110,
    AltFn3 = 0b111,
    AltFn4 = 0b011,
    AltFn5 = 0b010,
}

/// The pins that can carry PWM channel 1. Both live in `GPFSEL1`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PwmPin {
    /// GPIO#12 (physical pin 32), PWM0 on alternate function 0.
    Gpio12,
    /// GPIO#18 (physical pin 12), PWM0 on alternate function 5.
    Gpio18,
}

impl PwmPin {
    pub const fn number(self) -> u8 {
        match self {
            PwmPin::Gpio12 => 12,
            PwmPin::Gpio18 => 18,
        }
    }

    pub const fn function(self) -> GPIOFunc {
        match self {
            PwmPin::Gpio12 => GPIOFunc::AltFn0,
            PwmPin::Gpio18 => GPIOFunc::AltFn5,
        }
    }

    pub const fn field(self) -> Field<u32, GPFSEL1::Register> {
        match self {
            PwmPin::Gpio12 => GPFSEL1::FSEL12,
            PwmPin::Gpio18 => GPFSEL1::FSEL18,
        }
    }
}

/// The function-select bits a pin carried before the blaster claimed it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PriorFunction {
    pub pin: PwmPin,
    pub bits: u32,
}

/// Routes PWM channel 1 to `pin`, leaving the other nine pins of the bank alone. Returns the
/// bits the pin had before.
pub fn claim_pin<B: RegisterBus>(bus: &mut B, pin: PwmPin) -> PriorFunction {
    let mut fsel = LocalRegisterCopy::<u32, GPFSEL1::Register>::new(bus.read(RegisterId::GpFsel1));
    let prior = PriorFunction {
        pin,
        bits: fsel.read(pin.field()),
    };

    fsel.modify(pin.field().val(pin.function() as u32));
    bus.write(RegisterId::GpFsel1, fsel.get());

    log::debug!(
        "gpio#{} function {:#05b} -> {:#05b}",
        pin.number(),
        prior.bits,
        pin.function() as u32
    );
    prior
}

/// Puts back exactly the bits captured by [`claim_pin`], again touching only that pin's field.
pub fn restore_pin<B: RegisterBus>(bus: &mut B, prior: PriorFunction) {
    let mut fsel = LocalRegisterCopy::<u32, GPFSEL1::Register>::new(bus.read(RegisterId::GpFsel1));
    fsel.modify(prior.pin.field().val(prior.bits));
    bus.write(RegisterId::GpFsel1, fsel.get());
    log::debug!("gpio#{} function restored to {:#05b}", prior.pin.number(), prior.bits);
}

#[cfg(target_arch = "aarch64")]
pub use board::GPIO;

/// Whole-bank GPIO access for the console pins, used before the blaster takes over `GPFSEL1`.
#[cfg(target_arch = "aarch64")]
mod board {
    use super::super::{Reg32, SocBase};
    use super::GPIOFunc;

    #[allow(dead_code)]
    #[repr(C)]
    struct GPIOPinData {
        _reserved: Reg32,
        data: [Reg32; 2],
    }

    #[allow(dead_code)]
    #[repr(C)]
    struct GPIORegisters {
        func_select: [Reg32; 6],
        output_set: GPIOPinData,
        output_clear: GPIOPinData,
        level: GPIOPinData,
        event_detect_status: GPIOPinData,
        rising_edge_detect_enable: GPIOPinData,
        falling_edge_detect_enable: GPIOPinData,
        pin_high_detect_enable: GPIOPinData,
        pin_low_detect_enable: GPIOPinData,
        pin_async_rising_edge_detect: GPIOPinData,
        pin_async_falling_edge_detect: GPIOPinData,
        _reserved: Reg32,
        pullup_pulldown_enable: Reg32,
        pullup_pulldown_clocks: [Reg32; 2],
    }

    pub struct GPIO {
        regs: &'static mut GPIORegisters,
    }

    impl GPIO {
        const OFFSET: usize = 0x20_0000;

        /// # Safety
        ///
        /// Only one `GPIO` may be alive at a time, and it must not be alive while a
        /// `RegisterSet` holds `GPFSEL1`.
        pub unsafe fn acquire(base: SocBase) -> Self {
            let ptr = (base.addr() + Self::OFFSET) as *mut GPIORegisters;
            GPIO { regs: &mut *ptr }
        }

        pub fn set_pin_func(&mut self, pin: u8, func: GPIOFunc) {
            let bit: u32 = (pin as u32 * 3) % 30;
            let reg_idx = (pin / 10) as usize;
            let mut reg = self.regs.func_select[reg_idx].read();

            reg &= !(0b111 << bit);
            reg |= (func as u32) << bit;

            self.regs.func_select[reg_idx].write(reg);
        }

        /// Disables the pull-up/pull-down on `pin` using the clocked sequence from the
        /// peripherals manual.
        pub fn disable_pull(&mut self, pin: u8) {
            self.regs.pullup_pulldown_enable.write(0);
            spin_cycles(150);
            self.regs.pullup_pulldown_clocks[(pin / 32) as usize].write(1 << (pin % 32));
            spin_cycles(150);
            self.regs.pullup_pulldown_enable.write(0);
            self.regs.pullup_pulldown_clocks[(pin / 32) as usize].write(0);
        }
    }

    fn spin_cycles(cycles: usize) {
        for _ in 0..cycles {
            cortex_a::asm::nop();
        }
    }
}
