use cortex_a::asm;
use cortex_a::registers::{CurrentEL, CNTFRQ_EL0, CNTPCT_EL0};
use embedded_hal::delay::DelayNs;
use tock_registers::interfaces::Readable;

/// Parks the core. Each iteration waits for an event (`wfe`) so the processor may enter low
/// power mode.
#[inline(always)]
pub(crate) fn halt() -> ! {
    loop {
        asm::wfe();
    }
}

pub fn current_exception_level() -> u64 {
    CurrentEL.read(CurrentEL::EL)
}

/// Busy-waits on the ARM generic timer, whose counter keeps running at `CNTFRQ_EL0` regardless
/// of the CPU clock.
pub struct GenericTimer {
    freq: u64,
}

impl GenericTimer {
    pub fn new() -> Self {
        GenericTimer {
            freq: CNTFRQ_EL0.get(),
        }
    }
}

impl DelayNs for GenericTimer {
    fn delay_ns(&mut self, ns: u32) {
        let ticks = (ns as u64 * self.freq).div_ceil(1_000_000_000);
        let start = CNTPCT_EL0.get();
        while CNTPCT_EL0.get().wrapping_sub(start) < ticks {
            asm::nop();
        }
    }
}
