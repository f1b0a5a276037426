use core::fmt::{self, Write};

use super::gpio::{GPIOFunc, GPIO};
use super::{Reg32, SocBase};

#[allow(dead_code)]
#[repr(C)]
struct MiniUARTRegisters {
    irq_status: Reg32,
    enables: Reg32,
    _reserved: [Reg32; 14],
    io: Reg32,
    ier: Reg32,
    iir: Reg32,
    lcr: Reg32,
    mcr: Reg32,
    lsr: Reg32,
    msr: Reg32,
    scratch: Reg32,
    control: Reg32,
    status: Reg32,
    baud_rate: Reg32,
}

const OFFSET: usize = 0x21_5000;

const LSR_DATA_READY: u32 = 0x01;
const LSR_TX_EMPTY: u32 = 0x20;

static LOCK: spin::Mutex<Option<&'static mut MiniUARTRegisters>> = spin::Mutex::new(None);

/// Exclusive handle to the Mini UART, the console the kernel is driven through.
pub struct MiniUART {
    guard: spin::MutexGuard<'static, Option<&'static mut MiniUARTRegisters>>,
}

impl MiniUART {
    const TX_PIN: u8 = 14;
    const RX_PIN: u8 = 15;

    /// Blocks until the handle is free. Acquiring it twice on the same core deadlocks.
    pub fn acquire() -> Self {
        MiniUART { guard: LOCK.lock() }
    }

    pub fn is_setup() -> bool {
        MiniUART::acquire().guard.is_some()
    }

    /// 115200 baud with the 250 MHz core clock of the Pi 3.
    ///
    /// # Safety
    ///
    /// `base` must be the peripheral window of the running SoC.
    pub unsafe fn init_default(&mut self, gpio: &mut GPIO, base: SocBase) {
        self.init(gpio, base, 270);
    }

    /// ```text
    ///                  system_clock_freq
    /// baudrate = ---------------------------
    ///             8 * (baudrate_divisor + 1)
    /// ```
    ///
    /// # Safety
    ///
    /// `base` must be the peripheral window of the running SoC.
    pub unsafe fn init(&mut self, gpio: &mut GPIO, base: SocBase, baud_divisor: u16) {
        gpio.set_pin_func(Self::TX_PIN, GPIOFunc::AltFn5);
        gpio.set_pin_func(Self::RX_PIN, GPIOFunc::AltFn5);
        gpio.disable_pull(Self::TX_PIN);
        gpio.disable_pull(Self::RX_PIN);

        let regs = &mut *((base.addr() + OFFSET) as *mut MiniUARTRegisters);
        regs.enables.write(1);
        regs.control.write(0);
        regs.ier.write(0);
        regs.lcr.write(0b11); // 8-bit mode
        regs.baud_rate.write(baud_divisor as u32);
        regs.control.write(3);

        self.guard.replace(regs);
    }

    /// Spins until there is room in the transmit FIFO. Bytes sent before setup are dropped.
    pub fn send(&mut self, byte: u8) {
        let Some(regs) = self.guard.as_mut() else {
            return;
        };

        while regs.lsr.read() & LSR_TX_EMPTY == 0 {
            cortex_a::asm::nop();
        }
        regs.io.write(byte as u32);
    }

    /// Spins until a byte arrives, or returns `None` right away if the UART is not set up.
    pub fn recv(&mut self) -> Option<u8> {
        let regs = self.guard.as_mut()?;

        while regs.lsr.read() & LSR_DATA_READY == 0 {
            cortex_a::asm::nop();
        }
        Some((regs.io.read() & 0xff) as u8)
    }

    pub fn write(&mut self, buf: &[u8]) {
        for &byte in buf {
            if byte == b'\n' {
                self.send(b'\r');
            }
            self.send(byte);
        }
    }
}

impl Write for MiniUART {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write(s.as_bytes());
        Ok(())
    }
}

pub fn mu_recv() -> Option<u8> {
    MiniUART::acquire().recv()
}

pub fn mu_write(buf: &[u8]) {
    MiniUART::acquire().write(buf)
}

#[doc(hidden)]
pub fn _mu_print(args: fmt::Arguments) {
    // Formatting into the UART cannot fail.
    let _ = MiniUART::acquire().write_fmt(args);
}
