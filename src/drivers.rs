//! Drivers for the BCM283x peripheral blocks the blaster touches: the GPIO function-select
//! bank, the PWM controller and the PWM clock manager.

pub mod clock;
pub mod gpio;
#[cfg(target_arch = "aarch64")]
pub mod mini_uart;
#[cfg(test)]
pub mod mock;
pub mod pwm;
pub mod registers;

pub use registers::{IdentityMapper, PhysMapper, RegisterBus, RegisterId, RegisterSet};

/// Physical base of the peripheral window. Every register offset in this crate is relative to
/// it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SocBase {
    /// BCM2835 (Raspberry Pi 1 and Zero).
    Bcm2835,
    /// BCM2837 (Raspberry Pi 3).
    Bcm2837,
}

impl SocBase {
    pub const fn addr(self) -> usize {
        match self {
            SocBase::Bcm2835 => 0x2000_0000,
            SocBase::Bcm2837 => 0x3F00_0000,
        }
    }
}

/// A single memory mapped 32-bit register. All accesses are volatile.
#[repr(transparent)]
pub struct Reg32(u32);

impl Reg32 {
    /// # Safety
    ///
    /// `addr` must be the address of a readable and writable 32-bit device register that stays
    /// mapped for the rest of the program, and no other reference to it may exist.
    pub unsafe fn new(addr: usize) -> &'static mut Reg32 {
        let ptr = addr as *mut Reg32;
        &mut *ptr
    }

    /// A register backed by ordinary memory instead of a device. Useful for mappers that
    /// emulate the peripheral window.
    pub const fn backed(val: u32) -> Reg32 {
        Reg32(val)
    }

    pub fn write(&mut self, val: u32) {
        unsafe {
            core::ptr::write_volatile(&mut self.0, val);
        }
    }

    pub fn read(&mut self) -> u32 {
        unsafe { core::ptr::read_volatile(&self.0) }
    }
}
