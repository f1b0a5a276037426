use super::{Reg32, SocBase};
use crate::error::InitError;

/// The seven registers the blaster owns while it is loaded.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RegisterId {
    /// PWM control (`CTL`).
    PwmCtl,
    /// PWM status (`STA`).
    PwmSta,
    /// PWM channel 1 range (`RNG1`).
    PwmRng1,
    /// PWM channel 1 data (`DAT1`).
    PwmDat1,
    /// Clock manager PWM control (`CM_PWMCTL`).
    CmPwmCtl,
    /// Clock manager PWM divisor (`CM_PWMDIV`).
    CmPwmDiv,
    /// GPIO function select for pins 10 to 19 (`GPFSEL1`).
    GpFsel1,
}

impl RegisterId {
    pub const ALL: [RegisterId; 7] = [
        RegisterId::PwmCtl,
        RegisterId::PwmSta,
        RegisterId::PwmRng1,
        RegisterId::PwmDat1,
        RegisterId::CmPwmCtl,
        RegisterId::CmPwmDiv,
        RegisterId::GpFsel1,
    ];

    const PWM_BASE: usize = 0x0020_C000;

    /// Offset of the register from the peripheral base.
    pub const fn offset(self) -> usize {
        match self {
            RegisterId::PwmCtl => Self::PWM_BASE,
            RegisterId::PwmSta => Self::PWM_BASE + 0x04,
            RegisterId::PwmRng1 => Self::PWM_BASE + 0x10,
            RegisterId::PwmDat1 => Self::PWM_BASE + 0x14,
            RegisterId::CmPwmCtl => 0x0010_10A0,
            RegisterId::CmPwmDiv => 0x0010_10A4,
            RegisterId::GpFsel1 => 0x0020_0004,
        }
    }

    pub const fn phys_addr(self, base: SocBase) -> usize {
        base.addr() + self.offset()
    }

    pub const fn name(self) -> &'static str {
        match self {
            RegisterId::PwmCtl => "pwm ctl",
            RegisterId::PwmSta => "pwm sta",
            RegisterId::PwmRng1 => "pwm rng1",
            RegisterId::PwmDat1 => "pwm dat1",
            RegisterId::CmPwmCtl => "cman ctl",
            RegisterId::CmPwmDiv => "cman div",
            RegisterId::GpFsel1 => "gpfsel1",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// Raw access to the blaster's registers. Implementations perform every access against the
/// hardware exactly once, without caching and without validating the values written.
pub trait RegisterBus {
    fn read(&mut self, reg: RegisterId) -> u32;
    fn write(&mut self, reg: RegisterId, val: u32);
}

impl<B: RegisterBus + ?Sized> RegisterBus for &mut B {
    fn read(&mut self, reg: RegisterId) -> u32 {
        (**self).read(reg)
    }

    fn write(&mut self, reg: RegisterId, val: u32) {
        (**self).write(reg, val)
    }
}

/// Maps physical register addresses into the address space the driver runs in.
///
/// # Safety
///
/// A returned reference must point at the register for `phys` (or at memory standing in for
/// it) and must stay valid until it is handed back through [`PhysMapper::unmap`]. The same
/// register must not be handed out twice at the same time.
pub unsafe trait PhysMapper {
    fn map(&mut self, phys: usize) -> Option<&'static mut Reg32>;

    fn unmap(&mut self, _reg: &'static mut Reg32) {}
}

/// Mapper for code running without an MMU, or with the peripheral window identity mapped.
pub struct IdentityMapper;

unsafe impl PhysMapper for IdentityMapper {
    fn map(&mut self, phys: usize) -> Option<&'static mut Reg32> {
        if phys == 0 || phys % core::mem::align_of::<u32>() != 0 {
            return None;
        }
        // SAFETY: The caller of `RegisterSet::acquire` owns the peripheral window and only
        // asks for each register once.
        Some(unsafe { Reg32::new(phys) })
    }
}

/// Exclusive handles to all seven registers. Either every handle is mapped or the set does not
/// exist.
pub struct RegisterSet {
    regs: [&'static mut Reg32; 7],
}

impl RegisterSet {
    /// Maps all seven registers. When any of them fails to map, the ones that did map are
    /// handed back to `mapper` and nothing has been written.
    pub fn acquire<M: PhysMapper>(mapper: &mut M, base: SocBase) -> Result<Self, InitError> {
        let slots = RegisterId::ALL.map(|id| {
            let addr = id.phys_addr(base);
            let reg = mapper.map(addr);
            if reg.is_none() {
                log::error!("failed to map {} register at {:#010x}", id.name(), addr);
            }
            reg
        });

        let missing = slots.iter().position(Option::is_none);
        match slots {
            [Some(ctl), Some(sta), Some(rng1), Some(dat1), Some(cm_ctl), Some(cm_div), Some(fsel1)] => {
                log::debug!("mapped pwm registers at base {:#010x}", base.addr());
                Ok(RegisterSet {
                    regs: [ctl, sta, rng1, dat1, cm_ctl, cm_div, fsel1],
                })
            }
            slots => {
                for reg in slots.into_iter().flatten() {
                    mapper.unmap(reg);
                }
                let register = RegisterId::ALL[missing.unwrap_or(0)];
                Err(InitError::InitializationFailed { register })
            }
        }
    }

    /// Hands every register back to the mapper.
    pub fn release<M: PhysMapper>(self, mapper: &mut M) {
        for (id, reg) in RegisterId::ALL.into_iter().zip(self.regs) {
            mapper.unmap(reg);
            log::debug!("unmapped {}", id.name());
        }
    }
}

impl RegisterBus for RegisterSet {
    fn read(&mut self, reg: RegisterId) -> u32 {
        self.regs[reg.index()].read()
    }

    fn write(&mut self, reg: RegisterId, val: u32) {
        log::trace!("{} <- {:#010x}", reg.name(), val);
        self.regs[reg.index()].write(val);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::boxed::Box;
    use std::vec::Vec;

    /// Hands out heap-backed registers and can refuse one address.
    struct HeapMapper {
        refuse: Option<usize>,
        mapped: Vec<(usize, *mut Reg32)>,
        unmapped: Vec<*mut Reg32>,
    }

    impl HeapMapper {
        fn new(refuse: Option<usize>) -> Self {
            HeapMapper {
                refuse,
                mapped: Vec::new(),
                unmapped: Vec::new(),
            }
        }

        fn value_at(&self, phys: usize) -> u32 {
            let (_, ptr) = self.mapped.iter().find(|(addr, _)| *addr == phys).unwrap();
            unsafe { (**ptr).read() }
        }
    }

    unsafe impl PhysMapper for HeapMapper {
        fn map(&mut self, phys: usize) -> Option<&'static mut Reg32> {
            if self.refuse == Some(phys) {
                return None;
            }
            let reg = Box::leak(Box::new(Reg32::backed(0xAA55_0000)));
            self.mapped.push((phys, reg as *mut Reg32));
            Some(reg)
        }

        fn unmap(&mut self, reg: &'static mut Reg32) {
            self.unmapped.push(reg as *mut Reg32);
        }
    }

    #[test]
    fn offsets_match_bcm2835_map() {
        let base = SocBase::Bcm2835;
        assert_eq!(RegisterId::PwmCtl.phys_addr(base), 0x2020_C000);
        assert_eq!(RegisterId::PwmSta.phys_addr(base), 0x2020_C004);
        assert_eq!(RegisterId::PwmRng1.phys_addr(base), 0x2020_C010);
        assert_eq!(RegisterId::PwmDat1.phys_addr(base), 0x2020_C014);
        assert_eq!(RegisterId::CmPwmCtl.phys_addr(base), 0x2010_10A0);
        assert_eq!(RegisterId::CmPwmDiv.phys_addr(base), 0x2010_10A4);
        assert_eq!(RegisterId::GpFsel1.phys_addr(base), 0x2020_0004);
        assert_eq!(RegisterId::GpFsel1.phys_addr(SocBase::Bcm2837), 0x3F20_0004);
    }

    #[test]
    fn acquire_maps_all_seven() {
        let mut mapper = HeapMapper::new(None);
        let mut regs = RegisterSet::acquire(&mut mapper, SocBase::Bcm2835).unwrap();
        assert_eq!(mapper.mapped.len(), 7);

        regs.write(RegisterId::PwmRng1, 32);
        assert_eq!(regs.read(RegisterId::PwmRng1), 32);
        assert_eq!(mapper.value_at(RegisterId::PwmRng1.phys_addr(SocBase::Bcm2835)), 32);

        regs.release(&mut mapper);
        assert_eq!(mapper.unmapped.len(), 7);
    }

    #[test]
    fn clock_manager_missing_fails_without_writes() {
        let cm_ctl = RegisterId::CmPwmCtl.phys_addr(SocBase::Bcm2835);
        let mut mapper = HeapMapper::new(Some(cm_ctl));

        let err = RegisterSet::acquire(&mut mapper, SocBase::Bcm2835).err().unwrap();
        assert_eq!(
            err,
            InitError::InitializationFailed {
                register: RegisterId::CmPwmCtl
            }
        );

        // Everything that did map was handed back untouched.
        assert_eq!(mapper.mapped.len(), 6);
        assert_eq!(mapper.unmapped.len(), 6);
        for (phys, _) in mapper.mapped.clone() {
            assert_eq!(mapper.value_at(phys), 0xAA55_0000);
        }
    }

    #[test]
    fn identity_mapper_rejects_unaligned() {
        assert!(IdentityMapper.map(0).is_none());
        assert!(IdentityMapper.map(0x2020_C002).is_none());
    }
}
