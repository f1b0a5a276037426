//! A simulated PWM peripheral for host tests.
//!
//! [`SimBus`] keeps the seven registers in memory and reproduces the parts of the hardware the
//! blaster depends on: clock manager writes without the password are dropped, `BUSY` lingers
//! for a few polls after the generator is stopped, `STA` faults are write-one-to-clear and
//! `STA1` follows `PWEN1`. [`MockDelay`] shares the same event log so tests can see which
//! register writes happened between delays.

use std::cell::RefCell;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;

use super::clock::PASSWORD;
use super::{RegisterBus, RegisterId};

const CM_ENAB: u32 = 1 << 4;
const CM_BUSY: u32 = 1 << 7;
const CM_PASSWD_MASK: u32 = 0xFF << 24;
const STA_W1C_MASK: u32 = 0b1_1111_1100;
const STA_STA1: u32 = 1 << 9;
const CTL_PWEN1: u32 = 1;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Read(RegisterId),
    Write(RegisterId, u32),
    /// A clock manager write without the password; the hardware ignored it.
    Rejected(RegisterId, u32),
    DelayNs(u32),
}

struct SimState {
    regs: [u32; 7],
    busy_polls: u32,
    busy_remaining: Option<u32>,
    stuck_busy: bool,
    events: Vec<Event>,
}

#[derive(Clone)]
pub struct SimBus(Rc<RefCell<SimState>>);

impl SimBus {
    /// A peripheral in the state firmware usually leaves it: clock running from the oscillator,
    /// PWM stopped, every pin an input.
    pub fn new() -> Self {
        let mut regs = [0; 7];
        regs[RegisterId::CmPwmCtl as usize] = CM_ENAB | CM_BUSY | 1;
        regs[RegisterId::CmPwmDiv as usize] = 5 << 12;
        SimBus(Rc::new(RefCell::new(SimState {
            regs,
            busy_polls: 2,
            busy_remaining: None,
            stuck_busy: false,
            events: Vec::new(),
        })))
    }

    /// A delay that records into this bus's event log.
    pub fn delay(&self) -> MockDelay {
        MockDelay(self.0.clone())
    }

    /// Sets a register directly, bypassing the simulated hardware rules.
    pub fn set(&self, reg: RegisterId, val: u32) {
        self.0.borrow_mut().regs[reg as usize] = val;
    }

    /// The stored register value, without any read side effects.
    pub fn value(&self, reg: RegisterId) -> u32 {
        self.0.borrow().regs[reg as usize]
    }

    /// Number of polls `BUSY` stays set after the generator is stopped.
    pub fn set_busy_polls(&self, polls: u32) {
        self.0.borrow_mut().busy_polls = polls;
    }

    pub fn set_stuck_busy(&self, stuck: bool) {
        self.0.borrow_mut().stuck_busy = stuck;
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().events.clone()
    }

    pub fn clear_events(&self) {
        self.0.borrow_mut().events.clear();
    }

    /// Every value that reached `reg`, oldest first.
    pub fn writes_to(&self, reg: RegisterId) -> Vec<u32> {
        self.0
            .borrow()
            .events
            .iter()
            .filter_map(|event| match *event {
                Event::Write(id, val) if id == reg => Some(val),
                _ => None,
            })
            .collect()
    }

    pub fn writes(&self) -> usize {
        self.0
            .borrow()
            .events
            .iter()
            .filter(|event| matches!(event, Event::Write(..)))
            .count()
    }

    pub fn rejected(&self) -> usize {
        self.0
            .borrow()
            .events
            .iter()
            .filter(|event| matches!(event, Event::Rejected(..)))
            .count()
    }

    /// `PWEN1` as written on each `CTL` write, oldest first.
    pub fn carrier_writes(&self) -> Vec<bool> {
        self.writes_to(RegisterId::PwmCtl)
            .into_iter()
            .map(|ctl| ctl & CTL_PWEN1 != 0)
            .collect()
    }
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterBus for SimBus {
    fn read(&mut self, reg: RegisterId) -> u32 {
        let mut state = self.0.borrow_mut();
        state.events.push(Event::Read(reg));

        match reg {
            RegisterId::CmPwmCtl => {
                let val = state.regs[reg as usize];
                if let Some(remaining) = state.busy_remaining {
                    if remaining == 0 && !state.stuck_busy {
                        state.busy_remaining = None;
                        state.regs[reg as usize] &= !CM_BUSY;
                        return val & !CM_BUSY;
                    }
                    state.busy_remaining = Some(remaining.saturating_sub(1));
                }
                val
            }
            RegisterId::PwmSta => {
                let running = state.regs[RegisterId::PwmCtl as usize] & CTL_PWEN1 != 0;
                let sta = state.regs[reg as usize] & !STA_STA1;
                if running {
                    sta | STA_STA1
                } else {
                    sta
                }
            }
            _ => state.regs[reg as usize],
        }
    }

    fn write(&mut self, reg: RegisterId, val: u32) {
        let mut state = self.0.borrow_mut();

        match reg {
            RegisterId::CmPwmCtl | RegisterId::CmPwmDiv if val >> 24 != PASSWORD => {
                state.events.push(Event::Rejected(reg, val));
                return;
            }
            RegisterId::CmPwmCtl => {
                let was_enabled = state.regs[reg as usize] & CM_ENAB != 0;
                let mut stored = val & !CM_PASSWD_MASK & !CM_BUSY;
                if val & CM_ENAB != 0 {
                    stored |= CM_BUSY;
                    state.busy_remaining = None;
                } else if was_enabled || state.busy_remaining.is_some() {
                    stored |= CM_BUSY;
                    let polls = state.busy_polls;
                    state.busy_remaining.get_or_insert(polls);
                }
                state.regs[reg as usize] = stored;
            }
            RegisterId::CmPwmDiv => state.regs[reg as usize] = val & !CM_PASSWD_MASK,
            RegisterId::PwmSta => state.regs[reg as usize] &= !(val & STA_W1C_MASK),
            _ => state.regs[reg as usize] = val,
        }

        state.events.push(Event::Write(reg, val));
    }
}

#[derive(Clone)]
pub struct MockDelay(Rc<RefCell<SimState>>);

impl MockDelay {
    /// Every delay requested so far, in nanoseconds.
    pub fn delays(&self) -> Vec<u32> {
        self.0
            .borrow()
            .events
            .iter()
            .filter_map(|event| match *event {
                Event::DelayNs(ns) => Some(ns),
                _ => None,
            })
            .collect()
    }

    /// Whether the carrier was on during each delay, in order.
    pub fn keyed(&self) -> Vec<bool> {
        let mut on = false;
        let mut keyed = Vec::new();
        for event in self.0.borrow().events.iter() {
            match *event {
                Event::Write(RegisterId::PwmCtl, ctl) => on = ctl & CTL_PWEN1 != 0,
                Event::DelayNs(_) => keyed.push(on),
                _ => {}
            }
        }
        keyed
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().events.push(Event::DelayNs(ns));
    }
}
