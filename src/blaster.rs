//! Bringing the PWM peripheral up into a transmit-ready state and back down.
//!
//! A [`Blaster`] only exists while the peripheral is configured: [`Blaster::configure`] is the
//! only way to build one and [`Blaster::teardown`] consumes it.

use embedded_hal::delay::DelayNs;

use crate::config::BlasterConfig;
use crate::drivers::gpio::{self, PriorFunction};
use crate::drivers::pwm::{self, StatusFlags};
use crate::drivers::{clock, RegisterBus, RegisterId};
use crate::error::InitError;

/// The configured PWM channel together with everything needed to drive it.
pub struct Blaster<B, D> {
    pub(crate) bus: B,
    pub(crate) delay: D,
    pub(crate) config: BlasterConfig,
    prior: PriorFunction,
    /// Whether the carrier is currently enabled.
    pub(crate) active: bool,
}

impl<B: RegisterBus, D: DelayNs> Blaster<B, D> {
    /// Routes the PWM to the configured pin, reprograms the PWM clock for the carrier and
    /// leaves the channel gated off.
    ///
    /// If the clock manager never leaves its busy state the pin is handed back and
    /// [`InitError::ClockBusyTimeout`] is returned. The clock generator stays stopped in that
    /// case.
    pub fn configure(mut bus: B, delay: D, config: BlasterConfig) -> Result<Self, InitError> {
        config.validate()?;

        let prior = gpio::claim_pin(&mut bus, config.pin);
        pwm::check_status(&mut bus, "after set fsel");

        // The channel must be off before the clock under it changes.
        write_carrier(&mut bus, false);

        clock::disable(&mut bus);
        pwm::check_status(&mut bus, "after set clockman");

        if let Err(e) = clock::wait_while_busy(&mut bus, config.busy_poll_limit) {
            gpio::restore_pin(&mut bus, prior);
            return Err(e);
        }

        clock::program(&mut bus, &config.clock);
        pwm::check_status(&mut bus, "after set div");

        clock::enable(&mut bus);
        pwm::check_status(&mut bus, "after set ctl");

        bus.write(RegisterId::PwmDat1, config.data);
        pwm::check_status(&mut bus, "after set data");
        bus.write(RegisterId::PwmRng1, config.range);
        pwm::check_status(&mut bus, "after set range");

        log::info!(
            "pwm ready on gpio#{} (range {}, data {})",
            config.pin.number(),
            config.range,
            config.data
        );

        Ok(Blaster {
            bus,
            delay,
            config,
            prior,
            active: false,
        })
    }

    /// Gates the carrier off and gives the pin its old function back. The clock generator is
    /// left running.
    pub fn teardown(mut self) -> (B, D) {
        self.set_carrier(false);
        gpio::restore_pin(&mut self.bus, self.prior);
        pwm::check_status(&mut self.bus, "after set old gpio");
        log::info!("pwm released gpio#{}", self.prior.pin.number());
        (self.bus, self.delay)
    }

    pub fn config(&self) -> &BlasterConfig {
        &self.config
    }

    /// The function-select bits the pin had before [`Blaster::configure`].
    pub fn prior_function(&self) -> PriorFunction {
        self.prior
    }

    /// Reads, logs and clears the PWM status flags.
    pub fn check_status(&mut self, context: &str) -> StatusFlags {
        pwm::check_status(&mut self.bus, context)
    }

    pub(crate) fn set_carrier(&mut self, on: bool) {
        write_carrier(&mut self.bus, on);
        self.active = on;
    }
}

fn write_carrier<B: RegisterBus>(bus: &mut B, on: bool) {
    let current = bus.read(RegisterId::PwmCtl);
    bus.write(RegisterId::PwmCtl, pwm::control_word(current, on));
}
