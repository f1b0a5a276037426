use crate::drivers::clock::ClockSource;
use crate::drivers::gpio::PwmPin;
use crate::drivers::SocBase;
use crate::error::ConfigError;

/// Time each payload bit holds the carrier state, in microseconds.
pub const BIT_PERIOD_US: u32 = 693;

/// How many times the clock manager is polled for `BUSY` to clear before giving up.
pub const BUSY_POLL_LIMIT: u32 = 1_000_000;

/// PWM clock generator settings.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ClockConfig {
    pub source: ClockSource,
    /// Integer part of the divisor (12 bits).
    pub divi: u32,
    /// Fractional part of the divisor in 1/4096ths (12 bits). Only used when `mash` is not 0.
    pub divf: u32,
    /// MASH noise shaping stages (0 to 3).
    pub mash: u32,
}

impl Default for ClockConfig {
    /// PLLD at 500 MHz divided by 411, which gives a 38 kHz carrier with a range of 32.
    fn default() -> Self {
        ClockConfig {
            source: ClockSource::PllD,
            divi: 411,
            divf: 0,
            mash: 0,
        }
    }
}

impl ClockConfig {
    /// Frequency of the generated PWM clock, when the source frequency is known.
    pub fn output_hz(&self) -> Option<u32> {
        let source = self.source.nominal_hz()? as u64;
        let divf = if self.mash == 0 { 0 } else { self.divf as u64 };
        let divisor = (self.divi as u64) * 4096 + divf;
        if divisor == 0 {
            return None;
        }
        Some((source * 4096 / divisor) as u32)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BlasterConfig {
    pub soc_base: SocBase,
    pub pin: PwmPin,
    pub clock: ClockConfig,
    /// PWM channel 1 range, the number of clock ticks in one carrier period.
    pub range: u32,
    /// PWM channel 1 data, the number of ticks the carrier is high per period.
    pub data: u32,
    pub bit_period_us: u32,
    pub busy_poll_limit: u32,
}

impl Default for BlasterConfig {
    fn default() -> Self {
        BlasterConfig {
            soc_base: SocBase::Bcm2835,
            pin: PwmPin::Gpio12,
            clock: ClockConfig::default(),
            range: 32,
            data: 16,
            bit_period_us: BIT_PERIOD_US,
            busy_poll_limit: BUSY_POLL_LIMIT,
        }
    }
}

impl BlasterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let clock = &self.clock;
        if !(2..=4095).contains(&clock.divi) {
            return Err(ConfigError::Divisor(clock.divi));
        }
        if clock.divf > 4095 {
            return Err(ConfigError::Fraction(clock.divf));
        }
        if clock.mash > 3 {
            return Err(ConfigError::Mash(clock.mash));
        }
        if self.range == 0 {
            return Err(ConfigError::ZeroRange);
        }
        if self.data > self.range {
            return Err(ConfigError::DutyAboveRange {
                data: self.data,
                range: self.range,
            });
        }
        if self.bit_period_us == 0 {
            return Err(ConfigError::ZeroBitPeriod);
        }
        // A limit of 0 would time out after stopping the clock without ever polling it.
        if self.busy_poll_limit == 0 {
            return Err(ConfigError::ZeroPollLimit);
        }
        Ok(())
    }

    /// Carrier frequency the configuration produces, when the clock source frequency is known.
    pub fn carrier_hz(&self) -> Option<u32> {
        Some(self.clock.output_hz()? / self.range.max(1))
    }
}
