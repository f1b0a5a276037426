//! Infrared blaster for the BCM2835/BCM2837 PWM peripheral.
//!
//! The carrier (about 38 kHz) is produced by PWM channel 1 on GPIO#12 or GPIO#18 and keyed on
//! and off by the commands accepted through [`BlasterDevice`].

#![cfg_attr(not(test), no_std)]

pub mod blaster;
pub mod command;
pub mod config;
pub mod console;
pub mod device;
pub mod drivers;
pub mod engine;
pub mod error;

pub use blaster::Blaster;
pub use command::{Command, Payload};
pub use config::{BlasterConfig, ClockConfig};
pub use device::{BlasterDevice, Session};
pub use engine::Status;
pub use error::{CommandError, ConfigError, DeviceError, InitError};
