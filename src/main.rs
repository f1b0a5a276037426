//! Bare-metal Raspberry Pi 3 kernel hosting the blaster behind a Mini UART console.
//!
//! Every console line is written to the device as one command. `status` reads the device
//! instead and `exit` tears the blaster down and parks the core.

#![no_main]
#![no_std]
#![feature(format_args_nl, never_type)]

#[macro_use]
mod print;
mod boot;
mod logger;
mod utils;

use core::fmt;
use core::panic::PanicInfo;

use ir_blaster::console::{Input, LineBuffer};
use ir_blaster::drivers::gpio::GPIO;
use ir_blaster::drivers::mini_uart::{mu_recv, mu_write, MiniUART};
use ir_blaster::drivers::{IdentityMapper, RegisterSet, SocBase};
use ir_blaster::{Blaster, BlasterConfig, BlasterDevice, DeviceError, InitError, Session};
use log::LevelFilter;

use utils::GenericTimer;

const SOC: SocBase = SocBase::Bcm2837;

#[derive(Debug)]
enum KernelError {
    Init(InitError),
    Device(DeviceError<'static>),
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::Init(e) => write!(f, "blaster initialization failed: {}", e),
            KernelError::Device(e) => write!(f, "device unavailable: {} ({})", e, e.code()),
        }
    }
}

impl From<InitError> for KernelError {
    fn from(e: InitError) -> Self {
        KernelError::Init(e)
    }
}

impl From<DeviceError<'static>> for KernelError {
    fn from(e: DeviceError<'static>) -> Self {
        KernelError::Device(e)
    }
}

unsafe fn kernel_init() -> ! {
    // The GPIO handle must be gone before the blaster maps GPFSEL1.
    {
        let mut gpio = GPIO::acquire(SOC);
        MiniUART::acquire().init_default(&mut gpio, SOC);
    }

    if logger::init(LevelFilter::Info).is_err() {
        println!("logger already installed");
    }

    match kernel_main() {
        Err(e) => panic!("{}", e),
        Ok(impossible) => impossible,
    }
}

fn kernel_main() -> Result<!, KernelError> {
    log::info!("initialized in exception level {}", utils::current_exception_level());

    let mut mapper = IdentityMapper;
    let regs = RegisterSet::acquire(&mut mapper, SOC)?;
    let config = BlasterConfig {
        soc_base: SOC,
        ..BlasterConfig::default()
    };
    let blaster = Blaster::configure(regs, GenericTimer::new(), config)?;
    log::info!("carrier at {} Hz", config.carrier_hz().unwrap_or(0));

    let device = BlasterDevice::new(blaster);
    let mut session = device.open()?;
    console(&mut session);
    drop(session);

    let (regs, _timer) = device.into_inner().teardown();
    regs.release(&mut mapper);
    log::info!("blaster unloaded");
    utils::halt()
}

/// Runs the console until `exit` is entered or the UART goes away.
fn console(session: &mut Session<'_, RegisterSet, GenericTimer>) {
    let mut line = LineBuffer::new();
    print!("> ");

    while let Some(byte) = mu_recv() {
        let input = line.push(byte);
        match input {
            Input::Echo(byte) => mu_write(&[byte]),
            Input::Erase => mu_write(input.echo()),
            Input::Overflow => {
                println!();
                log::warn!("line too long, discarding until newline");
            }
            Input::Ignored => {}
            Input::Line => {
                mu_write(input.echo());
                match line.line() {
                    Some(b"exit") => return,
                    Some(b"status") => print_status(session),
                    Some(b"") | None => {}
                    Some(cmd) => match session.write(cmd) {
                        Ok(n) => println!("ok ({} bytes)", n),
                        Err(e) => println!("error {}: {}", e.code(), e),
                    },
                }
                line.clear();
                print!("> ");
            }
        }
    }
}

fn print_status(session: &mut Session<'_, RegisterSet, GenericTimer>) {
    let mut buf = [0u8; 16];
    loop {
        let n = session.read(&mut buf);
        if n == 0 {
            break;
        }
        // The status line ends with a NUL meant for C readers.
        let text = buf[..n].split(|&b| b == 0).next().unwrap_or(&[]);
        mu_write(text);
    }
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    if MiniUART::is_setup() {
        println!("[PANIC] {}", info);
    }
    utils::halt()
}
