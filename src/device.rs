//! Character-device style access to a [`Blaster`]: one session at a time, commands are
//! written, the status line is read.

use embedded_hal::delay::DelayNs;

use crate::blaster::Blaster;
use crate::drivers::RegisterBus;
use crate::engine::Status;
use crate::error::DeviceError;

pub struct BlasterDevice<B, D> {
    blaster: spin::Mutex<Blaster<B, D>>,
}

impl<B: RegisterBus, D: DelayNs> BlasterDevice<B, D> {
    pub fn new(blaster: Blaster<B, D>) -> Self {
        BlasterDevice {
            blaster: spin::Mutex::new(blaster),
        }
    }

    /// Opens a session. Fails with [`DeviceError::Busy`] instead of waiting when another session
    /// is open. Dropping the session closes it.
    pub fn open(&self) -> Result<Session<'_, B, D>, DeviceError<'static>> {
        let guard = self.blaster.try_lock().ok_or(DeviceError::Busy)?;
        log::debug!("session opened");
        Ok(Session {
            blaster: guard,
            read_offset: 0,
        })
    }

    pub fn is_open(&self) -> bool {
        self.blaster.is_locked()
    }

    /// Gives the blaster back, for teardown.
    pub fn into_inner(self) -> Blaster<B, D> {
        self.blaster.into_inner()
    }
}

/// Exclusive access to the device.
pub struct Session<'d, B, D> {
    blaster: spin::MutexGuard<'d, Blaster<B, D>>,
    read_offset: usize,
}

impl<'d, B: RegisterBus, D: DelayNs> Session<'d, B, D> {
    /// Runs one command. On success the whole buffer counts as consumed.
    pub fn write<'a>(&mut self, bytes: &'a [u8]) -> Result<usize, DeviceError<'a>> {
        self.blaster.handle_command(bytes)?;
        Ok(bytes.len())
    }

    /// Copies the next chunk of the status line, NUL terminator included, into `buf`.
    ///
    /// Successive calls continue where the last one stopped. Once the whole line has been
    /// delivered one call returns 0 and the next starts over with a fresh status. An empty
    /// `buf` also returns 0 but leaves the position untouched.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        if buf.is_empty() {
            return 0;
        }

        let msg = self.status().message();

        if self.read_offset >= msg.len() {
            self.read_offset = 0;
            return 0;
        }

        let chunk = &msg[self.read_offset..];
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        self.read_offset += n;
        n
    }

    pub fn status(&self) -> Status {
        self.blaster.status()
    }
}

impl<B, D> Drop for Session<'_, B, D> {
    fn drop(&mut self) {
        log::debug!("session closed");
    }
}
