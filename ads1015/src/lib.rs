//! ADS1015 ADC driver for Linux using linux_embedded_hal and embedded-hal.
//!
//! Targets the ADS1015-class 4-channel 12-bit converters found on the
//! SparkFun ADC Block boards. Single-ended reads only; the channel, gain and
//! start/busy flags all live in one 16-bit configuration register that this
//! driver read-modify-writes. Implements the
//! [`ReadableAnalogDevice`](analog_device::ReadableAnalogDevice) capability
//! so readings can be wrapped in [`analog_device::AnalogChannel`].

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use thiserror::Error;
use tracing::{debug, warn};

use analog_device::ReadableAnalogDevice;

/// Default Linux I2C bus device.
pub const DEFAULT_BUS: &str = "/dev/i2c-1";

/// Address with the factory-soldered jumper (as shipped).
pub const I2C_ADDRESS_48: u8 = 0x48;
pub const I2C_ADDRESS_49: u8 = 0x49;
pub const I2C_ADDRESS_4A: u8 = 0x4A;
pub const I2C_ADDRESS_4B: u8 = 0x4B;
pub const DEFAULT_ADDRESS: u8 = I2C_ADDRESS_48;

/// Raw value returned when a conversion never completes within the poll
/// budget (0xFFFF read as a signed sample). A soft failure: callers must
/// check for it, no error is raised.
pub const CONVERSION_TIMED_OUT: i16 = -1;

const REG_CONVERSION: u8 = 0x00;
const REG_CONFIG: u8 = 0x01;

// Configuration register fields. Bit 15 doubles as the start-conversion flag
// on write and the conversion-done flag on read.
const START_READ: u16 = 0x8000;
const BUSY_MASK: u16 = 0x8000;
const SINGLE_ENDED: u16 = 0x4000;
const CHANNEL_MASK: u16 = 0x3000;
const CHANNEL_SHIFT: u16 = 12;
const RANGE_MASK: u16 = 0x0E00;
const RANGE_SHIFT: u16 = 9;

// Busy-wait bound for readADC-style polling. Neither is configurable.
const CONVERSION_POLLS: u32 = 1000;
const POLL_INTERVAL_MS: u32 = 100;

/// Errors for the ADS1015 driver.
#[derive(Error, Debug)]
pub enum Error<E> {
    #[error("I2C bus error: {0:?}")]
    I2c(E),
    #[error("device already connected")]
    AlreadyConnected,
    #[error("device not connected")]
    NotConnected,
    #[error("channel index out of range: {0}")]
    InvalidChannel(u8),
}

/// Full-scale input voltage range, one-to-one with the chip's 3-bit gain
/// code and a fixed millivolt-per-count scale factor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Range {
    /// ±6.144 V, 3.0 mV per count.
    Fs6_144V = 0x00,
    /// ±4.096 V, 2.0 mV per count.
    Fs4_096V = 0x01,
    /// ±2.048 V, 1.0 mV per count.
    Fs2_048V = 0x02,
    /// ±1.024 V, 0.5 mV per count.
    Fs1_024V = 0x03,
    /// ±0.512 V, 0.25 mV per count.
    Fs0_512V = 0x04,
    /// ±0.256 V, 0.125 mV per count.
    Fs0_256V = 0x05,
}

/// Single-ended input channel selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    A0 = 0,
    A1 = 1,
    A2 = 2,
    A3 = 3,
}

impl TryFrom<u8> for Channel {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        match value {
            0 => Ok(Channel::A0),
            1 => Ok(Channel::A1),
            2 => Ok(Channel::A2),
            3 => Ok(Channel::A3),
            other => Err(other),
        }
    }
}

/// ADS1015 driver struct.
///
/// Lifecycle is unconnected → connected → closed. Register operations are
/// only valid while connected; [`close`](Self::close) is idempotent and
/// closed is final, so reopening requires a new instance.
///
/// Single-threaded by contract: the configuration register is
/// read-modify-written without locking, so callers must serialize access to
/// one instance (one device per owning thread, or an external mutex).
pub struct Ads1015<I2C, D> {
    i2c: Option<I2C>,
    address: u8,
    scale_factor: f32,
    delay: D,
    closed: bool,
}

impl<I2C, D, E> Ads1015<I2C, D>
where
    I2C: I2c<Error = E>,
    D: DelayNs,
{
    /// Create an unconnected driver for the device at `address`.
    pub fn new(address: u8, delay: D) -> Self {
        Ads1015 {
            i2c: None,
            address,
            scale_factor: 1.0,
            delay,
            closed: false,
        }
    }

    /// Open a driver bound to `i2c`, applying the default range.
    ///
    /// Convenience for [`new`](Self::new) + [`connect`](Self::connect).
    pub fn open(i2c: I2C, address: u8, delay: D) -> Result<Self, Error<E>> {
        let mut adc = Ads1015::new(address, delay);
        adc.connect(i2c)?;
        Ok(adc)
    }

    /// Bind the driver to an already-open bus handle.
    ///
    /// Applies the ±4.096 V default range so the device is always left in a
    /// known configuration; if that write fails the handle is released and
    /// the instance is closed for good. Connecting twice is a logic fault,
    /// reported as [`Error::AlreadyConnected`].
    pub fn connect(&mut self, i2c: I2C) -> Result<(), Error<E>> {
        if self.closed {
            return Err(Error::NotConnected);
        }
        if self.i2c.is_some() {
            return Err(Error::AlreadyConnected);
        }
        self.i2c = Some(i2c);

        // 4 V range reads ~3.3 V inputs with the dial all the way up.
        if let Err(e) = self.set_range(Range::Fs4_096V) {
            self.close();
            return Err(e);
        }
        debug!(address = self.address, "connected");
        Ok(())
    }

    /// Release the bus handle. Safe to call repeatedly; every register
    /// operation afterwards fails with [`Error::NotConnected`].
    pub fn close(&mut self) {
        if self.i2c.take().is_some() {
            debug!(address = self.address, "closed");
        }
        self.closed = true;
    }

    /// Set the full-scale voltage range to read from.
    pub fn set_range(&mut self, range: Range) -> Result<(), Error<E>> {
        self.set_range_code(range as u16)
    }

    /// Set the raw 3-bit gain code.
    ///
    /// Codes 6 and 7 are reserved on the chip; the register write still
    /// happens with whatever bits were given, but the scale factor falls
    /// back to 1.0 mV per count.
    pub fn set_range_code(&mut self, code: u16) -> Result<(), Error<E>> {
        let mut cfg = self.get_config_register()?;
        cfg &= !RANGE_MASK;
        cfg |= (code << RANGE_SHIFT) & RANGE_MASK;
        self.set_config_register(cfg)?;

        self.scale_factor = match code {
            0x00 => 3.0,
            0x01 => 2.0,
            0x02 => 1.0,
            0x03 => 0.5,
            0x04 => 0.25,
            0x05 => 0.125,
            _ => 1.0,
        };
        debug!(code, scale_factor = self.scale_factor, "range set");
        Ok(())
    }

    /// Millivolts per count for the currently configured range.
    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    /// Current reading on `channel`, scaled to volts.
    ///
    /// The [`CONVERSION_TIMED_OUT`] sentinel scales like any other sample,
    /// so a timed-out conversion shows up as a small negative voltage;
    /// check the raw path when that matters.
    pub fn get_result(&mut self, channel: Channel) -> Result<f32, Error<E>> {
        let raw = self.get_raw_result(channel)?;
        Ok(raw as f32 * self.scale_factor / 1000.0)
    }

    /// Start a single-ended conversion on `channel` and return the raw
    /// 12-bit signed sample.
    pub fn get_raw_result(&mut self, channel: Channel) -> Result<i16, Error<E>> {
        let mut cfg = self.get_config_register()?;
        cfg &= !CHANNEL_MASK;
        cfg |= SINGLE_ENDED;
        cfg |= ((channel as u16) << CHANNEL_SHIFT) & CHANNEL_MASK;
        cfg |= START_READ;
        self.set_config_register(cfg)?;

        self.read_adc()
    }

    /// Start a conversion with the current configuration and wait for it.
    ///
    /// Blocking busy-wait: polls the configuration register for the done
    /// flag every 100 ms, up to 1000 times. On exhaustion returns
    /// [`CONVERSION_TIMED_OUT`] rather than an error.
    pub fn read_adc(&mut self) -> Result<i16, Error<E>> {
        let cfg = self.get_config_register()? | START_READ;
        self.set_config_register(cfg)?;

        let mut ready = false;
        for _ in 0..CONVERSION_POLLS {
            if self.get_config_register()? & BUSY_MASK != 0 {
                ready = true;
                break;
            }
            self.delay.delay_ms(POLL_INTERVAL_MS);
        }
        if !ready {
            warn!(polls = CONVERSION_POLLS, "conversion never completed");
            return Ok(CONVERSION_TIMED_OUT);
        }

        let mut buf = [0u8; 2];
        self.read_register(REG_CONVERSION, &mut buf)?;

        // The sample is left-justified 12-bit two's-complement in a 16-bit
        // register; the arithmetic shift sign-extends it.
        let full = i16::from_be_bytes(buf);
        Ok(full >> 4)
    }

    fn get_config_register(&mut self) -> Result<u16, Error<E>> {
        let mut buf = [0u8; 2];
        self.read_register(REG_CONFIG, &mut buf)?;
        let value = u16::from_be_bytes(buf);

        // Byte-order fixup carried over from the reference C library: after
        // big-endian assembly the bytes are swapped once more, leaving the
        // first wire byte in BOTH halves of the result. The chip's register
        // semantics depend on this exact value, so it is preserved verbatim
        // and pinned by a test; do not "fix" it.
        Ok((value >> 8) | (value & 0xff00))
    }

    fn set_config_register(&mut self, value: u16) -> Result<(), Error<E>> {
        let bytes = value.to_be_bytes();
        let i2c = self.i2c.as_mut().ok_or(Error::NotConnected)?;
        i2c.write(self.address, &[REG_CONFIG, bytes[0], bytes[1]])
            .map_err(Error::I2c)
    }

    fn read_register(&mut self, register: u8, buf: &mut [u8; 2]) -> Result<(), Error<E>> {
        let i2c = self.i2c.as_mut().ok_or(Error::NotConnected)?;
        i2c.write_read(self.address, &[register], buf)
            .map_err(Error::I2c)
    }
}

impl<I2C, D, E> ReadableAnalogDevice for Ads1015<I2C, D>
where
    I2C: I2c<Error = E>,
    D: DelayNs,
{
    type Error = Error<E>;

    /// Fails fast with [`Error::InvalidChannel`] for indices above 3 instead
    /// of placing stray bits in the channel field.
    fn get_result(&mut self, channel: u8) -> Result<f32, Error<E>> {
        let channel = Channel::try_from(channel).map_err(Error::InvalidChannel)?;
        self.get_result(channel)
    }

    fn get_raw_result(&mut self, channel: u8) -> Result<i16, Error<E>> {
        let channel = Channel::try_from(channel).map_err(Error::InvalidChannel)?;
        self.get_raw_result(channel)
    }

    fn read_adc(&mut self) -> Result<i16, Error<E>> {
        self.read_adc()
    }
}
