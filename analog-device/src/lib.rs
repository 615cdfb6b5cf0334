//! Channel-based voltage reads from analog input devices.
//!
//! [`ReadableAnalogDevice`] is the capability any multi-channel ADC driver
//! implements; [`AnalogChannel`] pairs such a driver with one channel index
//! and a label and exposes a simplified per-channel reading API.

use std::cell::RefCell;

use tracing::debug;

/// Capability for any device driver that allows channel-based voltage reads
/// from analog input.
pub trait ReadableAnalogDevice {
    /// Error type of the underlying driver.
    type Error;

    /// Read `channel` and return its value scaled to volts.
    fn get_result(&mut self, channel: u8) -> Result<f32, Self::Error>;

    /// Read `channel` and return the raw signed sample in ADC counts.
    fn get_raw_result(&mut self, channel: u8) -> Result<i16, Self::Error>;

    /// Force a conversion with the current device configuration and return
    /// the raw signed sample.
    fn read_adc(&mut self) -> Result<i16, Self::Error>;
}

/// One named analog input on a shared [`ReadableAnalogDevice`].
///
/// Several channels may borrow the same device through a [`RefCell`]; the
/// model is single-threaded, so callers must not hold a borrow across an
/// `update` call on another channel of the same device.
#[derive(Debug)]
pub struct AnalogChannel<'a, D> {
    device: &'a RefCell<D>,
    channel: u8,
    label: String,
    current_voltage: f32,
    last_voltage: f32,
    normalized: f32,
}

impl<'a, D: ReadableAnalogDevice> AnalogChannel<'a, D> {
    /// Create a channel adapter for input `channel` of `device`.
    ///
    /// `label` is a display name only; it has no effect on readings.
    pub fn new(device: &'a RefCell<D>, channel: u8, label: impl Into<String>) -> Self {
        AnalogChannel {
            device,
            channel,
            label: label.into(),
            current_voltage: 0.0,
            last_voltage: 0.0,
            normalized: 0.0,
        }
    }

    /// Read the channel through the underlying driver, store and return the
    /// voltage. Driver errors propagate unchanged.
    pub fn update(&mut self) -> Result<f32, D::Error> {
        self.last_voltage = self.device.borrow_mut().get_result(self.channel)?;
        debug!(channel = self.channel, label = %self.label, volts = self.last_voltage, "updated");
        Ok(self.last_voltage)
    }

    /// Inject an externally-obtained voltage without touching hardware,
    /// e.g. an averaged value computed elsewhere.
    pub fn set_voltage(&mut self, voltage: f32) {
        self.current_voltage = voltage;
    }

    /// Current voltage as a fraction of `max_voltage`, clamped to [0, 1].
    ///
    /// The division is not guarded: `max_voltage == 0.0` produces ±inf which
    /// clamps to the nearest bound, and `0.0 / 0.0` is NaN, which passes
    /// through the clamp unchanged.
    pub fn get_normalized(&mut self, max_voltage: f32) -> f32 {
        self.normalized = (self.current_voltage / max_voltage).clamp(0.0, 1.0);
        self.normalized
    }

    /// Channel index on the underlying device.
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Display name given at construction.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Shared handle to the underlying driver.
    pub fn device(&self) -> &'a RefCell<D> {
        self.device
    }

    /// Last value passed to [`set_voltage`](Self::set_voltage).
    pub fn current_voltage(&self) -> f32 {
        self.current_voltage
    }

    /// Last value read by [`update`](Self::update).
    pub fn last_voltage(&self) -> f32 {
        self.last_voltage
    }
}
