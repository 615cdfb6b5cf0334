use std::cell::RefCell;

use ads1015::{Ads1015, Channel, Range, DEFAULT_ADDRESS, DEFAULT_BUS};
use analog_device::AnalogChannel;
use linux_embedded_hal::{Delay, I2cdev};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let i2c = I2cdev::new(DEFAULT_BUS)?;
    let mut adc = Ads1015::open(i2c, DEFAULT_ADDRESS, Delay)?;

    adc.set_range(Range::Fs4_096V)?;
    let volts = adc.get_result(Channel::A0)?;
    println!("A0: {:.3} V", volts);

    let adc = RefCell::new(adc);
    let mut pot = AnalogChannel::new(&adc, 0, "potentiometer");
    let volts = pot.update()?;
    pot.set_voltage(volts);
    let normalized = pot.get_normalized(3.3);
    println!("{}: {:.1} %", pot.label(), 100.0 * normalized);

    adc.borrow_mut().close();
    Ok(())
}
