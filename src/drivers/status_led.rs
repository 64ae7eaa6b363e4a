//! Capture indicator LED.
//!
//! A single GPIO-driven LED that is lit while a received pulse train is
//! being written to the console.  Generic over any `embedded-hal` output
//! pin so host tests can substitute a recording mock; on target it wraps
//! an `esp_idf_hal::gpio::PinDriver` in output mode.

use embedded_hal::digital::OutputPin;
use log::warn;

use crate::app::ports::IndicatorPort;

pub struct StatusLed<P: OutputPin> {
    pin: P,
    lit: bool,
}

impl<P: OutputPin> StatusLed<P> {
    /// Wrap `pin` and drive it low.
    pub fn new(mut pin: P) -> Self {
        if pin.set_low().is_err() {
            warn!("StatusLed: initial set_low failed");
        }
        Self { pin, lit: false }
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> IndicatorPort for StatusLed<P> {
    fn set_active(&mut self, on: bool) {
        let res = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        match res {
            Ok(()) => self.lit = on,
            Err(_) => warn!("StatusLed: pin write failed (on={})", on),
        }
    }
}
