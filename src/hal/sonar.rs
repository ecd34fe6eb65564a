use crate::error::AppError;
use crate::hal::{Echo, RangeFinder};

#[cfg(target_os = "linux")]
use crate::hal::{ECHO_TIMEOUT, US_PER_CM};
#[cfg(target_os = "linux")]
use rppal::gpio::{Gpio, InputPin};
#[cfg(target_os = "linux")]
use std::time::Instant;

/// Pulse-width sonar on a single GPIO line. The sensor holds the line high
/// for 58 us per centimeter of measured range; distance is recovered by
/// timing the pulse. Reads busy-wait on the line level and may block for up
/// to two echo windows (100 ms).
#[cfg(target_os = "linux")]
pub struct PulseSonar {
    pin: InputPin,
}

#[cfg(target_os = "linux")]
impl PulseSonar {
    pub fn new(pin: u8) -> Result<Self, AppError> {
        let gpio = Gpio::new().map_err(|e| AppError::Gpio(e.to_string()))?;
        let pin = gpio
            .get(pin)
            .map_err(|e| AppError::Gpio(e.to_string()))?
            .into_input_pullup();
        Ok(Self { pin })
    }
}

#[cfg(target_os = "linux")]
impl RangeFinder for PulseSonar {
    fn read_distance_cm(&mut self) -> Result<Echo, AppError> {
        let opened = Instant::now();
        while self.pin.is_low() {
            if opened.elapsed() >= ECHO_TIMEOUT {
                return Ok(Echo::NoEcho);
            }
        }

        let rose = Instant::now();
        while self.pin.is_high() {
            if rose.elapsed() >= ECHO_TIMEOUT {
                return Ok(Echo::NoEcho);
            }
        }

        let pulse_us = rose.elapsed().as_micros() as f32;
        Ok(Echo::Range(pulse_us / US_PER_CM))
    }
}

/// Placeholder so non-Pi builds still link; construction always fails.
#[cfg(not(target_os = "linux"))]
pub struct PulseSonar;

#[cfg(not(target_os = "linux"))]
impl PulseSonar {
    pub fn new(_pin: u8) -> Result<Self, AppError> {
        Err(AppError::Gpio(
            "pulse sonar requires Linux/Raspberry Pi".to_string(),
        ))
    }
}

#[cfg(not(target_os = "linux"))]
impl RangeFinder for PulseSonar {
    fn read_distance_cm(&mut self) -> Result<Echo, AppError> {
        Err(AppError::Sensor("no sonar on this platform".to_string()))
    }
}
