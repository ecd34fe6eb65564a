use crate::error::AppError;
use crate::hal::IndicatorPanel;

#[cfg(target_os = "linux")]
use rppal::gpio::{Gpio, OutputPin};

/// One GPIO output per seat plus an optional scanning indicator.
#[cfg(target_os = "linux")]
pub struct GpioPanel {
    seats: Vec<OutputPin>,
    scanning: Option<OutputPin>,
}

#[cfg(target_os = "linux")]
impl GpioPanel {
    pub fn new(seat_pins: &[u8], scanning_pin: Option<u8>) -> Result<Self, AppError> {
        let gpio = Gpio::new().map_err(|e| AppError::Gpio(e.to_string()))?;
        let mut seats = Vec::with_capacity(seat_pins.len());
        for &pin in seat_pins {
            let out = gpio
                .get(pin)
                .map_err(|e| AppError::Gpio(e.to_string()))?
                .into_output_low();
            seats.push(out);
        }
        let scanning = match scanning_pin {
            Some(pin) => Some(
                gpio.get(pin)
                    .map_err(|e| AppError::Gpio(e.to_string()))?
                    .into_output_low(),
            ),
            None => None,
        };
        Ok(Self { seats, scanning })
    }
}

#[cfg(target_os = "linux")]
impl IndicatorPanel for GpioPanel {
    fn set_seat(&mut self, seat: usize, occupied: bool) -> Result<(), AppError> {
        if let Some(pin) = self.seats.get_mut(seat) {
            if occupied {
                pin.set_low();
            } else {
                pin.set_high();
            }
        }
        Ok(())
    }

    fn set_scanning(&mut self, on: bool) -> Result<(), AppError> {
        if let Some(pin) = self.scanning.as_mut() {
            if on {
                pin.set_high();
            } else {
                pin.set_low();
            }
        }
        Ok(())
    }

    fn error_pattern(&mut self) -> Result<(), AppError> {
        for pin in &mut self.seats {
            pin.set_high();
        }
        if let Some(pin) = self.scanning.as_mut() {
            pin.set_high();
        }
        Ok(())
    }

    fn clear_all(&mut self) -> Result<(), AppError> {
        for pin in &mut self.seats {
            pin.set_low();
        }
        if let Some(pin) = self.scanning.as_mut() {
            pin.set_low();
        }
        Ok(())
    }
}

#[cfg(not(target_os = "linux"))]
pub struct GpioPanel;

#[cfg(not(target_os = "linux"))]
impl GpioPanel {
    pub fn new(_seat_pins: &[u8], _scanning_pin: Option<u8>) -> Result<Self, AppError> {
        Err(AppError::Gpio(
            "indicator panel requires Linux/Raspberry Pi".to_string(),
        ))
    }
}

#[cfg(not(target_os = "linux"))]
impl IndicatorPanel for GpioPanel {
    fn set_seat(&mut self, _seat: usize, _occupied: bool) -> Result<(), AppError> {
        Ok(())
    }

    fn set_scanning(&mut self, _on: bool) -> Result<(), AppError> {
        Ok(())
    }

    fn error_pattern(&mut self) -> Result<(), AppError> {
        Ok(())
    }

    fn clear_all(&mut self) -> Result<(), AppError> {
        Ok(())
    }
}
