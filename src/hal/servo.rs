use crate::error::AppError;
use crate::hal::ScanServo;

#[cfg(target_os = "linux")]
use rppal::pwm::{Channel, Polarity, Pwm};
#[cfg(target_os = "linux")]
use std::time::Duration;

/// Standard hobby-servo timing: 50 Hz frame, 1.0 ms pulse at 0 degrees,
/// 2.0 ms at 180 degrees.
#[cfg(target_os = "linux")]
const FRAME: Duration = Duration::from_millis(20);
const MIN_PULSE_US: f32 = 1000.0;
const MAX_PULSE_US: f32 = 2000.0;

pub const MAX_ANGLE_DEG: f32 = 180.0;

#[cfg(target_os = "linux")]
pub struct PwmServo {
    pwm: Pwm,
}

#[cfg(target_os = "linux")]
impl PwmServo {
    /// Claim a hardware PWM channel and park the servo at 0 degrees.
    pub fn new(channel: u8) -> Result<Self, AppError> {
        let channel = match channel {
            0 => Channel::Pwm0,
            1 => Channel::Pwm1,
            other => return Err(AppError::PwmChannel(other)),
        };
        let pwm = Pwm::with_period(
            channel,
            FRAME,
            Duration::from_micros(MIN_PULSE_US as u64),
            Polarity::Normal,
            true,
        )
        .map_err(|e| AppError::Pwm(e.to_string()))?;
        Ok(Self { pwm })
    }
}

#[cfg(target_os = "linux")]
impl ScanServo for PwmServo {
    fn point_at(&mut self, angle_deg: f32) -> Result<(), AppError> {
        let pulse_us = pulse_for_angle(angle_deg);
        self.pwm
            .set_pulse_width(Duration::from_micros(pulse_us as u64))
            .map_err(|e| AppError::Pwm(e.to_string()))
    }
}

/// Linear map from a clamped angle to pulse width in microseconds.
pub fn pulse_for_angle(angle_deg: f32) -> f32 {
    let angle = angle_deg.clamp(0.0, MAX_ANGLE_DEG);
    MIN_PULSE_US + (MAX_PULSE_US - MIN_PULSE_US) * angle / MAX_ANGLE_DEG
}

#[cfg(not(target_os = "linux"))]
pub struct PwmServo;

#[cfg(not(target_os = "linux"))]
impl PwmServo {
    pub fn new(_channel: u8) -> Result<Self, AppError> {
        Err(AppError::Pwm(
            "hardware pwm requires Linux/Raspberry Pi".to_string(),
        ))
    }
}

#[cfg(not(target_os = "linux"))]
impl ScanServo for PwmServo {
    fn point_at(&mut self, _angle_deg: f32) -> Result<(), AppError> {
        Err(AppError::Pwm("no servo on this platform".to_string()))
    }
}
