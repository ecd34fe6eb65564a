use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("pwm error: {0}")]
    Pwm(String),
    #[error("sensor error: {0}")]
    Sensor(String),
    #[error("no pwm channel {0} on this board")]
    PwmChannel(u8),
    #[error("sonar too close at init: {measured_cm:.1}cm, need {required_cm:.1}cm clearance")]
    InitClearance { measured_cm: f32, required_cm: f32 },
    #[error("no echo from sonar during init clearance check")]
    InitNoEcho,
}
