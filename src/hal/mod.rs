use crate::error::AppError;
use std::time::Duration;

pub mod leds;
pub mod mock;
pub mod servo;
pub mod sonar;

/// MB-series sonars report 58 us of pulse width per centimeter of range.
pub const US_PER_CM: f32 = 58.0;

/// Bounded wait for the echo pulse before a read is declared a timeout.
pub const ECHO_TIMEOUT: Duration = Duration::from_millis(50);

/// Distance substituted for a timed-out read under the penalize policy:
/// the full 50 ms echo window divided by 58 us/cm. Far beyond any seat.
pub const NO_ECHO_DISTANCE_CM: f32 = 862.0;

/// Servo home position, pointing at seat 0.
pub const HOME_ANGLE_DEG: f32 = 0.0;

/// Outcome of a single sonar read. A timed-out echo window is reported
/// as `NoEcho` rather than an in-band distance; the sampling layer decides
/// what it contributes to an average.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Echo {
    Range(f32),
    NoEcho,
}

pub trait RangeFinder {
    /// Trigger one measurement and wait up to [`ECHO_TIMEOUT`] for the echo.
    /// Blocks the calling thread for the duration of the pulse.
    fn read_distance_cm(&mut self) -> Result<Echo, AppError>;
}

pub trait ScanServo {
    /// Command the servo to `angle_deg`, clamped to [0, 180]. There is no
    /// arrival acknowledgement; callers must wait a settle delay before
    /// trusting a subsequent sonar reading.
    fn point_at(&mut self, angle_deg: f32) -> Result<(), AppError>;
}

pub trait IndicatorPanel {
    /// Active-low-occupied: a free seat lights its indicator, an occupied
    /// seat darkens it. Seats without a wired indicator are ignored.
    fn set_seat(&mut self, seat: usize, occupied: bool) -> Result<(), AppError>;
    fn set_scanning(&mut self, on: bool) -> Result<(), AppError>;
    /// Latch every output on. Asserted when hardware init fails.
    fn error_pattern(&mut self) -> Result<(), AppError>;
    fn clear_all(&mut self) -> Result<(), AppError>;
}

/// Blocking-delay seam so calibration and scan passes are testable without
/// real time passing.
pub trait Pacer {
    fn pause(&mut self, duration: Duration);
}

#[derive(Debug, Default)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn pause(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
