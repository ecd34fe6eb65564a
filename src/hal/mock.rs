use crate::error::AppError;
use crate::hal::{Echo, IndicatorPanel, Pacer, RangeFinder, ScanServo};
use std::time::Duration;

/// Scripted sonar: returns echoes from the script in order, repeating the
/// last entry once exhausted. An empty script always times out.
#[derive(Debug, Clone)]
pub struct MockSonar {
    script: Vec<Echo>,
    next_index: usize,
    pub reads: usize,
    fail_reads: bool,
}

impl MockSonar {
    pub fn sequence(script: Vec<Echo>) -> Self {
        Self {
            script,
            next_index: 0,
            reads: 0,
            fail_reads: false,
        }
    }

    pub fn constant(distance_cm: f32) -> Self {
        Self::sequence(vec![Echo::Range(distance_cm)])
    }

    pub fn silent() -> Self {
        Self::sequence(Vec::new())
    }

    pub fn failing() -> Self {
        Self {
            script: Vec::new(),
            next_index: 0,
            reads: 0,
            fail_reads: true,
        }
    }
}

impl RangeFinder for MockSonar {
    fn read_distance_cm(&mut self) -> Result<Echo, AppError> {
        self.reads += 1;
        if self.fail_reads {
            return Err(AppError::Sensor("mock read failed".to_string()));
        }
        let echo = match self.script.get(self.next_index) {
            Some(echo) => {
                self.next_index += 1;
                *echo
            }
            None => *self.script.last().unwrap_or(&Echo::NoEcho),
        };
        Ok(echo)
    }
}

/// Records every commanded angle.
#[derive(Debug, Default)]
pub struct MockServo {
    pub commands: Vec<f32>,
    pub fail_commands: bool,
}

impl MockServo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            commands: Vec::new(),
            fail_commands: true,
        }
    }
}

impl ScanServo for MockServo {
    fn point_at(&mut self, angle_deg: f32) -> Result<(), AppError> {
        if self.fail_commands {
            return Err(AppError::Pwm("mock servo failed".to_string()));
        }
        self.commands.push(angle_deg);
        Ok(())
    }
}

/// Records indicator state per seat plus every scanning-indicator toggle.
#[derive(Debug, Default)]
pub struct MockPanel {
    pub seats: Vec<(usize, bool)>,
    pub scanning: bool,
    pub scanning_toggles: Vec<bool>,
    pub error_asserted: bool,
    pub cleared: usize,
}

impl MockPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last recorded occupied flag for a seat, if any scan touched it.
    pub fn seat_state(&self, seat: usize) -> Option<bool> {
        self.seats
            .iter()
            .rev()
            .find(|(index, _)| *index == seat)
            .map(|(_, occupied)| *occupied)
    }
}

impl IndicatorPanel for MockPanel {
    fn set_seat(&mut self, seat: usize, occupied: bool) -> Result<(), AppError> {
        self.seats.push((seat, occupied));
        Ok(())
    }

    fn set_scanning(&mut self, on: bool) -> Result<(), AppError> {
        self.scanning = on;
        self.scanning_toggles.push(on);
        Ok(())
    }

    fn error_pattern(&mut self) -> Result<(), AppError> {
        self.error_asserted = true;
        Ok(())
    }

    fn clear_all(&mut self) -> Result<(), AppError> {
        self.cleared += 1;
        self.error_asserted = false;
        Ok(())
    }
}

/// Returns immediately, recording each requested pause.
#[derive(Debug, Default)]
pub struct MockPacer {
    pub pauses: Vec<Duration>,
}

impl MockPacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> Duration {
        self.pauses.iter().sum()
    }
}

impl Pacer for MockPacer {
    fn pause(&mut self, duration: Duration) {
        self.pauses.push(duration);
    }
}
