use crate::hal::{Echo, NO_ECHO_DISTANCE_CM, Pacer, RangeFinder, ScanServo};
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

/// What a timed-out sonar read contributes to a seat average.
///
/// `Penalize` folds the no-echo distance into the mean, pulling the seat
/// toward "free". `Exclude` drops the sample from the mean instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeoutPolicy {
    Penalize,
    Exclude,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self::Penalize
    }
}

#[derive(Debug, Clone)]
pub struct SamplingConfig {
    pub calibration_samples: u8,
    pub scan_samples: u8,
    pub settle_delay: Duration,
    pub sample_delay: Duration,
    pub seat_delay: Duration,
    pub timeout_policy: TimeoutPolicy,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            calibration_samples: 5,
            scan_samples: 3,
            settle_delay: Duration::from_millis(300),
            sample_delay: Duration::from_millis(60),
            seat_delay: Duration::from_millis(200),
            timeout_policy: TimeoutPolicy::default(),
        }
    }
}

/// Point the servo at a seat, wait for it to settle, and average `samples`
/// sonar reads with the configured inter-sample delay. Blocks the calling
/// thread for the settle delay plus `samples - 1` sample delays.
///
/// Hardware errors are folded in as timeouts so a pass always completes;
/// the policy decides what a timeout contributes. If the policy excluded
/// every sample the average degenerates to the no-echo distance, which an
/// empty seat is indistinguishable from.
pub fn sample_seat<S, R, P>(
    servo: &mut S,
    sonar: &mut R,
    pacer: &mut P,
    config: &SamplingConfig,
    angle_deg: f32,
    samples: u8,
) -> f32
where
    S: ScanServo,
    R: RangeFinder,
    P: Pacer,
{
    if let Err(err) = servo.point_at(angle_deg) {
        warn!(angle_deg, error = %err, "servo command failed, sampling anyway");
    }
    pacer.pause(config.settle_delay);

    let mut sum = 0.0f32;
    let mut counted = 0u32;
    for sample in 0..samples {
        if sample > 0 {
            pacer.pause(config.sample_delay);
        }
        let echo = match sonar.read_distance_cm() {
            Ok(echo) => echo,
            Err(err) => {
                warn!(error = %err, "sonar read failed, treating as no echo");
                Echo::NoEcho
            }
        };
        match echo {
            Echo::Range(cm) => {
                sum += cm;
                counted += 1;
            }
            Echo::NoEcho => {
                if config.timeout_policy == TimeoutPolicy::Penalize {
                    sum += NO_ECHO_DISTANCE_CM;
                    counted += 1;
                }
            }
        }
    }

    if counted == 0 {
        return NO_ECHO_DISTANCE_CM;
    }
    sum / counted as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::mock::{MockPacer, MockServo, MockSonar};

    fn config(policy: TimeoutPolicy) -> SamplingConfig {
        SamplingConfig {
            timeout_policy: policy,
            ..SamplingConfig::default()
        }
    }

    #[test]
    fn averages_all_samples() {
        let mut servo = MockServo::new();
        let mut sonar = MockSonar::sequence(vec![
            Echo::Range(90.0),
            Echo::Range(100.0),
            Echo::Range(110.0),
        ]);
        let mut pacer = MockPacer::new();

        let avg = sample_seat(
            &mut servo,
            &mut sonar,
            &mut pacer,
            &config(TimeoutPolicy::Penalize),
            40.0,
            3,
        );

        assert_eq!(avg, 100.0);
        assert_eq!(servo.commands, vec![40.0]);
        assert_eq!(sonar.reads, 3);
    }

    #[test]
    fn penalize_folds_no_echo_distance_into_average() {
        let mut servo = MockServo::new();
        let mut sonar = MockSonar::sequence(vec![Echo::Range(100.0), Echo::NoEcho]);
        let mut pacer = MockPacer::new();

        let avg = sample_seat(
            &mut servo,
            &mut sonar,
            &mut pacer,
            &config(TimeoutPolicy::Penalize),
            0.0,
            2,
        );

        assert_eq!(avg, (100.0 + NO_ECHO_DISTANCE_CM) / 2.0);
    }

    #[test]
    fn exclude_drops_timed_out_samples() {
        let mut servo = MockServo::new();
        let mut sonar = MockSonar::sequence(vec![
            Echo::Range(100.0),
            Echo::NoEcho,
            Echo::Range(110.0),
        ]);
        let mut pacer = MockPacer::new();

        let avg = sample_seat(
            &mut servo,
            &mut sonar,
            &mut pacer,
            &config(TimeoutPolicy::Exclude),
            0.0,
            3,
        );

        assert_eq!(avg, 105.0);
    }

    #[test]
    fn all_samples_excluded_reads_as_no_echo_distance() {
        let mut servo = MockServo::new();
        let mut sonar = MockSonar::silent();
        let mut pacer = MockPacer::new();

        let avg = sample_seat(
            &mut servo,
            &mut sonar,
            &mut pacer,
            &config(TimeoutPolicy::Exclude),
            0.0,
            3,
        );

        assert_eq!(avg, NO_ECHO_DISTANCE_CM);
    }

    #[test]
    fn read_errors_count_as_timeouts_and_the_pass_completes() {
        let mut servo = MockServo::new();
        let mut sonar = MockSonar::failing();
        let mut pacer = MockPacer::new();

        let avg = sample_seat(
            &mut servo,
            &mut sonar,
            &mut pacer,
            &config(TimeoutPolicy::Penalize),
            0.0,
            3,
        );

        assert_eq!(avg, NO_ECHO_DISTANCE_CM);
        assert_eq!(sonar.reads, 3);
    }

    #[test]
    fn pauses_settle_then_between_samples() {
        let mut servo = MockServo::new();
        let mut sonar = MockSonar::constant(100.0);
        let mut pacer = MockPacer::new();
        let cfg = config(TimeoutPolicy::Penalize);

        sample_seat(&mut servo, &mut sonar, &mut pacer, &cfg, 0.0, 3);

        assert_eq!(
            pacer.pauses,
            vec![cfg.settle_delay, cfg.sample_delay, cfg.sample_delay]
        );
    }
}
