use crate::hal::{Pacer, RangeFinder, ScanServo};
use crate::machine::Seat;
use crate::machine::sampling::{self, SamplingConfig};
use tracing::debug;

/// One calibration pass: replaces every seat's empty-seat baseline in index
/// order. Blocks the calling thread for the full sweep. Sampling failures
/// fold into the averages per the timeout policy, so the pass itself cannot
/// fail.
pub fn run<S, R, P>(
    servo: &mut S,
    sonar: &mut R,
    pacer: &mut P,
    config: &SamplingConfig,
    seats: &mut [Seat],
) where
    S: ScanServo,
    R: RangeFinder,
    P: Pacer,
{
    for (index, seat) in seats.iter_mut().enumerate() {
        let baseline = sampling::sample_seat(
            servo,
            sonar,
            pacer,
            config,
            seat.angle_deg,
            config.calibration_samples,
        );
        seat.baseline_cm = Some(baseline);
        debug!(seat = index, baseline_cm = baseline, "baseline recorded");
        pacer.pause(config.seat_delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::mock::{MockPacer, MockServo, MockSonar};

    fn seats(count: u8, angle_per_seat: f32) -> Vec<Seat> {
        (0..count).map(|i| Seat::new(i, angle_per_seat)).collect()
    }

    #[test]
    fn every_seat_gets_a_baseline() {
        let mut servo = MockServo::new();
        let mut sonar = MockSonar::constant(100.0);
        let mut pacer = MockPacer::new();
        let config = SamplingConfig::default();
        let mut seats = seats(4, 20.0);

        run(&mut servo, &mut sonar, &mut pacer, &config, &mut seats);

        assert!(seats.iter().all(|s| s.baseline_cm == Some(100.0)));
    }

    #[test]
    fn seats_are_visited_in_index_order_at_their_angles() {
        let mut servo = MockServo::new();
        let mut sonar = MockSonar::constant(100.0);
        let mut pacer = MockPacer::new();
        let config = SamplingConfig::default();
        let mut seats = seats(4, 20.0);

        run(&mut servo, &mut sonar, &mut pacer, &config, &mut seats);

        assert_eq!(servo.commands, vec![0.0, 20.0, 40.0, 60.0]);
    }

    #[test]
    fn recalibration_replaces_prior_baselines() {
        let mut servo = MockServo::new();
        let mut pacer = MockPacer::new();
        let config = SamplingConfig::default();
        let mut seats = seats(2, 20.0);

        let mut sonar = MockSonar::constant(100.0);
        run(&mut servo, &mut sonar, &mut pacer, &config, &mut seats);
        let mut sonar = MockSonar::constant(80.0);
        run(&mut servo, &mut sonar, &mut pacer, &config, &mut seats);

        assert!(seats.iter().all(|s| s.baseline_cm == Some(80.0)));
    }
}
