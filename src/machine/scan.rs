use crate::hal::{IndicatorPanel, Pacer, RangeFinder, ScanServo};
use crate::machine::Seat;
use crate::machine::sampling::{self, SamplingConfig};
use tracing::{debug, warn};

/// One scan pass: classifies every seat against its baseline, drives the
/// seat indicators, and returns the free-seat count. A seat is occupied iff
/// its live average is strictly below `baseline - occupancy_delta_cm`; an
/// average exactly on the threshold classifies free. Blocks the calling
/// thread for the full sweep.
pub fn run<S, R, I, P>(
    servo: &mut S,
    sonar: &mut R,
    panel: &mut I,
    pacer: &mut P,
    config: &SamplingConfig,
    occupancy_delta_cm: f32,
    seats: &mut [Seat],
) -> u8
where
    S: ScanServo,
    R: RangeFinder,
    I: IndicatorPanel,
    P: Pacer,
{
    let mut free = 0u8;
    for (index, seat) in seats.iter_mut().enumerate() {
        let live = sampling::sample_seat(
            servo,
            sonar,
            pacer,
            config,
            seat.angle_deg,
            config.scan_samples,
        );
        let occupied = match seat.baseline_cm {
            Some(baseline) => live < baseline - occupancy_delta_cm,
            // Unreachable while the machine gates scans on calibration, but
            // an uncalibrated seat cannot be called occupied.
            None => false,
        };
        seat.occupied = occupied;
        if !occupied {
            free += 1;
        }
        if let Err(err) = panel.set_seat(index, occupied) {
            warn!(seat = index, error = %err, "seat indicator update failed");
        }
        debug!(
            seat = index,
            live_cm = live,
            baseline_cm = ?seat.baseline_cm,
            occupied,
            "seat classified"
        );
        pacer.pause(config.seat_delay);
    }
    free
}
