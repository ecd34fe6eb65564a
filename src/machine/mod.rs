use crate::error::AppError;
use crate::hal::{Echo, HOME_ANGLE_DEG, IndicatorPanel, Pacer, RangeFinder, ScanServo};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub mod calibrate;
pub mod sampling;
pub mod scan;

use sampling::SamplingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    Start,
    Init,
    Calibrate,
    Scan,
    /// Reserved extension point; transitions straight back to Idle.
    Upload,
    Idle,
}

impl MachineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Init => "init",
            Self::Calibrate => "calibrate",
            Self::Scan => "scan",
            Self::Upload => "upload",
            Self::Idle => "idle",
        }
    }
}

/// One monitored seat. Baseline and occupancy are undefined before their
/// first pass completes.
#[derive(Debug, Clone)]
pub struct Seat {
    pub angle_deg: f32,
    pub baseline_cm: Option<f32>,
    pub occupied: bool,
}

impl Seat {
    pub fn new(index: u8, angle_per_seat_deg: f32) -> Self {
        Self {
            angle_deg: index as f32 * angle_per_seat_deg,
            baseline_cm: None,
            occupied: false,
        }
    }
}

/// Immutable machine settings, fixed at construction.
#[derive(Debug, Clone)]
pub struct MachineConfig {
    pub total_seats: u8,
    pub angle_per_seat_deg: f32,
    pub scan_interval: Duration,
    pub min_clearance_cm: f32,
    pub occupancy_delta_cm: f32,
    pub sampling: SamplingConfig,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            total_seats: 4,
            angle_per_seat_deg: 20.0,
            scan_interval: Duration::from_secs(10),
            min_clearance_cm: 25.0,
            occupancy_delta_cm: 10.0,
            sampling: SamplingConfig::default(),
        }
    }
}

/// Clonable handle over the calibration-requested flag. Settable from any
/// thread; the machine clears it when a calibration pass completes.
#[derive(Debug, Clone, Default)]
pub struct CalibrationRequest(Arc<AtomicBool>);

impl CalibrationRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent.
    pub fn request(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// The occupancy state machine. Owns the servo, sonar, indicator panel and
/// seat table; sequences Start -> Init -> Calibrate -> Idle -> Scan -> Idle
/// with monotonic-time transitions. Single-threaded and run-to-completion:
/// a Calibrate or Scan action blocks `tick` for the whole pass.
pub struct OccupancyMachine<S, R, I, P> {
    config: MachineConfig,
    servo: S,
    sonar: R,
    panel: I,
    pacer: P,
    seats: Vec<Seat>,
    state: MachineState,
    hardware_ready: bool,
    init_attempted: bool,
    calibration_done: bool,
    scan_done: bool,
    last_scan: Option<Instant>,
    free_seats: u8,
    scan_count: u32,
    calibration_requested: CalibrationRequest,
}

impl<S, R, I, P> OccupancyMachine<S, R, I, P>
where
    S: ScanServo,
    R: RangeFinder,
    I: IndicatorPanel,
    P: Pacer,
{
    pub fn new(
        config: MachineConfig,
        servo: S,
        sonar: R,
        panel: I,
        pacer: P,
        calibration_requested: CalibrationRequest,
    ) -> Self {
        let seats = (0..config.total_seats)
            .map(|i| Seat::new(i, config.angle_per_seat_deg))
            .collect();
        Self {
            config,
            servo,
            sonar,
            panel,
            pacer,
            seats,
            state: MachineState::Start,
            hardware_ready: false,
            init_attempted: false,
            calibration_done: false,
            scan_done: false,
            last_scan: None,
            free_seats: 0,
            scan_count: 0,
            calibration_requested,
        }
    }

    /// Reset to a pristine Start: clear indicators, wipe every seat's
    /// baseline and occupancy, drive the servo home, record the current
    /// time. Must run once before the first tick; re-invoking it is the
    /// recovery path after a failed init.
    pub fn initialize(&mut self) -> Result<(), AppError> {
        self.seats = (0..self.config.total_seats)
            .map(|i| Seat::new(i, self.config.angle_per_seat_deg))
            .collect();
        self.state = MachineState::Start;
        self.hardware_ready = false;
        self.init_attempted = false;
        self.calibration_done = false;
        self.scan_done = false;
        self.free_seats = 0;
        self.scan_count = 0;
        self.last_scan = Some(Instant::now());
        self.panel.clear_all()?;
        self.servo.point_at(HOME_ANGLE_DEG)?;
        info!(seats = self.seats.len(), "machine initialized");
        Ok(())
    }

    /// Advance by exactly one step. Two phases: transitions are evaluated
    /// against the state the tick started in, then the action of the
    /// possibly-new state runs, so an action can run in the same tick as
    /// the transition that produced its state. Safe at any polling
    /// frequency; timing is monotonic, not call-count-based.
    pub fn tick(&mut self, now: Instant) {
        if self.calibration_requested.is_requested() && self.state != MachineState::Calibrate {
            debug!(from = self.state.as_str(), "recalibration forced");
            self.calibration_done = false;
            self.set_state(MachineState::Calibrate);
        }

        match self.state {
            MachineState::Start => self.set_state(MachineState::Init),
            MachineState::Init => {
                if self.hardware_ready {
                    self.set_state(MachineState::Calibrate);
                }
            }
            MachineState::Calibrate => {
                if self.calibration_done {
                    self.last_scan = Some(now);
                    self.set_state(MachineState::Idle);
                }
            }
            MachineState::Idle => {
                if self.hardware_ready && self.calibration_done && self.scan_due(now) {
                    self.scan_done = false;
                    self.set_state(MachineState::Scan);
                }
            }
            MachineState::Scan => {
                if self.scan_done {
                    self.last_scan = Some(now);
                    self.set_state(MachineState::Idle);
                }
            }
            MachineState::Upload => self.set_state(MachineState::Idle),
        }

        match self.state {
            MachineState::Start | MachineState::Idle | MachineState::Upload => {}
            MachineState::Init => self.run_init(),
            MachineState::Calibrate => self.run_calibrate(),
            MachineState::Scan => self.run_scan(),
        }
    }

    /// Free-seat count from the most recently completed scan pass; 0 before
    /// the first scan completes.
    pub fn free_seats(&self) -> u8 {
        self.free_seats
    }

    pub fn request_calibration(&self) {
        self.calibration_requested.request();
    }

    /// Handle for triggering recalibration from other threads.
    pub fn calibration_request(&self) -> CalibrationRequest {
        self.calibration_requested.clone()
    }

    pub fn current_state(&self) -> MachineState {
        self.state
    }

    pub fn hardware_ready(&self) -> bool {
        self.hardware_ready
    }

    /// True once an init attempt ran and left the hardware unusable; the
    /// machine stays parked in Init until `initialize` is re-invoked.
    pub fn init_failed(&self) -> bool {
        self.init_attempted && !self.hardware_ready
    }

    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    /// Completed scan passes since the last `initialize`.
    pub fn scan_count(&self) -> u32 {
        self.scan_count
    }

    fn scan_due(&self, now: Instant) -> bool {
        match self.last_scan {
            Some(last) => now.duration_since(last) >= self.config.scan_interval,
            None => true,
        }
    }

    fn set_state(&mut self, next: MachineState) {
        debug!(from = self.state.as_str(), to = next.as_str(), "transition");
        self.state = next;
    }

    fn run_init(&mut self) {
        if self.init_attempted {
            return;
        }
        self.init_attempted = true;
        match self.init_sequence() {
            Ok(clearance_cm) => {
                self.hardware_ready = true;
                info!(clearance_cm, "hardware ready");
            }
            Err(err) => {
                warn!(error = %err, "hardware init failed, machine parked until re-initialized");
                if let Err(err) = self.panel.error_pattern() {
                    warn!(error = %err, "error pattern could not be asserted");
                }
            }
        }
    }

    /// Drive the servo home and verify the sonar sees clear space in front
    /// of it. A silent sonar at init is a wiring fault, not a far wall.
    fn init_sequence(&mut self) -> Result<f32, AppError> {
        self.servo.point_at(HOME_ANGLE_DEG)?;
        self.pacer.pause(self.config.sampling.settle_delay);
        match self.sonar.read_distance_cm()? {
            Echo::NoEcho => Err(AppError::InitNoEcho),
            Echo::Range(cm) if cm < self.config.min_clearance_cm => {
                Err(AppError::InitClearance {
                    measured_cm: cm,
                    required_cm: self.config.min_clearance_cm,
                })
            }
            Echo::Range(cm) => Ok(cm),
        }
    }

    fn run_calibrate(&mut self) {
        if self.calibration_done {
            return;
        }
        info!(seats = self.seats.len(), "calibration pass starting");
        calibrate::run(
            &mut self.servo,
            &mut self.sonar,
            &mut self.pacer,
            &self.config.sampling,
            &mut self.seats,
        );
        self.calibration_done = true;
        // Pass completion doubles as housekeeping: the request that forced
        // this pass must not retrigger it, and any prior scan is stale.
        self.calibration_requested.clear();
        self.scan_done = false;
        info!("calibration pass complete");
    }

    fn run_scan(&mut self) {
        if self.scan_done {
            return;
        }
        if let Err(err) = self.panel.set_scanning(true) {
            warn!(error = %err, "scanning indicator could not be asserted");
        }
        let free = scan::run(
            &mut self.servo,
            &mut self.sonar,
            &mut self.panel,
            &mut self.pacer,
            &self.config.sampling,
            self.config.occupancy_delta_cm,
            &mut self.seats,
        );
        self.free_seats = free;
        self.scan_count += 1;
        self.scan_done = true;
        if let Err(err) = self.panel.set_scanning(false) {
            warn!(error = %err, "scanning indicator could not be deasserted");
        }
        info!(
            free = free,
            total = self.seats.len(),
            "scan pass complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::mock::{MockPacer, MockPanel, MockServo, MockSonar};

    type MockMachine = OccupancyMachine<MockServo, MockSonar, MockPanel, MockPacer>;

    fn machine(sonar: MockSonar) -> MockMachine {
        let mut m = OccupancyMachine::new(
            MachineConfig::default(),
            MockServo::new(),
            sonar,
            MockPanel::new(),
            MockPacer::new(),
            CalibrationRequest::new(),
        );
        m.initialize().expect("initialize");
        m
    }

    fn run_to_idle(m: &mut MockMachine, now: Instant) {
        // Start -> Init(+init), Init -> Calibrate(+pass), Calibrate -> Idle
        m.tick(now);
        m.tick(now);
        m.tick(now);
        assert_eq!(m.current_state(), MachineState::Idle);
    }

    #[test]
    fn start_goes_to_init_and_runs_the_init_sequence() {
        let mut m = machine(MockSonar::constant(100.0));

        m.tick(Instant::now());

        assert_eq!(m.current_state(), MachineState::Init);
        assert!(m.hardware_ready());
    }

    #[test]
    fn init_failure_parks_the_machine_with_the_error_pattern() {
        let mut m = machine(MockSonar::constant(10.0));
        let now = Instant::now();

        m.tick(now);
        assert_eq!(m.current_state(), MachineState::Init);
        assert!(!m.hardware_ready());
        assert!(m.init_failed());
        assert!(m.panel.error_asserted);

        // Later ticks do not advance and do not retry the sequence.
        let reads_after_init = m.sonar.reads;
        m.tick(now + Duration::from_secs(60));
        assert_eq!(m.current_state(), MachineState::Init);
        assert_eq!(m.sonar.reads, reads_after_init);
    }

    #[test]
    fn silent_sonar_at_init_is_a_failure() {
        let mut m = machine(MockSonar::silent());

        m.tick(Instant::now());

        assert!(!m.hardware_ready());
        assert!(m.init_failed());
    }

    #[test]
    fn reinitialize_retries_a_failed_init() {
        let mut m = machine(MockSonar::constant(10.0));
        m.tick(Instant::now());
        assert!(m.init_failed());

        m.sonar = MockSonar::constant(100.0);
        m.initialize().expect("initialize");
        m.tick(Instant::now());

        assert_eq!(m.current_state(), MachineState::Init);
        assert!(m.hardware_ready());
    }

    #[test]
    fn calibration_sets_every_baseline_before_idle() {
        let mut m = machine(MockSonar::constant(100.0));
        let now = Instant::now();

        m.tick(now); // Start -> Init, init runs
        m.tick(now); // Init -> Calibrate, pass runs
        assert_eq!(m.current_state(), MachineState::Calibrate);
        assert!(m.seats().iter().all(|s| s.baseline_cm.is_some()));

        m.tick(now); // Calibrate -> Idle
        assert_eq!(m.current_state(), MachineState::Idle);
    }

    #[test]
    fn idle_ticks_before_the_interval_are_inert() {
        let mut m = machine(MockSonar::constant(100.0));
        let now = Instant::now();
        run_to_idle(&mut m, now);
        let reads = m.sonar.reads;

        for elapsed in [0, 3, 9] {
            m.tick(now + Duration::from_secs(elapsed));
            assert_eq!(m.current_state(), MachineState::Idle);
        }
        assert_eq!(m.sonar.reads, reads);
    }

    #[test]
    fn scan_runs_once_the_interval_elapses() {
        let mut m = machine(MockSonar::constant(100.0));
        let now = Instant::now();
        run_to_idle(&mut m, now);

        m.tick(now + Duration::from_secs(10));
        assert_eq!(m.current_state(), MachineState::Scan);
        assert_eq!(m.scan_count(), 1);
        assert_eq!(m.free_seats(), 4);

        m.tick(now + Duration::from_secs(11));
        assert_eq!(m.current_state(), MachineState::Idle);
    }

    #[test]
    fn scan_toggles_the_scanning_indicator_around_the_pass() {
        let mut m = machine(MockSonar::constant(100.0));
        let now = Instant::now();
        run_to_idle(&mut m, now);

        m.tick(now + Duration::from_secs(10));

        assert_eq!(m.panel.scanning_toggles, vec![true, false]);
        assert!(!m.panel.scanning);
    }

    #[test]
    fn free_seats_is_zero_before_the_first_scan() {
        let mut m = machine(MockSonar::constant(100.0));
        let now = Instant::now();

        assert_eq!(m.free_seats(), 0);
        run_to_idle(&mut m, now);
        assert_eq!(m.free_seats(), 0);
    }

    #[test]
    fn forced_recalibration_preempts_idle_immediately() {
        let mut m = machine(MockSonar::constant(100.0));
        let now = Instant::now();
        run_to_idle(&mut m, now);

        m.request_calibration();
        m.tick(now + Duration::from_secs(1));

        assert_eq!(m.current_state(), MachineState::Calibrate);
        // The pass ran in the same tick and cleared the request.
        assert!(!m.calibration_request().is_requested());

        m.tick(now + Duration::from_secs(2));
        assert_eq!(m.current_state(), MachineState::Idle);
        // No second forced pass.
        m.tick(now + Duration::from_secs(3));
        assert_eq!(m.current_state(), MachineState::Idle);
    }

    #[test]
    fn forced_recalibration_from_init_runs_one_pass() {
        let mut m = machine(MockSonar::constant(100.0));
        let now = Instant::now();

        m.tick(now); // Start -> Init
        m.request_calibration();
        m.tick(now); // forced into Calibrate, pass runs and clears the request
        assert_eq!(m.current_state(), MachineState::Calibrate);
        assert!(!m.calibration_request().is_requested());

        m.tick(now);
        assert_eq!(m.current_state(), MachineState::Idle);
    }

    #[test]
    fn calibration_handle_is_shared() {
        let m = machine(MockSonar::constant(100.0));
        let handle = m.calibration_request();

        handle.request();

        assert!(handle.is_requested());
    }

    #[test]
    fn upload_state_falls_back_to_idle() {
        let mut m = machine(MockSonar::constant(100.0));
        m.state = MachineState::Upload;

        m.tick(Instant::now());

        assert_eq!(m.current_state(), MachineState::Idle);
    }

    #[test]
    fn end_to_end_scan_classifies_against_baselines() {
        let config = MachineConfig {
            sampling: SamplingConfig {
                calibration_samples: 1,
                scan_samples: 1,
                ..SamplingConfig::default()
            },
            ..MachineConfig::default()
        };
        // 4 calibration reads at 100cm, then a scan with seat 0 at 40cm.
        let mut script = vec![Echo::Range(100.0); 5];
        script.extend([
            Echo::Range(40.0),
            Echo::Range(100.0),
            Echo::Range(100.0),
            Echo::Range(100.0),
        ]);
        let mut m = OccupancyMachine::new(
            config,
            MockServo::new(),
            MockSonar::sequence(script),
            MockPanel::new(),
            MockPacer::new(),
            CalibrationRequest::new(),
        );
        m.initialize().expect("initialize");
        let now = Instant::now();
        run_to_idle(&mut m, now);

        m.tick(now + Duration::from_secs(10));

        assert_eq!(m.free_seats(), 3);
        assert!(m.seats()[0].occupied);
        assert!(m.seats()[1..].iter().all(|s| !s.occupied));
    }
}
