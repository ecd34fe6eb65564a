use seatscan::api::{self, ApiContext};
use seatscan::config;
use seatscan::machine::CalibrationRequest;
use seatscan::state::AppState;
use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, RwLock};
use tracing::info;

fn init_tracing(level: &str) {
    let level = level.parse().unwrap_or(tracing::Level::INFO);
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_default()?;
    init_tracing(&config.logging.level);
    info!(
        node_id = %config.app.node_id,
        seats = config.seats.total,
        "seatscan starting"
    );

    let state = Arc::new(RwLock::new(AppState::new(
        config.app.node_id.clone(),
        config.seats.total,
    )));
    let calibration = CalibrationRequest::new();
    let stop_flag = Arc::new(AtomicBool::new(false));

    let _control_handle =
        control::start(&config, &state, &calibration, Arc::clone(&stop_flag));

    let ctx = ApiContext {
        state: Arc::clone(&state),
        calibration,
    };
    let app = api::router(ctx);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port()));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "admin API listening");
    axum::serve(listener, app).await?;

    // Signal the control thread to stop
    stop_flag.store(true, std::sync::atomic::Ordering::Relaxed);

    Ok(())
}

/// The polling loop: ticks the machine, publishes the snapshot, and fires
/// the upload timer. Runs on its own thread; the machine blocks it for the
/// duration of every calibration or scan pass.
mod control {
    use seatscan::config::Config;
    use seatscan::hal::{IndicatorPanel, Pacer, RangeFinder, ScanServo};
    use seatscan::machine::{CalibrationRequest, OccupancyMachine};
    use seatscan::net::LinkMonitor;
    use seatscan::net::UdpProbe;
    use seatscan::state::{AppState, OccupancySnapshot};
    use seatscan::upload::OccupancyReporter;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, RwLock};
    use std::time::{Duration, Instant, SystemTime};
    use tracing::{error, info, warn};

    const TICK_PAUSE: Duration = Duration::from_millis(10);

    /// Build the hardware from config and spawn the control thread.
    pub fn start(
        config: &Config,
        state: &Arc<RwLock<AppState>>,
        calibration: &CalibrationRequest,
        stop: Arc<AtomicBool>,
    ) -> Option<std::thread::JoinHandle<()>> {
        #[cfg(target_os = "linux")]
        {
            use seatscan::hal::ThreadPacer;
            use seatscan::hal::leds::GpioPanel;
            use seatscan::hal::servo::PwmServo;
            use seatscan::hal::sonar::PulseSonar;

            let Some(hardware) = config.hardware.as_ref() else {
                warn!("No [hardware] section configured, control loop not started");
                return None;
            };
            if hardware.seat_led_pins.len() != config.seats.total as usize {
                warn!(
                    pins = hardware.seat_led_pins.len(),
                    seats = config.seats.total,
                    "Seat indicator count does not match seat count"
                );
            }

            let servo = match PwmServo::new(hardware.servo_pwm_channel) {
                Ok(servo) => servo,
                Err(err) => {
                    error!(error = %err, "Failed to claim servo PWM channel");
                    return None;
                }
            };
            let sonar = match PulseSonar::new(hardware.sonar_pin) {
                Ok(sonar) => sonar,
                Err(err) => {
                    error!(error = %err, "Failed to open sonar GPIO");
                    return None;
                }
            };
            let panel = match GpioPanel::new(&hardware.seat_led_pins, hardware.scan_led_pin) {
                Ok(panel) => panel,
                Err(err) => {
                    error!(error = %err, "Failed to open indicator GPIO");
                    return None;
                }
            };

            let machine = OccupancyMachine::new(
                config.machine_config(),
                servo,
                sonar,
                panel,
                ThreadPacer,
                calibration.clone(),
            );
            let reporter = config.upload_endpoint().map(|endpoint| {
                OccupancyReporter::new(
                    endpoint.to_string(),
                    config.app.node_id.clone(),
                    config.upload_timeout(),
                )
            });
            let link = config
                .upload_endpoint()
                .and_then(seatscan::net::probe_target_for_endpoint)
                .map(UdpProbe::new);

            Some(spawn(
                machine,
                reporter,
                link,
                Arc::clone(state),
                stop,
                config.upload_interval(),
            ))
        }

        #[cfg(not(target_os = "linux"))]
        {
            let _ = (config, state, calibration, stop);
            warn!("Occupancy hardware requires Linux/Raspberry Pi - control loop not started");
            None
        }
    }

    fn spawn<S, R, I, P>(
        mut machine: OccupancyMachine<S, R, I, P>,
        reporter: Option<OccupancyReporter>,
        mut link: Option<UdpProbe>,
        state: Arc<RwLock<AppState>>,
        stop: Arc<AtomicBool>,
        upload_interval: Duration,
    ) -> std::thread::JoinHandle<()>
    where
        S: ScanServo + Send + 'static,
        R: RangeFinder + Send + 'static,
        I: IndicatorPanel + Send + 'static,
        P: Pacer + Send + 'static,
    {
        std::thread::spawn(move || {
            if let Err(err) = machine.initialize() {
                error!(error = %err, "Machine initialization failed, control loop not running");
                if let Ok(mut guard) = state.write() {
                    guard.set_init_failed(true);
                }
                return;
            }
            if let Some(link) = link.as_mut() {
                match link.local_address() {
                    Some(address) => info!(%address, "Link up"),
                    None => warn!("Link down at startup"),
                }
            }
            let total_seats = machine.seats().len() as u8;
            let mut last_upload = Instant::now();

            while !stop.load(Ordering::Relaxed) {
                machine.tick(Instant::now());
                publish(&state, &machine);

                if let Some(reporter) = reporter.as_ref() {
                    if last_upload.elapsed() >= upload_interval {
                        last_upload = Instant::now();
                        report(reporter, link.as_mut(), machine.free_seats(), total_seats);
                    }
                }
                std::thread::sleep(TICK_PAUSE);
            }
            info!("Control loop stopped");
        })
    }

    fn publish<S, R, I, P>(state: &Arc<RwLock<AppState>>, machine: &OccupancyMachine<S, R, I, P>)
    where
        S: ScanServo,
        R: RangeFinder,
        I: IndicatorPanel,
        P: Pacer,
    {
        let Ok(mut guard) = state.write() else {
            warn!("State lock poisoned while publishing snapshot");
            return;
        };
        guard.set_machine_state(machine.current_state());
        guard.set_hardware_ready(machine.hardware_ready());
        guard.set_init_failed(machine.init_failed());
        if machine.scan_count() > 0 {
            guard.set_occupancy(OccupancySnapshot {
                free_seats: machine.free_seats(),
                total_seats: machine.seats().len() as u8,
                seats: machine.seats().iter().map(|s| s.occupied).collect(),
                timestamp: SystemTime::now(),
            });
        }
    }

    fn report(
        reporter: &OccupancyReporter,
        link: Option<&mut UdpProbe>,
        free_seats: u8,
        total_seats: u8,
    ) {
        if let Some(link) = link {
            if !link.is_connected() {
                warn!("Link down, skipping occupancy report");
                return;
            }
        }
        match reporter.post_occupancy(free_seats, total_seats) {
            Ok(status) => info!(status, free_seats, total_seats, "Occupancy reported"),
            Err(err) => warn!(error = %err, "Occupancy report failed"),
        }
    }
}
