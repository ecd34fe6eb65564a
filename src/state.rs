use crate::machine::MachineState;
use std::time::SystemTime;

/// Result of a completed scan pass, as published to the admin API.
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancySnapshot {
    pub free_seats: u8,
    pub total_seats: u8,
    /// Occupied flag per seat, in seat order.
    pub seats: Vec<bool>,
    pub timestamp: SystemTime,
}

/// Shared view of the node for the admin API. The control thread publishes
/// after every tick; handlers only read. Occupancy stays `None` until the
/// first scan pass completes.
#[derive(Debug)]
pub struct AppState {
    node_id: String,
    total_seats: u8,
    machine_state: MachineState,
    hardware_ready: bool,
    init_failed: bool,
    occupancy: Option<OccupancySnapshot>,
}

impl AppState {
    pub fn new(node_id: String, total_seats: u8) -> Self {
        Self {
            node_id,
            total_seats,
            machine_state: MachineState::Start,
            hardware_ready: false,
            init_failed: false,
            occupancy: None,
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn total_seats(&self) -> u8 {
        self.total_seats
    }

    pub fn machine_state(&self) -> MachineState {
        self.machine_state
    }

    pub fn set_machine_state(&mut self, state: MachineState) {
        self.machine_state = state;
    }

    pub fn hardware_ready(&self) -> bool {
        self.hardware_ready
    }

    pub fn set_hardware_ready(&mut self, ready: bool) {
        self.hardware_ready = ready;
    }

    pub fn init_failed(&self) -> bool {
        self.init_failed
    }

    pub fn set_init_failed(&mut self, failed: bool) {
        self.init_failed = failed;
    }

    pub fn occupancy(&self) -> Option<&OccupancySnapshot> {
        self.occupancy.as_ref()
    }

    pub fn set_occupancy(&mut self, occupancy: OccupancySnapshot) {
        self.occupancy = Some(occupancy);
    }
}
