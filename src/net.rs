use std::net::UdpSocket;

/// Network association collaborator. The control loop polls this before
/// any upload; the admin API reports the local address for diagnostics.
pub trait LinkMonitor {
    fn is_connected(&mut self) -> bool;
    fn local_address(&mut self) -> Option<String>;
}

/// Probes reachability by "connecting" a UDP socket toward the collector.
/// No datagram leaves the host; the OS just resolves a route and picks a
/// local address, which fails while the interface is down.
#[derive(Debug, Clone)]
pub struct UdpProbe {
    target: String,
}

impl UdpProbe {
    /// `target` is the collector's `host:port` pair, e.g. from
    /// [`probe_target_for_endpoint`].
    pub fn new(target: String) -> Self {
        Self { target }
    }

    fn probe(&self) -> Option<String> {
        let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
        socket.connect(self.target.as_str()).ok()?;
        socket.local_addr().ok().map(|addr| addr.to_string())
    }
}

impl LinkMonitor for UdpProbe {
    fn is_connected(&mut self) -> bool {
        self.probe().is_some()
    }

    fn local_address(&mut self) -> Option<String> {
        self.probe()
    }
}

/// Derive a `host:port` probe target from an HTTP(S) upload endpoint.
pub fn probe_target_for_endpoint(endpoint: &str) -> Option<String> {
    let (scheme, rest) = endpoint.split_once("://")?;
    let default_port = match scheme {
        "http" => 80,
        "https" => 443,
        _ => return None,
    };
    let authority = rest.split(['/', '?']).next()?;
    if authority.is_empty() {
        return None;
    }
    if authority.contains(':') {
        Some(authority.to_string())
    } else {
        Some(format!("{authority}:{default_port}"))
    }
}

/// Fixed-answer monitor for tests and for running without a collector.
#[derive(Debug, Clone)]
pub struct StaticLink {
    pub connected: bool,
    pub address: Option<String>,
}

impl StaticLink {
    pub fn up(address: &str) -> Self {
        Self {
            connected: true,
            address: Some(address.to_string()),
        }
    }

    pub fn down() -> Self {
        Self {
            connected: false,
            address: None,
        }
    }
}

impl LinkMonitor for StaticLink {
    fn is_connected(&mut self) -> bool {
        self.connected
    }

    fn local_address(&mut self) -> Option<String> {
        self.address.clone()
    }
}
