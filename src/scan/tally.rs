use super::{PortState, ProbeResult};

/// Running totals of a scan, fed by a single aggregator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct Tally {
    pub open_ports: Vec<u16>,
    pub scanned: usize,
}

impl Tally {
    pub fn record(&mut self, result: ProbeResult) {
        if result.state == PortState::Open {
            self.open_ports.push(result.port);
        }
        self.scanned += 1;
    }
}
