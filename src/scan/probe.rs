use std::{sync::mpsc::Sender, time::Duration};

use super::{
    dialer::{Dialer, TCP},
    signal::StopSignal,
    PortState, ProbeResult,
};

/// Everything a probe borrows from the scan that spawned it.
pub(super) struct ProbeCtx<'a, D> {
    pub host: &'a str,
    pub timeout: Duration,
    pub dialer: &'a D,
    pub stop: &'a StopSignal,
}

/// Probes a single port and reports the outcome on `sink`.
///
/// Nothing is reported when the scan was stopped before the probe started. A
/// dial already underway is never interrupted and reports as usual.
pub(super) fn probe<D: Dialer>(port: u16, ctx: &ProbeCtx<'_, D>, sink: &Sender<ProbeResult>) {
    if ctx.stop.is_raised() {
        log::debug!("Skipping port {}, scan was stopped", port);
        return;
    }

    let address = format!("{}:{}", ctx.host, port);
    let state = match ctx.dialer.dial(TCP, &address, ctx.timeout) {
        // Connection is closed as soon as it goes out of scope.
        Ok(_) => PortState::Open,
        Err(e) => {
            log::debug!("Dial to `{}` failed: {}", address, e);
            PortState::ClosedOrFiltered
        }
    };

    // The receiver outlives every probe, so a failed send means the scan
    // itself was torn down and there's nobody left to tell.
    let _ = sink.send(ProbeResult::new(port, state));
}
