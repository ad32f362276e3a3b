use std::{
    collections::HashSet,
    io,
    net::TcpListener,
    thread,
    time::Duration,
};

use proptest::prelude::*;
use tcpscan::{
    port::PortRange,
    scan::{PortState, Scanner},
};

/// Finds three consecutive free ports and keeps a listener on the middle one.
fn listener_between_closed_ports() -> (TcpListener, u16) {
    loop {
        let middle = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = middle.local_addr().unwrap().port();
        if port <= 1 || port == u16::MAX {
            continue;
        }

        let below = TcpListener::bind(("127.0.0.1", port - 1));
        let above = TcpListener::bind(("127.0.0.1", port + 1));
        if below.is_ok() && above.is_ok() {
            // Both neighbours are released when they go out of scope here.
            return (middle, port);
        }
    }
}

fn accept_in_background(listener: TcpListener) {
    thread::spawn(move || {
        for stream in listener.incoming() {
            if stream.is_err() {
                return;
            }
        }
    });
}

#[test]
fn finds_the_only_listening_port() {
    let (listener, port) = listener_between_closed_ports();
    accept_in_background(listener);

    let scanner = Scanner::new("127.0.0.1", PortRange::new(port - 1, port + 1).unwrap())
        .with_timeout(Duration::from_millis(500));
    let report = scanner.scan();

    let lines: HashSet<String> = report.lines().into_iter().collect();
    let expected: HashSet<String> = [
        format!("Port {}: closed or filtered", port - 1),
        format!("Port {}: OPEN", port),
        format!("Port {}: closed or filtered", port + 1),
    ]
    .into_iter()
    .collect();

    assert_eq!(report.results.len(), 3);
    assert_eq!(lines, expected);
    assert_eq!(report.open_ports, vec![port]);
    assert_eq!(scanner.open_ports(), vec![port]);
    assert_eq!(report.scanned, 3);
}

#[test]
fn sorted_report_follows_port_order() {
    let listeners: Vec<TcpListener> = (0..3)
        .map(|_| TcpListener::bind("127.0.0.1:0").unwrap())
        .collect();
    let mut ports: Vec<u16> = listeners
        .iter()
        .map(|l| l.local_addr().unwrap().port())
        .collect();
    ports.sort_unstable();
    listeners.into_iter().for_each(accept_in_background);

    let (start, end) = (ports[0], ports[2]);
    let mut report = Scanner::new("127.0.0.1", PortRange::new(start, end).unwrap())
        .with_timeout(Duration::from_millis(250))
        .scan();
    report.sort_by_port();

    assert_eq!(report.scanned, usize::from(end - start) + 1);
    assert!(report.results.windows(2).all(|w| w[0].port < w[1].port));
    for port in &ports {
        assert!(report.open_ports.contains(port), "port {} should be open", port);
    }
    assert!(report.open_ports.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn unresolvable_host_is_closed_or_filtered() {
    let report = Scanner::new("name.invalid", PortRange::new(80, 81).unwrap()).scan();

    assert_eq!(report.scanned, 2);
    assert!(report.open_ports.is_empty());
    assert!(report
        .results
        .iter()
        .all(|r| r.state == PortState::ClosedOrFiltered));
}

fn port_of(address: &str) -> u16 {
    address.rsplit(':').next().unwrap().parse().unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn open_ports_match_dialer(
        start in 1u16..=65000,
        len in 1u16..=300,
        modulus in 1u16..=10,
        concurrency in 1usize..=32,
    ) {
        let end = start.saturating_add(len - 1);
        let range = PortRange::new(start, end).unwrap();
        let scanner = Scanner::new("localhost", range)
            .with_concurrency(concurrency)
            .with_dialer(move |_: &str, address: &str, _: Duration| -> io::Result<()> {
                if port_of(address) % modulus == 0 {
                    Ok(())
                } else {
                    Err(io::Error::from(io::ErrorKind::ConnectionRefused))
                }
            });

        let first = scanner.scan();
        let second = scanner.scan();

        let expected: HashSet<u16> = range.ports().filter(|p| p % modulus == 0).collect();
        let found: HashSet<u16> = first.open_ports.iter().copied().collect();

        prop_assert_eq!(first.scanned, range.len());
        prop_assert_eq!(first.results.len(), range.len());
        prop_assert_eq!(found.len(), first.open_ports.len(), "duplicate open ports");
        prop_assert!(first.open_ports.iter().all(|&p| range.contains(p)));
        prop_assert_eq!(&found, &expected);
        prop_assert_eq!(second.open_ports.iter().copied().collect::<HashSet<_>>(), expected);

        let reported: HashSet<u16> = first.results.iter().map(|r| r.port).collect();
        prop_assert_eq!(reported, range.ports().collect::<HashSet<_>>());
    }
}
