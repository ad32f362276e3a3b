use std::{process, time::Duration};

use anyhow::Result;
use clap::{
    arg, crate_authors, crate_name, crate_version, value_parser, ArgAction, ArgMatches, Command,
};
use pad::PadStr;
use tcpscan::{
    error::ScanError,
    logger,
    port::PortRange,
    scan::{ScanReport, Scanner, DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT},
    target,
};

struct ParsedArgs {
    debug: bool,
    sorted: bool,
    host: String,
    range: PortRange,
    timeout: Duration,
    concurrency: usize,
}

fn parse_args(matches: ArgMatches) -> Result<ParsedArgs, ScanError> {
    let debug = matches.get_flag("debug");
    let sorted = matches.get_flag("sorted");

    // Required positionals, clap already refused to get here without them.
    let raw = |id: &str| matches.get_one::<String>(id).map_or("", String::as_str);

    let host = target::parse_host(raw("host"))?;
    let range = PortRange::parse(raw("start"), raw("end"))?;

    let timeout = match matches.get_one::<u64>("timeout") {
        Some(0) => return Err(ScanError::ZeroTimeout),
        Some(&ms) => Duration::from_millis(ms),
        None => DEFAULT_TIMEOUT,
    };

    let concurrency = match matches.get_one::<usize>("concurrency") {
        Some(0) => return Err(ScanError::ZeroConcurrency),
        Some(&n) => n,
        None => DEFAULT_CONCURRENCY,
    };

    Ok(ParsedArgs {
        debug,
        sorted,
        host,
        range,
        timeout,
        concurrency,
    })
}

fn print_results(report: &ScanReport) {
    let mut out = String::new();

    report.results.iter().for_each(|pr| {
        out.push_str(&format!(
            "{}{}\n",
            format!("Port {}:", pr.port).pad_to_width(12),
            pr.state
        ))
    });

    if report.stopped {
        out.push_str("\nScan was stopped before every port was probed.\n");
    }

    out.push_str(&format!("\nOpen ports found: {:?}\n", report.open_ports));
    out.push_str(&format!(
        "Scanned {} ports in {:.4}s\n",
        report.scanned,
        report.elapsed.as_secs_f32()
    ));

    print!("{}", out);
}

fn main() -> Result<()> {
    let command = Command::new(crate_name!())
        .about("Checks which TCP ports of a host accept connections.")
        .version(crate_version!())
        .arg_required_else_help(true)
        .author(crate_authors!())
        .args([
            arg!([host] "Address or hostname to scan (IPv6 goes in brackets)").required(true),
            arg!([start] "First port of the range (1-65535)").required(true),
            arg!([end] "Last port of the range (1-65535)").required(true),
        ])
        .args([
            // Miscellaneous arguments.
            arg!(-d --debug "Turns on debugging information").action(ArgAction::SetTrue),
            arg!(-s --sorted "Lists results by port number instead of completion order")
                .action(ArgAction::SetTrue),
            arg!(-t --timeout <MS> "Timeout of each connection attempt, in milliseconds")
                .value_parser(value_parser!(u64)),
            arg!(-c --concurrency <N> "Maximum number of connection attempts in flight")
                .value_parser(value_parser!(usize)),
        ])
        .after_help("Example: tcpscan localhost 1 1024");

    // Usage errors exit with 1, help and version with 0.
    let arg_matches = command.try_get_matches().unwrap_or_else(|e| {
        let _ = e.print();
        process::exit(if e.use_stderr() { 1 } else { 0 })
    });

    // Extract arguments.
    let parsed = parse_args(arg_matches)?;

    // Set debug if desired.
    if parsed.debug {
        logger::init();
    }

    // Start scanner.
    let scanner = Scanner::new(parsed.host, parsed.range)
        .with_timeout(parsed.timeout)
        .with_concurrency(parsed.concurrency);

    println!(
        "Scanning {} from port {} to {}...",
        scanner.host(),
        parsed.range.start(),
        parsed.range.end()
    );

    let mut report = scanner.scan();
    if parsed.sorted {
        report.sort_by_port();
    }

    // Show result.
    print_results(&report);

    Ok(())
}
