use std::{
    io,
    net::{SocketAddr, TcpStream, ToSocketAddrs},
    time::{Duration, Instant},
};

pub const TCP: &str = "tcp";

/// Connection capability used by every probe.
///
/// `network` is always [`TCP`] for probes issued by the scanner. Whatever
/// `Conn` is returned gets dropped right away, which must close it.
pub trait Dialer: Sync {
    type Conn;

    fn dial(&self, network: &str, address: &str, timeout: Duration) -> io::Result<Self::Conn>;
}

impl<F, C> Dialer for F
where
    F: Fn(&str, &str, Duration) -> io::Result<C> + Sync,
{
    type Conn = C;

    fn dial(&self, network: &str, address: &str, timeout: Duration) -> io::Result<C> {
        self(network, address, timeout)
    }
}

/// Plain connect-and-drop TCP dialer.
///
/// The timeout is one deadline shared by every address the host resolves to.
/// Name resolution itself runs before the deadline starts and isn't bounded.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDialer;

impl TcpDialer {
    fn connect_any(
        addrs: impl Iterator<Item = SocketAddr>,
        deadline: Instant,
    ) -> io::Result<TcpStream> {
        let mut last_err = None;

        for addr in addrs {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("deadline exceeded before dialing `{}`", addr),
                ));
            }

            match TcpStream::connect_timeout(&addr, left) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_err = Some(e),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "address resolved to nothing")
        }))
    }
}

impl Dialer for TcpDialer {
    type Conn = TcpStream;

    fn dial(&self, network: &str, address: &str, timeout: Duration) -> io::Result<TcpStream> {
        if network != TCP {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsupported network `{}`", network),
            ));
        }

        let addrs = address.to_socket_addrs()?;

        Self::connect_any(addrs, Instant::now() + timeout)
    }
}
