use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid {0} port `{1}`")]
    InvalidPort(&'static str, String),
    #[error("{0} port `{1}` is out of range (must be between 1 and 65535)")]
    PortOutOfRange(&'static str, u32),
    #[error("start port `{start}` is greater than end port `{end}`")]
    InvertedRange { start: u16, end: u16 },
    #[error("target host must not be empty")]
    EmptyHost,
    #[error("failed to check target kind (ensure it's a domain, IPv4 or [IPv6])")]
    HostParseFailed(#[source] url::ParseError),
    #[error("timeout must be at least 1 millisecond")]
    ZeroTimeout,
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,
}
