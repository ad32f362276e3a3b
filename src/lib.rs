pub mod error;
pub mod logger;
pub mod port;
pub mod scan;
pub mod target;
