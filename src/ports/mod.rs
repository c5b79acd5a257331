//! Port traits separating the domain from storage and configuration.

pub mod config_port;
pub mod price_port;
pub mod result_port;
