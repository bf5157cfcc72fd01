//! CLI command modules.

pub mod chunks;
pub mod files;
pub mod http;
pub mod status;
