//! forecourt-core: application services for the fuel retail admin console
//! (order feed + lifecycle, catalog, directory, reports, sessions) and the
//! inbound HTTP adapter.

pub mod config;
pub mod errors;

pub mod application;

pub use forecourt_types::{domain, ports};

pub mod inbound; // HTTP adapter (server + handlers)
