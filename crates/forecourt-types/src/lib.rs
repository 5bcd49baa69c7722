//! forecourt-types: domain model and gateway ports for the fuel retail console.

pub mod domain;
pub mod ports;
