//! Domain types and the ports through which the workflow reaches external systems.

pub mod appointment;
pub mod chat;
pub mod identity;
pub mod money;
pub mod payment;
pub mod ports;
