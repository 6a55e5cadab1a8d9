//! # Ports Layer
//!
//! - **Driving Ports (Inbound)**: callbacks the hosting engine invokes
//! - **Driven Ports (Outbound)**: storage and time, implemented by adapters

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
