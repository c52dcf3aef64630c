//! Domain model for the payment callback relay: payment records, the claim
//! state machine, and the ports the application layer depends on.

pub mod payment;
pub mod ports;
pub mod user;
