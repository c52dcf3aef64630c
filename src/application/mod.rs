//! Application layer: the deduplicating payment relay and access-token verification.
//!
//! Both operations depend only on the domain ports, so the stores and the Pi
//! API client can be swapped without touching this layer.

pub mod relay;
pub mod verify;
