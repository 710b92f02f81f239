//! Shared helpers for unit tests.

pub mod fake_transport;

#[path = "../../tests/support/socket_guard.rs"]
pub mod socket_guard;
