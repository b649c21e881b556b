//! Client for the secure AI gateway.

pub mod client;

pub use client::{ClientError, GatewayClient, LoginResponse};
