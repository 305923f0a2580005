//! The crate is split in a few layers:
//!
//! - [gateway] (provider payments API client)
//! - [correlation], [callback], [flow] and [poller] (payment correlation core)
//! - [connect] (HTTP API surface driving the flow)
#![doc = include_str!("../README.md")]

/// Deep-link callback parsing
pub mod callback;
pub mod config;
/// Implementation of the connector HTTP API
///
/// This module defines the types and endpoints a caller uses to drive a payment flow.
pub mod connect;
pub mod correlation;
pub mod flow;
/// Provider integration
///
/// This module defines the types and methods to communicate with the open-banking provider.
pub mod gateway;
pub mod poller;
pub mod secret;
pub mod state;
