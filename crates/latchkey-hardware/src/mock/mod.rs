//! Mock link implementation for testing and development.
//!
//! This module provides a simulated door-controller link that can be driven
//! programmatically without a serial device.

pub mod link;

pub use link::{MockLink, MockLinkHandle, MockSink, MockSource};
