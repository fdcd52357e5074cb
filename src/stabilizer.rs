// src/stabilizer.rs

//! # Stabilizer Module
//!
//! Shared numeric bounds, the stabilizer interface and the cascaded
//! angle/rate implementation.

pub mod cascade;
pub use cascade::*;
pub mod flight_stabilizer;
pub use flight_stabilizer::*;
