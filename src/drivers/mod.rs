//! # Drivers
//!
//! Apenas o sink serial usado pelo logging. O pager não acessa hardware.

pub mod serial;
