//! # Combinatorial Kalman Filter
//!
//! Extends seed tracks hit by hit across the remaining layers, maintaining
//! multiple competing hypotheses up to a breadth bound and selecting the
//! best complete path at termination.
//!
//! The module is split along its seam:
//! - [`state`] - the five-parameter helix state with its covariance and the
//!   scalar Kalman update
//! - [`kalman`] - the [`KalmanStepper`] trait and the drift-distance
//!   measurement stepper
//! - [`search`] - the bounded-breadth best-first search with the hole
//!   policy and the densest-path tie-break

pub mod kalman;
pub mod search;
pub mod state;

pub use kalman::{KalmanStepper, WireMeasurementStepper};
pub use search::{CkfExtender, CkfExtension};
pub use state::HelixState;
