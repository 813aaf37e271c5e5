//! Unified error handling for the track finder.
//!
//! Errors here are reserved for conditions that abort processing: a malformed
//! wire layout, an impossible calibration, an event that cannot be set up.
//! Per-edge rejection inside the combinatorial stages never allocates an
//! error: relation filters return NaN and the automaton skips the edge.

use thiserror::Error;

/// Result type alias for track finding operations.
pub type Result<T> = std::result::Result<T, TrackFindingError>;

/// Errors that can occur during track finding.
#[derive(Debug, Error)]
pub enum TrackFindingError {
    /// An event does not contain enough hits to run pattern recognition.
    #[error(
        "Event '{event_id}' has {hit_count} hits but at least {minimum_required} are required"
    )]
    InsufficientHits {
        event_id: String,
        hit_count: usize,
        minimum_required: usize,
    },

    /// The wire layout failed validation at construction.
    #[error("Invalid wire topology: {reason}")]
    InvalidTopology { reason: String },

    /// The drift calibration failed validation at construction.
    #[error("Invalid drift calibration: {reason}")]
    InvalidCalibration { reason: String },

    /// A hit references a wire that does not exist in the topology.
    #[error("Hit {hit_index} references unknown wire {wire} in event '{event_id}'")]
    UnknownWire {
        event_id: String,
        hit_index: usize,
        wire: String,
    },

    /// A trained filter model could not be loaded.
    #[error("Failed to load filter model: {reason}")]
    ModelLoad { reason: String },

    /// JSON serialization/deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O failure when reading event or model files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Extension trait for converting `Option` to our error types.
pub trait OptionExt<T> {
    /// Convert `None` to an `InsufficientHits` error.
    fn ok_or_insufficient_hits(
        self,
        event_id: &str,
        hit_count: usize,
        minimum_required: usize,
    ) -> Result<T>;

    /// Convert `None` to an `InvalidTopology` error.
    fn ok_or_invalid_topology(self, reason: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_insufficient_hits(
        self,
        event_id: &str,
        hit_count: usize,
        minimum_required: usize,
    ) -> Result<T> {
        self.ok_or_else(|| TrackFindingError::InsufficientHits {
            event_id: event_id.to_string(),
            hit_count,
            minimum_required,
        })
    }

    fn ok_or_invalid_topology(self, reason: &str) -> Result<T> {
        self.ok_or_else(|| TrackFindingError::InvalidTopology {
            reason: reason.to_string(),
        })
    }
}
