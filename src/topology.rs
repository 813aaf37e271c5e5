//! Wire layout of the drift chamber.
//!
//! The topology is an explicit value owned by the engine and passed by
//! reference to the stages that need it. It describes superlayers of sense
//! wires (axial or stereo), the radii and wire counts of their layers, and
//! answers the geometric queries the finder stages ask:
//! - reference positions of wires (and stereo positions at a given z)
//! - continuous layer numbering across superlayers
//! - wire neighborhood for clustering
//! - nearest-wire lookup for synthetic data and candidate windows
//!
//! Validation happens once at construction. A malformed layout is a fatal
//! configuration error, never a per-event condition.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackFindingError};
use crate::geometry::Vector2D;

/// Identifier of a single sense wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WireId {
    /// Superlayer index, innermost is 0.
    pub superlayer: u8,
    /// Layer index within the superlayer.
    pub layer: u8,
    /// Wire index within the layer.
    pub wire: u16,
}

impl WireId {
    pub fn new(superlayer: u8, layer: u8, wire: u16) -> Self {
        Self {
            superlayer,
            layer,
            wire,
        }
    }
}

impl fmt::Display for WireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.superlayer, self.layer, self.wire)
    }
}

/// Orientation of the wires in a superlayer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StereoKind {
    /// Wires parallel to the chamber axis.
    Axial,
    /// Stereo wires skewed with positive azimuthal displacement per unit z.
    StereoU,
    /// Stereo wires skewed with negative azimuthal displacement per unit z.
    StereoV,
}

impl StereoKind {
    /// Whether this superlayer carries z information.
    pub fn is_stereo(&self) -> bool {
        !matches!(self, StereoKind::Axial)
    }

    /// Sign of the stereo skew (0 for axial).
    pub fn skew_sign(&self) -> f64 {
        match self {
            StereoKind::Axial => 0.0,
            StereoKind::StereoU => 1.0,
            StereoKind::StereoV => -1.0,
        }
    }
}

/// One layer of wires at a common radius.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Radius of the layer in cm.
    pub radius: f64,
    /// Number of wires, equally spaced in azimuth.
    pub wire_count: u16,
    /// Azimuthal offset of wire 0 in radians.
    pub phi_offset: f64,
}

/// One superlayer: consecutive layers sharing an orientation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuperlayerSpec {
    pub kind: StereoKind,
    /// Transverse wire displacement per cm of z, applied tangentially.
    /// Zero for axial superlayers.
    pub stereo_slope: f64,
    pub layers: Vec<LayerSpec>,
}

/// The validated wire layout of the chamber.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireTopology {
    superlayers: Vec<SuperlayerSpec>,
    /// First continuous layer index of each superlayer.
    #[serde(skip)]
    layer_offsets: Vec<usize>,
    /// Active z extent of the wires, symmetric around z = 0, in cm.
    half_length: f64,
}

impl WireTopology {
    /// Build and validate a topology from superlayer specs.
    pub fn new(superlayers: Vec<SuperlayerSpec>, half_length: f64) -> Result<Self> {
        if superlayers.is_empty() {
            return Err(TrackFindingError::InvalidTopology {
                reason: "no superlayers defined".to_string(),
            });
        }
        if half_length <= 0.0 {
            return Err(TrackFindingError::InvalidTopology {
                reason: format!("non-positive half length {half_length}"),
            });
        }

        let mut previous_radius = 0.0;
        for (sl_index, sl) in superlayers.iter().enumerate() {
            if sl.layers.is_empty() {
                return Err(TrackFindingError::InvalidTopology {
                    reason: format!("superlayer {sl_index} has no layers"),
                });
            }
            if sl.kind.is_stereo() == (sl.stereo_slope == 0.0) {
                return Err(TrackFindingError::InvalidTopology {
                    reason: format!(
                        "superlayer {sl_index}: stereo slope {} inconsistent with kind {:?}",
                        sl.stereo_slope, sl.kind
                    ),
                });
            }
            for (l_index, layer) in sl.layers.iter().enumerate() {
                if layer.wire_count == 0 {
                    return Err(TrackFindingError::InvalidTopology {
                        reason: format!("superlayer {sl_index} layer {l_index} has no wires"),
                    });
                }
                if layer.radius <= previous_radius {
                    return Err(TrackFindingError::InvalidTopology {
                        reason: format!(
                            "superlayer {sl_index} layer {l_index}: radius {} not increasing",
                            layer.radius
                        ),
                    });
                }
                previous_radius = layer.radius;
            }
        }

        let mut topology = Self {
            superlayers,
            layer_offsets: Vec::new(),
            half_length,
        };
        topology.rebuild_offsets();
        Ok(topology)
    }

    fn rebuild_offsets(&mut self) {
        self.layer_offsets.clear();
        let mut offset = 0;
        for sl in &self.superlayers {
            self.layer_offsets.push(offset);
            offset += sl.layers.len();
        }
    }

    /// Deserialize a topology from JSON, re-running validation.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: WireTopology = serde_json::from_str(json)?;
        Self::new(raw.superlayers, raw.half_length)
    }

    /// A nine-superlayer layout with alternating axial and stereo
    /// superlayers, six layers each, spanning radii of 17 to 110 cm.
    pub fn standard() -> Self {
        let kinds = [
            StereoKind::Axial,
            StereoKind::StereoU,
            StereoKind::Axial,
            StereoKind::StereoV,
            StereoKind::Axial,
            StereoKind::StereoU,
            StereoKind::Axial,
            StereoKind::StereoV,
            StereoKind::Axial,
        ];
        let superlayers = kinds
            .iter()
            .enumerate()
            .map(|(sl, &kind)| {
                let inner_radius = 17.0 + sl as f64 * 10.5;
                let wire_count = 160 + 32 * sl as u16;
                let layers = (0..6)
                    .map(|l| LayerSpec {
                        radius: inner_radius + l as f64 * 1.5,
                        wire_count,
                        // Stagger odd layers by half a cell.
                        phi_offset: if l % 2 == 1 {
                            std::f64::consts::PI / wire_count as f64
                        } else {
                            0.0
                        },
                    })
                    .collect();
                SuperlayerSpec {
                    kind,
                    stereo_slope: kind.skew_sign() * 0.006,
                    layers,
                }
            })
            .collect();
        Self::new(superlayers, 120.0).expect("standard layout is valid")
    }

    /// Number of superlayers.
    pub fn superlayer_count(&self) -> usize {
        self.superlayers.len()
    }

    /// Total number of layers across all superlayers.
    pub fn continuous_layer_count(&self) -> usize {
        self.layer_offsets.last().map_or(0, |last| {
            last + self.superlayers.last().map_or(0, |sl| sl.layers.len())
        })
    }

    /// Active z extent of the wires (symmetric around z = 0).
    pub fn half_length(&self) -> f64 {
        self.half_length
    }

    /// Superlayer spec by index.
    pub fn superlayer(&self, index: u8) -> Option<&SuperlayerSpec> {
        self.superlayers.get(index as usize)
    }

    /// Layer spec for a wire id.
    pub fn layer(&self, wire: &WireId) -> Option<&LayerSpec> {
        self.superlayers
            .get(wire.superlayer as usize)?
            .layers
            .get(wire.layer as usize)
    }

    /// Whether the wire id exists in this layout.
    pub fn contains(&self, wire: &WireId) -> bool {
        self.layer(wire)
            .is_some_and(|layer| wire.wire < layer.wire_count)
    }

    /// Continuous layer index of a wire (0 at the innermost layer).
    pub fn continuous_layer(&self, wire: &WireId) -> usize {
        self.layer_offsets[wire.superlayer as usize] + wire.layer as usize
    }

    /// Radius of a continuous layer index.
    pub fn layer_radius(&self, continuous_layer: usize) -> Option<f64> {
        let (sl, layer) = self.split_continuous_layer(continuous_layer)?;
        Some(self.superlayers[sl].layers[layer].radius)
    }

    /// Superlayer and in-superlayer layer of a continuous layer index.
    pub fn split_continuous_layer(&self, continuous_layer: usize) -> Option<(usize, usize)> {
        for (sl, &offset) in self.layer_offsets.iter().enumerate() {
            let len = self.superlayers[sl].layers.len();
            if continuous_layer < offset + len {
                return Some((sl, continuous_layer - offset));
            }
        }
        None
    }

    /// Azimuth of a wire's reference position (z = 0).
    pub fn wire_phi(&self, wire: &WireId) -> f64 {
        let layer = &self.superlayers[wire.superlayer as usize].layers[wire.layer as usize];
        layer.phi_offset + wire.wire as f64 * std::f64::consts::TAU / layer.wire_count as f64
    }

    /// Reference position of a wire at z = 0.
    pub fn wire_ref_position(&self, wire: &WireId) -> Vector2D {
        let layer = &self.superlayers[wire.superlayer as usize].layers[wire.layer as usize];
        Vector2D::from_phi(self.wire_phi(wire)) * layer.radius
    }

    /// Transverse position of a wire at the given z.
    ///
    /// Axial wires do not move; stereo wires are displaced tangentially in
    /// proportion to z.
    pub fn wire_position_at_z(&self, wire: &WireId, z: f64) -> Vector2D {
        let sl = &self.superlayers[wire.superlayer as usize];
        let ref_pos = self.wire_ref_position(wire);
        if sl.stereo_slope == 0.0 {
            return ref_pos;
        }
        let tangent = ref_pos.normalized().orthogonal();
        ref_pos + tangent * (sl.stereo_slope * z)
    }

    /// Stereo slope of the superlayer a wire belongs to.
    pub fn stereo_slope(&self, wire: &WireId) -> f64 {
        self.superlayers[wire.superlayer as usize].stereo_slope
    }

    /// Whether the wire belongs to an axial superlayer.
    pub fn is_axial(&self, wire: &WireId) -> bool {
        self.superlayers[wire.superlayer as usize].kind == StereoKind::Axial
    }

    /// The wire in the given layer closest in azimuth to `phi`.
    pub fn nearest_wire(&self, superlayer: u8, layer: u8, phi: f64) -> Option<WireId> {
        let spec = self
            .superlayers
            .get(superlayer as usize)?
            .layers
            .get(layer as usize)?;
        let pitch = std::f64::consts::TAU / spec.wire_count as f64;
        let index = ((phi - spec.phi_offset) / pitch).round() as i64;
        let wrapped = index.rem_euclid(spec.wire_count as i64) as u16;
        Some(WireId::new(superlayer, layer, wrapped))
    }

    /// Whether two wires are close enough to belong to the same cluster.
    ///
    /// Neighbors share a superlayer, sit on the same or an adjacent layer,
    /// and are within one and a half cell pitches in azimuth.
    pub fn are_neighbors(&self, a: &WireId, b: &WireId) -> bool {
        if a.superlayer != b.superlayer || a == b {
            return false;
        }
        if (a.layer as i16 - b.layer as i16).abs() > 1 {
            return false;
        }
        let pitch_a = std::f64::consts::TAU
            / self.superlayers[a.superlayer as usize].layers[a.layer as usize].wire_count as f64;
        let dphi = crate::geometry::normalize_angle(self.wire_phi(a) - self.wire_phi(b)).abs();
        dphi <= 1.55 * pitch_a
    }
}
