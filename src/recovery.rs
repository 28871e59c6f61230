//! Derived quantities recovered from a solved displacement vector.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::assembly::MemberFrame;
use crate::geometry::{Displacement, Force};
use crate::solver::RestrainedDofs;
use crate::truss::{Axis, MemberId, NodeId};

/// Sense of a member's axial force.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForceKind {
    /// Positive axial force.
    Tension,
    /// Negative axial force.
    Compression,
    /// No axial force.
    Zero,
}

impl ForceKind {
    /// Classify `force`, treating magnitudes up to `threshold` as zero.
    #[must_use]
    pub fn classify(force: f64, threshold: f64) -> Self {
        if force == 0.0 || force.abs() <= threshold {
            ForceKind::Zero
        } else if force > 0.0 {
            ForceKind::Tension
        } else {
            ForceKind::Compression
        }
    }
}

impl std::fmt::Display for ForceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ForceKind::Tension => "tension",
            ForceKind::Compression => "compression",
            ForceKind::Zero => "zero",
        })
    }
}

/// Displacement of one node.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct NodeDisplacement {
    /// Node id.
    pub node: NodeId,
    /// Horizontal and vertical displacement.
    pub displacement: Displacement,
}

/// Support reaction at one restrained dof.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Reaction {
    /// One-based restrained dof.
    pub dof: usize,
    /// Node owning the dof.
    pub node: NodeId,
    /// Direction of the dof.
    pub axis: Axis,
    /// Resisting force, excluding any load applied directly at the dof.
    pub force: f64,
}

/// Axial response of one member.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MemberResult {
    /// Member id.
    pub member: MemberId,
    /// Start node.
    pub from: NodeId,
    /// End node.
    pub to: NodeId,
    /// Axial force; tension positive.
    pub force: f64,
    /// Axial stress, force over area.
    pub stress: f64,
    /// Tension, compression or zero.
    pub kind: ForceKind,
}

/// Per-node displacement pairs from a full displacement vector.
#[must_use]
pub fn node_displacements(displacements: &DVector<f64>) -> Vec<NodeDisplacement> {
    (1..=displacements.len() / 2)
        .map(NodeId::new)
        .map(|node| NodeDisplacement {
            node,
            displacement: Displacement::new(
                displacements[node.horizontal_dof() - 1],
                displacements[node.vertical_dof() - 1],
            ),
        })
        .collect()
}

/// Reactions as unreduced stiffness row times displacements, net of the load
/// applied at the same dof.
#[must_use]
pub fn reactions(
    global: &DMatrix<f64>,
    displacements: &DVector<f64>,
    restrained: &RestrainedDofs,
    load: &DVector<f64>,
) -> Vec<Reaction> {
    restrained
        .as_slice()
        .iter()
        .map(|&dof| {
            let (node, axis) = Axis::of_dof(dof);
            let raw = global.row(dof - 1).dot(&displacements.transpose());
            Reaction {
                dof,
                node,
                axis,
                force: raw - load[dof - 1],
            }
        })
        .collect()
}

/// Axial force in every member, in frame order.
#[must_use]
pub fn member_forces(frames: &[MemberFrame], displacements: &DVector<f64>) -> Vec<f64> {
    frames
        .iter()
        .map(|frame| frame.axial_force(displacements))
        .collect()
}

/// Force, stress and classification for every member.
///
/// Forces at most `zero_tolerance` times the largest force magnitude count as
/// zero. When every force is exactly zero, every member is zero.
#[must_use]
pub fn member_results(
    frames: &[MemberFrame],
    displacements: &DVector<f64>,
    zero_tolerance: f64,
) -> Vec<MemberResult> {
    let forces = member_forces(frames, displacements);
    let largest = forces.iter().fold(0.0_f64, |max, force| max.max(force.abs()));
    let threshold = zero_tolerance * largest;
    frames
        .iter()
        .zip(forces)
        .map(|(frame, force)| MemberResult {
            member: frame.member,
            from: frame.from,
            to: frame.to,
            force,
            stress: force / frame.property.area,
            kind: ForceKind::classify(force, threshold),
        })
        .collect()
}

/// Sum of reactions plus applied loads per axis; zero for a body in equilibrium.
#[must_use]
pub fn equilibrium_residual(reactions: &[Reaction], load: &DVector<f64>) -> Force {
    let mut total = Force::default();
    for reaction in reactions {
        match reaction.axis {
            Axis::X => total.x += reaction.force,
            Axis::Y => total.y += reaction.force,
        }
    }
    for (index, value) in load.iter().enumerate() {
        if index % 2 == 0 {
            total.x += value;
        } else {
            total.y += value;
        }
    }
    total
}
