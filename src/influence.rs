//! Influence lines for a unit vertical load travelling along a straight path.
//!
//! The stiffness configuration is fixed while the load moves, so every
//! position reuses the factorisation held by [`ReducedSystem`] and only the
//! load vector changes.

use std::collections::BTreeMap;

use nalgebra::DVector;
use serde::Serialize;

use crate::assembly::MemberFrame;
use crate::errors::AnalysisError;
use crate::geometry::Point;
use crate::recovery::member_forces;
use crate::solver::ReducedSystem;
use crate::truss::{MemberId, NodeId, Truss};

/// Magnitude of the travelling load; applied downward (−y).
pub const UNIT_LOAD: f64 = 1.0;

/// A node visited by the travelling load.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PathPosition {
    /// Node carrying the load.
    pub node: NodeId,
    /// Where the node sits.
    pub position: Point,
}

/// One ordinate of an influence line.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct InfluenceOrdinate {
    /// Node carrying the unit load.
    pub node: NodeId,
    /// Member force with the unit load at `node`.
    pub force: f64,
}

/// Influence lines of every member for one load path.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InfluenceLineTable {
    /// First node of the path.
    pub start: NodeId,
    /// Last node of the path.
    pub end: NodeId,
    /// Load positions in traversal order.
    pub positions: Vec<PathPosition>,
    /// Ordinates per member, in the order of `positions`.
    pub lines: BTreeMap<MemberId, Vec<InfluenceOrdinate>>,
}

impl InfluenceLineTable {
    /// Ordinates for one member.
    #[must_use]
    pub fn line(&self, member: MemberId) -> Option<&[InfluenceOrdinate]> {
        self.lines.get(&member).map(Vec::as_slice)
    }

    /// Whether the path degenerated to a single position.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.positions.len() < 2
    }
}

/// Nodes lying on the segment from `start` to `end`, ordered from `start`.
///
/// A node qualifies when its cross product with the path direction is within
/// `tolerance` of zero (relative to the squared path length) and its
/// projection falls between the endpoints. `start` is always first. When the
/// endpoints coincide the path is just `start`.
///
/// # Errors
///
/// Returns [`AnalysisError::UnknownNode`] when either endpoint is missing.
pub fn load_path(
    truss: &Truss,
    start: NodeId,
    end: NodeId,
    tolerance: f64,
) -> Result<Vec<PathPosition>, AnalysisError> {
    let origin = truss
        .node_position(start)
        .ok_or(AnalysisError::UnknownNode(start))?;
    let target = truss
        .node_position(end)
        .ok_or(AnalysisError::UnknownNode(end))?;
    let direction = target.to_vector() - origin.to_vector();
    let length_squared = direction.norm_squared();
    let first = PathPosition {
        node: start,
        position: origin,
    };
    if length_squared == 0.0 {
        log::debug!("load path {start}->{end} has zero length; using start only");
        return Ok(vec![first]);
    }

    let mut along: Vec<(f64, PathPosition)> = truss
        .nodes()
        .filter(|(node, _)| *node != start)
        .filter_map(|(node, position)| {
            let offset = position.to_vector() - origin.to_vector();
            let cross = direction.x * offset.y - direction.y * offset.x;
            if cross.abs() > tolerance * length_squared {
                return None;
            }
            let t = direction.dot(&offset) / length_squared;
            (-tolerance..=1.0 + tolerance)
                .contains(&t)
                .then_some((t, PathPosition { node, position }))
        })
        .collect();
    along.sort_by(|(a, _), (b, _)| a.total_cmp(b));

    let path: Vec<PathPosition> = std::iter::once(first)
        .chain(along.into_iter().map(|(_, position)| position))
        .collect();
    log::debug!(
        "load path {start}->{end}: {:?}",
        path.iter().map(|p| p.node.get()).collect::<Vec<_>>()
    );
    Ok(path)
}

/// Member forces for a unit downward load at each position of `path`.
///
/// # Errors
///
/// Returns [`AnalysisError::SingularSystem`] if a solve fails.
pub fn influence_lines(
    frames: &[MemberFrame],
    system: &ReducedSystem,
    start: NodeId,
    end: NodeId,
    path: Vec<PathPosition>,
) -> Result<InfluenceLineTable, AnalysisError> {
    let mut lines: BTreeMap<MemberId, Vec<InfluenceOrdinate>> = frames
        .iter()
        .map(|frame| (frame.member, Vec::with_capacity(path.len())))
        .collect();

    for position in &path {
        let mut load = DVector::zeros(system.dof_count());
        load[position.node.vertical_dof() - 1] = -UNIT_LOAD;
        let displacements = system.solve_full(&load)?;
        let forces = member_forces(frames, &displacements);
        for (frame, force) in frames.iter().zip(forces) {
            if let Some(line) = lines.get_mut(&frame.member) {
                line.push(InfluenceOrdinate {
                    node: position.node,
                    force,
                });
            }
        }
    }

    Ok(InfluenceLineTable {
        start,
        end,
        positions: path,
        lines,
    })
}
