//! Element and global stiffness assembly.

use nalgebra::{DMatrix, DVector, RowSVector, SMatrix, SVector};
use serde::Serialize;

use crate::errors::AnalysisError;
use crate::geometry::Point;
use crate::truss::{MemberId, NodeId, Property, Truss};

/// Geometry and stiffness of one member, derived from the current model.
///
/// The same frame drives assembly and force recovery so both use one
/// transform.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MemberFrame {
    /// Member id.
    pub member: MemberId,
    /// Start node.
    pub from: NodeId,
    /// End node.
    pub to: NodeId,
    /// Start node position.
    pub start: Point,
    /// End node position.
    pub end: Point,
    /// Euclidean length.
    pub length: f64,
    /// Direction cosine, Δx / L.
    pub cos: f64,
    /// Direction sine, Δy / L.
    pub sin: f64,
    /// Material and section.
    pub property: Property,
}

impl MemberFrame {
    /// Build the frame for a member between `start` and `end`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::DegenerateMember`] when the nodes coincide.
    pub fn new(
        member: MemberId,
        (from, start): (NodeId, Point),
        (to, end): (NodeId, Point),
        property: Property,
    ) -> Result<Self, AnalysisError> {
        let delta = end.to_vector() - start.to_vector();
        let length = delta.norm();
        if length == 0.0 || !length.is_finite() {
            return Err(AnalysisError::DegenerateMember(member));
        }
        Ok(Self {
            member,
            from,
            to,
            start,
            end,
            length,
            cos: delta.x / length,
            sin: delta.y / length,
            property,
        })
    }

    /// Axial stiffness E·A/L.
    #[must_use]
    pub fn axial_stiffness(&self) -> f64 {
        self.property.elastic_modulus * self.property.area / self.length
    }

    /// Row vector τ = [−c, −s, c, s] mapping end displacements to elongation.
    #[must_use]
    pub fn transform(&self) -> RowSVector<f64, 4> {
        RowSVector::<f64, 4>::new(-self.cos, -self.sin, self.cos, self.sin)
    }

    /// One-based global dofs in element order: from-x, from-y, to-x, to-y.
    #[must_use]
    pub fn dofs(&self) -> [usize; 4] {
        [
            self.from.horizontal_dof(),
            self.from.vertical_dof(),
            self.to.horizontal_dof(),
            self.to.vertical_dof(),
        ]
    }

    /// Element stiffness (E·A/L)·τᵀτ in global coordinates.
    #[must_use]
    pub fn element_stiffness(&self) -> SMatrix<f64, 4, 4> {
        let tau = self.transform();
        tau.transpose() * tau * self.axial_stiffness()
    }

    /// Axial force (E·A/L)·τ·d for a full displacement vector; tension positive.
    #[must_use]
    pub fn axial_force(&self, displacements: &DVector<f64>) -> f64 {
        let local = SVector::<f64, 4>::from_iterator(
            self.dofs().iter().map(|&dof| displacements[dof - 1]),
        );
        self.axial_stiffness() * self.transform().dot(&local.transpose())
    }

    /// Tabulate this member for reports.
    #[must_use]
    pub fn detail(&self) -> MemberDetail {
        let k = self.element_stiffness();
        MemberDetail {
            frame: self.clone(),
            dofs: self.dofs(),
            stiffness: std::array::from_fn(|row| std::array::from_fn(|col| k[(row, col)])),
        }
    }
}

/// Tabulated member data: geometry, dof labels and element stiffness.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MemberDetail {
    /// Geometry and property of the member.
    #[serde(flatten)]
    pub frame: MemberFrame,
    /// One-based global dofs labelling the rows and columns of `stiffness`.
    pub dofs: [usize; 4],
    /// Element stiffness in global coordinates.
    pub stiffness: [[f64; 4]; 4],
}

/// Frames for every member plus the assembled global stiffness matrix.
#[derive(Clone, Debug)]
pub struct GlobalStiffness {
    /// Member frames in member id order.
    pub frames: Vec<MemberFrame>,
    /// Dense symmetric `2n × 2n` matrix, zero-based dof indices.
    pub matrix: DMatrix<f64>,
}

/// Derive the frame of every member in the truss.
///
/// # Errors
///
/// Returns [`AnalysisError::DegenerateMember`] for the first zero-length member.
pub fn member_frames(truss: &Truss) -> Result<Vec<MemberFrame>, AnalysisError> {
    truss
        .members()
        .map(|view| {
            let position = |node: NodeId| {
                truss
                    .node_position(node)
                    .expect("members reference existing nodes")
            };
            let property = truss
                .property(view.property)
                .expect("members reference existing properties");
            MemberFrame::new(
                view.id,
                (view.from, position(view.from)),
                (view.to, position(view.to)),
                property,
            )
        })
        .collect()
}

/// Assemble the global stiffness matrix from scratch.
///
/// # Errors
///
/// Returns [`AnalysisError::DegenerateMember`] when a member has zero length.
pub fn assemble(truss: &Truss) -> Result<GlobalStiffness, AnalysisError> {
    let frames = member_frames(truss)?;
    let dof = truss.dof_count();
    let mut matrix = DMatrix::zeros(dof, dof);
    for frame in &frames {
        let local = frame.element_stiffness();
        let dof_map = frame.dofs();
        for (row_local, global_row) in dof_map.iter().enumerate() {
            for (col_local, global_col) in dof_map.iter().enumerate() {
                matrix[(global_row - 1, global_col - 1)] += local[(row_local, col_local)];
            }
        }
    }
    log::debug!(
        "assembled {dof}x{dof} global stiffness matrix from {} members",
        frames.len()
    );
    Ok(GlobalStiffness { frames, matrix })
}
