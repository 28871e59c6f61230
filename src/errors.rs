//! Error types produced while editing, importing or analysing trusses.

use thiserror::Error;

use crate::truss::{MemberId, NodeId, PropertyId};

/// Error returned when a truss analysis cannot produce results.
///
/// The first three variants describe an unstable or ill-posed structure and
/// collapse to [`AnalysisStatus::Unstable`](crate::AnalysisStatus::Unstable)
/// for display; see [`AnalysisError::is_instability`].
#[derive(Clone, Debug, Error, PartialEq)]
pub enum AnalysisError {
    /// Returned when members plus restrained dofs cannot cover every dof.
    #[error(
        "structure is unstable: {members} members + {restrained} reactions < {dofs} degrees of freedom"
    )]
    StructuralInsufficiency {
        /// Number of members in the model.
        members: usize,
        /// Number of restrained degrees of freedom.
        restrained: usize,
        /// Total number of degrees of freedom (twice the node count).
        dofs: usize,
    },
    /// Returned when a member joins two coincident nodes.
    #[error("member {0} has zero length")]
    DegenerateMember(MemberId),
    /// Returned when the reduced stiffness matrix cannot be inverted.
    #[error("stiffness matrix is singular; check supports and connectivity")]
    SingularSystem,
    /// Returned when an influence line path names a node that does not exist.
    #[error("node {0} does not exist in this truss")]
    UnknownNode(NodeId),
}

impl AnalysisError {
    /// Whether the error means the structure itself cannot be analysed.
    #[must_use]
    pub fn is_instability(&self) -> bool {
        matches!(
            self,
            Self::StructuralInsufficiency { .. } | Self::DegenerateMember(_) | Self::SingularSystem
        )
    }
}

/// Error returned when a material property is not physically meaningful.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum PropertyError {
    /// Returned when the cross-sectional area is zero or negative.
    #[error("area must be positive (received {0})")]
    NonPositiveArea(f64),
    /// Returned when the elastic modulus is zero or negative.
    #[error("elastic modulus must be positive (received {0})")]
    NonPositiveElasticModulus(f64),
}

/// Error returned when editing a [`Truss`](crate::Truss) with invalid references.
///
/// # Examples
///
/// ```
/// use truss2d::{point, NodeId, PropertyId, Truss, TrussEditError};
///
/// let mut truss = Truss::new();
/// let a = truss.add_node(point(0.0, 0.0));
/// let error = truss
///     .add_member(a, NodeId::new(7), PropertyId::new(1))
///     .expect_err("unknown node is rejected");
/// assert_eq!(error, TrussEditError::UnknownNode(NodeId::new(7)));
/// ```
#[derive(Debug, Error, PartialEq)]
pub enum TrussEditError {
    /// Returned when a node cannot be found in the truss.
    #[error("node {0} does not exist in this truss")]
    UnknownNode(NodeId),
    /// Returned when a member cannot be found in the truss.
    #[error("member {0} does not exist in this truss")]
    UnknownMember(MemberId),
    /// Returned when a property cannot be found in the truss.
    #[error("property {0} does not exist in this truss")]
    UnknownProperty(PropertyId),
    /// Returned when a member would start and end at the same node.
    #[error("member cannot connect node {0} to itself")]
    SelfConnectedMember(NodeId),
    /// Returned when a node already carries a support.
    #[error("node {0} already has a support")]
    DuplicateSupport(NodeId),
    /// Returned when the supplied property values are invalid.
    #[error("{0}")]
    InvalidProperty(#[from] PropertyError),
}

/// Reason a single input record was skipped during import.
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    /// Returned when a cell is missing or does not parse as a number.
    #[error("field `{field}` is not a valid number")]
    InvalidNumber {
        /// Name of the offending field.
        field: &'static str,
    },
    /// Returned when a cell does not parse as a positive integer id.
    #[error("field `{field}` is not a valid id")]
    InvalidId {
        /// Name of the offending field.
        field: &'static str,
    },
    /// Returned when a support type tag is not recognised.
    #[error("unknown support type `{0}`")]
    UnknownSupportKind(String),
    /// Returned when no property can be resolved for a member.
    #[error("member has no property assigned")]
    MissingProperty,
    /// Returned when the record references something the model rejects.
    #[error(transparent)]
    Rejected(#[from] TrussEditError),
}
