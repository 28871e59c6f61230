//! Core data structures describing a planar pin-jointed truss.
//!
//! A [`Truss`] is an immutable-by-analysis snapshot: the analysis pipeline only
//! ever borrows it, so an edit (which needs `&mut`) can never be observed
//! while a matrix is being assembled from it.

use std::fmt;
use std::str::FromStr;

use petgraph::algo::connected_components;
use petgraph::graph::{EdgeIndex, Graph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::errors::{PropertyError, RecordError, TrussEditError};
use crate::geometry::{Force, Point};

/// One-based identifier of a node.
///
/// Node ids are dense: the n-th node added to a truss has id `n`, and its
/// degrees of freedom are `2n - 1` (horizontal) and `2n` (vertical).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    /// Wrap a one-based node id.
    #[must_use]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// The raw one-based id.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }

    /// One-based dof carrying the horizontal displacement of this node.
    #[must_use]
    pub const fn horizontal_dof(self) -> usize {
        2 * self.0 - 1
    }

    /// One-based dof carrying the vertical displacement of this node.
    #[must_use]
    pub const fn vertical_dof(self) -> usize {
        2 * self.0
    }

    /// One-based dof of this node along `axis`.
    #[must_use]
    pub const fn dof(self, axis: Axis) -> usize {
        match axis {
            Axis::X => self.horizontal_dof(),
            Axis::Y => self.vertical_dof(),
        }
    }

    /// Position of the node in the underlying graph, if the id is non-zero.
    fn graph_index(self) -> Option<NodeIndex> {
        self.0.checked_sub(1).map(NodeIndex::new)
    }

    /// Id of the node stored at `index`.
    fn from_graph_index(index: NodeIndex) -> Self {
        Self(index.index() + 1)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// One-based identifier of a member.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(usize);

impl MemberId {
    /// Wrap a one-based member id.
    #[must_use]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// The raw one-based id.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }

    /// Position of the member in the underlying graph.
    fn graph_index(self) -> Option<EdgeIndex> {
        self.0.checked_sub(1).map(EdgeIndex::new)
    }

    /// Id of the member stored at `index`.
    fn from_graph_index(index: EdgeIndex) -> Self {
        Self(index.index() + 1)
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// One-based identifier of a material/section property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(usize);

impl PropertyId {
    /// Wrap a one-based property id.
    #[must_use]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// The raw one-based id.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Global translation axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Horizontal.
    X,
    /// Vertical.
    Y,
}

impl Axis {
    /// Node and axis owning the one-based `dof`.
    #[must_use]
    pub const fn of_dof(dof: usize) -> (NodeId, Axis) {
        let axis = if dof % 2 == 1 { Axis::X } else { Axis::Y };
        (NodeId::new((dof + 1) / 2), axis)
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => f.pad("x"),
            Axis::Y => f.pad("y"),
        }
    }
}

/// Elastic modulus and cross-sectional area shared by one or more members.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Modulus of elasticity E.
    pub elastic_modulus: f64,
    /// Cross-sectional area A.
    pub area: f64,
}

impl Property {
    /// Create a property, rejecting non-positive values.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError`] when either value is zero or negative.
    pub fn new(elastic_modulus: f64, area: f64) -> Result<Self, PropertyError> {
        if area.is_nan() || area <= 0.0 {
            return Err(PropertyError::NonPositiveArea(area));
        }
        if elastic_modulus.is_nan() || elastic_modulus <= 0.0 {
            return Err(PropertyError::NonPositiveElasticModulus(elastic_modulus));
        }
        Ok(Self {
            elastic_modulus,
            area,
        })
    }
}

/// Kind of support restraining a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SupportKind {
    /// Restrains both translations.
    Pinned,
    /// Rolls horizontally; restrains the vertical translation only.
    HorizontalRoller,
    /// Rolls vertically; restrains the horizontal translation only.
    VerticalRoller,
}

impl SupportKind {
    /// Axes along which this support prevents movement.
    #[must_use]
    pub const fn restrained_axes(self) -> &'static [Axis] {
        match self {
            SupportKind::Pinned => &[Axis::X, Axis::Y],
            SupportKind::HorizontalRoller => &[Axis::Y],
            SupportKind::VerticalRoller => &[Axis::X],
        }
    }
}

impl FromStr for SupportKind {
    type Err = RecordError;

    /// Accepts names in any case with spaces, dashes or underscores, and the
    /// numeric tags `0`, `1` and `2` used by the desktop front end.
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let normalised: String = tag
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();
        match normalised.as_str() {
            "0" | "pinned" | "pin" => Ok(SupportKind::Pinned),
            "1" | "horizontalroller" => Ok(SupportKind::HorizontalRoller),
            "2" | "verticalroller" => Ok(SupportKind::VerticalRoller),
            _ => Err(RecordError::UnknownSupportKind(tag.to_owned())),
        }
    }
}

impl fmt::Display for SupportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupportKind::Pinned => f.write_str("pinned"),
            SupportKind::HorizontalRoller => f.write_str("horizontal roller"),
            SupportKind::VerticalRoller => f.write_str("vertical roller"),
        }
    }
}

/// Point load given by magnitude and direction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Load {
    /// Magnitude in the model's force unit.
    pub magnitude: f64,
    /// Direction in degrees, counter-clockwise from +x.
    pub angle_degrees: f64,
}

impl Load {
    /// Create a load.
    #[must_use]
    pub const fn new(magnitude: f64, angle_degrees: f64) -> Self {
        Self {
            magnitude,
            angle_degrees,
        }
    }

    /// Cartesian components of the load.
    #[must_use]
    pub fn force(self) -> Force {
        Force::from_polar(self.magnitude, self.angle_degrees)
    }
}

/// Internal representation of a truss node.
#[derive(Clone, Debug)]
struct Joint {
    /// Position of the node.
    position: Point,
    /// Optional support at the node.
    support: Option<SupportKind>,
    /// Loads applied at the node, summed during analysis.
    loads: Vec<Load>,
}

/// Internal representation of a truss member.
#[derive(Clone, Debug)]
struct Bar {
    /// Property the member draws E and A from.
    property: PropertyId,
}

/// Read-only view of a member's connectivity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MemberView {
    /// Member id.
    pub id: MemberId,
    /// Start node.
    pub from: NodeId,
    /// End node.
    pub to: NodeId,
    /// Property assigned to the member.
    pub property: PropertyId,
}

/// Container for a planar pin-jointed truss model.
#[derive(Clone, Debug, Default)]
pub struct Truss {
    /// Nodes as graph vertices, members as graph edges.
    graph: Graph<Joint, Bar>,
    /// Properties indexed by `PropertyId - 1`.
    properties: Vec<Property>,
}

impl Truss {
    /// Create an empty truss.
    ///
    /// # Examples
    /// ```
    /// use truss2d::Truss;
    ///
    /// let truss = Truss::new();
    /// assert_eq!(truss.node_count(), 0);
    /// assert_eq!(truss.dof_count(), 0);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the number of nodes in the truss.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Return the number of members in the truss.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Return the number of properties defined.
    #[must_use]
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Total number of degrees of freedom, two per node.
    #[must_use]
    pub fn dof_count(&self) -> usize {
        2 * self.node_count()
    }

    /// Add a node and return its id.
    pub fn add_node(&mut self, position: Point) -> NodeId {
        NodeId::from_graph_index(self.graph.add_node(Joint {
            position,
            support: None,
            loads: Vec::new(),
        }))
    }

    /// Update the position of an existing node.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError::UnknownNode`] when `node` is not part of this truss.
    pub fn move_node(&mut self, node: NodeId, position: Point) -> Result<(), TrussEditError> {
        self.joint_mut(node)?.position = position;
        Ok(())
    }

    /// Register a property and return its id.
    pub fn add_property(&mut self, property: Property) -> PropertyId {
        self.properties.push(property);
        PropertyId::new(self.properties.len())
    }

    /// Connect two distinct nodes with a member drawing on `property`.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError`] when a node or the property is unknown, or
    /// when `from` and `to` are the same node.
    pub fn add_member(
        &mut self,
        from: NodeId,
        to: NodeId,
        property: PropertyId,
    ) -> Result<MemberId, TrussEditError> {
        let start = self.node_index(from)?;
        let end = self.node_index(to)?;
        if from == to {
            return Err(TrussEditError::SelfConnectedMember(from));
        }
        self.check_property(property)?;
        Ok(MemberId::from_graph_index(
            self.graph.add_edge(start, end, Bar { property }),
        ))
    }

    /// Assign a different property to a member.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError`] when the member or property is unknown.
    pub fn set_member_property(
        &mut self,
        member: MemberId,
        property: PropertyId,
    ) -> Result<(), TrussEditError> {
        self.check_property(property)?;
        let bar = member
            .graph_index()
            .and_then(|index| self.graph.edge_weight_mut(index))
            .ok_or(TrussEditError::UnknownMember(member))?;
        bar.property = property;
        Ok(())
    }

    /// Place a support at a node.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError::UnknownNode`] for an unknown node and
    /// [`TrussEditError::DuplicateSupport`] when the node is already supported.
    pub fn set_support(&mut self, node: NodeId, kind: SupportKind) -> Result<(), TrussEditError> {
        let joint = self.joint_mut(node)?;
        if joint.support.is_some() {
            return Err(TrussEditError::DuplicateSupport(node));
        }
        joint.support = Some(kind);
        Ok(())
    }

    /// Remove the support at a node, returning what was there.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError::UnknownNode`] when `node` is not part of this truss.
    pub fn remove_support(&mut self, node: NodeId) -> Result<Option<SupportKind>, TrussEditError> {
        Ok(self.joint_mut(node)?.support.take())
    }

    /// Apply a point load at a node. Loads at the same node accumulate.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError::UnknownNode`] when `node` is not part of this truss.
    pub fn add_load(&mut self, node: NodeId, load: Load) -> Result<(), TrussEditError> {
        self.joint_mut(node)?.loads.push(load);
        Ok(())
    }

    /// Remove every load applied at a node.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError::UnknownNode`] when `node` is not part of this truss.
    pub fn clear_loads(&mut self, node: NodeId) -> Result<(), TrussEditError> {
        self.joint_mut(node)?.loads.clear();
        Ok(())
    }

    /// Position of a node.
    #[must_use]
    pub fn node_position(&self, node: NodeId) -> Option<Point> {
        self.joint(node).map(|joint| joint.position)
    }

    /// Support at a node, if any.
    #[must_use]
    pub fn support(&self, node: NodeId) -> Option<SupportKind> {
        self.joint(node).and_then(|joint| joint.support)
    }

    /// Loads applied at a node, in insertion order.
    #[must_use]
    pub fn loads(&self, node: NodeId) -> &[Load] {
        self.joint(node).map_or(&[], |joint| joint.loads.as_slice())
    }

    /// Resultant of every load applied at a node.
    #[must_use]
    pub fn net_load(&self, node: NodeId) -> Force {
        self.loads(node)
            .iter()
            .fold(Force::default(), |total, load| total + load.force())
    }

    /// Property by id.
    #[must_use]
    pub fn property(&self, id: PropertyId) -> Option<Property> {
        id.get()
            .checked_sub(1)
            .and_then(|index| self.properties.get(index))
            .copied()
    }

    /// Iterate over nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, Point)> + '_ {
        self.graph
            .node_indices()
            .map(|index| (NodeId::from_graph_index(index), self.graph[index].position))
    }

    /// Iterate over supported nodes in id order.
    pub fn supports(&self) -> impl Iterator<Item = (NodeId, SupportKind)> + '_ {
        self.graph.node_indices().filter_map(|index| {
            self.graph[index]
                .support
                .map(|kind| (NodeId::from_graph_index(index), kind))
        })
    }

    /// Iterate over members in id order.
    pub fn members(&self) -> impl Iterator<Item = MemberView> + '_ {
        self.graph.edge_indices().filter_map(|index| self.view(index))
    }

    /// Connectivity of one member.
    #[must_use]
    pub fn member(&self, id: MemberId) -> Option<MemberView> {
        id.graph_index().and_then(|index| self.view(index))
    }

    /// Number of disconnected pieces the members split the nodes into.
    #[must_use]
    pub fn component_count(&self) -> usize {
        connected_components(&self.graph)
    }

    /// Connectivity of the member stored at `index`.
    fn view(&self, index: EdgeIndex) -> Option<MemberView> {
        let (start, end) = self.graph.edge_endpoints(index)?;
        Some(MemberView {
            id: MemberId::from_graph_index(index),
            from: NodeId::from_graph_index(start),
            to: NodeId::from_graph_index(end),
            property: self.graph[index].property,
        })
    }

    /// Graph index of an existing node.
    fn node_index(&self, node: NodeId) -> Result<NodeIndex, TrussEditError> {
        node.graph_index()
            .filter(|index| index.index() < self.graph.node_count())
            .ok_or(TrussEditError::UnknownNode(node))
    }

    /// Joint data of a node.
    fn joint(&self, node: NodeId) -> Option<&Joint> {
        node.graph_index()
            .and_then(|index| self.graph.node_weight(index))
    }

    /// Mutable joint data of an existing node.
    fn joint_mut(&mut self, node: NodeId) -> Result<&mut Joint, TrussEditError> {
        node.graph_index()
            .and_then(|index| self.graph.node_weight_mut(index))
            .ok_or(TrussEditError::UnknownNode(node))
    }

    /// Fail unless `property` is registered.
    fn check_property(&self, property: PropertyId) -> Result<(), TrussEditError> {
        self.property(property)
            .map(|_| ())
            .ok_or(TrussEditError::UnknownProperty(property))
    }
}
