//! The analysis pipeline: determinacy, assembly, solve and recovery.
//!
//! [`analyze`] is a pure function of a [`Truss`] snapshot. It is re-run in
//! full after every edit; nothing is cached between runs.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::assembly::{assemble, MemberDetail, MemberFrame};
use crate::determinacy::{check_determinacy, Determinacy};
use crate::errors::AnalysisError;
use crate::geometry::{Displacement, Force};
use crate::influence::{influence_lines, load_path, InfluenceLineTable};
use crate::recovery::{
    equilibrium_residual, member_results, node_displacements, reactions, MemberResult,
    NodeDisplacement, Reaction,
};
use crate::solver::{load_vector, restrained_dofs, ReducedSystem, RestrainedDofs};
use crate::truss::{MemberId, NodeId, Truss};

/// Numerical settings for an analysis run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Smallest admissible ratio between the smallest and largest LU pivot of the
    /// diagonally scaled reduced matrix.
    pub singular_tolerance: f64,
    /// Fraction of the largest member force below which a force counts as zero.
    pub zero_force_tolerance: f64,
    /// Colinearity tolerance for influence line paths, relative to the squared path length.
    pub path_tolerance: f64,
    /// Check static equilibrium after recovery and warn when it fails.
    pub check_statics: bool,
    /// Equilibrium tolerance, relative to the largest applied load component.
    pub equilibrium_tolerance: f64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            singular_tolerance: 1.0e-10,
            zero_force_tolerance: 1.0e-9,
            path_tolerance: 1.0e-9,
            check_statics: true,
            equilibrium_tolerance: 1.0e-6,
        }
    }
}

/// User-facing stability verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    /// The structure was solved.
    Stable,
    /// The structure cannot carry load; no results exist.
    Unstable,
}

/// Results of a successful analysis.
///
/// A solution borrows the truss it was computed from, so the model cannot be
/// edited while results derived from it are alive.
#[derive(Clone, Debug)]
pub struct Solution<'a> {
    truss: &'a Truss,
    options: AnalysisOptions,
    frames: Vec<MemberFrame>,
    global: DMatrix<f64>,
    restrained: RestrainedDofs,
    system: ReducedSystem,
    load: DVector<f64>,
    displacements: DVector<f64>,
    reactions: Vec<Reaction>,
    members: Vec<MemberResult>,
}

/// Run the full pipeline on a truss.
///
/// # Errors
///
/// Returns an [`AnalysisError`] whose [`is_instability`](AnalysisError::is_instability)
/// is true when the structure is insufficiently restrained, has a zero-length
/// member, or yields a singular stiffness matrix. The determinacy screen runs
/// first; when it fails no matrix is assembled.
///
/// # Examples
/// ```
/// use truss2d::{analyze, point, AnalysisOptions, Load, Property, SupportKind, Truss};
///
/// let mut truss = Truss::new();
/// let steel = truss.add_property(Property::new(200.0e9, 0.01)?);
/// let a = truss.add_node(point(0.0, 0.0));
/// let b = truss.add_node(point(1.0, 0.0));
/// truss.add_member(a, b, steel)?;
/// truss.set_support(a, SupportKind::Pinned)?;
/// truss.set_support(b, SupportKind::HorizontalRoller)?;
/// truss.add_load(b, Load::new(1_000.0, 0.0))?;
///
/// let solution = analyze(&truss, &AnalysisOptions::default())?;
/// let force = solution.member(truss2d::MemberId::new(1)).map(|m| m.force);
/// assert!((force.unwrap_or_default() - 1_000.0).abs() < 1.0e-6);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn analyze<'a>(
    truss: &'a Truss,
    options: &AnalysisOptions,
) -> Result<Solution<'a>, AnalysisError> {
    let restrained = restrained_dofs(truss);
    let members = truss.member_count();
    let dofs = truss.dof_count();
    log::debug!(
        "analysing {} nodes ({dofs} dofs), {members} members, restrained dofs {:?}",
        truss.node_count(),
        restrained.as_slice()
    );

    if check_determinacy(members, restrained.len(), truss.node_count()) == Determinacy::Unstable {
        log::info!(
            "unstable: {members} members + {} reactions < {dofs} dofs",
            restrained.len()
        );
        return Err(AnalysisError::StructuralInsufficiency {
            members,
            restrained: restrained.len(),
            dofs,
        });
    }
    if truss.component_count() > 1 {
        log::warn!(
            "truss has {} disconnected parts; expect a singular system",
            truss.component_count()
        );
    }

    let stiffness = assemble(truss)?;
    let system = ReducedSystem::new(&stiffness.matrix, &restrained, options.singular_tolerance)?;
    let load = load_vector(truss);
    let displacements = system.solve_full(&load)?;
    log::debug!("displacements: {:?}", displacements.as_slice());

    let reactions = reactions(&stiffness.matrix, &displacements, &restrained, &load);
    let members = member_results(&stiffness.frames, &displacements, options.zero_force_tolerance);
    log::debug!(
        "reactions: {:?}",
        reactions.iter().map(|r| (r.dof, r.force)).collect::<Vec<_>>()
    );
    log::debug!(
        "member forces: {:?}",
        members.iter().map(|m| m.force).collect::<Vec<_>>()
    );
    log::info!("stable: solved {} free dofs", system.free_dofs().len());

    let solution = Solution {
        truss,
        options: *options,
        frames: stiffness.frames,
        global: stiffness.matrix,
        restrained,
        system,
        load,
        displacements,
        reactions,
        members,
    };
    if options.check_statics {
        solution.check_statics();
    }
    Ok(solution)
}

impl<'a> Solution<'a> {
    /// The truss this solution was computed from.
    #[must_use]
    pub fn truss(&self) -> &'a Truss {
        self.truss
    }

    /// Full displacement vector, index `dof - 1`; zero at restrained dofs.
    #[must_use]
    pub fn displacement_vector(&self) -> &DVector<f64> {
        &self.displacements
    }

    /// Displacement of one node.
    #[must_use]
    pub fn displacement(&self, node: NodeId) -> Option<Displacement> {
        self.truss.node_position(node)?;
        Some(Displacement::new(
            self.displacements[node.horizontal_dof() - 1],
            self.displacements[node.vertical_dof() - 1],
        ))
    }

    /// Displacement of every node, in id order.
    #[must_use]
    pub fn displacements(&self) -> Vec<NodeDisplacement> {
        node_displacements(&self.displacements)
    }

    /// Reactions at every restrained dof, ascending.
    #[must_use]
    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    /// Force, stress and classification of every member.
    #[must_use]
    pub fn members(&self) -> &[MemberResult] {
        &self.members
    }

    /// Result for one member.
    #[must_use]
    pub fn member(&self, member: MemberId) -> Option<&MemberResult> {
        self.members.iter().find(|result| result.member == member)
    }

    /// Geometry and element stiffness of every member.
    #[must_use]
    pub fn member_frames(&self) -> &[MemberFrame] {
        &self.frames
    }

    /// The unreduced global stiffness matrix.
    #[must_use]
    pub fn global_stiffness(&self) -> &DMatrix<f64> {
        &self.global
    }

    /// The boundary-condition-reduced system.
    #[must_use]
    pub fn reduced_system(&self) -> &ReducedSystem {
        &self.system
    }

    /// The restrained dofs.
    #[must_use]
    pub fn restrained_dofs(&self) -> &RestrainedDofs {
        &self.restrained
    }

    /// The full load vector the solution was computed for.
    #[must_use]
    pub fn load_vector(&self) -> &DVector<f64> {
        &self.load
    }

    /// Sum of reactions and applied loads per axis.
    #[must_use]
    pub fn equilibrium_residual(&self) -> Force {
        equilibrium_residual(&self.reactions, &self.load)
    }

    /// Relative residual of the reduced solve.
    #[must_use]
    pub fn solve_residual(&self) -> f64 {
        self.system.relative_residual(&self.displacements, &self.load)
    }

    /// Influence lines for a unit load travelling from `start` to `end`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::UnknownNode`] for an unknown endpoint.
    pub fn influence_lines(
        &self,
        start: NodeId,
        end: NodeId,
    ) -> Result<InfluenceLineTable, AnalysisError> {
        let path = load_path(self.truss, start, end, self.options.path_tolerance)?;
        influence_lines(&self.frames, &self.system, start, end, path)
    }

    /// Whether reactions and applied loads balance within
    /// `equilibrium_tolerance` of the largest load component (at least one unit).
    #[must_use]
    pub fn is_in_equilibrium(&self) -> bool {
        let residual = self.equilibrium_residual();
        let scale = self.load.amax().max(1.0);
        residual.x.abs().max(residual.y.abs()) <= self.options.equilibrium_tolerance * scale
    }

    /// Warn when reactions and loads do not balance.
    fn check_statics(&self) {
        if !self.is_in_equilibrium() {
            let residual = self.equilibrium_residual();
            log::warn!(
                "equilibrium check failed: sum Fx = {:e}, sum Fy = {:e}",
                residual.x,
                residual.y
            );
        }
    }
}

/// Serializable summary of one analysis run.
///
/// Result fields are absent, not zeroed, when the structure is unstable.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisReport {
    /// Stable or unstable.
    pub status: AnalysisStatus,
    /// Why the structure is unstable or could not be analysed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Node displacements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub displacements: Option<Vec<NodeDisplacement>>,
    /// Support reactions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reactions: Option<Vec<Reaction>>,
    /// Member forces and stresses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<MemberResult>>,
    /// Member geometry and element stiffness.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<MemberDetail>>,
    /// Influence lines, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub influence: Option<InfluenceLineTable>,
}

impl AnalysisReport {
    /// Summarise the outcome of [`analyze`].
    #[must_use]
    pub fn from_outcome(outcome: &Result<Solution<'_>, AnalysisError>) -> Self {
        match outcome {
            Ok(solution) => Self {
                status: AnalysisStatus::Stable,
                reason: None,
                displacements: Some(solution.displacements()),
                reactions: Some(solution.reactions().to_vec()),
                members: Some(solution.members().to_vec()),
                details: None,
                influence: None,
            },
            Err(error) => Self {
                status: AnalysisStatus::Unstable,
                reason: Some(error.to_string()),
                displacements: None,
                reactions: None,
                members: None,
                details: None,
                influence: None,
            },
        }
    }

    /// Attach member details from the solution, if there is one.
    #[must_use]
    pub fn with_details(mut self, outcome: &Result<Solution<'_>, AnalysisError>) -> Self {
        if let Ok(solution) = outcome {
            self.details = Some(solution.member_frames().iter().map(MemberFrame::detail).collect());
        }
        self
    }

    /// Attach an influence line table.
    #[must_use]
    pub fn with_influence(mut self, table: InfluenceLineTable) -> Self {
        self.influence = Some(table);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::point;
    use crate::truss::{Load, Property, SupportKind};

    #[test]
    fn insufficient_model_skips_assembly() {
        let mut truss = Truss::new();
        let property = truss.add_property(Property::new(1.0, 1.0).expect("valid property"));
        let a = truss.add_node(point(0.0, 0.0));
        let b = truss.add_node(point(0.0, 0.0));
        truss.add_member(a, b, property).expect("valid member");
        truss.set_support(a, SupportKind::Pinned).expect("support applied");
        // 1 member + 2 reactions < 4 dofs. The coincident nodes would be a
        // degenerate member if assembly ran.
        let error = analyze(&truss, &AnalysisOptions::default()).expect_err("unstable");
        assert_eq!(
            error,
            AnalysisError::StructuralInsufficiency {
                members: 1,
                restrained: 2,
                dofs: 4
            }
        );
        assert!(error.is_instability());
    }

    #[test]
    fn zero_length_member_is_not_reported_as_singular() {
        let mut truss = Truss::new();
        let property = truss.add_property(Property::new(1.0, 1.0).expect("valid property"));
        let a = truss.add_node(point(0.0, 0.0));
        let b = truss.add_node(point(0.0, 0.0));
        let member = truss.add_member(a, b, property).expect("valid member");
        truss.set_support(a, SupportKind::Pinned).expect("support applied");
        truss.set_support(b, SupportKind::Pinned).expect("support applied");
        let error = analyze(&truss, &AnalysisOptions::default()).expect_err("degenerate");
        assert_eq!(error, AnalysisError::DegenerateMember(member));
    }

    #[test]
    fn disconnected_structure_still_reaches_the_solver() {
        let mut truss = Truss::new();
        let property = truss.add_property(Property::new(1.0, 1.0).expect("valid property"));
        let a = truss.add_node(point(0.0, 0.0));
        let b = truss.add_node(point(2.0, 0.0));
        let c = truss.add_node(point(5.0, 0.0));
        let d = truss.add_node(point(7.0, 0.0));
        truss.add_member(a, b, property).expect("valid member");
        truss.add_member(a, b, property).expect("valid member");
        truss.add_member(c, d, property).expect("valid member");
        truss.set_support(a, SupportKind::Pinned).expect("support applied");
        truss
            .set_support(b, SupportKind::HorizontalRoller)
            .expect("support applied");
        truss.set_support(c, SupportKind::Pinned).expect("support applied");
        // 3 members + 5 reactions = 8 dofs, but node d can swing about c.
        assert_eq!(truss.component_count(), 2);
        let error = analyze(&truss, &AnalysisOptions::default()).expect_err("mechanism");
        assert_eq!(error, AnalysisError::SingularSystem);
    }

    #[test]
    fn statics_check_compares_residual_with_tolerance() {
        let mut truss = Truss::new();
        let property = truss.add_property(Property::new(1.0, 1.0).expect("valid property"));
        let a = truss.add_node(point(0.0, 0.0));
        let b = truss.add_node(point(3.0, 4.0));
        truss.add_member(a, b, property).expect("valid member");
        truss.set_support(a, SupportKind::Pinned).expect("support applied");
        truss
            .set_support(b, SupportKind::VerticalRoller)
            .expect("support applied");
        truss.add_load(b, Load::new(7.0, 90.0)).expect("load applied");

        let solution = analyze(&truss, &AnalysisOptions::default()).expect("stable bar");
        assert!(solution.is_in_equilibrium());

        let strict = AnalysisOptions {
            equilibrium_tolerance: -1.0,
            ..AnalysisOptions::default()
        };
        let solution = analyze(&truss, &strict).expect("stable bar");
        assert!(!solution.is_in_equilibrium());
    }

    #[test]
    fn unstable_report_has_no_results() {
        let truss = {
            let mut truss = Truss::new();
            let a = truss.add_node(point(0.0, 0.0));
            truss.add_load(a, Load::new(1.0, 90.0)).expect("load applied");
            truss
        };
        let outcome = analyze(&truss, &AnalysisOptions::default());
        let report = AnalysisReport::from_outcome(&outcome).with_details(&outcome);
        assert_eq!(report.status, AnalysisStatus::Unstable);
        assert!(report.reason.is_some());
        assert!(report.displacements.is_none());
        assert!(report.reactions.is_none());
        assert!(report.members.is_none());
        assert!(report.details.is_none());

        let json = serde_json::to_value(&report).expect("report serializes");
        assert!(json.get("members").is_none());
        assert_eq!(json["status"], "unstable");
    }

    #[test]
    fn options_fill_missing_fields_from_defaults() {
        let options: AnalysisOptions =
            serde_json::from_str(r#"{ "zero_force_tolerance": 1e-6 }"#).expect("valid options");
        assert_eq!(options.zero_force_tolerance, 1.0e-6);
        assert_eq!(options.singular_tolerance, 1.0e-10);
        assert!(options.check_statics);
    }
}
