//! Boundary-condition reduction and the dense direct solve.

use nalgebra::{DMatrix, DVector, Dyn, LU};

use crate::errors::AnalysisError;
use crate::truss::Truss;

/// Sorted, deduplicated one-based dofs fixed to zero displacement.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RestrainedDofs(Vec<usize>);

impl RestrainedDofs {
    /// Build the set from arbitrary one-based dofs.
    #[must_use]
    pub fn new(mut dofs: Vec<usize>) -> Self {
        dofs.sort_unstable();
        dofs.dedup();
        Self(dofs)
    }

    /// Number of restrained dofs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is restrained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `dof` is restrained.
    #[must_use]
    pub fn contains(&self, dof: usize) -> bool {
        self.0.binary_search(&dof).is_ok()
    }

    /// Restrained dofs in ascending order.
    #[must_use]
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// The complement in `1..=dof_count`, ascending.
    #[must_use]
    pub fn free_dofs(&self, dof_count: usize) -> Vec<usize> {
        (1..=dof_count).filter(|dof| !self.contains(*dof)).collect()
    }
}

/// Collect the restrained dofs implied by every support in the truss.
#[must_use]
pub fn restrained_dofs(truss: &Truss) -> RestrainedDofs {
    RestrainedDofs::new(
        truss
            .supports()
            .flat_map(|(node, kind)| kind.restrained_axes().iter().map(move |&axis| node.dof(axis)))
            .collect(),
    )
}

/// Full load vector in dof order (index `dof - 1`), loads summed per node.
#[must_use]
pub fn load_vector(truss: &Truss) -> DVector<f64> {
    let mut load = DVector::zeros(truss.dof_count());
    for (node, _) in truss.nodes() {
        let force = truss.net_load(node);
        load[node.horizontal_dof() - 1] = force.x;
        load[node.vertical_dof() - 1] = force.y;
    }
    load
}

/// Stiffness matrix restricted to the free dofs, factorised once.
#[derive(Clone, Debug)]
pub struct ReducedSystem {
    /// Free one-based dofs in ascending order.
    free_dofs: Vec<usize>,
    /// Number of dofs in the unreduced system.
    dof_count: usize,
    /// The reduced matrix, kept for residual checks.
    matrix: DMatrix<f64>,
    /// `1 / sqrt(K_ii)` per free dof; scales `matrix` to a unit diagonal.
    scale: DVector<f64>,
    /// LU factors of the scaled matrix; `None` when nothing is free.
    factors: Option<LU<f64, Dyn, Dyn>>,
}

impl ReducedSystem {
    /// Remove restrained rows and columns from `global` and factorise the rest.
    ///
    /// The reduced matrix is scaled symmetrically to a unit diagonal before
    /// factorising, so a soft member next to a stiff one does not look like a
    /// mechanism. `singular_tolerance` is the smallest admissible ratio between
    /// the smallest and largest pivot magnitude of the scaled matrix.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::SingularSystem`] when the reduced matrix is not
    /// invertible, including when a free dof has no stiffness at all.
    pub fn new(
        global: &DMatrix<f64>,
        restrained: &RestrainedDofs,
        singular_tolerance: f64,
    ) -> Result<Self, AnalysisError> {
        let dof_count = global.nrows();
        let free_dofs = restrained.free_dofs(dof_count);
        let free_len = free_dofs.len();
        let matrix = DMatrix::from_fn(free_len, free_len, |row, col| {
            global[(free_dofs[row] - 1, free_dofs[col] - 1)]
        });
        log::debug!(
            "reduced system: {free_len} free of {dof_count} dofs, restrained {:?}",
            restrained.as_slice()
        );
        if free_len == 0 {
            return Ok(Self {
                free_dofs,
                dof_count,
                matrix,
                scale: DVector::zeros(0),
                factors: None,
            });
        }

        if let Some(index) = matrix
            .diagonal()
            .iter()
            .position(|k| !k.is_finite() || *k <= 0.0)
        {
            log::debug!("free dof {} has no stiffness", free_dofs[index]);
            return Err(AnalysisError::SingularSystem);
        }
        let scale = matrix.diagonal().map(|k| k.sqrt().recip());
        let scaled = DMatrix::from_fn(free_len, free_len, |row, col| {
            matrix[(row, col)] * scale[row] * scale[col]
        });

        let factors = scaled.lu();
        let pivots = factors.u().diagonal();
        let largest = pivots.amax();
        let smallest = pivots.amin();
        if !largest.is_finite() || largest == 0.0 || smallest <= singular_tolerance * largest {
            log::debug!("singular reduced matrix: scaled pivots range {smallest:e}..{largest:e}");
            return Err(AnalysisError::SingularSystem);
        }
        Ok(Self {
            free_dofs,
            dof_count,
            matrix,
            scale,
            factors: Some(factors),
        })
    }

    /// Free one-based dofs, ascending; the row order of the reduced system.
    #[must_use]
    pub fn free_dofs(&self) -> &[usize] {
        &self.free_dofs
    }

    /// Number of dofs in the unreduced system.
    #[must_use]
    pub fn dof_count(&self) -> usize {
        self.dof_count
    }

    /// The reduced stiffness matrix.
    #[must_use]
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Pick the free-dof entries out of a full-length vector.
    #[must_use]
    pub fn reduce(&self, full: &DVector<f64>) -> DVector<f64> {
        DVector::from_iterator(
            self.free_dofs.len(),
            self.free_dofs.iter().map(|&dof| full[dof - 1]),
        )
    }

    /// Scatter reduced values into a zero-initialised full-length vector.
    #[must_use]
    pub fn expand(&self, reduced: &DVector<f64>) -> DVector<f64> {
        let mut full = DVector::zeros(self.dof_count);
        for (value, &dof) in reduced.iter().zip(&self.free_dofs) {
            full[dof - 1] = *value;
        }
        full
    }

    /// Solve `K_ff · d = f` using the stored factorisation.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::SingularSystem`] if back-substitution fails.
    pub fn solve(&self, reduced_load: &DVector<f64>) -> Result<DVector<f64>, AnalysisError> {
        match &self.factors {
            None => Ok(DVector::zeros(0)),
            Some(factors) => factors
                .solve(&reduced_load.component_mul(&self.scale))
                .map(|scaled| scaled.component_mul(&self.scale))
                .ok_or(AnalysisError::SingularSystem),
        }
    }

    /// Reduce a full load vector, solve, and expand to full displacements.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::SingularSystem`] if back-substitution fails.
    pub fn solve_full(&self, full_load: &DVector<f64>) -> Result<DVector<f64>, AnalysisError> {
        let reduced = self.solve(&self.reduce(full_load))?;
        Ok(self.expand(&reduced))
    }

    /// Relative residual ‖K_ff·d_f − f_f‖ / ‖f_f‖ for full-length vectors.
    ///
    /// Falls back to the absolute residual when the reduced load is zero.
    #[must_use]
    pub fn relative_residual(&self, displacements: &DVector<f64>, full_load: &DVector<f64>) -> f64 {
        let load = self.reduce(full_load);
        let residual = (&self.matrix * self.reduce(displacements) - &load).norm();
        let scale = load.norm();
        if scale > 0.0 {
            residual / scale
        } else {
            residual
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::point;
    use crate::truss::{Load, NodeId, Property, SupportKind};

    fn bar() -> Truss {
        let mut truss = Truss::new();
        let property = truss.add_property(Property::new(200.0e9, 0.01).expect("valid property"));
        let a = truss.add_node(point(0.0, 0.0));
        let b = truss.add_node(point(1.0, 0.0));
        truss.add_member(a, b, property).expect("valid member");
        truss.set_support(a, SupportKind::Pinned).expect("support applied");
        truss
            .set_support(b, SupportKind::HorizontalRoller)
            .expect("support applied");
        truss.add_load(b, Load::new(1_000.0, 180.0)).expect("load applied");
        truss
    }

    #[test]
    fn restrained_set_is_sorted_and_deduplicated() {
        let set = RestrainedDofs::new(vec![4, 1, 2, 4]);
        assert_eq!(set.as_slice(), &[1, 2, 4]);
        assert_eq!(set.free_dofs(6), vec![3, 5, 6]);
        assert!(set.contains(2));
        assert!(!set.contains(3));
    }

    #[test]
    fn supports_map_to_dofs() {
        let truss = bar();
        assert_eq!(restrained_dofs(&truss).as_slice(), &[1, 2, 4]);
    }

    #[test]
    fn load_vector_follows_dof_order() {
        let truss = bar();
        let load = load_vector(&truss);
        assert_eq!(load.as_slice(), &[0.0, 0.0, -1_000.0, 0.0]);
    }

    #[test]
    fn axial_bar_matches_closed_form() {
        let truss = bar();
        let global = crate::assembly::assemble(&truss).expect("assembly succeeds").matrix;
        let system = ReducedSystem::new(&global, &restrained_dofs(&truss), 1.0e-10)
            .expect("system is solvable");
        assert_eq!(system.free_dofs(), &[3]);

        let load = load_vector(&truss);
        let displacements = system.solve_full(&load).expect("solve succeeds");
        let expected = -1_000.0 * 1.0 / (0.01 * 200.0e9);
        assert_relative_eq!(displacements[2], expected, epsilon = 1.0e-15);
        assert_eq!(displacements[0], 0.0);
        assert_eq!(displacements[1], 0.0);
        assert_eq!(displacements[3], 0.0);
        assert!(system.relative_residual(&displacements, &load) < 1.0e-12);
    }

    #[test]
    fn unsupported_direction_is_singular() {
        let mut truss = bar();
        truss.remove_support(NodeId::new(2)).expect("support removed");
        truss
            .set_support(NodeId::new(2), SupportKind::VerticalRoller)
            .expect("support applied");
        // Node 2 is now free vertically and nothing resists that motion.
        let global = crate::assembly::assemble(&truss).expect("assembly succeeds").matrix;
        let error = ReducedSystem::new(&global, &restrained_dofs(&truss), 1.0e-10)
            .expect_err("mechanism detected");
        assert_eq!(error, AnalysisError::SingularSystem);
    }

    #[test]
    fn stiffness_contrast_is_not_a_mechanism() {
        let mut truss = Truss::new();
        let stiff = truss.add_property(Property::new(1.0e6, 1.0).expect("valid property"));
        let soft = truss.add_property(Property::new(1.0e-5, 1.0).expect("valid property"));
        let a = truss.add_node(point(0.0, 0.0));
        let b = truss.add_node(point(1.0, 0.0));
        let c = truss.add_node(point(2.0, 0.0));
        truss.add_member(a, b, stiff).expect("valid member");
        truss.add_member(b, c, soft).expect("valid member");
        truss.set_support(a, SupportKind::Pinned).expect("support applied");
        for node in [b, c] {
            truss
                .set_support(node, SupportKind::HorizontalRoller)
                .expect("support applied");
        }
        truss.add_load(c, Load::new(1.0, 0.0)).expect("load applied");

        let global = crate::assembly::assemble(&truss).expect("assembly succeeds").matrix;
        let system = ReducedSystem::new(&global, &restrained_dofs(&truss), 1.0e-10)
            .expect("well-posed chain solves");
        let load = load_vector(&truss);
        let displacements = system.solve_full(&load).expect("solve succeeds");
        assert_relative_eq!(displacements[2], 1.0e-6, max_relative = 1.0e-9);
        assert_relative_eq!(displacements[4], 1.0e-6 + 1.0e5, max_relative = 1.0e-9);
        assert!(system.relative_residual(&displacements, &load) < 1.0e-9);
    }

    #[test]
    fn fully_restrained_model_solves_trivially() {
        let global = DMatrix::<f64>::zeros(2, 2);
        let system = ReducedSystem::new(&global, &RestrainedDofs::new(vec![1, 2]), 1.0e-10)
            .expect("nothing to solve");
        let displacements = system
            .solve_full(&DVector::from_vec(vec![3.0, 4.0]))
            .expect("trivial solve");
        assert_eq!(displacements.as_slice(), &[0.0, 0.0]);
    }
}
