//! Count-based stability screen run before any matrix work.

use serde::{Deserialize, Serialize};

/// Verdict of the determinacy screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Determinacy {
    /// `m + r >= 2n`. Necessary but not sufficient: the solve still decides.
    StableCandidate,
    /// `m + r < 2n`; the structure is a mechanism.
    Unstable,
}

/// Compare members plus restrained dofs against the dof count `2n`.
///
/// # Examples
/// ```
/// use truss2d::{check_determinacy, Determinacy};
///
/// assert_eq!(check_determinacy(3, 3, 3), Determinacy::StableCandidate);
/// assert_eq!(check_determinacy(2, 3, 3), Determinacy::Unstable);
/// ```
#[must_use]
pub fn check_determinacy(members: usize, restrained: usize, nodes: usize) -> Determinacy {
    if members + restrained < 2 * nodes {
        Determinacy::Unstable
    } else {
        Determinacy::StableCandidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_is_stable_candidate() {
        assert_eq!(check_determinacy(5, 3, 4), Determinacy::StableCandidate);
        assert_eq!(check_determinacy(4, 3, 4), Determinacy::Unstable);
    }

    #[test]
    fn redundant_structure_is_candidate() {
        assert_eq!(check_determinacy(10, 4, 5), Determinacy::StableCandidate);
    }

    #[test]
    fn empty_model_is_candidate() {
        assert_eq!(check_determinacy(0, 0, 0), Determinacy::StableCandidate);
    }
}
