//! Conjugate gradient direction-update strategies.
//!
//! After a step from `x` to `x_new`, the search direction becomes
//!
//! p_new = −g_new + β p
//!
//! where the coefficient β depends on the strategy:
//!
//! | Strategy | β |
//! |---|---|
//! | Fletcher-Reeves (`FR`) | ⟨g_new, g_new⟩ / ⟨g, g⟩ |
//! | Polak-Ribière (`PR`) | ⟨g_new, y⟩ / ⟨g, g⟩ |
//! | Polak-Ribière+ (`PR+`) | max(β_PR, 0) |
//! | PR-FR hybrid (`PR-FR`) | β_PR clamped to [−β_FR, β_FR] |
//! | Hager-Zhang (`HZ`) | max(⟨y − 2p‖y‖/⟨p, y⟩, g_new⟩ / ⟨p, y⟩, η_k) |
//!
//! with `y = g_new − g` and `η_k = −1 / (‖p‖ · min(η, ‖g‖))`, `η = 0.01`.
//!
//! Each strategy is a pure function of `(g, p, g_new, y)`. A
//! [`StrategyKind`] is parsed once and indexes a table of these functions.

use descentopt_core::{
    error::{OptimizerError, Result},
    types::{DVector, Scalar},
};
use num_traits::Float;
use std::fmt;
use std::str::FromStr;

/// Lower-bound parameter η of the Hager-Zhang coefficient.
pub const HAGER_ZHANG_ETA: f64 = 0.01;

/// Direction-update strategy of the conjugate gradient method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub enum StrategyKind {
    /// Fletcher-Reeves
    FletcherReeves,
    /// Polak-Ribière
    PolakRibiere,
    /// Polak-Ribière with negative coefficients reset to zero
    PolakRibierePlus,
    /// Polak-Ribière clamped by Fletcher-Reeves
    PolakRibiereFletcherReevesHybrid,
    /// Hager-Zhang
    #[default]
    HagerZhang,
}

impl StrategyKind {
    /// All strategies, in table order.
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::FletcherReeves,
        StrategyKind::PolakRibiere,
        StrategyKind::PolakRibierePlus,
        StrategyKind::PolakRibiereFletcherReevesHybrid,
        StrategyKind::HagerZhang,
    ];

    /// Short codes accepted by [`FromStr`], in table order.
    pub const CODES: [&'static str; 5] = ["FR", "PR", "PR+", "PR-FR", "HZ"];

    /// Short code of the strategy (`"FR"`, `"PR"`, `"PR+"`, `"PR-FR"`, `"HZ"`).
    pub fn code(self) -> &'static str {
        Self::CODES[self as usize]
    }

    /// Full name of the strategy.
    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::FletcherReeves => "FletcherReeves",
            StrategyKind::PolakRibiere => "PolakRibiere",
            StrategyKind::PolakRibierePlus => "PolakRibierePlus",
            StrategyKind::PolakRibiereFletcherReevesHybrid => "PolakRibiereFletcherReevesHybrid",
            StrategyKind::HagerZhang => "HagerZhang",
        }
    }

    /// Computes the coefficient β for this strategy.
    ///
    /// # Errors
    ///
    /// Returns `NumericalDegeneracy` when a denominator vanishes or the
    /// coefficient is not finite.
    pub fn coefficient<T: Scalar>(self, update: &DirectionUpdate<'_, T>) -> Result<T> {
        let beta = strategy_table::<T>()[self as usize](update)?;
        if Float::is_finite(beta) {
            Ok(beta)
        } else {
            Err(OptimizerError::numerical_degeneracy(
                self.name(),
                format!("non-finite coefficient {}", beta),
            ))
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for StrategyKind {
    type Err = OptimizerError;

    /// Parses a strategy from its code or its full name, ignoring case.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|kind| s.eq_ignore_ascii_case(kind.code()) || s.eq_ignore_ascii_case(kind.name()))
            .ok_or_else(|| OptimizerError::invalid_strategy(s, &Self::CODES))
    }
}

impl TryFrom<String> for StrategyKind {
    type Error = OptimizerError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<StrategyKind> for String {
    fn from(kind: StrategyKind) -> Self {
        kind.code().to_string()
    }
}

/// Inputs of a direction update.
///
/// `g` and `p` are the gradient and direction before the step, `g_new` the
/// gradient after it and `y = g_new − g`.
#[derive(Debug, Clone, Copy)]
pub struct DirectionUpdate<'a, T: Scalar> {
    /// Gradient at the previous point
    pub g: &'a DVector<T>,
    /// Search direction used for the step
    pub p: &'a DVector<T>,
    /// Gradient at the new point
    pub g_new: &'a DVector<T>,
    /// Gradient change `g_new − g`
    pub y: &'a DVector<T>,
}

impl<'a, T: Scalar> DirectionUpdate<'a, T> {
    /// Bundles the inputs of a direction update.
    pub fn new(
        g: &'a DVector<T>,
        p: &'a DVector<T>,
        g_new: &'a DVector<T>,
        y: &'a DVector<T>,
    ) -> Self {
        Self { g, p, g_new, y }
    }
}

type StrategyFn<T> = fn(&DirectionUpdate<'_, T>) -> Result<T>;

/// Strategy functions indexed by `StrategyKind as usize`.
fn strategy_table<T: Scalar>() -> [StrategyFn<T>; 5] {
    [
        fletcher_reeves,
        polak_ribiere,
        polak_ribiere_plus,
        polak_ribiere_fletcher_reeves,
        hager_zhang,
    ]
}

fn gradient_norm_squared<T: Scalar>(u: &DirectionUpdate<'_, T>, strategy: &str) -> Result<T> {
    let gg = u.g.dot(u.g);
    if gg == T::zero() {
        return Err(OptimizerError::numerical_degeneracy(
            strategy,
            "dot(g, g) == 0",
        ));
    }
    Ok(gg)
}

/// β = ⟨g_new, g_new⟩ / ⟨g, g⟩
pub fn fletcher_reeves<T: Scalar>(u: &DirectionUpdate<'_, T>) -> Result<T> {
    let gg = gradient_norm_squared(u, "FletcherReeves")?;
    Ok(u.g_new.dot(u.g_new) / gg)
}

/// β = ⟨g_new, y⟩ / ⟨g, g⟩
pub fn polak_ribiere<T: Scalar>(u: &DirectionUpdate<'_, T>) -> Result<T> {
    let gg = gradient_norm_squared(u, "PolakRibiere")?;
    Ok(u.g_new.dot(u.y) / gg)
}

/// β = max(β_PR, 0)
pub fn polak_ribiere_plus<T: Scalar>(u: &DirectionUpdate<'_, T>) -> Result<T> {
    Ok(Float::max(polak_ribiere(u)?, T::zero()))
}

/// β_PR when |β_PR| ≤ β_FR, otherwise ±β_FR with the sign of β_PR.
pub fn polak_ribiere_fletcher_reeves<T: Scalar>(u: &DirectionUpdate<'_, T>) -> Result<T> {
    let pr = polak_ribiere(u)?;
    let fr = fletcher_reeves(u)?;
    Ok(if pr < -fr {
        -fr
    } else if Float::abs(pr) <= fr {
        pr
    } else {
        fr
    })
}

/// Hager-Zhang coefficient, bounded below by `η_k`.
pub fn hager_zhang<T: Scalar>(u: &DirectionUpdate<'_, T>) -> Result<T> {
    let eta = <T as Scalar>::from_f64(HAGER_ZHANG_ETA);
    let two = <T as Scalar>::from_f64(2.0);

    let scale = u.p.norm() * Float::min(eta, u.g.norm());
    if scale == T::zero() {
        return Err(OptimizerError::numerical_degeneracy(
            "HagerZhang",
            "‖p‖ · min(η, ‖g‖) == 0",
        ));
    }
    let lower_bound = -T::one() / scale;

    let pk_yk = u.p.dot(u.y);
    if pk_yk == T::zero() {
        return Err(OptimizerError::numerical_degeneracy(
            "HagerZhang",
            "dot(p, y) == 0",
        ));
    }
    let shifted = u.y - u.p * (two * u.y.norm() / pk_yk);
    let beta = shifted.dot(u.g_new) / pk_yk;

    Ok(Float::max(beta, lower_bound))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    struct Fixture {
        g: DVector<f64>,
        p: DVector<f64>,
        g_new: DVector<f64>,
        y: DVector<f64>,
    }

    impl Fixture {
        fn new(g: Vec<f64>, p: Vec<f64>, g_new: Vec<f64>) -> Self {
            let g = DVector::from_vec(g);
            let g_new = DVector::from_vec(g_new);
            let y = &g_new - &g;
            Self {
                g,
                p: DVector::from_vec(p),
                g_new,
                y,
            }
        }

        fn update(&self) -> DirectionUpdate<'_, f64> {
            DirectionUpdate::new(&self.g, &self.p, &self.g_new, &self.y)
        }
    }

    // g = [6, 8], p = -g, g_new = [1, -2]: ⟨g,g⟩ = 100, ⟨g_new,g_new⟩ = 5,
    // y = [-5, -10], ⟨g_new,y⟩ = 15
    fn fixture() -> Fixture {
        Fixture::new(vec![6.0, 8.0], vec![-6.0, -8.0], vec![1.0, -2.0])
    }

    #[test]
    fn test_fletcher_reeves() {
        let f = fixture();
        assert_relative_eq!(fletcher_reeves(&f.update()).unwrap(), 0.05);
    }

    #[test]
    fn test_polak_ribiere() {
        let f = fixture();
        assert_relative_eq!(polak_ribiere(&f.update()).unwrap(), 0.15);
        assert_relative_eq!(polak_ribiere_plus(&f.update()).unwrap(), 0.15);
    }

    #[test]
    fn test_polak_ribiere_plus_clips_negative() {
        // g_new = [3, 2]: y = [-3, -6], ⟨g_new, y⟩ = -21
        let f = Fixture::new(vec![6.0, 8.0], vec![-6.0, -8.0], vec![3.0, 2.0]);
        assert_relative_eq!(polak_ribiere(&f.update()).unwrap(), -0.21);
        assert_eq!(polak_ribiere_plus(&f.update()).unwrap(), 0.0);
    }

    #[test]
    fn test_hybrid_clamps_to_fletcher_reeves() {
        // PR = 0.15 > FR = 0.05
        let f = fixture();
        assert_relative_eq!(polak_ribiere_fletcher_reeves(&f.update()).unwrap(), 0.05);

        // PR = -0.21 < -FR = -0.13
        let f = Fixture::new(vec![6.0, 8.0], vec![-6.0, -8.0], vec![3.0, 2.0]);
        assert_relative_eq!(polak_ribiere_fletcher_reeves(&f.update()).unwrap(), -0.13);

        // g_new = g / 10 gives y = -0.9 g: PR = -0.09 < -FR = -0.01
        let f = Fixture::new(vec![6.0, 8.0], vec![-6.0, -8.0], vec![0.6, 0.8]);
        assert_relative_eq!(polak_ribiere_fletcher_reeves(&f.update()).unwrap(), -0.01);
    }

    #[test]
    fn test_hybrid_passes_moderate_polak_ribiere() {
        // g_new = [8, -6] is orthogonal to g: PR = FR = 1
        let f = Fixture::new(vec![6.0, 8.0], vec![-6.0, -8.0], vec![8.0, -6.0]);
        assert_relative_eq!(polak_ribiere(&f.update()).unwrap(), 1.0);
        assert_relative_eq!(polak_ribiere_fletcher_reeves(&f.update()).unwrap(), 1.0);
    }

    #[test]
    fn test_hager_zhang() {
        let f = fixture();
        // ‖p‖ = 10, min(0.01, 10) = 0.01 → η_k = -10
        // ⟨p, y⟩ = 30 + 80 = 110, ‖y‖ = √125
        let pk_yk = 110.0;
        let y_norm = 125.0_f64.sqrt();
        let shifted = &f.y - &f.p * (2.0 * y_norm / pk_yk);
        let expected = f64::max(shifted.dot(&f.g_new) / pk_yk, -10.0);

        assert_relative_eq!(hager_zhang(&f.update()).unwrap(), expected, epsilon = 1e-14);
    }

    #[test]
    fn test_hager_zhang_lower_bound() {
        // Large ‖p‖ makes the lower bound close to zero
        let f = Fixture::new(vec![6.0, 8.0], vec![-600.0, -800.0], vec![3.0, 2.0]);
        let beta = hager_zhang(&f.update()).unwrap();
        assert!(beta >= -1.0 / (1000.0 * 0.01));
    }

    #[test]
    fn test_degenerate_denominators() {
        let f = Fixture::new(vec![0.0, 0.0], vec![-1.0, 0.0], vec![1.0, 1.0]);
        for kind in &StrategyKind::ALL[..4] {
            assert!(matches!(
                kind.coefficient(&f.update()),
                Err(OptimizerError::NumericalDegeneracy { .. })
            ));
        }

        // p orthogonal to y
        let f = Fixture::new(vec![1.0, 0.0], vec![0.0, -1.0], vec![2.0, 0.0]);
        assert!(matches!(
            StrategyKind::HagerZhang.coefficient(&f.update()),
            Err(OptimizerError::NumericalDegeneracy { .. })
        ));
    }

    #[test]
    fn test_non_finite_coefficient() {
        let f = Fixture::new(vec![1e-160, 0.0], vec![-1.0, 0.0], vec![1e160, 0.0]);
        assert!(matches!(
            StrategyKind::FletcherReeves.coefficient(&f.update()),
            Err(OptimizerError::NumericalDegeneracy { .. })
        ));
    }

    #[test]
    fn test_table_order_matches_kind() {
        let f = fixture();
        let u = f.update();
        assert_eq!(
            StrategyKind::FletcherReeves.coefficient(&u).unwrap(),
            fletcher_reeves(&u).unwrap()
        );
        assert_eq!(
            StrategyKind::PolakRibiere.coefficient(&u).unwrap(),
            polak_ribiere(&u).unwrap()
        );
        assert_eq!(
            StrategyKind::PolakRibierePlus.coefficient(&u).unwrap(),
            polak_ribiere_plus(&u).unwrap()
        );
        assert_eq!(
            StrategyKind::PolakRibiereFletcherReevesHybrid
                .coefficient(&u)
                .unwrap(),
            polak_ribiere_fletcher_reeves(&u).unwrap()
        );
        assert_eq!(
            StrategyKind::HagerZhang.coefficient(&u).unwrap(),
            hager_zhang(&u).unwrap()
        );
    }

    #[test]
    fn test_parse_strategy() {
        assert_eq!("FR".parse::<StrategyKind>().unwrap(), StrategyKind::FletcherReeves);
        assert_eq!("pr".parse::<StrategyKind>().unwrap(), StrategyKind::PolakRibiere);
        assert_eq!("PR+".parse::<StrategyKind>().unwrap(), StrategyKind::PolakRibierePlus);
        assert_eq!(
            "pr-fr".parse::<StrategyKind>().unwrap(),
            StrategyKind::PolakRibiereFletcherReevesHybrid
        );
        assert_eq!(" HZ ".parse::<StrategyKind>().unwrap(), StrategyKind::HagerZhang);
        assert_eq!(
            "hagerzhang".parse::<StrategyKind>().unwrap(),
            StrategyKind::HagerZhang
        );
        assert_eq!(StrategyKind::default(), StrategyKind::HagerZhang);
    }

    #[test]
    fn test_parse_unknown_strategy() {
        let err = "CD".parse::<StrategyKind>().unwrap_err();
        if let OptimizerError::InvalidStrategy { name, valid } = err {
            assert_eq!(name, "CD");
            assert_eq!(valid, "FR, PR, PR+, PR-FR, HZ");
        } else {
            panic!("Expected InvalidStrategy variant");
        }
    }

    #[test]
    fn test_display_round_trips_through_code() {
        for kind in StrategyKind::ALL {
            assert_eq!(kind.to_string().parse::<StrategyKind>().unwrap(), kind);
        }
    }
}
