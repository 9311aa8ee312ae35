//! Property tests for the strong Wolfe line search.
//!
//! On random convex quadratics the accepted step must satisfy both Wolfe
//! conditions and the reported value and gradient must be those of the
//! accepted point.

use descentopt_core::{
    line_search::{LineSearch, LineSearchParams, StrongWolfeLineSearch},
    model::{FnModel, Model},
    types::DVector,
};
use proptest::prelude::*;

const DIM: usize = 5;

fn eigenvalues() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.1f64..100.0, DIM)
}

fn coordinates() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-5.0f64..5.0, DIM)
}

/// f(x) = ½ Σ dᵢ xᵢ² − bᵗx
fn diagonal_quadratic(
    d: DVector<f64>,
    b: DVector<f64>,
    x0: DVector<f64>,
) -> impl Model<f64> {
    let d_grad = d.clone();
    let b_grad = b.clone();
    FnModel::new(
        x0,
        move |x: &DVector<f64>| 0.5 * x.dot(&d.component_mul(x)) - b.dot(x),
        move |x: &DVector<f64>| d_grad.component_mul(x) - &b_grad,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn test_accepted_step_satisfies_strong_wolfe(
        d in eigenvalues(),
        b in coordinates(),
        x in coordinates(),
        gtol in 0.1f64..0.9,
    ) {
        let model = diagonal_quadratic(
            DVector::from_vec(d),
            DVector::from_vec(b),
            DVector::from_vec(x),
        );
        let x = model.initial_point();
        let value = model.objective(&x).unwrap();
        let gradient = model.gradient(&x).unwrap();
        prop_assume!(gradient.norm() > 1e-3);
        let direction = -&gradient;
        let params = LineSearchParams::new(1e-4, gtol);

        let result = StrongWolfeLineSearch::new()
            .search(&model, value, &x, &gradient, &direction, &params)
            .unwrap();

        let dphi0 = gradient.dot(&direction);
        let alpha = result.step_length;
        prop_assert!(alpha > 0.0);
        prop_assert!(result.value <= value + params.ftol * alpha * dphi0);
        prop_assert!(result.gradient.dot(&direction).abs() <= gtol * dphi0.abs() + 1e-12);

        let accepted = &x + &direction * alpha;
        prop_assert_eq!(result.value, model.objective(&accepted).unwrap());
        prop_assert_eq!(result.gradient, model.gradient(&accepted).unwrap());
        // One objective and at most one gradient per trial
        prop_assert!(result.evaluations <= 2 * params.max_iterations);
    }

    #[test]
    fn test_ascent_directions_are_rejected(
        d in eigenvalues(),
        x in coordinates(),
    ) {
        let model = diagonal_quadratic(
            DVector::from_vec(d),
            DVector::zeros(DIM),
            DVector::from_vec(x),
        );
        let x = model.initial_point();
        let gradient = model.gradient(&x).unwrap();
        prop_assume!(gradient.norm() > 1e-3);

        let result = StrongWolfeLineSearch::new().search(
            &model,
            model.objective(&x).unwrap(),
            &x,
            &gradient,
            &gradient,
            &LineSearchParams::default(),
        );

        prop_assert!(result.is_err());
    }
}
