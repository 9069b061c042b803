mod common;

use approx::assert_relative_eq;
use common::{
    assert_gradient_close, hf_dimer, make_pyramidal_xy3, methanol, numerical_gradient,
};
use dftd4::ncoord::{CnFunction, ExpCount};
use dftd4::{
    AtomicSystem, CalculationOptions, Damping, DampingParameters, Dispersion, ThreeBody, TwoBody,
    get_default_parameters, get_default_reference,
};

const STEP: f64 = 1.0e-4;

fn gradient_options(charges: Option<Vec<f64>>) -> CalculationOptions {
    CalculationOptions {
        charges,
        with_gradient: true,
        ..Default::default()
    }
}

fn check_gradient(dispersion: &Dispersion<'_>, system: &AtomicSystem, params: &DampingParameters) {
    let result = dispersion
        .calculate_with(system, params, &gradient_options(None))
        .unwrap();
    assert!(result.charge_derivative.is_none());

    let numeric = numerical_gradient(system, STEP, |displaced| {
        dispersion.calculate(displaced, params).unwrap().energy()
    });
    assert_gradient_close(&result.gradient.unwrap(), &numeric, 1.0e-7);
}

#[test]
fn full_gradient_with_internal_charges_matches_finite_differences() {
    let dispersion = Dispersion::new(get_default_reference());
    let params = get_default_parameters().get("pbe0").unwrap();
    check_gradient(&dispersion, &methanol(), &params);
    check_gradient(&dispersion, &hf_dimer(), &params);
}

#[test]
fn gradient_with_explicit_charges_is_taken_at_fixed_charges() {
    let dispersion = Dispersion::new(get_default_reference());
    let params = get_default_parameters().get("b3lyp").unwrap();
    let system = methanol();
    let charges = vec![0.05, -0.42, 0.06, 0.04, 0.05, 0.22];

    let result = dispersion
        .calculate_with(&system, &params, &gradient_options(Some(charges.clone())))
        .unwrap();

    let energy_at = |s: &AtomicSystem| {
        let options = CalculationOptions {
            charges: Some(charges.clone()),
            ..Default::default()
        };
        dispersion.calculate_with(s, &params, &options).unwrap().energy()
    };
    let numeric = numerical_gradient(&system, STEP, energy_at);
    assert_gradient_close(result.gradient.as_ref().unwrap(), &numeric, 1.0e-7);

    let de_dq = result.charge_derivative.unwrap();
    for i in 0..system.len() {
        let mut plus = charges.clone();
        plus[i] += STEP;
        let mut minus = charges.clone();
        minus[i] -= STEP;
        let energy = |q: Vec<f64>| {
            let options = CalculationOptions {
                charges: Some(q),
                ..Default::default()
            };
            dispersion.calculate_with(&system, &params, &options).unwrap().energy()
        };
        let numeric = (energy(plus) - energy(minus)) / (2.0 * STEP);
        assert_relative_eq!(de_dq[i], numeric, epsilon = 1.0e-8);
    }
}

#[test]
fn gradient_sums_to_zero() {
    let dispersion = Dispersion::new(get_default_reference());
    let params = get_default_parameters().get("pbe").unwrap();
    let result = dispersion
        .calculate_with(&hf_dimer(), &params, &gradient_options(None))
        .unwrap();

    let gradient = result.gradient.unwrap();
    for axis in 0..3 {
        let total: f64 = gradient.iter().map(|g| g[axis]).sum();
        assert!(total.abs() < 1.0e-12, "Net force {} along axis {}", total, axis);
    }
}

#[test]
fn three_body_gradient_matches_finite_differences() {
    let mut dispersion = Dispersion::without_terms(get_default_reference());
    dispersion.register(Box::new(ThreeBody::new(Damping::Rational)));

    let params = DampingParameters {
        s9: 1.0,
        ..get_default_parameters().get("pbe").unwrap()
    };
    check_gradient(&dispersion, &make_pyramidal_xy3(7, 1, 1.91, 106.7), &params);
}

#[test]
fn zero_damping_gradient_matches_finite_differences() {
    let mut dispersion = Dispersion::without_terms(get_default_reference());
    dispersion.register(Box::new(TwoBody::new(Damping::Zero)));
    dispersion.register(Box::new(ThreeBody::new(Damping::Zero)));

    let params = DampingParameters {
        s6: 1.0,
        s8: 0.7875,
        rs6: 1.217,
        rs8: 1.0,
        alp: 14.0,
        ..DampingParameters::default()
    };
    check_gradient(&dispersion, &methanol(), &params);
}

#[test]
fn dipole_quadrupole_and_higher_orders_contribute_to_gradient() {
    let dispersion = Dispersion::new(get_default_reference());
    let params = DampingParameters {
        s10: 1.0,
        ..get_default_parameters().get("pbe").unwrap()
    };
    check_gradient(&dispersion, &hf_dimer(), &params);
}

#[test]
fn gradient_with_exponential_coordination_number_matches_finite_differences() {
    let dispersion = Dispersion::new(get_default_reference())
        .with_coordination_number(CnFunction::default().with_counting(ExpCount::default()));
    let params = get_default_parameters().get("pbe0").unwrap();
    check_gradient(&dispersion, &methanol(), &params);
    check_gradient(&dispersion, &hf_dimer(), &params);
}

#[test]
fn gradient_with_saturated_unweighted_coordination_number_matches_finite_differences() {
    let dispersion = Dispersion::new(get_default_reference()).with_coordination_number(
        CnFunction::default()
            .with_electronegativity_weighting(false)
            .with_cn_max(Some(2.5)),
    );
    let params = get_default_parameters().get("b3lyp").unwrap();
    check_gradient(&dispersion, &methanol(), &params);
}
