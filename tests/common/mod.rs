#![allow(dead_code)]

use dftd4::AtomicSystem;

pub fn make_diatomic(z1: u8, z2: u8, dist: f64) -> AtomicSystem {
    AtomicSystem::new(vec![z1, z2], vec![[0.0, 0.0, 0.0], [dist, 0.0, 0.0]], 0.0)
}

pub fn make_water_like(z_center: u8, z_outer: u8, r: f64, angle_deg: f64) -> AtomicSystem {
    let half_angle = angle_deg.to_radians() / 2.0;
    AtomicSystem::new(
        vec![z_center, z_outer, z_outer],
        vec![
            [0.0, 0.0, 0.0],
            [r * half_angle.cos(), r * half_angle.sin(), 0.0],
            [r * half_angle.cos(), -r * half_angle.sin(), 0.0],
        ],
        0.0,
    )
}

pub fn make_pyramidal_xy3(z_center: u8, z_outer: u8, r: f64, angle_deg: f64) -> AtomicSystem {
    let theta = angle_deg.to_radians();
    let d_outer = 2.0 * r * (theta / 2.0).sin();
    let big_r = d_outer / 3.0f64.sqrt();
    let z = -(r * r - big_r * big_r).max(0.0).sqrt();

    AtomicSystem::new(
        vec![z_center, z_outer, z_outer, z_outer],
        vec![
            [0.0, 0.0, 0.0],
            [big_r, 0.0, z],
            [-big_r * 0.5, big_r * 3.0f64.sqrt() * 0.5, z],
            [-big_r * 0.5, -big_r * 3.0f64.sqrt() * 0.5, z],
        ],
        0.0,
    )
}

pub fn make_tetrahedral_xy4(z_center: u8, z_outer: u8, r: f64) -> AtomicSystem {
    let a = r / 3.0f64.sqrt();
    AtomicSystem::new(
        vec![z_center, z_outer, z_outer, z_outer, z_outer],
        vec![
            [0.0, 0.0, 0.0],
            [a, a, a],
            [-a, -a, a],
            [-a, a, -a],
            [a, -a, -a],
        ],
        0.0,
    )
}

/// A slightly distorted methanol in Bohr, without any symmetry.
pub fn methanol() -> AtomicSystem {
    AtomicSystem::new(
        vec![6, 8, 1, 1, 1, 1],
        vec![
            [-1.3190, 0.0102, 0.0013],
            [1.3689, -0.1203, 0.0150],
            [-2.0131, 1.9473, 0.1022],
            [-2.0518, -0.9940, 1.6690],
            [-2.0650, -0.9107, -1.6850],
            [2.0180, 1.6010, -0.1100],
        ],
        0.0,
    )
}

/// Hydrogen fluoride dimer in Bohr, a hydrogen-bonded complex with a net dipole.
pub fn hf_dimer() -> AtomicSystem {
    AtomicSystem::new(
        vec![9, 1, 9, 1],
        vec![
            [0.0, 0.0, 0.0],
            [1.7328, 0.0, 0.0],
            [5.1500, 0.3100, 0.0],
            [5.7000, 1.9800, 0.1200],
        ],
        0.0,
    )
}

/// Places a copy of `system` at `shift` next to the original.
pub fn combine(a: &AtomicSystem, b: &AtomicSystem, shift: [f64; 3]) -> AtomicSystem {
    let mut species = a.species.clone();
    species.extend_from_slice(&b.species);
    let mut positions = a.positions.clone();
    positions.extend(
        b.positions
            .iter()
            .map(|p| [p[0] + shift[0], p[1] + shift[1], p[2] + shift[2]]),
    );
    AtomicSystem::new(species, positions, a.charge + b.charge)
}

/// Central finite-difference gradient of `energy` with respect to every coordinate.
pub fn numerical_gradient<F>(system: &AtomicSystem, step: f64, energy: F) -> Vec<[f64; 3]>
where
    F: Fn(&AtomicSystem) -> f64,
{
    let mut gradient = vec![[0.0; 3]; system.len()];
    for (i, g) in gradient.iter_mut().enumerate() {
        for (axis, value) in g.iter_mut().enumerate() {
            let mut plus = system.clone();
            plus.positions[i][axis] += step;
            let mut minus = system.clone();
            minus.positions[i][axis] -= step;
            *value = (energy(&plus) - energy(&minus)) / (2.0 * step);
        }
    }
    gradient
}

pub fn assert_gradient_close(analytic: &[[f64; 3]], numeric: &[[f64; 3]], tolerance: f64) {
    assert_eq!(analytic.len(), numeric.len());
    for (i, (a, n)) in analytic.iter().zip(numeric).enumerate() {
        for axis in 0..3 {
            let error = (a[axis] - n[axis]).abs();
            assert!(
                error < tolerance,
                "Atom {} axis {}: analytic {:.10e} vs numeric {:.10e} (error {:.3e})",
                i,
                axis,
                a[axis],
                n[axis],
                error
            );
        }
    }
}
