//! The per-step force and energy kernel.
//!
//! Consumes the caches built by [`crate::engine::realize`] together with
//! the current body configurations, and adds bonded plus nonbonded
//! contributions into caller-owned accumulators. The strategy, body by
//! body:
//!
//! - for each atom on the body, emit the cross-body stretch, bend, and
//!   torsion terms whose far atom has a higher id (each term lives in both
//!   end atoms' lists and must fire once);
//! - set the nonbonded scale masks for the atom's 1-2/1-3/1-4/1-5
//!   neighbors, sweep every atom of every higher-numbered body with the
//!   Coulomb and Lennard-Jones kernels, then reset exactly the entries
//!   that were touched.
//!
//! Atom pairs on the same body never interact; a rigid body produces no
//! self-force.

use crate::core::forcefield::params::{ParameterSet, ScaleFactors};
use crate::core::forcefield::potentials::{
    coulomb, harmonic_bend, harmonic_stretch, lennard_jones_12_6, periodic_torsion,
};
use crate::core::forcefield::term::{EnergyTerm, SpatialForce};
use crate::core::forcefield::COULOMB_FACTOR;
use crate::core::models::atom::Atom;
use crate::core::models::system::MolecularSystem;
use crate::engine::error::EngineError;
use nalgebra::{Isometry3, Point3, Vector3};

/// Rotates a body-frame station into the ground frame and returns it
/// together with the atom's ground position. The station vector is what
/// torque contributions cross against.
#[inline]
fn station_and_position(
    x_gb: &Isometry3<f64>,
    station_b: &Point3<f64>,
) -> (Vector3<f64>, Point3<f64>) {
    let station_g = x_gb.rotation * station_b.coords;
    let pos_g = Point3::from(x_gb.translation.vector + station_g);
    (station_g, pos_g)
}

/// Accumulates one step's bonded and nonbonded contributions.
///
/// `body_transforms[b]` must hold the body-to-ground transform for every
/// body that owns atoms, and `forces[b]` the per-body accumulator slot;
/// both are validated up front. Returns the energy added, broken down by
/// term.
pub(crate) fn accumulate_forces(
    system: &MolecularSystem,
    params: &ParameterSet,
    body_transforms: &[Isometry3<f64>],
    forces: &mut [SpatialForce],
) -> Result<EnergyTerm, EngineError> {
    for (body, entry) in system.bodies().iter().enumerate() {
        if entry.is_none() {
            continue;
        }
        if body >= body_transforms.len() {
            return Err(EngineError::MissingBodyTransform {
                body,
                supplied: body_transforms.len(),
            });
        }
        if body >= forces.len() {
            return Err(EngineError::ShortForceBuffer {
                body,
                supplied: forces.len(),
            });
        }
    }

    let atoms = system.atoms();
    let scale = params.scale_factors();
    let mut energy = EnergyTerm::default();

    // Scale-mask scratch, one slot per atom, kept at 1 except while the
    // current atom's bonded neighborhood is being processed.
    let mut vdw_scale = vec![1.0; atoms.len()];
    let mut coulomb_scale = vec![1.0; atoms.len()];

    for (b1, entry1) in system.bodies().iter().enumerate() {
        let Some(body1) = entry1 else { continue };
        let x_gb1 = &body_transforms[b1];

        for placement1 in &body1.all_atoms {
            let a1_id = placement1.atom;
            let a1 = &atoms[a1_id];
            let a1_type = params.charged_type(a1.charged_type).unwrap();
            let a1_class_id = a1_type.atom_class;
            let a1_class = params.atom_class(a1_class_id).unwrap();
            let (a1_station_g, a1_pos_g) = station_and_position(x_gb1, &a1.station_b);
            let q1_fac = COULOMB_FACTOR * a1_type.partial_charge;

            // Bond stretch (1-2).
            for (i, &a2_id) in a1.xbond12.iter().enumerate() {
                if a2_id < a1_id {
                    continue;
                }
                let a2 = &atoms[a2_id];
                let b2 = a2.body.unwrap();
                let (a2_station_g, a2_pos_g) =
                    station_and_position(&body_transforms[b2], &a2.station_b);

                let bs = &a1.stretch[i];
                let eval = harmonic_stretch(bs.k, bs.d0, &a1_pos_g, &a2_pos_g);

                energy.stretch += eval.energy;
                forces[b2] += SpatialForce::at_station(&a2_station_g, &eval.force2);
                forces[b1] += -SpatialForce::at_station(&a1_station_g, &eval.force2);
            }

            // Bond bend (1-2-3), atom 2 central.
            for (i, &(a2_id, a3_id)) in a1.xbond13.iter().enumerate() {
                if a3_id < a1_id {
                    continue;
                }
                let a2 = &atoms[a2_id];
                let a3 = &atoms[a3_id];
                let b2 = a2.body.unwrap();
                let b3 = a3.body.unwrap();
                let (a2_station_g, a2_pos_g) =
                    station_and_position(&body_transforms[b2], &a2.station_b);
                let (a3_station_g, a3_pos_g) =
                    station_and_position(&body_transforms[b3], &a3.station_b);

                let bb = &a1.bend[i];
                let eval = harmonic_bend(bb.k, bb.theta0, &a2_pos_g, &a1_pos_g, &a3_pos_g);

                energy.bend += eval.energy;
                forces[b1] += SpatialForce::at_station(&a1_station_g, &eval.end1_force);
                forces[b2] += SpatialForce::at_station(&a2_station_g, &eval.center_force);
                forces[b3] += SpatialForce::at_station(&a3_station_g, &eval.end2_force);
            }

            // Bond torsion (1-2-3-4).
            for (i, &(a2_id, a3_id, a4_id)) in a1.xbond14.iter().enumerate() {
                if a4_id < a1_id {
                    continue;
                }
                let a2 = &atoms[a2_id];
                let a3 = &atoms[a3_id];
                let a4 = &atoms[a4_id];
                let b2 = a2.body.unwrap();
                let b3 = a3.body.unwrap();
                let b4 = a4.body.unwrap();
                let (a2_station_g, a2_pos_g) =
                    station_and_position(&body_transforms[b2], &a2.station_b);
                let (a3_station_g, a3_pos_g) =
                    station_and_position(&body_transforms[b3], &a3.station_b);
                let (a4_station_g, a4_pos_g) =
                    station_and_position(&body_transforms[b4], &a4.station_b);

                let bt = &a1.torsion[i];
                let eval =
                    periodic_torsion(&bt.terms, &a1_pos_g, &a2_pos_g, &a3_pos_g, &a4_pos_g);

                energy.torsion += eval.energy;
                forces[b1] += SpatialForce::at_station(&a1_station_g, &eval.force1);
                forces[b2] += SpatialForce::at_station(&a2_station_g, &eval.force2);
                forces[b3] += SpatialForce::at_station(&a3_station_g, &eval.force3);
                forces[b4] += SpatialForce::at_station(&a4_station_g, &eval.force4);
            }

            // Nonbonded, against every atom of every higher-numbered body.
            scale_bonded_atoms(a1, scale, &mut vdw_scale, &mut coulomb_scale);
            for (b2, entry2) in system.bodies().iter().enumerate().skip(b1 + 1) {
                let Some(body2) = entry2 else { continue };
                let x_gb2 = &body_transforms[b2];

                for placement2 in &body2.all_atoms {
                    let a2_id = placement2.atom;
                    let a2 = &atoms[a2_id];
                    let a2_type = params.charged_type(a2.charged_type).unwrap();
                    let a2_class_id = a2_type.atom_class;
                    let a2_class = params.atom_class(a2_class_id).unwrap();
                    let (a2_station_g, a2_pos_g) = station_and_position(x_gb2, &a2.station_b);

                    let r = a2_pos_g - a1_pos_g;
                    let d2 = r.norm_squared();
                    let ood = 1.0 / d2.sqrt();
                    let ood2 = ood * ood;

                    let qq = coulomb_scale[a2_id] * q1_fac * a2_type.partial_charge;
                    let (e_coulomb, f_coulomb) = coulomb(qq, ood);

                    // Mixed vdW parameters live on the lower-numbered class.
                    let (dij, eij) = if a1_class_id <= a2_class_id {
                        (
                            a1_class.vdw_dij[a2_class_id - a1_class_id],
                            a1_class.vdw_eij[a2_class_id - a1_class_id],
                        )
                    } else {
                        (
                            a2_class.vdw_dij[a1_class_id - a2_class_id],
                            a2_class.vdw_eij[a1_class_id - a2_class_id],
                        )
                    };
                    let (e_vdw, f_vdw) =
                        lennard_jones_12_6(dij, vdw_scale[a2_id] * eij, ood2);

                    let fj = ((f_coulomb + f_vdw) * ood2) * r;
                    energy.coulomb += e_coulomb;
                    energy.vdw += e_vdw;
                    forces[b2] += SpatialForce::at_station(&a2_station_g, &fj);
                    forces[b1] += -SpatialForce::at_station(&a1_station_g, &fj);
                }
            }
            unscale_bonded_atoms(a1, scale, &mut vdw_scale, &mut coulomb_scale);
        }
    }

    Ok(energy)
}

/// Overwrites the mask entries for one atom's cross-body bonded neighbors.
/// The 1-4 and 1-5 writes are skipped entirely when their factors are 1,
/// which is the common case.
fn scale_bonded_atoms(
    atom: &Atom,
    scale: &ScaleFactors,
    vdw_scale: &mut [f64],
    coulomb_scale: &mut [f64],
) {
    for &ix in &atom.xbond12 {
        vdw_scale[ix] = scale.vdw12;
        coulomb_scale[ix] = scale.coulomb12;
    }
    for &(_, ix) in &atom.xbond13 {
        vdw_scale[ix] = scale.vdw13;
        coulomb_scale[ix] = scale.coulomb13;
    }
    if scale.vdw14 != 1.0 || scale.coulomb14 != 1.0 {
        for &(_, _, ix) in &atom.xbond14 {
            vdw_scale[ix] = scale.vdw14;
            coulomb_scale[ix] = scale.coulomb14;
        }
    }
    if scale.vdw15 != 1.0 || scale.coulomb15 != 1.0 {
        for &(_, _, _, ix) in &atom.xbond15 {
            vdw_scale[ix] = scale.vdw15;
            coulomb_scale[ix] = scale.coulomb15;
        }
    }
}

/// Restores exactly the mask entries touched by [`scale_bonded_atoms`],
/// keeping the sweep O(bonded neighbors) instead of O(atoms).
fn unscale_bonded_atoms(
    atom: &Atom,
    scale: &ScaleFactors,
    vdw_scale: &mut [f64],
    coulomb_scale: &mut [f64],
) {
    for &ix in &atom.xbond12 {
        vdw_scale[ix] = 1.0;
        coulomb_scale[ix] = 1.0;
    }
    for &(_, ix) in &atom.xbond13 {
        vdw_scale[ix] = 1.0;
        coulomb_scale[ix] = 1.0;
    }
    if scale.vdw14 != 1.0 || scale.coulomb14 != 1.0 {
        for &(_, _, ix) in &atom.xbond14 {
            vdw_scale[ix] = 1.0;
            coulomb_scale[ix] = 1.0;
        }
    }
    if scale.vdw15 != 1.0 || scale.coulomb15 != 1.0 {
        for &(_, _, _, ix) in &atom.xbond15 {
            vdw_scale[ix] = 1.0;
            coulomb_scale[ix] = 1.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::ENERGY_PER_KCAL;
    use crate::engine::realize::realize_topology;

    const TOLERANCE: f64 = 1e-9;

    /// Two atoms of one class on two single-atom bodies, `charge` each,
    /// optionally bonded.
    fn two_body_setup(charge: f64, bonded: bool) -> (MolecularSystem, ParameterSet) {
        let mut params = ParameterSet::new();
        params.define_atom_class(0, "X", 6, 4, 1.5, 0.1).unwrap();
        params
            .define_charged_atom_type(0, "X q", 0, charge)
            .unwrap();
        params.define_bond_stretch(0, 0, 300.0, 1.0).unwrap();

        let mut system = MolecularSystem::new();
        let a = system.add_atom(0);
        let b = system.add_atom(0);
        system.attach_atom_to_body(a, 0, Point3::origin()).unwrap();
        system.attach_atom_to_body(b, 1, Point3::origin()).unwrap();
        if bonded {
            system.add_bond(a, b).unwrap();
        }
        (system, params)
    }

    fn transforms(separation: f64) -> Vec<Isometry3<f64>> {
        vec![
            Isometry3::identity(),
            Isometry3::translation(separation, 0.0, 0.0),
        ]
    }

    #[test]
    fn unbonded_pair_feels_coulomb_and_vdw() {
        let (mut system, mut params) = two_body_setup(1.0, false);
        realize_topology(&mut system, &mut params).unwrap();

        let mut forces = vec![SpatialForce::default(); 2];
        let energy =
            accumulate_forces(&system, &params, &transforms(3.0), &mut forces).unwrap();

        let expected_coulomb = COULOMB_FACTOR / 3.0;
        assert!((energy.coulomb - expected_coulomb).abs() < TOLERANCE);

        let dij = 3.0_f64; // 2 * 1.5, like classes
        let eij = 0.1 * ENERGY_PER_KCAL;
        let rho6 = (dij / 3.0).powi(6);
        let expected_vdw = eij * (rho6 * rho6 - 2.0 * rho6);
        assert!((energy.vdw - expected_vdw).abs() < TOLERANCE);

        assert_eq!(energy.stretch, 0.0);
        assert_eq!(energy.bend, 0.0);
        assert_eq!(energy.torsion, 0.0);
    }

    #[test]
    fn nonbonded_body_forces_are_equal_and_opposite() {
        let (mut system, mut params) = two_body_setup(1.0, false);
        realize_topology(&mut system, &mut params).unwrap();

        let mut forces = vec![SpatialForce::default(); 2];
        accumulate_forces(&system, &params, &transforms(2.7), &mut forces).unwrap();

        let sum = forces[0].force + forces[1].force;
        assert!(sum.norm() < TOLERANCE);

        // Net wrench about the ground origin also vanishes: the force acts
        // along the line between the atoms.
        let x = transforms(2.7);
        let total_torque = forces[0].torque
            + x[0].translation.vector.cross(&forces[0].force)
            + forces[1].torque
            + x[1].translation.vector.cross(&forces[1].force);
        assert!(total_torque.norm() < TOLERANCE);
    }

    #[test]
    fn bonded_pair_gets_stretch_but_no_nonbonded_at_default_scales() {
        let (mut system, mut params) = two_body_setup(1.0, true);
        realize_topology(&mut system, &mut params).unwrap();

        let mut forces = vec![SpatialForce::default(); 2];
        let energy =
            accumulate_forces(&system, &params, &transforms(1.2), &mut forces).unwrap();

        let k = 300.0 * ENERGY_PER_KCAL;
        assert!((energy.stretch - k * 0.2 * 0.2).abs() < TOLERANCE);
        // Default 1-2 scales are zero.
        assert_eq!(energy.coulomb, 0.0);
        assert_eq!(energy.vdw, 0.0);
    }

    #[test]
    fn scale_masks_are_restored_after_each_atom() {
        let (mut system, mut params) = two_body_setup(1.0, true);
        realize_topology(&mut system, &mut params).unwrap();

        // Two sweeps over the same configuration must agree; a leaked mask
        // would zero the second sweep's nonbonded term for other pairs.
        let mut forces_a = vec![SpatialForce::default(); 2];
        let first =
            accumulate_forces(&system, &params, &transforms(1.2), &mut forces_a).unwrap();
        let mut forces_b = vec![SpatialForce::default(); 2];
        let second =
            accumulate_forces(&system, &params, &transforms(1.2), &mut forces_b).unwrap();
        assert_eq!(first, second);
        assert_eq!(forces_a, forces_b);
    }

    #[test]
    fn missing_transform_and_short_buffer_are_reported() {
        let (mut system, mut params) = two_body_setup(0.0, false);
        realize_topology(&mut system, &mut params).unwrap();

        let mut forces = vec![SpatialForce::default(); 2];
        let err = accumulate_forces(
            &system,
            &params,
            &[Isometry3::identity()],
            &mut forces,
        )
        .unwrap_err();
        assert_eq!(
            err,
            EngineError::MissingBodyTransform {
                body: 1,
                supplied: 1
            }
        );

        let mut short = vec![SpatialForce::default(); 1];
        let err =
            accumulate_forces(&system, &params, &transforms(2.0), &mut short).unwrap_err();
        assert_eq!(
            err,
            EngineError::ShortForceBuffer {
                body: 1,
                supplied: 1
            }
        );
    }
}
