use super::params::TorsionTerm;
use crate::core::utils::geometry::perpendicular_unit;
use nalgebra::{Point3, Vector3};

/// Result of evaluating a harmonic stretch term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StretchEval {
    /// Separation of the two atoms, in Å.
    pub distance: f64,
    pub energy: f64,
    /// Force on the second atom; the first receives the negation.
    pub force2: Vector3<f64>,
}

/// Evaluates the harmonic stretch E = k·(d − d₀)² between two atoms.
///
/// There is no factor of ½; it is absorbed into k. At exactly zero
/// separation no direction is defined, so the restoring push is applied
/// along a fixed fallback axis rather than producing NaN.
pub fn harmonic_stretch(
    k: f64,
    d0: f64,
    pos1_g: &Point3<f64>,
    pos2_g: &Point3<f64>,
) -> StretchEval {
    let r = pos2_g - pos1_g;
    let d = r.norm();
    let x = d - d0;

    let energy = k * x * x;
    // Sign is as applied to atom 2: negative x pushes outward.
    let f_scalar = -2.0 * k * x;
    let direction = if d == 0.0 {
        perpendicular_unit(&Vector3::zeros())
    } else {
        r / d
    };

    StretchEval {
        distance: d,
        energy,
        force2: f_scalar * direction,
    }
}

/// Result of evaluating a harmonic bend term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BendEval {
    /// Angle between the two arms, in radians.
    pub theta: f64,
    pub energy: f64,
    pub center_force: Vector3<f64>,
    pub end1_force: Vector3<f64>,
    pub end2_force: Vector3<f64>,
}

/// Evaluates the harmonic bend E = k·(θ − θ₀)² for a central atom bonded to
/// two end atoms.
///
/// The angle is computed with atan2(|r×s|, r·s), which stays accurate near
/// 0 and π. For colinear arms the plane normal is undefined; a
/// deterministic perpendicular companion of the first arm is used so the
/// restoring push is finite. Arms of zero length produce zero force. The
/// three forces always sum to zero.
pub fn harmonic_bend(
    k: f64,
    theta0: f64,
    center_g: &Point3<f64>,
    end1_g: &Point3<f64>,
    end2_g: &Point3<f64>,
) -> BendEval {
    let r = end1_g - center_g;
    let s = end2_g - center_g;
    let rr = r.dot(&r);
    let ss = s.dot(&s);

    let rs = r.dot(&s);
    let rxs = r.cross(&s);
    let rxs_len = rxs.norm();
    let theta = rxs_len.atan2(rs);
    let bend = theta - theta0;
    let energy = k * bend * bend;

    if rr == 0.0 || ss == 0.0 {
        return BendEval {
            theta,
            energy,
            center_force: Vector3::zeros(),
            end1_force: Vector3::zeros(),
            end2_force: Vector3::zeros(),
        };
    }

    // Unit normal of the (r, s) plane, or a made-up companion when the arms
    // are colinear and the true normal is undefined.
    let p = if rxs_len != 0.0 {
        rxs / rxs_len
    } else {
        perpendicular_unit(&r)
    };

    let ffac = -2.0 * k * bend;
    let end1_force = (ffac / rr) * r.cross(&p);
    let end2_force = (ffac / ss) * p.cross(&s);

    BendEval {
        theta,
        energy,
        center_force: -(end1_force + end2_force),
        end1_force,
        end2_force,
    }
}

/// Result of evaluating a periodic torsion term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorsionEval {
    /// Dihedral angle in the polymer convention (0 when the outer atoms are
    /// cis across the axis), radians.
    pub theta: f64,
    pub energy: f64,
    pub force1: Vector3<f64>,
    pub force2: Vector3<f64>,
    pub force3: Vector3<f64>,
    pub force4: Vector3<f64>,
}

/// Evaluates the Fourier torsion E(θ) = Σ ampₙ·(1 + cos(n·θ − φₙ)) for
/// atoms 1-2-3-4 and distributes the pure torque about the 2→3 axis as
/// forces on the four atoms.
///
/// A positive angle follows the right-hand rule about the axis. If either
/// outer arm is aligned with the axis no torque can be produced and
/// everything is zero. If the two axis atoms coincide there is no axis; a
/// fallback direction keeps the output finite and the forces still sum to
/// zero.
pub fn periodic_torsion(
    terms: &[TorsionTerm],
    pos1_g: &Point3<f64>,
    pos2_g: &Point3<f64>,
    pos3_g: &Point3<f64>,
    pos4_g: &Point3<f64>,
) -> TorsionEval {
    // All vectors point along the 1->2->3->4 direction.
    let r = pos2_g - pos1_g;
    let s = pos4_g - pos3_g;
    let xy = pos3_g - pos2_g;

    // Unit vector along the axis, with increasingly desperate fallbacks for
    // overlapping atoms. oov == 0 signals that no real axis exists.
    let vv = xy.dot(&xy);
    let oov = if vv == 0.0 { 0.0 } else { 1.0 / vv.sqrt() };
    let v = if oov != 0.0 {
        xy * oov
    } else {
        let rxs = r.cross(&s);
        let n = rxs.norm();
        if n != 0.0 {
            rxs / n
        } else {
            perpendicular_unit(&r)
        }
    };

    // The axis serves as the shared "x axis" of the two bond planes; t and
    // u are their normals. Theta is zero when the normals align.
    let t = r.cross(&v);
    let u = v.cross(&s);
    let tt = t.dot(&t);
    let uu = u.dot(&u);

    // An outer arm along the axis cannot transmit torque.
    if tt == 0.0 || uu == 0.0 {
        return TorsionEval {
            theta: 0.0,
            energy: 0.0,
            force1: Vector3::zeros(),
            force2: Vector3::zeros(),
            force3: Vector3::zeros(),
            force4: Vector3::zeros(),
        };
    }

    let txu = t.cross(&u);
    let ootu = 1.0 / (tt * uu).sqrt();
    let cos_theta = t.dot(&u) * ootu;
    let sin_theta = v.dot(&txu) * ootu;
    let theta = sin_theta.atan2(cos_theta);

    let mut energy = 0.0;
    let mut torque = 0.0;
    for term in terms {
        energy += term.energy(theta);
        torque += term.torque(theta);
    }

    let ry = pos3_g - pos1_g;
    let xs = pos4_g - pos2_g;
    let dedt = (torque / tt) * t.cross(&v);
    let dedu = -(torque / uu) * u.cross(&v);

    let force1 = dedt.cross(&v);
    let force4 = dedu.cross(&v);
    let (force2, force3) = if oov == 0.0 {
        // No axis to lever against; keep the force sum at zero.
        (-force1, -force4)
    } else {
        (
            (ry.cross(&dedt) + dedu.cross(&s)) * oov,
            (dedt.cross(&r) + xs.cross(&dedu)) * oov,
        )
    };

    TorsionEval {
        theta,
        energy,
        force1,
        force2,
        force3,
        force4,
    }
}

/// Lennard-Jones 12-6 energy and force scalar for a pair at squared inverse
/// separation `ood2`, given the combined minimum-energy distance and well
/// depth.
///
/// Returns `(energy, force_scalar)` where the force on the second atom is
/// `force_scalar * ood2 * r`, with `r` the vector from the first atom to
/// the second; the missing 1/d² lives in that final step.
#[inline]
pub fn lennard_jones_12_6(dij: f64, eij: f64, ood2: f64) -> (f64, f64) {
    let rho2 = dij * dij * ood2;
    let rho6 = rho2 * rho2 * rho2;
    let rho12 = rho6 * rho6;
    (eij * (rho12 - 2.0 * rho6), 12.0 * eij * (rho12 - rho6))
}

/// Coulomb energy and force scalar for a charge product `qq` (already
/// scaled and multiplied by Coulomb's constant) at inverse separation
/// `ood`.
///
/// The force scalar equals the energy; the missing 1/d² is applied when
/// the scalar is turned into a vector, exactly as for the Lennard-Jones
/// kernel.
#[inline]
pub fn coulomb(qq: f64, ood: f64) -> (f64, f64) {
    let energy = qq * ood;
    (energy, energy)
}
