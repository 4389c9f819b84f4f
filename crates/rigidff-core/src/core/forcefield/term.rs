use nalgebra::Vector3;
use std::ops::{Add, AddAssign, Neg};

/// Potential energy broken down by interaction term, in internal units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnergyTerm {
    pub stretch: f64,
    pub bend: f64,
    pub torsion: f64,
    pub vdw: f64,
    pub coulomb: f64,
}

impl EnergyTerm {
    #[inline]
    pub fn total(&self) -> f64 {
        self.stretch + self.bend + self.torsion + self.vdw + self.coulomb
    }
}

impl Add for EnergyTerm {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            stretch: self.stretch + rhs.stretch,
            bend: self.bend + rhs.bend,
            torsion: self.torsion + rhs.torsion,
            vdw: self.vdw + rhs.vdw,
            coulomb: self.coulomb + rhs.coulomb,
        }
    }
}

impl AddAssign for EnergyTerm {
    fn add_assign(&mut self, rhs: Self) {
        self.stretch += rhs.stretch;
        self.bend += rhs.bend;
        self.torsion += rhs.torsion;
        self.vdw += rhs.vdw;
        self.coulomb += rhs.coulomb;
    }
}

/// A spatial force on a rigid body: a torque about the body origin and a
/// linear force, both in the ground frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpatialForce {
    pub torque: Vector3<f64>,
    pub force: Vector3<f64>,
}

impl SpatialForce {
    /// The spatial force produced by a point force applied at a station
    /// (the station vector is measured from the body origin, in the ground
    /// frame).
    #[inline]
    pub fn at_station(station_g: &Vector3<f64>, force: &Vector3<f64>) -> Self {
        Self {
            torque: station_g.cross(force),
            force: *force,
        }
    }
}

impl Add for SpatialForce {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            torque: self.torque + rhs.torque,
            force: self.force + rhs.force,
        }
    }
}

impl AddAssign for SpatialForce {
    fn add_assign(&mut self, rhs: Self) {
        self.torque += rhs.torque;
        self.force += rhs.force;
    }
}

impl Neg for SpatialForce {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self {
            torque: -self.torque,
            force: -self.force,
        }
    }
}
