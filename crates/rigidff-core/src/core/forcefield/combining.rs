//! Van der Waals combining rules.
//!
//! The Lennard-Jones 12-6 potential is parameterized per atom class by a
//! radius rᵢ and a well depth eᵢ, where two atoms of the same class sit at
//! their energy minimum −eᵢ when separated by dmin = 2·rᵢ. A combining rule
//! produces an effective (rmin, emin) pair for two *different* classes from
//! their individual parameters.
//!
//! Several rules are in common use. Lorentz-Berthelot is the most common
//! and also the least accurate; Waldman-Hagler behaves best in practice and
//! is the default here. Halgren-HHG sits in between. Kong combines the
//! Tang-Toennies radius formula with the Waldman-Hagler well depth formula.

/// Selects how per-pair vdW parameters are produced from per-class ones.
///
/// The selection is a plain data tag consumed when the per-pair tables are
/// built; no dispatch happens during dynamics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CombiningRule {
    /// Waldman, M. & Hagler, A.T., J. Comput. Chem. 14(9):1077 (1993).
    #[default]
    WaldmanHagler,
    /// Used in AMBER, CHARMM: arithmetic radius, geometric well depth.
    LorentzBerthelot,
    /// Used in OPLS: geometric means for both.
    Jorgensen,
    /// Used in MMFF, AMOEBA: cubic-mean radius, HHG well depth.
    HalgrenHhg,
    /// Kong, C.L., J. Chem. Phys. 59(5):2464 (1973).
    Kong,
}

impl CombiningRule {
    /// Combines per-class radii and well depths into an effective
    /// `(rmin, emin)` pair for the cross interaction.
    pub fn combine(&self, ri: f64, rj: f64, ei: f64, ej: f64) -> (f64, f64) {
        match self {
            CombiningRule::WaldmanHagler => {
                let ri6 = ri.powi(6);
                let rj6 = rj.powi(6);
                let er6 = geometric_mean(ei * ri6, ej * rj6);
                let r6 = arithmetic_mean(ri6, rj6);
                (r6.powf(1.0 / 6.0), er6 / r6)
            }
            CombiningRule::LorentzBerthelot => (arithmetic_mean(ri, rj), geometric_mean(ei, ej)),
            CombiningRule::Jorgensen => (geometric_mean(ri, rj), geometric_mean(ei, ej)),
            CombiningRule::HalgrenHhg => (cubic_mean(ri, rj), hhg_mean(ei, ej)),
            CombiningRule::Kong => {
                let ri6 = ri.powi(6);
                let rj6 = rj.powi(6);
                let er6 = geometric_mean(ei * ri6, ej * rj6);
                let eri12_13 = (ei * ri6 * ri6).powf(1.0 / 13.0);
                let erj12_13 = (ej * rj6 * rj6).powf(1.0 / 13.0);
                let er12 = arithmetic_mean(eri12_13, erj12_13).powi(13);
                let r6 = er12 / er6;
                (r6.powf(1.0 / 6.0), er6 / r6)
            }
        }
    }
}

#[inline]
fn arithmetic_mean(a: f64, b: f64) -> f64 {
    0.5 * (a + b)
}

#[inline]
fn geometric_mean(a: f64, b: f64) -> f64 {
    (a * b).sqrt()
}

#[inline]
fn harmonic_mean(a: f64, b: f64) -> f64 {
    (2.0 * a * b) / (a + b)
}

// cubicMean = (a^3+b^3)/(a^2+b^2)
#[inline]
fn cubic_mean(a: f64, b: f64) -> f64 {
    (a * a * a + b * b * b) / (a * a + b * b)
}

// Harmonic mean of the harmonic and geometric means:
// hhgMean = 4ab/(sqrt(a)+sqrt(b))^2
#[inline]
fn hhg_mean(a: f64, b: f64) -> f64 {
    harmonic_mean(harmonic_mean(a, b), geometric_mean(a, b))
}
