use super::combining::CombiningRule;
use super::elements::{builtin_elements, Element};
use super::ENERGY_PER_KCAL;
use crate::core::models::ids::{AtomClassId, ChargedTypeId};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Errors raised while defining or querying force-field parameters.
///
/// Definitions validate every argument before touching the tables, so a
/// returned error never leaves a partial definition behind.
#[derive(Debug, Error, PartialEq)]
pub enum ParameterError {
    #[error("no element with atomic number {0} is registered")]
    UnknownElement(usize),

    #[error("atom class {0} has not been defined")]
    UnknownAtomClass(AtomClassId),

    #[error("charged atom type {0} has not been defined")]
    UnknownChargedType(ChargedTypeId),

    #[error("element {0} is already registered")]
    ElementAlreadyDefined(usize),

    #[error("atom class {id} is already in use for '{name}'")]
    AtomClassAlreadyDefined { id: AtomClassId, name: String },

    #[error("charged atom type {id} is already in use for '{name}'")]
    ChargedTypeAlreadyDefined { id: ChargedTypeId, name: String },

    #[error("a bond stretch term is already defined for atom class pair {0}")]
    StretchAlreadyDefined(ClassPair),

    #[error("a bond bend term is already defined for atom class triple {0}")]
    BendAlreadyDefined(ClassTriple),

    #[error("bond torsion terms are already defined for atom class quad {0}")]
    TorsionAlreadyDefined(ClassQuad),

    #[error("{quantity} ({value}) is invalid: {constraint}")]
    OutOfRange {
        quantity: &'static str,
        value: f64,
        constraint: &'static str,
    },

    #[error("torsion periodicity {0} is invalid: must be between 1 and 6")]
    BadPeriodicity(usize),

    #[error("only one torsion term per periodicity may be given ({0} was repeated)")]
    RepeatedPeriodicity(usize),

    #[error("a bond torsion definition takes between 1 and 3 terms, got {0}")]
    BadTorsionTermCount(usize),
}

fn check_finite(quantity: &'static str, value: f64) -> Result<(), ParameterError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ParameterError::OutOfRange {
            quantity,
            value,
            constraint: "must be finite",
        })
    }
}

fn check_nonnegative(quantity: &'static str, value: f64) -> Result<(), ParameterError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ParameterError::OutOfRange {
            quantity,
            value,
            constraint: "must be finite and nonnegative",
        })
    }
}

fn check_bounded(
    quantity: &'static str,
    value: f64,
    min: f64,
    max: f64,
    constraint: &'static str,
) -> Result<(), ParameterError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ParameterError::OutOfRange {
            quantity,
            value,
            constraint,
        })
    }
}

/// Canonical atom-class pair: the lower class id always comes first, so a
/// parameter defined for (a, b) is found under (b, a) as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassPair([AtomClassId; 2]);

impl ClassPair {
    pub fn new(c1: AtomClassId, c2: AtomClassId) -> Self {
        if c1 <= c2 {
            Self([c1, c2])
        } else {
            Self([c2, c1])
        }
    }

    pub fn classes(&self) -> [AtomClassId; 2] {
        self.0
    }
}

impl fmt::Display for ClassPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.0[0], self.0[1])
    }
}

/// Canonical atom-class triple: the end classes are ordered low-high, the
/// central class stays put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassTriple([AtomClassId; 3]);

impl ClassTriple {
    pub fn new(c1: AtomClassId, c2: AtomClassId, c3: AtomClassId) -> Self {
        if c1 <= c3 {
            Self([c1, c2, c3])
        } else {
            Self([c3, c2, c1])
        }
    }

    pub fn classes(&self) -> [AtomClassId; 3] {
        self.0
    }
}

impl fmt::Display for ClassTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.0[0], self.0[1], self.0[2])
    }
}

/// Canonical atom-class quad: reversed as a whole when the first class
/// outranks the last, so the two inner classes swap together with the ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassQuad([AtomClassId; 4]);

impl ClassQuad {
    pub fn new(c1: AtomClassId, c2: AtomClassId, c3: AtomClassId, c4: AtomClassId) -> Self {
        if c1 <= c4 {
            Self([c1, c2, c3, c4])
        } else {
            Self([c4, c3, c2, c1])
        }
    }

    pub fn classes(&self) -> [AtomClassId; 4] {
        self.0
    }
}

impl fmt::Display for ClassQuad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

/// An atomic environment: element, expected valence, and per-class van der
/// Waals parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomClass {
    pub id: AtomClassId,
    pub name: String,
    pub element: usize,
    /// Number of direct bonds expected.
    pub valence: usize,
    /// rᵢ in Å; two like atoms sit at their energy minimum at 2·rᵢ.
    pub vdw_radius: f64,
    /// eᵢ in internal energy units.
    pub vdw_well_depth: f64,

    // Per-pair combined vdW parameters, built during compilation. Entries
    // exist only for partner classes with id >= this class's id, indexed by
    // the id difference; the lower-numbered class owns each pair.
    pub vdw_dij: Vec<f64>,
    pub vdw_eij: Vec<f64>,
}

impl AtomClass {
    pub(crate) fn invalidate_topological_cache(&mut self) {
        self.vdw_dij.clear();
        self.vdw_eij.clear();
    }
}

/// An atom class plus a partial charge; individual atoms reference one of
/// these.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargedAtomType {
    pub id: ChargedTypeId,
    pub name: String,
    pub atom_class: AtomClassId,
    /// qᵢ in units of the proton charge.
    pub partial_charge: f64,
}

/// Harmonic bond-stretch parameters. E = k·(d − d₀)², with the conventional
/// factor of ½ absorbed into k.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BondStretch {
    /// Internal energy units per Å².
    pub k: f64,
    /// Distance at which the force vanishes, in Å.
    pub d0: f64,
}

/// Harmonic bond-bend parameters. E = k·(θ − θ₀)², no factor of ½.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BondBend {
    /// Internal energy units per rad².
    pub k: f64,
    /// Unstressed angle in radians.
    pub theta0: f64,
}

/// One Fourier term of a periodic torsion:
/// E(θ) = amplitude·(1 + cos(periodicity·θ − phase)).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorsionTerm {
    /// 1 = 360°, 2 = 180°, 3 = 120°, ...
    pub periodicity: usize,
    /// Internal energy units.
    pub amplitude: f64,
    /// Radians.
    pub phase: f64,
}

impl TorsionTerm {
    #[inline]
    pub fn energy(&self, theta: f64) -> f64 {
        self.amplitude * (1.0 + (self.periodicity as f64 * theta - self.phase).cos())
    }

    /// Scalar torque about the bond axis at the given angle.
    #[inline]
    pub fn torque(&self, theta: f64) -> f64 {
        self.periodicity as f64 * self.amplitude * (self.periodicity as f64 * theta - self.phase).sin()
    }
}

/// The full periodic torsion for one class quad: a sum of terms with
/// distinct periodicities.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BondTorsion {
    pub terms: Vec<TorsionTerm>,
}

impl BondTorsion {
    pub fn has_term(&self, periodicity: usize) -> bool {
        self.terms.iter().any(|t| t.periodicity == periodicity)
    }
}

/// Multipliers applied to nonbonded interactions between atoms that are
/// near each other in the bond graph (and on different bodies). Index k
/// means the atoms are 1-k bonded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    pub vdw12: f64,
    pub vdw13: f64,
    pub vdw14: f64,
    pub vdw15: f64,
    pub coulomb12: f64,
    pub coulomb13: f64,
    pub coulomb14: f64,
    pub coulomb15: f64,
}

impl Default for ScaleFactors {
    fn default() -> Self {
        Self {
            vdw12: 0.0,
            vdw13: 0.0,
            vdw14: 1.0,
            vdw15: 1.0,
            coulomb12: 0.0,
            coulomb13: 0.0,
            coulomb14: 1.0,
            coulomb15: 1.0,
        }
    }
}

/// The immutable parameter catalogs of the force field: elements, atom
/// classes, charged atom types, and the keyed bonded-parameter tables.
///
/// Class and type ids are caller-chosen; the tables grow sparsely to
/// accommodate them. Energies are converted from kcal/mol and angles from
/// degrees at definition time, so everything stored here is already in
/// internal units.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    elements: Vec<Option<Element>>,
    atom_classes: Vec<Option<AtomClass>>,
    charged_types: Vec<Option<ChargedAtomType>>,

    bond_stretch: HashMap<ClassPair, BondStretch>,
    bond_bend: HashMap<ClassTriple, BondBend>,
    bond_torsion: HashMap<ClassQuad, BondTorsion>,

    combining_rule: CombiningRule,
    scale: ScaleFactors,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterSet {
    /// Creates a parameter set preloaded with the built-in element table.
    pub fn new() -> Self {
        let mut set = Self {
            elements: Vec::new(),
            atom_classes: Vec::new(),
            charged_types: Vec::new(),
            bond_stretch: HashMap::new(),
            bond_bend: HashMap::new(),
            bond_torsion: HashMap::new(),
            combining_rule: CombiningRule::default(),
            scale: ScaleFactors::default(),
        };
        for element in builtin_elements() {
            set.insert_element(element);
        }
        set
    }

    // --- Elements ---

    /// Registers an additional element. Fails if the atomic number is
    /// already taken or the record is malformed.
    pub fn define_element(&mut self, element: Element) -> Result<(), ParameterError> {
        if element.atomic_number == 0 {
            return Err(ParameterError::OutOfRange {
                quantity: "atomic number",
                value: 0.0,
                constraint: "must be positive",
            });
        }
        if !element.mass.is_finite() || element.mass <= 0.0 {
            return Err(ParameterError::OutOfRange {
                quantity: "element mass",
                value: element.mass,
                constraint: "must be finite and positive",
            });
        }
        if self.element(element.atomic_number).is_some() {
            return Err(ParameterError::ElementAlreadyDefined(element.atomic_number));
        }
        self.insert_element(element);
        Ok(())
    }

    pub fn element(&self, atomic_number: usize) -> Option<&Element> {
        self.elements.get(atomic_number).and_then(|e| e.as_ref())
    }

    fn insert_element(&mut self, element: Element) {
        let z = element.atomic_number;
        if z >= self.elements.len() {
            self.elements.resize(z + 1, None);
        }
        self.elements[z] = Some(element);
    }

    // --- Atom classes and charged types ---

    /// Defines an atom class under a caller-chosen id.
    ///
    /// # Arguments
    ///
    /// * `id` - Class id, nonnegative, currently unused.
    /// * `name` - Display name.
    /// * `element` - Atomic number of a registered element.
    /// * `valence` - Number of direct bonds expected.
    /// * `vdw_radius` - rᵢ in Å (half the like-pair minimum-energy
    ///   distance).
    /// * `vdw_well_depth_kcal` - eᵢ in kcal/mol; converted on ingestion.
    pub fn define_atom_class(
        &mut self,
        id: AtomClassId,
        name: &str,
        element: usize,
        valence: usize,
        vdw_radius: f64,
        vdw_well_depth_kcal: f64,
    ) -> Result<(), ParameterError> {
        if self.element(element).is_none() {
            return Err(ParameterError::UnknownElement(element));
        }
        check_nonnegative("van der Waals radius", vdw_radius)?;
        check_nonnegative("van der Waals well depth", vdw_well_depth_kcal)?;
        if let Some(existing) = self.atom_class(id) {
            return Err(ParameterError::AtomClassAlreadyDefined {
                id,
                name: existing.name.clone(),
            });
        }

        if id >= self.atom_classes.len() {
            self.atom_classes.resize(id + 1, None);
        }
        self.atom_classes[id] = Some(AtomClass {
            id,
            name: name.to_string(),
            element,
            valence,
            vdw_radius,
            vdw_well_depth: vdw_well_depth_kcal * ENERGY_PER_KCAL,
            vdw_dij: Vec::new(),
            vdw_eij: Vec::new(),
        });
        Ok(())
    }

    /// Defines a charged atom type: an atom class plus a partial charge in
    /// units of e.
    pub fn define_charged_atom_type(
        &mut self,
        id: ChargedTypeId,
        name: &str,
        atom_class: AtomClassId,
        partial_charge: f64,
    ) -> Result<(), ParameterError> {
        if self.atom_class(atom_class).is_none() {
            return Err(ParameterError::UnknownAtomClass(atom_class));
        }
        check_finite("partial charge", partial_charge)?;
        if let Some(existing) = self.charged_type(id) {
            return Err(ParameterError::ChargedTypeAlreadyDefined {
                id,
                name: existing.name.clone(),
            });
        }

        if id >= self.charged_types.len() {
            self.charged_types.resize(id + 1, None);
        }
        self.charged_types[id] = Some(ChargedAtomType {
            id,
            name: name.to_string(),
            atom_class,
            partial_charge,
        });
        Ok(())
    }

    pub fn atom_class(&self, id: AtomClassId) -> Option<&AtomClass> {
        self.atom_classes.get(id).and_then(|c| c.as_ref())
    }

    pub fn atom_classes(&self) -> impl Iterator<Item = &AtomClass> {
        self.atom_classes.iter().flatten()
    }

    pub fn charged_type(&self, id: ChargedTypeId) -> Option<&ChargedAtomType> {
        self.charged_types.get(id).and_then(|t| t.as_ref())
    }

    pub fn charged_types(&self) -> impl Iterator<Item = &ChargedAtomType> {
        self.charged_types.iter().flatten()
    }

    // --- Bonded parameters ---

    /// Defines the harmonic stretch term for a pair of atom classes.
    ///
    /// # Arguments
    ///
    /// * `stiffness_kcal` - k in kcal/mol/Å²; converted on ingestion.
    /// * `nominal_length` - d₀ in Å.
    pub fn define_bond_stretch(
        &mut self,
        class1: AtomClassId,
        class2: AtomClassId,
        stiffness_kcal: f64,
        nominal_length: f64,
    ) -> Result<(), ParameterError> {
        self.check_class(class1)?;
        self.check_class(class2)?;
        check_nonnegative("bond stretch stiffness", stiffness_kcal)?;
        check_nonnegative("bond stretch nominal length", nominal_length)?;

        let key = ClassPair::new(class1, class2);
        if self.bond_stretch.contains_key(&key) {
            return Err(ParameterError::StretchAlreadyDefined(key));
        }
        self.bond_stretch.insert(
            key,
            BondStretch {
                k: stiffness_kcal * ENERGY_PER_KCAL,
                d0: nominal_length,
            },
        );
        Ok(())
    }

    /// Defines the harmonic bend term for a triple of atom classes, central
    /// class in the middle.
    ///
    /// # Arguments
    ///
    /// * `stiffness_kcal` - k in kcal/mol/rad²; converted on ingestion.
    /// * `nominal_angle_deg` - θ₀ in degrees, between 0 and 180 inclusive.
    pub fn define_bond_bend(
        &mut self,
        class1: AtomClassId,
        class2: AtomClassId,
        class3: AtomClassId,
        stiffness_kcal: f64,
        nominal_angle_deg: f64,
    ) -> Result<(), ParameterError> {
        self.check_class(class1)?;
        self.check_class(class2)?;
        self.check_class(class3)?;
        check_nonnegative("bond bend stiffness", stiffness_kcal)?;
        check_bounded(
            "bond bend nominal angle",
            nominal_angle_deg,
            0.0,
            180.0,
            "must be between 0 and 180 degrees, inclusive",
        )?;

        let key = ClassTriple::new(class1, class2, class3);
        if self.bond_bend.contains_key(&key) {
            return Err(ParameterError::BendAlreadyDefined(key));
        }
        self.bond_bend.insert(
            key,
            BondBend {
                k: stiffness_kcal * ENERGY_PER_KCAL,
                theta0: nominal_angle_deg.to_radians(),
            },
        );
        Ok(())
    }

    /// Defines the periodic torsion for a quad of atom classes, as one to
    /// three `(periodicity, amplitude kcal/mol, phase degrees)` terms with
    /// distinct periodicities in 1..=6, amplitudes nonnegative, and phases
    /// between 0 and 180 degrees.
    pub fn define_bond_torsion(
        &mut self,
        class1: AtomClassId,
        class2: AtomClassId,
        class3: AtomClassId,
        class4: AtomClassId,
        terms: &[(usize, f64, f64)],
    ) -> Result<(), ParameterError> {
        self.check_class(class1)?;
        self.check_class(class2)?;
        self.check_class(class3)?;
        self.check_class(class4)?;
        if terms.is_empty() || terms.len() > 3 {
            return Err(ParameterError::BadTorsionTermCount(terms.len()));
        }

        let mut torsion = BondTorsion::default();
        for &(periodicity, amplitude_kcal, phase_deg) in terms {
            if !(1..=6).contains(&periodicity) {
                return Err(ParameterError::BadPeriodicity(periodicity));
            }
            check_nonnegative("torsion amplitude", amplitude_kcal)?;
            check_bounded(
                "torsion phase angle",
                phase_deg,
                0.0,
                180.0,
                "must be between 0 and 180 degrees, inclusive",
            )?;
            if torsion.has_term(periodicity) {
                return Err(ParameterError::RepeatedPeriodicity(periodicity));
            }
            torsion.terms.push(TorsionTerm {
                periodicity,
                amplitude: amplitude_kcal * ENERGY_PER_KCAL,
                phase: phase_deg.to_radians(),
            });
        }

        let key = ClassQuad::new(class1, class2, class3, class4);
        if self.bond_torsion.contains_key(&key) {
            return Err(ParameterError::TorsionAlreadyDefined(key));
        }
        self.bond_torsion.insert(key, torsion);
        Ok(())
    }

    pub fn bond_stretch(&self, class1: AtomClassId, class2: AtomClassId) -> Option<&BondStretch> {
        self.bond_stretch.get(&ClassPair::new(class1, class2))
    }

    pub fn bond_bend(
        &self,
        class1: AtomClassId,
        class2: AtomClassId,
        class3: AtomClassId,
    ) -> Option<&BondBend> {
        self.bond_bend.get(&ClassTriple::new(class1, class2, class3))
    }

    pub fn bond_torsion(
        &self,
        class1: AtomClassId,
        class2: AtomClassId,
        class3: AtomClassId,
        class4: AtomClassId,
    ) -> Option<&BondTorsion> {
        self.bond_torsion
            .get(&ClassQuad::new(class1, class2, class3, class4))
    }

    // --- Scale factors ---

    /// Sets the vdW multipliers for 1-2 through 1-5 bonded atoms. Each must
    /// lie in [0, 1].
    pub fn set_vdw_scale_factors(
        &mut self,
        s12: f64,
        s13: f64,
        s14: f64,
        s15: f64,
    ) -> Result<(), ParameterError> {
        for (quantity, value) in [
            ("vdW 1-2 scale factor", s12),
            ("vdW 1-3 scale factor", s13),
            ("vdW 1-4 scale factor", s14),
            ("vdW 1-5 scale factor", s15),
        ] {
            check_bounded(quantity, value, 0.0, 1.0, "must be between 0 and 1, inclusive")?;
        }
        self.scale.vdw12 = s12;
        self.scale.vdw13 = s13;
        self.scale.vdw14 = s14;
        self.scale.vdw15 = s15;
        Ok(())
    }

    /// Sets the Coulomb multipliers for 1-2 through 1-5 bonded atoms. Each
    /// must lie in [0, 1].
    pub fn set_coulomb_scale_factors(
        &mut self,
        s12: f64,
        s13: f64,
        s14: f64,
        s15: f64,
    ) -> Result<(), ParameterError> {
        for (quantity, value) in [
            ("Coulomb 1-2 scale factor", s12),
            ("Coulomb 1-3 scale factor", s13),
            ("Coulomb 1-4 scale factor", s14),
            ("Coulomb 1-5 scale factor", s15),
        ] {
            check_bounded(quantity, value, 0.0, 1.0, "must be between 0 and 1, inclusive")?;
        }
        self.scale.coulomb12 = s12;
        self.scale.coulomb13 = s13;
        self.scale.coulomb14 = s14;
        self.scale.coulomb15 = s15;
        Ok(())
    }

    pub fn scale_factors(&self) -> &ScaleFactors {
        &self.scale
    }

    // --- Topological cache ---

    /// Builds the triangular per-pair vdW tables on every atom class, using
    /// the configured combining rule. Each class holds entries for itself
    /// and all higher-numbered classes, indexed by the id difference.
    pub(crate) fn build_vdw_tables(&mut self) {
        let rule = self.combining_rule;
        let n = self.atom_classes.len();
        let snapshot: Vec<Option<(f64, f64)>> = self
            .atom_classes
            .iter()
            .map(|c| c.as_ref().map(|c| (c.vdw_radius, c.vdw_well_depth)))
            .collect();

        for i in 0..n {
            let Some((ri, ei)) = snapshot[i] else { continue };
            let class = self.atom_classes[i].as_mut().unwrap();
            class.vdw_dij = vec![f64::NAN; n - i];
            class.vdw_eij = vec![f64::NAN; n - i];
            for (j, entry) in snapshot.iter().enumerate().skip(i) {
                if let Some((rj, ej)) = *entry {
                    let (rmin, emin) = rule.combine(ri, rj, ei, ej);
                    class.vdw_dij[j - i] = 2.0 * rmin;
                    class.vdw_eij[j - i] = emin;
                }
            }
        }
    }

    pub(crate) fn invalidate_topological_caches(&mut self) {
        for class in self.atom_classes.iter_mut().flatten() {
            class.invalidate_topological_cache();
        }
    }

    /// Combined (dmin, emin) for a class pair, read from the
    /// lower-numbered class's table. Only valid after the tables have been
    /// built.
    pub fn vdw_pair(&self, class1: AtomClassId, class2: AtomClassId) -> Option<(f64, f64)> {
        let (lo, hi) = if class1 <= class2 {
            (class1, class2)
        } else {
            (class2, class1)
        };
        let class = self.atom_class(lo)?;
        let dij = *class.vdw_dij.get(hi - lo)?;
        let eij = *class.vdw_eij.get(hi - lo)?;
        Some((dij, eij))
    }

    fn check_class(&self, id: AtomClassId) -> Result<(), ParameterError> {
        if self.atom_class(id).is_some() {
            Ok(())
        } else {
            Err(ParameterError::UnknownAtomClass(id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const TOLERANCE: f64 = 1e-12;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    /// A parameter set with two classes (0: carbon-ish, 1: hydrogen-ish)
    /// and matching charged types.
    fn setup() -> ParameterSet {
        let mut params = ParameterSet::new();
        params.define_atom_class(0, "CT", 6, 4, 1.9, 0.1).unwrap();
        params.define_atom_class(1, "HC", 1, 1, 1.5, 0.02).unwrap();
        params.define_charged_atom_type(0, "CT neutral", 0, 0.0).unwrap();
        params.define_charged_atom_type(1, "HC neutral", 1, 0.0).unwrap();
        params
    }

    mod canonical_keys {
        use super::*;

        #[test]
        fn pair_orders_low_high() {
            assert_eq!(ClassPair::new(5, 2), ClassPair::new(2, 5));
            assert_eq!(ClassPair::new(2, 5).classes(), [2, 5]);
        }

        #[test]
        fn triple_swaps_ends_and_keeps_middle() {
            assert_eq!(ClassTriple::new(7, 3, 1), ClassTriple::new(1, 3, 7));
            assert_eq!(ClassTriple::new(7, 3, 1).classes(), [1, 3, 7]);
        }

        #[test]
        fn quad_reverses_as_a_whole() {
            assert_eq!(ClassQuad::new(9, 4, 2, 1), ClassQuad::new(1, 2, 4, 9));
            assert_eq!(ClassQuad::new(9, 4, 2, 1).classes(), [1, 2, 4, 9]);
            // Inner pair must travel with the outer swap.
            assert_ne!(ClassQuad::new(9, 4, 2, 1), ClassQuad::new(1, 4, 2, 9));
        }
    }

    mod definitions {
        use super::*;

        #[test]
        fn atom_class_converts_well_depth_to_internal_units() {
            let params = setup();
            let class = params.atom_class(0).unwrap();
            assert!(close(class.vdw_well_depth, 0.1 * ENERGY_PER_KCAL));
            assert!(close(class.vdw_radius, 1.9));
        }

        #[test]
        fn atom_class_rejects_unknown_element_and_duplicates() {
            let mut params = setup();
            assert_eq!(
                params.define_atom_class(9, "X", 999, 1, 1.0, 0.1),
                Err(ParameterError::UnknownElement(999))
            );
            assert_eq!(
                params.define_atom_class(0, "again", 6, 4, 1.9, 0.1),
                Err(ParameterError::AtomClassAlreadyDefined {
                    id: 0,
                    name: "CT".to_string()
                })
            );
        }

        #[test]
        fn charged_type_requires_existing_class() {
            let mut params = ParameterSet::new();
            assert_eq!(
                params.define_charged_atom_type(0, "orphan", 3, 0.5),
                Err(ParameterError::UnknownAtomClass(3))
            );
        }

        #[test]
        fn element_duplicates_are_rejected() {
            let mut params = ParameterSet::new();
            let err = params
                .define_element(Element::new(6, "C", "Carbon", 12.011))
                .unwrap_err();
            assert_eq!(err, ParameterError::ElementAlreadyDefined(6));

            params
                .define_element(Element::new(35, "Br", "Bromine", 79.904))
                .unwrap();
            assert_eq!(params.element(35).unwrap().symbol, "Br");
        }

        #[test]
        fn non_finite_arguments_are_rejected() {
            let mut params = setup();
            assert!(matches!(
                params.define_bond_stretch(0, 1, f64::NAN, 1.0),
                Err(ParameterError::OutOfRange { .. })
            ));
            assert!(matches!(
                params.define_charged_atom_type(5, "bad", 0, f64::INFINITY),
                Err(ParameterError::OutOfRange { .. })
            ));
        }
    }

    mod stretch_and_bend {
        use super::*;

        #[test]
        fn stretch_converts_units_and_matches_reversed_key() {
            let mut params = setup();
            params.define_bond_stretch(1, 0, 300.0, 1.1).unwrap();

            let forward = params.bond_stretch(0, 1).unwrap();
            let reverse = params.bond_stretch(1, 0).unwrap();
            assert!(close(forward.k, 300.0 * ENERGY_PER_KCAL));
            assert!(close(forward.d0, 1.1));
            assert_eq!(forward, reverse);
        }

        #[test]
        fn duplicate_stretch_is_rejected_in_either_order() {
            let mut params = setup();
            params.define_bond_stretch(0, 1, 300.0, 1.1).unwrap();
            assert_eq!(
                params.define_bond_stretch(1, 0, 200.0, 1.0),
                Err(ParameterError::StretchAlreadyDefined(ClassPair::new(0, 1)))
            );
        }

        #[test]
        fn bend_converts_angle_to_radians_and_canonicalizes() {
            let mut params = setup();
            params.define_bond_bend(1, 0, 0, 50.0, 109.5).unwrap();

            let bend = params.bond_bend(0, 0, 1).unwrap();
            assert!(close(bend.k, 50.0 * ENERGY_PER_KCAL));
            assert!(close(bend.theta0, 109.5_f64.to_radians()));
        }

        #[test]
        fn bend_angle_outside_range_is_rejected() {
            let mut params = setup();
            assert!(matches!(
                params.define_bond_bend(0, 0, 1, 50.0, 181.0),
                Err(ParameterError::OutOfRange { .. })
            ));
            assert!(matches!(
                params.define_bond_bend(0, 0, 1, 50.0, -1.0),
                Err(ParameterError::OutOfRange { .. })
            ));
        }
    }

    mod torsions {
        use super::*;

        #[test]
        fn torsion_stores_converted_terms_under_canonical_quad() {
            let mut params = setup();
            params
                .define_bond_torsion(1, 0, 0, 0, &[(3, 0.16, 0.0), (2, 0.5, 180.0)])
                .unwrap();

            let torsion = params.bond_torsion(1, 0, 0, 0).unwrap();
            assert_eq!(torsion.terms.len(), 2);
            assert!(torsion.has_term(3));
            assert!(close(torsion.terms[0].amplitude, 0.16 * ENERGY_PER_KCAL));
            assert!(close(torsion.terms[1].phase, PI));

            // Reversed quad resolves to the same parameter.
            assert_eq!(
                params.bond_torsion(0, 0, 0, 1),
                params.bond_torsion(1, 0, 0, 0)
            );
            assert!(params.bond_torsion(0, 0, 0, 1).is_some());
        }

        #[test]
        fn torsion_rejects_bad_periodicity_and_repeats() {
            let mut params = setup();
            assert_eq!(
                params.define_bond_torsion(0, 0, 0, 0, &[(7, 0.1, 0.0)]),
                Err(ParameterError::BadPeriodicity(7))
            );
            assert_eq!(
                params.define_bond_torsion(0, 0, 0, 0, &[(3, 0.1, 0.0), (3, 0.2, 0.0)]),
                Err(ParameterError::RepeatedPeriodicity(3))
            );
            assert_eq!(
                params.define_bond_torsion(0, 0, 0, 0, &[]),
                Err(ParameterError::BadTorsionTermCount(0))
            );
        }

        #[test]
        fn torsion_term_energy_and_torque_follow_the_fourier_form() {
            let term = TorsionTerm {
                periodicity: 3,
                amplitude: 2.0,
                phase: 0.0,
            };
            assert!(close(term.energy(PI / 3.0), 0.0)); // cos(180°) = -1
            assert!(close(term.energy(0.0), 4.0));
            assert!(close(term.torque(PI / 3.0), 0.0)); // sin(180°) = 0
        }

        #[test]
        fn duplicate_quad_is_rejected_even_reversed() {
            let mut params = setup();
            params
                .define_bond_torsion(0, 0, 1, 1, &[(3, 0.16, 0.0)])
                .unwrap();
            assert_eq!(
                params.define_bond_torsion(1, 1, 0, 0, &[(2, 0.1, 0.0)]),
                Err(ParameterError::TorsionAlreadyDefined(ClassQuad::new(
                    0, 0, 1, 1
                )))
            );
        }
    }

    mod scale_factors {
        use super::*;

        #[test]
        fn defaults_zero_the_12_13_pairs_and_keep_14_15() {
            let params = ParameterSet::new();
            let scale = params.scale_factors();
            assert_eq!(scale.vdw12, 0.0);
            assert_eq!(scale.vdw13, 0.0);
            assert_eq!(scale.vdw14, 1.0);
            assert_eq!(scale.vdw15, 1.0);
            assert_eq!(scale.coulomb12, 0.0);
            assert_eq!(scale.coulomb15, 1.0);
        }

        #[test]
        fn setters_validate_the_unit_interval() {
            let mut params = ParameterSet::new();
            params.set_vdw_scale_factors(0.0, 0.0, 0.5, 1.0).unwrap();
            assert_eq!(params.scale_factors().vdw14, 0.5);

            assert!(matches!(
                params.set_coulomb_scale_factors(0.0, 0.0, 1.5, 1.0),
                Err(ParameterError::OutOfRange { .. })
            ));
            // Failed call leaves the previous values untouched.
            assert_eq!(params.scale_factors().coulomb14, 1.0);
        }
    }

    mod vdw_tables {
        use super::*;

        #[test]
        fn tables_are_triangular_and_owned_by_the_lower_class() {
            let mut params = setup();
            params.build_vdw_tables();

            let c0 = params.atom_class(0).unwrap();
            let c1 = params.atom_class(1).unwrap();
            assert_eq!(c0.vdw_dij.len(), 2);
            assert_eq!(c1.vdw_dij.len(), 1);

            // Like-pair entries are the plain doubled radius.
            assert!(close(c0.vdw_dij[0], 2.0 * 1.9));
            assert!(close(c1.vdw_dij[0], 2.0 * 1.5));
        }

        #[test]
        fn vdw_pair_is_symmetric_in_its_arguments() {
            let mut params = setup();
            params.build_vdw_tables();
            assert_eq!(params.vdw_pair(0, 1), params.vdw_pair(1, 0));
            let (dij, eij) = params.vdw_pair(0, 1).unwrap();
            assert!(dij.is_finite() && eij.is_finite());
        }

        #[test]
        fn invalidate_clears_the_tables() {
            let mut params = setup();
            params.build_vdw_tables();
            params.invalidate_topological_caches();
            assert!(params.atom_class(0).unwrap().vdw_dij.is_empty());
            assert_eq!(params.vdw_pair(0, 1), None);
        }

        #[test]
        fn gaps_in_the_class_table_stay_nan() {
            let mut params = ParameterSet::new();
            params.define_atom_class(0, "A", 6, 4, 1.9, 0.1).unwrap();
            params.define_atom_class(2, "B", 1, 1, 1.5, 0.02).unwrap();
            params.build_vdw_tables();

            let c0 = params.atom_class(0).unwrap();
            assert!(c0.vdw_dij[1].is_nan()); // class 1 does not exist
            assert!(c0.vdw_dij[2].is_finite());
        }
    }
}
