use super::ids::{AtomId, BodyId, ChargedTypeId};
use crate::core::forcefield::params::{BondBend, BondStretch, BondTorsion};
use nalgebra::Point3;

/// An atom id paired with its station in some local frame.
///
/// Used both for cluster placements and for the flattened per-body atom
/// lists built during compilation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtomPlacement {
    pub atom: AtomId,
    pub station: Point3<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    // --- Topological state, filled in during construction ---
    pub id: AtomId,
    pub charged_type: ChargedTypeId,
    /// Directly bonded (1-2) neighbors. Sorted and deduplicated by the
    /// compilation pass.
    pub bond12: Vec<AtomId>,

    /// The rigid body this atom ends up on, once it (or a containing
    /// cluster) has been attached.
    pub body: Option<BodyId>,
    /// The atom's station fixed in its body's frame.
    pub station_b: Point3<f64>,

    // --- Topological cache, rebuilt by the compilation pass ---
    //
    // Shortest-path neighbor tuples through the bond graph. This atom is
    // always the implicit "1" so it is not stored; interior atoms are kept
    // so the bonded kernels can recover the full geometry.
    pub bond13: Vec<(AtomId, AtomId)>,
    pub bond14: Vec<(AtomId, AtomId, AtomId)>,
    pub bond15: Vec<(AtomId, AtomId, AtomId, AtomId)>,

    // Cross-body subsets of the lists above: only tuples with at least one
    // atom on a different body than this one. Each bonded term appears in
    // the lists of both end atoms; the dynamics pass processes it once, from
    // the lower-numbered end. Both copies are still needed for the
    // nonbonded scaling masks.
    pub xbond12: Vec<AtomId>,
    pub xbond13: Vec<(AtomId, AtomId)>,
    pub xbond14: Vec<(AtomId, AtomId, AtomId)>,
    pub xbond15: Vec<(AtomId, AtomId, AtomId, AtomId)>,

    /// Bound stretch parameters, aligned 1:1 with `xbond12`.
    pub stretch: Vec<BondStretch>,
    /// Bound bend parameters, aligned 1:1 with `xbond13`.
    pub bend: Vec<BondBend>,
    /// Bound torsion parameters, aligned 1:1 with `xbond14`.
    pub torsion: Vec<BondTorsion>,
}

impl Atom {
    pub fn new(id: AtomId, charged_type: ChargedTypeId) -> Self {
        Self {
            id,
            charged_type,
            bond12: Vec::new(),
            body: None,
            station_b: Point3::origin(),
            bond13: Vec::new(),
            bond14: Vec::new(),
            bond15: Vec::new(),
            xbond12: Vec::new(),
            xbond13: Vec::new(),
            xbond14: Vec::new(),
            xbond15: Vec::new(),
            stretch: Vec::new(),
            bend: Vec::new(),
            torsion: Vec::new(),
        }
    }

    pub fn is_bonded_to(&self, other: AtomId) -> bool {
        self.bond12.contains(&other)
    }

    pub fn is_attached_to_body(&self) -> bool {
        self.body.is_some()
    }

    pub(crate) fn attach_to_body(&mut self, body: BodyId, station: Point3<f64>) {
        debug_assert!(!self.is_attached_to_body());
        self.body = Some(body);
        self.station_b = station;
    }

    /// Clears everything derived by the compilation pass, returning the atom
    /// to its declared (construction-time) state.
    pub(crate) fn invalidate_topological_cache(&mut self) {
        self.body = None;
        self.station_b = Point3::origin();
        self.bond13.clear();
        self.bond14.clear();
        self.bond15.clear();
        self.xbond12.clear();
        self.xbond13.clear();
        self.xbond14.clear();
        self.xbond15.clear();
        self.stretch.clear();
        self.bend.clear();
        self.torsion.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_atom_is_unattached_with_empty_caches() {
        let atom = Atom::new(3, 1);
        assert_eq!(atom.id, 3);
        assert_eq!(atom.charged_type, 1);
        assert!(!atom.is_attached_to_body());
        assert!(atom.bond12.is_empty());
        assert!(atom.bond13.is_empty());
        assert!(atom.stretch.is_empty());
    }

    #[test]
    fn attach_to_body_records_body_and_station() {
        let mut atom = Atom::new(0, 0);
        atom.attach_to_body(4, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(atom.body, Some(4));
        assert_eq!(atom.station_b, Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn invalidate_clears_body_and_derived_lists() {
        let mut atom = Atom::new(0, 0);
        atom.attach_to_body(1, Point3::new(1.0, 0.0, 0.0));
        atom.bond13.push((1, 2));
        atom.xbond12.push(1);

        atom.invalidate_topological_cache();

        assert!(!atom.is_attached_to_body());
        assert!(atom.bond13.is_empty());
        assert!(atom.xbond12.is_empty());
    }

    #[test]
    fn is_bonded_to_checks_direct_neighbors_only() {
        let mut atom = Atom::new(0, 0);
        atom.bond12 = vec![1, 2];
        assert!(atom.is_bonded_to(1));
        assert!(!atom.is_bonded_to(3));
    }
}
