//! The one-shot topological compilation pass.
//!
//! Compilation turns the declared topology (atoms, bonds, cluster
//! placements, body attachments, parameter tables) into the caches the
//! per-step kernel runs on: per-pair vdW mixing tables, flattened per-body
//! atom lists, per-atom body stations, shortest-path 1-3/1-4/1-5 neighbor
//! tuples with their cross-body projections, and bonded parameters bound to
//! every cross-body entry. It always starts by invalidating everything, so
//! running it again after a topology change is safe and running it twice in
//! a row is a no-op by construction.

use crate::core::forcefield::params::{ClassPair, ClassQuad, ClassTriple, ParameterSet};
use crate::core::models::ids::{AtomClassId, AtomId};
use crate::core::models::system::MolecularSystem;
use crate::engine::error::EngineError;
use std::collections::HashSet;
use tracing::{debug, info};

pub(crate) fn realize_topology(
    system: &mut MolecularSystem,
    params: &mut ParameterSet,
) -> Result<(), EngineError> {
    debug!(
        atoms = system.n_atoms(),
        bonds = system.n_bonds(),
        "compiling force field topology"
    );

    system.invalidate_topological_caches();
    params.invalidate_topological_caches();

    params.build_vdw_tables();

    system.realize_body_caches();
    system.assign_atom_bodies()?;

    for atom in 0..system.n_atoms() {
        expand_neighbor_lists(system, atom);
        bind_bonded_parameters(system, params, atom)?;
    }

    info!(
        atoms = system.n_atoms(),
        bonds = system.n_bonds(),
        bodies = system.bodies().iter().flatten().count(),
        "force field topology compiled"
    );
    Ok(())
}

/// Chases the bond graph outward from one atom, recording every reachable
/// atom at its *shortest* bond distance only, then projects out the tuples
/// that cross a body boundary.
///
/// The visited set is seeded with the atom and its direct neighbors, and
/// each ring of the expansion consumes it, so an atom reachable both three
/// and four bonds away lands only in the 1-3 list.
fn expand_neighbor_lists(system: &mut MolecularSystem, atom: AtomId) {
    system.atoms_mut()[atom].bond12.sort_unstable();

    let atoms = system.atoms();
    let a = &atoms[atom];

    let mut visited: HashSet<AtomId> = HashSet::new();
    visited.insert(atom);
    visited.extend(a.bond12.iter().copied());

    let mut bond13 = Vec::new();
    for &b in &a.bond12 {
        for &c in &atoms[b].bond12 {
            if visited.insert(c) {
                bond13.push((b, c));
            }
        }
    }
    bond13.sort_unstable();

    let mut bond14 = Vec::new();
    for &(b, c) in &bond13 {
        for &d in &atoms[c].bond12 {
            if visited.insert(d) {
                bond14.push((b, c, d));
            }
        }
    }
    bond14.sort_unstable();

    let mut bond15 = Vec::new();
    for &(b, c, d) in &bond14 {
        for &e in &atoms[d].bond12 {
            if visited.insert(e) {
                bond15.push((b, c, d, e));
            }
        }
    }
    bond15.sort_unstable();

    // Keep only the tuples reaching at least one foreign body; those are
    // the ones that produce bonded forces and nonbonded scaling.
    let home = a.body;
    let xbond12: Vec<_> = a
        .bond12
        .iter()
        .copied()
        .filter(|&b| atoms[b].body != home)
        .collect();
    let xbond13: Vec<_> = bond13
        .iter()
        .copied()
        .filter(|&(b, c)| atoms[b].body != home || atoms[c].body != home)
        .collect();
    let xbond14: Vec<_> = bond14
        .iter()
        .copied()
        .filter(|&(b, c, d)| {
            atoms[b].body != home || atoms[c].body != home || atoms[d].body != home
        })
        .collect();
    let xbond15: Vec<_> = bond15
        .iter()
        .copied()
        .filter(|&(b, c, d, e)| {
            atoms[b].body != home
                || atoms[c].body != home
                || atoms[d].body != home
                || atoms[e].body != home
        })
        .collect();

    let a = &mut system.atoms_mut()[atom];
    a.bond13 = bond13;
    a.bond14 = bond14;
    a.bond15 = bond15;
    a.xbond12 = xbond12;
    a.xbond13 = xbond13;
    a.xbond14 = xbond14;
    a.xbond15 = xbond15;
}

/// Resolves stretch, bend, and torsion parameters for every cross-body
/// entry of one atom, by the canonical class tuple. A molecule that uses a
/// class tuple with no defined parameters is a compile error.
fn bind_bonded_parameters(
    system: &mut MolecularSystem,
    params: &ParameterSet,
    atom: AtomId,
) -> Result<(), EngineError> {
    let atoms = system.atoms();
    let class = |id: AtomId| -> AtomClassId {
        params
            .charged_type(atoms[id].charged_type)
            .expect("charged types are validated when atoms are added")
            .atom_class
    };
    let a = &atoms[atom];
    let ca = class(atom);

    let mut stretch = Vec::with_capacity(a.xbond12.len());
    for &b in &a.xbond12 {
        let cb = class(b);
        let entry = params
            .bond_stretch(ca, cb)
            .ok_or(EngineError::MissingStretch {
                key: ClassPair::new(ca, cb),
                atom1: atom,
                atom2: b,
            })?;
        stretch.push(*entry);
    }

    let mut bend = Vec::with_capacity(a.xbond13.len());
    for &(b, c) in &a.xbond13 {
        let (cb, cc) = (class(b), class(c));
        let entry = params
            .bond_bend(ca, cb, cc)
            .ok_or(EngineError::MissingBend {
                key: ClassTriple::new(ca, cb, cc),
                center: b,
            })?;
        bend.push(*entry);
    }

    let mut torsion = Vec::with_capacity(a.xbond14.len());
    for &(b, c, d) in &a.xbond14 {
        let (cb, cc, cd) = (class(b), class(c), class(d));
        let entry = params
            .bond_torsion(ca, cb, cc, cd)
            .ok_or(EngineError::MissingTorsion {
                key: ClassQuad::new(ca, cb, cc, cd),
                atom1: atom,
            })?
            .clone();
        torsion.push(entry);
    }

    let a = &mut system.atoms_mut()[atom];
    a.stretch = stretch;
    a.bend = bend;
    a.torsion = torsion;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::system::StructureError;
    use nalgebra::Point3;

    /// One class, one neutral type, and full bonded parameters for the
    /// all-same-class tuples.
    fn simple_params() -> ParameterSet {
        let mut params = ParameterSet::new();
        params.define_atom_class(0, "X", 6, 4, 1.9, 0.1).unwrap();
        params.define_charged_atom_type(0, "X0", 0, 0.0).unwrap();
        params.define_bond_stretch(0, 0, 300.0, 1.5).unwrap();
        params.define_bond_bend(0, 0, 0, 50.0, 109.5).unwrap();
        params
            .define_bond_torsion(0, 0, 0, 0, &[(3, 0.2, 0.0)])
            .unwrap();
        params
    }

    /// A linear chain of `n` atoms, each attached to its own station on the
    /// body split given by `body_of`.
    fn chain(n: usize, body_of: impl Fn(usize) -> usize) -> MolecularSystem {
        let mut system = MolecularSystem::new();
        for i in 0..n {
            let atom = system.add_atom(0);
            system
                .attach_atom_to_body(atom, body_of(i), Point3::new(i as f64, 0.0, 0.0))
                .unwrap();
        }
        for i in 1..n {
            system.add_bond(i - 1, i).unwrap();
        }
        system
    }

    mod neighbor_expansion {
        use super::*;

        #[test]
        fn chain_produces_the_expected_tuples() {
            let mut system = chain(5, |_| 0);
            let mut params = simple_params();
            realize_topology(&mut system, &mut params).unwrap();

            let a0 = system.atom(0).unwrap();
            assert_eq!(a0.bond12, vec![1]);
            assert_eq!(a0.bond13, vec![(1, 2)]);
            assert_eq!(a0.bond14, vec![(1, 2, 3)]);
            assert_eq!(a0.bond15, vec![(1, 2, 3, 4)]);

            let a2 = system.atom(2).unwrap();
            assert_eq!(a2.bond12, vec![1, 3]);
            assert_eq!(a2.bond13, vec![(1, 0), (3, 4)]);
            assert!(a2.bond14.is_empty());
        }

        #[test]
        fn ring_records_each_atom_at_its_shortest_distance_only() {
            // A 4-ring: 0-1-2-3-0. Atom 2 is two bonds from atom 0 along
            // both directions, and must appear exactly once, as a 1-3.
            let mut system = chain(4, |_| 0);
            system.add_bond(3, 0).unwrap();
            let mut params = simple_params();
            realize_topology(&mut system, &mut params).unwrap();

            let a0 = system.atom(0).unwrap();
            assert_eq!(a0.bond12, vec![1, 3]);
            assert_eq!(a0.bond13, vec![(1, 2)]);
            assert!(a0.bond14.is_empty());
            assert!(a0.bond15.is_empty());

            let mut seen = vec![0usize; 4];
            seen[0] += 1;
            for &b in &a0.bond12 {
                seen[b] += 1;
            }
            for &(_, c) in &a0.bond13 {
                seen[c] += 1;
            }
            assert_eq!(seen, vec![1, 1, 1, 1]);
        }

        #[test]
        fn branched_atom_sorts_tuples_lexicographically() {
            // Atom 0 bonded to 3 and 1; 1 bonded to 4 and 2.
            let mut system = MolecularSystem::new();
            for i in 0..5 {
                let atom = system.add_atom(0);
                system
                    .attach_atom_to_body(atom, 0, Point3::new(i as f64, 0.0, 0.0))
                    .unwrap();
            }
            system.add_bond(0, 3).unwrap();
            system.add_bond(0, 1).unwrap();
            system.add_bond(1, 4).unwrap();
            system.add_bond(1, 2).unwrap();
            let mut params = simple_params();
            realize_topology(&mut system, &mut params).unwrap();

            let a0 = system.atom(0).unwrap();
            assert_eq!(a0.bond12, vec![1, 3]);
            assert_eq!(a0.bond13, vec![(1, 2), (1, 4)]);
        }
    }

    mod cross_body_projection {
        use super::*;

        #[test]
        fn same_body_tuples_are_filtered_out() {
            // a-b-c-d with a,b on body 0 and c,d on body 1.
            let mut system = chain(4, |i| if i < 2 { 0 } else { 1 });
            let mut params = simple_params();
            realize_topology(&mut system, &mut params).unwrap();

            let a = system.atom(0).unwrap();
            assert!(a.xbond12.is_empty()); // 0-1 stays on body 0
            assert_eq!(a.xbond13, vec![(1, 2)]);
            assert_eq!(a.xbond14, vec![(1, 2, 3)]);

            let b = system.atom(1).unwrap();
            assert_eq!(b.xbond12, vec![2]);
            assert_eq!(b.xbond13, vec![(2, 3)]);

            let c = system.atom(2).unwrap();
            assert_eq!(c.xbond12, vec![1]);
            // Both tuples of c reach body 0.
            assert_eq!(c.xbond13, vec![(1, 0)]);
        }

        #[test]
        fn single_body_molecule_has_no_cross_body_entries() {
            let mut system = chain(4, |_| 0);
            let mut params = simple_params();
            realize_topology(&mut system, &mut params).unwrap();

            for atom in system.atoms() {
                assert!(atom.xbond12.is_empty());
                assert!(atom.xbond13.is_empty());
                assert!(atom.xbond14.is_empty());
                assert!(atom.xbond15.is_empty());
                assert!(atom.stretch.is_empty());
            }
        }
    }

    mod parameter_binding {
        use super::*;

        #[test]
        fn cross_body_entries_get_their_parameters() {
            let mut system = chain(4, |i| if i < 2 { 0 } else { 1 });
            let mut params = simple_params();
            realize_topology(&mut system, &mut params).unwrap();

            let b = system.atom(1).unwrap();
            assert_eq!(b.stretch.len(), b.xbond12.len());
            assert_eq!(b.bend.len(), b.xbond13.len());
            assert_eq!(b.torsion.len(), b.xbond14.len());
            assert_eq!(b.stretch[0].d0, 1.5);
        }

        #[test]
        fn missing_stretch_aborts_compilation() {
            let mut system = chain(2, |i| i);
            let mut params = ParameterSet::new();
            params.define_atom_class(0, "X", 6, 4, 1.9, 0.1).unwrap();
            params.define_charged_atom_type(0, "X0", 0, 0.0).unwrap();

            let err = realize_topology(&mut system, &mut params).unwrap_err();
            assert_eq!(
                err,
                EngineError::MissingStretch {
                    key: ClassPair::new(0, 0),
                    atom1: 0,
                    atom2: 1,
                }
            );
        }

        #[test]
        fn missing_torsion_names_the_class_quad() {
            let mut system = chain(4, |i| if i < 2 { 0 } else { 1 });
            let mut params = ParameterSet::new();
            params.define_atom_class(0, "X", 6, 4, 1.9, 0.1).unwrap();
            params.define_charged_atom_type(0, "X0", 0, 0.0).unwrap();
            params.define_bond_stretch(0, 0, 300.0, 1.5).unwrap();
            params.define_bond_bend(0, 0, 0, 50.0, 109.5).unwrap();

            let err = realize_topology(&mut system, &mut params).unwrap_err();
            assert_eq!(
                err,
                EngineError::MissingTorsion {
                    key: ClassQuad::new(0, 0, 0, 0),
                    atom1: 0,
                }
            );
        }
    }

    mod whole_pass {
        use super::*;

        #[test]
        fn unattached_atom_fails_compilation() {
            let mut system = MolecularSystem::new();
            system.add_atom(0);
            let mut params = simple_params();

            let err = realize_topology(&mut system, &mut params).unwrap_err();
            assert_eq!(
                err,
                EngineError::Structure(StructureError::AtomNotAttached(0))
            );
        }

        #[test]
        fn compilation_is_idempotent() {
            let mut system = chain(4, |i| if i < 2 { 0 } else { 1 });
            let mut params = simple_params();

            realize_topology(&mut system, &mut params).unwrap();
            let system_snapshot = system.clone();
            let params_snapshot = params.clone();

            realize_topology(&mut system, &mut params).unwrap();
            assert_eq!(system, system_snapshot);
            assert_eq!(params, params_snapshot);
        }

        #[test]
        fn vdw_tables_are_rebuilt_by_the_pass() {
            let mut system = chain(2, |_| 0);
            let mut params = simple_params();
            realize_topology(&mut system, &mut params).unwrap();
            let (dij, eij) = params.vdw_pair(0, 0).unwrap();
            assert!((dij - 3.8).abs() < 1e-12);
            assert!(eij > 0.0);
        }
    }
}
