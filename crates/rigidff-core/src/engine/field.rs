use crate::core::forcefield::elements::Element;
use crate::core::forcefield::params::{ParameterError, ParameterSet};
use crate::core::forcefield::term::{EnergyTerm, SpatialForce};
use crate::core::models::ids::{AtomClassId, AtomId, BodyId, BondId, ChargedTypeId, ClusterId};
use crate::core::models::system::{MolecularSystem, StructureError};
use crate::engine::dynamics::accumulate_forces;
use crate::engine::error::EngineError;
use crate::engine::realize::realize_topology;
use itertools::Itertools;
use nalgebra::{Isometry3, Point3};
use std::fmt;

/// The force field: parameter catalogs plus the declared molecule, and the
/// compile/evaluate cycle that turns body configurations into forces.
///
/// Construction is declarative and append-only: define parameters, add
/// atoms and bonds, group atoms into clusters, attach clusters to the
/// rigid bodies of the surrounding multibody system. The first call to
/// [`evaluate`](Self::evaluate) (or an explicit
/// [`realize_topology`](Self::realize_topology)) compiles the topology
/// into caches; any later mutation invalidates them and the next
/// realization rebuilds everything from scratch.
///
/// Every method validates its arguments eagerly and returns a structured
/// error without mutating anything on failure.
#[derive(Debug, Clone)]
pub struct ForceField {
    params: ParameterSet,
    system: MolecularSystem,
    topology_valid: bool,
}

impl Default for ForceField {
    fn default() -> Self {
        Self::new()
    }
}

impl ForceField {
    /// Creates an empty force field with the built-in element table.
    pub fn new() -> Self {
        Self {
            params: ParameterSet::new(),
            system: MolecularSystem::new(),
            topology_valid: false,
        }
    }

    /// Read access to the parameter catalogs.
    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    /// Read access to the molecular system.
    pub fn system(&self) -> &MolecularSystem {
        &self.system
    }

    // --- Parameter definition ---

    /// Registers an element beyond the built-in table.
    pub fn define_element(&mut self, element: Element) -> Result<(), EngineError> {
        self.params.define_element(element)?;
        self.topology_valid = false;
        Ok(())
    }

    /// Defines an atom class; see
    /// [`ParameterSet::define_atom_class`].
    pub fn define_atom_class(
        &mut self,
        id: AtomClassId,
        name: &str,
        element: usize,
        valence: usize,
        vdw_radius: f64,
        vdw_well_depth_kcal: f64,
    ) -> Result<(), EngineError> {
        self.params
            .define_atom_class(id, name, element, valence, vdw_radius, vdw_well_depth_kcal)?;
        self.topology_valid = false;
        Ok(())
    }

    /// Defines a charged atom type; see
    /// [`ParameterSet::define_charged_atom_type`].
    pub fn define_charged_atom_type(
        &mut self,
        id: ChargedTypeId,
        name: &str,
        atom_class: AtomClassId,
        partial_charge: f64,
    ) -> Result<(), EngineError> {
        self.params
            .define_charged_atom_type(id, name, atom_class, partial_charge)?;
        self.topology_valid = false;
        Ok(())
    }

    /// Defines a harmonic stretch term for a class pair; see
    /// [`ParameterSet::define_bond_stretch`].
    pub fn define_bond_stretch(
        &mut self,
        class1: AtomClassId,
        class2: AtomClassId,
        stiffness_kcal: f64,
        nominal_length: f64,
    ) -> Result<(), EngineError> {
        self.params
            .define_bond_stretch(class1, class2, stiffness_kcal, nominal_length)?;
        self.topology_valid = false;
        Ok(())
    }

    /// Defines a harmonic bend term for a class triple; see
    /// [`ParameterSet::define_bond_bend`].
    pub fn define_bond_bend(
        &mut self,
        class1: AtomClassId,
        class2: AtomClassId,
        class3: AtomClassId,
        stiffness_kcal: f64,
        nominal_angle_deg: f64,
    ) -> Result<(), EngineError> {
        self.params.define_bond_bend(
            class1,
            class2,
            class3,
            stiffness_kcal,
            nominal_angle_deg,
        )?;
        self.topology_valid = false;
        Ok(())
    }

    /// Defines the periodic torsion for a class quad; see
    /// [`ParameterSet::define_bond_torsion`].
    pub fn define_bond_torsion(
        &mut self,
        class1: AtomClassId,
        class2: AtomClassId,
        class3: AtomClassId,
        class4: AtomClassId,
        terms: &[(usize, f64, f64)],
    ) -> Result<(), EngineError> {
        self.params
            .define_bond_torsion(class1, class2, class3, class4, terms)?;
        self.topology_valid = false;
        Ok(())
    }

    /// Sets the vdW scale factors for 1-2 through 1-5 bonded pairs.
    pub fn set_vdw_scale_factors(
        &mut self,
        s12: f64,
        s13: f64,
        s14: f64,
        s15: f64,
    ) -> Result<(), EngineError> {
        self.params.set_vdw_scale_factors(s12, s13, s14, s15)?;
        Ok(())
    }

    /// Sets the Coulomb scale factors for 1-2 through 1-5 bonded pairs.
    pub fn set_coulomb_scale_factors(
        &mut self,
        s12: f64,
        s13: f64,
        s14: f64,
        s15: f64,
    ) -> Result<(), EngineError> {
        self.params.set_coulomb_scale_factors(s12, s13, s14, s15)?;
        Ok(())
    }

    // --- Molecule construction ---

    /// Adds an atom of a previously defined charged type and returns its
    /// id.
    pub fn add_atom(&mut self, charged_type: ChargedTypeId) -> Result<AtomId, EngineError> {
        if self.params.charged_type(charged_type).is_none() {
            return Err(ParameterError::UnknownChargedType(charged_type).into());
        }
        self.topology_valid = false;
        Ok(self.system.add_atom(charged_type))
    }

    /// Adds a covalent bond; adding an existing bond returns the original
    /// id.
    pub fn add_bond(&mut self, atom1: AtomId, atom2: AtomId) -> Result<BondId, EngineError> {
        let bond = self.system.add_bond(atom1, atom2)?;
        self.topology_valid = false;
        Ok(bond)
    }

    /// Creates an empty, unattached cluster.
    pub fn create_cluster(&mut self, name: &str) -> ClusterId {
        self.topology_valid = false;
        self.system.create_cluster(name)
    }

    /// Places an atom in a top-level cluster at a fixed station.
    pub fn place_atom_in_cluster(
        &mut self,
        atom: AtomId,
        cluster: ClusterId,
        station: Point3<f64>,
    ) -> Result<(), EngineError> {
        self.system.place_atom_in_cluster(atom, cluster, station)?;
        self.topology_valid = false;
        Ok(())
    }

    /// Places a child cluster in a top-level parent cluster.
    pub fn place_cluster_in_cluster(
        &mut self,
        child: ClusterId,
        parent: ClusterId,
        placement: Isometry3<f64>,
    ) -> Result<(), EngineError> {
        self.system
            .place_cluster_in_cluster(child, parent, placement)?;
        self.topology_valid = false;
        Ok(())
    }

    /// Attaches a cluster to a rigid body of the multibody system.
    pub fn attach_cluster_to_body(
        &mut self,
        cluster: ClusterId,
        body: BodyId,
        placement: Isometry3<f64>,
    ) -> Result<(), EngineError> {
        self.system.attach_cluster_to_body(cluster, body, placement)?;
        self.topology_valid = false;
        Ok(())
    }

    /// Attaches a single atom to a rigid body at a fixed station.
    pub fn attach_atom_to_body(
        &mut self,
        atom: AtomId,
        body: BodyId,
        station: Point3<f64>,
    ) -> Result<(), EngineError> {
        self.system.attach_atom_to_body(atom, body, station)?;
        self.topology_valid = false;
        Ok(())
    }

    // --- Queries ---

    pub fn n_atoms(&self) -> usize {
        self.system.n_atoms()
    }

    pub fn n_bonds(&self) -> usize {
        self.system.n_bonds()
    }

    /// The canonical (lower, higher) atom pair of a bond.
    pub fn bond_atoms(&self, bond: BondId) -> Result<(AtomId, AtomId), EngineError> {
        let bond = self
            .system
            .bond(bond)
            .ok_or(StructureError::UnknownBond(bond))?;
        Ok((bond.atom1, bond.atom2))
    }

    /// The charged atom type an atom was created with.
    pub fn atom_charged_type(&self, atom: AtomId) -> Result<ChargedTypeId, EngineError> {
        Ok(self.checked_atom(atom)?.charged_type)
    }

    /// The atom class behind an atom's charged type.
    pub fn atom_class_id(&self, atom: AtomId) -> Result<AtomClassId, EngineError> {
        let charged_type = self.atom_charged_type(atom)?;
        Ok(self
            .params
            .charged_type(charged_type)
            .ok_or(ParameterError::UnknownChargedType(charged_type))?
            .atom_class)
    }

    /// Mass of an atom, from its element, in Da.
    pub fn atom_mass(&self, atom: AtomId) -> Result<f64, EngineError> {
        Ok(self.atom_element(atom)?.mass)
    }

    /// Default display color of an atom, from its element.
    pub fn atom_default_color(&self, atom: AtomId) -> Result<[f64; 3], EngineError> {
        Ok(self.atom_element(atom)?.default_color)
    }

    /// Van der Waals radius of an atom, from its class, in Å.
    pub fn atom_radius(&self, atom: AtomId) -> Result<f64, EngineError> {
        let class = self.atom_class_id(atom)?;
        Ok(self
            .params
            .atom_class(class)
            .ok_or(ParameterError::UnknownAtomClass(class))?
            .vdw_radius)
    }

    /// The body an atom is attached to.
    pub fn atom_body(&self, atom: AtomId) -> Result<BodyId, EngineError> {
        self.checked_atom(atom)?
            .body
            .ok_or_else(|| StructureError::AtomNotAttached(atom).into())
    }

    /// The atom's station in its body's frame.
    pub fn atom_station_on_body(&self, atom: AtomId) -> Result<Point3<f64>, EngineError> {
        let a = self.checked_atom(atom)?;
        if a.body.is_none() {
            return Err(StructureError::AtomNotAttached(atom).into());
        }
        Ok(a.station_b)
    }

    /// The atom's station in the given cluster's frame.
    pub fn atom_station_in_cluster(
        &self,
        atom: AtomId,
        cluster: ClusterId,
    ) -> Result<Point3<f64>, EngineError> {
        Ok(self.system.atom_station_in_cluster(atom, cluster)?)
    }

    // --- Realization and dynamics ---

    /// Compiles the declared topology into the caches the step kernel runs
    /// on. Idempotent: once compiled, calls are no-ops until a parameter
    /// or structure mutation invalidates the caches.
    pub fn realize_topology(&mut self) -> Result<(), EngineError> {
        if self.topology_valid {
            return Ok(());
        }
        realize_topology(&mut self.system, &mut self.params)?;
        self.topology_valid = true;
        Ok(())
    }

    /// Evaluates one dynamics step: realizes the topology if needed, then
    /// adds every bonded and nonbonded contribution into the caller-owned
    /// accumulators.
    ///
    /// # Arguments
    ///
    /// * `body_transforms` - Body-to-ground transforms, indexed by body id;
    ///   must cover every body that owns atoms.
    /// * `forces` - Per-body spatial force accumulators, indexed by body
    ///   id; contributions are added, the caller zeroes them per step.
    /// * `potential_energy` - Scalar energy accumulator, added to.
    ///
    /// # Return
    ///
    /// The energy added this call, broken down by term.
    pub fn evaluate(
        &mut self,
        body_transforms: &[Isometry3<f64>],
        forces: &mut [SpatialForce],
        potential_energy: &mut f64,
    ) -> Result<EnergyTerm, EngineError> {
        self.realize_topology()?;
        let energy = accumulate_forces(&self.system, &self.params, body_transforms, forces)?;
        *potential_energy += energy.total();
        Ok(energy)
    }

    /// The human-readable multi-section dump of the whole subsystem.
    pub fn dump(&self) -> String {
        self.to_string()
    }

    fn checked_atom(&self, atom: AtomId) -> Result<&crate::core::models::atom::Atom, EngineError> {
        self.system
            .atom(atom)
            .ok_or_else(|| StructureError::UnknownAtom(atom).into())
    }

    fn atom_element(&self, atom: AtomId) -> Result<&Element, EngineError> {
        let class_id = self.atom_class_id(atom)?;
        let class = self
            .params
            .atom_class(class_id)
            .ok_or(ParameterError::UnknownAtomClass(class_id))?;
        self.params
            .element(class.element)
            .ok_or_else(|| ParameterError::UnknownElement(class.element).into())
    }
}

fn fmt_point(p: &Point3<f64>) -> String {
    format!("({:.4}, {:.4}, {:.4})", p.x, p.y, p.z)
}

impl fmt::Display for ForceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let system = &self.system;
        let n_bodies = system.bodies().iter().flatten().count();
        writeln!(
            f,
            "force field: {} bodies, {} clusters, {} atoms, {} bonds, topology {}",
            n_bodies,
            system.clusters().len(),
            system.n_atoms(),
            system.n_bonds(),
            if self.topology_valid { "compiled" } else { "not compiled" },
        )?;

        for (id, entry) in system.bodies().iter().enumerate() {
            let Some(body) = entry else { continue };
            writeln!(
                f,
                "  body {id}: cluster {}, atoms: {}",
                body.cluster,
                body.all_atoms
                    .iter()
                    .map(|p| format!("{}{}", p.atom, fmt_point(&p.station)))
                    .format(" ")
            )?;
        }

        for cluster in system.clusters() {
            write!(f, "  cluster {} '{}'", cluster.id, cluster.name)?;
            match cluster.body {
                Some(body) => writeln!(f, " attached to body {body}")?,
                None => writeln!(f, " unattached")?,
            }
            if !cluster.direct_atoms.is_empty() {
                writeln!(
                    f,
                    "    direct atoms: {}",
                    cluster
                        .direct_atoms
                        .iter()
                        .map(|(atom, station)| format!("{atom}{}", fmt_point(station)))
                        .format(" ")
                )?;
            }
            if !cluster.direct_clusters.is_empty() {
                writeln!(
                    f,
                    "    direct clusters: {}",
                    cluster.direct_clusters.keys().format(", ")
                )?;
            }
            if !cluster.parents.is_empty() {
                writeln!(f, "    parents: {}", cluster.parents.iter().format(", "))?;
            }
        }

        for atom in system.atoms() {
            write!(f, "  atom {}: type {}", atom.id, atom.charged_type)?;
            match atom.body {
                Some(body) => writeln!(f, ", body {body} at {}", fmt_point(&atom.station_b))?,
                None => writeln!(f, ", unattached")?,
            }
            writeln!(f, "    bond 1-2: {}", atom.bond12.iter().format(" "))?;
            writeln!(
                f,
                "    bond 1-3: {}",
                atom.bond13
                    .iter()
                    .map(|(b, c)| format!("{b}-{c}"))
                    .format(" ")
            )?;
            writeln!(
                f,
                "    bond 1-4: {}",
                atom.bond14
                    .iter()
                    .map(|(b, c, d)| format!("{b}-{c}-{d}"))
                    .format(" ")
            )?;
            writeln!(
                f,
                "    bond 1-5: {}",
                atom.bond15
                    .iter()
                    .map(|(b, c, d, e)| format!("{b}-{c}-{d}-{e}"))
                    .format(" ")
            )?;
            writeln!(f, "    xbond 1-2: {}", atom.xbond12.iter().format(" "))?;
            writeln!(
                f,
                "    stretch: {}",
                atom.stretch
                    .iter()
                    .map(|s| format!("(k={:.6}, d0={})", s.k, s.d0))
                    .format(" ")
            )?;
            writeln!(
                f,
                "    bend: {}",
                atom.bend
                    .iter()
                    .map(|b| format!("(k={:.6}, theta0={:.6})", b.k, b.theta0))
                    .format(" ")
            )?;
            writeln!(
                f,
                "    torsion: {}",
                atom.torsion
                    .iter()
                    .map(|t| {
                        t.terms
                            .iter()
                            .map(|term| {
                                format!(
                                    "({}:{:.6},{:.6})",
                                    term.periodicity, term.amplitude, term.phase
                                )
                            })
                            .join("+")
                    })
                    .format(" ")
            )?;
        }

        for class in self.params.atom_classes() {
            writeln!(
                f,
                "  atom class {} '{}': element {}, valence {}, vdw radius {}, vdw well depth {:.6}",
                class.id, class.name, class.element, class.valence, class.vdw_radius,
                class.vdw_well_depth,
            )?;
            if !class.vdw_dij.is_empty() {
                writeln!(
                    f,
                    "    vdw dij: {}",
                    class.vdw_dij.iter().map(|d| format!("{d:.4}")).format(" ")
                )?;
            }
        }

        for charged_type in self.params.charged_types() {
            writeln!(
                f,
                "  charged type {} '{}': class {}, charge {}",
                charged_type.id, charged_type.name, charged_type.atom_class,
                charged_type.partial_charge,
            )?;
        }
        Ok(())
    }
}
