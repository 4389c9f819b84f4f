use super::atom::Atom;
use super::body::Body;
use super::cluster::Cluster;
use super::ids::{AtomId, BodyId, BondId, ChargedTypeId, ClusterId, BASE_CLUSTER};
use super::topology::Bond;
use nalgebra::{Isometry3, Point3};
use thiserror::Error;

/// Errors raised by structural operations on a [`MolecularSystem`].
///
/// Every operation validates its arguments completely before touching any
/// state, so a returned error never leaves a partial mutation behind.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StructureError {
    #[error("atom {0} does not exist")]
    UnknownAtom(AtomId),

    #[error("bond {0} does not exist")]
    UnknownBond(BondId),

    #[error("cluster {0} does not exist")]
    UnknownCluster(ClusterId),

    #[error("body {0} does not exist")]
    UnknownBody(BodyId),

    #[error("cannot bond atom {0} to itself")]
    SelfBond(AtomId),

    #[error("atom {atom} is already contained in cluster {cluster}")]
    AtomAlreadyInCluster { atom: AtomId, cluster: ClusterId },

    #[error("atom {atom} is already attached to body {body}")]
    AtomAlreadyAttached { atom: AtomId, body: BodyId },

    #[error("cluster {cluster} is already attached to body {body}")]
    ClusterAlreadyAttached { cluster: ClusterId, body: BodyId },

    #[error("placing cluster {child} in cluster {parent} would create a containment cycle")]
    ContainmentCycle { parent: ClusterId, child: ClusterId },

    #[error("cluster {child} contains atom {atom}, which is already present in cluster {parent}")]
    OverlappingAtoms {
        parent: ClusterId,
        child: ClusterId,
        atom: AtomId,
    },

    #[error("cluster {0} has parents; placements must target a top-level cluster")]
    NotTopLevel(ClusterId),

    #[error("atom {atom} is not contained in cluster {cluster}")]
    AtomNotInCluster { atom: AtomId, cluster: ClusterId },

    #[error("atom {0} is not attached to any body")]
    AtomNotAttached(AtomId),
}

/// The arena owning the declared molecule: atoms with their bond graph,
/// clusters, and the rigid bodies atoms are partitioned onto.
///
/// The system is append-only during construction. Cluster placement and
/// body attachment maintain these invariants:
///
/// 1. an atom belongs to at most one body, through at most one attached
///    cluster hierarchy;
/// 2. cluster containment is acyclic;
/// 3. a cluster's transitive atom set is the union of its direct atoms and
///    the transform-composed atom sets of its direct children;
/// 4. once a cluster is attached, every transitively contained atom carries
///    its body id and the fully composed station in the body frame.
#[derive(Debug, Clone, PartialEq)]
pub struct MolecularSystem {
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    clusters: Vec<Cluster>,
    /// Indexed by the multibody system's body numbers; only entries for
    /// bodies that own atoms are populated.
    bodies: Vec<Option<Body>>,
}

impl Default for MolecularSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MolecularSystem {
    /// Creates an empty system. Cluster [`BASE_CLUSTER`] is reserved for
    /// free atoms and clusters that have not been placed anywhere yet.
    pub fn new() -> Self {
        Self {
            atoms: Vec::new(),
            bonds: Vec::new(),
            clusters: vec![Cluster::new(BASE_CLUSTER, "free atoms and clusters")],
            bodies: Vec::new(),
        }
    }

    // --- Access ---

    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub(crate) fn atoms_mut(&mut self) -> &mut [Atom] {
        &mut self.atoms
    }

    pub fn bond(&self, id: BondId) -> Option<&Bond> {
        self.bonds.get(id)
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn cluster(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.get(id)
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(id).and_then(|entry| entry.as_ref())
    }

    pub fn bodies(&self) -> &[Option<Body>] {
        &self.bodies
    }

    pub fn n_atoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn n_bonds(&self) -> usize {
        self.bonds.len()
    }

    /// Station of an atom expressed in the given cluster's frame.
    pub fn atom_station_in_cluster(
        &self,
        atom: AtomId,
        cluster: ClusterId,
    ) -> Result<Point3<f64>, StructureError> {
        self.check_atom(atom)?;
        let cluster_ref = self
            .cluster(cluster)
            .ok_or(StructureError::UnknownCluster(cluster))?;
        cluster_ref
            .all_atoms
            .get(&atom)
            .copied()
            .ok_or(StructureError::AtomNotInCluster { atom, cluster })
    }

    // --- Construction ---

    /// Adds an atom of the given charged type and returns its id. The type
    /// reference is validated by the caller against the parameter tables.
    pub fn add_atom(&mut self, charged_type: ChargedTypeId) -> AtomId {
        let id = self.atoms.len();
        self.atoms.push(Atom::new(id, charged_type));
        id
    }

    /// Adds a bond between two distinct atoms. Bonds are canonical
    /// (lower id first); adding an existing bond returns the original bond
    /// id without duplicating anything.
    pub fn add_bond(&mut self, atom1: AtomId, atom2: AtomId) -> Result<BondId, StructureError> {
        self.check_atom(atom1)?;
        self.check_atom(atom2)?;
        if atom1 == atom2 {
            return Err(StructureError::SelfBond(atom1));
        }

        let bond = Bond::new(atom1, atom2);
        if self.atoms[atom1].is_bonded_to(atom2) {
            let existing = self
                .bonds
                .iter()
                .position(|b| *b == bond)
                .expect("adjacency lists and bond list out of sync");
            return Ok(existing);
        }

        self.bonds.push(bond);
        self.atoms[atom1].bond12.push(atom2);
        self.atoms[atom2].bond12.push(atom1);
        Ok(self.bonds.len() - 1)
    }

    /// Creates a new, empty top-level cluster and returns its id.
    pub fn create_cluster(&mut self, name: &str) -> ClusterId {
        let id = self.clusters.len();
        self.clusters.push(Cluster::new(id, name));
        id
    }

    /// Places an atom in a cluster at a fixed station.
    ///
    /// Rejected when the atom is already attached to a body, the cluster
    /// already contains the atom, or the cluster is not top-level. If the
    /// cluster is body-attached, the atom is stamped with the body and its
    /// composed station immediately.
    pub fn place_atom_in_cluster(
        &mut self,
        atom: AtomId,
        cluster: ClusterId,
        station: Point3<f64>,
    ) -> Result<(), StructureError> {
        self.check_atom(atom)?;
        let cluster_ref = self
            .cluster(cluster)
            .ok_or(StructureError::UnknownCluster(cluster))?;

        if !cluster_ref.is_top_level() {
            return Err(StructureError::NotTopLevel(cluster));
        }
        if let Some(body) = self.atoms[atom].body {
            return Err(StructureError::AtomAlreadyAttached { atom, body });
        }
        if cluster_ref.contains_atom(atom) {
            return Err(StructureError::AtomAlreadyInCluster { atom, cluster });
        }

        let attachment = cluster_ref.body.map(|body| (body, cluster_ref.placement_b));

        let cluster_mut = &mut self.clusters[cluster];
        cluster_mut.direct_atoms.insert(atom, station);
        cluster_mut.all_atoms.insert(atom, station);

        if let Some((body, x_bc)) = attachment {
            self.atoms[atom].attach_to_body(body, x_bc * station);
        }
        Ok(())
    }

    /// Places a child cluster in a parent cluster with a fixed transform
    /// (parent frame to child frame).
    ///
    /// Rejected when the child is already body-attached, the placement
    /// would create a containment cycle, the child's atoms overlap the
    /// parent's, or the parent is not top-level. If the parent is
    /// body-attached, the child's whole subtree is attached with the
    /// composed transform.
    pub fn place_cluster_in_cluster(
        &mut self,
        child: ClusterId,
        parent: ClusterId,
        placement: Isometry3<f64>,
    ) -> Result<(), StructureError> {
        self.check_cluster(child)?;
        self.check_cluster(parent)?;

        if child == parent
            || self.cluster_contains_cluster(parent, child)
            || self.cluster_contains_cluster(child, parent)
        {
            return Err(StructureError::ContainmentCycle { parent, child });
        }

        let parent_ref = &self.clusters[parent];
        if !parent_ref.is_top_level() {
            return Err(StructureError::NotTopLevel(parent));
        }
        let child_ref = &self.clusters[child];
        if let Some(body) = child_ref.body {
            return Err(StructureError::ClusterAlreadyAttached {
                cluster: child,
                body,
            });
        }
        for &atom in child_ref.all_atoms.keys() {
            if parent_ref.contains_atom(atom) {
                return Err(StructureError::OverlappingAtoms {
                    parent,
                    child,
                    atom,
                });
            }
        }

        let attachment = parent_ref
            .body
            .map(|body| (body, parent_ref.placement_b * placement));
        if attachment.is_some() {
            self.check_subtree_attachable(child)?;
        }

        // All checks passed; commit.
        let child_atoms: Vec<(AtomId, Point3<f64>)> = self.clusters[child]
            .all_atoms
            .iter()
            .map(|(&atom, &station)| (atom, station))
            .collect();
        let parent_mut = &mut self.clusters[parent];
        for (atom, station) in child_atoms {
            parent_mut.all_atoms.insert(atom, placement * station);
        }
        parent_mut.direct_clusters.insert(child, placement);
        self.clusters[child].parents.insert(parent);

        if let Some((body, x_bc)) = attachment {
            self.attach_cluster_recursive(child, body, x_bc);
        }
        Ok(())
    }

    /// Attaches a top-level cluster to a rigid body, creating the body
    /// entry lazily. Implemented as a placement into the body's own
    /// cluster, which carries all the validation of
    /// [`place_cluster_in_cluster`](Self::place_cluster_in_cluster).
    pub fn attach_cluster_to_body(
        &mut self,
        cluster: ClusterId,
        body: BodyId,
        placement: Isometry3<f64>,
    ) -> Result<(), StructureError> {
        self.check_cluster(cluster)?;
        let body_cluster = self.ensure_body(body);
        self.place_cluster_in_cluster(cluster, body_cluster, placement)
    }

    /// Attaches a single atom to a rigid body at a fixed station, creating
    /// the body entry lazily.
    pub fn attach_atom_to_body(
        &mut self,
        atom: AtomId,
        body: BodyId,
        station: Point3<f64>,
    ) -> Result<(), StructureError> {
        self.check_atom(atom)?;
        let body_cluster = self.ensure_body(body);
        self.place_atom_in_cluster(atom, body_cluster, station)
    }

    /// True when `haystack` transitively contains `needle` through cluster
    /// placements.
    pub fn cluster_contains_cluster(&self, haystack: ClusterId, needle: ClusterId) -> bool {
        let mut stack: Vec<ClusterId> = self.clusters[haystack]
            .direct_clusters
            .keys()
            .copied()
            .collect();
        while let Some(id) = stack.pop() {
            if id == needle {
                return true;
            }
            stack.extend(self.clusters[id].direct_clusters.keys().copied());
        }
        false
    }

    /// Rebuilds every body's flattened atom list from its cluster's
    /// transitive placements.
    pub(crate) fn realize_body_caches(&mut self) {
        for entry in self.bodies.iter_mut() {
            if let Some(body) = entry {
                body.realize_topological_cache(&self.clusters[body.cluster]);
            }
        }
    }

    /// Stamps every atom with its body and body-frame station from the
    /// flattened body lists, then verifies that no atom was left behind.
    pub(crate) fn assign_atom_bodies(&mut self) -> Result<(), StructureError> {
        for (body_id, entry) in self.bodies.iter().enumerate() {
            let Some(body) = entry else { continue };
            for placement in &body.all_atoms {
                // An atom reachable from two bodies would have been rejected
                // at placement time.
                debug_assert!(!self.atoms[placement.atom].is_attached_to_body());
                self.atoms[placement.atom].attach_to_body(body_id, placement.station);
            }
        }
        for atom in &self.atoms {
            if !atom.is_attached_to_body() {
                return Err(StructureError::AtomNotAttached(atom.id));
            }
        }
        Ok(())
    }

    /// Drops everything the compilation pass derived, returning every atom
    /// and body cache to its declared state.
    pub(crate) fn invalidate_topological_caches(&mut self) {
        for atom in &mut self.atoms {
            atom.invalidate_topological_cache();
        }
        for body in self.bodies.iter_mut().flatten() {
            body.invalidate_topological_cache();
        }
    }

    fn check_atom(&self, id: AtomId) -> Result<(), StructureError> {
        if id < self.atoms.len() {
            Ok(())
        } else {
            Err(StructureError::UnknownAtom(id))
        }
    }

    fn check_cluster(&self, id: ClusterId) -> Result<(), StructureError> {
        if id < self.clusters.len() {
            Ok(())
        } else {
            Err(StructureError::UnknownCluster(id))
        }
    }

    /// Verifies that a cluster subtree, and every atom under it, can still
    /// be attached to a body. An atom or cluster may sit in several
    /// unattached hierarchies; attaching a second hierarchy that shares it
    /// must fail here rather than mid-recursion.
    fn check_subtree_attachable(&self, root: ClusterId) -> Result<(), StructureError> {
        for &atom in self.clusters[root].all_atoms.keys() {
            if let Some(body) = self.atoms[atom].body {
                return Err(StructureError::AtomAlreadyAttached { atom, body });
            }
        }
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let cluster = &self.clusters[id];
            if id != root {
                if let Some(body) = cluster.body {
                    return Err(StructureError::ClusterAlreadyAttached { cluster: id, body });
                }
            }
            stack.extend(cluster.direct_clusters.keys().copied());
        }
        Ok(())
    }

    /// Stamps a pre-validated cluster subtree with its body and the
    /// composed placements, atom by atom, child by child.
    fn attach_cluster_recursive(&mut self, cluster: ClusterId, body: BodyId, x_br: Isometry3<f64>) {
        let direct_atoms: Vec<(AtomId, Point3<f64>)> = self.clusters[cluster]
            .direct_atoms
            .iter()
            .map(|(&atom, &station)| (atom, station))
            .collect();
        let direct_clusters: Vec<(ClusterId, Isometry3<f64>)> = self.clusters[cluster]
            .direct_clusters
            .iter()
            .map(|(&child, &placement)| (child, placement))
            .collect();

        let cluster_mut = &mut self.clusters[cluster];
        cluster_mut.body = Some(body);
        cluster_mut.placement_b = x_br;

        for (atom, station) in direct_atoms {
            self.atoms[atom].attach_to_body(body, x_br * station);
        }
        for (child, placement) in direct_clusters {
            self.attach_cluster_recursive(child, body, x_br * placement);
        }
    }

    /// Makes sure a body entry exists, creating its (empty, identity-placed)
    /// body cluster on first use. Returns the body cluster id.
    fn ensure_body(&mut self, body: BodyId) -> ClusterId {
        if body >= self.bodies.len() {
            self.bodies.resize(body + 1, None);
        }
        if let Some(entry) = &self.bodies[body] {
            return entry.cluster;
        }
        let cluster = self.create_cluster(&format!("body {body}"));
        let cluster_mut = &mut self.clusters[cluster];
        cluster_mut.body = Some(body);
        cluster_mut.placement_b = Isometry3::identity();
        self.bodies[body] = Some(Body::new(cluster));
        cluster
    }
}
