use super::atom::AtomPlacement;
use super::cluster::Cluster;
use super::ids::ClusterId;

/// A rigid body of the surrounding multibody system, as seen by the force
/// field: a reference to the top-level cluster holding everything rigidly
/// attached to it, plus a flattened atom list built for fast body-by-body
/// processing during dynamics.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub cluster: ClusterId,

    /// Expansion of all atom placements reachable from `cluster`, stations
    /// in this body's frame, sorted by atom id. Rebuilt by the compilation
    /// pass.
    pub all_atoms: Vec<AtomPlacement>,
}

impl Body {
    pub fn new(cluster: ClusterId) -> Self {
        Self {
            cluster,
            all_atoms: Vec::new(),
        }
    }

    pub(crate) fn invalidate_topological_cache(&mut self) {
        self.all_atoms.clear();
    }

    /// Flattens the body cluster's transitive atom placements into the
    /// dynamics-friendly list. The source map is keyed by atom id, so the
    /// result comes out sorted.
    pub(crate) fn realize_topological_cache(&mut self, body_cluster: &Cluster) {
        self.all_atoms = body_cluster
            .all_atoms
            .iter()
            .map(|(&atom, &station)| AtomPlacement { atom, station })
            .collect();
    }
}
