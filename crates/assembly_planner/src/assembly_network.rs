//! The static graph of elements the sequence CSP searches over (spec §3
//! "Assembly Network").
//!
//! Neighbor computation follows `pychoreo`'s `get_node_neighbors`/
//! `get_element_neighbors`: build a node→incident-elements map first, then
//! union each element's two endpoints' incident sets minus itself.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::geometry::{Element, ElementId, LayerId, NodeId, Point};

/// Raised when an input shape fails the grounded-reachability invariant
/// (spec §3): some element has no path to a grounded element through
/// shared-endpoint adjacency.
#[derive(Debug, Clone)]
pub struct UngroundedElements {
    pub element_ids: Vec<ElementId>,
}

impl std::fmt::Display for UngroundedElements {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} element(s) unreachable from any grounded element: {:?}",
            self.element_ids.len(),
            self.element_ids
        )
    }
}

impl std::error::Error for UngroundedElements {}

/// The fixed, immutable graph of elements a `SequenceCsp` searches over.
pub struct AssemblyNetwork {
    elements: HashMap<ElementId, Element>,
    neighbors: HashMap<ElementId, HashSet<ElementId>>,
    grounded: HashSet<ElementId>,
    distance_to_ground: HashMap<ElementId, u32>,
    layers: HashMap<LayerId, Vec<ElementId>>,
    node_points: Vec<Point>,
}

impl AssemblyNetwork {
    /// Build the network from elements, their nodes' coordinates (indexed by
    /// `NodeId`), and the set of nodes that are physically grounded (fixed to
    /// the build platform). An element is grounded if either endpoint is a
    /// ground node.
    ///
    /// Errors if the grounded-reachability invariant fails.
    pub fn build(
        elements: Vec<Element>,
        node_points: Vec<Point>,
        ground_nodes: &HashSet<NodeId>,
    ) -> Result<Self, UngroundedElements> {
        let mut node_incidence: HashMap<NodeId, HashSet<ElementId>> = HashMap::new();
        for e in &elements {
            node_incidence.entry(e.endpoints.0).or_default().insert(e.id);
            node_incidence.entry(e.endpoints.1).or_default().insert(e.id);
        }

        let mut neighbors: HashMap<ElementId, HashSet<ElementId>> = HashMap::new();
        let mut grounded: HashSet<ElementId> = HashSet::new();
        let mut layers: HashMap<LayerId, Vec<ElementId>> = HashMap::new();
        let mut elements_by_id: HashMap<ElementId, Element> = HashMap::new();

        for e in elements {
            let mut own = HashSet::new();
            for incident in node_incidence[&e.endpoints.0].iter().chain(node_incidence[&e.endpoints.1].iter()) {
                if *incident != e.id {
                    own.insert(*incident);
                }
            }
            neighbors.insert(e.id, own);

            if ground_nodes.contains(&e.endpoints.0) || ground_nodes.contains(&e.endpoints.1) {
                grounded.insert(e.id);
            }
            layers.entry(e.layer).or_default().push(e.id);
            elements_by_id.insert(e.id, e);
        }

        let distance_to_ground = bfs_distance_to_ground(&neighbors, &grounded);

        let unreachable: Vec<ElementId> = elements_by_id
            .keys()
            .filter(|id| !distance_to_ground.contains_key(id))
            .copied()
            .collect();
        if !unreachable.is_empty() {
            let mut element_ids = unreachable;
            element_ids.sort_by_key(|id| id.0);
            return Err(UngroundedElements { element_ids });
        }

        for ids in layers.values_mut() {
            ids.sort_by_key(|id| id.0);
        }

        Ok(Self {
            elements: elements_by_id,
            neighbors,
            grounded,
            distance_to_ground,
            layers,
            node_points,
        })
    }

    /// The two endpoint coordinates of an element.
    pub fn element_endpoints(&self, id: ElementId) -> (Point, Point) {
        let e = &self.elements[&id];
        (
            self.node_points[e.endpoints.0 .0 as usize],
            self.node_points[e.endpoints.1 .0 as usize],
        )
    }

    /// Distinct layer ids present in the network, ascending.
    pub fn layer_ids(&self) -> Vec<LayerId> {
        let mut ids: Vec<LayerId> = self.layers.keys().copied().collect();
        ids.sort_by_key(|l| l.0);
        ids
    }

    pub fn element(&self, id: ElementId) -> &Element {
        &self.elements[&id]
    }

    pub fn element_ids(&self) -> impl Iterator<Item = &ElementId> {
        self.elements.keys()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn neighbors(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        self.neighbors[&id].iter().copied()
    }

    pub fn is_grounded(&self, id: ElementId) -> bool {
        self.grounded.contains(&id)
    }

    pub fn grounded_count(&self) -> usize {
        self.grounded.len()
    }

    pub fn distance_to_ground(&self, id: ElementId) -> u32 {
        self.distance_to_ground[&id]
    }

    pub fn layer_elements(&self, layer: LayerId) -> &[ElementId] {
        self.layers.get(&layer).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True if `candidate` shares an endpoint with any element currently in
    /// `placed` (spec §4.2's forward connectivity check's adjacency clause).
    pub fn adjacent_to_any(&self, candidate: ElementId, placed: &HashSet<ElementId>) -> bool {
        self.neighbors[&candidate].iter().any(|n| placed.contains(n))
    }
}

fn bfs_distance_to_ground(
    neighbors: &HashMap<ElementId, HashSet<ElementId>>,
    grounded: &HashSet<ElementId>,
) -> HashMap<ElementId, u32> {
    let mut dist = HashMap::new();
    let mut queue = VecDeque::new();
    for &g in grounded {
        dist.insert(g, 0);
        queue.push_back(g);
    }
    while let Some(current) = queue.pop_front() {
        let d = dist[&current];
        for &next in &neighbors[&current] {
            if !dist.contains_key(&next) {
                dist.insert(next, d + 1);
                queue.push_back(next);
            }
        }
    }
    dist
}
