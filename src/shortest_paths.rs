use std::cmp::Ordering;
use std::collections::hash_map::Entry::{Occupied, Vacant};
use std::collections::{BinaryHeap, HashMap, HashSet};

use petgraph::algo::Measure;
use petgraph::graphmap::DiGraphMap;

use super::transport_network::TransportSegment;


/// Dijkstra's algorithm from a single source, modelled on the implementation in the petgraph
/// library but able to stop early.
///
/// Compute the length of the shortest path from `source` to every node reachable from it.
/// If `targets` is given, the search stops as soon as every target's cost is final, so nodes
/// further away than the furthest target may be missing from the result.
///
/// `edge_cost` must return non-negative costs.  Nodes that can't be reached are absent from the
/// returned map.
pub fn targeted_dijkstra<F, K>(
    graph: &DiGraphMap<usize, TransportSegment>,
    source: usize,
    targets: Option<&HashSet<usize>>,
    mut edge_cost: F,
) -> HashMap<usize, K>
where
    F: FnMut(&TransportSegment) -> K,
    K: Measure + Copy,
{
    let mut visited = HashSet::new();
    let mut scores = HashMap::new();
    if !graph.contains_node(source) {
        return scores;
    }
    let mut remaining: Option<HashSet<usize>> = targets.cloned();
    let zero_score = K::default();
    scores.insert(source, zero_score);

    let mut visit_next = BinaryHeap::new();
    visit_next.push(MinScored(zero_score, source));
    while let Some(MinScored(node_score, node)) = visit_next.pop() {
        if !visited.insert(node) {
            continue;
        }
        if let Some(remaining) = &mut remaining {
            remaining.remove(&node);
            if remaining.is_empty() {
                break;
            }
        }
        for (_, next, segment) in graph.edges(node) {
            if visited.contains(&next) {
                continue;
            }
            let next_score = node_score + edge_cost(segment);
            match scores.entry(next) {
                Occupied(ent) => {
                    if next_score < *ent.get() {
                        *ent.into_mut() = next_score;
                        visit_next.push(MinScored(next_score, next));
                    }
                }
                Vacant(ent) => {
                    ent.insert(next_score);
                    visit_next.push(MinScored(next_score, next));
                }
            }
        }
    }
    scores
}


#[derive(Copy, Clone, Debug)]
pub struct MinScored<K, T>(pub K, pub T);

impl<K: PartialOrd, T> PartialEq for MinScored<K, T> {
    #[inline]
    fn eq(&self, other: &MinScored<K, T>) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K: PartialOrd, T> Eq for MinScored<K, T> {}

impl<K: PartialOrd, T> PartialOrd for MinScored<K, T> {
    #[inline]
    fn partial_cmp(&self, other: &MinScored<K, T>) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: PartialOrd, T> Ord for MinScored<K, T> {
    #[inline]
    fn cmp(&self, other: &MinScored<K, T>) -> Ordering {
        let a = &self.0;
        let b = &other.0;
        if a == b {
            Ordering::Equal
        } else if a < b {
            Ordering::Greater
        } else if a > b {
            Ordering::Less
        } else if a.ne(a) && b.ne(b) {
            // these are the NaN cases
            Ordering::Equal
        } else if a.ne(a) {
            // Order NaN less, so that it is last in the MinScore order
            Ordering::Less
        } else {
            Ordering::Greater
        }
    }
}
