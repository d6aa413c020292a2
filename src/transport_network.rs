// this file defines a struct to represent the walkable and ridable network of a city.
// It's a wrapper around a petgraph graph, restricted to the modes people use to reach services.
use std::collections::HashMap;
use std::error::Error;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

use geo::Point;
use petgraph::algo::kosaraju_scc;
use petgraph::graphmap::DiGraphMap;

use super::errors::ProvisionError;
use super::tables::require_columns;


static MOBILITY_MODES: [&str; 5] = ["subway", "bus", "tram", "trolleybus", "walk"];

// A convenience type for parsing csv data
type Row = HashMap<String, String>;

/// Which edge weight a shortest path minimizes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CostKind {
    Time,
    Length,
}

impl FromStr for CostKind {
    type Err = String;

    fn from_str(ss: &str) -> Result<CostKind, String> {
        match ss {
            "time" | "time_min" => Ok(CostKind::Time),
            "length" | "length_m" => Ok(CostKind::Length),
            other => Err(format!("unknown cost kind '{}'", other)),
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct TransportSegment {
    pub mode: String,
    pub time_min: f64,
    pub length_m: f64,
}

impl TransportSegment {
    pub fn new(mode: &str, time_min: f64, length_m: f64) -> TransportSegment {
        TransportSegment {mode: String::from(mode), time_min, length_m}
    }

    pub fn cost(&self, kind: CostKind) -> f64 {
        match kind {
            CostKind::Time => self.time_min,
            CostKind::Length => self.length_m,
        }
    }
}

pub struct TransportNetwork {
    node_positions: Vec<Point<f64>>,
    node_idxs_by_id: HashMap<String, usize>,
    node_ids_by_idx: Vec<String>,
    network: DiGraphMap<usize, TransportSegment>,
}

impl TransportNetwork {
    /// Reads a node table (`id,x,y`) and an edge table (`from,to,mode,time_min,length_m`).
    pub fn from_csv(nodes_path: &Path, edges_path: &Path)
                    -> Result<TransportNetwork, Box<dyn Error>> {
        require_columns(nodes_path, "nodes", &["id", "x", "y"])?;
        require_columns(edges_path, "edges", &["from", "to", "mode", "time_min", "length_m"])?;

        let mut nodes = vec![];
        let mut reader = csv::Reader::from_reader(File::open(nodes_path)?);
        for result in reader.deserialize() {
            let row: Row = result?;
            let pos = Point::new(row["x"].parse()?, row["y"].parse()?);
            nodes.push((row["id"].clone(), pos));
        }

        let mut edges = vec![];
        let mut reader = csv::Reader::from_reader(File::open(edges_path)?);
        for result in reader.deserialize() {
            let row: Row = result?;
            let segment = TransportSegment::new(&row["mode"], row["time_min"].parse()?,
                                                row["length_m"].parse()?);
            edges.push((row["from"].clone(), row["to"].clone(), segment));
        }
        log::info!("read {} nodes and {} edges", nodes.len(), edges.len());
        Ok(TransportNetwork::from_edges(nodes, edges))
    }

    /// Builds the network from raw nodes and edges.  Only edges of mobility modes are kept, and
    /// only nodes touched by a kept edge become part of the network.  Of several parallel edges,
    /// the quickest one is kept.
    pub fn from_edges(nodes: Vec<(String, Point<f64>)>,
                      edges: Vec<(String, String, TransportSegment)>) -> TransportNetwork {
        let pos_by_id: HashMap<String, Point<f64>> = nodes.into_iter().collect();

        let mut node_idxs_by_id = HashMap::new();
        let mut node_ids_by_idx = vec![];
        let mut node_positions = vec![];
        let mut graph: DiGraphMap<usize, TransportSegment> = DiGraphMap::new();
        let mut num_skipped = 0;
        for (from_id, to_id, segment) in edges {
            if from_id == to_id {
                // ignore self-connections
                continue;
            }
            if !MOBILITY_MODES.contains(&segment.mode.as_str()) {
                num_skipped += 1;
                continue;
            }
            let mut endpoint_idxs = [0, 0];
            let mut complete = true;
            for (ii, node_id) in [&from_id, &to_id].iter().enumerate() {
                if let Some(idx) = node_idxs_by_id.get(*node_id) {
                    endpoint_idxs[ii] = *idx;
                } else if let Some(pos) = pos_by_id.get(*node_id) {
                    let new_idx = node_ids_by_idx.len();
                    graph.add_node(new_idx);
                    node_idxs_by_id.insert((*node_id).clone(), new_idx);
                    node_ids_by_idx.push((*node_id).clone());
                    node_positions.push(*pos);
                    endpoint_idxs[ii] = new_idx;
                } else {
                    log::warn!("No position for node {}, skipping edge ({}, {})", node_id,
                               from_id, to_id);
                    complete = false;
                    break;
                }
            }
            if !complete {
                continue;
            }

            let [from_idx, to_idx] = endpoint_idxs;
            let keep_new = match graph.edge_weight(from_idx, to_idx) {
                Some(existing) => segment.time_min < existing.time_min,
                None => true,
            };
            if keep_new {
                graph.add_edge(from_idx, to_idx, segment);
            }
        }
        if num_skipped > 0 {
            log::debug!("skipped {} edges of non-mobility modes", num_skipped);
        }

        TransportNetwork::from_graph(graph, node_positions, Some(node_ids_by_idx))
    }

    /// Wraps an existing graph whose nodes are indices into `node_positions`.  If no ids are
    /// given, nodes are identified by their index.
    pub fn from_graph(graph: DiGraphMap<usize, TransportSegment>, node_positions: Vec<Point<f64>>,
                      node_ids: Option<Vec<String>>) -> TransportNetwork {
        let node_ids_by_idx = match node_ids {
            Some(ids) => ids,
            None => (0..node_positions.len()).map(|ii| format!("{}", ii)).collect(),
        };
        let node_idxs_by_id = node_ids_by_idx.iter().enumerate()
            .map(|(ii, id)| (id.clone(), ii)).collect();

        let comps = kosaraju_scc(&graph);
        log::debug!("there are {} strongly connected components", comps.len());

        TransportNetwork {
            node_positions,
            node_idxs_by_id,
            node_ids_by_idx,
            network: graph,
        }
    }

    pub fn get_graph(&self) -> &DiGraphMap<usize, TransportSegment> {
        &self.network
    }

    pub fn get_node_idx_by_id(&self, id: &str) -> Option<usize> {
        self.node_idxs_by_id.get(id).copied()
    }

    pub fn get_node_id_by_idx(&self, idx: usize) -> Option<&str> {
        self.node_ids_by_idx.get(idx).map(|id| id.as_str())
    }

    pub fn get_node_positions(&self) -> &Vec<Point<f64>> {
        &self.node_positions
    }

    pub fn get_num_nodes(&self) -> usize {
        self.network.node_count()
    }

    pub fn require_nodes(&self) -> Result<(), ProvisionError> {
        if self.network.node_count() == 0 || self.node_positions.is_empty() {
            return Err(ProvisionError::EmptyNetwork);
        }
        Ok(())
    }
}
