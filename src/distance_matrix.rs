use std::collections::{HashMap, HashSet};

use kdtree::distance::squared_euclidean;
use kdtree::KdTree;
use ndarray::prelude::*;
use rayon::prelude::*;

use super::entities::Located;
use super::errors::ProvisionError;
use super::shortest_paths::targeted_dijkstra;
use super::transport_network::{CostKind, TransportNetwork};


pub static DEFAULT_BATCH_SIZE: usize = 1000;

/// Travel costs from services (rows) to buildings (columns).  Pairs with no path between them
/// cost `f64::INFINITY`.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    service_ids: Vec<i64>,
    building_ids: Vec<i64>,
    service_idxs_by_id: HashMap<i64, usize>,
    building_idxs_by_id: HashMap<i64, usize>,
    values: Array2<f64>,
}

impl DistanceMatrix {
    pub fn new(service_ids: Vec<i64>, building_ids: Vec<i64>, values: Array2<f64>)
               -> Result<DistanceMatrix, ProvisionError> {
        let expected = (service_ids.len(), building_ids.len());
        if values.dim() != expected {
            return Err(ProvisionError::MatrixShape {expected, got: values.dim()});
        }
        let service_idxs_by_id = index_ids(&service_ids, "service")?;
        let building_idxs_by_id = index_ids(&building_ids, "building")?;
        for ((ii, jj), value) in values.indexed_iter() {
            if value.is_nan() || *value < 0. {
                return Err(ProvisionError::InvalidDistance {
                    service_id: service_ids[ii],
                    building_id: building_ids[jj],
                    value: *value,
                });
            }
        }

        Ok(DistanceMatrix {
            service_ids,
            building_ids,
            service_idxs_by_id,
            building_idxs_by_id,
            values,
        })
    }

    pub fn from_rows(service_ids: Vec<i64>, building_ids: Vec<i64>, rows: Vec<Vec<f64>>)
                     -> Result<DistanceMatrix, ProvisionError> {
        let num_cols = building_ids.len();
        if let Some(bad_row) = rows.iter().find(|row| row.len() != num_cols) {
            return Err(ProvisionError::MatrixShape {
                expected: (service_ids.len(), num_cols),
                got: (rows.len(), bad_row.len()),
            });
        }
        let flat: Vec<f64> = rows.iter().flatten().cloned().collect();
        let values = Array::from_shape_vec((rows.len(), num_cols), flat).map_err(|_| {
            ProvisionError::MatrixShape {
                expected: (service_ids.len(), num_cols),
                got: (rows.len(), num_cols),
            }
        })?;
        DistanceMatrix::new(service_ids, building_ids, values)
    }

    pub fn get(&self, service_id: i64, building_id: i64) -> Option<f64> {
        let ii = self.service_idxs_by_id.get(&service_id)?;
        let jj = self.building_idxs_by_id.get(&building_id)?;
        Some(self.values[[*ii, *jj]])
    }

    pub fn service_ids(&self) -> &[i64] {
        &self.service_ids
    }

    pub fn building_ids(&self) -> &[i64] {
        &self.building_ids
    }

    pub fn service_idx(&self, service_id: i64) -> Option<usize> {
        self.service_idxs_by_id.get(&service_id).copied()
    }

    pub fn building_idx(&self, building_id: i64) -> Option<usize> {
        self.building_idxs_by_id.get(&building_id).copied()
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Reorders the matrix to the given rows and columns.  Rows and columns not asked for are
    /// dropped; asked-for ids the matrix doesn't know get infinite costs.  Ids must be unique.
    pub fn aligned_to(&self, service_ids: &[i64], building_ids: &[i64]) -> DistanceMatrix {
        let mut values = Array::from_elem((service_ids.len(), building_ids.len()), f64::INFINITY);
        let row_idxs: Vec<Option<usize>> = service_ids.iter().map(|id| self.service_idx(*id))
            .collect();
        let col_idxs: Vec<Option<usize>> = building_ids.iter().map(|id| self.building_idx(*id))
            .collect();
        for (ii, row_idx) in row_idxs.iter().enumerate() {
            if let Some(src_ii) = row_idx {
                for (jj, col_idx) in col_idxs.iter().enumerate() {
                    if let Some(src_jj) = col_idx {
                        values[[ii, jj]] = self.values[[*src_ii, *src_jj]];
                    }
                }
            }
        }

        let missing_rows = row_idxs.iter().filter(|idx| idx.is_none()).count();
        let missing_cols = col_idxs.iter().filter(|idx| idx.is_none()).count();
        if missing_rows > 0 || missing_cols > 0 {
            log::warn!("{} services and {} buildings are absent from the distance matrix and \
                        will be treated as unreachable", missing_rows, missing_cols);
        }
        let dropped_rows = self.service_ids.len() - (service_ids.len() - missing_rows);
        let dropped_cols = self.building_ids.len() - (building_ids.len() - missing_cols);
        log::debug!("dropped {} rows and {} columns from the distance matrix", dropped_rows,
                    dropped_cols);

        DistanceMatrix {
            service_ids: service_ids.to_vec(),
            building_ids: building_ids.to_vec(),
            service_idxs_by_id: service_ids.iter().enumerate().map(|(ii, id)| (*id, ii)).collect(),
            building_idxs_by_id: building_ids.iter().enumerate().map(|(ii, id)| (*id, ii))
                .collect(),
            values,
        }
    }
}

fn index_ids(ids: &[i64], kind: &'static str) -> Result<HashMap<i64, usize>, ProvisionError> {
    let mut idxs_by_id = HashMap::new();
    for (ii, id) in ids.iter().enumerate() {
        if idxs_by_id.insert(*id, ii).is_some() {
            return Err(ProvisionError::DuplicateId {kind, id: *id});
        }
    }
    Ok(idxs_by_id)
}

/// Finds the network node closest to each location.
pub fn snap_to_nodes<LL: Located>(network: &TransportNetwork, locations: &[LL])
                                  -> Result<Vec<usize>, ProvisionError> {
    network.require_nodes()?;
    let mut tree = KdTree::new(2);
    for (idx, pos) in network.get_node_positions().iter().enumerate() {
        tree.add([pos.x(), pos.y()], idx)
            .map_err(|err| ProvisionError::Snapping(format!("{:?}", err)))?;
    }

    let mut nodes = vec![];
    for location in locations {
        let point = location.footprint().as_array();
        let nearest = tree.nearest(&point, 1, &squared_euclidean)
            .map_err(|err| ProvisionError::Snapping(format!("{}: {:?}", location.id(), err)))?;
        match nearest.first() {
            Some((sq_dist, node)) => {
                log::debug!("snapped {} to node {} at {}m", location.id(), node, sq_dist.sqrt());
                nodes.push(**node);
            }
            None => return Err(ProvisionError::EmptyNetwork),
        }
    }
    Ok(nodes)
}

/// Computes the cost of the shortest path from every service to every building.
///
/// Searches are run from the distinct service nodes in batches of `batch_size` sources, the
/// batches in parallel.  Each search stops once it has reached all building nodes.
pub fn build_distance_matrix<BB, SS>(network: &TransportNetwork, buildings: &[BB],
                                     services: &[SS], cost: CostKind, batch_size: usize)
                                     -> Result<DistanceMatrix, ProvisionError>
    where BB: Located, SS: Located,
{
    let service_ids: Vec<i64> = services.iter().map(|ss| ss.id()).collect();
    let building_ids: Vec<i64> = buildings.iter().map(|bb| bb.id()).collect();
    index_ids(&service_ids, "service")?;
    index_ids(&building_ids, "building")?;

    let service_nodes = snap_to_nodes(network, services)?;
    let building_nodes = snap_to_nodes(network, buildings)?;
    let targets: HashSet<usize> = building_nodes.iter().cloned().collect();

    let mut sources: Vec<usize> = service_nodes.clone();
    sources.sort_unstable();
    sources.dedup();
    let batches: Vec<&[usize]> = sources.chunks(batch_size.max(1)).collect();
    log::info!("computing paths from {} source nodes in {} batches", sources.len(),
               batches.len());

    let graph = network.get_graph();
    let mut batch_results: Vec<(usize, Vec<(usize, HashMap<usize, f64>)>)> = batches
        .par_iter()
        .enumerate()
        .map(|(bi, batch)| {
            let paths = batch.iter()
                .map(|src| (*src, targeted_dijkstra(graph, *src, Some(&targets),
                                                    |seg| seg.cost(cost))))
                .collect();
            (bi, paths)
        })
        .collect();
    batch_results.sort_by_key(|(bi, _)| *bi);

    let mut costs_by_source = HashMap::new();
    for (_, paths) in batch_results {
        for (src, costs) in paths {
            costs_by_source.insert(src, costs);
        }
    }

    let mut values = Array::from_elem((service_ids.len(), building_ids.len()), f64::INFINITY);
    for (ii, src) in service_nodes.iter().enumerate() {
        let costs = &costs_by_source[src];
        for (jj, dst) in building_nodes.iter().enumerate() {
            if let Some(cost) = costs.get(dst) {
                values[[ii, jj]] = *cost;
            }
        }
    }
    let num_unreachable = values.iter().filter(|vv| vv.is_infinite()).count();
    if num_unreachable > 0 {
        log::warn!("{} service-building pairs have no path between them", num_unreachable);
    }

    DistanceMatrix::new(service_ids, building_ids, values)
}
