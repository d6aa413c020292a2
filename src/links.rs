use std::collections::HashMap;

use geo::LineString;
use ndarray::prelude::*;

use super::distance_matrix::DistanceMatrix;
use super::entities::Located;
use super::geometry::{connecting_line, Footprint};


/// A positive flow from a service to a building.
#[derive(PartialEq, Debug, Clone)]
pub struct ProvisionLink {
    pub building_id: i64,
    pub service_id: i64,
    pub flow: u64,
    pub distance: f64,
    /// runs from the building's centroid to the service's
    pub geometry: LineString<f64>,
}

/// Emits one link per positive cell of `destination`, whose rows and columns follow `distances`.
/// Cells whose building or service isn't among the given ones are skipped.  Links are ordered
/// by service row, then building column.
pub fn provision_links<BB, SS>(destination: &Array2<u64>, distances: &DistanceMatrix,
                               buildings: &[BB], services: &[SS]) -> Vec<ProvisionLink>
    where BB: Located,
          SS: Located,
{
    let bld_footprints: HashMap<i64, &Footprint> = buildings.iter()
        .map(|bb| (bb.id(), bb.footprint()))
        .collect();
    let svc_footprints: HashMap<i64, &Footprint> = services.iter()
        .map(|ss| (ss.id(), ss.footprint()))
        .collect();

    let mut links = vec![];
    for ((ii, jj), flow) in destination.indexed_iter() {
        if *flow == 0 {
            continue;
        }
        let service_id = distances.service_ids()[ii];
        let building_id = distances.building_ids()[jj];
        if let (Some(bld_fp), Some(svc_fp)) = (bld_footprints.get(&building_id),
                                               svc_footprints.get(&service_id)) {
            links.push(ProvisionLink {
                building_id,
                service_id,
                flow: *flow,
                distance: distances.values()[[ii, jj]],
                geometry: connecting_line(bld_fp, svc_fp),
            });
        }
    }
    log::debug!("materialized {} links", links.len());
    links
}
