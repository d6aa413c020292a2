use std::collections::HashMap;
use std::fmt::Debug;

use ndarray::prelude::*;

use super::entities::{Building, Service};
use super::geometry::Footprint;


/// Checks that the contents of two hashmaps are the same.
pub fn compare_hashmaps<KK, VV>(query_map: &HashMap<KK, VV>, true_map: &HashMap<KK, VV>)
    where KK: Debug + Eq + std::hash::Hash,
    VV: Debug + PartialEq,
{
    assert_eq!(query_map.len(), true_map.len());

    for (true_key, true_val) in true_map {
        match query_map.get(true_key) {
            Some(val) => assert_eq!(val, true_val, "value for key {:?} differs", true_key),
            None => assert!(false, "Key {:?} missing!", true_key),
        }
    }
}

/// Services at (0, id) with the given ids and capacities.
pub fn make_services(ids_and_capacities: &[(i64, u64)]) -> Vec<Service> {
    ids_and_capacities.iter().map(|(id, capacity)| Service {
        id: *id,
        footprint: Footprint::point(0., *id as f64),
        capacity: *capacity,
        capacity_left: *capacity,
    }).collect()
}

/// Buildings at (id, 0) with the given ids and demands.
pub fn make_buildings(ids_and_demands: &[(i64, u64)]) -> Vec<Building> {
    ids_and_demands.iter().map(|(id, demand)| Building {
        id: *id,
        footprint: Footprint::point(*id as f64, 0.),
        demand: *demand,
        demand_left: *demand,
    }).collect()
}

/// Checks that no service gives away more than its capacity and no building gets more than it
/// asked for.
pub fn check_allocation_invariants(destination: &Array2<u64>, services: &[Service],
                                   buildings: &[Building]) {
    assert_eq!(destination.dim(), (services.len(), buildings.len()));
    for (service, row) in services.iter().zip(destination.outer_iter()) {
        assert!(row.sum() <= service.capacity, "service {} is over capacity", service.id);
    }
    for (building, col) in buildings.iter().zip(destination.axis_iter(Axis(1))) {
        assert!(col.sum() <= building.demand, "building {} is oversupplied", building.id);
    }
}

/// Sum over pairs of flow divided by shifted distance.
pub fn weighted_flow(destination: &Array2<u64>, distances: &Array2<f64>) -> f64 {
    destination.iter().zip(distances.iter())
        .filter(|(flow, _)| **flow > 0)
        .map(|(flow, dist)| *flow as f64 / (dist + 1.))
        .sum()
}
