use ndarray::prelude::*;
use ndarray::Zip;

use super::distance_matrix::DistanceMatrix;
use super::entities::{Building, Located, Service};
use super::errors::ProvisionError;
use super::geometry::Footprint;


#[derive(PartialEq, Debug, Clone)]
pub struct BuildingProvision {
    pub id: i64,
    pub footprint: Footprint,
    pub demand: u64,
    pub demand_left: u64,
    /// demand met by services no further than the threshold
    pub supplied_demands_within: u64,
    pub supplied_demands_without: u64,
    /// share of the demand met within the threshold, in [0, 1]
    pub provision_value: f64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct ServiceProvision {
    pub id: i64,
    pub footprint: Footprint,
    pub capacity: u64,
    pub capacity_left: u64,
    pub carried_capacity_within: u64,
    pub carried_capacity_without: u64,
    pub service_load: u64,
}

impl Located for BuildingProvision {
    fn id(&self) -> i64 {
        self.id
    }

    fn footprint(&self) -> &Footprint {
        &self.footprint
    }
}

impl Located for ServiceProvision {
    fn id(&self) -> i64 {
        self.id
    }

    fn footprint(&self) -> &Footprint {
        &self.footprint
    }
}

/// Splits every flow into the part within the threshold and the part beyond it, and totals
/// both per building and per service.
///
/// `distances` holds the unshifted costs and must line up with `destination`, `services` and
/// `buildings`.
pub fn aggregate_provision(buildings: &[Building], services: &[Service],
                           distances: &DistanceMatrix, destination: &Array2<u64>,
                           threshold: f64)
                           -> Result<(Vec<BuildingProvision>, Vec<ServiceProvision>),
                                     ProvisionError> {
    let expected = (services.len(), buildings.len());
    if destination.dim() != expected || distances.values().dim() != expected {
        return Err(ProvisionError::MatrixShape {expected, got: destination.dim()});
    }

    let within = Zip::from(destination).and(distances.values())
        .map_collect(|flow, dist| if *dist <= threshold { *flow } else { 0 });
    let without = destination - &within;

    let supplied_within = within.sum_axis(Axis(0));
    let supplied_without = without.sum_axis(Axis(0));
    let mut building_provs = Vec::with_capacity(buildings.len());
    for (jj, building) in buildings.iter().enumerate() {
        let total = supplied_within[jj] + supplied_without[jj];
        let demand_left = building.demand.checked_sub(total).ok_or(
            ProvisionError::Overallocation {
                kind: "building",
                id: building.id,
                allocated: total,
                total: building.demand,
            })?;
        let provision_value = if building.demand == 0 {
            0.
        } else {
            supplied_within[jj] as f64 / building.demand as f64
        };
        building_provs.push(BuildingProvision {
            id: building.id,
            footprint: building.footprint.clone(),
            demand: building.demand,
            demand_left,
            supplied_demands_within: supplied_within[jj],
            supplied_demands_without: supplied_without[jj],
            provision_value,
        });
    }

    let carried_within = within.sum_axis(Axis(1));
    let carried_without = without.sum_axis(Axis(1));
    let mut service_provs = Vec::with_capacity(services.len());
    for (ii, service) in services.iter().enumerate() {
        let load = carried_within[ii] + carried_without[ii];
        let capacity_left = service.capacity.checked_sub(load).ok_or(
            ProvisionError::Overallocation {
                kind: "service",
                id: service.id,
                allocated: load,
                total: service.capacity,
            })?;
        service_provs.push(ServiceProvision {
            id: service.id,
            footprint: service.footprint.clone(),
            capacity: service.capacity,
            capacity_left,
            carried_capacity_within: carried_within[ii],
            carried_capacity_without: carried_without[ii],
            service_load: service.capacity - capacity_left,
        });
    }

    log::debug!("{} of {} supplied units were within the threshold", within.sum(),
                destination.sum());
    Ok((building_provs, service_provs))
}


#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use approx::assert_relative_eq;

    use super::*;
    use super::super::test_utils::{compare_hashmaps, make_buildings, make_services};

    #[test]
    fn test_within_and_without() {
        let services = make_services(&[(10, 8), (11, 6)]);
        let buildings = make_buildings(&[(1, 4), (2, 10)]);
        let matrix = DistanceMatrix::from_rows(vec![10, 11], vec![1, 2],
                                               vec![vec![1., 3.], vec![5., 2.]]).unwrap();
        let destination = array![[4, 3], [0, 6]];
        let (bld_provs, svc_provs) = aggregate_provision(&buildings, &services, &matrix,
                                                         &destination, 2.).unwrap();

        let b1 = &bld_provs[0];
        assert_eq!((b1.supplied_demands_within, b1.supplied_demands_without), (4, 0));
        assert_eq!(b1.demand_left, 0);
        assert_relative_eq!(b1.provision_value, 1.);
        let b2 = &bld_provs[1];
        assert_eq!((b2.supplied_demands_within, b2.supplied_demands_without), (6, 3));
        assert_eq!(b2.demand_left, 1);
        assert_relative_eq!(b2.provision_value, 0.6);

        let loads: HashMap<i64, (u64, u64, u64, u64)> = svc_provs.iter()
            .map(|sp| (sp.id, (sp.carried_capacity_within, sp.carried_capacity_without,
                               sp.service_load, sp.capacity_left)))
            .collect();
        let expected: HashMap<i64, (u64, u64, u64, u64)> = [
            (10, (4, 3, 7, 1)),
            (11, (6, 0, 6, 0)),
        ].iter().cloned().collect();
        compare_hashmaps(&loads, &expected);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let services = make_services(&[(10, 5)]);
        let buildings = make_buildings(&[(1, 5)]);
        let matrix = DistanceMatrix::from_rows(vec![10], vec![1], vec![vec![2.]]).unwrap();
        let (bld_provs, _) = aggregate_provision(&buildings, &services, &matrix, &array![[5]],
                                                 2.).unwrap();
        assert_eq!(bld_provs[0].supplied_demands_within, 5);
    }

    #[test]
    fn test_zero_demand_has_zero_provision() {
        let services = make_services(&[(10, 5)]);
        let buildings = make_buildings(&[(1, 0), (2, 3)]);
        let matrix = DistanceMatrix::from_rows(vec![10], vec![1, 2],
                                               vec![vec![1., f64::INFINITY]]).unwrap();
        let (bld_provs, svc_provs) = aggregate_provision(&buildings, &services, &matrix,
                                                         &array![[0, 0]], 2.).unwrap();
        assert_eq!(bld_provs[0].provision_value, 0.);
        assert_eq!(bld_provs[1].provision_value, 0.);
        assert_eq!(bld_provs[1].demand_left, 3);
        assert_eq!(svc_provs[0].service_load, 0);
        assert_eq!(svc_provs[0].capacity_left, 5);
    }

    #[test]
    fn test_oversupply_is_an_error() {
        let services = make_services(&[(10, 5)]);
        let buildings = make_buildings(&[(1, 2)]);
        let matrix = DistanceMatrix::from_rows(vec![10], vec![1], vec![vec![1.]]).unwrap();
        let result = aggregate_provision(&buildings, &services, &matrix, &array![[3]], 2.);
        assert!(matches!(result, Err(ProvisionError::Overallocation {kind: "building", ..})));
        let result = aggregate_provision(&buildings, &services, &matrix, &array![[3, 1]], 2.);
        assert!(matches!(result, Err(ProvisionError::MatrixShape {..})));
    }
}
