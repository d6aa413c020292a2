use std::error::Error;

use geo::Polygon;

use super::allocation::{allocate, AllocationMethod, AllocationOutcome, EngineSettings};
use super::config::{MatrixSource, ProvisionConfig};
use super::distance_matrix::{build_distance_matrix, DistanceMatrix};
use super::entities::{validate_buildings, validate_services, Building, BuildingRecord, Service,
                      ServiceRecord};
use super::errors::ProvisionError;
use super::links::{provision_links, ProvisionLink};
use super::metrics::{aggregate_provision, BuildingProvision, ServiceProvision};
use super::tables::{read_buildings, read_distance_matrix, read_services};
use super::transport_network::TransportNetwork;
use super::visibility::{compute_visibility, Visibility};


/// Everything a provision calculation produces, restricted to what's visible.
#[derive(PartialEq, Debug, Clone)]
pub struct ProvisionResult {
    pub buildings: Vec<BuildingProvision>,
    pub services: Vec<ServiceProvision>,
    pub links: Vec<ProvisionLink>,
    /// covers every validated building and service, visible or not
    pub outcome: AllocationOutcome,
}

/// A provision calculation for one service type over one city.
pub struct CityProvision {
    buildings: Vec<Building>,
    services: Vec<Service>,
    matrix: DistanceMatrix,
    threshold: f64,
    method: AllocationMethod,
    settings: EngineSettings,
    selection_zone: Option<Polygon<f64>>,
}

impl CityProvision {
    /// Validates the inputs and lines the matrix up with the buildings and services that
    /// survive validation.
    pub fn new(buildings: Vec<BuildingRecord>, services: Vec<ServiceRecord>,
               matrix: &DistanceMatrix, threshold: f64, method: AllocationMethod)
               -> Result<CityProvision, ProvisionError> {
        if !(threshold.is_finite() && threshold > 0.) {
            return Err(ProvisionError::InvalidThreshold(threshold));
        }
        let buildings = validate_buildings(buildings)?;
        let services = validate_services(services)?;
        let service_ids: Vec<i64> = services.iter().map(|ss| ss.id).collect();
        let building_ids: Vec<i64> = buildings.iter().map(|bb| bb.id).collect();
        let matrix = matrix.aligned_to(&service_ids, &building_ids);

        Ok(CityProvision {
            buildings,
            services,
            matrix,
            threshold,
            method,
            settings: EngineSettings::default(),
            selection_zone: None,
        })
    }

    /// Loads the tables named in `config` and sets up the calculation it describes.  Costs are
    /// read from a matrix table or computed over the transport network.
    pub fn from_config(config: &ProvisionConfig) -> Result<CityProvision, Box<dyn Error>> {
        let dataset = &config.dataset;
        let buildings = read_buildings(&dataset.buildings_path, config.normative)?;
        let services = read_services(&dataset.services_path)?;
        let matrix = match &dataset.matrix_source {
            MatrixSource::Table(path) => read_distance_matrix(path)?,
            MatrixSource::Network {nodes_path, edges_path} => {
                let network = TransportNetwork::from_csv(nodes_path, edges_path)?;
                build_distance_matrix(&network, &buildings, &services, config.cost,
                                      config.batch_size)?
            }
        };

        let mut provision = CityProvision::new(buildings, services, &matrix, config.threshold,
                                               config.method)?
            .with_settings(config.settings.clone());
        if let Some(zone) = &config.selection_zone {
            provision = provision.with_selection_zone(zone.clone());
        }
        Ok(provision)
    }

    pub fn with_selection_zone(mut self, zone: Polygon<f64>) -> CityProvision {
        self.selection_zone = Some(zone);
        self
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> CityProvision {
        self.settings = settings;
        self
    }

    pub fn get_buildings(&self) -> &Vec<Building> {
        &self.buildings
    }

    pub fn get_services(&self) -> &Vec<Service> {
        &self.services
    }

    pub fn get_matrix(&self) -> &DistanceMatrix {
        &self.matrix
    }

    pub fn get_provisions(&self) -> Result<ProvisionResult, ProvisionError> {
        let strategy = self.method.strategy(&self.settings);
        let outcome = allocate(strategy.as_ref(), &self.services, &self.buildings, &self.matrix,
                               self.threshold, self.settings.max_rounds)?;
        let (bld_provs, svc_provs) = aggregate_provision(
            &self.buildings, &self.services, &self.matrix, &outcome.destination,
            self.threshold)?;

        let visibility = compute_visibility(&self.buildings, self.services.len(),
                                            &outcome.destination, self.selection_zone.as_ref());
        let bld_provs = Visibility::filter(bld_provs, &visibility.buildings);
        let svc_provs = Visibility::filter(svc_provs, &visibility.services);
        let links = provision_links(&outcome.destination, &self.matrix, &bld_provs, &svc_provs);

        Ok(ProvisionResult {
            buildings: bld_provs,
            services: svc_provs,
            links,
            outcome,
        })
    }
}

/// Runs a whole provision calculation in one call.
pub fn get_service_provision(buildings: Vec<BuildingRecord>, services: Vec<ServiceRecord>,
                             matrix: &DistanceMatrix, threshold: f64, method: AllocationMethod,
                             selection_zone: Option<Polygon<f64>>)
                             -> Result<ProvisionResult, ProvisionError> {
    let mut provision = CityProvision::new(buildings, services, matrix, threshold, method)?;
    if let Some(zone) = selection_zone {
        provision = provision.with_selection_zone(zone);
    }
    provision.get_provisions()
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::super::allocation::Termination;
    use super::super::geometry::{polygon_from_ring, Footprint};

    fn buildings(demands: &[(i64, Option<u64>)]) -> Vec<BuildingRecord> {
        demands.iter().map(|(id, demand)| {
            BuildingRecord::new(*id, Footprint::point(*id as f64, 0.), *demand)
        }).collect()
    }

    fn services(capacities: &[(i64, Option<u64>)]) -> Vec<ServiceRecord> {
        capacities.iter().map(|(id, capacity)| {
            ServiceRecord::new(*id, Footprint::point(0., *id as f64), *capacity)
        }).collect()
    }

    #[test]
    fn test_invalid_threshold() {
        let matrix = DistanceMatrix::from_rows(vec![10], vec![1], vec![vec![1.]]).unwrap();
        for threshold in &[0., -2., f64::NAN] {
            let result = CityProvision::new(buildings(&[(1, Some(1))]),
                                            services(&[(10, Some(1))]), &matrix, *threshold,
                                            AllocationMethod::Gravity);
            assert!(matches!(result, Err(ProvisionError::InvalidThreshold(_))));
        }
    }

    #[test]
    fn test_matrix_follows_validated_entities() {
        // the matrix has an extra service and lacks building 3
        let matrix = DistanceMatrix::from_rows(vec![11, 10], vec![2, 1], vec![
            vec![7., 8.],
            vec![1., 2.],
        ]).unwrap();
        let provision = CityProvision::new(
            buildings(&[(1, Some(4)), (2, Some(3)), (3, Some(2)), (4, None)]),
            services(&[(10, Some(5)), (12, Some(0))]),
            &matrix, 5., AllocationMethod::Linear).unwrap();
        assert_eq!(provision.get_buildings().len(), 3);
        assert_eq!(provision.get_services().len(), 1);
        let aligned = provision.get_matrix();
        assert_eq!(aligned.service_ids(), &[10]);
        assert_eq!(aligned.building_ids(), &[1, 2, 3]);
        assert_eq!(aligned.get(10, 1), Some(2.));
        assert_eq!(aligned.get(10, 3), Some(f64::INFINITY));

        let result = provision.get_provisions().unwrap();
        // building 2 is nearer, so it is served first
        let supplied: Vec<u64> = result.buildings.iter()
            .map(|bp| bp.supplied_demands_within).collect();
        assert_eq!(supplied, vec![2, 3, 0]);
        assert_eq!(result.services[0].service_load, 5);
        assert_eq!(result.outcome.termination, Termination::Converged);
    }

    #[test]
    fn test_selection_zone_filters_outputs() {
        let matrix = DistanceMatrix::from_rows(vec![10, 11], vec![1, 2], vec![
            vec![1., f64::INFINITY],
            vec![f64::INFINITY, 1.],
        ]).unwrap();
        let zone = polygon_from_ring(vec![(0.5, -1.), (1.5, -1.), (1.5, 1.), (0.5, 1.)]);
        let result = get_service_provision(
            buildings(&[(1, Some(2)), (2, Some(2))]), services(&[(10, Some(2)), (11, Some(2))]),
            &matrix, 2., AllocationMethod::Gravity, Some(zone)).unwrap();

        let bld_ids: Vec<i64> = result.buildings.iter().map(|bp| bp.id).collect();
        let svc_ids: Vec<i64> = result.services.iter().map(|sp| sp.id).collect();
        assert_eq!(bld_ids, vec![1]);
        assert_eq!(svc_ids, vec![10]);
        assert_eq!(result.links.len(), 1);
        assert_eq!((result.links[0].service_id, result.links[0].building_id), (10, 1));
        // the hidden pair was still allocated
        assert_eq!(result.outcome.destination.sum(), 4);
    }

    #[test]
    fn test_no_valid_capacity() {
        let matrix = DistanceMatrix::from_rows(vec![10], vec![1], vec![vec![1.]]).unwrap();
        let result = get_service_provision(buildings(&[(1, Some(1))]),
                                           services(&[(10, None)]), &matrix, 1.,
                                           AllocationMethod::Gravity, None);
        assert!(matches!(result, Err(ProvisionError::NoValidCapacity)));
    }
}
