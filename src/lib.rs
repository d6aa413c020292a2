// imports of other modules from this crate
mod errors;
pub use errors::ProvisionError;

mod geometry;
pub use geometry::{connecting_line, polygon_from_ring, Footprint};

mod entities;
pub use entities::{check_count, demands_from_population, validate_buildings, validate_services,
                   Building, BuildingRecord, Located, Service, ServiceRecord, MAX_COUNT};

mod transport_network;
pub use transport_network::{CostKind, TransportNetwork, TransportSegment};

mod shortest_paths;
pub use shortest_paths::targeted_dijkstra;

mod distance_matrix;
pub use distance_matrix::{build_distance_matrix, snap_to_nodes, DistanceMatrix,
                          DEFAULT_BATCH_SIZE};

mod allocation;
pub use allocation::{allocate, allocate_with_observer, AllocationMethod, AllocationOutcome,
                     AllocationStrategy, EngineSettings, RoundView, Termination};

mod gravity;
pub use gravity::GravityStrategy;

mod linear;
pub use linear::LinearStrategy;

mod metrics;
pub use metrics::{aggregate_provision, BuildingProvision, ServiceProvision};

mod visibility;
pub use visibility::{compute_visibility, Visibility};

mod links;
pub use links::{provision_links, ProvisionLink};

mod provision;
pub use provision::{get_service_provision, CityProvision, ProvisionResult};

mod tables;
pub use tables::{read_buildings, read_distance_matrix, read_services, write_results,
                 BUILDINGS_FILENAME, LINKS_FILENAME, SERVICES_FILENAME};

mod config_utils;

mod config;
pub use config::{DatasetConfig, MatrixSource, ProvisionConfig};

#[cfg(test)]
mod test_utils;
