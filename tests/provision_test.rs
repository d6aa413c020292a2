use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use glob::glob;
use tempfile::tempdir;

use city_provision::{get_service_provision, write_results, AllocationMethod, BuildingRecord,
                     CityProvision, DistanceMatrix, EngineSettings, Footprint, ProvisionConfig,
                     ServiceRecord, Termination, BUILDINGS_FILENAME, LINKS_FILENAME,
                     SERVICES_FILENAME};


fn three_buildings() -> Vec<BuildingRecord> {
    (1..=3).map(|id| BuildingRecord::new(id, Footprint::point(id as f64, 0.), Some(5))).collect()
}

fn one_service(capacity: u64) -> Vec<ServiceRecord> {
    vec![ServiceRecord::new(100, Footprint::point(0., 0.), Some(capacity))]
}

fn line_matrix() -> DistanceMatrix {
    DistanceMatrix::from_rows(vec![100], vec![1, 2, 3], vec![vec![1., 2., 3.]]).unwrap()
}

/// The nearest building is served in full in the first round, and the rest of the capacity
/// goes further out.
#[test]
fn test_gravity_single_service() {
    let mut results = vec![];
    for _ in 0..2 {
        let result = get_service_provision(three_buildings(), one_service(10), &line_matrix(), 2.,
                                           AllocationMethod::Gravity, None).unwrap();
        results.push(result);
    }
    let result = &results[0];
    assert_eq!(results[0], results[1]);

    assert_eq!(result.buildings[0].supplied_demands_within, 5);
    assert_eq!(result.buildings[0].demand_left, 0);
    let served: u64 = result.buildings.iter()
        .map(|bp| bp.supplied_demands_within + bp.supplied_demands_without)
        .sum();
    let unserved: u64 = result.buildings.iter().map(|bp| bp.demand_left).sum();
    assert_eq!(served, 10);
    assert_eq!(unserved, 5);
    assert_eq!(result.services[0].capacity_left, 0);
    assert_eq!(result.services[0].service_load, 10);
    assert_eq!(result.outcome.termination, Termination::Converged);
}

#[test]
fn test_linear_single_service() {
    let result = get_service_provision(three_buildings(), one_service(10), &line_matrix(), 2.,
                                       AllocationMethod::Linear, None).unwrap();
    let left: Vec<u64> = result.buildings.iter().map(|bp| bp.demand_left).collect();
    assert_eq!(left, vec![0, 0, 5]);
    let values: Vec<f64> = result.buildings.iter().map(|bp| bp.provision_value).collect();
    assert_eq!(values, vec![1., 1., 0.]);
    assert_eq!(result.outcome.rounds, 1);
    assert_eq!(result.links.len(), 2);
}

/// With no path anywhere, nothing is allocated and everything is reported as left over.
#[test]
fn test_unreachable_everywhere() {
    let buildings = vec![BuildingRecord::new(1, Footprint::point(1., 0.), Some(5))];
    let matrix = DistanceMatrix::from_rows(vec![100], vec![1], vec![vec![f64::INFINITY]])
        .unwrap();
    for method in &[AllocationMethod::Gravity, AllocationMethod::Linear] {
        let result = get_service_provision(buildings.clone(), one_service(10), &matrix, 2.,
                                           *method, None).unwrap();
        assert_eq!(result.outcome.termination, Termination::Exhausted);
        assert_eq!(result.outcome.rounds, 1);
        assert_eq!(result.buildings[0].demand_left, 5);
        assert_eq!(result.buildings[0].provision_value, 0.);
        assert_eq!(result.services[0].capacity_left, 10);
        assert!(result.links.is_empty());
    }
}

#[test]
fn test_round_limit_reports_leftovers() {
    // far beyond the threshold, so only the sixth round reaches it
    let buildings = vec![BuildingRecord::new(1, Footprint::point(1., 0.), Some(5))];
    let matrix = DistanceMatrix::from_rows(vec![100], vec![1], vec![vec![50.]]).unwrap();
    let settings = EngineSettings {max_rounds: 3, ..EngineSettings::default()};
    let result = CityProvision::new(buildings, one_service(10), &matrix, 1.,
                                    AllocationMethod::Linear).unwrap()
        .with_settings(settings)
        .get_provisions().unwrap();
    assert_eq!(result.outcome.termination, Termination::RoundLimit);
    assert_eq!(result.outcome.rounds, 3);
    assert_eq!(result.buildings[0].demand_left, 5);
}

fn read_expected(path: &Path) -> HashMap<i64, (u64, u64, u64)> {
    let mut expected = HashMap::new();
    let mut reader = csv::Reader::from_reader(File::open(path).unwrap());
    for result in reader.deserialize() {
        let row: HashMap<String, String> = result.unwrap();
        let id: i64 = row["id"].parse().unwrap();
        expected.insert(id, (row["demand_left"].parse().unwrap(),
                             row["supplied_demands_within"].parse().unwrap(),
                             row["supplied_demands_without"].parse().unwrap()));
    }
    expected
}

fn count_data_lines(path: &Path) -> usize {
    let mut reader = csv::Reader::from_reader(File::open(path).unwrap());
    reader.records().count()
}

fn check_env(config_path: &Path) {
    let config = ProvisionConfig::from_path(config_path).unwrap();
    let provision = CityProvision::from_config(&config).unwrap();
    let result = provision.get_provisions().unwrap();

    let env_dir = config_path.parent().unwrap();
    let expected = read_expected(&env_dir.join("expected_buildings.csv"));
    let found: HashMap<i64, (u64, u64, u64)> = result.buildings.iter()
        .map(|bp| (bp.id, (bp.demand_left, bp.supplied_demands_within,
                           bp.supplied_demands_without)))
        .collect();
    assert_eq!(found, expected);

    let out_dir = tempdir().unwrap();
    write_results(out_dir.path(), &result).unwrap();
    assert_eq!(count_data_lines(&out_dir.path().join(BUILDINGS_FILENAME)),
               result.buildings.len());
    assert_eq!(count_data_lines(&out_dir.path().join(SERVICES_FILENAME)),
               result.services.len());
    assert_eq!(count_data_lines(&out_dir.path().join(LINKS_FILENAME)), result.links.len());
}

#[test]
fn test_envs() {
    let configs: Vec<PathBuf> = glob("tests/envs/*/config.yaml").unwrap()
        .map(|entry| entry.unwrap())
        .collect();
    assert!(configs.len() >= 3);
    for config_path in configs {
        println!("Testing {:?}", config_path);
        check_env(&config_path);
    }
}

#[test]
fn test_network_env_links() {
    let config = ProvisionConfig::from_path(Path::new("tests/envs/network-linear/config.yaml"))
        .unwrap();
    let result = CityProvision::from_config(&config).unwrap().get_provisions().unwrap();
    let links: Vec<(i64, i64, u64, f64)> = result.links.iter()
        .map(|ll| (ll.service_id, ll.building_id, ll.flow, ll.distance))
        .collect();
    // building 3 is outside the zone, and it got nothing anyway
    assert_eq!(links, vec![(100, 1, 3, 2.), (100, 2, 3, 4.)]);
    assert_eq!(result.outcome.termination, Termination::Converged);
}
