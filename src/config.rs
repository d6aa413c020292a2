use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use geo::Polygon;
use yaml_rust::{Yaml, YamlLoader};

use super::allocation::{AllocationMethod, EngineSettings};
use super::config_utils::{optional_number, optional_path, optional_str, required_path,
                          yaml_number};
use super::distance_matrix::DEFAULT_BATCH_SIZE;
use super::errors::ProvisionError;
use super::geometry::polygon_from_ring;
use super::transport_network::CostKind;


/// Where the travel costs come from.
#[derive(PartialEq, Debug, Clone)]
pub enum MatrixSource {
    Table(PathBuf),
    Network { nodes_path: PathBuf, edges_path: PathBuf },
}

#[derive(PartialEq, Debug, Clone)]
pub struct DatasetConfig {
    pub buildings_path: PathBuf,
    pub services_path: PathBuf,
    pub matrix_source: MatrixSource,
    pub output_dir: Option<PathBuf>,
}

impl DatasetConfig {
    fn from_yaml(yaml_cfg: &Yaml, base_dir: &Path) -> Result<DatasetConfig, Box<dyn Error>> {
        let matrix_source = match optional_path(yaml_cfg, "matrix_path", base_dir)? {
            Some(path) => MatrixSource::Table(path),
            None => MatrixSource::Network {
                nodes_path: required_path(yaml_cfg, "nodes_path", base_dir)?,
                edges_path: required_path(yaml_cfg, "edges_path", base_dir)?,
            },
        };
        Ok(DatasetConfig {
            buildings_path: required_path(yaml_cfg, "buildings_path", base_dir)?,
            services_path: required_path(yaml_cfg, "services_path", base_dir)?,
            matrix_source,
            output_dir: optional_path(yaml_cfg, "output_dir", base_dir)?,
        })
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct ProvisionConfig {
    pub threshold: f64,
    pub method: AllocationMethod,
    pub settings: EngineSettings,
    pub batch_size: usize,
    pub cost: CostKind,
    pub selection_zone: Option<Polygon<f64>>,
    /// demand units per inhabitant, for buildings that only give a population
    pub normative: Option<f64>,
    pub dataset: DatasetConfig,
}

fn count_from(yaml_cfg: &Yaml, key: &str, default: u64) -> Result<u64, Box<dyn Error>> {
    match optional_number(yaml_cfg, key)? {
        Some(value) if value >= 0. && value.fract() == 0. => Ok(value as u64),
        Some(value) => Err(format!("config key '{}' must be a whole number, got {}", key, value)
                           .into()),
        None => Ok(default),
    }
}

fn zone_from(value: &Yaml) -> Result<Option<Polygon<f64>>, Box<dyn Error>> {
    if value.is_badvalue() || value.is_null() {
        return Ok(None);
    }
    let vertices = value.as_vec().ok_or("selection_zone must be a list of [x, y] pairs")?;
    let mut ring = vec![];
    for vertex in vertices {
        let coords = vertex.as_vec().ok_or("selection_zone vertices must be [x, y] pairs")?;
        match coords.as_slice() {
            [xx, yy] => match (yaml_number(xx), yaml_number(yy)) {
                (Some(xx), Some(yy)) => ring.push((xx, yy)),
                _ => return Err("selection_zone coordinates must be numbers".into()),
            },
            _ => return Err("selection_zone vertices must be [x, y] pairs".into()),
        }
    }
    if ring.len() < 3 {
        return Err("selection_zone needs at least three vertices".into());
    }
    Ok(Some(polygon_from_ring(ring)))
}

impl ProvisionConfig {
    /// Relative paths in the config are taken relative to `base_dir`.
    pub fn from_yaml(yaml_cfg: &Yaml, base_dir: &Path) -> Result<ProvisionConfig, Box<dyn Error>> {
        let threshold = optional_number(yaml_cfg, "threshold")?
            .ok_or("config key 'threshold' is required")?;
        if !(threshold.is_finite() && threshold > 0.) {
            return Err(Box::new(ProvisionError::InvalidThreshold(threshold)));
        }
        let method = match optional_str(yaml_cfg, "calculation_type")? {
            Some(name) => name.parse::<AllocationMethod>()?,
            None => AllocationMethod::Gravity,
        };

        let defaults = EngineSettings::default();
        let timeout_s = optional_number(yaml_cfg, "solver_timeout_s")?
            .unwrap_or(defaults.solver_timeout.as_secs_f64());
        if !(timeout_s.is_finite() && timeout_s > 0.) {
            return Err(format!("solver_timeout_s must be positive, got {}", timeout_s).into());
        }
        let settings = EngineSettings {
            max_rounds: count_from(yaml_cfg, "max_rounds", defaults.max_rounds as u64)? as usize,
            seed: count_from(yaml_cfg, "seed", defaults.seed)?,
            solver_timeout: Duration::from_secs_f64(timeout_s),
        };

        let cost = match optional_str(yaml_cfg, "cost")? {
            Some(name) => name.parse::<CostKind>()?,
            None => CostKind::Time,
        };
        let dataset_cfg = &yaml_cfg["dataset"];
        if dataset_cfg.is_badvalue() {
            return Err("config has no 'dataset' section".into());
        }

        Ok(ProvisionConfig {
            threshold,
            method,
            settings,
            batch_size: count_from(yaml_cfg, "batch_size", DEFAULT_BATCH_SIZE as u64)? as usize,
            cost,
            selection_zone: zone_from(&yaml_cfg["selection_zone"])?,
            normative: optional_number(yaml_cfg, "normative")?,
            dataset: DatasetConfig::from_yaml(dataset_cfg, base_dir)?,
        })
    }

    pub fn from_path(config_path: &Path) -> Result<ProvisionConfig, Box<dyn Error>> {
        let file_contents = fs::read_to_string(config_path)
            .map_err(|err| format!("could not read {}: {}", config_path.display(), err))?;
        let docs = YamlLoader::load_from_str(&file_contents)?;
        let yaml_cfg = docs.get(0).ok_or("the config file is empty")?;
        let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
        log::info!("loading config from {}", config_path.display());
        ProvisionConfig::from_yaml(yaml_cfg, base_dir)
    }
}
