// Reading the input tables of a provision calculation and writing its results, all as csv.
use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::fs::File;
use std::path::Path;

use geo::LineString;

use super::distance_matrix::DistanceMatrix;
use super::entities::{demands_from_population, BuildingRecord, ServiceRecord};
use super::errors::ProvisionError;
use super::geometry::Footprint;
use super::links::ProvisionLink;
use super::metrics::{BuildingProvision, ServiceProvision};
use super::provision::ProvisionResult;


// A convenience type for parsing csv data
type Row = HashMap<String, String>;

pub static BUILDINGS_FILENAME: &str = "buildings.csv";
pub static SERVICES_FILENAME: &str = "services.csv";
pub static LINKS_FILENAME: &str = "links.csv";

/// Fails with `MissingAttribute` unless the table's header names every one of `columns`.
pub fn require_columns(path: &Path, table: &'static str, columns: &[&'static str])
                       -> Result<Vec<String>, Box<dyn Error>> {
    let mut reader = csv::Reader::from_reader(File::open(path)?);
    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
    for &column in columns {
        if !headers.iter().any(|hh| hh == column) {
            return Err(Box::new(ProvisionError::MissingAttribute {table, attribute: column}));
        }
    }
    Ok(headers)
}

/// Parses a count cell.  Empty, non-numeric-looking or negative cells are null.
fn parse_count(cell: Option<&String>) -> Result<Option<u64>, Box<dyn Error>> {
    let cell = match cell.map(|cc| cc.trim()) {
        None | Some("") => return Ok(None),
        Some(cell) => cell,
    };
    let value: f64 = cell.parse()?;
    if !value.is_finite() || value < 0. {
        return Ok(None);
    }
    Ok(Some(value.round() as u64))
}

/// Parses `x y;x y;...` into a ring of coordinates.
fn parse_ring(cell: &str) -> Result<Vec<(f64, f64)>, Box<dyn Error>> {
    let mut ring = vec![];
    for pair in cell.split(';').map(|pp| pp.trim()).filter(|pp| !pp.is_empty()) {
        let coords: Vec<&str> = pair.split_whitespace().collect();
        if coords.len() != 2 {
            return Err(format!("malformed coordinate pair '{}'", pair).into());
        }
        ring.push((coords[0].parse()?, coords[1].parse()?));
    }
    Ok(ring)
}

fn parse_footprint(row: &Row) -> Result<Footprint, Box<dyn Error>> {
    if let Some(cell) = row.get("polygon") {
        if !cell.trim().is_empty() {
            return Ok(Footprint::polygon(parse_ring(cell)?));
        }
    }
    Ok(Footprint::point(row["x"].parse()?, row["y"].parse()?))
}

/// Reads `id,x,y,demand` rows.  When `normative` is given, buildings with no demand get one
/// from their `population`, and the demand column may be absent altogether.
pub fn read_buildings(path: &Path, normative: Option<f64>)
                      -> Result<Vec<BuildingRecord>, Box<dyn Error>> {
    let headers = require_columns(path, "buildings", &["id", "x", "y"])?;
    let has_population = normative.is_some() && headers.iter().any(|hh| hh == "population");
    if !has_population && !headers.iter().any(|hh| hh == "demand") {
        return Err(Box::new(ProvisionError::MissingAttribute {
            table: "buildings",
            attribute: "demand",
        }));
    }

    let mut buildings = vec![];
    let mut reader = csv::Reader::from_reader(File::open(path)?);
    for result in reader.deserialize() {
        let row: Row = result?;
        let mut demand = parse_count(row.get("demand"))?;
        if let (None, Some(normative), true) = (demand, normative, has_population) {
            let population = row.get("population").map(|pp| pp.trim()).unwrap_or("");
            if !population.is_empty() {
                demand = demands_from_population(population.parse()?, normative);
            }
        }
        buildings.push(BuildingRecord::new(row["id"].parse()?, parse_footprint(&row)?, demand));
    }
    log::info!("read {} buildings from {}", buildings.len(), path.display());
    Ok(buildings)
}

/// Reads `id,x,y,capacity` rows.
pub fn read_services(path: &Path) -> Result<Vec<ServiceRecord>, Box<dyn Error>> {
    require_columns(path, "services", &["id", "x", "y", "capacity"])?;
    let mut services = vec![];
    let mut reader = csv::Reader::from_reader(File::open(path)?);
    for result in reader.deserialize() {
        let row: Row = result?;
        let capacity = parse_count(row.get("capacity"))?;
        services.push(ServiceRecord::new(row["id"].parse()?, parse_footprint(&row)?, capacity));
    }
    log::info!("read {} services from {}", services.len(), path.display());
    Ok(services)
}

/// Reads a matrix whose header is `service_id` followed by building ids, with one row per
/// service.  `inf` and empty cells are unreachable pairs.
pub fn read_distance_matrix(path: &Path) -> Result<DistanceMatrix, Box<dyn Error>> {
    let mut reader = csv::Reader::from_reader(File::open(path)?);
    let headers = reader.headers()?.clone();
    if headers.get(0).map(|hh| hh.trim()) != Some("service_id") {
        return Err(Box::new(ProvisionError::MissingAttribute {
            table: "distance matrix",
            attribute: "service_id",
        }));
    }
    let mut building_ids = vec![];
    for header in headers.iter().skip(1) {
        building_ids.push(header.trim().parse::<i64>()?);
    }

    let mut service_ids = vec![];
    let mut rows = vec![];
    for result in reader.records() {
        let record = result?;
        let mut cells = record.iter();
        let service_id: i64 = match cells.next() {
            Some(cell) => cell.trim().parse()?,
            None => continue,
        };
        let mut row = Vec::with_capacity(building_ids.len());
        for cell in cells {
            let cell = cell.trim();
            if cell.is_empty() {
                row.push(f64::INFINITY);
            } else {
                // also accepts "inf"
                row.push(cell.parse()?);
            }
        }
        service_ids.push(service_id);
        rows.push(row);
    }
    log::info!("read a {} by {} distance matrix", service_ids.len(), building_ids.len());
    Ok(DistanceMatrix::from_rows(service_ids, building_ids, rows)?)
}

fn format_line(line: &LineString<f64>) -> String {
    let pairs: Vec<String> = line.coords().map(|cc| format!("{} {}", cc.x, cc.y)).collect();
    pairs.join(";")
}

pub fn write_buildings(path: &Path, buildings: &[BuildingProvision])
                       -> Result<(), Box<dyn Error>> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&["id", "x", "y", "demand", "demand_left", "supplied_demands_within",
                          "supplied_demands_without", "provision_value"])?;
    for bp in buildings {
        let [x_coord, y_coord] = bp.footprint.as_array();
        writer.write_record(&[
            bp.id.to_string(), x_coord.to_string(), y_coord.to_string(), bp.demand.to_string(),
            bp.demand_left.to_string(), bp.supplied_demands_within.to_string(),
            bp.supplied_demands_without.to_string(), bp.provision_value.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_services(path: &Path, services: &[ServiceProvision]) -> Result<(), Box<dyn Error>> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&["id", "x", "y", "capacity", "capacity_left",
                          "carried_capacity_within", "carried_capacity_without",
                          "service_load"])?;
    for sp in services {
        let [x_coord, y_coord] = sp.footprint.as_array();
        writer.write_record(&[
            sp.id.to_string(), x_coord.to_string(), y_coord.to_string(), sp.capacity.to_string(),
            sp.capacity_left.to_string(), sp.carried_capacity_within.to_string(),
            sp.carried_capacity_without.to_string(), sp.service_load.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_links(path: &Path, links: &[ProvisionLink]) -> Result<(), Box<dyn Error>> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&["building_id", "service_id", "flow", "distance", "geometry"])?;
    for link in links {
        writer.write_record(&[
            link.building_id.to_string(), link.service_id.to_string(), link.flow.to_string(),
            link.distance.to_string(), format_line(&link.geometry),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the three result tables into `output_dir`, creating it if needed.
pub fn write_results(output_dir: &Path, result: &ProvisionResult) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(output_dir)?;
    write_buildings(&output_dir.join(BUILDINGS_FILENAME), &result.buildings)?;
    write_services(&output_dir.join(SERVICES_FILENAME), &result.services)?;
    write_links(&output_dir.join(LINKS_FILENAME), &result.links)?;
    log::info!("wrote results to {}", output_dir.display());
    Ok(())
}
