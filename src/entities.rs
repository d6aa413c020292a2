use std::collections::HashSet;

use super::errors::ProvisionError;
use super::geometry::Footprint;


/// A building as it arrives from the caller.  `demand` is `None` where the input had no value.
#[derive(PartialEq, Debug, Clone)]
pub struct BuildingRecord {
    pub id: i64,
    pub footprint: Footprint,
    pub demand: Option<u64>,
}

impl BuildingRecord {
    pub fn new(id: i64, footprint: Footprint, demand: Option<u64>) -> BuildingRecord {
        BuildingRecord {id, footprint, demand}
    }
}

/// A service as it arrives from the caller.
#[derive(PartialEq, Debug, Clone)]
pub struct ServiceRecord {
    pub id: i64,
    pub footprint: Footprint,
    pub capacity: Option<u64>,
}

impl ServiceRecord {
    pub fn new(id: i64, footprint: Footprint, capacity: Option<u64>) -> ServiceRecord {
        ServiceRecord {id, footprint, capacity}
    }
}

/// Anything with an id and a place in the city.
pub trait Located {
    fn id(&self) -> i64;
    fn footprint(&self) -> &Footprint;
}

#[derive(PartialEq, Debug, Clone)]
pub struct Building {
    pub id: i64,
    pub footprint: Footprint,
    pub demand: u64,
    /// equal to `demand` on validation; the engine tracks its own remainders per run
    pub demand_left: u64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct Service {
    pub id: i64,
    pub footprint: Footprint,
    pub capacity: u64,
    /// equal to `capacity` on validation
    pub capacity_left: u64,
}

macro_rules! impl_located {
    ($($tt:ty),*) => {
        $(impl Located for $tt {
            fn id(&self) -> i64 {
                self.id
            }

            fn footprint(&self) -> &Footprint {
                &self.footprint
            }
        })*
    };
}

impl_located!(BuildingRecord, ServiceRecord, Building, Service);

/// Largest demand or capacity a single building or service may have.  Keeps every total
/// within `u64` and bounds the number of draws a gravity round makes.
pub static MAX_COUNT: u64 = 1_000_000_000;

/// Rejects a count above `MAX_COUNT`.
pub fn check_count(kind: &'static str, id: i64, value: u64) -> Result<u64, ProvisionError> {
    if value > MAX_COUNT {
        return Err(ProvisionError::CountTooLarge {kind, id, value, limit: MAX_COUNT});
    }
    Ok(value)
}

/// Drops buildings with no or zero demand and initializes their remaining demand.
pub fn validate_buildings(records: Vec<BuildingRecord>) -> Result<Vec<Building>, ProvisionError> {
    let rows_count = records.len();
    let mut seen = HashSet::new();
    let mut buildings = vec![];
    for record in records {
        if !seen.insert(record.id) {
            return Err(ProvisionError::DuplicateId {kind: "building", id: record.id});
        }
        match record.demand {
            Some(demand) if demand > 0 => {
                let demand = check_count("building", record.id, demand)?;
                buildings.push(Building {
                    id: record.id,
                    footprint: record.footprint,
                    demand,
                    demand_left: demand,
                });
            }
            _ => (),
        }
    }

    let dropped = rows_count - buildings.len();
    if dropped > 0 {
        log::info!("{} rows were dropped from the buildings table due to null or zero demand",
                   dropped);
    }
    return Ok(buildings);
}

/// Drops services with no or zero capacity.  Having no valid service at all is an error.
pub fn validate_services(records: Vec<ServiceRecord>) -> Result<Vec<Service>, ProvisionError> {
    let rows_count = records.len();
    let mut seen = HashSet::new();
    let mut services = vec![];
    for record in records {
        if !seen.insert(record.id) {
            return Err(ProvisionError::DuplicateId {kind: "service", id: record.id});
        }
        match record.capacity {
            Some(capacity) if capacity > 0 => {
                let capacity = check_count("service", record.id, capacity)?;
                services.push(Service {
                    id: record.id,
                    footprint: record.footprint,
                    capacity,
                    capacity_left: capacity,
                });
            }
            _ => (),
        }
    }

    if services.is_empty() {
        return Err(ProvisionError::NoValidCapacity);
    }
    let dropped = rows_count - services.len();
    if dropped > 0 {
        log::info!("{} rows were dropped from the services table due to null or zero capacity",
                   dropped);
    }
    return Ok(services);
}

/// Number of people needing the service, given the population and the per-person normative.
pub fn demands_from_population(population: f64, normative: f64) -> Option<u64> {
    let demand = population * normative;
    if !demand.is_finite() || demand < 0. {
        return None;
    }
    Some(demand.round() as u64)
}
