use thiserror::Error;


#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("attribute '{attribute}' was not found in the provided {table} table")]
    MissingAttribute { table: &'static str, attribute: &'static str },
    #[error("column 'capacity' in the services table has no valid value")]
    NoValidCapacity,
    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: i64 },
    #[error("threshold must be positive and finite (got {0})")]
    InvalidThreshold(f64),
    #[error("invalid distance {value} between service {service_id} and building {building_id}")]
    InvalidDistance { service_id: i64, building_id: i64, value: f64 },
    #[error("distance matrix has shape {got:?}, expected {expected:?}")]
    MatrixShape { expected: (usize, usize), got: (usize, usize) },
    #[error("the transport network has no nodes to snap to")]
    EmptyNetwork,
    #[error("nearest node search failed: {0}")]
    Snapping(String),
    #[error("{kind} {id} was allocated more than it has ({allocated} > {total})")]
    Overallocation { kind: &'static str, id: i64, allocated: u64, total: u64 },
    #[error("{kind} {id} has a count of {value}, more than the allowed {limit}")]
    CountTooLarge { kind: &'static str, id: i64, value: u64, limit: u64 },
    #[error("unknown calculation type '{0}', expected 'gravity' or 'linear'")]
    UnknownMethod(String),
}
