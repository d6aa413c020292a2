use std::error::Error;
use std::path::Path;

use city_provision::{write_results, CityProvision, ProvisionConfig};
use env_logger;


fn run(config_path: &Path) -> Result<(), Box<dyn Error>> {
    let config = ProvisionConfig::from_path(config_path)?;
    let provision = CityProvision::from_config(&config)?;
    let result = provision.get_provisions()?;

    let unserved: u64 = result.buildings.iter().map(|bp| bp.demand_left).sum();
    let within: u64 = result.buildings.iter().map(|bp| bp.supplied_demands_within).sum();
    println!("{:?} after {} rounds: {} units served within the threshold, {} unserved",
             result.outcome.termination, result.outcome.rounds, within, unserved);

    let output_dir = match &config.dataset.output_dir {
        Some(dir) => dir.clone(),
        None => config_path.parent().unwrap_or_else(|| Path::new(".")).join("output"),
    };
    write_results(&output_dir, &result)?;
    Ok(())
}

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        eprintln!("usage: {} <config.yaml>", args.get(0).map_or("provision", |aa| aa.as_str()));
        std::process::exit(2);
    }
    if let Err(err) = run(Path::new(&args[1])) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
