use std::error::Error;
use std::path::Path;
use std::path::PathBuf;

use yaml_rust::Yaml;


pub fn str_to_absolute_path(path_str: &str, default_base_dir: &Path) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        return path;
    } else {
        return [default_base_dir, Path::new(&path)].iter().collect();
    }
}

/// Reads a number that may have been written as an integer or a real.
pub fn yaml_number(value: &Yaml) -> Option<f64> {
    match value {
        Yaml::Real(_) => value.as_f64(),
        Yaml::Integer(ii) => Some(*ii as f64),
        _ => None,
    }
}

/// Like `yaml_number`, but a present value of the wrong type is an error.  Absent keys give None.
pub fn optional_number(cfg: &Yaml, key: &str) -> Result<Option<f64>, Box<dyn Error>> {
    let value = &cfg[key];
    if value.is_badvalue() || value.is_null() {
        return Ok(None);
    }
    match yaml_number(value) {
        Some(number) => Ok(Some(number)),
        None => Err(format!("config key '{}' must be a number", key).into()),
    }
}

pub fn optional_str<'a>(cfg: &'a Yaml, key: &str) -> Result<Option<&'a str>, Box<dyn Error>> {
    let value = &cfg[key];
    if value.is_badvalue() || value.is_null() {
        return Ok(None);
    }
    match value.as_str() {
        Some(ss) => Ok(Some(ss)),
        None => Err(format!("config key '{}' must be a string", key).into()),
    }
}

pub fn optional_path(cfg: &Yaml, key: &str, base_dir: &Path)
                     -> Result<Option<PathBuf>, Box<dyn Error>> {
    Ok(optional_str(cfg, key)?.map(|ss| str_to_absolute_path(ss, base_dir)))
}

pub fn required_path(cfg: &Yaml, key: &str, base_dir: &Path) -> Result<PathBuf, Box<dyn Error>> {
    match optional_path(cfg, key, base_dir)? {
        Some(path) => Ok(path),
        None => Err(format!("config key '{}' is required", key).into()),
    }
}
