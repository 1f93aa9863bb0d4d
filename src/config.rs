use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, time::Duration};

use crate::{Error, GangwayResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default = "default_report_buffer_size")]
    pub report_buffer_size: usize,

    /// Period of the recurring ticker started alongside the delay.
    #[serde(default = "default_tick_period", with = "duration_ms")]
    pub tick_period: Duration,

    /// Duration handed to the module's delay operation.
    #[serde(default = "default_wait_duration", with = "duration_ms")]
    pub wait_duration: Duration,

    /// Text probe passed across the boundary; quote-heavy on purpose.
    #[serde(default = "default_probe_text")]
    pub probe_text: String,

    #[serde(default = "default_probe_list")]
    pub probe_list: Vec<String>,

    /// Name of the capability bundle to load at startup.
    #[serde(default = "default_module_name")]
    pub module: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            report_buffer_size: default_report_buffer_size(),
            tick_period: default_tick_period(),
            wait_duration: default_wait_duration(),
            probe_text: default_probe_text(),
            probe_list: default_probe_list(),
            module: default_module_name(),
        }
    }
}

impl HarnessConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> GangwayResult<Self> {
        from_file(path)
    }
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> GangwayResult<T> {
    let file = File::open(path)
        .map_err(|e| Error::Internal(format!("Failed to open config file: {}", e)))?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)
        .map_err(|e| Error::Internal(format!("Failed to parse config file: {}", e)))?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> GangwayResult<T> {
    let config = serde_json::from_str(s)
        .map_err(|e| Error::Internal(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

fn default_report_buffer_size() -> usize {
    100
}

fn default_tick_period() -> Duration {
    Duration::from_millis(1000)
}

fn default_wait_duration() -> Duration {
    Duration::from_millis(5000)
}

fn default_probe_text() -> String {
    "Double quote is my favorite, what're you gonna do? Bite me?".to_string()
}

fn default_probe_list() -> Vec<String> {
    vec![
        "Apple".to_string(),
        "Tangerine".to_string(),
        "Durian".to_string(),
        "Venus fly trap".to_string(),
    ]
}

fn default_module_name() -> String {
    "sample".to_string()
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
