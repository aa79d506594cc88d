// SPDX-License-Identifier: Apache-2.0 OR MIT

//! YAML job configuration for PUT and GET, loadable in place of CLI flags.

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerAddress {
    pub host: String,
    pub port: u16,
}

impl ControllerAddress {
    pub fn socket_addr(&self) -> Result<std::net::SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PutJob {
    pub controller: ControllerAddress,
    pub input_file: String,
    #[serde(default)]
    pub file_dir: String,
    pub chunk_size: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetJob {
    pub controller: ControllerAddress,
    pub input_file: String,
    #[serde(default)]
    pub file_dir: String,
}

#[derive(Debug)]
pub enum JobConfigError {
    Io(String),
    Parse(String),
}

impl std::fmt::Display for JobConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(s) => write!(f, "I/O error: {s}"),
            Self::Parse(s) => write!(f, "parse error: {s}"),
        }
    }
}

impl std::error::Error for JobConfigError {}

pub fn load_put_job(path: &Path) -> Result<PutJob, JobConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| JobConfigError::Io(e.to_string()))?;
    serde_yaml::from_str(&content).map_err(|e| JobConfigError::Parse(e.to_string()))
}

pub fn load_get_job(path: &Path) -> Result<GetJob, JobConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| JobConfigError::Io(e.to_string()))?;
    serde_yaml::from_str(&content).map_err(|e| JobConfigError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_job_round_trips_through_yaml() {
        let job = PutJob {
            controller: ControllerAddress {
                host: "localhost".into(),
                port: 9001,
            },
            input_file: "big.iso".into(),
            file_dir: "/data/".into(),
            chunk_size: Some(128_000_000),
        };

        let yaml = serde_yaml::to_string(&job).unwrap();
        let parsed: PutJob = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.input_file, "big.iso");
        assert_eq!(parsed.chunk_size, Some(128_000_000));
    }

    #[test]
    fn load_put_job_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("put.yaml");
        std::fs::write(
            &path,
            "controller:\n  host: localhost\n  port: 9001\ninput_file: a.bin\nfile_dir: /data/\n",
        )
        .unwrap();

        let job = load_put_job(&path).unwrap();
        assert_eq!(job.controller.port, 9001);
        assert_eq!(job.input_file, "a.bin");
    }
}
