use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::catalog::AssemblyLevel;
use crate::error::MetaprepError;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub taxon: Option<String>,
    #[serde(default)]
    pub genome_folder: Option<String>,
    #[serde(default)]
    pub summary_folder: Option<String>,
    #[serde(default)]
    pub summary_max_age_days: Option<u64>,
    #[serde(default)]
    pub assembly_level: Option<String>,
    #[serde(default)]
    pub min_coverage: Option<f64>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub kmer_sizes: Option<Vec<u32>>,
    #[serde(default)]
    pub hash_size: Option<String>,
    #[serde(default)]
    pub counter_threads: Option<u32>,
    #[serde(default)]
    pub jobs: Option<usize>,
    #[serde(default)]
    pub compressed: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub api_key: Option<String>,
    pub taxon: String,
    pub genome_folder: Utf8PathBuf,
    pub summary_folder: Utf8PathBuf,
    pub summary_max_age_days: u64,
    pub assembly_level: AssemblyLevel,
    pub min_coverage: f64,
    pub pattern: String,
    pub kmer_sizes: Vec<u32>,
    pub hash_size: String,
    pub counter_threads: u32,
    pub jobs: usize,
    pub compressed: bool,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, MetaprepError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from("metaprep.json"),
        };

        if path.is_none() && !config_path.exists() {
            return Err(MetaprepError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| MetaprepError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| MetaprepError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, MetaprepError> {
        let assembly_level = match config.assembly_level {
            Some(value) => value.parse()?,
            None => AssemblyLevel::Complete,
        };

        Ok(ResolvedConfig {
            api_key: config.api_key,
            taxon: config.taxon.unwrap_or_else(|| "Bacteria".to_string()),
            genome_folder: Utf8PathBuf::from(
                config.genome_folder.unwrap_or_else(|| "genomes".to_string()),
            ),
            summary_folder: Utf8PathBuf::from(
                config.summary_folder.unwrap_or_else(|| ".".to_string()),
            ),
            summary_max_age_days: config.summary_max_age_days.unwrap_or(30),
            assembly_level,
            min_coverage: config.min_coverage.unwrap_or(0.0),
            pattern: config.pattern.unwrap_or_else(|| "*.fna.gz".to_string()),
            kmer_sizes: config.kmer_sizes.unwrap_or_else(|| (2..=10).collect()),
            hash_size: config.hash_size.unwrap_or_else(|| "100M".to_string()),
            counter_threads: config.counter_threads.unwrap_or(2),
            jobs: config.jobs.unwrap_or(4),
            compressed: config.compressed.unwrap_or(true),
        })
    }
}
