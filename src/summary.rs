use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::catalog::GenomeRecord;
use crate::error::MetaprepError;
use crate::freshness::is_stale;
use crate::tools::DatasetsClient;

#[derive(Debug, Clone)]
pub struct SummaryPaths {
    pub json: PathBuf,
    pub tsv: PathBuf,
}

impl SummaryPaths {
    pub fn in_dir(dir: &Path, taxon: &str) -> Self {
        let stem = taxon.to_lowercase();
        Self {
            json: dir.join(format!("{stem}.json")),
            tsv: dir.join(format!("{stem}.tsv")),
        }
    }
}

pub fn refresh<D: DatasetsClient>(
    client: &D,
    paths: &SummaryPaths,
    taxon: &str,
    max_age_days: u64,
    force: bool,
) -> Result<Vec<GenomeRecord>, MetaprepError> {
    let cached = paths.tsv.exists();
    let needs_refresh = force || !cached || is_stale(&paths.tsv, max_age_days)?;

    if needs_refresh {
        match fetch_table(client, paths, taxon) {
            Ok(()) => info!(tsv = %paths.tsv.display(), "summary table refreshed"),
            Err(err @ (MetaprepError::ToolFailure { .. } | MetaprepError::MissingTool(_)))
                if cached =>
            {
                warn!(%err, "summary refresh failed, using last-known-good cached table");
            }
            Err(err) => return Err(err),
        }
    }

    read_table(&paths.tsv)
}

fn fetch_table<D: DatasetsClient>(
    client: &D,
    paths: &SummaryPaths,
    taxon: &str,
) -> Result<(), MetaprepError> {
    let json = client.summary_json(taxon)?;
    write_atomic(&paths.json, json.as_bytes())?;
    let tsv = client.format_tsv(&paths.json)?;
    write_atomic(&paths.tsv, tsv.as_bytes())
}

pub fn read_table(path: &Path) -> Result<Vec<GenomeRecord>, MetaprepError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_path(path)
        .map_err(|err| MetaprepError::SummaryParse(err.to_string()))?;

    let mut records = Vec::new();
    for row in reader.deserialize::<GenomeRecord>() {
        let record = row.map_err(|err| MetaprepError::MalformedRecord(err.to_string()))?;
        records.push(record);
    }
    Ok(records)
}

pub fn write_atomic(path: &Path, content: &[u8]) -> Result<(), MetaprepError> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&parent).map_err(|err| MetaprepError::Filesystem(err.to_string()))?;
    let temp = tempfile::Builder::new()
        .prefix("metaprep")
        .tempfile_in(&parent)
        .map_err(|err| MetaprepError::Filesystem(err.to_string()))?;
    fs::write(temp.path(), content).map_err(|err| MetaprepError::Filesystem(err.to_string()))?;
    temp.persist(path)
        .map_err(|err| MetaprepError::Filesystem(err.to_string()))?;
    Ok(())
}
