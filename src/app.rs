use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::catalog::{self, GenomeRecord};
use crate::config::ResolvedConfig;
use crate::dispatch::{self, CountRunner, JobFailure};
use crate::error::MetaprepError;
use crate::fs_util;
use crate::planner;
use crate::summary::{self, SummaryPaths};
use crate::tools::DatasetsClient;

#[derive(Debug, Clone, Serialize)]
pub struct RefreshResult {
    pub table: String,
    pub records: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurateResult {
    pub total_records: usize,
    pub filtered: usize,
    pub selected: usize,
    pub downloadable: Vec<String>,
    pub rejected: Vec<GenomeRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadFailure {
    pub accession: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadResult {
    pub downloaded: Vec<String>,
    pub rejected: Vec<GenomeRecord>,
    pub failures: Vec<DownloadFailure>,
}

#[derive(Debug, Serialize)]
pub struct CountResult {
    pub inputs: usize,
    pub jobs: usize,
    pub completed: usize,
    pub failures: Vec<JobFailure>,
}

#[derive(Debug, Serialize)]
pub struct RunResult {
    pub curate: CurateResult,
    pub download: DownloadResult,
    pub count: CountResult,
}

pub struct App<D: DatasetsClient> {
    config: ResolvedConfig,
    datasets: D,
}

impl<D: DatasetsClient> App<D> {
    pub fn new(config: ResolvedConfig, datasets: D) -> Self {
        Self { config, datasets }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    fn summary_paths(&self) -> SummaryPaths {
        SummaryPaths::in_dir(self.config.summary_folder.as_std_path(), &self.config.taxon)
    }

    fn data_root(&self) -> PathBuf {
        self.config
            .genome_folder
            .as_std_path()
            .join("ncbi_dataset")
            .join("data")
    }

    pub fn refresh(&self, force: bool) -> Result<RefreshResult, MetaprepError> {
        let paths = self.summary_paths();
        let records = summary::refresh(
            &self.datasets,
            &paths,
            &self.config.taxon,
            self.config.summary_max_age_days,
            force,
        )?;
        Ok(RefreshResult {
            table: paths.tsv.display().to_string(),
            records: records.len(),
        })
    }

    pub fn curate(&self, force: bool) -> Result<CurateResult, MetaprepError> {
        let (total_records, filtered, downloadable, rejected) = self.curate_records(force)?;
        Ok(CurateResult {
            total_records,
            filtered,
            selected: downloadable.len() + rejected.len(),
            downloadable: downloadable
                .iter()
                .filter_map(|record| record.accession.clone())
                .collect(),
            rejected,
        })
    }

    fn curate_records(
        &self,
        force: bool,
    ) -> Result<(usize, usize, Vec<GenomeRecord>, Vec<GenomeRecord>), MetaprepError> {
        let paths = self.summary_paths();
        let records = summary::refresh(
            &self.datasets,
            &paths,
            &self.config.taxon,
            self.config.summary_max_age_days,
            force,
        )?;
        let filtered = catalog::filter(
            &records,
            self.config.assembly_level,
            self.config.min_coverage,
        );
        let selected = catalog::select_one_per_species(&filtered)?;
        let (downloadable, rejected) = catalog::select_downloadable(&selected);
        for record in &rejected {
            warn!(
                organism = record.organism_name.as_deref().unwrap_or("<unknown>"),
                "selected genome has no accession, cannot download"
            );
        }
        Ok((records.len(), filtered.len(), downloadable, rejected))
    }

    pub fn download(&self, force: bool) -> Result<DownloadResult, MetaprepError> {
        let (_, _, downloadable, rejected) = self.curate_records(force)?;
        let genome_folder = self.config.genome_folder.as_std_path();
        fs::create_dir_all(genome_folder)
            .map_err(|err| MetaprepError::Filesystem(err.to_string()))?;

        let mut downloaded = Vec::new();
        let mut failures = Vec::new();
        for record in &downloadable {
            let Some(accession) = record.accession.as_deref() else {
                continue;
            };
            match self.stage_genome(accession, genome_folder) {
                Ok(()) => {
                    info!(accession, "genome staged");
                    downloaded.push(accession.to_string());
                }
                Err(err) => {
                    warn!(accession, %err, "genome download failed, continuing");
                    failures.push(DownloadFailure {
                        accession: accession.to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }

        Ok(DownloadResult {
            downloaded,
            rejected,
            failures,
        })
    }

    fn stage_genome(&self, accession: &str, genome_folder: &Path) -> Result<(), MetaprepError> {
        let archive = genome_folder.join(format!("{accession}.zip"));
        self.datasets.download_genome(accession, &archive)?;
        fs_util::validate_zip(&archive)?;
        fs_util::extract_zip(&archive, genome_folder)
    }

    pub fn count<R: CountRunner>(
        &self,
        runner: &R,
        genomes: Option<Vec<String>>,
        workers: Option<usize>,
    ) -> Result<CountResult, MetaprepError> {
        let root = self.data_root();
        let genomes = match genomes {
            Some(genomes) => genomes,
            None => list_genome_dirs(&root)?,
        };
        let inputs = planner::enumerate_inputs(&root, &genomes, &self.config.pattern);
        let jobs = planner::build_jobs(
            &inputs,
            &self.config.kmer_sizes,
            &self.config.hash_size,
            self.config.counter_threads,
            self.config.compressed,
        );
        let report = dispatch::run_jobs(runner, &jobs, workers.unwrap_or(self.config.jobs));
        Ok(CountResult {
            inputs: inputs.len(),
            jobs: jobs.len(),
            completed: report.completed,
            failures: report.failures,
        })
    }

    pub fn run<R: CountRunner>(
        &self,
        runner: &R,
        force: bool,
        workers: Option<usize>,
    ) -> Result<RunResult, MetaprepError> {
        let curate = self.curate(force)?;
        let download = self.download(false)?;
        let count = self.count(runner, Some(download.downloaded.clone()), workers)?;
        Ok(RunResult {
            curate,
            download,
            count,
        })
    }
}

fn list_genome_dirs(root: &Path) -> Result<Vec<String>, MetaprepError> {
    if !root.exists() {
        return Err(MetaprepError::FileNotFound(root.to_path_buf()));
    }
    let entries = fs::read_dir(root).map_err(|err| MetaprepError::Filesystem(err.to_string()))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| MetaprepError::Filesystem(err.to_string()))?;
        if entry.path().is_dir() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    names.sort();
    Ok(names)
}
