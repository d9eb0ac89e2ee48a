use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::error::MetaprepError;

pub const API_KEY_ENV: &str = "NCBI_API_KEY";

const MAX_RETRIES: usize = 3;
const BASE_DELAY_MS: u64 = 200;

#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub datasets: Option<String>,
    pub dataformat: Option<String>,
    pub jellyfish: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ToolStatus {
    Ready,
    Missing { message: String },
}

pub trait DatasetsClient: Send + Sync {
    fn summary_json(&self, taxon: &str) -> Result<String, MetaprepError>;
    fn format_tsv(&self, json_path: &Path) -> Result<String, MetaprepError>;
    fn download_genome(&self, accession: &str, destination: &Path) -> Result<(), MetaprepError>;
    fn tool_info(&self) -> ToolInfo;
}

#[derive(Clone)]
pub struct SystemDatasetsClient {
    datasets: Option<PathBuf>,
    dataformat: Option<PathBuf>,
    api_key: Option<String>,
}

impl SystemDatasetsClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            datasets: find_in_path("datasets"),
            dataformat: find_in_path("dataformat"),
            api_key,
        }
    }

    pub fn tool_status(&self) -> ToolStatus {
        if self.datasets.is_none() {
            return ToolStatus::Missing {
                message: "missing datasets (NCBI Datasets CLI)".to_string(),
            };
        }
        if self.dataformat.is_none() {
            return ToolStatus::Missing {
                message: "missing dataformat (NCBI Datasets CLI)".to_string(),
            };
        }
        ToolStatus::Ready
    }

    fn require_datasets(&self) -> Result<&PathBuf, MetaprepError> {
        self.datasets
            .as_ref()
            .ok_or_else(|| MetaprepError::MissingTool("datasets".to_string()))
    }

    fn require_dataformat(&self) -> Result<&PathBuf, MetaprepError> {
        self.dataformat
            .as_ref()
            .ok_or_else(|| MetaprepError::MissingTool("dataformat".to_string()))
    }

    fn run_captured(&self, program: &Path, args: &[String]) -> Result<String, MetaprepError> {
        let tool = program_name(program);
        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(key) = &self.api_key {
            cmd.env(API_KEY_ENV, key);
        }
        debug!(tool = %tool, args = ?args, "invoking external tool");
        let output = cmd.output().map_err(|err| MetaprepError::ToolFailure {
            tool: tool.clone(),
            message: err.to_string(),
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr
            };
            return Err(MetaprepError::ToolFailure { tool, message });
        }
        String::from_utf8(output.stdout).map_err(|err| MetaprepError::ToolFailure {
            tool,
            message: format!("non-utf8 output: {err}"),
        })
    }

    fn run_captured_with_retries(
        &self,
        program: &Path,
        args: &[String],
    ) -> Result<String, MetaprepError> {
        let mut attempt = 0usize;
        loop {
            match self.run_captured(program, args) {
                Ok(stdout) => return Ok(stdout),
                Err(err) if attempt < MAX_RETRIES => {
                    let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                    debug!(%err, attempt, "retrying external tool after failure");
                    thread::sleep(Duration::from_millis(delay));
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl DatasetsClient for SystemDatasetsClient {
    fn summary_json(&self, taxon: &str) -> Result<String, MetaprepError> {
        let datasets = self.require_datasets()?.clone();
        let args = vec![
            "summary".to_string(),
            "genome".to_string(),
            "taxon".to_string(),
            taxon.to_string(),
            "--mag".to_string(),
            "exclude".to_string(),
            "--reference".to_string(),
        ];
        self.run_captured_with_retries(&datasets, &args)
    }

    fn format_tsv(&self, json_path: &Path) -> Result<String, MetaprepError> {
        let dataformat = self.require_dataformat()?.clone();
        let args = vec![
            "tsv".to_string(),
            "genome".to_string(),
            "--inputfile".to_string(),
            json_path.to_string_lossy().to_string(),
        ];
        self.run_captured(&dataformat, &args)
    }

    fn download_genome(&self, accession: &str, destination: &Path) -> Result<(), MetaprepError> {
        let datasets = self.require_datasets()?.clone();
        let args = vec![
            "download".to_string(),
            "genome".to_string(),
            "accession".to_string(),
            accession.to_string(),
            "--filename".to_string(),
            destination.to_string_lossy().to_string(),
        ];
        self.run_captured_with_retries(&datasets, &args)?;
        Ok(())
    }

    fn tool_info(&self) -> ToolInfo {
        ToolInfo {
            datasets: self
                .datasets
                .as_ref()
                .and_then(|path| tool_version(path, &["--version"])),
            dataformat: self
                .dataformat
                .as_ref()
                .and_then(|path| tool_version(path, &["version"])),
            jellyfish: find_in_path("jellyfish")
                .as_ref()
                .and_then(|path| tool_version(path, &["--version"])),
        }
    }
}

pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.exists() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.exists() {
            return Some(plain);
        }
    }
    None
}

fn program_name(program: &Path) -> String {
    program
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| program.to_string_lossy().to_string())
}

fn tool_version(path: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new(path).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if stdout.is_empty() { None } else { Some(stdout) }
}
