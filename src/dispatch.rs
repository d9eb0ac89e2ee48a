use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::sync::mpsc;
use std::thread;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::MetaprepError;
use crate::planner::CountingJob;
use crate::tools::find_in_path;

pub trait CountRunner: Send + Sync {
    fn run_job(&self, job: &CountingJob) -> Result<(), MetaprepError>;
}

pub struct JellyfishRunner {
    jellyfish: PathBuf,
    decompressor: PathBuf,
}

impl JellyfishRunner {
    pub fn new() -> Result<Self, MetaprepError> {
        let jellyfish = find_in_path("jellyfish")
            .ok_or_else(|| MetaprepError::MissingTool("jellyfish".to_string()))?;
        let decompressor = find_in_path("zcat")
            .ok_or_else(|| MetaprepError::MissingTool("zcat".to_string()))?;
        Ok(Self {
            jellyfish,
            decompressor,
        })
    }

    fn count_args(job: &CountingJob) -> Vec<String> {
        vec![
            "count".to_string(),
            "-m".to_string(),
            job.kmer_size.to_string(),
            "-s".to_string(),
            job.hash_size.clone(),
            "-t".to_string(),
            job.threads.to_string(),
            "-C".to_string(),
            "-o".to_string(),
            job.output.to_string_lossy().to_string(),
        ]
    }

    fn count_piped(&self, job: &CountingJob) -> Result<(), MetaprepError> {
        let mut decompress = Command::new(&self.decompressor)
            .arg(&job.input)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| MetaprepError::ToolFailure {
                tool: "zcat".to_string(),
                message: err.to_string(),
            })?;
        let stream = decompress
            .stdout
            .take()
            .ok_or_else(|| MetaprepError::ToolFailure {
                tool: "zcat".to_string(),
                message: "no stdout handle".to_string(),
            })?;

        let count = Command::new(&self.jellyfish)
            .args(Self::count_args(job))
            .stdin(Stdio::from(stream))
            .output()
            .map_err(|err| MetaprepError::ToolFailure {
                tool: "jellyfish".to_string(),
                message: err.to_string(),
            })?;

        let decompress = decompress
            .wait_with_output()
            .map_err(|err| MetaprepError::ToolFailure {
                tool: "zcat".to_string(),
                message: err.to_string(),
            })?;

        check_status("jellyfish", &count.status, &count.stderr)?;
        check_status("zcat", &decompress.status, &decompress.stderr)
    }

    fn count_direct(&self, job: &CountingJob) -> Result<(), MetaprepError> {
        let mut args = Self::count_args(job);
        args.push(job.input.to_string_lossy().to_string());
        let output = Command::new(&self.jellyfish)
            .args(&args)
            .output()
            .map_err(|err| MetaprepError::ToolFailure {
                tool: "jellyfish".to_string(),
                message: err.to_string(),
            })?;
        check_status("jellyfish", &output.status, &output.stderr)
    }
}

fn check_status(
    tool: &str,
    status: &std::process::ExitStatus,
    stderr: &[u8],
) -> Result<(), MetaprepError> {
    if status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(stderr).trim().to_string();
    let message = if stderr.is_empty() {
        format!("exited with {status}")
    } else {
        stderr
    };
    Err(MetaprepError::ToolFailure {
        tool: tool.to_string(),
        message,
    })
}

impl CountRunner for JellyfishRunner {
    fn run_job(&self, job: &CountingJob) -> Result<(), MetaprepError> {
        if job.compressed {
            self.count_piped(job)
        } else {
            self.count_direct(job)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobFailure {
    pub input: String,
    pub kmer_size: u32,
    pub output: String,
    pub message: String,
}

#[derive(Debug, Default, Serialize)]
pub struct DispatchReport {
    pub completed: usize,
    pub failures: Vec<JobFailure>,
}

pub fn run_jobs<R: CountRunner>(
    runner: &R,
    jobs: &[CountingJob],
    worker_count: usize,
) -> DispatchReport {
    let worker_count = worker_count.clamp(1, jobs.len().max(1));
    let queue = Mutex::new(jobs.iter());
    let mut report = DispatchReport::default();

    thread::scope(|scope| {
        let (sender, receiver) = mpsc::channel();
        for _ in 0..worker_count {
            let sender = sender.clone();
            let queue = &queue;
            scope.spawn(move || {
                loop {
                    let job = match queue.lock() {
                        Ok(mut pending) => pending.next(),
                        Err(_) => None,
                    };
                    let Some(job) = job else { break };
                    let outcome = runner.run_job(job);
                    if sender.send((job, outcome)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(sender);

        for (job, outcome) in receiver {
            match outcome {
                Ok(()) => {
                    info!(
                        input = %job.input.display(),
                        k = job.kmer_size,
                        output = %job.output.display(),
                        "counting job finished"
                    );
                    report.completed += 1;
                }
                Err(err) => {
                    warn!(
                        input = %job.input.display(),
                        k = job.kmer_size,
                        %err,
                        "counting job failed, continuing with remaining jobs"
                    );
                    report.failures.push(JobFailure {
                        input: job.input.to_string_lossy().to_string(),
                        kmer_size: job.kmer_size,
                        output: job.output.to_string_lossy().to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }
    });

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::build_jobs;

    struct NoopRunner;

    impl CountRunner for NoopRunner {
        fn run_job(&self, _job: &CountingJob) -> Result<(), MetaprepError> {
            Ok(())
        }
    }

    #[test]
    fn zero_workers_is_clamped() {
        let jobs = build_jobs(&[PathBuf::from("f1")], &[2], "100M", 1, false);
        let report = run_jobs(&NoopRunner, &jobs, 0);
        assert_eq!(report.completed, 1);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn empty_batch_is_a_noop() {
        let report = run_jobs(&NoopRunner, &[], 4);
        assert_eq!(report.completed, 0);
        assert!(report.failures.is_empty());
    }
}
