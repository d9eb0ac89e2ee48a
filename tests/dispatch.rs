use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;

use metaprep::dispatch::{CountRunner, run_jobs};
use metaprep::error::MetaprepError;
use metaprep::planner::{CountingJob, build_jobs};

#[derive(Default)]
struct RecordingRunner {
    outputs: Mutex<Vec<PathBuf>>,
    fail_on: Option<PathBuf>,
}

impl CountRunner for RecordingRunner {
    fn run_job(&self, job: &CountingJob) -> Result<(), MetaprepError> {
        if self.fail_on.as_deref() == Some(job.output.as_path()) {
            return Err(MetaprepError::ToolFailure {
                tool: "jellyfish".to_string(),
                message: "simulated crash".to_string(),
            });
        }
        self.outputs.lock().unwrap().push(job.output.clone());
        Ok(())
    }
}

fn ten_jobs() -> Vec<CountingJob> {
    let files: Vec<PathBuf> = (0..5).map(|i| PathBuf::from(format!("g{i}.fna.gz"))).collect();
    build_jobs(&files, &[3, 5], "100M", 2, true)
}

#[test]
fn four_workers_complete_ten_distinct_jobs() {
    let jobs = ten_jobs();
    assert_eq!(jobs.len(), 10);

    let runner = RecordingRunner::default();
    let report = run_jobs(&runner, &jobs, 4);

    assert_eq!(report.completed, 10);
    assert!(report.failures.is_empty());

    let outputs = runner.outputs.lock().unwrap();
    let distinct: HashSet<&PathBuf> = outputs.iter().collect();
    assert_eq!(distinct.len(), 10);

    let expected: HashSet<PathBuf> = jobs.iter().map(|job| job.output.clone()).collect();
    assert_eq!(distinct.into_iter().cloned().collect::<HashSet<_>>(), expected);
}

#[test]
fn failed_job_does_not_abort_siblings() {
    let jobs = ten_jobs();
    let runner = RecordingRunner {
        fail_on: Some(jobs[3].output.clone()),
        ..RecordingRunner::default()
    };

    let report = run_jobs(&runner, &jobs, 4);
    assert_eq!(report.completed, 9);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].output, jobs[3].output.to_string_lossy());
    assert_eq!(runner.outputs.lock().unwrap().len(), 9);
}

#[test]
fn single_worker_processes_everything() {
    let jobs = ten_jobs();
    let runner = RecordingRunner::default();
    let report = run_jobs(&runner, &jobs, 1);
    assert_eq!(report.completed, 10);
}

#[test]
fn more_workers_than_jobs_is_fine() {
    let jobs = build_jobs(&[PathBuf::from("only.fna.gz")], &[2], "100M", 1, false);
    let runner = RecordingRunner::default();
    let report = run_jobs(&runner, &jobs, 16);
    assert_eq!(report.completed, 1);
}
