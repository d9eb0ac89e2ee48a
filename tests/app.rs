use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use zip::write::SimpleFileOptions;

use metaprep::app::App;
use metaprep::config::{Config, ConfigLoader};
use metaprep::dispatch::CountRunner;
use metaprep::error::MetaprepError;
use metaprep::planner::CountingJob;
use metaprep::tools::{DatasetsClient, ToolInfo};

const TSV: &str = "Assembly Accession\tOrganism Name\tAssembly Level\tAssembly Release Date\tAssembly Stats Genome Coverage\tCheckM completeness\n\
GCF_000005845.2\tEscherichia coli\tComplete Genome\t2013-09-26\t200.0x\t99.8\n\
GCF_000009045.1\tBacillus subtilis\tComplete Genome\t2009-05-20\t150x\t98.1\n\
\tListeria innocua\tComplete Genome\t2011-03-14\t120x\t97.0\n";

struct MockDatasets;

impl DatasetsClient for MockDatasets {
    fn summary_json(&self, _taxon: &str) -> Result<String, MetaprepError> {
        Ok("{}".to_string())
    }

    fn format_tsv(&self, _json_path: &Path) -> Result<String, MetaprepError> {
        Ok(TSV.to_string())
    }

    fn download_genome(&self, accession: &str, destination: &Path) -> Result<(), MetaprepError> {
        let file = File::create(destination).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let entry = format!("ncbi_dataset/data/{accession}/{accession}_genomic.fna.gz");
        writer
            .start_file(entry, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"fake sequence data").unwrap();
        writer.finish().unwrap();
        Ok(())
    }

    fn tool_info(&self) -> ToolInfo {
        ToolInfo {
            datasets: None,
            dataformat: None,
            jellyfish: None,
        }
    }
}

#[derive(Default)]
struct RecordingRunner {
    jobs: Mutex<Vec<CountingJob>>,
}

impl CountRunner for RecordingRunner {
    fn run_job(&self, job: &CountingJob) -> Result<(), MetaprepError> {
        self.jobs.lock().unwrap().push(job.clone());
        Ok(())
    }
}

fn test_app(root: &Path) -> App<MockDatasets> {
    let config = Config {
        genome_folder: Some(root.join("genomes").to_string_lossy().to_string()),
        summary_folder: Some(root.to_string_lossy().to_string()),
        kmer_sizes: Some(vec![2, 3]),
        jobs: Some(2),
        ..Config::default()
    };
    let resolved = ConfigLoader::resolve_config(config).unwrap();
    App::new(resolved, MockDatasets)
}

#[test]
fn curate_reports_rejected_records() {
    let temp = tempfile::tempdir().unwrap();
    let app = test_app(temp.path());

    let result = app.curate(false).unwrap();
    assert_eq!(result.total_records, 3);
    assert_eq!(result.filtered, 3);
    assert_eq!(result.selected, 3);
    assert_eq!(
        result.downloadable,
        vec!["GCF_000005845.2", "GCF_000009045.1"]
    );
    assert_eq!(result.rejected.len(), 1);
    assert_eq!(
        result.rejected[0].organism_name.as_deref(),
        Some("Listeria innocua")
    );
}

#[test]
fn pipeline_stages_genomes_and_counts_kmers() {
    let temp = tempfile::tempdir().unwrap();
    let app = test_app(temp.path());
    let runner = RecordingRunner::default();

    let result = app.run(&runner, false, Some(2)).unwrap();

    assert_eq!(result.download.downloaded.len(), 2);
    assert!(result.download.failures.is_empty());
    for accession in &result.download.downloaded {
        let staged = temp
            .path()
            .join("genomes/ncbi_dataset/data")
            .join(accession)
            .join(format!("{accession}_genomic.fna.gz"));
        assert!(staged.exists(), "missing staged genome {}", staged.display());
    }

    assert_eq!(result.count.inputs, 2);
    assert_eq!(result.count.jobs, 4);
    assert_eq!(result.count.completed, 4);
    assert!(result.count.failures.is_empty());

    let jobs = runner.jobs.lock().unwrap();
    assert_eq!(jobs.len(), 4);
    for job in jobs.iter() {
        assert_eq!(job.hash_size, "100M");
        assert!(job.compressed);
        let expected: PathBuf =
            PathBuf::from(format!("{}.{}.jf", job.input.display(), job.kmer_size));
        assert_eq!(job.output, expected);
    }
}

#[test]
fn summary_folder_receives_cached_tables() {
    let temp = tempfile::tempdir().unwrap();
    let app = test_app(temp.path());

    app.refresh(false).unwrap();
    assert!(temp.path().join("bacteria.tsv").exists());
    assert!(temp.path().join("bacteria.json").exists());
}
