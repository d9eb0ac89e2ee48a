use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountingJob {
    pub input: PathBuf,
    pub kmer_size: u32,
    pub hash_size: String,
    pub threads: u32,
    pub output: PathBuf,
    pub compressed: bool,
}

// Subdirectories are visited in the order given (duplicates included). Within
// one directory the match order follows directory iteration order, which is
// filesystem-dependent; callers get a complete set, not a sorted one.
pub fn enumerate_inputs(root: &Path, genomes: &[String], pattern: &str) -> Vec<PathBuf> {
    let mut inputs = Vec::new();
    for genome in genomes {
        let dir = root.join(genome);
        debug!(dir = %dir.display(), pattern, "enumerating input files");
        collect_matches(&dir, pattern, &mut inputs);
    }
    inputs
}

fn collect_matches(root: &Path, pattern: &str, out: &mut Vec<PathBuf>) {
    let mut stack = vec![root.to_path_buf()];
    while let Some(path) = stack.pop() {
        if let Ok(entries) = fs::read_dir(&path) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .map(|name| matches_pattern(name, pattern))
                    .unwrap_or(false)
                {
                    out.push(path);
                }
            }
        }
    }
}

pub fn matches_pattern(name: &str, pattern: &str) -> bool {
    matches_bytes(name.as_bytes(), pattern.as_bytes())
}

fn matches_bytes(name: &[u8], pattern: &[u8]) -> bool {
    match pattern.split_first() {
        None => name.is_empty(),
        Some((b'*', rest)) => (0..=name.len()).any(|skip| matches_bytes(&name[skip..], rest)),
        Some((b'?', rest)) => !name.is_empty() && matches_bytes(&name[1..], rest),
        Some((ch, rest)) => name.first() == Some(ch) && matches_bytes(&name[1..], rest),
    }
}

pub fn build_jobs(
    files: &[PathBuf],
    kmer_sizes: &[u32],
    hash_size: &str,
    threads: u32,
    compressed: bool,
) -> Vec<CountingJob> {
    let mut jobs = Vec::with_capacity(files.len() * kmer_sizes.len());
    for input in files {
        for &kmer_size in kmer_sizes {
            let output = PathBuf::from(format!("{}.{kmer_size}.jf", input.display()));
            jobs.push(CountingJob {
                input: input.clone(),
                kmer_size,
                hash_size: hash_size.to_string(),
                threads,
                output,
                compressed,
            });
        }
    }
    jobs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matching() {
        assert!(matches_pattern("genome.fna.gz", "*.fna.gz"));
        assert!(matches_pattern("a.fna.gz", "*.fna.gz"));
        assert!(!matches_pattern("genome.fna", "*.fna.gz"));
        assert!(!matches_pattern("genome.fastq", "*.fna*"));
        assert!(matches_pattern("genome.fna", "genome.f?a"));
        assert!(matches_pattern("anything", "*"));
    }

    #[test]
    fn jobs_cross_product_order() {
        let files = vec![PathBuf::from("f1"), PathBuf::from("f2")];
        let jobs = build_jobs(&files, &[2, 3], "100M", 2, true);

        let pairs: Vec<(&Path, u32)> = jobs
            .iter()
            .map(|job| (job.input.as_path(), job.kmer_size))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (Path::new("f1"), 2),
                (Path::new("f1"), 3),
                (Path::new("f2"), 2),
                (Path::new("f2"), 3),
            ]
        );
    }

    #[test]
    fn job_outputs_derive_from_input_and_k() {
        let files = vec![PathBuf::from("data/g1.fna.gz")];
        let jobs = build_jobs(&files, &[5], "100M", 2, true);
        assert_eq!(jobs[0].output, PathBuf::from("data/g1.fna.gz.5.jf"));
    }

    #[test]
    fn enumerate_walks_named_subdirs_in_order() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        std::fs::create_dir_all(root.join("g1/nested")).unwrap();
        std::fs::create_dir_all(root.join("g2")).unwrap();
        std::fs::write(root.join("g1/a.fna.gz"), b"").unwrap();
        std::fs::write(root.join("g1/nested/b.fna.gz"), b"").unwrap();
        std::fs::write(root.join("g1/skip.txt"), b"").unwrap();
        std::fs::write(root.join("g2/c.fna.gz"), b"").unwrap();

        let genomes = vec!["g1".to_string(), "g2".to_string()];
        let inputs = enumerate_inputs(root, &genomes, "*.fna.gz");
        assert_eq!(inputs.len(), 3);
        let g1_count = inputs.iter().filter(|p| p.starts_with(root.join("g1"))).count();
        assert_eq!(g1_count, 2);
        assert_eq!(inputs[2], root.join("g2/c.fna.gz"));
    }

    #[test]
    fn enumerate_keeps_duplicate_subdirs() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        std::fs::create_dir_all(root.join("g1")).unwrap();
        std::fs::write(root.join("g1/a.fna.gz"), b"").unwrap();

        let genomes = vec!["g1".to_string(), "g1".to_string()];
        let inputs = enumerate_inputs(root, &genomes, "*.fna.gz");
        assert_eq!(inputs.len(), 2);
    }
}
