use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::MetaprepError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
pub enum AssemblyLevel {
    Contig,
    Scaffold,
    Chromosome,
    #[serde(rename = "Complete Genome")]
    Complete,
}

impl fmt::Display for AssemblyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssemblyLevel::Contig => write!(f, "Contig"),
            AssemblyLevel::Scaffold => write!(f, "Scaffold"),
            AssemblyLevel::Chromosome => write!(f, "Chromosome"),
            AssemblyLevel::Complete => write!(f, "Complete Genome"),
        }
    }
}

impl FromStr for AssemblyLevel {
    type Err = MetaprepError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "Contig" => Ok(AssemblyLevel::Contig),
            "Scaffold" => Ok(AssemblyLevel::Scaffold),
            "Chromosome" => Ok(AssemblyLevel::Chromosome),
            "Complete Genome" => Ok(AssemblyLevel::Complete),
            other => Err(MetaprepError::InvalidAssemblyLevel(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenomeRecord {
    #[serde(rename = "Assembly Accession")]
    pub accession: Option<String>,
    #[serde(rename = "Organism Name")]
    pub organism_name: Option<String>,
    #[serde(rename = "Assembly Level")]
    pub assembly_level: AssemblyLevel,
    #[serde(rename = "Assembly Release Date")]
    pub release_date: String,
    #[serde(rename = "Assembly Stats Genome Coverage")]
    pub genome_coverage: Option<String>,
    #[serde(rename = "CheckM completeness")]
    pub completeness: Option<f64>,
}

impl GenomeRecord {
    pub fn coverage_value(&self) -> f64 {
        let raw = match &self.genome_coverage {
            Some(value) => value.trim(),
            None => return 0.0,
        };
        let numeric = raw.trim_end_matches(|ch: char| ch.is_ascii_alphabetic());
        if numeric.is_empty() {
            return 0.0;
        }
        numeric.parse().unwrap_or(0.0)
    }

    pub fn release_date(&self) -> Result<NaiveDate, MetaprepError> {
        NaiveDate::parse_from_str(self.release_date.trim(), "%Y-%m-%d").map_err(|_| {
            MetaprepError::MalformedRecord(format!(
                "unparsable release date {:?} for {}",
                self.release_date,
                self.accession.as_deref().unwrap_or("<no accession>")
            ))
        })
    }

    fn species(&self) -> Result<&str, MetaprepError> {
        self.organism_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                MetaprepError::MalformedRecord(format!(
                    "missing organism name for {}",
                    self.accession.as_deref().unwrap_or("<no accession>")
                ))
            })
    }
}

pub fn filter(
    records: &[GenomeRecord],
    required_level: AssemblyLevel,
    min_coverage: f64,
) -> Vec<GenomeRecord> {
    records
        .iter()
        .filter(|record| {
            record.assembly_level == required_level && record.coverage_value() >= min_coverage
        })
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SelectionKey {
    completeness: f64,
    release_date: NaiveDate,
    assembly_level: AssemblyLevel,
}

impl SelectionKey {
    fn of(record: &GenomeRecord) -> Result<Self, MetaprepError> {
        Ok(Self {
            completeness: record.completeness.unwrap_or(0.0),
            release_date: record.release_date()?,
            assembly_level: record.assembly_level,
        })
    }

    fn beats(&self, other: &SelectionKey) -> bool {
        if self.completeness != other.completeness {
            return self.completeness > other.completeness;
        }
        if self.release_date != other.release_date {
            return self.release_date > other.release_date;
        }
        self.assembly_level > other.assembly_level
    }
}

fn accession_tiebreak(challenger: &GenomeRecord, incumbent: &GenomeRecord) -> bool {
    match (&challenger.accession, &incumbent.accession) {
        (Some(new), Some(old)) => new < old,
        _ => false,
    }
}

pub fn select_one_per_species(
    records: &[GenomeRecord],
) -> Result<Vec<GenomeRecord>, MetaprepError> {
    let mut species_order: Vec<String> = Vec::new();
    let mut best: HashMap<String, (GenomeRecord, SelectionKey)> = HashMap::new();

    for record in records {
        let species = record.species()?.to_string();
        let key = SelectionKey::of(record)?;
        match best.entry(species) {
            Entry::Vacant(slot) => {
                species_order.push(slot.key().clone());
                slot.insert((record.clone(), key));
            }
            Entry::Occupied(mut slot) => {
                let (incumbent, incumbent_key) = slot.get_mut();
                let wins = key.beats(incumbent_key)
                    || (key == *incumbent_key && accession_tiebreak(record, incumbent));
                if wins {
                    *incumbent = record.clone();
                    *incumbent_key = key;
                }
            }
        }
    }

    Ok(species_order
        .into_iter()
        .filter_map(|species| best.remove(&species))
        .map(|(record, _)| record)
        .collect())
}

pub fn select_downloadable(
    records: &[GenomeRecord],
) -> (Vec<GenomeRecord>, Vec<GenomeRecord>) {
    records
        .iter()
        .cloned()
        .partition(|record| record.accession.as_deref().is_some_and(|acc| !acc.is_empty()))
}
