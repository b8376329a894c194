// Job-scoped result set with merge-on-duplicate semantics and crash-safe
// checkpointing.
//
// The accumulator owns every mutable piece of extraction state for one
// job. Records are keyed by canonical identifier in insertion order so the
// output table is deterministic, and each checkpoint rewrites the whole
// snapshot through a rename so readers never observe a torn file.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::models::{Gender, JobConfig, JobState, PageStats, Rejection, SkippedPage, VoterRecord};
use crate::utils::ExtractError;

/// What `append` did with an incoming record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Inserted,
    /// Duplicate identifier; the newcomer filled in at least one
    /// previously-missing field.
    Merged,
    /// Duplicate identifier carrying nothing the stored record lacks.
    Unchanged,
}

/// Cumulative counters across all processed pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub candidates: usize,
    pub emitted: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    records: IndexMap<String, VoterRecord>,
    pages: Vec<PageStats>,
    rejections: Vec<Rejection>,
    #[serde(default)]
    skipped: Vec<SkippedPage>,
    totals: Totals,
}

impl ExtractionResult {
    pub fn new() -> Self {
        ExtractionResult::default()
    }

    pub fn records(&self) -> impl Iterator<Item = &VoterRecord> {
        self.records.values()
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn get(&self, identifier: &str) -> Option<&VoterRecord> {
        self.records.get(identifier)
    }

    pub fn pages(&self) -> &[PageStats] {
        &self.pages
    }

    pub fn rejections(&self) -> &[Rejection] {
        &self.rejections
    }

    pub fn skipped(&self) -> &[SkippedPage] {
        &self.skipped
    }

    pub fn totals(&self) -> Totals {
        self.totals
    }

    /// Insert or merge one record. On a duplicate identifier the incoming
    /// record reinforces the stored one field by field: a populated field
    /// is never overwritten, a missing one is filled when the newcomer
    /// supplies it.
    pub fn append(&mut self, record: VoterRecord) -> AppendOutcome {
        match self.records.get_mut(&record.identifier) {
            None => {
                debug!("inserted {}", record.identifier);
                self.records.insert(record.identifier.clone(), record);
                AppendOutcome::Inserted
            }
            Some(existing) => {
                if Self::merge_into(existing, &record) {
                    debug!("merged duplicate {}", record.identifier);
                    AppendOutcome::Merged
                } else {
                    AppendOutcome::Unchanged
                }
            }
        }
    }

    fn merge_into(existing: &mut VoterRecord, incoming: &VoterRecord) -> bool {
        let mut changed = false;

        fn fill<T: Clone>(
            slot: &mut Option<T>,
            value: &Option<T>,
            field: &str,
            missing: &mut std::collections::BTreeSet<String>,
            changed: &mut bool,
        ) {
            if slot.is_none() && value.is_some() {
                *slot = value.clone();
                missing.remove(field);
                *changed = true;
            }
        }

        let missing = &mut existing.missing_fields;
        fill(&mut existing.serial, &incoming.serial, "serial", missing, &mut changed);
        fill(&mut existing.name, &incoming.name, "name", missing, &mut changed);
        fill(
            &mut existing.relation_name,
            &incoming.relation_name,
            "relation_name",
            missing,
            &mut changed,
        );
        fill(
            &mut existing.house_raw,
            &incoming.house_raw,
            "house",
            missing,
            &mut changed,
        );
        fill(
            &mut existing.house_parts,
            &incoming.house_parts,
            "house",
            missing,
            &mut changed,
        );
        fill(&mut existing.age, &incoming.age, "age", missing, &mut changed);

        if existing.gender == Gender::Unknown && incoming.gender != Gender::Unknown {
            existing.gender = incoming.gender;
            missing.remove("gender");
            changed = true;
        }

        changed
    }

    /// Record one skipped page. Part of the snapshot, so skip diagnostics
    /// survive a crash the same way records and rejections do.
    pub fn record_skip(&mut self, skip: SkippedPage) {
        self.skipped.push(skip);
    }

    /// Record one processed page's counters in page order.
    pub fn record_page(&mut self, stats: PageStats, rejections: Vec<Rejection>) {
        self.totals.candidates += stats.candidates;
        self.totals.emitted += stats.emitted;
        self.totals.rejected += stats.rejected;
        self.pages.push(stats);
        self.rejections.extend(rejections);
    }

    /// Column headers of the tabular view, constant metadata last.
    pub fn header_row() -> Vec<String> {
        [
            "Sr.No",
            "Voter ID",
            "नाव",
            "वडिलांचे नाव",
            "घर क्रमांक",
            "घर क्रमांक भाग",
            "वय",
            "लिंग",
            "मतदार संघ",
            "निवडणूक प्रकार",
            "प्रभाग",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    /// The complete valid-to-date table, one row per record in discovery
    /// order, with the job's constant metadata columns stamped on.
    pub fn to_rows(&self, config: &JobConfig) -> Vec<Vec<String>> {
        self.records
            .values()
            .map(|r| {
                vec![
                    r.serial.clone().unwrap_or_default(),
                    r.identifier.clone(),
                    r.name.clone().unwrap_or_default(),
                    r.relation_name.clone().unwrap_or_default(),
                    r.house_raw.clone().unwrap_or_default(),
                    r.house_parts
                        .as_ref()
                        .map(|p| p.join("/"))
                        .unwrap_or_default(),
                    r.age.map(|a| a.to_string()).unwrap_or_default(),
                    r.gender.as_str().to_string(),
                    config.constituency.clone(),
                    config.election_type.clone(),
                    config.ward.clone(),
                ]
            })
            .collect()
    }

    /// Durably snapshot the accumulated state. The document is written to
    /// a sibling temporary file and renamed over the destination, so a
    /// reader sees either the previous checkpoint or this one, never a
    /// partial write.
    pub fn checkpoint(
        &self,
        job_id: &str,
        config: &JobConfig,
        state: JobState,
        path: &Path,
    ) -> Result<(), ExtractError> {
        let doc = CheckpointDoc {
            job_id,
            written_at: Utc::now(),
            state,
            config,
            result: self,
        };
        let json = serde_json::to_vec_pretty(&doc)?;

        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        let mut tmp = match dir {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new_in(".")?,
        };
        tmp.write_all(&json)?;
        tmp.persist(path).map_err(|e| ExtractError::Checkpoint {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        info!(
            "checkpoint: {} records, {} rejections -> {}",
            self.records.len(),
            self.rejections.len(),
            path.display()
        );
        Ok(())
    }
}

/// Serialized checkpoint layout; borrows the live result to avoid copying
/// it on every page.
#[derive(Serialize)]
struct CheckpointDoc<'a> {
    job_id: &'a str,
    written_at: DateTime<Utc>,
    state: JobState,
    config: &'a JobConfig,
    result: &'a ExtractionResult,
}

/// An owned checkpoint read back from disk, for resuming or inspection
/// independent of process lifetime.
#[derive(Debug, Deserialize)]
pub struct Checkpoint {
    pub job_id: String,
    pub written_at: DateTime<Utc>,
    pub state: JobState,
    pub config: JobConfig,
    pub result: ExtractionResult,
}

impl Checkpoint {
    pub fn load(path: &Path) -> Result<Checkpoint, ExtractError> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
