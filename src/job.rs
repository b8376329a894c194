// Per-job pipeline orchestration.
//
// One `ExtractionJob` owns all mutable state for one source document; no
// process-wide state survives between jobs, so independent jobs can run in
// parallel sharing only the immutable correction table. Pages run strictly
// sequentially: each page's correct -> match -> extract -> normalize ->
// accumulate pass completes and checkpoints before the next page starts,
// which is what makes the checkpoint the crash-recovery mechanism.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{info, warn};

use crate::accumulator::ExtractionResult;
use crate::models::{
    JobConfig, JobState, JobStatus, PageProgress, PageStats, RawPageText, SkippedPage,
};
use crate::processing::{FieldExtractor, IdentifierMatcher, CORRECTION_TABLE};
use crate::utils::ExtractError;
use crate::validation::RecordNormalizer;

/// The recognition collaborator: something that can hand over one page's
/// raw text at a time. Implementations may be slow and blocking; the job
/// treats each call as a coarse, non-cancellable unit.
pub trait PageSource {
    fn page_count(&self) -> usize;

    /// Recognize one page (1-based). May fail per page; the job records
    /// the page as skipped and moves on.
    fn recognize_page(&mut self, page: usize) -> Result<RawPageText, ExtractError>;
}

/// Page source backed by a directory of per-page UTF-8 text files, sorted
/// by file name. Used by the CLI and by tests.
pub struct TextDirSource {
    files: Vec<PathBuf>,
}

impl TextDirSource {
    pub fn new(dir: &Path) -> Result<Self, ExtractError> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "txt"))
            .collect();
        files.sort();
        Ok(TextDirSource { files })
    }
}

impl PageSource for TextDirSource {
    fn page_count(&self) -> usize {
        self.files.len()
    }

    fn recognize_page(&mut self, page: usize) -> Result<RawPageText, ExtractError> {
        let path = self
            .files
            .get(page.checked_sub(1).ok_or(ExtractError::PageOutOfBounds {
                page,
                total: self.files.len(),
            })?)
            .ok_or(ExtractError::PageOutOfBounds {
                page,
                total: self.files.len(),
            })?;
        let text = std::fs::read_to_string(path).map_err(|e| ExtractError::PageRecognition {
            page,
            message: e.to_string(),
        })?;
        Ok(RawPageText::new(page, &text))
    }
}

/// Shared cancellation flag. Checked between pages only, so the last
/// checkpoint is always intact when a cancel lands.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Final shape of a finished (or cancelled, or failed) job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    pub job_id: String,
    pub status: JobStatus,
    pub pages_processed: usize,
    pub record_count: usize,
    pub skipped: Vec<SkippedPage>,
}

type ProgressHandler = Box<dyn FnMut(PageProgress)>;

pub struct ExtractionJob {
    job_id: String,
    config: JobConfig,
    checkpoint_path: PathBuf,
    state: JobState,
    result: ExtractionResult,
    cancel: CancelHandle,
    matcher: IdentifierMatcher,
    extractor: FieldExtractor,
    progress: Option<ProgressHandler>,
}

impl std::fmt::Debug for ExtractionJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionJob")
            .field("job_id", &self.job_id)
            .field("config", &self.config)
            .field("checkpoint_path", &self.checkpoint_path)
            .field("state", &self.state)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

impl ExtractionJob {
    pub fn new(
        job_id: &str,
        config: JobConfig,
        checkpoint_path: &Path,
    ) -> Result<Self, ExtractError> {
        if config.constituency.trim().is_empty()
            || config.election_type.trim().is_empty()
            || config.ward.trim().is_empty()
        {
            return Err(ExtractError::Config(
                "constituency, election type and ward labels are required".to_string(),
            ));
        }
        // Pages are 1-based; a 0 bound would silently produce an empty
        // range after clamping instead of failing loudly.
        if config.start_page == Some(0) || config.end_page == Some(0) {
            return Err(ExtractError::Config(
                "page numbers are 1-based; 0 is not a valid page bound".to_string(),
            ));
        }
        if let (Some(start), Some(end)) = (config.start_page, config.end_page) {
            if start > end {
                return Err(ExtractError::Config(format!(
                    "invalid page range {}..={}",
                    start, end
                )));
            }
        }

        let matcher = IdentifierMatcher::new(config.matcher.clone());
        let extractor = FieldExtractor::new(config.layout.clone());
        Ok(ExtractionJob {
            job_id: job_id.to_string(),
            config,
            checkpoint_path: checkpoint_path.to_path_buf(),
            state: JobState::Empty,
            result: ExtractionResult::new(),
            cancel: CancelHandle::default(),
            matcher,
            extractor,
            progress: None,
        })
    }

    /// Handle a UI layer can use to request cancellation between pages.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn set_progress_handler(&mut self, handler: ProgressHandler) {
        self.progress = Some(handler);
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// The accumulated result set, complete and valid up to the last
    /// processed page. Usable as the partial output after a failure.
    pub fn result(&self) -> &ExtractionResult {
        &self.result
    }

    pub fn skipped(&self) -> &[SkippedPage] {
        self.result.skipped()
    }

    /// Process every page in range, strictly sequentially, checkpointing
    /// after each one. Per-page failures become skip entries; only
    /// job-level conditions (empty source, range outside the document)
    /// return an error, and even then the last checkpoint stays valid.
    pub fn run(&mut self, source: &mut dyn PageSource) -> Result<JobSummary, ExtractError> {
        if matches!(self.state, JobState::Finalized(_)) {
            return Err(ExtractError::JobFinalized);
        }

        let total = source.page_count();
        if total == 0 {
            self.state = JobState::Finalized(JobStatus::Failed);
            return Err(ExtractError::Config(
                "page source contains no pages".to_string(),
            ));
        }

        let start = self.config.start_page.unwrap_or(1).max(1);
        let end = self.config.end_page.unwrap_or(total).min(total);
        if start > total {
            self.state = JobState::Finalized(JobStatus::Failed);
            return Err(ExtractError::PageRange { start, end, total });
        }

        info!(
            "job {}: processing pages {}..={} of {}",
            self.job_id, start, end, total
        );
        self.state = JobState::Accumulating;
        let mut pages_processed = 0usize;

        for page in start..=end {
            if self.cancel.is_cancelled() {
                warn!("job {}: cancelled before page {}", self.job_id, page);
                return self.finalize(JobStatus::Cancelled, pages_processed);
            }

            match source.recognize_page(page) {
                Ok(raw) if raw.is_empty() => {
                    self.skip_page(page, "page text is empty");
                }
                Ok(raw) if self.below_min_confidence(&raw) => {
                    self.skip_page(page, "recognition confidence below threshold");
                }
                Ok(raw) => {
                    let stats = self.process_page(&raw);
                    pages_processed += 1;
                    self.report_progress(stats);
                }
                Err(ExtractError::PageOutOfBounds { page, total }) => {
                    // The source disagrees with its own page count; that is
                    // a job-level fault, not a bad page.
                    warn!("job {}: source exhausted at page {}", self.job_id, page);
                    if let Err(checkpoint_err) = self.finalize(JobStatus::Failed, pages_processed)
                    {
                        warn!(
                            "job {}: final checkpoint not written: {}",
                            self.job_id, checkpoint_err
                        );
                    }
                    return Err(ExtractError::PageOutOfBounds { page, total });
                }
                Err(e) => {
                    self.skip_page(page, &e.to_string());
                }
            }

            self.checkpoint()?;
        }

        self.finalize(JobStatus::Completed, pages_processed)
    }

    fn process_page(&mut self, raw: &RawPageText) -> PageStats {
        let corrected: Vec<String> = raw
            .lines
            .iter()
            .map(|line| CORRECTION_TABLE.apply(line))
            .collect();

        let (matches, rejections) = self.matcher.find_candidates(raw.page, &corrected);
        let candidates = matches.len() + rejections.len();

        let mut emitted = 0usize;
        for m in &matches {
            let fields = self.extractor.extract(&corrected, m);
            let record = RecordNormalizer::normalize(&fields, m);
            self.result.append(record);
            emitted += 1;
        }

        let stats = PageStats {
            page: raw.page,
            candidates,
            emitted,
            rejected: rejections.len(),
        };
        self.result.record_page(stats, rejections);
        stats
    }

    fn below_min_confidence(&self, raw: &RawPageText) -> bool {
        match (self.config.min_confidence, raw.mean_confidence()) {
            (Some(threshold), Some(mean)) => mean < threshold,
            _ => false,
        }
    }

    fn skip_page(&mut self, page: usize, reason: &str) {
        warn!("job {}: skipping page {}: {}", self.job_id, page, reason);
        self.result.record_skip(SkippedPage {
            page,
            reason: reason.to_string(),
        });
    }

    fn report_progress(&mut self, stats: PageStats) {
        let totals = self.result.totals();
        let progress = PageProgress {
            page: stats.page,
            candidates: stats.candidates,
            emitted: stats.emitted,
            rejected: stats.rejected,
            total_records: self.result.record_count(),
            total_rejected: totals.rejected,
        };
        info!(
            "job {}: page {} -> {} candidates, {} emitted, {} rejected ({} records total)",
            self.job_id,
            progress.page,
            progress.candidates,
            progress.emitted,
            progress.rejected,
            progress.total_records
        );
        if let Some(handler) = self.progress.as_mut() {
            handler(progress);
        }
    }

    fn checkpoint(&self) -> Result<(), ExtractError> {
        self.result.checkpoint(
            &self.job_id,
            &self.config,
            self.state,
            &self.checkpoint_path,
        )
    }

    fn finalize(
        &mut self,
        status: JobStatus,
        pages_processed: usize,
    ) -> Result<JobSummary, ExtractError> {
        self.state = JobState::Finalized(status);
        self.checkpoint()?;
        info!(
            "job {}: finalized {:?} with {} records",
            self.job_id,
            status,
            self.result.record_count()
        );
        Ok(JobSummary {
            job_id: self.job_id.clone(),
            status,
            pages_processed,
            record_count: self.result.record_count(),
            skipped: self.result.skipped().to_vec(),
        })
    }
}
