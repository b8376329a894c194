use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// One page of raw recognized text as handed over by the OCR collaborator.
/// Never assumed well-formed: lines may be empty, garbled or contain
/// encoding artifacts.
#[derive(Debug, Clone)]
pub struct RawPageText {
    /// 1-based page index within the source document.
    pub page: usize,
    pub lines: Vec<String>,
    /// Optional per-line recognition confidence (0.0..=1.0), same length as
    /// `lines` when present.
    pub confidence: Option<Vec<f32>>,
}

impl RawPageText {
    pub fn new(page: usize, text: &str) -> Self {
        RawPageText {
            page,
            lines: text.lines().map(str::to_string).collect(),
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: Vec<f32>) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.trim().is_empty())
    }

    /// Mean per-line confidence, when the recognizer reports one. The job
    /// uses this to skip pages that scanned too poorly to trust.
    pub fn mean_confidence(&self) -> Option<f32> {
        let confidence = self.confidence.as_deref().filter(|c| !c.is_empty())?;
        Some(confidence.iter().sum::<f32>() / confidence.len() as f32)
    }
}

/// A candidate identifier located in corrected page text.
///
/// `identifier` is always in canonical form (3 uppercase letters + 7 digits);
/// candidates that fail canonicalization are reported as [`Rejection`]s
/// instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierMatch {
    pub identifier: String,
    pub page: usize,
    /// 0-based line index within the page.
    pub line: usize,
    /// Byte offset of the match start within the line.
    pub offset: usize,
    /// The substring as it appeared before canonicalization, for diagnostics.
    pub raw: String,
}

/// Why a candidate was discarded instead of emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Prefix did not canonicalize to the known alphabetic prefix.
    BadPrefix { got: String },
    /// Digit suffix normalized to the wrong number of digits. Guessing a
    /// digit is worse than omitting the record, so no padding is attempted.
    DigitLength { got: usize },
    /// Candidate started within the minimum distance of an earlier accepted
    /// candidate on the same line.
    Overlap,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::BadPrefix { got } => write!(f, "unrecognized prefix '{}'", got),
            RejectReason::DigitLength { got } => {
                write!(f, "digit suffix has {} digits, expected 7", got)
            }
            RejectReason::Overlap => write!(f, "overlaps an earlier candidate"),
        }
    }
}

/// A discarded candidate, kept for accuracy auditing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub page: usize,
    pub raw: String,
    pub reason: RejectReason,
}

/// Raw field captures sliced out of the lines around an identifier match.
/// Values are whitespace-normalized but not yet semantically validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFieldSet {
    pub serial: Option<String>,
    /// The 3-part slash reference printed on the identifier line
    /// (part/section/serial).
    pub column_ref: Option<String>,
    pub name: Option<String>,
    pub relation_name: Option<String>,
    pub house_raw: Option<String>,
    pub age: Option<String>,
    pub gender: Option<String>,
}

/// Closed gender classification. OCR output that matches none of the known
/// tokens degrades to `Unknown`, never to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
    Unknown,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "पुरुष",
            Gender::Female => "स्त्री",
            Gender::Other => "इतर",
            Gender::Unknown => "",
        }
    }
}

/// One validated, possibly partial, voter record.
///
/// The identifier is the unique key and is always canonical; every other
/// field may be missing, in which case its name appears in `missing_fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoterRecord {
    pub identifier: String,
    pub serial: Option<String>,
    pub name: Option<String>,
    pub relation_name: Option<String>,
    pub house_raw: Option<String>,
    /// Slash-delimited numeric components of `house_raw`, when decomposable.
    pub house_parts: Option<Vec<String>>,
    pub age: Option<u32>,
    pub gender: Gender,
    /// Page the record was first seen on.
    pub page: usize,
    pub missing_fields: BTreeSet<String>,
}

impl VoterRecord {
    /// A record that carries nothing beyond its identifier.
    pub fn is_bare(&self) -> bool {
        self.serial.is_none()
            && self.name.is_none()
            && self.relation_name.is_none()
            && self.house_raw.is_none()
            && self.age.is_none()
            && self.gender == Gender::Unknown
    }
}

/// Per-page extraction counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageStats {
    pub page: usize,
    pub candidates: usize,
    pub emitted: usize,
    pub rejected: usize,
}

/// Progress signal emitted after each processed page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageProgress {
    pub page: usize,
    pub candidates: usize,
    pub emitted: usize,
    pub rejected: usize,
    pub total_records: usize,
    pub total_rejected: usize,
}

/// A page the job could not process; the job carries on with the next page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedPage {
    pub page: usize,
    pub reason: String,
}

/// Job lifecycle. `Finalized` is terminal in both the success and the
/// failure direction; the last checkpoint stays valid either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Empty,
    Accumulating,
    Finalized(JobStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Completed,
    Cancelled,
    Failed,
}
