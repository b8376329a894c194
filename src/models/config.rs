use serde::{Deserialize, Serialize};

/// Matcher tuning knobs. The grammar itself (3-letter prefix, 7-digit
/// suffix) is fixed; only tolerances are configurable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Candidates starting within this many bytes of an accepted candidate
    /// on the same line collapse into the earlier one.
    pub min_distance: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        MatcherConfig { min_distance: 10 }
    }
}

/// Positional layout of the field window around an identifier line.
///
/// The voter roll template is tabular, so these offsets are a layout
/// contract rather than a guess; they are still configuration because the
/// template varies between issuing authorities. Layout variants beyond
/// window-size and label changes are out of scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLayout {
    /// Lines included before the identifier line.
    pub lines_before: usize,
    /// Lines included after the identifier line.
    pub lines_after: usize,
}

impl Default for FieldLayout {
    fn default() -> Self {
        FieldLayout {
            lines_before: 2,
            lines_after: 8,
        }
    }
}

/// Everything a single extraction job needs, owned by the job context.
/// Nothing here is mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Constituency label (मतदार संघ), stamped onto every output row.
    pub constituency: String,
    /// Election type label, stamped onto every output row.
    pub election_type: String,
    /// Ward label, stamped onto every output row.
    pub ward: String,
    /// Optional 1-based inclusive page range; clamped to document bounds.
    pub start_page: Option<usize>,
    pub end_page: Option<usize>,
    /// Pages whose mean recognition confidence falls below this are skipped
    /// rather than mined for garbage candidates. `None` disables the check;
    /// sources that report no confidence are never skipped by it.
    #[serde(default)]
    pub min_confidence: Option<f32>,
    pub matcher: MatcherConfig,
    pub layout: FieldLayout,
}

impl JobConfig {
    pub fn new(constituency: &str, election_type: &str, ward: &str) -> Self {
        JobConfig {
            constituency: constituency.to_string(),
            election_type: election_type.to_string(),
            ward: ward.to_string(),
            start_page: None,
            end_page: None,
            min_confidence: None,
            matcher: MatcherConfig::default(),
            layout: FieldLayout::default(),
        }
    }

    pub fn with_page_range(mut self, start: Option<usize>, end: Option<usize>) -> Self {
        self.start_page = start;
        self.end_page = end;
        self
    }

    pub fn with_min_confidence(mut self, threshold: f32) -> Self {
        self.min_confidence = Some(threshold);
        self
    }
}
