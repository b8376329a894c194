// Grammar-driven identifier scanning over corrected page text.
//
// The identifier grammar is fixed: a 3-letter alphabetic prefix (`SMF` for
// this document family) followed by exactly 7 digits. The scan pattern is
// deliberately tolerant and accepts near-miss prefixes and digit-confusable
// letters; canonicalization happens here, per character position, and
// candidates that do not land on the exact grammar are rejected rather
// than guessed at.

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::models::{IdentifierMatch, MatcherConfig, RejectReason, Rejection};

/// Canonical alphabetic prefix for this voter roll family.
pub const CANONICAL_PREFIX: &str = "SMF";
/// Required digit-suffix length.
pub const SUFFIX_LEN: usize = 7;

lazy_static! {
    /// Tolerant candidate pattern. The first position anchors on the small
    /// set of glyphs `S` is known to scan as; the next two positions stay
    /// broad so that unmappable prefixes surface as BadPrefix rejections
    /// instead of silently never matching. The suffix run caps at 7: a
    /// number abutting the suffix (OCR dropped the separating space) must
    /// not swallow it, and anything left over is scanned as its own
    /// candidate. Runs under 7 still match so dropped digits surface as
    /// DigitLength rejections.
    static ref CANDIDATE_PATTERN: Regex =
        Regex::new(r"[Ss548$][A-Za-z0-9$॥][A-Za-z0-9][0-9SsOoIl|ZzFfBbGg]{5,7}").unwrap();
}

fn canonicalize_prefix_char(position: usize, c: char) -> Option<char> {
    match position {
        0 => match c {
            'S' | 's' | '5' | '4' | '8' | '$' => Some('S'),
            _ => None,
        },
        1 => match c {
            'M' | 'm' | 'S' | 's' | '8' | '6' | '$' | '5' | '4' | '॥' => Some('M'),
            _ => None,
        },
        2 => match c {
            'F' | 'f' | 'M' | '8' | '6' | '7' => Some('F'),
            _ => None,
        },
        _ => None,
    }
}

fn canonicalize_digit(c: char) -> Option<char> {
    match c {
        '0'..='9' => Some(c),
        'S' | 's' => Some('5'),
        'O' | 'o' => Some('0'),
        'I' | 'l' | '|' => Some('1'),
        'Z' | 'z' => Some('2'),
        'F' | 'f' => Some('6'),
        'B' | 'b' => Some('8'),
        'G' | 'g' => Some('6'),
        _ => None,
    }
}

/// Checks a string against the canonical identifier grammar.
pub fn is_canonical(identifier: &str) -> bool {
    let chars: Vec<char> = identifier.chars().collect();
    chars.len() == CANONICAL_PREFIX.len() + SUFFIX_LEN
        && chars[..3].iter().all(|c| c.is_ascii_uppercase())
        && identifier.starts_with(CANONICAL_PREFIX)
        && chars[3..].iter().all(|c| c.is_ascii_digit())
}

/// Scans corrected page lines for identifier candidates.
#[derive(Debug, Clone)]
pub struct IdentifierMatcher {
    config: MatcherConfig,
}

impl IdentifierMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        IdentifierMatcher { config }
    }

    /// Enumerate candidates in text-position order (line, then column).
    /// Returns accepted matches plus one rejection entry per discarded
    /// candidate so the job can feed its diagnostics log.
    pub fn find_candidates(
        &self,
        page: usize,
        lines: &[String],
    ) -> (Vec<IdentifierMatch>, Vec<Rejection>) {
        let mut matches = Vec::new();
        let mut rejections = Vec::new();

        for (line_index, line) in lines.iter().enumerate() {
            // Byte offset of the last accepted candidate on this line;
            // leftmost wins within the minimum distance.
            let mut last_accepted: Option<usize> = None;

            for m in CANDIDATE_PATTERN.find_iter(line) {
                let raw = m.as_str().to_string();

                if let Some(prev) = last_accepted {
                    if m.start().saturating_sub(prev) < self.config.min_distance {
                        rejections.push(Rejection {
                            page,
                            raw,
                            reason: RejectReason::Overlap,
                        });
                        continue;
                    }
                }

                match Self::canonicalize(&raw) {
                    Ok(identifier) => {
                        debug!(
                            "page {} line {}: candidate {:?} -> {}",
                            page, line_index, raw, identifier
                        );
                        last_accepted = Some(m.start());
                        matches.push(IdentifierMatch {
                            identifier,
                            page,
                            line: line_index,
                            offset: m.start(),
                            raw,
                        });
                    }
                    Err(reason) => {
                        debug!(
                            "page {} line {}: candidate {:?} rejected: {}",
                            page, line_index, raw, reason
                        );
                        rejections.push(Rejection { page, raw, reason });
                    }
                }
            }
        }

        (matches, rejections)
    }

    /// Map a raw candidate onto the canonical grammar, or say why not.
    fn canonicalize(raw: &str) -> Result<String, RejectReason> {
        let chars: Vec<char> = raw.chars().collect();

        let mut prefix = String::with_capacity(3);
        for (i, &c) in chars[..3].iter().enumerate() {
            match canonicalize_prefix_char(i, c) {
                Some(mapped) => prefix.push(mapped),
                None => {
                    return Err(RejectReason::BadPrefix {
                        got: chars[..3].iter().collect(),
                    })
                }
            }
        }
        if prefix != CANONICAL_PREFIX {
            return Err(RejectReason::BadPrefix { got: prefix });
        }

        let mut suffix = String::with_capacity(SUFFIX_LEN);
        for &c in &chars[3..] {
            match canonicalize_digit(c) {
                Some(digit) => suffix.push(digit),
                None => {
                    return Err(RejectReason::DigitLength { got: suffix.len() });
                }
            }
        }
        if suffix.len() != SUFFIX_LEN {
            return Err(RejectReason::DigitLength { got: suffix.len() });
        }

        Ok(format!("{}{}", prefix, suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> IdentifierMatcher {
        IdentifierMatcher::new(MatcherConfig::default())
    }

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn canonical_identifier_matches_as_is() {
        let (matches, rejections) = matcher().find_candidates(1, &lines("SMF6724645"));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].identifier, "SMF6724645");
        assert_eq!(matches[0].raw, "SMF6724645");
        assert!(rejections.is_empty());
    }

    #[test]
    fn lowercase_identifier_is_case_corrected() {
        let (matches, _) = matcher().find_candidates(1, &lines("smf6120331"));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].identifier, "SMF6120331");
    }

    #[test]
    fn near_miss_prefix_is_canonicalized() {
        // 5 -> S, 8 -> M, 6 -> F per the known confusion classes.
        let (matches, _) = matcher().find_candidates(1, &lines("58F1234567"));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].identifier, "SMF1234567");
    }

    #[test]
    fn digit_confusables_are_repaired() {
        // G->6, Z->2, l->1, S->5.
        let (matches, _) = matcher().find_candidates(1, &lines("SMFG7Z4l4S"));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].identifier, "SMF6724145");
    }

    #[test]
    fn short_suffix_is_rejected_not_padded() {
        let (matches, rejections) = matcher().find_candidates(3, &lines("SMF612033"));
        assert!(matches.is_empty());
        assert_eq!(rejections.len(), 1);
        assert_eq!(rejections[0].page, 3);
        assert_eq!(rejections[0].reason, RejectReason::DigitLength { got: 6 });
    }

    #[test]
    fn over_long_digit_run_keeps_first_seven() {
        let (matches, rejections) = matcher().find_candidates(1, &lines("SMF61203315"));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].identifier, "SMF6120331");
        assert!(rejections.is_empty());
    }

    #[test]
    fn abutting_house_reference_does_not_swallow_suffix() {
        // OCR dropped the space before the house reference; the identifier
        // must still come out whole and the reference digits stay behind.
        let (matches, rejections) = matcher().find_candidates(1, &lines("SMF6724645245/2/17"));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].identifier, "SMF6724645");
        assert!(rejections.is_empty());
    }

    #[test]
    fn back_to_back_identifiers_both_match() {
        let (matches, _) = matcher().find_candidates(1, &lines("SMF1111111SMF2222222"));
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].identifier, "SMF1111111");
        assert_eq!(matches[1].identifier, "SMF2222222");
    }

    #[test]
    fn unmappable_prefix_is_rejected() {
        let (matches, rejections) = matcher().find_candidates(1, &lines("5XF1234567"));
        assert!(matches.is_empty());
        assert!(matches!(
            rejections[0].reason,
            RejectReason::BadPrefix { .. }
        ));
    }

    #[test]
    fn candidates_at_or_past_min_distance_all_survive() {
        // Starts at 0, 11 and 22 bytes; all at or past the 10-byte minimum.
        let (matches, rejections) =
            matcher().find_candidates(1, &lines("SMF6724645 SMF1111111 SMF2222222"));
        assert_eq!(matches.len(), 3);
        assert!(rejections.is_empty());
    }

    #[test]
    fn overlapping_candidates_keep_first() {
        let config = MatcherConfig { min_distance: 15 };
        let m = IdentifierMatcher::new(config);
        let (matches, rejections) = m.find_candidates(1, &lines("SMF6724645 SMF1111111"));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].identifier, "SMF6724645");
        assert_eq!(rejections.len(), 1);
        assert_eq!(rejections[0].reason, RejectReason::Overlap);
    }

    #[test]
    fn matches_are_ordered_by_position() {
        let text = "junk SMF1111111\nmore junk\nSMF2222222 trailing";
        let (matches, _) = matcher().find_candidates(1, &lines(text));
        assert_eq!(matches.len(), 2);
        assert!(matches[0].line < matches[1].line);
        assert_eq!(matches[0].offset, 5);
    }

    #[test]
    fn emitted_identifiers_always_satisfy_grammar() {
        let noisy = "58F1234567 smf0000000 $MF9876543 SMFOOlZFBG";
        let (matches, _) = matcher().find_candidates(1, &lines(noisy));
        for m in &matches {
            assert!(is_canonical(&m.identifier), "bad {}", m.identifier);
        }
    }

    #[test]
    fn is_canonical_rejects_malformed() {
        assert!(is_canonical("SMF6724645"));
        assert!(!is_canonical("SMF672464"));
        assert!(!is_canonical("smf6724645"));
        assert!(!is_canonical("SMX6724645"));
        assert!(!is_canonical("SMF67246450"));
    }
}
