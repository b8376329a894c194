// Ordered OCR repair rules for the voter identifier alphabet.
//
// Rules rewrite only a bounded window anchored at identifier-prefix
// candidates so that unrelated page text passes through untouched. Rule
// order is part of the contract: multi-character misreadings must be fixed
// before any single-character substitution removes the pattern they match.

use lazy_static::lazy_static;

/// One deterministic substring repair. `replacement` may be empty, which
/// deletes a known OCR artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrectionRule {
    pub pattern: &'static str,
    pub replacement: &'static str,
}

/// Ordered rule list, most specific first. `$||` and `$|!` are whole-prefix
/// misreadings of `SMF` and must run before the lone `$` rule eats their
/// leading character.
pub const CORRECTION_RULES: &[CorrectionRule] = &[
    CorrectionRule { pattern: "$||", replacement: "SMF" },
    CorrectionRule { pattern: "$|!", replacement: "SMF" },
    CorrectionRule { pattern: "5५", replacement: "SM" },
    CorrectionRule { pattern: "॥", replacement: "M" },
    CorrectionRule { pattern: "$", replacement: "S" },
    CorrectionRule { pattern: "log", replacement: "" },
    CorrectionRule { pattern: "Ig", replacement: "" },
    CorrectionRule { pattern: "le", replacement: "" },
];

const DEVANAGARI_DIGITS: [(char, char); 10] = [
    ('०', '0'),
    ('१', '1'),
    ('२', '2'),
    ('३', '3'),
    ('४', '4'),
    ('५', '5'),
    ('६', '6'),
    ('७', '7'),
    ('८', '8'),
    ('९', '9'),
];

/// Transliterate Devanagari numerals to Latin digits. General purpose; the
/// normalizer uses it for ages and serials as well.
pub fn transliterate_digits(text: &str) -> String {
    text.chars()
        .map(|c| {
            DEVANAGARI_DIGITS
                .iter()
                .find(|(dev, _)| *dev == c)
                .map(|(_, latin)| *latin)
                .unwrap_or(c)
        })
        .collect()
}

fn is_digit_like(c: char) -> bool {
    c.is_ascii_digit() || DEVANAGARI_DIGITS.iter().any(|(dev, _)| *dev == c)
}

/// Characters an identifier prefix is known to start with when misread.
fn is_anchor_char(c: char) -> bool {
    matches!(c, '$' | '॥' | 'S' | 's' | '5')
}

lazy_static! {
    /// The process-wide rule table. Immutable, safe to share across jobs.
    pub static ref CORRECTION_TABLE: CorrectionTable = CorrectionTable::new();
}

/// The fixed correction pipeline: [`CORRECTION_RULES`] plus windowed
/// numeral transliteration. Construction is cheap; the lazy_static
/// instance exists so concurrent jobs share one table.
#[derive(Debug, Clone)]
pub struct CorrectionTable {
    rules: Vec<CorrectionRule>,
    /// Window length, in chars, rewritten after each anchor.
    window: usize,
    /// Digit-like chars required in the lookahead for a position to count
    /// as an identifier-prefix anchor.
    min_digits: usize,
}

impl CorrectionTable {
    pub fn new() -> Self {
        CorrectionTable {
            rules: CORRECTION_RULES.to_vec(),
            window: 16,
            min_digits: 4,
        }
    }

    pub fn rules(&self) -> &[CorrectionRule] {
        &self.rules
    }

    /// Apply the rule table to one line of page text. Pure and idempotent:
    /// no rule output contains any rule pattern, and corrected windows
    /// still anchor on their leading `S`.
    pub fn apply(&self, text: &str) -> String {
        let chars: Vec<char> = text.chars().collect();
        let windows = self.anchor_windows(&chars);
        if windows.is_empty() {
            return text.to_string();
        }

        let mut out = String::with_capacity(text.len());
        let mut cursor = 0usize;
        for (start, end) in windows {
            out.extend(&chars[cursor..start]);
            let slice: String = chars[start..end].iter().collect();
            out.push_str(&self.apply_window(&slice));
            cursor = end;
        }
        out.extend(&chars[cursor..]);
        out
    }

    fn apply_window(&self, window: &str) -> String {
        let mut corrected = window.to_string();
        for rule in &self.rules {
            if corrected.contains(rule.pattern) {
                corrected = corrected.replace(rule.pattern, rule.replacement);
            }
        }
        transliterate_digits(&corrected)
    }

    /// Locate anchor windows and merge overlapping ones so each character
    /// is rewritten at most once.
    fn anchor_windows(&self, chars: &[char]) -> Vec<(usize, usize)> {
        let mut windows: Vec<(usize, usize)> = Vec::new();
        for (i, &c) in chars.iter().enumerate() {
            if !is_anchor_char(c) {
                continue;
            }
            let lookahead = &chars[(i + 1).min(chars.len())..(i + 13).min(chars.len())];
            let digits = lookahead.iter().filter(|&&c| is_digit_like(c)).count();
            if digits < self.min_digits {
                continue;
            }
            let end = (i + self.window).min(chars.len());
            match windows.last_mut() {
                Some((_, prev_end)) if *prev_end >= i => *prev_end = (*prev_end).max(end),
                _ => windows.push((i, end)),
            }
        }
        windows
    }
}

impl Default for CorrectionTable {
    fn default() -> Self {
        CorrectionTable::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dollar_pipe_prefix_becomes_smf() {
        let table = CorrectionTable::new();
        assert_eq!(table.apply("$||6724645"), "SMF6724645");
    }

    #[test]
    fn danda_glyph_becomes_m() {
        let table = CorrectionTable::new();
        assert_eq!(table.apply("S॥F6724645"), "SMF6724645");
    }

    #[test]
    fn five_devanagari_five_becomes_sm() {
        let table = CorrectionTable::new();
        assert_eq!(table.apply("5५F6724645"), "SMF6724645");
    }

    #[test]
    fn devanagari_digits_transliterated_inside_window() {
        let table = CorrectionTable::new();
        assert_eq!(table.apply("SMF६७२४६४५"), "SMF6724645");
    }

    #[test]
    fn unrelated_text_untouched() {
        let table = CorrectionTable::new();
        // "le" is a deletion rule but only fires inside anchor windows.
        let text = "single malt available $5 each";
        assert_eq!(table.apply(text), text);
    }

    #[test]
    fn idempotent_on_corrected_text() {
        let table = CorrectionTable::new();
        let inputs = ["$||6724645", "5५F6120331", "S॥F००London12345", "plain text"];
        for input in inputs {
            let once = table.apply(input);
            assert_eq!(table.apply(&once), once, "not idempotent for {:?}", input);
        }
    }

    #[test]
    fn rule_order_puts_specific_patterns_first() {
        // The `$||` rule must precede the lone `$` rule or the composite
        // pattern can never fire.
        let rules = CorrectionTable::new();
        let whole = rules
            .rules()
            .iter()
            .position(|r| r.pattern == "$||")
            .unwrap();
        let single = rules
            .rules()
            .iter()
            .position(|r| r.pattern == "$")
            .unwrap();
        assert!(whole < single);
        assert_eq!(rules.rules(), CORRECTION_RULES);
    }

    #[test]
    fn transliteration_covers_all_ten_numerals() {
        assert_eq!(transliterate_digits("०१२३४५६७८९"), "0123456789");
        assert_eq!(transliterate_digits("वय ४५"), "वय 45");
    }
}
