// Semantic mapping of raw field captures onto a validated record.
//
// This is where best-effort policy is enforced: every field that fails to
// normalize lands in the record's missing-field set and the record is
// still emitted. Only an identifier that fails the canonical grammar
// discards a record, and that happens upstream in the matcher.

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::{Gender, IdentifierMatch, RawFieldSet, VoterRecord};
use crate::processing::transliterate_digits;

/// Ages outside this band are treated as misreads, not data.
const AGE_RANGE: std::ops::RangeInclusive<u32> = 1..=130;

lazy_static! {
    /// Fixed slash-delimited grouping a house number decomposes into.
    static ref HOUSE_PARTS_PATTERN: Regex = Regex::new(r"^(\d+)/(\d+)/(\d+)$").unwrap();
    static ref MALE_PATTERN: Regex = Regex::new(r"पुरुष|^पु$|पु[\s.]").unwrap();
    static ref FEMALE_PATTERN: Regex = Regex::new(r"स्त्री|महिला|स्री|स््री|स्\s*त्री").unwrap();
    static ref OTHER_PATTERN: Regex = Regex::new(r"इतर|तृतीयपंथी").unwrap();
}

/// Map an OCR gender token onto the closed enum. Never fails; tokens the
/// roll does not use degrade to `Unknown`.
pub fn map_gender(token: &str) -> Gender {
    if MALE_PATTERN.is_match(token) {
        Gender::Male
    } else if FEMALE_PATTERN.is_match(token) {
        Gender::Female
    } else if OTHER_PATTERN.is_match(token) {
        Gender::Other
    } else {
        Gender::Unknown
    }
}

/// Parse an age out of a raw capture, transliterating native numerals
/// first. Unparseable or implausible values count as missing.
pub fn parse_age(raw: &str) -> Option<u32> {
    let latin = transliterate_digits(raw.trim());
    let age: u32 = latin.parse().ok()?;
    if AGE_RANGE.contains(&age) {
        Some(age)
    } else {
        None
    }
}

/// Decompose a house-number string into its slash-delimited numeric
/// components, when it follows the fixed 3-part grouping. Anything else
/// stays opaque.
pub fn house_parts(raw: &str) -> Option<Vec<String>> {
    let latin = transliterate_digits(raw.trim());
    HOUSE_PARTS_PATTERN.captures(&latin).map(|caps| {
        (1..=3)
            .map(|i| caps.get(i).map_or(String::new(), |c| c.as_str().to_string()))
            .collect()
    })
}

pub struct RecordNormalizer;

impl RecordNormalizer {
    /// Build a validated record from raw captures. Total: every failure
    /// degrades to a missing field, and a record carrying nothing beyond
    /// its identifier is still emitted, flagged incomplete via its
    /// missing-field set.
    pub fn normalize(raw: &RawFieldSet, m: &IdentifierMatch) -> VoterRecord {
        let mut record = VoterRecord {
            identifier: m.identifier.clone(),
            serial: None,
            name: raw.name.clone(),
            relation_name: raw.relation_name.clone(),
            house_raw: raw.house_raw.clone(),
            house_parts: None,
            age: None,
            gender: Gender::Unknown,
            page: m.page,
            missing_fields: Default::default(),
        };

        // Serial number: as printed, or recovered from the final component
        // of the slash reference on the identifier line.
        record.serial = raw
            .serial
            .as_deref()
            .map(|s| transliterate_digits(s.trim()))
            .filter(|s| !s.is_empty())
            .or_else(|| {
                raw.column_ref
                    .as_deref()
                    .and_then(|r| house_parts(r))
                    .map(|parts| parts[2].clone())
            });

        record.house_parts = raw.house_raw.as_deref().and_then(house_parts);
        record.age = raw.age.as_deref().and_then(parse_age);

        match raw.gender.as_deref() {
            Some(token) => record.gender = map_gender(token),
            None => record.gender = Gender::Unknown,
        }

        if record.serial.is_none() {
            record.missing_fields.insert("serial".to_string());
        }
        if record.name.is_none() {
            record.missing_fields.insert("name".to_string());
        }
        if record.relation_name.is_none() {
            record.missing_fields.insert("relation_name".to_string());
        }
        if record.house_raw.is_none() {
            record.missing_fields.insert("house".to_string());
        }
        if record.age.is_none() {
            record.missing_fields.insert("age".to_string());
        }
        if record.gender == Gender::Unknown {
            record.missing_fields.insert("gender".to_string());
        }

        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_match() -> IdentifierMatch {
        IdentifierMatch {
            identifier: "SMF6724645".to_string(),
            page: 3,
            line: 1,
            offset: 0,
            raw: "SMF6724645".to_string(),
        }
    }

    #[test]
    fn full_field_set_normalizes_cleanly() {
        let raw = RawFieldSet {
            serial: None,
            column_ref: Some("245/2/17".to_string()),
            name: Some("रमेश पाटील".to_string()),
            relation_name: Some("सखाराम पाटील".to_string()),
            house_raw: Some("12/4/1".to_string()),
            age: Some("४५".to_string()),
            gender: Some("पुरुष".to_string()),
        };
        let record = RecordNormalizer::normalize(&raw, &id_match());
        assert_eq!(record.serial.as_deref(), Some("17"));
        assert_eq!(record.age, Some(45));
        assert_eq!(record.gender, Gender::Male);
        assert_eq!(
            record.house_parts,
            Some(vec!["12".to_string(), "4".to_string(), "1".to_string()])
        );
        assert!(record.missing_fields.is_empty());
    }

    #[test]
    fn bare_record_is_emitted_flagged_incomplete() {
        let record = RecordNormalizer::normalize(&RawFieldSet::default(), &id_match());
        assert_eq!(record.identifier, "SMF6724645");
        assert!(record.is_bare());
        assert_eq!(record.missing_fields.len(), 6);
    }

    #[test]
    fn gender_tokens_map_to_closed_enum() {
        assert_eq!(map_gender("पुरुष"), Gender::Male);
        assert_eq!(map_gender("पु"), Gender::Male);
        assert_eq!(map_gender("स्त्री"), Gender::Female);
        assert_eq!(map_gender("महिला"), Gender::Female);
        assert_eq!(map_gender("स््री"), Gender::Female);
        assert_eq!(map_gender("इतर"), Gender::Other);
        assert_eq!(map_gender("garbage"), Gender::Unknown);
    }

    #[test]
    fn unrecognized_gender_counts_as_missing() {
        let raw = RawFieldSet {
            gender: Some("##".to_string()),
            ..Default::default()
        };
        let record = RecordNormalizer::normalize(&raw, &id_match());
        assert_eq!(record.gender, Gender::Unknown);
        assert!(record.missing_fields.contains("gender"));
    }

    #[test]
    fn age_parsing_handles_native_numerals_and_bounds() {
        assert_eq!(parse_age("४५"), Some(45));
        assert_eq!(parse_age("45"), Some(45));
        assert_eq!(parse_age("  ३८ "), Some(38));
        assert_eq!(parse_age("0"), None);
        assert_eq!(parse_age("245"), None);
        assert_eq!(parse_age("४५x"), None);
    }

    #[test]
    fn opaque_house_number_keeps_raw_only() {
        let raw = RawFieldSet {
            house_raw: Some("7-B".to_string()),
            ..Default::default()
        };
        let record = RecordNormalizer::normalize(&raw, &id_match());
        assert_eq!(record.house_raw.as_deref(), Some("7-B"));
        assert!(record.house_parts.is_none());
        assert!(!record.missing_fields.contains("house"));
    }

    #[test]
    fn house_decomposition_requires_exact_grouping() {
        assert_eq!(
            house_parts("२४५/2/17"),
            Some(vec!["245".to_string(), "2".to_string(), "17".to_string()])
        );
        assert_eq!(house_parts("4/12"), None);
        assert_eq!(house_parts("a/b/c"), None);
    }

    #[test]
    fn printed_serial_wins_over_column_reference() {
        let raw = RawFieldSet {
            serial: Some("९९".to_string()),
            column_ref: Some("245/2/17".to_string()),
            ..Default::default()
        };
        let record = RecordNormalizer::normalize(&raw, &id_match());
        assert_eq!(record.serial.as_deref(), Some("99"));
    }
}
