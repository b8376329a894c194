// Positional field recovery around a matched identifier.
//
// The voter roll template prints up to three records side by side; the
// label of each field therefore appears up to three times per line, and
// the record's column index picks the right occurrence. A field whose line
// is absent or whose label does not capture is marked missing, never
// borrowed from a neighboring line; misalignment must not cascade.

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::{FieldLayout, IdentifierMatch, RawFieldSet};

lazy_static! {
    /// 3-part slash reference (part/section/serial) on the identifier line.
    static ref COLUMN_REF_PATTERN: Regex = Regex::new(r"\d+/\d+/\d+").unwrap();

    /// Field labels, used as split points so each column's value is the
    /// text between two label occurrences.
    static ref NAME_LABEL: Regex = Regex::new(r"मतदाराचे\s*(?:पूर्ण\s*)?नावा?\s*[:\-]?").unwrap();
    static ref RELATION_LABEL: Regex = Regex::new(r"(?:वडिलांचे|पतीचे|आईचे)\s*नावा?\s*[:\-]?").unwrap();
    static ref HOUSE_LABEL: Regex = Regex::new(r"घर\s*क्रमांक\s*[:\-]?").unwrap();

    /// Value captures applied to the text following a label occurrence.
    static ref DEVANAGARI_VALUE: Regex =
        Regex::new(r"^\s*([\u{0900}-\u{097F}][\u{0900}-\u{097F}\s\u{200C}\u{200D}]*)").unwrap();
    static ref HOUSE_VALUE: Regex = Regex::new(r"^\s*([A-Za-z0-9/\-]+)").unwrap();

    /// Age and gender print as one `वय : NN लिंग : X` group per column.
    static ref AGE_GENDER_PATTERN: Regex =
        Regex::new(r"वय\s*[:\-]?\s*([०-९0-9]{1,3})\s*लिंग\s*[:\-]?\s*(\S+)").unwrap();
}

/// Collapse whitespace runs and strip the junk OCR leaves on Devanagari
/// captures (zero-width joiners, dandas, stray pipes and quotes).
fn tidy(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .filter(|c| !matches!(c, '\u{200d}' | '\u{200c}' | '।' | '|' | '\'' | '’' | '‘'))
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Split `line` at each label occurrence and capture the column-th value
/// with `value_pattern`. Returns None when the label row has fewer columns
/// than expected.
fn labeled_column(
    line: &str,
    label: &Regex,
    value_pattern: &Regex,
    column: usize,
) -> Option<String> {
    let mut parts: Vec<&str> = label.split(line).collect();
    if parts.len() < 2 {
        return None;
    }
    // parts[0] is the text before the first label.
    parts.remove(0);
    let part = parts.get(column)?;
    let captured = value_pattern.captures(part)?.get(1)?.as_str();
    non_empty(tidy(captured))
}

/// Extracts raw field values from the window of lines around an
/// identifier match. Pure: a function of the page lines, the match span
/// and the layout only.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    layout: FieldLayout,
}

impl FieldExtractor {
    pub fn new(layout: FieldLayout) -> Self {
        FieldExtractor { layout }
    }

    pub fn extract(&self, lines: &[String], m: &IdentifierMatch) -> RawFieldSet {
        let mut fields = RawFieldSet::default();
        if m.line >= lines.len() {
            return fields;
        }

        let id_line = &lines[m.line];
        let column = Self::locate_column(id_line, m, &mut fields);

        let start = m.line.saturating_sub(self.layout.lines_before);
        let end = (m.line + self.layout.lines_after + 1).min(lines.len());
        let window = &lines[start..end];

        for line in window {
            if fields.name.is_none() && NAME_LABEL.is_match(line) {
                fields.name = labeled_column(line, &NAME_LABEL, &DEVANAGARI_VALUE, column);
            }
            if fields.relation_name.is_none() && RELATION_LABEL.is_match(line) {
                fields.relation_name =
                    labeled_column(line, &RELATION_LABEL, &DEVANAGARI_VALUE, column);
            }
            if fields.house_raw.is_none() && HOUSE_LABEL.is_match(line) {
                fields.house_raw = labeled_column(line, &HOUSE_LABEL, &HOUSE_VALUE, column);
            }
            if fields.age.is_none() {
                if let Some(caps) = AGE_GENDER_PATTERN.captures_iter(line).nth(column) {
                    fields.age = non_empty(tidy(caps.get(1).map_or("", |c| c.as_str())));
                    fields.gender = non_empty(tidy(caps.get(2).map_or("", |c| c.as_str())));
                }
            }
        }

        fields
    }

    /// Determine which of the side-by-side columns this match belongs to
    /// from the slash reference following it on its own line, and record
    /// that reference. Falls back to column 0 when no reference prints.
    fn locate_column(id_line: &str, m: &IdentifierMatch, fields: &mut RawFieldSet) -> usize {
        let match_end = m.offset + m.raw.len();
        let refs: Vec<(usize, &str)> = COLUMN_REF_PATTERN
            .find_iter(id_line)
            .map(|r| (r.start(), r.as_str()))
            .collect();

        for (index, (start, text)) in refs.iter().enumerate() {
            if *start >= match_end {
                fields.column_ref = Some((*text).to_string());
                return index;
            }
        }
        // No reference after the match; the identifier itself still tells
        // us the column by counting references before it.
        refs.iter().filter(|(start, _)| *start < m.offset).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_match(line: usize, offset: usize, raw: &str) -> IdentifierMatch {
        IdentifierMatch {
            identifier: "SMF6724645".to_string(),
            page: 1,
            line,
            offset,
            raw: raw.to_string(),
        }
    }

    fn sample_page() -> Vec<String> {
        vec![
            "विभाग 12".to_string(),
            "SMF6724645 245/2/17 SMF1111111 245/2/18".to_string(),
            "मतदाराचे पूर्ण नाव : रमेश सखाराम पाटील मतदाराचे पूर्ण नाव : सुनीता विलास जाधव".to_string(),
            "वडिलांचे नाव : सखाराम पाटील पतीचे नाव : विलास जाधव".to_string(),
            "घर क्रमांक : 4/12 घर क्रमांक : 7-B".to_string(),
            "वय : ४५ लिंग : पुरुष वय : ३८ लिंग : स्त्री".to_string(),
        ]
    }

    #[test]
    fn first_column_fields() {
        let extractor = FieldExtractor::new(FieldLayout::default());
        let fields = extractor.extract(&sample_page(), &id_match(1, 0, "SMF6724645"));
        assert_eq!(fields.column_ref.as_deref(), Some("245/2/17"));
        assert_eq!(fields.name.as_deref(), Some("रमेश सखाराम पाटील"));
        assert_eq!(fields.relation_name.as_deref(), Some("सखाराम पाटील"));
        assert_eq!(fields.house_raw.as_deref(), Some("4/12"));
        assert_eq!(fields.age.as_deref(), Some("४५"));
        assert_eq!(fields.gender.as_deref(), Some("पुरुष"));
    }

    #[test]
    fn second_column_fields() {
        let extractor = FieldExtractor::new(FieldLayout::default());
        let offset = "SMF6724645 245/2/17 ".len();
        let fields = extractor.extract(&sample_page(), &id_match(1, offset, "SMF1111111"));
        assert_eq!(fields.column_ref.as_deref(), Some("245/2/18"));
        assert_eq!(fields.name.as_deref(), Some("सुनीता विलास जाधव"));
        assert_eq!(fields.relation_name.as_deref(), Some("विलास जाधव"));
        assert_eq!(fields.house_raw.as_deref(), Some("7-B"));
        assert_eq!(fields.age.as_deref(), Some("३८"));
        assert_eq!(fields.gender.as_deref(), Some("स्त्री"));
    }

    #[test]
    fn missing_lines_mark_fields_missing_without_shifting() {
        // Page ends right after the identifier line: everything below is gone.
        let lines = vec!["SMF6724645 245/2/17".to_string()];
        let extractor = FieldExtractor::new(FieldLayout::default());
        let fields = extractor.extract(&lines, &id_match(0, 0, "SMF6724645"));
        assert_eq!(fields.column_ref.as_deref(), Some("245/2/17"));
        assert!(fields.name.is_none());
        assert!(fields.relation_name.is_none());
        assert!(fields.house_raw.is_none());
        assert!(fields.age.is_none());
        assert!(fields.gender.is_none());
    }

    #[test]
    fn label_row_with_fewer_columns_stays_missing() {
        // Second record exists but the name row only captured one column.
        let lines = vec![
            "SMF6724645 245/2/17 SMF1111111 245/2/18".to_string(),
            "मतदाराचे पूर्ण नाव : रमेश पाटील".to_string(),
        ];
        let extractor = FieldExtractor::new(FieldLayout::default());
        let offset = "SMF6724645 245/2/17 ".len();
        let fields = extractor.extract(&lines, &id_match(0, offset, "SMF1111111"));
        assert!(fields.name.is_none());
    }

    #[test]
    fn captures_are_whitespace_normalized() {
        let lines = vec![
            "SMF6724645 245/2/17".to_string(),
            "मतदाराचे पूर्ण नाव :  रमेश\u{200d}   पाटील । ".to_string(),
        ];
        let extractor = FieldExtractor::new(FieldLayout::default());
        let fields = extractor.extract(&lines, &id_match(0, 0, "SMF6724645"));
        assert_eq!(fields.name.as_deref(), Some("रमेश पाटील"));
    }

    #[test]
    fn match_line_out_of_bounds_yields_empty_set() {
        let extractor = FieldExtractor::new(FieldLayout::default());
        let fields = extractor.extract(&[], &id_match(9, 0, "SMF6724645"));
        assert_eq!(fields, RawFieldSet::default());
    }
}
