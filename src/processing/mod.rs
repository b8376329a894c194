pub mod corrections;
pub mod fields;
pub mod matcher;

pub use corrections::{transliterate_digits, CorrectionTable, CORRECTION_TABLE};
pub use fields::FieldExtractor;
pub use matcher::{is_canonical, IdentifierMatcher, CANONICAL_PREFIX, SUFFIX_LEN};
