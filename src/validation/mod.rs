pub mod normalize;

pub use normalize::{house_parts, map_gender, parse_age, RecordNormalizer};
