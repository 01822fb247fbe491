//! Chart dimensions.

use std::fmt::{self, Write};
use std::hash::{Hash, Hasher};

use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::protocol::line::{Quoted, flags};
use crate::protocol::params;
use crate::protocol::{ChartError, Samples, sample};

/// How the parent turns collected values into stored points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Algorithm {
    #[default]
    Absolute,
    Incremental,
    PercentageOfAbsoluteRow,
    PercentageOfIncrementalRow,
}

/// One time series within a chart.
///
/// Identity is the id alone: two dimensions with the same id are equal
/// whatever their other attributes, and a dimension compares equal to its id.
#[derive(Debug, Clone)]
pub struct Dimension {
    id: String,
    name: String,
    algorithm: Algorithm,
    multiplier: i64,
    divisor: i64,
    hidden: bool,
    obsolete: bool,
}

impl Dimension {
    const KIND: &'static str = "dimension";

    /// Create a dimension with default attributes.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            algorithm: Algorithm::Absolute,
            multiplier: 1,
            divisor: 1,
            hidden: false,
            obsolete: false,
        }
    }

    /// Build from `[id, name, algorithm, multiplier, divisor, hidden]`.
    ///
    /// Only the id is required. An empty name falls back to the id, an unknown
    /// algorithm to `absolute`, a non-integer or zero multiplier/divisor to 1.
    pub fn from_params(params: &Value) -> Result<Self, ChartError> {
        let list = params::as_list(params, Self::KIND, 1)?;
        let mut dim = Self::new(params::id(list, 0, Self::KIND)?);

        let name = params::text(list, 1);
        if !name.is_empty() {
            dim.name = name;
        }
        dim.algorithm = params::text(list, 2).parse().unwrap_or_default();
        dim.multiplier = nonzero_or_one(params::int(list, 3));
        dim.divisor = nonzero_or_one(params::int(list, 4));
        dim.hidden = params::text(list, 5) == "hidden";
        Ok(dim)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn multiplier(&self) -> i64 {
        self.multiplier
    }

    pub fn divisor(&self) -> i64 {
        self.divisor
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_obsolete(&self) -> bool {
        self.obsolete
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_multiplier(mut self, multiplier: i64) -> Self {
        self.multiplier = nonzero_or_one(Some(multiplier));
        self
    }

    pub fn with_divisor(mut self, divisor: i64) -> Self {
        self.divisor = nonzero_or_one(Some(divisor));
        self
    }

    pub(crate) fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    pub(crate) fn set_obsolete(&mut self) {
        self.obsolete = true;
    }

    /// Value of this dimension in `data`, if any.
    pub fn get_value(&self, data: Option<&Samples>) -> Option<i64> {
        sample::resolve(data, &self.id)
    }

    /// Append the `DIMENSION` declaration line.
    pub fn write_create(&self, out: &mut String) {
        let _ = writeln!(
            out,
            "DIMENSION {} {} {} {} {} {}",
            Quoted(&self.id),
            Quoted(&self.name),
            Quoted(self.algorithm.as_ref()),
            self.multiplier,
            self.divisor,
            Quoted(flags(self.hidden, self.obsolete)),
        );
    }

    /// Append a `SET` line for `value`.
    pub fn write_set(&self, value: i64, out: &mut String) {
        let _ = writeln!(out, "SET {} = {}", Quoted(&self.id), value);
    }
}

fn nonzero_or_one(value: Option<i64>) -> i64 {
    match value {
        Some(v) if v != 0 => v,
        _ => 1,
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl PartialEq for Dimension {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Dimension {}

impl PartialEq<str> for Dimension {
    fn eq(&self, other: &str) -> bool {
        self.id == other
    }
}

impl PartialEq<&str> for Dimension {
    fn eq(&self, other: &&str) -> bool {
        self.id == *other
    }
}

impl PartialEq<String> for Dimension {
    fn eq(&self, other: &String) -> bool {
        &self.id == other
    }
}

impl Hash for Dimension {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_dimension_init_valid() {
        let dim = Dimension::from_params(&json!(["dimension_id", "dimension_name", "absolute", 1, 1]))
            .unwrap();
        assert_eq!(dim.id(), "dimension_id");
        assert_eq!(dim.name(), "dimension_name");
        assert_eq!(dim.algorithm(), Algorithm::Absolute);
        assert_eq!(dim.multiplier(), 1);
        assert_eq!(dim.divisor(), 1);
    }

    #[test]
    fn test_dimension_init_invalid_type() {
        let err = Dimension::from_params(&json!("not a list")).unwrap_err();
        assert!(matches!(err, ChartError::ItemType { .. }));
    }

    #[test]
    fn test_dimension_init_empty_list() {
        let err = Dimension::from_params(&json!([])).unwrap_err();
        assert!(matches!(err, ChartError::ItemValue { .. }));
    }

    #[test]
    fn test_dimension_init_empty_id() {
        let err = Dimension::from_params(&json!([null, "name"])).unwrap_err();
        assert!(matches!(err, ChartError::ItemValue { .. }));
    }

    #[test]
    fn test_dimension_init_with_null_values() {
        let dim = Dimension::from_params(&json!(["dim_id", null, null, null, null])).unwrap();
        assert_eq!(dim.id(), "dim_id");
        assert_eq!(dim.name(), "dim_id");
        assert_eq!(dim.algorithm(), Algorithm::Absolute);
        assert_eq!(dim.multiplier(), 1);
        assert_eq!(dim.divisor(), 1);
        assert!(!dim.is_hidden());
        assert!(!dim.is_obsolete());
    }

    #[test]
    fn test_dimension_invalid_algorithm_defaults_to_absolute() {
        let dim = Dimension::from_params(&json!(["id", "name", "invalid_algo", 1, 1])).unwrap();
        assert_eq!(dim.algorithm(), Algorithm::Absolute);
    }

    #[test]
    fn test_dimension_valid_algorithms() {
        for algo in [
            "absolute",
            "incremental",
            "percentage-of-absolute-row",
            "percentage-of-incremental-row",
        ] {
            let dim = Dimension::from_params(&json!(["id", "name", algo, 1, 1])).unwrap();
            assert_eq!(dim.algorithm().as_ref(), algo);
        }
    }

    #[test]
    fn test_dimension_non_int_multiplier_and_divisor() {
        let dim = Dimension::from_params(&json!(["id", "name", "absolute", "not_int", 2.5])).unwrap();
        assert_eq!(dim.multiplier(), 1);
        assert_eq!(dim.divisor(), 1);

        let dim = Dimension::from_params(&json!(["id", "name", "absolute", -8, 0])).unwrap();
        assert_eq!(dim.multiplier(), -8);
        assert_eq!(dim.divisor(), 1);
    }

    #[test]
    fn test_dimension_equality_by_id() {
        let d1 = Dimension::from_params(&json!(["d1"])).unwrap();
        let d1_again = Dimension::from_params(&json!(["d1", "other name", "incremental"])).unwrap();
        let d2 = Dimension::from_params(&json!(["d2"])).unwrap();

        assert_eq!(d1, d1_again);
        assert_eq!(d1, "d1");
        assert!(d1 != d2);
        assert!(d2 != "d1");
        assert_eq!(d1, "d1".to_string());
    }

    #[test]
    fn test_dimension_hash_by_id() {
        let mut set = HashSet::new();
        set.insert(Dimension::new("id"));
        set.insert(Dimension::new("id").with_name("renamed"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_dimension_display() {
        assert_eq!(Dimension::new("test_id").to_string(), "test_id");
    }

    #[test]
    fn test_dimension_create_line() {
        let dim = Dimension::from_params(&json!(["id", "name", "absolute", 2, 3, "hidden"])).unwrap();
        let mut out = String::new();
        dim.write_create(&mut out);
        assert_eq!(out, "DIMENSION 'id' 'name' 'absolute' 2 3 'hidden'\n");

        let mut out = String::new();
        Dimension::new("plain").write_create(&mut out);
        assert_eq!(out, "DIMENSION 'plain' 'plain' 'absolute' 1 1 ''\n");
    }

    #[test]
    fn test_dimension_set_line() {
        let mut out = String::new();
        Dimension::new("my_dim").write_set(999, &mut out);
        assert_eq!(out, "SET 'my_dim' = 999\n");
    }

    #[test]
    fn test_dimension_get_value() {
        let dim = Dimension::new("dim_id");
        let data = Samples::from([("dim_id".to_string(), json!("100"))]);
        assert_eq!(dim.get_value(Some(&data)), Some(100));

        let data = Samples::from([("other_id".to_string(), json!(42))]);
        assert_eq!(dim.get_value(Some(&data)), None);
        assert_eq!(dim.get_value(None), None);
    }
}
