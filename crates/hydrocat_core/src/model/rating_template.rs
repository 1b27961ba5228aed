//! Rating template model.
//!
//! # Invariants
//! - `id` is `<ind-1>,<ind-2>...;<dependent>.<version>`.
//! - Independent parameter specs are ordered by `position`, starting at 1.

use crate::paging::GroupedEntity;
use serde::{Deserialize, Serialize};

/// Interpolation/extrapolation behavior for one independent parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LookupMethod {
    Null,
    Error,
    Linear,
    Logarithmic,
    LinLog,
    LogLin,
    Previous,
    Next,
    Nearest,
    Lower,
    Higher,
    Closest,
}

impl LookupMethod {
    /// Storage/wire spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Error => "ERROR",
            Self::Linear => "LINEAR",
            Self::Logarithmic => "LOGARITHMIC",
            Self::LinLog => "LIN_LOG",
            Self::LogLin => "LOG_LIN",
            Self::Previous => "PREVIOUS",
            Self::Next => "NEXT",
            Self::Nearest => "NEAREST",
            Self::Lower => "LOWER",
            Self::Higher => "HIGHER",
            Self::Closest => "CLOSEST",
        }
    }

    /// Parses the storage spelling, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        let method = match value.trim().to_ascii_uppercase().as_str() {
            "NULL" => Self::Null,
            "ERROR" => Self::Error,
            "LINEAR" => Self::Linear,
            "LOGARITHMIC" => Self::Logarithmic,
            "LIN_LOG" => Self::LinLog,
            "LOG_LIN" => Self::LogLin,
            "PREVIOUS" => Self::Previous,
            "NEXT" => Self::Next,
            "NEAREST" => Self::Nearest,
            "LOWER" => Self::Lower,
            "HIGHER" => Self::Higher,
            "CLOSEST" => Self::Closest,
            _ => return None,
        };
        Some(method)
    }
}

/// Lookup behavior of one independent parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IndependentParameterSpec {
    pub position: i64,
    pub parameter: String,
    pub in_range_method: LookupMethod,
    pub out_range_low_method: LookupMethod,
    pub out_range_high_method: LookupMethod,
}

/// Rating template with its ordered independent parameter specs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RatingTemplate {
    pub office_id: String,
    pub id: String,
    pub version: String,
    pub dependent_parameter: String,
    pub description: Option<String>,
    #[serde(default)]
    pub independent_parameter_specs: Vec<IndependentParameterSpec>,
}

impl GroupedEntity for RatingTemplate {
    type Child = IndependentParameterSpec;

    fn push_child(&mut self, child: IndependentParameterSpec) {
        self.independent_parameter_specs.push(child);
    }
}

/// Builds a template id from its parts.
pub fn template_id(independent: &[String], dependent: &str, version: &str) -> String {
    format!("{};{dependent}.{version}", independent.join(","))
}

#[cfg(test)]
mod tests {
    use super::{template_id, LookupMethod};

    #[test]
    fn lookup_method_parse_accepts_storage_spelling_in_any_case() {
        assert_eq!(LookupMethod::parse("lin_log"), Some(LookupMethod::LinLog));
        assert_eq!(LookupMethod::parse(" NEAREST "), Some(LookupMethod::Nearest));
        assert_eq!(LookupMethod::parse("spline"), None);
    }

    #[test]
    fn lookup_method_round_trips_through_storage_spelling() {
        for method in [
            LookupMethod::Null,
            LookupMethod::Linear,
            LookupMethod::LogLin,
            LookupMethod::Closest,
        ] {
            assert_eq!(LookupMethod::parse(method.as_str()), Some(method));
        }
    }

    #[test]
    fn template_id_joins_independent_parameters() {
        let independent = vec!["Elev".to_string(), "Opening".to_string()];
        assert_eq!(
            template_id(&independent, "Flow", "Standard"),
            "Elev,Opening;Flow.Standard"
        );
    }
}
