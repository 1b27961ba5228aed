//! Time-series profile model.

use crate::paging::GroupedEntity;
use serde::{Deserialize, Serialize};

/// One parameter slot in a profile, ordered by `position`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProfileParameter {
    pub position: i64,
    pub parameter_id: String,
}

/// Vertical profile definition at one location, keyed by its key parameter
/// (for example `Depth` for a temperature string).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TimeSeriesProfile {
    pub office_id: String,
    pub location_id: String,
    pub key_parameter_id: String,
    pub description: Option<String>,
    pub reference_ts_id: Option<String>,
    #[serde(default)]
    pub parameter_list: Vec<ProfileParameter>,
}

impl GroupedEntity for TimeSeriesProfile {
    type Child = ProfileParameter;

    fn push_child(&mut self, child: ProfileParameter) {
        self.parameter_list.push(child);
    }
}
