//! Time-series group model.
//!
//! A group belongs to exactly one category and lists the time series
//! assigned to it. Groups with no assignments are valid and common.

use crate::paging::GroupedEntity;
use serde::{Deserialize, Serialize};

/// Category that owns a set of time-series groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TimeSeriesCategory {
    pub office_id: String,
    pub id: String,
    pub description: Option<String>,
}

/// One time series assigned to a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AssignedTimeSeries {
    pub office_id: String,
    pub timeseries_id: String,
    /// Sort attribute used by consumers to order members.
    pub attribute: Option<f64>,
    pub alias_id: Option<String>,
    pub ref_ts_id: Option<String>,
}

/// Time-series group with its ordered member list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TimeSeriesGroup {
    pub office_id: String,
    pub time_series_category: TimeSeriesCategory,
    pub id: String,
    pub description: Option<String>,
    pub shared_alias_id: Option<String>,
    pub shared_ref_ts_id: Option<String>,
    #[serde(default)]
    pub assigned_time_series: Vec<AssignedTimeSeries>,
}

impl GroupedEntity for TimeSeriesGroup {
    type Child = AssignedTimeSeries;

    fn push_child(&mut self, child: AssignedTimeSeries) {
        self.assigned_time_series.push(child);
    }
}
