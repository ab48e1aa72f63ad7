//! Typed parameters for each report request.
//!
//! These structs are what the dispatcher deserializes caller input into.
//! Every struct re-validates itself before a URL is built, so callers that
//! construct them directly get the same checks as the dispatcher path.

use crate::attribution::Attribution;
use crate::error::Result;
use crate::validate;
use serde::{Deserialize, Serialize};

/// Counter only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterParams {
    /// Counter identifier.
    pub counter_id: String,
}

impl CounterParams {
    /// Validate the counter identifier.
    pub fn validate(&self) -> Result<()> {
        validate::counter_id(&self.counter_id)
    }
}

/// Counter plus an optional date range.
///
/// Omitted dates fall back to the service default (last 7 days).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRangeParams {
    /// Counter identifier.
    pub counter_id: String,
    /// Start date, `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date1: Option<String>,
    /// End date, `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date2: Option<String>,
}

impl DateRangeParams {
    /// Range with no dates, letting the service pick its default window.
    pub fn new(counter_id: impl Into<String>) -> Self {
        Self {
            counter_id: counter_id.into(),
            date1: None,
            date2: None,
        }
    }

    /// Set both ends of the range.
    pub fn between(mut self, date1: impl Into<String>, date2: impl Into<String>) -> Self {
        self.date1 = Some(date1.into());
        self.date2 = Some(date2.into());
        self
    }

    /// Validate the counter and both dates.
    pub fn validate(&self) -> Result<()> {
        validate::counter_id(&self.counter_id)?;
        validate::optional_date("date1", self.date1.as_deref())?;
        validate::optional_date("date2", self.date2.as_deref())
    }
}

/// Page depth report parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDepthParams {
    /// Counter and date range.
    #[serde(flatten)]
    pub range: DateRangeParams,
    /// Only visits deeper than this many pages are counted.
    #[serde(default = "default_min_depth")]
    pub min_depth: u32,
}

fn default_min_depth() -> u32 {
    2
}

impl PageDepthParams {
    /// Validate the range and the depth threshold.
    pub fn validate(&self) -> Result<()> {
        self.range.validate()?;
        validate::min_depth(self.min_depth)
    }
}

/// Goal conversion parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalsParams {
    /// Counter and date range.
    #[serde(flatten)]
    pub range: DateRangeParams,
    /// Goal identifiers to report on.
    pub goal_ids: Vec<u64>,
}

impl GoalsParams {
    /// Validate the range and the goal list.
    pub fn validate(&self) -> Result<()> {
        self.range.validate()?;
        validate::non_empty_list("goal_ids", &self.goal_ids)
    }
}

/// Regional report parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionalParams {
    /// Counter and date range.
    #[serde(flatten)]
    pub range: DateRangeParams,
    /// Restrict the report to these city names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cities: Option<Vec<String>>,
}

impl RegionalParams {
    /// Validate the range and, when present, the city list.
    pub fn validate(&self) -> Result<()> {
        self.range.validate()?;
        if let Some(cities) = &self.cities {
            validate::non_empty_list("cities", cities)?;
        }
        Ok(())
    }
}

/// Landing page report parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagePerformanceParams {
    /// Counter and date range.
    #[serde(flatten)]
    pub range: DateRangeParams,
    /// Add bounce rate to the reported metrics.
    #[serde(default)]
    pub include_bounce_rate: bool,
}

impl PagePerformanceParams {
    /// Validate the range.
    pub fn validate(&self) -> Result<()> {
        self.range.validate()
    }
}

/// E-commerce report parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcommerceParams {
    /// Counter and date range.
    #[serde(flatten)]
    pub range: DateRangeParams,
    /// Currency for revenue metrics; the counter's own currency when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl EcommerceParams {
    /// Validate the range and, when present, the currency code.
    pub fn validate(&self) -> Result<()> {
        self.range.validate()?;
        if let Some(currency) = &self.currency {
            validate::currency(currency)?;
        }
        Ok(())
    }
}

/// Free-form report against the data surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportParams {
    /// Counter and date range.
    #[serde(flatten)]
    pub range: DateRangeParams,
    /// Metrics to request (1-20).
    pub metrics: Vec<String>,
    /// Dimensions to group by (0-10).
    #[serde(default)]
    pub dimensions: Vec<String>,
    /// Filter expression in the service's filter grammar.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<String>,
    /// Sort expression, e.g. `-ym:s:visits`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    /// Language for dimension labels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl ReportParams {
    /// Validate the range and both lists.
    pub fn validate(&self) -> Result<()> {
        self.range.validate()?;
        validate::metrics(&self.metrics)?;
        validate::dimensions(&self.dimensions)
    }
}

/// Time-series report against the `bytime` surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeriesParams {
    /// Counter and date range.
    #[serde(flatten)]
    pub range: DateRangeParams,
    /// Metrics to request (1-20).
    pub metrics: Vec<String>,
    /// Dimensions to group by (0-10).
    #[serde(default)]
    pub dimensions: Vec<String>,
    /// Time grouping.
    #[serde(default = "default_group")]
    pub group: String,
    /// Attribution model encoded into every dimension name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    /// Number of top dimension values to break out (1-30).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_keys: Option<u32>,
    /// Timezone offset, e.g. `+03:00`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    /// Filter expression in the service's filter grammar.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<String>,
}

fn default_group() -> String {
    "day".to_string()
}

impl TimeSeriesParams {
    /// Validate every field, resolving the attribution model.
    pub fn validate(&self) -> Result<Option<Attribution>> {
        self.range.validate()?;
        validate::metrics(&self.metrics)?;
        validate::dimensions(&self.dimensions)?;
        validate::group(&self.group)?;
        if let Some(top_keys) = self.top_keys {
            validate::top_keys(top_keys)?;
        }
        self.attribution
            .as_deref()
            .map(str::parse::<Attribution>)
            .transpose()
    }
}
