//! Operation table: name → parameter schema → typed request.
//!
//! A dispatcher looks an operation up by name, checks raw JSON input against
//! its schema, and parses it into a [`ReportRequest`]. The query builder then
//! re-validates the typed parameters before building a URL.

use crate::attribution;
use crate::error::{MetrikaError, Result};
use crate::query::{ContentReport, ReportRequest};
use crate::validate::GROUPS;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Semantic type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Counter identifier string.
    CounterId,
    /// `YYYY-MM-DD` date string.
    Date,
    /// Array of strings.
    StringArray,
    /// Array of non-negative integers.
    NumberArray,
    /// One of a fixed set of strings.
    Enum(&'static [&'static str]),
    /// Boolean flag.
    Boolean,
    /// Non-negative integer.
    Integer,
    /// Free-form string.
    String,
}

impl ParamKind {
    /// Short type name for listings and error messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::CounterId => "counter id",
            Self::Date => "date",
            Self::StringArray => "string[]",
            Self::NumberArray => "number[]",
            Self::Enum(_) => "enum",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::String => "string",
        }
    }

    fn check(self, name: &str, value: &Value) -> Result<()> {
        let ok = match self {
            Self::CounterId | Self::Date | Self::String => value.is_string(),
            Self::StringArray => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            Self::NumberArray => value
                .as_array()
                .is_some_and(|items| items.iter().all(|v| v.as_u64().is_some())),
            Self::Boolean => value.is_boolean(),
            Self::Integer => value.as_u64().is_some(),
            Self::Enum(values) => {
                let Some(s) = value.as_str() else {
                    return Err(MetrikaError::invalid(format!("{name} must be a string")));
                };
                if !values.contains(&s) {
                    return Err(MetrikaError::invalid(format!(
                        "{name} '{s}' is not valid; expected one of: {}",
                        values.join(", ")
                    )));
                }
                true
            }
        };

        if ok {
            Ok(())
        } else {
            Err(MetrikaError::invalid(format!(
                "{name} must be of type {}, got {value}",
                self.label()
            )))
        }
    }
}

/// Schema entry for one parameter.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    /// Parameter name as it appears in caller input.
    pub name: &'static str,
    /// Semantic type.
    pub kind: ParamKind,
    /// Whether the parameter must be present.
    pub required: bool,
    /// Default applied when the parameter is omitted, for display.
    pub default: Option<&'static str>,
    /// Human-readable description.
    pub description: &'static str,
}

/// One callable operation.
#[derive(Debug, Clone, Copy)]
pub struct OperationSpec {
    /// Operation name used for dispatch.
    pub name: &'static str,
    /// Short title.
    pub title: &'static str,
    /// Longer description.
    pub description: &'static str,
    /// Parameter schema.
    pub params: &'static [ParamSpec],
    parse: fn(Value) -> Result<ReportRequest>,
}

impl OperationSpec {
    /// Check raw input against the schema.
    ///
    /// `null` input and `null` values count as absent.
    pub fn check(&self, input: &Value) -> Result<()> {
        let empty = Map::new();
        let object = match input {
            Value::Null => &empty,
            Value::Object(map) => map,
            other => {
                return Err(MetrikaError::invalid(format!(
                    "parameters for {} must be an object, got {other}",
                    self.name
                )));
            }
        };

        if let Some(unknown) = object
            .keys()
            .find(|key| !self.params.iter().any(|p| p.name == key.as_str()))
        {
            return Err(MetrikaError::invalid(format!(
                "unknown parameter '{unknown}' for {}",
                self.name
            )));
        }

        for spec in self.params {
            match object.get(spec.name).filter(|v| !v.is_null()) {
                Some(value) => spec.kind.check(spec.name, value)?,
                None if spec.required => {
                    return Err(MetrikaError::invalid(format!(
                        "{} is required for {}",
                        spec.name, self.name
                    )));
                }
                None => {}
            }
        }

        Ok(())
    }

    /// Check `input` against the schema and parse it into a typed request.
    pub fn parse(&self, input: Value) -> Result<ReportRequest> {
        self.check(&input)?;

        let object: Map<String, Value> = match input {
            Value::Object(map) => map.into_iter().filter(|(_, v)| !v.is_null()).collect(),
            _ => Map::new(),
        };

        (self.parse)(Value::Object(object))
    }
}

fn from_input<T: DeserializeOwned>(input: Value) -> Result<T> {
    serde_json::from_value(input).map_err(|e| MetrikaError::invalid(e.to_string()))
}

/// Look up an operation by name.
pub fn find(name: &str) -> Option<&'static OperationSpec> {
    OPERATIONS.iter().find(|op| op.name == name)
}

/// Look up an operation by name, failing with [`MetrikaError::UnknownOperation`].
pub fn lookup(name: &str) -> Result<&'static OperationSpec> {
    find(name).ok_or_else(|| MetrikaError::UnknownOperation(name.to_string()))
}

const COUNTER_ID: ParamSpec = ParamSpec {
    name: "counter_id",
    kind: ParamKind::CounterId,
    required: true,
    default: None,
    description: "Counter identifier",
};

const DATE1: ParamSpec = ParamSpec {
    name: "date1",
    kind: ParamKind::Date,
    required: false,
    default: None,
    description: "Start date, YYYY-MM-DD (default: last 7 days)",
};

const DATE2: ParamSpec = ParamSpec {
    name: "date2",
    kind: ParamKind::Date,
    required: false,
    default: None,
    description: "End date, YYYY-MM-DD (default: today)",
};

const METRICS: ParamSpec = ParamSpec {
    name: "metrics",
    kind: ParamKind::StringArray,
    required: true,
    default: None,
    description: "Metrics to request, 1-20 entries (e.g. ym:s:visits)",
};

const DIMENSIONS: ParamSpec = ParamSpec {
    name: "dimensions",
    kind: ParamKind::StringArray,
    required: false,
    default: Some("[]"),
    description: "Dimensions to group by, up to 10 entries",
};

const FILTERS: ParamSpec = ParamSpec {
    name: "filters",
    kind: ParamKind::String,
    required: false,
    default: None,
    description: "Filter expression, e.g. ym:s:trafficSource=='organic'",
};

const COUNTER_ONLY: &[ParamSpec] = &[COUNTER_ID];
const DATE_RANGE: &[ParamSpec] = &[COUNTER_ID, DATE1, DATE2];

/// Every registered operation.
pub static OPERATIONS: &[OperationSpec] = &[
    OperationSpec {
        name: "get_account_info",
        title: "Account info",
        description: "Counter settings, name, site and status",
        params: COUNTER_ONLY,
        parse: |v| Ok(ReportRequest::AccountInfo(from_input(v)?)),
    },
    OperationSpec {
        name: "get_visits",
        title: "Visits",
        description: "Total visits for the counter",
        params: DATE_RANGE,
        parse: |v| Ok(ReportRequest::Visits(from_input(v)?)),
    },
    OperationSpec {
        name: "get_sources_summary",
        title: "Traffic sources summary",
        description: "Visits and engagement by traffic source",
        params: DATE_RANGE,
        parse: |v| Ok(ReportRequest::SourcesSummary(from_input(v)?)),
    },
    OperationSpec {
        name: "get_sources_search_phrases",
        title: "Search phrases",
        description: "Search phrases that brought visitors",
        params: DATE_RANGE,
        parse: |v| Ok(ReportRequest::SourcesSearchPhrases(from_input(v)?)),
    },
    OperationSpec {
        name: "get_traffic_sources_types",
        title: "Traffic source types",
        description: "Visits and users by traffic source type",
        params: DATE_RANGE,
        parse: |v| Ok(ReportRequest::TrafficSourcesTypes(from_input(v)?)),
    },
    OperationSpec {
        name: "get_search_engines_data",
        title: "Search engines",
        description: "Organic, non-robot visits by search engine",
        params: DATE_RANGE,
        parse: |v| Ok(ReportRequest::SearchEngines(from_input(v)?)),
    },
    OperationSpec {
        name: "get_browsers_report",
        title: "Browsers",
        description: "Visits by browser",
        params: DATE_RANGE,
        parse: |v| Ok(ReportRequest::Browsers(from_input(v)?)),
    },
    OperationSpec {
        name: "get_page_depth_analysis",
        title: "Page depth",
        description: "Landing pages of visits deeper than a page-count threshold",
        params: &[
            COUNTER_ID,
            DATE1,
            DATE2,
            ParamSpec {
                name: "min_depth",
                kind: ParamKind::Integer,
                required: false,
                default: Some("2"),
                description: "Only count visits with more page views than this",
            },
        ],
        parse: |v| Ok(ReportRequest::PageDepth(from_input(v)?)),
    },
    OperationSpec {
        name: "get_goals_conversion",
        title: "Goal conversions",
        description: "Visits, users and goal reaches for the given goals",
        params: &[
            COUNTER_ID,
            ParamSpec {
                name: "goal_ids",
                kind: ParamKind::NumberArray,
                required: true,
                default: None,
                description: "Goal identifiers",
            },
            DATE1,
            DATE2,
        ],
        parse: |v| Ok(ReportRequest::GoalsConversion(from_input(v)?)),
    },
    OperationSpec {
        name: "get_user_demographics",
        title: "Demographics",
        description: "Visits and users by age interval and gender",
        params: DATE_RANGE,
        parse: |v| Ok(ReportRequest::UserDemographics(from_input(v)?)),
    },
    OperationSpec {
        name: "get_regional_data",
        title: "Regions",
        description: "Visits by country and city, optionally limited to named cities",
        params: &[
            COUNTER_ID,
            DATE1,
            DATE2,
            ParamSpec {
                name: "cities",
                kind: ParamKind::StringArray,
                required: false,
                default: None,
                description: "City names to restrict the report to",
            },
        ],
        parse: |v| Ok(ReportRequest::Regional(from_input(v)?)),
    },
    OperationSpec {
        name: "get_device_analysis",
        title: "Devices",
        description: "Visits by device category and operating system",
        params: DATE_RANGE,
        parse: |v| Ok(ReportRequest::DeviceAnalysis(from_input(v)?)),
    },
    OperationSpec {
        name: "get_mobile_vs_desktop",
        title: "Mobile vs desktop",
        description: "Engagement metrics by device category",
        params: DATE_RANGE,
        parse: |v| Ok(ReportRequest::MobileVsDesktop(from_input(v)?)),
    },
    OperationSpec {
        name: "get_new_users_by_source",
        title: "New users by source",
        description: "New users and visits by last traffic source",
        params: DATE_RANGE,
        parse: |v| Ok(ReportRequest::NewUsersBySource(from_input(v)?)),
    },
    OperationSpec {
        name: "get_page_performance",
        title: "Landing pages",
        description: "Visits, depth and duration by landing page",
        params: &[
            COUNTER_ID,
            DATE1,
            DATE2,
            ParamSpec {
                name: "include_bounce_rate",
                kind: ParamKind::Boolean,
                required: false,
                default: Some("false"),
                description: "Also report bounce rate",
            },
        ],
        parse: |v| Ok(ReportRequest::PagePerformance(from_input(v)?)),
    },
    OperationSpec {
        name: "get_content_analytics_sources",
        title: "Content analytics: sources",
        description: "Traffic sources of content views",
        params: DATE_RANGE,
        parse: |v| Ok(ReportRequest::ContentAnalytics(ContentReport::Sources, from_input(v)?)),
    },
    OperationSpec {
        name: "get_content_analytics_categories",
        title: "Content analytics: categories",
        description: "Content views by category",
        params: DATE_RANGE,
        parse: |v| {
            Ok(ReportRequest::ContentAnalytics(ContentReport::Categories, from_input(v)?))
        },
    },
    OperationSpec {
        name: "get_content_analytics_authors",
        title: "Content analytics: authors",
        description: "Content views by author",
        params: DATE_RANGE,
        parse: |v| Ok(ReportRequest::ContentAnalytics(ContentReport::Authors, from_input(v)?)),
    },
    OperationSpec {
        name: "get_content_analytics_topics",
        title: "Content analytics: topics",
        description: "Content views by topic",
        params: DATE_RANGE,
        parse: |v| Ok(ReportRequest::ContentAnalytics(ContentReport::Topics, from_input(v)?)),
    },
    OperationSpec {
        name: "get_content_analytics_articles",
        title: "Content analytics: articles",
        description: "Content views by article",
        params: DATE_RANGE,
        parse: |v| Ok(ReportRequest::ContentAnalytics(ContentReport::Articles, from_input(v)?)),
    },
    OperationSpec {
        name: "get_ecommerce_performance",
        title: "E-commerce",
        description: "Purchases and revenue by traffic source",
        params: &[
            COUNTER_ID,
            DATE1,
            DATE2,
            ParamSpec {
                name: "currency",
                kind: ParamKind::String,
                required: false,
                default: None,
                description: "ISO 4217 currency code for revenue, e.g. RUB",
            },
        ],
        parse: |v| Ok(ReportRequest::Ecommerce(from_input(v)?)),
    },
    OperationSpec {
        name: "get_report",
        title: "Custom report",
        description: "Arbitrary metrics and dimensions from the data surface",
        params: &[
            COUNTER_ID,
            METRICS,
            DIMENSIONS,
            FILTERS,
            ParamSpec {
                name: "sort",
                kind: ParamKind::String,
                required: false,
                default: None,
                description: "Sort expression, prefix with '-' for descending",
            },
            DATE1,
            DATE2,
            ParamSpec {
                name: "lang",
                kind: ParamKind::String,
                required: false,
                default: None,
                description: "Language for dimension labels",
            },
        ],
        parse: |v| Ok(ReportRequest::Report(from_input(v)?)),
    },
    OperationSpec {
        name: "get_data_by_time",
        title: "Time series",
        description: "Metrics grouped by time period, with attribution encoded into dimensions",
        params: &[
            COUNTER_ID,
            METRICS,
            DIMENSIONS,
            DATE1,
            DATE2,
            ParamSpec {
                name: "group",
                kind: ParamKind::Enum(GROUPS),
                required: false,
                default: Some("day"),
                description: "Time grouping",
            },
            ParamSpec {
                name: "attribution",
                kind: ParamKind::Enum(attribution::VALUES),
                required: false,
                default: None,
                description: "Attribution model applied to every dimension",
            },
            ParamSpec {
                name: "top_keys",
                kind: ParamKind::Integer,
                required: false,
                default: None,
                description: "Number of top dimension values, 1-30",
            },
            ParamSpec {
                name: "timezone",
                kind: ParamKind::String,
                required: false,
                default: None,
                description: "Timezone offset, e.g. +03:00",
            },
            FILTERS,
        ],
        parse: |v| Ok(ReportRequest::DataByTime(from_input(v)?)),
    },
];
