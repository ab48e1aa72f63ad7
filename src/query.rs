//! Query builder for the reporting API.
//!
//! Turns a typed [`ReportRequest`] into exactly one [`BuiltUrl`]. Nothing in
//! here touches the network; the same request always yields the same URL.

use crate::attribution::rewrite_dimensions;
use crate::error::{MetrikaError, Result};
use crate::params::{
    CounterParams, DateRangeParams, EcommerceParams, GoalsParams, PageDepthParams,
    PagePerformanceParams, RegionalParams, ReportParams, TimeSeriesParams,
};
use std::fmt;
use url::Url;

/// Default origin of the reporting API.
pub const DEFAULT_BASE_URL: &str = "https://api-metrika.yandex.net";

/// API surface a request is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    /// `management/v1/...`
    Management,
    /// `stat/v1/data`
    Data,
    /// `stat/v1/data/bytime`
    DataByTime,
}

impl Surface {
    fn segments(self) -> &'static [&'static str] {
        match self {
            Self::Management => &["management", "v1"],
            Self::Data => &["stat", "v1", "data"],
            Self::DataByTime => &["stat", "v1", "data", "bytime"],
        }
    }
}

/// A fully encoded request URL. Built once and reused across retries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuiltUrl(String);

impl BuiltUrl {
    /// The URL as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuiltUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A filter expression in the service's filter grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter(String);

impl Filter {
    /// Wrap a caller-supplied expression unchanged.
    pub fn raw(expr: impl Into<String>) -> Self {
        Self(expr.into())
    }

    /// `dimension=='value'`
    pub fn equals(dimension: &str, value: &str) -> Self {
        Self(format!("{dimension}=={}", quote(value)))
    }

    /// `dimension>value`
    pub fn greater_than(dimension: &str, value: u32) -> Self {
        Self(format!("{dimension}>{value}"))
    }

    /// `dimension IN ('a','b')`
    pub fn in_strings(dimension: &str, values: &[String]) -> Self {
        let list = values.iter().map(|v| quote(v)).collect::<Vec<_>>().join(",");
        Self(format!("{dimension} IN ({list})"))
    }

    /// `dimension IN (1,2)`
    pub fn in_numbers(dimension: &str, values: &[u64]) -> Self {
        let list = values
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        Self(format!("{dimension} IN ({list})"))
    }

    /// Join predicates with `AND`. Returns `None` for an empty set.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Option<Filter> {
        let parts: Vec<String> = filters.into_iter().map(|f| f.0).collect();
        if parts.is_empty() {
            None
        } else {
            Some(Self(parts.join(" AND ")))
        }
    }

    /// The rendered expression.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Content-analytics breakdowns, each backed by a server-side preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentReport {
    /// Traffic sources of content views.
    Sources,
    /// Content categories (rubrics).
    Categories,
    /// Content authors.
    Authors,
    /// Content topics.
    Topics,
    /// Individual articles.
    Articles,
}

impl ContentReport {
    fn preset(self) -> &'static str {
        match self {
            Self::Sources => "publishers_sources",
            Self::Categories => "publishers_rubrics",
            Self::Authors => "publishers_authors",
            Self::Topics => "publishers_thematics",
            Self::Articles => "publishers_materials",
        }
    }
}

/// A named report request with its typed parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportRequest {
    /// Counter settings and metadata.
    AccountInfo(CounterParams),
    /// Visit totals.
    Visits(DateRangeParams),
    /// Traffic source summary preset.
    SourcesSummary(DateRangeParams),
    /// Search phrase preset.
    SourcesSearchPhrases(DateRangeParams),
    /// Visits by traffic source type.
    TrafficSourcesTypes(DateRangeParams),
    /// Organic visits by search engine.
    SearchEngines(DateRangeParams),
    /// Browser breakdown.
    Browsers(DateRangeParams),
    /// Landing pages of visits deeper than a threshold.
    PageDepth(PageDepthParams),
    /// Conversions for a set of goals.
    GoalsConversion(GoalsParams),
    /// Age and gender breakdown.
    UserDemographics(DateRangeParams),
    /// Country and city breakdown.
    Regional(RegionalParams),
    /// Device category and OS breakdown.
    DeviceAnalysis(DateRangeParams),
    /// Engagement by device category.
    MobileVsDesktop(DateRangeParams),
    /// New users by traffic source.
    NewUsersBySource(DateRangeParams),
    /// Landing page performance.
    PagePerformance(PagePerformanceParams),
    /// Content-analytics preset.
    ContentAnalytics(ContentReport, DateRangeParams),
    /// E-commerce revenue by traffic source.
    Ecommerce(EcommerceParams),
    /// Free-form data report.
    Report(ReportParams),
    /// Time series with optional attribution.
    DataByTime(TimeSeriesParams),
}

/// Query parameters accumulated for one request, in emission order.
struct Query {
    surface: Surface,
    path: Vec<String>,
    pairs: Vec<(&'static str, String)>,
}

impl Query {
    fn new(surface: Surface) -> Self {
        Self {
            surface,
            path: Vec::new(),
            pairs: Vec::new(),
        }
    }

    fn data(counter_id: &str) -> Self {
        Self::new(Surface::Data).param("ids", counter_id)
    }

    fn param(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.pairs.push((key, value.into()));
        self
    }

    fn opt(self, key: &'static str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.param(key, v),
            None => self,
        }
    }

    fn list(self, key: &'static str, values: &[&str]) -> Self {
        self.param(key, values.join(","))
    }

    fn strings(self, key: &'static str, values: &[String]) -> Self {
        if values.is_empty() {
            self
        } else {
            self.param(key, values.join(","))
        }
    }

    fn filter(self, filter: Option<Filter>) -> Self {
        match filter {
            Some(f) => self.param("filters", f.0),
            None => self,
        }
    }

    fn dates(self, range: &DateRangeParams) -> Self {
        self.opt("date1", range.date1.as_deref())
            .opt("date2", range.date2.as_deref())
    }
}

const VISITS_USERS: &[&str] = &["ym:s:visits", "ym:s:users"];
const ENGAGEMENT: &[&str] = &[
    "ym:s:visits",
    "ym:s:users",
    "ym:s:bounceRate",
    "ym:s:pageDepth",
    "ym:s:avgVisitDurationSeconds",
];

/// Builds request URLs against a fixed API origin.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    base: Url,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self {
            base: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
        }
    }
}

impl QueryBuilder {
    /// Create a builder for the given API origin.
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| MetrikaError::InvalidConfig(format!("invalid base URL '{base_url}': {e}")))?;
        if base.cannot_be_a_base() {
            return Err(MetrikaError::InvalidConfig(format!(
                "base URL '{base_url}' cannot carry a path"
            )));
        }
        Ok(Self { base })
    }

    /// Validate `request` and build its URL.
    pub fn build(&self, request: &ReportRequest) -> Result<BuiltUrl> {
        let query = assemble(request)?;
        self.finish(query)
    }

    fn finish(&self, query: Query) -> Result<BuiltUrl> {
        let mut url = self.base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                MetrikaError::InvalidConfig("base URL cannot carry a path".to_string())
            })?;
            segments
                .pop_if_empty()
                .extend(query.surface.segments())
                .extend(&query.path);
        }

        if !query.pairs.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &query.pairs {
                pairs.append_pair(key, value);
            }
        }

        Ok(BuiltUrl(url.into()))
    }
}

fn assemble(request: &ReportRequest) -> Result<Query> {
    use ReportRequest as R;

    let query = match request {
        R::AccountInfo(p) => {
            p.validate()?;
            let mut q = Query::new(Surface::Management);
            q.path = vec!["counter".to_string(), p.counter_id.clone()];
            q
        }
        // Dates are validated but not forwarded for this report.
        R::Visits(p) => {
            p.validate()?;
            Query::data(&p.counter_id).param("metrics", "ym:s:visits")
        }
        R::SourcesSummary(p) => preset(p, "sources_summary")?,
        R::SourcesSearchPhrases(p) => preset(p, "sources_search_phrases")?,
        R::TrafficSourcesTypes(p) => {
            p.validate()?;
            Query::data(&p.counter_id)
                .param("dimensions", "ym:s:lastTrafficSource")
                .list("metrics", VISITS_USERS)
                .dates(p)
        }
        R::SearchEngines(p) => {
            p.validate()?;
            Query::data(&p.counter_id)
                .param("dimensions", "ym:s:lastSearchEngine")
                .list("metrics", &["ym:s:visits", "ym:s:users", "ym:s:bounceRate"])
                .filter(Filter::and([
                    Filter::equals("ym:s:lastTrafficSource", "organic"),
                    Filter::equals("ym:s:isRobot", "No"),
                ]))
                .dates(p)
        }
        R::Browsers(p) => preset(p, "tech_platforms")?.param("dimensions", "ym:s:browser"),
        R::PageDepth(p) => {
            p.validate()?;
            Query::data(&p.range.counter_id)
                .param("dimensions", "ym:s:startURL")
                .list(
                    "metrics",
                    &["ym:s:visits", "ym:s:pageDepth", "ym:s:avgVisitDurationSeconds"],
                )
                .filter(Some(Filter::greater_than("ym:s:pageViews", p.min_depth)))
                .dates(&p.range)
        }
        R::GoalsConversion(p) => {
            p.validate()?;
            Query::data(&p.range.counter_id)
                .param("dimensions", "ym:s:goalDimension")
                .list(
                    "metrics",
                    &["ym:s:visits", "ym:s:users", "ym:s:sumGoalReachesAny"],
                )
                .filter(Some(Filter::in_numbers("ym:s:goal", &p.goal_ids)))
                .dates(&p.range)
        }
        R::UserDemographics(p) => {
            p.validate()?;
            Query::data(&p.counter_id)
                .list("dimensions", &["ym:s:ageInterval", "ym:s:gender"])
                .list("metrics", &["ym:s:visits", "ym:s:users", "ym:s:bounceRate"])
                .dates(p)
        }
        R::Regional(p) => {
            p.validate()?;
            let cities = p
                .cities
                .as_deref()
                .map(|c| Filter::in_strings("ym:s:regionCityName", c));
            Query::data(&p.range.counter_id)
                .list("dimensions", &["ym:s:regionCountry", "ym:s:regionCity"])
                .list("metrics", VISITS_USERS)
                .filter(cities)
                .dates(&p.range)
        }
        R::DeviceAnalysis(p) => {
            p.validate()?;
            Query::data(&p.counter_id)
                .list(
                    "dimensions",
                    &["ym:s:deviceCategory", "ym:s:operatingSystemRoot"],
                )
                .list("metrics", VISITS_USERS)
                .dates(p)
        }
        R::MobileVsDesktop(p) => {
            p.validate()?;
            Query::data(&p.counter_id)
                .param("dimensions", "ym:s:deviceCategory")
                .list("metrics", ENGAGEMENT)
                .dates(p)
        }
        R::NewUsersBySource(p) => {
            p.validate()?;
            Query::data(&p.counter_id)
                .param("dimensions", "ym:s:lastTrafficSource")
                .list("metrics", &["ym:s:newUsers", "ym:s:visits"])
                .param("sort", "-ym:s:newUsers")
                .dates(p)
        }
        R::PagePerformance(p) => {
            p.validate()?;
            let mut metrics = vec!["ym:s:visits", "ym:s:pageDepth", "ym:s:avgVisitDurationSeconds"];
            if p.include_bounce_rate {
                metrics.push("ym:s:bounceRate");
            }
            Query::data(&p.range.counter_id)
                .param("dimensions", "ym:s:startURL")
                .list("metrics", &metrics)
                .param("sort", "-ym:s:visits")
                .dates(&p.range)
        }
        R::ContentAnalytics(report, p) => preset(p, report.preset())?,
        R::Ecommerce(p) => {
            p.validate()?;
            Query::data(&p.range.counter_id)
                .param("dimensions", "ym:s:lastTrafficSource")
                .list(
                    "metrics",
                    &[
                        "ym:s:ecommercePurchases",
                        "ym:s:ecommerceRevenue",
                        "ym:s:ecommerceRevenuePerPurchase",
                    ],
                )
                .dates(&p.range)
                .opt("currency", p.currency.as_deref())
        }
        R::Report(p) => {
            p.validate()?;
            Query::data(&p.range.counter_id)
                .strings("metrics", &p.metrics)
                .strings("dimensions", &p.dimensions)
                .filter(p.filters.as_deref().map(Filter::raw))
                .opt("sort", p.sort.as_deref())
                .dates(&p.range)
                .opt("lang", p.lang.as_deref())
        }
        R::DataByTime(p) => {
            let attribution = p.validate()?;
            let dimensions = match attribution {
                Some(model) => rewrite_dimensions(&p.dimensions, model),
                None => p.dimensions.clone(),
            };
            let top_keys = p.top_keys.map(|k| k.to_string());
            Query::new(Surface::DataByTime)
                .param("id", p.range.counter_id.as_str())
                .strings("metrics", &p.metrics)
                .strings("dimensions", &dimensions)
                .dates(&p.range)
                .param("group", p.group.as_str())
                .opt("top_keys", top_keys.as_deref())
                .opt("timezone", p.timezone.as_deref())
                .filter(p.filters.as_deref().map(Filter::raw))
        }
    };

    Ok(query)
}

fn preset(p: &DateRangeParams, name: &str) -> Result<Query> {
    p.validate()?;
    Ok(Query::data(&p.counter_id).param("preset", name).dates(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn params_of(url: &BuiltUrl) -> HashMap<String, String> {
        Url::parse(url.as_str())
            .unwrap()
            .query_pairs()
            .into_owned()
            .collect()
    }

    fn path_of(url: &BuiltUrl) -> String {
        Url::parse(url.as_str()).unwrap().path().to_string()
    }

    fn series(dimensions: &[&str], attribution: Option<&str>) -> ReportRequest {
        ReportRequest::DataByTime(TimeSeriesParams {
            range: DateRangeParams::new("42"),
            metrics: vec!["ym:s:visits".to_string()],
            dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
            group: "week".to_string(),
            attribution: attribution.map(str::to_string),
            top_keys: Some(5),
            timezone: None,
            filters: None,
        })
    }

    #[test]
    fn test_account_info_targets_management() {
        let url = QueryBuilder::default()
            .build(&ReportRequest::AccountInfo(CounterParams {
                counter_id: "44147844".to_string(),
            }))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api-metrika.yandex.net/management/v1/counter/44147844"
        );
    }

    #[test]
    fn test_dates_only_when_supplied() {
        let builder = QueryBuilder::default();

        let without = builder
            .build(&ReportRequest::SourcesSummary(DateRangeParams::new("42")))
            .unwrap();
        let params = params_of(&without);
        assert_eq!(params["preset"], "sources_summary");
        assert!(!params.contains_key("date1"));
        assert!(!params.contains_key("date2"));

        let with = builder
            .build(&ReportRequest::SourcesSummary(
                DateRangeParams::new("42").between("2024-01-01", "2024-01-31"),
            ))
            .unwrap();
        let params = params_of(&with);
        assert_eq!(params["date1"], "2024-01-01");
        assert_eq!(params["date2"], "2024-01-31");
        assert_eq!(path_of(&with), "/stat/v1/data");
    }

    #[test]
    fn test_visits_validates_but_drops_dates() {
        let builder = QueryBuilder::default();
        let url = builder
            .build(&ReportRequest::Visits(
                DateRangeParams::new("42").between("2024-01-01", "2024-01-31"),
            ))
            .unwrap();
        let params = params_of(&url);
        assert_eq!(params["metrics"], "ym:s:visits");
        assert!(!params.contains_key("date1"));

        let bad = builder.build(&ReportRequest::Visits(
            DateRangeParams::new("42").between("2024-02-30", "2024-03-01"),
        ));
        assert!(matches!(bad, Err(MetrikaError::InvalidParameter(_))));
    }

    #[test]
    fn test_filter_rendering() {
        assert_eq!(
            Filter::in_strings("ym:s:regionCityName", &["Moscow".to_string(), "O'Hare".to_string()])
                .as_str(),
            "ym:s:regionCityName IN ('Moscow','O\\'Hare')"
        );
        assert_eq!(
            Filter::in_numbers("ym:s:goal", &[1, 22]).as_str(),
            "ym:s:goal IN (1,22)"
        );
        assert_eq!(
            Filter::and([Filter::raw("a"), Filter::raw("b")])
                .unwrap()
                .as_str(),
            "a AND b"
        );
        assert!(Filter::and(Vec::new()).is_none());
    }

    #[test]
    fn test_filters_encoded_as_one_value() {
        let url = QueryBuilder::default()
            .build(&ReportRequest::SearchEngines(DateRangeParams::new("42")))
            .unwrap();
        assert!(url.as_str().contains("filters=ym%3As%3AlastTrafficSource%3D%3D%27organic%27+AND+"));
        assert_eq!(
            params_of(&url)["filters"],
            "ym:s:lastTrafficSource=='organic' AND ym:s:isRobot=='No'"
        );
    }

    #[test]
    fn test_regional_city_list() {
        let url = QueryBuilder::default()
            .build(&ReportRequest::Regional(RegionalParams {
                range: DateRangeParams::new("42"),
                cities: Some(vec!["Moscow".into(), "Kazan".into()]),
            }))
            .unwrap();
        assert_eq!(
            params_of(&url)["filters"],
            "ym:s:regionCityName IN ('Moscow','Kazan')"
        );
    }

    #[test]
    fn test_goals_filter_on_goal_ids() {
        let url = QueryBuilder::default()
            .build(&ReportRequest::GoalsConversion(GoalsParams {
                range: DateRangeParams::new("42"),
                goal_ids: vec![5, 6],
            }))
            .unwrap();
        let params = params_of(&url);
        assert_eq!(params["filters"], "ym:s:goal IN (5,6)");
        assert_eq!(params["dimensions"], "ym:s:goalDimension");
    }

    #[test]
    fn test_ecommerce_currency_only_when_supplied() {
        let builder = QueryBuilder::default();

        let without = builder
            .build(&ReportRequest::Ecommerce(EcommerceParams {
                range: DateRangeParams::new("42"),
                currency: None,
            }))
            .unwrap();
        let params = params_of(&without);
        assert_eq!(params["dimensions"], "ym:s:lastTrafficSource");
        assert!(!params.contains_key("currency"));

        let with = builder
            .build(&ReportRequest::Ecommerce(EcommerceParams {
                range: DateRangeParams::new("42").between("2024-01-01", "2024-01-31"),
                currency: Some("RUB".to_string()),
            }))
            .unwrap();
        let params = params_of(&with);
        assert_eq!(params["currency"], "RUB");
        assert_eq!(params["date2"], "2024-01-31");
    }

    #[test]
    fn test_time_series_rewrites_dimensions() {
        let url = QueryBuilder::default()
            .build(&series(
                &["ym:s:UTMCampaign", "ym:s:automaticTrafficSource"],
                Some("first"),
            ))
            .unwrap();
        let params = params_of(&url);

        assert_eq!(path_of(&url), "/stat/v1/data/bytime");
        assert_eq!(params["id"], "42");
        assert_eq!(
            params["dimensions"],
            "ym:s:firstUTMCampaign,ym:s:firstTrafficSource"
        );
        assert_eq!(params["group"], "week");
        assert_eq!(params["top_keys"], "5");
        assert!(!params.contains_key("attribution"));
        assert!(!url.as_str().contains("attribution"));
    }

    #[test]
    fn test_time_series_without_attribution_keeps_dimensions() {
        let url = QueryBuilder::default()
            .build(&series(&["ym:s:lastTrafficSource"], None))
            .unwrap();
        assert_eq!(params_of(&url)["dimensions"], "ym:s:lastTrafficSource");
    }

    #[test]
    fn test_bogus_attribution_fails_before_build() {
        let err = QueryBuilder::default()
            .build(&series(&["ym:s:UTMCampaign"], Some("bogus")))
            .unwrap_err();
        assert!(err.to_string().contains("automatic"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = QueryBuilder::default();
        let request = series(&["ym:s:UTMSource"], Some("lastsign"));
        assert_eq!(builder.build(&request).unwrap(), builder.build(&request).unwrap());
    }

    #[test]
    fn test_custom_base_with_path() {
        let builder = QueryBuilder::new("http://127.0.0.1:9000/proxy/").unwrap();
        let url = builder
            .build(&ReportRequest::Browsers(DateRangeParams::new("7")))
            .unwrap();
        assert_eq!(path_of(&url), "/proxy/stat/v1/data");
        assert_eq!(params_of(&url)["dimensions"], "ym:s:browser");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(QueryBuilder::new("not a url").is_err());
        assert!(QueryBuilder::new("mailto:someone@example.com").is_err());
    }
}
