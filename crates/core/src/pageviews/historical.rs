//! Historical pageview series from Wikishark
//!
//! Covers January 2008 through August 2015, before the Wikimedia REST
//! API starts. Wikishark exposes no API, so the numeric page id is
//! scraped out of the article page's HTML and fed to the CSV export
//! endpoint. Brittle by nature; a site redesign breaks the scrape.

use crate::config::WikisharkConfig;
use crate::dates::resolve_range;
use crate::errors::{Result, WikinowError};
use crate::metrics;
use crate::pageviews::PageviewSeries;
use crate::{normalize_title, validate_lang};
use chrono::NaiveDate;
use regex_lite::Regex;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

/// Time unit of the Wikishark export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryGranularity {
    Hourly,
    #[default]
    Daily,
    Monthly,
}

impl HistoryGranularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryGranularity::Hourly => "hourly",
            HistoryGranularity::Daily => "daily",
            HistoryGranularity::Monthly => "monthly",
        }
    }

    /// Numeric `view` code of the export endpoint
    fn view_code(&self) -> u8 {
        match self {
            HistoryGranularity::Hourly => 1,
            HistoryGranularity::Daily => 2,
            HistoryGranularity::Monthly => 3,
        }
    }
}

impl fmt::Display for HistoryGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryGranularity {
    type Err = WikinowError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "hourly" => Ok(HistoryGranularity::Hourly),
            "daily" => Ok(HistoryGranularity::Daily),
            "monthly" => Ok(HistoryGranularity::Monthly),
            other => Err(WikinowError::invalid_argument(format!(
                "unknown interval '{}', expected hourly, daily or monthly",
                other
            ))),
        }
    }
}

/// Parameters of one historical fetch
#[derive(Debug, Clone, Validate)]
pub struct HistoryQuery {
    #[validate(length(min = 1, message = "a valid title should be specified"))]
    pub title: String,

    #[validate(length(min = 1, message = "a valid language should be specified"))]
    pub lang: String,

    pub granularity: HistoryGranularity,

    pub first: Option<String>,
    pub last: Option<String>,
}

impl HistoryQuery {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            lang: "en".to_string(),
            granularity: HistoryGranularity::default(),
            first: None,
            last: None,
        }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn with_range(mut self, first: Option<String>, last: Option<String>) -> Self {
        self.first = first;
        self.last = last;
        self
    }
}

/// Client for the Wikishark scrape + CSV export
pub struct WikisharkClient {
    client: reqwest::Client,
    api_base: String,
}

impl WikisharkClient {
    pub fn new(config: &WikisharkConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
        })
    }

    /// Fetch the historical pageview series for one article
    pub async fn article_views(&self, query: &HistoryQuery) -> Result<PageviewSeries> {
        query.validate()?;
        validate_lang(&query.lang)?;
        let (first, last) = resolve_range(query.first.as_deref(), query.last.as_deref())?;

        tracing::info!(title = %query.title, lang = %query.lang, "Fetching historical pageview series");
        let timer = metrics::FetchTimer::start();

        let page_id = self.scrape_page_id(query).await?;

        let url = format!("{}/json_print.php", self.api_base);
        let first = first.format("%m/%d/%Y").to_string();
        let last = last.format("%m/%d/%Y").to_string();
        let view = query.granularity.view_code().to_string();
        let params = [
            ("values", page_id.as_str()),
            ("datefrom", first.as_str()),
            ("dateto", last.as_str()),
            ("view", view.as_str()),
            ("normalized", "0"),
            ("scale", "0"),
            ("peak", "0"),
            ("log", "0"),
            ("zerofix", "0"),
            ("sumall", "0"),
            ("format", "csv"),
        ];

        let response = self.client.get(&url).query(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            metrics::record_pageview_fetch(timer.elapsed_secs(), "wikishark", false);
            return Err(WikinowError::Upstream {
                service: "wikishark".into(),
                status: status.as_u16(),
                message: "CSV export request failed".into(),
            });
        }

        let body = response.text().await?;
        let series = decode_csv(&body)?;
        metrics::record_pageview_fetch(timer.elapsed_secs(), "wikishark", true);

        Ok(series)
    }

    /// Extract the numeric page id from the article page's HTML
    async fn scrape_page_id(&self, query: &HistoryQuery) -> Result<String> {
        let url = format!(
            "{}/title/{}/{}",
            self.api_base,
            query.lang,
            urlencoding::encode(&normalize_title(&query.title)),
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(WikinowError::Upstream {
                service: "wikishark".into(),
                status: status.as_u16(),
                message: format!("page lookup for '{}' failed", query.title),
            });
        }

        let html = response.text().await?;
        extract_page_id(&html)
    }
}

/// Find the `/translate/id/<digits>` marker in the page source
fn extract_page_id(html: &str) -> Result<String> {
    let pattern = Regex::new(r"/translate/id/(\d+)").expect("static pattern");

    pattern
        .captures(html)
        .map(|captures| captures[1].to_string())
        .ok_or_else(|| WikinowError::payload("wikishark", "no page id found in page source"))
}

/// Decode the `MM/DD/YYYY,views` CSV export into a series
fn decode_csv(body: &str) -> Result<PageviewSeries> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(false)
        .from_reader(body.as_bytes());

    let mut dates = Vec::new();
    let mut views = Vec::new();

    for record in reader.records() {
        let record = record?;
        let date_field = record.get(0).unwrap_or_default();
        let views_field = record.get(1).ok_or_else(|| {
            WikinowError::payload("wikishark", format!("CSV row '{}' has no views column", date_field))
        })?;

        let date = NaiveDate::parse_from_str(date_field, "%m/%d/%Y").map_err(|_| {
            WikinowError::payload("wikishark", format!("malformed CSV date '{}'", date_field))
        })?;
        let count: u64 = views_field.trim().parse().map_err(|_| {
            WikinowError::payload("wikishark", format!("malformed view count '{}'", views_field))
        })?;

        dates.push(date);
        views.push(count);
    }

    Ok(PageviewSeries { dates, views })
}
