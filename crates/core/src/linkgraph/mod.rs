//! Link-graph access over the MediaWiki query API
//!
//! Exposes the paginated backlink / forward-link queries behind the
//! [`LinkGraph`] capability so the resolver can be exercised against an
//! in-memory graph in tests. Pagination is driven by [`LinkPager`], a
//! restartable cursor that yields one batch of titles per call and
//! terminates when the API stops returning a continuation token.

use crate::config::LinkGraphConfig;
use crate::errors::{Result, WikinowError};
use crate::metrics;
use crate::normalize_title;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Traversal direction in the link graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkDirection {
    /// Pages linking to the article (incoming edges)
    Backlinks,
    /// Pages the article links to (outgoing edges)
    Forward,
}

impl LinkDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkDirection::Backlinks => "backlinks",
            LinkDirection::Forward => "forward",
        }
    }
}

/// One page of link titles plus the continuation token, if any
#[derive(Debug, Clone, Default)]
pub struct LinkPage {
    pub titles: Vec<String>,
    pub next: Option<String>,
}

/// Capability for fetching one page of the link graph at a time
#[async_trait]
pub trait LinkGraph: Send + Sync {
    async fn fetch_page(
        &self,
        lang: &str,
        title: &str,
        direction: LinkDirection,
        cursor: Option<&str>,
    ) -> Result<LinkPage>;
}

/// MediaWiki implementation of the link-graph capability
pub struct MediaWikiLinkGraph {
    client: reqwest::Client,
    api_base: String,
}

impl MediaWikiLinkGraph {
    pub fn new(config: &LinkGraphConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
        })
    }

    fn endpoint(&self, lang: &str) -> String {
        self.api_base.replace("{lang}", lang)
    }
}

#[async_trait]
impl LinkGraph for MediaWikiLinkGraph {
    async fn fetch_page(
        &self,
        lang: &str,
        title: &str,
        direction: LinkDirection,
        cursor: Option<&str>,
    ) -> Result<LinkPage> {
        let url = self.endpoint(lang);
        let article = normalize_title(title);

        let mut params: Vec<(&str, &str)> = vec![("action", "query"), ("format", "json")];
        match direction {
            LinkDirection::Backlinks => {
                params.push(("list", "backlinks"));
                params.push(("bltitle", article.as_str()));
                if let Some(token) = cursor {
                    params.push(("blcontinue", token));
                }
            }
            LinkDirection::Forward => {
                params.push(("prop", "links"));
                params.push(("titles", article.as_str()));
                if let Some(token) = cursor {
                    params.push(("plcontinue", token));
                }
            }
        }

        let timer = metrics::FetchTimer::start();
        let response = self.client.get(&url).query(&params).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WikinowError::Upstream {
                service: "wikipedia".into(),
                status: status.as_u16(),
                message: format!("link-graph query for '{}' failed", title),
            });
        }

        let body = response.text().await?;
        let page = decode_page(direction, &body)?;

        tracing::debug!(
            article = %title,
            direction = direction.as_str(),
            titles = page.titles.len(),
            has_more = page.next.is_some(),
            "Fetched link-graph page"
        );
        metrics::record_linkgraph_fetch(timer.elapsed_secs(), direction.as_str(), page.titles.len());

        Ok(page)
    }
}

#[derive(Deserialize)]
struct ApiResponse {
    query: Option<QueryBody>,
    #[serde(rename = "continue")]
    continuation: Option<Continuation>,
}

#[derive(Deserialize)]
struct Continuation {
    blcontinue: Option<String>,
    plcontinue: Option<String>,
}

#[derive(Deserialize)]
struct QueryBody {
    backlinks: Option<Vec<TitleEntry>>,
    pages: Option<HashMap<String, PageEntry>>,
}

#[derive(Deserialize)]
struct TitleEntry {
    title: String,
}

#[derive(Deserialize)]
struct PageEntry {
    links: Option<Vec<TitleEntry>>,
}

/// Decode one MediaWiki response body into a link page
fn decode_page(direction: LinkDirection, body: &str) -> Result<LinkPage> {
    let response: ApiResponse = serde_json::from_str(body)?;

    let query = response
        .query
        .ok_or_else(|| WikinowError::payload("wikipedia", "response carries no 'query' object"))?;

    let titles = match direction {
        LinkDirection::Backlinks => query
            .backlinks
            .unwrap_or_default()
            .into_iter()
            .map(|entry| entry.title)
            .collect(),
        LinkDirection::Forward => {
            let pages = query.pages.ok_or_else(|| {
                WikinowError::payload("wikipedia", "links response carries no 'pages' map")
            })?;
            // The titles query addresses a single article, so the map
            // holds at most one page entry.
            pages
                .into_values()
                .next()
                .and_then(|page| page.links)
                .unwrap_or_default()
                .into_iter()
                .map(|entry| entry.title)
                .collect()
        }
    };

    let next = response.continuation.and_then(|token| match direction {
        LinkDirection::Backlinks => token.blcontinue,
        LinkDirection::Forward => token.plcontinue,
    });

    Ok(LinkPage { titles, next })
}

/// Restartable cursor over all pages of one article's links in one direction
///
/// Non-content titles (those with a namespace colon such as "Talk:" or
/// "Category:") are dropped from every batch.
pub struct LinkPager<'a> {
    graph: &'a dyn LinkGraph,
    lang: &'a str,
    title: &'a str,
    direction: LinkDirection,
    cursor: Option<String>,
    done: bool,
}

impl<'a> LinkPager<'a> {
    pub fn new(graph: &'a dyn LinkGraph, lang: &'a str, title: &'a str, direction: LinkDirection) -> Self {
        Self {
            graph,
            lang,
            title,
            direction,
            cursor: None,
            done: false,
        }
    }

    /// Fetch the next batch of content titles, or None once exhausted
    pub async fn next_batch(&mut self) -> Result<Option<Vec<String>>> {
        if self.done {
            return Ok(None);
        }

        let page = self
            .graph
            .fetch_page(self.lang, self.title, self.direction, self.cursor.as_deref())
            .await?;

        match page.next {
            Some(token) => self.cursor = Some(token),
            None => self.done = true,
        }

        let titles = page
            .titles
            .into_iter()
            .filter(|title| !title.contains(':'))
            .collect();

        Ok(Some(titles))
    }

    /// Whether a continuation token is pending
    pub fn has_more(&self) -> bool {
        !self.done
    }
}
