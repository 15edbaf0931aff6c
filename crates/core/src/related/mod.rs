//! Related-topic discovery over the Wikipedia link graph
//!
//! Given a focal article and optional companion articles, the resolver
//! harvests each article's backlinks and forward links (one hop), merges
//! them under the configured selection policy, and returns a ranked list
//! of related titles with weights. Companions sharpen the signal: links
//! a companion echoes are evidence of topical relevance, links only a
//! companion carries are weak evidence.

mod policy;

use crate::config::WikinowConfig;
use crate::errors::{Result, WikinowError};
use crate::linkgraph::{LinkDirection, LinkGraph, LinkPager, MediaWikiLinkGraph};
use crate::metrics;
use crate::pacing::{create_pacer, Pacer};
use crate::validate_lang;
use policy::LinkBags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

/// How focal and companion link bags are merged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMethod {
    /// Keep only focal links echoed by a companion
    Restrict,
    /// Keep the union of focal and companion links
    Extend,
    /// Rank every link by how often companions echo it
    Weight,
}

impl SelectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionMethod::Restrict => "restrict",
            SelectionMethod::Extend => "extend",
            SelectionMethod::Weight => "weight",
        }
    }
}

impl fmt::Display for SelectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectionMethod {
    type Err = WikinowError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "restrict" => Ok(SelectionMethod::Restrict),
            "extend" => Ok(SelectionMethod::Extend),
            "weight" => Ok(SelectionMethod::Weight),
            other => Err(WikinowError::invalid_argument(format!(
                "unknown method '{}', expected restrict, extend or weight",
                other
            ))),
        }
    }
}

/// Parameters of one resolution
#[derive(Debug, Clone, Validate)]
pub struct RelatedQuery {
    #[validate(length(min = 1, message = "a valid title should be specified"))]
    pub title: String,

    #[validate(length(min = 1, message = "a valid language should be specified"))]
    pub lang: String,

    /// Traversal depth; only one hop is supported
    pub level: u8,

    /// Companion articles expected to share links with the focal one
    pub related: Vec<String>,

    pub method: SelectionMethod,
}

impl RelatedQuery {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            lang: "en".to_string(),
            level: 1,
            related: Vec::new(),
            method: SelectionMethod::Restrict,
        }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    pub fn with_related(mut self, related: Vec<String>) -> Self {
        self.related = related;
        self
    }

    pub fn with_method(mut self, method: SelectionMethod) -> Self {
        self.method = method;
        self
    }

    /// Fail-fast validation, before any network access
    fn ensure_valid(&self) -> Result<()> {
        self.validate()?;
        validate_lang(&self.lang)?;

        if self.level != 1 {
            return Err(WikinowError::invalid_argument(
                "only one-hop traversal is supported",
            ));
        }

        if self.related.iter().any(|companion| companion.is_empty()) {
            return Err(WikinowError::invalid_argument(
                "companion titles must be non-empty",
            ));
        }

        Ok(())
    }
}

/// Ranked related titles and their weights, as parallel sequences
///
/// Control-set titles (queried articles that answered) come first, each
/// at the maximum weight present in the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedTopics {
    pub titles: Vec<String>,
    pub weights: Vec<f64>,
}

impl RelatedTopics {
    /// Iterate titles paired with their weights
    pub fn pairs(&self) -> impl Iterator<Item = (&str, f64)> {
        self.titles
            .iter()
            .map(String::as_str)
            .zip(self.weights.iter().copied())
    }
}

/// Resolver over an injected link graph and pacing policy
pub struct RelatedResolver {
    graph: Arc<dyn LinkGraph>,
    pacer: Arc<dyn Pacer>,
}

impl RelatedResolver {
    pub fn new(graph: Arc<dyn LinkGraph>, pacer: Arc<dyn Pacer>) -> Self {
        Self { graph, pacer }
    }

    /// Build a resolver against the public Wikipedia API
    pub fn from_config(config: &WikinowConfig) -> Result<Self> {
        let graph = MediaWikiLinkGraph::new(&config.linkgraph)?;
        Ok(Self::new(Arc::new(graph), create_pacer(&config.rate_limit)))
    }

    /// Resolve related topics for the query's focal article
    #[instrument(skip(self, query), fields(title = %query.title, lang = %query.lang, method = %query.method))]
    pub async fn resolve(&self, query: &RelatedQuery) -> Result<RelatedTopics> {
        query.ensure_valid()?;

        let mut bags = LinkBags::default();
        let mut control: Vec<String> = Vec::new();

        let articles = std::iter::once(query.title.as_str())
            .chain(query.related.iter().map(String::as_str));

        for (index, article) in articles.enumerate() {
            let is_focal = index == 0;
            info!(article, "Harvesting links");

            let backlinks = self
                .harvest(&query.lang, article, LinkDirection::Backlinks)
                .await?;
            let forward = self
                .harvest(&query.lang, article, LinkDirection::Forward)
                .await?;

            let answered = !backlinks.is_empty() || !forward.is_empty();

            bags.push(true, is_focal, backlinks);
            bags.push(false, is_focal, forward);

            if answered {
                control.push(article.to_string());
            }

            // Courtesy pause before the next article
            self.pacer.pace().await;
        }

        let selection = if query.related.is_empty() {
            // Without companions there is nothing to cross-check against
            control.clear();
            policy::solo(&bags)
        } else {
            policy::select(query.method, &bags)
        };

        let mut titles = control;
        let mut weights = vec![selection.control_weight; titles.len()];
        titles.extend(selection.titles);
        weights.extend(selection.weights);

        metrics::record_resolution(query.method.as_str(), titles.len());
        info!(results = titles.len(), "Resolution complete");

        Ok(RelatedTopics { titles, weights })
    }

    /// Drain every page of one article's links in one direction
    async fn harvest(
        &self,
        lang: &str,
        title: &str,
        direction: LinkDirection,
    ) -> Result<Vec<String>> {
        let mut pager = LinkPager::new(self.graph.as_ref(), lang, title, direction);
        let mut links = Vec::new();

        while let Some(batch) = pager.next_batch().await? {
            links.extend(batch);
            if pager.has_more() {
                // Courtesy pause between successive page fetches
                self.pacer.pace().await;
            }
        }

        Ok(links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linkgraph::LinkPage;
    use crate::pacing::NoopPacer;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory link graph serving pre-baked pages per article
    struct FakeLinkGraph {
        pages: HashMap<(String, LinkDirection), Vec<Vec<String>>>,
        calls: AtomicUsize,
    }

    impl FakeLinkGraph {
        fn new() -> Self {
            Self {
                pages: HashMap::new(),
                calls: AtomicUsize::new(0),
            }
        }

        fn with_links(mut self, title: &str, direction: LinkDirection, pages: &[&[&str]]) -> Self {
            let pages = pages
                .iter()
                .map(|page| page.iter().map(|s| s.to_string()).collect())
                .collect();
            self.pages.insert((title.to_string(), direction), pages);
            self
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LinkGraph for FakeLinkGraph {
        async fn fetch_page(
            &self,
            _lang: &str,
            title: &str,
            direction: LinkDirection,
            cursor: Option<&str>,
        ) -> Result<LinkPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            let pages = self.pages.get(&(title.to_string(), direction));
            let index: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);

            match pages {
                None => Ok(LinkPage::default()),
                Some(pages) => {
                    let next = if index + 1 < pages.len() {
                        Some((index + 1).to_string())
                    } else {
                        None
                    };
                    Ok(LinkPage {
                        titles: pages[index].clone(),
                        next,
                    })
                }
            }
        }
    }

    /// Pacer counting how often it was consulted
    struct CountingPacer {
        count: AtomicUsize,
    }

    impl CountingPacer {
        fn new() -> Self {
            Self {
                count: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Pacer for CountingPacer {
        async fn pace(&self) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn resolver(graph: FakeLinkGraph) -> (RelatedResolver, Arc<FakeLinkGraph>) {
        let graph = Arc::new(graph);
        let resolver = RelatedResolver::new(graph.clone(), Arc::new(NoopPacer));
        (resolver, graph)
    }

    #[tokio::test]
    async fn test_solo_resolution_concatenates_directions() {
        let graph = FakeLinkGraph::new()
            .with_links("A", LinkDirection::Backlinks, &[&["X", "Y"]])
            .with_links("A", LinkDirection::Forward, &[&["Y"]]);
        let (resolver, _) = resolver(graph);

        let topics = resolver.resolve(&RelatedQuery::new("A")).await.unwrap();

        assert_eq!(topics.titles, vec!["X", "Y", "Y"]);
        assert_eq!(topics.weights, vec![1.0, 1.0, 1.0]);
    }

    #[tokio::test]
    async fn test_empty_title_fails_without_network() {
        let (resolver, graph) = resolver(FakeLinkGraph::new());
        let query = RelatedQuery::new("");

        let err = resolver.resolve(&query).await.unwrap_err();

        assert!(err.is_invalid_argument());
        assert_eq!(graph.call_count(), 0);
    }

    #[tokio::test]
    async fn test_multi_hop_level_rejected() {
        let (resolver, graph) = resolver(FakeLinkGraph::new());
        let mut query = RelatedQuery::new("A");
        query.level = 2;

        let err = resolver.resolve(&query).await.unwrap_err();

        assert!(err.is_invalid_argument());
        assert_eq!(graph.call_count(), 0);
    }

    #[tokio::test]
    async fn test_hostile_lang_rejected() {
        let (resolver, graph) = resolver(FakeLinkGraph::new());
        let query = RelatedQuery::new("A").with_lang("en/../evil");

        let err = resolver.resolve(&query).await.unwrap_err();

        assert!(err.is_invalid_argument());
        assert_eq!(graph.call_count(), 0);
    }

    #[test]
    fn test_bogus_method_string_rejected() {
        let err = "bogus".parse::<SelectionMethod>().unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[tokio::test]
    async fn test_pacer_consulted_between_pages_and_articles() {
        let graph = FakeLinkGraph::new()
            .with_links(
                "A",
                LinkDirection::Backlinks,
                &[&["P1"], &["P2"], &["P3"]],
            )
            .with_links("A", LinkDirection::Forward, &[&["F1"]]);
        let graph = Arc::new(graph);
        let pacer = Arc::new(CountingPacer::new());
        let resolver = RelatedResolver::new(graph.clone(), pacer.clone());

        let topics = resolver.resolve(&RelatedQuery::new("A")).await.unwrap();

        assert_eq!(topics.titles, vec!["P1", "P2", "P3", "F1"]);
        // Two pauses between the three backlink pages, none inside the
        // single-page forward fetch, one at the article boundary.
        assert_eq!(pacer.count.load(Ordering::SeqCst), 3);
        // Three backlink fetches plus one forward fetch.
        assert_eq!(graph.call_count(), 4);
    }

    #[tokio::test]
    async fn test_namespace_filter_covers_companions() {
        let graph = FakeLinkGraph::new()
            .with_links("A", LinkDirection::Backlinks, &[&["X", "Talk:X"]])
            .with_links("A", LinkDirection::Forward, &[&["Category:Z"]])
            .with_links("B", LinkDirection::Backlinks, &[&["X", "User:Y"]])
            .with_links("B", LinkDirection::Forward, &[&["Template:W"]]);
        let (resolver, _) = resolver(graph);

        let query = RelatedQuery::new("A")
            .with_related(vec!["B".to_string()])
            .with_method(SelectionMethod::Extend);
        let topics = resolver.resolve(&query).await.unwrap();

        assert!(topics
            .titles
            .iter()
            .all(|title| !title.contains(':')), "got: {:?}", topics.titles);
    }

    #[tokio::test]
    async fn test_control_set_listed_first_with_max_weight() {
        let graph = FakeLinkGraph::new()
            .with_links("A", LinkDirection::Backlinks, &[&["Shared", "Solo"]])
            .with_links("A", LinkDirection::Forward, &[&[]])
            .with_links("B", LinkDirection::Backlinks, &[&["Shared", "Extra"]])
            .with_links("B", LinkDirection::Forward, &[&[]]);
        let (resolver, _) = resolver(graph);

        let query = RelatedQuery::new("A")
            .with_related(vec!["B".to_string()])
            .with_method(SelectionMethod::Weight);
        let topics = resolver.resolve(&query).await.unwrap();

        // Both queried articles answered, so both head the result
        assert_eq!(topics.titles[0], "A");
        assert_eq!(topics.titles[1], "B");
        let max = topics.weights.iter().copied().fold(f64::MIN, f64::max);
        assert_eq!(topics.weights[0], max);
        assert_eq!(topics.weights[1], max);

        // Shared is echoed by the companion, Solo is not
        let weight_of = |title: &str| {
            let index = topics.titles.iter().position(|t| t == title).unwrap();
            topics.weights[index]
        };
        assert!(weight_of("Shared") > 1.0);
        assert!(weight_of("Extra") < 1.0);
        assert!(weight_of("Shared") > weight_of("Solo"));
    }

    #[tokio::test]
    async fn test_restrict_with_silent_companion_keeps_only_control() {
        let graph = FakeLinkGraph::new()
            .with_links("A", LinkDirection::Backlinks, &[&["X", "Y"]])
            .with_links("A", LinkDirection::Forward, &[&["Z"]]);
        // Companion "B" answers nothing at all
        let (resolver, _) = resolver(graph);

        let query = RelatedQuery::new("A").with_related(vec!["B".to_string()]);
        let topics = resolver.resolve(&query).await.unwrap();

        assert_eq!(topics.titles, vec!["A"]);
        assert_eq!(topics.weights, vec![1.0]);
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let graph = FakeLinkGraph::new()
            .with_links("A", LinkDirection::Backlinks, &[&["X"], &["Y"]])
            .with_links("A", LinkDirection::Forward, &[&["Z"]])
            .with_links("B", LinkDirection::Backlinks, &[&["X"]])
            .with_links("B", LinkDirection::Forward, &[&["Z", "Q"]]);
        let (resolver, _) = resolver(graph);

        let query = RelatedQuery::new("A")
            .with_related(vec!["B".to_string()])
            .with_method(SelectionMethod::Weight);

        let first = resolver.resolve(&query).await.unwrap();
        let second = resolver.resolve(&query).await.unwrap();

        assert_eq!(first, second);
    }
}
