use std::{collections::HashMap, time::Duration};

use chrono::NaiveDate;
use reqwest::Url;
use serde::Deserialize;

use crate::{
    config::InspireConfig,
    error::{Error, Result},
    model::{collapse_whitespace, non_empty, Paper},
    transport::{fetch, HttpTransport, Transport},
};

const LOOKUP_BATCH: usize = 25;
const FIELDS: &str = concat!(
    "control_number,titles.title,abstracts.value,authors.full_name,",
    "arxiv_eprints,dois.value,citation_count,earliest_date"
);

/// Client for the INSPIRE-HEP literature search API.
#[derive(Debug)]
pub struct InspireClient<T = HttpTransport> {
    config: InspireConfig,
    transport: T,
}

impl InspireClient<HttpTransport> {
    pub fn from_config(config: InspireConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config.user_agent)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> InspireClient<T> {
    pub fn with_transport(config: InspireConfig, transport: T) -> Self {
        InspireClient { config, transport }
    }

    pub fn search_url(&self, query: &str) -> Result<Url> {
        let base = format!("{}/literature", self.config.base_url.trim_end_matches('/'));
        let size = self.config.page_size.to_string();
        Url::parse_with_params(
            &base,
            &[
                ("q", query),
                ("size", size.as_str()),
                ("page", "1"),
                ("sort", "mostrecent"),
                ("fields", FIELDS),
            ],
        )
        .map_err(|e| Error::Url(format!("{}: {}", base, e)))
    }

    /// Every hit for `query`, following `links.next` up to `max_pages`.
    pub async fn search(&self, query: &str) -> Result<Vec<Paper>> {
        tracing::info!(query, "searching INSPIRE");
        let policy = self.config.retry_policy();
        let mut url = self.search_url(query)?.to_string();
        let mut papers: Vec<Paper> = Vec::new();

        for page in 1..=self.config.max_pages {
            if page > 1 && self.config.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.delay_ms)).await;
            }
            let body = fetch(&self.transport, &url, &policy).await?;
            let response: SearchResponse = serde_json::from_str(&body)?;
            let hits = response.hits.hits;
            if hits.is_empty() {
                break;
            }
            tracing::debug!(page, hits = hits.len(), total = response.hits.total, "INSPIRE page");
            papers.extend(hits.into_iter().map(|hit| hit.metadata.into_paper()));

            match response.links.next {
                Some(next) => url = next,
                None => break,
            }
            if page == self.config.max_pages {
                tracing::warn!(max_pages = self.config.max_pages, "stopping at page limit");
            }
        }

        tracing::info!(total = papers.len(), "INSPIRE search finished");
        Ok(papers)
    }

    /// Fills `inspire_id` and `citation_count` for papers INSPIRE knows about.
    pub async fn enrich(&self, papers: &mut [Paper]) -> Result<usize> {
        let mut matched = 0;
        for chunk in papers.chunks_mut(LOOKUP_BATCH) {
            let query = chunk
                .iter()
                .map(|paper| format!("arxiv:{}", paper.base_arxiv_id()))
                .collect::<Vec<_>>()
                .join(" or ");
            let found: HashMap<String, Paper> = self
                .search(&query)
                .await?
                .into_iter()
                .map(|paper| (paper.base_arxiv_id().to_string(), paper))
                .collect();

            for paper in chunk.iter_mut() {
                if let Some(hit) = found.get(paper.base_arxiv_id()) {
                    paper.inspire_id = hit.inspire_id;
                    paper.citation_count = hit.citation_count;
                    matched += 1;
                }
            }
        }
        tracing::info!(matched, total = papers.len(), "INSPIRE enrichment done");
        Ok(matched)
    }
}

/// INSPIRE search clause for records first dated in `[from, until]`.
pub fn date_query(from: NaiveDate, until: NaiveDate) -> String {
    format!("de {}->{}", from, until)
}

fn parse_loose_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    [raw.to_string(), format!("{}-01", raw), format!("{}-01-01", raw)]
        .iter()
        .find_map(|candidate| NaiveDate::parse_from_str(candidate, "%Y-%m-%d").ok())
}

// INSPIRE raw JSON model

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchResponse {
    hits: HitsField,
    links: LinksField,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HitsField {
    hits: Vec<HitField>,
    total: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LinksField {
    next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HitField {
    metadata: LiteratureMetadata,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LiteratureMetadata {
    control_number: Option<u64>,
    titles: Vec<TitleField>,
    abstracts: Vec<ValueField>,
    authors: Vec<AuthorField>,
    arxiv_eprints: Vec<EprintField>,
    dois: Vec<ValueField>,
    citation_count: Option<u64>,
    earliest_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TitleField {
    title: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ValueField {
    value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AuthorField {
    full_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EprintField {
    value: String,
    categories: Vec<String>,
}

impl LiteratureMetadata {
    fn into_paper(self) -> Paper {
        let eprint = self.arxiv_eprints.into_iter().next().unwrap_or_default();
        let id = match (non_empty(&eprint.value), self.control_number) {
            (Some(arxiv_id), _) => arxiv_id,
            (None, Some(recid)) => format!("inspire:{}", recid),
            (None, None) => String::new(),
        };
        Paper {
            id,
            title: self
                .titles
                .first()
                .map(|t| collapse_whitespace(&t.title))
                .unwrap_or_default(),
            abstract_text: self
                .abstracts
                .first()
                .map(|a| collapse_whitespace(&a.value))
                .unwrap_or_default(),
            authors: self
                .authors
                .iter()
                .filter_map(|a| non_empty(&a.full_name))
                .collect(),
            categories: eprint.categories,
            created: self.earliest_date.as_deref().and_then(parse_loose_date),
            doi: self.dois.first().and_then(|d| non_empty(&d.value)),
            inspire_id: self.control_number,
            citation_count: self.citation_count,
            ..Paper::default()
        }
    }
}

// end INSPIRE raw JSON model
