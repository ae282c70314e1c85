use crate::{
    config::HarvestConfig,
    error::{Error, Result},
    model::Paper,
    parser::{parse_page, ResumptionToken},
    transport::{fetch, HttpTransport, Transport},
};

const METADATA_PREFIX: &str = "arXiv";

macro_rules! list_records_url {
    () => { "{}?verb=ListRecords&from={}&until={}&metadataPrefix={}&set={}" }
}

macro_rules! resume_url {
    () => { "{}?verb=ListRecords&resumptionToken={}" }
}

/// Walks an OAI-PMH `ListRecords` result set, one resumption token at a time.
#[derive(Debug)]
pub struct ArxivHarvester<T = HttpTransport> {
    config: HarvestConfig,
    transport: T,
}

impl ArxivHarvester<HttpTransport> {
    pub fn from_config(config: HarvestConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config.user_agent)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> ArxivHarvester<T> {
    pub fn with_transport(config: HarvestConfig, transport: T) -> Self {
        ArxivHarvester { config, transport }
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    pub fn initial_url(&self) -> String {
        format!(
            list_records_url!(),
            self.config.base_url,
            self.config.from,
            self.config.until,
            METADATA_PREFIX,
            self.config.set
        )
    }

    pub fn resume_url(&self, token: &str) -> String {
        format!(resume_url!(), self.config.base_url, token)
    }

    pub async fn harvest(&self) -> Result<Vec<Paper>> {
        tracing::info!(
            set = %self.config.set,
            from = %self.config.from,
            until = %self.config.until,
            "requesting records"
        );
        let policy = self.config.retry_policy();
        let mut papers: Vec<Paper> = Vec::new();
        let mut url = self.initial_url();
        let mut previous: Option<ResumptionToken> = None;
        let mut page_no = 0;

        loop {
            let xml = fetch(&self.transport, &url, &policy).await?;
            let mut page = parse_page(&xml)?;
            page_no += 1;
            tracing::info!(
                page = page_no,
                records = page.papers.len(),
                cursor = ?page.token.as_ref().and_then(|t| t.cursor),
                complete = ?page.token.as_ref().and_then(|t| t.complete_list_size),
                "harvested page"
            );
            papers.append(&mut page.papers);

            let Some(token) = page.token else {
                break;
            };
            if previous.as_ref().is_some_and(|p| p.value == token.value) {
                return Err(Error::Oai {
                    code: "repeatedToken".to_string(),
                    message: format!("server returned resumption token {} twice", token.value),
                });
            }
            url = self.resume_url(&token.value);
            previous = Some(token);
        }

        tracing::info!(total = papers.len(), pages = page_no, "harvest finished");
        Ok(papers)
    }
}
