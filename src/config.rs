use std::{env, str::FromStr, time::Duration};

use chrono::{DateTime, Days, Local, NaiveDate};
use uuid::Uuid;

use crate::{
    error::{Error, Result},
    format::ExportFormat,
    model::FieldSelection,
    transport::RetryPolicy,
};

pub const ENV_FILE: &str = "harvester.env";
pub const ARXIV_OAI_URL: &str = "https://export.arxiv.org/oai2";
pub const INSPIRE_API_URL: &str = "https://inspirehep.net/api";
pub const DEFAULT_SET: &str = "physics:astro-ph";
pub const USER_AGENT: &str = concat!("harvester/", env!("CARGO_PKG_VERSION"));

const RAW_FOLDER_PREFIX: &str = "raw";

/// Top level sets exposed by the arXiv OAI-PMH endpoint.
pub const ARXIV_SETS: [&str; 21] = [
    "cs",
    "econ",
    "eess",
    "math",
    "physics",
    "physics:astro-ph",
    "physics:cond-mat",
    "physics:gr-qc",
    "physics:hep-ex",
    "physics:hep-lat",
    "physics:hep-ph",
    "physics:hep-th",
    "physics:math-ph",
    "physics:nlin",
    "physics:nucl-ex",
    "physics:nucl-th",
    "physics:physics",
    "physics:quant-ph",
    "q-bio",
    "q-fin",
    "stat",
];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d", "%d %b %Y"];

#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub base_url: String,
    pub set: String,
    pub from: NaiveDate,
    pub until: NaiveDate,
    pub fields: FieldSelection,
    pub max_retries: u32,
    pub default_retry_secs: u64,
    pub max_retry_secs: u64,
    pub user_agent: String,
}

impl HarvestConfig {
    /// Yesterday through today on the default set.
    pub fn default() -> Self {
        HarvestConfig {
            base_url: ARXIV_OAI_URL.to_string(),
            set: DEFAULT_SET.to_string(),
            from: days_back(1),
            until: days_back(0),
            fields: FieldSelection::Everything,
            max_retries: 5,
            default_retry_secs: 10,
            max_retry_secs: 600,
            user_agent: USER_AGENT.to_string(),
        }
    }

    /// Validated config. `None` dates fall back to yesterday / today.
    pub fn new(
        set: &str,
        from: Option<&str>,
        until: Option<&str>,
        fields: FieldSelection,
    ) -> Result<Self> {
        let from = from.map(parse_date).transpose()?.unwrap_or_else(|| days_back(1));
        let until = until.map(parse_date).transpose()?.unwrap_or_else(|| days_back(0));
        if from > until {
            return Err(Error::InvalidDate(format!("{} is after {}", from, until)));
        }
        Ok(HarvestConfig {
            set: check_set(set)?,
            from,
            until,
            fields,
            ..Self::default()
        })
    }

    pub fn from_env() -> Result<Self> {
        load_env_file();
        let set = env::var("HARVEST_SET").unwrap_or_else(|_| DEFAULT_SET.to_string());
        let from = env::var("HARVEST_FROM").ok();
        let until = env::var("HARVEST_UNTIL").ok();
        let fields = match env::var("HARVEST_FIELDS") {
            Ok(raw) => FieldSelection::parse(&raw)?,
            Err(_) => FieldSelection::Everything,
        };
        let mut config = Self::new(&set, from.as_deref(), until.as_deref(), fields)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Endpoint and retry settings that have no CLI flag of their own.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(retries) = get_from_env::<u32>("HARVEST_MAX_RETRIES")? {
            self.max_retries = retries;
        }
        if let Ok(url) = env::var("ARXIV_OAI_URL") {
            self.base_url = url;
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            default_wait: Duration::from_secs(self.default_retry_secs),
            max_wait: Duration::from_secs(self.max_retry_secs),
        }
    }

    pub fn file_stem(&self) -> String {
        format!("set={}-from={}-to={}", self.set, self.from, self.until)
    }

    pub fn default_file_name(&self) -> String {
        self.file_name(ExportFormat::Csv)
    }

    pub fn file_name(&self, format: ExportFormat) -> String {
        format!("{}.{}", self.file_stem(), format.extension())
    }
}

#[derive(Debug, Clone)]
pub struct InspireConfig {
    pub base_url: String,
    pub page_size: u32,
    pub max_pages: u32,
    pub delay_ms: u64,
    pub max_retries: u32,
    pub user_agent: String,
}

impl InspireConfig {
    pub fn default() -> Self {
        InspireConfig {
            base_url: INSPIRE_API_URL.to_string(),
            page_size: 25,
            max_pages: 40,
            delay_ms: 350,
            max_retries: 5,
            user_agent: USER_AGENT.to_string(),
        }
    }

    pub fn from_env() -> Result<Self> {
        load_env_file();
        let mut config = Self::default();
        if let Ok(url) = env::var("INSPIRE_API_URL") {
            config.base_url = url;
        }
        if let Some(size) = get_from_env::<u32>("INSPIRE_PAGE_SIZE")? {
            config.page_size = size.max(1);
        }
        if let Some(pages) = get_from_env::<u32>("INSPIRE_MAX_PAGES")? {
            config.max_pages = pages;
        }
        if let Some(delay) = get_from_env::<u64>("INSPIRE_DELAY_MS")? {
            config.delay_ms = delay;
        }
        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            default_wait: Duration::from_secs(5),
            max_wait: Duration::from_secs(120),
        }
    }
}

// S3 object naming for uploaded harvests.
#[derive(Debug)]
pub struct ObjectKey {
    set: String,
    from: NaiveDate,
    until: NaiveDate,
    run_id: Uuid,
}

impl ObjectKey {
    pub fn new(config: &HarvestConfig) -> Self {
        ObjectKey {
            set: config.set.replace(':', "_"),
            from: config.from,
            until: config.until,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn raw_path(&self, format: ExportFormat) -> String {
        format!(
            "{}/{}/{}_{}_{}.{}",
            RAW_FOLDER_PREFIX,
            self.set,
            self.from,
            self.until,
            self.run_id,
            format.extension()
        )
    }
}

/// Loads `harvester.env` when it exists; a missing file is not an error.
pub fn load_env_file() {
    match dotenvy::from_filename(ENV_FILE) {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded env file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("failed to read {}: {}", ENV_FILE, e),
    }
}

/// Date `i` days back from today. 0 is today, 1 is yesterday.
pub fn days_back(i: u64) -> NaiveDate {
    let today = Local::now().date_naive();
    today.checked_sub_days(Days::new(i)).unwrap_or(today)
}

pub fn parse_date(input: &str) -> Result<NaiveDate> {
    let input = input.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(input, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(input)
                .ok()
                .map(|dt| dt.date_naive())
        })
        .ok_or_else(|| Error::InvalidDate(input.to_string()))
}

pub fn check_set(set: &str) -> Result<String> {
    let set = set.trim();
    if ARXIV_SETS.contains(&set) {
        Ok(set.to_string())
    } else {
        Err(Error::InvalidSet {
            set: set.to_string(),
            allowed: ARXIV_SETS.join(", "),
        })
    }
}

fn get_from_env<T: FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Env(format!("{} has an invalid value `{}`", key, raw))),
        Err(_) => Ok(None),
    }
}
