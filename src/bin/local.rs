use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use harvester::{
    config::{self, HarvestConfig, InspireConfig, DEFAULT_SET},
    format::ExportFormat,
    harvester::ArxivHarvester,
    inspire::{date_query, InspireClient},
    logging,
    model::FieldSelection,
    storage::LocalSaver,
};

#[derive(Parser)]
#[command(name = "harvester", about = "Harvest paper metadata from arXiv and INSPIRE-HEP")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Harvest an arXiv set over a date range through OAI-PMH
    Arxiv {
        /// arXiv OAI set, e.g. physics:hep-th
        #[arg(long, env = "HARVEST_SET", default_value = DEFAULT_SET)]
        set: String,

        /// Also look every record up on INSPIRE for citation counts
        #[arg(long)]
        inspire: bool,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Export the results of an INSPIRE literature search
    Inspire {
        /// INSPIRE search query; defaults to the --from/--until date range
        #[arg(short, long)]
        query: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args)]
struct OutputArgs {
    /// First day to harvest (default: yesterday)
    #[arg(long, env = "HARVEST_FROM")]
    from: Option<String>,

    /// Last day to harvest (default: today)
    #[arg(long, env = "HARVEST_UNTIL")]
    until: Option<String>,

    /// `everything` or a comma separated list of columns
    #[arg(long, env = "HARVEST_FIELDS", default_value = "everything")]
    fields: FieldSelection,

    #[arg(long, default_value = "csv")]
    format: ExportFormat,

    /// Output file (default: set=<set>-from=<from>-to=<until>.<ext>)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl OutputArgs {
    fn harvest_config(&self, set: &str) -> anyhow::Result<HarvestConfig> {
        let mut config = HarvestConfig::new(
            set,
            self.from.as_deref(),
            self.until.as_deref(),
            self.fields.clone(),
        )?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn path_for(&self, config: &HarvestConfig) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(config.file_name(self.format)))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::load_env_file();
    logging::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Arxiv {
            set,
            inspire,
            output,
        } => {
            let config = output.harvest_config(&set)?;
            let path = output.path_for(&config);
            let harvester = ArxivHarvester::from_config(config.clone())?;
            let mut papers = harvester.harvest().await.context("arXiv harvest failed")?;

            let fields = if inspire {
                if !papers.is_empty() {
                    let client = InspireClient::from_config(InspireConfig::from_env()?)?;
                    client
                        .enrich(&mut papers)
                        .await
                        .context("INSPIRE enrichment failed")?;
                }
                config.fields.fields_with_inspire()
            } else {
                config.fields.fields()
            };

            LocalSaver::save(&path, &papers, output.format, &fields)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("# results: {}", papers.len());
        }
        Command::Inspire { query, output } => {
            let range = output.harvest_config(DEFAULT_SET)?;
            let query = query.unwrap_or_else(|| date_query(range.from, range.until));
            let path = output
                .output
                .clone()
                .unwrap_or_else(|| PathBuf::from(format!("inspire.{}", output.format.extension())));

            let client = InspireClient::from_config(InspireConfig::from_env()?)?;
            let papers = client.search(&query).await.context("INSPIRE search failed")?;

            LocalSaver::save(&path, &papers, output.format, &range.fields.fields_with_inspire())
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("# results: {}", papers.len());
        }
    }
    Ok(())
}
