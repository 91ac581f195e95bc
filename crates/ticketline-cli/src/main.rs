mod display;
mod pipeline;

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use ticketline_ai::config::{
    DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL, DEFAULT_OPENROUTER_ENDPOINT,
    DEFAULT_OPENROUTER_MODEL,
};
use ticketline_ai::{
    Dispatcher, LlmSettings, OllamaSettings, OpenRouterSettings, Provider, list_models,
};
use ticketline_core::{
    Cohort, CohortFilter, NormalizeOptions, Product, TimelineOptions, group_cohorts, group_stats,
    normalize,
};
use ticketline_store::SummaryCache;
use tracing::{info, warn};

use crate::pipeline::Pipeline;

#[derive(Parser)]
#[command(
    name = "ticketline",
    version,
    about = "Chronological LLM summaries of customer support tickets"
)]
struct Cli {
    #[command(flatten)]
    llm: LlmArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct LlmArgs {
    /// LLM backend: "ollama" (local) or "openrouter" (remote).
    #[arg(long, global = true, env = "LLM_PROVIDER", default_value = "ollama")]
    provider: Provider,

    #[arg(long, global = true, env = "OLLAMA_URL", default_value = DEFAULT_OLLAMA_URL)]
    ollama_url: String,

    #[arg(long, global = true, env = "OLLAMA_MODEL", default_value = DEFAULT_OLLAMA_MODEL)]
    ollama_model: String,

    #[arg(long, global = true, env = "OPENROUTER_MODEL", default_value = DEFAULT_OPENROUTER_MODEL)]
    openrouter_model: String,

    #[arg(long, global = true, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    openrouter_api_key: Option<String>,

    /// Per-attempt request timeout.
    #[arg(long, global = true, default_value_t = 60)]
    timeout_secs: u64,
}

impl LlmArgs {
    fn settings(&self) -> LlmSettings {
        LlmSettings {
            provider: self.provider,
            ollama: OllamaSettings {
                base_url: self.ollama_url.clone(),
                model: self.ollama_model.clone(),
                ..Default::default()
            },
            openrouter: OpenRouterSettings {
                endpoint: DEFAULT_OPENROUTER_ENDPOINT.to_string(),
                model: self.openrouter_model.clone(),
                api_key: self.openrouter_api_key.clone(),
            },
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Args)]
struct InputArgs {
    /// Ticket export (CSV with a header row).
    file: PathBuf,

    /// Field delimiter.
    #[arg(long, default_value_t = ',')]
    delimiter: char,
}

#[derive(Subcommand)]
enum Command {
    /// Show ticket counts per customer and product.
    Groups {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Summarize each customer/product group and render its timeline.
    Summarize {
        #[command(flatten)]
        input: InputArgs,

        /// Only these customers (repeatable).
        #[arg(long = "customer")]
        customers: Vec<String>,

        /// Only these products, e.g. Broadband, Voice, TV (repeatable).
        #[arg(long = "product")]
        products: Vec<Product>,

        /// Write one timeline JSON document per group into this directory.
        #[arg(long)]
        out: Option<PathBuf>,

        #[arg(long, env = "TICKETLINE_CACHE", default_value = "ticket_summaries.duckdb")]
        cache_db: PathBuf,

        /// Skip the summary cache entirely.
        #[arg(long)]
        no_cache: bool,

        /// Date for timeline events that precede any dated section.
        #[arg(long, default_value = "2024-01-01")]
        default_date: NaiveDate,
    },
    /// List models installed on the Ollama server.
    Models,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    info!("ticketline v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Groups { input } => {
            let cohorts = load_cohorts(&input)?;
            display::print_group_stats(&group_stats(&cohorts));
        }
        Command::Summarize {
            input,
            customers,
            products,
            out,
            cache_db,
            no_cache,
            default_date,
        } => {
            let filter = CohortFilter {
                customers,
                products,
            };
            let cohorts = filter.apply(load_cohorts(&input)?);
            if cohorts.is_empty() {
                println!("No ticket groups match.");
                return Ok(());
            }

            let cache = if no_cache { None } else { open_cache(&cache_db) };
            let settings = cli.llm.settings();
            info!(
                provider = %settings.provider,
                model = settings.model(),
                groups = cohorts.len(),
                "summarizing"
            );

            let pipeline = Pipeline::new(cache, Dispatcher::new(), TimelineOptions { default_date });
            let (reports, stats) = pipeline.run(&cohorts, &settings).await;

            if let Some(dir) = &out {
                fs::create_dir_all(dir)
                    .with_context(|| format!("creating output directory {}", dir.display()))?;
            }
            for report in &reports {
                display::print_report_card(report);
                if let Some(dir) = &out {
                    let path = dir.join(timeline_file_name(&report.customer, report.product));
                    let json = serde_json::to_string_pretty(&report.timeline)
                        .context("serializing timeline")?;
                    fs::write(&path, json)
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!(path = %path.display(), "wrote timeline");
                }
            }
            display::print_tally(&stats);
        }
        Command::Models => {
            let dispatcher = Dispatcher::new();
            let models = list_models(dispatcher.client(), &cli.llm.ollama_url)
                .await
                .with_context(|| format!("listing models at {}", cli.llm.ollama_url))?;
            if models.is_empty() {
                println!("No models installed.");
            }
            for name in models {
                println!("{name}");
            }
        }
    }
    Ok(())
}

fn load_cohorts(input: &InputArgs) -> anyhow::Result<Vec<Cohort>> {
    if !input.delimiter.is_ascii() {
        bail!("--delimiter must be a single ASCII character");
    }
    let options = NormalizeOptions {
        delimiter: input.delimiter as u8,
    };
    let file = File::open(&input.file)
        .with_context(|| format!("opening {}", input.file.display()))?;
    let records = normalize(BufReader::new(file), &options)
        .with_context(|| format!("reading tickets from {}", input.file.display()))?;
    Ok(group_cohorts(records))
}

/// Open the cache file, or run uncached if it cannot be opened.
fn open_cache(path: &Path) -> Option<SummaryCache> {
    match SummaryCache::open_persistent(path) {
        Ok(cache) => Some(cache),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "summary cache unavailable, continuing without it");
            None
        }
    }
}

/// `<customer>_<product>.json`, with characters unsafe in file names replaced.
fn timeline_file_name(customer: &str, product: Product) -> String {
    let safe: String = customer
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect();
    format!("{safe}_{}.json", product.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(timeline_file_name("100", Product::Broadband), "100_Broadband.json");
        assert_eq!(timeline_file_name("a/b c", Product::Tv), "a_b_c_TV.json");
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["ticketline", "summarize", "tickets.csv"]).unwrap();
        let Command::Summarize {
            input,
            no_cache,
            default_date,
            ..
        } = cli.command
        else {
            panic!("expected summarize");
        };
        assert_eq!(input.delimiter, ',');
        assert!(!no_cache);
        assert_eq!(default_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn cli_filters_and_provider() {
        let cli = Cli::try_parse_from([
            "ticketline",
            "summarize",
            "t.csv",
            "--customer",
            "100",
            "--customer",
            "200",
            "--product",
            "voice",
            "--provider",
            "openrouter",
            "--openrouter-api-key",
            "k",
        ])
        .unwrap();
        let settings = cli.llm.settings();
        assert_eq!(settings.provider, Provider::OpenRouter);
        assert_eq!(settings.openrouter.api_key.as_deref(), Some("k"));
        let Command::Summarize {
            customers, products, ..
        } = cli.command
        else {
            panic!("expected summarize");
        };
        assert_eq!(customers, ["100", "200"]);
        assert_eq!(products, [Product::Voice]);
    }

    #[test]
    fn load_cohorts_from_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("tickets.csv");
        fs::write(
            &path,
            "CUSTOMER_NUMBER;SERVICE_CATEGORY;ACCEPTANCE_TIME;COMPLETION_TIME\n\
             100;KAI;2024-01-02 08:00:00;\n\
             100;NET;2024-01-01 08:00:00;2024-01-01 09:00:00\n",
        )
        .unwrap();
        let input = InputArgs {
            file: path,
            delimiter: ';',
        };
        let cohorts = load_cohorts(&input).unwrap();
        assert_eq!(cohorts.len(), 1);
        assert_eq!(cohorts[0].len(), 2);
        assert!(cohorts[0].records[1].completed_at.is_none());
    }
}
