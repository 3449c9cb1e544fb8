use clap::{Parser, Subcommand};
use nlab_quiz_harvester::data::{self, WriteMode};
use nlab_quiz_harvester::nlab::{QuestionTableParser, RevealedAnswerParser};
use nlab_quiz_harvester::{
    harvest_answers, harvest_questions, AnswerSheet, Config, HarvestError, HttpFetcher,
    TokioPacer,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;

/// Harvests the n-lab JLPT question bank and its correct answers.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Question listing URL, overrides `URL`
    #[arg(long, global = true)]
    url: Option<String>,

    /// Question database file, overrides `OUTPUT_PATH`
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Answer dump file, overrides `ANSWERS_PATH`
    #[arg(long, global = true)]
    answers: Option<PathBuf>,

    /// Number of items on the answer endpoint, overrides `TOTAL_ITEMS`
    #[arg(long, global = true)]
    total: Option<usize>,

    /// Items per answer page, overrides `PAGE_SIZE`
    #[arg(long, global = true)]
    page_size: Option<usize>,

    /// Pause between answer pages in milliseconds, overrides `PAGE_DELAY_MS`
    #[arg(long, global = true)]
    delay_ms: Option<u64>,

    /// `overwrite` or `atomic`, overrides `WRITE_MODE`
    #[arg(long, global = true)]
    write_mode: Option<WriteMode>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Harvest questions, then harvest answers and merge them in (default)
    Run,
    /// Harvest questions only
    Questions,
    /// Harvest answers and save them to the answer dump
    Answers,
    /// Merge answers into an existing question database
    Merge {
        /// Read answers from the answer dump instead of harvesting them
        #[arg(long)]
        from_dump: bool,
    },
}

impl Cli {
    fn apply(&self, mut config: Config) -> Result<Config, HarvestError> {
        if let Some(url) = &self.url {
            config.endpoint_url = Some(url.clone());
        }
        if let Some(output) = &self.output {
            config.output_path = output.clone();
        }
        if let Some(answers) = &self.answers {
            config.answers_path = answers.clone();
        }
        if let Some(total) = self.total {
            config.total_item_count = total;
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }
        if let Some(delay) = self.delay_ms {
            config.inter_page_delay = Duration::from_millis(delay);
        }
        if let Some(mode) = self.write_mode {
            config.write_mode = mode;
        }
        config.validate()
    }
}

fn log_failure<T>(step: &str, result: Result<T, HarvestError>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            error!("{} failed: {}", step, e);
            None
        }
    }
}

async fn collect_answers(
    fetcher: &HttpFetcher,
    config: &Config,
) -> Result<AnswerSheet, HarvestError> {
    let query = config.answer_query()?;
    Ok(harvest_answers(fetcher, &RevealedAnswerParser, &TokioPacer, &query, config).await)
}

async fn merge(sheet: &AnswerSheet, config: &Config) {
    if let Some(report) = log_failure(
        "Merge",
        data::merge_answers(&config.output_path, sheet, config.write_mode).await,
    ) {
        info!(
            "{} answers merged, {} questions skipped",
            report.updated,
            report.skipped.len()
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| {
                "info,html5ever=error,selectors=error,hyper=warn,reqwest=info".into()
            }),
        )
        .with(ErrorLayer::default())
        .init();

    let cli = Cli::parse();
    let config = cli.apply(Config::from_env()?)?;
    let fetcher = HttpFetcher::new();

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            config.require_endpoint()?;
            log_failure(
                "Question harvest",
                harvest_questions(&fetcher, &QuestionTableParser, &config).await,
            );
            let sheet = collect_answers(&fetcher, &config).await?;
            merge(&sheet, &config).await;
        }
        Command::Questions => {
            config.require_endpoint()?;
            log_failure(
                "Question harvest",
                harvest_questions(&fetcher, &QuestionTableParser, &config).await,
            );
        }
        Command::Answers => {
            let sheet = collect_answers(&fetcher, &config).await?;
            log_failure(
                "Answer dump",
                data::write_answer_dump(&config.answers_path, &sheet, config.write_mode).await,
            );
        }
        Command::Merge { from_dump } => {
            let sheet = if from_dump {
                match log_failure(
                    "Reading answer dump",
                    data::read_answer_dump(&config.answers_path).await,
                ) {
                    Some(sheet) => sheet,
                    None => return Ok(()),
                }
            } else {
                collect_answers(&fetcher, &config).await?
            };
            merge(&sheet, &config).await;
        }
    }

    Ok(())
}
