use crate::data::WriteMode;
use crate::nlab::{AnswerQuery, ANSWER_ENDPOINT};
use crate::HarvestError;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_OUTPUT_PATH: &str = "JLPT_QDB.json";
pub const DEFAULT_ANSWERS_PATH: &str = "answers.json";
pub const DEFAULT_TOTAL_ITEMS: usize = 1924;
pub const DEFAULT_PAGE_SIZE: usize = 30;
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(1000);

/// Settings for one harvest run, built once at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// Page listing the questions (`URL`). Only the question harvest needs it.
    pub endpoint_url: Option<String>,
    /// Question database file (`OUTPUT_PATH`).
    pub output_path: PathBuf,
    /// Raw answer dump (`ANSWERS_PATH`).
    pub answers_path: PathBuf,
    /// Answer submission page (`ANSWER_ENDPOINT`).
    pub answer_endpoint: String,
    /// Number of items the answer endpoint holds (`TOTAL_ITEMS`).
    pub total_item_count: usize,
    /// Items requested per page (`PAGE_SIZE`).
    pub page_size: usize,
    /// Pause between two page requests (`PAGE_DELAY_MS`).
    pub inter_page_delay: Duration,
    /// `WRITE_MODE`: `overwrite` or `atomic`.
    pub write_mode: WriteMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            output_path: DEFAULT_OUTPUT_PATH.into(),
            answers_path: DEFAULT_ANSWERS_PATH.into(),
            answer_endpoint: ANSWER_ENDPOINT.to_string(),
            total_item_count: DEFAULT_TOTAL_ITEMS,
            page_size: DEFAULT_PAGE_SIZE,
            inter_page_delay: DEFAULT_PAGE_DELAY,
            write_mode: WriteMode::default(),
        }
    }
}

fn parse_var<T>(key: &'static str, raw: &str) -> Result<T, HarvestError>
where
    T: FromStr,
    T::Err: ToString,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| HarvestError::ConfigurationInvalid {
            key,
            reason: e.to_string(),
        })
}

impl Config {
    pub fn from_env() -> Result<Self, HarvestError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from `lookup`, falling back to the defaults for
    /// unset or empty keys. Only malformed values are rejected here; call
    /// `validate` once every override has been applied.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, HarvestError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let default = Self::default();

        Ok(Self {
            endpoint_url: get("URL"),
            output_path: get("OUTPUT_PATH")
                .map(PathBuf::from)
                .unwrap_or(default.output_path),
            answers_path: get("ANSWERS_PATH")
                .map(PathBuf::from)
                .unwrap_or(default.answers_path),
            answer_endpoint: get("ANSWER_ENDPOINT").unwrap_or(default.answer_endpoint),
            total_item_count: match get("TOTAL_ITEMS") {
                Some(v) => parse_var("TOTAL_ITEMS", &v)?,
                None => default.total_item_count,
            },
            page_size: match get("PAGE_SIZE") {
                Some(v) => parse_var("PAGE_SIZE", &v)?,
                None => default.page_size,
            },
            inter_page_delay: match get("PAGE_DELAY_MS") {
                Some(v) => Duration::from_millis(parse_var("PAGE_DELAY_MS", &v)?),
                None => default.inter_page_delay,
            },
            write_mode: match get("WRITE_MODE") {
                Some(v) => parse_var("WRITE_MODE", &v)?,
                None => default.write_mode,
            },
        })
    }

    pub fn validate(self) -> Result<Self, HarvestError> {
        if self.page_size == 0 {
            return Err(HarvestError::ConfigurationInvalid {
                key: "PAGE_SIZE",
                reason: "must be greater than 0".to_string(),
            });
        }
        self.answer_query()?;
        Ok(self)
    }

    pub fn require_endpoint(&self) -> Result<&str, HarvestError> {
        self.endpoint_url
            .as_deref()
            .ok_or(HarvestError::ConfigurationMissing("URL"))
    }

    pub fn answer_query(&self) -> Result<AnswerQuery, HarvestError> {
        AnswerQuery::new(&self.answer_endpoint, self.total_item_count)
    }

    pub fn page_count(&self) -> usize {
        if self.page_size == 0 {
            return 0;
        }
        self.total_item_count.div_ceil(self.page_size)
    }
}
