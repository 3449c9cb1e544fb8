use crate::answer::{AnswerDump, AnswerSheet};
use crate::nlab::QuestionRecord;
use crate::HarvestError;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::fs;
use tracing::{debug, info, warn};

/// How a JSON file is replaced on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Truncate and write the target in place. A crash mid-write can leave a
    /// partial file.
    #[default]
    Overwrite,
    /// Write a sibling `.tmp` file, then rename it over the target.
    Atomic,
}

impl FromStr for WriteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "overwrite" => Ok(WriteMode::Overwrite),
            "atomic" => Ok(WriteMode::Atomic),
            other => Err(format!("unknown write mode `{}`", other)),
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub updated: usize,
    /// 0-based positions left untouched.
    pub skipped: Vec<usize>,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> HarvestError + '_ {
    move |source| HarvestError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Pretty-prints `value` as JSON (two-space indent, UTF-8) into `path`.
pub async fn write_json<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
    mode: WriteMode,
) -> Result<(), HarvestError> {
    let json = serde_json::to_string_pretty(value)?;
    match mode {
        WriteMode::Overwrite => fs::write(path, json).await.map_err(io_error(path)),
        WriteMode::Atomic => {
            let tmp = tmp_path(path);
            fs::write(&tmp, json).await.map_err(io_error(&tmp))?;
            fs::rename(&tmp, path).await.map_err(io_error(path))
        }
    }
}

pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, HarvestError> {
    let raw = fs::read_to_string(path).await.map_err(io_error(path))?;
    Ok(serde_json::from_str(&raw)?)
}

pub async fn write_questions(
    path: &Path,
    questions: &[QuestionRecord],
    mode: WriteMode,
) -> Result<(), HarvestError> {
    write_json(path, questions, mode).await?;
    info!("Saved {} questions to {}", questions.len(), path.display());
    Ok(())
}

pub async fn read_questions(path: &Path) -> Result<Vec<QuestionRecord>, HarvestError> {
    read_json(path).await
}

pub async fn write_answer_dump(
    path: &Path,
    sheet: &AnswerSheet,
    mode: WriteMode,
) -> Result<(), HarvestError> {
    write_json(path, &AnswerDump::from(sheet), mode).await?;
    info!("Saved {} answers to {}", sheet.len(), path.display());
    Ok(())
}

pub async fn read_answer_dump(path: &Path) -> Result<AnswerSheet, HarvestError> {
    let dump: AnswerDump = read_json(path).await?;
    Ok(dump.into())
}

/// Overlays recovered answers onto the question array stored at `path` and
/// writes the whole array back. Element `i` takes the answer recovered for
/// global index `i`; positions without a non-empty answer are left as they are.
pub async fn merge_answers(
    path: &Path,
    sheet: &AnswerSheet,
    mode: WriteMode,
) -> Result<MergeReport, HarvestError> {
    let mut items = match read_json::<Value>(path).await? {
        Value::Array(items) => items,
        other => {
            return Err(HarvestError::Format {
                path: path.to_path_buf(),
                reason: format!("expected a JSON array, found {}", json_kind(&other)),
            })
        }
    };

    let mut report = MergeReport::default();
    for (i, item) in items.iter_mut().enumerate() {
        let answer = sheet.get(i).filter(|a| !a.is_empty());
        match (answer, item.as_object_mut()) {
            (Some(answer), Some(obj)) => {
                obj.insert("Ans".to_string(), Value::String(answer.to_string()));
                report.updated += 1;
            }
            (None, _) => {
                warn!("No answer recovered for question {}, skipped", i + 1);
                report.skipped.push(i);
            }
            (Some(_), None) => {
                warn!("Question {} is not a JSON object, skipped", i + 1);
                report.skipped.push(i);
            }
        }
    }
    debug!("Merge updated {} of {} questions", report.updated, items.len());

    write_json(path, &items, mode).await?;
    info!("Answers merged into {}", path.display());
    Ok(report)
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
