use crate::nlab::QuestionRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A revealed answer tagged with its 0-based position in the whole question set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredAnswer {
    pub index: usize,
    pub value: String,
}

/// Everything one harvest run recovered, keyed by global index. Pages that could
/// not be fetched leave a gap instead of shifting later answers.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AnswerSheet {
    answers: BTreeMap<usize, String>,
    skipped_pages: Vec<usize>,
}

impl AnswerSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, answer: RecoveredAnswer) {
        self.answers.insert(answer.index, answer.value);
    }

    pub fn skip_page(&mut self, page: usize) {
        self.skipped_pages.push(page);
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.answers.get(&index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// 1-based page numbers that were skipped.
    pub fn skipped_pages(&self) -> &[usize] {
        &self.skipped_pages
    }

    pub fn iter(&self) -> impl Iterator<Item = RecoveredAnswer> + '_ {
        self.answers.iter().map(|(&index, value)| RecoveredAnswer {
            index,
            value: value.clone(),
        })
    }
}

impl FromIterator<RecoveredAnswer> for AnswerSheet {
    fn from_iter<T: IntoIterator<Item = RecoveredAnswer>>(iter: T) -> Self {
        let mut sheet = AnswerSheet::new();
        for a in iter {
            sheet.insert(a);
        }
        sheet
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerEnvelope {
    pub index: usize,
    #[serde(rename = "Question")]
    pub question: QuestionRecord,
}

/// Layout of the raw answer dump file: `{ "Ans": [ { "index": .., "Question": .. } ] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerDump {
    #[serde(rename = "Ans")]
    pub answers: Vec<AnswerEnvelope>,
}

impl From<&AnswerSheet> for AnswerDump {
    fn from(sheet: &AnswerSheet) -> Self {
        Self {
            answers: sheet
                .iter()
                .map(|a| AnswerEnvelope {
                    index: a.index,
                    question: QuestionRecord::answer_only(a.value),
                })
                .collect(),
        }
    }
}

impl From<AnswerDump> for AnswerSheet {
    fn from(dump: AnswerDump) -> Self {
        dump.answers
            .into_iter()
            .map(|e| RecoveredAnswer {
                index: e.index,
                value: e.question.answer,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn answer(index: usize, value: &str) -> RecoveredAnswer {
        RecoveredAnswer {
            index,
            value: value.to_string(),
        }
    }

    #[test]
    fn keeps_gaps() {
        let sheet: AnswerSheet = vec![answer(0, "1"), answer(1, "3"), answer(5, "2")]
            .into_iter()
            .collect();

        assert_eq!(sheet.len(), 3);
        assert_eq!(sheet.get(1), Some("3"));
        assert_eq!(sheet.get(2), None);
        assert_eq!(sheet.get(5), Some("2"));
        assert_eq!(
            sheet.iter().map(|a| a.index).collect::<Vec<_>>(),
            vec![0, 1, 5]
        );
    }

    #[test]
    fn dump_layout() {
        let sheet: AnswerSheet = vec![answer(4, "2")].into_iter().collect();
        let value = serde_json::to_value(AnswerDump::from(&sheet)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "Ans": [{
                    "index": 4,
                    "Question": {
                        "Context": "",
                        "Options": [],
                        "Ans": "2",
                        "Explain": "",
                        "level": 2
                    }
                }]
            })
        );
    }

    #[test]
    fn dump_converts_back_to_sheet() {
        let sheet: AnswerSheet = vec![answer(0, "4"), answer(31, "1")].into_iter().collect();
        let back = AnswerSheet::from(AnswerDump::from(&sheet));
        assert_eq!(back, sheet);
    }
}
