use scraper::Html;
use std::time::Duration;
use tracing::{error, info, warn};

pub mod answer;
pub mod config;
pub mod data;
pub mod nlab;

mod error;
mod fetch;
mod utils;

pub use answer::{AnswerSheet, RecoveredAnswer};
pub use config::Config;
pub use error::HarvestError;
pub use fetch::HttpFetcher;

use nlab::{AnswerQuery, QuestionRecord};

/// Turns one fetched page into records.
pub trait PageParser {
    type Record;

    fn parse(&self, doc: &Html) -> Vec<Self::Record>;

    fn parse_markup(&self, markup: &str) -> Vec<Self::Record> {
        let doc = Html::parse_document(markup);
        self.parse(&doc)
    }
}

#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<String, HarvestError>;

    /// Like `fetch_page`, but failures are logged and reported as `None` so the
    /// caller can skip the page.
    async fn fetch(&self, url: &str) -> Option<String> {
        match self.fetch_page(url).await {
            Ok(html) => Some(html),
            Err(e) => {
                error!("Failed to fetch {}: {}", url, e);
                None
            }
        }
    }
}

/// Waits between two consecutive page requests.
#[async_trait::async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, delay: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPacer;

#[async_trait::async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Fetches the question listing at the configured endpoint and saves every
/// question found to `config.output_path`. Nothing is written when the page has
/// no questions.
pub async fn harvest_questions<F, P>(
    fetcher: &F,
    parser: &P,
    config: &Config,
) -> Result<Vec<QuestionRecord>, HarvestError>
where
    F: PageFetcher,
    P: PageParser<Record = QuestionRecord>,
{
    let endpoint = config.require_endpoint()?;

    info!("Fetching questions from {}", endpoint);
    let html = fetcher.fetch_page(endpoint).await?;
    if html.trim().is_empty() {
        warn!("Empty response from {}", endpoint);
        return Ok(vec![]);
    }

    let questions = parser.parse_markup(&html);
    if questions.is_empty() {
        warn!(
            "No questions found, {} was not written",
            config.output_path.display()
        );
    } else {
        data::write_questions(&config.output_path, &questions, config.write_mode).await?;
    }
    Ok(questions)
}

/// Walks every answer page in order and collects the revealed answers by
/// global index. Pages that fail to load are skipped and leave a gap. The pacer
/// runs once between every two pages whatever the outcome of the first.
pub async fn harvest_answers<F, P, D>(
    fetcher: &F,
    parser: &P,
    pacer: &D,
    query: &AnswerQuery,
    config: &Config,
) -> AnswerSheet
where
    F: PageFetcher,
    P: PageParser<Record = String>,
    D: Pacer,
{
    let pages = config.page_count();
    let page_size = config.page_size;
    let mut sheet = AnswerSheet::new();

    for page in 0..pages {
        if page > 0 {
            pacer.pause(config.inter_page_delay).await;
        }

        let start = page * page_size + 1;
        let url = query.page_url(start, page_size);
        info!("[{}/{}] Fetching answers (start_num = {})", page + 1, pages, start);

        let Some(html) = fetcher.fetch(url.as_str()).await else {
            error!("Page {} skipped", page + 1);
            sheet.skip_page(page + 1);
            continue;
        };

        let values = parser.parse_markup(&html);
        if values.len() > page_size {
            warn!(
                "Page {} has {} answers for {} slots, extra answers dropped",
                page + 1,
                values.len(),
                page_size
            );
        }
        for (row, value) in values.into_iter().take(page_size).enumerate() {
            sheet.insert(RecoveredAnswer {
                index: page * page_size + row,
                value,
            });
        }
    }

    info!(
        "Recovered {} answers, {} pages skipped",
        sheet.len(),
        sheet.skipped_pages().len()
    );
    sheet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{self, WriteMode};
    use crate::nlab::{QuestionTableParser, RevealedAnswerParser};
    use pretty_assertions::assert_eq;
    use reqwest::Url;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Fetch(usize),
        Pause(Duration),
    }

    type Log = Arc<Mutex<Vec<Event>>>;

    /// Serves canned pages keyed by `start_num`; missing keys fail like a
    /// refused connection.
    struct ScriptedFetcher {
        pages: HashMap<usize, String>,
        log: Log,
    }

    #[async_trait::async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch_page(&self, url: &str) -> Result<String, HarvestError> {
            let start = Url::parse(url)
                .unwrap()
                .query_pairs()
                .find(|(k, _)| k == "start_num")
                .map(|(_, v)| v.parse().unwrap())
                .unwrap_or(0);
            self.log.lock().unwrap().push(Event::Fetch(start));
            self.pages.get(&start).cloned().ok_or(HarvestError::Io {
                path: PathBuf::from(url),
                source: std::io::ErrorKind::ConnectionRefused.into(),
            })
        }
    }

    struct RecordingPacer {
        log: Log,
    }

    #[async_trait::async_trait]
    impl Pacer for RecordingPacer {
        async fn pause(&self, delay: Duration) {
            self.log.lock().unwrap().push(Event::Pause(delay));
        }
    }

    fn answer_page(values: impl IntoIterator<Item = usize>) -> String {
        let rows: String = values
            .into_iter()
            .map(|v| format!(r#"<tr><td><input type="hidden" name="r_ans" value="{}"></td></tr>"#, v))
            .collect();
        format!("<html><body><table>{}</table></body></html>", rows)
    }

    fn config(total: usize, page_size: usize) -> Config {
        Config {
            total_item_count: total,
            page_size,
            inter_page_delay: Duration::from_millis(1000),
            ..Config::default()
        }
    }

    async fn run(config: &Config, pages: HashMap<usize, String>) -> (AnswerSheet, Vec<Event>) {
        let log = Log::default();
        let fetcher = ScriptedFetcher {
            pages,
            log: log.clone(),
        };
        let pacer = RecordingPacer { log: log.clone() };
        let query = config.answer_query().unwrap();

        let sheet = harvest_answers(&fetcher, &RevealedAnswerParser, &pacer, &query, config).await;
        let events = log.lock().unwrap().clone();
        (sheet, events)
    }

    #[tokio::test]
    async fn two_full_pages() {
        let c = config(60, 30);
        let pages = HashMap::from([
            (1, answer_page((0..30).map(|i| i % 4 + 1))),
            (31, answer_page((30..60).map(|i| i % 4 + 1))),
        ]);

        let (sheet, events) = run(&c, pages).await;

        assert_eq!(
            events,
            vec![
                Event::Fetch(1),
                Event::Pause(Duration::from_millis(1000)),
                Event::Fetch(31)
            ]
        );
        assert_eq!(sheet.len(), 60);
        assert!(sheet.skipped_pages().is_empty());
        assert_eq!(sheet.get(0), Some("1"));
        assert_eq!(sheet.get(59), Some("4"));
    }

    #[tokio::test]
    async fn fetches_every_page_in_order_with_pauses_between() {
        let c = config(100, 30);
        let pages = (0..4)
            .map(|p| (p * 30 + 1, answer_page(vec![1; 30])))
            .collect();

        let (sheet, events) = run(&c, pages).await;

        let fetches: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                Event::Fetch(s) => Some(*s),
                _ => None,
            })
            .collect();
        assert_eq!(fetches, vec![1, 31, 61, 91]);
        for pair in events.windows(2) {
            assert!(!matches!(pair, [Event::Fetch(_), Event::Fetch(_)]));
            assert!(!matches!(pair, [Event::Pause(_), Event::Pause(_)]));
        }
        assert!(matches!(events.last(), Some(Event::Fetch(91))));
        // the last page holds only 10 items but the site may echo 30
        assert_eq!(sheet.len(), 120);
    }

    #[tokio::test]
    async fn failed_page_leaves_a_gap() {
        let c = config(90, 30);
        let pages = HashMap::from([
            (1, answer_page(vec![2; 30])),
            (61, answer_page(vec![3; 30])),
        ]);

        let (sheet, events) = run(&c, pages).await;

        // the pause still happens after the failed page
        assert_eq!(events.len(), 5);
        assert_eq!(sheet.skipped_pages(), &[2]);
        assert_eq!(sheet.len(), 60);
        assert_eq!(sheet.get(29), Some("2"));
        assert_eq!(sheet.get(30), None);
        assert_eq!(sheet.get(59), None);
        assert_eq!(sheet.get(60), Some("3"));
    }

    #[tokio::test]
    async fn short_and_long_pages() {
        let c = config(6, 3);
        let pages = HashMap::from([(1, answer_page([1, 2])), (4, answer_page([3, 4, 1, 2]))]);

        let (sheet, _) = run(&c, pages).await;

        assert_eq!(
            sheet.iter().map(|a| (a.index, a.value)).collect::<Vec<_>>(),
            vec![
                (0, "1".to_string()),
                (1, "2".to_string()),
                (3, "3".to_string()),
                (4, "4".to_string()),
                (5, "1".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn empty_page_contributes_nothing() {
        let c = config(4, 2);
        let pages = HashMap::from([(1, answer_page([])), (3, answer_page([2, 2]))]);

        let (sheet, _) = run(&c, pages).await;

        assert!(sheet.skipped_pages().is_empty());
        assert_eq!(sheet.get(0), None);
        assert_eq!(sheet.get(2), Some("2"));
    }

    #[tokio::test]
    async fn harvested_answers_merge_one_to_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("JLPT_QDB.json");
        let questions: Vec<QuestionRecord> = (0..60)
            .map(|i| QuestionRecord::new(format!("q{}", i), vec!["a".into(), "b".into()]))
            .collect();
        data::write_questions(&path, &questions, WriteMode::Overwrite)
            .await
            .unwrap();

        let c = config(60, 30);
        let pages = HashMap::from([
            (1, answer_page((0..30).map(|i| i % 4 + 1))),
            (31, answer_page((30..60).map(|i| i % 4 + 1))),
        ]);
        let (sheet, _) = run(&c, pages).await;

        let report = data::merge_answers(&path, &sheet, WriteMode::Overwrite)
            .await
            .unwrap();
        assert_eq!(report.updated, 60);
        assert!(report.skipped.is_empty());

        let merged = data::read_questions(&path).await.unwrap();
        for (i, q) in merged.iter().enumerate() {
            assert_eq!(q.answer, (i % 4 + 1).to_string());
            assert_eq!(q.context, format!("q{}", i));
        }
    }

    const QUESTION_PAGE: &str = r#"
        <table>
          <tr><td colspan="5">一つ目</td></tr>
          <tr><td><label>あ</label></td><td><label>い</label></td></tr>
          <tr><td colspan="5">二つ目</td></tr>
          <tr><td><label>う</label></td></tr>
        </table>
    "#;

    #[tokio::test]
    async fn questions_require_endpoint_before_any_request() {
        let log = Log::default();
        let fetcher = ScriptedFetcher {
            pages: HashMap::new(),
            log: log.clone(),
        };
        let dir = tempfile::tempdir().unwrap();
        let c = Config {
            output_path: dir.path().join("q.json"),
            ..Config::default()
        };

        let err = harvest_questions(&fetcher, &QuestionTableParser, &c)
            .await
            .unwrap_err();

        assert!(matches!(err, HarvestError::ConfigurationMissing("URL")));
        assert!(log.lock().unwrap().is_empty());
        assert!(!c.output_path.exists());
    }

    #[tokio::test]
    async fn questions_are_saved() {
        let log = Log::default();
        let fetcher = ScriptedFetcher {
            // the listing url has no start_num
            pages: HashMap::from([(0, QUESTION_PAGE.to_string())]),
            log: log.clone(),
        };
        let dir = tempfile::tempdir().unwrap();
        let c = Config {
            endpoint_url: Some("http://localhost/list.php".to_string()),
            output_path: dir.path().join("q.json"),
            ..Config::default()
        };

        let questions = harvest_questions(&fetcher, &QuestionTableParser, &c)
            .await
            .unwrap();

        assert_eq!(questions.len(), 2);
        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(data::read_questions(&c.output_path).await.unwrap(), questions);
        assert_eq!(questions[1].options, vec!["う".to_string()]);
    }

    #[tokio::test]
    async fn no_questions_no_file() {
        let fetcher = ScriptedFetcher {
            pages: HashMap::from([(0, "<html><body>閉鎖中</body></html>".to_string())]),
            log: Log::default(),
        };
        let dir = tempfile::tempdir().unwrap();
        let c = Config {
            endpoint_url: Some("http://localhost/list.php".to_string()),
            output_path: dir.path().join("q.json"),
            ..Config::default()
        };

        let questions = harvest_questions(&fetcher, &QuestionTableParser, &c)
            .await
            .unwrap();

        assert!(questions.is_empty());
        assert!(!c.output_path.exists());
    }

    #[tokio::test]
    async fn question_fetch_failure_propagates() {
        let fetcher = ScriptedFetcher {
            pages: HashMap::new(),
            log: Log::default(),
        };
        let c = Config {
            endpoint_url: Some("http://localhost/list.php".to_string()),
            ..Config::default()
        };

        assert!(harvest_questions(&fetcher, &QuestionTableParser, &c)
            .await
            .is_err());
    }
}
