use super::QuestionRecord;
use crate::{utils, PageParser};
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

const E: &str = "Invalid selector";
lazy_static! {
    static ref ROW: Selector = Selector::parse("table tr").expect(E);
    static ref QUESTION_CELL: Selector = Selector::parse(r#"td[colspan="5"]"#).expect(E);
    static ref OPTION_LABEL: Selector = Selector::parse("td label").expect(E);
    static ref REVEALED_ANSWER: Selector =
        Selector::parse(r#"table input[name="r_ans"]"#).expect(E);
}

/// Reads the question listing: a row with a five-column-wide cell holds the
/// prompt, and the row right after it holds one `label` per choice.
#[derive(Debug)]
pub struct QuestionTableParser;

impl PageParser for QuestionTableParser {
    type Record = QuestionRecord;

    fn parse(&self, doc: &Html) -> Vec<Self::Record> {
        let mut records = vec![];
        for row in doc.select(&ROW) {
            let context = utils::clean_text(
                &row.select(&QUESTION_CELL)
                    .flat_map(|cell| cell.text())
                    .collect::<String>(),
            );
            if context.is_empty() {
                continue;
            }

            let options: Vec<String> = row
                .next_siblings()
                .find_map(ElementRef::wrap)
                .map(|next| {
                    next.select(&OPTION_LABEL)
                        .map(utils::element_text)
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default();

            if options.is_empty() {
                debug!("Question without options skipped: {}", context);
                continue;
            }

            records.push(QuestionRecord::new(context, options));
        }
        records
    }
}

/// Reads the graded page returned after submitting placeholder answers. The
/// correct choice of every item comes back as a hidden `r_ans` input.
#[derive(Debug)]
pub struct RevealedAnswerParser;

impl PageParser for RevealedAnswerParser {
    type Record = String;

    fn parse(&self, doc: &Html) -> Vec<Self::Record> {
        let answers: Vec<String> = doc
            .select(&REVEALED_ANSWER)
            .map(|input| input.value().attr("value").unwrap_or_default().to_string())
            .collect();

        if answers.is_empty() {
            warn!("No revealed answers found, the page layout may have changed");
        }
        answers
    }
}
