use crate::HarvestError;
use reqwest::Url;

pub const ANSWER_ENDPOINT: &str = "http://www.n-lab.org/library/mondaidata/test.php";

/// Builds the answer-submission URLs. Every item on a page is submitted with the
/// placeholder answer `1`; the response then reveals the correct one.
#[derive(Debug, Clone)]
pub struct AnswerQuery {
    base: Url,
    data_count: usize,
}

impl AnswerQuery {
    pub fn new(endpoint: &str, data_count: usize) -> Result<Self, HarvestError> {
        let base = Url::parse(endpoint).map_err(|e| HarvestError::InvalidUrl {
            url: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { base, data_count })
    }

    /// `start` is the 1-based number of the first item on the page. The range is
    /// not clamped to `data_count`.
    pub fn page_url(&self, start: usize, page_size: usize) -> Url {
        let mut url = self.base.clone();
        {
            let mut q = url.query_pairs_mut();
            q.clear()
                .append_pair("mode", "html")
                .append_pair("dbupdate", "1")
                .append_pair("data_count", &self.data_count.to_string())
                .append_pair("start_num", &start.to_string())
                .append_pair("show_num", &page_size.to_string())
                .append_pair("kyu", "2")
                .append_pair("syu", "")
                .append_pair("target", "all")
                .append_pair("word", "")
                .append_pair("type", "and")
                .append_pair("sort", "percent desc")
                .append_pair("test_num", "")
                .append_pair("checkbox", "checkbox")
                .append_pair("send", "チェック")
                .append_pair("rows", "10");

            for i in start..start + page_size {
                // the site reads a bare, unindexed `r_ans`
                q.append_pair(&format!("id[{}]", i), "")
                    .append_pair("r_ans", "1")
                    .append_pair(&format!("syutsu[{}]", i), "")
                    .append_pair(&format!("seikai[{}]", i), "");
            }
        }
        url
    }
}
