use itertools::Itertools;
use lazy_regex::regex;
use scraper::ElementRef;

/// Text content of an element with whitespace runs collapsed and the ends trimmed.
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    clean_text(&el.text().join(""))
}

pub(crate) fn clean_text(s: &str) -> String {
    regex!(r"\s+").replace_all(s, " ").trim().to_string()
}
