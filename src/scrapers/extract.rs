//! Heuristic extraction of case details from the rendered results page.
//!
//! Extraction is a pure function of the page snapshot, so it can be run
//! against saved pages as well as live sessions.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use super::driver::PageSnapshot;
use crate::models::{truncate_chars, CaseOutcome, CaseRecord, NOT_AVAILABLE, RAW_CONTENT_LIMIT};
use crate::utils::{body_text, visible_text};

/// Phrases indicating the court found nothing.
pub const FAILURE_PHRASES: &[&str] = &[
    "no record found",
    "case not found",
    "invalid case",
    "not available",
    "error",
    "no data found",
    "record does not exist",
    "case does not exist",
    "invalid input",
    "no results",
    "not found",
];

/// Phrases indicating a case details page.
pub const SUCCESS_PHRASES: &[&str] = &[
    "case details",
    "case information",
    "petitioner",
    "respondent",
    "filing date",
    "next hearing",
    "case status",
    "judge",
    "court",
    "advocate",
];

/// Result containers, most specific first.
const RESULT_CONTAINERS: &[&str] = &[
    "table[class*=\"case\"]",
    "table[class*=\"result\"]",
    "table[class*=\"data\"]",
    "div[class*=\"case-detail\"]",
    "div[class*=\"result\"]",
    "#caseTable",
    ".case-info",
    "table",
];

/// Generic content containers, used when no result container qualifies.
const CONTENT_CONTAINERS: &[&str] = &[
    ".content",
    ".main",
    "#main",
    "#content",
    "div[class*=\"container\"]",
    "div[id*=\"result\"]",
];

const PDF_LINKS: &[LinkPattern] = &[
    LinkPattern::Href(".pdf"),
    LinkPattern::Text("PDF"),
    LinkPattern::Text("Download"),
    LinkPattern::Href("download"),
];

const FILING_DATE_LABELS: &[&str] = &[
    "filing date",
    "filed on",
    "date of filing",
    "registered on",
    "instituted on",
];
const NEXT_HEARING_LABELS: &[&str] = &[
    "next hearing",
    "next date",
    "hearing date",
    "next listed",
    "adjourned to",
];
const STATUS_LABELS: &[&str] = &["status", "stage", "disposed", "pending", "dismissed", "allowed"];
const JUDGE_LABELS: &[&str] = &["judge", "hon'ble", "court of", "before", "coram"];
const ADVOCATE_LABELS: &[&str] = &[
    "advocate",
    "counsel",
    "lawyer",
    "represented by",
    "for petitioner",
    "for respondent",
];

/// Body text shorter than this while still on the search page means the
/// form never went through.
const STILL_ON_FORM_MAX_CHARS: usize = 500;
const RESULT_CONTAINER_MIN_CHARS: usize = 50;
const CONTENT_CONTAINER_MIN_CHARS: usize = 100;
const MEANINGFUL_CONTENT_MIN_CHARS: usize = 200;
/// Labelled lines shorter than this are headings, not values.
const LABELLED_LINE_MIN_CHARS: usize = 10;
const FAILURE_EXCERPT_CHARS: usize = 500;

pub const STILL_ON_FORM_ERROR: &str = "Form submission may have failed - still on search page";
pub const NOT_FOUND_ERROR: &str = "Case not found in court records";
pub const NO_MEANINGFUL_DATA_ERROR: &str =
    "No meaningful case data found - possible form submission issue";

#[derive(Debug, Clone, Copy)]
enum LinkPattern {
    /// `href` contains the fragment.
    Href(&'static str),
    /// Anchor text contains the fragment (case-sensitive).
    Text(&'static str),
}

fn party_separator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\s+(?:vs\.?|versus|v/s|v\.)\s+").expect("party separator regex")
    })
}

fn party_label() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:petitioner|appellant|respondent)\s*[:\-]\s*")
            .expect("party label regex")
    })
}

/// Build a record from the page as of now. `search_url` is the form the
/// session submitted, used to tell a results page from the form itself.
pub fn extract(snapshot: &PageSnapshot, search_url: &str) -> CaseRecord {
    extract_at(snapshot, search_url, Utc::now())
}

/// Build a record from the page with a fixed extraction time.
///
/// The same snapshot and time always produce the same record.
pub fn extract_at(
    snapshot: &PageSnapshot,
    search_url: &str,
    extracted_at: DateTime<Utc>,
) -> CaseRecord {
    let document = Html::parse_document(&snapshot.html);
    let body = body_text(&document);
    let body_lower = body.to_lowercase();

    if on_search_page(&snapshot.url, search_url)
        && body.trim().chars().count() < STILL_ON_FORM_MAX_CHARS
    {
        warn!("Still on the search page after submission");
        return failed(snapshot, &body, STILL_ON_FORM_ERROR, extracted_at);
    }

    let failure_found = contains_any(&body_lower, FAILURE_PHRASES);
    let success_found = contains_any(&body_lower, SUCCESS_PHRASES);
    if failure_found && !success_found {
        info!("Court reported no matching case");
        return failed(snapshot, &body, NOT_FOUND_ERROR, extracted_at);
    }

    let content = localize(&document).unwrap_or_else(|| {
        debug!("Using full page text for extraction");
        body.clone()
    });

    let mut record = CaseRecord::blank(&snapshot.url, extracted_at);
    scan_lines(&content, &mut record);

    if let Some(link) = find_pdf_link(&document, &snapshot.url) {
        record.pdf_link = link;
    }
    record.raw_content = truncate_chars(&content, RAW_CONTENT_LIMIT);

    if !record.has_meaningful_data() && content.trim().chars().count() < MEANINGFUL_CONTENT_MIN_CHARS
    {
        warn!("No meaningful case data on results page");
        record.status = CaseOutcome::Failed;
        record.error = Some(NO_MEANINGFUL_DATA_ERROR.to_string());
    } else {
        info!("Case information extracted");
    }

    record
}

fn failed(
    snapshot: &PageSnapshot,
    body: &str,
    message: &str,
    extracted_at: DateTime<Utc>,
) -> CaseRecord {
    let mut record = CaseRecord::failed(message, extracted_at);
    record.source_url = snapshot.url.clone();
    record.raw_content = truncate_chars(body, FAILURE_EXCERPT_CHARS);
    record
}

/// Same host and path as the search form; query and fragment are ignored.
fn on_search_page(current: &str, search_url: &str) -> bool {
    match (url::Url::parse(current), url::Url::parse(search_url)) {
        (Ok(current), Ok(search)) => {
            current.host_str() == search.host_str()
                && current.path().trim_end_matches('/') == search.path().trim_end_matches('/')
        }
        _ => current.starts_with(search_url),
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Find the text of the element most likely to hold the case details.
fn localize(document: &Html) -> Option<String> {
    for css in RESULT_CONTAINERS {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        for element in document.select(&selector) {
            let text = visible_text(element);
            if text.chars().count() > RESULT_CONTAINER_MIN_CHARS
                && contains_any(&text.to_lowercase(), SUCCESS_PHRASES)
            {
                debug!("Case data located via {}", css);
                return Some(text);
            }
        }
    }

    for css in CONTENT_CONTAINERS {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        for element in document.select(&selector) {
            let text = visible_text(element);
            if text.chars().count() > CONTENT_CONTAINER_MIN_CHARS {
                debug!("Content area located via {}", css);
                return Some(text);
            }
        }
    }

    None
}

/// Walk the localized text line by line filling fields. The first line to
/// yield a value for a field wins.
fn scan_lines(content: &str, record: &mut CaseRecord) {
    let lines: Vec<&str> = content.lines().map(str::trim).collect();

    for (i, line) in lines.iter().enumerate() {
        if line.chars().count() < 3 {
            continue;
        }
        let lower = line.to_lowercase();
        let next = lines.get(i + 1).copied();

        if is_unset(&record.parties) {
            if let Some(parties) = split_parties(line) {
                record.case_info = line.to_string();
                record.parties = parties;
            }
        }

        if is_unset(&record.filing_date) && contains_any(&lower, FILING_DATE_LABELS) {
            if let Some(date) = dated_value(line, FILING_DATE_LABELS, next) {
                record.filing_date = date;
            }
        }

        if is_unset(&record.next_hearing) && contains_any(&lower, NEXT_HEARING_LABELS) {
            if let Some(date) = dated_value(line, NEXT_HEARING_LABELS, next) {
                record.next_hearing = date;
            }
        }

        let long_enough = line.chars().count() > LABELLED_LINE_MIN_CHARS;
        if long_enough && is_unset(&record.case_status) && contains_any(&lower, STATUS_LABELS) {
            record.case_status = labelled_value(line, STATUS_LABELS);
        }
        if long_enough && is_unset(&record.judge) && contains_any(&lower, JUDGE_LABELS) {
            record.judge = labelled_value(line, JUDGE_LABELS);
        }
        if long_enough && is_unset(&record.advocate) && contains_any(&lower, ADVOCATE_LABELS) {
            record.advocate = labelled_value(line, ADVOCATE_LABELS);
        }
    }
}

fn is_unset(value: &str) -> bool {
    value == NOT_AVAILABLE
}

/// Split a case title into "Petitioner: X, Respondent: Y".
fn split_parties(line: &str) -> Option<String> {
    // A tab-separated table row may carry the title in one of its cells.
    let title = line
        .split('\t')
        .find(|cell| party_separator().is_match(cell))?;
    let mut parts = party_separator().splitn(title, 2);
    let petitioner = strip_party_label(parts.next()?);
    let respondent = strip_party_label(parts.next()?);
    if petitioner.is_empty() || respondent.is_empty() {
        return None;
    }
    Some(format!(
        "Petitioner: {}, Respondent: {}",
        petitioner, respondent
    ))
}

fn strip_party_label(part: &str) -> String {
    party_label().replace(part.trim(), "").trim().to_string()
}

/// Non-empty cells of a line; table rows render as tab-separated cells.
fn cells(line: &str) -> Vec<&str> {
    line.split('\t')
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .collect()
}

/// Index of the first cell carrying one of the labels.
fn label_cell(cells: &[&str], labels: &[&str]) -> Option<usize> {
    cells
        .iter()
        .position(|cell| contains_any(&cell.to_lowercase(), labels))
}

/// The value paired with a label: the text after the colon in a
/// `Label: value` cell, else the cell that follows the label cell.
fn cell_value(line: &str, labels: &[&str]) -> Option<String> {
    let cells = cells(line);
    let at = label_cell(&cells, labels)?;
    if let Some((_, value)) = cells[at].split_once(':') {
        let value = value.trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }
    cells.get(at + 1).map(|cell| cell.to_string())
}

/// A date-like value for a labelled line: the value paired with the label
/// on the same line, else the following line.
fn dated_value(line: &str, labels: &[&str], next: Option<&str>) -> Option<String> {
    if let Some(value) = cell_value(line, labels).filter(|v| has_digit(v)) {
        return Some(value);
    }
    next.filter(|n| has_digit(n) && n.chars().count() > 5)
        .map(|n| n.to_string())
}

fn has_digit(s: &str) -> bool {
    s.chars().any(|c| c.is_ascii_digit())
}

/// The value paired with the label, or the labelled cell itself.
fn labelled_value(line: &str, labels: &[&str]) -> String {
    if let Some(value) = cell_value(line, labels) {
        return value;
    }
    let cells = cells(line);
    match label_cell(&cells, labels) {
        Some(at) => cells[at].to_string(),
        None => line.trim().to_string(),
    }
}

fn find_pdf_link(document: &Html, base_url: &str) -> Option<String> {
    let anchors = Selector::parse("a[href]").ok()?;
    for pattern in PDF_LINKS {
        for anchor in document.select(&anchors) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let matched = match pattern {
                LinkPattern::Href(fragment) => href.contains(fragment),
                LinkPattern::Text(fragment) => anchor_text(anchor).contains(fragment),
            };
            if matched {
                return Some(resolve(base_url, href));
            }
        }
    }
    None
}

fn anchor_text(anchor: ElementRef<'_>) -> String {
    anchor.text().collect::<String>()
}

fn resolve(base_url: &str, href: &str) -> String {
    url::Url::parse(base_url)
        .and_then(|base| base.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}
