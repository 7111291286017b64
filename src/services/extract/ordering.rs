//! Order correction for resolved image URLs.
//!
//! The blog CDN names uploads `..._<n>.<ext>`. When the popup walk yields
//! URLs whose leading sequence numbers go backwards, the whole list is
//! stably re-sorted by that number; otherwise discovery order is kept.

use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

/// How many leading URLs are inspected before trusting discovery order.
pub const CHECK_WINDOW: usize = 5;

static SEQUENCE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_(\d+)\.(jpg|jpeg|png|gif)").expect("valid sequence regex"));

/// Upload sequence number embedded in a URL.
///
/// Held as its digit string so numbers of any length compare numerically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceNumber(String);

impl SequenceNumber {
    fn from_digits(digits: &str) -> Self {
        let significant = digits.trim_start_matches('0');
        if significant.is_empty() {
            Self("0".to_string())
        } else {
            Self(significant.to_string())
        }
    }
}

impl Ord for SequenceNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for SequenceNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Embedded upload sequence number, if the URL carries one.
pub fn sequence_number(url: &str) -> Option<SequenceNumber> {
    SEQUENCE_PATTERN
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| SequenceNumber::from_digits(m.as_str()))
}

/// Numbered entries first in ascending order, unnumbered ones last.
fn numbered_first(a: &Option<SequenceNumber>, b: &Option<SequenceNumber>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Whether adjacent numbered entries in the window never decrease.
///
/// Pairs where either side has no number are ignored.
pub fn is_leading_run_sorted(numbers: &[Option<SequenceNumber>]) -> bool {
    let window = &numbers[..numbers.len().min(CHECK_WINDOW)];
    window.windows(2).all(|pair| match (&pair[0], &pair[1]) {
        (Some(a), Some(b)) => a <= b,
        _ => true,
    })
}

fn describe(numbers: &[Option<SequenceNumber>]) -> Vec<String> {
    numbers
        .iter()
        .map(|n| n.as_ref().map_or_else(|| "-".to_string(), ToString::to_string))
        .collect()
}

/// Reorder `urls` by embedded sequence number when the leading run is out of order.
///
/// Unnumbered URLs sort after all numbered ones and keep their relative order.
pub fn correct_order(urls: Vec<String>) -> Vec<String> {
    if urls.len() < 2 {
        return urls;
    }

    let mut numbered: Vec<(Option<SequenceNumber>, String)> = urls
        .into_iter()
        .map(|url| (sequence_number(&url), url))
        .collect();

    let numbers: Vec<Option<SequenceNumber>> = numbered.iter().map(|(n, _)| n.clone()).collect();
    debug!(
        "Extracted sequence numbers: {:?}",
        describe(&numbers[..numbers.len().min(10)])
    );

    if is_leading_run_sorted(&numbers) {
        debug!("Image order already ascending, keeping discovery order");
    } else {
        numbered.sort_by(|(a, _), (b, _)| numbered_first(a, b));
        let leading: Vec<Option<SequenceNumber>> = numbered
            .iter()
            .take(CHECK_WINDOW)
            .map(|(n, _)| n.clone())
            .collect();
        debug!("Image order corrected, first numbers now: {:?}", describe(&leading));
    }

    numbered.into_iter().map(|(_, url)| url).collect()
}
