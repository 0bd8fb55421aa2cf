use crate::domain::model::{SalaryRange, SalarySource};
use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};

/// Marker vocabulary for free-form salary strings.
///
/// Matching happens on lowercased text with all whitespace stripped, so
/// multi-word markers like "не указана" match too.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalaryTokens {
    pub from: Vec<String>,
    pub to: Vec<String>,
    pub currency: Vec<String>,
    pub unspecified: Vec<String>,
}

impl Default for SalaryTokens {
    fn default() -> Self {
        Self {
            from: vec!["от".to_string()],
            to: vec!["до".to_string()],
            currency: vec!["руб".to_string()],
            unspecified: vec!["не указана".to_string()],
        }
    }
}

fn compact(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// First marker from `tokens` occurring in `haystack`, in compacted form.
fn find_marker(haystack: &str, tokens: &[String]) -> Option<String> {
    tokens
        .iter()
        .map(|t| compact(t))
        .find(|t| !t.is_empty() && haystack.contains(t.as_str()))
}

fn parse_amount(original: &str, digits: &str) -> Result<i64> {
    let value = digits
        .parse::<i64>()
        .map_err(|e| EtlError::SalaryParseError {
            text: original.to_string(),
            reason: e.to_string(),
        })?;
    if value < 0 {
        return Err(EtlError::SalaryParseError {
            text: original.to_string(),
            reason: "negative salary".to_string(),
        });
    }
    Ok(value)
}

// Floor division keeps the midpoint integral.
fn midpoint(from: i64, to: i64) -> i64 {
    (from + to).div_euclid(2)
}

/// Reduce a free-form salary string to a single integer.
///
/// An "unspecified" marker wins over everything else. A from/to pair
/// averages to the floor midpoint, a lone bound stands for itself, and a
/// bare amount with a currency marker is taken verbatim. Text matching
/// none of the markers yields `None`; malformed digits inside a matched
/// branch are a per-record error.
pub fn from_text(raw: &str, tokens: &SalaryTokens) -> Result<Option<i64>> {
    let text = compact(raw);

    if find_marker(&text, &tokens.unspecified).is_some() {
        return Ok(None);
    }

    let from_marker = find_marker(&text, &tokens.from);
    let to_marker = find_marker(&text, &tokens.to);

    match (from_marker, to_marker) {
        (Some(from_tok), Some(to_tok)) => {
            // `to_tok` is known to occur, split_once cannot fail
            let (left, right) = text
                .split_once(to_tok.as_str())
                .ok_or_else(|| EtlError::SalaryParseError {
                    text: raw.to_string(),
                    reason: "range marker vanished during split".to_string(),
                })?;
            let lower = parse_amount(raw, &left.replace(from_tok.as_str(), ""))?;
            let upper = parse_amount(raw, right)?;
            Ok(Some(midpoint(lower, upper)))
        }
        (Some(from_tok), None) => Ok(Some(parse_amount(
            raw,
            &text.replace(from_tok.as_str(), ""),
        )?)),
        (None, Some(to_tok)) => Ok(Some(parse_amount(raw, &text.replace(to_tok.as_str(), ""))?)),
        (None, None) => match find_marker(&text, &tokens.currency) {
            Some(currency_tok) => {
                let amount = match text.find(currency_tok.as_str()) {
                    Some(pos) => &text[..pos],
                    None => "",
                };
                Ok(Some(parse_amount(raw, amount)?))
            }
            None => Ok(None),
        },
    }
}

/// Reduce a structured range to a single integer. Presence counts, not
/// truthiness: a bound of 0 is still a bound.
pub fn from_range(range: &SalaryRange) -> Option<i64> {
    match (range.from, range.to) {
        (Some(from), Some(to)) => Some(midpoint(from, to)),
        (Some(from), None) => Some(from),
        (None, Some(to)) => Some(to),
        (None, None) => None,
    }
}

pub fn normalize(source: &SalarySource, tokens: &SalaryTokens) -> Result<Option<i64>> {
    match source {
        SalarySource::Range(range) => Ok(from_range(range)),
        SalarySource::Text(text) => from_text(text, tokens),
    }
}
