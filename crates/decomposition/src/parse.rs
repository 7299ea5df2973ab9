use crate::contribution::Contribution;
use questers_protocol::Bucket;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("report is missing the '{0}' row")]
    MissingRow(&'static str),

    #[error("report is missing the reconciliation line")]
    MissingReconciliation,

    #[error("could not parse '{raw}' in the {field} field")]
    BadNumber { field: &'static str, raw: String },
}

/// Numeric fields recovered from a rendered report's summary and
/// decomposition tables. Counts and deltas are printed exactly (only rates
/// are rounded), so a parse of `render(...)` output is lossless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSummary {
    pub prev_total: u64,
    pub curr_total: u64,
    pub prev_human: u64,
    pub curr_human: u64,
    pub prev_bot: u64,
    pub curr_bot: u64,
    pub total_delta: i64,
    pub buckets: BTreeMap<Bucket, Contribution>,
    pub bucket_sum: i64,
    pub overall_delta: i64,
    pub discrepancy: i64,
}

/// Re-parse a rendered report. The inverse of the renderer for every field
/// that is printed without rounding.
pub fn parse_summary(report: &str) -> Result<ParsedSummary, ParseError> {
    let (prev_total, curr_total, total_delta) = metric_row(report, "Total questers")?;
    let (prev_human, curr_human, _) = metric_row(report, "Human questers")?;
    let (prev_bot, curr_bot, _) = metric_row(report, "Bot questers")?;

    let mut buckets = BTreeMap::new();
    for bucket in Bucket::ALL {
        buckets.insert(bucket, bucket_row(report, bucket)?);
    }

    let line = report
        .lines()
        .find(|line| line.trim_start().starts_with("= Bucket sum:"))
        .ok_or(ParseError::MissingReconciliation)?;
    let bucket_sum = field_after(line, "Bucket sum:", "bucket sum")?;
    let overall_delta = field_after(line, "Overall delta:", "overall delta")?;
    let discrepancy = field_after(line, "Discrepancy:", "discrepancy")?;

    Ok(ParsedSummary {
        prev_total,
        curr_total,
        prev_human,
        curr_human,
        prev_bot,
        curr_bot,
        total_delta,
        buckets,
        bucket_sum,
        overall_delta,
        discrepancy,
    })
}

fn table_row<'a>(report: &'a str, label: &'static str) -> Result<Vec<&'a str>, ParseError> {
    let prefix = format!("| {label} |");
    let line = report
        .lines()
        .find(|line| line.starts_with(&prefix))
        .ok_or(ParseError::MissingRow(label))?;
    // "| A | B | C |" → ["A", "B", "C"]
    Ok(line
        .split('|')
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .skip(1)
        .collect())
}

fn metric_row(report: &str, label: &'static str) -> Result<(u64, u64, i64), ParseError> {
    let cells = table_row(report, label)?;
    if cells.len() < 3 {
        return Err(ParseError::MissingRow(label));
    }
    Ok((
        parse_count(cells[0], label)?,
        parse_count(cells[1], label)?,
        parse_delta(cells[2], label)?,
    ))
}

fn bucket_row(report: &str, bucket: Bucket) -> Result<Contribution, ParseError> {
    let cells = table_row(report, bucket.label())?;
    if cells.len() < 3 {
        return Err(ParseError::MissingRow(bucket.label()));
    }
    Ok(Contribution {
        user_delta: parse_delta(cells[0], "user delta")?,
        human_delta: parse_delta(cells[1], "human delta")?,
        bot_delta: parse_delta(cells[2], "bot delta")?,
    })
}

fn field_after(line: &str, marker: &str, field: &'static str) -> Result<i64, ParseError> {
    let rest = line.split(marker).nth(1).ok_or(ParseError::MissingReconciliation)?;
    let raw = rest.split_whitespace().next().unwrap_or("");
    parse_delta(raw, field)
}

fn parse_count(raw: &str, field: &'static str) -> Result<u64, ParseError> {
    raw.replace(',', "")
        .parse()
        .map_err(|_| ParseError::BadNumber {
            field,
            raw: raw.to_string(),
        })
}

fn parse_delta(raw: &str, field: &'static str) -> Result<i64, ParseError> {
    raw.replace(',', "")
        .trim_start_matches('+')
        .parse()
        .map_err(|_| ParseError::BadNumber {
            field,
            raw: raw.to_string(),
        })
}
