use crate::annotate::{Annotations, SignalTag};
use crate::contribution::EntityDetail;
use crate::engine::DecompositionResult;
use questers_protocol::{Bucket, ReportConfig};
use std::fmt;

/// Render the full report. Byte-identical output for identical inputs: all
/// orderings are total (ties break on entity id) and all rounding goes
/// through the same float formatting (round-half-to-even) at the configured
/// precision.
pub fn render(
    result: &DecompositionResult,
    annotations: &Annotations,
    config: &ReportConfig,
) -> String {
    Report {
        result,
        annotations,
        config,
    }
    .to_string()
}

struct Report<'a> {
    result: &'a DecompositionResult,
    annotations: &'a Annotations,
    config: &'a ReportConfig,
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.headline(f)?;
        self.summary_table(f)?;
        self.decomposition(f)?;
        self.drivers(f)?;
        self.watch(f)
    }
}

impl Report<'_> {
    fn headline(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let overall = &self.result.overall;
        let delta = self.result.overall_delta;
        let wow = if overall.prev_total == 0 {
            "N/A".to_string()
        } else {
            format!(
                "{:+.*}%",
                self.config.ratio_decimals,
                100.0 * delta as f64 / overall.prev_total as f64
            )
        };
        writeln!(f, "## HEADLINE: Questers {} ({wow}) WoW", fmt_signed(delta))?;
        writeln!(
            f,
            "   {} → {}",
            fmt_count(overall.prev_total),
            fmt_count(overall.curr_total)
        )?;
        writeln!(f)
    }

    fn summary_table(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let overall = &self.result.overall;
        let d = self.config.percent_decimals;

        writeln!(f, "| Metric | Prev | Curr | Δ |")?;
        writeln!(f, "|--------|------|------|---|")?;
        for (label, prev, curr) in [
            ("Total questers", overall.prev_total, overall.curr_total),
            ("Human questers", overall.prev_human(), overall.curr_human()),
            ("Bot questers", overall.prev_flagged, overall.curr_flagged),
        ] {
            writeln!(
                f,
                "| {label} | {} | {} | {} |",
                fmt_count(prev),
                fmt_count(curr),
                fmt_signed(curr as i64 - prev as i64)
            )?;
        }
        let prev_rate = overall.prev_bot_rate();
        let curr_rate = overall.curr_bot_rate();
        writeln!(
            f,
            "| Bot rate | {prev_rate:.d$}% | {curr_rate:.d$}% | {:+.d$}pp |",
            curr_rate - prev_rate,
            d = d,
        )?;
        writeln!(f)
    }

    fn decomposition(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## DECOMPOSITION")?;
        writeln!(f)?;
        writeln!(f, "| Bucket | User Δ | Human Δ | Bot Δ | % of Total |")?;
        writeln!(f, "|--------|--------|---------|-------|------------|")?;
        for bucket in Bucket::ALL {
            let c = &self.result.bucket_contributions[&bucket];
            writeln!(
                f,
                "| {bucket} | {} | {} | {} | {} |",
                fmt_signed(c.contribution.user_delta),
                fmt_signed(c.contribution.human_delta),
                fmt_signed(c.contribution.bot_delta),
                self.fmt_pct_opt(c.pct_of_total),
            )?;
        }
        writeln!(f)?;

        self.tree(f)?;
        self.reconciliation(f)
    }

    fn tree(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.config.percent_decimals;

        self.bucket_header(f, "+", Bucket::New)?;
        for detail in self.bucket_details(Bucket::New) {
            let glyph = self.new_glyph(&detail.snapshot.entity_id);
            writeln!(
                f,
                "      └─ {}: {} ({:.d$}% bots){glyph}",
                detail.snapshot.entity_id,
                fmt_signed(detail.contribution.user_delta),
                detail.curr_bot_rate,
                d = d,
            )?;
        }

        self.bucket_header(f, "-", Bucket::Discontinued)?;
        for detail in self.bucket_details(Bucket::Discontinued) {
            writeln!(
                f,
                "      └─ {}: {} (was {:.d$}% bots)",
                detail.snapshot.entity_id,
                fmt_signed(detail.contribution.user_delta),
                detail.prev_bot_rate,
                d = d,
            )?;
        }

        self.bucket_header(f, "±", Bucket::Continuing)?;
        let mut continuing = self.bucket_details(Bucket::Continuing);

        writeln!(f, "      Growth:")?;
        continuing.sort_by(|a, b| {
            b.contribution
                .user_delta
                .cmp(&a.contribution.user_delta)
                .then_with(|| a.snapshot.entity_id.cmp(&b.snapshot.entity_id))
        });
        for detail in continuing.iter().take(self.config.top_growth_rows) {
            self.continuing_line(f, detail)?;
        }

        writeln!(f, "      Decline:")?;
        continuing.sort_by(|a, b| {
            a.contribution
                .user_delta
                .cmp(&b.contribution.user_delta)
                .then_with(|| a.snapshot.entity_id.cmp(&b.snapshot.entity_id))
        });
        for detail in continuing.iter().take(self.config.top_decline_rows) {
            self.continuing_line(f, detail)?;
        }
        Ok(())
    }

    fn bucket_header(&self, f: &mut fmt::Formatter<'_>, sign: &str, bucket: Bucket) -> fmt::Result {
        let c = &self.result.bucket_contributions[&bucket];
        writeln!(
            f,
            "  {sign} {}: {}  ({} of change)",
            bucket,
            fmt_signed(c.contribution.user_delta),
            self.fmt_pct_opt(c.pct_of_total),
        )
    }

    fn continuing_line(&self, f: &mut fmt::Formatter<'_>, detail: &EntityDetail) -> fmt::Result {
        let d = self.config.percent_decimals;
        let id = &detail.snapshot.entity_id;
        let mut glyphs = String::new();
        if self.annotations.has_tag(id, SignalTag::HighBot) {
            glyphs.push_str(" ⚠️");
        }
        if self.annotations.has_tag(id, SignalTag::QualityImproving) {
            glyphs.push_str(" ▲");
        }
        writeln!(
            f,
            "        └─ {id}: {} (bots {:.d$}% → {:.d$}%){glyphs}",
            fmt_signed(detail.contribution.user_delta),
            detail.prev_bot_rate,
            detail.curr_bot_rate,
            d = d,
        )
    }

    fn reconciliation(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.result.reconciliation;
        writeln!(f, "  ─────────────────────────────")?;
        writeln!(
            f,
            "  = Bucket sum: {}   Overall delta: {}   Discrepancy: {}",
            fmt_signed(r.bucket_sum),
            fmt_signed(r.overall_delta),
            fmt_signed(r.discrepancy)
        )?;
        if let Some(note) = &r.note {
            writeln!(f, "  note: {note}")?;
        }
        writeln!(f)
    }

    fn drivers(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## DRIVERS")?;
        writeln!(f)?;
        for bullet in driver_bullets(self.result, self.annotations, self.config) {
            writeln!(f, "- {bullet}")?;
        }
        writeln!(f)
    }

    fn watch(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## WATCH")?;
        writeln!(f)?;
        if self.annotations.watch.is_empty() {
            return writeln!(f, "(none)");
        }
        writeln!(f, "| Entity | Signal | Risk |")?;
        writeln!(f, "|--------|--------|------|")?;
        for entry in &self.annotations.watch {
            writeln!(f, "| {} | {} | {} |", entry.entity_id, entry.signal, entry.risk)?;
        }
        Ok(())
    }

    fn bucket_details(&self, bucket: Bucket) -> Vec<&EntityDetail> {
        // entity_details is already bucket-major, |delta| descending.
        self.result
            .entity_details
            .iter()
            .filter(|detail| detail.bucket == bucket)
            .collect()
    }

    fn new_glyph(&self, entity_id: &str) -> &'static str {
        if self.annotations.has_tag(entity_id, SignalTag::HighBot) {
            " ⚠️"
        } else if self.annotations.has_tag(entity_id, SignalTag::Healthy) {
            " ✓"
        } else {
            ""
        }
    }

    fn fmt_pct_opt(&self, pct: Option<f64>) -> String {
        match pct {
            Some(value) => format!("{:+.*}%", self.config.percent_decimals, value),
            None => "N/A".to_string(),
        }
    }
}

/// Deterministic narrative bullets: largest bucket first, then per-entity
/// drivers by descending |user_delta|, then the reconciliation gap. Capped
/// at five; padded to three with overall-mix bullets when quiet.
fn driver_bullets(
    result: &DecompositionResult,
    annotations: &Annotations,
    config: &ReportConfig,
) -> Vec<String> {
    let d = config.percent_decimals;
    let mut bullets = Vec::new();

    // max_by_key keeps the last of equals, so reverse to prefer bucket order
    // on ties.
    let largest = Bucket::ALL
        .iter()
        .rev()
        .copied()
        .max_by_key(|bucket| {
            result.bucket_contributions[bucket]
                .contribution
                .user_delta
                .abs()
        })
        .unwrap_or(Bucket::Continuing);
    let largest_c = &result.bucket_contributions[&largest];
    let pct = match largest_c.pct_of_total {
        Some(value) => format!("{:+.d$}% of change", value, d = d),
        None => "N/A of change".to_string(),
    };
    bullets.push(format!(
        "Largest driver: {largest} ({}, {pct})",
        fmt_signed(largest_c.contribution.user_delta)
    ));

    let mut movers: Vec<&EntityDetail> = result.entity_details.iter().collect();
    movers.sort_by(|a, b| {
        b.contribution
            .user_delta
            .abs()
            .cmp(&a.contribution.user_delta.abs())
            .then_with(|| a.snapshot.entity_id.cmp(&b.snapshot.entity_id))
    });

    let mut entity_bullets = Vec::new();
    for detail in movers {
        if let Some(bullet) = entity_driver(detail, annotations, config) {
            entity_bullets.push(bullet);
        }
    }

    let mut tail = Vec::new();
    if result.reconciliation.discrepancy != 0 {
        tail.push(format!(
            "Bucket sum {} vs overall {}: multi-game questers account for the {} gap",
            fmt_signed(result.reconciliation.bucket_sum),
            fmt_signed(result.reconciliation.overall_delta),
            fmt_signed(result.reconciliation.discrepancy)
        ));
    }

    let room = 5usize.saturating_sub(bullets.len() + tail.len());
    entity_bullets.truncate(room);
    bullets.extend(entity_bullets);
    bullets.extend(tail);

    if bullets.len() < 3 {
        let overall = &result.overall;
        bullets.push(format!(
            "Overall bot rate {:.d$}% → {:.d$}% ({:+.d$}pp)",
            overall.prev_bot_rate(),
            overall.curr_bot_rate(),
            overall.curr_bot_rate() - overall.prev_bot_rate(),
            d = d,
        ));
    }
    if bullets.len() < 3 {
        let overall = &result.overall;
        let human_share = if overall.curr_total == 0 {
            0.0
        } else {
            100.0 * overall.curr_human() as f64 / overall.curr_total as f64
        };
        bullets.push(format!(
            "Current mix: {} humans ({human_share:.d$}%), {} bots",
            fmt_count(overall.curr_human()),
            fmt_count(overall.curr_flagged),
            d = d,
        ));
    }

    bullets
}

fn entity_driver(
    detail: &EntityDetail,
    annotations: &Annotations,
    config: &ReportConfig,
) -> Option<String> {
    let d = config.percent_decimals;
    let id = &detail.snapshot.entity_id;
    let delta = detail.contribution.user_delta;

    match detail.bucket {
        Bucket::New => {
            let quality = if annotations.has_tag(id, SignalTag::HighBot) {
                format!("{:.d$}% bots", detail.curr_bot_rate, d = d)
            } else {
                "quality launch".to_string()
            };
            Some(format!("{id}: NEW launch ({}), {quality}", fmt_signed(delta)))
        }
        Bucket::Discontinued => Some(format!(
            "{id}: discontinued ({}, was {:.d$}% bots)",
            fmt_signed(delta),
            detail.prev_bot_rate,
            d = d,
        )),
        Bucket::Continuing => {
            if detail.snapshot.prev_total == 0 {
                return None;
            }
            let pct = 100.0 * delta as f64 / detail.snapshot.prev_total as f64;
            if detail.prev_bot_rate > 80.0 && pct < -50.0 {
                Some(format!(
                    "{id}: bot cleanup (was {:.d$}% bots) → {}",
                    detail.prev_bot_rate,
                    fmt_signed(delta),
                    d = d,
                ))
            } else if detail.curr_bot_rate > detail.prev_bot_rate + 20.0 && pct > 20.0 {
                Some(format!(
                    "{id}: bot influx ({:.d$}% → {:.d$}% bots) → {}",
                    detail.prev_bot_rate,
                    detail.curr_bot_rate,
                    fmt_signed(delta),
                    d = d,
                ))
            } else if pct > 30.0 {
                Some(format!(
                    "{id}: growth {:+.r$}% ({})",
                    pct,
                    fmt_signed(delta),
                    r = config.ratio_decimals,
                ))
            } else if pct < -30.0 {
                Some(format!(
                    "{id}: decline {:+.r$}% ({})",
                    pct,
                    fmt_signed(delta),
                    r = config.ratio_decimals,
                ))
            } else {
                None
            }
        }
    }
}

/// "25000" → "25,000".
pub(crate) fn fmt_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Always-signed grouped integer: "+2,100", "-500", "+0".
pub(crate) fn fmt_signed(value: i64) -> String {
    if value < 0 {
        format!("-{}", fmt_count(value.unsigned_abs()))
    } else {
        format!("+{}", fmt_count(value as u64))
    }
}
