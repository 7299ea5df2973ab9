use crate::contribution::EntityDetail;
use questers_protocol::{Bucket, ReportConfig};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Named signal tags at the data layer. Display glyphs are mapped only in
/// the renderer, so annotation logic stays testable without symbol matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalTag {
    HighBot,
    Healthy,
    EarlyBotWarning,
    QualityImproving,
    BotRateSwing,
    TopMover,
}

impl SignalTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalTag::HighBot => "HIGH_BOT",
            SignalTag::Healthy => "HEALTHY",
            SignalTag::EarlyBotWarning => "EARLY_BOT_WARNING",
            SignalTag::QualityImproving => "QUALITY_IMPROVING",
            SignalTag::BotRateSwing => "BOT_RATE_SWING",
            SignalTag::TopMover => "TOP_MOVER",
        }
    }
}

impl fmt::Display for SignalTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered highest risk first, which is also the watch-table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::High => "High",
            RiskLevel::Medium => "Medium",
            RiskLevel::Low => "Low",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchEntry {
    pub entity_id: String,
    pub signal: SignalTag,
    pub risk: RiskLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Annotations {
    /// Per-entity tags, in the fixed rule order below.
    pub tags: BTreeMap<String, Vec<SignalTag>>,
    /// Deduplicated by entity (highest risk wins), ordered by risk, then
    /// descending |user_delta|, then entity id.
    pub watch: Vec<WatchEntry>,
}

impl Annotations {
    pub fn tags_for(&self, entity_id: &str) -> &[SignalTag] {
        self.tags.get(entity_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_tag(&self, entity_id: &str, tag: SignalTag) -> bool {
        self.tags_for(entity_id).contains(&tag)
    }
}

/// Tag entities and assemble the watch list using the fixed thresholds from
/// the config. Thresholds are exact so reports stay reproducible.
pub fn annotate(details: &[EntityDetail], config: &ReportConfig) -> Annotations {
    let alert_pct = config.bot_alert_pct();
    let mut annotations = Annotations::default();

    for detail in details {
        let mut tags = Vec::new();
        if detail.curr_bot_rate >= alert_pct {
            tags.push(SignalTag::HighBot);
        } else if detail.contribution.human_delta > 0 {
            tags.push(SignalTag::Healthy);
        }
        if detail.bucket == Bucket::New && detail.curr_bot_rate > alert_pct {
            tags.push(SignalTag::EarlyBotWarning);
        }
        if detail.bucket == Bucket::Continuing
            && detail.contribution.bot_delta < 0
            && detail.contribution.human_delta > 0
        {
            tags.push(SignalTag::QualityImproving);
        }
        if !tags.is_empty() {
            annotations
                .tags
                .insert(detail.snapshot.entity_id.clone(), tags);
        }
    }

    // Watch list: keep the highest-risk signal per entity.
    let mut watch: BTreeMap<String, (SignalTag, RiskLevel)> = BTreeMap::new();

    for detail in details {
        let id = detail.snapshot.entity_id.as_str();
        if detail.bucket == Bucket::New && detail.curr_bot_rate > alert_pct {
            offer(&mut watch, id, SignalTag::EarlyBotWarning, RiskLevel::High);
        }
        if (detail.curr_bot_rate - detail.prev_bot_rate).abs() > config.watch_rate_swing_pp {
            offer(&mut watch, id, SignalTag::BotRateSwing, RiskLevel::Medium);
        }
    }

    let mut by_magnitude: Vec<&EntityDetail> = details.iter().collect();
    by_magnitude.sort_by(|a, b| {
        b.contribution
            .user_delta
            .abs()
            .cmp(&a.contribution.user_delta.abs())
            .then_with(|| a.snapshot.entity_id.cmp(&b.snapshot.entity_id))
    });
    for detail in by_magnitude.iter().take(3) {
        offer(
            &mut watch,
            detail.snapshot.entity_id.as_str(),
            SignalTag::TopMover,
            RiskLevel::Low,
        );
    }

    let magnitude: BTreeMap<&str, i64> = details
        .iter()
        .map(|d| (d.snapshot.entity_id.as_str(), d.contribution.user_delta.abs()))
        .collect();

    let mut entries: Vec<WatchEntry> = watch
        .into_iter()
        .map(|(entity_id, (signal, risk))| WatchEntry {
            entity_id,
            signal,
            risk,
        })
        .collect();
    entries.sort_by(|a, b| {
        a.risk
            .cmp(&b.risk)
            .then_with(|| {
                magnitude
                    .get(b.entity_id.as_str())
                    .cmp(&magnitude.get(a.entity_id.as_str()))
            })
            .then_with(|| a.entity_id.cmp(&b.entity_id))
    });
    annotations.watch = entries;

    annotations
}

fn offer(
    watch: &mut BTreeMap<String, (SignalTag, RiskLevel)>,
    entity_id: &str,
    signal: SignalTag,
    risk: RiskLevel,
) {
    match watch.entry(entity_id.to_string()) {
        std::collections::btree_map::Entry::Vacant(slot) => {
            slot.insert((signal, risk));
        }
        std::collections::btree_map::Entry::Occupied(mut slot) => {
            if risk < slot.get().1 {
                slot.insert((signal, risk));
            }
        }
    }
}
