/// Display-tier classification for planning projects and their neighbours on the
/// dashboard (reports, moderated comments).
///
/// Every lookup is an exact match against canonical labels and falls back to
/// [`Palette::Neutral`] (or [`ScoreTier::Low`]) instead of failing. Callers never need to
/// validate input before classifying.
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Palette {
    Green,
    Blue,
    Purple,
    Yellow,
    Orange,
    Indigo,
    Red,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreTier {
    High,
    MediumHigh,
    MediumLow,
    Low,
}

impl ScoreTier {
    /// Thresholds are inclusive lower bounds checked from the top. No clamping: 150 is
    /// still `High` and negative scores are `Low`.
    pub fn from_score(score: i64) -> Self {
        if score >= 90 {
            ScoreTier::High
        } else if score >= 70 {
            ScoreTier::MediumHigh
        } else if score >= 50 {
            ScoreTier::MediumLow
        } else {
            ScoreTier::Low
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            ScoreTier::High => Palette::Green,
            ScoreTier::MediumHigh => Palette::Blue,
            ScoreTier::MediumLow => Palette::Yellow,
            ScoreTier::Low => Palette::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectStatus {
    Draft,
    Planning,
    Approved,
    InProgress,
    Completed,
    Other,
}

impl ProjectStatus {
    pub fn from_label(label: &str) -> Self {
        match label {
            "Draft" => ProjectStatus::Draft,
            "Planning" => ProjectStatus::Planning,
            "Approved" => ProjectStatus::Approved,
            "In Progress" => ProjectStatus::InProgress,
            "Completed" => ProjectStatus::Completed,
            _ => ProjectStatus::Other,
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            ProjectStatus::Completed => Palette::Green,
            ProjectStatus::InProgress => Palette::Blue,
            ProjectStatus::Planning => Palette::Purple,
            ProjectStatus::Approved | ProjectStatus::Draft => Palette::Yellow,
            ProjectStatus::Other => Palette::Neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectCategory {
    Highway,
    Transit,
    ActiveTransportation,
    Other,
}

impl ProjectCategory {
    pub fn from_label(label: &str) -> Self {
        match label {
            "Highway" => ProjectCategory::Highway,
            "Transit" => ProjectCategory::Transit,
            "Active Transportation" => ProjectCategory::ActiveTransportation,
            _ => ProjectCategory::Other,
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            ProjectCategory::Highway => Palette::Orange,
            ProjectCategory::Transit => Palette::Indigo,
            ProjectCategory::ActiveTransportation => Palette::Green,
            ProjectCategory::Other => Palette::Neutral,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProjectRecord {
    /// Status label, e.g. "In Progress". Unknown labels classify as neutral.
    #[serde(default)]
    pub status: String,
    /// Category label, e.g. "Active Transportation". Unknown labels classify as neutral.
    #[serde(default)]
    pub category: String,
    /// Project score, conventionally 0-100 but not bounded.
    #[serde(default)]
    pub score: i64,
}

impl ProjectRecord {
    pub fn classify(&self) -> Classification {
        classify(&self.status, &self.category, self.score)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Classification {
    pub status_tier: Palette,
    pub category_tier: Palette,
    pub score_tier: ScoreTier,
}

pub fn classify(status: &str, category: &str, score: i64) -> Classification {
    Classification {
        status_tier: ProjectStatus::from_label(status).palette(),
        category_tier: ProjectCategory::from_label(category).palette(),
        score_tier: ScoreTier::from_score(score),
    }
}

/// Reports list/detail badge.
pub fn classify_report_status(status: &str) -> Palette {
    match status {
        "Published" => Palette::Green,
        "Draft" => Palette::Yellow,
        "Under Review" => Palette::Blue,
        _ => Palette::Neutral,
    }
}

/// Comment moderation queue. Anything not yet decided reads as pending.
pub fn classify_moderation_status(status: &str) -> Palette {
    match status {
        "approved" => Palette::Green,
        "rejected" => Palette::Red,
        _ => Palette::Yellow,
    }
}

/// AI moderation risk score in `[0, 1]`; both boundaries are inclusive.
pub fn classify_moderation_score(score: Option<f64>) -> Palette {
    match score {
        None => Palette::Neutral,
        Some(s) if s.is_nan() => Palette::Neutral,
        Some(s) if s <= 0.3 => Palette::Green,
        Some(s) if s >= 0.7 => Palette::Red,
        Some(_) => Palette::Yellow,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScoreTierCounts {
    pub high: usize,
    pub medium_high: usize,
    pub medium_low: usize,
    pub low: usize,
}

impl ScoreTierCounts {
    fn record(&mut self, tier: ScoreTier) {
        match tier {
            ScoreTier::High => self.high += 1,
            ScoreTier::MediumHigh => self.medium_high += 1,
            ScoreTier::MediumLow => self.medium_low += 1,
            ScoreTier::Low => self.low += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.high + self.medium_high + self.medium_low + self.low
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ProjectSummary {
    pub classifications: Vec<Classification>,
    pub score_tiers: ScoreTierCounts,
}

/// Classify a batch in input order and tally records per score tier.
pub fn summarize(records: &[ProjectRecord]) -> ProjectSummary {
    let mut summary = ProjectSummary {
        classifications: Vec::with_capacity(records.len()),
        score_tiers: ScoreTierCounts::default(),
    };
    for record in records {
        let classification = record.classify();
        summary.score_tiers.record(classification.score_tier);
        summary.classifications.push(classification);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_tiers_use_exact_labels() {
        assert_eq!(classify("Completed", "", 0).status_tier, Palette::Green);
        assert_eq!(classify("In Progress", "", 0).status_tier, Palette::Blue);
        assert_eq!(classify("Planning", "", 0).status_tier, Palette::Purple);
        assert_eq!(classify("Approved", "", 0).status_tier, Palette::Yellow);
        assert_eq!(classify("Draft", "", 0).status_tier, Palette::Yellow);

        for label in ["", "completed", "In progress", " Planning", "Cancelled", "😀"] {
            assert_eq!(classify(label, "", 0).status_tier, Palette::Neutral, "{label:?}");
        }
    }

    #[test]
    fn category_tiers_use_exact_labels() {
        assert_eq!(classify("", "Highway", 0).category_tier, Palette::Orange);
        assert_eq!(classify("", "Transit", 0).category_tier, Palette::Indigo);
        assert_eq!(
            classify("", "Active Transportation", 0).category_tier,
            Palette::Green
        );

        for label in ["", "highway", "Active transportation", "Bridge", "Transit "] {
            assert_eq!(classify("", label, 0).category_tier, Palette::Neutral, "{label:?}");
        }
    }

    #[test]
    fn score_tier_boundaries() {
        let cases = [
            (150, ScoreTier::High),
            (100, ScoreTier::High),
            (90, ScoreTier::High),
            (89, ScoreTier::MediumHigh),
            (70, ScoreTier::MediumHigh),
            (69, ScoreTier::MediumLow),
            (50, ScoreTier::MediumLow),
            (49, ScoreTier::Low),
            (0, ScoreTier::Low),
            (-5, ScoreTier::Low),
            (i64::MIN, ScoreTier::Low),
            (i64::MAX, ScoreTier::High),
        ];
        for (score, expected) in cases {
            assert_eq!(classify("Draft", "Transit", score).score_tier, expected, "score {score}");
        }
    }

    #[test]
    fn score_tier_palette_matches_project_card() {
        assert_eq!(ScoreTier::High.palette(), Palette::Green);
        assert_eq!(ScoreTier::MediumHigh.palette(), Palette::Blue);
        assert_eq!(ScoreTier::MediumLow.palette(), Palette::Yellow);
        assert_eq!(ScoreTier::Low.palette(), Palette::Red);
    }

    #[test]
    fn report_and_moderation_tiers() {
        assert_eq!(classify_report_status("Published"), Palette::Green);
        assert_eq!(classify_report_status("Draft"), Palette::Yellow);
        assert_eq!(classify_report_status("Under Review"), Palette::Blue);
        assert_eq!(classify_report_status("Archived"), Palette::Neutral);

        assert_eq!(classify_moderation_status("approved"), Palette::Green);
        assert_eq!(classify_moderation_status("rejected"), Palette::Red);
        assert_eq!(classify_moderation_status("pending"), Palette::Yellow);
        assert_eq!(classify_moderation_status(""), Palette::Yellow);

        assert_eq!(classify_moderation_score(None), Palette::Neutral);
        assert_eq!(classify_moderation_score(Some(f64::NAN)), Palette::Neutral);
        assert_eq!(classify_moderation_score(Some(0.0)), Palette::Green);
        assert_eq!(classify_moderation_score(Some(0.3)), Palette::Green);
        assert_eq!(classify_moderation_score(Some(0.31)), Palette::Yellow);
        assert_eq!(classify_moderation_score(Some(0.69)), Palette::Yellow);
        assert_eq!(classify_moderation_score(Some(0.7)), Palette::Red);
        assert_eq!(classify_moderation_score(Some(4.0)), Palette::Red);
    }

    #[test]
    fn summary_tallies_every_record() {
        let records: Vec<ProjectRecord> = [
            ("In Progress", "Highway", 92),
            ("Planning", "Transit", 78),
            ("Approved", "Active Transportation", 85),
            ("Completed", "Highway", 55),
            ("", "", -1),
        ]
        .into_iter()
        .map(|(status, category, score)| ProjectRecord {
            status: status.to_string(),
            category: category.to_string(),
            score,
        })
        .collect();

        let summary = summarize(&records);
        assert_eq!(summary.classifications.len(), records.len());
        assert_eq!(summary.score_tiers.total(), records.len());
        assert_eq!(
            summary.score_tiers,
            ScoreTierCounts {
                high: 1,
                medium_high: 2,
                medium_low: 1,
                low: 1,
            }
        );
        assert_eq!(summary.classifications[4].status_tier, Palette::Neutral);

        let empty = summarize(&[]);
        assert!(empty.classifications.is_empty());
        assert_eq!(empty.score_tiers.total(), 0);
    }

    #[test]
    fn tiers_serialize_as_palette_ids() {
        let json = serde_json::to_value(classify("In Progress", "Active Transportation", 72)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status_tier": "blue",
                "category_tier": "green",
                "score_tier": "medium-high",
            })
        );

        let record: ProjectRecord = serde_json::from_str(r#"{"score": 40}"#).unwrap();
        assert_eq!(record.classify().status_tier, Palette::Neutral);
        assert_eq!(record.classify().score_tier, ScoreTier::Low);
    }
}
