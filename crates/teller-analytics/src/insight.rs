// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use teller_app::model::InsightKind;

/// Presentation tier derived from the significance score. Thresholds
/// are fixed and the comparisons strict: 0.8 exactly is medium, 0.5
/// exactly is low.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignificanceTier {
    High,
    Medium,
    Low,
}

impl SignificanceTier {
    pub fn of(significance: f64) -> Self {
        if significance > 0.8 {
            Self::High
        } else if significance > 0.5 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

pub const fn insight_icon(kind: InsightKind) -> &'static str {
    match kind {
        InsightKind::Trend => "📈",
        InsightKind::Anomaly => "⚠️",
        InsightKind::Correlation => "🔗",
        InsightKind::Pattern => "🔍",
        InsightKind::Threshold => "🚨",
        InsightKind::Forecast => "🔮",
        InsightKind::Other => "💡",
    }
}

/// Bounded progress indicator for one insight. Scores outside `[0, 1]`
/// (including NaN) are clamped and flagged so the caller can surface
/// the irregularity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignificanceBar {
    pub fraction: f64,
    pub clamped: bool,
}

impl SignificanceBar {
    pub fn of(significance: f64) -> Self {
        let clamped = !(0.0..=1.0).contains(&significance);
        let fraction = if significance.is_nan() {
            0.0
        } else {
            significance.clamp(0.0, 1.0)
        };
        Self { fraction, clamped }
    }

    /// Number of filled cells when rendered at the given width.
    pub fn filled(&self, width: usize) -> usize {
        (self.fraction * width as f64).round() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::{SignificanceBar, SignificanceTier, insight_icon};
    use teller_app::model::InsightKind;

    #[test]
    fn tier_boundaries_are_strict() {
        assert_eq!(SignificanceTier::of(0.81), SignificanceTier::High);
        assert_eq!(SignificanceTier::of(0.8), SignificanceTier::Medium);
        assert_eq!(SignificanceTier::of(0.51), SignificanceTier::Medium);
        assert_eq!(SignificanceTier::of(0.5), SignificanceTier::Low);
        assert_eq!(SignificanceTier::of(0.0), SignificanceTier::Low);
    }

    #[test]
    fn nan_significance_is_low() {
        assert_eq!(SignificanceTier::of(f64::NAN), SignificanceTier::Low);
    }

    #[test]
    fn every_kind_has_a_distinct_icon() {
        let kinds = [
            InsightKind::Trend,
            InsightKind::Anomaly,
            InsightKind::Correlation,
            InsightKind::Pattern,
            InsightKind::Threshold,
            InsightKind::Forecast,
            InsightKind::Other,
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(insight_icon(*a), insight_icon(*b));
            }
        }
    }

    #[test]
    fn unrecognized_wire_kind_falls_back_to_generic_icon() {
        let kind = InsightKind::parse_lossy("sentiment");
        assert_eq!(insight_icon(kind), insight_icon(InsightKind::Other));
    }

    #[test]
    fn in_range_scores_pass_through_unflagged() {
        let bar = SignificanceBar::of(0.72);
        assert_eq!(bar.fraction, 0.72);
        assert!(!bar.clamped);
        assert_eq!(bar.filled(10), 7);
    }

    #[test]
    fn out_of_range_scores_are_clamped_and_flagged() {
        let high = SignificanceBar::of(1.7);
        assert_eq!(high.fraction, 1.0);
        assert!(high.clamped);

        let low = SignificanceBar::of(-0.2);
        assert_eq!(low.fraction, 0.0);
        assert!(low.clamped);

        let nan = SignificanceBar::of(f64::NAN);
        assert_eq!(nan.fraction, 0.0);
        assert!(nan.clamped);
    }
}
