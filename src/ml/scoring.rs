use serde::{Deserialize, Serialize};

/// Lower bound of the productivity scale
pub const MIN_SCORE: f64 = 0.0;

/// Upper bound of the productivity scale
pub const MAX_SCORE: f64 = 100.0;

/// Coarse productivity class derived from a clamped score.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
pub enum ProductivityLevel {
    High,
    Medium,
    Low,
}

impl ProductivityLevel {
    /// High above 70, Medium above 40, Low otherwise.
    pub fn from_score(score: f64) -> Self {
        if score > 70.0 {
            ProductivityLevel::High
        } else if score > 40.0 {
            ProductivityLevel::Medium
        } else {
            ProductivityLevel::Low
        }
    }
}

/// Clamp a raw prediction onto the productivity scale. Non-finite values map to 0.
pub fn clamp_score(raw: f64) -> f64 {
    if raw.is_finite() {
        raw.clamp(MIN_SCORE, MAX_SCORE)
    } else {
        MIN_SCORE
    }
}

/// A clamped score with its level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Score {
    pub productivity_score: f64,
    pub productivity_level: ProductivityLevel,
}

impl Score {
    pub fn from_raw(raw: f64) -> Self {
        let productivity_score = clamp_score(raw);
        Self {
            productivity_score,
            productivity_level: ProductivityLevel::from_score(productivity_score),
        }
    }
}

/// Summary statistics over a set of scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub average: f64,
    pub min: f64,
    pub max: f64,
}

impl ScoreSummary {
    pub fn of(scores: &[Score]) -> Option<Self> {
        if scores.is_empty() {
            return None;
        }

        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for score in scores {
            sum += score.productivity_score;
            min = min.min(score.productivity_score);
            max = max.max(score.productivity_score);
        }

        Some(Self {
            average: sum / scores.len() as f64,
            min,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(-3.0), 0.0);
        assert_eq!(clamp_score(55.5), 55.5);
        assert_eq!(clamp_score(130.0), 100.0);
        assert_eq!(clamp_score(f64::NAN), 0.0);
        assert_eq!(clamp_score(f64::INFINITY), 0.0);
    }

    #[test]
    fn test_level_boundaries() {
        assert_eq!(ProductivityLevel::from_score(70.0), ProductivityLevel::Medium);
        assert_eq!(ProductivityLevel::from_score(70.01), ProductivityLevel::High);
        assert_eq!(ProductivityLevel::from_score(40.0), ProductivityLevel::Low);
        assert_eq!(ProductivityLevel::from_score(40.5), ProductivityLevel::Medium);
    }

    #[test]
    fn test_level_serializes_as_name() {
        let score = Score::from_raw(88.0);
        let json = serde_json::to_value(score).unwrap();
        assert_eq!(json["productivity_level"], "High");
        assert_eq!(ProductivityLevel::High.to_string(), "High");
        assert_eq!("Low".parse::<ProductivityLevel>().unwrap(), ProductivityLevel::Low);
    }

    #[test]
    fn test_summary() {
        let scores: Vec<Score> = [10.0, 50.0, 90.0].iter().map(|&s| Score::from_raw(s)).collect();
        let summary = ScoreSummary::of(&scores).unwrap();
        assert_eq!(summary.average, 50.0);
        assert_eq!(summary.min, 10.0);
        assert_eq!(summary.max, 90.0);
        assert!(ScoreSummary::of(&[]).is_none());
    }
}
