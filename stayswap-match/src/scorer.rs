use serde::{Deserialize, Serialize};
use stayswap_domain::Booking;

pub const LOCATION_WEIGHT: f64 = 0.25;
pub const DATES_WEIGHT: f64 = 0.20;
pub const VALUE_WEIGHT: f64 = 0.20;
pub const TYPE_WEIGHT: f64 = 0.20;
pub const CAPACITY_WEIGHT: f64 = 0.15;

/// Neutral score applied whenever an input cannot be resolved. Missing data
/// degrades a factor instead of erroring or leaking an absent field.
const NEUTRAL_SCORE: u8 = 50;

/// Points removed per night of stay-length mismatch.
const NIGHT_MISMATCH_PENALTY: i64 = 10;

/// Bonus when both stays begin in the same calendar month.
const SEASONAL_BONUS: u8 = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FactorStatus {
    Excellent,
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorScore {
    pub score: u8,
    pub weight: f64,
    pub status: FactorStatus,
    pub details: String,
}

impl FactorScore {
    fn new(score: u8, weight: f64, details: String) -> Self {
        Self {
            score,
            weight,
            status: status_for(score),
            details,
        }
    }

    fn neutral(weight: f64, details: &str) -> Self {
        Self {
            score: NEUTRAL_SCORE,
            weight,
            status: FactorStatus::Fair,
            details: details.to_string(),
        }
    }

    fn is_degraded(&self) -> bool {
        self.score == NEUTRAL_SCORE && self.status == FactorStatus::Fair
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityFactors {
    pub location: FactorScore,
    pub dates: FactorScore,
    pub value: FactorScore,
    pub accommodation_type: FactorScore,
    pub guest_capacity: FactorScore,
}

/// Ephemeral fit report between two bookings. Never persisted; recomputed on
/// every read so it self-corrects when source data changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityReport {
    pub overall_score: u8,
    pub factors: CompatibilityFactors,
    pub recommendations: Vec<String>,
    pub potential_issues: Vec<String>,
}

fn status_for(score: u8) -> FactorStatus {
    match score {
        85..=100 => FactorStatus::Excellent,
        65..=84 => FactorStatus::Good,
        45..=64 => FactorStatus::Fair,
        _ => FactorStatus::Poor,
    }
}

/// Pure compatibility scoring between two bookings.
pub struct CompatibilityScorer;

impl CompatibilityScorer {
    /// Either side may be unresolved; a missing booking degrades every
    /// factor to the neutral default rather than failing the read.
    pub fn score(source: Option<&Booking>, target: Option<&Booking>) -> CompatibilityReport {
        let factors = match (source, target) {
            (Some(s), Some(t)) => CompatibilityFactors {
                location: Self::score_location(s, t),
                dates: Self::score_dates(s, t),
                value: Self::score_value(s, t),
                accommodation_type: Self::score_type(s, t),
                guest_capacity: Self::score_capacity(s, t),
            },
            _ => {
                let detail = "booking data unavailable";
                CompatibilityFactors {
                    location: FactorScore::neutral(LOCATION_WEIGHT, detail),
                    dates: FactorScore::neutral(DATES_WEIGHT, detail),
                    value: FactorScore::neutral(VALUE_WEIGHT, detail),
                    accommodation_type: FactorScore::neutral(TYPE_WEIGHT, detail),
                    guest_capacity: FactorScore::neutral(CAPACITY_WEIGHT, detail),
                }
            }
        };

        let weighted = f64::from(factors.location.score) * factors.location.weight
            + f64::from(factors.dates.score) * factors.dates.weight
            + f64::from(factors.value.score) * factors.value.weight
            + f64::from(factors.accommodation_type.score) * factors.accommodation_type.weight
            + f64::from(factors.guest_capacity.score) * factors.guest_capacity.weight;
        let overall_score = weighted.round().clamp(0.0, 100.0) as u8;

        let (recommendations, potential_issues) = Self::summarize(&factors);

        CompatibilityReport {
            overall_score,
            factors,
            recommendations,
            potential_issues,
        }
    }

    fn score_location(source: &Booking, target: &Booking) -> FactorScore {
        let (s, t) = match (&source.location, &target.location) {
            (Some(s), Some(t)) => (s, t),
            _ => return FactorScore::neutral(LOCATION_WEIGHT, "location unresolved for one side"),
        };

        let (score, details) = if s.city == t.city && s.country == t.country {
            (100, format!("Both stays are in {}", s.city))
        } else if s.country == t.country {
            (75, format!("Domestic exchange within {}", s.country))
        } else {
            (55, format!("{} to {}", s.country, t.country))
        };
        FactorScore::new(score, LOCATION_WEIGHT, details)
    }

    fn score_dates(source: &Booking, target: &Booking) -> FactorScore {
        let mismatch = (source.date_range.nights() - target.date_range.nights()).abs();
        let mut score = (100 - mismatch * NIGHT_MISMATCH_PENALTY).max(0) as u8;

        let seasonal = source.date_range.same_start_month(&target.date_range);
        if seasonal {
            score = score.saturating_add(SEASONAL_BONUS).min(100);
        }

        let details = if mismatch == 0 {
            "Stays are the same length".to_string()
        } else {
            format!("Stay lengths differ by {} night(s)", mismatch)
        };
        FactorScore::new(score, DATES_WEIGHT, details)
    }

    fn score_value(source: &Booking, target: &Booking) -> FactorScore {
        let mean = (source.swap_value_cents + target.swap_value_cents) as f64 / 2.0;
        if mean <= 0.0 {
            return FactorScore::neutral(VALUE_WEIGHT, "swap value unresolved");
        }

        let diff_ratio =
            (source.swap_value_cents - target.swap_value_cents).abs() as f64 / mean;
        let score = if diff_ratio <= 0.10 {
            100
        } else if diff_ratio >= 0.50 {
            0
        } else {
            (((0.50 - diff_ratio) / 0.40) * 100.0).round() as u8
        };

        let details = format!("Swap values differ by {:.0}%", diff_ratio * 100.0);
        FactorScore::new(score, VALUE_WEIGHT, details)
    }

    fn score_type(source: &Booking, target: &Booking) -> FactorScore {
        let (score, details) = if source.accommodation_type == target.accommodation_type {
            (100, "Same accommodation type".to_string())
        } else if source.accommodation_type.family() == target.accommodation_type.family() {
            (75, "Comparable accommodation class".to_string())
        } else {
            (50, "Different accommodation class".to_string())
        };
        FactorScore::new(score, TYPE_WEIGHT, details)
    }

    fn score_capacity(source: &Booking, target: &Booking) -> FactorScore {
        let (s, t) = match (source.guest_capacity, target.guest_capacity) {
            (Some(s), Some(t)) => (s, t),
            _ => return FactorScore::neutral(CAPACITY_WEIGHT, "guest capacity unresolved"),
        };

        let diff = s.abs_diff(t);
        let score = match diff {
            0 => 100,
            1 => 80,
            2 => 60,
            _ => 40,
        };
        FactorScore::new(
            score,
            CAPACITY_WEIGHT,
            format!("Capacity difference of {} guest(s)", diff),
        )
    }

    fn summarize(factors: &CompatibilityFactors) -> (Vec<String>, Vec<String>) {
        let mut recommendations = Vec::new();
        let mut issues = Vec::new();

        let named = [
            ("location", &factors.location),
            ("dates", &factors.dates),
            ("value", &factors.value),
            ("accommodation type", &factors.accommodation_type),
            ("guest capacity", &factors.guest_capacity),
        ];
        for (name, factor) in named {
            match factor.status {
                FactorStatus::Excellent => {
                    recommendations.push(format!("Strong {} match: {}", name, factor.details));
                }
                FactorStatus::Poor => {
                    issues.push(format!("Weak {} fit: {}", name, factor.details));
                }
                FactorStatus::Fair if factor.is_degraded() => {
                    issues.push(format!(
                        "Could not assess {} ({}); scored neutrally",
                        name, factor.details
                    ));
                }
                _ => {}
            }
        }
        (recommendations, issues)
    }
}
