//! Multi-criteria invoice matching with confidence tiers.
//!
//! Criteria are optional and conjunctive: an absent criterion simply does not
//! restrict the result. After retrieval every line is tagged with a
//! confidence tier and a human-auditable reason derived from which criteria
//! matched, and the list is ordered deterministically (tier, then invoice
//! number, then item number). No row is ever silently dropped.

use serde::{Deserialize, Serialize};

use crate::engine::correct::similarity_ratio;
use crate::engine::{DEFAULT_CORRECTION_CUTOFF, DEFAULT_PRICE_MARGIN};
use crate::repo::InvoiceLine;

/// Unit prices within this absolute delta count as an exact price match.
const PRICE_EPSILON: f64 = 1e-6;

/// Filter criteria for the invoice search. All fields are optional; a price
/// criterion is only applied when the price is positive (a negative or zero
/// price is ignored rather than rejecting the whole query).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceCriteria {
    pub customer: Option<String>,
    pub state: Option<String>,
    pub ean: Option<String>,
    pub price: Option<f64>,
    #[serde(default = "default_margin")]
    pub margin: f64,
}

impl Default for InvoiceCriteria {
    fn default() -> Self {
        Self {
            customer: None,
            state: None,
            ean: None,
            price: None,
            margin: DEFAULT_PRICE_MARGIN,
        }
    }
}

fn default_margin() -> f64 {
    DEFAULT_PRICE_MARGIN
}

impl InvoiceCriteria {
    /// Inclusive unit-price band `[price * (1 - margin), price * (1 + margin)]`,
    /// or `None` when no usable price criterion is set.
    pub fn price_band(&self) -> Option<(f64, f64)> {
        match self.price {
            Some(price) if price > 0.0 => {
                Some((price * (1.0 - self.margin), price * (1.0 + self.margin)))
            }
            Some(price) => {
                log::debug!("ignoring non-positive price criterion {price}");
                None
            }
            None => None,
        }
    }

    /// Conjunctive retrieval filter. Repository implementations apply this to
    /// every invoice line; absent criteria never restrict the result.
    pub fn matches(&self, line: &InvoiceLine) -> bool {
        if let Some(customer) = &self.customer {
            if !line
                .customer_name
                .to_lowercase()
                .contains(&customer.to_lowercase())
            {
                return false;
            }
        }

        if let Some(state) = &self.state {
            if !line.state.eq_ignore_ascii_case(state) {
                return false;
            }
        }

        if let Some(ean) = &self.ean {
            if line.ean != *ean {
                return false;
            }
        }

        if let Some((min, max)) = self.price_band() {
            if line.unit_price < min || line.unit_price > max {
                return false;
            }
        }

        true
    }
}

/// How strongly a retrieved invoice line matches the criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    /// EAN matched, price delta zero, customer name equal (case-insensitive).
    Exact,
    /// EAN matched; customer within the substring rule or absent, price only
    /// within the margin or absent.
    Near,
    /// Matched through the weaker signals only (no exact EAN match).
    Fuzzy,
}

/// An invoice line annotated with its confidence tier and the criteria that
/// produced the match.
#[derive(Debug, Clone, Serialize)]
pub struct MatchCandidate {
    #[serde(flatten)]
    pub line: InvoiceLine,
    pub tier: ConfidenceTier,
    pub reason: String,
}

/// Tag every retrieved line with a tier and order the result set: Exact, then
/// Near, then Fuzzy; within a tier ascending by invoice number then item
/// number for determinism.
pub fn score_candidates(criteria: &InvoiceCriteria, lines: Vec<InvoiceLine>) -> Vec<MatchCandidate> {
    let mut candidates: Vec<MatchCandidate> = lines
        .into_iter()
        .map(|line| {
            let (tier, reason) = assign_tier(criteria, &line);
            MatchCandidate { line, tier, reason }
        })
        .collect();

    candidates.sort_by(|a, b| {
        a.tier
            .cmp(&b.tier)
            .then(a.line.invoice_number.cmp(&b.line.invoice_number))
            .then(a.line.item_number.cmp(&b.line.item_number))
    });

    candidates
}

fn assign_tier(criteria: &InvoiceCriteria, line: &InvoiceLine) -> (ConfidenceTier, String) {
    let ean_exact = criteria.ean.as_deref().is_some_and(|ean| line.ean == ean);

    let customer_lower = line.customer_name.to_lowercase();
    let customer_exact = criteria
        .customer
        .as_deref()
        .is_some_and(|c| customer_lower == c.to_lowercase());
    let customer_substring = criteria
        .customer
        .as_deref()
        .is_some_and(|c| customer_lower.contains(&c.to_lowercase()));
    let customer_approx = criteria
        .customer
        .as_deref()
        .is_some_and(|c| similarity_ratio(c, &line.customer_name) >= DEFAULT_CORRECTION_CUTOFF);

    let price_exact = criteria
        .price
        .filter(|p| *p > 0.0)
        .is_some_and(|p| (line.unit_price - p).abs() < PRICE_EPSILON);
    let price_in_band = criteria
        .price_band()
        .is_some_and(|(min, max)| line.unit_price >= min && line.unit_price <= max);

    let state_exact = criteria
        .state
        .as_deref()
        .is_some_and(|s| line.state.eq_ignore_ascii_case(s));

    // An absent customer criterion behaves like an absent price: it caps the
    // tier at Near rather than demoting an exact-EAN hit to Fuzzy.
    let tier = if ean_exact && customer_exact && price_exact {
        ConfidenceTier::Exact
    } else if ean_exact && (customer_substring || criteria.customer.is_none()) {
        ConfidenceTier::Near
    } else {
        ConfidenceTier::Fuzzy
    };

    let mut parts: Vec<&str> = Vec::new();
    if ean_exact {
        parts.push("ean");
    }
    if customer_exact {
        parts.push("customer");
    } else if customer_substring {
        parts.push("customer~");
    } else if customer_approx {
        parts.push("customer~=");
    }
    if price_exact {
        parts.push("price");
    } else if price_in_band {
        parts.push("price~");
    }
    if state_exact {
        parts.push("state");
    }

    let reason = if parts.is_empty() {
        "description-only".to_string()
    } else {
        parts.join("+")
    };

    (tier, reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn line(invoice: u64, item: u32, customer: &str, ean: &str, price: f64) -> InvoiceLine {
        InvoiceLine {
            invoice_number: invoice,
            customer_name: customer.to_string(),
            state: "SP".to_string(),
            print_date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            item_number: item,
            ean: ean.to_string(),
            product_description: "Harry Potter Book".to_string(),
            unit_price: price,
        }
    }

    fn full_criteria(price: f64, margin: f64) -> InvoiceCriteria {
        InvoiceCriteria {
            customer: Some("Acme Books".into()),
            state: None,
            ean: Some("EAN1".into()),
            price: Some(price),
            margin,
        }
    }

    #[test]
    fn price_band_is_inclusive() {
        let criteria = InvoiceCriteria {
            price: Some(100.0),
            margin: 0.05,
            ..Default::default()
        };

        assert!(criteria.matches(&line(1, 1, "Acme", "X", 95.0)));
        assert!(criteria.matches(&line(1, 1, "Acme", "X", 105.0)));
        assert!(!criteria.matches(&line(1, 1, "Acme", "X", 94.99)));
        assert!(!criteria.matches(&line(1, 1, "Acme", "X", 105.01)));
    }

    #[test]
    fn empty_criteria_match_everything() {
        let criteria = InvoiceCriteria::default();
        assert!(criteria.matches(&line(1, 1, "Anyone", "ANY", 1.0)));
    }

    #[test]
    fn negative_price_criterion_is_ignored() {
        let criteria = InvoiceCriteria {
            price: Some(-10.0),
            ..Default::default()
        };
        assert_eq!(criteria.price_band(), None);
        assert!(criteria.matches(&line(1, 1, "Anyone", "ANY", 999.0)));
    }

    #[test]
    fn customer_match_is_case_insensitive_substring() {
        let criteria = InvoiceCriteria {
            customer: Some("acme".into()),
            ..Default::default()
        };
        assert!(criteria.matches(&line(1, 1, "ACME Books Ltd", "X", 1.0)));
        assert!(!criteria.matches(&line(1, 1, "Other Corp", "X", 1.0)));
    }

    #[test]
    fn state_match_is_case_insensitive_exact() {
        let criteria = InvoiceCriteria {
            state: Some("sp".into()),
            ..Default::default()
        };
        assert!(criteria.matches(&line(1, 1, "Acme", "X", 1.0)));

        let criteria = InvoiceCriteria {
            state: Some("S".into()),
            ..Default::default()
        };
        assert!(!criteria.matches(&line(1, 1, "Acme", "X", 1.0)));
    }

    #[test]
    fn exact_tier_requires_zero_price_delta() {
        let criteria = full_criteria(50.0, 0.05);
        let candidates = score_candidates(&criteria, vec![line(1, 1, "Acme Books", "EAN1", 50.0)]);
        assert_eq!(candidates[0].tier, ConfidenceTier::Exact);
        assert_eq!(candidates[0].reason, "ean+customer+price");
    }

    #[test]
    fn three_percent_price_delta_is_near() {
        let criteria = full_criteria(50.0, 0.05);
        let candidates = score_candidates(&criteria, vec![line(1, 1, "Acme Books", "EAN1", 51.5)]);
        assert_eq!(candidates[0].tier, ConfidenceTier::Near);
        assert_eq!(candidates[0].reason, "ean+customer+price~");
    }

    #[test]
    fn missing_price_criterion_caps_at_near() {
        let criteria = InvoiceCriteria {
            customer: Some("Acme Books".into()),
            ean: Some("EAN1".into()),
            ..Default::default()
        };
        let candidates = score_candidates(&criteria, vec![line(1, 1, "Acme Books", "EAN1", 50.0)]);
        assert_eq!(candidates[0].tier, ConfidenceTier::Near);
    }

    #[test]
    fn exact_ean_without_customer_criterion_is_near() {
        let criteria = InvoiceCriteria {
            ean: Some("EAN1".into()),
            ..Default::default()
        };
        let candidates = score_candidates(&criteria, vec![line(1, 1, "Acme Books", "EAN1", 50.0)]);
        assert_eq!(candidates[0].tier, ConfidenceTier::Near);
        assert_eq!(candidates[0].reason, "ean");
    }

    #[test]
    fn no_ean_match_is_fuzzy() {
        let criteria = InvoiceCriteria {
            customer: Some("Acme Boks".into()), // typo, approximate only
            ..Default::default()
        };
        let candidates = score_candidates(&criteria, vec![line(1, 1, "Acme Books", "OTHER", 10.0)]);
        assert_eq!(candidates[0].tier, ConfidenceTier::Fuzzy);
        assert_eq!(candidates[0].reason, "customer~=");
    }

    #[test]
    fn ordering_is_tier_then_invoice_then_item() {
        let criteria = full_criteria(50.0, 0.05);
        let lines = vec![
            line(9, 1, "Acme Books", "EAN1", 51.5),  // near
            line(2, 2, "Acme Books", "EAN1", 50.0),  // exact
            line(2, 1, "Acme Books", "EAN1", 50.0),  // exact, earlier item
            line(1, 1, "Somebody Else", "OTHER", 3.0), // fuzzy
        ];

        let candidates = score_candidates(&criteria, lines);
        let keys: Vec<(u64, u32)> = candidates
            .iter()
            .map(|c| (c.line.invoice_number, c.line.item_number))
            .collect();

        assert_eq!(candidates[0].tier, ConfidenceTier::Exact);
        assert_eq!(candidates[1].tier, ConfidenceTier::Exact);
        assert_eq!(candidates[2].tier, ConfidenceTier::Near);
        assert_eq!(candidates[3].tier, ConfidenceTier::Fuzzy);
        assert_eq!(keys, vec![(2, 1), (2, 2), (9, 1), (1, 1)]);
    }
}
