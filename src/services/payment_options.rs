// Which month bundles an applicant may pay for next

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{format_amount, PlanTerms};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BundleKind {
    OneMonth,
    TwoMonths,
    AllRemaining,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentBundle {
    pub kind: BundleKind,
    pub months: i32,
    /// Whole currency units
    pub amount: i64,
    pub title: String,
    pub description: String,
    pub popular: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOptions {
    pub months_paid: i32,
    pub total_months: i32,
    pub remaining_months: i32,
    pub monthly_amount: i64,
    pub remaining_amount: i64,
    pub currency: String,
    pub plan_complete: bool,
    pub message: Option<String>,
    pub bundles: Vec<PaymentBundle>,
}

impl PaymentOptions {
    pub fn bundle_for(&self, months: i32) -> Option<&PaymentBundle> {
        self.bundles.iter().find(|b| b.months == months)
    }
}

fn months_word(months: i32) -> &'static str {
    if months == 1 {
        "month"
    } else {
        "months"
    }
}

fn bundle(kind: BundleKind, months: i32, terms: &PlanTerms) -> PaymentBundle {
    let word = months_word(months);
    let (title, description) = match kind {
        BundleKind::OneMonth => ("1 Month Payment".to_string(), "Pay for one month".to_string()),
        BundleKind::TwoMonths => (
            "2 Months Payment".to_string(),
            "Pay for two months".to_string(),
        ),
        BundleKind::AllRemaining => (
            format!("{} {} Payment", months, capitalize(word)),
            format!("Pay remaining {} {}", months, word),
        ),
    };

    PaymentBundle {
        kind,
        months,
        amount: i64::from(months) * terms.monthly_amount,
        title,
        description,
        popular: kind == BundleKind::AllRemaining,
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Bundles on offer for an applicant who has already paid `months_paid` months
///
/// 1 month, 2 months and "all remaining", dropping any bundle that is empty or larger
/// than what is left. When "all remaining" is the same size as a fixed bundle, only
/// the "all remaining" one is kept.
pub fn compute_payment_options(months_paid: i32, terms: &PlanTerms, currency: &str) -> PaymentOptions {
    let months_paid = months_paid.max(0);
    let remaining = (terms.total_months - months_paid).max(0);

    let mut bundles: Vec<PaymentBundle> = Vec::new();
    if remaining > 0 {
        for (kind, months) in [(BundleKind::OneMonth, 1), (BundleKind::TwoMonths, 2)] {
            if months < remaining {
                bundles.push(bundle(kind, months, terms));
            }
        }
        bundles.push(bundle(BundleKind::AllRemaining, remaining, terms));
    }

    let plan_complete = remaining == 0;
    let message = plan_complete.then(|| {
        format!(
            "All {} {} have been paid. Your plan is complete.",
            terms.total_months,
            months_word(terms.total_months)
        )
    });

    PaymentOptions {
        months_paid,
        total_months: terms.total_months,
        remaining_months: remaining,
        monthly_amount: terms.monthly_amount,
        remaining_amount: i64::from(remaining) * terms.monthly_amount,
        currency: currency.to_string(),
        plan_complete,
        message,
        bundles,
    }
}

/// Human-readable price line, e.g. `₦10,000 per month`
pub fn monthly_price_label(terms: &PlanTerms, currency: &str) -> String {
    format!("{} per month", format_amount(terms.monthly_amount, currency))
}

#[cfg(test)]
mod tests {
    use super::*;

    const STANDARD: PlanTerms = PlanTerms {
        monthly_amount: 10_000,
        total_months: 4,
    };

    fn months(options: &PaymentOptions) -> Vec<i32> {
        options.bundles.iter().map(|b| b.months).collect()
    }

    #[test]
    fn test_fresh_applicant_gets_three_bundles() {
        let options = compute_payment_options(0, &STANDARD, "NGN");
        assert_eq!(months(&options), vec![1, 2, 4]);
        assert_eq!(options.bundles[2].amount, 40_000);
        assert_eq!(options.bundles[2].title, "4 Months Payment");
        assert!(options.bundles[2].popular);
        assert!(!options.bundles[0].popular);
        assert_eq!(options.remaining_amount, 40_000);
    }

    #[test]
    fn test_two_months_paid_merges_remaining_bundle() {
        let options = compute_payment_options(2, &STANDARD, "NGN");
        assert_eq!(months(&options), vec![1, 2]);
        assert_eq!(options.bundles[1].kind, BundleKind::AllRemaining);
        assert_eq!(options.bundles[1].description, "Pay remaining 2 months");
        assert_eq!(options.bundles[1].amount, 20_000);
    }

    #[test]
    fn test_one_month_left() {
        let options = compute_payment_options(3, &STANDARD, "NGN");
        assert_eq!(months(&options), vec![1]);
        assert_eq!(options.bundles[0].kind, BundleKind::AllRemaining);
        assert_eq!(options.bundles[0].title, "1 Month Payment");
    }

    #[test]
    fn test_complete_plan_offers_nothing() {
        for paid in [4, 5] {
            let options = compute_payment_options(paid, &STANDARD, "NGN");
            assert!(options.bundles.is_empty());
            assert!(options.plan_complete);
            assert_eq!(options.remaining_months, 0);
            assert!(options.message.is_some());
        }
    }

    #[test]
    fn test_no_bundle_exceeds_remaining() {
        let terms = PlanTerms {
            monthly_amount: 15_000,
            total_months: 6,
        };
        for paid in 0..=6 {
            let options = compute_payment_options(paid, &terms, "NGN");
            let remaining = 6 - paid;
            assert!(options
                .bundles
                .iter()
                .all(|b| b.months > 0 && b.months <= remaining));
            assert!(options.bundles.iter().all(|b| b.amount == i64::from(b.months) * 15_000));
        }
    }

    #[test]
    fn test_monthly_price_label() {
        assert_eq!(monthly_price_label(&STANDARD, "NGN"), "₦10,000 per month");
    }
}
