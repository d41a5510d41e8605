use crate::year::TaxYear;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A marginal band: the slice of the assessed amount above `floor`, up to the
/// next band's floor, is charged at `rate`.
///
/// Within a table, floors must be strictly ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Band {
    #[schemars(with = "f64")]
    pub floor: Decimal,
    #[schemars(with = "f64")]
    pub rate: Decimal,
}

impl Band {
    pub fn new(floor: Decimal, rate: Decimal) -> Self {
        Band { floor, rate }
    }
}

/// An income-contingent student loan repayment plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LoanPlan {
    /// Repayments start on assessed income above this amount
    #[schemars(with = "f64")]
    pub threshold: Decimal,
    #[schemars(with = "f64")]
    pub rate: Decimal,
}

/// The deduction rules in force for a single tax year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TaxYearRules {
    /// Maximum tax-free personal allowance
    #[schemars(with = "f64")]
    pub personal_allowance: Decimal,
    /// Income limit above which the personal allowance is tapered away
    #[schemars(with = "f64")]
    pub allowance_income_limit: Decimal,
    /// Income tax bands, floors relative to the personal allowance
    /// (floor 0 = the first taxable pound)
    pub income_tax: Vec<Band>,
    /// Employee national insurance bands, absolute floors
    pub national_insurance: Vec<Band>,
    /// Student loan plans keyed by plan number
    pub student_loan_plans: BTreeMap<u32, LoanPlan>,
}

/// Supplies the ruleset in force for a tax year.
///
/// This is the engine's only external boundary; where a provider sources its
/// tables (embedded, file, remote config) is its own concern.
pub trait RulesProvider {
    /// Rules for the given tax year, or `None` if the year is not covered
    fn rules_for(&self, year: TaxYear) -> Option<TaxYearRules>;
}

/// Built-in UK rules for recent tax years
#[derive(Debug, Clone, Copy, Default)]
pub struct UkTaxRules;

impl RulesProvider for UkTaxRules {
    fn rules_for(&self, year: TaxYear) -> Option<TaxYearRules> {
        match year.0 {
            2024 => Some(rules_2023_24()),
            2025 => Some(rules_2024_25()),
            2026 => Some(rules_2025_26()),
            _ => None,
        }
    }
}

fn rules_2023_24() -> TaxYearRules {
    TaxYearRules {
        personal_allowance: dec!(12570),
        allowance_income_limit: dec!(100000),
        income_tax: vec![
            Band::new(dec!(0), dec!(0.20)),
            Band::new(dec!(37700), dec!(0.40)),
            Band::new(dec!(125140), dec!(0.45)),
        ],
        // Employee Class 1 main rate as cut from January 2024
        national_insurance: vec![
            Band::new(dec!(12570), dec!(0.10)),
            Band::new(dec!(50270), dec!(0.02)),
        ],
        student_loan_plans: BTreeMap::from([
            (1, LoanPlan { threshold: dec!(22015), rate: dec!(0.09) }),
            (2, LoanPlan { threshold: dec!(27295), rate: dec!(0.09) }),
            (4, LoanPlan { threshold: dec!(27660), rate: dec!(0.09) }),
        ]),
    }
}

fn rules_2024_25() -> TaxYearRules {
    TaxYearRules {
        personal_allowance: dec!(12570),
        allowance_income_limit: dec!(100000),
        income_tax: vec![
            Band::new(dec!(0), dec!(0.20)),
            Band::new(dec!(37700), dec!(0.40)),
            Band::new(dec!(125140), dec!(0.45)),
        ],
        national_insurance: vec![
            Band::new(dec!(12570), dec!(0.08)),
            Band::new(dec!(50270), dec!(0.02)),
        ],
        student_loan_plans: BTreeMap::from([
            (1, LoanPlan { threshold: dec!(24990), rate: dec!(0.09) }),
            (2, LoanPlan { threshold: dec!(27295), rate: dec!(0.09) }),
            (4, LoanPlan { threshold: dec!(31395), rate: dec!(0.09) }),
        ]),
    }
}

fn rules_2025_26() -> TaxYearRules {
    TaxYearRules {
        personal_allowance: dec!(12570),
        allowance_income_limit: dec!(100000),
        income_tax: vec![
            Band::new(dec!(0), dec!(0.20)),
            Band::new(dec!(37700), dec!(0.40)),
            Band::new(dec!(125140), dec!(0.45)),
        ],
        national_insurance: vec![
            Band::new(dec!(12570), dec!(0.08)),
            Band::new(dec!(50270), dec!(0.02)),
        ],
        student_loan_plans: BTreeMap::from([
            (1, LoanPlan { threshold: dec!(26065), rate: dec!(0.09) }),
            (2, LoanPlan { threshold: dec!(28470), rate: dec!(0.09) }),
            (4, LoanPlan { threshold: dec!(32745), rate: dec!(0.09) }),
        ]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ascending(bands: &[Band]) -> bool {
        bands.windows(2).all(|w| w[0].floor < w[1].floor)
    }

    #[test]
    fn covered_years_have_ascending_floors() {
        for end_year in 2024..=2026 {
            let rules = UkTaxRules.rules_for(TaxYear(end_year)).unwrap();
            assert!(ascending(&rules.income_tax), "income tax {}", end_year);
            assert!(ascending(&rules.national_insurance), "ni {}", end_year);
        }
    }

    #[test]
    fn rules_2024_25_values() {
        let rules = UkTaxRules.rules_for(TaxYear(2025)).unwrap();
        assert_eq!(rules.personal_allowance, dec!(12570));
        assert_eq!(rules.allowance_income_limit, dec!(100000));
        assert_eq!(rules.income_tax.len(), 3);
        assert_eq!(rules.income_tax[1].floor, dec!(37700));
        assert_eq!(rules.income_tax[2].rate, dec!(0.45));
        assert_eq!(rules.national_insurance[0].rate, dec!(0.08));

        let plan2 = rules.student_loan_plans.get(&2).unwrap();
        assert_eq!(plan2.threshold, dec!(27295));
        assert_eq!(plan2.rate, dec!(0.09));
    }

    #[test]
    fn ni_main_rate_differs_across_years() {
        let prior = UkTaxRules.rules_for(TaxYear(2024)).unwrap();
        let current = UkTaxRules.rules_for(TaxYear(2025)).unwrap();
        assert_eq!(prior.national_insurance[0].rate, dec!(0.10));
        assert_eq!(current.national_insurance[0].rate, dec!(0.08));
    }

    #[test]
    fn uncovered_year_is_none() {
        assert!(UkTaxRules.rules_for(TaxYear(1999)).is_none());
        assert!(UkTaxRules.rules_for(TaxYear(2050)).is_none());
    }

    #[test]
    fn rules_round_trip_json() {
        let rules = rules_2024_25();
        let json = serde_json::to_string(&rules).unwrap();
        let back: TaxYearRules = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rules);
    }
}
