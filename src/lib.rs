//! UK take-home pay calculator: personal allowance taper, banded income tax,
//! employee national insurance and student loan repayments per tax year.

pub mod paye;
pub mod rules;
pub mod year;

// Flat public surface for domain types and functions.
pub use paye::{calculate_take_home, take_home_for_year, Earnings, PayeError, PayeReport};
pub use rules::{Band, LoanPlan, RulesProvider, TaxYearRules, UkTaxRules};
pub use year::TaxYear;
