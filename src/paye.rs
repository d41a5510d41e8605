use crate::rules::{Band, LoanPlan, RulesProvider, TaxYearRules};
use crate::year::TaxYear;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io::Write;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PayeError {
    #[error("income must be greater than zero")]
    NonPositiveIncome,
    #[error("deductions must not be negative")]
    NegativeDeductions,
    #[error("deductions must be lesser than income")]
    DeductionsNotBelowIncome,
    #[error("taxable benefits must not be negative")]
    NegativeBenefits,
    #[error("invalid tax year: {0}")]
    UnknownTaxYear(String),
    #[error("invalid student loan plan: {0}")]
    UnknownLoanPlan(u32),
}

/// Gross pay position for a single tax year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Earnings {
    /// Gross income for the year
    #[schemars(with = "f64")]
    pub income: Decimal,
    /// Pre-tax deductions such as pension contributions
    #[serde(default)]
    #[schemars(with = "f64")]
    pub deductions: Decimal,
    /// Benefits in kind taxed through payroll
    #[serde(default)]
    #[schemars(with = "f64")]
    pub taxable_benefits: Decimal,
    /// Student loan plan number, 0 if not repaying a student loan
    #[serde(default)]
    pub student_loan_plan: u32,
}

/// Deduction breakdown for a single tax year
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayeReport {
    /// Tax-free allowance after tapering
    pub personal_allowance: Decimal,
    /// Income tax owed per band, unrounded
    pub banded_income_tax: Vec<Decimal>,
    /// National insurance owed per band, unrounded
    pub banded_national_insurance: Vec<Decimal>,
    /// Student loan repayment, rounded to the penny
    pub student_loan: Decimal,
    pub take_home: Decimal,
}

impl PayeReport {
    /// Total income tax across all bands, unrounded
    pub fn total_income_tax(&self) -> Decimal {
        self.banded_income_tax.iter().sum()
    }

    /// Total national insurance, rounded to the penny
    pub fn total_national_insurance(&self) -> Decimal {
        self.banded_national_insurance
            .iter()
            .sum::<Decimal>()
            .round_dp(2)
    }

    /// Write the breakdown to CSV, one row per payslip line
    pub fn write_csv<W: Write>(&self, writer: W) -> csv::Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.serialize(PayslipCsvRecord::new("personal_allowance", None, self.personal_allowance))?;
        for (i, amount) in self.banded_income_tax.iter().enumerate() {
            wtr.serialize(PayslipCsvRecord::new("income_tax", Some(i + 1), *amount))?;
        }
        for (i, amount) in self.banded_national_insurance.iter().enumerate() {
            wtr.serialize(PayslipCsvRecord::new("national_insurance", Some(i + 1), *amount))?;
        }
        wtr.serialize(PayslipCsvRecord::new("student_loan", None, self.student_loan))?;
        wtr.serialize(PayslipCsvRecord::new("take_home", None, self.take_home))?;
        wtr.flush()?;
        Ok(())
    }
}

/// CSV record for payslip output
#[derive(Debug, Serialize, Deserialize)]
struct PayslipCsvRecord {
    line: String,
    band: String,
    amount_gbp: String,
}

impl PayslipCsvRecord {
    fn new(line: &str, band: Option<usize>, amount: Decimal) -> Self {
        PayslipCsvRecord {
            line: line.to_string(),
            band: band.map(|b| b.to_string()).unwrap_or_default(),
            amount_gbp: format!("{:.2}", amount),
        }
    }
}

/// Calculate the deduction breakdown and take-home pay for `earnings` under
/// the given tax year rules.
///
/// Income tax and the student loan threshold are assessed on income after
/// deductions plus taxable benefits; national insurance is assessed on income
/// after deductions only. Validation failures abort before any computation.
pub fn calculate_take_home(
    earnings: &Earnings,
    rules: &TaxYearRules,
) -> Result<PayeReport, PayeError> {
    if earnings.income <= Decimal::ZERO {
        return Err(PayeError::NonPositiveIncome);
    }
    if earnings.deductions < Decimal::ZERO {
        return Err(PayeError::NegativeDeductions);
    }
    if earnings.deductions >= earnings.income {
        return Err(PayeError::DeductionsNotBelowIncome);
    }
    if earnings.taxable_benefits < Decimal::ZERO {
        return Err(PayeError::NegativeBenefits);
    }
    let plan = match earnings.student_loan_plan {
        0 => None,
        id => Some(
            rules
                .student_loan_plans
                .get(&id)
                .ok_or(PayeError::UnknownLoanPlan(id))?,
        ),
    };

    let net_income = earnings.income - earnings.deductions;
    let assessable = net_income + earnings.taxable_benefits;

    let personal_allowance = tapered_allowance(
        assessable,
        rules.personal_allowance,
        rules.allowance_income_limit,
    );
    log::debug!(
        "assessable={}, net_income={}, allowance={}",
        assessable,
        net_income,
        personal_allowance
    );

    // Income tax floors sit on top of whatever allowance survives the taper
    let tax_bands: Vec<Band> = rules
        .income_tax
        .iter()
        .map(|band| Band::new(band.floor + personal_allowance, band.rate))
        .collect();
    let banded_income_tax = banded_deductions(&tax_bands, assessable);

    // National insurance is charged on net income, before benefits in kind
    let banded_national_insurance = banded_deductions(&rules.national_insurance, net_income);

    let student_loan = plan.map_or(Decimal::ZERO, |plan| student_loan_repayment(assessable, plan));

    let income_tax_total: Decimal = banded_income_tax.iter().sum();
    let ni_total = banded_national_insurance
        .iter()
        .sum::<Decimal>()
        .round_dp(2);
    let take_home = net_income - ni_total - income_tax_total - student_loan;
    log::debug!(
        "income_tax={}, national_insurance={}, student_loan={}, take_home={}",
        income_tax_total,
        ni_total,
        student_loan,
        take_home
    );

    Ok(PayeReport {
        personal_allowance,
        banded_income_tax,
        banded_national_insurance,
        student_loan,
        take_home,
    })
}

/// Calculate the deduction breakdown for a tax year key such as "24/25",
/// resolving the ruleset through `provider`.
pub fn take_home_for_year(
    earnings: &Earnings,
    tax_year: &str,
    provider: &impl RulesProvider,
) -> Result<PayeReport, PayeError> {
    let rules = TaxYear::parse(tax_year)
        .and_then(|year| provider.rules_for(year))
        .ok_or_else(|| PayeError::UnknownTaxYear(tax_year.to_string()))?;
    calculate_take_home(earnings, &rules)
}

/// Personal allowance after tapering: £1 of allowance is lost for every £2 of
/// assessed income above the income limit, floored at zero.
fn tapered_allowance(assessed: Decimal, allowance: Decimal, income_limit: Decimal) -> Decimal {
    if assessed <= income_limit {
        return allowance;
    }
    let reduction = (assessed - income_limit) / dec!(2);
    if reduction < allowance {
        allowance - reduction
    } else {
        Decimal::ZERO
    }
}

/// Amount owed per band for the assessed amount.
///
/// The band containing `assessed` (the highest floor strictly below it) takes
/// the marginal remainder; every band below it is saturated at its full width;
/// bands at or above `assessed` take nothing. An amount exactly on a floor
/// belongs to the bands below it.
fn banded_deductions(bands: &[Band], assessed: Decimal) -> Vec<Decimal> {
    bands
        .iter()
        .enumerate()
        .map(|(i, band)| {
            if band.floor >= assessed {
                return Decimal::ZERO;
            }
            match bands.get(i + 1) {
                Some(next) if next.floor < assessed => (next.floor - band.floor) * band.rate,
                _ => (assessed - band.floor) * band.rate,
            }
        })
        .collect()
}

/// Repayment owed on assessed income above the plan threshold, rounded to the
/// penny.
fn student_loan_repayment(assessed: Decimal, plan: &LoanPlan) -> Decimal {
    let over = assessed - plan.threshold;
    if over > Decimal::ZERO {
        (over * plan.rate).round_dp(2)
    } else {
        Decimal::ZERO
    }
}
