use chrono::NaiveDate;
use serde::Serialize;

pub const MONTHS_PER_YEAR: u32 = 12;

/// Which power of the appreciation factor a year's home value uses.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppreciationConvention {
    /// Year `y` is valued at `(1 + a)^(y - 1)`; year 1 is the purchase price.
    #[default]
    StartOfYear,
    /// Year `y` is valued at `(1 + a)^y`.
    EndOfYear,
}

impl AppreciationConvention {
    pub fn exponent(self, year: u32) -> i32 {
        match self {
            AppreciationConvention::StartOfYear => year as i32 - 1,
            AppreciationConvention::EndOfYear => year as i32,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoanParameters {
    pub home_value: f64,
    pub down_payment_fraction: f64,
    pub annual_rate: f64,
    pub term_years: u32,
    pub monthly_hoa: f64,
    pub property_tax_rate: f64,
    pub monthly_insurance: f64,
    pub start_date: NaiveDate,
}

impl LoanParameters {
    pub fn principal(&self) -> f64 {
        self.home_value * (1.0 - self.down_payment_fraction)
    }

    pub fn down_payment(&self) -> f64 {
        self.home_value * self.down_payment_fraction
    }

    pub fn monthly_rate(&self) -> f64 {
        self.annual_rate / MONTHS_PER_YEAR as f64
    }

    pub fn periods(&self) -> u32 {
        self.term_years * MONTHS_PER_YEAR
    }
}

#[derive(Debug, Clone)]
pub struct MarketParameters {
    pub appreciation_rate: f64,
    pub selling_fee: f64,
    pub monthly_rent: f64,
    pub growth_rate: f64,
    pub appreciation_convention: AppreciationConvention,
}

/// Constant monthly outflows of the buy scenario.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCosts {
    pub principal_and_interest: f64,
    pub property_tax: f64,
    pub hoa: f64,
    pub insurance: f64,
}

impl MonthlyCosts {
    pub fn fees(self) -> f64 {
        self.property_tax + self.hoa + self.insurance
    }

    pub fn total(self) -> f64 {
        self.principal_and_interest + self.fees()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyLedgerRow {
    pub period: u32,
    pub payment_date: NaiveDate,
    pub payment: f64,
    pub principal_and_interest: f64,
    pub fees: f64,
    pub starting_balance: f64,
    pub interest_paid: f64,
    pub principal_paid: f64,
    pub ending_balance: f64,
    pub cumulative_principal: f64,
    pub cumulative_payment: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyBuyRow {
    pub year: u32,
    pub calendar_year: i32,
    pub payment: f64,
    pub principal_and_interest: f64,
    pub fees: f64,
    pub interest_paid: f64,
    pub principal_paid: f64,
    pub starting_balance: f64,
    pub ending_balance: f64,
    pub cumulative_principal: f64,
    pub cumulative_payment: f64,
    pub home_value_gross: f64,
    pub home_value: f64,
    pub net: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyRentRow {
    pub year: u32,
    pub calendar_year: i32,
    pub rent: f64,
    pub cumulative_rent: f64,
    pub saving: f64,
    pub asset: f64,
    pub net: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonPoint {
    pub year: u32,
    pub buy_net: f64,
    pub rent_net: f64,
    pub advantage: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionSummary {
    pub loan_amount: f64,
    pub down_payment: f64,
    pub monthly_costs: MonthlyCosts,
    pub monthly_fees: f64,
    pub monthly_payment: f64,
    pub monthly_saving: f64,
    pub total_interest: f64,
    pub final_balance: f64,
    pub horizon_years: u32,
    pub buy_net_at_horizon: f64,
    pub rent_net_at_horizon: f64,
    pub advantage_at_horizon: f64,
    pub break_even_year: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct Projection {
    pub ledger: Vec<MonthlyLedgerRow>,
    pub buy: Vec<YearlyBuyRow>,
    pub rent: Vec<YearlyRentRow>,
    pub comparison: Vec<ComparisonPoint>,
    pub summary: ProjectionSummary,
}
