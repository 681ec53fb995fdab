mod amortization;
mod engine;
mod error;
mod finance;
mod rollup;
mod solver;
mod types;

pub use amortization::{build_monthly_ledger, monthly_principal_and_interest};
pub use engine::{
    MAX_TERM_YEARS, break_even_year, compare, monthly_costs, monthly_property_tax, project,
    validate_loan, validate_market,
};
pub use error::{ProjectionError, ProjectionResult};
pub use finance::{fv_annuity, pmt, round_cents, round_to};
pub use rollup::{
    BuyRollupInputs, RentRollupInputs, home_value_gross, monthly_saving, rollup_buy, rollup_rent,
};
pub use solver::{BreakEvenConfig, BreakEvenIteration, BreakEvenResult, solve_break_even_rent};
pub use types::{
    AppreciationConvention, ComparisonPoint, LoanParameters, MONTHS_PER_YEAR, MarketParameters,
    MonthlyCosts, MonthlyLedgerRow, Projection, ProjectionSummary, YearlyBuyRow, YearlyRentRow,
};
