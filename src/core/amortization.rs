use chrono::{Months, NaiveDate};

use super::error::{ProjectionError, ProjectionResult, require_non_negative};
use super::finance::{pmt, round_cents};
use super::types::MonthlyLedgerRow;

/// Fixed monthly principal-and-interest payment, rounded to cents once.
pub fn monthly_principal_and_interest(
    principal: f64,
    monthly_rate: f64,
    periods: u32,
) -> ProjectionResult<f64> {
    Ok(round_cents(pmt(monthly_rate, periods, principal)?))
}

/// Walks the loan period by period. Interest is rounded to cents on every row,
/// so the final balance carries the accumulated rounding and is not forced to 0.
pub fn build_monthly_ledger(
    principal: f64,
    monthly_rate: f64,
    periods: u32,
    monthly_fees: f64,
    first_payment: NaiveDate,
) -> ProjectionResult<Vec<MonthlyLedgerRow>> {
    if periods == 0 {
        return Err(ProjectionError::invalid("periods", "must be > 0"));
    }
    if !monthly_rate.is_finite() || monthly_rate < -1.0 {
        return Err(ProjectionError::invalid(
            "monthly_rate",
            "must be a finite rate >= -1",
        ));
    }
    require_non_negative("principal", principal)?;
    require_non_negative("monthly_fees", monthly_fees)?;

    let principal_and_interest = monthly_principal_and_interest(principal, monthly_rate, periods)?;
    let payment = principal_and_interest + monthly_fees;

    let mut rows = Vec::with_capacity(periods as usize);
    let mut balance = principal;
    let mut cumulative_principal = 0.0;
    let mut cumulative_payment = 0.0;

    for period in 1..=periods {
        let payment_date = first_payment
            .checked_add_months(Months::new(period - 1))
            .ok_or_else(|| ProjectionError::invalid("start_date", "payment dates overflow"))?;

        let starting_balance = balance;
        let interest_paid = round_cents(starting_balance * monthly_rate);
        let principal_paid = principal_and_interest - interest_paid;
        let ending_balance = starting_balance - principal_paid;
        cumulative_principal += principal_paid;
        cumulative_payment += payment;

        rows.push(MonthlyLedgerRow {
            period,
            payment_date,
            payment,
            principal_and_interest,
            fees: monthly_fees,
            starting_balance,
            interest_paid,
            principal_paid,
            ending_balance,
            cumulative_principal,
            cumulative_payment,
        });
        balance = ending_balance;
    }

    Ok(rows)
}
