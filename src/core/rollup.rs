use chrono::Datelike;

use super::error::{ProjectionError, ProjectionResult, require_non_negative, require_unit_interval};
use super::finance::{fv_annuity, round_cents};
use super::types::{
    AppreciationConvention, MONTHS_PER_YEAR, MonthlyLedgerRow, YearlyBuyRow, YearlyRentRow,
};

#[derive(Debug, Clone, Copy)]
pub struct BuyRollupInputs {
    pub home_value: f64,
    pub appreciation_rate: f64,
    pub selling_fee: f64,
    pub down_payment: f64,
    pub convention: AppreciationConvention,
}

#[derive(Debug, Clone, Copy)]
pub struct RentRollupInputs {
    pub monthly_rent: f64,
    pub growth_rate: f64,
    pub monthly_saving: f64,
    pub down_payment: f64,
    pub first_calendar_year: i32,
}

/// Renting only frees cash to invest when buying costs strictly more.
pub fn monthly_saving(total_monthly_buy_cost: f64, monthly_rent: f64) -> f64 {
    (total_monthly_buy_cost - monthly_rent).max(0.0)
}

/// Appreciated home value before the selling fee.
pub fn home_value_gross(
    home_value: f64,
    appreciation_rate: f64,
    convention: AppreciationConvention,
    year: u32,
) -> f64 {
    home_value * (1.0 + appreciation_rate).powi(convention.exponent(year))
}

pub fn rollup_buy(
    ledger: &[MonthlyLedgerRow],
    inputs: BuyRollupInputs,
    years: u32,
) -> ProjectionResult<Vec<YearlyBuyRow>> {
    require_non_negative("home_value", inputs.home_value)?;
    require_non_negative("appreciation_rate", inputs.appreciation_rate)?;
    require_unit_interval("selling_fee", inputs.selling_fee)?;
    require_non_negative("down_payment", inputs.down_payment)?;
    if years == 0 {
        return Err(ProjectionError::invalid("years", "must be > 0"));
    }
    let months = MONTHS_PER_YEAR as usize;
    if ledger.len() < years as usize * months {
        return Err(ProjectionError::invalid(
            "years",
            format!(
                "ledger covers {} months, {} years requested",
                ledger.len(),
                years
            ),
        ));
    }

    let mut rows = Vec::with_capacity(years as usize);
    let mut cumulative_principal = 0.0;
    let mut cumulative_payment = 0.0;

    for (index, months_of_year) in ledger.chunks_exact(months).take(years as usize).enumerate() {
        let year = index as u32 + 1;
        let first = &months_of_year[0];
        let last = &months_of_year[months - 1];

        let interest_paid: f64 = months_of_year.iter().map(|row| row.interest_paid).sum();
        let principal_paid: f64 = months_of_year.iter().map(|row| row.principal_paid).sum();
        let principal_and_interest = first.principal_and_interest * MONTHS_PER_YEAR as f64;
        let fees = first.fees * MONTHS_PER_YEAR as f64;
        let payment = first.payment * MONTHS_PER_YEAR as f64;
        cumulative_principal += principal_paid;
        cumulative_payment += payment;

        let gross = home_value_gross(
            inputs.home_value,
            inputs.appreciation_rate,
            inputs.convention,
            year,
        );
        let home_value = round_cents(gross * (1.0 - inputs.selling_fee));
        let net = home_value - last.ending_balance - cumulative_payment - inputs.down_payment;

        rows.push(YearlyBuyRow {
            year,
            calendar_year: first.payment_date.year(),
            payment,
            principal_and_interest,
            fees,
            interest_paid,
            principal_paid,
            starting_balance: first.starting_balance,
            ending_balance: last.ending_balance,
            cumulative_principal,
            cumulative_payment,
            home_value_gross: round_cents(gross),
            home_value,
            net,
        });
    }

    Ok(rows)
}

/// The renter invests the down payment up front and the yearly saving as an
/// annuity. Net subtracts everything put in: rent, down payment and savings.
pub fn rollup_rent(inputs: RentRollupInputs, years: u32) -> ProjectionResult<Vec<YearlyRentRow>> {
    require_non_negative("monthly_rent", inputs.monthly_rent)?;
    require_non_negative("growth_rate", inputs.growth_rate)?;
    require_non_negative("monthly_saving", inputs.monthly_saving)?;
    require_non_negative("down_payment", inputs.down_payment)?;
    if years == 0 {
        return Err(ProjectionError::invalid("years", "must be > 0"));
    }

    let rent = inputs.monthly_rent * MONTHS_PER_YEAR as f64;
    let saving = inputs.monthly_saving * MONTHS_PER_YEAR as f64;
    let mut cumulative_rent = 0.0;

    let rows: Vec<YearlyRentRow> = (1..=years)
        .map(|year| {
            cumulative_rent += rent;
            let compounded_down_payment =
                inputs.down_payment * (1.0 + inputs.growth_rate).powi(year as i32);
            let asset = round_cents(
                fv_annuity(inputs.growth_rate, year, saving) + compounded_down_payment,
            );
            let net = asset - cumulative_rent - inputs.down_payment - year as f64 * saving;

            YearlyRentRow {
                year,
                calendar_year: inputs.first_calendar_year + year as i32 - 1,
                rent,
                cumulative_rent,
                saving,
                asset,
                net,
            }
        })
        .collect();

    Ok(rows)
}
