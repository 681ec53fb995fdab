use super::amortization::{build_monthly_ledger, monthly_principal_and_interest};
use super::error::{
    ProjectionError, ProjectionResult, require_finite, require_non_negative, require_unit_interval,
};
use super::finance::round_to;
use super::rollup::{BuyRollupInputs, RentRollupInputs, monthly_saving, rollup_buy, rollup_rent};
use super::types::{
    ComparisonPoint, LoanParameters, MONTHS_PER_YEAR, MarketParameters, MonthlyCosts,
    MonthlyLedgerRow, Projection, ProjectionSummary, YearlyBuyRow, YearlyRentRow,
};

pub const MAX_TERM_YEARS: u32 = 50;

pub fn validate_loan(loan: &LoanParameters) -> ProjectionResult<()> {
    require_non_negative("home_value", loan.home_value)?;
    require_unit_interval("down_payment_fraction", loan.down_payment_fraction)?;
    require_unit_interval("annual_rate", loan.annual_rate)?;
    if loan.term_years == 0 || loan.term_years > MAX_TERM_YEARS {
        return Err(ProjectionError::invalid(
            "term_years",
            format!("must be between 1 and {MAX_TERM_YEARS}"),
        ));
    }
    require_non_negative("monthly_hoa", loan.monthly_hoa)?;
    require_unit_interval("property_tax_rate", loan.property_tax_rate)?;
    require_non_negative("monthly_insurance", loan.monthly_insurance)?;
    require_finite("principal", loan.principal())?;
    Ok(())
}

pub fn validate_market(market: &MarketParameters) -> ProjectionResult<()> {
    require_unit_interval("appreciation_rate", market.appreciation_rate)?;
    require_unit_interval("selling_fee", market.selling_fee)?;
    require_non_negative("monthly_rent", market.monthly_rent)?;
    require_unit_interval("growth_rate", market.growth_rate)?;
    Ok(())
}

/// Property tax is billed monthly in whole currency units.
pub fn monthly_property_tax(loan: &LoanParameters) -> f64 {
    round_to(
        loan.home_value * loan.property_tax_rate / MONTHS_PER_YEAR as f64,
        0,
    )
}

pub fn monthly_costs(loan: &LoanParameters) -> ProjectionResult<MonthlyCosts> {
    Ok(MonthlyCosts {
        principal_and_interest: monthly_principal_and_interest(
            loan.principal(),
            loan.monthly_rate(),
            loan.periods(),
        )?,
        property_tax: monthly_property_tax(loan),
        hoa: loan.monthly_hoa,
        insurance: loan.monthly_insurance,
    })
}

/// Aligns both yearly series on the year axis, truncated to `horizon_years`.
pub fn compare(
    buy: &[YearlyBuyRow],
    rent: &[YearlyRentRow],
    horizon_years: u32,
) -> ProjectionResult<Vec<ComparisonPoint>> {
    let horizon = horizon_years as usize;
    if horizon == 0 {
        return Err(ProjectionError::invalid("horizon_years", "must be > 0"));
    }
    if horizon > buy.len() || horizon > rent.len() {
        return Err(ProjectionError::invalid(
            "horizon_years",
            format!(
                "{horizon_years} exceeds the projected {} years",
                buy.len().min(rent.len())
            ),
        ));
    }

    buy.iter()
        .zip(rent)
        .take(horizon)
        .map(|(buy_row, rent_row)| {
            if buy_row.year != rent_row.year {
                return Err(ProjectionError::invalid(
                    "series",
                    format!(
                        "series disagree on the year axis ({} vs {})",
                        buy_row.year, rent_row.year
                    ),
                ));
            }
            Ok(ComparisonPoint {
                year: buy_row.year,
                buy_net: buy_row.net,
                rent_net: rent_row.net,
                advantage: buy_row.net - rent_row.net,
            })
        })
        .collect()
}

/// First year where buying is at least as good as renting.
pub fn break_even_year(points: &[ComparisonPoint]) -> Option<u32> {
    points
        .iter()
        .find(|point| point.buy_net >= point.rent_net)
        .map(|point| point.year)
}

pub fn project(
    loan: &LoanParameters,
    market: &MarketParameters,
    horizon_years: u32,
) -> ProjectionResult<Projection> {
    validate_loan(loan)?;
    validate_market(market)?;
    if horizon_years == 0 || horizon_years > loan.term_years {
        return Err(ProjectionError::invalid(
            "horizon_years",
            format!("must be between 1 and the loan term ({})", loan.term_years),
        ));
    }

    let costs = monthly_costs(loan)?;
    let ledger = build_monthly_ledger(
        loan.principal(),
        loan.monthly_rate(),
        loan.periods(),
        costs.fees(),
        loan.start_date,
    )?;

    let down_payment = loan.down_payment();
    let buy = rollup_buy(
        &ledger,
        BuyRollupInputs {
            home_value: loan.home_value,
            appreciation_rate: market.appreciation_rate,
            selling_fee: market.selling_fee,
            down_payment,
            convention: market.appreciation_convention,
        },
        loan.term_years,
    )?;

    let saving = monthly_saving(costs.total(), market.monthly_rent);
    let rent = rollup_rent(
        RentRollupInputs {
            monthly_rent: market.monthly_rent,
            growth_rate: market.growth_rate,
            monthly_saving: saving,
            down_payment,
            first_calendar_year: buy.first().map_or(0, |row| row.calendar_year),
        },
        loan.term_years,
    )?;

    let comparison = compare(&buy, &rent, horizon_years)?;
    let summary = summarize(loan, costs, saving, &ledger, &comparison, horizon_years)?;

    Ok(Projection {
        ledger,
        buy,
        rent,
        comparison,
        summary,
    })
}

fn summarize(
    loan: &LoanParameters,
    costs: MonthlyCosts,
    saving: f64,
    ledger: &[MonthlyLedgerRow],
    comparison: &[ComparisonPoint],
    horizon_years: u32,
) -> ProjectionResult<ProjectionSummary> {
    let (Some(last_row), Some(at_horizon)) = (ledger.last(), comparison.last()) else {
        return Err(ProjectionError::invalid(
            "horizon_years",
            "projection produced no rows",
        ));
    };

    Ok(ProjectionSummary {
        loan_amount: loan.principal(),
        down_payment: loan.down_payment(),
        monthly_costs: costs,
        monthly_fees: costs.fees(),
        monthly_payment: costs.total(),
        monthly_saving: saving,
        total_interest: ledger.iter().map(|row| row.interest_paid).sum(),
        final_balance: last_row.ending_balance,
        horizon_years,
        buy_net_at_horizon: at_horizon.buy_net,
        rent_net_at_horizon: at_horizon.rent_net,
        advantage_at_horizon: at_horizon.advantage,
        break_even_year: break_even_year(comparison),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::AppreciationConvention;
    use chrono::NaiveDate;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_loan() -> LoanParameters {
        LoanParameters {
            home_value: 1_500_000.0,
            down_payment_fraction: 0.20,
            annual_rate: 0.029,
            term_years: 30,
            monthly_hoa: 0.0,
            property_tax_rate: 0.0125,
            monthly_insurance: 100.0,
            start_date: NaiveDate::from_ymd_opt(2021, 1, 1).expect("valid date"),
        }
    }

    fn sample_market() -> MarketParameters {
        MarketParameters {
            appreciation_rate: 0.05,
            selling_fee: 0.06,
            monthly_rent: 4_000.0,
            growth_rate: 0.10,
            appreciation_convention: AppreciationConvention::StartOfYear,
        }
    }

    #[test]
    fn reference_scenario_summary() {
        let projection = project(&sample_loan(), &sample_market(), 15).expect("valid projection");
        let summary = &projection.summary;

        assert_approx(summary.loan_amount, 1_200_000.0);
        assert_approx(summary.down_payment, 300_000.0);
        assert_eq!(summary.monthly_costs.principal_and_interest, 4_994.76);
        assert_eq!(summary.monthly_costs.property_tax, 1_562.0);
        assert_approx(summary.monthly_fees, 1_662.0);
        assert_approx(summary.monthly_payment, 6_656.76);
        assert_approx(summary.monthly_saving, 2_656.76);
        assert!(summary.monthly_saving > 0.0);
        assert!(summary.final_balance.abs() <= 1.0);
        assert_eq!(summary.horizon_years, 15);
        assert_eq!(projection.ledger.len(), 360);
        assert_eq!(projection.buy.len(), 30);
        assert_eq!(projection.rent.len(), 30);
        assert_eq!(projection.comparison.len(), 15);
        assert_eq!(projection.ledger[0].interest_paid, 2_900.0);
    }

    #[test]
    fn total_monthly_payment_follows_the_formula() {
        let loan = sample_loan();
        let costs = monthly_costs(&loan).expect("valid costs");
        let expected_tax = (loan.home_value * loan.property_tax_rate / 12.0).round_ties_even();
        assert_eq!(costs.property_tax, expected_tax);
        assert_approx(
            costs.total(),
            costs.principal_and_interest + expected_tax + loan.monthly_hoa + loan.monthly_insurance,
        );
    }

    #[test]
    fn comparison_tracks_series_and_break_even() {
        let projection = project(&sample_loan(), &sample_market(), 30).expect("valid projection");
        for point in &projection.comparison {
            let index = point.year as usize - 1;
            assert_eq!(point.buy_net, projection.buy[index].net);
            assert_eq!(point.rent_net, projection.rent[index].net);
            assert_approx(point.advantage, point.buy_net - point.rent_net);
        }

        let expected = projection
            .comparison
            .iter()
            .find(|point| point.buy_net >= point.rent_net)
            .map(|point| point.year);
        assert_eq!(projection.summary.break_even_year, expected);
        assert_eq!(expected, Some(8));
    }

    #[test]
    fn break_even_year_is_none_when_renting_always_wins() {
        let points = [
            ComparisonPoint {
                year: 1,
                buy_net: -10.0,
                rent_net: -5.0,
                advantage: -5.0,
            },
            ComparisonPoint {
                year: 2,
                buy_net: -8.0,
                rent_net: -1.0,
                advantage: -7.0,
            },
        ];
        assert_eq!(break_even_year(&points), None);
        assert_eq!(break_even_year(&points[..0]), None);
    }

    #[test]
    fn horizon_equal_to_term_returns_full_series() {
        let projection = project(&sample_loan(), &sample_market(), 30).expect("valid projection");
        assert_eq!(projection.comparison.len(), 30);
        assert_eq!(projection.comparison.last().map(|p| p.year), Some(30));
    }

    #[test]
    fn horizon_past_term_is_invalid() {
        let err = project(&sample_loan(), &sample_market(), 31).expect_err("must reject horizon");
        assert!(matches!(
            err,
            ProjectionError::InvalidParameter { ref field, .. } if field == "horizon_years"
        ));
        assert!(project(&sample_loan(), &sample_market(), 0).is_err());
    }

    #[test]
    fn compare_rejects_horizon_beyond_series() {
        let projection = project(&sample_loan(), &sample_market(), 5).expect("valid projection");
        assert!(compare(&projection.buy, &projection.rent, 31).is_err());
        assert!(compare(&projection.buy[..10], &projection.rent, 11).is_err());
        assert_eq!(
            compare(&projection.buy, &projection.rent[..10], 10)
                .expect("valid comparison")
                .len(),
            10
        );
    }

    #[test]
    fn compare_reports_misaligned_series() {
        let projection = project(&sample_loan(), &sample_market(), 5).expect("valid projection");
        let err = compare(&projection.buy[1..], &projection.rent, 5).expect_err("years differ");
        assert!(matches!(
            err,
            ProjectionError::InvalidParameter { ref field, .. } if field == "series"
        ));
    }

    #[test]
    fn rent_above_buy_cost_leaves_only_down_payment_invested() {
        let mut market = sample_market();
        market.monthly_rent = 7_000.0;
        let projection = project(&sample_loan(), &market, 10).expect("valid projection");
        assert_eq!(projection.summary.monthly_saving, 0.0);
        for row in &projection.rent {
            let expected = crate::core::finance::round_cents(
                300_000.0 * 1.1f64.powi(row.year as i32),
            );
            assert_eq!(row.asset, expected);
        }
    }

    #[test]
    fn zero_rate_loan_is_supported() {
        let mut loan = sample_loan();
        loan.annual_rate = 0.0;
        let projection = project(&loan, &sample_market(), 30).expect("valid projection");
        assert_eq!(projection.summary.total_interest, 0.0);
        assert_approx(
            projection.summary.monthly_costs.principal_and_interest,
            3_333.33,
        );
        // 360 payments of 3,333.33 leave the truncated 0.0033 per month outstanding.
        assert!((projection.summary.final_balance - 1.2).abs() < 1e-6);
    }

    #[test]
    fn invalid_parameters_are_rejected_not_clamped() {
        let mut loan = sample_loan();
        loan.down_payment_fraction = 1.2;
        assert!(project(&loan, &sample_market(), 10).is_err());

        let mut loan = sample_loan();
        loan.term_years = 0;
        assert!(project(&loan, &sample_market(), 1).is_err());

        let mut loan = sample_loan();
        loan.home_value = f64::NAN;
        assert!(project(&loan, &sample_market(), 10).is_err());

        let mut market = sample_market();
        market.appreciation_rate = -0.01;
        assert!(project(&sample_loan(), &market, 10).is_err());

        let mut market = sample_market();
        market.monthly_rent = -1.0;
        assert!(project(&sample_loan(), &market, 10).is_err());
    }

    #[test]
    fn full_down_payment_means_no_loan() {
        let mut loan = sample_loan();
        loan.down_payment_fraction = 1.0;
        let projection = project(&loan, &sample_market(), 10).expect("valid projection");
        assert_eq!(projection.summary.loan_amount, 0.0);
        assert_eq!(projection.summary.monthly_costs.principal_and_interest, 0.0);
        assert!(projection.ledger.iter().all(|row| row.ending_balance == 0.0));
    }

    #[test]
    fn projection_is_deterministic() {
        let a = project(&sample_loan(), &sample_market(), 20).expect("valid projection");
        let b = project(&sample_loan(), &sample_market(), 20).expect("valid projection");
        assert_eq!(a.comparison, b.comparison);
        assert_eq!(a.summary.total_interest, b.summary.total_interest);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(24))]

        #[test]
        fn prop_projection_series_share_the_year_axis(
            home_value in 200_000u32..3_000_000,
            down_pct in 0u32..=100,
            apr_bp in 0u32..=500,
            term_years in 5u32..=30,
            rent in 500u32..10_000,
            growth_bp in 0u32..=5_000,
            horizon_seed in 0u32..1_000
        ) {
            let mut loan = sample_loan();
            loan.home_value = home_value as f64;
            loan.down_payment_fraction = down_pct as f64 / 100.0;
            loan.annual_rate = apr_bp as f64 / 10_000.0;
            loan.term_years = term_years;
            let mut market = sample_market();
            market.monthly_rent = rent as f64;
            market.growth_rate = growth_bp as f64 / 10_000.0;
            let horizon = horizon_seed % term_years + 1;

            let projection = project(&loan, &market, horizon).expect("valid projection");
            prop_assert_eq!(projection.ledger.len(), term_years as usize * 12);
            prop_assert_eq!(projection.buy.len(), term_years as usize);
            prop_assert_eq!(projection.rent.len(), term_years as usize);
            prop_assert_eq!(projection.comparison.len(), horizon as usize);
            prop_assert!(projection.summary.monthly_saving >= 0.0);
            for (index, (buy, rent)) in projection.buy.iter().zip(&projection.rent).enumerate() {
                prop_assert_eq!(buy.year as usize, index + 1);
                prop_assert_eq!(rent.year, buy.year);
                prop_assert_eq!(rent.calendar_year, buy.calendar_year);
                prop_assert!(buy.net.is_finite() && rent.net.is_finite());
            }
        }
    }
}
