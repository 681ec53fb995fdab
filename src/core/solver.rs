use super::engine::project;
use super::error::{ProjectionError, ProjectionResult};
use super::types::{LoanParameters, MarketParameters};

#[derive(Debug, Clone, Copy)]
pub struct BreakEvenConfig {
    pub horizon_years: u32,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct BreakEvenIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_rent: f64,
    pub advantage: f64,
}

#[derive(Debug, Clone)]
pub struct BreakEvenResult {
    pub horizon_years: u32,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
    pub buy_net: f64,
    pub solved_rent: Option<f64>,
    pub advantage_at_solution: Option<f64>,
    pub iterations: Vec<BreakEvenIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

/// Buy minus rent net position at the horizon for a given monthly rent.
/// Buy net ignores rent; rent net falls as rent rises, so this is non-decreasing.
fn advantage_for_rent(
    loan: &LoanParameters,
    market: &MarketParameters,
    horizon_years: u32,
    rent: f64,
) -> ProjectionResult<(f64, f64)> {
    let mut market = market.clone();
    market.monthly_rent = rent;
    let projection = project(loan, &market, horizon_years)?;
    Ok((
        projection.summary.advantage_at_horizon,
        projection.summary.buy_net_at_horizon,
    ))
}

/// Bisects for the monthly rent at which renting and buying end the horizon
/// with the same net position.
pub fn solve_break_even_rent(
    loan: &LoanParameters,
    market: &MarketParameters,
    config: BreakEvenConfig,
) -> ProjectionResult<BreakEvenResult> {
    validate_config(loan, config)?;

    let (low_advantage, buy_net) =
        advantage_for_rent(loan, market, config.horizon_years, config.search_min)?;
    let (high_advantage, _) =
        advantage_for_rent(loan, market, config.horizon_years, config.search_max)?;

    let mut iterations = Vec::with_capacity(config.max_iterations as usize);
    let mut solved_rent = None;
    let mut advantage_at_solution = None;
    let mut converged = false;
    let feasible;
    let message;

    if low_advantage >= 0.0 {
        solved_rent = Some(config.search_min);
        advantage_at_solution = Some(low_advantage);
        converged = true;
        feasible = true;
        message = "Buying already wins at the lower rent bound.".to_string();
    } else if high_advantage < 0.0 {
        feasible = false;
        message = "Renting wins across the whole search range.".to_string();
    } else {
        let mut lo = config.search_min;
        let mut hi = config.search_max;
        let mut hi_advantage = high_advantage;
        let mut it = 0;
        while it < config.max_iterations {
            it += 1;
            let mid = (lo + hi) * 0.5;
            let (advantage, _) = advantage_for_rent(loan, market, config.horizon_years, mid)?;
            iterations.push(BreakEvenIteration {
                iteration: it,
                lower_bound: lo,
                upper_bound: hi,
                candidate_rent: mid,
                advantage,
            });

            if advantage >= 0.0 {
                hi = mid;
                hi_advantage = advantage;
            } else {
                lo = mid;
            }

            if (hi - lo).abs() <= config.tolerance {
                converged = true;
                break;
            }
        }
        solved_rent = Some(hi);
        advantage_at_solution = Some(hi_advantage);
        feasible = true;
        message = if converged {
            "Solved break-even rent.".to_string()
        } else {
            "Reached max iterations before tolerance was met; returning best estimate."
                .to_string()
        };
    }

    Ok(BreakEvenResult {
        horizon_years: config.horizon_years,
        search_min: config.search_min,
        search_max: config.search_max,
        tolerance: config.tolerance,
        max_iterations: config.max_iterations,
        buy_net,
        solved_rent,
        advantage_at_solution,
        iterations,
        converged,
        feasible,
        message,
    })
}

fn validate_config(loan: &LoanParameters, config: BreakEvenConfig) -> ProjectionResult<()> {
    if config.horizon_years == 0 || config.horizon_years > loan.term_years {
        return Err(ProjectionError::invalid(
            "horizon_years",
            format!("must be between 1 and the loan term ({})", loan.term_years),
        ));
    }
    if !config.search_min.is_finite() || !config.search_max.is_finite() {
        return Err(ProjectionError::invalid(
            "search_range",
            "bounds must be finite",
        ));
    }
    if config.search_min < 0.0 || config.search_max <= config.search_min {
        return Err(ProjectionError::invalid(
            "search_range",
            "requires 0 <= search_min < search_max",
        ));
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err(ProjectionError::invalid("tolerance", "must be > 0"));
    }
    if config.max_iterations == 0 {
        return Err(ProjectionError::invalid("max_iterations", "must be > 0"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::AppreciationConvention;
    use chrono::NaiveDate;
    use proptest::prelude::{prop_assert, proptest};

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

    fn sample_config() -> BreakEvenConfig {
        BreakEvenConfig {
            horizon_years: 15,
            search_min: 0.0,
            search_max: 20_000.0,
            tolerance: 0.01,
            max_iterations: 60,
        }
    }

    #[test]
    fn solved_rent_closes_the_gap() {
        let result =
            solve_break_even_rent(&sample_loan(), &sample_market(), sample_config()).expect("solve");
        assert!(result.feasible);
        assert!(result.converged);
        let rent = result.solved_rent.expect("solved rent");
        assert!(rent > 0.0 && rent < 20_000.0);

        let (at_solution, _) =
            advantage_for_rent(&sample_loan(), &sample_market(), 15, rent).expect("projection");
        assert!(at_solution >= 0.0);
        let (just_below, _) =
            advantage_for_rent(&sample_loan(), &sample_market(), 15, rent - 0.02).expect("projection");
        assert!(just_below < 0.0);
    }

    #[test]
    fn iterations_narrow_the_bracket() {
        let result =
            solve_break_even_rent(&sample_loan(), &sample_market(), sample_config()).expect("solve");
        assert!(!result.iterations.is_empty());
        for pair in result.iterations.windows(2) {
            let width_before = pair[0].upper_bound - pair[0].lower_bound;
            let width_after = pair[1].upper_bound - pair[1].lower_bound;
            assert!(width_after < width_before);
        }
    }

    #[test]
    fn reports_infeasible_when_rent_always_wins() {
        let mut config = sample_config();
        config.search_min = 0.0;
        config.search_max = 1.0;
        let result =
            solve_break_even_rent(&sample_loan(), &sample_market(), config).expect("solve");
        assert!(!result.feasible);
        assert!(result.solved_rent.is_none());
        assert!(result.iterations.is_empty());
    }

    #[test]
    fn rejects_bad_config() {
        let mut config = sample_config();
        config.search_max = config.search_min;
        assert!(solve_break_even_rent(&sample_loan(), &sample_market(), config).is_err());

        let mut config = sample_config();
        config.horizon_years = 31;
        assert!(solve_break_even_rent(&sample_loan(), &sample_market(), config).is_err());

        let mut config = sample_config();
        config.tolerance = 0.0;
        assert!(solve_break_even_rent(&sample_loan(), &sample_market(), config).is_err());
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(16))]

        #[test]
        fn prop_advantage_is_non_decreasing_in_rent(
            rent_a in 0u32..15_000,
            rent_b in 0u32..15_000,
            horizon in 1u32..=30
        ) {
            let (lo, hi) = if rent_a <= rent_b { (rent_a, rent_b) } else { (rent_b, rent_a) };
            let (advantage_lo, buy_lo) =
                advantage_for_rent(&sample_loan(), &sample_market(), horizon, lo as f64).expect("projection");
            let (advantage_hi, buy_hi) =
                advantage_for_rent(&sample_loan(), &sample_market(), horizon, hi as f64).expect("projection");
            prop_assert!(buy_lo == buy_hi);
            prop_assert!(advantage_hi + 1e-6 >= advantage_lo);
        }
    }
}
