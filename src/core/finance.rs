use super::error::{ProjectionError, ProjectionResult};

/// Fixed payment that amortizes `principal` over `periods` at `rate` per period.
///
/// A zero rate takes the linear branch `principal / periods`; the general
/// formula is singular there.
pub fn pmt(rate: f64, periods: u32, principal: f64) -> ProjectionResult<f64> {
    if periods == 0 {
        return Err(ProjectionError::invalid("periods", "must be > 0"));
    }
    if !rate.is_finite() || rate <= -1.0 {
        return Err(ProjectionError::invalid("rate", "must be a finite rate > -1"));
    }
    if !principal.is_finite() || principal < 0.0 {
        return Err(ProjectionError::invalid("principal", "must be >= 0"));
    }

    let Ok(exponent) = i32::try_from(periods) else {
        return Err(ProjectionError::invalid("periods", "must fit in a signed 32-bit count"));
    };

    if rate == 0.0 {
        return Ok(principal / periods as f64);
    }

    let payment = rate * principal / (1.0 - (1.0 + rate).powi(-exponent));
    if !payment.is_finite() {
        return Err(ProjectionError::invalid(
            "rate",
            "payment is not representable for this rate and term",
        ));
    }
    Ok(payment)
}

/// Future value of an ordinary annuity of `payment` per period.
pub fn fv_annuity(rate: f64, periods: u32, payment: f64) -> f64 {
    if rate == 0.0 {
        payment * periods as f64
    } else {
        payment * (compound(rate, periods) - 1.0) / rate
    }
}

/// `(1 + rate)^periods`, falling back to `powf` past the `i32` range.
fn compound(rate: f64, periods: u32) -> f64 {
    match i32::try_from(periods) {
        Ok(n) => (1.0 + rate).powi(n),
        Err(_) => (1.0 + rate).powf(f64::from(periods)),
    }
}

/// Round half to even at `decimals` places, applied to the scaled value.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}

pub fn round_cents(value: f64) -> f64 {
    round_to(value, 2)
}
