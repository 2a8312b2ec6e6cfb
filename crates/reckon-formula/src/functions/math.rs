//! Math functions
//!
//! All functions follow IEEE-754: out-of-domain inputs produce NaN or an
//! infinity rather than an error.

use crate::error::FormulaResult;
use crate::operators::builtin::truthy;

fn arg(args: &[f64], index: usize) -> f64 {
    args.get(index).copied().unwrap_or(f64::NAN)
}

/// ABS(number)
pub fn fn_abs(args: &[f64]) -> FormulaResult<f64> {
    Ok(arg(args, 0).abs())
}

/// SQRT(number) - NaN for negative numbers
pub fn fn_sqrt(args: &[f64]) -> FormulaResult<f64> {
    Ok(arg(args, 0).sqrt())
}

/// POWER(number, power) - Equivalent to number^power
pub fn fn_power(args: &[f64]) -> FormulaResult<f64> {
    Ok(arg(args, 0).powf(arg(args, 1)))
}

/// EXP(number)
pub fn fn_exp(args: &[f64]) -> FormulaResult<f64> {
    Ok(arg(args, 0).exp())
}

/// LN(number)
pub fn fn_ln(args: &[f64]) -> FormulaResult<f64> {
    Ok(arg(args, 0).ln())
}

/// LOG(number, [base]) - Default base is 10
pub fn fn_log(args: &[f64]) -> FormulaResult<f64> {
    let number = arg(args, 0);
    match args.get(1) {
        Some(base) => Ok(number.ln() / base.ln()),
        None => Ok(number.log10()),
    }
}

/// LOG10(number)
pub fn fn_log10(args: &[f64]) -> FormulaResult<f64> {
    Ok(arg(args, 0).log10())
}

/// MIN(number, ...) - NaN arguments are ignored unless all are NaN
pub fn fn_min(args: &[f64]) -> FormulaResult<f64> {
    Ok(args.iter().copied().fold(f64::NAN, f64::min))
}

/// MAX(number, ...) - NaN arguments are ignored unless all are NaN
pub fn fn_max(args: &[f64]) -> FormulaResult<f64> {
    Ok(args.iter().copied().fold(f64::NAN, f64::max))
}

/// SUM(number, ...)
pub fn fn_sum(args: &[f64]) -> FormulaResult<f64> {
    Ok(args.iter().sum())
}

/// AVERAGE(number, ...)
pub fn fn_average(args: &[f64]) -> FormulaResult<f64> {
    Ok(args.iter().sum::<f64>() / args.len() as f64)
}

/// FLOOR(number) - Largest integer less than or equal to number
pub fn fn_floor(args: &[f64]) -> FormulaResult<f64> {
    Ok(arg(args, 0).floor())
}

/// CEILING(number) - Smallest integer greater than or equal to number
pub fn fn_ceiling(args: &[f64]) -> FormulaResult<f64> {
    Ok(arg(args, 0).ceil())
}

/// ROUND(number, [num_digits])
///
/// Rounds half away from zero: ROUND(2.5) = 3, ROUND(-2.5) = -3.
/// Negative `num_digits` round to the left of the decimal point. The
/// stored binary value is what gets rounded, so ROUND(1.005, 2) = 1.
pub fn fn_round(args: &[f64]) -> FormulaResult<f64> {
    let number = arg(args, 0);
    let num_digits = args.get(1).copied().unwrap_or(0.0).trunc() as i32;

    let multiplier = 10_f64.powi(num_digits);
    if multiplier == 0.0 {
        return Ok(if number.is_finite() { 0.0_f64.copysign(number) } else { number });
    }

    let scaled = number * multiplier;
    if !scaled.is_finite() {
        // Already whole at this many digits
        return Ok(number);
    }
    Ok(scaled.round() / multiplier)
}

/// TRUNC(number) - Drops the fractional part
pub fn fn_trunc(args: &[f64]) -> FormulaResult<f64> {
    Ok(arg(args, 0).trunc())
}

/// SIGN(number) - 1, -1 or 0
pub fn fn_sign(args: &[f64]) -> FormulaResult<f64> {
    let n = arg(args, 0);
    let sign = if n > 0.0 {
        1.0
    } else if n < 0.0 {
        -1.0
    } else {
        n * 0.0
    };
    Ok(sign)
}

/// MOD(number, divisor)
///
/// `number - divisor * floor(number / divisor)`, so the result has the sign
/// of the divisor. A zero divisor yields NaN.
pub fn fn_mod(args: &[f64]) -> FormulaResult<f64> {
    let number = arg(args, 0);
    let divisor = arg(args, 1);
    Ok(number - divisor * (number / divisor).floor())
}

pub fn fn_sin(args: &[f64]) -> FormulaResult<f64> {
    Ok(arg(args, 0).sin())
}

pub fn fn_cos(args: &[f64]) -> FormulaResult<f64> {
    Ok(arg(args, 0).cos())
}

pub fn fn_tan(args: &[f64]) -> FormulaResult<f64> {
    Ok(arg(args, 0).tan())
}

pub fn fn_asin(args: &[f64]) -> FormulaResult<f64> {
    Ok(arg(args, 0).asin())
}

pub fn fn_acos(args: &[f64]) -> FormulaResult<f64> {
    Ok(arg(args, 0).acos())
}

pub fn fn_atan(args: &[f64]) -> FormulaResult<f64> {
    Ok(arg(args, 0).atan())
}

/// ATAN2(y, x)
pub fn fn_atan2(args: &[f64]) -> FormulaResult<f64> {
    Ok(arg(args, 0).atan2(arg(args, 1)))
}

/// PI()
pub fn fn_pi(_args: &[f64]) -> FormulaResult<f64> {
    Ok(std::f64::consts::PI)
}

/// IF(condition, value_if_true, value_if_false)
///
/// Unlike the `? :` operator, all three arguments are evaluated.
pub fn fn_if(args: &[f64]) -> FormulaResult<f64> {
    if truthy(arg(args, 0)) {
        Ok(arg(args, 1))
    } else {
        Ok(arg(args, 2))
    }
}

/// RAND() - Uniform random number in [0, 1)
/// This is a volatile function that returns a different value on each evaluation.
pub fn fn_rand(_args: &[f64]) -> FormulaResult<f64> {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    Ok(rng.gen::<f64>())
}
