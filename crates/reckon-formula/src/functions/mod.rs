//! Built-in functions
//!
//! Functions are N-ary operators. Argument counts are checked when the
//! formula is parsed, so implementations can rely on them.

pub mod math;

use crate::operators::OperatorDescriptor;

/// Function definitions registered by `OperatorRegistry::new`
pub(crate) fn builtin_functions() -> Vec<OperatorDescriptor> {
    vec![
        // Powers and logarithms
        OperatorDescriptor::function("ABS", 1, Some(1), math::fn_abs),
        OperatorDescriptor::function("SQRT", 1, Some(1), math::fn_sqrt),
        OperatorDescriptor::function("POWER", 2, Some(2), math::fn_power),
        OperatorDescriptor::function("EXP", 1, Some(1), math::fn_exp),
        OperatorDescriptor::function("LN", 1, Some(1), math::fn_ln),
        OperatorDescriptor::function("LOG", 1, Some(2), math::fn_log),
        OperatorDescriptor::function("LOG10", 1, Some(1), math::fn_log10),
        // Aggregates
        OperatorDescriptor::function("MIN", 1, None, math::fn_min),
        OperatorDescriptor::function("MAX", 1, None, math::fn_max),
        OperatorDescriptor::function("SUM", 1, None, math::fn_sum),
        OperatorDescriptor::function("AVERAGE", 1, None, math::fn_average),
        // Rounding
        OperatorDescriptor::function("FLOOR", 1, Some(1), math::fn_floor),
        OperatorDescriptor::function("CEILING", 1, Some(1), math::fn_ceiling),
        OperatorDescriptor::function("ROUND", 1, Some(2), math::fn_round),
        OperatorDescriptor::function("TRUNC", 1, Some(1), math::fn_trunc),
        OperatorDescriptor::function("SIGN", 1, Some(1), math::fn_sign),
        OperatorDescriptor::function("MOD", 2, Some(2), math::fn_mod),
        // Trigonometry
        OperatorDescriptor::function("SIN", 1, Some(1), math::fn_sin),
        OperatorDescriptor::function("COS", 1, Some(1), math::fn_cos),
        OperatorDescriptor::function("TAN", 1, Some(1), math::fn_tan),
        OperatorDescriptor::function("ASIN", 1, Some(1), math::fn_asin),
        OperatorDescriptor::function("ACOS", 1, Some(1), math::fn_acos),
        OperatorDescriptor::function("ATAN", 1, Some(1), math::fn_atan),
        OperatorDescriptor::function("ATAN2", 2, Some(2), math::fn_atan2),
        OperatorDescriptor::function("PI", 0, Some(0), math::fn_pi),
        // Logical
        OperatorDescriptor::function("IF", 3, Some(3), math::fn_if),
        // RAND (volatile)
        OperatorDescriptor::function("RAND", 0, Some(0), math::fn_rand).volatile(),
    ]
}
