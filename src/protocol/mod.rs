pub mod clmm;
pub mod decimal;
pub mod errors;
pub mod safe_math;
