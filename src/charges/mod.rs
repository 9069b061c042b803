//! This module contains the atomic charge model used when a charge-dependent dispersion
//! term is evaluated without caller-supplied charges.
//!
//! It includes the `EeqModel` implementation and `EeqOptions` for configuring its
//! coordination number.

mod eeq;
mod options;

pub use eeq::{ChargeResult, EeqModel};
pub use options::EeqOptions;
