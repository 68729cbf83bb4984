//! Contract sizing under a risk budget.
//!
//! `contracts = max(1, floor(risk_capital / (reference * 100)))`. The floor
//! to one contract is kept even when it exceeds the budget; it is recorded
//! as a minimum-viable-size recovery.

use crate::domain::diagnostics::{Diagnostics, Recovery};
use crate::domain::strategy::CONTRACT_MULTIPLIER;

/// `reference` is the per-share premium (debit trades) or max risk
/// (credit trades).
pub fn size_contracts(risk_capital: f64, reference: f64, diag: &mut Diagnostics) -> u32 {
    if !reference.is_finite() || reference <= 0.0 {
        diag.record(
            Recovery::DegenerateSizing,
            &format!("reference price {}", reference),
        );
        return 1;
    }

    let raw = (risk_capital / (reference * CONTRACT_MULTIPLIER)).floor();
    if raw.is_nan() || raw < 1.0 {
        diag.record(
            Recovery::MinimumViableSize,
            &format!(
                "risk capital {:.2} below one contract at {:.4}",
                risk_capital, reference
            ),
        );
        return 1;
    }
    // float-to-int casts saturate
    raw as u32
}
