//! Ether amounts.

use alloy::primitives::utils::parse_ether;
use alloy::primitives::U256;

/// Parse a non-negative decimal ether amount into wei.
///
/// `parse_ether` accepts a leading minus and returns the absolute value, so
/// the sign is rejected here first.
pub fn parse_amount(amount: &str) -> Result<U256, String> {
    let trimmed = amount.trim();
    if trimmed.is_empty() || trimmed.starts_with('-') {
        return Err(format!("'{}' is not a non-negative ether amount", amount));
    }
    parse_ether(trimmed).map_err(|e| format!("'{}' is not an ether amount: {}", amount, e))
}
