//! Anti-scalping economics: resale cap, royalty split, transfer cooldown.

use crate::error::{MarketError, Result};
use crate::types::Amount;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Highest resale price as a percentage of the original mint price.
pub const MAX_RESALE_PERCENTAGE: u32 = 110;

/// Organizer's cut of every resale, as a percentage of the sale price.
pub const ROYALTY_PERCENTAGE: u32 = 5;

/// Minimum time between an ownership change and the next listing.
pub const TRANSFER_COOLDOWN_SECS: i64 = 24 * 60 * 60;

/// Longest cooldown a policy may configure: one year.
pub const MAX_TRANSFER_COOLDOWN_SECS: i64 = 365 * TRANSFER_COOLDOWN_SECS;

/// The economic rules applied by the listing book.
///
/// All arithmetic is on integer base units; percentages round down.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketPolicy {
    /// Resale cap, percent of original price (110 = 1.10x)
    pub max_resale_percentage: u32,
    /// Royalty, percent of sale price
    pub royalty_percentage: u32,
    /// Cooldown after any ownership change, in seconds
    pub transfer_cooldown_secs: i64,
}

impl Default for MarketPolicy {
    fn default() -> Self {
        Self {
            max_resale_percentage: MAX_RESALE_PERCENTAGE,
            royalty_percentage: ROYALTY_PERCENTAGE,
            transfer_cooldown_secs: TRANSFER_COOLDOWN_SECS,
        }
    }
}

/// How a sale price is divided.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoyaltySplit {
    /// Credited to the event organizer
    pub royalty: Amount,
    /// Credited to the seller
    pub seller_proceeds: Amount,
}

impl MarketPolicy {
    /// The cooldown as a duration.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Validation`] if the configured seconds are
    /// negative or beyond [`MAX_TRANSFER_COOLDOWN_SECS`].
    pub fn transfer_cooldown(&self) -> Result<Duration> {
        if !(0..=MAX_TRANSFER_COOLDOWN_SECS).contains(&self.transfer_cooldown_secs) {
            return Err(MarketError::validation("transfer cooldown out of range"));
        }
        Duration::try_seconds(self.transfer_cooldown_secs)
            .ok_or_else(|| MarketError::validation("transfer cooldown out of range"))
    }

    /// Highest listing price allowed for a ticket minted at `original_price`.
    ///
    /// `price` is accepted iff `price * 100 <= original_price * max_resale_percentage`,
    /// which for integer prices is `price <= floor(original_price * pct / 100)`.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Validation`] if the computation overflows.
    pub fn max_resale_price(&self, original_price: Amount) -> Result<Amount> {
        original_price
            .checked_percent(self.max_resale_percentage)
            .ok_or_else(|| MarketError::validation("resale cap overflows"))
    }

    /// Split a sale price into organizer royalty and seller proceeds.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Validation`] if the computation overflows.
    pub fn split(&self, price: Amount) -> Result<RoyaltySplit> {
        let royalty = price
            .checked_percent(self.royalty_percentage)
            .ok_or_else(|| MarketError::validation("royalty overflows"))?;
        let seller_proceeds = price
            .checked_sub(royalty)
            .ok_or_else(|| MarketError::validation("royalty exceeds sale price"))?;
        Ok(RoyaltySplit {
            royalty,
            seller_proceeds,
        })
    }

    /// Time left before a ticket last transferred at `last_transfer` may be
    /// listed, or `None` once `now - last_transfer >= cooldown`.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Validation`] if the cooldown is out of range or
    /// the arithmetic overflows.
    pub fn cooldown_remaining(
        &self,
        last_transfer: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<Duration>> {
        let cooldown = self.transfer_cooldown()?;
        let elapsed = now.signed_duration_since(last_transfer);
        if elapsed >= cooldown {
            return Ok(None);
        }
        cooldown
            .checked_sub(&elapsed)
            .map(Some)
            .ok_or_else(|| MarketError::validation("cooldown arithmetic overflows"))
    }

    /// When a ticket transferred at `last_transfer` becomes listable.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Validation`] if the cooldown is out of range or
    /// the resulting time is not representable.
    pub fn cooldown_until(&self, last_transfer: DateTime<Utc>) -> Result<DateTime<Utc>> {
        last_transfer
            .checked_add_signed(self.transfer_cooldown()?)
            .ok_or_else(|| MarketError::validation("cooldown end overflows"))
    }
}
