//! Value accounting: primary-sale escrow and per-identity balances.

use crate::error::{MarketError, Result, Role};
use crate::records::MarketRecord;
use crate::types::{Amount, Identity};
use std::collections::HashMap;

/// Platform escrow plus credited balances.
///
/// Mint payments accrue to escrow until the platform owner withdraws them;
/// resale payouts are credited straight to the recipients.
#[derive(Clone, Debug)]
pub struct Treasury {
    owner: Identity,
    escrow: Amount,
    balances: HashMap<Identity, Amount>,
}

impl Treasury {
    /// Creates an empty treasury owned by `owner`
    #[must_use]
    pub fn new(owner: Identity) -> Self {
        Self {
            owner,
            escrow: Amount::ZERO,
            balances: HashMap::new(),
        }
    }

    /// The platform owner.
    #[must_use]
    pub const fn owner(&self) -> &Identity {
        &self.owner
    }

    /// Primary-sale funds not yet withdrawn.
    #[must_use]
    pub const fn escrow_balance(&self) -> Amount {
        self.escrow
    }

    /// Funds credited to `identity` by resales and withdrawals.
    #[must_use]
    pub fn balance_of(&self, identity: &Identity) -> Amount {
        self.balances.get(identity).copied().unwrap_or_default()
    }

    /// Checks that `caller` may withdraw and returns the amount that would move.
    ///
    /// # Errors
    ///
    /// - [`MarketError::Unauthorized`] unless the caller is the platform owner
    /// - [`MarketError::Validation`] if the escrow is empty
    pub fn check_withdraw(&self, caller: &Identity) -> Result<Amount> {
        if caller != &self.owner {
            return Err(MarketError::Unauthorized {
                caller: caller.clone(),
                required: Role::PlatformOwner,
            });
        }
        if self.escrow.is_zero() {
            return Err(MarketError::validation("No funds to withdraw"));
        }
        Ok(self.escrow)
    }

    fn credit(&mut self, to: &Identity, amount: Amount) -> Result<()> {
        let balance = self.balances.entry(to.clone()).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| MarketError::validation(format!("balance of {to} overflows")))?;
        Ok(())
    }

    /// Applies a committed record.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Validation`] if a balance would overflow or the
    /// escrow would go negative.
    pub fn apply(&mut self, record: &MarketRecord) -> Result<()> {
        match record {
            MarketRecord::TicketMinted { payment, .. } => {
                self.escrow = self
                    .escrow
                    .checked_add(*payment)
                    .ok_or_else(|| MarketError::validation("escrow overflows"))?;
            },
            MarketRecord::FundsTransferred { to, amount, .. } => self.credit(to, *amount)?,
            MarketRecord::FundsWithdrawn { to, amount, .. } => {
                self.escrow = self
                    .escrow
                    .checked_sub(*amount)
                    .ok_or_else(|| MarketError::validation("withdrawal exceeds escrow"))?;
                self.credit(to, *amount)?;
            },
            _ => {},
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::records::PayoutKind;
    use crate::types::TokenId;
    use chrono::{DateTime, Utc};

    fn owner() -> Identity {
        Identity::new("0xplatform")
    }

    #[test]
    fn withdraw_requires_owner_and_funds() {
        let mut treasury = Treasury::new(owner());
        assert!(matches!(
            treasury.check_withdraw(&owner()),
            Err(MarketError::Validation { .. })
        ));
        assert!(matches!(
            treasury.check_withdraw(&Identity::new("0xother")),
            Err(MarketError::Unauthorized {
                required: Role::PlatformOwner,
                ..
            })
        ));

        treasury
            .apply(&MarketRecord::FundsWithdrawn {
                to: owner(),
                amount: Amount::from_tokens(1),
                withdrawn_at: DateTime::<Utc>::UNIX_EPOCH,
            })
            .unwrap_err();
        assert_eq!(treasury.balance_of(&owner()), Amount::ZERO);
    }

    #[test]
    fn payouts_credit_recipients() {
        let mut treasury = Treasury::new(owner());
        let seller = Identity::new("0xseller");
        for _ in 0..2 {
            treasury
                .apply(&MarketRecord::FundsTransferred {
                    to: seller.clone(),
                    amount: Amount::from_base_units(105),
                    kind: PayoutKind::SaleProceeds,
                    token_id: TokenId::new(1),
                })
                .unwrap();
        }
        assert_eq!(treasury.balance_of(&seller), Amount::from_base_units(210));
        assert_eq!(treasury.escrow_balance(), Amount::ZERO);
    }
}
