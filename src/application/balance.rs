use crate::domain::card::{Card, CardId, CardUnusable, OwnerId};
use crate::domain::ports::{CardStore, SharedCardStore};
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use tracing::{debug, error, warn};

/// How many times a deposit or transfer re-runs after losing an optimistic
/// write race before the conflict is handed to the caller.
const MAX_WRITE_ATTEMPTS: usize = 3;

/// Money movement: deposits, balance reads and two-card transfers.
///
/// Writes are optimistic: each attempt reloads the affected cards,
/// revalidates every rule against the fresh state and commits through the
/// store's version check, so concurrent writers can never lose an update.
pub struct BalanceService {
    cards: SharedCardStore,
}

impl BalanceService {
    pub fn new(cards: SharedCardStore) -> Self {
        Self { cards }
    }

    /// Adds `amount` to the card's balance. Amounts must be strictly positive.
    pub async fn deposit(&self, id: CardId, amount: Decimal, owner: OwnerId) -> Result<()> {
        if amount <= Decimal::ZERO {
            error!(%amount, "deposit rejected: non-positive amount");
            return Err(LedgerError::InvalidAmount(
                "amount must be greater than zero".into(),
            ));
        }

        let mut attempts = 0;
        loop {
            let mut card = self.owned(id, owner).await?;
            card.check_usable()
                .map_err(|why| business_rule(card.id, why))?;
            card.credit(amount);

            match self.cards.update(card).await {
                Ok(_) => {
                    debug!(card = id, owner, %amount, "deposit applied");
                    return Ok(());
                }
                Err(LedgerError::Conflict(reason)) if attempts + 1 < MAX_WRITE_ATTEMPTS => {
                    attempts += 1;
                    warn!(card = id, %reason, attempt = attempts, "deposit lost a write race, retrying");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Current balance of an active, unexpired card. Read-only.
    pub async fn balance(&self, id: CardId, owner: OwnerId) -> Result<Decimal> {
        let card = self.owned(id, owner).await?;
        card.check_usable()
            .map_err(|why| business_rule(card.id, why))?;
        Ok(card.balance)
    }

    /// Moves `amount` between two cards of the same owner as one atomic
    /// update: either both cards are persisted or neither is.
    ///
    /// Zero is a valid amount here; only negative amounts are rejected. This
    /// mirrors the deliberate asymmetry with `deposit`.
    pub async fn transfer(
        &self,
        owner: OwnerId,
        from: CardId,
        to: CardId,
        amount: Decimal,
    ) -> Result<()> {
        if amount < Decimal::ZERO {
            error!(%amount, "transfer rejected: negative amount");
            return Err(LedgerError::InvalidAmount("amount can't be negative".into()));
        }
        if from == to {
            error!(card = from, "transfer rejected: sender and recipient are the same card");
            return Err(LedgerError::TransferRule(
                "can't transfer to the same card".into(),
            ));
        }

        let mut attempts = 0;
        loop {
            // Sender is resolved first; a missing sender short-circuits
            // before the recipient lookup.
            let mut sender = self.cards.get_for_owner(from, owner).await?.ok_or_else(|| {
                error!(card = from, owner, "sender card not found");
                LedgerError::CardNotFound(format!("sender card {from} for owner {owner}"))
            })?;
            let mut recipient = self.cards.get_for_owner(to, owner).await?.ok_or_else(|| {
                error!(card = to, owner, "recipient card not found");
                LedgerError::CardNotFound(format!("recipient card {to} for owner {owner}"))
            })?;

            sender
                .check_usable()
                .map_err(|why| transfer_rule(sender.id, why))?;
            recipient
                .check_usable()
                .map_err(|why| transfer_rule(recipient.id, why))?;

            sender.debit(amount).map_err(|err| {
                error!(card = from, %amount, "insufficient funds for transfer");
                err
            })?;
            recipient.credit(amount);

            match self.cards.update_pair(sender, recipient).await {
                Ok(()) => {
                    debug!(from, to, owner, %amount, "transfer completed");
                    return Ok(());
                }
                Err(LedgerError::Conflict(reason)) if attempts + 1 < MAX_WRITE_ATTEMPTS => {
                    attempts += 1;
                    warn!(from, to, %reason, attempt = attempts, "transfer lost a write race, retrying");
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn owned(&self, id: CardId, owner: OwnerId) -> Result<Card> {
        self.cards.get_for_owner(id, owner).await?.ok_or_else(|| {
            error!(card = id, owner, "card not found for owner");
            LedgerError::CardNotFound(format!("id {id} for owner {owner}"))
        })
    }
}

fn business_rule(card: CardId, why: CardUnusable) -> LedgerError {
    error!(card, ?why, "card cannot take part in balance operation");
    LedgerError::BusinessRule(why.message(card))
}

fn transfer_rule(card: CardId, why: CardUnusable) -> LedgerError {
    error!(card, ?why, "card cannot take part in transfer");
    LedgerError::TransferRule(why.message(card))
}
