use crate::domain::expiry::Expiry;
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type CardId = u64;
pub type OwnerId = u64;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    Active,
    Blocked,
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardStatus::Active => f.write_str("active"),
            CardStatus::Blocked => f.write_str("blocked"),
        }
    }
}

/// Why a card cannot take part in a balance operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardUnusable {
    NotActive,
    Expired,
}

impl CardUnusable {
    pub fn message(self, card: CardId) -> String {
        match self {
            CardUnusable::NotActive => format!("card {card} is not active"),
            CardUnusable::Expired => format!("card {card} has expired"),
        }
    }
}

/// A card account in the ledger.
///
/// The number is stored only in encrypted form; `number` carries the
/// decrypted value on read paths and is never persisted. `version` is the
/// optimistic-concurrency counter bumped by the store on every update.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Card {
    /// Surrogate id, assigned by the store on insert.
    pub id: CardId,
    /// Base64 ciphertext of the card number; unique across all cards.
    pub encrypted_number: String,
    pub owner: OwnerId,
    pub expires: Expiry,
    pub status: CardStatus,
    pub balance: Decimal,
    pub version: u64,
    #[serde(skip)]
    pub number: Option<String>,
}

impl Card {
    /// A freshly issued card: active, zero balance, id not yet assigned.
    pub fn issue(owner: OwnerId, expires: Expiry, encrypted_number: String) -> Self {
        Self {
            id: 0,
            encrypted_number,
            owner,
            expires,
            status: CardStatus::Active,
            balance: Decimal::ZERO,
            version: 0,
            number: None,
        }
    }

    /// The shared gate for balance operations: status first, then expiry, so
    /// "not active" wins when both conditions fail.
    pub fn check_usable(&self) -> std::result::Result<(), CardUnusable> {
        if self.status != CardStatus::Active {
            return Err(CardUnusable::NotActive);
        }
        if self.expires.is_past() {
            return Err(CardUnusable::Expired);
        }
        Ok(())
    }

    pub fn credit(&mut self, amount: Decimal) {
        self.balance += amount;
    }

    /// Removes funds; the balance can never go negative.
    pub fn debit(&mut self, amount: Decimal) -> Result<()> {
        if self.balance < amount {
            return Err(LedgerError::InsufficientFunds(self.id));
        }
        self.balance -= amount;
        Ok(())
    }

    /// Display form of the decrypted number: last four digits only.
    pub fn masked_number(&self) -> Option<String> {
        self.number.as_ref().map(|number| {
            let tail = &number[number.len().saturating_sub(4)..];
            format!("**** **** **** {tail}")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn future_card() -> Card {
        let mut card = Card::issue(1, Expiry::current().shift(12), "cipher".into());
        card.id = 7;
        card
    }

    #[test]
    fn test_issue_defaults() {
        let card = future_card();
        assert_eq!(card.status, CardStatus::Active);
        assert_eq!(card.balance, Decimal::ZERO);
        assert_eq!(card.version, 0);
        assert!(card.number.is_none());
    }

    #[test]
    fn test_credit_and_debit() {
        let mut card = future_card();
        card.credit(dec!(10.50));
        assert_eq!(card.balance, dec!(10.50));

        card.debit(dec!(4.50)).unwrap();
        assert_eq!(card.balance, dec!(6.00));
    }

    #[test]
    fn test_debit_insufficient_leaves_balance() {
        let mut card = future_card();
        card.credit(dec!(5.00));

        let err = card.debit(dec!(5.01)).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds(7)));
        assert_eq!(card.balance, dec!(5.00));
    }

    #[test]
    fn test_debit_entire_balance() {
        let mut card = future_card();
        card.credit(dec!(5.00));
        card.debit(dec!(5.00)).unwrap();
        assert_eq!(card.balance, dec!(0.00));
    }

    #[test]
    fn test_check_usable_status_takes_precedence() {
        let mut card = future_card();
        card.status = CardStatus::Blocked;
        card.expires = Expiry::current().shift(-1);
        // Both blocked and expired: the status message must win.
        assert_eq!(card.check_usable(), Err(CardUnusable::NotActive));
    }

    #[test]
    fn test_check_usable_expired() {
        let mut card = future_card();
        card.expires = Expiry::current().shift(-1);
        assert_eq!(card.check_usable(), Err(CardUnusable::Expired));
        assert!(card.check_usable().unwrap_err().message(7).contains("has expired"));
    }

    #[test]
    fn test_check_usable_current_month_is_valid() {
        let mut card = future_card();
        card.expires = Expiry::current();
        assert!(card.check_usable().is_ok());
    }

    #[test]
    fn test_masked_number() {
        let mut card = future_card();
        assert_eq!(card.masked_number(), None);
        card.number = Some("4929123456781234".into());
        assert_eq!(card.masked_number().unwrap(), "**** **** **** 1234");
    }

    #[test]
    fn test_serde_skips_plaintext_number() {
        let mut card = future_card();
        card.number = Some("4929123456781234".into());
        let json = serde_json::to_string(&card).unwrap();
        assert!(!json.contains("4929123456781234"));

        let restored: Card = serde_json::from_str(&json).unwrap();
        assert!(restored.number.is_none());
        assert_eq!(restored.encrypted_number, card.encrypted_number);
    }
}
