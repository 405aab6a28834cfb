use crate::crypto::{NumberCipher, random_card_number};
use crate::domain::card::{Card, CardId, CardStatus, OwnerId};
use crate::domain::expiry::Expiry;
use crate::domain::ports::{CardStore, PageRequest, SharedCardStore, SharedUserStore, UserStore};
use crate::error::{LedgerError, Result};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Card lifecycle: issuance, activation, blocking, deletion and reads.
///
/// Read paths decrypt the stored number into the card's transient display
/// field; write paths only ever see the ciphertext.
pub struct CardService {
    cards: SharedCardStore,
    users: SharedUserStore,
    cipher: Arc<NumberCipher>,
}

impl CardService {
    pub fn new(cards: SharedCardStore, users: SharedUserStore, cipher: Arc<NumberCipher>) -> Self {
        Self {
            cards,
            users,
            cipher,
        }
    }

    /// Issues a new active card with a zero balance and returns its id.
    ///
    /// A ciphertext collision on insert is retried once with a freshly
    /// generated number before the conflict is surfaced.
    pub async fn create(&self, owner: OwnerId, expires: Expiry) -> Result<CardId> {
        if self.users.get(owner).await?.is_none() {
            error!(owner, "card creation for unknown owner");
            return Err(LedgerError::OwnerNotFound(owner));
        }

        let mut retried = false;
        loop {
            let number = random_card_number();
            let card = Card::issue(owner, expires, self.cipher.encrypt(&number)?);
            match self.cards.insert(card).await {
                Ok(card) => {
                    debug!(card = card.id, owner, "card created");
                    return Ok(card.id);
                }
                Err(LedgerError::Conflict(reason)) if !retried => {
                    warn!(owner, %reason, "card number collision, regenerating");
                    retried = true;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Fetches a card by id with its number decrypted for display.
    pub async fn get(&self, id: CardId) -> Result<Card> {
        let card = self.cards.get(id).await?.ok_or_else(|| {
            error!(card = id, "card not found");
            LedgerError::CardNotFound(format!("id {id}"))
        })?;
        self.reveal(card)
    }

    pub async fn list_for_owner(&self, owner: OwnerId, page: PageRequest) -> Result<Vec<Card>> {
        let cards = self.cards.list_for_owner(owner, page).await?;
        debug!(owner, count = cards.len(), "cards listed for owner");
        cards.into_iter().map(|card| self.reveal(card)).collect()
    }

    pub async fn list_all(&self, page: PageRequest) -> Result<Vec<Card>> {
        let cards = self.cards.list(page).await?;
        debug!(count = cards.len(), "cards listed");
        cards.into_iter().map(|card| self.reveal(card)).collect()
    }

    /// Re-activates a card; expired cards cannot come back.
    pub async fn activate(&self, id: CardId, owner: OwnerId) -> Result<()> {
        let mut card = self.owned(id, owner).await?;
        if card.expires.is_past() {
            error!(card = id, expires = %card.expires, "attempt to activate expired card");
            return Err(LedgerError::BusinessRule(format!("card {id} has expired")));
        }

        card.status = CardStatus::Active;
        self.cards.update(card).await?;
        debug!(card = id, owner, "card activated");
        Ok(())
    }

    /// Blocks a card unconditionally; blocking an already blocked or expired
    /// card is a no-op success.
    pub async fn block(&self, id: CardId, owner: OwnerId) -> Result<()> {
        let mut card = self.owned(id, owner).await?;
        card.status = CardStatus::Blocked;
        self.cards.update(card).await?;
        debug!(card = id, owner, "card blocked");
        Ok(())
    }

    /// Deletes a card; deleting an absent id succeeds silently.
    pub async fn delete(&self, id: CardId) -> Result<()> {
        if self.cards.exists(id).await? {
            self.cards.delete(id).await?;
            debug!(card = id, "card deleted");
        } else {
            warn!(card = id, "delete of non-existent card ignored");
        }
        Ok(())
    }

    async fn owned(&self, id: CardId, owner: OwnerId) -> Result<Card> {
        self.cards.get_for_owner(id, owner).await?.ok_or_else(|| {
            error!(card = id, owner, "card not found for owner");
            LedgerError::CardNotFound(format!("id {id} for owner {owner}"))
        })
    }

    fn reveal(&self, mut card: Card) -> Result<Card> {
        match self.cipher.decrypt(&card.encrypted_number) {
            Ok(number) => {
                card.number = Some(number);
                Ok(card)
            }
            Err(err) => {
                error!(card = card.id, "failed to decrypt card number");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::CARD_NUMBER_LENGTH;
    use crate::domain::ports::{CardSort, UserStore};
    use crate::domain::user::User;
    use crate::infrastructure::in_memory::{InMemoryCardStore, InMemoryUserStore};

    const SECRET: &str = "0123456789abcdef";

    async fn service_with_owner(owner: OwnerId) -> CardService {
        let users = InMemoryUserStore::new();
        users.insert(User::new(owner)).await.unwrap();
        CardService::new(
            Arc::new(InMemoryCardStore::new()),
            Arc::new(users),
            Arc::new(NumberCipher::new(SECRET).unwrap()),
        )
    }

    #[tokio::test]
    async fn test_create_and_get_roundtrip() {
        let service = service_with_owner(1).await;
        let id = service.create(1, Expiry::current().shift(24)).await.unwrap();

        let card = service.get(id).await.unwrap();
        assert_eq!(card.owner, 1);
        assert_eq!(card.status, CardStatus::Active);
        assert_eq!(card.balance, rust_decimal::Decimal::ZERO);

        let number = card.number.unwrap();
        assert_eq!(number.len(), CARD_NUMBER_LENGTH);
        assert!(number.chars().all(|c| c.is_ascii_digit()));
        assert_ne!(number, card.encrypted_number);
    }

    #[tokio::test]
    async fn test_create_unknown_owner() {
        let service = service_with_owner(1).await;
        let err = service.create(2, Expiry::current().shift(24)).await.unwrap_err();
        assert!(matches!(err, LedgerError::OwnerNotFound(2)));
    }

    #[tokio::test]
    async fn test_get_missing_card() {
        let service = service_with_owner(1).await;
        let err = service.get(42).await.unwrap_err();
        assert!(matches!(err, LedgerError::CardNotFound(_)));
    }

    #[tokio::test]
    async fn test_activate_expired_card_rejected() {
        let service = service_with_owner(1).await;
        let id = service.create(1, Expiry::current().shift(-1)).await.unwrap();

        let err = service.activate(id, 1).await.unwrap_err();
        match err {
            LedgerError::BusinessRule(message) => assert!(message.contains("has expired")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_block_is_idempotent() {
        let service = service_with_owner(1).await;
        let id = service.create(1, Expiry::current().shift(24)).await.unwrap();

        service.block(id, 1).await.unwrap();
        service.block(id, 1).await.unwrap();

        let card = service.get(id).await.unwrap();
        assert_eq!(card.status, CardStatus::Blocked);
    }

    #[tokio::test]
    async fn test_lifecycle_ops_check_ownership() {
        let service = service_with_owner(1).await;
        let id = service.create(1, Expiry::current().shift(24)).await.unwrap();

        assert!(matches!(
            service.activate(id, 9).await.unwrap_err(),
            LedgerError::CardNotFound(_)
        ));
        assert!(matches!(
            service.block(id, 9).await.unwrap_err(),
            LedgerError::CardNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let service = service_with_owner(1).await;
        let id = service.create(1, Expiry::current().shift(24)).await.unwrap();

        service.delete(id).await.unwrap();
        assert!(matches!(
            service.get(id).await.unwrap_err(),
            LedgerError::CardNotFound(_)
        ));
        // Absent id: still a success.
        service.delete(id).await.unwrap();
        service.delete(999).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_for_owner_sorted_and_paged() {
        let service = service_with_owner(1).await;
        let base = Expiry::current();
        let first = service.create(1, base.shift(36)).await.unwrap();
        let second = service.create(1, base.shift(12)).await.unwrap();
        let third = service.create(1, base.shift(24)).await.unwrap();

        let by_expiry = service
            .list_for_owner(1, PageRequest::new(0, 10, CardSort::ExpiresAsc).unwrap())
            .await
            .unwrap();
        let ids: Vec<_> = by_expiry.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![second, third, first]);
        assert!(by_expiry.iter().all(|c| c.number.is_some()));

        let page = service
            .list_for_owner(1, PageRequest::new(1, 2, CardSort::IdAsc).unwrap())
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, third);
    }
}
