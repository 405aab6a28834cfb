use crate::domain::card::{Card, CardId, OwnerId};
use crate::domain::ports::{CardStore, PageRequest, UserStore};
use crate::domain::user::User;
use crate::error::{LedgerError, Result};
use crate::infrastructure::sort_and_paginate;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct CardTable {
    cards: HashMap<CardId, Card>,
    last_id: CardId,
}

impl CardTable {
    fn check_current(&self, card: &Card) -> Result<()> {
        match self.cards.get(&card.id) {
            None => Err(LedgerError::Conflict(format!(
                "card {} no longer exists",
                card.id
            ))),
            Some(stored) if stored.version != card.version => Err(LedgerError::Conflict(format!(
                "card {} was modified concurrently",
                card.id
            ))),
            Some(_) => Ok(()),
        }
    }

    fn apply(&mut self, mut card: Card) -> Card {
        card.version += 1;
        self.cards.insert(card.id, card.clone());
        card
    }
}

/// A thread-safe in-memory card store, the default and test backend.
///
/// One `RwLock` guards the whole table, so `update_pair` is trivially atomic:
/// both version checks and both writes happen under a single write guard.
#[derive(Default, Clone)]
pub struct InMemoryCardStore {
    inner: Arc<RwLock<CardTable>>,
}

impl InMemoryCardStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CardStore for InMemoryCardStore {
    async fn insert(&self, mut card: Card) -> Result<Card> {
        let mut table = self.inner.write().await;
        if table
            .cards
            .values()
            .any(|existing| existing.encrypted_number == card.encrypted_number)
        {
            return Err(LedgerError::Conflict("card number already in use".into()));
        }

        table.last_id += 1;
        card.id = table.last_id;
        card.version = 0;
        table.cards.insert(card.id, card.clone());
        Ok(card)
    }

    async fn update(&self, card: Card) -> Result<Card> {
        let mut table = self.inner.write().await;
        table.check_current(&card)?;
        Ok(table.apply(card))
    }

    async fn update_pair(&self, first: Card, second: Card) -> Result<()> {
        let mut table = self.inner.write().await;
        // Both checks before either write keeps the pair all-or-nothing.
        table.check_current(&first)?;
        table.check_current(&second)?;
        table.apply(first);
        table.apply(second);
        Ok(())
    }

    async fn get(&self, id: CardId) -> Result<Option<Card>> {
        let table = self.inner.read().await;
        Ok(table.cards.get(&id).cloned())
    }

    async fn get_for_owner(&self, id: CardId, owner: OwnerId) -> Result<Option<Card>> {
        let table = self.inner.read().await;
        Ok(table
            .cards
            .get(&id)
            .filter(|card| card.owner == owner)
            .cloned())
    }

    async fn list_for_owner(&self, owner: OwnerId, page: PageRequest) -> Result<Vec<Card>> {
        let table = self.inner.read().await;
        let cards = table
            .cards
            .values()
            .filter(|card| card.owner == owner)
            .cloned()
            .collect();
        Ok(sort_and_paginate(cards, page))
    }

    async fn list(&self, page: PageRequest) -> Result<Vec<Card>> {
        let table = self.inner.read().await;
        let cards = table.cards.values().cloned().collect();
        Ok(sort_and_paginate(cards, page))
    }

    async fn exists(&self, id: CardId) -> Result<bool> {
        let table = self.inner.read().await;
        Ok(table.cards.contains_key(&id))
    }

    async fn delete(&self, id: CardId) -> Result<()> {
        let mut table = self.inner.write().await;
        table.cards.remove(&id);
        Ok(())
    }
}

/// A thread-safe in-memory user store.
#[derive(Default, Clone)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<OwnerId, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get(&self, id: OwnerId) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).copied())
    }

    async fn insert(&self, user: User) -> Result<()> {
        let mut users = self.users.write().await;
        users.insert(user.id, user);
        Ok(())
    }
}
