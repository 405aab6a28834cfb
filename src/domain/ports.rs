use crate::domain::card::{Card, CardId, OwnerId};
use crate::domain::user::User;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// How a page of cards is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardSort {
    IdAsc,
    IdDesc,
    ExpiresAsc,
}

/// A validated page request: zero-based page number, size of at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    number: usize,
    size: usize,
    sort: CardSort,
}

impl PageRequest {
    pub fn new(number: usize, size: usize, sort: CardSort) -> Option<Self> {
        (size >= 1).then_some(Self { number, size, sort })
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn sort(&self) -> CardSort {
        self.sort
    }

    pub fn offset(&self) -> usize {
        self.number * self.size
    }
}

/// Card persistence.
///
/// Implementations must keep the encrypted number unique across `insert`,
/// apply `update` and `update_pair` as a compare-and-swap on `version`, and
/// make `update_pair` all-or-nothing. Calls must not block indefinitely; a
/// backend timeout surfaces as `Conflict` or `Internal`, never as a business
/// error.
#[async_trait]
pub trait CardStore: Send + Sync {
    /// Persists a new card and returns it with its assigned id. Fails with
    /// `Conflict` when the encrypted number is already present.
    async fn insert(&self, card: Card) -> Result<Card>;

    /// Persists changes to an existing card. Fails with `Conflict` when the
    /// stored version differs from `card.version` or the card is gone.
    async fn update(&self, card: Card) -> Result<Card>;

    /// Persists two cards atomically under the same version rules: either
    /// both updates become durable or neither does.
    async fn update_pair(&self, first: Card, second: Card) -> Result<()>;

    async fn get(&self, id: CardId) -> Result<Option<Card>>;

    async fn get_for_owner(&self, id: CardId, owner: OwnerId) -> Result<Option<Card>>;

    async fn list_for_owner(&self, owner: OwnerId, page: PageRequest) -> Result<Vec<Card>>;

    async fn list(&self, page: PageRequest) -> Result<Vec<Card>>;

    async fn exists(&self, id: CardId) -> Result<bool>;

    /// Removes the card if present; absent ids are not an error.
    async fn delete(&self, id: CardId) -> Result<()>;
}

/// Owner lookup and enrollment.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, id: OwnerId) -> Result<Option<User>>;

    async fn insert(&self, user: User) -> Result<()>;
}

pub type SharedCardStore = Arc<dyn CardStore>;
pub type SharedUserStore = Arc<dyn UserStore>;
