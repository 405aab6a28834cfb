use crate::domain::card::{Card, CardId, OwnerId};
use crate::domain::ports::{CardStore, PageRequest, UserStore};
use crate::domain::user::User;
use crate::error::{LedgerError, Result};
use crate::infrastructure::sort_and_paginate;
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column family for card records.
pub const CF_CARDS: &str = "cards";
/// Column family for user records.
pub const CF_USERS: &str = "users";
/// Column family mapping each encrypted number to the card id that owns it;
/// this is the uniqueness constraint.
pub const CF_NUMBERS: &str = "numbers";
/// Column family for store bookkeeping (the id counter).
pub const CF_META: &str = "meta";

const LAST_CARD_ID_KEY: &[u8] = b"last_card_id";

/// A persistent store backed by RocksDB.
///
/// All multi-key writes go through a `WriteBatch`, so the two-card transfer
/// commit hits disk atomically. Writers are serialized by a mutex and still
/// re-check versions under it; reads go straight to the database.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDbStore {
    /// Opens or creates a database at `path`, ensuring all column families
    /// exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = [CF_CARDS, CF_USERS, CF_NUMBERS, CF_META]
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));
        let db = DB::open_cf_descriptors(&opts, path, cfs)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            LedgerError::Internal(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }

    fn load_card(&self, id: CardId) -> Result<Option<Card>> {
        let cf = self.cf(CF_CARDS)?;
        match self.db.get_cf(cf, id.to_be_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn all_cards(&self) -> Result<Vec<Card>> {
        let cf = self.cf(CF_CARDS)?;
        let mut cards = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            cards.push(decode(&value)?);
        }
        Ok(cards)
    }

    fn last_card_id(&self) -> Result<CardId> {
        let cf = self.cf(CF_META)?;
        match self.db.get_cf(cf, LAST_CARD_ID_KEY)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    LedgerError::Internal(Box::new(std::io::Error::other(
                        "corrupt card id counter",
                    )))
                })?;
                Ok(CardId::from_be_bytes(raw))
            }
            None => Ok(0),
        }
    }

    fn check_current(&self, card: &Card) -> Result<()> {
        match self.load_card(card.id)? {
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
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|err| LedgerError::Internal(Box::new(err)))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|err| LedgerError::Internal(Box::new(err)))
}

#[async_trait]
impl CardStore for RocksDbStore {
    async fn insert(&self, mut card: Card) -> Result<Card> {
        let _guard = self.write_lock.lock().await;

        let numbers = self.cf(CF_NUMBERS)?;
        if self
            .db
            .get_pinned_cf(numbers, card.encrypted_number.as_bytes())?
            .is_some()
        {
            return Err(LedgerError::Conflict("card number already in use".into()));
        }

        let id = self.last_card_id()? + 1;
        card.id = id;
        card.version = 0;

        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_CARDS)?, id.to_be_bytes(), encode(&card)?);
        batch.put_cf(numbers, card.encrypted_number.as_bytes(), id.to_be_bytes());
        batch.put_cf(self.cf(CF_META)?, LAST_CARD_ID_KEY, id.to_be_bytes());
        self.db.write(batch)?;

        Ok(card)
    }

    async fn update(&self, mut card: Card) -> Result<Card> {
        let _guard = self.write_lock.lock().await;
        self.check_current(&card)?;
        card.version += 1;
        self.db
            .put_cf(self.cf(CF_CARDS)?, card.id.to_be_bytes(), encode(&card)?)?;
        Ok(card)
    }

    async fn update_pair(&self, mut first: Card, mut second: Card) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.check_current(&first)?;
        self.check_current(&second)?;

        first.version += 1;
        second.version += 1;

        let cards = self.cf(CF_CARDS)?;
        let mut batch = WriteBatch::default();
        batch.put_cf(cards, first.id.to_be_bytes(), encode(&first)?);
        batch.put_cf(cards, second.id.to_be_bytes(), encode(&second)?);
        self.db.write(batch)?;
        Ok(())
    }

    async fn get(&self, id: CardId) -> Result<Option<Card>> {
        self.load_card(id)
    }

    async fn get_for_owner(&self, id: CardId, owner: OwnerId) -> Result<Option<Card>> {
        Ok(self.load_card(id)?.filter(|card| card.owner == owner))
    }

    async fn list_for_owner(&self, owner: OwnerId, page: PageRequest) -> Result<Vec<Card>> {
        let cards = self
            .all_cards()?
            .into_iter()
            .filter(|card| card.owner == owner)
            .collect();
        Ok(sort_and_paginate(cards, page))
    }

    async fn list(&self, page: PageRequest) -> Result<Vec<Card>> {
        Ok(sort_and_paginate(self.all_cards()?, page))
    }

    async fn exists(&self, id: CardId) -> Result<bool> {
        let cf = self.cf(CF_CARDS)?;
        Ok(self.db.get_pinned_cf(cf, id.to_be_bytes())?.is_some())
    }

    async fn delete(&self, id: CardId) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let Some(card) = self.load_card(id)? else {
            return Ok(());
        };

        let mut batch = WriteBatch::default();
        batch.delete_cf(self.cf(CF_CARDS)?, id.to_be_bytes());
        batch.delete_cf(self.cf(CF_NUMBERS)?, card.encrypted_number.as_bytes());
        self.db.write(batch)?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for RocksDbStore {
    async fn get(&self, id: OwnerId) -> Result<Option<User>> {
        let cf = self.cf(CF_USERS)?;
        match self.db.get_cf(cf, id.to_be_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, user: User) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.db
            .put_cf(self.cf(CF_USERS)?, user.id.to_be_bytes(), encode(&user)?)?;
        Ok(())
    }
}
