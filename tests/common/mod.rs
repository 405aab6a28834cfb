use cardledger::application::balance::BalanceService;
use cardledger::application::cards::CardService;
use cardledger::crypto::NumberCipher;
use cardledger::domain::ports::{SharedCardStore, SharedUserStore, UserStore};
use cardledger::domain::user::User;
use cardledger::infrastructure::in_memory::{InMemoryCardStore, InMemoryUserStore};
use std::sync::Arc;

pub const TEST_SECRET: &str = "0123456789abcdef";

pub struct TestLedger {
    pub cards: Arc<CardService>,
    pub balance: Arc<BalanceService>,
    pub users: SharedUserStore,
}

/// An in-memory ledger with one enrolled owner, ready for card operations.
pub async fn ledger_with_owner(owner: u64) -> TestLedger {
    let card_store: SharedCardStore = Arc::new(InMemoryCardStore::new());
    let users: SharedUserStore = Arc::new(InMemoryUserStore::new());
    users.insert(User::new(owner)).await.unwrap();

    let cipher = Arc::new(NumberCipher::new(TEST_SECRET).unwrap());
    TestLedger {
        cards: Arc::new(CardService::new(card_store.clone(), users.clone(), cipher)),
        balance: Arc::new(BalanceService::new(card_store)),
        users,
    }
}
