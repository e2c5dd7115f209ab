//! In-memory store
//!
//! Holds every table in one `tokio::sync::Mutex`, so each operation
//! (including the whole transfer read-modify-write) is serialized. Foreign
//! key behavior matches the PostgreSQL schema.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use super::{CardDetails, CardFilter, CardStore, Page, PageRequest, TransferStep, UserStore};
use crate::account::models::{NewUser, User, UserRole};
use crate::card::models::{Card, NewCard, Transaction};
use crate::core_types::{CardId, TransactionRowId, UserId};
use crate::error::{BankError, BankResult};

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    cards: BTreeMap<CardId, Card>,
    transactions: BTreeMap<TransactionRowId, Transaction>,
    last_user_id: UserId,
    last_card_id: CardId,
    last_transaction_id: TransactionRowId,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored transactions, for tests and diagnostics
    pub async fn transaction_count(&self) -> usize {
        self.tables.lock().await.transactions.len()
    }

    /// Seed a card balance directly. The card API has no deposit operation,
    /// so fixtures fund cards through here.
    pub async fn set_balance(&self, id: CardId, balance: Decimal) -> BankResult<Option<Card>> {
        if balance.is_sign_negative() {
            return Err(BankError::Internal(format!("negative balance for card {}", id)));
        }
        let mut t = self.tables.lock().await;
        Ok(t.cards.get_mut(&id).map(|stored| {
            stored.balance = balance;
            stored.updated_at = Utc::now();
            stored.clone()
        }))
    }
}

fn paginate<T: Clone>(items: Vec<&T>, page: PageRequest) -> Page<T> {
    let total = items.len() as u64;
    let content = items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.size as usize)
        .cloned()
        .collect();
    Page::new(content, page, total)
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> BankResult<User> {
        let mut t = self.tables.lock().await;
        let taken = t
            .users
            .values()
            .any(|u| u.username == user.username || u.email == user.email);
        if taken {
            return Err(BankError::UserAlreadyExists(
                "Username or Email already exists".to_string(),
            ));
        }

        t.last_user_id += 1;
        let now = Utc::now();
        let created = User {
            id: t.last_user_id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            enabled: true,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        t.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_user(&self, id: UserId) -> BankResult<Option<User>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> BankResult<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.users.values().find(|u| u.username == username).cloned())
    }

    async fn user_exists(&self, username: &str, email: &str) -> BankResult<bool> {
        let t = self.tables.lock().await;
        Ok(t
            .users
            .values()
            .any(|u| u.username == username || u.email == email))
    }

    async fn list_users(&self, page: PageRequest) -> BankResult<Page<User>> {
        let t = self.tables.lock().await;
        Ok(paginate(t.users.values().collect(), page))
    }

    async fn set_user_role(&self, id: UserId, role: UserRole) -> BankResult<Option<User>> {
        let mut t = self.tables.lock().await;
        Ok(t.users.get_mut(&id).map(|u| {
            u.role = role;
            u.updated_at = Utc::now();
            u.clone()
        }))
    }

    async fn set_user_enabled(&self, id: UserId, enabled: bool) -> BankResult<Option<User>> {
        let mut t = self.tables.lock().await;
        Ok(t.users.get_mut(&id).map(|u| {
            u.enabled = enabled;
            u.updated_at = Utc::now();
            u.clone()
        }))
    }
}

#[async_trait]
impl CardStore for MemoryStore {
    async fn card_hash_exists(&self, card_hash: &str) -> BankResult<bool> {
        let t = self.tables.lock().await;
        Ok(t.cards.values().any(|c| c.card_hash == card_hash))
    }

    async fn insert_card(&self, card: NewCard) -> BankResult<Card> {
        let mut t = self.tables.lock().await;
        if !t.users.contains_key(&card.user_id) {
            return Err(BankError::user_not_found());
        }
        if t.cards.values().any(|c| c.card_hash == card.card_hash) {
            return Err(BankError::InvalidData("Card already exists".to_string()));
        }

        t.last_card_id += 1;
        let now = Utc::now();
        let created = Card {
            id: t.last_card_id,
            card_hash: card.card_hash,
            last_four_digits: card.last_four_digits,
            card_holder: card.card_holder,
            expiry_date: card.expiry_date,
            status: card.status,
            balance: Decimal::new(0, 2),
            user_id: card.user_id,
            created_at: now,
            updated_at: now,
        };
        t.cards.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_card(&self, id: CardId) -> BankResult<Option<Card>> {
        Ok(self.tables.lock().await.cards.get(&id).cloned())
    }

    async fn count_owned_cards(&self, user_id: UserId, ids: &[CardId]) -> BankResult<u64> {
        let t = self.tables.lock().await;
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids
            .iter()
            .filter(|id| t.cards.get(id).is_some_and(|c| c.user_id == user_id))
            .count() as u64)
    }

    async fn list_user_cards(&self, user_id: UserId) -> BankResult<Vec<Card>> {
        let t = self.tables.lock().await;
        Ok(t.cards
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_cards(
        &self,
        filter: CardFilter,
        today: NaiveDate,
        page: PageRequest,
    ) -> BankResult<Page<Card>> {
        let t = self.tables.lock().await;
        let matching = t.cards.values().filter(|c| filter.matches(c, today)).collect();
        Ok(paginate(matching, page))
    }

    async fn update_card_details(
        &self,
        id: CardId,
        details: &CardDetails,
    ) -> BankResult<Option<Card>> {
        let mut t = self.tables.lock().await;
        Ok(t.cards.get_mut(&id).map(|stored| {
            stored.card_holder = details.card_holder.clone();
            stored.status = details.status;
            stored.updated_at = Utc::now();
            stored.clone()
        }))
    }

    async fn delete_card(&self, id: CardId) -> BankResult<bool> {
        let mut t = self.tables.lock().await;
        if t.cards.remove(&id).is_none() {
            return Ok(false);
        }

        // to_card_id cascades, from_card_id is nulled
        t.transactions.retain(|_, tx| tx.to_card_id != id);
        for tx in t.transactions.values_mut() {
            if tx.from_card_id == Some(id) {
                tx.from_card_id = None;
            }
        }
        Ok(true)
    }

    async fn card_transactions(&self, card_id: CardId) -> BankResult<Vec<Transaction>> {
        let t = self.tables.lock().await;
        let mut txs: Vec<Transaction> = t
            .transactions
            .values()
            .filter(|tx| tx.to_card_id == card_id || tx.from_card_id == Some(card_id))
            .cloned()
            .collect();
        txs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(txs)
    }

    async fn transfer(
        &self,
        from_id: CardId,
        to_id: CardId,
        step: TransferStep<'_>,
    ) -> BankResult<Transaction> {
        let mut t = self.tables.lock().await;

        let mut from = t
            .cards
            .get(&from_id)
            .cloned()
            .ok_or_else(BankError::card_not_found)?;
        let mut to = t
            .cards
            .get(&to_id)
            .cloned()
            .ok_or_else(BankError::card_not_found)?;
        let opening = from.balance;

        let new_tx = step(&mut from, &mut to)?;

        if from_id == to_id {
            // debit and credit hit the same row
            from.balance = opening;
        }
        if from.balance.is_sign_negative() || to.balance.is_sign_negative() {
            return Err(BankError::Internal("balance check violated".to_string()));
        }

        let now = Utc::now();
        from.updated_at = now;
        to.updated_at = now;
        if from_id != to_id {
            t.cards.insert(to.id, to);
        }
        t.cards.insert(from.id, from);

        t.last_transaction_id += 1;
        let tx = new_tx.into_transaction(t.last_transaction_id);
        t.transactions.insert(tx.id, tx.clone());
        Ok(tx)
    }

    async fn health_check(&self) -> BankResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::models::{
        CardStatus, NewTransaction, TransactionStatus, TransactionType,
    };
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    async fn seed_user(store: &MemoryStore, name: &str) -> User {
        store
            .create_user(NewUser {
                username: name.to_string(),
                email: format!("{}@example.com", name),
                password_hash: "hash".to_string(),
                role: UserRole::User,
            })
            .await
            .unwrap()
    }

    async fn seed_card(store: &MemoryStore, user_id: UserId, hash: &str, balance: i64) -> Card {
        let card = store
            .insert_card(NewCard {
                card_hash: hash.to_string(),
                last_four_digits: "1111".to_string(),
                card_holder: "JOHN DOE".to_string(),
                expiry_date: NaiveDate::from_ymd_opt(2099, 12, 31).unwrap(),
                status: CardStatus::Active,
                user_id,
            })
            .await
            .unwrap();
        store
            .set_balance(card.id, Decimal::new(balance, 2))
            .await
            .unwrap()
            .unwrap()
    }

    fn move_funds(amount: Decimal) -> impl Fn(&mut Card, &mut Card) -> BankResult<NewTransaction> {
        move |from, to| {
            if from.balance < amount {
                return Err(BankError::InsufficientFunds("Not enough money".into()));
            }
            from.balance -= amount;
            to.balance += amount;
            Ok(NewTransaction {
                transaction_id: Uuid::new_v4(),
                amount,
                description: None,
                status: TransactionStatus::Completed,
                kind: TransactionType::Transfer,
                created_at: Utc::now(),
                from_card_id: Some(from.id),
                to_card_id: to.id,
            })
        }
    }

    #[tokio::test]
    async fn test_duplicate_user_rejected() {
        let store = MemoryStore::new();
        seed_user(&store, "john").await;
        let err = store
            .create_user(NewUser {
                username: "other".into(),
                email: "john@example.com".into(),
                password_hash: "hash".into(),
                role: UserRole::User,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BankError::UserAlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_duplicate_card_hash_rejected() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "john").await;
        seed_card(&store, user.id, "h1", 0).await;
        assert!(store.card_hash_exists("h1").await.unwrap());

        let err = store
            .insert_card(NewCard {
                card_hash: "h1".into(),
                last_four_digits: "2222".into(),
                card_holder: "X".into(),
                expiry_date: NaiveDate::from_ymd_opt(2099, 1, 1).unwrap(),
                status: CardStatus::Active,
                user_id: user.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BankError::InvalidData(ref m) if m == "Card already exists"));
    }

    #[tokio::test]
    async fn test_transfer_commits_both_cards_and_record() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "john").await;
        let a = seed_card(&store, user.id, "a", 100_000).await;
        let b = seed_card(&store, user.id, "b", 50_000).await;

        let step = move_funds(Decimal::new(10_000, 2));
        let tx = store.transfer(a.id, b.id, &step).await.unwrap();
        assert_eq!(tx.from_card_id, Some(a.id));

        let a = store.find_card(a.id).await.unwrap().unwrap();
        let b = store.find_card(b.id).await.unwrap().unwrap();
        assert_eq!(a.balance, Decimal::new(90_000, 2));
        assert_eq!(b.balance, Decimal::new(60_000, 2));
        assert_eq!(store.transaction_count().await, 1);
    }

    #[tokio::test]
    async fn test_failed_step_writes_nothing() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "john").await;
        let a = seed_card(&store, user.id, "a", 100_000).await;
        let b = seed_card(&store, user.id, "b", 50_000).await;

        let step = move_funds(Decimal::new(150_000, 2));
        let err = store.transfer(a.id, b.id, &step).await.unwrap_err();
        assert!(matches!(err, BankError::InsufficientFunds(_)));
        assert_eq!(
            store.find_card(a.id).await.unwrap().unwrap().balance,
            Decimal::new(100_000, 2)
        );
        assert_eq!(store.transaction_count().await, 0);
    }

    #[tokio::test]
    async fn test_delete_card_mirrors_foreign_keys() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "john").await;
        let a = seed_card(&store, user.id, "a", 100_000).await;
        let b = seed_card(&store, user.id, "b", 0).await;

        let step = move_funds(Decimal::new(100, 2));
        store.transfer(a.id, b.id, &step).await.unwrap();
        store.transfer(b.id, a.id, &step).await.unwrap();

        assert!(store.delete_card(b.id).await.unwrap());
        assert!(!store.delete_card(b.id).await.unwrap());

        // a -> b row went with b, b -> a row survives with a null source
        let remaining = store.card_transactions(a.id).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].from_card_id, None);
        assert_eq!(remaining[0].to_card_id, a.id);
    }

    #[tokio::test]
    async fn test_card_transactions_newest_first() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "john").await;
        let a = seed_card(&store, user.id, "a", 100_000).await;
        let b = seed_card(&store, user.id, "b", 0).await;

        let step = move_funds(Decimal::new(100, 2));
        let first = store.transfer(a.id, b.id, &step).await.unwrap();
        let second = store.transfer(a.id, b.id, &step).await.unwrap();

        let txs = store.card_transactions(a.id).await.unwrap();
        assert_eq!(txs.iter().map(|t| t.id).collect::<Vec<_>>(), vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_list_cards_filters() {
        let store = MemoryStore::new();
        let john = seed_user(&store, "john").await;
        let jane = seed_user(&store, "jane").await;
        seed_card(&store, john.id, "a", 0).await;
        let blocked = seed_card(&store, jane.id, "b", 0).await;
        store
            .update_card_details(
                blocked.id,
                &CardDetails {
                    card_holder: blocked.card_holder.clone(),
                    status: CardStatus::Blocked,
                },
            )
            .await
            .unwrap();
        seed_card(&store, jane.id, "c", 0).await;

        let all = store
            .list_cards(CardFilter::default(), today(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(all.total_elements, 3);

        let janes_blocked = store
            .list_cards(
                CardFilter {
                    user_id: Some(jane.id),
                    status: Some(CardStatus::Blocked),
                },
                today(),
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(janes_blocked.content.len(), 1);
        assert_eq!(janes_blocked.content[0].id, blocked.id);

        assert_eq!(
            store
                .count_owned_cards(john.id, &[blocked.id, 1])
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_details_update_keeps_balance() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "john").await;
        let a = seed_card(&store, user.id, "a", 100_000).await;
        let b = seed_card(&store, user.id, "b", 50_000).await;

        // the balance moves after the caller read the card
        let step = move_funds(Decimal::new(10_000, 2));
        store.transfer(a.id, b.id, &step).await.unwrap();

        let renamed = store
            .update_card_details(
                a.id,
                &CardDetails {
                    card_holder: "JANE ROE".into(),
                    status: a.status,
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.card_holder, "JANE ROE");
        assert_eq!(renamed.balance, Decimal::new(90_000, 2));
        assert!(
            store
                .update_card_details(999, &CardDetails { card_holder: "X".into(), status: a.status })
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_status_filter_uses_expiry() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "john").await;
        let live = seed_card(&store, user.id, "live", 0).await;
        let lapsed = store
            .insert_card(NewCard {
                card_hash: "lapsed".into(),
                last_four_digits: "2222".into(),
                card_holder: "JOHN DOE".into(),
                expiry_date: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
                status: CardStatus::Active,
                user_id: user.id,
            })
            .await
            .unwrap();

        let by_status = |status| CardFilter {
            user_id: None,
            status: Some(status),
        };
        let active = store
            .list_cards(by_status(CardStatus::Active), today(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(active.content.iter().map(|c| c.id).collect::<Vec<_>>(), vec![live.id]);

        let expired = store
            .list_cards(by_status(CardStatus::Expired), today(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(expired.total_elements, 1);
        assert_eq!(expired.content[0].id, lapsed.id);
    }
}
