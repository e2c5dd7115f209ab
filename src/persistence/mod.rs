//! Storage ports for users, cards and transactions
//!
//! Services talk to storage only through [`UserStore`] and [`CardStore`].
//! Two adapters implement both traits:
//! - [`PgStore`]: PostgreSQL via sqlx, row locks for transfers
//! - [`MemoryStore`]: process-local state behind one async mutex

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::account::models::{NewUser, User, UserRole};
use crate::card::models::{Card, CardStatus, NewCard, NewTransaction, Transaction};
use crate::core_types::{CardId, UserId};
use crate::error::BankResult;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Zero-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    /// Size is clamped to `1..=MAX_PAGE_SIZE`, missing values take defaults.
    pub fn new(page: Option<u32>, size: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(0),
            size: size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        self.page as u64 * self.size as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// `?page=&size=` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Zero-based page index
    pub page: Option<u32>,
    /// Page size, 1 to 100
    pub size: Option<u32>,
}

impl From<PageQuery> for PageRequest {
    fn from(q: PageQuery) -> Self {
        PageRequest::new(q.page, q.size)
    }
}

/// One page of results plus totals
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: u64) -> Self {
        let total_pages = total_elements.div_ceil(request.size as u64) as u32;
        Self {
            content,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}

/// Optional, independent filters for card listings. `status` matches the
/// status after expiry is applied, so a stored ACTIVE card past its expiry
/// date is found by EXPIRED and not by ACTIVE.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CardFilter {
    pub user_id: Option<UserId>,
    pub status: Option<CardStatus>,
}

impl CardFilter {
    pub fn matches(&self, card: &Card, today: NaiveDate) -> bool {
        self.user_id.is_none_or(|uid| card.user_id == uid)
            && self.status.is_none_or(|s| card.effective_status(today) == s)
    }
}

/// Card fields a lifecycle write may change. The balance is not among them:
/// only [`CardStore::transfer`] writes balances, under its row locks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardDetails {
    pub card_holder: String,
    pub status: CardStatus,
}

/// Read-modify-write step run by [`CardStore::transfer`] while both card
/// rows are locked. Arguments are (source, destination); the step mutates
/// them in place and returns the transaction to record.
pub type TransferStep<'a> =
    &'a (dyn Fn(&mut Card, &mut Card) -> BankResult<NewTransaction> + Send + Sync);

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `UserAlreadyExists` when username or email is taken.
    async fn create_user(&self, user: NewUser) -> BankResult<User>;

    async fn find_user(&self, id: UserId) -> BankResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> BankResult<Option<User>>;

    async fn user_exists(&self, username: &str, email: &str) -> BankResult<bool>;

    /// Ordered by id ascending
    async fn list_users(&self, page: PageRequest) -> BankResult<Page<User>>;

    /// Returns the updated user, or None when it does not exist.
    async fn set_user_role(&self, id: UserId, role: UserRole) -> BankResult<Option<User>>;

    async fn set_user_enabled(&self, id: UserId, enabled: bool) -> BankResult<Option<User>>;
}

#[async_trait]
pub trait CardStore: Send + Sync {
    async fn card_hash_exists(&self, card_hash: &str) -> BankResult<bool>;

    /// Fails with `InvalidData("Card already exists")` on a duplicate hash.
    async fn insert_card(&self, card: NewCard) -> BankResult<Card>;

    async fn find_card(&self, id: CardId) -> BankResult<Option<Card>>;

    /// How many of `ids` belong to `user_id`. Balances are not read.
    async fn count_owned_cards(&self, user_id: UserId, ids: &[CardId]) -> BankResult<u64>;

    /// All cards of one owner, ordered by id ascending
    async fn list_user_cards(&self, user_id: UserId) -> BankResult<Vec<Card>>;

    /// Ordered by id ascending. Expiry is judged against `today`.
    async fn list_cards(
        &self,
        filter: CardFilter,
        today: NaiveDate,
        page: PageRequest,
    ) -> BankResult<Page<Card>>;

    /// Persist holder and status, leaving the balance untouched.
    /// None when the card is gone.
    async fn update_card_details(
        &self,
        id: CardId,
        details: &CardDetails,
    ) -> BankResult<Option<Card>>;

    /// Returns false when nothing was deleted.
    async fn delete_card(&self, id: CardId) -> BankResult<bool>;

    /// Transactions where the card is source or destination, newest first.
    async fn card_transactions(&self, card_id: CardId) -> BankResult<Vec<Transaction>>;

    /// Lock both cards, run `step`, then persist both cards and the new
    /// transaction atomically. Nothing is written when `step` fails.
    async fn transfer(
        &self,
        from_id: CardId,
        to_id: CardId,
        step: TransferStep<'_>,
    ) -> BankResult<Transaction>;

    async fn health_check(&self) -> BankResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_clamps() {
        assert_eq!(PageRequest::new(None, None), PageRequest { page: 0, size: 20 });
        assert_eq!(PageRequest::new(Some(2), Some(0)).size, 1);
        assert_eq!(PageRequest::new(Some(2), Some(500)).size, MAX_PAGE_SIZE);
        assert_eq!(PageRequest::new(Some(3), Some(10)).offset(), 30);
    }

    #[test]
    fn test_page_totals() {
        let page = Page::new(vec![1, 2], PageRequest::new(Some(0), Some(2)), 5);
        assert_eq!(page.total_pages, 3);
        let empty: Page<i32> = Page::new(vec![], PageRequest::default(), 0);
        assert_eq!(empty.total_pages, 0);
        assert_eq!(page.map(|x| x * 10).content, vec![10, 20]);
    }
}
