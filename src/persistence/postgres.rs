//! PostgreSQL store
//!
//! Runtime `sqlx::query` with binds against the schema in `db::schema`.
//! Transfers lock both card rows with `SELECT ... FOR UPDATE` in ascending
//! id order inside one database transaction.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, Row};

use super::{CardDetails, CardFilter, CardStore, Page, PageRequest, TransferStep, UserStore};
use crate::account::models::{NewUser, User, UserRole};
use crate::card::models::{Card, NewCard, Transaction};
use crate::core_types::{CardId, UserId};
use crate::db::Database;
use crate::error::{BankError, BankResult};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, enabled, role, created_at, updated_at";

const CARD_COLUMNS: &str = "id, card_hash, last_four_digits, card_holder, expiry_date, \
     status, balance, user_id, created_at, updated_at";

/// $1 owner, $2 status after expiry, $3 today
const CARD_FILTER: &str = "($1::BIGINT IS NULL OR user_id = $1) AND ($2::VARCHAR IS NULL \
     OR ($2 = 'EXPIRED' AND (status = 'EXPIRED' OR expiry_date < $3)) \
     OR ($2 <> 'EXPIRED' AND status = $2 AND expiry_date >= $3))";

const TRANSACTION_COLUMNS: &str =
    "id, transaction_id, amount, description, status, type, created_at, from_card_id, to_card_id";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn from_database(db: &Database) -> Self {
        Self::new(db.pool().clone())
    }
}

fn decode_err(msg: String) -> sqlx::Error {
    sqlx::Error::Decode(msg.into())
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        enabled: row.try_get("enabled")?,
        role: role.parse().map_err(decode_err)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn card_from_row(row: &PgRow) -> Result<Card, sqlx::Error> {
    let status: String = row.try_get("status")?;
    Ok(Card {
        id: row.try_get("id")?,
        card_hash: row.try_get("card_hash")?,
        last_four_digits: row.try_get("last_four_digits")?,
        card_holder: row.try_get("card_holder")?,
        expiry_date: row.try_get("expiry_date")?,
        status: status.parse().map_err(decode_err)?,
        balance: row.try_get("balance")?,
        user_id: row.try_get("user_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn transaction_from_row(row: &PgRow) -> Result<Transaction, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let kind: String = row.try_get("type")?;
    Ok(Transaction {
        id: row.try_get("id")?,
        transaction_id: row.try_get("transaction_id")?,
        amount: row.try_get("amount")?,
        description: row.try_get("description")?,
        status: status.parse().map_err(decode_err)?,
        kind: kind.parse().map_err(decode_err)?,
        created_at: row.try_get("created_at")?,
        from_card_id: row.try_get("from_card_id")?,
        to_card_id: row.try_get("to_card_id")?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

async fn lock_card(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    id: CardId,
) -> BankResult<Card> {
    let sql = format!("SELECT {} FROM cards WHERE id = $1 FOR UPDATE", CARD_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(BankError::card_not_found)?;
    Ok(card_from_row(&row)?)
}

async fn write_balance_and_status(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    card: &Card,
) -> BankResult<()> {
    sqlx::query("UPDATE cards SET status = $1, balance = $2, updated_at = NOW() WHERE id = $3")
        .bind(card.status.as_str())
        .bind(card.balance)
        .bind(card.id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> BankResult<User> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash, role) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    BankError::UserAlreadyExists("Username or Email already exists".to_string())
                } else {
                    BankError::Database(e)
                }
            })?;
        Ok(user_from_row(&row)?)
    }

    async fn find_user(&self, id: UserId) -> BankResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn find_user_by_username(&self, username: &str) -> BankResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn user_exists(&self, username: &str, email: &str) -> BankResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE username = $1 OR email = $2)",
        )
        .bind(username)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn list_users(&self, page: PageRequest) -> BankResult<Page<User>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {} FROM users ORDER BY id LIMIT $1 OFFSET $2",
            USER_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(page.size as i64)
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await?;
        let users = rows.iter().map(user_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(users, page, total as u64))
    }

    async fn set_user_role(&self, id: UserId, role: UserRole) -> BankResult<Option<User>> {
        let sql = format!(
            "UPDATE users SET role = $1, updated_at = NOW() WHERE id = $2 RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(role.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn set_user_enabled(&self, id: UserId, enabled: bool) -> BankResult<Option<User>> {
        let sql = format!(
            "UPDATE users SET enabled = $1, updated_at = NOW() WHERE id = $2 RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(enabled)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }
}

#[async_trait]
impl CardStore for PgStore {
    async fn card_hash_exists(&self, card_hash: &str) -> BankResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM cards WHERE card_hash = $1)")
                .bind(card_hash)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn insert_card(&self, card: NewCard) -> BankResult<Card> {
        let sql = format!(
            "INSERT INTO cards (card_hash, last_four_digits, card_holder, expiry_date, status, user_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            CARD_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(&card.card_hash)
            .bind(&card.last_four_digits)
            .bind(&card.card_holder)
            .bind(card.expiry_date)
            .bind(card.status.as_str())
            .bind(card.user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                // lost the race against a concurrent insert of the same number
                if is_unique_violation(&e) {
                    BankError::InvalidData("Card already exists".to_string())
                } else {
                    BankError::Database(e)
                }
            })?;
        Ok(card_from_row(&row)?)
    }

    async fn find_card(&self, id: CardId) -> BankResult<Option<Card>> {
        let sql = format!("SELECT {} FROM cards WHERE id = $1", CARD_COLUMNS);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(card_from_row).transpose()?)
    }

    async fn count_owned_cards(&self, user_id: UserId, ids: &[CardId]) -> BankResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM cards WHERE user_id = $1 AND id = ANY($2)")
                .bind(user_id)
                .bind(ids)
                .fetch_one(&self.pool)
                .await?;
        Ok(count as u64)
    }

    async fn list_user_cards(&self, user_id: UserId) -> BankResult<Vec<Card>> {
        let sql = format!("SELECT {} FROM cards WHERE user_id = $1 ORDER BY id", CARD_COLUMNS);
        let rows = sqlx::query(&sql).bind(user_id).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(card_from_row).collect::<Result<Vec<_>, _>>()?)
    }

    async fn list_cards(
        &self,
        filter: CardFilter,
        today: NaiveDate,
        page: PageRequest,
    ) -> BankResult<Page<Card>> {
        let status = filter.status.map(|s| s.as_str());

        let count_sql = format!("SELECT COUNT(*) FROM cards WHERE {}", CARD_FILTER);
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(filter.user_id)
            .bind(status)
            .bind(today)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {} FROM cards WHERE {} ORDER BY id LIMIT $4 OFFSET $5",
            CARD_COLUMNS, CARD_FILTER
        );
        let rows = sqlx::query(&sql)
            .bind(filter.user_id)
            .bind(status)
            .bind(today)
            .bind(page.size as i64)
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await?;
        let cards = rows.iter().map(card_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(cards, page, total as u64))
    }

    async fn update_card_details(
        &self,
        id: CardId,
        details: &CardDetails,
    ) -> BankResult<Option<Card>> {
        let sql = format!(
            "UPDATE cards SET card_holder = $1, status = $2, updated_at = NOW() \
             WHERE id = $3 RETURNING {}",
            CARD_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(&details.card_holder)
            .bind(details.status.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(card_from_row).transpose()?)
    }

    async fn delete_card(&self, id: CardId) -> BankResult<bool> {
        let result = sqlx::query("DELETE FROM cards WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn card_transactions(&self, card_id: CardId) -> BankResult<Vec<Transaction>> {
        let sql = format!(
            "SELECT {} FROM transactions WHERE from_card_id = $1 OR to_card_id = $1 \
             ORDER BY created_at DESC, id DESC",
            TRANSACTION_COLUMNS
        );
        let rows = sqlx::query(&sql).bind(card_id).fetch_all(&self.pool).await?;
        Ok(rows
            .iter()
            .map(transaction_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn transfer(
        &self,
        from_id: CardId,
        to_id: CardId,
        step: TransferStep<'_>,
    ) -> BankResult<Transaction> {
        let mut tx = self.pool.begin().await?;

        // ascending id order keeps concurrent transfers deadlock free
        let (mut from, mut to) = if from_id == to_id {
            let card = lock_card(&mut tx, from_id).await?;
            (card.clone(), card)
        } else if from_id < to_id {
            let from = lock_card(&mut tx, from_id).await?;
            let to = lock_card(&mut tx, to_id).await?;
            (from, to)
        } else {
            let to = lock_card(&mut tx, to_id).await?;
            let from = lock_card(&mut tx, from_id).await?;
            (from, to)
        };
        let opening = from.balance;

        // dropping `tx` on error rolls back
        let new_tx = step(&mut from, &mut to)?;

        if from_id == to_id {
            from.balance = opening;
        } else {
            write_balance_and_status(&mut tx, &to).await?;
        }
        write_balance_and_status(&mut tx, &from).await?;

        let row = sqlx::query(
            "INSERT INTO transactions \
             (transaction_id, amount, description, status, type, created_at, from_card_id, to_card_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id",
        )
        .bind(new_tx.transaction_id)
        .bind(new_tx.amount)
        .bind(new_tx.description.as_deref())
        .bind(new_tx.status.as_str())
        .bind(new_tx.kind.as_str())
        .bind(new_tx.created_at)
        .bind(new_tx.from_card_id)
        .bind(new_tx.to_card_id)
        .fetch_one(&mut *tx)
        .await?;
        let id: i64 = row.try_get("id")?;

        tx.commit().await?;
        Ok(new_tx.into_transaction(id))
    }

    async fn health_check(&self) -> BankResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
