use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use super::hashing::{CardHasher, last_four};
use super::models::{Card, CardStatus, NewCard, Transaction, expiry_status, normalize_holder};
use super::transfer::{TransferRequest, apply_transfer};
use super::validator::{CardBrand, luhn_check};
use crate::config::TransferPolicy;
use crate::core_types::CardId;
use crate::error::{BankError, BankResult};
use crate::money::validate_amount;
use crate::persistence::{CardDetails, CardFilter, CardStore, Page, PageRequest, UserStore};
use crate::security::CardNumberCipher;
use crate::user_auth::Principal;

/// Card issuance request. The number arrives RSA encrypted.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateCardRequest {
    #[validate(length(min = 1, message = "Encrypted card number is required"))]
    #[schema(example = "base64 RSA-OAEP ciphertext")]
    pub encrypted_card_number: String,
    #[validate(custom(function = "validate_holder"))]
    #[schema(example = "John Doe")]
    pub card_holder: String,
    #[validate(custom(function = "validate_future_date"))]
    #[schema(value_type = String, format = Date, example = "2030-12-31")]
    pub expiry_date: NaiveDate,
    /// Checked for shape only, never stored
    #[validate(custom(function = "validate_cvv"))]
    #[schema(example = "123")]
    pub cvv: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateCardRequest {
    #[validate(custom(function = "validate_holder"))]
    #[schema(example = "John Doe")]
    pub card_holder: String,
}

fn validation_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// 2-100 characters of Latin or Cyrillic letters, spaces and hyphens
fn validate_holder(holder: &str) -> Result<(), ValidationError> {
    let len = holder.trim().chars().count();
    if !(2..=100).contains(&len) {
        return Err(validation_error(
            "length",
            "Card holder must be between 2 and 100 characters",
        ));
    }
    let allowed = |c: char| {
        c.is_ascii_alphabetic() || ('\u{0400}'..='\u{04FF}').contains(&c) || c.is_whitespace() || c == '-'
    };
    if !holder.chars().all(allowed) {
        return Err(validation_error(
            "pattern",
            "Card holder may contain only letters, spaces and hyphens",
        ));
    }
    Ok(())
}

fn validate_future_date(date: &NaiveDate) -> Result<(), ValidationError> {
    if *date <= Utc::now().date_naive() {
        return Err(validation_error("future", "Expiry date must be in the future"));
    }
    Ok(())
}

fn validate_cvv(cvv: &str) -> Result<(), ValidationError> {
    if !(3..=4).contains(&cvv.len()) || !cvv.chars().all(|c| c.is_ascii_digit()) {
        return Err(validation_error("cvv", "CVV must be 3 or 4 digits"));
    }
    Ok(())
}

fn system_today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Card lifecycle, transfers and admin card queries
pub struct CardService {
    cards: Arc<dyn CardStore>,
    users: Arc<dyn UserStore>,
    hasher: CardHasher,
    cipher: Arc<CardNumberCipher>,
    policy: TransferPolicy,
    today: fn() -> NaiveDate,
}

impl CardService {
    pub fn new(
        cards: Arc<dyn CardStore>,
        users: Arc<dyn UserStore>,
        hasher: CardHasher,
        cipher: Arc<CardNumberCipher>,
        policy: TransferPolicy,
    ) -> Self {
        Self {
            cards,
            users,
            hasher,
            cipher,
            policy,
            today: system_today,
        }
    }

    /// Replace the calendar used for expiry decisions
    pub fn with_today(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    fn today(&self) -> NaiveDate {
        (self.today)()
    }

    async fn load(&self, id: CardId) -> BankResult<Card> {
        self.cards
            .find_card(id)
            .await?
            .ok_or_else(BankError::card_not_found)
    }

    /// Owner or admin
    async fn load_accessible(&self, caller: &Principal, id: CardId) -> BankResult<Card> {
        let card = self.load(id).await?;
        if card.user_id != caller.user_id && !caller.is_admin() {
            return Err(BankError::access_denied());
        }
        Ok(card)
    }

    /// Re-evaluate expiry, then persist holder and status. The balance in
    /// `card` may be stale and is never written back.
    async fn save(&self, mut card: Card) -> BankResult<Card> {
        card.apply_expiry(self.today());
        let details = CardDetails {
            card_holder: card.card_holder,
            status: card.status,
        };
        self.cards
            .update_card_details(card.id, &details)
            .await?
            .ok_or_else(BankError::card_not_found)
    }

    fn for_display(&self, mut card: Card) -> Card {
        card.apply_expiry(self.today());
        card
    }

    pub async fn create_card(&self, caller: &Principal, req: CreateCardRequest) -> BankResult<Card> {
        let decrypted = self.cipher.decrypt(&req.encrypted_card_number)?;
        let number: String = decrypted.chars().filter(|c| !c.is_whitespace()).collect();

        if !number.chars().all(|c| c.is_ascii_digit()) || !luhn_check(&number) {
            return Err(BankError::InvalidData("Invalid card number".to_string()));
        }

        let card_hash = self.hasher.hash(&number);
        if self.cards.card_hash_exists(&card_hash).await? {
            tracing::warn!(user_id = caller.user_id, "Duplicate card rejected");
            return Err(BankError::InvalidData("Card already exists".to_string()));
        }

        let card = self
            .cards
            .insert_card(NewCard {
                card_hash,
                last_four_digits: last_four(&number),
                card_holder: normalize_holder(&req.card_holder),
                expiry_date: req.expiry_date,
                status: expiry_status(CardStatus::Active, req.expiry_date, self.today()),
                user_id: caller.user_id,
            })
            .await?;

        tracing::info!(
            card_id = card.id,
            user_id = caller.user_id,
            brand = %CardBrand::detect(&number),
            "Card created"
        );
        Ok(card)
    }

    pub async fn get_my_cards(&self, caller: &Principal) -> BankResult<Vec<Card>> {
        let cards = self.cards.list_user_cards(caller.user_id).await?;
        Ok(cards.into_iter().map(|c| self.for_display(c)).collect())
    }

    pub async fn get_card(&self, caller: &Principal, id: CardId) -> BankResult<Card> {
        let card = self.load_accessible(caller, id).await?;
        Ok(self.for_display(card))
    }

    pub async fn update_card(
        &self,
        caller: &Principal,
        id: CardId,
        req: UpdateCardRequest,
    ) -> BankResult<Card> {
        let mut card = self.load_accessible(caller, id).await?;
        card.card_holder = normalize_holder(&req.card_holder);
        self.save(card).await
    }

    pub async fn delete_card(&self, caller: &Principal, id: CardId) -> BankResult<()> {
        self.load_accessible(caller, id).await?;
        self.remove(id).await
    }

    /// Owner asks for their own card to be blocked
    pub async fn request_block_card(&self, caller: &Principal, id: CardId) -> BankResult<Card> {
        let mut card = self.load(id).await?;
        if card.user_id != caller.user_id {
            return Err(BankError::AccessDenied("Not your card".to_string()));
        }

        card.apply_expiry(self.today());
        match card.status {
            CardStatus::Blocked => {
                return Err(BankError::InvalidData("Card is already blocked".to_string()));
            }
            CardStatus::Expired => {
                return Err(BankError::InvalidData("Card is expired".to_string()));
            }
            CardStatus::Active => {}
        }

        card.status = CardStatus::Blocked;
        let card = self.save(card).await?;
        tracing::info!(card_id = id, user_id = caller.user_id, "Card blocked by owner");
        Ok(card)
    }

    /// Move funds between two cards of the caller.
    ///
    /// Not idempotent: every successful call debits again and records a new
    /// transaction.
    pub async fn transfer(
        &self,
        caller: Option<&Principal>,
        req: &TransferRequest,
    ) -> BankResult<Transaction> {
        let caller = caller.ok_or(BankError::Unauthorized)?;
        let user = self
            .users
            .find_user(caller.user_id)
            .await?
            .ok_or_else(BankError::user_not_found)?;

        let amount = validate_amount(req.amount)?;

        let same_card = req.from_card_id == req.to_card_id;
        if same_card && self.policy.reject_same_card {
            return Err(BankError::InvalidData(
                "Cannot transfer to the same card".to_string(),
            ));
        }

        let expected = if same_card { 1 } else { 2 };
        let owned = self
            .cards
            .count_owned_cards(user.id, &[req.from_card_id, req.to_card_id])
            .await?;
        if owned != expected {
            tracing::warn!(
                user_id = user.id,
                from_card_id = req.from_card_id,
                to_card_id = req.to_card_id,
                "Transfer rejected: card not owned by caller"
            );
            return Err(BankError::access_denied());
        }

        let today = self.today();
        let policy = self.policy;
        let step = move |from: &mut Card, to: &mut Card| apply_transfer(from, to, amount, today, policy);
        let tx = self
            .cards
            .transfer(req.from_card_id, req.to_card_id, &step)
            .await?;

        tracing::info!(
            transaction_id = %tx.transaction_id,
            from_card_id = req.from_card_id,
            to_card_id = req.to_card_id,
            amount = %amount,
            "Transfer completed"
        );
        Ok(tx)
    }

    // ------------------------------------------------------------------
    // Admin operations. The gateway admin gate enforces the role.
    // ------------------------------------------------------------------

    pub async fn get_all_cards(
        &self,
        filter: CardFilter,
        page: PageRequest,
    ) -> BankResult<Page<Card>> {
        let cards = self.cards.list_cards(filter, self.today(), page).await?;
        Ok(cards.map(|c| self.for_display(c)))
    }

    pub async fn block_card(&self, id: CardId) -> BankResult<Card> {
        self.set_status(id, CardStatus::Blocked).await
    }

    /// An expired card stays EXPIRED.
    pub async fn activate_card(&self, id: CardId) -> BankResult<Card> {
        self.set_status(id, CardStatus::Active).await
    }

    async fn set_status(&self, id: CardId, status: CardStatus) -> BankResult<Card> {
        let mut card = self.load(id).await?;
        card.status = status;
        let card = self.save(card).await?;
        tracing::info!(card_id = id, status = %card.status, "Card status changed by admin");
        Ok(card)
    }

    pub async fn admin_delete_card(&self, id: CardId) -> BankResult<()> {
        self.load(id).await?;
        self.remove(id).await
    }

    async fn remove(&self, id: CardId) -> BankResult<()> {
        if !self.cards.delete_card(id).await? {
            return Err(BankError::card_not_found());
        }
        tracing::info!(card_id = id, "Card deleted");
        Ok(())
    }

    /// Newest first
    pub async fn get_card_transactions(&self, card_id: CardId) -> BankResult<Vec<Transaction>> {
        self.load(card_id).await?;
        self.cards.card_transactions(card_id).await
    }
}
