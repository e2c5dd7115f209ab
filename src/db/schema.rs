use sqlx::PgPool;

/// Initialize PostgreSQL schema for users, cards and transactions
pub async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Initializing PostgreSQL schema...");

    for (name, ddl) in [
        ("users", CREATE_USERS_TABLE),
        ("cards", CREATE_CARDS_TABLE),
        ("cards_user_idx", CREATE_CARDS_USER_INDEX),
        ("transactions", CREATE_TRANSACTIONS_TABLE),
        ("transactions_from_idx", CREATE_TRANSACTIONS_FROM_INDEX),
        ("transactions_to_idx", CREATE_TRANSACTIONS_TO_INDEX),
    ] {
        sqlx::query(ddl).execute(pool).await.inspect_err(|e| {
            tracing::error!(object = name, error = %e, "Failed to apply schema");
        })?;
    }

    tracing::info!("PostgreSQL schema ready");
    Ok(())
}

pub const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id            BIGSERIAL PRIMARY KEY,
    username      VARCHAR(50)  NOT NULL UNIQUE,
    email         VARCHAR(100) NOT NULL UNIQUE,
    password_hash TEXT         NOT NULL,
    enabled       BOOLEAN      NOT NULL DEFAULT TRUE,
    role          VARCHAR(20)  NOT NULL DEFAULT 'USER',
    created_at    TIMESTAMPTZ  NOT NULL DEFAULT NOW(),
    updated_at    TIMESTAMPTZ  NOT NULL DEFAULT NOW()
)
"#;

// balance CHECK backs the non-negative invariant at the storage level
pub const CREATE_CARDS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS cards (
    id               BIGSERIAL PRIMARY KEY,
    card_hash        VARCHAR(128)   NOT NULL UNIQUE,
    last_four_digits VARCHAR(4)     NOT NULL,
    card_holder      VARCHAR(100)   NOT NULL,
    expiry_date      DATE           NOT NULL,
    status           VARCHAR(20)    NOT NULL DEFAULT 'ACTIVE',
    balance          NUMERIC(15, 2) NOT NULL DEFAULT 0 CHECK (balance >= 0),
    user_id          BIGINT         NOT NULL REFERENCES users(id),
    created_at       TIMESTAMPTZ    NOT NULL DEFAULT NOW(),
    updated_at       TIMESTAMPTZ    NOT NULL DEFAULT NOW()
)
"#;

pub const CREATE_CARDS_USER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS cards_user_id_idx ON cards (user_id, status)";

pub const CREATE_TRANSACTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS transactions (
    id             BIGSERIAL PRIMARY KEY,
    transaction_id UUID           NOT NULL UNIQUE,
    amount         NUMERIC(15, 2) NOT NULL CHECK (amount > 0),
    description    VARCHAR(255),
    status         VARCHAR(20)    NOT NULL,
    type           VARCHAR(20)    NOT NULL,
    created_at     TIMESTAMPTZ    NOT NULL DEFAULT NOW(),
    from_card_id   BIGINT REFERENCES cards(id) ON DELETE SET NULL,
    to_card_id     BIGINT NOT NULL REFERENCES cards(id) ON DELETE CASCADE
)
"#;

pub const CREATE_TRANSACTIONS_FROM_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS transactions_from_card_idx ON transactions (from_card_id)";

pub const CREATE_TRANSACTIONS_TO_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS transactions_to_card_idx ON transactions (to_card_id)";
