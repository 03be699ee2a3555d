//! Initial schema: expenses, categories, preferences, exchange rates,
//! pricing ledger and AI cost logs.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(INITIAL_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const INITIAL_SQL: &str = r"
-- Per-user settings keyed by the messenger user id
CREATE TABLE user_preferences (
    user_id TEXT PRIMARY KEY,
    home_currency VARCHAR(3),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE categories (
    id UUID PRIMARY KEY,
    user_id TEXT NOT NULL,
    name TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_categories_user ON categories(user_id, created_at);

-- Amounts and rates are unconstrained NUMERIC so decimals round-trip exactly
CREATE TABLE expenses (
    id UUID PRIMARY KEY,
    user_id TEXT NOT NULL,
    description TEXT NOT NULL,
    original_amount NUMERIC NOT NULL,
    currency VARCHAR(3) NOT NULL,
    home_amount NUMERIC NOT NULL,
    home_currency VARCHAR(3) NOT NULL,
    exchange_rate NUMERIC NOT NULL DEFAULT 1,
    category_id UUID REFERENCES categories(id) ON DELETE SET NULL,
    account TEXT NOT NULL DEFAULT 'Cash',
    expense_date TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_expense_rate_non_negative CHECK (exchange_rate >= 0),
    CONSTRAINT chk_expense_account_not_empty CHECK (account <> '')
);

CREATE INDEX idx_expenses_user_date ON expenses(user_id, expense_date DESC);

-- Append-only rate cache; several rows may share (base, target, date), newest wins
CREATE TABLE exchange_rates (
    id UUID PRIMARY KEY,
    base_currency VARCHAR(3) NOT NULL,
    target_currency VARCHAR(3) NOT NULL,
    rate NUMERIC NOT NULL,
    rate_date DATE NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_exchange_rate_positive CHECK (rate > 0)
);

CREATE INDEX idx_exchange_rates_lookup
    ON exchange_rates(base_currency, target_currency, rate_date DESC, created_at DESC);

-- One active row per (provider, model) is kept by the sync job, not by a constraint
CREATE TABLE pricing_configs (
    id UUID PRIMARY KEY,
    provider TEXT NOT NULL,
    model TEXT NOT NULL,
    input_token_price NUMERIC NOT NULL,
    output_token_price NUMERIC NOT NULL,
    currency VARCHAR(3) NOT NULL DEFAULT 'USD',
    effective_date TIMESTAMPTZ NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_pricing_configs_active
    ON pricing_configs(provider, model) WHERE is_active;

CREATE TABLE ai_cost_logs (
    id UUID PRIMARY KEY,
    user_id TEXT NOT NULL,
    operation VARCHAR(32) NOT NULL,
    provider TEXT NOT NULL,
    model TEXT NOT NULL,
    input_tokens BIGINT NOT NULL,
    output_tokens BIGINT NOT NULL,
    total_tokens BIGINT NOT NULL,
    cost NUMERIC NOT NULL,
    currency VARCHAR(3) NOT NULL,
    cost_note TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_ai_cost_logs_user ON ai_cost_logs(user_id, created_at DESC);
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS ai_cost_logs CASCADE;
DROP TABLE IF EXISTS pricing_configs CASCADE;
DROP TABLE IF EXISTS exchange_rates CASCADE;
DROP TABLE IF EXISTS expenses CASCADE;
DROP TABLE IF EXISTS categories CASCADE;
DROP TABLE IF EXISTS user_preferences CASCADE;
";
