//! PostgreSQL schema bootstrap.
//!
//! Statements are idempotent and run in order at startup. Constraint names are
//! spelled out because the stores map unique violations back to fields by name.

pub const USERS_USERNAME_KEY: &str = "users_username_key";
pub const USERS_EMAIL_KEY: &str = "users_email_key";
pub const REFRESH_TOKEN_TOKEN_KEY: &str = "refresh_token_token_key";
pub const CATEGORIES_NAME_KEY: &str = "categories_category_name_key";

pub const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id          BIGSERIAL PRIMARY KEY,
        email       VARCHAR(255) NOT NULL,
        username    VARCHAR(50)  NOT NULL,
        password    VARCHAR(255) NOT NULL,
        created_at  TIMESTAMPTZ  NOT NULL DEFAULT NOW(),
        CONSTRAINT users_email_key UNIQUE (email),
        CONSTRAINT users_username_key UNIQUE (username)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS refresh_token (
        id          BIGSERIAL PRIMARY KEY,
        token       TEXT        NOT NULL,
        user_id     BIGINT      NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        expires_at  TIMESTAMPTZ NOT NULL,
        CONSTRAINT refresh_token_token_key UNIQUE (token)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS refresh_token_user_idx ON refresh_token (user_id, created_at)",
    "CREATE INDEX IF NOT EXISTS refresh_token_expires_idx ON refresh_token (expires_at)",
    r#"
    CREATE TABLE IF NOT EXISTS categories (
        id             BIGSERIAL PRIMARY KEY,
        category_name  VARCHAR(100) NOT NULL,
        CONSTRAINT categories_category_name_key UNIQUE (category_name)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS questions (
        id           BIGSERIAL PRIMARY KEY,
        text         TEXT        NOT NULL,
        difficulty   VARCHAR(16) NOT NULL CHECK (difficulty IN ('easy', 'medium', 'advanced')),
        explanation  TEXT,
        category_id  BIGINT      NOT NULL REFERENCES categories(id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS answer_options (
        id           BIGSERIAL PRIMARY KEY,
        text         TEXT    NOT NULL,
        is_correct   BOOLEAN NOT NULL DEFAULT FALSE,
        question_id  BIGINT  NOT NULL REFERENCES questions(id) ON DELETE CASCADE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS videos (
        id           BIGSERIAL PRIMARY KEY,
        title        VARCHAR(255) NOT NULL,
        description  TEXT,
        url          VARCHAR(500) NOT NULL
    )
    "#,
];
