//! Database bootstrap: create the database, then the tables.
//!
//! The schema is a fixed list of `CREATE TABLE IF NOT EXISTS` statements
//! applied in foreign-key order on every start.

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{ConnectOptions, Connection};
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::config::validation::is_sql_identifier;
use crate::db::store::{StoreError, StoreResult};

/// Tables in creation order.
pub const SCHEMA: &[(&str, &str)] = &[
    (
        "users",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            user_id SERIAL PRIMARY KEY,
            roll_number VARCHAR(50) NOT NULL,
            name VARCHAR(100) NOT NULL,
            email VARCHAR(100) UNIQUE NOT NULL,
            dob DATE,
            wallet_address VARCHAR(42),
            identity_token_id TEXT,
            identity_tx_hash VARCHAR(100),
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    ),
    (
        "faculty",
        r#"
        CREATE TABLE IF NOT EXISTS faculty (
            faculty_id SERIAL PRIMARY KEY,
            name VARCHAR(100) NOT NULL,
            email VARCHAR(100) UNIQUE NOT NULL,
            department VARCHAR(100),
            wallet_address VARCHAR(42),
            identity_token_id TEXT,
            identity_tx_hash VARCHAR(100),
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    ),
    (
        "courses",
        r#"
        CREATE TABLE IF NOT EXISTS courses (
            course_id SERIAL PRIMARY KEY,
            course_name VARCHAR(100) NOT NULL,
            description TEXT,
            faculty_id INTEGER REFERENCES faculty(faculty_id),
            end_date DATE NOT NULL
        )
        "#,
    ),
    (
        "registrations",
        r#"
        CREATE TABLE IF NOT EXISTS registrations (
            registration_id SERIAL PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(user_id),
            course_id INTEGER NOT NULL REFERENCES courses(course_id),
            grade SMALLINT CHECK (grade BETWEEN 0 AND 100),
            tx_hash VARCHAR(100),
            registration_date TIMESTAMPTZ NOT NULL DEFAULT now(),
            UNIQUE (user_id, course_id)
        )
        "#,
    ),
    (
        "certificates",
        r#"
        CREATE TABLE IF NOT EXISTS certificates (
            certificate_id SERIAL PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(user_id),
            course_id INTEGER NOT NULL REFERENCES courses(course_id),
            nft_certificate_uri TEXT NOT NULL,
            token_id TEXT,
            tx_hash VARCHAR(100),
            issued_date TIMESTAMPTZ NOT NULL DEFAULT now(),
            UNIQUE (user_id, course_id)
        )
        "#,
    ),
    (
        "transactions",
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            transaction_id SERIAL PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(user_id),
            type VARCHAR(50) NOT NULL,
            amount NUMERIC CHECK (amount >= 0),
            transaction_hash VARCHAR(100),
            transaction_date TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    ),
    (
        "semesters",
        r#"
        CREATE TABLE IF NOT EXISTS semesters (
            semester_id SERIAL PRIMARY KEY,
            name VARCHAR(100) NOT NULL,
            start_date DATE NOT NULL,
            end_date DATE NOT NULL,
            fee_amount NUMERIC NOT NULL CHECK (fee_amount >= 0),
            CHECK (end_date >= start_date)
        )
        "#,
    ),
    (
        "fees_paid",
        r#"
        CREATE TABLE IF NOT EXISTS fees_paid (
            payment_id SERIAL PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(user_id),
            semester_id INTEGER NOT NULL REFERENCES semesters(semester_id),
            amount NUMERIC NOT NULL CHECK (amount >= 0),
            token_uri TEXT NOT NULL,
            tx_hash VARCHAR(100),
            paid_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            UNIQUE (user_id, semester_id)
        )
        "#,
    ),
    (
        "rooms",
        r#"
        CREATE TABLE IF NOT EXISTS rooms (
            room_id SERIAL PRIMARY KEY,
            name VARCHAR(100) NOT NULL,
            location VARCHAR(200),
            capacity INTEGER NOT NULL CHECK (capacity > 0)
        )
        "#,
    ),
    (
        "events",
        r#"
        CREATE TABLE IF NOT EXISTS events (
            event_id SERIAL PRIMARY KEY,
            title VARCHAR(200) NOT NULL,
            description TEXT,
            room_id INTEGER REFERENCES rooms(room_id),
            starts_at TIMESTAMPTZ NOT NULL,
            ends_at TIMESTAMPTZ NOT NULL,
            capacity INTEGER NOT NULL CHECK (capacity > 0),
            CHECK (ends_at > starts_at)
        )
        "#,
    ),
    (
        "bookings",
        r#"
        CREATE TABLE IF NOT EXISTS bookings (
            booking_id SERIAL PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(user_id),
            room_id INTEGER REFERENCES rooms(room_id),
            event_id INTEGER REFERENCES events(event_id),
            starts_at TIMESTAMPTZ NOT NULL,
            ends_at TIMESTAMPTZ NOT NULL,
            token_uri TEXT,
            tx_hash VARCHAR(100),
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            CHECK ((room_id IS NULL) <> (event_id IS NULL)),
            CHECK (ends_at > starts_at),
            UNIQUE (user_id, event_id)
        )
        "#,
    ),
];

fn connect_options(config: &DatabaseConfig, database: &str) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(database)
}

fn db_error(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

/// Create the target database through the `postgres` maintenance database.
///
/// Returns true when the database was created.
pub async fn create_database_if_missing(config: &DatabaseConfig) -> StoreResult<bool> {
    if !is_sql_identifier(&config.name) {
        return Err(StoreError::Database(format!(
            "refusing to create database with name '{}'",
            config.name
        )));
    }

    let mut conn = connect_options(config, "postgres")
        .connect()
        .await
        .map_err(db_error)?;

    let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM pg_database WHERE datname = $1")
        .bind(&config.name)
        .fetch_optional(&mut conn)
        .await
        .map_err(db_error)?;

    let created = if exists.is_none() {
        sqlx::query(&format!("CREATE DATABASE \"{}\"", config.name))
            .execute(&mut conn)
            .await
            .map_err(db_error)?;
        info!(database = %config.name, "Database created");
        true
    } else {
        info!(database = %config.name, "Database already exists");
        false
    };

    conn.close().await.map_err(db_error)?;
    Ok(created)
}

/// Open the connection pool to the target database.
pub async fn connect_pool(config: &DatabaseConfig) -> StoreResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect_with(connect_options(config, &config.name))
        .await
        .map_err(db_error)
}

/// Apply every `CREATE TABLE IF NOT EXISTS` statement in order.
pub async fn create_tables(pool: &PgPool) -> StoreResult<()> {
    for (table, ddl) in SCHEMA {
        sqlx::query(ddl).execute(pool).await.map_err(|e| {
            StoreError::Database(format!("creating table {}: {}", table, e))
        })?;
        info!(table = %table, "Table ready");
    }
    info!(tables = SCHEMA.len(), "All tables created or already exist");
    Ok(())
}

/// Full bootstrap: optional database creation, pool, tables.
pub async fn init_database(config: &DatabaseConfig) -> StoreResult<PgPool> {
    if config.create_if_missing {
        create_database_if_missing(config).await?;
    }
    let pool = connect_pool(config).await?;
    create_tables(&pool).await?;
    Ok(pool)
}
