use crate::models::customer::Customer;
use crate::models::review::{NewReview, Review};
use crate::models::review_token::ReviewToken;
use chrono::{DateTime, Utc};
use log::{debug, info};
use rusqlite::{params, Connection, Error, OptionalExtension, Row, TransactionBehavior};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;


/// Outcome of a redemption attempt that reached the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Redemption {
    Redeemed(Review),
    NotFound,
    AlreadyUsed,
    Expired,
}

// Shared handle to the SQLite connection; clones point at the same connection
#[derive(Debug, Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    // Open (or create) the database file and enable foreign keys
    pub fn new(db_path: &str) -> Result<Self, Error> {
        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        info!("[DB] Connection established at: {}", db_path);
        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub async fn create_schema(&self) -> Result<(), Error> {
        let conn = self.conn.lock().await;

        // 1. Customers table
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS customers (
                id TEXT PRIMARY KEY,
                name TEXT,
                email TEXT,
                created_at TEXT NOT NULL
            );",
        )
        .map_err(|e| {
            log::error!("[DB] Failed creating customers table: {}", e);
            e
        })?;

        // 2. Review tokens table
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS review_tokens (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                token TEXT NOT NULL UNIQUE,
                customer_id TEXT NOT NULL,
                expiry_time TEXT NOT NULL,
                used INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                FOREIGN KEY (customer_id) REFERENCES customers(id)
            );",
        )
        .map_err(|e| {
            log::error!("[DB] Failed creating review_tokens table: {}", e);
            e
        })?;

        // 3. Reviews table
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS reviews (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                customer_id TEXT NOT NULL,
                customer_name TEXT NOT NULL DEFAULT '',
                rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
                comment TEXT NOT NULL,
                service_type TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (customer_id) REFERENCES customers(id)
            );
            CREATE INDEX IF NOT EXISTS idx_reviews_created_at ON reviews (created_at);",
        )
        .map_err(|e| {
            log::error!("[DB] Failed creating reviews table: {}", e);
            e
        })?;
        Ok(())
    }

    /// Inserts a customer. Returns `false` when the id is already taken.
    pub async fn insert_customer(&self, customer: &Customer) -> Result<bool, Error> {
        let conn = self.conn.lock().await;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO customers (id, name, email, created_at) VALUES (?, ?, ?, ?)",
            params![
                &customer.id,
                &customer.name,
                &customer.email,
                customer.created_at
            ],
        )?;
        debug!("[DB] Customer insert {} affected {} rows", customer.id, inserted);
        Ok(inserted == 1)
    }

    pub async fn get_customer(&self, id: &str) -> Result<Option<Customer>, Error> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, name, email, created_at FROM customers WHERE id = ?",
            [id],
            |row| {
                Ok(Customer {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    created_at: row.get(3)?,
                })
            },
        )
        .optional()
    }

    // Single INSERT, so the row either exists fully or not at all
    pub async fn insert_review_token(
        &self,
        token: &str,
        customer_id: &str,
        expiry_time: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Result<ReviewToken, Error> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO review_tokens (token, customer_id, expiry_time, used, created_at)
            VALUES (?, ?, ?, 0, ?)",
            params![token, customer_id, expiry_time, created_at],
        )?;
        let id = conn.last_insert_rowid();
        debug!("[DB] Review token {} stored for customer {}", id, customer_id);
        Ok(ReviewToken {
            id,
            token: token.to_string(),
            customer_id: customer_id.to_string(),
            expiry_time,
            used: false,
            created_at,
        })
    }

    pub async fn find_review_token(&self, token: &str) -> Result<Option<ReviewToken>, Error> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, token, customer_id, expiry_time, used, created_at
            FROM review_tokens WHERE token = ?",
            [token],
            token_from_row,
        )
        .optional()
    }

    pub async fn count_review_tokens(&self) -> Result<i64, Error> {
        let conn = self.conn.lock().await;
        conn.query_row("SELECT COUNT(*) FROM review_tokens", [], |row| row.get(0))
    }

    /// Consumes the token named in `review` and writes the review in one
    /// immediate transaction.
    ///
    /// The token is claimed with `UPDATE ... WHERE used = 0`; if that touches
    /// no row another redemption won and the attempt reports `AlreadyUsed`.
    /// Any error drops the transaction, rolling back both writes.
    pub async fn redeem_review_token(
        &self,
        review: &NewReview,
        now: DateTime<Utc>,
    ) -> Result<Redemption, Error> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let found = tx
            .query_row(
                "SELECT t.id, t.customer_id, t.expiry_time, t.used, c.name
                FROM review_tokens t
                LEFT JOIN customers c ON c.id = t.customer_id
                WHERE t.token = ?",
                [&review.token],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, DateTime<Utc>>(2)?,
                        row.get::<_, bool>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((token_id, customer_id, expiry_time, used, customer_name)) = found else {
            return Ok(Redemption::NotFound);
        };
        if used {
            return Ok(Redemption::AlreadyUsed);
        }
        if now > expiry_time {
            return Ok(Redemption::Expired);
        }

        let claimed = tx.execute(
            "UPDATE review_tokens SET used = 1 WHERE id = ? AND used = 0",
            [token_id],
        )?;
        if claimed != 1 {
            debug!("[DB] Token {} claimed by a concurrent redemption", token_id);
            return Ok(Redemption::AlreadyUsed);
        }

        let customer_name = customer_name.unwrap_or_default();
        tx.execute(
            "INSERT INTO reviews (customer_id, customer_name, rating, comment, service_type, created_at)
            VALUES (?, ?, ?, ?, ?, ?)",
            params![
                &customer_id,
                &customer_name,
                review.rating,
                &review.comment,
                &review.service_type,
                now
            ],
        )?;
        let review_id = tx.last_insert_rowid();
        tx.commit()?;
        debug!("[DB] Token {} redeemed into review {}", token_id, review_id);

        Ok(Redemption::Redeemed(Review {
            id: review_id,
            customer_id,
            customer_name,
            rating: review.rating,
            comment: review.comment.clone(),
            service_type: review.service_type.clone(),
            created_at: now,
        }))
    }

    // Newest reviews first
    pub async fn list_reviews(&self, limit: u32) -> Result<Vec<Review>, Error> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, customer_id, customer_name, rating, comment, service_type, created_at
            FROM reviews
            ORDER BY created_at DESC, id DESC
            LIMIT ?",
        )?;
        let rows = stmt.query_map([limit], |row| {
            Ok(Review {
                id: row.get(0)?,
                customer_id: row.get(1)?,
                customer_name: row.get(2)?,
                rating: row.get(3)?,
                comment: row.get(4)?,
                service_type: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?;
        rows.collect()
    }
}

fn token_from_row(row: &Row<'_>) -> Result<ReviewToken, Error> {
    Ok(ReviewToken {
        id: row.get(0)?,
        token: row.get(1)?,
        customer_id: row.get(2)?,
        expiry_time: row.get(3)?,
        used: row.get(4)?,
        created_at: row.get(5)?,
    })
}
