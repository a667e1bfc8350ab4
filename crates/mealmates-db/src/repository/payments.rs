//! Payment operations

use chrono::Utc;
use sqlx::Row;

use crate::error::DbError;
use crate::models::{NewPayment, Payment};

use super::Database;

impl Database {
    /// Record a payment for a created checkout session
    pub async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO payments (name, email, amount, message, checkout_session_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&payment.name)
        .bind(&payment.email)
        .bind(payment.amount)
        .bind(&payment.message)
        .bind(&payment.checkout_session_id)
        .bind(now.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            DbError::from_insert(e, &format!("Checkout session '{}'", payment.checkout_session_id))
        })?;

        Ok(Payment {
            id: result.get("id"),
            name: payment.name,
            email: payment.email,
            amount: payment.amount,
            message: payment.message,
            checkout_session_id: payment.checkout_session_id,
            created_at: now,
        })
    }

    /// List all recorded payments, newest first
    pub async fn list_payments(&self) -> Result<Vec<Payment>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, email, amount, message, checkout_session_id, created_at
            FROM payments
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Payment::try_from(row).map_err(DbError::from))
            .collect()
    }
}
