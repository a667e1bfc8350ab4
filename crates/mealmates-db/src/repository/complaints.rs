//! Food complaint operations

use chrono::Utc;
use sqlx::Row;

use crate::error::DbError;
use crate::models::{Complaint, NewComplaint};

use super::Database;

impl Database {
    /// Insert a new complaint
    pub async fn insert_complaint(&self, complaint: NewComplaint) -> Result<Complaint, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO complaints (locality, food_type, food_description, image, latitude,
                                    longitude, map_api, date, mobile_no, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&complaint.locality)
        .bind(&complaint.food_type)
        .bind(&complaint.food_description)
        .bind(&complaint.image)
        .bind(complaint.latitude)
        .bind(complaint.longitude)
        .bind(&complaint.map_api)
        .bind(complaint.date.to_rfc3339())
        .bind(&complaint.mobile_no)
        .bind(now.to_rfc3339())
        .fetch_one(&self.pool)
        .await?;

        Ok(Complaint {
            id: result.get("id"),
            locality: complaint.locality,
            food_type: complaint.food_type,
            food_description: complaint.food_description,
            image: complaint.image,
            latitude: complaint.latitude,
            longitude: complaint.longitude,
            map_api: complaint.map_api,
            date: complaint.date,
            mobile_no: complaint.mobile_no,
            created_at: now,
        })
    }

    /// List all complaints, newest first
    pub async fn list_complaints(&self) -> Result<Vec<Complaint>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT id, locality, food_type, food_description, image, latitude, longitude,
                   map_api, date, mobile_no, created_at
            FROM complaints
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Complaint::try_from(row).map_err(DbError::from))
            .collect()
    }
}
