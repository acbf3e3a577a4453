use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use super::Error;
use crate::models;
use crate::models::photos::NewPhoto;

pub use crate::models::photos::PhotoId;

#[derive(Debug, FromRow)]
pub struct Photo {
    pub id: PhotoId,
    pub source: String,
    pub caption: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[async_trait::async_trait]
pub trait PhotoStore: std::fmt::Debug + Send + Sync {
    /// All photos, oldest first.
    async fn get_all_photos(&self) -> Result<Vec<models::photos::Photo>, Error>;

    async fn get_photo_by_id(
        &self,
        photo_id: PhotoId,
    ) -> Result<Option<models::photos::Photo>, Error>;

    /// Persists a new photo and returns the id the store assigned to it.
    async fn insert_photo(&self, photo: &NewPhoto) -> Result<PhotoId, Error>;

    /// Returns whether a photo with `photo_id` existed.
    async fn update_photo(&self, photo_id: PhotoId, photo: &NewPhoto) -> Result<bool, Error>;
}

#[async_trait::async_trait]
impl PhotoStore for PgPool {
    #[tracing::instrument(skip(self))]
    async fn get_all_photos(&self) -> Result<Vec<models::photos::Photo>, Error> {
        let res: Vec<Photo> = sqlx::query_as(
            r#"
                SELECT
                    id, source, caption, created_at, updated_at
                FROM
                    photos
                ORDER BY
                    id ASC
            "#,
        )
        .fetch_all(self)
        .await?;

        Ok(res.into_iter().map(models::photos::Photo::from).collect())
    }


    #[tracing::instrument(skip(self))]
    async fn get_photo_by_id(
        &self,
        photo_id: PhotoId,
    ) -> Result<Option<models::photos::Photo>, Error> {
        let res: Result<Photo, _> = sqlx::query_as(
            r#"
                SELECT
                    id, source, caption, created_at, updated_at
                FROM
                    photos
                WHERE
                    id = $1
            "#,
        )
        .bind(photo_id)
        .fetch_one(self)
        .await;

        match res {
            Ok(photo) => Ok(Some(photo.into())),
            Err(sqlx::Error::RowNotFound) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }


    #[tracing::instrument(skip(self))]
    async fn insert_photo(&self, photo: &NewPhoto) -> Result<PhotoId, Error> {
        let mut trans = self.begin().await?;

        let (id,): (PhotoId,) = sqlx::query_as(
            r#"
                INSERT INTO photos
                    (source, caption)
                VALUES
                    ($1, $2)
                RETURNING
                    id
            "#,
        )
        .bind(photo.source())
        .bind(photo.caption())
        .fetch_one(&mut trans)
        .await?;

        trans.commit().await?;

        Ok(id)
    }


    #[tracing::instrument(skip(self))]
    async fn update_photo(&self, photo_id: PhotoId, photo: &NewPhoto) -> Result<bool, Error> {
        let res = sqlx::query(
            r#"
                UPDATE
                    photos
                SET
                    source = $2,
                    caption = $3,
                    updated_at = NOW()
                WHERE
                    id = $1
            "#,
        )
        .bind(photo_id)
        .bind(photo.source())
        .bind(photo.caption())
        .execute(self)
        .await?;

        Ok(res.rows_affected() > 0)
    }
}
