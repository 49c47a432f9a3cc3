use rusqlite::{params, OptionalExtension};

use crate::db::models::{Media, NewMedia};
use crate::db::{begin_write, ensure_exists, Store};
use crate::error::{DbError, DbResult};
use crate::schema::{MEDIA, POST};

impl Store {
    pub fn create_media(&self, new_media: &NewMedia) -> DbResult<Media> {
        self.check_text(MEDIA, "url", Some(&new_media.url))?;

        let mut conn = self.pool.get()?;
        let tx = begin_write(&mut conn)?;

        ensure_exists(&tx, POST, MEDIA, "post_id", new_media.post_id)?;
        tx.execute(
            "INSERT INTO media (url, post_id) VALUES (?1, ?2)",
            params![new_media.url, new_media.post_id],
        )
        .map_err(|e| DbError::from_write(MEDIA, e))?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        tracing::debug!(media_id = id, post_id = new_media.post_id, "Attached media");
        Ok(Media {
            id,
            url: new_media.url.clone(),
            post_id: new_media.post_id,
        })
    }

    pub fn get_media(&self, id: i64) -> DbResult<Media> {
        let conn = self.pool.get()?;
        conn.query_row(
            &format!("SELECT {} FROM media WHERE id = ?1", Media::COLUMNS),
            params![id],
            Media::from_row,
        )
        .optional()?
        .ok_or_else(|| DbError::not_found(MEDIA, id))
    }

    pub fn media_for_post(&self, post_id: i64) -> DbResult<Vec<Media>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM media WHERE post_id = ?1 ORDER BY id",
            Media::COLUMNS
        ))?;
        let media = stmt
            .query_map(params![post_id], Media::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(media)
    }

    pub fn update_media(&self, media: &Media) -> DbResult<()> {
        self.check_text(MEDIA, "url", Some(&media.url))?;

        let mut conn = self.pool.get()?;
        let tx = begin_write(&mut conn)?;

        ensure_exists(&tx, POST, MEDIA, "post_id", media.post_id)?;
        let rows = tx
            .execute(
                "UPDATE media SET url = ?1, post_id = ?2 WHERE id = ?3",
                params![media.url, media.post_id, media.id],
            )
            .map_err(|e| DbError::from_write(MEDIA, e))?;
        if rows == 0 {
            return Err(DbError::not_found(MEDIA, media.id));
        }
        tx.commit()?;

        tracing::debug!(media_id = media.id, "Updated media");
        Ok(())
    }

    pub fn delete_media(&self, id: i64) -> DbResult<()> {
        let conn = self.pool.get()?;
        let rows = conn.execute("DELETE FROM media WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(DbError::not_found(MEDIA, id));
        }
        tracing::debug!(media_id = id, "Deleted media");
        Ok(())
    }
}
