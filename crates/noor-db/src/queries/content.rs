use anyhow::Result;
use rusqlite::Row;

use noor_types::models::ContentType;

use crate::Database;
use crate::models::{AnnotationRow, BroadcastRow, SharedAssetRow};

/// Column values for a new shared asset.
#[derive(Debug, Clone)]
pub struct NewSharedAsset<'a> {
    pub share_id: &'a str,
    pub session_id: i64,
    pub asset_type: &'a str,
    pub selector: Option<&'a str>,
    pub content: Option<&'a str>,
    pub metadata: Option<&'a str>,
}

impl Database {
    // -- Shared assets --

    pub fn insert_shared_asset(&self, asset: &NewSharedAsset<'_>) -> Result<SharedAssetRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO shared_assets (share_id, session_id, asset_type, selector, content, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    asset.share_id,
                    asset.session_id,
                    asset.asset_type,
                    asset.selector,
                    asset.content,
                    asset.metadata
                ],
            )?;
            let row = conn.query_row(
                "SELECT id, share_id, session_id, asset_type, selector, content, metadata, created_at
                 FROM shared_assets WHERE id = ?1",
                [conn.last_insert_rowid()],
                map_asset,
            )?;
            Ok(row)
        })
    }

    /// Soft delete, scoped to the owning session. Returns false if nothing matched.
    pub fn soft_delete_asset(&self, session_id: i64, share_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE shared_assets SET is_deleted = 1
                 WHERE session_id = ?1 AND share_id = ?2 AND is_deleted = 0",
                rusqlite::params![session_id, share_id],
            )?;
            Ok(changed == 1)
        })
    }

    pub fn list_shared_assets(&self, session_id: i64) -> Result<Vec<SharedAssetRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, share_id, session_id, asset_type, selector, content, metadata, created_at
                 FROM shared_assets
                 WHERE session_id = ?1 AND is_deleted = 0
                 ORDER BY id",
            )?;
            let rows = stmt
                .query_map([session_id], map_asset)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Annotations --

    pub fn insert_annotation(&self, session_id: i64, created_by: &str, data: &str) -> Result<AnnotationRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO annotations (session_id, created_by, data) VALUES (?1, ?2, ?3)",
                rusqlite::params![session_id, created_by, data],
            )?;
            let row = conn.query_row(
                "SELECT id, session_id, created_by, data, created_at FROM annotations WHERE id = ?1",
                [conn.last_insert_rowid()],
                map_annotation,
            )?;
            Ok(row)
        })
    }

    pub fn soft_delete_annotation(&self, session_id: i64, annotation_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE annotations SET is_deleted = 1
                 WHERE session_id = ?1 AND id = ?2 AND is_deleted = 0",
                rusqlite::params![session_id, annotation_id],
            )?;
            Ok(changed == 1)
        })
    }

    pub fn list_annotations(&self, session_id: i64) -> Result<Vec<AnnotationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, created_by, data, created_at
                 FROM annotations
                 WHERE session_id = ?1 AND is_deleted = 0
                 ORDER BY id",
            )?;
            let rows = stmt
                .query_map([session_id], map_annotation)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Content broadcasts --

    pub fn insert_broadcast(
        &self,
        session_id: i64,
        content_type: ContentType,
        content: &str,
    ) -> Result<BroadcastRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO content_broadcasts (session_id, content_type, content) VALUES (?1, ?2, ?3)",
                rusqlite::params![session_id, content_type.as_str(), content],
            )?;
            let row = conn.query_row(
                "SELECT id, session_id, content_type, content, created_at
                 FROM content_broadcasts WHERE id = ?1",
                [conn.last_insert_rowid()],
                map_broadcast,
            )?;
            Ok(row)
        })
    }

    /// Broadcasts of one session in insertion order.
    pub fn list_broadcasts(&self, session_id: i64) -> Result<Vec<BroadcastRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, content_type, content, created_at
                 FROM content_broadcasts
                 WHERE session_id = ?1
                 ORDER BY id",
            )?;
            let rows = stmt
                .query_map([session_id], map_broadcast)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_asset(row: &Row<'_>) -> rusqlite::Result<SharedAssetRow> {
    Ok(SharedAssetRow {
        id: row.get(0)?,
        share_id: row.get(1)?,
        session_id: row.get(2)?,
        asset_type: row.get(3)?,
        selector: row.get(4)?,
        content: row.get(5)?,
        metadata: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn map_annotation(row: &Row<'_>) -> rusqlite::Result<AnnotationRow> {
    Ok(AnnotationRow {
        id: row.get(0)?,
        session_id: row.get(1)?,
        created_by: row.get(2)?,
        data: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn map_broadcast(row: &Row<'_>) -> rusqlite::Result<BroadcastRow> {
    Ok(BroadcastRow {
        id: row.get(0)?,
        session_id: row.get(1)?,
        content_type: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}
