//! SQLite database for graph metadata.
//!
//! Queries are free functions over a `SqliteConnection` so the same code runs
//! against a pooled connection for reads and inside a transaction for writes.

use std::path::Path;
use std::str::FromStr;

use sqlx::{
    sqlite::{
        SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
        SqliteRow,
    },
    pool::PoolConnection,
    Row, Sqlite, Transaction,
};
use uuid::Uuid;

use crate::error::{GraphError, Result};
use crate::models::{Cluster, Content, ContentValue, NodeKind, NodeRef, Reference};

/// SQLite database connection pool.
#[derive(Debug, Clone)]
pub(crate) struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection from a file path.
    pub async fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Connect from a `sqlite:` URL, e.g. `sqlite://graph.db` or `sqlite::memory:`.
    pub async fn connect(url: &str) -> Result<Self> {
        if url.trim_end_matches('/').ends_with(":memory:") {
            return Self::in_memory().await;
        }
        let options = SqliteConnectOptions::from_str(url)?;
        let path = options.get_filename().to_path_buf();
        Self::new(&path).await
    }

    /// Create an in-memory database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        // A single connection that never idles out: closing it drops the data
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>> {
        Ok(self.pool.acquire().await?)
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    /// Begin a transaction holding the write lock from its first statement.
    pub async fn begin_immediate(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn parse_uuid(row: &SqliteRow, column: &str) -> Result<Uuid> {
    let raw: String = row.try_get(column)?;
    Uuid::parse_str(&raw)
        .map_err(|e| GraphError::InvalidRecord(format!("{} {:?}: {}", column, raw, e)))
}

fn parse_node(row: &SqliteRow, kind_column: &str, id_column: &str) -> Result<NodeRef> {
    let kind: String = row.try_get(kind_column)?;
    let kind = NodeKind::parse(&kind)
        .ok_or_else(|| GraphError::InvalidRecord(format!("{} {:?}", kind_column, kind)))?;
    Ok(NodeRef::new(kind, parse_uuid(row, id_column)?))
}

fn cluster_from_row(row: &SqliteRow) -> Result<Cluster> {
    Ok(Cluster {
        id: parse_uuid(row, "id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        update_id: parse_uuid(row, "update_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn content_from_row(row: &SqliteRow) -> Result<Content> {
    Ok(Content {
        id: parse_uuid(row, "id")?,
        cluster_id: parse_uuid(row, "cluster_id")?,
        content_type: row.try_get("content_type")?,
        state: row.try_get("state")?,
        update_id: parse_uuid(row, "update_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn value_from_row(row: &SqliteRow) -> Result<ContentValue> {
    Ok(ContentValue {
        content_id: parse_uuid(row, "content_id")?,
        payload_key: row.try_get("payload_key")?,
        size: row.try_get("size")?,
        created_at: row.try_get("created_at")?,
    })
}

fn reference_from_row(row: &SqliteRow) -> Result<Reference> {
    Ok(Reference {
        id: parse_uuid(row, "id")?,
        source: parse_node(row, "source_kind", "source_id")?,
        target: parse_node(row, "target_kind", "target_id")?,
        group: row.try_get("group_name")?,
        delete_recursive: row.try_get::<i64, _>("delete_recursive")? != 0,
        created_at: row.try_get("created_at")?,
    })
}

fn ids_from_rows(rows: &[SqliteRow]) -> Result<Vec<Uuid>> {
    rows.iter().map(|r| parse_uuid(r, "id")).collect()
}

// Clusters

pub(crate) async fn insert_cluster(
    conn: &mut SqliteConnection,
    name: &str,
    description: &str,
) -> Result<Cluster> {
    let now = now();
    let cluster = Cluster {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: description.to_string(),
        update_id: Uuid::new_v4(),
        created_at: now,
        updated_at: now,
    };
    sqlx::query(
        r#"
        INSERT INTO clusters (id, name, description, update_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(cluster.id.to_string())
    .bind(&cluster.name)
    .bind(&cluster.description)
    .bind(cluster.update_id.to_string())
    .bind(cluster.created_at)
    .bind(cluster.updated_at)
    .execute(conn)
    .await?;
    Ok(cluster)
}

pub(crate) async fn get_cluster(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Cluster>> {
    let row = sqlx::query(
        r#"
        SELECT id, name, description, update_id, created_at, updated_at
        FROM clusters
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(conn)
    .await?;
    row.as_ref().map(cluster_from_row).transpose()
}

/// Write new field values and rotate the update token.
pub(crate) async fn save_cluster(conn: &mut SqliteConnection, cluster: &mut Cluster) -> Result<()> {
    cluster.update_id = Uuid::new_v4();
    cluster.updated_at = now();
    sqlx::query(
        r#"
        UPDATE clusters
        SET name = ?, description = ?, update_id = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&cluster.name)
    .bind(&cluster.description)
    .bind(cluster.update_id.to_string())
    .bind(cluster.updated_at)
    .bind(cluster.id.to_string())
    .execute(conn)
    .await?;
    Ok(())
}

pub(crate) async fn delete_cluster_row(conn: &mut SqliteConnection, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM clusters WHERE id = ?")
        .bind(id.to_string())
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

// Contents

pub(crate) async fn insert_content(
    conn: &mut SqliteConnection,
    cluster_id: Uuid,
    content_type: &str,
    state: &str,
) -> Result<Content> {
    let now = now();
    let content = Content {
        id: Uuid::new_v4(),
        cluster_id,
        content_type: content_type.to_string(),
        state: state.to_string(),
        update_id: Uuid::new_v4(),
        created_at: now,
        updated_at: now,
    };
    sqlx::query(
        r#"
        INSERT INTO contents (id, cluster_id, content_type, state, update_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(content.id.to_string())
    .bind(content.cluster_id.to_string())
    .bind(&content.content_type)
    .bind(&content.state)
    .bind(content.update_id.to_string())
    .bind(content.created_at)
    .bind(content.updated_at)
    .execute(conn)
    .await?;
    Ok(content)
}

pub(crate) async fn get_content(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Content>> {
    let row = sqlx::query(
        r#"
        SELECT id, cluster_id, content_type, state, update_id, created_at, updated_at
        FROM contents
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(conn)
    .await?;
    row.as_ref().map(content_from_row).transpose()
}

pub(crate) async fn list_contents(conn: &mut SqliteConnection, cluster_id: Uuid) -> Result<Vec<Content>> {
    let rows = sqlx::query(
        r#"
        SELECT id, cluster_id, content_type, state, update_id, created_at, updated_at
        FROM contents
        WHERE cluster_id = ?
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(cluster_id.to_string())
    .fetch_all(conn)
    .await?;
    rows.iter().map(content_from_row).collect()
}

pub(crate) async fn save_content(conn: &mut SqliteConnection, content: &mut Content) -> Result<()> {
    content.update_id = Uuid::new_v4();
    content.updated_at = now();
    sqlx::query(
        r#"
        UPDATE contents
        SET cluster_id = ?, content_type = ?, state = ?, update_id = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(content.cluster_id.to_string())
    .bind(&content.content_type)
    .bind(&content.state)
    .bind(content.update_id.to_string())
    .bind(content.updated_at)
    .bind(content.id.to_string())
    .execute(conn)
    .await?;
    Ok(())
}

pub(crate) async fn delete_content_row(conn: &mut SqliteConnection, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM contents WHERE id = ?")
        .bind(id.to_string())
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

// Values

pub(crate) async fn get_value(conn: &mut SqliteConnection, content_id: Uuid) -> Result<Option<ContentValue>> {
    let row = sqlx::query(
        r#"
        SELECT content_id, payload_key, size, created_at
        FROM content_values
        WHERE content_id = ?
        "#,
    )
    .bind(content_id.to_string())
    .fetch_optional(conn)
    .await?;
    row.as_ref().map(value_from_row).transpose()
}

pub(crate) async fn upsert_value(
    conn: &mut SqliteConnection,
    content_id: Uuid,
    payload_key: Option<&str>,
    size: i64,
) -> Result<ContentValue> {
    let value = ContentValue {
        content_id,
        payload_key: payload_key.map(str::to_string),
        size,
        created_at: now(),
    };
    sqlx::query(
        r#"
        INSERT INTO content_values (content_id, payload_key, size, created_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(content_id) DO UPDATE SET
            payload_key = excluded.payload_key,
            size = excluded.size,
            created_at = excluded.created_at
        "#,
    )
    .bind(value.content_id.to_string())
    .bind(value.payload_key.as_deref())
    .bind(value.size)
    .bind(value.created_at)
    .execute(conn)
    .await?;
    Ok(value)
}

pub(crate) async fn delete_value_row(conn: &mut SqliteConnection, content_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM content_values WHERE content_id = ?")
        .bind(content_id.to_string())
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

// References

pub(crate) async fn insert_reference(
    conn: &mut SqliteConnection,
    source: NodeRef,
    target: NodeRef,
    group: &str,
    delete_recursive: bool,
) -> Result<Reference> {
    let reference = Reference {
        id: Uuid::new_v4(),
        source,
        target,
        group: group.to_string(),
        delete_recursive,
        created_at: now(),
    };
    sqlx::query(
        r#"
        INSERT INTO graph_references
            (id, source_kind, source_id, target_kind, target_id, group_name, delete_recursive, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(reference.id.to_string())
    .bind(source.kind().as_str())
    .bind(source.id().to_string())
    .bind(target.kind().as_str())
    .bind(target.id().to_string())
    .bind(&reference.group)
    .bind(delete_recursive as i64)
    .bind(reference.created_at)
    .execute(conn)
    .await?;
    Ok(reference)
}

pub(crate) async fn get_reference(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Reference>> {
    let row = sqlx::query(
        r#"
        SELECT id, source_kind, source_id, target_kind, target_id, group_name, delete_recursive, created_at
        FROM graph_references
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(conn)
    .await?;
    row.as_ref().map(reference_from_row).transpose()
}

pub(crate) async fn references_to(conn: &mut SqliteConnection, target: NodeRef) -> Result<Vec<Reference>> {
    let rows = sqlx::query(
        r#"
        SELECT id, source_kind, source_id, target_kind, target_id, group_name, delete_recursive, created_at
        FROM graph_references
        WHERE target_kind = ? AND target_id = ?
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(target.kind().as_str())
    .bind(target.id().to_string())
    .fetch_all(conn)
    .await?;
    rows.iter().map(reference_from_row).collect()
}

pub(crate) async fn references_from(conn: &mut SqliteConnection, source: NodeRef) -> Result<Vec<Reference>> {
    let rows = sqlx::query(
        r#"
        SELECT id, source_kind, source_id, target_kind, target_id, group_name, delete_recursive, created_at
        FROM graph_references
        WHERE source_kind = ? AND source_id = ?
        ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(source.kind().as_str())
    .bind(source.id().to_string())
    .fetch_all(conn)
    .await?;
    rows.iter().map(reference_from_row).collect()
}

/// Delete every reference leaving `source`, returning their ids.
pub(crate) async fn delete_references_from(conn: &mut SqliteConnection, source: NodeRef) -> Result<Vec<Uuid>> {
    let rows = sqlx::query(
        r#"
        DELETE FROM graph_references
        WHERE source_kind = ? AND source_id = ?
        RETURNING id
        "#,
    )
    .bind(source.kind().as_str())
    .bind(source.id().to_string())
    .fetch_all(conn)
    .await?;
    ids_from_rows(&rows)
}

/// Delete the references into `target` flagged `delete_recursive`, returning their ids.
pub(crate) async fn delete_recursive_references_to(
    conn: &mut SqliteConnection,
    target: NodeRef,
) -> Result<Vec<Uuid>> {
    let rows = sqlx::query(
        r#"
        DELETE FROM graph_references
        WHERE target_kind = ? AND target_id = ? AND delete_recursive = 1
        RETURNING id
        "#,
    )
    .bind(target.kind().as_str())
    .bind(target.id().to_string())
    .fetch_all(conn)
    .await?;
    ids_from_rows(&rows)
}

pub(crate) async fn delete_reference_row(conn: &mut SqliteConnection, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM graph_references WHERE id = ?")
        .bind(id.to_string())
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
