use async_trait::async_trait;
use chrono::{DateTime, Utc};
use slotbot_core::common::{FilterTag, SubscriberId};
use slotbot_core::store::error::StoreError;
use slotbot_core::store::port::{Subscriber, SubscriberStore};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// 默认订阅者数据库文件名
const DEFAULT_SUBSCRIBER_DB: &str = "subscribers.db";

/// 并发写入时等待锁释放的最长时间
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// 查询返回的原始行：(id, enabled, filters JSON, created_at)
type SubscriberRow = (i64, bool, String, DateTime<Utc>);

/// SubscriberStore 的 SQLite 实现。
///
/// # Summary
/// 在 `subscribers.db` 中保存订阅者记录，过滤集合以 JSON 数组形式存放在 `filters` 列。
///
/// # Invariants
/// * 数据库结构在存储实例创建时初始化。
/// * 所有写操作都是单条语句 (UPSERT / UPDATE ... RETURNING)，同一 id 的并发读改写不会丢失更新。
pub struct SqliteSubscriberStore {
    pool: SqlitePool,
}

impl SqliteSubscriberStore {
    /// 在配置的数据根目录下打开订阅者数据库。
    ///
    /// # Logic
    /// 1. 获取配置的数据根目录并确保其存在。
    /// 2. 委托 `open` 完成连接与建表。
    pub async fn new() -> Result<Self, StoreError> {
        let root = crate::config::get_root_dir();
        fs::create_dir_all(&root).map_err(|e| StoreError::InitError(e.to_string()))?;
        Self::open(&root.join(DEFAULT_SUBSCRIBER_DB)).await
    }

    /// 打开 (必要时创建) 指定路径的订阅者数据库。
    ///
    /// # Logic
    /// 1. 配置 SQLite 连接选项：`create_if_missing`、WAL 日志模式、busy timeout。
    /// 2. 建立连接池并执行 DDL。
    ///
    /// # Arguments
    /// * `db_path` - 数据库文件路径。
    ///
    /// # Returns
    /// * `Result<Self, StoreError>` - 存储实例或初始化错误。
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| StoreError::InitError(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS subscribers (
                id INTEGER PRIMARY KEY,
                enabled INTEGER NOT NULL,
                filters TEXT NOT NULL DEFAULT '[]',
                created_at DATETIME NOT NULL
            );
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| StoreError::InitError(e.to_string()))?;

        debug!("Subscriber store opened at {}", db_path.display());
        Ok(Self { pool })
    }
}

/// 将数据库行还原为领域实体。
fn to_subscriber(row: SubscriberRow) -> Result<Subscriber, StoreError> {
    let filters: BTreeSet<FilterTag> = serde_json::from_str(&row.2)
        .map_err(|e| StoreError::Corrupted(format!("filters of {}: {}", row.0, e)))?;
    Ok(Subscriber {
        id: SubscriberId(row.0),
        enabled: row.1,
        filters,
        created_at: row.3,
    })
}

fn encode_filters(filters: &BTreeSet<FilterTag>) -> Result<String, StoreError> {
    serde_json::to_string(filters).map_err(|e| StoreError::Corrupted(e.to_string()))
}

#[async_trait]
impl SubscriberStore for SqliteSubscriberStore {
    /// # Summary
    /// 插入新的订阅者。
    ///
    /// # Logic
    /// 执行 `INSERT OR IGNORE`，受影响行数为 0 说明记录已存在。
    async fn create(&self, id: SubscriberId) -> Result<Subscriber, StoreError> {
        let subscriber = Subscriber::new(id);
        let result = sqlx::query(
            "INSERT OR IGNORE INTO subscribers (id, enabled, filters, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(id.0)
        .bind(subscriber.enabled)
        .bind(encode_filters(&subscriber.filters)?)
        .bind(subscriber.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists(id));
        }
        Ok(subscriber)
    }

    async fn enable(&self, id: SubscriberId) -> Result<Subscriber, StoreError> {
        sqlx::query_as::<_, SubscriberRow>(
            "UPDATE subscribers SET enabled = 1 WHERE id = ? RETURNING id, enabled, filters, created_at",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?
        .map(to_subscriber)
        .transpose()?
        .ok_or(StoreError::NotFound(id))
    }

    async fn disable(&self, id: SubscriberId) -> Result<Subscriber, StoreError> {
        sqlx::query_as::<_, SubscriberRow>(
            "UPDATE subscribers SET enabled = 0 WHERE id = ? RETURNING id, enabled, filters, created_at",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?
        .map(to_subscriber)
        .transpose()?
        .ok_or(StoreError::NotFound(id))
    }

    async fn delete(&self, id: SubscriberId) -> Result<Subscriber, StoreError> {
        sqlx::query_as::<_, SubscriberRow>(
            "DELETE FROM subscribers WHERE id = ? RETURNING id, enabled, filters, created_at",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?
        .map(to_subscriber)
        .transpose()?
        .ok_or(StoreError::NotFound(id))
    }

    async fn find(&self, id: SubscriberId) -> Result<Subscriber, StoreError> {
        sqlx::query_as::<_, SubscriberRow>(
            "SELECT id, enabled, filters, created_at FROM subscribers WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?
        .map(to_subscriber)
        .transpose()?
        .ok_or(StoreError::NotFound(id))
    }

    /// # Summary
    /// 列出应接收某类别广播的启用订阅者。
    ///
    /// # Logic
    /// 通过 `json_each` 展开过滤数组：类别为空、过滤数组为空或数组包含该类别的记录被选中。
    async fn list(&self, category: Option<FilterTag>) -> Result<Vec<Subscriber>, StoreError> {
        let tag = category.map(|t| t.to_string());
        sqlx::query_as::<_, SubscriberRow>(
            r#"
            SELECT id, enabled, filters, created_at FROM subscribers
            WHERE enabled = 1
              AND (?1 IS NULL
                   OR json_array_length(filters) = 0
                   OR EXISTS (SELECT 1 FROM json_each(subscribers.filters) WHERE json_each.value = ?1))
            ORDER BY id
            "#,
        )
        .bind(tag)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?
        .into_iter()
        .map(to_subscriber)
        .collect()
    }

    /// # Summary
    /// 替换过滤集合，记录不存在时以启用状态创建。
    ///
    /// # Logic
    /// 单条 UPSERT：冲突时只覆盖 `filters` 列，`enabled` 与 `created_at` 保持不变。
    async fn update_filters(
        &self,
        id: SubscriberId,
        tag: Option<FilterTag>,
    ) -> Result<Subscriber, StoreError> {
        let filters: BTreeSet<FilterTag> = tag.into_iter().collect();
        sqlx::query_as::<_, SubscriberRow>(
            r#"
            INSERT INTO subscribers (id, enabled, filters, created_at) VALUES (?, 1, ?, ?)
            ON CONFLICT(id) DO UPDATE SET filters = excluded.filters
            RETURNING id, enabled, filters, created_at
            "#,
        )
        .bind(id.0)
        .bind(encode_filters(&filters)?)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))
        .and_then(to_subscriber)
    }
}
