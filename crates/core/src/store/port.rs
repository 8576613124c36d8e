use super::error::StoreError;
use crate::common::{FilterTag, SubscriberId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// # Summary
/// 订阅者实体，代表一个可以接收广播通知的会话。
///
/// # Invariants
/// - `id` 全局唯一。
/// - `filters` 为空表示不过滤 (接收全部类别)。
/// - `enabled == false` 的订阅者不会收到广播，但可以被重新订阅。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    // 会话标识
    pub id: SubscriberId,
    // 是否启用
    pub enabled: bool,
    // 订阅的类别集合
    pub filters: BTreeSet<FilterTag>,
    // 首次订阅时间
    pub created_at: DateTime<Utc>,
}

impl Subscriber {
    /// # Summary
    /// 构造一个新启用、未设置过滤的订阅者。
    pub fn new(id: SubscriberId) -> Self {
        Self {
            id,
            enabled: true,
            filters: BTreeSet::new(),
            created_at: Utc::now(),
        }
    }

    /// # Summary
    /// 判断该订阅者是否应收到指定类别的广播。
    ///
    /// # Logic
    /// 1. 未启用则直接排除。
    /// 2. 过滤集合为空，或包含该类别时匹配。
    /// 3. 类别为 `None` (不限类别的查询) 时，任何启用的订阅者都匹配。
    pub fn matches(&self, category: Option<FilterTag>) -> bool {
        if !self.enabled {
            return false;
        }
        match category {
            Some(tag) => self.filters.is_empty() || self.filters.contains(&tag),
            None => true,
        }
    }
}

/// # Summary
/// 订阅者存储接口，负责订阅记录的增删改查与按类别筛选。
///
/// # Invariants
/// - 同一 `id` 上的并发读改写不得互相覆盖不相交的字段 (至少保证单 id 的读写一致)。
/// - `update_filters` 对不存在的记录按需创建 (启用状态)。
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// # Summary
    /// 创建新的订阅者记录。
    ///
    /// # Arguments
    /// * `id`: 会话标识。
    ///
    /// # Returns
    /// 成功返回新建记录；已存在时返回 `StoreError::AlreadyExists`。
    async fn create(&self, id: SubscriberId) -> Result<Subscriber, StoreError>;

    /// # Summary
    /// 重新启用订阅者，过滤集合保持不变。
    ///
    /// # Returns
    /// 返回更新后的记录；不存在时返回 `StoreError::NotFound`。
    async fn enable(&self, id: SubscriberId) -> Result<Subscriber, StoreError>;

    /// # Summary
    /// 软删除：将订阅者置为未启用，记录保留。
    ///
    /// # Returns
    /// 返回更新后的记录；不存在时返回 `StoreError::NotFound`。
    async fn disable(&self, id: SubscriberId) -> Result<Subscriber, StoreError>;

    /// # Summary
    /// 硬删除订阅者记录。
    ///
    /// # Returns
    /// 返回被删除的记录；不存在时返回 `StoreError::NotFound`。
    async fn delete(&self, id: SubscriberId) -> Result<Subscriber, StoreError>;

    /// # Summary
    /// 按 id 查询订阅者。
    ///
    /// # Returns
    /// 存在返回记录，否则返回 `StoreError::NotFound`。
    async fn find(&self, id: SubscriberId) -> Result<Subscriber, StoreError>;

    /// # Summary
    /// 列出应接收某类别广播的订阅者。
    ///
    /// # Logic
    /// 1. 仅包含启用的订阅者。
    /// 2. `category` 为 `Some(tag)` 时，仅保留过滤集合为空或包含 `tag` 的记录。
    /// 3. `category` 为 `None` 时返回全部启用的订阅者。
    ///
    /// # Arguments
    /// * `category`: 广播类别。
    ///
    /// # Returns
    /// 匹配的订阅者列表。
    async fn list(&self, category: Option<FilterTag>) -> Result<Vec<Subscriber>, StoreError>;

    /// # Summary
    /// 替换订阅者的过滤集合。
    ///
    /// # Logic
    /// 1. `Some(tag)` 将集合替换为 `{tag}`，不做追加。
    /// 2. `None` 清空集合 (接收全部)。
    /// 3. 记录不存在时以启用状态创建。
    ///
    /// # Returns
    /// 返回更新后的记录。
    async fn update_filters(
        &self,
        id: SubscriberId,
        tag: Option<FilterTag>,
    ) -> Result<Subscriber, StoreError>;
}
