use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use slotbot_core::common::{FilterTag, SubscriberId};
use slotbot_core::store::error::StoreError;
use slotbot_core::store::port::{Subscriber, SubscriberStore};

/// # Summary
/// 基于 DashMap 的内存订阅者存储。
///
/// # Invariants
/// - 单 id 的读改写在 DashMap 分片锁内完成，并发修改同一记录不会丢失更新。
/// - 进程退出即丢失，适用于测试与无持久化部署。
pub struct MemorySubscriberStore {
    // 订阅者表
    subscribers: DashMap<SubscriberId, Subscriber>,
}

impl MemorySubscriberStore {
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
        }
    }

    /// 当前记录数 (含未启用的订阅者)。
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// 对已存在的记录执行原地修改。
    fn modify<F>(&self, id: SubscriberId, f: F) -> Result<Subscriber, StoreError>
    where
        F: FnOnce(&mut Subscriber),
    {
        let mut entry = self
            .subscribers
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;
        f(entry.value_mut());
        Ok(entry.value().clone())
    }
}

impl Default for MemorySubscriberStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriberStore for MemorySubscriberStore {
    async fn create(&self, id: SubscriberId) -> Result<Subscriber, StoreError> {
        match self.subscribers.entry(id) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(id)),
            Entry::Vacant(vacant) => Ok(vacant.insert(Subscriber::new(id)).value().clone()),
        }
    }

    async fn enable(&self, id: SubscriberId) -> Result<Subscriber, StoreError> {
        self.modify(id, |s| s.enabled = true)
    }

    async fn disable(&self, id: SubscriberId) -> Result<Subscriber, StoreError> {
        self.modify(id, |s| s.enabled = false)
    }

    async fn delete(&self, id: SubscriberId) -> Result<Subscriber, StoreError> {
        self.subscribers
            .remove(&id)
            .map(|(_, s)| s)
            .ok_or(StoreError::NotFound(id))
    }

    async fn find(&self, id: SubscriberId) -> Result<Subscriber, StoreError> {
        self.subscribers
            .get(&id)
            .map(|s| s.value().clone())
            .ok_or(StoreError::NotFound(id))
    }

    /// # Summary
    /// 遍历全部记录并按 `Subscriber::matches` 筛选，结果按 id 升序。
    async fn list(&self, category: Option<FilterTag>) -> Result<Vec<Subscriber>, StoreError> {
        let mut matched: Vec<Subscriber> = self
            .subscribers
            .iter()
            .filter(|s| s.value().matches(category))
            .map(|s| s.value().clone())
            .collect();
        matched.sort_by_key(|s| s.id);
        Ok(matched)
    }

    async fn update_filters(
        &self,
        id: SubscriberId,
        tag: Option<FilterTag>,
    ) -> Result<Subscriber, StoreError> {
        let mut entry = self
            .subscribers
            .entry(id)
            .or_insert_with(|| Subscriber::new(id));
        let subscriber = entry.value_mut();
        subscriber.filters.clear();
        subscriber.filters.extend(tag);
        Ok(subscriber.clone())
    }
}
