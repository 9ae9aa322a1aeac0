use crate::models::{MatchMethod, MatchResult};
use dashmap::DashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

type Slot = Arc<Mutex<Option<MatchResult>>>;

/// 缓存键: 规范化后的行文本 + 备选数量
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub text: String,
    pub max_alternatives: usize,
}

impl CacheKey {
    pub fn new(text: impl Into<String>, max_alternatives: usize) -> Self {
        Self {
            text: text.into(),
            max_alternatives,
        }
    }
}

/// 匹配结果缓存
///
/// 每个键一个槽位锁: 同键并发请求只有一个在计算, 其余等待后复用结果。
/// 失败结果 (`MatchMethod::Error`) 不写入且槽位被移除, 下一次请求会重新计算。
#[derive(Debug, Default)]
pub struct MatchCache {
    slots: DashMap<CacheKey, Slot>,
}

/// 获取槽位锁
///
/// rayon 工作线程不阻塞等待, 而是边等边执行池中其他任务:
/// 持锁方派出的并行任务可能正排在本线程的队列里。
fn lock_slot(slot: &Mutex<Option<MatchResult>>) -> MutexGuard<'_, Option<MatchResult>> {
    if rayon::current_thread_index().is_none() {
        return slot.lock().unwrap_or_else(PoisonError::into_inner);
    }
    loop {
        match slot.try_lock() {
            Ok(guard) => return guard,
            Err(TryLockError::Poisoned(e)) => return e.into_inner(),
            Err(TryLockError::WouldBlock) => {
                if !matches!(rayon::yield_now(), Some(rayon::Yield::Executed)) {
                    std::thread::yield_now();
                }
            }
        }
    }
}

impl MatchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取缓存或计算; 返回 (结果, 是否命中)
    pub fn get_or_compute<F>(&self, key: &CacheKey, compute: F) -> (MatchResult, bool)
    where
        F: FnOnce() -> MatchResult,
    {
        // 先取出槽位再加锁, 避免计算期间占住 DashMap 分片
        let slot: Slot = self
            .slots
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone();

        let mut guard = lock_slot(&slot);
        if let Some(cached) = guard.as_ref() {
            return (cached.clone(), true);
        }

        let result = compute();
        if result.method == MatchMethod::Error {
            self.slots.remove_if(key, |_, current| Arc::ptr_eq(current, &slot));
        } else {
            *guard = Some(result.clone());
            // 等待方拿到的可能是已被移除的槽位, 写回后重新挂上
            self.slots
                .entry(key.clone())
                .or_insert_with(|| Arc::clone(&slot));
        }
        (result, false)
    }

    pub fn get(&self, key: &CacheKey) -> Option<MatchResult> {
        let slot = self.slots.get(key)?.clone();
        let guard = lock_slot(&slot);
        guard.clone()
    }

    /// 已缓存的结果数 (不含计算中的槽位)
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|entry| {
                entry
                    .value()
                    .try_lock()
                    .map(|guard| guard.is_some())
                    .unwrap_or(false)
            })
            .count()
    }

    /// 槽位数 (含计算中的槽位)
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.slots.clear();
    }
}
