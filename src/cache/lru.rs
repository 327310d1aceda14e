use crate::cache::Cache;
use crate::util::collection::HashMap;
use std::collections::BTreeMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

// 缓存条目，tick 记录最近一次被访问的时刻
struct LRUEntry<V> {
    value: V,
    charge: usize,
    tick: u64,
}

// 包含一个哈希表和一个按访问时刻排序的索引
struct LRUInner<K, V> {
    table: HashMap<K, LRUEntry<V>>,
    // tick -> key，第一个元素是最久未使用的条目
    recency: BTreeMap<u64, K>,
    next_tick: u64,
}

impl<K: Hash + Eq + Clone, V> LRUInner<K, V> {
    // 把 key 标记为最近使用
    fn touch(&mut self, key: &K) {
        let tick = self.next_tick;
        if let Some(e) = self.table.get_mut(key) {
            self.recency.remove(&e.tick);
            e.tick = tick;
            self.recency.insert(tick, key.clone());
            self.next_tick += 1;
        }
    }

    // 淘汰最久未使用的条目，返回它的 charge
    fn evict_oldest(&mut self) -> Option<usize> {
        let oldest = *self.recency.keys().next()?;
        let key = self.recency.remove(&oldest)?;
        self.table.remove(&key).map(|e| e.charge)
    }
}

/// 基于 charge 的 LRU 缓存
///
/// 总 charge 超过 `capacity` 后淘汰最久未使用的条目，
/// 刚插入的条目不会被自己的插入淘汰
pub struct LRUCache<K, V: Clone> {
    // 缓存的容量
    capacity: usize,
    inner: Mutex<LRUInner<K, V>>,
    // 已分配的空间大小
    usage: AtomicUsize,
}

impl<K: Hash + Eq + Clone, V: Clone> LRUCache<K, V> {
    pub fn new(cap: usize) -> Self {
        Self {
            capacity: cap,
            inner: Mutex::new(LRUInner {
                table: HashMap::default(),
                recency: BTreeMap::new(),
                next_tick: 0,
            }),
            usage: AtomicUsize::new(0),
        }
    }

    /// 缓存中的条目数
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Cache<K, V> for LRUCache<K, V>
where
    K: Send + Sync + Hash + Eq + Clone,
    V: Send + Sync + Clone,
{
    fn insert(&self, key: K, value: V, charge: usize) -> Option<V> {
        // 容量为 0 表示关闭缓存
        if self.capacity == 0 {
            return None;
        }
        let mut guard = self.inner.lock().unwrap();
        let l = &mut *guard;
        let old = match l.table.get_mut(&key) {
            Some(e) => {
                let old_charge = std::mem::replace(&mut e.charge, charge);
                let old_value = std::mem::replace(&mut e.value, value);
                self.usage.fetch_sub(old_charge, Ordering::Relaxed);
                Some(old_value)
            }
            None => {
                let tick = l.next_tick;
                l.table.insert(
                    key.clone(),
                    LRUEntry {
                        value,
                        charge,
                        tick,
                    },
                );
                l.recency.insert(tick, key.clone());
                l.next_tick += 1;
                None
            }
        };
        l.touch(&key);
        self.usage.fetch_add(charge, Ordering::Relaxed);
        while self.usage.load(Ordering::Relaxed) > self.capacity && l.table.len() > 1 {
            match l.evict_oldest() {
                Some(c) => {
                    self.usage.fetch_sub(c, Ordering::Relaxed);
                }
                None => break,
            }
        }
        old
    }

    fn get(&self, key: &K) -> Option<V> {
        let mut l = self.inner.lock().unwrap();
        let value = l.table.get(key).map(|e| e.value.clone())?;
        l.touch(key);
        Some(value)
    }

    fn erase(&self, key: &K) {
        let mut l = self.inner.lock().unwrap();
        if let Some(e) = l.table.remove(key) {
            l.recency.remove(&e.tick);
            self.usage.fetch_sub(e.charge, Ordering::Relaxed);
        }
    }

    #[inline]
    fn total_charge(&self) -> usize {
        self.usage.load(Ordering::Acquire)
    }
}
