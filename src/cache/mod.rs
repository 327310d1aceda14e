pub mod lru;

use fxhash::FxHasher;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

/// `Cache` 是将 kv 映射的接口，线程安全。
/// 通过 charge 来实现容量控制：插入时为每个条目指定一个 charge，
/// 总 charge 超过容量后会自动淘汰旧的条目。
///
/// table cache 中 charge 固定为 1，容量即可缓存的表的个数
pub trait Cache<K, V>: Sync + Send
where
    K: Sync + Send,
    V: Sync + Send + Clone,
{
    /// 将键->值的映射插入到缓存中，并根据总缓存容量为其分配指定的 charge。
    /// 如果键已存在，返回旧值
    fn insert(&self, key: K, value: V, charge: usize) -> Option<V>;

    /// 根据键获取对应的值
    fn get(&self, key: &K) -> Option<V>;

    /// 删除一个键值对
    fn erase(&self, key: &K);

    /// 返回缓存中存储的所有元素的 charge 之和
    fn total_charge(&self) -> usize;
}

/// 分片缓存，每个分片是一个独立的缓存实例，通过哈希函数将键分配到不同的分片上，以减少并发访问的锁开销
pub struct ShardedCache<K, V, C>
where
    C: Cache<K, V>,
    K: Sync + Send,
    V: Sync + Send + Clone,
{
    shards: Arc<Vec<C>>,
    _k: PhantomData<K>,
    _v: PhantomData<V>,
}

impl<K, V, C> ShardedCache<K, V, C>
where
    C: Cache<K, V>,
    K: Sync + Send + Hash + Eq,
    V: Sync + Send + Clone,
{
    /// Create a new `ShardedCache` with given shards
    pub fn new(shards: Vec<C>) -> Self {
        assert!(!shards.is_empty(), "[cache] at least one shard is required");
        Self {
            shards: Arc::new(shards),
            _k: PhantomData,
            _v: PhantomData,
        }
    }

    fn find_shard(&self, k: &K) -> usize {
        let mut s = FxHasher::default();
        k.hash(&mut s);
        s.finish() as usize % self.shards.len()
    }
}

impl<K, V, C> Cache<K, V> for ShardedCache<K, V, C>
where
    C: Cache<K, V>,
    K: Sync + Send + Hash + Eq,
    V: Sync + Send + Clone,
{
    fn insert(&self, key: K, value: V, charge: usize) -> Option<V> {
        let idx = self.find_shard(&key);
        self.shards[idx].insert(key, value, charge)
    }

    fn get(&self, key: &K) -> Option<V> {
        let idx = self.find_shard(key);
        self.shards[idx].get(key)
    }

    fn erase(&self, key: &K) {
        let idx = self.find_shard(key);
        self.shards[idx].erase(key)
    }

    fn total_charge(&self) -> usize {
        self.shards.iter().fold(0, |acc, s| acc + s.total_charge())
    }
}
