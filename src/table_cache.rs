use crate::cache::lru::LRUCache;
use crate::cache::{Cache, ShardedCache};
use crate::db::filename::table_file_name;
use crate::db::format::InternalKeyComparator;
use crate::util::collection::HashMap;
use crate::util::comparator::Comparator;
use crate::{Error, Result};
use std::fmt::{Debug, Formatter};
use std::fs::File;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

const TABLE_CACHE_SHARDS: usize = 16;

/// 已打开的 SST 文件
pub trait TableReader: Send + Sync {
    /// 对应的文件编号
    fn file_number(&self) -> u64;

    /// 文件大小
    fn file_size(&self) -> u64;
}

/// 句柄的持有者。句柄被 drop 时通过它归还
///
/// 对同一个编号重复 `release`、或者 `release` 一个不认识的编号都必须是安全的
pub trait ReleaseHandle: Send + Sync {
    fn release(&self, number: u64);
}

/// table cache 发出的句柄，drop 时自动归还给发出它的 cache
pub struct TableHandle {
    number: u64,
    reader: Arc<dyn TableReader>,
    owner: Arc<dyn ReleaseHandle>,
}

impl TableHandle {
    pub fn new(number: u64, reader: Arc<dyn TableReader>, owner: Arc<dyn ReleaseHandle>) -> Self {
        Self {
            number,
            reader,
            owner,
        }
    }

    #[inline]
    pub fn number(&self) -> u64 {
        self.number
    }

    #[inline]
    pub fn reader(&self) -> Arc<dyn TableReader> {
        self.reader.clone()
    }
}

impl Drop for TableHandle {
    fn drop(&mut self) {
        self.owner.release(self.number);
    }
}

impl Debug for TableHandle {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "TableHandle #{}", self.number)
    }
}

/// 根据文件编号得到 table 句柄
pub trait TableCache<C: Comparator>: Send + Sync {
    /// 文件不存在时返回 `Ok(None)`，IO 等其他失败返回错误
    fn find_table(
        &self,
        icmp: &InternalKeyComparator<C>,
        number: u64,
        file_size: u64,
    ) -> Result<Option<TableHandle>>;

    /// 从句柄得到 reader
    fn reader_from(&self, handle: &TableHandle) -> Arc<dyn TableReader> {
        handle.reader()
    }
}

/// 真正打开 SST 文件的地方，`LRUTableCache` 未命中时调用。
/// 文件不存在时应返回 `Error::NotFound`
pub trait TableOpener<C: Comparator>: Send + Sync {
    fn open(
        &self,
        icmp: &InternalKeyComparator<C>,
        number: u64,
        file_size: u64,
    ) -> Result<Arc<dyn TableReader>>;
}

// 被 cache 和所有未归还的句柄共享
struct HandleTable {
    readers: ShardedCache<u64, Arc<dyn TableReader>, LRUCache<u64, Arc<dyn TableReader>>>,
    // 文件编号 -> 未归还的句柄数
    pinned: Mutex<HashMap<u64, usize>>,
}

impl ReleaseHandle for HandleTable {
    fn release(&self, number: u64) {
        let mut pinned = self.pinned.lock().unwrap();
        match pinned.get_mut(&number) {
            Some(refs) if *refs > 1 => *refs -= 1,
            Some(_) => {
                pinned.remove(&number);
            }
            None => debug!("Release table #{} which has no outstanding handle", number),
        }
    }
}

/// 以文件编号为 key，用 LRU 缓存已经打开的 reader
pub struct LRUTableCache<O> {
    opener: O,
    inner: Arc<HandleTable>,
}

impl<O> LRUTableCache<O> {
    pub fn new(opener: O, capacity: usize) -> Self {
        let per_shard = (capacity + TABLE_CACHE_SHARDS - 1) / TABLE_CACHE_SHARDS;
        let shards = (0..TABLE_CACHE_SHARDS)
            .map(|_| LRUCache::new(per_shard))
            .collect();
        Self {
            opener,
            inner: Arc::new(HandleTable {
                readers: ShardedCache::new(shards),
                pinned: Mutex::new(HashMap::default()),
            }),
        }
    }

    /// 删除缓存的 reader，文件被 compaction 删除后调用。
    /// 已经发出的句柄仍然持有自己的 reader
    pub fn evict(&self, number: u64) {
        self.inner.readers.erase(&number);
    }

    /// 编号为 `number` 的文件未归还的句柄数
    pub fn pinned(&self, number: u64) -> usize {
        self.inner
            .pinned
            .lock()
            .unwrap()
            .get(&number)
            .copied()
            .unwrap_or(0)
    }

    /// 所有未归还的句柄数
    pub fn outstanding_handles(&self) -> usize {
        self.inner.pinned.lock().unwrap().values().sum()
    }

    /// 缓存中 reader 的个数
    pub fn cached_tables(&self) -> usize {
        self.inner.readers.total_charge()
    }

    // 发出一个句柄并记录
    fn pin(&self, number: u64, reader: Arc<dyn TableReader>) -> TableHandle {
        *self.inner.pinned.lock().unwrap().entry(number).or_insert(0) += 1;
        TableHandle::new(number, reader, self.inner.clone())
    }
}

impl<C: Comparator, O: TableOpener<C>> TableCache<C> for LRUTableCache<O> {
    fn find_table(
        &self,
        icmp: &InternalKeyComparator<C>,
        number: u64,
        file_size: u64,
    ) -> Result<Option<TableHandle>> {
        if let Some(reader) = self.inner.readers.get(&number) {
            return Ok(Some(self.pin(number, reader)));
        }
        let reader = match self.opener.open(icmp, number, file_size) {
            Ok(r) => r,
            Err(Error::NotFound(hint)) => {
                debug!("Table #{} not found: {:?}", number, hint);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        self.inner.readers.insert(number, reader.clone(), 1);
        Ok(Some(self.pin(number, reader)))
    }
}

/// 打开目录下的 SST 文件
pub struct FileTable {
    number: u64,
    file_size: u64,
    // 保持文件打开，直到 reader 被释放
    #[allow(dead_code)]
    file: File,
}

impl TableReader for FileTable {
    #[inline]
    fn file_number(&self) -> u64 {
        self.number
    }

    #[inline]
    fn file_size(&self) -> u64 {
        self.file_size
    }
}

/// 从 `<dir>/<number>.sst` 打开文件的 `TableOpener`
pub struct FileTableOpener {
    dir: PathBuf,
}

impl FileTableOpener {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }
}

impl<C: Comparator> TableOpener<C> for FileTableOpener {
    fn open(
        &self,
        _icmp: &InternalKeyComparator<C>,
        number: u64,
        file_size: u64,
    ) -> Result<Arc<dyn TableReader>> {
        let path = table_file_name(&self.dir, number);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::NotFound(Some(path.display().to_string())))
            }
            Err(e) => return Err(Error::IO(e)),
        };
        let actual = file.metadata()?.len();
        if actual != file_size {
            return Err(Error::Corruption(format!(
                "table #{} size mismatch: expect {} bytes but {} on disk",
                number, file_size, actual
            )));
        }
        Ok(Arc::new(FileTable {
            number,
            file_size,
            file,
        }))
    }
}
