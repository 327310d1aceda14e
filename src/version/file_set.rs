use crate::db::format::InternalKeyComparator;
use crate::util::comparator::Comparator;
use crate::version::version_edit::FileMetaData;
use std::cmp::Ordering;
use std::sync::Arc;

/// level 0 的排序：最新的文件排在最前面。
///
/// 依次比较 smallest_seqno（降序）、largest_seqno（降序）、文件编号（降序）
pub fn newest_first_by_seq_no(a: &FileMetaData, b: &FileMetaData) -> Ordering {
    b.smallest_seqno
        .cmp(&a.smallest_seqno)
        .then_with(|| b.largest_seqno.cmp(&a.largest_seqno))
        .then_with(|| b.number.cmp(&a.number))
}

/// 非 level 0 的排序：按 smallest key 升序，相同时按文件编号升序
pub fn by_smallest_key<C: Comparator>(
    icmp: &InternalKeyComparator<C>,
    a: &FileMetaData,
    b: &FileMetaData,
) -> Ordering {
    icmp.compare_key(&a.smallest, &b.smallest)
        .then_with(|| a.number.cmp(&b.number))
}

/// 每个 level 中文件的排序方式，构造 level 时确定
#[derive(Clone)]
pub enum FileOrder<C: Comparator> {
    /// level 0
    NewestFirst,
    /// level > 0
    BySmallestKey(InternalKeyComparator<C>),
}

impl<C: Comparator> FileOrder<C> {
    pub fn for_level(level: usize, icmp: &InternalKeyComparator<C>) -> Self {
        if level == 0 {
            FileOrder::NewestFirst
        } else {
            FileOrder::BySmallestKey(icmp.clone())
        }
    }

    #[inline]
    pub fn compare(&self, a: &FileMetaData, b: &FileMetaData) -> Ordering {
        match self {
            FileOrder::NewestFirst => newest_first_by_seq_no(a, b),
            FileOrder::BySmallestKey(icmp) => by_smallest_key(icmp, a, b),
        }
    }

    /// `a` 是否严格排在 `b` 之前
    #[inline]
    pub fn precedes(&self, a: &FileMetaData, b: &FileMetaData) -> bool {
        self.compare(a, b) == Ordering::Less
    }
}

/// 按 `FileOrder` 排好序的文件集合
pub struct FileSet<C: Comparator> {
    order: FileOrder<C>,
    files: Vec<Arc<FileMetaData>>,
}

impl<C: Comparator> FileSet<C> {
    pub fn new(order: FileOrder<C>) -> Self {
        Self {
            order,
            files: vec![],
        }
    }

    /// 插入到有序位置。已经存在相等的文件时不插入，返回 false
    ///
    /// 排在末尾时直接追加。flush 和 compaction 产生的文件通常按顺序到达，
    /// 乱序插入需要移动后面的元素
    pub fn insert(&mut self, f: Arc<FileMetaData>) -> bool {
        let order = &self.order;
        let append = match self.files.last() {
            Some(last) => order.precedes(last, &f),
            None => true,
        };
        if append {
            self.files.push(f);
            return true;
        }
        match self.files.binary_search_by(|probe| order.compare(probe, &f)) {
            Ok(_) => false,
            Err(pos) => {
                self.files.insert(pos, f);
                true
            }
        }
    }

    #[inline]
    pub fn contains(&self, number: u64) -> bool {
        self.files.iter().any(|f| f.number == number)
    }

    #[inline]
    pub fn order(&self) -> &FileOrder<C> {
        &self.order
    }

    #[inline]
    pub fn as_slice(&self) -> &[Arc<FileMetaData>] {
        self.files.as_slice()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Arc<FileMetaData>> {
        self.files.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl<C: Comparator> AsRef<FileSet<C>> for FileSet<C> {
    fn as_ref(&self) -> &FileSet<C> {
        self
    }
}
