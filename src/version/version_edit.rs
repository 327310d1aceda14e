use crate::db::format::InternalKey;
use crate::table_cache::{TableHandle, TableReader};
use crate::util::collection::HashSet;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, RwLock};

// 已解析的 table 句柄以及从句柄得到的 reader
struct TableSlot {
    handle: TableHandle,
    reader: Arc<dyn TableReader>,
}

/// 代表一个 level 中的 sst 文件，创建后除 table 句柄外不会更改。
///
/// 文件被 `Arc` 共享：base version、target version 和 `VersionBuilder`
/// 各自持有一份引用，引用计数就是 `Arc::strong_count`。
/// 最后一个引用释放时，已加载的 table 句柄随之归还给 table cache。
#[derive(Default)]
pub struct FileMetaData {
    // 文件编号，在整个 DB 的生命周期内唯一
    pub number: u64,
    // 文件大小
    pub file_size: u64,
    // 最小 InternalKey
    pub smallest: InternalKey,
    // 最大 InternalKey
    pub largest: InternalKey,
    // 文件中 entry 的最小序列号
    pub smallest_seqno: u64,
    // 文件中 entry 的最大序列号
    pub largest_seqno: u64,

    table: RwLock<Option<TableSlot>>,
}

impl FileMetaData {
    pub fn new(
        number: u64,
        file_size: u64,
        smallest: InternalKey,
        largest: InternalKey,
        smallest_seqno: u64,
        largest_seqno: u64,
    ) -> Self {
        Self {
            number,
            file_size,
            smallest,
            largest,
            smallest_seqno,
            largest_seqno,
            table: RwLock::new(None),
        }
    }

    /// 是否已经加载了 table 句柄
    #[inline]
    pub fn has_table_handle(&self) -> bool {
        self.table.read().unwrap().is_some()
    }

    /// 返回已加载的 table reader
    pub fn table_reader(&self) -> Option<Arc<dyn TableReader>> {
        self.table
            .read()
            .unwrap()
            .as_ref()
            .map(|slot| slot.reader.clone())
    }

    /// 保存从 table cache 得到的句柄。
    /// 已经存在句柄时保留旧的，新句柄被丢弃（随即归还给 cache），返回 false
    pub(crate) fn set_table_handle(&self, handle: TableHandle, reader: Arc<dyn TableReader>) -> bool {
        let mut table = self.table.write().unwrap();
        if table.is_some() {
            return false;
        }
        *table = Some(TableSlot { handle, reader });
        true
    }

    /// 当前持有的句柄对应的文件编号
    pub fn table_handle_number(&self) -> Option<u64> {
        self.table
            .read()
            .unwrap()
            .as_ref()
            .map(|slot| slot.handle.number())
    }
}

// 复制出来的文件不带 table 句柄，句柄只属于最初加载它的那份元数据
impl Clone for FileMetaData {
    fn clone(&self) -> Self {
        Self::new(
            self.number,
            self.file_size,
            self.smallest.clone(),
            self.largest.clone(),
            self.smallest_seqno,
            self.largest_seqno,
        )
    }
}

impl PartialEq for FileMetaData {
    fn eq(&self, other: &FileMetaData) -> bool {
        self.file_size == other.file_size
            && self.number == other.number
            && self.smallest == other.smallest
            && self.largest == other.largest
            && self.smallest_seqno == other.smallest_seqno
            && self.largest_seqno == other.largest_seqno
    }
}
impl Eq for FileMetaData {}

impl Debug for FileMetaData {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "#{} {}bytes keys: [{:?}, {:?}] seqs: [{}, {}]",
            self.number,
            self.file_size,
            self.smallest,
            self.largest,
            self.smallest_seqno,
            self.largest_seqno
        )?;
        if self.has_table_handle() {
            write!(f, " (loaded)")?;
        }
        Ok(())
    }
}

/// 版本之间文件变化的信息
#[derive(Default, Debug)]
pub struct FileDelta {
    // 被删除文件集 (level, file_number)
    pub deleted_files: HashSet<(usize, u64)>,
    // 新添加的文件数组 (level, FileMetaData)
    pub new_files: Vec<(usize, FileMetaData)>,
}

/// version 更新总结
/// version（旧） + 版本编辑 = version（新）
///
/// manifest 中的编码不在这里处理，这里只保留 `VersionBuilder` 需要的文件变化
#[derive(Default)]
pub struct VersionEdit {
    pub file_delta: FileDelta,
}

impl VersionEdit {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.file_delta.deleted_files.clear();
        self.file_delta.new_files.clear();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.file_delta.deleted_files.is_empty() && self.file_delta.new_files.is_empty()
    }

    /// Add the specified file at the specified level
    #[allow(clippy::too_many_arguments)]
    pub fn add_file(
        &mut self,
        level: usize,
        file_number: u64,
        file_size: u64,
        smallest: InternalKey,
        largest: InternalKey,
        smallest_seqno: u64,
        largest_seqno: u64,
    ) {
        self.file_delta.new_files.push((
            level,
            FileMetaData::new(
                file_number,
                file_size,
                smallest,
                largest,
                smallest_seqno,
                largest_seqno,
            ),
        ))
    }

    /// Delete the specified file from the specified level
    #[inline]
    pub fn delete_file(&mut self, level: usize, file_number: u64) {
        self.file_delta.deleted_files.insert((level, file_number));
    }

    /// 按 (level, number) 排序后的删除列表，保证 apply 的顺序可重现
    pub fn deleted_files(&self) -> Vec<(usize, u64)> {
        let mut deleted = self
            .file_delta
            .deleted_files
            .iter()
            .copied()
            .collect::<Vec<_>>();
        deleted.sort_unstable();
        deleted
    }

    #[inline]
    pub fn new_files(&self) -> &[(usize, FileMetaData)] {
        self.file_delta.new_files.as_slice()
    }
}

impl Debug for VersionEdit {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "VersionEdit {{")?;
        for (level, file_num) in self.deleted_files() {
            write!(f, "\n  DeleteFile: @{} #{}", level, file_num)?;
        }
        for (level, meta) in self.file_delta.new_files.iter() {
            write!(f, "\n  AddFile: @{} {:?}", level, meta)?;
        }
        write!(f, "\n}}\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::format::ValueType;

    fn new_edit() -> VersionEdit {
        let mut edit = VersionEdit::new();
        let k_big = 1u64 << 50;
        for i in 0..4 {
            edit.add_file(
                3,
                k_big + 300 + i,
                k_big + 400 + i,
                InternalKey::new("foo".as_bytes(), k_big + 500 + i, ValueType::Value),
                InternalKey::new("zoo".as_bytes(), k_big + 700 + i, ValueType::Deletion),
                k_big + 500 + i,
                k_big + 700 + i,
            );
            edit.delete_file(4, k_big + 700 + i);
        }
        edit
    }

    #[test]
    fn test_add_and_delete() {
        let edit = new_edit();
        assert!(!edit.is_empty());
        assert_eq!(4, edit.new_files().len());
        let deleted = edit.deleted_files();
        assert_eq!(4, deleted.len());
        // sorted by (level, number)
        assert!(deleted.windows(2).all(|w| w[0] < w[1]));
        for (level, f) in edit.new_files() {
            assert_eq!(3, *level);
            assert_eq!(f.smallest.seq(), f.smallest_seqno);
            assert_eq!(f.largest.seq(), f.largest_seqno);
        }
    }

    #[test]
    fn test_delete_same_file_twice() {
        let mut edit = VersionEdit::new();
        edit.delete_file(1, 10);
        edit.delete_file(1, 10);
        edit.delete_file(2, 10);
        assert_eq!(vec![(1, 10), (2, 10)], edit.deleted_files());
    }

    #[test]
    fn test_clear() {
        let mut edit = new_edit();
        edit.clear();
        assert!(edit.is_empty());
        assert_eq!("VersionEdit {\n}\n", format!("{:?}", edit));
    }

    #[test]
    fn test_clone_drops_table_handle() {
        let f = FileMetaData::new(
            7,
            1024,
            InternalKey::new(b"a", 1, ValueType::Value),
            InternalKey::new(b"b", 2, ValueType::Value),
            1,
            2,
        );
        let copy = f.clone();
        assert_eq!(f, copy);
        assert!(!copy.has_table_handle());
        assert!(copy.table_reader().is_none());
        assert_eq!(None, copy.table_handle_number());
    }
}
