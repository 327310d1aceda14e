use crate::table_cache::TableCache;
use crate::util::collection::HashSet;
use crate::util::comparator::Comparator;
use crate::version::consistency;
use crate::version::version_edit::{FileMetaData, VersionEdit};
use crate::version::{FileOrder, FileSet, VersionStorageInfo};
use crate::Error;
use std::sync::Arc;

// 某个层级中被删除和新增的文件信息
pub struct LevelDelta<C: Comparator> {
    // set of deleted file numbers
    deleted_files: HashSet<u64>,
    // all added files, kept in the level's order
    added_files: FileSet<C>,
}

impl<C: Comparator> LevelDelta<C> {
    fn new(order: FileOrder<C>) -> Self {
        Self {
            deleted_files: HashSet::default(),
            added_files: FileSet::new(order),
        }
    }
}

impl<C: Comparator> AsRef<FileSet<C>> for LevelDelta<C> {
    fn as_ref(&self) -> &FileSet<C> {
        &self.added_files
    }
}

/// 汇总一个或多个 `VersionEdit` 的结果，再与 base 合并得到新的 version。
///
/// base 是对现有 version 的不可变引用，builder 存活期间 base 不能被修改。
/// 新增的文件由 builder 持有一份 `Arc` 引用，builder 被 drop 时释放
pub struct VersionBuilder<'a, C: Comparator + 'static> {
    // 每个 level 维护一个 delta，跟踪即将从该层级中移除和添加的文件
    levels: Vec<LevelDelta<C>>,
    base: &'a VersionStorageInfo<C>,
    table_cache: Option<Arc<dyn TableCache<C>>>,
}

impl<'a, C: Comparator + 'static> VersionBuilder<'a, C> {
    pub fn new(
        base: &'a VersionStorageInfo<C>,
        table_cache: Option<Arc<dyn TableCache<C>>>,
    ) -> Self {
        let levels = (0..base.num_levels())
            .map(|level| LevelDelta::new(base.file_order(level)))
            .collect();
        Self {
            levels,
            base,
            table_cache,
        }
    }

    #[inline]
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// level 中尚未合并的新增文件
    #[inline]
    pub fn added_files(&self, level: usize) -> &[Arc<FileMetaData>] {
        self.levels[level].added_files.as_slice()
    }

    /// 文件是否在 level 中被标记为删除
    #[inline]
    pub fn is_deleted(&self, level: usize, number: u64) -> bool {
        self.levels[level].deleted_files.contains(&number)
    }

    /// 把 edit 中的变化累积到 builder 中。
    ///
    /// 先处理删除再处理新增，所以同一个 edit 在同一层先删后加的文件会保留。
    /// edit 中的文件被复制一份，由 builder 持有
    pub fn apply(&mut self, edit: &VersionEdit) {
        if self.strict() {
            self.check_consistency(self.base);
        }
        let num_levels = self.levels.len();
        let deleted = edit.deleted_files();
        for &(level, number) in deleted.iter() {
            assert!(
                level < num_levels,
                "[version builder] invalid level {} to delete file #{}, the max level is {}",
                level,
                number,
                num_levels - 1
            );
            self.levels[level].deleted_files.insert(number);
            if self.strict() {
                self.check_consistency_for_deletes(number, level);
            }
        }
        for (level, file) in edit.new_files() {
            let level = *level;
            assert!(
                level < num_levels,
                "[version builder] invalid level {} to add file #{}, the max level is {}",
                level,
                file.number,
                num_levels - 1
            );
            let delta = &mut self.levels[level];
            delta.deleted_files.remove(&file.number);
            if !delta.added_files.insert(Arc::new(file.clone())) {
                debug!("File #{} is already added to level {}", file.number, level);
            }
        }
        debug!(
            "Apply edit: {} deleted, {} added",
            deleted.len(),
            edit.new_files().len()
        );
    }

    /// 把 base 与累积的变化合并写入 `vstorage`。
    ///
    /// `vstorage` 应该是一个新建的空 version，层数与 base 相同。
    /// 每层的结果是 base 文件与新增文件的有序归并，去掉被删除的文件
    pub fn save_to(&self, vstorage: &mut VersionStorageInfo<C>) {
        assert_eq!(
            self.base.num_levels(),
            vstorage.num_levels(),
            "[version builder] the target version should have the same levels as the base"
        );
        if self.strict() {
            self.check_consistency(self.base);
            self.check_consistency(vstorage);
            if let Some(level) =
                (0..vstorage.num_levels()).find(|l| !vstorage.level_files(*l).is_empty())
            {
                fatal(Error::InvalidArgument(format!(
                    "the target version should be empty but level {} has {} files",
                    level,
                    vstorage.num_level_files(level)
                )));
            }
        }
        for (level, delta) in self.levels.iter().enumerate() {
            let base_files = self.base.level_files(level);
            let order = delta.added_files.order();
            vstorage.reserve(level, base_files.len() + delta.added_files.len());
            let mut cursor = 0;
            for added in delta.added_files.iter() {
                // base 中所有不排在 added 之后的文件先加入
                let upper = cursor
                    + base_files[cursor..].partition_point(|f| !order.precedes(added, f));
                for f in &base_files[cursor..upper] {
                    self.maybe_add_file(vstorage, level, f);
                }
                cursor = upper;
                self.maybe_add_file(vstorage, level, added);
            }
            for f in &base_files[cursor..] {
                self.maybe_add_file(vstorage, level, f);
            }
        }
        if self.strict() {
            self.check_consistency(vstorage);
        }
        debug!("Save version: {}", vstorage.level_summary());
    }

    /// 为每个新增文件从 table cache 加载句柄，返回成功加载的个数。
    ///
    /// 文件不存在或者打开失败只记录日志，文件保持未加载状态
    pub fn load_table_handlers(&self) -> usize {
        let table_cache = match self.table_cache.as_ref() {
            Some(tc) => tc,
            None => panic!("[version builder] a table cache is required to load table handlers"),
        };
        let icmp = self.base.internal_comparator();
        let mut loaded = 0;
        for (level, delta) in self.levels.iter().enumerate() {
            for file in delta.added_files.iter() {
                if file.has_table_handle() {
                    if self.strict() {
                        fatal(Error::InvalidArgument(format!(
                            "table handle of file #{} at level {} is already loaded",
                            file.number, level
                        )));
                    }
                    continue;
                }
                // save_to 保留 base 中的那份，这份副本不会进入新 version
                if self.live_in_base(level, file.number) {
                    debug!(
                        "File #{} at level {} is still live in the base, skip loading",
                        file.number, level
                    );
                    continue;
                }
                match table_cache.find_table(icmp, file.number, file.file_size) {
                    Ok(Some(handle)) => {
                        let reader = table_cache.reader_from(&handle);
                        if file.set_table_handle(handle, reader) {
                            loaded += 1;
                        }
                    }
                    Ok(None) => warn!(
                        "Table #{} at level {} is not found, leave it unloaded",
                        file.number, level
                    ),
                    Err(e) => warn!(
                        "Load table #{} at level {} failed: {:?}",
                        file.number, level, e
                    ),
                }
            }
        }
        info!("Loaded {} table handlers", loaded);
        loaded
    }

    /// 校验失败时终止
    pub fn check_consistency(&self, vstorage: &VersionStorageInfo<C>) {
        if let Err(e) = consistency::check_consistency(vstorage) {
            fatal(e);
        }
    }

    /// 被删除的文件找不到时终止
    pub fn check_consistency_for_deletes(&self, number: u64, level: usize) {
        if let Err(e) =
            consistency::check_consistency_for_deletes(self.base, &self.levels, number, level)
        {
            fatal(e);
        }
    }

    // 被删除的文件不加入
    fn maybe_add_file(
        &self,
        vstorage: &mut VersionStorageInfo<C>,
        level: usize,
        f: &Arc<FileMetaData>,
    ) {
        if self.levels[level].deleted_files.contains(&f.number) {
            return;
        }
        vstorage.maybe_add_file(level, f.clone());
    }

    // 同一层先删后加的文件，base 中的条目仍然有效
    fn live_in_base(&self, level: usize, number: u64) -> bool {
        !self.levels[level].deleted_files.contains(&number)
            && self
                .base
                .level_files(level)
                .iter()
                .any(|f| f.number == number)
    }

    #[inline]
    fn strict(&self) -> bool {
        self.base.options().strict_checks()
    }
}

fn fatal(e: Error) -> ! {
    error!("{}", e);
    panic!("[version builder] {}", e)
}
