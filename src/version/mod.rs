use crate::db::format::InternalKeyComparator;
use crate::options::Options;
use crate::util::comparator::Comparator;
use crate::version::version_edit::FileMetaData;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

pub mod consistency;
pub mod file_set;
pub mod version_builder;
pub mod version_edit;

pub use file_set::{FileOrder, FileSet};

/// 一个 version 中每个 level 的文件元数据
///
/// level 0 的文件按 `newest_first_by_seq_no` 排序，key 范围可以重叠。
/// level > 0 的文件按 smallest key 排序，同一层内任意两个文件的 key 范围都不重叠。
/// 文件通过 `Arc` 与 base version、`VersionBuilder` 共享
pub struct VersionStorageInfo<C: Comparator> {
    options: Arc<Options<C>>,
    icmp: InternalKeyComparator<C>,
    files: Vec<Vec<Arc<FileMetaData>>>,
}

impl<C: Comparator> fmt::Debug for VersionStorageInfo<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (level, files) in self.files.iter().enumerate() {
            write!(f, "level {}: [ ", level)?;
            for file in files {
                write!(
                    f,
                    "File {}({}): [{:?}..{:?}], ",
                    file.number, file.file_size, file.smallest, file.largest
                )?;
            }
            writeln!(f, " ]")?;
        }
        Ok(())
    }
}

impl<C: Comparator> VersionStorageInfo<C> {
    /// 创建一个每层都为空的 version，层数由 `max_levels` 决定
    pub fn new(options: Arc<Options<C>>) -> Self {
        let icmp = InternalKeyComparator::new(options.comparator.clone());
        let files = (0..options.max_levels).map(|_| vec![]).collect();
        Self {
            options,
            icmp,
            files,
        }
    }

    #[inline]
    pub fn num_levels(&self) -> usize {
        self.files.len()
    }

    #[inline]
    pub fn options(&self) -> &Arc<Options<C>> {
        &self.options
    }

    #[inline]
    pub fn internal_comparator(&self) -> &InternalKeyComparator<C> {
        &self.icmp
    }

    /// 该层文件的排序方式
    #[inline]
    pub fn file_order(&self, level: usize) -> FileOrder<C> {
        FileOrder::for_level(level, &self.icmp)
    }

    /// 返回 level 中已排序的文件
    pub fn level_files(&self, level: usize) -> &[Arc<FileMetaData>] {
        self.assert_level(level);
        self.files[level].as_slice()
    }

    #[inline]
    pub fn num_level_files(&self, level: usize) -> usize {
        self.level_files(level).len()
    }

    /// level 中所有文件的总大小
    pub fn total_file_size(&self, level: usize) -> u64 {
        self.level_files(level)
            .iter()
            .fold(0, |acc, f| acc + f.file_size)
    }

    /// 预留空间
    pub fn reserve(&mut self, level: usize, additional: usize) {
        self.assert_level(level);
        self.files[level].reserve(additional);
    }

    /// 把文件追加到 level 的末尾，调用方需保证按该层的顺序追加。
    ///
    /// 和最后一个文件编号相同时视为重复，不再追加
    pub fn maybe_add_file(&mut self, level: usize, f: Arc<FileMetaData>) {
        self.assert_level(level);
        let strict = self.options.strict_checks();
        let files = &mut self.files[level];
        if let Some(last) = files.last() {
            if last.number == f.number {
                debug!("File #{} is already in level {}, skip it", f.number, level);
                return;
            }
            if strict
                && level > 0
                && self.icmp.compare_key(&last.largest, &f.smallest) != Ordering::Less
            {
                error!(
                    "Overlapping ranges in level {}: {:?} vs. {:?}",
                    level, last, f
                );
                panic!(
                    "[version] overlapping ranges in level {}: #{} largest {:?} vs. #{} smallest {:?}",
                    level, last.number, last.largest, f.number, f.smallest
                );
            }
        }
        files.push(f);
    }

    /// 返回类似 "files[ 1 0 0 0 0 0 0 ]" 的每层文件数
    pub fn level_summary(&self) -> String {
        let mut s = String::from("files[ ");
        let summary = self.files.iter().fold(String::new(), |mut acc, files| {
            acc.push_str(format!("{} ", files.len()).as_str());
            acc
        });
        s.push_str(summary.as_str());
        s.push(']');
        s
    }

    #[inline]
    fn assert_level(&self, level: usize) {
        assert!(
            level < self.files.len(),
            "[version] invalid level {}, the max level is {}",
            level,
            self.files.len() - 1
        );
    }
}
