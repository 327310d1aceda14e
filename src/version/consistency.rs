use crate::util::comparator::Comparator;
use crate::version::{FileSet, VersionStorageInfo};
use crate::{Error, Result};
use std::cmp::Ordering;

/// 校验 version 中每一层文件的顺序。
///
/// * level 0：按 `newest_first_by_seq_no` 严格有序，并且 largest_seqno 严格递减
/// * level > 0：按 smallest key 严格有序，并且相邻文件的 key 范围不重叠
pub fn check_consistency<C: Comparator>(vstorage: &VersionStorageInfo<C>) -> Result<()> {
    let icmp = vstorage.internal_comparator();
    for level in 0..vstorage.num_levels() {
        let order = vstorage.file_order(level);
        for pair in vstorage.level_files(level).windows(2) {
            let (f1, f2) = (&pair[0], &pair[1]);
            if !order.precedes(f1, f2) {
                return Err(Error::Corruption(format!(
                    "files #{} and #{} in level {} are out of order",
                    f1.number, f2.number, level
                )));
            }
            if level == 0 {
                if f1.largest_seqno <= f2.largest_seqno {
                    return Err(Error::Corruption(format!(
                        "L0 file #{} with largest seqno {} is not newer than file #{} with largest seqno {}",
                        f1.number, f1.largest_seqno, f2.number, f2.largest_seqno
                    )));
                }
            } else if icmp.compare_key(&f1.largest, &f2.smallest) != Ordering::Less {
                return Err(Error::Corruption(format!(
                    "overlapping ranges in same level {:?} vs. {:?}",
                    f1.largest, f2.smallest
                )));
            }
        }
    }
    Ok(())
}

/// 校验在 `level` 删除的文件 `number` 确实存在。
///
/// 依次查找 base 的所有层、`added` 中 level 之后的层、`added` 中 level 本层。
/// `added[i]` 是 level i 尚未合并的新增文件
pub fn check_consistency_for_deletes<C, S>(
    base: &VersionStorageInfo<C>,
    added: &[S],
    number: u64,
    level: usize,
) -> Result<()>
where
    C: Comparator,
    S: AsRef<FileSet<C>>,
{
    let in_base = (0..base.num_levels())
        .any(|l| base.level_files(l).iter().any(|f| f.number == number));
    if in_base {
        return Ok(());
    }
    // 可能是之前的 edit 把文件移到了更高的层
    let moved_up = added
        .iter()
        .skip(level + 1)
        .any(|files| files.as_ref().contains(number));
    if moved_up {
        return Ok(());
    }
    match added.get(level) {
        Some(files) if files.as_ref().contains(number) => Ok(()),
        _ => Err(Error::Corruption(format!(
            "file #{} deleted from level {} is not found",
            number, level
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::format::{InternalKey, ValueType};
    use crate::options::Options;
    use crate::util::comparator::BytewiseComparator;
    use crate::version::version_edit::FileMetaData;
    use crate::version::FileOrder;
    use std::sync::Arc;

    fn new_file(number: u64, smallest: &str, largest: &str, seqs: (u64, u64)) -> Arc<FileMetaData> {
        Arc::new(FileMetaData::new(
            number,
            1024,
            InternalKey::new(smallest.as_bytes(), seqs.1, ValueType::Value),
            InternalKey::new(largest.as_bytes(), seqs.0, ValueType::Value),
            seqs.0,
            seqs.1,
        ))
    }

    fn new_storage(levels: Vec<Vec<Arc<FileMetaData>>>) -> VersionStorageInfo<BytewiseComparator> {
        // 跳过 maybe_add_file 的检查，直接构造任意顺序的 version
        let mut opts = Options::default();
        opts.max_levels = 4;
        let mut vstorage = VersionStorageInfo::new(Arc::new(opts));
        for (level, files) in levels.into_iter().enumerate() {
            vstorage.files[level] = files;
        }
        vstorage
    }

    fn expect_corruption(res: Result<()>, msg: &str) {
        match res {
            Err(Error::Corruption(s)) => assert!(s.contains(msg), "unexpected message: {}", s),
            other => panic!("expect corruption '{}' but got {:?}", msg, other),
        }
    }

    #[test]
    fn test_consistent_version() {
        let vstorage = new_storage(vec![
            vec![new_file(3, "a", "z", (20, 30)), new_file(1, "b", "y", (10, 15))],
            vec![new_file(2, "a", "c", (1, 2)), new_file(4, "d", "f", (3, 4))],
        ]);
        assert!(check_consistency(&vstorage).is_ok());
        assert!(check_consistency(&new_storage(vec![])).is_ok());
    }

    #[test]
    fn test_l0_out_of_order() {
        let vstorage = new_storage(vec![vec![
            new_file(1, "b", "y", (10, 15)),
            new_file(3, "a", "z", (20, 30)),
        ]]);
        expect_corruption(check_consistency(&vstorage), "out of order");
    }

    #[test]
    fn test_l0_largest_seqno_not_decreasing() {
        // ordered by smallest seqno, but the older file has a larger largest seqno
        let vstorage = new_storage(vec![vec![
            new_file(3, "a", "z", (20, 30)),
            new_file(1, "b", "y", (10, 40)),
        ]]);
        expect_corruption(check_consistency(&vstorage), "not newer than");
    }

    #[test]
    fn test_overlapping_ranges() {
        let vstorage = new_storage(vec![
            vec![],
            vec![],
            vec![new_file(2, "a", "m", (1, 2)), new_file(4, "k", "z", (3, 4))],
        ]);
        expect_corruption(check_consistency(&vstorage), "overlapping ranges in same level");
        // touching boundaries overlap as well
        let vstorage = new_storage(vec![
            vec![],
            vec![new_file(2, "a", "m", (5, 5)), new_file(4, "m", "z", (5, 5))],
        ]);
        expect_corruption(check_consistency(&vstorage), "overlapping ranges in same level");
    }

    #[test]
    fn test_level_out_of_order() {
        let vstorage = new_storage(vec![
            vec![],
            vec![new_file(4, "d", "f", (3, 4)), new_file(2, "a", "c", (1, 2))],
        ]);
        expect_corruption(check_consistency(&vstorage), "out of order");
    }

    #[test]
    fn test_check_deletes() {
        let base = new_storage(vec![vec![], vec![new_file(7, "a", "c", (1, 2))]]);
        let icmp = base.internal_comparator().clone();
        let mut added = (0..base.num_levels())
            .map(|level| FileSet::new(FileOrder::for_level(level, &icmp)))
            .collect::<Vec<_>>();
        added[2].insert(new_file(8, "a", "c", (3, 4)));
        added[1].insert(new_file(9, "x", "z", (3, 4)));

        for (number, level, found) in vec![
            // in base, at any level
            (7, 1, true),
            (7, 3, true),
            // added at a higher level
            (8, 1, true),
            // added at the same level
            (8, 2, true),
            (9, 1, true),
            // added only at a lower level
            (8, 3, false),
            (9, 2, false),
            // unknown file
            (10, 0, false),
        ] {
            let res = check_consistency_for_deletes(&base, &added, number, level);
            if found {
                assert!(res.is_ok(), "#{} @ {}: {:?}", number, level, res);
            } else {
                expect_corruption(res, "is not found");
            }
        }
    }
}
