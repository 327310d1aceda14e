use std::cmp::Ordering;

/// Comparator 对象提供了 key 之间的全序关系，
/// 用在 SST 文件的 key 范围比较和排序上。
/// 比较器实现必须是线程安全的，需要多个线程同时调用
pub trait Comparator: Send + Sync + Clone + Default {
    // 如果 a 小于 b，返回 Ordering::Less。
    // 如果 a 等于 b，返回 Ordering::Equal。
    // 如果 a 大于 b，返回 Ordering::Greater
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering;

    /// 返回比较器的名称。
    /// 如果更改了比较器的排序逻辑，应更换比较器的名称，
    /// 否则用新比较器读取旧的 version 会得到错误的文件顺序。
    fn name(&self) -> &str;
}

#[derive(Default, Clone, Copy)]
pub struct BytewiseComparator {}

impl Comparator for BytewiseComparator {
    #[inline]
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        a.cmp(b)
    }

    #[inline]
    fn name(&self) -> &str {
        "leveldb.BytewiseComparator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytewise_comparator_compare() {
        let tests = vec![
            ("", "", Ordering::Equal),
            ("", "a", Ordering::Less),
            ("a", "", Ordering::Greater),
            ("abc", "abd", Ordering::Less),
            ("abc", "ab", Ordering::Greater),
            ("k", "k", Ordering::Equal),
        ];
        let c = BytewiseComparator::default();
        for (a, b, expect) in tests {
            assert_eq!(expect, c.compare(a.as_bytes(), b.as_bytes()), "{} vs {}", a, b);
        }
        // bytes are compared unsigned
        assert_eq!(Ordering::Greater, c.compare(&[0xff], &[0x01, 0x02]));
    }

    #[test]
    fn test_bytewise_comparator_name() {
        assert_eq!(
            "leveldb.BytewiseComparator",
            BytewiseComparator::default().name()
        );
    }
}
