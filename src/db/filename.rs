use std::path::{Path, PathBuf};

/// SST 文件的扩展名
pub const TABLE_FILE_EXT: &str = "sst";

/// 返回 `dirname` 下编号为 `number` 的 SST 文件路径，
/// 文件名至少 6 位，不足补 0，例如 `000012.sst`
pub fn table_file_name<P: AsRef<Path>>(dirname: P, number: u64) -> PathBuf {
    dirname
        .as_ref()
        .join(format!("{:06}.{}", number, TABLE_FILE_EXT))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_file_name() {
        for (number, expect) in vec![
            (0, "/db/000000.sst"),
            (12, "/db/000012.sst"),
            (1234567, "/db/1234567.sst"),
        ] {
            assert_eq!(PathBuf::from(expect), table_file_name("/db", number));
        }
    }
}
