use crate::logger::{Logger, SharedLogger};
use crate::util::comparator::{BytewiseComparator, Comparator};
use log::{LevelFilter, Log};
use std::sync::Arc;

// table cache 之外需要保留给其他文件（manifest、wal、LOCK 等）的文件句柄数
const NUM_NON_TABLE_CACHE_FILES: usize = 10;

/// 构建 version 时使用的配置
#[derive(Clone)]
pub struct Options<C: Comparator> {
    /// user key 比较器，必须与构建 base version 时使用的比较器一致
    pub comparator: C,

    /// LSM 的层数
    pub max_levels: usize,

    /// 打开后在 apply / save_to 前后校验 version 的文件顺序与重叠情况。
    /// 开启了 debug_assertions 的构建（包括测试）总是会校验
    pub paranoid_checks: bool,

    /// 同时打开的文件数上限，table cache 的容量由它推导
    pub max_open_files: usize,

    /// 自定义 logger，为 `None` 时 `initialize` 会创建一个输出到终端的 `Logger`
    pub logger: Option<Arc<dyn Log>>,

    pub logger_level: LevelFilter,
}

impl<C: Comparator> Options<C> {
    /// 是否执行一致性校验
    #[inline]
    pub fn strict_checks(&self) -> bool {
        self.paranoid_checks || cfg!(debug_assertions)
    }

    /// table cache 可以缓存的表数量
    #[inline]
    pub fn table_cache_size(&self) -> usize {
        self.max_open_files
            .saturating_sub(NUM_NON_TABLE_CACHE_FILES)
            .max(1)
    }

    /// 把配置的 logger 注册为全局 `log` 后端。
    /// 已经注册过全局 logger 时保留原有的那个
    pub fn initialize(&mut self) {
        let level = self.logger_level;
        let logger = self
            .logger
            .get_or_insert_with(|| Arc::new(Logger::new(None, level)))
            .clone();
        if log::set_boxed_logger(Box::new(SharedLogger(logger))).is_ok() {
            log::set_max_level(level);
        } else {
            debug!("global logger already installed, keep it");
        }
    }
}

impl<C: Comparator> Default for Options<C> {
    fn default() -> Self {
        Self {
            comparator: C::default(),
            max_levels: 7,
            paranoid_checks: false,
            max_open_files: 1000,
            logger: None,
            logger_level: LevelFilter::Info,
        }
    }
}

impl Options<BytewiseComparator> {
    /// 使用字节序比较器并开启一致性校验
    pub fn paranoid() -> Self {
        Self {
            paranoid_checks: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = Options::<BytewiseComparator>::default();
        assert_eq!(7, opts.max_levels);
        assert!(!opts.paranoid_checks);
        assert_eq!(990, opts.table_cache_size());
        assert_eq!(LevelFilter::Info, opts.logger_level);
        // test builds always run the validation layer
        assert!(opts.strict_checks());
    }

    #[test]
    fn test_table_cache_size_lower_bound() {
        let mut opts = Options::<BytewiseComparator>::default();
        opts.max_open_files = 3;
        assert_eq!(1, opts.table_cache_size());
    }

    #[test]
    fn test_initialize_twice() {
        let mut opts = Options::<BytewiseComparator>::paranoid();
        opts.logger_level = LevelFilter::Warn;
        opts.initialize();
        assert!(opts.logger.is_some());
        let first = opts.logger.clone().unwrap();
        opts.initialize();
        assert!(Arc::ptr_eq(&first, opts.logger.as_ref().unwrap()));
    }
}
