use log::{LevelFilter, Log, Metadata, Record};
use slog::Drain;
use std::fs::File;
use std::sync::Arc;

/// 基于 `slog` 的 logger，实现了 `log` crate 的 `Log` trait
///
/// 如果给定了文件则写入文件，否则输出到终端。
/// 两种 drain 都由 `slog_async` 包装成异步写出。
pub struct Logger {
    inner: slog::Logger,
    level: LevelFilter,
}

impl Logger {
    pub fn new(file: Option<File>, level: LevelFilter) -> Self {
        let inner = match file {
            Some(f) => {
                let decorator = slog_term::PlainSyncDecorator::new(f);
                let drain = slog_term::FullFormat::new(decorator).build().fuse();
                let drain = slog_async::Async::new(drain).build().fuse();
                slog::Logger::root(drain, slog::o!())
            }
            None => {
                let decorator = slog_term::TermDecorator::new().build();
                let drain = slog_term::FullFormat::new(decorator).build().fuse();
                let drain = slog_async::Async::new(drain).build().fuse();
                slog::Logger::root(drain, slog::o!())
            }
        };
        Self { inner, level }
    }

    #[inline]
    pub fn level(&self) -> LevelFilter {
        self.level
    }
}

impl Log for Logger {
    fn enabled(&self, meta: &Metadata) -> bool {
        meta.level() <= self.level
    }

    fn log(&self, r: &Record) {
        if !self.enabled(r.metadata()) {
            return;
        }
        match r.level() {
            log::Level::Error => slog::error!(self.inner, "{}", r.args()),
            log::Level::Warn => slog::warn!(self.inner, "{}", r.args()),
            log::Level::Info => slog::info!(self.inner, "{}", r.args()),
            log::Level::Debug => slog::debug!(self.inner, "{}", r.args()),
            log::Level::Trace => slog::trace!(self.inner, "{}", r.args()),
        }
    }

    fn flush(&self) {}
}

// log::set_boxed_logger 需要一个 Box<dyn Log>，这里把共享的 logger 包一层
pub(crate) struct SharedLogger(pub Arc<dyn Log>);

impl Log for SharedLogger {
    fn enabled(&self, meta: &Metadata) -> bool {
        self.0.enabled(meta)
    }

    fn log(&self, r: &Record) {
        self.0.log(r)
    }

    fn flush(&self) {
        self.0.flush()
    }
}
