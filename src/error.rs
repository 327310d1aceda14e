use std::io;

quick_error! {
    /// 引擎内部统一的错误类型
    #[derive(Debug)]
    pub enum Error {
        NotFound(hint: Option<String>) {
            display("Not found: {:?}", hint)
        }
        Corruption(hint: String) {
            display("Data corruption: {}", hint)
        }
        InvalidArgument(hint: String) {
            display("Invalid argument: {}", hint)
        }
        IO(err: io::Error) {
            from()
            display("I/O operation error: {}", err)
            source(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
