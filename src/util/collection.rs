use fxhash::FxBuildHasher;

// 文件编号这类整数 key 用 FxHash 比默认的 SipHash 快得多
pub type HashMap<K, V> = std::collections::HashMap<K, V, FxBuildHasher>;
pub type HashSet<K> = std::collections::HashSet<K, FxBuildHasher>;
