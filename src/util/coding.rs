use std::convert::TryInto;

/// 以小端序把 `value` 追加到 `dst` 末尾
#[inline]
pub fn put_fixed_64(dst: &mut Vec<u8>, value: u64) {
    dst.extend_from_slice(&value.to_le_bytes());
}

/// 从 `src` 的前 8 个字节以小端序解码一个 u64
///
/// # Panic
///
/// `src` 长度小于 8
#[inline]
pub fn decode_fixed_64(src: &[u8]) -> u64 {
    let bytes: [u8; 8] = src[..8]
        .try_into()
        .expect("[coding] slice of 8 bytes always converts");
    u64::from_le_bytes(bytes)
}
