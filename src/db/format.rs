// Copyright 2019 Fullstop000 <fullstop1005@gmail.com>.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// See the License for the specific language governing permissions and
// limitations under the License.

// Copyright (c) 2011 The LevelDB Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::util::coding::{decode_fixed_64, put_fixed_64};
use crate::util::comparator::Comparator;
use std::cmp::Ordering;
use std::fmt::{Debug, Formatter};

/// The max key sequence number. The value is 2^56 - 1 because the seq number
/// only takes 56 bits when is serialized to `InternalKey`
pub const MAX_KEY_SEQUENCE: u64 = (1u64 << 56) - 1;

/// The tail bytes length of an internal key
/// 7bytes sequence number + 1byte type number
pub const INTERNAL_KEY_TAIL: usize = 8;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ValueType {
    /// A value indicates that the key is deleted
    Deletion = 0,
    /// A normal value
    Value = 1,

    /// Unknown type
    Unknown,
}

impl From<u64> for ValueType {
    fn from(v: u64) -> Self {
        match v {
            1 => ValueType::Value,
            0 => ValueType::Deletion,
            _ => ValueType::Unknown,
        }
    }
}

/// 解码后的 internal key，只借用原始字节
pub struct ParsedInternalKey<'a> {
    pub user_key: &'a [u8],
    pub seq: u64,
    pub value_type: ValueType,
}

impl<'a> ParsedInternalKey<'a> {
    /// 长度不足 8 字节或者 type 无法识别时返回 `None`
    pub fn decode_from(internal_key: &'a [u8]) -> Option<ParsedInternalKey<'a>> {
        let size = internal_key.len();
        if size < INTERNAL_KEY_TAIL {
            return None;
        }
        let num = decode_fixed_64(&internal_key[size - INTERNAL_KEY_TAIL..]);
        let value_type = ValueType::from(num & 0xff);
        if value_type == ValueType::Unknown {
            return None;
        }
        Some(Self {
            user_key: &internal_key[..size - INTERNAL_KEY_TAIL],
            seq: num >> 8,
            value_type,
        })
    }
}

impl<'a> Debug for ParsedInternalKey<'a> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "'{}' @ {} : {:?}",
            String::from_utf8_lossy(self.user_key),
            self.seq,
            self.value_type
        )
    }
}

/// SST 文件的 smallest / largest 边界使用的编码后的 key
///
/// The format of `InternalKey`:
///
/// ```text
/// | ----------- n bytes ----------- | --- 7 bytes --- | - 1 byte - |
///              user key                  seq number        type
/// ```
#[derive(Default, Clone, PartialEq, Eq)]
pub struct InternalKey {
    data: Vec<u8>,
}

impl InternalKey {
    pub fn new(key: &[u8], seq: u64, t: ValueType) -> Self {
        let mut data = Vec::with_capacity(key.len() + INTERNAL_KEY_TAIL);
        data.extend_from_slice(key);
        put_fixed_64(&mut data, pack_seq_and_type(seq, t));
        InternalKey { data }
    }

    #[inline]
    pub fn decoded_from(src: &[u8]) -> Self {
        Self {
            data: Vec::from(src),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        self.data.as_slice()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn user_key(&self) -> &[u8] {
        extract_user_key(&self.data)
    }

    #[inline]
    pub fn seq(&self) -> u64 {
        extract_seq_number(&self.data)
    }

    #[inline]
    pub fn parsed(&self) -> Option<ParsedInternalKey<'_>> {
        ParsedInternalKey::decode_from(&self.data)
    }
}

impl Debug for InternalKey {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.parsed() {
            Some(parsed) => write!(f, "{:?}", parsed),
            None => write!(f, "(bad){:?}", self.data),
        }
    }
}

/// `InternalKeyComparator` 用于比较 internal key(user key + sequence number + type tag)，里面封装了 user key 比较器，
/// 比较结果按以下顺序排序：
//      user key 升序（根据用户提供的比较器）
//      sequence number 降序
#[derive(Clone, Default)]
pub struct InternalKeyComparator<C: Comparator> {
    /// user key 比较器来自 `Options`，可以自定义
    pub user_comparator: C,
}

impl<C: Comparator> InternalKeyComparator<C> {
    pub fn new(ucmp: C) -> Self {
        InternalKeyComparator {
            user_comparator: ucmp,
        }
    }

    /// 比较两个 `InternalKey`
    #[inline]
    pub fn compare_key(&self, a: &InternalKey, b: &InternalKey) -> Ordering {
        self.compare(a.data(), b.data())
    }
}

impl<C: Comparator> Comparator for InternalKeyComparator<C> {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        self.user_comparator
            .compare(extract_user_key(a), extract_user_key(b))
            // 序列号越大越新，排在前面
            .then_with(|| extract_seq_number(b).cmp(&extract_seq_number(a)))
    }

    #[inline]
    fn name(&self) -> &str {
        "leveldb.InternalKeyComparator"
    }
}

/// 从 internal key 中返回 user key
#[inline]
pub fn extract_user_key(key: &[u8]) -> &[u8] {
    let size = key.len();
    assert!(
        size >= INTERNAL_KEY_TAIL,
        "[internal key] invalid size of internal key : expect >= {} but got {}",
        INTERNAL_KEY_TAIL,
        size
    );
    &key[..size - INTERNAL_KEY_TAIL]
}

#[inline]
fn extract_seq_number(key: &[u8]) -> u64 {
    let size = key.len();
    assert!(
        size >= INTERNAL_KEY_TAIL,
        "[internal key] invalid size of internal key : expect >= {} but got {}",
        INTERNAL_KEY_TAIL,
        size
    );
    decode_fixed_64(&key[size - INTERNAL_KEY_TAIL..]) >> 8
}

// compose sequence number and value type into a single u64
#[inline]
fn pack_seq_and_type(seq: u64, v_type: ValueType) -> u64 {
    assert!(
        seq <= MAX_KEY_SEQUENCE,
        "[key seq] the sequence number should be <= {}, but got {}",
        MAX_KEY_SEQUENCE,
        seq
    );
    seq << 8 | v_type as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::comparator::BytewiseComparator;

    #[test]
    fn test_pack_seq_and_type() {
        let tests: Vec<(u64, ValueType, Vec<u8>)> = vec![
            (1, ValueType::Value, vec![1, 1, 0, 0, 0, 0, 0, 0]),
            (2, ValueType::Deletion, vec![0, 2, 0, 0, 0, 0, 0, 0]),
            (
                MAX_KEY_SEQUENCE,
                ValueType::Deletion,
                vec![0, 255, 255, 255, 255, 255, 255, 255],
            ),
        ];
        for (seq, t, expect) in tests {
            assert_eq!(decode_fixed_64(expect.as_slice()), pack_seq_and_type(seq, t));
        }
    }

    #[test]
    #[should_panic]
    fn test_pack_seq_and_type_panic() {
        pack_seq_and_type(1 << 56, ValueType::Value);
    }

    #[test]
    fn test_internal_key_parts() {
        for key in &["", "k", "hello", "longggggggggggggggggggggg"] {
            for seq in &[1, (1u64 << 8) + 1, (1u64 << 32) - 1, MAX_KEY_SEQUENCE] {
                for vt in &[ValueType::Value, ValueType::Deletion] {
                    let ikey = InternalKey::new(key.as_bytes(), *seq, *vt);
                    assert_eq!(key.as_bytes(), ikey.user_key());
                    assert_eq!(*seq, ikey.seq());
                    let parsed = ikey.parsed().expect("");
                    assert_eq!(key.as_bytes(), parsed.user_key);
                    assert_eq!(*vt, parsed.value_type);
                    assert_eq!(ikey, InternalKey::decoded_from(ikey.data()));
                }
            }
        }
    }

    #[test]
    fn test_parse_bad_internal_key() {
        assert!(ParsedInternalKey::decode_from(b"short").is_none());
        let mut bad = b"key".to_vec();
        put_fixed_64(&mut bad, 7 << 8 | 0x09);
        assert!(ParsedInternalKey::decode_from(&bad).is_none());
        assert!(format!("{:?}", InternalKey::decoded_from(&bad)).starts_with("(bad)"));
    }

    #[test]
    fn test_icmp_cmp() {
        let icmp = InternalKeyComparator::new(BytewiseComparator::default());
        let tests = vec![
            (
                ("", 100, ValueType::Value),
                ("", 100, ValueType::Value),
                Ordering::Equal,
            ),
            (
                ("", 90, ValueType::Value),
                ("", 100, ValueType::Value),
                Ordering::Greater,
            ), // physically less but logically larger
            (
                ("", 90, ValueType::Value),
                ("", 90, ValueType::Deletion),
                Ordering::Equal,
            ), // Only cmp value seq if the user keys are same
            (
                ("a", 90, ValueType::Value),
                ("b", 100, ValueType::Value),
                Ordering::Less,
            ),
        ];
        for (a, b, expected) in tests {
            let ka = InternalKey::new(a.0.as_bytes(), a.1, a.2);
            let kb = InternalKey::new(b.0.as_bytes(), b.1, b.2);
            assert_eq!(expected, icmp.compare_key(&ka, &kb));
        }
    }
}
