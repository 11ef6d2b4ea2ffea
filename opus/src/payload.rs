// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Classification and materialization of block payloads.
//!
//! The whole file is kept as one shared byte arena. Directory entries only carry offsets into it,
//! and [`resolve`] turns an `(arena, entry)` pair into a [`Payload`].

use crate::{
    OpusResult,
    block_type::{BlockType, DATA_DIRECTORY},
    directory::EntryRecord,
    error::Details,
    parameter::{self, ParameterList},
    util::{decode_latin1, safe_len},
};
use log::debug;
use serde::{Serialize, Serializer};
use std::{
    fmt,
    io::{Cursor, Seek, SeekFrom},
    sync::{Arc, OnceLock},
};

/// The kind of payload a block type announces.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum PayloadKind {
    ParameterList,
    FloatArray,
    StringBlob,
    None,
}

impl PayloadKind {
    /// Classify a block type. The first matching rule wins:
    ///
    /// 1. a `param` code, or `extend == 1`, announces a parameter list;
    /// 2. a `data` code other than 0 and 13 (the directory) announces a float array;
    /// 3. any other `extend` code announces a string blob.
    pub fn of(block_type: &BlockType) -> Self {
        if block_type.param != 0 || block_type.extend == 1 {
            PayloadKind::ParameterList
        } else if block_type.data != 0 && block_type.data != DATA_DIRECTORY {
            PayloadKind::FloatArray
        } else if block_type.extend != 0 {
            PayloadKind::StringBlob
        } else {
            PayloadKind::None
        }
    }
}

/// When float arrays are decoded.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ArrayLoading {
    /// Keep a descriptor and decode on first access.
    #[default]
    Lazy,
    /// Decode while resolving.
    Eager,
}

/// The content of a block.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Payload {
    ParameterList(ParameterList),
    FloatArray(FloatArray),
    StringBlob(StringBlob),
    None,
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::ParameterList(_) => PayloadKind::ParameterList,
            Payload::FloatArray(_) => PayloadKind::FloatArray,
            Payload::StringBlob(_) => PayloadKind::StringBlob,
            Payload::None => PayloadKind::None,
        }
    }

    pub fn as_parameter_list(&self) -> Option<&ParameterList> {
        match self {
            Payload::ParameterList(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_float_array(&self) -> Option<&FloatArray> {
        match self {
            Payload::FloatArray(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_string_blob(&self) -> Option<&StringBlob> {
        match self {
            Payload::StringBlob(blob) => Some(blob),
            _ => None,
        }
    }
}

/// An array of little-endian `f32`s.
///
/// A float array read from a file starts out as a descriptor `(arena, offset, len)`. The values
/// are decoded once, on the first call to [`values`](Self::values), and cached. The descriptor is
/// bounds-checked when it is created, so decoding itself cannot fail.
#[derive(Clone)]
pub struct FloatArray {
    arena: Arc<[u8]>,
    offset: usize,
    len: usize,
    values: OnceLock<Vec<f32>>,
}

impl FloatArray {
    /// An already materialized array, e.g. for writing.
    pub fn from_values(values: Vec<f32>) -> Self {
        Self {
            arena: Arc::from(Vec::new()),
            offset: 0,
            len: values.len(),
            values: OnceLock::from(values),
        }
    }

    /// The caller guarantees `arena[offset..offset + 4 * len]` is in bounds.
    fn deferred(arena: Arc<[u8]>, offset: usize, len: usize) -> Self {
        Self {
            arena,
            offset,
            len,
            values: OnceLock::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the values have been decoded yet.
    pub fn is_materialized(&self) -> bool {
        self.values.get().is_some()
    }

    pub fn values(&self) -> &[f32] {
        self.values.get_or_init(|| {
            self.arena[self.offset..self.offset + self.len * 4]
                .chunks_exact(4)
                .map(|chunk| {
                    let mut bytes = [0u8; 4];
                    bytes.copy_from_slice(chunk);
                    f32::from_le_bytes(bytes)
                })
                .collect()
        })
    }

    pub(crate) fn encode(&self, buffer: &mut Vec<u8>) {
        buffer.reserve(self.len * 4);
        for value in self.values() {
            buffer.extend_from_slice(&value.to_le_bytes());
        }
    }
}

impl PartialEq for FloatArray {
    fn eq(&self, other: &Self) -> bool {
        self.values() == other.values()
    }
}

impl fmt::Debug for FloatArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.values.get() {
            Some(values) => f.debug_tuple("FloatArray").field(values).finish(),
            None => f
                .debug_struct("FloatArray")
                .field("offset", &self.offset)
                .field("len", &self.len)
                .finish_non_exhaustive(),
        }
    }
}

impl Serialize for FloatArray {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.values())
    }
}

/// Raw bytes of a text block, `4 * block_length` long.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StringBlob(Vec<u8>);

impl StringBlob {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The text up to the first null byte, with trailing padding spaces removed.
    pub fn text(&self) -> String {
        let mut text = decode_latin1(&self.0);
        text.truncate(text.trim_end_matches(' ').len());
        text
    }
}

impl Serialize for StringBlob {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text())
    }
}

/// Byte range of a block, checked against the arena.
fn block_range(arena: &[u8], pointer: u32, length: usize) -> OpusResult<usize> {
    let start = usize::try_from(pointer).map_err(|_| Details::LayoutOverflow)?;
    match start.checked_add(length) {
        Some(end) if end <= arena.len() => Ok(start),
        _ => Err(Details::PointerOutOfBounds {
            pointer: u64::from(pointer),
            length: length as u64,
            size: arena.len() as u64,
        }
        .into()),
    }
}

/// Materialize the payload of one directory entry.
///
/// Unused slots (`data_pointer == 0`) are never read and resolve to [`Payload::None`].
/// Resolution only reads the arena, so resolving the same entry twice yields equal payloads.
pub fn resolve(
    arena: &Arc<[u8]>,
    entry: &EntryRecord,
    loading: ArrayLoading,
) -> OpusResult<Payload> {
    if entry.is_unused() {
        return Ok(Payload::None);
    }
    let kind = PayloadKind::of(&entry.block_type);
    debug!(
        "Resolving {kind:?} block '{}' at offset {}",
        entry.block_type, entry.data_pointer
    );

    match kind {
        PayloadKind::ParameterList => {
            let start = block_range(arena, entry.data_pointer, 0)?;
            let mut cursor = Cursor::new(&arena[..]);
            cursor
                .seek(SeekFrom::Start(start as u64))
                .map_err(Details::ReadParameter)?;
            Ok(Payload::ParameterList(parameter::decode_list(&mut cursor)?))
        }
        PayloadKind::FloatArray => {
            let len = usize::try_from(entry.block_length).map_err(|_| Details::LayoutOverflow)?;
            let start = block_range(arena, entry.data_pointer, safe_len(len.saturating_mul(4))?)?;
            let array = FloatArray::deferred(Arc::clone(arena), start, len);
            if loading == ArrayLoading::Eager {
                array.values();
            }
            Ok(Payload::FloatArray(array))
        }
        PayloadKind::StringBlob => {
            let len = usize::try_from(entry.block_length).map_err(|_| Details::LayoutOverflow)?;
            let len = safe_len(len.saturating_mul(4))?;
            let start = block_range(arena, entry.data_pointer, len)?;
            Ok(Payload::StringBlob(StringBlob::new(
                arena[start..start + len].to_vec(),
            )))
        }
        PayloadKind::None => Ok(Payload::None),
    }
}
