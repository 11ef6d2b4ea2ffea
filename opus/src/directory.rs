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

//! The fixed-size directory of block descriptors.
//!
//! Each entry is 12 bytes: the packed [`BlockType`], the block length and the absolute offset of
//! the block's payload. Payloads are resolved separately by [`crate::payload::resolve`].

use crate::{
    OpusResult,
    block_type::BlockType,
    error::Details,
    payload::Payload,
    util::{read_u32, safe_len},
};
use serde::Serialize;
use std::io::{Read, Seek, SeekFrom};

/// Size in bytes of one encoded directory entry.
pub const ENTRY_LEN: usize = 12;

/// Size of one encoded directory entry, in 32-bit words.
pub const ENTRY_WORDS: u32 = (ENTRY_LEN / 4) as u32;

/// A directory entry as stored on disk, before its payload is resolved.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct EntryRecord {
    pub block_type: BlockType,
    /// Words for parameter lists, elements for float arrays, 4-byte units for string blobs.
    pub block_length: u32,
    /// Absolute offset of the payload. Zero marks an unused slot.
    pub data_pointer: u32,
}

impl EntryRecord {
    pub fn is_unused(&self) -> bool {
        self.data_pointer == 0
    }
}

/// A directory entry together with its resolved payload.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DirectoryEntry {
    pub block_type: BlockType,
    pub block_length: u32,
    pub data_pointer: u32,
    pub payload: Payload,
}

impl DirectoryEntry {
    pub(crate) fn new(record: EntryRecord, payload: Payload) -> Self {
        Self {
            block_type: record.block_type,
            block_length: record.block_length,
            data_pointer: record.data_pointer,
            payload,
        }
    }

    pub fn record(&self) -> EntryRecord {
        EntryRecord {
            block_type: self.block_type,
            block_length: self.block_length,
            data_pointer: self.data_pointer,
        }
    }
}

/// Read `max_dir_size` consecutive entries starting at `first_dir_pointer`.
pub fn decode<R: Read + Seek>(
    source: &mut R,
    first_dir_pointer: u32,
    max_dir_size: u32,
) -> OpusResult<Vec<EntryRecord>> {
    let count = usize::try_from(max_dir_size).map_err(|_| Details::LayoutOverflow)?;
    safe_len(count.saturating_mul(ENTRY_LEN))?;

    let start = u64::from(first_dir_pointer);
    let read_error = |index: usize| {
        let offset = start + (index * ENTRY_LEN) as u64;
        move |source: std::io::Error| Details::ReadDirectory {
            index,
            offset,
            source,
        }
    };

    let source_len = source.seek(SeekFrom::End(0)).map_err(read_error(0))?;
    source.seek(SeekFrom::Start(start)).map_err(read_error(0))?;
    let mut entries = Vec::with_capacity(count.min(slots_available(source_len, start)));
    for index in 0..count {
        let word = read_u32(source).map_err(read_error(index))?;
        let block_length = read_u32(source).map_err(read_error(index))?;
        let data_pointer = read_u32(source).map_err(read_error(index))?;
        entries.push(EntryRecord {
            block_type: BlockType::decode(word),
            block_length,
            data_pointer,
        });
    }
    Ok(entries)
}

/// Number of whole entries between `start` and the end of a source of `source_len` bytes.
fn slots_available(source_len: u64, start: u64) -> usize {
    usize::try_from(source_len.saturating_sub(start) / ENTRY_LEN as u64).unwrap_or(usize::MAX)
}

/// Append the encoded entries to `buffer`, in order.
pub fn encode(entries: &[EntryRecord], buffer: &mut Vec<u8>) -> OpusResult<()> {
    buffer.reserve(entries.len() * ENTRY_LEN);
    for entry in entries {
        buffer.extend_from_slice(&entry.block_type.encode()?.to_le_bytes());
        buffer.extend_from_slice(&entry.block_length.to_le_bytes());
        buffer.extend_from_slice(&entry.data_pointer.to_le_bytes());
    }
    Ok(())
}
