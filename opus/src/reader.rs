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

//! Logic handling reading OPUS files at user level.

use crate::{
    OpusResult,
    directory::{self, DirectoryEntry},
    error::Details,
    payload::{self, ArrayLoading},
    spectrum::{self, RatioSpectrum},
    util::{read_f64, read_u32},
};
use bon::bon;
use log::{debug, warn};
use serde::Serialize;
use std::{
    io::{Cursor, Read},
    path::Path,
    sync::Arc,
};

/// The four bytes every OPUS file starts with.
pub const MAGIC: [u8; 4] = [0x0A, 0x0A, 0xFE, 0xFE];

/// Size in bytes of the fixed file header.
pub const HEADER_LEN: u32 = 24;

/// The fixed 24-byte header at the start of a file.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Header {
    pub version: f64,
    /// Absolute offset of the first directory entry.
    pub first_dir_pointer: u32,
    /// Number of directory slots.
    pub max_dir_size: u32,
    /// Number of slots in use, as claimed by the writer of the file.
    pub curr_dir_size: u32,
}

impl Header {
    pub fn decode<R: Read>(reader: &mut R) -> OpusResult<Self> {
        let mut magic = [0u8; 4];
        reader
            .read_exact(&mut magic)
            .map_err(Details::ReadHeader)?;
        if magic != MAGIC {
            return Err(Details::HeaderMagic(magic).into());
        }
        Ok(Self {
            version: read_f64(reader).map_err(Details::ReadHeader)?,
            first_dir_pointer: read_u32(reader).map_err(Details::ReadHeader)?,
            max_dir_size: read_u32(reader).map_err(Details::ReadHeader)?,
            curr_dir_size: read_u32(reader).map_err(Details::ReadHeader)?,
        })
    }

    pub(crate) fn encode(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(&MAGIC);
        buffer.extend_from_slice(&self.version.to_le_bytes());
        buffer.extend_from_slice(&self.first_dir_pointer.to_le_bytes());
        buffer.extend_from_slice(&self.max_dir_size.to_le_bytes());
        buffer.extend_from_slice(&self.curr_dir_size.to_le_bytes());
    }
}

/// A decoded OPUS file: its header and every directory slot, in on-disk order.
///
/// ```
/// # use opus_file::{OpusFile, build};
/// let bytes = build(&[1000.0, 1001.0, 1002.0], &[0.5, 0.25, 0.125], "KBr pellet")?;
/// let file = OpusFile::parse(bytes)?;
/// for entry in file.blocks() {
///     println!("{}: {:?}", entry.block_type, entry.payload.kind());
/// }
/// # Ok::<(), opus_file::Error>(())
/// ```
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OpusFile {
    pub header: Header,
    pub directory: Vec<DirectoryEntry>,
}

#[bon]
impl OpusFile {
    /// Decode a file held in memory, with options.
    ///
    /// ```
    /// # use opus_file::{OpusFile, ArrayLoading, build};
    /// # let bytes = build(&[1.0, 2.0], &[0.0, 1.0], "")?;
    /// let file = OpusFile::reader(bytes.into())
    ///     .array_loading(ArrayLoading::Eager)
    ///     .parse()?;
    /// # Ok::<(), opus_file::Error>(())
    /// ```
    ///
    /// Any malformed part aborts decoding; no partial file is returned.
    #[builder(finish_fn = parse)]
    pub fn reader(
        #[builder(start_fn)] arena: Arc<[u8]>,
        #[builder(default)] array_loading: ArrayLoading,
    ) -> OpusResult<OpusFile> {
        let mut cursor = Cursor::new(&arena[..]);
        let header = Header::decode(&mut cursor)?;
        debug!(
            "OPUS file version {}, {} directory slots at offset {}",
            header.version, header.max_dir_size, header.first_dir_pointer
        );

        let records =
            directory::decode(&mut cursor, header.first_dir_pointer, header.max_dir_size)?;
        let directory = records
            .into_iter()
            .map(|record| {
                let payload = payload::resolve(&arena, &record, array_loading)?;
                Ok(DirectoryEntry::new(record, payload))
            })
            .collect::<OpusResult<Vec<_>>>()?;

        let file = OpusFile { header, directory };
        let visible = file.blocks().count();
        if u32::try_from(visible).ok() != Some(header.curr_dir_size) {
            warn!(
                "Header claims {} blocks in use but {visible} precede the first unused slot",
                header.curr_dir_size
            );
        }
        Ok(file)
    }

    /// Decode a file held in memory.
    pub fn parse(bytes: impl Into<Arc<[u8]>>) -> OpusResult<Self> {
        Self::reader(bytes.into()).parse()
    }

    /// Read and decode the file at `path`.
    pub fn open(path: impl AsRef<Path>) -> OpusResult<Self> {
        let bytes = std::fs::read(path).map_err(Details::ReadFile)?;
        Self::parse(bytes)
    }

    pub fn version(&self) -> f64 {
        self.header.version
    }

    /// The directory entries in order, up to the first unused slot.
    ///
    /// Slots after the first zero data pointer are still decoded and kept in
    /// [`directory`](Self::directory), they are only skipped here.
    pub fn blocks(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.directory
            .iter()
            .take_while(|entry| entry.data_pointer != 0)
    }

    /// The ratio spectrum stored in the file, if there is one.
    ///
    /// `Ok(None)` means the file is valid but holds no ratio data or no matching data status
    /// parameters.
    pub fn ratio_spectrum(&self) -> OpusResult<Option<RatioSpectrum>> {
        spectrum::extract_ratio(self)
    }
}
