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

//! Logic handling writing OPUS files at user level.
//!
//! [`Writer`] lays blocks out back to back: the header, the directory (itself the first block),
//! then every payload in the order the blocks were added. [`build`] uses it to write a single
//! ratio spectrum with its data status parameters and a comment.

use crate::{
    OpusResult,
    block_type::BlockType,
    directory::{self, ENTRY_WORDS, EntryRecord},
    error::Details,
    parameter::{self, Parameter, ParameterList, ParameterValue},
    payload::{FloatArray, Payload, PayloadKind, StringBlob},
    reader::{HEADER_LEN, Header},
    spectrum::{PARAM_DATA_STATUS, Spectrum, TYPE_RATIO},
    util::encode_latin1,
};
use log::debug;
use std::{io::Write, path::Path};
use tempfile::NamedTempFile;

/// Version number stamped into files written by this crate.
pub const DEFAULT_VERSION: f64 = 920622.0;

/// Words reserved for the data status parameters written by [`build`].
pub const DATA_STATUS_WORDS: u32 = 30;

#[derive(Debug)]
struct PendingBlock {
    block_type: BlockType,
    block_length: u32,
    payload: Payload,
}

/// Assembles an OPUS file from typed blocks.
///
/// ```
/// # use opus_file::{Writer, OpusFile, block_type::BlockType};
/// let mut writer = Writer::builder().build();
/// writer.push_float_array(
///     BlockType { complex: 1, kind: 2, data: 1, ..Default::default() },
///     vec![0.5, 0.75],
/// )?;
/// let file = OpusFile::parse(writer.into_bytes()?)?;
/// assert_eq!(file.blocks().count(), 2);
/// # Ok::<(), opus_file::Error>(())
/// ```
#[derive(Debug)]
pub struct Writer {
    version: f64,
    blocks: Vec<PendingBlock>,
}

#[bon::bon]
impl Writer {
    #[builder(finish_fn = build)]
    pub fn builder(#[builder(default = DEFAULT_VERSION)] version: f64) -> Self {
        Self {
            version,
            blocks: Vec::new(),
        }
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Writer {
    /// Append a parameter list block, sized to fit the encoded list.
    pub fn push_parameter_list(
        &mut self,
        block_type: BlockType,
        list: ParameterList,
    ) -> OpusResult<&mut Self> {
        let words = words_for(list.encoded_len())?;
        self.push_parameter_list_with_length(block_type, list, words)
    }

    /// Append a parameter list block declaring `words` 32-bit words. The space the encoded list
    /// does not use is zero filled.
    pub fn push_parameter_list_with_length(
        &mut self,
        block_type: BlockType,
        list: ParameterList,
        words: u32,
    ) -> OpusResult<&mut Self> {
        let needed = words_for(list.encoded_len())?;
        if needed > words {
            return Err(Details::ReservedLengthTooSmall {
                needed,
                reserved: words,
            }
            .into());
        }
        self.push(block_type, words, Payload::ParameterList(list))
    }

    /// Append a float array block. Its length is the element count.
    pub fn push_float_array(
        &mut self,
        block_type: BlockType,
        values: Vec<f32>,
    ) -> OpusResult<&mut Self> {
        let len = u32::try_from(values.len()).map_err(|_| Details::LayoutOverflow)?;
        self.push(
            block_type,
            len,
            Payload::FloatArray(FloatArray::from_values(values)),
        )
    }

    /// Append a string blob block. `bytes` must already be padded to a multiple of 4.
    pub fn push_string_blob(
        &mut self,
        block_type: BlockType,
        bytes: Vec<u8>,
    ) -> OpusResult<&mut Self> {
        if bytes.len() % 4 != 0 {
            return Err(Details::UnalignedStringBlob(bytes.len()).into());
        }
        let words = words_for(bytes.len())?;
        self.push(
            block_type,
            words,
            Payload::StringBlob(StringBlob::new(bytes)),
        )
    }

    fn push(
        &mut self,
        block_type: BlockType,
        block_length: u32,
        payload: Payload,
    ) -> OpusResult<&mut Self> {
        block_type.encode()?;
        let expected = PayloadKind::of(&block_type);
        if expected != payload.kind() {
            return Err(Details::PayloadKindMismatch {
                block_type: block_type.to_string(),
                expected,
                actual: payload.kind(),
            }
            .into());
        }
        self.blocks.push(PendingBlock {
            block_type,
            block_length,
            payload,
        });
        Ok(self)
    }

    /// Assign offsets and serialize the file.
    ///
    /// The directory block comes first, at offset 24, declaring 3 words per entry. Each following
    /// block starts where the previous one ends, `4 * block_length` bytes later.
    pub fn into_bytes(self) -> OpusResult<Vec<u8>> {
        let count = u32::try_from(self.blocks.len() + 1).map_err(|_| Details::LayoutOverflow)?;
        let directory_words = count
            .checked_mul(ENTRY_WORDS)
            .ok_or(Details::LayoutOverflow)?;

        let lengths = std::iter::once((BlockType::directory(), directory_words)).chain(
            self.blocks
                .iter()
                .map(|block| (block.block_type, block.block_length)),
        );
        let mut records = Vec::with_capacity(self.blocks.len() + 1);
        let mut pointer = HEADER_LEN;
        for (block_type, block_length) in lengths {
            records.push(EntryRecord {
                block_type,
                block_length,
                data_pointer: pointer,
            });
            pointer = block_length
                .checked_mul(4)
                .and_then(|len| pointer.checked_add(len))
                .ok_or(Details::LayoutOverflow)?;
        }
        debug!("Laid out {count} blocks in {pointer} bytes");

        let header = Header {
            version: self.version,
            first_dir_pointer: HEADER_LEN,
            max_dir_size: count,
            curr_dir_size: count,
        };
        let mut buffer = Vec::with_capacity(pointer as usize);
        header.encode(&mut buffer);
        directory::encode(&records, &mut buffer)?;

        for (block, record) in self.blocks.iter().zip(&records[1..]) {
            let start = buffer.len();
            match &block.payload {
                Payload::ParameterList(list) => {
                    parameter::encode_list(list.as_slice(), &mut buffer)?
                }
                Payload::FloatArray(array) => array.encode(&mut buffer),
                Payload::StringBlob(blob) => buffer.extend_from_slice(blob.as_bytes()),
                Payload::None => {}
            }
            buffer.resize(start + record.block_length as usize * 4, 0);
        }
        Ok(buffer)
    }
}

fn words_for(bytes: usize) -> OpusResult<u32> {
    u32::try_from(bytes.div_ceil(4)).map_err(|_| Details::LayoutOverflow.into())
}

/// Pad `comment` with spaces up to the next multiple of 4 characters.
fn pad_comment(comment: &str) -> OpusResult<Vec<u8>> {
    let mut bytes = encode_latin1(comment).ok_or(Details::CommentNotLatin1)?;
    let padded = bytes.len().next_multiple_of(4);
    bytes.resize(padded, b' ');
    Ok(bytes)
}

/// Encode a spectrum and a comment as a complete OPUS file.
///
/// The file holds four blocks: the directory, the amplitude as a ratio float array, its data
/// status parameters and the comment. An unevenly spaced band axis is first resampled onto an
/// even grid (see [`Spectrum::into_evenly_spaced`]). The band axis itself is only stored through
/// its end points, truncated to integers in the `FXV` and `LXV` parameters.
pub fn build(band_axis: &[f64], amplitude: &[f64], comment: &str) -> OpusResult<Vec<u8>> {
    let spectrum = Spectrum::new(band_axis.to_vec(), amplitude.to_vec())?.into_evenly_spaced();
    let comment = pad_comment(comment)?;

    let bands = spectrum.band_axis();
    let values = spectrum.amplitude();
    let points = i32::try_from(spectrum.len()).map_err(|_| Details::LayoutOverflow)?;
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);

    let data_status = ParameterList::new(vec![
        Parameter::new("DPF", ParameterValue::Int32(1)),
        Parameter::new("NPT", ParameterValue::Int32(points)),
        Parameter::new("FXV", ParameterValue::Int32(bands[0] as i32)),
        Parameter::new("LXV", ParameterValue::Int32(bands[bands.len() - 1] as i32)),
        Parameter::new("CSF", ParameterValue::Real64(1.0)),
        Parameter::new("MXY", ParameterValue::Real64(max)),
        Parameter::new("MNY", ParameterValue::Real64(min)),
        Parameter::new("DXU", ParameterValue::Enum("WN".to_string())),
    ])?;

    let data_type = BlockType {
        complex: 1,
        kind: TYPE_RATIO,
        data: 1,
        ..BlockType::default()
    };
    let status_type = BlockType {
        param: PARAM_DATA_STATUS,
        ..data_type
    };
    let comment_type = BlockType {
        extend: 5,
        ..BlockType::default()
    };

    let mut writer = Writer::default();
    writer
        .push_float_array(data_type, values.iter().map(|&v| v as f32).collect())?
        .push_parameter_list_with_length(status_type, data_status, DATA_STATUS_WORDS)?
        .push_string_blob(comment_type, comment)?;
    writer.into_bytes()
}

/// [`build`] the file and write it to `path`.
///
/// The bytes go to a temporary file in the same directory which is then renamed over `path`, so
/// readers never observe a partially written file.
pub fn write_file(
    path: impl AsRef<Path>,
    band_axis: &[f64],
    amplitude: &[f64],
    comment: &str,
) -> OpusResult<()> {
    let bytes = build(band_axis, amplitude, comment)?;
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir).map_err(Details::WriteFile)?;
    file.write_all(&bytes).map_err(Details::WriteFile)?;
    file.as_file().sync_all().map_err(Details::WriteFile)?;
    file.persist(path).map_err(|e| Details::PersistFile(e.error))?;
    Ok(())
}
