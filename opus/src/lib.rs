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

//! # opus-file
//!
//! Reading and writing of OPUS files, the binary container Bruker spectrometers use for FTIR and
//! Raman measurements.
//!
//! An OPUS file is a 24-byte header followed by a directory of fixed-size entries. Every entry
//! carries a bit-packed [`BlockType`], a length and an absolute offset to its payload. Depending on
//! the block type the payload is a list of named [`Parameter`]s, an array of `f32` values or a
//! block of text.
//!
//! ## Reading
//!
//! ```
//! # use opus_file::{OpusFile, Payload, build};
//! # let bytes = build(&[1000.0, 1001.0, 1002.0], &[0.5, 0.25, 0.125], "sample")?;
//! let file = OpusFile::parse(bytes)?;
//! for entry in file.blocks() {
//!     if let Payload::ParameterList(list) = &entry.payload {
//!         println!("{}: {:?}", entry.block_type, list.get("NPT"));
//!     }
//! }
//! let spectrum = file.ratio_spectrum()?.expect("ratio data");
//! assert_eq!(spectrum.band_axis, vec![1000.0, 1001.0, 1002.0]);
//! # Ok::<(), opus_file::Error>(())
//! ```
//!
//! Float arrays are decoded lazily by default, on first access. See [`OpusFile::reader`] to
//! decode them eagerly.
//!
//! ## Writing
//!
//! [`build`] encodes a single spectrum with a comment, [`write_file`] does the same straight to
//! disk. [`Writer`] assembles arbitrary block sequences.
//!
//! Decoding allocations are capped by [`util::max_allocation_bytes`].

mod reader;
mod spectrum;
mod writer;

pub mod block_type;
pub mod directory;
pub mod error;
pub mod labels;
pub mod parameter;
pub mod payload;
pub mod util;

pub use block_type::BlockType;
pub use directory::{DirectoryEntry, EntryRecord};
pub use error::{Error, ErrorKind};
pub use parameter::{Parameter, ParameterList, ParameterType, ParameterValue};
pub use payload::{ArrayLoading, FloatArray, Payload, PayloadKind, StringBlob};
pub use reader::{HEADER_LEN, Header, MAGIC, OpusFile};
pub use spectrum::{RatioSpectrum, Spectrum, interpolate, linspace};
pub use writer::{DATA_STATUS_WORDS, DEFAULT_VERSION, Writer, build, write_file};

/// A convenience type alias for `Result`s with `Error`s.
pub type OpusResult<T> = Result<T, Error>;
