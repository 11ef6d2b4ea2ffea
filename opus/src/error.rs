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

use std::{error::Error as _, fmt};

/// Errors encountered while reading or writing OPUS files.
///
/// To inspect the details of the error use [`details`](Self::details) or [`into_details`](Self::into_details)
/// to get a [`Details`] which contains more precise error information. [`kind`](Self::kind) tells
/// malformed input apart from rejected build arguments.
#[derive(thiserror::Error, Debug)]
#[repr(transparent)]
#[error(transparent)]
pub struct Error {
    details: Box<Details>,
}

impl Error {
    pub fn new(details: Details) -> Self {
        Self {
            details: Box::new(details),
        }
    }

    pub fn details(&self) -> &Details {
        &self.details
    }

    pub fn into_details(self) -> Details {
        *self.details
    }

    /// The class of failure this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        self.details.kind()
    }
}

impl From<Details> for Error {
    fn from(details: Details) -> Self {
        Self::new(details)
    }
}

/// Coarse classification of an [`Error`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// The input bytes are not a well-formed OPUS file.
    Format,
    /// The values handed to the writer cannot be encoded.
    Validation,
    /// Reading or writing a file on disk failed.
    Io,
}

#[derive(thiserror::Error)]
pub enum Details {
    #[error("Wrong magic in header: expected 0A 0A FE FE, found {0:02X?}")]
    HeaderMagic([u8; 4]),

    #[error("Failed to read header: {0}")]
    ReadHeader(#[source] std::io::Error),

    #[error("Failed to read directory entry {index} at offset {offset}: {source}")]
    ReadDirectory {
        index: usize,
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read parameter record: {0}")]
    ReadParameter(#[source] std::io::Error),

    #[error("Failed to read float array: {0}")]
    ReadFloatArray(#[source] std::io::Error),

    #[error("Failed to read string blob: {0}")]
    ReadStringBlob(#[source] std::io::Error),

    #[error("Unknown type code {code} for parameter '{name}'")]
    UnknownParameterType { name: String, code: u16 },

    #[error("Block of {length} bytes at offset {pointer} does not fit in a file of {size} bytes")]
    PointerOutOfBounds { pointer: u64, length: u64, size: u64 },

    #[error("Unable to allocate {desired} bytes (maximum allowed: {maximum})")]
    MemoryAllocation { desired: usize, maximum: usize },

    #[error("Parameter '{0}' is missing from the block")]
    MissingParameter(&'static str),

    #[error("Parameter '{0}' does not hold a numeric value")]
    ParameterNotNumeric(&'static str),

    #[error("Band axis has {band_axis} points but amplitude has {amplitude}")]
    AxisLengthMismatch { band_axis: usize, amplitude: usize },

    #[error("A spectrum needs at least 2 points, got {0}")]
    TooFewPoints(usize),

    #[error("Band axis value {value} at index {index} is not finite")]
    NonFiniteBand { index: usize, value: f64 },

    #[error("Block type field '{field}' value {value} does not fit in {width} bits")]
    BlockTypeFieldOverflow {
        field: &'static str,
        value: u8,
        width: u32,
    },

    #[error("Parameter name '{0}' must be 1 to 3 ISO-8859-1 characters")]
    InvalidParameterName(String),

    #[error("Parameter '{name}' is declared as {declared} but holds {actual:?}")]
    ParameterValueMismatch {
        name: String,
        declared: &'static str,
        actual: Option<&'static str>,
    },

    #[error("Value of parameter '{name}' needs {needed} bytes but only {reserved} are reserved")]
    ParameterValueTooLong {
        name: String,
        needed: usize,
        reserved: usize,
    },

    #[error("Value of parameter '{0}' contains characters outside ISO-8859-1")]
    ParameterValueNotLatin1(String),

    #[error("Comment contains characters outside ISO-8859-1")]
    CommentNotLatin1,

    #[error("Block type '{block_type}' announces a {expected:?} payload, got {actual:?}")]
    PayloadKindMismatch {
        block_type: String,
        expected: crate::payload::PayloadKind,
        actual: crate::payload::PayloadKind,
    },

    #[error("The END sentinel must be the last parameter of a list, found it at {index} of {len}")]
    MisplacedEndSentinel { index: usize, len: usize },

    #[error("String blob length {0} is not a multiple of 4 bytes")]
    UnalignedStringBlob(usize),

    #[error("Parameter list needs {needed} words but the block reserves {reserved}")]
    ReservedLengthTooSmall { needed: u32, reserved: u32 },

    #[error("Block layout exceeds the 32-bit offset range")]
    LayoutOverflow,

    #[error("Failed to read file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("Failed to write file: {0}")]
    WriteFile(#[source] std::io::Error),

    #[error("Failed to move the temporary file into place: {0}")]
    PersistFile(#[source] std::io::Error),
}

impl Details {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Details::HeaderMagic(_)
            | Details::ReadHeader(_)
            | Details::ReadDirectory { .. }
            | Details::ReadParameter(_)
            | Details::ReadFloatArray(_)
            | Details::ReadStringBlob(_)
            | Details::UnknownParameterType { .. }
            | Details::PointerOutOfBounds { .. }
            | Details::MemoryAllocation { .. }
            | Details::MissingParameter(_)
            | Details::ParameterNotNumeric(_) => ErrorKind::Format,
            Details::AxisLengthMismatch { .. }
            | Details::TooFewPoints(_)
            | Details::NonFiniteBand { .. }
            | Details::BlockTypeFieldOverflow { .. }
            | Details::InvalidParameterName(_)
            | Details::ParameterValueMismatch { .. }
            | Details::ParameterValueTooLong { .. }
            | Details::ParameterValueNotLatin1(_)
            | Details::CommentNotLatin1
            | Details::PayloadKindMismatch { .. }
            | Details::MisplacedEndSentinel { .. }
            | Details::UnalignedStringBlob(_)
            | Details::ReservedLengthTooSmall { .. }
            | Details::LayoutOverflow => ErrorKind::Validation,
            Details::ReadFile(_) | Details::WriteFile(_) | Details::PersistFile(_) => ErrorKind::Io,
        }
    }
}

impl fmt::Debug for Details {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut msg = self.to_string();
        if let Some(e) = self.source() {
            msg.extend([": ", &e.to_string()]);
        }
        write!(f, "{msg}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn kind_follows_details() {
        let err: Error = Details::HeaderMagic([0, 1, 2, 3]).into();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert_eq!(
            err.to_string(),
            "Wrong magic in header: expected 0A 0A FE FE, found [00, 01, 02, 03]"
        );

        let err: Error = Details::TooFewPoints(1).into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(matches!(err.into_details(), Details::TooFewPoints(1)));
    }

    #[test]
    fn debug_includes_source() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let details = Details::ReadHeader(io);
        assert_eq!(
            format!("{details:?}"),
            "Failed to read header: eof: eof"
        );
    }
}
