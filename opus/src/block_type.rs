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

//! The 32-bit block type tag of a directory entry.
//!
//! The tag packs six small codes. Bit numbering starts at the least-significant bit:
//!
//! | field     | offset | width |
//! |-----------|--------|-------|
//! | `complex` | 0      | 2     |
//! | `type`    | 2      | 2     |
//! | `param`   | 4      | 6     |
//! | `data`    | 10     | 7     |
//! | `deriv`   | 17     | 2     |
//! | `extend`  | 19     | 3     |
//!
//! Bits 22 to 31 belong to no known field. They are dropped by [`BlockType::decode`] and
//! written as zero by [`BlockType::encode`].

use crate::{OpusResult, error::Details, labels};
use serde::Serialize;
use std::fmt;

/// Position of one code inside the packed tag.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BitField {
    pub name: &'static str,
    pub shift: u32,
    pub width: u32,
}

impl BitField {
    const fn new(name: &'static str, shift: u32, width: u32) -> Self {
        Self { name, shift, width }
    }

    /// The unshifted mask covering `width` bits.
    pub const fn mask(&self) -> u32 {
        (1 << self.width) - 1
    }

    pub const fn extract(&self, word: u32) -> u8 {
        ((word >> self.shift) & self.mask()) as u8
    }

    fn insert(&self, value: u8) -> OpusResult<u32> {
        let value = u32::from(value);
        if value > self.mask() {
            return Err(Details::BlockTypeFieldOverflow {
                field: self.name,
                value: value as u8,
                width: self.width,
            }
            .into());
        }
        Ok(value << self.shift)
    }
}

pub const COMPLEX: BitField = BitField::new("complex", 0, 2);
pub const TYPE: BitField = BitField::new("type", 2, 2);
pub const PARAM: BitField = BitField::new("param", 4, 6);
pub const DATA: BitField = BitField::new("data", 10, 7);
pub const DERIV: BitField = BitField::new("deriv", 17, 2);
pub const EXTEND: BitField = BitField::new("extend", 19, 3);

/// Bits used by any known field.
pub const KNOWN_BITS: u32 = (1 << 22) - 1;

/// `data` code of the block describing the directory itself.
pub const DATA_DIRECTORY: u8 = 13;

/// The unpacked block type tag.
///
/// Codes are kept verbatim, including values the descriptive tables in [`labels`] don't know.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize)]
pub struct BlockType {
    pub complex: u8,
    /// Sample, reference or ratio. Stored in the `type` bits.
    #[serde(rename = "type")]
    pub kind: u8,
    pub param: u8,
    pub data: u8,
    pub deriv: u8,
    pub extend: u8,
}

impl BlockType {
    pub fn decode(word: u32) -> Self {
        Self {
            complex: COMPLEX.extract(word),
            kind: TYPE.extract(word),
            param: PARAM.extract(word),
            data: DATA.extract(word),
            deriv: DERIV.extract(word),
            extend: EXTEND.extract(word),
        }
    }

    /// Pack the fields back into a tag.
    ///
    /// Fails with [`Details::BlockTypeFieldOverflow`] when a code is wider than its field.
    pub fn encode(&self) -> OpusResult<u32> {
        Ok(COMPLEX.insert(self.complex)?
            | TYPE.insert(self.kind)?
            | PARAM.insert(self.param)?
            | DATA.insert(self.data)?
            | DERIV.insert(self.deriv)?
            | EXTEND.insert(self.extend)?)
    }

    /// The block whose payload is the directory itself.
    pub fn directory() -> Self {
        Self {
            data: DATA_DIRECTORY,
            ..Self::default()
        }
    }
}

impl fmt::Display for BlockType {
    /// Joins the descriptive names of the non-empty codes, e.g. `real ratio spectrum, undefined Y
    /// units data status parameters`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            labels::complex(self.complex),
            labels::kind(self.kind),
            labels::deriv(self.deriv),
            labels::extend(self.extend),
            labels::data(self.data),
            labels::param(self.param),
        ];
        let mut words = names.into_iter().filter(|name| !name.is_empty());
        if let Some(first) = words.next() {
            f.write_str(first)?;
            for word in words {
                write!(f, " {word}")?;
            }
            if self.param != 0 {
                f.write_str(" parameters")?;
            }
        } else if self.param != 0 {
            f.write_str("parameters")?;
        }
        Ok(())
    }
}
