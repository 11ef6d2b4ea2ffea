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

//! Named, typed parameter records and the `END`-terminated lists they form.
//!
//! A record is laid out as
//!
//! | bytes | content                                                  |
//! |-------|----------------------------------------------------------|
//! | 4     | name: up to 3 characters, null padded                    |
//! | 2     | type code, see [`ParameterType`]                         |
//! | 2     | reserved space, in 16-bit words                          |
//! | *n*   | value, absent when the name is `END`                     |
//!
//! The value is a 4-byte integer, an 8-byte double, or `reserved space * 2` bytes of
//! null-padded text, depending on the type code.

use crate::{
    OpusResult,
    error::Details,
    util::{decode_latin1, encode_latin1, read_f64, read_i32, read_u16, safe_len},
};
use serde::Serialize;
use std::io::Read;
use strum_macros::{EnumIter, FromRepr, IntoStaticStr};

/// Name of the sentinel record closing every parameter list.
pub const END: &str = "END";

const NAME_WIDTH: usize = 4;
const RECORD_HEADER_LEN: usize = NAME_WIDTH + 2 + 2;

/// The type code of a parameter record.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, EnumIter, FromRepr, IntoStaticStr,
)]
#[repr(u16)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ParameterType {
    Int32 = 0,
    Real64 = 1,
    String = 2,
    Enum = 3,
    SignedEnum = 4,
}

impl ParameterType {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn is_text(self) -> bool {
        matches!(
            self,
            ParameterType::String | ParameterType::Enum | ParameterType::SignedEnum
        )
    }
}

/// The decoded value of a parameter, tagged by its type.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Int32(i32),
    Real64(f64),
    String(String),
    Enum(String),
    SignedEnum(String),
}

impl ParameterValue {
    pub fn kind(&self) -> ParameterType {
        match self {
            ParameterValue::Int32(_) => ParameterType::Int32,
            ParameterValue::Real64(_) => ParameterType::Real64,
            ParameterValue::String(_) => ParameterType::String,
            ParameterValue::Enum(_) => ParameterType::Enum,
            ParameterValue::SignedEnum(_) => ParameterType::SignedEnum,
        }
    }

    /// The value as a number, for `Int32` and `Real64` parameters.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::Int32(n) => Some(f64::from(*n)),
            ParameterValue::Real64(x) => Some(*x),
            _ => None,
        }
    }

    /// The value as text, for `String`, `Enum` and `SignedEnum` parameters.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::String(s) | ParameterValue::Enum(s) | ParameterValue::SignedEnum(s) => {
                Some(s)
            }
            _ => None,
        }
    }
}

/// One parameter record.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParameterType,
    /// Space reserved for the value, in 16-bit words. Only text values are sized by it.
    pub reserved_space: u16,
    /// `None` for the `END` sentinel.
    pub value: Option<ParameterValue>,
}

impl Parameter {
    /// A parameter holding `value`.
    ///
    /// Numeric values reserve no space. Text values reserve enough 16-bit words for the text and
    /// its null terminator.
    pub fn new(name: impl Into<String>, value: ParameterValue) -> Self {
        let reserved_space = match value.as_str() {
            Some(text) => u16::try_from((text.chars().count() + 2) / 2).unwrap_or(u16::MAX),
            None => 0,
        };
        Self {
            name: name.into(),
            kind: value.kind(),
            reserved_space,
            value: Some(value),
        }
    }

    pub fn with_reserved_space(mut self, reserved_space: u16) -> Self {
        self.reserved_space = reserved_space;
        self
    }

    /// The sentinel closing a parameter list.
    pub fn end() -> Self {
        Self {
            name: END.to_string(),
            kind: ParameterType::Int32,
            reserved_space: 0,
            value: None,
        }
    }

    pub fn is_end(&self) -> bool {
        self.name == END
    }

    /// Number of bytes [`encode_one`] writes for this record.
    pub fn encoded_len(&self) -> usize {
        if self.is_end() {
            return RECORD_HEADER_LEN;
        }
        RECORD_HEADER_LEN + value_width(self.kind, self.reserved_space)
    }
}

fn value_width(kind: ParameterType, reserved_space: u16) -> usize {
    match kind {
        ParameterType::Int32 => 4,
        ParameterType::Real64 => 8,
        ParameterType::String | ParameterType::Enum | ParameterType::SignedEnum => {
            usize::from(reserved_space) * 2
        }
    }
}

/// An ordered parameter list, always closed by exactly one `END` sentinel.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParameterList(Vec<Parameter>);

impl ParameterList {
    /// Build a list from `parameters`, appending the sentinel when it is missing.
    ///
    /// A sentinel anywhere but in last position is rejected.
    pub fn new(mut parameters: Vec<Parameter>) -> OpusResult<Self> {
        check_sentinel(&parameters)?;
        if !parameters.last().is_some_and(Parameter::is_end) {
            parameters.push(Parameter::end());
        }
        Ok(Self(parameters))
    }

    /// The value of the first parameter called `name`.
    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.iter()
            .find(|p| p.name == name)
            .and_then(|p| p.value.as_ref())
    }

    /// The parameters, without the sentinel.
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.0.iter().filter(|p| !p.is_end())
    }

    /// All records, sentinel included.
    pub fn as_slice(&self) -> &[Parameter] {
        &self.0
    }

    /// Number of bytes the encoded list occupies.
    pub fn encoded_len(&self) -> usize {
        self.0.iter().map(Parameter::encoded_len).sum()
    }
}

fn check_sentinel(parameters: &[Parameter]) -> OpusResult<()> {
    let len = parameters.len();
    match parameters.iter().position(Parameter::is_end) {
        Some(index) if index + 1 != len => {
            Err(Details::MisplacedEndSentinel { index, len }.into())
        }
        _ => Ok(()),
    }
}

/// Decode a single parameter record.
pub fn decode_one<R: Read>(reader: &mut R) -> OpusResult<Parameter> {
    let mut name = [0u8; NAME_WIDTH];
    reader
        .read_exact(&mut name)
        .map_err(Details::ReadParameter)?;
    let name = decode_latin1(&name);
    let code = read_u16(reader).map_err(Details::ReadParameter)?;
    let kind = ParameterType::from_repr(code)
        .ok_or_else(|| Details::UnknownParameterType {
            name: name.clone(),
            code,
        })?;
    let reserved_space = read_u16(reader).map_err(Details::ReadParameter)?;

    if name == END {
        return Ok(Parameter {
            name,
            kind,
            reserved_space,
            value: None,
        });
    }

    let value = match kind {
        ParameterType::Int32 => {
            ParameterValue::Int32(read_i32(reader).map_err(Details::ReadParameter)?)
        }
        ParameterType::Real64 => {
            ParameterValue::Real64(read_f64(reader).map_err(Details::ReadParameter)?)
        }
        ParameterType::String | ParameterType::Enum | ParameterType::SignedEnum => {
            let mut buf = vec![0u8; safe_len(value_width(kind, reserved_space))?];
            reader
                .read_exact(&mut buf)
                .map_err(Details::ReadParameter)?;
            let text = decode_latin1(&buf);
            match kind {
                ParameterType::String => ParameterValue::String(text),
                ParameterType::Enum => ParameterValue::Enum(text),
                _ => ParameterValue::SignedEnum(text),
            }
        }
    };

    Ok(Parameter {
        name,
        kind,
        reserved_space,
        value: Some(value),
    })
}

/// Decode records until the `END` sentinel, which is included in the result.
pub fn decode_list<R: Read>(reader: &mut R) -> OpusResult<ParameterList> {
    let mut parameters = Vec::new();
    loop {
        let parameter = decode_one(reader)?;
        let done = parameter.is_end();
        parameters.push(parameter);
        if done {
            return Ok(ParameterList(parameters));
        }
    }
}

/// Append the encoded record to `buffer`.
pub fn encode_one(parameter: &Parameter, buffer: &mut Vec<u8>) -> OpusResult<()> {
    let name = encode_latin1(&parameter.name)
        .filter(|name| (1..NAME_WIDTH).contains(&name.len()) && !name.contains(&0))
        .ok_or_else(|| Details::InvalidParameterName(parameter.name.clone()))?;
    buffer.extend_from_slice(&name);
    buffer.resize(buffer.len() + NAME_WIDTH - name.len(), 0);
    buffer.extend_from_slice(&parameter.kind.code().to_le_bytes());
    buffer.extend_from_slice(&parameter.reserved_space.to_le_bytes());

    if parameter.is_end() {
        return Ok(());
    }

    let mismatch = || Details::ParameterValueMismatch {
        name: parameter.name.clone(),
        declared: parameter.kind.into(),
        actual: parameter.value.as_ref().map(|v| v.kind().into()),
    };
    let value = parameter.value.as_ref().ok_or_else(mismatch)?;
    if value.kind() != parameter.kind {
        return Err(mismatch().into());
    }

    match value {
        ParameterValue::Int32(n) => buffer.extend_from_slice(&n.to_le_bytes()),
        ParameterValue::Real64(x) => buffer.extend_from_slice(&x.to_le_bytes()),
        ParameterValue::String(text)
        | ParameterValue::Enum(text)
        | ParameterValue::SignedEnum(text) => {
            let bytes = encode_latin1(text)
                .ok_or_else(|| Details::ParameterValueNotLatin1(parameter.name.clone()))?;
            let width = value_width(parameter.kind, parameter.reserved_space);
            if bytes.len() > width {
                return Err(Details::ParameterValueTooLong {
                    name: parameter.name.clone(),
                    needed: bytes.len(),
                    reserved: width,
                }
                .into());
            }
            buffer.extend_from_slice(&bytes);
            buffer.resize(buffer.len() + width - bytes.len(), 0);
        }
    }
    Ok(())
}

/// Append the encoded list to `buffer`, closing it with a sentinel if `parameters` lacks one.
pub fn encode_list(parameters: &[Parameter], buffer: &mut Vec<u8>) -> OpusResult<()> {
    check_sentinel(parameters)?;
    for parameter in parameters {
        encode_one(parameter, buffer)?;
    }
    if !parameters.last().is_some_and(Parameter::is_end) {
        encode_one(&Parameter::end(), buffer)?;
    }
    Ok(())
}
