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

//! Descriptive names for block type codes.
//!
//! Each field has a static table indexed by code. Codes past the end of a table are reported as
//! [`UNKNOWN`]; the empty string means "not set".

pub const UNKNOWN: &str = "unknown";

static COMPLEX: [&str; 4] = ["", "real", "imaginary", "amplitude"];

static TYPE: [&str; 4] = ["", "sample", "reference", "ratio"];

static DERIV: [&str; 4] = ["", "first deriv", "second deriv", "nth deriv"];

static EXTEND: [&str; 6] = [
    "",
    "compound info",
    "peak table",
    "molecular structure",
    "macro",
    "command log",
];

static DATA: [&str; 20] = [
    "",
    "spectrum, undefined Y units",
    "interferogram",
    "phase spectrum",
    "absorbance spectrum",
    "transmittance spectrum",
    "kubelka-munck spectrum",
    "trace",
    "gc file (interferograms)",
    "gc file (spectra)",
    "raman spectrum",
    "emission spectrum",
    "reflectance spectrum",
    "directory",
    "power spectrum",
    "neg. log reflectance",
    "ATR spectrum",
    "photoacoustic spectrum",
    "arithmetics (transmittance)",
    "arithmetics (absorbance)",
];

static PARAM: [&str; 11] = [
    "",
    "data status",
    "instrument status",
    "acquisition",
    "FT",
    "plot/display",
    "processing",
    "GC",
    "library search",
    "communication",
    "sample origin",
];

fn lookup(table: &'static [&'static str], code: u8) -> &'static str {
    table.get(usize::from(code)).copied().unwrap_or(UNKNOWN)
}

pub fn complex(code: u8) -> &'static str {
    lookup(&COMPLEX, code)
}

pub fn kind(code: u8) -> &'static str {
    lookup(&TYPE, code)
}

pub fn deriv(code: u8) -> &'static str {
    lookup(&DERIV, code)
}

pub fn extend(code: u8) -> &'static str {
    lookup(&EXTEND, code)
}

pub fn data(code: u8) -> &'static str {
    lookup(&DATA, code)
}

pub fn param(code: u8) -> &'static str {
    lookup(&PARAM, code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn known_and_unknown_codes() {
        assert_eq!(kind(3), "ratio");
        assert_eq!(data(13), "directory");
        assert_eq!(param(10), "sample origin");
        assert_eq!(extend(5), "command log");
        assert_eq!(extend(6), UNKNOWN);
        assert_eq!(data(20), UNKNOWN);
        assert_eq!(param(63), UNKNOWN);
        assert_eq!(complex(0), "");
    }
}
