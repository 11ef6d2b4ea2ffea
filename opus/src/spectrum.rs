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

//! Spectra as written to and read back from OPUS files.

use crate::{
    OpusFile, OpusResult,
    block_type::BlockType,
    error::Details,
    parameter::ParameterList,
};
use log::{debug, warn};
use serde::Serialize;

/// Successive band differences with a larger (population) standard deviation than this are
/// considered unevenly spaced.
pub const SPACING_TOLERANCE: f64 = 0.001;

/// `type` code of ratio blocks.
pub const TYPE_RATIO: u8 = 3;
/// `param` code of data status parameter blocks.
pub const PARAM_DATA_STATUS: u8 = 1;
/// `param` code of sample origin parameter blocks.
pub const PARAM_SAMPLE_ORIGIN: u8 = 10;

/// A band axis with one amplitude per band.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Spectrum {
    band_axis: Vec<f64>,
    amplitude: Vec<f64>,
}

impl Spectrum {
    /// Fails unless both sequences have the same length of at least 2 and every band is finite.
    pub fn new(band_axis: Vec<f64>, amplitude: Vec<f64>) -> OpusResult<Self> {
        if band_axis.len() != amplitude.len() {
            return Err(Details::AxisLengthMismatch {
                band_axis: band_axis.len(),
                amplitude: amplitude.len(),
            }
            .into());
        }
        if band_axis.len() < 2 {
            return Err(Details::TooFewPoints(band_axis.len()).into());
        }
        if let Some(index) = band_axis.iter().position(|v| !v.is_finite()) {
            return Err(Details::NonFiniteBand {
                index,
                value: band_axis[index],
            }
            .into());
        }
        Ok(Self {
            band_axis,
            amplitude,
        })
    }

    pub fn band_axis(&self) -> &[f64] {
        &self.band_axis
    }

    pub fn amplitude(&self) -> &[f64] {
        &self.amplitude
    }

    pub fn len(&self) -> usize {
        self.band_axis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.band_axis.is_empty()
    }

    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>) {
        (self.band_axis, self.amplitude)
    }

    pub fn is_evenly_spaced(&self) -> bool {
        let steps: Vec<f64> = self.band_axis.windows(2).map(|w| w[1] - w[0]).collect();
        std_dev(&steps) <= SPACING_TOLERANCE
    }

    /// Resample onto an evenly spaced axis with the same end points and length, interpolating the
    /// amplitude linearly. Evenly spaced spectra are returned unchanged.
    pub fn into_evenly_spaced(self) -> Self {
        if self.is_evenly_spaced() {
            return self;
        }
        let n = self.len();
        let band_axis = linspace(self.band_axis[0], self.band_axis[n - 1], n);
        debug!(
            "Resampling {n} points onto an even grid from {} to {}",
            band_axis[0],
            band_axis[n - 1]
        );
        let amplitude = interpolate(&band_axis, &self.band_axis, &self.amplitude);
        Self {
            band_axis,
            amplitude,
        }
    }
}

/// The ratio spectrum of a file together with its sample description.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RatioSpectrum {
    /// Ascending band axis.
    pub band_axis: Vec<f64>,
    /// Amplitudes, already multiplied by the `CSF` scale factor.
    pub amplitude: Vec<f64>,
    pub sample_origin: Option<ParameterList>,
}

/// `n` evenly spaced values from `start` to `stop`, both included.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut values: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
            values[n - 1] = stop;
            values
        }
    }
}

fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

/// Piecewise linear interpolation of `(xp, fp)` at `x`, clamped to the end values.
///
/// `xp` must be monotonic; a descending `xp` is handled by walking it backwards.
pub fn interpolate(x: &[f64], xp: &[f64], fp: &[f64]) -> Vec<f64> {
    if xp.first() > xp.last() {
        let xp: Vec<f64> = xp.iter().rev().copied().collect();
        let fp: Vec<f64> = fp.iter().rev().copied().collect();
        return interpolate(x, &xp, &fp);
    }
    let (Some(&first), Some(&last)) = (xp.first(), xp.last()) else {
        return Vec::new();
    };
    x.iter()
        .map(|&x| {
            if x <= first {
                return fp[0];
            }
            if x >= last {
                return fp[fp.len() - 1];
            }
            // xp[i - 1] <= x < xp[i]
            let i = xp.partition_point(|&v| v <= x);
            let (x0, x1) = (xp[i - 1], xp[i]);
            let (y0, y1) = (fp[i - 1], fp[i]);
            if x1 == x0 {
                y0
            } else {
                y0 + (x - x0) * (y1 - y0) / (x1 - x0)
            }
        })
        .collect()
}

fn numeric(params: &ParameterList, name: &'static str) -> OpusResult<f64> {
    params
        .get(name)
        .ok_or(Details::MissingParameter(name))?
        .as_f64()
        .ok_or_else(|| Details::ParameterNotNumeric(name).into())
}

pub(crate) fn extract_ratio(file: &OpusFile) -> OpusResult<Option<RatioSpectrum>> {
    let sample_origin_type = BlockType {
        param: PARAM_SAMPLE_ORIGIN,
        ..BlockType::default()
    };
    let mut status = None;
    let mut data = None;
    let mut sample_origin = None;

    for entry in file.blocks() {
        let block_type = &entry.block_type;
        if *block_type == sample_origin_type {
            sample_origin = entry.payload.as_parameter_list();
            continue;
        }
        if block_type.kind != TYPE_RATIO {
            continue;
        }
        if block_type.param == PARAM_DATA_STATUS {
            status = entry.payload.as_parameter_list();
        } else if let Some(array) = entry.payload.as_float_array() {
            data = Some(array);
        }
    }

    let (Some(status), Some(data)) = (status, data) else {
        debug!("No ratio spectrum in file");
        return Ok(None);
    };

    let mut amplitude: Vec<f64> = data.values().iter().map(|&v| f64::from(v)).collect();
    // Some instruments write a spurious exact zero at either end.
    if amplitude.len() > 1 && amplitude[0] == 0.0 && amplitude[1] > 1.0 {
        warn!("Dropping spurious zero at the start of the ratio data");
        amplitude.remove(0);
    }
    let n = amplitude.len();
    if n > 1 && amplitude[n - 1] == 0.0 && amplitude[n - 2] > 1.0 {
        warn!("Dropping spurious zero at the end of the ratio data");
        amplitude.pop();
    }

    let scale = numeric(status, "CSF")?;
    let first = numeric(status, "FXV")?;
    let last = numeric(status, "LXV")?;
    for value in &mut amplitude {
        *value *= scale;
    }
    let mut band_axis = linspace(first, last, amplitude.len());
    if first > last {
        band_axis.reverse();
        amplitude.reverse();
    }

    Ok(Some(RatioSpectrum {
        band_axis,
        amplitude,
        sample_origin: sample_origin.cloned(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Writer,
        error::ErrorKind,
        parameter::{Parameter, ParameterValue},
    };
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    type TestResult = anyhow::Result<()>;

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn new_checks_lengths() {
        let err = Spectrum::new(vec![1.0, 2.0], vec![1.0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(matches!(
            err.details(),
            Details::AxisLengthMismatch {
                band_axis: 2,
                amplitude: 1
            }
        ));

        let err = Spectrum::new(vec![1.0], vec![1.0]).unwrap_err();
        assert!(matches!(err.details(), Details::TooFewPoints(1)));
        assert!(Spectrum::new(vec![], vec![]).is_err());
    }

    #[rstest]
    #[case(vec![f64::NAN, 1.0, 2.0], 0)]
    #[case(vec![0.0, f64::INFINITY], 1)]
    #[case(vec![0.0, 1.0, f64::NEG_INFINITY], 2)]
    fn new_rejects_non_finite_bands(#[case] band_axis: Vec<f64>, #[case] expected: usize) {
        let amplitude = vec![1.0; band_axis.len()];
        let err = Spectrum::new(band_axis, amplitude).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(matches!(
            err.details(),
            Details::NonFiniteBand { index, .. } if *index == expected
        ));
    }

    #[test]
    fn uneven_axis_is_resampled() -> TestResult {
        let spectrum = Spectrum::new(vec![0.0, 1.0, 2.0, 10.0], vec![0.0, 1.0, 2.0, 10.0])?;
        assert!(!spectrum.is_evenly_spaced());
        let resampled = spectrum.into_evenly_spaced();
        assert_close(resampled.band_axis(), &[0.0, 10.0 / 3.0, 20.0 / 3.0, 10.0]);
        // The amplitude equals the band value, so interpolation reproduces the new axis.
        assert_close(resampled.amplitude(), &[0.0, 10.0 / 3.0, 20.0 / 3.0, 10.0]);
        Ok(())
    }

    #[test]
    fn even_axis_is_unchanged() -> TestResult {
        let spectrum = Spectrum::new(vec![0.0, 1.0, 2.0, 3.0], vec![5.0, 4.0, 3.0, 9.0])?;
        assert!(spectrum.is_evenly_spaced());
        assert_eq!(spectrum.clone().into_evenly_spaced(), spectrum);

        let descending = Spectrum::new(vec![4000.0, 3999.5, 3999.0], vec![1.0, 2.0, 3.0])?;
        assert!(descending.is_evenly_spaced());
        Ok(())
    }

    #[test]
    fn descending_axis_is_resampled_in_place() -> TestResult {
        let spectrum = Spectrum::new(vec![10.0, 2.0, 1.0, 0.0], vec![10.0, 2.0, 1.0, 0.0])?;
        let resampled = spectrum.into_evenly_spaced();
        assert_close(resampled.band_axis(), &[10.0, 20.0 / 3.0, 10.0 / 3.0, 0.0]);
        assert_close(resampled.amplitude(), &[10.0, 20.0 / 3.0, 10.0 / 3.0, 0.0]);
        Ok(())
    }

    #[test]
    fn linspace_hits_both_ends() {
        assert_eq!(linspace(1000.0, 1099.0, 100)[99], 1099.0);
        assert_eq!(linspace(0.0, 1.0, 3), vec![0.0, 0.5, 1.0]);
        assert_eq!(linspace(3.0, 4.0, 1), vec![3.0]);
        assert!(linspace(3.0, 4.0, 0).is_empty());
    }

    fn ratio_file(values: Vec<f32>, status: Vec<Parameter>) -> anyhow::Result<OpusFile> {
        let data = BlockType {
            complex: 1,
            kind: TYPE_RATIO,
            data: 1,
            ..BlockType::default()
        };
        let mut writer = Writer::default();
        writer
            .push_float_array(data, values)?
            .push_parameter_list(
                BlockType {
                    param: PARAM_DATA_STATUS,
                    ..data
                },
                ParameterList::new(status)?,
            )?
            .push_parameter_list(
                BlockType {
                    param: PARAM_SAMPLE_ORIGIN,
                    ..BlockType::default()
                },
                ParameterList::new(vec![Parameter::new(
                    "SNM",
                    ParameterValue::String("KBr".to_string()),
                )])?,
            )?;
        Ok(OpusFile::parse(writer.into_bytes()?)?)
    }

    fn status(csf: f64, fxv: f64, lxv: f64) -> Vec<Parameter> {
        vec![
            Parameter::new("CSF", ParameterValue::Real64(csf)),
            Parameter::new("FXV", ParameterValue::Real64(fxv)),
            Parameter::new("LXV", ParameterValue::Real64(lxv)),
        ]
    }

    #[test]
    fn ratio_values_are_trimmed_and_scaled() -> TestResult {
        let file = ratio_file(vec![0.0, 2.0, 3.0, 0.0], status(0.5, 100.0, 200.0))?;
        let spectrum = file.ratio_spectrum()?.expect("ratio spectrum");
        assert_eq!(spectrum.band_axis, vec![100.0, 200.0]);
        assert_eq!(spectrum.amplitude, vec![1.0, 1.5]);
        let origin = spectrum.sample_origin.expect("sample origin");
        assert_eq!(origin.get("SNM").and_then(ParameterValue::as_str), Some("KBr"));
        Ok(())
    }

    #[test]
    fn small_edge_zeros_are_kept() -> TestResult {
        let file = ratio_file(vec![0.0, 0.5, 0.0], status(1.0, 1.0, 3.0))?;
        let spectrum = file.ratio_spectrum()?.expect("ratio spectrum");
        assert_eq!(spectrum.amplitude, vec![0.0, 0.5, 0.0]);
        assert_eq!(spectrum.band_axis, vec![1.0, 2.0, 3.0]);
        Ok(())
    }

    #[test]
    fn descending_ratio_axis_is_flipped() -> TestResult {
        let file = ratio_file(vec![0.25, 0.5, 0.75], status(2.0, 30.0, 10.0))?;
        let spectrum = file.ratio_spectrum()?.expect("ratio spectrum");
        assert_eq!(spectrum.band_axis, vec![10.0, 20.0, 30.0]);
        assert_eq!(spectrum.amplitude, vec![1.5, 1.0, 0.5]);
        Ok(())
    }

    #[test]
    fn incomplete_data_status_is_a_format_error() -> TestResult {
        let file = ratio_file(
            vec![1.0, 2.0],
            vec![Parameter::new("FXV", ParameterValue::Int32(1))],
        )?;
        let err = file.ratio_spectrum().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(matches!(err.details(), Details::MissingParameter("CSF")));

        let mut fields = status(1.0, 1.0, 2.0);
        fields[0] = Parameter::new("CSF", ParameterValue::Enum("X".to_string()));
        let err = ratio_file(vec![1.0, 2.0], fields)?
            .ratio_spectrum()
            .unwrap_err();
        assert!(matches!(err.details(), Details::ParameterNotNumeric("CSF")));
        Ok(())
    }

    #[test]
    fn interpolate_clamps_outside_range() {
        let values = interpolate(&[-1.0, 0.5, 3.0], &[0.0, 1.0, 2.0], &[0.0, 10.0, 20.0]);
        assert_eq!(values, vec![0.0, 5.0, 20.0]);
    }
}
