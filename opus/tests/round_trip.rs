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

use opus_file::{
    ArrayLoading, BlockType, ErrorKind, OpusFile, Payload, PayloadKind, Writer, build,
    error::Details, parameter::ParameterList, write_file,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

type TestResult = anyhow::Result<()>;

fn comment(file: &OpusFile) -> Option<String> {
    file.blocks()
        .find_map(|entry| entry.payload.as_string_blob())
        .map(|blob| blob.text())
}

#[test]
fn round_trip_of_an_evenly_spaced_spectrum() -> TestResult {
    let band_axis: Vec<f64> = (1000..1100).map(f64::from).collect();
    let amplitude: Vec<f64> = (0..100).map(|i| 0.5 + f64::from(i) * 0.125).collect();

    let file = OpusFile::parse(build(&band_axis, &amplitude, "test")?)?;
    let spectrum = file.ratio_spectrum()?.expect("ratio spectrum");

    assert_eq!(spectrum.band_axis, band_axis);
    assert_eq!(spectrum.amplitude, amplitude);
    assert_eq!(spectrum.sample_origin, None);
    assert_eq!(comment(&file).as_deref(), Some("test"));
    Ok(())
}

#[test]
fn round_trip_of_a_descending_axis() -> TestResult {
    let band_axis = [4000.0, 3999.0, 3998.0, 3997.0];
    let amplitude = [0.25, 0.5, 0.75, 1.0];

    let file = OpusFile::parse(build(&band_axis, &amplitude, "descending")?)?;
    let spectrum = file.ratio_spectrum()?.expect("ratio spectrum");

    // Ratio spectra come back on an ascending axis.
    assert_eq!(spectrum.band_axis, vec![3997.0, 3998.0, 3999.0, 4000.0]);
    assert_eq!(spectrum.amplitude, vec![1.0, 0.75, 0.5, 0.25]);
    assert_eq!(comment(&file).as_deref(), Some("descending"));
    Ok(())
}

#[rstest]
#[case::uneven(&[0.0, 1.0, 2.0, 10.0], true)]
#[case::even(&[0.0, 1.0, 2.0, 3.0], false)]
fn uneven_axes_are_resampled(#[case] band_axis: &[f64], #[case] resampled: bool) -> TestResult {
    let amplitude = [1.0, 2.0, 3.0, 11.0];
    let file = OpusFile::parse(build(band_axis, &amplitude, "")?)?;
    let spectrum = file.ratio_spectrum()?.expect("ratio spectrum");

    let grid: Vec<f64> = opus_file::linspace(band_axis[0], band_axis[3], 4);
    assert_eq!(spectrum.band_axis, grid);
    if resampled {
        // Amplitude is band position plus one, so it stays linear on the new grid.
        for (a, b) in spectrum.amplitude.iter().zip(&grid) {
            assert!((a - (b + 1.0)).abs() < 1e-5, "{a} != {b} + 1");
        }
    } else {
        assert_eq!(spectrum.amplitude, amplitude.to_vec());
    }
    Ok(())
}

#[test]
fn build_validates_its_arguments() {
    for (band_axis, amplitude) in [
        (&[1.0, 2.0, 3.0][..], &[1.0, 2.0][..]),
        (&[1.0][..], &[1.0][..]),
        (&[][..], &[][..]),
        (&[f64::NAN, 1.0, 2.0][..], &[1.0, 2.0, 3.0][..]),
        (&[0.0, f64::INFINITY][..], &[1.0, 2.0][..]),
    ] {
        let err = build(band_axis, amplitude, "").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{err:?}");
    }
}

#[test]
fn lazy_and_eager_loading_agree() -> TestResult {
    let band_axis: Vec<f64> = (0..64).map(f64::from).collect();
    let amplitude: Vec<f64> = (0..64).map(|i| f64::from(i) / 8.0).collect();
    let bytes = build(&band_axis, &amplitude, "lazy")?;

    let lazy = OpusFile::reader(bytes.clone().into()).parse()?;
    let eager = OpusFile::reader(bytes.into())
        .array_loading(ArrayLoading::Eager)
        .parse()?;

    let lazy_array = lazy.directory[1].payload.as_float_array().expect("float array");
    let eager_array = eager.directory[1]
        .payload
        .as_float_array()
        .expect("float array");
    assert!(!lazy_array.is_materialized());
    assert!(eager_array.is_materialized());
    assert_eq!(lazy_array.values(), eager_array.values());
    assert_eq!(lazy_array.values(), lazy_array.values());
    assert!(lazy_array.is_materialized());
    assert_eq!(lazy, eager);
    Ok(())
}

#[test]
fn file_without_ratio_data_has_no_ratio_spectrum() -> TestResult {
    let mut writer = Writer::default();
    writer.push_string_blob(
        BlockType {
            extend: 5,
            ..BlockType::default()
        },
        b"only a comment  ".to_vec(),
    )?;
    let file = OpusFile::parse(writer.into_bytes()?)?;
    assert_eq!(file.ratio_spectrum()?, None);
    assert_eq!(comment(&file).as_deref(), Some("only a comment"));
    Ok(())
}

#[test]
fn unknown_parameter_type_aborts_parsing() -> TestResult {
    let mut bytes = build(&[1.0, 2.0], &[0.5, 0.5], "")?;
    // First record of the data status list, right after the 2-element float array.
    let record = 24 + 4 * 12 + 8;
    assert_eq!(&bytes[record..record + 4], b"DPF\0");
    bytes[record + 4] = 99;

    let err = OpusFile::parse(bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
    assert!(matches!(
        err.details(),
        Details::UnknownParameterType { code: 99, .. }
    ));
    Ok(())
}

#[test]
fn writer_output_lists_blocks_in_order() -> TestResult {
    let status = ParameterList::new(Vec::new())?;
    let mut writer = Writer::builder().version(2.0).build();
    writer
        .push_float_array(
            BlockType {
                complex: 1,
                kind: 1,
                data: 7,
                ..BlockType::default()
            },
            vec![1.0, -1.0, 0.5],
        )?
        .push_parameter_list(
            BlockType {
                extend: 1,
                ..BlockType::default()
            },
            status,
        )?;
    let file = OpusFile::parse(writer.into_bytes()?)?;

    assert_eq!(file.header.curr_dir_size, 3);
    let kinds: Vec<PayloadKind> = file.blocks().map(|e| e.payload.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            PayloadKind::None,
            PayloadKind::FloatArray,
            PayloadKind::ParameterList
        ]
    );
    assert_eq!(file.directory[0].block_type, BlockType::directory());
    match &file.directory[1].payload {
        Payload::FloatArray(array) => assert_eq!(array.values(), &[1.0, -1.0, 0.5]),
        other => panic!("unexpected payload {other:?}"),
    }
    Ok(())
}

#[test]
fn write_file_then_open() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("spectrum.0");
    write_file(&path, &[10.0, 20.0, 30.0], &[0.1, 0.2, 0.3], "on disk")?;
    // A second write replaces the first one.
    write_file(&path, &[10.0, 20.0, 30.0], &[0.5, 0.25, 0.125], "replaced")?;

    let file = OpusFile::open(&path)?;
    let spectrum = file.ratio_spectrum()?.expect("ratio spectrum");
    assert_eq!(spectrum.amplitude, vec![0.5, 0.25, 0.125]);
    assert_eq!(comment(&file).as_deref(), Some("replaced"));
    Ok(())
}

#[test]
fn open_missing_file_is_an_io_error() {
    let err = OpusFile::open("/nonexistent/spectrum.0").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn decoded_file_serializes_to_json() -> TestResult {
    let file = OpusFile::parse(build(&[1.0, 2.0], &[0.5, 0.25], "json")?)?;
    let json = serde_json::to_value(&file)?;
    assert_eq!(json["header"]["version"], 920622.0);
    assert_eq!(json["directory"][1]["payload"]["FloatArray"][1], 0.25);
    assert_eq!(json["directory"][3]["payload"]["StringBlob"], "json");
    Ok(())
}
