use std::path::Path;

use mpr_sync::{
    ContentBox, SourceType, ViewId, ViewerSession, VolumeLoader, VolumeLoaderError, VolumeMeta,
};

const HEADER_LEN: usize = 348;
const VOX_OFFSET: usize = 352;
const DT_FLOAT32: i16 = 16;

enum Placement {
    Sform([f32; 3]),
    Qform([f32; 3]),
    Unset,
}

fn put_i16(buf: &mut [u8], at: usize, value: i16) {
    buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_f32(buf: &mut [u8], at: usize, value: f32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

/// Single-file NIfTI-1 with float32 samples, `values` in file order (x fastest).
fn write_nifti(path: &Path, dims: &[u16], pixdim: [f32; 3], placement: Placement, values: &[f32]) {
    let mut bytes = vec![0u8; VOX_OFFSET];
    bytes[0..4].copy_from_slice(&(HEADER_LEN as i32).to_le_bytes());
    put_i16(&mut bytes, 40, dims.len() as i16);
    for d in 0..7 {
        put_i16(&mut bytes, 42 + 2 * d, dims.get(d).map_or(1, |&n| n as i16));
    }
    put_i16(&mut bytes, 70, DT_FLOAT32);
    put_i16(&mut bytes, 72, 32);
    for (i, value) in [1.0, pixdim[0], pixdim[1], pixdim[2], 1.0].into_iter().enumerate() {
        put_f32(&mut bytes, 76 + 4 * i, value);
    }
    put_f32(&mut bytes, 108, VOX_OFFSET as f32);
    put_f32(&mut bytes, 112, 1.0);
    match placement {
        Placement::Sform(offset) => {
            put_i16(&mut bytes, 254, 1);
            for (row, at) in [280, 296, 312].into_iter().enumerate() {
                put_f32(&mut bytes, at + 4 * row, pixdim[row]);
                put_f32(&mut bytes, at + 12, offset[row]);
            }
        }
        Placement::Qform(offset) => {
            put_i16(&mut bytes, 252, 1);
            for (axis, at) in [268, 272, 276].into_iter().enumerate() {
                put_f32(&mut bytes, at, offset[axis]);
            }
        }
        Placement::Unset => {}
    }
    bytes[344..348].copy_from_slice(b"n+1\0");
    for value in values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    std::fs::write(path, bytes).unwrap();
}

/// Samples of an `nx x ny x nz` file, x fastest.
fn file_order(dims: [usize; 3], f: impl Fn(usize, usize, usize) -> f32) -> Vec<f32> {
    let [nx, ny, nz] = dims;
    let mut values = Vec::with_capacity(nx * ny * nz);
    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                values.push(f(x, y, z));
            }
        }
    }
    values
}

#[test]
fn nifti_axes_are_stored_in_reverse() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scan.nii");
    let values = file_order([2, 3, 4], |x, y, z| (100 * x + 10 * y + z) as f32);
    write_nifti(&path, &[2, 3, 4], [0.5, 1.0, 2.0], Placement::Sform([-10.0, 20.0, 5.0]), &values);

    let volume = VolumeLoader::load_from_nifti(&path, 1.0).unwrap();
    assert_eq!(volume.source_type(), SourceType::Nifti);
    assert_eq!(volume.dimensions(), [4, 3, 2]);
    assert_eq!(volume.spacing(), [2.0, 1.0, 0.5]);
    assert_eq!(volume.origin(), [5.0, 20.0, -10.0]);

    for (x, y, z) in [(0, 0, 0), (1, 2, 3), (1, 0, 2), (0, 2, 1)] {
        assert_eq!(
            volume.sample([z, y, x]),
            (100 * x + 10 * y + z) as u8,
            "file voxel ({x}, {y}, {z})"
        );
    }
    // the file's z axis is the fastest in the stored buffer
    assert_eq!(&volume.as_slice()[..4], &[0, 1, 2, 3]);
}

#[test]
fn contrast_factor_scales_and_clips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ct.nii");
    write_nifti(&path, &[4, 1, 1], [1.0; 3], Placement::Unset, &[-50.0, 100.0, 500.0, 1000.0]);

    let volume = VolumeLoader::load_from_nifti(&path, mpr_sync::volume_loader::DEFAULT_CONTRAST_FACTOR).unwrap();
    assert_eq!(volume.dimensions(), [1, 1, 4]);
    let values: Vec<_> = (0..4).map(|k| volume.sample([0, 0, k])).collect();
    assert_eq!(values, vec![0, 30, 150, 255]);
    assert_eq!(volume.origin(), [0.0; 3]);
}

#[test]
fn qform_offset_is_used_without_sform() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("q.nii");
    write_nifti(&path, &[2, 2, 2], [1.0; 3], Placement::Qform([1.0, 2.0, 3.0]), &[0.0; 8]);

    let volume = VolumeLoader::load_from_nifti(&path, 1.0).unwrap();
    assert_eq!(volume.origin(), [3.0, 2.0, 1.0]);
}

#[test]
fn time_series_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bold.nii");
    write_nifti(&path, &[2, 2, 2, 2], [1.0; 3], Placement::Unset, &[0.0; 16]);

    assert!(matches!(
        VolumeLoader::load_from_nifti(&path, 1.0),
        Err(VolumeLoaderError::UnsupportedNiftiShape(shape)) if shape == vec![2, 2, 2, 2]
    ));
}

#[test]
fn segmentation_keeps_only_label_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seg.nii");
    let labels = file_order([2, 2, 2], |x, y, z| match (x, y, z) {
        (1, 1, 1) => 1.0,
        (0, 1, 0) => 2.0,
        _ => 0.0,
    });
    write_nifti(&path, &[2, 2, 2], [1.0, 1.0, 3.0], Placement::Sform([0.0; 3]), &labels);

    let mask = VolumeLoader::load_segmentation_from_nifti(&path, None).unwrap();
    assert_eq!(mask.spacing(), [3.0, 1.0, 1.0]);
    assert_eq!(mask.sample([1, 1, 1]), 255);
    assert_eq!(mask.sample([0, 1, 0]), 0);
    assert_eq!(mask.as_slice().iter().filter(|&&v| v == 255).count(), 1);
}

#[test]
fn segmentation_is_resampled_onto_the_base_grid() {
    let dir = tempfile::tempdir().unwrap();
    let scan = dir.path().join("scan.nii");
    let seg = dir.path().join("seg.nii");
    write_nifti(
        &scan,
        &[4, 4, 4],
        [0.5; 3],
        Placement::Sform([1.0, 2.0, 3.0]),
        &file_order([4, 4, 4], |x, _, _| (x * 10) as f32),
    );
    // half resolution, labelled in the file's high-x half
    write_nifti(
        &seg,
        &[2, 2, 2],
        [1.0; 3],
        Placement::Sform([0.0; 3]),
        &file_order([2, 2, 2], |x, _, _| if x == 1 { 1.0 } else { 0.0 }),
    );

    let base = VolumeLoader::load_from_nifti(&scan, 1.0).unwrap();
    let reference = VolumeMeta::from(&base);
    let mask = VolumeLoader::load_segmentation_from_nifti(&seg, Some(&reference)).unwrap();
    assert_eq!(mask.dimensions(), base.dimensions());
    assert_eq!(mask.spacing(), base.spacing());
    assert_eq!(mask.origin(), base.origin());
    // file x is the stored z axis
    assert_eq!(mask.sample([0, 0, 0]), 0);
    assert_eq!(mask.sample([3, 3, 1]), 0);
    assert_eq!(mask.sample([0, 0, 2]), 255);
    assert_eq!(mask.sample([2, 1, 3]), 255);

    let mut session = ViewerSession::new(base);
    session.add_overlay("segmentation", mask).unwrap();
    session.initialize_all(ContentBox::new(64.0, 64.0));
    let outcome = session.broadcast([1, 1, 3], ViewId::Axial);
    assert_eq!(outcome.readout.value, 30);
    assert_eq!(outcome.readout.overlays[0].name, "segmentation");
    assert_eq!(outcome.readout.overlays[0].value, 255);
}

#[test]
fn converted_nifti_writes_full_and_preview_pairs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("volume.nii");
    write_nifti(&path, &[4, 4, 4], [1.0; 3], Placement::Unset, &[40.0; 64]);

    let volume = VolumeLoader::load_from_nifti(&path, 1.0).unwrap();
    let meta = dir.path().join("media/volume_base.meta.json");
    let bin = dir.path().join("media/volume_nifti.bin");
    VolumeLoader::write_with_preview(&volume, &meta, &bin, 2).unwrap();

    let full = VolumeLoader::load_from_files(&meta, &bin, SourceType::Nifti).unwrap();
    assert_eq!(full.dimensions(), [4, 4, 4]);

    let preview_meta = dir.path().join("media/volume_base.meta_preview.json");
    let preview = VolumeLoader::load_from_files(
        &preview_meta,
        dir.path().join("media/volume_nifti_preview.bin"),
        SourceType::Nifti,
    )
    .unwrap();
    assert_eq!(preview.dimensions(), [2, 2, 2]);
    assert_eq!(preview.spacing(), [2.0; 3]);
    assert!(preview.as_slice().iter().all(|&v| v == 40));
    assert_eq!(VolumeLoader::read_meta(&preview_meta).unwrap().dims, [2, 2, 2]);
}
