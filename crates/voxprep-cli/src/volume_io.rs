//! Raw volume container: a JSON header next to a little-endian `f32` payload.
//!
//! ```json
//! { "size": [64, 64, 40], "spacing": [1.0, 1.0, 2.5], "origin": [0, 0, 0],
//!   "direction": [[1, 0, 0], [0, 1, 0], [0, 0, 1]], "data_file": "t1.raw" }
//! ```
//!
//! `direction` is row-major; `data_file` is relative to the header.

use std::path::{Path, PathBuf};

use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};
use voxprep_core::{Geometry, ImageError, Volume};

#[derive(Debug, thiserror::Error)]
pub enum VolumeIoError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed header {}: {source}", path.display())]
    Header {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("payload {} has {actual} bytes, expected {expected}", path.display())]
    PayloadSize {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },
    #[error(transparent)]
    Image(#[from] ImageError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeHeader {
    pub size: [usize; 3],
    #[serde(default = "unit_spacing")]
    pub spacing: [f64; 3],
    #[serde(default)]
    pub origin: [f64; 3],
    #[serde(default = "identity_rows")]
    pub direction: [[f64; 3]; 3],
    pub data_file: PathBuf,
}

fn unit_spacing() -> [f64; 3] {
    [1.0; 3]
}

fn identity_rows() -> [[f64; 3]; 3] {
    DMat3::IDENTITY.transpose().to_cols_array_2d()
}

impl VolumeHeader {
    pub fn geometry(&self) -> Geometry {
        Geometry::new(self.size)
            .with_spacing(DVec3::from_array(self.spacing))
            .with_origin(DVec3::from_array(self.origin))
            .with_direction(DMat3::from_cols_array_2d(&self.direction).transpose())
    }

    fn from_geometry(geometry: &Geometry, data_file: PathBuf) -> Self {
        Self {
            size: geometry.size,
            spacing: geometry.spacing.to_array(),
            origin: geometry.origin.to_array(),
            direction: geometry.direction.transpose().to_cols_array_2d(),
            data_file,
        }
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> VolumeIoError + '_ {
    move |source| VolumeIoError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Read a volume from its header path.
pub fn read_volume(header_path: &Path) -> Result<Volume, VolumeIoError> {
    let text = std::fs::read_to_string(header_path).map_err(io_error(header_path))?;
    let header: VolumeHeader = serde_json::from_str(&text).map_err(|source| VolumeIoError::Header {
        path: header_path.to_path_buf(),
        source,
    })?;
    let geometry = header.geometry();
    geometry.validate()?;

    let data_path = header_path
        .parent()
        .unwrap_or(Path::new(""))
        .join(&header.data_file);
    let bytes = std::fs::read(&data_path).map_err(io_error(&data_path))?;
    let expected = geometry.voxel_count() * size_of::<f32>();
    if bytes.len() != expected {
        return Err(VolumeIoError::PayloadSize {
            path: data_path,
            expected,
            actual: bytes.len(),
        });
    }

    let mut samples: Vec<f32> = bytemuck::pod_collect_to_vec(&bytes);
    if cfg!(target_endian = "big") {
        for v in &mut samples {
            *v = f32::from_bits(u32::from_le(v.to_bits()));
        }
    }
    tracing::debug!("read {} ({:?})", header_path.display(), geometry.size);
    Ok(Volume::new(geometry, samples)?)
}

/// Write `volume` as `<header_path>` plus a sibling `.raw` payload.
pub fn write_volume(volume: &Volume, header_path: &Path) -> Result<(), VolumeIoError> {
    let data_path = header_path.with_extension("raw");
    let data_file = data_path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("volume.raw"));

    if let Some(parent) = header_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error(parent))?;
    }

    let payload: Vec<u8> = if cfg!(target_endian = "little") {
        bytemuck::cast_slice(volume.samples()).to_vec()
    } else {
        volume.samples().iter().flat_map(|v| v.to_le_bytes()).collect()
    };
    std::fs::write(&data_path, payload).map_err(io_error(&data_path))?;

    let header = VolumeHeader::from_geometry(volume.geometry(), data_file);
    let json = serde_json::to_string_pretty(&header).map_err(|source| VolumeIoError::Header {
        path: header_path.to_path_buf(),
        source,
    })?;
    std::fs::write(header_path, json).map_err(io_error(header_path))?;
    tracing::debug!("wrote {} ({:?})", header_path.display(), volume.size());
    Ok(())
}
