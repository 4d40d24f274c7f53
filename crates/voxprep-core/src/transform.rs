//! Spatial transforms consumed by registration.
//!
//! The transform is computed elsewhere (by a registration tool) and is opaque
//! to the filters: it only maps physical points of the reference (atlas) space
//! onto physical points of the moving image.

use std::fmt;

use glam::{DAffine3, DMat3, DVec3};

/// Affine mapping from reference space to moving-image space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialTransform {
    affine: DAffine3,
}

impl SpatialTransform {
    pub const IDENTITY: Self = Self {
        affine: DAffine3::IDENTITY,
    };

    pub fn translation(offset: DVec3) -> Self {
        Self {
            affine: DAffine3::from_translation(offset),
        }
    }

    /// `p' = matrix * p + translation`.
    pub fn affine(matrix: DMat3, translation: DVec3) -> Self {
        Self {
            affine: DAffine3::from_mat3_translation(matrix, translation),
        }
    }

    pub fn matrix(&self) -> DMat3 {
        self.affine.matrix3
    }

    pub fn offset(&self) -> DVec3 {
        self.affine.translation
    }

    #[inline]
    pub fn transform_point(&self, point: DVec3) -> DVec3 {
        self.affine.transform_point3(point)
    }

    pub fn is_identity(&self) -> bool {
        self.affine == DAffine3::IDENTITY
    }
}

impl Default for SpatialTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl fmt::Display for SpatialTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_identity() {
            write!(f, "identity")
        } else if self.matrix() == DMat3::IDENTITY {
            write!(f, "translation{}", self.offset())
        } else {
            write!(f, "affine(t={})", self.offset())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_moves_points() {
        let t = SpatialTransform::translation(DVec3::new(1.0, -2.0, 0.5));
        assert_eq!(t.transform_point(DVec3::ZERO), DVec3::new(1.0, -2.0, 0.5));
        assert_eq!(t.to_string(), "translation[1, -2, 0.5]");
    }

    #[test]
    fn test_affine_applies_matrix_then_offset() {
        let t = SpatialTransform::affine(
            DMat3::from_diagonal(DVec3::new(2.0, 1.0, 1.0)),
            DVec3::new(3.0, 0.0, -1.0),
        );
        assert_eq!(t.transform_point(DVec3::new(1.0, 5.0, 2.0)), DVec3::new(5.0, 5.0, 1.0));
        assert_eq!(t.matrix(), DMat3::from_diagonal(DVec3::new(2.0, 1.0, 1.0)));
        assert_eq!(t.offset(), DVec3::new(3.0, 0.0, -1.0));
        assert!(!t.is_identity());
        assert!(SpatialTransform::default().is_identity());
        assert_eq!(SpatialTransform::default().to_string(), "identity");
    }
}
