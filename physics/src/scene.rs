//! Read-only view of the static track geometry.
//!
//! The kart core never owns geometry. It asks a [`SceneQuery`] two questions per
//! sub-step: which surfaces overlap a sphere, and what is the first solid surface
//! straight below a point. `TrackScene` answers them with rapier; tests and
//! other engines may provide their own implementation.

use crate::{
    material::MaterialTag,
    types::{Point3, Vec3},
};

/// Stable identifier of one collider in the scene.
pub type SurfaceId = u32;

/// A surface near a query sphere.
///
/// `point` is the closest point on the surface to the sphere center at query time
/// and `normal` points from the surface towards that center. Together they
/// describe the tangent plane that the push-out resolves against.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceContact {
    pub point: Point3,
    pub normal: Vec3,
    pub surface: SurfaceId,
    pub material: MaterialTag,
}

impl SurfaceContact {
    /// Signed distance of `center` from the contact's tangent plane.
    #[inline]
    pub fn plane_distance(&self, center: &Point3) -> f32 {
        self.normal.dot(&(center - self.point))
    }
}

/// Result of a downward probe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceHit {
    pub height: f32,
    pub normal: Vec3,
    pub surface: SurfaceId,
    pub material: MaterialTag,
}

/// Opaque geometry interface used by the terrain query.
///
/// Implementations must be pure with respect to the scene: queries read shared
/// state through `&self` and return their results.
pub trait SceneQuery {
    /// Append to `out` every surface whose closest point lies strictly within
    /// `radius` of `center`. The order must be deterministic for a given scene.
    fn overlap_sphere(&self, center: Point3, radius: f32, out: &mut Vec<SurfaceContact>);

    /// First surface hit by a ray from `origin` straight down, up to `max_distance`.
    /// Surfaces whose material `skip` accepts are passed through.
    fn cast_down(
        &self,
        origin: Point3,
        max_distance: f32,
        skip: &dyn Fn(MaterialTag) -> bool,
    ) -> Option<SurfaceHit>;
}

/// Packed collider payload stored in rapier's `user_data`.
///
/// # Bit layout
/// - bits 0..=31  : [`SurfaceId`]
/// - bits 32..=63 : [`MaterialTag`]
/// - bits 64..=127: reserved (zero)
pub type SurfaceData = u128;

pub fn pack_surface(surface: SurfaceId, material: MaterialTag) -> SurfaceData {
    (surface as u128) | ((material as u128) << SurfaceId::BITS)
}

pub fn unpack_surface_id(data: SurfaceData) -> SurfaceId {
    const ID_MASK: u128 = u32::MAX as u128;
    (data & ID_MASK) as SurfaceId
}

pub fn unpack_material(data: SurfaceData) -> MaterialTag {
    const TAG_MASK: u128 = u32::MAX as u128;
    ((data >> SurfaceId::BITS) & TAG_MASK) as MaterialTag
}
