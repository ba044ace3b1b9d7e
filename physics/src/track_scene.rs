//! Rapier-backed static track geometry.
//!
//! Builds an in-memory rapier scene from a set of static collider definitions
//! (typically produced by the level loader) and answers [`SceneQuery`] calls
//! against it.
//!
//! Design goals
//! - Deterministic: given the same inputs (sorted by `id`), build identical sets and
//!   report contacts in identical order.
//! - Query-only: no rigid bodies, no dynamics. The broad phase is updated once.
//! - Immutable: the track does not change after construction, so the scene is
//!   shared by reference between every kart.

use rapier3d::{
    na::Translation3,
    parry::{bounding_volume::Aabb, query::PointQuery},
    prelude::*,
};

use crate::{
    error::SceneError,
    material::MaterialTag,
    scene::{
        SceneQuery, SurfaceContact, SurfaceData, SurfaceHit, SurfaceId, pack_surface,
        unpack_material, unpack_surface_id,
    },
    types::{Point3, Quat, Vec3},
};

/// Contacts closer than this to the sphere center have no usable direction.
const MIN_CONTACT_DISTANCE: f32 = 1.0e-6;

/// One immutable track collider.
///
/// Conventions
/// - Units are meters.
/// - For planes the normal is `rotation * +Y` and the plane passes through
///   `translation + normal * offset_along_normal`.
#[derive(Clone, Debug)]
pub struct TrackColliderDef {
    /// Stable unique identifier; also the [`SurfaceId`] reported by queries.
    pub id: SurfaceId,
    pub translation: Vec3,
    pub rotation: Quat,
    pub shape: TrackShapeDef,
    pub material: MaterialTag,
}

impl TrackColliderDef {
    pub fn new(id: SurfaceId, shape: TrackShapeDef, material: MaterialTag) -> Self {
        Self {
            id,
            translation: Vec3::zeros(),
            rotation: Quat::identity(),
            shape,
            material,
        }
    }

    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    fn is_finite(&self) -> bool {
        let finite = |v: &Vec3| v.iter().all(|c| c.is_finite());
        let shape_ok = match &self.shape {
            TrackShapeDef::Plane { offset_along_normal } => offset_along_normal.is_finite(),
            TrackShapeDef::Cuboid { half_extents } => finite(half_extents),
            TrackShapeDef::Ball { radius } => radius.is_finite(),
            TrackShapeDef::CapsuleY {
                radius,
                half_height,
            } => radius.is_finite() && half_height.is_finite(),
            TrackShapeDef::TriMesh { vertices, .. } => {
                vertices.iter().all(|p| p.coords.iter().all(|c| c.is_finite()))
            }
        };
        shape_ok && finite(&self.translation) && self.rotation.coords.iter().all(|c| c.is_finite())
    }
}

/// Supported static collider shapes.
#[derive(Clone, Debug)]
pub enum TrackShapeDef {
    /// Infinite plane (half-space); solid below the surface.
    Plane { offset_along_normal: f32 },

    /// Oriented cuboid with given half-extents.
    Cuboid { half_extents: Vec3 },

    Ball { radius: f32 },

    /// Y-aligned capsule (posts, barrels).
    CapsuleY { radius: f32, half_height: f32 },

    /// Triangle soup in collider-local coordinates (road surfaces, ramps).
    TriMesh {
        vertices: Vec<Point3>,
        indices: Vec<[u32; 3]>,
    },
}

/// In-memory rapier structures for scene queries against the static track.
pub struct TrackScene {
    bodies: RigidBodySet,
    colliders: ColliderSet,
    broad_phase: BroadPhaseBvh,
    narrow_phase: NarrowPhase,
}

impl TrackScene {
    /// Build a scene from collider definitions.
    ///
    /// The input is sorted by `id` before insertion; ids must be unique.
    pub fn build(mut defs: Vec<TrackColliderDef>) -> Result<Self, SceneError> {
        defs.sort_by_key(|d| d.id);
        if let Some(pair) = defs.windows(2).find(|w| w[0].id == w[1].id) {
            return Err(SceneError::DuplicateId(pair[0].id));
        }

        let bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();
        let mut modified_colliders = Vec::with_capacity(defs.len());

        for def in &defs {
            if !def.is_finite() {
                return Err(SceneError::NonFinite { id: def.id });
            }
            let mut collider = collider_from_def(def)?;
            collider.set_position(collider_pose(def));
            modified_colliders.push(colliders.insert(collider));
        }

        let mut broad_phase = BroadPhaseBvh::new();
        let mut events = Vec::new();
        broad_phase.update(
            &IntegrationParameters::default(),
            &colliders,
            &bodies,
            &modified_colliders,
            &[],
            &mut events,
        );

        log::info!("track scene built with {} colliders", colliders.len());

        Ok(Self {
            bodies,
            colliders,
            broad_phase,
            narrow_phase: NarrowPhase::default(),
        })
    }

    /// A scene with no geometry: every probe falls through.
    pub fn empty() -> Self {
        Self {
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    fn query_pipeline<'a>(&'a self, filter: QueryFilter<'a>) -> QueryPipeline<'a> {
        self.broad_phase.as_query_pipeline(
            self.narrow_phase.query_dispatcher(),
            &self.bodies,
            &self.colliders,
            filter,
        )
    }
}

impl SceneQuery for TrackScene {
    fn overlap_sphere(&self, center: Point3, radius: f32, out: &mut Vec<SurfaceContact>) {
        let reach = Vec3::repeat(radius);
        let query_aabb = Aabb::new(center - reach, center + reach);
        let query_pipeline = self.query_pipeline(QueryFilter::default());

        for (_handle, collider) in query_pipeline.intersect_aabb_conservative(query_aabb) {
            let pose = collider.position();
            let data = collider.user_data;

            // Meshes report every triangle in reach so corners and floor-wall seams
            // push out of each face.
            if let Some(mesh) = collider.shape().as_trimesh() {
                let local_center = pose.inverse_transform_point(&center);
                let local_aabb = Aabb::new(local_center - reach, local_center + reach);
                for i in mesh.bvh().intersect_aabb(&local_aabb) {
                    let proj = mesh.triangle(i).project_local_point(&local_center, false);
                    push_contact(out, center, radius, pose.transform_point(&proj.point), data);
                }
                continue;
            }

            let proj = collider.shape().project_point(pose, &center, false);
            if !proj.is_inside {
                push_contact(out, center, radius, proj.point, data);
            }
        }
    }

    fn cast_down(
        &self,
        origin: Point3,
        max_distance: f32,
        skip: &dyn Fn(MaterialTag) -> bool,
    ) -> Option<SurfaceHit> {
        let predicate = |_handle: ColliderHandle, collider: &Collider| {
            !skip(unpack_material(collider.user_data))
        };
        let query_pipeline = self.query_pipeline(QueryFilter::default().predicate(&predicate));

        let ray = Ray::new(origin, Vec3::new(0.0, -1.0, 0.0));
        let (handle, hit) =
            query_pipeline.cast_ray_and_get_normal(&ray, max_distance.max(0.0), true)?;
        let collider = self.colliders.get(handle)?;

        Some(SurfaceHit {
            height: origin.y - hit.time_of_impact,
            normal: hit.normal,
            surface: unpack_surface_id(collider.user_data),
            material: unpack_material(collider.user_data),
        })
    }
}

/// World pose of a collider. Planes are moved along their normal by the offset.
fn collider_pose(def: &TrackColliderDef) -> Isometry<f32> {
    let translation = match def.shape {
        TrackShapeDef::Plane { offset_along_normal } => {
            def.translation + (def.rotation * Vec3::y()) * offset_along_normal
        }
        _ => def.translation,
    };
    Isometry::from_parts(Translation3::from(translation), def.rotation)
}

/// Build a rapier collider with identity local transform; the caller positions it.
fn collider_from_def(def: &TrackColliderDef) -> Result<Collider, SceneError> {
    let builder = match &def.shape {
        TrackShapeDef::Plane { .. } => ColliderBuilder::halfspace(Vec3::y_axis()),

        TrackShapeDef::Cuboid { half_extents } => {
            ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
        }

        TrackShapeDef::Ball { radius } => ColliderBuilder::ball(*radius),

        TrackShapeDef::CapsuleY {
            radius,
            half_height,
        } => ColliderBuilder::capsule_y(*half_height, *radius),

        TrackShapeDef::TriMesh { vertices, indices } => {
            if vertices.is_empty() || indices.is_empty() {
                return Err(SceneError::InvalidMesh {
                    id: def.id,
                    reason: "mesh has no triangles".into(),
                });
            }
            let vertex_count = vertices.len() as u32;
            if indices.iter().flatten().any(|&i| i >= vertex_count) {
                return Err(SceneError::InvalidMesh {
                    id: def.id,
                    reason: format!("index out of range for {vertex_count} vertices"),
                });
            }
            ColliderBuilder::trimesh(vertices.clone(), indices.clone()).map_err(|err| {
                SceneError::InvalidMesh {
                    id: def.id,
                    reason: format!("{err:?}"),
                }
            })?
        }
    };

    Ok(builder.user_data(pack_surface(def.id, def.material)).build())
}

/// Record a contact at `point` if it lies strictly inside the sphere.
fn push_contact(
    out: &mut Vec<SurfaceContact>,
    center: Point3,
    radius: f32,
    point: Point3,
    data: SurfaceData,
) {
    let offset = center - point;
    let distance = offset.norm();
    if distance <= MIN_CONTACT_DISTANCE || distance >= radius {
        return;
    }
    out.push(SurfaceContact {
        point,
        normal: offset / distance,
        surface: unpack_surface_id(data),
        material: unpack_material(data),
    });
}
