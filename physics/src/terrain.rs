/*!
Terrain query: swept wall push-out plus a downward support probe.

Given where a kart was (`from`) and where its velocity would take it (`to`), the
query walks the segment in short steps so thin walls are never skipped. At each
step a sphere lifted above the kart's ground point is tested against nearby
wall-like surfaces and pushed out of them. Finally a ray straight down finds the
supporting surface under the corrected end position.

Floor-like surfaces (normal more vertical than `max_wall_normal_y`) are ignored
by the push-out; the support probe handles them. This keeps a kart from getting
caught on polygon corners of the road itself.

The query is pure: it reads the scene and material table and returns its
results.
*/

use crate::{
    config::CollisionSettings,
    constants::NO_GROUND_HEIGHT,
    material::{MaterialTable, MaterialTag},
    scene::{SceneQuery, SurfaceContact, SurfaceId},
    types::{Point3, Vec3},
};

/// Everything the integrator needs to know about the terrain around one step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerrainQuery {
    /// Height of the supporting surface, or [`NO_GROUND_HEIGHT`] if there is none.
    pub support_height: f32,
    /// Normal of the supporting surface (+Y when there is none).
    pub support_normal: Vec3,
    pub support_material: Option<MaterialTag>,
    pub support_surface: Option<SurfaceId>,
    /// Sum of all wall push-outs applied along the path.
    pub push_out: Vec3,
    /// Corrected end position: pushed out of walls and lifted onto the support.
    pub end: Vec3,
    /// Touched a solid wall (zipper surfaces excluded).
    pub collided: bool,
    /// Touched a crash surface.
    pub crashed: bool,
    /// Touched a reset surface or landed below a reset support.
    pub rescue: bool,
    /// Incremental steps actually taken.
    pub steps: u32,
}

impl TerrainQuery {
    #[inline]
    pub fn has_support(&self) -> bool {
        self.support_surface.is_some()
    }
}

#[derive(Default)]
struct ContactFlags {
    collided: bool,
    crashed: bool,
    rescue: bool,
}

/// Sweep `from → to` through `scene` and report support and contacts.
pub fn query_terrain<S: SceneQuery + ?Sized>(
    scene: &S,
    materials: &MaterialTable,
    from: Vec3,
    to: Vec3,
    settings: &CollisionSettings,
) -> TerrainQuery {
    let path = to - from;
    let steps = step_count(path.norm(), settings);
    let step = path / steps as f32;

    let mut flags = ContactFlags::default();
    let mut push_out = Vec3::zeros();
    let mut contacts = Vec::new();
    let mut start = from;
    let mut end = from;

    for _ in 0..steps {
        end = start + step;
        let avoid = push_out_of_walls(scene, materials, end, settings, &mut contacts, &mut flags);
        end += avoid;
        push_out += avoid;
        start = end;
    }

    let top = settings.sphere_radius + from.y.max(end.y);
    let skip = |tag: MaterialTag| materials.is_ignorable(tag);
    let hit = scene.cast_down(
        Point3::new(end.x, top, end.z),
        settings.probe_depth,
        &skip,
    );

    let (support_height, support_normal, support_material, support_surface) = match hit {
        Some(hit) => (hit.height, hit.normal, Some(hit.material), Some(hit.surface)),
        None => (NO_GROUND_HEIGHT, Vec3::y(), None, None),
    };

    if end.y < support_height {
        end.y = support_height;
        if support_material.is_some_and(|tag| materials.classify(tag).is_reset_trigger) {
            flags.rescue = true;
        }
    }

    TerrainQuery {
        support_height,
        support_normal,
        support_material,
        support_surface,
        push_out,
        end,
        collided: flags.collided,
        crashed: flags.crashed,
        rescue: flags.rescue,
        steps,
    }
}

/// Number of incremental steps for a path of `length` meters.
fn step_count(length: f32, settings: &CollisionSettings) -> u32 {
    let wanted = (length / settings.isect_step).ceil();
    if !wanted.is_finite() || wanted < 1.0 {
        return 1;
    }
    if wanted > settings.max_isect_steps as f32 {
        log::warn!(
            "path of {length:.2} m needs {wanted} collision steps, capped at {}",
            settings.max_isect_steps
        );
        return settings.max_isect_steps;
    }
    wanted as u32
}

/// Push the lifted collision sphere at `end` out of every wall-like surface it
/// overlaps and return the total correction.
fn push_out_of_walls<S: SceneQuery + ?Sized>(
    scene: &S,
    materials: &MaterialTable,
    end: Vec3,
    settings: &CollisionSettings,
    contacts: &mut Vec<SurfaceContact>,
    flags: &mut ContactFlags,
) -> Vec3 {
    let radius = settings.sphere_radius;
    let mut center = Point3::from(end + Vec3::new(0.0, radius + settings.sphere_lift, 0.0));

    contacts.clear();
    scene.overlap_sphere(center, radius, contacts);

    let mut avoid = Vec3::zeros();
    for contact in contacts.iter() {
        let material = materials.classify(contact.material);
        if material.ignorable || contact.normal.y > settings.max_wall_normal_y {
            continue;
        }

        // Measured from the moved center, so overlapping walls are not over-corrected.
        let distance = contact.plane_distance(&center);
        if distance > 0.0 && distance < radius {
            let push = contact.normal * (radius - distance);
            avoid += push;
            center += push;

            flags.collided |= !material.is_zipper;
            flags.crashed |= material.is_crash_trigger;
            flags.rescue |= material.is_reset_trigger;
        }
    }
    avoid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        material::{Material, MaterialFlag},
        track_scene::{TrackColliderDef, TrackScene, TrackShapeDef},
    };

    const ROAD: MaterialTag = 1;
    const BUSH: MaterialTag = 2;
    const LAVA: MaterialTag = 3;
    const BOOST: MaterialTag = 4;

    fn materials() -> MaterialTable {
        MaterialTable::new()
            .with(ROAD, Material::named("road"))
            .with(BUSH, Material::named("bush").with_flag(MaterialFlag::Ignore))
            .with(
                LAVA,
                Material::named("lava")
                    .with_flag(MaterialFlag::Reset)
                    .with_flag(MaterialFlag::Crash),
            )
            .with(BOOST, Material::named("boost").with_flag(MaterialFlag::Zipper))
    }

    fn floor(material: MaterialTag) -> TrackColliderDef {
        TrackColliderDef::new(
            1,
            TrackShapeDef::Cuboid {
                half_extents: Vec3::new(100.0, 0.5, 100.0),
            },
            material,
        )
        .with_translation(Vec3::new(0.0, -0.5, 0.0))
    }

    /// A wall whose face is the plane `x = face_x`, solid towards +X.
    fn wall(id: u32, face_x: f32, material: MaterialTag) -> TrackColliderDef {
        TrackColliderDef::new(
            id,
            TrackShapeDef::Cuboid {
                half_extents: Vec3::new(0.5, 3.0, 50.0),
            },
            material,
        )
        .with_translation(Vec3::new(face_x + 0.5, 3.0, 0.0))
    }

    fn settings() -> CollisionSettings {
        CollisionSettings::default()
    }

    #[test]
    fn flat_ground_supports_without_contacts() {
        let scene = TrackScene::build(vec![floor(ROAD)]).unwrap();
        let q = query_terrain(
            &scene,
            &materials(),
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 0.2),
            &settings(),
        );
        assert!(q.has_support());
        assert!(q.support_height.abs() < 1.0e-4);
        assert!((q.support_normal - Vec3::y()).norm() < 1.0e-4);
        assert!(!q.collided && !q.crashed && !q.rescue);
        assert_eq!(q.push_out, Vec3::zeros());
        assert!((q.end - Vec3::new(0.0, 0.0, 0.2)).norm() < 1.0e-4);
    }

    #[test]
    fn end_below_support_is_lifted() {
        let scene = TrackScene::build(vec![floor(ROAD)]).unwrap();
        let q = query_terrain(
            &scene,
            &materials(),
            Vec3::new(0.0, 0.05, 0.0),
            Vec3::new(0.0, -0.3, 0.0),
            &settings(),
        );
        assert!(q.end.y.abs() < 1.0e-4);
    }

    #[test]
    fn no_ground_reports_sentinel() {
        let scene = TrackScene::empty();
        let q = query_terrain(
            &scene,
            &materials(),
            Vec3::new(0.0, 5.0, 0.0),
            Vec3::new(0.0, 4.9, 0.0),
            &settings(),
        );
        assert_eq!(q.support_height, NO_GROUND_HEIGHT);
        assert_eq!(q.support_surface, None);
        assert_eq!(q.support_normal, Vec3::y());
        assert!((q.end.y - 4.9).abs() < 1.0e-6);
    }

    #[test]
    fn long_paths_are_split_and_capped() {
        let scene = TrackScene::empty();
        let mats = materials();
        let q = query_terrain(&scene, &mats, Vec3::zeros(), Vec3::new(0.0, 0.0, 1.0), &settings());
        assert_eq!(q.steps, 3);

        let q = query_terrain(&scene, &mats, Vec3::zeros(), Vec3::zeros(), &settings());
        assert_eq!(q.steps, 1);

        let q = query_terrain(&scene, &mats, Vec3::zeros(), Vec3::new(0.0, 0.0, 1000.0), &settings());
        assert_eq!(q.steps, settings().max_isect_steps);
        assert!((q.end.z - 1000.0).abs() < 1.0e-2);
    }

    #[test]
    fn wall_pushes_sphere_out_and_flags_collision() {
        let scene = TrackScene::build(vec![floor(ROAD), wall(2, 1.0, ROAD)]).unwrap();
        // The sphere (radius 0.6) at x = 0.7 overlaps the wall face at x = 1.0 by 0.3.
        let q = query_terrain(
            &scene,
            &materials(),
            Vec3::new(0.5, 0.0, 0.0),
            Vec3::new(0.7, 0.0, 0.0),
            &settings(),
        );
        assert!(q.collided);
        assert!(!q.crashed);
        assert!((q.push_out.x + 0.3).abs() < 1.0e-3, "push = {:?}", q.push_out);
        assert!((q.end.x - 0.4).abs() < 1.0e-3);
        assert!(q.end.y.abs() < 1.0e-4);
    }

    #[test]
    fn mesh_corner_pushes_out_of_both_walls() {
        // Floor and two walls meeting at (1, y, 1), all in one mesh.
        let vertices = vec![
            Point3::new(-10.0, 0.0, -10.0),
            Point3::new(10.0, 0.0, -10.0),
            Point3::new(10.0, 0.0, 10.0),
            Point3::new(-10.0, 0.0, 10.0),
            Point3::new(1.0, -2.0, -8.0),
            Point3::new(1.0, -2.0, 1.0),
            Point3::new(1.0, 6.0, 1.0),
            Point3::new(-8.0, -2.0, 1.0),
            Point3::new(1.0, 6.0, 1.0),
        ];
        let mesh = TrackColliderDef::new(
            5,
            TrackShapeDef::TriMesh {
                vertices,
                indices: vec![[0, 2, 1], [0, 3, 2], [4, 5, 6], [7, 5, 8]],
            },
            ROAD,
        );
        let scene = TrackScene::build(vec![mesh]).unwrap();

        let q = query_terrain(
            &scene,
            &materials(),
            Vec3::new(0.2, 0.0, 0.2),
            Vec3::new(0.7, 0.0, 0.7),
            &settings(),
        );
        assert!(q.collided);
        assert!((q.end.x - 0.4).abs() < 1.0e-3, "end = {:?}", q.end);
        assert!((q.end.z - 0.4).abs() < 1.0e-3, "end = {:?}", q.end);
        assert!(q.end.y.abs() < 1.0e-4);
        assert_eq!(q.support_surface, Some(5));
    }

    #[test]
    fn thin_wall_is_not_tunnelled() {
        // 0.1 m thick wall, kart moving 3 m across it in one query.
        let thin = TrackColliderDef::new(
            2,
            TrackShapeDef::Cuboid {
                half_extents: Vec3::new(0.05, 3.0, 50.0),
            },
            ROAD,
        )
        .with_translation(Vec3::new(1.05, 3.0, 0.0));
        let scene = TrackScene::build(vec![floor(ROAD), thin]).unwrap();
        let q = query_terrain(
            &scene,
            &materials(),
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(3.0, 0.0, 0.0),
            &settings(),
        );
        assert!(q.collided);
        assert!(q.end.x < 1.0, "end = {:?}", q.end);
    }

    #[test]
    fn ignorable_surfaces_are_skipped() {
        let scene = TrackScene::build(vec![floor(ROAD), wall(2, 1.0, BUSH)]).unwrap();
        let q = query_terrain(
            &scene,
            &materials(),
            Vec3::new(0.5, 0.0, 0.0),
            Vec3::new(0.7, 0.0, 0.0),
            &settings(),
        );
        assert!(!q.collided);
        assert_eq!(q.push_out, Vec3::zeros());
    }

    #[test]
    fn special_walls_set_flags() {
        let mats = materials();
        let from = Vec3::new(0.5, 0.0, 0.0);
        let to = Vec3::new(0.7, 0.0, 0.0);

        let lava = TrackScene::build(vec![floor(ROAD), wall(2, 1.0, LAVA)]).unwrap();
        let q = query_terrain(&lava, &mats, from, to, &settings());
        assert!(q.collided && q.crashed && q.rescue);

        let boost = TrackScene::build(vec![floor(ROAD), wall(2, 1.0, BOOST)]).unwrap();
        let q = query_terrain(&boost, &mats, from, to, &settings());
        assert!(!q.collided);
        assert!(q.push_out.norm() > 0.0);
    }

    #[test]
    fn landing_below_reset_support_requests_rescue() {
        let scene = TrackScene::build(vec![floor(LAVA)]).unwrap();
        let mats = materials();

        let q = query_terrain(
            &scene,
            &mats,
            Vec3::new(0.0, 0.1, 0.0),
            Vec3::new(0.0, -0.1, 0.0),
            &settings(),
        );
        assert!(q.rescue);

        // Hovering above it is fine.
        let q = query_terrain(
            &scene,
            &mats,
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::new(0.0, 1.9, 0.0),
            &settings(),
        );
        assert!(!q.rescue);
        assert_eq!(q.support_material, Some(LAVA));
    }
}
