pub mod config;
pub mod constants;
pub mod driveline;
pub mod error;
pub mod flags;
pub mod force;
pub mod integrator;
pub mod material;
pub mod registry;
pub mod scene;
pub mod smoother;
pub mod state;
pub mod terrain;
pub mod track_scene;
pub mod types;
pub mod utils;

// Re-export rapier so level loaders can build shapes without depending on it directly.
pub use rapier3d;

pub use config::{
    CollisionSettings, EffectSettings, KartTuning, LapSettings, SimSettings, VisualSettings,
};
pub use driveline::{Driveline, TrackParametrization, TrackProjection};
pub use error::{ConfigError, RegistryError, SceneError};
pub use flags::{Flag, FlagSet};
pub use force::{Acceleration, ForceInput, compute_acceleration};
pub use integrator::{KartIntegrator, Phase, StepContext};
pub use material::{Classification, Material, MaterialFlag, MaterialTable, MaterialTag};
pub use registry::{KartId, KartRegistry};
pub use scene::{SceneQuery, SurfaceContact, SurfaceHit, SurfaceId};
pub use smoother::smooth;
pub use state::{KartEvent, KartEvents, VehicleState};
pub use terrain::{TerrainQuery, query_terrain};
pub use track_scene::{TrackColliderDef, TrackScene, TrackShapeDef};
pub use types::{ControlInputs, Pose, Vec3, Velocity, VisualPose};
