//! Material system: definition parsing, inheritance resolution, and layer color math.

mod blending;
mod material;
mod registry;

pub use blending::{combine, linear_to_srgb};
pub use material::{MaterialDef, MaterialParam, ResolvedMaterial, resource_name};
pub use registry::{DefinitionSource, MaterialResolver, ResolveError};
