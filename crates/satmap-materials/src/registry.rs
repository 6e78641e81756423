//! Material resolution: walks the parent chain of a named material and
//! flattens it into a [`ResolvedMaterial`].
//!
//! Definitions are fetched by name through a [`DefinitionSource`], so the
//! resolver never touches the filesystem itself.

use std::collections::{HashMap, HashSet};

use glam::Vec4;
use thiserror::Error;
use tracing::{debug, warn};

use crate::material::{MaterialDef, MaterialParam, ResolvedMaterial};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned while resolving a material.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A material's parent chain loops back on itself.
    #[error("cyclic inheritance resolving {material}: {repeated} is its own ancestor")]
    CyclicInheritance {
        /// Material the resolution started from.
        material: String,
        /// First name seen twice in the chain.
        repeated: String,
    },

    /// A parameter value could not be parsed.
    #[error("invalid {key} value {value:?} in material {material}")]
    InvalidValue {
        /// Material the resolution started from.
        material: String,
        /// Definition key.
        key: &'static str,
        /// Raw value as found in the chain.
        value: String,
    },

    /// The definition source failed to read a record.
    #[error("failed to read definition for {material}: {source}")]
    Source {
        /// Name being read.
        material: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// DefinitionSource
// ---------------------------------------------------------------------------

/// Provides the raw definition text for a material name.
///
/// Returns `Ok(None)` when no definition exists for the name.
pub trait DefinitionSource {
    /// Read the definition record for `name`.
    fn read_definition(&self, name: &str) -> std::io::Result<Option<String>>;
}

impl DefinitionSource for HashMap<String, String> {
    fn read_definition(&self, name: &str) -> std::io::Result<Option<String>> {
        Ok(self.get(name).cloned())
    }
}

impl<S: DefinitionSource + ?Sized> DefinitionSource for &S {
    fn read_definition(&self, name: &str) -> std::io::Result<Option<String>> {
        (**self).read_definition(name)
    }
}

// ---------------------------------------------------------------------------
// MaterialResolver
// ---------------------------------------------------------------------------

/// Resolves material parameters through their inheritance chain.
///
/// The first definition in the chain (child first) that sets a parameter
/// wins. When the chain ends without a value, the parameter's built-in
/// default applies.
pub struct MaterialResolver<S> {
    source: S,
}

impl<S: DefinitionSource> MaterialResolver<S> {
    /// Creates a resolver reading definitions from `source`.
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Access the underlying definition source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Loads the definition chain for `name`, child first.
    ///
    /// A missing start definition yields an empty chain. A missing parent
    /// ends the chain at the last definition found.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::CyclicInheritance`] if a name repeats, or
    /// [`ResolveError::Source`] if the source fails.
    pub fn chain(&self, name: &str) -> Result<Vec<MaterialDef>, ResolveError> {
        let mut chain: Vec<MaterialDef> = Vec::new();
        let mut visited = HashSet::new();
        let mut current = Some(name.to_string());

        while let Some(next) = current.take() {
            if !visited.insert(next.clone()) {
                return Err(ResolveError::CyclicInheritance {
                    material: name.to_string(),
                    repeated: next,
                });
            }

            let text = self
                .source
                .read_definition(&next)
                .map_err(|source| ResolveError::Source {
                    material: next.clone(),
                    source,
                })?;

            let Some(text) = text else {
                if let Some(child) = chain.last() {
                    warn!(
                        material = name,
                        "parent {next} of {} not found, using defaults past it", child.name
                    );
                }
                break;
            };

            let def = MaterialDef::parse(&next, &text);
            debug!(material = name, depth = chain.len(), "loaded definition {next}");
            current = def.parent.clone();
            chain.push(def);
        }

        Ok(chain)
    }

    /// Returns the raw value of one parameter, or its default.
    ///
    /// Map parameters return `None` when nothing in the chain sets them.
    ///
    /// # Errors
    ///
    /// See [`MaterialResolver::chain`].
    pub fn lookup(&self, name: &str, param: MaterialParam) -> Result<Option<String>, ResolveError> {
        let chain = self.chain(name)?;
        Ok(lookup_in_chain(&chain, param).map(str::to_string))
    }

    /// Resolves every parameter of `name` with a single chain walk.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidValue`] for a malformed color or a
    /// non-positive scale, plus the errors of [`MaterialResolver::chain`].
    pub fn resolve(&self, name: &str) -> Result<ResolvedMaterial, ResolveError> {
        let chain = self.chain(name)?;
        let value = |param| lookup_in_chain(&chain, param);

        let color = parse_color(name, MaterialParam::Color, value(MaterialParam::Color))?;
        let middle_color = parse_color(
            name,
            MaterialParam::MiddleColor,
            value(MaterialParam::MiddleColor),
        )?;
        let middle_scale = parse_scale(name, value(MaterialParam::MiddleScale))?;

        Ok(ResolvedMaterial {
            name: name.to_string(),
            color,
            middle_color,
            detail_map: value(MaterialParam::DetailMap).map(str::to_string),
            middle_map: value(MaterialParam::MiddleMap).map(str::to_string),
            middle_scale,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn lookup_in_chain(chain: &[MaterialDef], param: MaterialParam) -> Option<&str> {
    chain
        .iter()
        .find_map(|def| def.param(param))
        .or(param.default_value())
}

fn invalid(name: &str, param: MaterialParam, value: &str) -> ResolveError {
    ResolveError::InvalidValue {
        material: name.to_string(),
        key: param.key(),
        value: value.to_string(),
    }
}

/// Parses the first four whitespace-separated floats of a color value.
fn parse_color(name: &str, param: MaterialParam, raw: Option<&str>) -> Result<Vec4, ResolveError> {
    let raw = raw.unwrap_or("1 1 1 1");
    let mut channels = [0.0f32; 4];
    let mut tokens = raw.split_whitespace();
    for channel in &mut channels {
        *channel = tokens
            .next()
            .and_then(|t| t.parse::<f32>().ok())
            .filter(|c| c.is_finite())
            .ok_or_else(|| invalid(name, param, raw))?;
    }
    Ok(Vec4::from_array(channels))
}

fn parse_scale(name: &str, raw: Option<&str>) -> Result<f32, ResolveError> {
    let raw = raw.unwrap_or("100");
    raw.split_whitespace()
        .next()
        .and_then(|t| t.parse::<f32>().ok())
        .filter(|s| s.is_finite() && *s > 0.0)
        .ok_or_else(|| invalid(name, MaterialParam::MiddleScale, raw))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
