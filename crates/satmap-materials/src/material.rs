//! Core material types: [`MaterialParam`], [`MaterialDef`], and [`ResolvedMaterial`].

use glam::Vec4;

// ---------------------------------------------------------------------------
// MaterialParam
// ---------------------------------------------------------------------------

/// A parameter read from a material definition.
///
/// Each variant maps to one key in the definition text and carries its own
/// built-in default, used when no definition in the inheritance chain sets it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MaterialParam {
    /// Base color, straight RGBA.
    Color,
    /// Middle (detail) color, straight RGBA.
    MiddleColor,
    /// Detail-map resource reference.
    DetailMap,
    /// Middle-map resource reference. Falls back to [`MaterialParam::DetailMap`].
    MiddleMap,
    /// Texture repeat period in surface units.
    MiddleScale,
}

impl MaterialParam {
    /// The key as written in definition text.
    pub fn key(self) -> &'static str {
        match self {
            MaterialParam::Color => "Color",
            MaterialParam::MiddleColor => "MiddleColor",
            MaterialParam::DetailMap => "BCRMap",
            MaterialParam::MiddleMap => "BCRMiddleMap",
            MaterialParam::MiddleScale => "MiddleScaleUV",
        }
    }

    /// Raw default value. Map references have none.
    pub fn default_value(self) -> Option<&'static str> {
        match self {
            MaterialParam::Color | MaterialParam::MiddleColor => Some("1 1 1 1"),
            MaterialParam::MiddleScale => Some("100"),
            MaterialParam::DetailMap | MaterialParam::MiddleMap => None,
        }
    }
}

// ---------------------------------------------------------------------------
// MaterialDef
// ---------------------------------------------------------------------------

/// One parsed material definition record.
///
/// Holds the raw `key value` entries in file order plus the name of the
/// parent material, if the header line references one. The parent is only a
/// name; it is looked up again when resolving.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaterialDef {
    /// Material name (file stem of the definition).
    pub name: String,
    /// Parent material name extracted from the header reference.
    pub parent: Option<String>,
    entries: Vec<(String, String)>,
}

impl MaterialDef {
    /// Parses definition text of the form:
    ///
    /// ```text
    /// TerrainMaterial : "{F4587E72B95D842B}Terrains/Common/Surfaces/Pebbles_02.emat" {
    ///  Color 0.8 0.75 0.7 1
    ///  BCRMiddleMap "{5E1D6C2A37B0F1A4}Terrains/Common/Surfaces/Data/Gravel_BCR.edds"
    ///  MiddleScaleUV 50
    /// }
    /// ```
    ///
    /// Lines whose second token is `:` are parent references. Every other
    /// line with at least two tokens becomes an entry. Comments, braces and
    /// blank lines are skipped.
    pub fn parse(name: &str, text: &str) -> Self {
        let mut def = MaterialDef {
            name: name.to_string(),
            ..Default::default()
        };

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }

            let Some((key, rest)) = line.split_once(char::is_whitespace) else {
                continue;
            };
            let rest = rest.trim();

            if let Some(reference) = rest.strip_prefix(':') {
                if def.parent.is_none() {
                    def.parent = resource_name(reference).map(str::to_string);
                }
                continue;
            }

            let value = rest.trim_end_matches('{').trim_end();
            if value.is_empty() || key == "{" || key == "}" {
                continue;
            }
            def.entries.push((key.to_string(), value.to_string()));
        }

        def
    }

    /// Returns the raw value for `key`. The first occurrence in file order wins.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the raw value for a known parameter.
    pub fn param(&self, param: MaterialParam) -> Option<&str> {
        self.get(param.key())
    }

    /// Number of parsed entries, duplicates included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the definition has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Extracts an asset name from a resource path.
///
/// `"{F4587E72B95D842B}Terrains/Common/Surfaces/Pebbles_02.emat" {` names
/// `Pebbles_02`: the segment between the last two `.` delimiters, after the
/// last `/`. Returns `None` when the path has no extension or the name is
/// empty.
pub fn resource_name(reference: &str) -> Option<&str> {
    let mut segments = reference.rsplit('.');
    segments.next()?;
    let stem = segments.next()?;
    let name = stem.rsplit('/').next().unwrap_or(stem);
    let name = name.trim_start_matches(|c: char| c == '"' || c.is_whitespace());
    let name = match name.strip_prefix('{') {
        Some(guid) => guid.split_once('}').map_or(guid, |(_, rest)| rest),
        None => name,
    };
    if name.is_empty() { None } else { Some(name) }
}

// ---------------------------------------------------------------------------
// ResolvedMaterial
// ---------------------------------------------------------------------------

/// Flattened, fully defaulted view of a material after inheritance resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedMaterial {
    /// Material name the resolution started from.
    pub name: String,
    /// Base color in linear straight RGBA.
    pub color: Vec4,
    /// Middle color in linear straight RGBA.
    pub middle_color: Vec4,
    /// Detail-map resource reference.
    pub detail_map: Option<String>,
    /// Middle-map resource reference.
    pub middle_map: Option<String>,
    /// Texture repeat period in surface units. Always finite and positive.
    pub middle_scale: f32,
}

impl ResolvedMaterial {
    /// The texture reference used for tiling: the middle map, or the detail
    /// map when no middle map is set anywhere in the chain.
    pub fn tiling_map(&self) -> Option<&str> {
        self.middle_map.as_deref().or(self.detail_map.as_deref())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const PEBBLES: &str = r#"TerrainMaterial : "{F4587E72B95D842B}Terrains/Common/Surfaces/Pebbles_02.emat" {
 Color 0.8 0.75 0.7 1
 BCRMiddleMap "{5E1D6C2A37B0F1A4}Terrains/Common/Surfaces/Data/Gravel_BCR.edds"
 MiddleScaleUV 50
 Color 0 0 0 0
}
"#;

    #[test]
    fn test_parse_reads_parent_and_entries() {
        let def = MaterialDef::parse("Gravel", PEBBLES);
        assert_eq!(def.name, "Gravel");
        assert_eq!(def.parent.as_deref(), Some("Pebbles_02"));
        assert_eq!(def.param(MaterialParam::MiddleScale), Some("50"));
        assert_eq!(
            def.param(MaterialParam::MiddleMap),
            Some(r#""{5E1D6C2A37B0F1A4}Terrains/Common/Surfaces/Data/Gravel_BCR.edds""#)
        );
    }

    #[test]
    fn test_first_duplicate_wins() {
        let def = MaterialDef::parse("Gravel", PEBBLES);
        assert_eq!(def.param(MaterialParam::Color), Some("0.8 0.75 0.7 1"));
        assert_eq!(def.len(), 4);
    }

    #[test]
    fn test_color_key_does_not_match_middle_color() {
        let def = MaterialDef::parse("m", "TerrainMaterial {\n MiddleColor 0.5 0.5 0.5 1\n}\n");
        assert_eq!(def.param(MaterialParam::Color), None);
        assert_eq!(def.param(MaterialParam::MiddleColor), Some("0.5 0.5 0.5 1"));
    }

    #[test]
    fn test_root_material_has_no_parent() {
        let def = MaterialDef::parse("Base", "TerrainMaterial {\n Color 1 0 0 1\n}\n");
        assert_eq!(def.parent, None);
        assert!(!def.is_empty());
    }

    #[test]
    fn test_comments_and_blank_lines_skipped() {
        let def = MaterialDef::parse("m", "// header\n\n   \n MiddleScaleUV 12\n");
        assert_eq!(def.len(), 1);
        assert_eq!(def.param(MaterialParam::MiddleScale), Some("12"));
    }

    #[test]
    fn test_resource_name_strips_guid_and_path() {
        assert_eq!(
            resource_name(r#" "{F4587E72B95D842B}Terrains/Common/Surfaces/Pebbles_02.emat" {"#),
            Some("Pebbles_02")
        );
        assert_eq!(
            resource_name(r#""{AB}Terrains/Data/Grass_BCR.edds""#),
            Some("Grass_BCR")
        );
        assert_eq!(resource_name(r#""{AB}Grass_BCR.edds""#), Some("Grass_BCR"));
        assert_eq!(resource_name("dir/name.png"), Some("name"));
    }

    #[test]
    fn test_resource_name_uses_last_extension_segment() {
        assert_eq!(resource_name("a/b.c.emat"), Some("c"));
    }

    #[test]
    fn test_resource_name_without_extension_is_none() {
        assert_eq!(resource_name("Terrains/Grass"), None);
        assert_eq!(resource_name(r#""{AB}.edds""#), None);
    }

    #[test]
    fn test_param_defaults() {
        assert_eq!(MaterialParam::Color.default_value(), Some("1 1 1 1"));
        assert_eq!(MaterialParam::MiddleColor.default_value(), Some("1 1 1 1"));
        assert_eq!(MaterialParam::MiddleScale.default_value(), Some("100"));
        assert_eq!(MaterialParam::DetailMap.default_value(), None);
        assert_eq!(MaterialParam::MiddleMap.default_value(), None);
    }

    #[test]
    fn test_tiling_map_falls_back_to_detail_map() {
        let mut mat = ResolvedMaterial {
            name: "m".to_string(),
            color: Vec4::ONE,
            middle_color: Vec4::ONE,
            detail_map: Some("detail".to_string()),
            middle_map: None,
            middle_scale: 100.0,
        };
        assert_eq!(mat.tiling_map(), Some("detail"));
        mat.middle_map = Some("middle".to_string());
        assert_eq!(mat.tiling_map(), Some("middle"));
    }
}
