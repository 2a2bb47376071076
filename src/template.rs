//! Zone and template data model — the boundary the spec calls "already validated"
//! (§6): the core assumes a `Template` handed to it has already passed validation
//! (at least one zone, unique ids, positive dimensions, bounds within 0-100), which
//! is the responsibility of whatever loads the template file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// An immutable zone descriptor: a rectangular screen region in percentage units,
/// its playlist directory, and its stacking index. Created by the caller; never
/// mutated by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub playlist_dir: PathBuf,
    pub stacking_index: u32,
}

impl Zone {
    /// True iff this zone covers the whole screen (0,0,100,100), the conventional
    /// signal to prefer fullscreen mode at the backend boundary.
    pub fn is_full_screen(&self) -> bool {
        self.x == 0 && self.y == 0 && self.width == 100 && self.height == 100
    }
}

/// A named, ordered collection of zones — the root of a layout template file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    pub zones: Vec<Zone>,
}

/// Errors loading a template file.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("IO error reading template: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse template: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid template: {0}")]
    Invalid(String),
}

impl Template {
    /// Load and validate a template from a TOML file.
    ///
    /// This loader is the "external loader" referenced by §6 of the spec — the core
    /// itself never calls this and assumes an already-validated `Template`. It is
    /// provided here so the crate is a complete, runnable binary (§10 ambient stack).
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let content = std::fs::read_to_string(path)?;
        let template: Template = toml::from_str(&content)?;
        template.validate()?;
        Ok(template)
    }

    fn validate(&self) -> Result<(), TemplateError> {
        if self.zones.is_empty() {
            return Err(TemplateError::Invalid(
                "template must declare at least one zone".to_string(),
            ));
        }

        let mut seen_ids = std::collections::HashSet::new();
        for zone in &self.zones {
            if !seen_ids.insert(&zone.id) {
                return Err(TemplateError::Invalid(format!(
                    "duplicate zone id: {}",
                    zone.id
                )));
            }
            if zone.width == 0 || zone.height == 0 {
                return Err(TemplateError::Invalid(format!(
                    "zone {} must have positive dimensions",
                    zone.id
                )));
            }
            if zone.x + zone.width > 100 || zone.y + zone.height > 100 {
                return Err(TemplateError::Invalid(format!(
                    "zone {} extends outside the 0-100 percent bounds",
                    zone.id
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_zone(id: &str) -> Zone {
        Zone {
            id: id.to_string(),
            x: 0,
            y: 0,
            width: 100,
            height: 100,
            playlist_dir: PathBuf::from("/tmp/zone"),
            stacking_index: 0,
        }
    }

    #[test]
    fn test_is_full_screen() {
        assert!(sample_zone("a").is_full_screen());

        let mut half = sample_zone("b");
        half.width = 50;
        assert!(!half.is_full_screen());
    }

    #[test]
    fn test_load_valid_template() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let path = temp.path().join("template.toml");
        std::fs::write(
            &path,
            r#"
            name = "lobby"

            [[zones]]
            id = "main"
            x = 0
            y = 0
            width = 100
            height = 100
            playlist_dir = "/srv/signage/main"
            stacking_index = 0
            "#,
        )
        .expect("failed to write template fixture");

        let template = Template::load(&path).expect("failed to load template");
        assert_eq!(template.zones.len(), 1);
        assert_eq!(template.zones[0].id, "main");
    }

    #[test]
    fn test_reject_empty_template() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let path = temp.path().join("template.toml");
        std::fs::write(&path, "name = \"empty\"\nzones = []\n")
            .expect("failed to write template fixture");

        let err = Template::load(&path).expect_err("empty template should be rejected");
        assert!(matches!(err, TemplateError::Invalid(_)));
    }

    #[test]
    fn test_reject_duplicate_ids() {
        let template = Template {
            name: "dup".to_string(),
            zones: vec![sample_zone("a"), sample_zone("a")],
        };
        assert!(template.validate().is_err());
    }

    #[test]
    fn test_reject_out_of_bounds_zone() {
        let mut zone = sample_zone("a");
        zone.x = 60;
        zone.width = 50;
        let template = Template {
            name: "oob".to_string(),
            zones: vec![zone],
        };
        assert!(template.validate().is_err());
    }
}
