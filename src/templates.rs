use std::path::Path;

use tokio::fs;
use tracing::{debug, info};

const LAYOUT: &str = include_str!("../templates/layout.html");
const HEADER: &str = include_str!("../templates/header.html");
const NOT_FOUND: &str = include_str!("../templates/not_found.html");

/// Page chrome. `layout` takes `{{ title }}`, `{{ head }}`, `{{ header }}` and
/// `{{ content }}`; `not_found` takes `{{ path }}`.
#[derive(Debug, Clone)]
pub struct Templates {
    pub layout: String,
    pub header: String,
    pub not_found: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            layout: LAYOUT.to_string(),
            header: HEADER.to_string(),
            not_found: NOT_FOUND.to_string(),
        }
    }
}

impl Templates {
    /// Loads the templates from `dir`, falling back to the built-in copy for
    /// any file the directory does not provide.
    pub async fn load(dir: Option<&Path>) -> Result<Self, std::io::Error> {
        let Some(dir) = dir else {
            return Ok(Self::default());
        };
        info!(dir = %dir.display(), "loading templates");
        Ok(Self {
            layout: read_or(dir, "layout.html", LAYOUT).await?,
            header: read_or(dir, "header.html", HEADER).await?,
            not_found: read_or(dir, "not_found.html", NOT_FOUND).await?,
        })
    }
}

async fn read_or(dir: &Path, name: &str, builtin: &str) -> Result<String, std::io::Error> {
    match fs::read_to_string(dir.join(name)).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(name, "template not overridden, using built-in");
            Ok(builtin.to_string())
        }
        Err(e) => Err(e),
    }
}
