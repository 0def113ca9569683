use std::path::{Path, PathBuf};

/// An in-memory model file: its bytes plus the path it was loaded from.
/// Importers use the path to locate sibling resources (material libraries,
/// sidecar buffers) and to derive the mesh name.
pub struct Asset {
    pub bytes: Vec<u8>,
    path: PathBuf,
}

impl Asset {
    pub fn new(bytes: Vec<u8>, path: impl Into<PathBuf>) -> Self {
        Self {
            bytes,
            path: path.into(),
        }
    }

    /// Get a reference to the asset's path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file stem of the asset, used as the default mesh name.
    pub fn name(&self) -> &str {
        self.path
            .file_stem()
            .unwrap_or_default()
            .to_str()
            .expect("The name of the asset file is not a valid unicode string")
    }

    /// The directory the asset was loaded from.
    pub fn parent_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}
