use std::path::Path;

use anyhow::Result;

pub use self::{
    asset::Asset,
    mesh::{BoundingBox, BoundingSphere, Geometry, PropMaterial, PropMesh, Vertex},
};

mod asset;
pub mod mesh;
pub mod normalize;
pub mod transform;

/// Defines a type that can import a model file into the intermediary prop
/// mesh.
pub trait Importer {
    /// Imports a model file into the mesh. Importers may read sibling files
    /// (material libraries, sidecar buffers) relative to the asset's path.
    fn import(&self, asset: &Asset, mesh: &mut PropMesh) -> Result<()>;

    /// Returns the file extensions supported by the importer. These
    /// extensions are used to select the appropriate importer given a model
    /// file.
    ///
    /// The extension should not include the period (e.g. "obj", not ".obj").
    fn extensions(&self) -> &[&str];
}

/// Returns all importers available.
pub fn importers() -> Vec<Box<dyn Importer>> {
    vec![
        Box::new(crate::format::obj::ObjImporter::default()),
        Box::new(crate::format::gltf::GltfImporter::default()),
    ]
}

/// Selects the importer that handles the given file, by extension.
pub fn importer_for(path: &Path) -> Option<Box<dyn Importer>> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    importers()
        .into_iter()
        .find(|importer| importer.extensions().contains(&extension.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_importer_by_extension() {
        assert!(importer_for(Path::new("model.obj")).is_some());
        assert!(importer_for(Path::new("model.GLB")).is_some());
        assert!(importer_for(Path::new("model.gltf")).is_some());
        assert!(importer_for(Path::new("model.fbx")).is_none());
        assert!(importer_for(Path::new("model")).is_none());
    }
}
