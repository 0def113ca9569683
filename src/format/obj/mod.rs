pub use importer::ObjImporter;

mod importer;
mod internal;
