// format.rs - File classification
//
// Maps an uploaded filename to the backend that can draw it.

use crate::error::ViewerError;

/// Which rendering pipeline owns a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererBackend {
    /// Embedded model-viewing element (glTF, GLB, OBJ)
    DeclarativeViewer,
    /// Scene managed by this crate (STL, FBX)
    ManualScene,
}

/// Recognised mesh formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Glb,
    Gltf,
    Obj,
    Stl,
    Fbx,
}

impl MeshFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "glb" => Some(Self::Glb),
            "gltf" => Some(Self::Gltf),
            "obj" => Some(Self::Obj),
            "stl" => Some(Self::Stl),
            "fbx" => Some(Self::Fbx),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Glb => "glb",
            Self::Gltf => "gltf",
            Self::Obj => "obj",
            Self::Stl => "stl",
            Self::Fbx => "fbx",
        }
    }

    pub fn backend(self) -> RendererBackend {
        match self {
            Self::Glb | Self::Gltf | Self::Obj => RendererBackend::DeclarativeViewer,
            Self::Stl | Self::Fbx => RendererBackend::ManualScene,
        }
    }
}

/// A file the user picked or dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub extension: String,
    /// Resource URL the viewers load from (an object URL in the browser)
    pub source: String,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        let name = name.into();
        Self { extension: extension(&name), name, source: source.into() }
    }

    pub fn format(&self) -> Option<MeshFormat> {
        MeshFormat::from_extension(&self.extension)
    }
}

/// Lower-cased text after the last '.', empty when there is none.
pub fn extension(filename: &str) -> String {
    match filename.rfind('.') {
        Some(i) => filename[i + 1..].to_ascii_lowercase(),
        None => String::new(),
    }
}

/// Parse the format of a filename, rejecting anything unknown.
pub fn detect(filename: &str) -> Result<MeshFormat, ViewerError> {
    let ext = extension(filename);
    if ext.is_empty() {
        return Err(unsupported(filename));
    }
    MeshFormat::from_extension(&ext).ok_or_else(|| unsupported(filename))
}

/// Backend for a filename.
pub fn classify(filename: &str) -> Result<RendererBackend, ViewerError> {
    detect(filename).map(MeshFormat::backend)
}

fn unsupported(filename: &str) -> ViewerError {
    ViewerError::UnsupportedFormat { filename: filename.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarative_formats() {
        for name in ["robot.glb", "scene.gltf", "teapot.obj", "UPPER.GLB"] {
            assert_eq!(classify(name).unwrap(), RendererBackend::DeclarativeViewer, "{name}");
        }
    }

    #[test]
    fn manual_formats() {
        for name in ["part.stl", "rig.fbx", "Bracket.v2.STL"] {
            assert_eq!(classify(name).unwrap(), RendererBackend::ManualScene, "{name}");
        }
    }

    #[test]
    fn rejected_formats() {
        for name in ["notes.txt", "archive.", "stl", "", "model.stl.zip"] {
            assert!(
                matches!(classify(name), Err(ViewerError::UnsupportedFormat { .. })),
                "{name}"
            );
        }
    }

    #[test]
    fn uploaded_file_extension() {
        let f = UploadedFile::new("Part.STL", "blob:1");
        assert_eq!(f.extension, "stl");
        assert_eq!(f.format(), Some(MeshFormat::Stl));
        assert_eq!(UploadedFile::new("readme", "blob:2").format(), None);
    }

    #[test]
    fn extension_uses_last_dot() {
        assert_eq!(extension("a.b.FBX"), "fbx");
        assert_eq!(extension("noext"), "");
    }
}
