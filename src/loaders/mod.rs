// loaders/ - Geometry import for the manual scene
//
// The host transfers the bytes and reports progress; loaders only parse.
//
// - stl: binary and ASCII STL, one matte mesh
// - fbx: binary FBX scene import

mod fbx;
mod stl;

pub use fbx::FbxLoader;
pub use stl::StlLoader;

#[cfg(test)]
pub(crate) use stl::tests::box_stl;

use crate::error::ParseError;
use crate::format::MeshFormat;
use crate::scene::Model;

pub trait GeometryLoader {
    fn format(&self) -> MeshFormat;
    fn parse(&self, bytes: &[u8]) -> Result<Model, ParseError>;
}

/// Loader for a manual-scene format; `None` for formats the element handles.
pub fn loader_for(format: MeshFormat) -> Option<Box<dyn GeometryLoader>> {
    match format {
        MeshFormat::Stl => Some(Box::new(StlLoader)),
        MeshFormat::Fbx => Some(Box::new(FbxLoader)),
        MeshFormat::Glb | MeshFormat::Gltf | MeshFormat::Obj => None,
    }
}

/// Byte counts reported during a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded: u64,
    pub total: u64,
}

impl LoadProgress {
    /// Whole percent, capped at 100. `None` when the total is unknown.
    pub fn percent(&self) -> Option<u8> {
        if self.total == 0 {
            return None;
        }
        let pct = (self.loaded as f64 / self.total as f64 * 100.0).round();
        Some(pct.clamp(0.0, 100.0) as u8)
    }
}

/// Turns raw progress events into a non-decreasing percentage stream.
#[derive(Debug, Default, Clone)]
pub struct ProgressTracker {
    last: Option<u8>,
}

impl ProgressTracker {
    pub fn update(&mut self, progress: LoadProgress) -> Option<u8> {
        let pct = progress.percent()?;
        let pct = self.last.map_or(pct, |l| l.max(pct));
        self.last = Some(pct);
        Some(pct)
    }

    pub fn last(&self) -> Option<u8> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_percentages() {
        let mut t = ProgressTracker::default();
        assert_eq!(t.update(LoadProgress { loaded: 500, total: 2000 }), Some(25));
        assert_eq!(t.update(LoadProgress { loaded: 2000, total: 2000 }), Some(100));
    }

    #[test]
    fn progress_never_decreases() {
        let mut t = ProgressTracker::default();
        assert_eq!(t.update(LoadProgress { loaded: 60, total: 100 }), Some(60));
        assert_eq!(t.update(LoadProgress { loaded: 40, total: 100 }), Some(60));
        assert_eq!(t.update(LoadProgress { loaded: 0, total: 0 }), None);
        assert_eq!(t.last(), Some(60));
    }

    #[test]
    fn overshoot_caps_at_100() {
        assert_eq!(LoadProgress { loaded: 3000, total: 2000 }.percent(), Some(100));
    }

    #[test]
    fn only_manual_formats_have_loaders() {
        assert_eq!(loader_for(MeshFormat::Stl).map(|l| l.format()), Some(MeshFormat::Stl));
        assert_eq!(loader_for(MeshFormat::Fbx).map(|l| l.format()), Some(MeshFormat::Fbx));
        assert!(loader_for(MeshFormat::Glb).is_none());
    }
}
