// viewer.rs - Declarative viewer adapter
//
// glTF/GLB/OBJ are drawn by an embedded model-viewing element that runs its
// own scene. This side only writes attributes on it and flips which preview
// surface is visible.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::format::UploadedFile;

pub const ATTR_SRC: &str = "src";
pub const ATTR_CAMERA_CONTROLS: &str = "camera-controls";
pub const ATTR_AUTO_ROTATE: &str = "auto-rotate";
pub const ATTR_SHADOW_INTENSITY: &str = "shadow-intensity";
pub const ATTR_ENVIRONMENT: &str = "environment-image";
pub const ATTR_CAMERA_ORBIT: &str = "camera-orbit";
pub const ATTR_CAMERA_TARGET: &str = "camera-target";

/// Host element the adapter writes to.
pub trait ViewerElement {
    fn set_attribute(&self, name: &str, value: &str);
    fn remove_attribute(&self, name: &str);
    fn set_visible(&self, visible: bool);
}

/// Spherical camera position: "θdeg φdeg R%".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraOrbit {
    pub theta_deg: f32,
    pub phi_deg: f32,
    pub radius_percent: f32,
}

impl CameraOrbit {
    pub const DEFAULT: Self = Self { theta_deg: 0.0, phi_deg: 75.0, radius_percent: 105.0 };
}

impl fmt::Display for CameraOrbit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}deg {}deg {}%", self.theta_deg, self.phi_deg, self.radius_percent)
    }
}

/// Look-at point in meters: "Xm Ym Zm".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTarget {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl CameraTarget {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0, z: 0.0 };
}

impl fmt::Display for CameraTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m {}m {}m", self.x, self.y, self.z)
    }
}

pub struct DeclarativeViewer<E: ViewerElement> {
    preview: E,
    full: E,
    /// Canvas preview used for manual-scene files
    manual_preview: E,
}

impl<E: ViewerElement> DeclarativeViewer<E> {
    pub fn new(preview: E, full: E, manual_preview: E) -> Self {
        Self { preview, full, manual_preview }
    }

    pub fn load_preview(&self, file: &UploadedFile) {
        self.preview.set_attribute(ATTR_SRC, &file.source);
        self.preview.set_visible(true);
        self.manual_preview.set_visible(false);
    }

    /// Swap to the manual preview surface, unbinding the element's preview.
    pub fn show_manual_preview(&self) {
        self.preview.remove_attribute(ATTR_SRC);
        self.preview.set_visible(false);
        self.manual_preview.set_visible(true);
    }

    pub fn open_full(&self, file: &UploadedFile) {
        self.full.set_attribute(ATTR_CAMERA_CONTROLS, "");
        self.full.set_attribute(ATTR_SHADOW_INTENSITY, "1");
        self.full.set_attribute(ATTR_ENVIRONMENT, "neutral");
        self.full.set_attribute(ATTR_SRC, &file.source);
        self.full.set_visible(true);
    }

    pub fn toggle_auto_rotate(&self, enabled: bool) {
        if enabled {
            self.full.set_attribute(ATTR_AUTO_ROTATE, "");
        } else {
            self.full.remove_attribute(ATTR_AUTO_ROTATE);
        }
    }

    pub fn reset_camera(&self) {
        self.full.set_attribute(ATTR_CAMERA_ORBIT, &CameraOrbit::DEFAULT.to_string());
        self.full.set_attribute(ATTR_CAMERA_TARGET, &CameraTarget::ORIGIN.to_string());
    }

    /// Unbind the full-screen element when leaving the viewer.
    pub fn clear(&self) {
        self.full.remove_attribute(ATTR_SRC);
        self.full.set_visible(false);
    }
}

/// In-memory element, for hosts without a DOM.
#[derive(Debug, Clone, Default)]
pub struct MemoryElement {
    inner: Rc<RefCell<MemoryElementState>>,
}

#[derive(Debug, Default)]
struct MemoryElementState {
    attributes: BTreeMap<String, String>,
    visible: bool,
}

impl MemoryElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.inner.borrow().attributes.get(name).cloned()
    }

    pub fn is_visible(&self) -> bool {
        self.inner.borrow().visible
    }
}

impl ViewerElement for MemoryElement {
    fn set_attribute(&self, name: &str, value: &str) {
        self.inner.borrow_mut().attributes.insert(name.to_string(), value.to_string());
    }

    fn remove_attribute(&self, name: &str) {
        self.inner.borrow_mut().attributes.remove(name);
    }

    fn set_visible(&self, visible: bool) {
        self.inner.borrow_mut().visible = visible;
    }
}
