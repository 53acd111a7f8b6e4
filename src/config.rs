// config.rs - Viewer tuning
//
// Every number the engine uses lives here. Defaults match the shipped viewer;
// hosts may override any subset through JSON.

use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub rig: RigConfig,
    pub cage: CageConfig,
    pub framing: FramingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
    /// Camera distance before any model is framed
    pub initial_distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self { fov_deg: 75.0, near: 0.1, far: 1000.0, initial_distance: 5.0 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    pub damping_factor: f32,
    /// Full orbits per minute while auto-rotating
    pub auto_rotate_speed: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            damping_factor: 0.05,
            auto_rotate_speed: 2.0,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    pub point_intensity: f32,
    pub point_range: f32,
    pub point_start: [f32; 3],
    /// Horizontal orbit radius of the animated point light
    pub orbit_radius: f32,
    pub orbit_height: f32,
    pub orbit_bob: f32,
    /// rad/s around the vertical axis
    pub orbit_rate: f32,
    /// rad/s of the vertical oscillation
    pub bob_rate: f32,
    pub ambient_intensity: f32,
    pub ambient_color: [f32; 3],
    pub directional_intensity: f32,
    pub directional_position: [f32; 3],
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            point_intensity: 1.2,
            point_range: 100.0,
            point_start: [8.0, 4.0, 0.0],
            orbit_radius: 8.0,
            orbit_height: 4.0,
            orbit_bob: 2.0,
            orbit_rate: 0.5,
            bob_rate: 0.3,
            ambient_intensity: 0.4,
            ambient_color: [0.25, 0.25, 0.38],
            directional_intensity: 0.6,
            directional_position: [10.0, 10.0, 5.0],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CageConfig {
    pub intensity: f32,
    pub angle_deg: f32,
    pub penumbra: f32,
    pub decay: f32,
    /// Spotlight range as a multiple of the model's largest dimension
    pub range_factor: f32,
}

impl Default for CageConfig {
    fn default() -> Self {
        Self { intensity: 0.5, angle_deg: 45.0, penumbra: 0.2, decay: 1.5, range_factor: 3.0 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FramingConfig {
    pub margin: f32,
    /// near = distance / clip_ratio, far = distance * clip_ratio
    pub clip_ratio: f32,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self { margin: 1.5, clip_ratio: 100.0 }
    }
}

impl ViewerConfig {
    /// Parse a (possibly partial) JSON document over the defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fov = self.camera.fov_deg;
        if !(fov > 0.0 && fov < 180.0) {
            return Err(ConfigError::Value(format!("camera.fov_deg out of range: {fov}")));
        }
        if self.camera.near <= 0.0 || self.camera.far <= self.camera.near {
            return Err(ConfigError::Value("camera near/far must satisfy 0 < near < far".into()));
        }
        if !(0.0..=1.0).contains(&self.controls.damping_factor) {
            return Err(ConfigError::Value("controls.damping_factor must be within 0..=1".into()));
        }
        if !(self.controls.min_distance >= 0.0 && self.controls.min_distance <= self.controls.max_distance) {
            return Err(ConfigError::Value("controls distance limits must satisfy 0 <= min <= max".into()));
        }
        if self.framing.margin <= 0.0 || self.framing.clip_ratio <= 1.0 {
            return Err(ConfigError::Value("framing margin/clip_ratio too small".into()));
        }
        Ok(())
    }
}
