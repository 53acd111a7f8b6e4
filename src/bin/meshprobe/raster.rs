// raster.rs - Software preview of the lit scene
//
// Flat-shaded z-buffer rasterizer. Lighting mirrors the frame the engine
// sends to the browser: ambient, directional, point and spot lights with
// range/decay falloff. No shadows.

use glam::{Vec3, Vec4Swizzles};
use image::{Rgb, RgbImage};

use meshview_engine::scene::{Light, LightKind, PerspectiveCamera, Scene};

const BACKGROUND: [u8; 3] = [26, 26, 46];

/// Resolved light in world space.
struct Lamp {
    light: Light,
    position: Vec3,
    /// Unit vector the light points along (spot and directional)
    aim: Vec3,
}

fn lamps(scene: &Scene) -> Vec<Lamp> {
    scene
        .lights()
        .map(|(node, light)| {
            let aim = match light.kind {
                LightKind::Spot { target, .. } => {
                    let t = scene.get(target).map(|n| n.position).unwrap_or(Vec3::ZERO);
                    (t - node.position).normalize_or_zero()
                }
                _ => (-node.position).normalize_or_zero(),
            };
            Lamp { light: light.clone(), position: node.position, aim }
        })
        .collect()
}

fn falloff(distance: f32, range: f32, decay: f32) -> f32 {
    if range <= 0.0 {
        return 1.0;
    }
    (1.0 - distance / range).clamp(0.0, 1.0).powf(decay)
}

fn smoothstep(e0: f32, e1: f32, x: f32) -> f32 {
    let t = ((x - e0) / (e1 - e0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn shade(lamps: &[Lamp], p: Vec3, n: Vec3) -> Vec3 {
    let mut total = Vec3::ZERO;
    for lamp in lamps {
        let l = &lamp.light;
        let contrib = match l.kind {
            LightKind::Ambient => 1.0,
            LightKind::Directional => n.dot(-lamp.aim).max(0.0),
            LightKind::Point { range, decay } => {
                let to = lamp.position - p;
                let d = to.length();
                n.dot(to / d.max(1e-6)).max(0.0) * falloff(d, range, decay)
            }
            LightKind::Spot { range, angle, penumbra, decay, .. } => {
                let to = lamp.position - p;
                let d = to.length();
                let dir = to / d.max(1e-6);
                let cone = smoothstep(angle.cos(), (angle * (1.0 - penumbra)).cos(), (-dir).dot(lamp.aim));
                n.dot(dir).max(0.0) * falloff(d, range, decay) * cone
            }
        };
        total += l.color * l.intensity * contrib;
    }
    total
}

fn to_srgb(c: Vec3) -> Rgb<u8> {
    let g = |v: f32| (v.clamp(0.0, 1.0).powf(1.0 / 2.2) * 255.0).round() as u8;
    Rgb([g(c.x), g(c.y), g(c.z)])
}

fn edge(a: Vec3, b: Vec3, x: f32, y: f32) -> f32 {
    (b.x - a.x) * (y - a.y) - (b.y - a.y) * (x - a.x)
}

/// Render every model in `scene` as seen from `camera`.
pub fn render(scene: &Scene, camera: &PerspectiveCamera, width: u32, height: u32) -> RgbImage {
    let mut img = RgbImage::from_pixel(width, height, Rgb(BACKGROUND));
    let mut depth = vec![f32::INFINITY; (width * height) as usize];
    let vp = camera.view_projection();
    let lamps = lamps(scene);
    let (w, h) = (width as f32, height as f32);

    for (node, model) in scene.models() {
        for mesh in &model.meshes {
            for tri in mesh.indices.chunks_exact(3) {
                let world = [0, 1, 2].map(|k| mesh.positions[tri[k] as usize] + node.position);

                let clip = world.map(|p| vp * p.extend(1.0));
                if clip.iter().any(|c| c.w <= camera.near) {
                    continue;
                }
                let screen = clip.map(|c| {
                    let ndc = c.xyz() / c.w;
                    Vec3::new((ndc.x * 0.5 + 0.5) * w, (0.5 - ndc.y * 0.5) * h, ndc.z)
                });

                let area = edge(screen[0], screen[1], screen[2].x, screen[2].y);
                if area.abs() < 1e-8 {
                    continue;
                }

                let mut n = (world[1] - world[0]).cross(world[2] - world[0]).normalize_or_zero();
                let centroid = (world[0] + world[1] + world[2]) / 3.0;
                // Double-sided: face the camera.
                if n.dot(camera.position - centroid) < 0.0 {
                    n = -n;
                }
                let color = to_srgb(mesh.material.color * shade(&lamps, centroid, n));

                let min_x = screen.iter().map(|s| s.x).fold(f32::INFINITY, f32::min).max(0.0) as u32;
                let max_x = screen.iter().map(|s| s.x).fold(f32::NEG_INFINITY, f32::max).min(w - 1.0);
                let min_y = screen.iter().map(|s| s.y).fold(f32::INFINITY, f32::min).max(0.0) as u32;
                let max_y = screen.iter().map(|s| s.y).fold(f32::NEG_INFINITY, f32::max).min(h - 1.0);
                if max_x < 0.0 || max_y < 0.0 {
                    continue;
                }

                for y in min_y..=max_y as u32 {
                    for x in min_x..=max_x as u32 {
                        let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
                        let b0 = edge(screen[1], screen[2], px, py) / area;
                        let b1 = edge(screen[2], screen[0], px, py) / area;
                        let b2 = edge(screen[0], screen[1], px, py) / area;
                        if b0 < 0.0 || b1 < 0.0 || b2 < 0.0 {
                            continue;
                        }
                        let z = b0 * screen[0].z + b1 * screen[1].z + b2 * screen[2].z;
                        let i = (y * width + x) as usize;
                        if z < depth[i] {
                            depth[i] = z;
                            img.put_pixel(x, y, color);
                        }
                    }
                }
            }
        }
    }
    img
}
