// meshprobe - Load an STL/FBX file through the scene engine, headless
//
// Runs the same path the browser viewer takes (classify, initialize, load,
// frame, light) against a headless surface, prints what the viewer would
// show and writes a software-rendered preview.
//
// Usage: cargo run --bin meshprobe -- <model> [--out preview.png] [--size N] [--config viewer.json]

mod raster;

use std::env;
use std::fs;

use anyhow::{bail, Context, Result};
use tracing_subscriber::EnvFilter;

use meshview_engine::scene::LightKind;
use meshview_engine::{format, Container, HeadlessFactory, RendererBackend, SceneEngine, ViewerConfig};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <model.stl|model.fbx> [--out preview.png] [--size N] [--config viewer.json]", args[0]);
        std::process::exit(1);
    }

    // Parse arguments
    let path = &args[1];
    let mut out = String::from("preview.png");
    let mut size = 512u32;
    let mut config_path: Option<String> = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--out" => { out = args.get(i + 1).cloned().unwrap_or(out); i += 2; }
            "--size" => { size = args.get(i + 1).and_then(|s| s.parse().ok()).unwrap_or(512).max(16); i += 2; }
            "--config" => { config_path = args.get(i + 1).cloned(); i += 2; }
            _ => i += 1,
        }
    }

    let config = match &config_path {
        Some(p) => {
            let json = fs::read_to_string(p).with_context(|| format!("reading {p}"))?;
            ViewerConfig::from_json(&json).with_context(|| format!("parsing {p}"))?
        }
        None => ViewerConfig::default(),
    };

    let mesh_format = format::detect(path)?;
    if mesh_format.backend() != RendererBackend::ManualScene {
        bail!("{path} is shown by the embedded model viewer; meshprobe handles STL and FBX only");
    }
    let bytes = fs::read(path).with_context(|| format!("reading {path}"))?;

    println!("Probing {} ({} bytes, {})...", path, bytes.len(), mesh_format.extension());

    let mut factory = HeadlessFactory::new();
    let mut engine = SceneEngine::new(config);
    engine.initialize(Container { width: size, height: size }, &mut factory)?;

    let ticket = engine.begin_load(path, mesh_format)?;
    let total = bytes.len() as u64;
    engine.report_progress(ticket, total, total);
    let summary = engine.complete_load(ticket, &bytes)?;
    engine.tick(0.0);

    let f = summary.framing;
    println!("  Triangles:   {}", summary.triangles);
    println!("  Size:        {:.3} x {:.3} x {:.3}", f.size.x, f.size.y, f.size.z);
    println!("  Center:      ({:.3}, {:.3}, {:.3}) -> origin", f.center.x, f.center.y, f.center.z);
    println!("  Camera:      z = {:.3}, near {:.4}, far {:.1}", f.distance, f.near, f.far);

    let state = engine.state().context("engine lost its scene")?;
    println!("  Lights:");
    for (node, light) in state.scene().lights() {
        let kind = match light.kind {
            LightKind::Ambient => "ambient",
            LightKind::Directional => "directional",
            LightKind::Point { .. } => "point",
            LightKind::Spot { .. } => "spot",
        };
        let p = node.position;
        println!("    {:<16} {:<12} {:.2} at ({:.2}, {:.2}, {:.2})", node.name, kind, light.intensity, p.x, p.y, p.z);
    }

    let img = raster::render(state.scene(), state.camera(), size, size);
    img.save(&out).with_context(|| format!("writing {out}"))?;
    println!("  Wrote {out}");

    engine.dispose();
    println!("Done!");
    Ok(())
}
