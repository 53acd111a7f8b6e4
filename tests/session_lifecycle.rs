// End-to-end viewer sessions over the headless host.

use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;
use glam::Vec3;

use meshview_engine::scene::LightRole;
use meshview_engine::viewer::{ATTR_CAMERA_ORBIT, ATTR_SRC};
use meshview_engine::{
    Container, DeclarativeViewer, EngineState, HeadlessFactory, MemoryElement, RendererBackend, Screen,
    SessionState, SessionUi, UploadedFile, ViewerConfig, ViewerError, ViewerSession,
};

#[derive(Default, Clone)]
struct Ui {
    log: Rc<RefCell<Vec<String>>>,
}

impl Ui {
    fn events(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    fn notices(&self) -> usize {
        self.log.borrow().iter().filter(|e| e.starts_with("notify")).count()
    }
}

impl SessionUi for Ui {
    fn notify(&self, message: &str) {
        self.log.borrow_mut().push(format!("notify: {message}"));
    }
    fn set_open_enabled(&self, enabled: bool) {
        self.log.borrow_mut().push(format!("open {enabled}"));
    }
    fn set_loading(&self, loading: bool) {
        self.log.borrow_mut().push(format!("loading {loading}"));
    }
    fn set_progress(&self, percent: u8) {
        self.log.borrow_mut().push(format!("progress {percent}"));
    }
    fn show_screen(&self, screen: Screen) {
        self.log.borrow_mut().push(format!("screen {screen:?}"));
    }
}

struct Harness {
    session: ViewerSession<MemoryElement, Ui, HeadlessFactory>,
    ui: Ui,
    factory: HeadlessFactory,
    full: MemoryElement,
}

fn harness(factory: HeadlessFactory) -> Harness {
    let ui = Ui::default();
    let full = MemoryElement::new();
    let adapter = DeclarativeViewer::new(MemoryElement::new(), full.clone(), MemoryElement::new());
    let session = ViewerSession::new(ViewerConfig::default(), adapter, ui.clone(), factory.clone());
    Harness { session, ui, factory, full }
}

const CONTAINER: Container = Container { width: 1280, height: 720 };

/// Binary STL of an axis-aligned box.
fn box_stl(min: Vec3, max: Vec3) -> Vec<u8> {
    let c = |i: usize| {
        Vec3::new(
            if i & 1 == 0 { min.x } else { max.x },
            if i & 2 == 0 { min.y } else { max.y },
            if i & 4 == 0 { min.z } else { max.z },
        )
    };
    const FACES: [[usize; 4]; 6] = [[0, 2, 3, 1], [4, 5, 7, 6], [0, 1, 5, 4], [2, 6, 7, 3], [0, 4, 6, 2], [1, 3, 7, 5]];

    let mut out = vec![0u8; 80];
    out.extend_from_slice(&12u32.to_le_bytes());
    for f in FACES {
        for tri in [[f[0], f[1], f[2]], [f[0], f[2], f[3]]] {
            out.extend_from_slice(&[0u8; 12]);
            for v in tri {
                for x in c(v).to_array() {
                    out.extend_from_slice(&x.to_le_bytes());
                }
            }
            out.extend_from_slice(&[0u8; 2]);
        }
    }
    out
}

#[test]
fn stl_then_glb_session() {
    let mut h = harness(HeadlessFactory::new());

    // part.stl: manual scene
    assert_eq!(
        h.session.stage_file(UploadedFile::new("part.stl", "blob:part")).unwrap(),
        RendererBackend::ManualScene
    );
    let ticket = h.session.open_viewer(CONTAINER).unwrap().unwrap();
    h.session.load_progress(ticket, 342, 684);
    let summary = h.session.load_complete(ticket, &box_stl(Vec3::ZERO, Vec3::new(4.0, 2.0, 1.0))).unwrap();

    assert_eq!(summary.triangles, 12);
    assert_relative_eq!(summary.framing.distance, 4.0 / 37.5f32.to_radians().sin() * 1.5, epsilon = 1e-4);

    let engine = h.session.engine().unwrap();
    assert_eq!(engine.phase(), EngineState::ModelReady);
    let scene = engine.state().unwrap().scene();
    assert_eq!(scene.count_lights(LightRole::Rig), 3);
    assert_eq!(scene.count_lights(LightRole::Cage), 5);

    for t in 0..5 {
        assert!(h.session.tick(t as f64 * 16.0));
    }
    h.session.close_viewer();
    assert!(h.session.engine().is_none());
    assert_eq!(h.factory.log().live(), 0);
    assert_eq!(h.factory.log().resize_watchers, 0);

    // scene.glb: declarative element, no surface created
    assert_eq!(
        h.session.stage_file(UploadedFile::new("scene.glb", "blob:scene")).unwrap(),
        RendererBackend::DeclarativeViewer
    );
    assert_eq!(h.session.open_viewer(CONTAINER).unwrap(), None);
    assert_eq!(h.full.attribute(ATTR_SRC).as_deref(), Some("blob:scene"));
    h.session.reset_camera();
    assert_eq!(h.full.attribute(ATTR_CAMERA_ORBIT).as_deref(), Some("0deg 75deg 105%"));
    assert_eq!(h.factory.log().created, 1);

    h.session.close_viewer();
    assert_eq!(h.session.state(), SessionState::Staged(RendererBackend::DeclarativeViewer));

    let events = h.ui.events();
    assert!(events.contains(&"progress 50".to_string()));
    assert_eq!(events.last().map(String::as_str), Some("loading false"));
    assert_eq!(h.ui.notices(), 0);
}

#[test]
fn reopening_never_stacks_lights() {
    let mut h = harness(HeadlessFactory::new());
    h.session.stage_file(UploadedFile::new("bracket.stl", "blob:b")).unwrap();

    for round in 0..3 {
        let ticket = h.session.open_viewer(CONTAINER).unwrap().unwrap();
        h.session.load_complete(ticket, &box_stl(Vec3::ZERO, Vec3::splat(1.0 + round as f32))).unwrap();
        let scene = h.session.engine().unwrap().state().unwrap().scene();
        assert_eq!(scene.lights().count(), 8, "round {round}");
        assert_eq!(scene.models().count(), 1);
        h.session.close_viewer();
    }
    assert_eq!(h.factory.log().created, 3);
    assert_eq!(h.factory.log().live(), 0);
}

#[test]
fn late_completion_after_close_leaves_no_trace() {
    let mut h = harness(HeadlessFactory::new());
    h.session.stage_file(UploadedFile::new("part.stl", "blob:part")).unwrap();
    let ticket = h.session.open_viewer(CONTAINER).unwrap().unwrap();
    h.session.close_viewer();

    let err = h.session.load_complete(ticket, &box_stl(Vec3::ZERO, Vec3::ONE)).unwrap_err();
    assert!(matches!(err, ViewerError::StaleLoad { .. }));
    assert_eq!(h.ui.notices(), 0);
    assert!(!h.session.tick(100.0));
    assert_eq!(h.factory.log().uploaded_vertices, None);
}

#[test]
fn reopen_supersedes_earlier_ticket() {
    let mut h = harness(HeadlessFactory::new());
    h.session.stage_file(UploadedFile::new("part.stl", "blob:part")).unwrap();
    let first = h.session.open_viewer(CONTAINER).unwrap().unwrap();
    h.session.close_viewer();
    let second = h.session.open_viewer(CONTAINER).unwrap().unwrap();

    assert_ne!(first, second);

    // The old transfer finishing first must not land in the new scene.
    let err = h.session.load_complete(first, &box_stl(Vec3::ZERO, Vec3::splat(9.0))).unwrap_err();
    assert!(matches!(err, ViewerError::StaleLoad { .. }));
    assert_eq!(h.session.engine().unwrap().state().unwrap().scene().models().count(), 0);

    let summary = h.session.load_complete(second, &box_stl(Vec3::ZERO, Vec3::ONE)).unwrap();
    assert_relative_eq!(summary.framing.size.x, 1.0);
    assert_eq!(h.session.engine().unwrap().state().unwrap().scene().models().count(), 1);
}

#[test]
fn unsupported_upload_and_missing_webgl() {
    let mut h = harness(HeadlessFactory::unavailable());
    assert!(h.session.stage_file(UploadedFile::new("model.3ds", "blob:x")).is_err());
    assert_eq!(h.ui.notices(), 1);

    h.session.stage_file(UploadedFile::new("rig.FBX", "blob:rig")).unwrap();
    assert!(matches!(h.session.open_viewer(CONTAINER), Err(ViewerError::ContextCreation(_))));
    assert_eq!(h.ui.notices(), 2);
    assert!(h.ui.events().contains(&"screen Main".to_string()));

    // Glb still works without a graphics context
    h.session.stage_file(UploadedFile::new("robot.glb", "blob:robot")).unwrap();
    assert!(h.session.open_viewer(CONTAINER).is_ok());
}
