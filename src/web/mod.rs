// web/ - Browser bindings
//
// ViewerApp is the JS-facing handle. It wires the session to DOM elements,
// fetches manual-scene files over XHR and runs the requestAnimationFrame
// loop while a manual scene is open.

mod surface;

pub use surface::{HostRenderer, HostRendererFactory, JsSurfaceFactory};

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{HtmlElement, ProgressEvent, XmlHttpRequest, XmlHttpRequestResponseType};

use crate::config::ViewerConfig;
use crate::engine::{Container, LoadTicket};
use crate::format::UploadedFile;
use crate::session::{Screen, SessionUi, ViewerSession};
use crate::viewer::{DeclarativeViewer, ViewerElement};

// Element ids the page must provide.
const ID_PREVIEW: &str = "preview-viewer";
const ID_PREVIEW_CANVAS: &str = "preview-canvas";
const ID_FULL: &str = "full-viewer";
const ID_CONTAINER: &str = "viewer-container";
const ID_OPEN: &str = "open-viewer";
const ID_LOADING: &str = "loading";
const ID_PROGRESS: &str = "loading-progress";
const ID_MAIN_SCREEN: &str = "main-screen";
const ID_VIEWER_SCREEN: &str = "viewer-screen";

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
}

fn element(id: &str) -> Result<HtmlElement, JsValue> {
    web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.get_element_by_id(id))
        .ok_or_else(|| JsValue::from_str(&format!("missing element #{id}")))?
        .dyn_into::<HtmlElement>()
        .map_err(|_| JsValue::from_str(&format!("#{id} is not an HTML element")))
}

pub struct DomElement(HtmlElement);

impl ViewerElement for DomElement {
    fn set_attribute(&self, name: &str, value: &str) {
        if let Err(e) = self.0.set_attribute(name, value) {
            tracing::warn!(name, ?e, "set_attribute failed");
        }
    }

    fn remove_attribute(&self, name: &str) {
        if let Err(e) = self.0.remove_attribute(name) {
            tracing::warn!(name, ?e, "remove_attribute failed");
        }
    }

    fn set_visible(&self, visible: bool) {
        self.0.set_hidden(!visible);
    }
}

pub struct DomUi {
    open: HtmlElement,
    loading: HtmlElement,
    progress: HtmlElement,
    main_screen: HtmlElement,
    viewer_screen: HtmlElement,
}

impl DomUi {
    fn from_document() -> Result<Self, JsValue> {
        Ok(Self {
            open: element(ID_OPEN)?,
            loading: element(ID_LOADING)?,
            progress: element(ID_PROGRESS)?,
            main_screen: element(ID_MAIN_SCREEN)?,
            viewer_screen: element(ID_VIEWER_SCREEN)?,
        })
    }
}

impl SessionUi for DomUi {
    fn notify(&self, message: &str) {
        if let Some(window) = web_sys::window() {
            if let Err(e) = window.alert_with_message(message) {
                tracing::warn!(message, ?e, "alert failed");
            }
        }
    }

    fn set_open_enabled(&self, enabled: bool) {
        if let Err(e) = self.open.toggle_attribute_with_force("disabled", !enabled) {
            tracing::warn!(enabled, ?e, "toggling open button failed");
        }
    }

    fn set_loading(&self, loading: bool) {
        self.loading.set_hidden(!loading);
        if loading {
            self.progress.set_text_content(Some("0%"));
        }
    }

    fn set_progress(&self, percent: u8) {
        self.progress.set_text_content(Some(&format!("{percent}%")));
    }

    fn show_screen(&self, screen: Screen) {
        self.main_screen.set_hidden(screen != Screen::Main);
        self.viewer_screen.set_hidden(screen != Screen::Viewer);
    }
}

type Session = ViewerSession<DomElement, DomUi, JsSurfaceFactory>;
type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

/// One in-flight XHR and the callbacks it needs alive.
struct Transfer {
    xhr: XmlHttpRequest,
    _on_progress: Closure<dyn FnMut(ProgressEvent)>,
    _on_load: Closure<dyn FnMut()>,
    _on_error: Closure<dyn FnMut()>,
}

impl Transfer {
    fn start(url: &str, ticket: LoadTicket, app: Weak<RefCell<AppState>>) -> Result<Self, JsValue> {
        let xhr = XmlHttpRequest::new()?;
        xhr.open("GET", url)?;
        xhr.set_response_type(XmlHttpRequestResponseType::Arraybuffer);

        let on_progress = {
            let app = app.clone();
            Closure::<dyn FnMut(ProgressEvent)>::new(move |ev: ProgressEvent| {
                if !ev.length_computable() {
                    return;
                }
                if let Some(app) = app.upgrade() {
                    app.borrow_mut().session.load_progress(ticket, ev.loaded() as u64, ev.total() as u64);
                }
            })
        };

        let on_load = {
            let app = app.clone();
            let req = xhr.clone();
            Closure::<dyn FnMut()>::new(move || {
                let Some(app) = app.upgrade() else { return };
                let mut app = app.borrow_mut();
                match req.status() {
                    Ok(200..=299) => match req.response() {
                        Ok(buf) => {
                            let bytes = js_sys::Uint8Array::new(&buf).to_vec();
                            let _ = app.session.load_complete(ticket, &bytes);
                        }
                        Err(_) => {
                            app.session.load_failed(ticket, "response body unavailable");
                        }
                    },
                    Ok(status) => {
                        app.session.load_failed(ticket, &format!("HTTP {status}"));
                    }
                    Err(_) => {
                        app.session.load_failed(ticket, "request failed");
                    }
                }
            })
        };

        let on_error = Closure::<dyn FnMut()>::new(move || {
            if let Some(app) = app.upgrade() {
                app.borrow_mut().session.load_failed(ticket, "network error");
            }
        });

        xhr.set_onprogress(Some(on_progress.as_ref().unchecked_ref()));
        xhr.set_onload(Some(on_load.as_ref().unchecked_ref()));
        xhr.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        xhr.send()?;

        Ok(Self { xhr, _on_progress: on_progress, _on_load: on_load, _on_error: on_error })
    }

    fn abort(self) {
        self.xhr.set_onprogress(None);
        self.xhr.set_onload(None);
        self.xhr.set_onerror(None);
        if let Err(e) = self.xhr.abort() {
            tracing::warn!(?e, "aborting transfer failed");
        }
    }
}

/// requestAnimationFrame loop, stopped when the session stops ticking.
struct RenderLoop {
    handle: Rc<Cell<Option<i32>>>,
    callback: FrameCallback,
}

impl RenderLoop {
    fn start(app: Weak<RefCell<AppState>>) -> Self {
        let handle = Rc::new(Cell::new(None));
        let callback: FrameCallback = Rc::new(RefCell::new(None));

        let (h, cb) = (handle.clone(), callback.clone());
        *callback.borrow_mut() = Some(Closure::new(move |now: f64| {
            let alive = app.upgrade().is_some_and(|app| app.borrow_mut().frame(now));
            if !alive {
                h.set(None);
                cb.borrow_mut().take();
                return;
            }
            h.set(schedule(&cb));
        }));
        handle.set(schedule(&callback));
        Self { handle, callback }
    }

    fn stop(self) {
        if let (Some(id), Some(window)) = (self.handle.take(), web_sys::window()) {
            if let Err(e) = window.cancel_animation_frame(id) {
                tracing::warn!(id, ?e, "cancel_animation_frame failed");
            }
        }
        self.callback.borrow_mut().take();
    }
}

fn schedule(callback: &FrameCallback) -> Option<i32> {
    let cb = callback.borrow();
    let window = web_sys::window()?;
    window.request_animation_frame(cb.as_ref()?.as_ref().unchecked_ref()).ok()
}

struct AppState {
    session: Session,
    container: HtmlElement,
    resized: Rc<Cell<bool>>,
    transfer: Option<Transfer>,
    render_loop: Option<RenderLoop>,
}

impl AppState {
    fn container_size(&self) -> Container {
        Container { width: self.container.client_width().max(1) as u32, height: self.container.client_height().max(1) as u32 }
    }

    fn frame(&mut self, now: f64) -> bool {
        if self.resized.replace(false) {
            let Container { width, height } = self.container_size();
            self.session.resize(width, height);
        }
        self.session.tick(now)
    }

    fn stop_activity(&mut self) {
        if let Some(t) = self.transfer.take() {
            t.abort();
        }
        if let Some(l) = self.render_loop.take() {
            l.stop();
        }
    }
}

#[wasm_bindgen]
pub struct ViewerApp {
    state: Rc<RefCell<AppState>>,
}

#[wasm_bindgen]
impl ViewerApp {
    /// `config_json` is an optional partial ViewerConfig document.
    #[wasm_bindgen(constructor)]
    pub fn new(renderers: HostRendererFactory, config_json: Option<String>) -> Result<ViewerApp, JsValue> {
        let config = match config_json {
            Some(json) => ViewerConfig::from_json(&json).map_err(|e| JsValue::from_str(&e.to_string()))?,
            None => ViewerConfig::default(),
        };

        let adapter = DeclarativeViewer::new(
            DomElement(element(ID_PREVIEW)?),
            DomElement(element(ID_FULL)?),
            DomElement(element(ID_PREVIEW_CANVAS)?),
        );
        let resized = Rc::new(Cell::new(false));
        let factory = JsSurfaceFactory::new(renderers, resized.clone());
        let session = ViewerSession::new(config, adapter, DomUi::from_document()?, factory);

        let state = AppState { session, container: element(ID_CONTAINER)?, resized, transfer: None, render_loop: None };
        Ok(ViewerApp { state: Rc::new(RefCell::new(state)) })
    }

    /// Returns whether the file was accepted.
    #[wasm_bindgen(js_name = stageFile)]
    pub fn stage_file(&self, name: String, url: String) -> bool {
        self.state.borrow_mut().session.stage_file(UploadedFile::new(name, url)).is_ok()
    }

    /// Returns whether the viewer screen is now showing.
    #[wasm_bindgen(js_name = openViewer)]
    pub fn open_viewer(&self) -> bool {
        let mut app = self.state.borrow_mut();
        let container = app.container_size();
        let ticket = match app.session.open_viewer(container) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(error = %e, "openViewer failed");
                return false;
            }
        };
        let Some(ticket) = ticket else { return true };

        app.stop_activity();
        let url = app.session.staged_file().map(|f| f.source.clone()).unwrap_or_default();
        match Transfer::start(&url, ticket, Rc::downgrade(&self.state)) {
            Ok(t) => app.transfer = Some(t),
            Err(e) => {
                app.session.load_failed(ticket, &format!("{e:?}"));
            }
        }
        app.render_loop = Some(RenderLoop::start(Rc::downgrade(&self.state)));
        true
    }

    #[wasm_bindgen(js_name = closeViewer)]
    pub fn close_viewer(&self) {
        let mut app = self.state.borrow_mut();
        app.stop_activity();
        app.session.close_viewer();
    }

    #[wasm_bindgen(js_name = toggleAutoRotate)]
    pub fn toggle_auto_rotate(&self, enabled: bool) {
        self.state.borrow_mut().session.toggle_auto_rotate(enabled);
    }

    #[wasm_bindgen(js_name = resetCamera)]
    pub fn reset_camera(&self) {
        self.state.borrow_mut().session.reset_camera();
    }

    /// Pointer drag in pixels.
    pub fn rotate(&self, dx: f32, dy: f32) {
        let mut app = self.state.borrow_mut();
        let h = app.container_size().height as f32;
        app.session.rotate(dx, dy, h);
    }

    pub fn pan(&self, dx: f32, dy: f32) {
        let mut app = self.state.borrow_mut();
        let h = app.container_size().height as f32;
        app.session.pan(dx, dy, h);
    }

    /// Wheel steps; positive zooms out.
    pub fn zoom(&self, steps: f32) {
        self.state.borrow_mut().session.zoom(steps);
    }

    /// Last encoded frame, for hosts that read wasm memory directly.
    #[wasm_bindgen(js_name = framePtr)]
    pub fn frame_ptr(&self) -> *const f32 {
        self.frame().0
    }

    #[wasm_bindgen(js_name = frameLen)]
    pub fn frame_len(&self) -> usize {
        self.frame().1
    }
}

impl ViewerApp {
    fn frame(&self) -> (*const f32, usize) {
        let app = self.state.borrow();
        app.session
            .engine()
            .and_then(|e| e.state())
            .map(|st| st.frame())
            .unwrap_or((std::ptr::null(), 0))
    }
}
