// surface.rs - RenderSurface backed by the page's WebGL renderer
//
// The page supplies a renderer factory object; each surface wraps one
// renderer it created. Frames cross as Float32Array views into wasm memory,
// so the JS side must copy anything it keeps past the call.

use std::cell::Cell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::error::ViewerError;
use crate::render::{ModelBuffers, RenderSurface, SurfaceFactory};

#[wasm_bindgen]
extern "C" {
    /// `{ create(width, height) -> HostRenderer }`, throws without WebGL.
    pub type HostRendererFactory;

    #[wasm_bindgen(method, catch)]
    fn create(this: &HostRendererFactory, width: u32, height: u32) -> Result<HostRenderer, JsValue>;

    pub type HostRenderer;

    #[wasm_bindgen(method, js_name = setSize)]
    fn set_size(this: &HostRenderer, width: u32, height: u32);

    #[wasm_bindgen(method, js_name = uploadModel)]
    fn upload_model(this: &HostRenderer, positions: &[f32], normals: &[f32], indices: &[u32], ranges: &[f32]);

    #[wasm_bindgen(method, js_name = clearModel)]
    fn clear_model(this: &HostRenderer);

    #[wasm_bindgen(method)]
    fn render(this: &HostRenderer, frame: &[f32]);

    #[wasm_bindgen(method)]
    fn release(this: &HostRenderer);
}

pub struct JsSurface {
    host: HostRenderer,
    /// Raised by the window resize listener, cleared by the render loop
    resized: Rc<Cell<bool>>,
    listener: Option<Closure<dyn FnMut()>>,
    released: bool,
}

impl RenderSurface for JsSurface {
    fn set_size(&mut self, width: u32, height: u32) {
        self.host.set_size(width, height);
    }

    fn upload_model(&mut self, model: &ModelBuffers) {
        let ranges: Vec<f32> = model.ranges.iter().flatten().copied().collect();
        self.host.upload_model(&model.positions, &model.normals, &model.indices, &ranges);
    }

    fn clear_model(&mut self) {
        self.host.clear_model();
    }

    fn render(&mut self, frame: &[f32]) {
        self.host.render(frame);
    }

    fn watch_resize(&mut self) {
        if self.listener.is_some() {
            return;
        }
        let Some(window) = web_sys::window() else { return };
        let flag = self.resized.clone();
        let cb = Closure::<dyn FnMut()>::new(move || flag.set(true));
        if window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref()).is_ok() {
            self.listener = Some(cb);
        }
    }

    fn unwatch_resize(&mut self) {
        let Some(cb) = self.listener.take() else { return };
        if let Some(window) = web_sys::window() {
            if let Err(e) = window.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref()) {
                tracing::warn!(?e, "removing resize listener failed");
            }
        }
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.host.release();
        }
    }
}

pub struct JsSurfaceFactory {
    renderers: HostRendererFactory,
    resized: Rc<Cell<bool>>,
}

impl JsSurfaceFactory {
    pub fn new(renderers: HostRendererFactory, resized: Rc<Cell<bool>>) -> Self {
        Self { renderers, resized }
    }
}

impl SurfaceFactory for JsSurfaceFactory {
    fn create(&mut self, width: u32, height: u32) -> Result<Box<dyn RenderSurface>, ViewerError> {
        let host = self.renderers.create(width, height).map_err(|e| {
            ViewerError::ContextCreation(e.as_string().unwrap_or_else(|| "WebGL is not available".into()))
        })?;
        Ok(Box::new(JsSurface { host, resized: self.resized.clone(), listener: None, released: false }))
    }
}
