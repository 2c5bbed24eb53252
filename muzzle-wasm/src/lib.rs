use std::cell::RefCell;
use std::rc::{Rc, Weak};

use js_sys::{Array, Function, Promise};
use muzzle_core::{Animation, Background, MatchOptions, Page, Point, Settings, Shared, Solution};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};
use web_sys::HtmlElement;

mod canvas;
mod engine;
mod loader;
mod logging;
mod utils;

pub use engine::{Context, JsEngine, JsEngineFactory};
pub use loader::{BoardImage, BrowserLoader};

use utils::{error_message, from_js, js_error, log, to_js};

#[wasm_bindgen(start)]
pub fn start() {
    logging::init(tracing::Level::INFO);
}

thread_local! {
    /// Host callbacks fired while a puzzle context was borrowed, in dispatch
    /// order.
    static PENDING: RefCell<Vec<(Function, JsValue)>> = const { RefCell::new(Vec::new()) };
}

fn enqueue(callback: &Function, arg: JsValue) {
    PENDING.with(|p| p.borrow_mut().push((callback.clone(), arg)));
}

/// Calls the queued host callbacks in order. The first one that throws
/// aborts the rest of the chain and its exception is returned.
fn flush() -> Result<(), JsValue> {
    let pending = PENDING.with(|p| p.take());
    for (callback, arg) in pending {
        callback.call1(&JsValue::NULL, &arg)?;
    }
    Ok(())
}

/// Flushes from a context with no caller to hand the exception to.
fn flush_detached(op: &str) {
    if let Err(err) = flush() {
        tracing::warn!(error = %error_message(&err), "{op} handler threw");
    }
}

fn background_from(value: &JsValue) -> Result<Background, JsValue> {
    match value.as_string() {
        Some(path) => Ok(Background::Path(path)),
        None => from_js(value),
    }
}

fn backgrounds_from(value: &JsValue) -> Result<Vec<Background>, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(Vec::new());
    }
    Array::from(value).iter().map(|v| background_from(&v)).collect()
}

fn notify_valid(weak: Weak<RefCell<Context>>) {
    let Some(shared) = weak.upgrade() else {
        return;
    };
    let delay = shared.borrow_mut().notify_valid();
    flush_detached("valid");
    let Some(delay) = delay else {
        return;
    };
    let settle = Closure::once_into_js(move || {
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let settled = shared.borrow_mut().settle_submission();
        match settled {
            Ok(_) => flush_detached("submit"),
            Err(err) => tracing::warn!(error = %err, "could not submit solution"),
        }
    });
    let scheduled = web_sys::window()
        .ok_or_else(|| JsValue::from_str("no window"))
        .and_then(|w| {
            w.set_timeout_with_callback_and_timeout_and_arguments_0(
                settle.unchecked_ref(),
                delay.as_millis() as i32,
            )
        });
    if let Err(err) = scheduled {
        tracing::warn!(error = %error_message(&err), "could not schedule automatic submission");
    }
}

/// One puzzle canvas of the page.
#[wasm_bindgen]
#[derive(Clone)]
pub struct MuzzleCanvas {
    ctx: Shared<JsEngineFactory>,
    loader: BrowserLoader,
}

impl MuzzleCanvas {
    fn from_shared(ctx: Shared<JsEngineFactory>) -> Self {
        let loader = BrowserLoader::new(Rc::downgrade(&ctx));
        MuzzleCanvas { ctx, loader }
    }

    /// Hooks a freshly built canvas into validity notifications and
    /// container scaling, and hands it back to the host.
    fn after_build(&self) -> Result<JsValue, JsValue> {
        let canvas = self.canvas();
        let weak = Rc::downgrade(&self.ctx);
        let on_valid = Closure::<dyn FnMut()>::wrap(Box::new(move || {
            let weak = weak.clone();
            spawn_local(async move { notify_valid(weak) });
        }));
        if let Some(engine) = self.ctx.borrow().canvas() {
            engine.on_valid(on_valid.as_ref().unchecked_ref())?;
        }
        on_valid.forget();
        self.set_up_scaler()?;
        Ok(canvas)
    }

    fn set_up_scaler(&self) -> Result<(), JsValue> {
        if !self.ctx.borrow().follows_container() {
            return Ok(());
        }
        let window = web_sys::window().ok_or("no window")?;
        let weak = Rc::downgrade(&self.ctx);
        let rescale = Closure::<dyn FnMut()>::wrap(Box::new(move || {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let Ok(mut muzzle) = shared.try_borrow_mut() else {
                return;
            };
            let Some(container) = web_sys::window()
                .and_then(|w| w.document())
                .and_then(|d| d.get_element_by_id(muzzle.canvas_id()))
            else {
                return;
            };
            let width = container
                .dyn_ref::<HtmlElement>()
                .map(|e| e.offset_width())
                .unwrap_or_else(|| container.client_width());
            muzzle.scale(f64::from(width), f64::from(container.scroll_height()));
        }));
        for event in ["resize", "load"] {
            window.add_event_listener_with_callback(event, rescale.as_ref().unchecked_ref())?;
        }
        rescale.forget();
        Ok(())
    }

    async fn build_basic(self, x: u32, y: u32, background: JsValue) -> Result<JsValue, JsValue> {
        let (x, y) = (x as usize, y as usize);
        let background = background_from(&background)?;
        self.ctx.borrow_mut().prepare_basic(x, y).map_err(js_error)?;
        let image = background.load(&self.loader).await.map_err(js_error)?;
        self.ctx
            .borrow_mut()
            .assemble_basic(x, y, image)
            .map_err(js_error)?;
        let canvas = self.after_build()?;
        flush()?;
        Ok(canvas)
    }

    async fn build_match(
        self,
        lefts: Vec<Background>,
        rights: Vec<Background>,
        options: MatchOptions,
    ) -> Result<JsValue, JsValue> {
        let requests = self
            .ctx
            .borrow_mut()
            .prepare_match(&lefts, &rights, &options)
            .map_err(js_error)?;
        let factory = self.ctx.borrow().template_factory(&self.loader);
        let templates = factory.create(requests).await.map_err(js_error)?;
        self.ctx
            .borrow_mut()
            .assemble_match(lefts.len(), templates)
            .map_err(js_error)?;
        let canvas = self.after_build()?;
        flush()?;
        Ok(canvas)
    }
}

#[wasm_bindgen]
impl MuzzleCanvas {
    #[wasm_bindgen(getter, js_name = canvasId)]
    pub fn canvas_id(&self) -> String {
        self.ctx.borrow().canvas_id().to_string()
    }

    /// The underlying `headbreaker.Canvas`, or `undefined` before a build.
    #[wasm_bindgen(getter)]
    pub fn canvas(&self) -> JsValue {
        self.ctx
            .borrow()
            .canvas()
            .map(|e| e.js().clone())
            .unwrap_or(JsValue::UNDEFINED)
    }

    /// Applies host options. Options set here win over build defaults.
    pub fn configure(&self, options: JsValue) -> Result<(), JsValue> {
        let settings: Settings = from_js(&options)?;
        self.ctx.borrow_mut().settings_mut().merge(settings);
        Ok(())
    }

    #[wasm_bindgen(js_name = setPreviousSolutionContent)]
    pub fn set_previous_solution_content(&self, content: Option<String>) {
        self.ctx.borrow_mut().settings_mut().previous_solution_content = content;
    }

    pub fn expect(&self, refs: JsValue) -> Result<(), JsValue> {
        let refs: Vec<Point> = from_js(&refs)?;
        self.ctx.borrow_mut().expect(refs);
        Ok(())
    }

    /// Grid jigsaw of `x` columns and `y` rows. Resolves with the canvas.
    pub fn basic(&self, x: u32, y: u32, background: JsValue) -> Promise {
        future_to_promise(self.clone().build_basic(x, y, background))
    }

    #[wasm_bindgen(js_name = "match")]
    pub fn match_puzzle(&self, lefts: JsValue, rights: JsValue, options: JsValue) -> Promise {
        let this = self.clone();
        future_to_promise(async move {
            let options = if options.is_undefined() || options.is_null() {
                MatchOptions::default()
            } else {
                from_js(&options)?
            };
            this.build_match(backgrounds_from(&lefts)?, backgrounds_from(&rights)?, options)
                .await
        })
    }

    pub fn choose(&self, left: JsValue, right: JsValue, left_odds: JsValue) -> Promise {
        let this = self.clone();
        future_to_promise(async move {
            this.ctx.borrow_mut().prepare_choose();
            let options = MatchOptions {
                left_odd_assets: backgrounds_from(&left_odds)?,
                ..MatchOptions::default()
            };
            let lefts = vec![background_from(&left)?];
            let rights = vec![background_from(&right)?];
            this.build_match(lefts, rights, options).await
        })
    }

    /// Adopts a canvas the host built itself. Resolves with that canvas.
    pub fn custom(&self, canvas: JsValue) -> Promise {
        let this = self.clone();
        future_to_promise(async move {
            this.ctx.borrow_mut().custom(JsEngine::new(canvas));
            let canvas = this.after_build()?;
            flush()?;
            Ok(canvas)
        })
    }

    pub fn ready(&self) -> Result<(), JsValue> {
        self.ctx.borrow_mut().ready();
        flush()
    }

    #[wasm_bindgen(js_name = onReady)]
    pub fn on_ready(&self, callback: Function) {
        self.ctx
            .borrow_mut()
            .events()
            .on_ready(move || enqueue(&callback, JsValue::UNDEFINED));
    }

    #[wasm_bindgen(js_name = onValid)]
    pub fn on_valid(&self, callback: Function) {
        self.ctx
            .borrow_mut()
            .events()
            .on_valid(move || enqueue(&callback, JsValue::UNDEFINED));
    }

    #[wasm_bindgen(js_name = onSubmit)]
    pub fn on_submit(&self, callback: Function) {
        self.ctx.borrow_mut().events().on_submit(move |payload| match to_js(payload) {
            Ok(payload) => enqueue(&callback, payload),
            Err(err) => log(&format!("could not encode submission: {}", error_message(&err))),
        });
    }

    /// Runs `callback` once the puzzle is ready, or right away if it already is.
    pub fn run(&self, callback: Function) -> Result<(), JsValue> {
        self.ctx
            .borrow_mut()
            .events()
            .run(move || enqueue(&callback, JsValue::UNDEFINED));
        flush()
    }

    pub fn submit(&self) -> Result<JsValue, JsValue> {
        let submitted = self.ctx.borrow_mut().submit().map_err(js_error)?;
        flush()?;
        match submitted {
            Some(payload) => to_js(&payload),
            None => Ok(JsValue::UNDEFINED),
        }
    }

    pub fn solution(&self) -> Result<JsValue, JsValue> {
        match self.ctx.borrow().solution() {
            Some(solution) => to_js(&solution),
            None => Ok(JsValue::UNDEFINED),
        }
    }

    #[wasm_bindgen(getter, js_name = solutionContent)]
    pub fn solution_content(&self) -> Result<Option<String>, JsValue> {
        self.ctx.borrow().solution_content().map_err(js_error)
    }

    #[wasm_bindgen(js_name = loadSolution)]
    pub fn load_solution(&self, solution: JsValue) -> Result<(), JsValue> {
        let solution: Solution = from_js(&solution)?;
        self.ctx.borrow_mut().load_solution(&solution);
        Ok(())
    }

    #[wasm_bindgen(getter, js_name = clientResultStatus)]
    pub fn client_result_status(&self) -> String {
        self.ctx.borrow().client_result_status().as_str().to_string()
    }

    /// Stores the current solution as the previous one and returns it.
    #[wasm_bindgen(js_name = syncContent)]
    pub fn sync_content(&self) -> Result<Option<String>, JsValue> {
        self.ctx.borrow_mut().sync_content().map_err(js_error)
    }

    pub fn scale(&self, width: f64, height: f64) -> bool {
        self.ctx.borrow_mut().scale(width, height)
    }
}

/// The page level entry point: the main canvas plus auxiliary ones.
#[wasm_bindgen]
pub struct Muzzle {
    page: Page<JsEngineFactory>,
}

impl Default for Muzzle {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl Muzzle {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Muzzle {
        Muzzle {
            page: Page::new(JsEngineFactory),
        }
    }

    #[wasm_bindgen(getter)]
    pub fn main(&self) -> MuzzleCanvas {
        MuzzleCanvas::from_shared(self.page.main())
    }

    /// Creates the puzzle of the canvas with the given element id.
    pub fn another(&mut self, id: &str) -> MuzzleCanvas {
        MuzzleCanvas::from_shared(self.page.another(id))
    }

    pub fn image(image_url: String) -> Result<JsValue, JsValue> {
        to_js(&Background::image(image_url))
    }

    pub fn animation(
        patch_url: String,
        animation_interval: Option<u32>,
        patch_width: Option<u32>,
        patch_height: Option<u32>,
    ) -> Result<JsValue, JsValue> {
        let mut animation = Animation::new(patch_url);
        if let Some(interval) = animation_interval {
            animation.animation_interval = interval;
        }
        if let Some(w) = patch_width {
            animation.patch_width = w;
        }
        if let Some(h) = patch_height {
            animation.patch_height = h;
        }
        to_js(&Background::Animation(animation))
    }
}
