use std::cell::RefCell;
use std::future::Future;
use std::rc::Weak;

use js_sys::{Array, Promise};
use muzzle_core::{
    Animation, AnimationClock, AssetLoader, Background, GeometryEngine, ImageSize, LoadError,
};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlImageElement;

use crate::canvas::frame_canvas;
use crate::engine::Context;
use crate::utils::{asset_url, error_message};

/// A decoded background: an `<img>` or, for animations, the canvas holding
/// the current frame.
#[derive(Clone, Debug)]
pub struct BoardImage {
    element: JsValue,
    width: f64,
    height: f64,
}

impl BoardImage {
    pub fn element(&self) -> &JsValue {
        &self.element
    }
}

impl ImageSize for BoardImage {
    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }
}

/// Loads backgrounds through `HtmlImageElement`s.
///
/// Animations repaint the puzzle they belong to, which is reached through a
/// weak handle so a dropped puzzle simply stops animating.
#[derive(Clone)]
pub struct BrowserLoader {
    owner: Weak<RefCell<Context>>,
}

impl BrowserLoader {
    pub fn new(owner: Weak<RefCell<Context>>) -> Self {
        BrowserLoader { owner }
    }

    fn finish(
        &self,
        background: &Background,
        sheet: HtmlImageElement,
    ) -> Result<BoardImage, LoadError> {
        match background {
            Background::Animation(animation) => {
                animate(animation, sheet, self.owner.clone()).map_err(|err| LoadError::Failed {
                    url: animation.patch_url.clone(),
                    reason: error_message(&err),
                })
            }
            _ => Ok(BoardImage {
                width: f64::from(sheet.natural_width()),
                height: f64::from(sheet.natural_height()),
                element: sheet.into(),
            }),
        }
    }
}

impl AssetLoader for BrowserLoader {
    type Image = BoardImage;

    fn load(
        &self,
        background: &Background,
    ) -> impl Future<Output = Result<BoardImage, LoadError>> {
        let backgrounds = vec![background.clone()];
        let loader = self.clone();
        async move {
            let mut images = loader.load_all(&backgrounds).await?;
            images.pop().ok_or(LoadError::Incomplete {
                requested: 1,
                loaded: 0,
            })
        }
    }

    fn load_all(
        &self,
        backgrounds: &[Background],
    ) -> impl Future<Output = Result<Vec<BoardImage>, LoadError>> {
        // every request is in flight before the first await
        let requests: Array = backgrounds
            .iter()
            .map(|b| request_image(asset_url(b.url())))
            .collect();
        let all = JsFuture::from(Promise::all(&requests));
        let backgrounds = backgrounds.to_vec();
        let loader = self.clone();
        async move {
            let loaded = all.await.map_err(|err| LoadError::Failed {
                url: error_message(&err),
                reason: "image failed to load".to_string(),
            })?;
            let sheets = Array::from(&loaded);
            backgrounds
                .iter()
                .zip(sheets.iter())
                .map(|(background, sheet)| {
                    let not_an_image = |_: JsValue| LoadError::Failed {
                        url: background.url().to_string(),
                        reason: "not an image".to_string(),
                    };
                    let sheet = sheet.dyn_into::<HtmlImageElement>().map_err(not_an_image)?;
                    loader.finish(background, sheet)
                })
                .collect()
        }
    }
}

/// Starts loading `url`. Resolves with the loaded element, rejects with the
/// url.
fn request_image(url: String) -> Promise {
    Promise::new(&mut |resolve, reject| {
        let img = match HtmlImageElement::new() {
            Ok(img) => img,
            Err(_) => {
                let _ = reject.call1(&JsValue::NULL, &JsValue::from_str(&url));
                return;
            }
        };
        let img_onload = img.clone();
        let onload = Closure::once(move || {
            let _ = resolve.call1(&JsValue::NULL, &img_onload);
        });
        let failed_url = url.clone();
        let onerror = Closure::once(move || {
            let _ = reject.call1(&JsValue::NULL, &JsValue::from_str(&failed_url));
        });
        img.set_onload(Some(onload.as_ref().unchecked_ref()));
        img.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        img.set_src(&url);
        onload.forget();
        onerror.forget();
    })
}

/// Plays `sheet` frame by frame into a detached canvas and repaints the
/// owning puzzle after every painted frame.
fn animate(
    animation: &Animation,
    sheet: HtmlImageElement,
    owner: Weak<RefCell<Context>>,
) -> Result<BoardImage, JsValue> {
    let window = web_sys::window().ok_or("no window")?;
    let document = window.document().ok_or("no document")?;
    let frame = animation.frame_size(
        f64::from(sheet.natural_width()),
        f64::from(sheet.natural_height()),
    );
    let (cv, ctx) = frame_canvas(&document, frame.0, frame.1)?;
    let mut clock = AnimationClock::new(animation);
    let tick = Closure::<dyn FnMut()>::wrap(Box::new(move || {
        let Some(shared) = owner.upgrade() else {
            return;
        };
        let Ok(muzzle) = shared.try_borrow() else {
            return;
        };
        let engine = muzzle.canvas();
        let valid = engine.is_some_and(|e| e.is_valid());
        if let Some((x, y)) = clock.tick(engine.is_some(), valid, frame) {
            ctx.clear_rect(0.0, 0.0, frame.0, frame.1);
            let _ = ctx.draw_image_with_html_image_element(&sheet, x, y);
            if let Some(engine) = engine {
                engine.repaint();
            }
        }
    }));
    window.set_interval_with_callback_and_timeout_and_arguments_0(
        tick.as_ref().unchecked_ref(),
        animation.animation_interval as i32,
    )?;
    tick.forget();
    Ok(BoardImage {
        element: cv.into(),
        width: frame.0,
        height: frame.1,
    })
}
