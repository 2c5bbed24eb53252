#![cfg(target_arch = "wasm32")]

use js_sys::{Function, Reflect};
use muzzle_wasm::{Muzzle, MuzzleCanvas};
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

/// A host-built canvas exposing just what the bindings touch.
fn host_canvas(valid: bool) -> JsValue {
    Function::new_no_args(&format!(
        "return {{ valid: {valid}, onValid() {{}}, draw() {{}}, redraw() {{}}, \
         puzzle: {{ points: [], pieces: [] }} }};"
    ))
    .call0(&JsValue::NULL)
    .unwrap()
}

/// A callback appending `name` to `globalThis[log]`.
fn recorder(log: &str, name: &str) -> Function {
    Function::new_no_args(&format!(
        "(globalThis.{log} = globalThis.{log} || []).push('{name}');"
    ))
}

fn recorded(log: &str) -> Vec<String> {
    let value = Reflect::get(&js_sys::global(), &JsValue::from_str(log)).unwrap();
    if value.is_undefined() {
        return Vec::new();
    }
    js_sys::Array::from(&value)
        .iter()
        .filter_map(|v| v.as_string())
        .collect()
}

async fn adopted(valid: bool) -> (MuzzleCanvas, JsValue) {
    let canvas = Muzzle::new().main();
    let host = host_canvas(valid);
    let resolved = JsFuture::from(canvas.custom(host.clone())).await.unwrap();
    (canvas, resolved)
}

#[wasm_bindgen_test]
async fn custom_resolves_with_the_adopted_canvas() {
    let (canvas, resolved) = adopted(true).await;
    assert!(js_sys::Object::is(&resolved, &canvas.canvas()));
}

#[wasm_bindgen_test]
async fn custom_canvases_report_their_own_validity() {
    let (solved, _) = adopted(true).await;
    assert_eq!(solved.client_result_status(), "passed");
    let (unsolved, _) = adopted(false).await;
    assert_eq!(unsolved.client_result_status(), "failed");
}

#[wasm_bindgen_test]
async fn run_after_ready_calls_back_before_returning() {
    let (canvas, _) = adopted(true).await;
    canvas.run(recorder("__muzzle_run", "late")).unwrap();
    assert_eq!(recorded("__muzzle_run"), ["late"]);
}

#[wasm_bindgen_test]
async fn a_throwing_handler_stops_the_chain() {
    let (canvas, _) = adopted(true).await;
    canvas.on_ready(recorder("__muzzle_chain", "older"));
    canvas.on_ready(Function::new_no_args("throw new Error('boom');"));
    assert!(canvas.ready().is_err());
    assert!(recorded("__muzzle_chain").is_empty());
}

#[wasm_bindgen_test]
async fn ready_handlers_run_newest_first() {
    let (canvas, _) = adopted(true).await;
    canvas.on_ready(recorder("__muzzle_order", "first"));
    canvas.on_ready(recorder("__muzzle_order", "second"));
    canvas.ready().unwrap();
    assert_eq!(recorded("__muzzle_order"), ["second", "first"]);
}
