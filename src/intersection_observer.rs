use wasm_bindgen::{prelude::Closure, JsValue};
use web_sys::Element;

use crate::sensor::{ObservationHandle, Visibility};

mod raw {
    use wasm_bindgen::{
        prelude::{wasm_bindgen, Closure},
        JsValue,
    };
    use web_sys::Element;

    #[wasm_bindgen]
    extern "C" {
        #[wasm_bindgen(extends = ::js_sys::Object)]
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub type IntersectionObserver;
        #[wasm_bindgen(constructor, catch)]
        pub fn new(
            callback: &IntersectionCallback,
            options: &::js_sys::Object,
        ) -> Result<IntersectionObserver, JsValue>;
        #[wasm_bindgen(method, catch)]
        pub fn disconnect(this: &IntersectionObserver) -> Result<(), JsValue>;
        #[wasm_bindgen(method, catch)]
        pub fn observe(this: &IntersectionObserver, element: Element) -> Result<(), JsValue>;
        #[wasm_bindgen(method, catch)]
        pub fn unobserve(this: &IntersectionObserver, element: Element) -> Result<(), JsValue>;

        #[wasm_bindgen(extends = ::js_sys::Object)]
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub type IntersectionObserverEntry;
        #[wasm_bindgen(structural, method, getter)]
        pub fn target(this: &IntersectionObserverEntry) -> Element;
        #[wasm_bindgen(structural, method, getter, js_name = intersectionRatio)]
        pub fn intersection_ratio(this: &IntersectionObserverEntry) -> f64;
        #[wasm_bindgen(structural, method, getter, js_name = isIntersecting)]
        pub fn is_intersecting(this: &IntersectionObserverEntry) -> bool;
    }
    pub type IntersectionFn = dyn FnMut(Box<[IntersectionObserverEntry]>, IntersectionObserver);
    pub type IntersectionCallback = Closure<IntersectionFn>;
}

impl raw::IntersectionObserverEntry {
    pub fn visibility(&self) -> Visibility {
        Visibility::new(self.intersection_ratio(), self.is_intersecting())
    }
}

/// Owns a browser `IntersectionObserver` and the closure it calls back into.
/// Disconnects when dropped.
pub struct IntersectionObserver {
    closure: Option<raw::IntersectionCallback>,
    observer: raw::IntersectionObserver,
}

/// One element registered with an [`IntersectionObserver`]; unobserved when
/// dropped.
pub struct ObservedElement {
    observer: Option<raw::IntersectionObserver>,
    element: Element,
}

impl IntersectionObserver {
    pub fn new<F>(threshold: f64, mut callback: F) -> Result<IntersectionObserver, JsValue>
    where
        F: 'static + FnMut(&[raw::IntersectionObserverEntry]),
    {
        let closure = Closure::wrap(Box::new(
            move |entries: Box<[raw::IntersectionObserverEntry]>,
                  _this: raw::IntersectionObserver| { callback(&entries) },
        ) as Box<raw::IntersectionFn>);
        let options = js_sys::Object::new();
        js_sys::Reflect::set(&options, &"threshold".into(), &threshold.into())?;
        let observer = raw::IntersectionObserver::new(&closure, &options)?;
        Ok(Self {
            closure: Some(closure),
            observer,
        })
    }

    pub fn observe(&self, element: Element) -> Result<ObservedElement, JsValue> {
        self.observer.observe(element.clone())?;
        Ok(ObservedElement {
            observer: Some(self.observer.clone()),
            element,
        })
    }
}

impl ObservationHandle for ObservedElement {
    type Target = Element;

    fn target(&self) -> &Element {
        &self.element
    }
}

impl Drop for IntersectionObserver {
    fn drop(&mut self) {
        if let Some(_cb) = self.closure.take() {
            if let Err(err) = self.observer.disconnect() {
                tracing::warn!(?err, "failed to disconnect intersection observer");
            }
        }
    }
}

impl Drop for ObservedElement {
    fn drop(&mut self) {
        if let Some(this) = self.observer.take() {
            if let Err(err) = this.unobserve(self.element.clone()) {
                tracing::warn!(?err, "failed to unobserve sentinel");
            }
        }
    }
}
