//! Console logging macros
//!
//! Routes to `web_sys::console` when running as WASM. On native targets the
//! arguments are still type-checked but nothing is printed, so unit tests run
//! without a JS host.

macro_rules! console_log {
    ($($arg:tt)*) => {{
        #[cfg(target_arch = "wasm32")]
        web_sys::console::log_1(&wasm_bindgen::JsValue::from_str(&format!($($arg)*)));
        #[cfg(not(target_arch = "wasm32"))]
        if false {
            let _ = format!($($arg)*);
        };
    }};
}

macro_rules! console_warn {
    ($($arg:tt)*) => {{
        #[cfg(target_arch = "wasm32")]
        web_sys::console::warn_1(&wasm_bindgen::JsValue::from_str(&format!($($arg)*)));
        #[cfg(not(target_arch = "wasm32"))]
        if false {
            let _ = format!($($arg)*);
        };
    }};
}

macro_rules! console_error {
    ($($arg:tt)*) => {{
        #[cfg(target_arch = "wasm32")]
        web_sys::console::error_1(&wasm_bindgen::JsValue::from_str(&format!($($arg)*)));
        #[cfg(not(target_arch = "wasm32"))]
        if false {
            let _ = format!($($arg)*);
        };
    }};
}
