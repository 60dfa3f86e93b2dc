//! Millisecond clock for frames that arrive without a timestamp

cfg_if::cfg_if! {
    if #[cfg(target_arch = "wasm32")] {
        /// `performance.now()`, or 0 outside a window context
        pub fn now_ms() -> f64 {
            web_sys::window()
                .and_then(|w| w.performance())
                .map(|p| p.now())
                .unwrap_or(0.0)
        }
    } else {
        use std::sync::OnceLock;
        use std::time::Instant;

        static ORIGIN: OnceLock<Instant> = OnceLock::new();

        /// Milliseconds since the first call in this process
        pub fn now_ms() -> f64 {
            ORIGIN.get_or_init(Instant::now).elapsed().as_secs_f64() * 1000.0
        }
    }
}
