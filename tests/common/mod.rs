#![allow(dead_code)]

use std::sync::Once;

use wgpu_triangle::{init_logging, ContextConfig, GraphicsContext, LoggingConfig};

pub const SIZE: u32 = 64;

/// Set to make GPU tests fail instead of skipping when no adapter exists.
pub const REQUIRE_GPU_VAR: &str = "WGPU_TRIANGLE_REQUIRE_GPU";

static SKIP_NOTICE: Once = Once::new();

/// A small offscreen context, or `None` when the machine has no usable
/// adapter and [`REQUIRE_GPU_VAR`] is unset.
pub fn headless() -> Option<GraphicsContext> {
    init_logging(LoggingConfig::default());

    match pollster::block_on(GraphicsContext::headless(&ContextConfig::offscreen(SIZE, SIZE))) {
        Ok(context) => Some(context),
        Err(error) if std::env::var_os(REQUIRE_GPU_VAR).is_some() => {
            panic!("{REQUIRE_GPU_VAR} is set but no GPU context is available: {error:#}")
        }
        Err(error) => {
            SKIP_NOTICE.call_once(|| {
                eprintln!(
                    "\n*** GPU TESTS SKIPPED: {error:#}\n*** set {REQUIRE_GPU_VAR}=1 to fail instead\n"
                );
            });
            None
        }
    }
}

pub fn assert_color(actual: [f32; 4], expected: [f32; 4]) {
    let tolerance = 1.5 / 255.0;
    for (a, e) in actual.iter().zip(expected) {
        assert!(
            (a - e).abs() <= tolerance,
            "expected {expected:?}, got {actual:?}"
        );
    }
}

macro_rules! context_or_skip {
    () => {
        match common::headless() {
            Some(context) => context,
            None => return,
        }
    };
}
pub(crate) use context_or_skip;
