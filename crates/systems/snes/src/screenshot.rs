//! Hand-off of reference screenshots to an external writer.
//!
//! The capture store raises a request whenever it records a reference. After
//! the frame is complete the renderer converts the main screen and passes it
//! to a [`ReferenceScreenshotSink`] under the current screenshot id. The
//! request is consumed and the id advanced even when the sink fails, so a
//! broken writer costs one screenshot and never stalls rendering.

use gfx_core::logging::{log, LogCategory, LogLevel};
use gfx_core::types::Frame;

use crate::capture::CaptureStore;
use crate::ScreenshotError;

/// Receives the frames that reference records point at.
pub trait ReferenceScreenshotSink {
    fn capture(&mut self, screenshot_id: u32, frame: &Frame) -> Result<(), ScreenshotError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenshotOutcome {
    /// Nothing was requested.
    Idle,
    Captured(u32),
    Failed(u32),
}

/// Serve a pending request with `frame`.
pub fn service_reference_screenshot<S: ReferenceScreenshotSink + ?Sized>(
    store: &mut CaptureStore,
    frame: &Frame,
    sink: &mut S,
) -> ScreenshotOutcome {
    if !store.reference_screenshot_requested() {
        return ScreenshotOutcome::Idle;
    }

    let id = store.screenshot_id();
    let outcome = match sink.capture(id, frame) {
        Ok(()) => {
            log(LogCategory::Screenshot, LogLevel::Debug, || {
                format!("Reference screenshot {} ({}x{})", id, frame.width, frame.height)
            });
            ScreenshotOutcome::Captured(id)
        }
        Err(e) => {
            log(LogCategory::Screenshot, LogLevel::Error, || {
                format!("Reference screenshot {} failed: {}", id, e)
            });
            ScreenshotOutcome::Failed(id)
        }
    };
    store.complete_reference_screenshot();
    outcome
}
