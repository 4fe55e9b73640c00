//! Per-frame user sketch callbacks, isolated so a failing sketch cannot take
//! the piano down with it.

use serde::Serialize;

use crate::audio::amplitude::MelodyAmplitude;

/// What a sketch callback gets to see each frame.
#[derive(Clone, Debug)]
pub struct SketchContext {
    pub amplitude: MelodyAmplitude,
    pub frame: u64,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SketchFault {
    pub message: String,
    pub frame: u64,
}

pub type SketchCallback = Box<dyn FnMut(&SketchContext) -> anyhow::Result<()>>;

/// Runs a callback once per frame until it fails once. After the first
/// error the callback is never entered again.
pub struct SketchGuard {
    callback: SketchCallback,
    faulted: bool,
}

impl SketchGuard {
    pub fn new(callback: SketchCallback) -> Self {
        SketchGuard {
            callback,
            faulted: false,
        }
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// `Some` only on the frame the callback first fails.
    pub fn run(&mut self, ctx: &SketchContext) -> Option<SketchFault> {
        if self.faulted {
            return None;
        }
        match (self.callback)(ctx) {
            Ok(()) => None,
            Err(e) => {
                self.faulted = true;
                log::warn!("sketch failed on frame {}: {:#}", ctx.frame, e);
                Some(SketchFault {
                    message: format!("{:#}", e),
                    frame: ctx.frame,
                })
            }
        }
    }
}

impl std::fmt::Debug for SketchGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SketchGuard")
            .field("faulted", &self.faulted)
            .finish_non_exhaustive()
    }
}
