use serde::Serialize;

/// Notifications for the surrounding UI, drained by the host after each call.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PianoEvent {
    Progress { index: usize, percentage: u32 },
    PieceLoaded { key: String, groups: usize },
    SketchError { message: String, frame: u64 },
}

/// Hand every event to `deliver`, even after one of them fails. Returns the
/// first failure.
pub fn deliver_all<E>(
    events: Vec<PianoEvent>,
    mut deliver: impl FnMut(&PianoEvent) -> Result<(), E>,
) -> Result<(), E> {
    let mut first_err = None;
    for event in &events {
        if let Err(e) = deliver(event) {
            log::warn!("event listener failed on {:?}", event);
            first_err.get_or_insert(e);
        }
    }
    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
