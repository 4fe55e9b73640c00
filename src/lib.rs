use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

pub mod audio;
pub mod binder;
pub mod config;
pub mod events;
pub mod physics;
pub mod piano;
pub mod playback;
pub mod sketch;
pub mod timeline;

use audio::synth::{AudioSink, SoundCue, ToneRequest};
use binder::CursorCoords;
use config::PianoConfig;
use piano::Piano;
use sketch::SketchContext;
use timeline::catalog::{Catalog, PieceFile};
use timeline::types::Progress;

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn from_js_or_default<T: serde::de::DeserializeOwned + Default>(value: JsValue) -> Result<T, JsValue> {
    if value.is_null() || value.is_undefined() {
        return Ok(T::default());
    }
    serde_wasm_bindgen::from_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn js_error_message(err: &JsValue) -> String {
    match err.dyn_ref::<js_sys::Error>() {
        Some(e) => String::from(e.message()),
        None => err.as_string().unwrap_or_else(|| format!("{:?}", err)),
    }
}

/// Audio sink backed by a JS object exposing `isRunning()`, `start()`,
/// `trigger(frequency, seconds, velocity)`, `playCue(name)` and
/// `waveform()`. Missing methods are skipped; with no object at all the
/// piano runs silently.
pub struct JsAudio {
    target: Option<js_sys::Object>,
}

impl JsAudio {
    fn method(&self, name: &str) -> Option<(&js_sys::Object, js_sys::Function)> {
        let target = self.target.as_ref()?;
        let f = js_sys::Reflect::get(target, &JsValue::from_str(name))
            .ok()?
            .dyn_into::<js_sys::Function>()
            .ok()?;
        Some((target, f))
    }
}

impl AudioSink for JsAudio {
    fn is_running(&self) -> bool {
        match self.method("isRunning") {
            Some((this, f)) => f
                .call0(this)
                .ok()
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            None => true,
        }
    }

    /// A synchronous `start()` that returns normally counts as running. One
    /// that returns a Promise (`Tone.start()`) is still pending, so this
    /// advance stays silent and `isRunning()` decides the next one.
    fn start(&mut self) -> anyhow::Result<()> {
        let Some((this, f)) = self.method("start") else {
            return Ok(());
        };
        let result = f
            .call0(this)
            .map_err(|e| anyhow::anyhow!("audio start failed: {}", js_error_message(&e)))?;
        if result.is_instance_of::<js_sys::Promise>() {
            anyhow::bail!("audio start is pending");
        }
        Ok(())
    }

    fn trigger(&mut self, tone: &ToneRequest) {
        let Some((this, f)) = self.method("trigger") else {
            return;
        };
        let tone = tone.clamped();
        if let Err(e) = f.call3(
            this,
            &JsValue::from_f64(tone.frequency),
            &JsValue::from_f64(tone.duration_secs),
            &JsValue::from_f64(tone.velocity),
        ) {
            log::warn!("trigger failed: {}", js_error_message(&e));
        }
    }

    fn play_cue(&mut self, cue: SoundCue) {
        let Some((this, f)) = self.method("playCue") else {
            return;
        };
        if let Err(e) = f.call1(this, &JsValue::from_str(cue.sample_name())) {
            log::warn!("cue {:?} failed: {}", cue, js_error_message(&e));
        }
    }

    fn waveform(&mut self, out: &mut Vec<f32>) {
        out.clear();
        let Some((this, f)) = self.method("waveform") else {
            return;
        };
        if let Some(frame) = f
            .call0(this)
            .ok()
            .and_then(|v| v.dyn_into::<js_sys::Float32Array>().ok())
        {
            out.resize(frame.length() as usize, 0.0);
            frame.copy_to(out);
        }
    }
}

/// Browser handle around the piano. Every time-dependent call takes the
/// host clock (`performance.now()`) in milliseconds.
#[wasm_bindgen]
pub struct MelodyPiano {
    inner: Piano<JsAudio>,
    on_event: Option<js_sys::Function>,
}

#[wasm_bindgen]
impl MelodyPiano {
    /// `audio` may be null for a silent piano; `config` and
    /// `initial_progress` may be null for defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(
        audio: JsValue,
        config: JsValue,
        initial_progress: JsValue,
    ) -> Result<MelodyPiano, JsValue> {
        let config: PianoConfig = from_js_or_default(config)?;
        let initial: Progress = from_js_or_default(initial_progress)?;
        let target = if audio.is_null() || audio.is_undefined() {
            None
        } else {
            Some(
                audio
                    .dyn_into::<js_sys::Object>()
                    .map_err(|_| JsValue::from_str("audio must be an object"))?,
            )
        };
        Ok(MelodyPiano {
            inner: Piano::new(config, JsAudio { target }, Catalog::builtin(), initial),
            on_event: None,
        })
    }

    /// Register the single notification callback. Events queued so far are
    /// delivered immediately.
    #[wasm_bindgen(js_name = onEvent)]
    pub fn on_event(&mut self, callback: js_sys::Function) -> Result<(), JsValue> {
        self.on_event = Some(callback);
        self.flush()
    }

    /// Queued events, for hosts that poll instead of registering a callback.
    #[wasm_bindgen(js_name = drainEvents)]
    pub fn drain_events(&mut self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.drain_events())
    }

    fn flush(&mut self) -> Result<(), JsValue> {
        let Some(callback) = &self.on_event else {
            return Ok(());
        };
        events::deliver_all(self.inner.drain_events(), |event| {
            callback.call1(&JsValue::NULL, &to_js(event)?).map(|_| ())
        })
    }

    pub fn play(&mut self, now: f64) -> Result<(), JsValue> {
        self.inner.play(now);
        self.flush()
    }

    pub fn stop(&mut self) {
        self.inner.stop();
    }

    pub fn resume(&mut self, now: f64) {
        self.inner.resume(now);
    }

    #[wasm_bindgen(js_name = moveTo)]
    pub fn move_to(&mut self, coords: JsValue, now: f64) -> Result<(), JsValue> {
        let coords: CursorCoords =
            serde_wasm_bindgen::from_value(coords).map_err(|e| JsValue::from_str(&e.to_string()))?;
        self.inner.move_to(coords, now);
        self.flush()
    }

    #[wasm_bindgen(js_name = moveDown)]
    pub fn move_down(&mut self, now: f64) {
        self.inner.move_down(now);
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.inner.resize(width, height);
    }

    pub fn tick(&mut self, now: f64) -> Result<(), JsValue> {
        self.inner.tick(now);
        self.flush()
    }

    pub fn scene(&self, now: f64) -> Result<JsValue, JsValue> {
        to_js(&self.inner.scene(now))
    }

    #[wasm_bindgen(js_name = selectPiece)]
    pub fn select_piece(&mut self, key: &str) -> Result<bool, JsValue> {
        let loaded = self.inner.select_piece(key);
        self.flush()?;
        Ok(loaded)
    }

    /// Add a piece from its JSON file form. Returns the number of groups.
    #[wasm_bindgen(js_name = registerPiece)]
    pub fn register_piece(&mut self, key: &str, json: &str) -> Result<usize, JsValue> {
        self.inner
            .register_piece(key, json)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = pieceKeys)]
    pub fn piece_keys(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.piece_keys())
    }

    #[wasm_bindgen(js_name = pieceKey)]
    pub fn piece_key(&self) -> String {
        self.inner.piece_key().to_string()
    }

    #[wasm_bindgen(js_name = isStarted)]
    pub fn is_started(&self) -> bool {
        self.inner.is_started()
    }

    pub fn progress(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.progress())
    }

    /// RMS level of the last analyser frame.
    pub fn amplitude(&self) -> f32 {
        self.inner.amplitude().get()
    }

    /// Play a feedback sample by name (`kick`, `snare`, `hh`, `hho`) or by
    /// the editor action it stands for (`save`, `success`, `failure`, `move`).
    #[wasm_bindgen(js_name = playCue)]
    pub fn play_cue(&mut self, name: &str) -> Result<(), JsValue> {
        let cue = SoundCue::from_name(name)
            .ok_or_else(|| JsValue::from_str(&format!("unknown cue: {}", name)))?;
        self.inner.play_cue(cue);
        Ok(())
    }

    /// Run `draw(amplitude, frame)` on every tick until it throws once.
    #[wasm_bindgen(js_name = attachSketch)]
    pub fn attach_sketch(&mut self, draw: js_sys::Function) {
        self.inner
            .attach_sketch(Box::new(move |ctx: &SketchContext| -> anyhow::Result<()> {
                draw.call2(
                    &JsValue::NULL,
                    &JsValue::from_f64(ctx.amplitude.get() as f64),
                    &JsValue::from_f64(ctx.frame as f64),
                )
                .map(|_| ())
                .map_err(|e| anyhow::anyhow!(js_error_message(&e)))
            }));
    }

    #[wasm_bindgen(js_name = detachSketch)]
    pub fn detach_sketch(&mut self) {
        self.inner.detach_sketch();
    }

    pub fn destroy(&mut self) {
        self.inner.destroy();
        self.on_event = None;
    }
}

/// Parse piece JSON into its grouped timeline.
#[wasm_bindgen(js_name = parsePiece)]
pub fn parse_piece(json: &str) -> Result<JsValue, JsValue> {
    let piece = PieceFile::from_json(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
    to_js(&piece.timeline())
}

#[wasm_bindgen(js_name = midiToFrequency)]
pub fn midi_to_frequency(pitch: f64) -> f64 {
    audio::pitch::midi_to_frequency(pitch)
}
