use crate::core::content::ExtractedContent;
use crate::core::error::{RequestKind, WizardError};
use crate::core::script::Script;
use crate::core::settings::{PodcastSettings, SettingsField};
use crate::core::voice::{TtsParams, Voice};
use log::{debug, info};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    Upload = 0,
    Settings = 1,
    Script = 2,
    Synthesis = 3,
}

impl Step {
    pub const ALL: [Step; 4] = [Step::Upload, Step::Settings, Step::Script, Step::Synthesis];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Step> {
        Step::ALL.get(index).copied()
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::Upload => "Upload content",
            Step::Settings => "Podcast settings",
            Step::Script => "Script",
            Step::Synthesis => "Synthesis",
        }
    }

    fn next(self) -> Option<Step> {
        Step::from_index(self.index() + 1)
    }

    fn prev(self) -> Option<Step> {
        self.index().checked_sub(1).and_then(Step::from_index)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.index() + 1, self.title())
    }
}

/// A refused step change. The message names what is missing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StepError {
    #[error("Please upload a file or extract a URL before continuing")]
    MissingContent,
    #[error("Please generate a podcast script before continuing")]
    MissingScript,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceMode {
    #[default]
    File,
    Url,
}

/// Handle of one in-flight backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken {
    kind: RequestKind,
    id: u64,
}

impl RequestToken {
    pub fn kind(&self) -> RequestKind {
        self.kind
    }
}

/// One slot per request kind. A second request of the same kind is refused
/// while the first is running; a cancelled request's response is dropped.
#[derive(Debug, Default)]
pub struct RequestTracker {
    next_id: u64,
    in_flight: HashMap<RequestKind, u64>,
}

impl RequestTracker {
    pub fn begin(&mut self, kind: RequestKind) -> Result<RequestToken, WizardError> {
        if self.in_flight.contains_key(&kind) {
            return Err(WizardError::Busy(kind));
        }
        self.next_id += 1;
        self.in_flight.insert(kind, self.next_id);
        debug!("Request #{} ({}) started", self.next_id, kind);
        Ok(RequestToken {
            kind,
            id: self.next_id,
        })
    }

    /// Releases the slot. Returns false when the token was cancelled, in
    /// which case its response must not be applied.
    pub fn finish(&mut self, token: RequestToken) -> bool {
        match self.in_flight.get(&token.kind) {
            Some(id) if *id == token.id => {
                self.in_flight.remove(&token.kind);
                true
            }
            _ => {
                debug!("Dropping stale response #{} ({})", token.id, token.kind);
                false
            }
        }
    }

    pub fn cancel(&mut self, kind: RequestKind) {
        if self.in_flight.remove(&kind).is_some() {
            info!("Cancelled pending {} request", kind);
        }
    }

    pub fn is_busy(&self, kind: RequestKind) -> bool {
        self.in_flight.contains_key(&kind)
    }
}

/// Audio returned by the synthesis endpoint plus where it was published
/// (a file path or an object URL).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisResult {
    pub audio: Vec<u8>,
    pub locator: String,
}

/// All wizard state, owned by one controller.
#[derive(Debug)]
pub struct WizardState {
    step: Step,
    pub source_mode: SourceMode,
    content: Option<ExtractedContent>,
    settings: PodcastSettings,
    pub script: Script,
    voices: Vec<Voice>,
    pub tts: TtsParams,
    audio: Option<SynthesisResult>,
    pub requests: RequestTracker,
}

impl WizardState {
    pub fn new(settings: PodcastSettings) -> Self {
        Self {
            step: Step::Upload,
            source_mode: SourceMode::default(),
            content: None,
            settings,
            script: Script::default(),
            voices: Vec::new(),
            tts: TtsParams::default(),
            audio: None,
            requests: RequestTracker::default(),
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn content(&self) -> Option<&ExtractedContent> {
        self.content.as_ref()
    }

    pub fn normalized_content(&self) -> String {
        self.content.as_ref().map(|c| c.normalize()).unwrap_or_default()
    }

    pub fn settings(&self) -> &PodcastSettings {
        &self.settings
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn audio(&self) -> Option<&SynthesisResult> {
        self.audio.as_ref()
    }

    /// Completion predicate of `step`.
    pub fn check(&self, step: Step) -> Result<(), StepError> {
        match step {
            Step::Upload if self.normalized_content().is_empty() => Err(StepError::MissingContent),
            Step::Script if self.script.synthesis_text(self.settings.mode).is_empty() => {
                Err(StepError::MissingScript)
            }
            _ => Ok(()),
        }
    }

    pub fn advance(&mut self) -> Result<Step, StepError> {
        self.check(self.step)?;
        if let Some(next) = self.step.next() {
            info!("Wizard: {} -> {}", self.step, next);
            self.step = next;
        }
        Ok(self.step)
    }

    pub fn back(&mut self) -> Step {
        if let Some(prev) = self.step.prev() {
            info!("Wizard: {} -> {}", self.step, prev);
            self.step = prev;
        }
        self.step
    }

    /// Jumps to `target` if every step before it is complete.
    pub fn jump_to(&mut self, target: Step) -> Result<Step, StepError> {
        for step in Step::ALL.iter().take_while(|s| **s < target) {
            self.check(*step)?;
        }
        self.step = target;
        Ok(self.step)
    }

    pub fn update_settings(&mut self, field: SettingsField) {
        let current = std::mem::take(&mut self.settings);
        self.settings = current.with(field);
    }

    pub fn replace_settings(&mut self, settings: PodcastSettings) {
        self.settings = settings;
    }

    pub fn apply_extraction(&mut self, token: RequestToken, content: ExtractedContent) -> bool {
        if !self.requests.finish(token) {
            return false;
        }
        self.content = Some(content);
        true
    }

    pub fn apply_script(&mut self, token: RequestToken, script: Script) -> bool {
        if !self.requests.finish(token) {
            return false;
        }
        self.script = script;
        true
    }

    pub fn apply_voices(&mut self, token: RequestToken, voices: Vec<Voice>) -> bool {
        if !self.requests.finish(token) {
            return false;
        }
        self.tts.apply_catalog_defaults(&voices);
        self.voices = voices;
        true
    }

    /// Stores a new synthesis result and returns the audio that is no longer
    /// referenced: the previous result, or `result` itself if stale.
    pub fn apply_synthesis(
        &mut self,
        token: RequestToken,
        result: SynthesisResult,
    ) -> Option<SynthesisResult> {
        if !self.requests.finish(token) {
            return Some(result);
        }
        self.audio.replace(result)
    }

    /// Ends a failed request without touching any state.
    pub fn fail(&mut self, token: RequestToken) {
        self.requests.finish(token);
    }
}
