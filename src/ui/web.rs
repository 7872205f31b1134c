use crate::core::config::{BackendConfig, Config};
use crate::core::error::{RequestKind, WizardError};
use crate::core::io::{Storage, WebStorage};
use crate::core::prefs::RoleNames;
use crate::core::settings::{Language, Mode, ScriptLength, SettingsField};
use crate::core::voice::{VoiceParams, EMOTIONS, PITCH_RANGE, SPEED_RANGE, VOLUME_RANGE};
use crate::core::wizard::{SourceMode, Step};
use crate::services::acquisition::{SourceFile, SourceInput, MAX_FILE_BYTES};
use crate::services::api::HttpBackend;
use crate::services::synthesis::{ObjectUrlSink, Playback, ProgressState, ProgressTicker};
use crate::services::workflow::{
    fetch_extraction, fetch_synthesis, WizardController, SCRIPT_EXPORT_NAME,
};
use leptos::*;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use wasm_bindgen_futures::JsFuture;

/// Shared handle to the controller. Views re-read it whenever `version`
/// changes; the RefCell is never borrowed across an await.
#[derive(Clone)]
struct Wizard {
    ctrl: Rc<RefCell<WizardController>>,
    version: RwSignal<u32>,
    notice: RwSignal<Option<String>>,
}

impl Wizard {
    fn read<T>(&self, f: impl FnOnce(&WizardController) -> T) -> T {
        self.version.get();
        f(&self.ctrl.borrow())
    }

    fn peek<T>(&self, f: impl FnOnce(&WizardController) -> T) -> T {
        f(&self.ctrl.borrow())
    }

    fn update<T>(&self, f: impl FnOnce(&mut WizardController) -> T) -> T {
        let out = f(&mut self.ctrl.borrow_mut());
        self.version.update(|v| *v = v.wrapping_add(1));
        out
    }

    fn notify(&self, msg: impl Into<String>) {
        self.notice.set(Some(msg.into()));
    }

    fn busy(&self, kind: RequestKind) -> bool {
        self.read(|c| c.state().requests.is_busy(kind))
    }
}

fn use_wizard() -> Wizard {
    expect_context::<Wizard>()
}

async fn build_controller() -> anyhow::Result<WizardController> {
    let origin = web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .unwrap_or_default();
    let config = Config {
        backend: BackendConfig {
            base_url: origin,
            timeout_seconds: None,
        },
        ..Config::default()
    };
    let backend = Arc::new(HttpBackend::new(&config.backend)?);
    let storage = Arc::new(WebStorage::new()?);
    WizardController::new(config, backend, storage, Arc::new(ObjectUrlSink)).await
}

#[component]
pub fn App() -> impl IntoView {
    let (controller, set_controller) = create_signal(None::<Result<Wizard, String>>);
    let version = create_rw_signal(0);
    let notice = create_rw_signal(None);

    spawn_local(async move {
        let res = build_controller()
            .await
            .map(|c| Wizard {
                ctrl: Rc::new(RefCell::new(c)),
                version,
                notice,
            })
            .map_err(|e| format!("{:#}", e));
        set_controller.set(Some(res));
    });

    view! {
        <div class="app-container">
            <h1>"Podcast Wizard"</h1>
            {move || match controller.get() {
                Some(Ok(w)) => {
                    provide_context(w);
                    view! { <WizardView/> }.into_view()
                }
                Some(Err(e)) => view! { <p class="error">"Failed to start: " {e}</p> }.into_view(),
                None => view! { <p>"Loading..."</p> }.into_view(),
            }}
        </div>
    }
}

#[component]
fn WizardView() -> impl IntoView {
    let w = use_wizard();
    let step = create_memo({
        let w = w.clone();
        move |_| w.read(|c| c.state().step())
    });

    let indicator = Step::ALL
        .into_iter()
        .map(|target| {
            let on_click = {
                let w = w.clone();
                move |_| {
                    if let Err(e) = w.update(|c| c.jump_to(target)) {
                        w.notify(e.to_string());
                    }
                }
            };
            view! {
                <button
                    class="step"
                    class:active=move || step.get() == target
                    class:done=move || step.get() > target
                    on:click=on_click
                >
                    {target.to_string()}
                </button>
            }
        })
        .collect_view();

    let notice = w.notice;
    let w_next = w.clone();
    let w_back = w.clone();

    view! {
        <nav class="steps">{indicator}</nav>
        {move || notice.get().map(|msg| view! {
            <div class="notice" on:click=move |_| notice.set(None)>{msg}</div>
        })}
        <section class="panel">
            {move || match step.get() {
                Step::Upload => view! { <UploadPanel/> }.into_view(),
                Step::Settings => view! { <SettingsPanel/> }.into_view(),
                Step::Script => view! { <ScriptPanel/> }.into_view(),
                Step::Synthesis => view! { <SynthesisPanel/> }.into_view(),
            }}
        </section>
        <footer class="nav">
            <button
                disabled=move || step.get() == Step::Upload
                on:click=move |_| { w_back.update(|c| c.back()); }
            >
                "Back"
            </button>
            <button
                disabled=move || step.get() == Step::Synthesis
                on:click=move |_| {
                    if let Err(e) = w_next.update(|c| c.advance()) {
                        w_next.notify(e.to_string());
                    }
                }
            >
                "Next"
            </button>
        </footer>
    }
}

// --- Step 1 ---

fn run_extraction(w: Wizard, input: SourceInput) {
    let token = match w.update(|c| c.begin_extract()) {
        Ok(t) => t,
        Err(e) => return w.notify(e.to_string()),
    };
    spawn_local(async move {
        let backend = w.peek(|c| c.backend());
        let response = fetch_extraction(backend.as_ref(), &input).await;
        match w.update(|c| c.finish_extract(token, response)) {
            Ok(text) => w.notify(format!("Extracted {} characters", text.chars().count())),
            Err(e) => w.notify(format!("Extraction failed: {}", e)),
        }
    });
}

async fn read_file(file: web_sys::File) -> Result<SourceFile, WizardError> {
    if file.size() >= MAX_FILE_BYTES as f64 {
        return Err(WizardError::validation("File must be smaller than 10 MB"));
    }
    let buffer = JsFuture::from(file.array_buffer())
        .await
        .map_err(|e| WizardError::validation(format!("Cannot read file: {:?}", e)))?;
    let bytes = js_sys::Uint8Array::new(&buffer).to_vec();
    let mime = file.type_();
    SourceFile::new(&file.name(), bytes, (!mime.is_empty()).then_some(mime.as_str()))
}

#[component]
fn UploadPanel() -> impl IntoView {
    let w = use_wizard();
    let url = create_rw_signal(String::new());

    let mode = {
        let w = w.clone();
        move || w.read(|c| c.state().source_mode)
    };
    let busy = {
        let w = w.clone();
        move || w.busy(RequestKind::Extract)
    };
    let preview = {
        let w = w.clone();
        move || w.read(|c| c.state().normalized_content())
    };

    let set_mode = {
        let w = w.clone();
        move |m: SourceMode| w.update(|c| c.state_mut().source_mode = m)
    };
    let set_mode_url = set_mode.clone();

    let on_file = {
        let w = w.clone();
        move |ev: ev::Event| {
            let input = event_target::<web_sys::HtmlInputElement>(&ev);
            let Some(file) = input.files().and_then(|f| f.get(0)) else {
                return;
            };
            let w = w.clone();
            spawn_local(async move {
                match read_file(file).await {
                    Ok(file) => run_extraction(w, SourceInput::File(file)),
                    Err(e) => w.notify(e.to_string()),
                }
            });
        }
    };

    let on_url = {
        let w = w.clone();
        move |_| match SourceInput::url(&url.get_untracked()) {
            Ok(input) => run_extraction(w.clone(), input),
            Err(e) => w.notify(e.to_string()),
        }
    };
    let mode_for_body = mode.clone();
    let busy_status = busy.clone();

    view! {
        <h2>{Step::Upload.title()}</h2>
        <div class="tabs">
            <button class:active={let m = mode.clone(); move || m() == SourceMode::File}
                on:click=move |_| set_mode(SourceMode::File)>"File"</button>
            <button class:active=move || mode() == SourceMode::Url
                on:click=move |_| set_mode_url(SourceMode::Url)>"URL"</button>
        </div>
        {move || match mode_for_body() {
            SourceMode::File => view! {
                <input type="file" accept=".pdf,.docx,.doc,.txt"
                    disabled=busy.clone() on:change=on_file.clone()/>
            }.into_view(),
            SourceMode::Url => view! {
                <input type="url" placeholder="https://"
                    prop:value=move || url.get()
                    on:input=move |ev| url.set(event_target_value(&ev))/>
                <button disabled=busy.clone() on:click=on_url.clone()>"Extract"</button>
            }.into_view(),
        }}
        <p class="status">{move || busy_status().then_some("Extracting...")}</p>
        <pre class="preview">{preview}</pre>
    }
}

// --- Step 2 ---

fn parse_language(code: &str) -> Language {
    if code == Language::En.code() { Language::En } else { Language::Zh }
}

fn parse_mode(code: &str) -> Mode {
    if code == Mode::Single.code() { Mode::Single } else { Mode::Double }
}

fn parse_length(code: &str) -> ScriptLength {
    match code {
        "short" => ScriptLength::Short,
        "long" => ScriptLength::Long,
        _ => ScriptLength::Medium,
    }
}

/// Applies a change and persists role names outside the controller borrow.
fn apply_setting(w: &Wizard, field: SettingsField) {
    let persist = field.touches_role_name();
    let names = w.update(|c| {
        c.state_mut().update_settings(field);
        RoleNames::from_settings(c.state().settings())
    });
    if persist {
        let storage: Arc<dyn Storage> = w.peek(|c| c.storage());
        spawn_local(async move {
            if let Err(e) = names.save(storage.as_ref()).await {
                log::warn!("Failed to save role names: {:#}", e);
            }
        });
    }
}

#[component]
fn TextSetting(
    label: &'static str,
    value: Signal<String>,
    on_change: Rc<dyn Fn(String) -> SettingsField>,
) -> impl IntoView {
    let w = use_wizard();
    view! {
        <label>
            {label}
            <input type="text" prop:value=move || value.get()
                on:change=move |ev| apply_setting(&w, on_change(event_target_value(&ev)))/>
        </label>
    }
}

#[component]
fn SettingsPanel() -> impl IntoView {
    let w = use_wizard();
    let settings = {
        let w = w.clone();
        Signal::derive(move || w.read(|c| c.state().settings().clone()))
    };
    let text = move |label: &'static str, get: fn(&crate::core::settings::PodcastSettings) -> String, make: fn(String) -> SettingsField| {
        view! {
            <TextSetting label=label
                value=Signal::derive(move || get(&settings.get()))
                on_change=Rc::new(make)/>
        }
    };

    let w_lang = w.clone();
    let w_mode = w.clone();
    let w_len = w.clone();

    view! {
        <h2>{Step::Settings.title()}</h2>
        {text("Title", |s| s.title.clone(), SettingsField::Title)}
        <label>
            "Preview"
            <textarea prop:value=move || settings.get().preview
                on:change={let w = w.clone(); move |ev| apply_setting(&w, SettingsField::Preview(event_target_value(&ev)))}/>
        </label>
        <label>
            "Language"
            <select prop:value=move || settings.get().language.code().to_string()
                on:change=move |ev| apply_setting(&w_lang, SettingsField::Language(parse_language(&event_target_value(&ev))))>
                <option value="zh">"中文"</option>
                <option value="en">"English"</option>
            </select>
        </label>
        <label>
            "Mode"
            <select prop:value=move || settings.get().mode.code().to_string()
                on:change=move |ev| apply_setting(&w_mode, SettingsField::Mode(parse_mode(&event_target_value(&ev))))>
                <option value="single">"Single host"</option>
                <option value="double">"Two hosts"</option>
            </select>
        </label>
        <label>
            "Script length"
            <select prop:value=move || settings.get().script_length.code().to_string()
                on:change=move |ev| apply_setting(&w_len, SettingsField::ScriptLength(parse_length(&event_target_value(&ev))))>
                <option value="short">"Short"</option>
                <option value="medium">"Medium"</option>
                <option value="long">"Long"</option>
            </select>
        </label>
        {move || match settings.get().mode {
            Mode::Single => view! {
                {text("Host name", |s| s.role1.name.clone(), SettingsField::Role1Name)}
                {text("Host style", |s| s.role1.style.clone(), SettingsField::Role1Style)}
            }.into_view(),
            Mode::Double => view! {
                {text("Host A name", |s| s.role_a.name.clone(), SettingsField::RoleAName)}
                {text("Host A style", |s| s.role_a.style.clone(), SettingsField::RoleAStyle)}
                {text("Host B name", |s| s.role_b.name.clone(), SettingsField::RoleBName)}
                {text("Host B style", |s| s.role_b.style.clone(), SettingsField::RoleBStyle)}
            }.into_view(),
        }}
    }
}

// --- Step 3 ---

#[component]
fn ScriptPanel() -> impl IntoView {
    let w = use_wizard();
    let busy = {
        let w = w.clone();
        move || w.busy(RequestKind::Generate)
    };

    let on_generate = {
        let w = w.clone();
        move |_| {
            let (token, request) = match w.update(|c| c.begin_generate()) {
                Ok(started) => started,
                Err(e) => return w.notify(e.to_string()),
            };
            let w = w.clone();
            spawn_local(async move {
                let backend = w.peek(|c| c.backend());
                let response = backend.generate_script(&request).await;
                match w.update(|c| c.finish_generate(token, response).map(|s| s.len())) {
                    Ok(0) => w.notify("The backend returned no usable script lines"),
                    Ok(_) => {}
                    Err(e) => w.notify(format!("Script generation failed: {}", e)),
                }
            });
        }
    };

    let edit = {
        let w = w.clone();
        move |f: Box<dyn FnOnce(&mut WizardController) -> Result<(), String>>| {
            if let Err(e) = w.update(f) {
                w.notify(e);
            }
        }
    };

    let lines = {
        let w = w.clone();
        move || {
            let (lines, roles, mode) = w.read(|c| {
                let s = c.state();
                (s.script.lines().to_vec(), s.script.roles(), s.settings().mode)
            });
            lines
                .into_iter()
                .enumerate()
                .map(|(i, line)| {
                    let role_options = roles
                        .iter()
                        .map(|r| {
                            let selected = *r == line.role;
                            view! { <option value=r.clone() selected=selected>{r.clone()}</option> }
                        })
                        .collect_view();
                    let (e_text, e_role, e_ins, e_del) = (edit.clone(), edit.clone(), edit.clone(), edit.clone());
                    view! {
                        <div class="line">
                            <span class="index">{i + 1}</span>
                            {(mode == Mode::Double).then(|| view! {
                                <select on:change=move |ev| {
                                    let role = event_target_value(&ev);
                                    e_role(Box::new(move |c: &mut WizardController| c.state_mut().script.set_role(i, &role).map_err(|e| e.to_string())));
                                }>{role_options}</select>
                            })}
                            <textarea prop:value=line.text.clone() on:change=move |ev| {
                                let text = event_target_value(&ev);
                                e_text(Box::new(move |c: &mut WizardController| c.state_mut().script.set_text(i, text).map_err(|e| e.to_string())));
                            }/>
                            <button title="Insert below" on:click=move |_| {
                                e_ins(Box::new(move |c: &mut WizardController| {
                                    let fallback = c.state().settings().role_labels().remove(0);
                                    c.state_mut().script.insert_after(i, &fallback).map(|_| ()).map_err(|e| e.to_string())
                                }));
                            }>"+"</button>
                            <button title="Delete" on:click=move |_| {
                                e_del(Box::new(move |c: &mut WizardController| c.state_mut().script.delete(i).map(|_| ()).map_err(|e| e.to_string())));
                            }>"×"</button>
                        </div>
                    }
                })
                .collect_view()
        }
    };

    let no_script = {
        let w = w.clone();
        move || w.read(|c| c.state().script.is_empty())
    };

    let on_download = {
        let w = w.clone();
        move |_| {
            let result = w
                .peek(|c| c.export_text())
                .map_err(|e| e.to_string())
                .and_then(|text| download_text(&text, SCRIPT_EXPORT_NAME));
            if let Err(e) = result {
                w.notify(format!("Download failed: {}", e));
            }
        }
    };

    let on_copy = {
        let w = w.clone();
        move |_| {
            let text = match w.peek(|c| c.export_text()) {
                Ok(text) => text,
                Err(e) => return w.notify(e.to_string()),
            };
            let w = w.clone();
            spawn_local(async move {
                let clipboard = window().navigator().clipboard();
                match JsFuture::from(clipboard.write_text(&text)).await {
                    Ok(_) => w.notify("Script copied to clipboard"),
                    Err(e) => w.notify(format!("Copy failed: {:?}", e)),
                }
            });
        }
    };

    view! {
        <h2>{Step::Script.title()}</h2>
        <button disabled=busy.clone() on:click=on_generate>
            {let b = busy.clone(); move || if b() { "Generating..." } else { "Generate script" }}
        </button>
        <button disabled=no_script.clone() on:click=on_download>"Download script"</button>
        <button disabled=no_script on:click=on_copy>"Copy script"</button>
        <div class="script">{lines}</div>
    }
}

/// Saves `text` as a file through a temporary anchor on a Blob URL.
fn download_text(text: &str, file_name: &str) -> Result<(), String> {
    use wasm_bindgen::{JsCast, JsValue};

    let parts = js_sys::Array::new();
    parts.push(&JsValue::from_str(text));
    let options = web_sys::BlobPropertyBag::new();
    options.set_type("text/plain;charset=utf-8");
    let blob = web_sys::Blob::new_with_str_sequence_and_options(&parts, &options)
        .map_err(|e| format!("{:?}", e))?;
    let url = web_sys::Url::create_object_url_with_blob(&blob).map_err(|e| format!("{:?}", e))?;

    let anchor = document()
        .create_element("a")
        .map_err(|e| format!("{:?}", e))?
        .dyn_into::<web_sys::HtmlAnchorElement>()
        .map_err(|_| "not an anchor element".to_string())?;
    anchor.set_href(&url);
    anchor.set_download(file_name);
    anchor.click();

    // The browser reads the URL after the click handler returns.
    set_timeout(
        move || {
            let _ = web_sys::Url::revoke_object_url(&url);
        },
        Duration::from_secs(1),
    );
    Ok(())
}

// --- Step 4 ---

#[component]
fn VoiceControls(role: usize, label: String) -> impl IntoView {
    let w = use_wizard();
    let params = {
        let w = w.clone();
        Signal::derive(move || {
            w.read(|c| {
                let tts = &c.state().tts;
                if role == 0 { tts.role1.clone() } else { tts.role2.clone() }
            })
        })
    };
    let voices = {
        let w = w.clone();
        move || w.read(|c| c.state().voices().to_vec())
    };
    let change = move |f: Box<dyn FnOnce(&mut VoiceParams)>| {
        w.update(|c| {
            let tts = &mut c.state_mut().tts;
            f(if role == 0 { &mut tts.role1 } else { &mut tts.role2 });
        });
    };
    let (c_voice, c_speed, c_volume, c_pitch, c_emotion) =
        (change.clone(), change.clone(), change.clone(), change.clone(), change);

    view! {
        <fieldset>
            <legend>{label}</legend>
            <select on:change=move |ev| {
                let v = event_target_value(&ev);
                c_voice(Box::new(move |p: &mut VoiceParams| p.voice = v));
            }>
                {move || {
                    let current = params.get().voice;
                    voices().into_iter().map(|v| {
                        let selected = v.value == current;
                        view! { <option value=v.value.clone() selected=selected>{v.display_name().to_string()}</option> }
                    }).collect_view()
                }}
            </select>
            <label>"Speed " {move || params.get().speed}
                <input type="range" min=SPEED_RANGE.0 max=SPEED_RANGE.1 step="0.1"
                    prop:value=move || params.get().speed
                    on:change=move |ev| {
                        if let Ok(v) = event_target_value(&ev).parse::<f32>() {
                            c_speed(Box::new(move |p: &mut VoiceParams| p.set_speed(v)));
                        }
                    }/>
            </label>
            <label>"Volume " {move || params.get().volume}
                <input type="range" min=VOLUME_RANGE.0 max=VOLUME_RANGE.1 step="0.1"
                    prop:value=move || params.get().volume
                    on:change=move |ev| {
                        if let Ok(v) = event_target_value(&ev).parse::<f32>() {
                            c_volume(Box::new(move |p: &mut VoiceParams| p.set_volume(v)));
                        }
                    }/>
            </label>
            <label>"Pitch " {move || params.get().pitch}
                <input type="range" min=PITCH_RANGE.0 max=PITCH_RANGE.1 step="1"
                    prop:value=move || params.get().pitch
                    on:change=move |ev| {
                        if let Ok(v) = event_target_value(&ev).parse::<i32>() {
                            c_pitch(Box::new(move |p: &mut VoiceParams| p.set_pitch(v)));
                        }
                    }/>
            </label>
            <label>"Emotion"
                <select on:change=move |ev| {
                    let e = event_target_value(&ev);
                    c_emotion(Box::new(move |p: &mut VoiceParams| p.emotion = e));
                }>
                    {move || {
                        let current = params.get().emotion;
                        EMOTIONS.iter().map(|e| view! {
                            <option value={*e} selected={*e == current}>{*e}</option>
                        }).collect_view()
                    }}
                </select>
            </label>
        </fieldset>
    }
}

#[component]
fn SynthesisPanel() -> impl IntoView {
    let w = use_wizard();
    let ticker = create_rw_signal(None::<ProgressTicker>);
    let playback = create_rw_signal(Playback::default());
    let audio_ref = create_node_ref::<html::Audio>();

    // Refresh the catalog every time the panel is shown.
    match w.update(|c| c.begin_voices()) {
        Ok(token) => {
            let w = w.clone();
            spawn_local(async move {
                let backend = w.peek(|c| c.backend());
                let response = backend.available_voices().await;
                if let Err(e) = w.update(|c| c.finish_voices(token, response).map(|_| ())) {
                    w.notify(format!("Could not load voices: {}", e));
                }
            });
        }
        Err(e) => log::debug!("{}", e),
    }

    let labels = {
        let w = w.clone();
        create_memo(move |_| w.read(|c| c.state().settings().role_labels()))
    };
    let locator = {
        let w = w.clone();
        Signal::derive(move || w.read(|c| c.state().audio().map(|a| a.locator.clone())))
    };
    let busy = {
        let w = w.clone();
        move || w.busy(RequestKind::Synthesize)
    };

    let on_synthesize = {
        let w = w.clone();
        move |_| {
            let (token, form) = match w.update(|c| c.begin_synthesis()) {
                Ok(started) => started,
                Err(e) => return w.notify(e.to_string()),
            };
            let cfg = w.peek(|c| c.config().synthesis.clone());
            ticker.set(Some(ProgressTicker::new(&cfg)));
            let interval = set_interval_with_handle(
                move || ticker.update(|t| if let Some(t) = t { t.tick(); }),
                Duration::from_millis(cfg.progress_interval_ms.max(1)),
            )
            .ok();

            let w = w.clone();
            spawn_local(async move {
                let (backend, sink) = w.peek(|c| (c.backend(), c.sink()));
                let result = fetch_synthesis(backend.as_ref(), sink.as_ref(), &form).await;
                if let Some(handle) = interval {
                    handle.clear();
                }
                let outcome = w.update(|c| c.finish_synthesis(token, result).map(|_| ()));
                ticker.update(|t| {
                    if let Some(t) = t {
                        match &outcome {
                            Ok(()) => t.complete(),
                            Err(e) => t.fail(e),
                        }
                    }
                });
                if outcome.is_ok() {
                    playback.set(Playback::default());
                }
            });
        }
    };

    let toggle = move |_| {
        let Some(audio) = audio_ref.get() else { return };
        if playback.try_update(|p| p.toggle()).unwrap_or(false) {
            if let Err(e) = audio.play() {
                log::warn!("Playback failed: {:?}", e);
                playback.update(|p| { p.toggle(); });
            }
        } else if let Err(e) = audio.pause() {
            log::warn!("Pause failed: {:?}", e);
        }
    };

    let on_seek = move |ev: ev::Event| {
        let Ok(target) = event_target_value(&ev).parse::<f64>() else { return };
        let pos = playback.try_update(|p| p.seek(target)).unwrap_or(0.0);
        if let Some(audio) = audio_ref.get() {
            audio.set_current_time(pos);
        }
    };

    view! {
        <h2>{Step::Synthesis.title()}</h2>
        {move || labels.get().into_iter().enumerate().map(|(role, label)| view! {
            <VoiceControls role=role label=label/>
        }).collect_view()}
        <button disabled=busy.clone() on:click=on_synthesize>"Synthesize"</button>
        {move || ticker.get().map(|t| view! {
            <div class="progress" class:failed={matches!(t.state(), ProgressState::Failed(_))}>
                <progress max="100" value=t.percent()></progress>
                <span>{t.label()}</span>
            </div>
        })}
        {move || locator.get().map(|src| view! {
            <div class="player">
                <audio
                    node_ref=audio_ref
                    src=src.clone()
                    on:loadedmetadata=move |_| {
                        if let Some(a) = audio_ref.get() {
                            playback.update(|p| p.on_loaded(a.duration()));
                        }
                    }
                    on:timeupdate=move |_| {
                        if let Some(a) = audio_ref.get() {
                            playback.update(|p| p.on_time_update(a.current_time()));
                        }
                    }
                    on:ended=move |_| playback.update(|p| p.on_ended())
                ></audio>
                <button on:click=toggle>
                    {move || if playback.get().is_playing() { "Pause" } else { "Play" }}
                </button>
                <input type="range" min="0" step="0.1"
                    max=move || playback.get().duration().unwrap_or(0.0)
                    prop:value=move || playback.get().position()
                    on:change=on_seek/>
                <span class="time">{move || playback.get().display()}</span>
                <a href=src download="podcast">"Download"</a>
            </div>
        })}
    }
}
