use crate::core::settings::{Language, Mode, ScriptLength, SettingsField};
use crate::core::voice::{VoiceParams, EMOTIONS, PITCH_RANGE, SPEED_RANGE, VOLUME_RANGE};
use crate::core::wizard::{SourceMode, Step};
use crate::services::acquisition::{SourceFile, SourceInput};
use crate::services::synthesis::ProgressTicker;
use crate::services::workflow::WizardController;
use crate::utils::audio::{format_clock, wav_duration, AudioFormat};
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{Confirm, CustomType, Select, Text};
use std::fmt;
use std::path::PathBuf;
use tokio::time::{interval, Duration};

enum Nav {
    Stay,
    Next,
    Back,
    Jump(Step),
    Quit,
}

/// Interactive terminal wizard over a [`WizardController`].
pub async fn run(controller: &mut WizardController) -> Result<()> {
    let mut mounted: Option<Step> = None;

    loop {
        let step = controller.state().step();
        if mounted != Some(step) {
            println!("\n=== {} ===", step);
            if step == Step::Synthesis {
                // voice catalog is fetched each time the panel is entered
                println!("Fetching available voices...");
                if let Err(e) = controller.load_voices().await {
                    eprintln!("Could not load voices: {}", e);
                }
            }
            mounted = Some(step);
        }

        let nav = match step {
            Step::Upload => upload_step(controller).await?,
            Step::Settings => settings_step(controller).await?,
            Step::Script => script_step(controller).await?,
            Step::Synthesis => synthesis_step(controller).await?,
        };

        match nav {
            Nav::Stay => {}
            Nav::Next => {
                if let Err(e) = controller.advance() {
                    println!("⚠ {}", e);
                }
            }
            Nav::Back => {
                controller.back();
            }
            Nav::Jump(target) => {
                if let Err(e) = controller.jump_to(target) {
                    println!("⚠ {}", e);
                }
            }
            Nav::Quit => {
                if Confirm::new("Quit the wizard?").with_default(false).prompt()? {
                    println!("Bye.");
                    return Ok(());
                }
            }
        }
    }
}

fn choose<T: fmt::Display>(prompt: &str, options: Vec<T>) -> Result<T> {
    Ok(Select::new(prompt, options).prompt()?)
}

fn pick_step() -> Result<Nav> {
    let target = choose("Jump to step:", Step::ALL.to_vec())?;
    Ok(Nav::Jump(target))
}

// --- Step 1 ---

#[derive(Clone, Copy)]
enum UploadAction {
    UploadFile,
    ExtractUrl,
    SwitchMode,
    Preview,
    Next,
    JumpTo,
    Quit,
}

impl fmt::Display for UploadAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UploadAction::UploadFile => "Upload a file (PDF, DOCX, DOC, TXT)",
            UploadAction::ExtractUrl => "Extract from URL",
            UploadAction::SwitchMode => "Switch input mode",
            UploadAction::Preview => "Preview extracted text",
            UploadAction::Next => "Next",
            UploadAction::JumpTo => "Jump to step...",
            UploadAction::Quit => "Quit",
        })
    }
}

async fn upload_step(controller: &mut WizardController) -> Result<Nav> {
    let mode = controller.state().source_mode;
    let primary = match mode {
        SourceMode::File => UploadAction::UploadFile,
        SourceMode::Url => UploadAction::ExtractUrl,
    };
    let mut options = vec![primary, UploadAction::SwitchMode];
    if controller.state().content().is_some() {
        options.push(UploadAction::Preview);
    }
    options.extend([UploadAction::Next, UploadAction::JumpTo, UploadAction::Quit]);

    match choose("What next?", options)? {
        UploadAction::UploadFile => {
            let path: String = Text::new("Path to file:").prompt()?;
            let input = match SourceFile::from_path(&PathBuf::from(path.trim())).await {
                Ok(file) => SourceInput::File(file),
                Err(e) => {
                    println!("⚠ {}", e);
                    return Ok(Nav::Stay);
                }
            };
            run_extraction(controller, input).await;
        }
        UploadAction::ExtractUrl => {
            let url: String = Text::new("URL:").prompt()?;
            match SourceInput::url(&url) {
                Ok(input) => run_extraction(controller, input).await,
                Err(e) => println!("⚠ {}", e),
            }
        }
        UploadAction::SwitchMode => {
            let state = controller.state_mut();
            state.source_mode = match mode {
                SourceMode::File => SourceMode::Url,
                SourceMode::Url => SourceMode::File,
            };
        }
        UploadAction::Preview => {
            println!("{}", preview(&controller.state().normalized_content(), 600));
        }
        UploadAction::Next => return Ok(Nav::Next),
        UploadAction::JumpTo => return pick_step(),
        UploadAction::Quit => return Ok(Nav::Quit),
    }
    Ok(Nav::Stay)
}

async fn run_extraction(controller: &mut WizardController, input: SourceInput) {
    let spinner = ProgressBar::new_spinner();
    spinner.set_message("Extracting content...");
    spinner.enable_steady_tick(Duration::from_millis(120));
    let result = controller.extract(input).await;
    spinner.finish_and_clear();

    match result {
        Ok(text) => {
            println!("Extracted {} characters.", text.chars().count());
            println!("{}", preview(&text, 300));
        }
        Err(e) => println!("✗ Extraction failed: {}", e),
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push('…');
    }
    out
}

// --- Step 2 ---

#[derive(Clone)]
enum SettingsAction {
    Edit(&'static str),
    Next,
    Back,
    Quit,
}

impl fmt::Display for SettingsAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsAction::Edit(label) => write!(f, "Edit {}", label),
            SettingsAction::Next => f.write_str("Next"),
            SettingsAction::Back => f.write_str("Back"),
            SettingsAction::Quit => f.write_str("Quit"),
        }
    }
}

async fn settings_step(controller: &mut WizardController) -> Result<Nav> {
    let settings = controller.state().settings().clone();
    println!("Title:     {}", settings.title);
    println!("Preview:   {}", settings.preview);
    println!("Language:  {}", settings.language);
    println!("Mode:      {}", settings.mode);
    println!("Length:    {}", settings.script_length);
    let labels = settings.role_labels();
    match settings.mode {
        Mode::Single => println!("Host:      {} ({})", labels[0], settings.role1.style),
        Mode::Double => println!(
            "Hosts:     {} ({}) / {} ({})",
            labels[0], settings.role_a.style, labels[1], settings.role_b.style
        ),
    }

    let mut options = vec![
        SettingsAction::Edit("title"),
        SettingsAction::Edit("preview"),
        SettingsAction::Edit("language"),
        SettingsAction::Edit("mode"),
        SettingsAction::Edit("script length"),
    ];
    match settings.mode {
        Mode::Single => options.extend([
            SettingsAction::Edit("host name"),
            SettingsAction::Edit("host style"),
        ]),
        Mode::Double => options.extend([
            SettingsAction::Edit("host A name"),
            SettingsAction::Edit("host A style"),
            SettingsAction::Edit("host B name"),
            SettingsAction::Edit("host B style"),
        ]),
    }
    options.extend([SettingsAction::Next, SettingsAction::Back, SettingsAction::Quit]);

    let label = match choose("Settings:", options)? {
        SettingsAction::Edit(label) => label,
        SettingsAction::Next => return Ok(Nav::Next),
        SettingsAction::Back => return Ok(Nav::Back),
        SettingsAction::Quit => return Ok(Nav::Quit),
    };

    let text = |current: &str| -> Result<String> {
        Ok(Text::new(&format!("{}:", label)).with_initial_value(current).prompt()?)
    };
    let field = match label {
        "title" => SettingsField::Title(text(&settings.title)?),
        "preview" => SettingsField::Preview(text(&settings.preview)?),
        "language" => SettingsField::Language(choose("Language:", vec![Language::Zh, Language::En])?),
        "mode" => SettingsField::Mode(choose("Mode:", vec![Mode::Single, Mode::Double])?),
        "script length" => SettingsField::ScriptLength(choose(
            "Script length:",
            vec![ScriptLength::Short, ScriptLength::Medium, ScriptLength::Long],
        )?),
        "host name" => SettingsField::Role1Name(text(&settings.role1.name)?),
        "host style" => SettingsField::Role1Style(text(&settings.role1.style)?),
        "host A name" => SettingsField::RoleAName(text(&settings.role_a.name)?),
        "host A style" => SettingsField::RoleAStyle(text(&settings.role_a.style)?),
        "host B name" => SettingsField::RoleBName(text(&settings.role_b.name)?),
        _ => SettingsField::RoleBStyle(text(&settings.role_b.style)?),
    };
    if let Err(e) = controller.update_settings(field).await {
        eprintln!("Could not save role names: {:#}", e);
    }
    Ok(Nav::Stay)
}

// --- Step 3 ---

#[derive(Clone, Copy)]
enum ScriptAction {
    Generate,
    EditText,
    ChangeRole,
    Insert,
    Delete,
    Export,
    Next,
    Back,
    Quit,
}

impl fmt::Display for ScriptAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScriptAction::Generate => "Generate script",
            ScriptAction::EditText => "Edit a line",
            ScriptAction::ChangeRole => "Change a line's role",
            ScriptAction::Insert => "Insert a line",
            ScriptAction::Delete => "Delete a line",
            ScriptAction::Export => "Export script",
            ScriptAction::Next => "Next",
            ScriptAction::Back => "Back",
            ScriptAction::Quit => "Quit",
        })
    }
}

fn print_script(controller: &WizardController) {
    let script = &controller.state().script;
    if script.is_empty() {
        println!("(no script yet)");
        return;
    }
    for (i, line) in script.lines().iter().enumerate() {
        println!("{:>3}. [{}] {}", i + 1, line.role, line.text);
    }
}

fn pick_line(controller: &WizardController) -> Result<usize> {
    let len = controller.state().script.len();
    let n = CustomType::<usize>::new("Line number:")
        .with_validator(move |n: &usize| {
            if (1..=len).contains(n) {
                Ok(inquire::validator::Validation::Valid)
            } else {
                Ok(inquire::validator::Validation::Invalid(
                    format!("Enter 1 to {}", len).into(),
                ))
            }
        })
        .prompt()?;
    Ok(n - 1)
}

async fn script_step(controller: &mut WizardController) -> Result<Nav> {
    print_script(controller);

    let mut options = vec![ScriptAction::Generate];
    if !controller.state().script.is_empty() {
        options.extend([
            ScriptAction::EditText,
            ScriptAction::ChangeRole,
            ScriptAction::Insert,
            ScriptAction::Delete,
            ScriptAction::Export,
        ]);
    }
    options.extend([ScriptAction::Next, ScriptAction::Back, ScriptAction::Quit]);

    match choose("Script:", options)? {
        ScriptAction::Generate => {
            let spinner = ProgressBar::new_spinner();
            spinner.set_message("Generating script...");
            spinner.enable_steady_tick(Duration::from_millis(120));
            let result = controller.generate_script().await.map(|s| s.len());
            spinner.finish_and_clear();
            match result {
                Ok(0) => println!("⚠ The backend returned no usable script lines."),
                Ok(n) => println!("Generated {} lines.", n),
                Err(e) => println!("✗ Script generation failed: {}", e),
            }
        }
        ScriptAction::EditText => {
            let i = pick_line(controller)?;
            let current = controller.state().script.lines()[i].text.clone();
            let text = Text::new("Text:").with_initial_value(&current).prompt()?;
            controller.state_mut().script.set_text(i, text)?;
        }
        ScriptAction::ChangeRole => {
            let i = pick_line(controller)?;
            let roles = controller.state().script.roles();
            let role = choose("Role:", roles)?;
            controller.state_mut().script.set_role(i, &role)?;
        }
        ScriptAction::Insert => {
            let i = pick_line(controller)?;
            let fallback = controller.state().settings().role_labels().remove(0);
            let at = controller.state_mut().script.insert_after(i, &fallback)?;
            let text = Text::new("Text:").prompt()?;
            controller.state_mut().script.set_text(at, text)?;
        }
        ScriptAction::Delete => {
            let i = pick_line(controller)?;
            if let Err(e) = controller.state_mut().script.delete(i) {
                println!("⚠ {}", e);
            }
        }
        ScriptAction::Export => match controller.export_script().await {
            Ok(path) => println!("Script saved to {}", path.display()),
            Err(e) => println!("✗ Export failed: {:#}", e),
        },
        ScriptAction::Next => return Ok(Nav::Next),
        ScriptAction::Back => return Ok(Nav::Back),
        ScriptAction::Quit => return Ok(Nav::Quit),
    }
    Ok(Nav::Stay)
}

// --- Step 4 ---

#[derive(Clone)]
enum SynthesisAction {
    Voice(usize),
    Synthesize,
    History,
    Back,
    Quit,
}

impl fmt::Display for SynthesisAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthesisAction::Voice(i) => write!(f, "Configure voice for role {}", i + 1),
            SynthesisAction::Synthesize => f.write_str("Synthesize audio"),
            SynthesisAction::History => f.write_str("Show synthesis history"),
            SynthesisAction::Back => f.write_str("Back"),
            SynthesisAction::Quit => f.write_str("Quit"),
        }
    }
}

fn describe(label: &str, p: &VoiceParams) -> String {
    format!(
        "{}: voice={} speed={} volume={} pitch={} emotion={}",
        label, p.voice, p.speed, p.volume, p.pitch, p.emotion
    )
}

async fn synthesis_step(controller: &mut WizardController) -> Result<Nav> {
    let labels = controller.state().settings().role_labels();
    let tts = controller.state().tts.clone();
    println!("{}", describe(&labels[0], &tts.role1));
    if let Some(second) = labels.get(1) {
        println!("{}", describe(second, &tts.role2));
    }
    if let Some(audio) = controller.state().audio() {
        println!("Last audio: {}", audio.locator);
    }

    let mut options: Vec<SynthesisAction> = (0..labels.len()).map(SynthesisAction::Voice).collect();
    options.extend([
        SynthesisAction::Synthesize,
        SynthesisAction::History,
        SynthesisAction::Back,
        SynthesisAction::Quit,
    ]);

    match choose("Synthesis:", options)? {
        SynthesisAction::Voice(i) => configure_voice(controller, i)?,
        SynthesisAction::Synthesize => synthesize_with_progress(controller).await,
        SynthesisAction::History => show_history(controller).await,
        SynthesisAction::Back => return Ok(Nav::Back),
        SynthesisAction::Quit => return Ok(Nav::Quit),
    }
    Ok(Nav::Stay)
}

fn configure_voice(controller: &mut WizardController, role: usize) -> Result<()> {
    let voices = controller.state().voices().to_vec();
    if voices.is_empty() {
        println!("⚠ No voices available; check the backend connection.");
        return Ok(());
    }
    let mut params = if role == 0 {
        controller.state().tts.role1.clone()
    } else {
        controller.state().tts.role2.clone()
    };

    let names: Vec<String> = voices
        .iter()
        .map(|v| format!("{} ({})", v.display_name(), v.value))
        .collect();
    let start = voices.iter().position(|v| v.value == params.voice).unwrap_or(0);
    let chosen = Select::new("Voice:", names).with_starting_cursor(start).raw_prompt()?;
    params.voice = voices[chosen.index].value.clone();

    params.set_speed(
        CustomType::<f32>::new(&format!("Speed ({}-{}):", SPEED_RANGE.0, SPEED_RANGE.1))
            .with_default(params.speed)
            .prompt()?,
    );
    params.set_volume(
        CustomType::<f32>::new(&format!("Volume ({}-{}):", VOLUME_RANGE.0, VOLUME_RANGE.1))
            .with_default(params.volume)
            .prompt()?,
    );
    params.set_pitch(
        CustomType::<i32>::new(&format!("Pitch ({} to {}):", PITCH_RANGE.0, PITCH_RANGE.1))
            .with_default(params.pitch)
            .prompt()?,
    );
    let start = EMOTIONS.iter().position(|e| *e == params.emotion).unwrap_or(0);
    params.emotion = Select::new("Emotion:", EMOTIONS.to_vec())
        .with_starting_cursor(start)
        .prompt()?
        .to_string();

    let tts = &mut controller.state_mut().tts;
    if role == 0 {
        tts.role1 = params;
    } else {
        tts.role2 = params;
    }
    Ok(())
}

async fn synthesize_with_progress(controller: &mut WizardController) {
    let (token, form) = match controller.begin_synthesis() {
        Ok(started) => started,
        Err(e) => {
            println!("⚠ {}", e);
            return;
        }
    };

    let cfg = controller.config().synthesis.clone();
    let mut ticker = ProgressTicker::new(&cfg);
    let pb = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}") {
        pb.set_style(style.progress_chars("#>-"));
    }

    let backend = controller.backend();
    let sink = controller.sink();
    let request = crate::services::workflow::fetch_synthesis(backend.as_ref(), sink.as_ref(), &form);
    tokio::pin!(request);
    let mut timer = interval(Duration::from_millis(cfg.progress_interval_ms.max(1)));

    let result = loop {
        tokio::select! {
            result = &mut request => break result,
            _ = timer.tick() => {
                pb.set_position(ticker.tick() as u64);
                pb.set_message(ticker.label());
            }
        }
    };

    match controller.finish_synthesis(token, result) {
        Ok(audio) => {
            ticker.complete();
            pb.set_position(100);
            pb.finish_with_message(ticker.label());
            println!("Audio saved to {}", audio.locator);
            if AudioFormat::detect(&audio.audio) == AudioFormat::Wav {
                if let Ok(secs) = wav_duration(&audio.audio) {
                    println!("Duration: {}", format_clock(secs));
                }
            }
        }
        Err(e) => {
            ticker.fail(&e);
            pb.abandon_with_message(ticker.label());
            if let Some(previous) = controller.state().audio() {
                println!("Previous audio is still available at {}", previous.locator);
            }
        }
    }
}

async fn show_history(controller: &WizardController) {
    match controller.task_list().await {
        Ok(tasks) if tasks.is_empty() => println!("No synthesis tasks yet."),
        Ok(tasks) => {
            for task in tasks {
                let duration = task.duration.map(format_clock).unwrap_or_else(|| "--:--".to_string());
                println!(
                    "[{}] {} {} ({}) {}",
                    task.status,
                    task.created_at,
                    preview(&task.text_preview, 40),
                    task.voice_id,
                    duration
                );
                if let Some(url) = task.audio_url {
                    println!("      {}", url);
                }
            }
        }
        Err(e) => println!("✗ Could not load history: {}", e),
    }
}
