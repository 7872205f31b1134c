#![cfg(not(target_arch = "wasm32"))]

use anyhow::Result;
use mockito::{Matcher, Server};
use podcast_wizard::core::config::BackendConfig;
use podcast_wizard::core::error::WizardError;
use podcast_wizard::core::script::ScriptLine;
use podcast_wizard::core::settings::{Language, Mode, PodcastSettings, SettingsField};
use podcast_wizard::core::voice::{TtsParams, Voice};
use podcast_wizard::core::script::Script;
use podcast_wizard::services::acquisition::SourceFile;
use podcast_wizard::services::api::{HttpBackend, PodcastBackend};
use podcast_wizard::services::generation::GenerateScriptRequest;
use podcast_wizard::services::synthesis::SynthesisForm;

fn backend(server: &Server) -> Result<HttpBackend> {
    HttpBackend::new(&BackendConfig {
        base_url: server.url(),
        timeout_seconds: Some(5),
    })
}

fn single_form() -> Result<SynthesisForm> {
    let settings = PodcastSettings::default().with(SettingsField::Mode(Mode::Single));
    let script = Script::new(vec![ScriptLine::new("主播", "大家好")]);
    let catalog = vec![Voice {
        value: "v1".to_string(),
        label: "One".to_string(),
    }];
    let mut tts = TtsParams::default();
    tts.apply_catalog_defaults(&catalog);
    Ok(SynthesisForm::build(&script, &settings, &tts, &catalog)?)
}

#[tokio::test]
async fn test_extract_url_posts_multipart_field() -> Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/extract_url")
        .match_header("content-type", Matcher::Regex("multipart/form-data".to_string()))
        .match_body(Matcher::Regex(r#"name="url"\r\n\r\nhttps://example.com/post"#.to_string()))
        .with_header("content-type", "application/json")
        .with_body(r#"{"content": ["Para one", "Para two"]}"#)
        .create_async()
        .await;

    let response = backend(&server)?.extract_url("https://example.com/post").await?;
    let content = response.content.expect("content present");
    assert_eq!(content.normalize(), "Para one\nPara two");
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_extract_file_uploads_bytes() -> Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/extract_file")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="file"; filename="notes.txt""#.to_string()),
            Matcher::Regex("hello from a file".to_string()),
        ]))
        .with_header("content-type", "application/json")
        .with_body(r#"{"content": {"text": "hello from a file"}}"#)
        .create_async()
        .await;

    let file = SourceFile::new("notes.txt", b"hello from a file".to_vec(), None)?;
    let response = backend(&server)?.extract_file(&file).await?;
    assert_eq!(response.content.map(|c| c.normalize()).as_deref(), Some("hello from a file"));
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_generate_script_sends_settings_as_json() -> Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/generate_podcast_script")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "content": "Article",
            "podcast_mode": "double",
            "language": "en",
            "scriptLength": "medium",
            "roleA_name": "HostA",
            "roleB_name": "HostB"
        })))
        .with_header("content-type", "application/json")
        .with_body(r#"{"podcast_script": [{"speaker": "HostA", "content": "Hi"}]}"#)
        .create_async()
        .await;

    let settings = PodcastSettings::default()
        .with(SettingsField::Mode(Mode::Double))
        .with(SettingsField::Language(Language::En));
    let request = GenerateScriptRequest::build("Article", &settings)?;
    let response = backend(&server)?.generate_script(&request).await?;
    let (script, error) = response.into_script(&settings);
    assert!(error.is_none());
    assert_eq!(script.lines()[0], ScriptLine::new("HostA", "Hi"));
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_available_voices_accepts_legacy_keys() -> Result<()> {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/available_voices")
        .with_header("content-type", "application/json")
        .with_body(r#"{"voices": [{"value": "v1", "label": "One"}, {"voice_id": "v2", "voice_name": "Two"}]}"#)
        .create_async()
        .await;

    let voices = backend(&server)?.available_voices().await?;
    assert_eq!(voices.len(), 2);
    assert_eq!(voices[1].value, "v2");
    assert_eq!(voices[1].display_name(), "Two");
    Ok(())
}

#[tokio::test]
async fn test_generate_audio_returns_bytes() -> Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/generate_audio")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="text"\r\n\r\n大家好"#.to_string()),
            Matcher::Regex(r#"name="voice"\r\n\r\nv1"#.to_string()),
        ]))
        .with_header("content-type", "audio/mpeg")
        .with_body(b"ID3 audio bytes".as_slice())
        .create_async()
        .await;

    let audio = backend(&server)?.generate_audio(&single_form()?).await?;
    assert_eq!(audio, b"ID3 audio bytes");
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_generate_audio_server_error() -> Result<()> {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/generate_audio")
        .with_status(500)
        .with_body("Internal Server Error")
        .create_async()
        .await;

    let err = backend(&server)?
        .generate_audio(&single_form()?)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.to_string(), "HTTP 500: Internal Server Error");
    Ok(())
}

#[tokio::test]
async fn test_server_error_reports_json_message() -> Result<()> {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/generate_audio")
        .with_status(500)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success": false, "message": "tts down"}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/api/generate_podcast_script")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error": "content is required"}"#)
        .create_async()
        .await;

    let backend = backend(&server)?;
    let err = backend.generate_audio(&single_form()?).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.to_string(), "HTTP 500: tts down");

    let settings = PodcastSettings::default();
    let request = GenerateScriptRequest::build("Article", &settings)?;
    let err = backend.generate_script(&request).await.unwrap_err();
    assert_eq!(err.to_string(), "HTTP 400: content is required");
    Ok(())
}

#[tokio::test]
async fn test_generate_audio_double_mode_fields() -> Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/generate_audio")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="mode"\r\n\r\ndouble"#.to_string()),
            Matcher::Regex(r#"name="roleAName"\r\n\r\nHostA"#.to_string()),
            Matcher::Regex(r#"name="roleBName"\r\n\r\nHostB"#.to_string()),
            Matcher::Regex(r#"name="roleAVoice"\r\n\r\nv1"#.to_string()),
            Matcher::Regex(r#"name="roleBVoice"\r\n\r\nv2"#.to_string()),
            Matcher::Regex(r#"name="emotionB"\r\n\r\nneutral"#.to_string()),
        ]))
        .with_header("content-type", "audio/mpeg")
        .with_body(b"ID3".as_slice())
        .create_async()
        .await;

    let settings = PodcastSettings::default()
        .with(SettingsField::Mode(Mode::Double))
        .with(SettingsField::Language(Language::En));
    let script = Script::new(vec![
        ScriptLine::new("HostA", "Hi"),
        ScriptLine::new("HostB", "Hello"),
    ]);
    let catalog = vec![
        Voice { value: "v1".to_string(), label: "One".to_string() },
        Voice { value: "v2".to_string(), label: "Two".to_string() },
    ];
    let mut tts = TtsParams::default();
    tts.apply_catalog_defaults(&catalog);
    let form = SynthesisForm::build(&script, &settings, &tts, &catalog)?;

    backend(&server)?.generate_audio(&form).await?;
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_generate_audio_json_error_body() -> Result<()> {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/generate_audio")
        .with_header("content-type", "application/json")
        .with_body(r#"{"error": "voice not loaded"}"#)
        .create_async()
        .await;

    let err = backend(&server)?
        .generate_audio(&single_form()?)
        .await
        .unwrap_err();
    assert!(matches!(err, WizardError::Payload(ref msg) if msg == "voice not loaded"));
    Ok(())
}

#[tokio::test]
async fn test_task_list() -> Result<()> {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/task_list")
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"tasks": [{"status": "done", "created_at": "2024-05-01 10:00", "text_preview": "Hi",
                "voice_id": "v1", "duration": 12.5, "audio_url": "/static/a.mp3"}]}"#,
        )
        .create_async()
        .await;

    let tasks = backend(&server)?.task_list().await?;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].duration, Some(12.5));
    assert_eq!(tasks[0].audio_url.as_deref(), Some("/static/a.mp3"));
    Ok(())
}

#[tokio::test]
async fn test_malformed_json_is_a_payload_error() -> Result<()> {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/available_voices")
        .with_body("<html>oops</html>")
        .create_async()
        .await;

    let err = backend(&server)?.available_voices().await.unwrap_err();
    assert!(matches!(err, WizardError::Payload(_)));
    Ok(())
}
