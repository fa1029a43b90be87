/*!
 * Custom engine tests against a local HTTP server
 */

use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use ebook_translator::app_config::EnginePreferences;
use ebook_translator::app_controller::{Controller, JobOptions};
use ebook_translator::engines::custom::{load_engine_data, CustomTranslate};
use ebook_translator::engines::Engine;
use ebook_translator::errors::EngineError;
use ebook_translator::translation::Translation;

use crate::common::{self, MockHttpServer};

const OK_BODY: &str = r#"{"translations":[{"text":"Bonjour"}]}"#;

fn sample_definition() -> String {
    fs::read_to_string(common::sample_path("custom_engine.json")).unwrap()
}

fn sample_engine(server: &MockHttpServer, preferences: EnginePreferences) -> CustomTranslate {
    let data = load_engine_data(&sample_definition()).unwrap();
    let preferences = EnginePreferences {
        endpoint: Some(format!("{}/v1/translate", server.url)),
        source_lang: Some("English".to_string()),
        target_lang: Some("French".to_string()),
        ..preferences
    };
    CustomTranslate::new(data, &preferences, None).unwrap()
}

#[tokio::test]
async fn test_customEngine_withJsonTemplate_shouldPostSubstitutedBody() {
    let server = MockHttpServer::start(vec![(200, OK_BODY.to_string())]).await.unwrap();
    let engine = sample_engine(&server, EnginePreferences::default());

    let translation = engine.translate("Hello").await.unwrap().into_text().await.unwrap();
    assert_eq!(translation, "Bonjour");

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let request = requests[0].to_lowercase();
    assert!(request.starts_with("post /v1/translate"));
    assert!(request.contains("x-target: fr"));
    assert!(requests[0].contains(r#""text":"Hello""#));
    assert!(requests[0].contains(r#""source_lang":"en""#));
    assert!(requests[0].contains(r#""target_lang":"fr""#));
}

#[tokio::test]
async fn test_customEngine_withServerError_shouldReturnApiError() {
    let server = MockHttpServer::start(vec![(500, r#"{"error":"boom"}"#.to_string())])
        .await
        .unwrap();
    let engine = sample_engine(&server, EnginePreferences::default());

    let error = engine.translate("Hello").await.unwrap_err();
    match error {
        EngineError::ApiError { status_code, message } => {
            assert_eq!(status_code, 500);
            assert!(message.contains("boom"));
        }
        other => panic!("expected an API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_customEngine_withMissingResponseField_shouldFailAsUnexpected() {
    let server = MockHttpServer::start(vec![(200, r#"{"result":"Bonjour"}"#.to_string())])
        .await
        .unwrap();
    let engine = sample_engine(&server, EnginePreferences::default());

    let error = engine.translate("Hello").await.unwrap_err();
    assert!(matches!(error, EngineError::UnexpectedResult(_)));
}

#[tokio::test]
async fn test_customEngine_withXmlResponse_shouldEvaluateExpression() {
    let definition = r#"{"name":"Xml Engine","languages":{"English":"en","German":"de"},
        "request":{"url":"https://x.test/t","method":"POST","data":{"q":"<text>","to":"<target>"}},
        "response":"response['text']"}"#;
    let server = MockHttpServer::start(vec![(
        200,
        r#"<?xml version="1.0"?><result code="0"><text>Hallo</text></result>"#.to_string(),
    )])
    .await
    .unwrap();
    let preferences = EnginePreferences {
        endpoint: Some(format!("{}/t", server.url)),
        target_lang: Some("German".to_string()),
        ..EnginePreferences::default()
    };
    let engine = CustomTranslate::new(load_engine_data(definition).unwrap(), &preferences, None).unwrap();

    let translation = engine.translate("Hello").await.unwrap().into_text().await.unwrap();
    assert_eq!(translation, "Hallo");
    let requests = server.requests();
    assert!(requests[0].ends_with("q=Hello&to=de") || requests[0].ends_with("to=de&q=Hello"));
}

#[tokio::test]
async fn test_translateText_withTransientServerError_shouldRetryAndSucceed() {
    let server = MockHttpServer::start(vec![
        (503, r#"{"error":"busy"}"#.to_string()),
        (200, OK_BODY.to_string()),
    ])
    .await
    .unwrap();
    let preferences = EnginePreferences {
        request_attempt: Some(1),
        ..EnginePreferences::default()
    };
    let engine = sample_engine(&server, preferences);
    let mut translation = Translation::new(Arc::new(engine));
    translation.set_retry_step(Duration::from_millis(1));

    let text = translation.translate_text(-1, "Hello", false).await.unwrap();
    assert_eq!(text, "Bonjour");
    assert_eq!(translation.error_count(), 0);
    assert_eq!(server.requests().len(), 2);
}

#[tokio::test]
async fn test_controller_withCustomEngineFromConfig_shouldTranslateBook() {
    let temp_dir = common::create_temp_dir().unwrap();
    let server = MockHttpServer::start(vec![(200, OK_BODY.to_string())]).await.unwrap();
    let book_dir = common::create_test_book(temp_dir.path(), &[("text/ch1.xhtml", "<p>Hello</p>")]).unwrap();

    let mut config = common::test_config(temp_dir.path());
    config.custom_engines = HashMap::from([("Sample Engine".to_string(), sample_definition())]);
    config.translate_engine = "Sample Engine".to_string();
    config.preferences_mut("Sample Engine").endpoint = Some(format!("{}/v1/translate", server.url));
    let controller = Controller::with_config(config).unwrap();

    let options = JobOptions {
        input_dir: book_dir,
        output_dir: temp_dir.path().join("out"),
        target_lang: Some("fr".to_string()),
        source_lang: Some("English".to_string()),
        ..JobOptions::default()
    };
    let summary = controller.run(&options).await.unwrap();

    assert_eq!(summary.paragraphs, 1);
    assert_eq!(summary.translated, 1);
    assert_eq!(summary.failed, 0);
    let page = fs::read_to_string(options.output_dir.join("text/ch1.xhtml")).unwrap();
    assert!(page.contains("<p>Hello</p>"));
    assert!(page.contains("Bonjour"));
}
