// Pipeline tests driven by a scripted generator.
//
// Each test feeds canned model output through the full stage sequence and
// checks the finished body, title, and the calls the pipeline made.

mod test_utils;

use std::sync::Arc;

use manzai_core::{GenerationRequest, LengthBand, LengthSettings, TechniqueSelection, char_len};
use manzai_error::{GeneratorErrorKind, PipelineErrorKind};
use manzai_script::{PipelineSettings, ScriptPipeline};
use test_utils::{FixedPicker, MockGenerator, MockResponse, dialogue};

fn band_350() -> LengthBand {
    LengthSettings::default().band_for(350)
}

fn request() -> GenerationRequest {
    GenerationRequest::new(Some("満員電車"), None, None, 350, TechniqueSelection::default())
}

fn pipeline(mock: &MockGenerator, settings: PipelineSettings) -> ScriptPipeline {
    ScriptPipeline::new(Arc::new(mock.clone()), settings).with_picker(Arc::new(FixedPicker { extra: 2 }))
}

#[tokio::test]
async fn test_in_band_draft_needs_one_call() -> anyhow::Result<()> {
    let raw = format!("【満員電車】\n\n{}\n\nB: もういいよ！", dialogue(10, 28));
    let mock = MockGenerator::new_success(raw);

    let script = pipeline(&mock, PipelineSettings::default())
        .generate(&request(), band_350())
        .await?;

    assert_eq!(mock.call_count(), 1);
    assert_eq!(script.title(), "満員電車");
    assert_eq!(script.length(), 339);
    assert!(band_350().contains(script.length()));
    assert!(script.body().ends_with("\n\nB: もういいよ！"));
    assert_eq!(script.body().matches("もういいよ").count(), 1);
    assert!(!script.trace().continued);

    let first = &mock.requests()[0];
    assert_eq!(*first.temperature(), 0.8);
    assert_eq!(*first.max_tokens(), 8192);
    Ok(())
}

#[tokio::test]
async fn test_fallback_techniques_reported() -> anyhow::Result<()> {
    let raw = format!("【満員電車】\n\n{}", dialogue(10, 28));
    let mock = MockGenerator::new_success(raw);

    let script = pipeline(&mock, PipelineSettings::default())
        .generate(&request(), band_350())
        .await?;

    assert_eq!(script.techniques(), &vec!["比喩ツッコミ", "風刺", "皮肉"]);
    assert_eq!(script.structure(), &vec!["フリ", "伏線回収", "最後のオチ"]);
    Ok(())
}

#[tokio::test]
async fn test_short_draft_is_continued() -> anyhow::Result<()> {
    let mock = MockGenerator::new_sequence(vec![
        MockResponse::Text(format!("【短い】\n\n{}", dialogue(5, 28))),
        MockResponse::Text(dialogue(6, 28)),
    ]);

    let script = pipeline(&mock, PipelineSettings::default())
        .generate(&request(), band_350())
        .await?;

    assert_eq!(mock.call_count(), 2);
    assert!(script.trace().continued);
    assert_eq!(script.length(), 372);
    assert!(band_350().contains(script.length()));
    assert_eq!(script.body().matches("もういいよ").count(), 1);
    assert!(script.body().ends_with("B: もういいよ！"));

    let continuation = &mock.requests()[1];
    assert_eq!(*continuation.temperature(), 0.1);
    assert_eq!(*continuation.max_tokens(), 1200);
    assert!(continuation.messages()[1].content.contains("少なくとも 176 文字以上"));
    assert!(!continuation.messages()[1].content.ends_with("もういいよ！"));
    Ok(())
}

#[tokio::test]
async fn test_failed_continuation_keeps_draft() -> anyhow::Result<()> {
    let mock = MockGenerator::new_sequence(vec![
        MockResponse::Text(format!("【短い】\n\n{}", dialogue(5, 28))),
        MockResponse::Error(GeneratorErrorKind::Http("connection reset".into())),
    ]);

    let script = pipeline(&mock, PipelineSettings::default())
        .generate(&request(), band_350())
        .await?;

    assert_eq!(mock.call_count(), 2);
    assert!(!script.trace().continued);
    assert_eq!(script.length(), 174);
    assert!(script.body().ends_with("\n\nB: もういいよ！"));
    Ok(())
}

#[tokio::test]
async fn test_continuation_disabled() -> anyhow::Result<()> {
    let mock = MockGenerator::new_success(dialogue(5, 28));
    let settings = PipelineSettings {
        continuation: false,
        ..PipelineSettings::default()
    };

    let script = pipeline(&mock, settings).generate(&request(), band_350()).await?;

    assert_eq!(mock.call_count(), 1);
    assert_eq!(script.length(), 174);
    Ok(())
}

#[tokio::test]
async fn test_overlong_draft_is_cut_with_closing_kept() -> anyhow::Result<()> {
    let raw = format!("【長い】\n\n{}\n\nB: もういいよ！", dialogue(20, 28));
    let mock = MockGenerator::new_success(raw);

    let script = pipeline(&mock, PipelineSettings::default())
        .generate(&request(), band_350())
        .await?;

    assert!(script.length() <= 385, "length {}", script.length());
    assert!(script.body().ends_with("\n\nB: もういいよ！"));
    assert_eq!(script.body().matches("もういいよ").count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_missing_title_gets_placeholder() -> anyhow::Result<()> {
    let mock = MockGenerator::new_success(dialogue(10, 28));

    let script = pipeline(&mock, PipelineSettings::default())
        .generate(&request(), band_350())
        .await?;

    assert_eq!(script.title(), "（タイトル未設定）");
    Ok(())
}

#[tokio::test]
async fn test_missing_title_is_regenerated_when_enabled() -> anyhow::Result<()> {
    let mock = MockGenerator::new_sequence(vec![
        MockResponse::Text(dialogue(10, 28)),
        MockResponse::Text("『朝の攻防』\n".into()),
    ]);
    let settings = PipelineSettings {
        title_regeneration: true,
        ..PipelineSettings::default()
    };

    let script = pipeline(&mock, settings).generate(&request(), band_350()).await?;

    assert_eq!(script.title(), "朝の攻防");
    assert!(script.trace().title_regenerated);
    assert_eq!(*mock.requests()[1].temperature(), 0.7);
    Ok(())
}

#[tokio::test]
async fn test_verification_rewrite_is_normalised() -> anyhow::Result<()> {
    let revised = dialogue(10, 28).replace("A: ", "A：").replace("B: ", "B ： ");
    let mock = MockGenerator::new_sequence(vec![
        MockResponse::Text(format!("【満員電車】\n\n{}", dialogue(10, 28))),
        MockResponse::Text(revised),
    ]);
    let settings = PipelineSettings {
        verification: true,
        ..PipelineSettings::default()
    };

    let script = pipeline(&mock, settings).generate(&request(), band_350()).await?;

    assert_eq!(mock.call_count(), 2);
    assert!(script.trace().verified);
    assert!(!script.body().contains('：'));
    assert_eq!(script.length(), 339);
    assert_eq!(*mock.requests()[1].temperature(), 0.2);

    let requests = mock.requests();
    let checklist = &requests[1].messages()[1].content;
    assert!(checklist.contains("次の技法をすべて本文中で最低1回以上使っている"));
    assert!(checklist.contains("【採用する技法】\n- 比喩ツッコミ\n- 風刺\n- 皮肉"));
    Ok(())
}

#[tokio::test]
async fn test_verification_without_dialogue_is_ignored() -> anyhow::Result<()> {
    let mock = MockGenerator::new_sequence(vec![
        MockResponse::Text(format!("【満員電車】\n\n{}", dialogue(10, 28))),
        MockResponse::Text("問題ありません。".into()),
    ]);
    let settings = PipelineSettings {
        verification: true,
        ..PipelineSettings::default()
    };

    let script = pipeline(&mock, settings).generate(&request(), band_350()).await?;

    assert!(!script.trace().verified);
    assert_eq!(script.length(), 339);
    Ok(())
}

#[tokio::test]
async fn test_closing_uses_reactive_speaker() -> anyhow::Result<()> {
    let raw = dialogue(10, 28).replace("A: ", "太郎: ").replace("B: ", "花子: ");
    let mock = MockGenerator::new_success(raw);
    let request = GenerationRequest::new(None, None, Some("太郎、花子"), 350, TechniqueSelection::default());

    let script = pipeline(&mock, PipelineSettings::default())
        .generate(&request, band_350())
        .await?;

    assert!(script.body().ends_with("\n\n花子: もういいよ！"));
    Ok(())
}

#[tokio::test]
async fn test_initial_failure_is_fatal() {
    let mock = MockGenerator::new_error(GeneratorErrorKind::Api {
        status: 500,
        message: "upstream down".into(),
    });

    let err = pipeline(&mock, PipelineSettings::default())
        .generate(&request(), band_350())
        .await
        .unwrap_err();

    assert!(matches!(err.kind, PipelineErrorKind::InitialGeneration(_)));
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn test_blank_output_is_empty_error() {
    for raw in ["   \n  ", "【題】\n\nB: もういいよ！", "ネタが思いつきません。"] {
        let mock = MockGenerator::new_success(raw);

        let err = pipeline(&mock, PipelineSettings::default())
            .generate(&request(), band_350())
            .await
            .unwrap_err();

        assert_eq!(err.kind, PipelineErrorKind::EmptyOutput, "raw {raw:?}");
    }
}

#[tokio::test]
async fn test_fenced_output_is_stripped() -> anyhow::Result<()> {
    let raw = format!("【満員電車】\n\n```text\nメモ\n```\n{}", dialogue(10, 28));
    let mock = MockGenerator::new_success(raw);

    let script = pipeline(&mock, PipelineSettings::default())
        .generate(&request(), band_350())
        .await?;

    assert!(!script.body().contains("```"));
    assert!(!script.body().contains("メモ"));
    assert_eq!(char_len(script.body()), 339);
    Ok(())
}

#[tokio::test]
async fn test_plain_title_block_and_bare_turns() -> anyhow::Result<()> {
    let mock = MockGenerator::new_success("Title\n\nA: hi\nB: hi\nA: hi\nB: hi");
    let settings = PipelineSettings {
        continuation: false,
        ..PipelineSettings::default()
    };

    let script = pipeline(&mock, settings).generate(&request(), band_350()).await?;

    assert_eq!(script.title(), "Title");
    // Under the floor the dialogue gains terminal punctuation before the closing line.
    assert_eq!(script.body(), "A: hi\n\nB: hi\n\nA: hi\n\nB: hi。\n\nB: もういいよ！");
    assert_eq!(script.body().matches("もういいよ").count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_trailing_closing_variants_collapse_to_one() -> anyhow::Result<()> {
    let raw = format!("【満員電車】\n\n{}\n\nB：もういいよ\nもういいよ！！", dialogue(10, 28));
    let mock = MockGenerator::new_success(raw);

    let script = pipeline(&mock, PipelineSettings::default())
        .generate(&request(), band_350())
        .await?;

    assert_eq!(script.body().matches("もういいよ").count(), 1);
    assert!(script.body().ends_with("\n\nB: もういいよ！"));
    assert!(!script.body().contains("！！"));
    assert_eq!(script.length(), 339);
    Ok(())
}
