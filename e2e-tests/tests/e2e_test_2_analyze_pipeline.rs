// E2E Test 2: Analyze Pipeline
// Tests classification followed by summarization through the analyzer facade

mod e2e;

use e2e::helpers::{TestEnv, TestResult, LUNCH_EMAIL, RELEASE_EMAIL, SPAM_HEADLINE};
use mail_intel::analyze::AnalyzeOptions;
use mail_intel::error::MlError;
use mail_intel::spam::Label;
use std::time::Instant;

#[test]
fn test_e2e_2_analyze_pipeline() {
    let start = Instant::now();
    let test_name = "E2E Test 2: Analyze Pipeline".to_string();

    println!("\n🚀 Starting: {}", test_name);
    println!("{}", "=".repeat(80));

    let env = TestEnv::new();
    let analyzer = env.analyzer();

    // Step 1: Legitimate email gets a summary
    println!("\n📋 Step 1: Analyzing a short ham email...");
    let report = analyzer
        .analyze(LUNCH_EMAIL, AnalyzeOptions::default())
        .expect("analyze");
    assert_eq!(report.spam_detection.prediction, Label::Ham);
    assert!(!report.spam_detection.is_spam);
    let summary = report.summarization.summary.as_deref().expect("summary");
    assert!(!summary.is_empty());
    assert!(!summary.contains("Subject:"));
    println!("✅ Summary: {}", summary);

    // Step 2: Report serializes with the public field names
    println!("\n📋 Step 2: Checking the JSON report...");
    let json = serde_json::to_value(&report).expect("serialize");
    assert_eq!(json["spam_detection"]["prediction"], "ham");
    assert!(json["summarization"]["original_length"].as_u64().is_some());
    assert!(json["summarization"]["summary_length"].as_u64().is_some());
    println!("✅ {}", json);

    // Step 3: Longer email is condensed
    println!("\n📋 Step 3: Summarizing a longer email...");
    let summary = analyzer.summarize(RELEASE_EMAIL, 30, 5).expect("summarize");
    assert!(summary.summary_word_count < summary.original_word_count);
    assert!(!summary.summary.contains("Thanks"));
    println!("✅ Summary: {}", summary.summary);

    // Step 4: Spam skips summarization unless forced
    println!("\n📋 Step 4: Analyzing spam...");
    let report = analyzer
        .analyze(SPAM_HEADLINE, AnalyzeOptions::default())
        .expect("analyze");
    assert!(report.spam_detection.is_spam);
    assert!(report.summarization.summary.is_none());

    let forced = analyzer
        .analyze(
            SPAM_HEADLINE,
            AnalyzeOptions {
                force_summary: true,
                ..AnalyzeOptions::default()
            },
        )
        .expect("analyze");
    assert!(forced.summarization.summary.is_some());
    println!("✅ Spam summary skipped, forced summary produced");

    // Step 5: Empty input is rejected
    println!("\n📋 Step 5: Rejecting empty input...");
    assert!(matches!(
        analyzer.analyze("  \n ", AnalyzeOptions::default()),
        Err(MlError::EmptyInput)
    ));
    println!("✅ Empty input rejected");

    TestResult::success(test_name, start.elapsed()).print();
}
