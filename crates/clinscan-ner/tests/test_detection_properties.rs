//! End-to-end detection behaviour over a small clinical knowledge base.
//!
//! Run with: cargo test --package clinscan-ner --test test_detection_properties

use clinscan_common::{DetectedProblem, EngineSettings, KnowledgeBaseEntry};
use clinscan_ner::{EngineError, KnowledgeBase, ProblemDetector};
use pretty_assertions::assert_eq;

/// Route engine logs (conflict warnings, build info) through the test harness.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("clinscan_ner=debug")
        .with_test_writer()
        .try_init();
}

fn detector(entries: Vec<KnowledgeBaseEntry>) -> ProblemDetector {
    init_logging();
    let kb = KnowledgeBase::new(entries).expect("valid knowledge base");
    ProblemDetector::with_knowledge_base(kb, EngineSettings::default()).expect("engine builds")
}

fn diabetes_hypertension() -> ProblemDetector {
    detector(vec![
        KnowledgeBaseEntry::new("Diabetes", "Diagnosis", ["diabetes", "dm"]),
        KnowledgeBaseEntry::new("Hypertension", "Diagnosis", ["hypertension", "htn"]),
    ])
}

fn terms(problems: &[DetectedProblem]) -> Vec<&str> {
    problems.iter().map(|p| p.term.as_str()).collect()
}

#[test]
fn test_order_follows_first_mention_not_knowledge_base_order() {
    let problems = diabetes_hypertension()
        .detect("Patient has htn and diabetes.")
        .unwrap();
    assert_eq!(
        problems,
        vec![
            DetectedProblem::new("Hypertension", "Diagnosis"),
            DetectedProblem::new("Diabetes", "Diagnosis"),
        ]
    );
}

#[test]
fn test_repeated_scans_are_identical() {
    let detector = diabetes_hypertension();
    let note = "DM2, HTN. Hypertension poorly controlled; diabetes stable. htn";
    let first = detector.detect(note).unwrap();
    for _ in 0..5 {
        assert_eq!(detector.detect(note).unwrap(), first);
    }
}

#[test]
fn test_any_casing_detects_the_same_term() {
    let detector = diabetes_hypertension();
    for variant in ["hypertension", "HYPERTENSION", "Hypertension", "hYpErTeNsIoN", "HTN", "Htn"] {
        let note = format!("  {variant}  ");
        assert_eq!(terms(&detector.detect(&note).unwrap()), vec!["Hypertension"], "casing {variant}");
    }
}

#[test]
fn test_word_boundaries_enforced() {
    let detector = detector(vec![
        KnowledgeBaseEntry::new("Rheumatoid Arthritis", "Diagnosis", ["ra", "rheumatoid arthritis"]),
    ]);
    assert!(detector.detect("She ate an orange.").unwrap().is_empty());
    assert!(detector.detect("gradual onset").unwrap().is_empty());
    assert_eq!(terms(&detector.detect("Hx: RA, on MTX").unwrap()), vec!["Rheumatoid Arthritis"]);
    assert_eq!(terms(&detector.detect("(ra)").unwrap()), vec!["Rheumatoid Arthritis"]);
}

#[test]
fn test_three_variations_yield_one_problem() {
    let detector = detector(vec![KnowledgeBaseEntry::new(
        "Chronic Obstructive Pulmonary Disease",
        "Diagnosis",
        ["copd", "chronic obstructive pulmonary disease", "emphysema"],
    )]);
    let problems = detector
        .detect("COPD exacerbation. Known chronic obstructive pulmonary disease with emphysema.")
        .unwrap();
    assert_eq!(
        problems,
        vec![DetectedProblem::new("Chronic Obstructive Pulmonary Disease", "Diagnosis")]
    );
}

#[test]
fn test_empty_and_blank_notes() {
    let detector = diabetes_hypertension();
    assert!(detector.detect("").unwrap().is_empty());
    assert!(detector.detect(" \n\t.,;:-- ").unwrap().is_empty());
}

#[test]
fn test_empty_knowledge_base_is_configuration_error() {
    assert!(matches!(KnowledgeBase::new(vec![]), Err(EngineError::Configuration(_))));
    assert!(matches!(KnowledgeBase::from_json_str("[]"), Err(EngineError::Configuration(_))));
}

#[test]
fn test_first_registered_variation_wins_ambiguous_overlap() {
    let detector = detector(vec![
        KnowledgeBaseEntry::new("Diabetes", "Diagnosis", ["diabetes"]),
        KnowledgeBaseEntry::new("Diabetes Mellitus", "Diagnosis", ["diabetes mellitus"]),
    ]);
    assert_eq!(terms(&detector.detect("diabetes mellitus").unwrap()), vec!["Diabetes"]);

    let reversed = detector_reversed();
    assert_eq!(terms(&reversed.detect("diabetes mellitus").unwrap()), vec!["Diabetes Mellitus"]);
}

fn detector_reversed() -> ProblemDetector {
    detector(vec![
        KnowledgeBaseEntry::new("Diabetes Mellitus", "Diagnosis", ["diabetes mellitus"]),
        KnowledgeBaseEntry::new("Diabetes", "Diagnosis", ["diabetes"]),
    ])
}

#[test]
fn test_conflicting_variation_resolves_to_last_entry() {
    let detector = detector(vec![
        KnowledgeBaseEntry::new("Multiple Sclerosis", "Diagnosis", ["multiple sclerosis", "ms"]),
        KnowledgeBaseEntry::new("Morphine Sulfate", "Medication", ["morphine sulfate", "MS"]),
    ]);
    let engine = detector.snapshot().unwrap();
    assert_eq!(engine.stats().conflict_count, 1);
    assert_eq!(
        detector.detect("given MS 4mg").unwrap(),
        vec![DetectedProblem::new("Morphine Sulfate", "Medication")]
    );
    assert_eq!(
        terms(&detector.detect("history of multiple sclerosis").unwrap()),
        vec!["Multiple Sclerosis"]
    );
}

#[test]
fn test_regex_metacharacters_are_literal() {
    let detector = detector(vec![
        KnowledgeBaseEntry::new("Hepatitis C", "Diagnosis", ["hep c", "hcv+"]),
        KnowledgeBaseEntry::new("Any", "Other", [".*"]),
    ]);
    assert_eq!(terms(&detector.detect("HCV+ noted").unwrap()), vec!["Hepatitis C"]);
    assert!(detector.detect("nothing relevant").unwrap().is_empty());
    assert_eq!(terms(&detector.detect("literal .* here").unwrap()), vec!["Any"]);
}

#[test]
fn test_mixed_categories_round_trip_to_json() {
    let detector = detector(vec![
        KnowledgeBaseEntry::new("Hypertension", "Diagnosis", ["htn"]),
        KnowledgeBaseEntry::new("Lisinopril", "Medication", ["lisinopril", "zestril"]),
    ]);
    let problems = detector.detect("HTN on Zestril 10mg daily").unwrap();
    let json = serde_json::to_value(&problems).unwrap();
    assert_eq!(
        json,
        serde_json::json!([
            {"term": "Hypertension", "category": "Diagnosis"},
            {"term": "Lisinopril", "category": "Medication"}
        ])
    );
}
