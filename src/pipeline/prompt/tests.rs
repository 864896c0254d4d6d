use super::*;
use tempfile::TempDir;

#[test]
fn bundled_template_is_valid() {
    let template = PromptTemplate::default();

    assert!(template.as_str().contains(CONTEXT_PLACEHOLDER));
    assert!(template.as_str().contains(QUESTION_PLACEHOLDER));
    assert!(template.as_str().contains(REFUSAL_SENTENCE));
    assert!(PromptTemplate::new(LEGAL_PROMPT).is_ok());
}

#[test]
fn both_placeholders_are_replaced() {
    let prompt = render(
        "LAW:\n{context}\nQ: {question}",
        "[Chapter 5 Section 12] Theft",
        "Is theft punishable?",
    )
    .expect("template is valid");

    assert_eq!(
        prompt,
        "LAW:\n[Chapter 5 Section 12] Theft\nQ: Is theft punishable?"
    );
}

#[test]
fn no_placeholder_survives_rendering() {
    let prompt = PromptTemplate::default().render("some law", "some question");

    assert!(!prompt.contains(CONTEXT_PLACEHOLDER));
    assert!(!prompt.contains(QUESTION_PLACEHOLDER));
    assert!(prompt.contains("some law"));
    assert!(prompt.contains("some question"));
}

#[test]
fn repeated_placeholders_are_all_replaced() {
    let prompt = render("{question} / {context} / {question}", "C", "Q").expect("valid");
    assert_eq!(prompt, "Q / C / Q");
}

#[test]
fn placeholder_text_inside_values_is_left_alone() {
    let prompt = render("{context}|{question}", "mentions {question}", "plain")
        .expect("template is valid");

    assert_eq!(prompt, "mentions {question}|plain");
}

#[test]
fn rendering_is_deterministic() {
    let template = PromptTemplate::default();
    assert_eq!(
        template.render("ctx", "why?"),
        template.render("ctx", "why?")
    );
}

#[test]
fn empty_context_still_renders() {
    let prompt = PromptTemplate::default().render("", "What is theft?");

    assert!(prompt.contains("AUTHORITATIVE LAW TEXT\n======================\n\n======================"));
    assert!(prompt.contains("What is theft?"));
}

#[test]
fn missing_placeholder_is_a_template_error() {
    assert!(matches!(
        render("only {context}", "c", "q"),
        Err(LegalRagError::Template(_))
    ));
    assert!(matches!(
        render("only {question}", "c", "q"),
        Err(LegalRagError::Template(_))
    ));
}

#[test]
fn template_loads_from_file() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = dir.path().join("prompt.txt");
    std::fs::write(&path, "Context: {context}\nQuestion: {question}\n").expect("write template");

    let template = PromptTemplate::load(&path).expect("template loads");
    assert_eq!(template.render("a", "b"), "Context: a\nQuestion: b\n");
}

#[test]
fn missing_template_file_is_an_asset_error() {
    let dir = TempDir::new().expect("should create temp dir");
    let result = PromptTemplate::load(&dir.path().join("absent.txt"));

    assert!(matches!(result, Err(LegalRagError::AssetLoad { .. })));
}
