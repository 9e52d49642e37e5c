/// Grammar loading and linting integration tests.

use std::path::Path;

use lexigen::core::grammar::{lint, GrammarDefinition, GrammarError};
use lexigen::core::registry::RegistryError;

#[test]
fn toy_phonology_loads() {
    let path = Path::new("grammars/toy/phonology.ron");
    let def = GrammarDefinition::load_from_ron(path).unwrap();
    let registry = def.build().unwrap();

    let expected = ["Consonant", "Vowel", "Coda", "Syllable", "Word"];
    for name in &expected {
        assert!(
            registry.contains_property_named(name),
            "Missing property: {}",
            name
        );
    }

    let syllable = registry.get_property_by_name("Syllable").unwrap();
    let vowel = registry.get_property_by_name("Vowel").unwrap();
    assert_eq!(syllable.must_contain(), &[vowel.id()]);
}

#[test]
fn toy_syntax_needs_phonology() {
    let syntax = GrammarDefinition::load_from_ron(Path::new("grammars/toy/syntax.ron")).unwrap();
    assert!(syntax.build().is_err());

    let mut def = GrammarDefinition::load_from_ron(Path::new("grammars/toy/phonology.ron")).unwrap();
    def.merge(syntax);
    let registry = def.build().unwrap();
    assert!(registry.contains_property_named("Sentence"));
    assert!(registry.contains_property_named("Word"));
}

#[test]
fn toy_grammar_lints_clean() {
    let mut def = GrammarDefinition::load_from_ron(Path::new("grammars/toy/phonology.ron")).unwrap();
    def.merge(GrammarDefinition::load_from_ron(Path::new("grammars/toy/syntax.ron")).unwrap());
    let registry = def.build().unwrap();

    let report = lint(&registry);
    assert!(report.errors.is_empty(), "Lint errors: {:?}", report.errors);
    assert!(report.warnings.is_empty(), "Lint warnings: {:?}", report.warnings);
}

#[test]
fn unreachable_child_is_a_lint_error() {
    let def = GrammarDefinition::load_from_ron(Path::new("tests/fixtures/unreachable.ron")).unwrap();
    let registry = def.build().unwrap();

    let report = lint(&registry);
    assert!(
        report
            .errors
            .iter()
            .any(|e| e.contains("'Clause'") && e.contains("can follow nothing")),
        "Expected an error for Clause, got: {:?}",
        report.errors
    );
}

#[test]
fn malformed_file_reports_ron_error() {
    let result = GrammarDefinition::load_from_ron(Path::new("tests/fixtures/malformed.ron"));
    assert!(matches!(result, Err(GrammarError::Ron(_))));
}

#[test]
fn missing_file_reports_io_error() {
    let result = GrammarDefinition::load_from_ron(Path::new("tests/fixtures/does_not_exist.ron"));
    assert!(matches!(result, Err(GrammarError::Io(_))));
}

#[test]
fn nonexistent_property_is_not_found() {
    let def = GrammarDefinition::load_from_ron(Path::new("tests/fixtures/syllables.ron")).unwrap();
    let registry = def.build().unwrap();

    assert_eq!(
        registry.get_property_by_name("Nonexistent").unwrap_err(),
        RegistryError::PropertyNotFound("Nonexistent".to_string())
    );
    assert!(registry.get_property_by_name("Syllable").is_ok());
}

#[test]
fn unit_lookup_by_text_and_parent_name() {
    let def = GrammarDefinition::load_from_ron(Path::new("tests/fixtures/syllables.ron")).unwrap();
    let registry = def.build().unwrap();

    let t = registry.get_unit_by_name("t").unwrap();
    assert_eq!(t.text(), Some("t"));
    let syllable = registry.get_unit_by_name("Syllable").unwrap();
    assert!(syllable.as_parent().is_some());
    assert!(matches!(
        registry.get_unit_by_name("q"),
        Err(RegistryError::UnitNotFound(_))
    ));
}
