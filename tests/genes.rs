use std::io::Cursor;
use std::path::Path;

use assert_matches::assert_matches;

use kira_trials::domain::GeneMatch;
use kira_trials::error::TrialsError;
use kira_trials::genes::{DEFAULT_GENES, GeneVocabulary, tag, tagging_text};

#[test]
fn tagging_ignores_case() {
    let vocabulary = GeneVocabulary::default();
    assert_eq!(tag("spast inhibitor", &vocabulary, GeneMatch::All), "SPAST");
    assert_eq!(tag("Spast inhibitor", &vocabulary, GeneMatch::First), "SPAST");
}

#[test]
fn all_policy_joins_in_vocabulary_order() {
    let vocabulary = GeneVocabulary::from_symbols(["SPG7", "ATL1", "REEP1"]);
    let text = tagging_text("REEP1 and SPG7 carriers", "ATL1 antisense");
    assert_eq!(tag(&text, &vocabulary, GeneMatch::All), "SPG7, ATL1, REEP1");
    assert_eq!(tag(&text, &vocabulary, GeneMatch::First), "SPG7");
}

#[test]
fn no_match_gives_empty_tag() {
    let vocabulary = GeneVocabulary::default();
    assert_eq!(tag("Exercise in ALS", &vocabulary, GeneMatch::All), "");
    assert_eq!(tag("Exercise in ALS", &vocabulary, GeneMatch::First), "");
}

#[test]
fn spg_symbols_stay_distinct() {
    let vocabulary = GeneVocabulary::default();
    let tags = tag("SPG11 natural history", &vocabulary, GeneMatch::All);
    assert_eq!(tags, "SPG11");

    let tags = tag("SPG4 cohort", &vocabulary, GeneMatch::All);
    assert_eq!(tags, "SPG4");
}

#[test]
fn default_vocabulary_keeps_order() {
    let vocabulary = GeneVocabulary::default();
    assert_eq!(vocabulary.len(), DEFAULT_GENES.len());
    assert_eq!(vocabulary.symbols()[0], "SPAST");
    assert_eq!(vocabulary.symbols()[8], "SPG7");
}

#[test]
fn reads_gene_column_and_skips_blanks() {
    let data = "Pathway,Gene\nmicrotubule,SPAST\nER shaping,\nER shaping, ATL1 \nmotor,KIF5A\n";
    let vocabulary =
        GeneVocabulary::from_reader(Cursor::new(data), b',', Path::new("genes.csv")).unwrap();
    assert_eq!(vocabulary.symbols(), ["SPAST", "ATL1", "KIF5A"]);
}

#[test]
fn missing_gene_column_is_rejected() {
    let data = "Symbol\nSPAST\n";
    let err = GeneVocabulary::from_reader(Cursor::new(data), b',', Path::new("genes.csv"))
        .unwrap_err();
    assert_matches!(err, TrialsError::MissingGeneColumn(_));
}

#[test]
fn loads_tsv_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("genes.tsv");
    std::fs::write(&path, "Gene\tNote\nPLS3\tbone\nALS2\talsin\n").unwrap();
    let vocabulary = GeneVocabulary::load(&path).unwrap();
    assert_eq!(vocabulary.symbols(), ["PLS3", "ALS2"]);
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = GeneVocabulary::load(&dir.path().join("absent.csv")).unwrap_err();
    assert_matches!(err, TrialsError::GeneFileRead(_));
}
