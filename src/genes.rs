use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Serialize;

use crate::domain::GeneMatch;
use crate::error::TrialsError;

pub const GENE_COLUMN: &str = "Gene";

pub const DEFAULT_GENES: &[&str] = &[
    "SPAST", "ATL1", "KIF5A", "ALS2", "PLS3", "SPG4", "REEP1", "SPG11", "SPG7",
];

/// Ordered gene symbols used to tag trials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneVocabulary {
    symbols: Vec<String>,
}

impl Default for GeneVocabulary {
    fn default() -> Self {
        Self::from_symbols(DEFAULT_GENES.iter().copied())
    }
}

impl GeneVocabulary {
    /// Builds a vocabulary, skipping blank entries and keeping the given order.
    pub fn from_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let symbols = symbols
            .into_iter()
            .map(|symbol| symbol.as_ref().trim().to_string())
            .filter(|symbol| !symbol.is_empty())
            .collect();
        Self { symbols }
    }

    /// Loads the `Gene` column of a CSV file (tab separated when the
    /// extension is `.tsv` or `.tab`).
    pub fn load(path: &Path) -> Result<Self, TrialsError> {
        let file =
            File::open(path).map_err(|_| TrialsError::GeneFileRead(path.to_path_buf()))?;
        let delimiter = match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("tsv") | Some("tab") => b'\t',
            _ => b',',
        };
        Self::from_reader(file, delimiter, path)
    }

    pub fn from_reader<R: Read>(
        reader: R,
        delimiter: u8,
        source: &Path,
    ) -> Result<Self, TrialsError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .has_headers(true)
            .from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|err| TrialsError::GeneFileParse(err.to_string()))?;
        let column = headers
            .iter()
            .position(|header| header.trim_start_matches('\u{feff}').trim() == GENE_COLUMN)
            .ok_or_else(|| TrialsError::MissingGeneColumn(source.to_path_buf()))?;

        let mut symbols = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|err| TrialsError::GeneFileParse(err.to_string()))?;
            if let Some(value) = record.get(column) {
                symbols.push(value.to_string());
            }
        }
        Ok(Self::from_symbols(symbols))
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Symbols found in `text`, case-insensitively, in vocabulary order.
    pub fn matches(&self, text: &str) -> Vec<&str> {
        let haystack = text.to_lowercase();
        self.symbols
            .iter()
            .filter(|symbol| haystack.contains(symbol.to_lowercase().as_str()))
            .map(String::as_str)
            .collect()
    }
}

/// Gene/Pathway tag for a piece of trial text. Empty when nothing matches.
pub fn tag(text: &str, vocabulary: &GeneVocabulary, policy: GeneMatch) -> String {
    let matches = vocabulary.matches(text);
    match policy {
        GeneMatch::All => matches.join(", "),
        GeneMatch::First => matches.first().copied().unwrap_or_default().to_string(),
    }
}

/// Text searched for gene symbols: title and interventions separated by a space.
pub fn tagging_text(title: &str, drug: &str) -> String {
    format!("{title} {drug}")
}
