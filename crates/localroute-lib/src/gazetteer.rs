//! In-memory gazetteer: place names and addresses mapped to coordinates.
//!
//! The store is loaded once and is read-only afterwards. Records are kept in
//! id order and indexed by normalized token in an ordered map, so both exact
//! and prefix token lookups are range scans instead of dataset scans.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::ops::Bound;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::geo::Coordinate;
use crate::text::{normalize, tokens};

/// Identifier of a gazetteer record. Compared lexically for tie-breaking.
pub type PlaceId = String;

/// What kind of place a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceKind {
    #[default]
    Address,
    Poi,
    Locality,
}

impl fmt::Display for PlaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            PlaceKind::Address => "address",
            PlaceKind::Poi => "poi",
            PlaceKind::Locality => "locality",
        };
        f.write_str(value)
    }
}

impl FromStr for PlaceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "address" => Ok(PlaceKind::Address),
            "poi" => Ok(PlaceKind::Poi),
            "locality" => Ok(PlaceKind::Locality),
            other => Err(format!("unknown place kind '{other}'")),
        }
    }
}

/// A validated gazetteer entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceRecord {
    pub id: PlaceId,
    pub normalized_name: String,
    pub raw_name: String,
    pub coordinate: Coordinate,
    pub region: Option<String>,
    pub kind: PlaceKind,
    #[serde(skip)]
    tokens: Vec<String>,
}

impl PlaceRecord {
    /// Normalized tokens of the record name, in name order.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

/// Unvalidated place data handed to [`GazetteerStore::from_records`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PlaceInput {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub kind: PlaceKind,
}

impl PlaceInput {
    /// Convenience constructor for an address record.
    pub fn address(id: impl Into<String>, name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            latitude: lat,
            longitude: lon,
            region: None,
            kind: PlaceKind::Address,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_kind(mut self, kind: PlaceKind) -> Self {
        self.kind = kind;
        self
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    id: String,
    name: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    kind: Option<String>,
}

/// Immutable, shareable gazetteer with an inverted token index.
#[derive(Debug, Clone)]
pub struct GazetteerStore {
    source_name: String,
    records: Vec<PlaceRecord>,
    by_id: HashMap<PlaceId, usize>,
    token_index: BTreeMap<String, Vec<usize>>,
}

impl GazetteerStore {
    /// Load a gazetteer from a CSV file with an
    /// `id,name,latitude,longitude[,region][,kind]` header.
    pub fn load(path: &Path) -> Result<Self> {
        let source_name = path.display().to_string();
        debug!(path = %source_name, "loading gazetteer");

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| Error::data_load(&source_name, e.to_string()))?;

        let mut inputs = Vec::new();
        for (index, row) in reader.deserialize::<CsvRow>().enumerate() {
            // Header is line 1.
            let line = index + 2;
            let row = row.map_err(|e| Error::data_load(&source_name, format!("row {line}: {e}")))?;
            let kind = match row.kind.as_deref() {
                Some(value) => value
                    .parse()
                    .map_err(|e| Error::data_load(&source_name, format!("row {line}: {e}")))?,
                None => PlaceKind::Address,
            };
            inputs.push(PlaceInput {
                id: row.id,
                name: row.name,
                latitude: row.latitude,
                longitude: row.longitude,
                region: row.region.filter(|r| !r.is_empty()),
                kind,
            });
        }

        Self::build(source_name, inputs)
    }

    /// Build a gazetteer from in-memory records with the same validation as [`load`](Self::load).
    pub fn from_records(records: Vec<PlaceInput>) -> Result<Self> {
        Self::build("in-memory gazetteer".to_string(), records)
    }

    fn build(source_name: String, inputs: Vec<PlaceInput>) -> Result<Self> {
        if inputs.is_empty() {
            return Err(Error::data_load(&source_name, "dataset contains no places"));
        }

        let mut records = Vec::with_capacity(inputs.len());
        let mut seen = BTreeSet::new();
        for (index, input) in inputs.into_iter().enumerate() {
            let record = validate_record(input).map_err(|message| {
                Error::data_load(&source_name, format!("record {}: {message}", index + 1))
            })?;
            if !seen.insert(record.id.clone()) {
                return Err(Error::data_load(
                    &source_name,
                    format!("duplicate place id '{}'", record.id),
                ));
            }
            records.push(record);
        }
        records.sort_by(|a, b| a.id.cmp(&b.id));

        let mut by_id = HashMap::with_capacity(records.len());
        let mut token_index: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (index, record) in records.iter().enumerate() {
            by_id.insert(record.id.clone(), index);
            for token in &record.tokens {
                let postings = token_index.entry(token.clone()).or_default();
                if postings.last() != Some(&index) {
                    postings.push(index);
                }
            }
        }

        info!(
            source = %source_name,
            places = records.len(),
            distinct_tokens = token_index.len(),
            "gazetteer loaded"
        );

        Ok(Self {
            source_name,
            records,
            by_id,
            token_index,
        })
    }

    /// Name of the source the store was loaded from.
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the store holds no records (never the case after a successful load).
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over all records in id order.
    pub fn iter(&self) -> impl Iterator<Item = &PlaceRecord> {
        self.records.iter()
    }

    /// Lookup a record by id.
    pub fn get(&self, id: &str) -> Option<&PlaceRecord> {
        self.by_id.get(id).map(|&index| &self.records[index])
    }

    /// Records owning the exact normalized token, in id order.
    pub fn lookup_token(&self, token: &str) -> Vec<&PlaceRecord> {
        self.token_index
            .get(token)
            .map(|postings| postings.iter().map(|&i| &self.records[i]).collect())
            .unwrap_or_default()
    }

    /// Records owning at least one token that starts with `normalized_token`,
    /// in id order without duplicates. An empty token matches nothing.
    pub fn lookup_prefix(&self, normalized_token: &str) -> Vec<&PlaceRecord> {
        let mut hits = BTreeSet::new();
        self.collect_prefix(normalized_token, &mut hits);
        hits.into_iter().map(|i| &self.records[i]).collect()
    }

    /// Add the indices of records matching a token prefix to `hits`.
    /// Returns the number of postings visited.
    pub(crate) fn collect_prefix(&self, prefix: &str, hits: &mut BTreeSet<usize>) -> usize {
        if prefix.is_empty() {
            return 0;
        }
        let mut visited = 0;
        let range = self
            .token_index
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(token, _)| token.starts_with(prefix));
        for (_, postings) in range {
            visited += postings.len();
            hits.extend(postings.iter().copied());
        }
        visited
    }

    pub(crate) fn record_at(&self, index: usize) -> &PlaceRecord {
        &self.records[index]
    }
}

fn validate_record(input: PlaceInput) -> std::result::Result<PlaceRecord, String> {
    let id = input.id.trim().to_string();
    if id.is_empty() {
        return Err("empty place id".to_string());
    }

    let raw_name = input.name.trim().to_string();
    let normalized_name = normalize(&raw_name);
    if normalized_name.is_empty() {
        return Err(format!("place '{id}' has no usable name"));
    }

    let coordinate = Coordinate::new(input.latitude, input.longitude).map_err(|_| {
        format!(
            "place '{id}' has invalid coordinate ({}, {})",
            input.latitude, input.longitude
        )
    })?;

    let tokens = tokens(&normalized_name).map(str::to_string).collect();
    let region = input
        .region
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());

    Ok(PlaceRecord {
        id,
        normalized_name,
        raw_name,
        coordinate,
        region,
        kind: input.kind,
        tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample() -> GazetteerStore {
        GazetteerStore::from_records(vec![
            PlaceInput::address("a1", "123 Main St", 40.0, -75.0),
            PlaceInput::address("a2", "456 Oak Ave", 40.01, -75.02),
            PlaceInput::address("a3", "12 Maine Rd", 40.02, -75.01),
            PlaceInput::address("p1", "Café Central", 40.005, -75.005).with_kind(PlaceKind::Poi),
        ])
        .expect("valid records")
    }

    #[test]
    fn prefix_lookup_uses_token_prefixes() {
        let store = sample();
        let ids: Vec<&str> = store.lookup_prefix("mai").iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a3"]);
        assert!(store.lookup_prefix("zzz").is_empty());
        assert!(store.lookup_prefix("").is_empty());
    }

    #[test]
    fn exact_token_lookup() {
        let store = sample();
        let ids: Vec<&str> = store.lookup_token("main").iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a1"]);
    }

    #[test]
    fn names_are_normalized_at_load() {
        let store = sample();
        let cafe = store.get("p1").expect("present");
        assert_eq!(cafe.normalized_name, "cafe central");
        assert_eq!(cafe.raw_name, "Café Central");
        assert_eq!(cafe.tokens(), &["cafe".to_string(), "central".to_string()]);
        assert_eq!(store.lookup_prefix("caf").len(), 1);
    }

    #[test]
    fn rejects_empty_dataset() {
        let err = GazetteerStore::from_records(Vec::new()).unwrap_err();
        assert!(matches!(err, Error::DataLoad { .. }));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = GazetteerStore::from_records(vec![
            PlaceInput::address("x", "1 A St", 0.0, 0.0),
            PlaceInput::address("x", "2 B St", 0.0, 0.0),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("duplicate place id 'x'"));
    }

    #[test]
    fn rejects_bad_coordinates_and_names() {
        let bad_coord =
            GazetteerStore::from_records(vec![PlaceInput::address("x", "1 A St", 95.0, 0.0)]);
        assert!(matches!(bad_coord, Err(Error::DataLoad { .. })));

        let bad_name =
            GazetteerStore::from_records(vec![PlaceInput::address("x", "???", 0.0, 0.0)]);
        assert!(matches!(bad_name, Err(Error::DataLoad { .. })));
    }

    #[test]
    fn loads_csv_with_optional_columns() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "id,name,latitude,longitude,region,kind").unwrap();
        writeln!(file, "a1,123 Main St,40.0,-75.0,PA,address").unwrap();
        writeln!(file, "l1,Springfield,40.1,-75.1,,locality").unwrap();
        file.flush().unwrap();

        let store = GazetteerStore::load(file.path()).expect("csv loads");
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a1").unwrap().region.as_deref(), Some("PA"));
        assert_eq!(store.get("l1").unwrap().region, None);
        assert_eq!(store.get("l1").unwrap().kind, PlaceKind::Locality);
    }

    #[test]
    fn csv_errors_report_row_numbers() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "id,name,latitude,longitude").unwrap();
        writeln!(file, "a1,123 Main St,40.0,-75.0").unwrap();
        writeln!(file, "a2,456 Oak Ave,north,-75.0").unwrap();
        file.flush().unwrap();

        let err = GazetteerStore::load(file.path()).unwrap_err();
        assert!(matches!(err, Error::DataLoad { .. }));
        assert!(err.to_string().contains("row 3"), "{err}");
    }

    #[test]
    fn csv_with_header_only_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "id,name,latitude,longitude").unwrap();
        file.flush().unwrap();

        let err = GazetteerStore::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("no places"));
    }

    #[test]
    fn missing_file_is_a_data_load_error() {
        let err = GazetteerStore::load(Path::new("/nonexistent/gazetteer.csv")).unwrap_err();
        assert!(matches!(err, Error::DataLoad { .. }));
    }
}
