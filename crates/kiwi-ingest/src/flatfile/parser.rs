// GenBank flat file parser
//
// Line-oriented state machine over LOCUS ... // records. Records are yielded
// lazily; rejected records go to a side list with their line span so the
// isolator can pull the raw text back out later.
// Format documentation: https://www.ncbi.nlm.nih.gov/Sitemap/samplerecord.html

use super::models::{FlatFileRecord, GeneFeature, MalformedRecord, RecordFault, Strand};
use kiwi_common::Result;
use std::collections::{HashMap, HashSet};
use std::io::{BufRead, Lines};
use tracing::{debug, warn};

/// Column where qualifier lines start ("                     /gene=")
const QUALIFIER_INDENT: usize = 21;

/// Header continuation lines are indented by 12; sub-keywords by 2
const CONTINUATION_INDENT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Scan,
    InRecord,
    InFeature,
    InSequence,
}

/// Which header block continuation lines belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderBlock {
    Definition,
    Organism,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeatureKind {
    Source,
    Cds,
    Other,
}

#[derive(Debug)]
struct FeatureDraft {
    kind: FeatureKind,
    location: String,
    qualifiers: Vec<(String, String)>,
    open: Option<(String, String)>,
}

impl FeatureDraft {
    fn new(kind: FeatureKind, location: &str) -> Self {
        Self {
            kind,
            location: location.to_string(),
            qualifiers: Vec::new(),
            open: None,
        }
    }

    fn close_qualifier(&mut self) {
        if let Some((key, value)) = self.open.take() {
            let value = value.trim().trim_matches('"').to_string();
            self.qualifiers.push((key, value));
        }
    }

    /// Start "/key=value" or a bare "/key" flag
    fn open_qualifier(&mut self, text: &str) {
        self.close_qualifier();
        let text = text.trim_start_matches('/');
        match text.split_once('=') {
            Some((key, value)) => self.open = Some((key.to_string(), value.to_string())),
            None => self.qualifiers.push((text.to_string(), String::new())),
        }
    }

    /// Continuation of a wrapped qualifier value or location
    fn extend(&mut self, piece: &str) {
        match self.open {
            Some((ref key, ref mut value)) => {
                // Wrapped translations are split mid-sequence
                if key != "translation" {
                    value.push(' ');
                }
                value.push_str(piece);
            },
            None if self.qualifiers.is_empty() => self.location.push_str(piece),
            None => {},
        }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.qualifiers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug)]
struct RecordDraft {
    first_line: usize,
    locus_name: String,
    declared_length: Option<usize>,
    molecule_type: Option<String>,
    definition: String,
    accession: Option<String>,
    accession_version: Option<String>,
    organism: Option<String>,
    taxonomy: Vec<String>,
    block: HeaderBlock,
    features: Vec<FeatureDraft>,
    current: Option<FeatureDraft>,
    sequence: String,
}

impl RecordDraft {
    fn new(first_line: usize) -> Self {
        Self {
            first_line,
            locus_name: String::new(),
            declared_length: None,
            molecule_type: None,
            definition: String::new(),
            accession: None,
            accession_version: None,
            organism: None,
            taxonomy: Vec::new(),
            block: HeaderBlock::Other,
            features: Vec::new(),
            current: None,
            sequence: String::new(),
        }
    }

    fn close_feature(&mut self) {
        if let Some(mut feature) = self.current.take() {
            feature.close_qualifier();
            if feature.kind != FeatureKind::Other {
                self.features.push(feature);
            }
        }
    }

    fn reported_accession(&self) -> String {
        self.accession.clone().unwrap_or_else(|| "unknown".to_string())
    }
}

/// GenBank flat-file parser
///
/// Holds the accessions to pass over in "new entries only" mode. Each call to
/// [`FlatFileParser::records`] starts an independent pass.
#[derive(Debug, Default, Clone)]
pub struct FlatFileParser {
    skip: HashSet<String>,
}

/// Everything a complete pass produced
#[derive(Debug, Default)]
pub struct ParseReport {
    pub records: Vec<FlatFileRecord>,
    pub failures: Vec<MalformedRecord>,
    pub skipped: usize,
}

impl FlatFileParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read but do not yield records whose accession is in `skip`
    pub fn with_skip_set(skip: HashSet<String>) -> Self {
        Self { skip }
    }

    /// Lazily parse records from a reader
    pub fn records<R: BufRead>(&self, reader: R) -> FlatFileRecords<'_, R> {
        FlatFileRecords {
            lines: reader.lines(),
            skip: &self.skip,
            line_no: 0,
            state: State::Scan,
            draft: None,
            seen: HashMap::new(),
            failures: Vec::new(),
            skipped: 0,
            finished: false,
        }
    }

    /// Parse every record, collecting failures alongside
    pub fn parse_all<R: BufRead>(&self, reader: R) -> Result<ParseReport> {
        let mut records_iter = self.records(reader);
        let mut records = Vec::new();
        for record in records_iter.by_ref() {
            records.push(record?);
        }
        let (failures, skipped) = records_iter.finish();
        Ok(ParseReport {
            records,
            failures,
            skipped,
        })
    }
}

/// Iterator over the records of one parse pass
///
/// Yields `Err` only for unreadable input, after which it stops. Malformed
/// records are kept in [`FlatFileRecords::failures`].
pub struct FlatFileRecords<'a, R> {
    lines: Lines<R>,
    skip: &'a HashSet<String>,
    line_no: usize,
    state: State,
    draft: Option<RecordDraft>,
    seen: HashMap<String, usize>,
    failures: Vec<MalformedRecord>,
    skipped: usize,
    finished: bool,
}

impl<R: BufRead> Iterator for FlatFileRecords<'_, R> {
    type Item = Result<FlatFileRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            match self.lines.next() {
                Some(Ok(line)) => {
                    self.line_no += 1;
                    if let Some(record) = self.step(line.trim_end_matches('\r')) {
                        return Some(Ok(record));
                    }
                },
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(e.into()));
                },
                None => {
                    self.finished = true;
                    if let Some(draft) = self.draft.take() {
                        self.reject(&draft, RecordFault::Unterminated, self.line_no);
                    }
                    return None;
                },
            }
        }
    }
}

impl<R: BufRead> FlatFileRecords<'_, R> {
    /// Records rejected so far
    pub fn failures(&self) -> &[MalformedRecord] {
        &self.failures
    }

    /// Records passed over because of the skip set
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Consume the pass, returning the failure list and skip count
    pub fn finish(self) -> (Vec<MalformedRecord>, usize) {
        (self.failures, self.skipped)
    }

    fn step(&mut self, line: &str) -> Option<FlatFileRecord> {
        let collapsed = collapse_whitespace(line);

        if self.state != State::Scan && collapsed == "//" {
            self.state = State::Scan;
            return self.draft.take().and_then(|draft| self.complete(draft, self.line_no));
        }

        // A LOCUS line starts a new record whatever state the previous one was left in
        if self.state != State::Scan && first_token(&collapsed) == Some("LOCUS") && is_keyword_line(line) {
            self.restart();
            self.state = State::InRecord;
            self.header_line(line, &collapsed);
            return None;
        }

        match self.state {
            State::Scan => {
                if matches!(first_token(&collapsed), Some("LOCUS") | Some("ACCESSION")) {
                    self.draft = Some(RecordDraft::new(self.line_no));
                    self.state = State::InRecord;
                    self.header_line(line, &collapsed);
                }
                None
            },
            State::InRecord => {
                self.header_line(line, &collapsed);
                None
            },
            State::InFeature => {
                self.feature_line(line, &collapsed);
                None
            },
            State::InSequence => {
                if is_keyword_line(line) {
                    self.state = State::InRecord;
                    self.header_line(line, &collapsed);
                } else {
                    self.sequence_line(&collapsed);
                }
                None
            },
        }
    }

    /// A LOCUS line arrived before the previous record's "//"
    fn restart(&mut self) {
        if let Some(draft) = self.draft.take() {
            self.reject(&draft, RecordFault::Unterminated, self.line_no - 1);
        }
        self.draft = Some(RecordDraft::new(self.line_no));
    }

    fn header_line(&mut self, line: &str, collapsed: &str) {
        let Some(draft) = self.draft.as_mut() else {
            return;
        };
        let mut tokens = collapsed.split(' ');
        let keyword = tokens.next().unwrap_or_default();
        let rest = collapsed[keyword.len()..].trim();

        if is_keyword_line(line) {
            draft.block = HeaderBlock::Other;
            match keyword {
                "LOCUS" => parse_locus(draft, collapsed),
                "DEFINITION" => {
                    draft.definition = rest.to_string();
                    draft.block = HeaderBlock::Definition;
                },
                "ACCESSION" => {
                    // Secondary accessions may follow the primary one
                    if draft.accession.is_none() {
                        draft.accession = tokens.next().map(str::to_string);
                    }
                },
                "VERSION" => draft.accession_version = tokens.next().map(str::to_string),
                "FEATURES" => self.state = State::InFeature,
                "ORIGIN" => self.state = State::InSequence,
                _ => {},
            }
            return;
        }

        if indentation(line) < CONTINUATION_INDENT {
            // Sub-keyword such as "  ORGANISM" or "  AUTHORS"
            draft.block = HeaderBlock::Other;
            if keyword == "ORGANISM" && !rest.is_empty() {
                draft.organism = Some(rest.to_string());
                draft.block = HeaderBlock::Organism;
            }
            return;
        }

        match draft.block {
            HeaderBlock::Definition => {
                draft.definition.push(' ');
                draft.definition.push_str(collapsed);
            },
            HeaderBlock::Organism => {
                draft.taxonomy.extend(
                    collapsed
                        .split(';')
                        .map(|taxon| taxon.trim().trim_end_matches('.').trim())
                        .filter(|taxon| !taxon.is_empty())
                        .map(str::to_string),
                );
            },
            HeaderBlock::Other => {},
        }
    }

    fn feature_line(&mut self, line: &str, collapsed: &str) {
        if is_keyword_line(line) {
            // End of the FEATURES table (ORIGIN, CONTIG, BASE COUNT, ...)
            if let Some(draft) = self.draft.as_mut() {
                draft.close_feature();
            }
            self.state = State::InRecord;
            self.header_line(line, collapsed);
            return;
        }

        let Some(draft) = self.draft.as_mut() else {
            return;
        };

        if indentation(line) < QUALIFIER_INDENT {
            draft.close_feature();
            let (key, location) = collapsed.split_once(' ').unwrap_or((collapsed, ""));
            let kind = match key {
                "source" => FeatureKind::Source,
                "CDS" => FeatureKind::Cds,
                _ => FeatureKind::Other,
            };
            draft.current = Some(FeatureDraft::new(kind, location.trim()));
            return;
        }

        if let Some(feature) = draft.current.as_mut() {
            let text = line.trim();
            if text.starts_with('/') {
                feature.open_qualifier(text);
            } else {
                feature.extend(text);
            }
        }
    }

    fn sequence_line(&mut self, collapsed: &str) {
        let Some(draft) = self.draft.as_mut() else {
            return;
        };
        let mut tokens = collapsed.split(' ');
        if !tokens
            .next()
            .is_some_and(|index| index.chars().all(|c| c.is_ascii_digit()))
        {
            return;
        }
        for chunk in tokens {
            draft.sequence.push_str(&chunk.to_ascii_uppercase());
        }
    }

    fn reject(&mut self, draft: &RecordDraft, fault: RecordFault, last_line: usize) {
        let failure = MalformedRecord {
            accession: draft.reported_accession(),
            fault,
            lines: draft.first_line..=last_line,
        };
        warn!(record = %failure, "Skipping malformed flat-file record");
        self.failures.push(failure);
    }

    fn complete(&mut self, mut draft: RecordDraft, last_line: usize) -> Option<FlatFileRecord> {
        draft.close_feature();

        let Some(accession) = draft.accession.clone() else {
            self.reject(&draft, RecordFault::MissingAccession, last_line);
            return None;
        };

        if self.skip.contains(&accession) {
            debug!(accession = %accession, "Skipping known accession");
            self.skipped += 1;
            return None;
        }

        if let Some(&first_seen) = self.seen.get(&accession) {
            self.reject(&draft, RecordFault::DuplicateAccession(first_seen), last_line);
            return None;
        }

        let Some(organism) = draft.organism.clone() else {
            self.reject(&draft, RecordFault::MissingOrganism, last_line);
            return None;
        };

        let source_mol_type = draft
            .features
            .iter()
            .find(|f| f.kind == FeatureKind::Source)
            .and_then(|f| f.get("mol_type"))
            .map(str::to_string)
            .or_else(|| draft.molecule_type.clone());

        let genes: Vec<GeneFeature> = draft
            .features
            .iter()
            .filter(|f| f.kind == FeatureKind::Cds)
            .filter_map(|f| build_gene(&accession, f, source_mol_type.as_deref()))
            .collect();

        if genes.is_empty() {
            self.reject(&draft, RecordFault::NoGeneFeatures, last_line);
            return None;
        }

        if let Some(declared) = draft.declared_length {
            if declared != draft.sequence.len() {
                warn!(
                    accession = %accession,
                    declared,
                    parsed = draft.sequence.len(),
                    "LOCUS length differs from ORIGIN length"
                );
            }
        }

        self.seen.insert(accession.clone(), draft.first_line);

        Some(FlatFileRecord {
            locus_name: draft.locus_name,
            declared_length: draft.declared_length,
            molecule_type: draft.molecule_type,
            definition: draft.definition,
            accession,
            accession_version: draft.accession_version,
            organism,
            taxonomy: draft.taxonomy,
            genes,
            sequence: draft.sequence,
            lines: draft.first_line..=last_line,
        })
    }
}

/// Parse LOCUS line
/// Format: LOCUS       NC_001416      48502 bp    DNA     linear   PHG 15-JAN-2014
fn parse_locus(draft: &mut RecordDraft, collapsed: &str) {
    let parts: Vec<&str> = collapsed.split(' ').collect();
    if let Some(name) = parts.get(1) {
        draft.locus_name = name.to_string();
    }
    if let (Some(length), Some("bp" | "aa")) = (parts.get(2), parts.get(3).copied()) {
        draft.declared_length = length.parse().ok();
    }
    if let Some(molecule) = parts.get(4) {
        draft.molecule_type = Some(molecule.to_string());
    }
}

fn build_gene(accession: &str, feature: &FeatureDraft, mol_type: Option<&str>) -> Option<GeneFeature> {
    let Some(protein_id) = feature.get("protein_id").filter(|p| !p.is_empty()) else {
        warn!(accession, location = %feature.location, "Dropping CDS without protein_id");
        return None;
    };
    let Some((start, end, strand)) = parse_location(&feature.location) else {
        warn!(accession, protein_id, location = %feature.location, "Dropping CDS with unreadable location");
        return None;
    };

    Some(GeneFeature {
        protein_id: protein_id.to_string(),
        gene: feature.get("gene").map(str::to_string),
        product: feature.get("product").map(str::to_string),
        molecule_type: mol_type.map(str::to_string),
        translation: feature.get("translation").unwrap_or_default().to_string(),
        location: feature.location.clone(),
        start,
        end,
        strand,
    })
}

/// Parse a feature location into a 0-based half-open span and strand
///
/// Examples: "190..255", "complement(1000..2000)", "join(1..100,200..300)",
/// "<1..>450". Joined locations cover first start through last end. Parts
/// pointing into other entries ("J00194.1:100..202") are ignored.
pub fn parse_location(location: &str) -> Option<(usize, usize, Strand)> {
    let strand = if location.contains("complement(") {
        Strand::Reverse
    } else {
        Strand::Forward
    };

    let positions: Vec<usize> = location
        .split(',')
        .filter(|part| !part.contains(':'))
        .flat_map(|part| {
            part.split(|c: char| !c.is_ascii_digit())
                .filter(|digits| !digits.is_empty())
                .filter_map(|digits| digits.parse::<usize>().ok())
                .collect::<Vec<_>>()
        })
        .collect();

    let first = *positions.iter().min()?;
    let last = *positions.iter().max()?;
    if first == 0 {
        return None;
    }
    Some((first - 1, last, strand))
}

fn collapse_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn first_token(collapsed: &str) -> Option<&str> {
    collapsed.split(' ').next().filter(|t| !t.is_empty())
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Top-level keywords start in column 0
fn is_keyword_line(line: &str) -> bool {
    line.chars().next().is_some_and(|c| !c.is_whitespace())
}
