// CSV output of reconciled rows

use super::models::ReconciledResult;
use crate::alignment::{format_evalue, AlignmentHit};
use kiwi_common::{Result, NA};
use std::io::Write;
use std::path::Path;

/// Output file for every query with a nucleotide hit
pub const NUCLEOTIDE_RESULTS: &str = "nucleotideHits.csv";

/// Output file for queries confirmed at the protein level
pub const PROTEIN_RESULTS: &str = "proteinHits.csv";

const HIT_FIELDS: [&str; 11] = [
    "Hit",
    "Identity",
    "AlignmentLength",
    "Mismatches",
    "GapOpens",
    "QueryStart",
    "QueryEnd",
    "HitStart",
    "HitEnd",
    "Evalue",
    "BitScore",
];

/// Fixed column order of both output files
pub fn header() -> Vec<String> {
    let mut columns: Vec<String> = [
        "Query",
        "Accession",
        "Organism",
        "Taxonomy",
        "SourceLength",
        "GC",
        "ProteinID",
        "Gene",
        "Product",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect();
    columns.extend(HIT_FIELDS.iter().map(|f| format!("Protein{f}")));
    columns.extend(HIT_FIELDS.iter().map(|f| format!("Nucleotide{f}")));
    columns.push("QueryCoverage".to_string());
    columns.push("Subsequence".to_string());
    columns
}

fn or_na<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| NA.to_string(), |v| v.to_string())
}

fn hit_fields(hit: Option<&AlignmentHit>, out: &mut Vec<String>) {
    match hit {
        Some(hit) => {
            out.push(hit.hit.to_string());
            out.extend(hit.numeric_fields());
        },
        None => out.extend(std::iter::repeat(NA.to_string()).take(HIT_FIELDS.len())),
    }
}

fn record(row: &ReconciledResult) -> Vec<String> {
    let mut fields = vec![
        row.query.clone(),
        row.accession.clone(),
        or_na(row.organism.as_deref()),
        or_na(row.taxonomy.as_deref()),
        or_na(row.source_length),
        or_na(row.gc_percent.map(|gc| format!("{gc:.2}"))),
        or_na(row.protein_id.as_deref()),
        or_na(row.gene.as_deref()),
        or_na(row.product.as_deref()),
    ];
    hit_fields(row.protein_hit.as_ref(), &mut fields);
    hit_fields(Some(&row.nucleotide_hit), &mut fields);
    fields.push(or_na(row.coverage.map(|c| format!("{c:.4}"))));
    fields.push(or_na(row.subsequence.as_deref()));
    fields
}

/// Write `rows` with the fixed header; returns the number of rows written
pub fn write_results<W: Write>(writer: W, rows: &[ReconciledResult]) -> Result<usize> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(header())?;
    for row in rows {
        csv.write_record(record(row))?;
    }
    csv.flush()?;
    Ok(rows.len())
}

pub fn write_results_file(path: &Path, rows: &[ReconciledResult]) -> Result<usize> {
    let file = std::fs::File::create(path)?;
    write_results(std::io::BufWriter::new(file), rows)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::alignment::reader::parse_line;

    fn row() -> ReconciledResult {
        ReconciledResult {
            query: "q9".to_string(),
            accession: "NC_404".to_string(),
            organism: None,
            taxonomy: None,
            source_length: None,
            gc_percent: None,
            protein_id: None,
            gene: None,
            product: None,
            protein_hit: None,
            nucleotide_hit: parse_line("q9\tNC_404\t90.0\t10\t1\t0\t1\t10\t1\t10\t1e-20\t20.0").unwrap(),
            coverage: None,
            subsequence: None,
        }
    }

    #[test]
    fn test_header_width_matches_rows() {
        assert_eq!(header().len(), record(&row()).len());
        assert_eq!(header()[9], "ProteinHit");
        assert_eq!(header().last().unwrap(), "Subsequence");
    }

    #[test]
    fn test_missing_values_written_as_na() {
        let mut out = Vec::new();
        let written = write_results(&mut out, &[row()]).unwrap();
        assert_eq!(written, 1);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("Query,Accession,Organism"));
        assert!(lines[1].starts_with("q9,NC_404,NA,NA,NA,NA,NA,NA,NA,NA"));
        assert!(lines[1].contains(",NC_404,90,10,1,0,1,10,1,10,1e-20,20,"));
        assert!(lines[1].ends_with(",NA,NA"));
    }
}
