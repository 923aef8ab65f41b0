//! Reads expected results and tallies observed results

use std::collections::BTreeMap;
use std::fs;

use log::{error, warn};

use certpath::{Error, Result};

/// One line of a results file
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExpectedResult {
    /// Name of the test case, i.e., a folder name or bundle file name
    pub identifier: String,
    /// Stable name of the expected status code
    pub status: String,
}

/// `parse_results` parses the contents of a results file. Blank lines and lines beginning with `#`
/// are ignored. Every other line must contain exactly one colon. When an identifier is listed more
/// than once the last entry is used. Results are returned sorted by identifier.
pub fn parse_results(contents: &str) -> Result<Vec<ExpectedResult>> {
    let mut results: BTreeMap<String, String> = BTreeMap::new();
    for (i, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split(':').collect();
        if parts.len() != 2 || parts[0].trim().is_empty() {
            error!("Malformed results line {}: {}", i + 1, line);
            return Err(Error::ParseError);
        }
        let identifier = parts[0].trim().to_string();
        if let Some(prev) = results.insert(identifier.clone(), parts[1].trim().to_string()) {
            warn!(
                "Results line {} replaces the expected result {} for {}",
                i + 1,
                prev,
                identifier
            );
        }
    }
    Ok(results
        .into_iter()
        .map(|(identifier, status)| ExpectedResult { identifier, status })
        .collect())
}

/// `read_results` reads and parses a results file.
pub fn read_results(filename: &str) -> Result<Vec<ExpectedResult>> {
    match fs::read_to_string(filename) {
        Ok(contents) => parse_results(&contents),
        Err(e) => {
            error!("Failed to read results file {}: {}", filename, e);
            Err(Error::from(e))
        }
    }
}

/// Tally of case outcomes
#[derive(Debug, Default)]
pub struct Stats {
    /// Number of cases whose observed status matched the expected status
    pub passed: usize,
    /// Number of cases whose observed status differed from the expected status
    pub failed: usize,
}

impl Stats {
    /// `record` prints the outcome of one case and adds it to the tally.
    pub fn record(&mut self, identifier: &str, expected: &str, observed: &str) {
        if expected == observed {
            self.passed += 1;
            println!("PASS {}: {}", identifier, observed);
        } else {
            self.failed += 1;
            println!(
                "FAIL {}: expected {}, observed {}",
                identifier, expected, observed
            );
        }
    }

    /// `summary` returns a one line description of the tally.
    pub fn summary(&self) -> String {
        format!(
            "{} of {} cases passed, {} failed",
            self.passed,
            self.passed + self.failed,
            self.failed
        )
    }
}

#[test]
fn parse_results_test() {
    let contents = "# comment\n\nvalid:OK\n revoked : CERT_REVOKED \n";
    let results = parse_results(contents).unwrap();
    assert_eq!(2, results.len());
    assert_eq!("revoked", results[0].identifier);
    assert_eq!("CERT_REVOKED", results[0].status);
    assert_eq!("valid", results[1].identifier);

    // the last entry for an identifier wins
    let results = parse_results("valid:OK\nexpired:EXPIRED\nvalid:CERT_REVOKED\n").unwrap();
    assert_eq!(2, results.len());
    assert_eq!("expired", results[0].identifier);
    assert_eq!(
        ExpectedResult {
            identifier: "valid".to_string(),
            status: "CERT_REVOKED".to_string()
        },
        results[1]
    );

    assert!(parse_results("valid\n").is_err());
    assert!(parse_results("a:b:c\n").is_err());
    assert!(parse_results(":OK\n").is_err());
}

#[test]
fn stats_test() {
    let mut stats = Stats::default();
    stats.record("a", "OK", "OK");
    stats.record("b", "OK", "EXPIRED");
    assert_eq!(1, stats.passed);
    assert_eq!("1 of 2 cases passed, 1 failed", stats.summary());
}
