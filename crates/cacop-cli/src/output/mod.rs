//! Output formatting for different formats.

use anyhow::Result;
use cacop::{Certificate, CertificateResult, CrlStatus, RevocationStatus, SubjectReport};
use clap::ValueEnum;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::str::FromStr;
use tabled::{settings::Style, Table, Tabled};

/// Available output formats.
#[derive(Debug, Clone, Copy, Default, ValueEnum, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed tables with colors
    #[default]
    Pretty,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "table" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => anyhow::bail!(
                "Unknown output format: {}\n\
                 Valid formats: pretty, json, yaml",
                s
            ),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
            Self::Yaml => write!(f, "yaml"),
        }
    }
}

/// Serialize `value` in a machine-readable format.
pub fn serialize<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
        OutputFormat::Json | OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
    })
}

#[derive(Tabled)]
struct PositionRow {
    #[tabled(rename = "Position")]
    position: String,
    #[tabled(rename = "Common Name")]
    common_name: String,
    #[tabled(rename = "Fingerprint")]
    fingerprint: String,
    #[tabled(rename = "Expired")]
    expired: String,
    #[tabled(rename = "OCSP")]
    ocsp: String,
    #[tabled(rename = "CRL")]
    crl: String,
}

impl PositionRow {
    fn new(position: &str, result: &CertificateResult) -> Self {
        Self {
            position: position.to_string(),
            common_name: result.common_name.clone(),
            fingerprint: short(&result.fingerprint),
            expired: yes_no(result.expiration.expired),
            ocsp: summarize(result.ocsp.iter().map(ocsp_word)),
            crl: summarize(result.crl.iter().map(crl_word)),
        }
    }
}

fn short(fingerprint: &str) -> String {
    fingerprint.get(..16).map_or_else(|| fingerprint.to_string(), |p| format!("{p}…"))
}

fn yes_no(flag: bool) -> String {
    let word = if flag { "yes" } else { "no" };
    word.to_string()
}

fn ocsp_word(status: &RevocationStatus) -> String {
    status
        .status
        .map_or_else(|| "error".to_string(), |s| s.to_string())
}

fn crl_word(status: &CrlStatus) -> String {
    if status.is_error() {
        "error".to_string()
    } else if status.revoked {
        "revoked".to_string()
    } else {
        "good".to_string()
    }
}

fn summarize(words: impl Iterator<Item = String>) -> String {
    let words: Vec<String> = words.collect();
    if words.is_empty() {
        "-".to_string()
    } else {
        words.join(", ")
    }
}

/// Human-readable rendering of a subject report.
pub fn render_report(report: &SubjectReport) -> String {
    let chain = &report.chain;
    let mut rows = vec![PositionRow::new("leaf", &chain.leaf)];
    if !chain.is_anchor_only() {
        rows.extend(
            chain
                .intermediates
                .iter()
                .enumerate()
                .map(|(i, r)| PositionRow::new(&format!("intermediate {}", i + 1), r)),
        );
        rows.push(PositionRow::new("root", &chain.root));
    }

    let mut out = String::new();
    let _ = writeln!(out, "{} {}", "Subject:".bold(), report.subject_url.cyan().bold());
    let _ = writeln!(out, "{}", Table::new(&rows).with(Style::rounded()));

    let verdict = if chain.any_revoked() {
        "REVOKED".red().bold()
    } else if chain.any_expired() {
        "EXPIRED".yellow().bold()
    } else {
        "OK".green().bold()
    };
    let _ = writeln!(out, "{} {}", "Verdict:".bold(), verdict);

    let problems: Vec<String> = chain
        .iter()
        .flat_map(|result| {
            let ocsp = result.ocsp.iter().filter_map(|s| {
                s.error
                    .as_ref()
                    .map(|e| format!("{} OCSP {}: {e}", result.common_name, s.responder))
            });
            let crl = result.crl.iter().filter_map(|s| {
                s.error
                    .as_ref()
                    .map(|e| format!("{} CRL {}: {e}", result.common_name, s.endpoint))
            });
            let expiration = result
                .expiration
                .error
                .as_ref()
                .map(|e| format!("{} validity: {e}", result.common_name));
            ocsp.chain(crl).chain(expiration).collect::<Vec<_>>()
        })
        .collect();
    if !problems.is_empty() {
        let _ = writeln!(out, "\n{}", "Check errors:".bold().red());
        for problem in problems {
            let _ = writeln!(out, "  {} {problem}", "-".red());
        }
    }

    if let Some(validation) = &report.validation {
        let status = if validation.valid {
            "valid".green()
        } else {
            "rejected".red()
        };
        let _ = writeln!(out, "\n{} {status}", "certutil:".bold());
        if let Some(reason) = &validation.reason {
            let _ = writeln!(out, "  {}", reason.dimmed());
        }
    }
    if let Some(error) = &report.error {
        let _ = writeln!(out, "\n{} {error}", "certutil error:".bold().red());
    }
    for warning in &report.warnings {
        let _ = writeln!(out, "{} {warning}", "Warning:".yellow().bold());
    }
    out
}

/// Human-readable rendering of a single certificate.
pub fn render_certificate(cert: &Certificate) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", "Common Name:".bold(), cert.common_name().cyan().bold());
    let _ = writeln!(out, "  {} {}", "Subject:".bold(), cert.subject());
    let _ = writeln!(out, "  {} {}", "Issuer:".bold(), cert.issuer());
    let _ = writeln!(out, "  {} {}", "Serial:".bold(), cert.serial_hex());
    let _ = writeln!(out, "  {} {}", "SHA-256:".bold(), cert.fingerprint());
    let _ = writeln!(out, "  {} {}", "CA:".bold(), yes_no(cert.is_ca()));
    let _ = writeln!(
        out,
        "  {} {} .. {}",
        "Validity:".bold(),
        cert.not_before().to_rfc3339(),
        cert.not_after().to_rfc3339()
    );
    for url in cert.ocsp_servers() {
        let _ = writeln!(out, "  {} {url}", "OCSP:".bold());
    }
    for url in cert.crl_distribution_points() {
        let _ = writeln!(out, "  {} {url}", "CRL:".bold());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cacop::{ChainReport, CrlOutcome, ExpirationStatus};
    use cacop_core::testing::TestPki;
    use chrono::Utc;

    fn report() -> SubjectReport {
        let pki = TestPki::new();
        let expiration = ExpirationStatus {
            expired: false,
            now: Utc::now(),
            error: None,
        };
        let results = pki
            .chain()
            .into_iter()
            .map(|cert| {
                let crl = vec![
                    CrlStatus::checked("http://crl.example.test/a.crl", CrlOutcome::default()),
                    CrlStatus::failed("http://crl.example.test/b.crl", "HTTP 404"),
                ];
                CertificateResult::new(cert, Vec::new(), crl, expiration.clone())
            })
            .collect();
        SubjectReport::new("https://subject.example.test", ChainReport::from_results(results).unwrap())
    }

    #[test]
    fn parses_format_names() {
        assert_eq!("YAML".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert_eq!("table".parse::<OutputFormat>().unwrap(), OutputFormat::Pretty);
        assert!("csv".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn pretty_report_lists_every_position_and_error() {
        colored::control::set_override(false);
        let text = render_report(&report());

        assert!(text.contains("leaf.example.test"));
        assert!(text.contains("Test Intermediate CA"));
        assert!(text.contains("Test Root CA"));
        assert!(text.contains("good, error"));
        assert!(text.contains("http://crl.example.test/b.crl: HTTP 404"));
        assert!(text.contains("Verdict: OK"));
    }

    #[test]
    fn machine_formats_keep_field_names() {
        let report = report();
        let json: serde_json::Value =
            serde_json::from_str(&serialize(&report, OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["subject_url"], "https://subject.example.test");
        assert_eq!(json["chain"]["intermediates"].as_array().unwrap().len(), 1);

        let yaml = serialize(&report, OutputFormat::Yaml).unwrap();
        assert!(yaml.contains("subject_url: https://subject.example.test"));
    }
}
