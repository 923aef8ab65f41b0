//! Arguments for the PVTT utility

use clap::{ArgGroup, Parser};

use certpath::get_now;

/// Path Validation Test Tool (PVTT)
#[derive(Parser, Debug, Default)]
#[command(arg_required_else_help(true))]
#[clap(author, version, about, long_about = None)]
#[clap(group(ArgGroup::new("mode").required(true).args(["nist_folder", "x509test_folder"])))]
pub struct PvttArgs {
    /// Full path of folder containing one subfolder per test case. Each subfolder holds the target
    /// certificate as end.crt along with CA certificates (*.crt) and CRLs (*.crl). Self-signed
    /// certificates are used as trust anchors and revocation checking is mandatory.
    #[clap(long, help_heading = "MODE")]
    pub nist_folder: Option<String>,

    /// Full path of folder containing root.pem and one PEM bundle per test case. The first
    /// certificate in a bundle is the target and the rest are intermediate CA certificates.
    #[clap(long, help_heading = "MODE")]
    pub x509test_folder: Option<String>,

    /// Full path and filename of results file listing one identifier:expected_status pair per line
    /// (defaults to expected.txt in the selected folder).
    #[clap(short, long, help_heading = "COMMON OPTIONS")]
    pub results: Option<String>,

    /// Time to use for path validation expressed as the number of seconds since Unix epoch
    /// (defaults to current system time).
    #[clap(short = 'i', long, default_value_t = get_now(), help_heading = "COMMON OPTIONS")]
    pub time_of_interest: u64,

    /// Full path and filename of JSON file containing restrictions to use in lieu of defaults.
    #[clap(short, long, help_heading = "COMMON OPTIONS")]
    pub settings: Option<String>,

    /// Full path and filename of YAML-formatted configuration file for log4rs logging mechanism.
    /// See <https://docs.rs/log4rs/latest/log4rs/> for details.
    #[clap(short, long, help_heading = "COMMON OPTIONS")]
    pub logging_config: Option<String>,
}
