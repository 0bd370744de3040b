use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Migrate every source record through the worker pool
    Migrate {
        #[arg(long, help = "Mapping contract (JSON)")]
        contract: PathBuf,

        #[arg(long, help = "Run settings file (JSON); defaults apply when omitted")]
        config: Option<PathBuf>,

        #[arg(
            long,
            help = "Read *.xml files from this directory instead of the source table"
        )]
        xml_dir: Option<PathBuf>,

        #[arg(long, help = "Map and insert into memory only; nothing is written")]
        dry_run: bool,

        #[arg(long, help = "Print the summary as JSON")]
        json: bool,
    },

    /// Map a single XML document and print the rows per table
    Map {
        #[arg(long, help = "Mapping contract (JSON)")]
        contract: PathBuf,

        #[arg(long, help = "XML document to map")]
        xml: PathBuf,

        #[arg(long, help = "Pretty-print the JSON output")]
        pretty: bool,

        #[arg(long, help = "Print the flattened element tree instead of rows")]
        flatten: bool,
    },

    /// Load a contract and report every finding
    CheckContract {
        #[arg(long, help = "Mapping contract (JSON)")]
        contract: PathBuf,
    },

    /// Run the pre-processing validator on one document
    Validate {
        #[arg(long, help = "Mapping contract (JSON)")]
        contract: PathBuf,

        #[arg(long, help = "XML document to validate")]
        xml: PathBuf,
    },
}
