use crate::error::CliError;
use clap::Parser;
use engine_config::{
    ConnectTarget, ImportSettings,
    settings::{
        DEFAULT_CLIENTS,
        dialect::{csv_dialect, parse_field_list},
    },
};
use model::{
    core::identifiers::TableRef,
    execution::spec::{CsvDialect, FileFormat},
};
use planner::{discovery::discover, filter::ImportFilter, plan::ImportPlan};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Parser, Debug)]
#[command(
    name = "rdb-import",
    version,
    about = "Import JSON and CSV files into a RethinkDB cluster"
)]
pub struct Args {
    #[arg(
        short = 'c',
        long = "connect",
        value_name = "HOST:PORT",
        default_value = "localhost:28015",
        help = "Host and client port of a node to connect to"
    )]
    pub connect: ConnectTarget,

    #[arg(short = 'a', long = "auth", value_name = "AUTH_KEY", default_value = "")]
    pub auth_key: String,

    #[arg(
        long,
        default_value_t = DEFAULT_CLIENTS,
        help = "Number of concurrent connections used for inserts"
    )]
    pub clients: usize,

    #[arg(long, help = "Import into existing tables, overwriting rows with the same primary key")]
    pub force: bool,

    #[arg(long, value_name = "FIELD,FIELD...", help = "Import only these fields")]
    pub fields: Option<String>,

    #[arg(short = 'd', long, conflicts_with = "file", help = "Directory to import data from")]
    pub directory: Option<PathBuf>,

    #[arg(
        short = 'i',
        long = "import",
        value_name = "DB | DB.TABLE",
        requires = "directory",
        help = "Limit the directory import to a database or table, may be repeated"
    )]
    pub import: Vec<String>,

    #[arg(short = 'f', long, help = "File to import data from")]
    pub file: Option<PathBuf>,

    #[arg(long, value_name = "DB.TABLE", requires = "file")]
    pub table: Option<String>,

    #[arg(long, requires = "file", help = "json or csv, defaults to the file extension")]
    pub format: Option<FileFormat>,

    #[arg(long, value_name = "KEY", requires = "file")]
    pub pkey: Option<String>,

    #[arg(long, requires = "file", help = "CSV delimiter, a single character or \\t")]
    pub delimiter: Option<String>,

    #[arg(long, requires = "file", help = "The CSV file has no header row")]
    pub no_header: bool,

    #[arg(long, value_name = "FIELD,FIELD...", requires = "file")]
    pub custom_header: Option<String>,
}

impl Args {
    pub fn settings(&self) -> ImportSettings {
        ImportSettings::default()
            .with_target(self.connect.clone())
            .with_auth_key(self.auth_key.clone())
            .with_clients(self.clients)
            .with_upsert(self.force)
    }

    /// Resolves the files to import. Directory mode scans the tree; file
    /// mode checks the single file and its options.
    pub fn plan(&self) -> Result<ImportPlan, CliError> {
        let fields = self.fields.as_deref().map(parse_field_list).transpose()?;
        match (&self.directory, &self.file) {
            (Some(dir), None) => self.directory_plan(dir, fields),
            (None, Some(file)) => self.file_plan(file, fields),
            (Some(_), Some(_)) => Err(CliError::usage(
                "--directory and --file cannot be used together",
            )),
            (None, None) => Err(CliError::usage(
                "Either -f/--file or -d/--directory is required",
            )),
        }
    }

    fn directory_plan(&self, dir: &Path, fields: Option<Vec<String>>) -> Result<ImportPlan, CliError> {
        let filter = ImportFilter::parse(self.import.as_slice())?;
        if fields.is_some() && filter.single_table().is_none() {
            return Err(CliError::usage(
                "--fields can only be used in directory mode when a single table is imported",
            ));
        }

        let discovery = discover(dir, &filter)?;
        if !discovery.ignored.is_empty() {
            let ignored = discovery
                .ignored
                .iter()
                .map(|path| path.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            warn!(files = %ignored, "Unexpected files found in the import directory were ignored");
        }

        Ok(ImportPlan::from_discovery(discovery, fields)?)
    }

    fn file_plan(&self, file: &Path, fields: Option<Vec<String>>) -> Result<ImportPlan, CliError> {
        let table: TableRef = self
            .table
            .as_deref()
            .ok_or_else(|| CliError::usage("--table must be specified when using --file"))?
            .parse()?;

        let format = match self.format {
            Some(format) => format,
            None => format_from_extension(file),
        };

        let dialect = match format {
            FileFormat::Csv => csv_dialect(
                self.delimiter.as_deref(),
                self.no_header,
                self.custom_header.as_deref(),
            )?,
            FileFormat::Json => {
                if self.delimiter.is_some() || self.no_header || self.custom_header.is_some() {
                    return Err(CliError::usage(
                        "--delimiter, --no-header and --custom-header are only valid for csv files",
                    ));
                }
                CsvDialect::default()
            }
        };

        Ok(ImportPlan::single_file(
            file.to_path_buf(),
            format,
            table,
            self.pkey.clone(),
            fields,
            dialect,
        )?)
    }
}

/// Files without a recognised extension are read as JSON.
fn format_from_extension(file: &Path) -> FileFormat {
    file.extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| ext.parse().ok())
        .unwrap_or(FileFormat::Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_config::SettingsError;
    use std::fs;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("rdb-import").chain(args.iter().copied())).unwrap()
    }

    fn data_file(dir: &TempDir, name: &str) -> String {
        let path = dir.path().join(name);
        fs::write(&path, "").unwrap();
        path.display().to_string()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["-d", "/tmp"]);
        let settings = args.settings();
        assert_eq!(settings.target, ConnectTarget::default());
        assert_eq!(settings.clients, DEFAULT_CLIENTS);
        assert!(!settings.upsert);
    }

    #[test]
    fn test_connect_and_force() {
        let args = parse(&["-c", "db1:29015", "--force", "--clients", "8", "-d", "/tmp"]);
        let settings = args.settings();
        assert_eq!(settings.target.to_string(), "db1:29015");
        assert_eq!(settings.clients, 8);
        assert!(settings.upsert);
    }

    #[test]
    fn test_file_mode_infers_format() {
        let dir = TempDir::new().unwrap();
        let file = data_file(&dir, "people.csv");
        let plan = parse(&["-f", &file, "--table", "test.people", "--pkey", "uid"])
            .plan()
            .unwrap();

        let spec = &plan.specs()[0];
        assert_eq!(spec.format, FileFormat::Csv);
        assert_eq!(spec.primary_key.as_deref(), Some("uid"));
        assert_eq!(spec.destination, TableRef::new("test", "people"));
    }

    #[test]
    fn test_file_mode_requires_table() {
        let dir = TempDir::new().unwrap();
        let file = data_file(&dir, "people.json");
        let err = parse(&["-f", &file]).plan().unwrap_err();
        assert_eq!(err.to_string(), "--table must be specified when using --file");
    }

    #[test]
    fn test_unknown_extension_defaults_to_json() {
        let dir = TempDir::new().unwrap();
        let file = data_file(&dir, "people.txt");
        let plan = parse(&["-f", &file, "--table", "test.people"]).plan().unwrap();
        assert_eq!(plan.specs()[0].format, FileFormat::Json);

        let plan = parse(&["-f", &file, "--table", "test.people", "--format", "csv"])
            .plan()
            .unwrap();
        assert_eq!(plan.specs()[0].format, FileFormat::Csv);
    }

    #[test]
    fn test_csv_options_rejected_for_json() {
        let dir = TempDir::new().unwrap();
        let file = data_file(&dir, "people.json");
        let err = parse(&["-f", &file, "--table", "test.people", "--delimiter", ";"])
            .plan()
            .unwrap_err();
        assert!(matches!(err, CliError::Usage(_)));
    }

    #[test]
    fn test_no_header_requires_custom_header() {
        let dir = TempDir::new().unwrap();
        let file = data_file(&dir, "people.csv");
        let err = parse(&["-f", &file, "--table", "test.people", "--no-header"])
            .plan()
            .unwrap_err();
        assert!(matches!(err, CliError::Settings(SettingsError::MissingCustomHeader)));

        let plan = parse(&[
            "-f", &file, "--table", "test.people", "--no-header", "--custom-header", "id,name",
            "--delimiter", "\\t",
        ])
        .plan()
        .unwrap();
        let dialect = &plan.specs()[0].dialect;
        assert_eq!(dialect.delimiter, b'\t');
        assert!(!dialect.has_header_row);
        assert_eq!(dialect.custom_header, Some(vec!["id".to_string(), "name".to_string()]));
    }

    #[test]
    fn test_invalid_table_name() {
        let dir = TempDir::new().unwrap();
        let file = data_file(&dir, "people.json");
        let err = parse(&["-f", &file, "--table", "test.peo-ple"]).plan().unwrap_err();
        assert!(matches!(err, CliError::Identifier(_)));
    }

    #[test]
    fn test_fields_need_single_table_in_directory_mode() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().display().to_string();

        let err = parse(&["-d", &root, "--fields", "id"]).plan().unwrap_err();
        assert!(matches!(err, CliError::Usage(_)));

        let plan = parse(&["-d", &root, "-i", "test.people", "--fields", "id,id,name"])
            .plan()
            .unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_mode_is_required() {
        let err = parse(&[]).plan().unwrap_err();
        assert!(matches!(err, CliError::Usage(_)));
        assert!(Args::try_parse_from(["rdb-import", "-d", "/a", "-f", "/b"]).is_err());
        assert!(Args::try_parse_from(["rdb-import", "--table", "test.t"]).is_err());
    }
}
