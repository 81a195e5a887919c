use crate::{discovery::Discovery, error::PlanError};
use model::{
    core::identifiers::TableRef,
    execution::spec::{CsvDialect, FileFormat, FileImportSpec},
};
use std::{collections::BTreeSet, path::PathBuf};

/// The fully resolved set of files to import. No two specs share a
/// destination table.
#[derive(Debug, Clone, Default)]
pub struct ImportPlan {
    specs: Vec<FileImportSpec>,
}

impl ImportPlan {
    pub fn new(specs: Vec<FileImportSpec>) -> Result<Self, PlanError> {
        let mut seen = BTreeSet::new();
        for spec in &specs {
            if !seen.insert(&spec.destination) {
                return Err(PlanError::DuplicateDestination(spec.destination.clone()));
            }
        }
        Ok(Self { specs })
    }

    /// Builds one spec per discovered file. `fields` applies to every file.
    pub fn from_discovery(
        discovery: Discovery,
        fields: Option<Vec<String>>,
    ) -> Result<Self, PlanError> {
        let specs = discovery
            .files
            .into_iter()
            .map(|file| {
                let mut spec = FileImportSpec::new(file.path, file.format, file.destination)
                    .with_primary_key(file.primary_key);
                spec.fields = fields.clone();
                spec
            })
            .collect();
        Self::new(specs)
    }

    pub fn single_file(
        path: PathBuf,
        format: FileFormat,
        destination: TableRef,
        primary_key: Option<String>,
        fields: Option<Vec<String>>,
        dialect: CsvDialect,
    ) -> Result<Self, PlanError> {
        if !path.is_file() {
            return Err(PlanError::MissingFile(path));
        }
        let mut spec = FileImportSpec::new(path, format, destination).with_dialect(dialect);
        spec.primary_key = primary_key;
        spec.fields = fields;
        Self::new(vec![spec])
    }

    pub fn specs(&self) -> &[FileImportSpec] {
        &self.specs
    }

    pub fn specs_mut(&mut self) -> &mut [FileImportSpec] {
        &mut self.specs
    }

    pub fn into_specs(self) -> Vec<FileImportSpec> {
        self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::DiscoveredFile;
    use tempfile::NamedTempFile;

    fn spec(path: &str, table: &str) -> FileImportSpec {
        FileImportSpec::new(path, FileFormat::Json, table.parse().unwrap())
    }

    #[test]
    fn test_duplicate_destination_is_rejected() {
        let err = ImportPlan::new(vec![
            spec("a.json", "test.people"),
            spec("b.json", "test.pets"),
            spec("c.json", "test.people"),
        ])
        .unwrap_err();

        assert!(matches!(err, PlanError::DuplicateDestination(ref t) if t.to_string() == "test.people"));
    }

    #[test]
    fn test_single_file_requires_existing_file() {
        let err = ImportPlan::single_file(
            PathBuf::from("/does/not/exist.json"),
            FileFormat::Json,
            TableRef::new("test", "t"),
            None,
            None,
            CsvDialect::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PlanError::MissingFile(_)));

        let file = NamedTempFile::new().unwrap();
        let plan = ImportPlan::single_file(
            file.path().to_path_buf(),
            FileFormat::Csv,
            TableRef::new("test", "t"),
            Some("count".into()),
            Some(vec!["count".into()]),
            CsvDialect::default(),
        )
        .unwrap();
        assert_eq!(plan.specs()[0].primary_key.as_deref(), Some("count"));
        assert_eq!(plan.specs()[0].fields, Some(vec!["count".to_string()]));
    }

    #[test]
    fn test_discovery_specs_carry_sidecar_key() {
        let discovery = Discovery {
            files: vec![DiscoveredFile {
                path: PathBuf::from("/export/test/people.json"),
                format: FileFormat::Json,
                destination: TableRef::new("test", "people"),
                primary_key: "uid".into(),
            }],
            ignored: Vec::new(),
        };
        let plan = ImportPlan::from_discovery(discovery, None).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.specs()[0].primary_key.as_deref(), Some("uid"));
    }
}
