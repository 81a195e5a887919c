use crate::settings::error::SettingsError;
use model::execution::spec::CsvDialect;

/// Accepts a single ASCII character, or the two-character escape `\t`.
pub fn parse_delimiter(raw: &str) -> Result<u8, SettingsError> {
    if raw == "\\t" {
        return Ok(b'\t');
    }
    match raw.as_bytes() {
        [byte] if byte.is_ascii() => Ok(*byte),
        _ => Err(SettingsError::InvalidDelimiter(raw.to_string())),
    }
}

/// Splits a comma separated list of names, dropping repeats but keeping the
/// order in which names first appear.
pub fn parse_field_list(raw: &str) -> Result<Vec<String>, SettingsError> {
    let mut fields: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim) {
        if name.is_empty() {
            return Err(SettingsError::InvalidFieldList(raw.to_string()));
        }
        if !fields.iter().any(|f| f == name) {
            fields.push(name.to_string());
        }
    }
    Ok(fields)
}

pub fn csv_dialect(
    delimiter: Option<&str>,
    no_header: bool,
    custom_header: Option<&str>,
) -> Result<CsvDialect, SettingsError> {
    let delimiter = delimiter.map(parse_delimiter).transpose()?.unwrap_or(b',');
    let custom_header = custom_header.map(parse_field_list).transpose()?;

    if no_header && custom_header.is_none() {
        return Err(SettingsError::MissingCustomHeader);
    }

    Ok(CsvDialect {
        delimiter,
        has_header_row: !no_header,
        custom_header,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delimiters() {
        assert_eq!(parse_delimiter(";"), Ok(b';'));
        assert_eq!(parse_delimiter("\\t"), Ok(b'\t'));
        assert_eq!(parse_delimiter("\t"), Ok(b'\t'));
        assert!(parse_delimiter(",,").is_err());
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("é").is_err());
    }

    #[test]
    fn test_field_list_keeps_first_occurrence() {
        assert_eq!(
            parse_field_list("id, name,id").unwrap(),
            vec!["id".to_string(), "name".to_string()]
        );
        assert!(parse_field_list("id,,name").is_err());
    }

    #[test]
    fn test_no_header_needs_custom_header() {
        assert_eq!(
            csv_dialect(None, true, None),
            Err(SettingsError::MissingCustomHeader)
        );

        let dialect = csv_dialect(Some("\\t"), true, Some("a,b")).unwrap();
        assert_eq!(dialect.delimiter, b'\t');
        assert!(!dialect.has_header_row);
        assert_eq!(dialect.custom_header, Some(vec!["a".into(), "b".into()]));
    }

    #[test]
    fn test_default_dialect() {
        assert_eq!(csv_dialect(None, false, None).unwrap(), CsvDialect::default());
    }
}
