//! Builders for the handful of query terms the importer sends.

use crate::store::InsertOptions;
use model::core::{identifiers::TableRef, value::Record};
use serde_json::{Map, Value, json};

const MAKE_ARRAY: u32 = 2;
const DB: u32 = 14;
const TABLE: u32 = 15;
const INSERT: u32 = 56;
const DB_CREATE: u32 = 57;
const DB_LIST: u32 = 59;
const TABLE_CREATE: u32 = 60;
const TABLE_LIST: u32 = 62;
const INFO: u32 = 79;

pub fn db(name: &str) -> Value {
    json!([DB, [name]])
}

pub fn table(table: &TableRef) -> Value {
    json!([TABLE, [db(&table.db), table.table]])
}

pub fn db_list() -> Value {
    json!([DB_LIST])
}

pub fn db_create(name: &str) -> Value {
    json!([DB_CREATE, [name]])
}

pub fn table_list(db_name: &str) -> Value {
    json!([TABLE_LIST, [db(db_name)]])
}

pub fn table_create(target: &TableRef, primary_key: Option<&str>) -> Value {
    let args = json!([db(&target.db), target.table]);
    match primary_key {
        Some(key) => json!([TABLE_CREATE, args, {"primary_key": key}]),
        None => json!([TABLE_CREATE, args]),
    }
}

pub fn info(target: &TableRef) -> Value {
    json!([INFO, [table(target)]])
}

pub fn insert(target: &TableRef, records: &[Record], options: InsertOptions) -> Value {
    let rows = records
        .iter()
        .map(|record| datum_object(record.as_map()))
        .collect::<Vec<_>>();
    let conflict = if options.upsert { "replace" } else { "error" };

    json!([
        INSERT,
        [table(target), [MAKE_ARRAY, rows]],
        {"durability": options.durability.as_str(), "conflict": conflict}
    ])
}

/// Encodes a JSON value as a term. Arrays are the only literal that has to be
/// wrapped, everywhere they occur.
pub fn datum(value: &Value) -> Value {
    match value {
        Value::Array(items) => json!([MAKE_ARRAY, items.iter().map(datum).collect::<Vec<_>>()]),
        Value::Object(map) => datum_object(map),
        other => other.clone(),
    }
}

fn datum_object(map: &Map<String, Value>) -> Value {
    Value::Object(
        map.iter()
            .map(|(key, value)| (key.clone(), datum(value)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Durability;

    #[test]
    fn test_nested_arrays_are_wrapped() {
        let value = json!({"tags": ["a", ["b"]], "n": 1, "o": {"xs": []}});
        assert_eq!(
            datum(&value),
            json!({"tags": [2, ["a", [2, ["b"]]]], "n": 1, "o": {"xs": [2, []]}})
        );
    }

    #[test]
    fn test_insert_term() {
        let people = TableRef::new("test", "people");
        let record = Record::try_from(json!({"id": 1})).unwrap();
        let options = InsertOptions {
            upsert: true,
            durability: Durability::Soft,
        };

        assert_eq!(
            insert(&people, &[record], options),
            json!([
                56,
                [[15, [[14, ["test"]], "people"]], [2, [{"id": 1}]]],
                {"durability": "soft", "conflict": "replace"}
            ])
        );
    }

    #[test]
    fn test_table_create_optargs() {
        let people = TableRef::new("test", "people");
        assert_eq!(
            table_create(&people, Some("uid")),
            json!([60, [[14, ["test"]], "people"], {"primary_key": "uid"}])
        );
        assert_eq!(table_create(&people, None), json!([60, [[14, ["test"]], "people"]]));
    }
}
