//! An in-process server speaking enough of the V0_4 JSON protocol to serve
//! the importer's queries. State lives in memory and is shared by every
//! session.

use connectors::rethinkdb::protocol::{PROTOCOL_JSON, VERSION_V0_4, response_type};
use serde_json::{Value, json};
use std::{
    collections::BTreeMap,
    io,
    net::SocketAddr,
    sync::{Arc, Mutex, MutexGuard},
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

const MAKE_ARRAY: u64 = 2;
const INSERT: u64 = 56;
const DB_CREATE: u64 = 57;
const DB_LIST: u64 = 59;
const TABLE_CREATE: u64 = 60;
const TABLE_LIST: u64 = 62;
const INFO: u64 = 79;

#[derive(Debug)]
struct FakeTable {
    primary_key: String,
    rows: BTreeMap<String, Value>,
}

#[derive(Debug, Default)]
struct FakeState {
    databases: BTreeMap<String, BTreeMap<String, FakeTable>>,
    sessions: usize,
    insert_queries: usize,
    generated_keys: usize,
}

#[derive(Clone)]
pub struct FakeServer {
    addr: SocketAddr,
    auth_key: String,
    state: Arc<Mutex<FakeState>>,
}

impl FakeServer {
    pub async fn start(auth_key: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fake server");
        let server = Self {
            addr: listener.local_addr().expect("local addr"),
            auth_key: auth_key.to_string(),
            state: Arc::new(Mutex::new(FakeState::default())),
        };

        let accepting = server.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let session = accepting.clone();
                tokio::spawn(async move {
                    let _ = session.serve(stream).await;
                });
            }
        });
        server
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn with_table(self, db: &str, table: &str, primary_key: &str) -> Self {
        self.lock().databases.entry(db.to_string()).or_default().insert(
            table.to_string(),
            FakeTable {
                primary_key: primary_key.to_string(),
                rows: BTreeMap::new(),
            },
        );
        self
    }

    pub fn rows(&self, db: &str, table: &str) -> Vec<Value> {
        self.lock()
            .databases
            .get(db)
            .and_then(|tables| tables.get(table))
            .map(|t| t.rows.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn primary_key(&self, db: &str, table: &str) -> Option<String> {
        self.lock()
            .databases
            .get(db)
            .and_then(|tables| tables.get(table))
            .map(|t| t.primary_key.clone())
    }

    pub fn sessions(&self) -> usize {
        self.lock().sessions
    }

    pub fn insert_queries(&self) -> usize {
        self.lock().insert_queries
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake server state poisoned")
    }

    async fn serve(&self, mut stream: TcpStream) -> io::Result<()> {
        let magic = stream.read_u32_le().await?;
        let key_len = stream.read_u32_le().await? as usize;
        let mut key = vec![0; key_len];
        stream.read_exact(&mut key).await?;
        let protocol = stream.read_u32_le().await?;

        if magic != VERSION_V0_4 || protocol != PROTOCOL_JSON || key != self.auth_key.as_bytes() {
            stream.write_all(b"ERROR: Incorrect authorization key.\0").await?;
            return Ok(());
        }
        stream.write_all(b"SUCCESS\0").await?;
        self.lock().sessions += 1;

        loop {
            let Ok(token) = stream.read_u64_le().await else {
                return Ok(());
            };
            let len = stream.read_u32_le().await? as usize;
            let mut body = vec![0; len];
            stream.read_exact(&mut body).await?;

            let query: Value = serde_json::from_slice(&body)?;
            let reply = match self.evaluate(&query[1]) {
                Ok(value) => json!({"t": response_type::SUCCESS_ATOM, "r": [value]}),
                Err(message) => json!({"t": response_type::RUNTIME_ERROR, "r": [message]}),
            };

            let bytes = serde_json::to_vec(&reply)?;
            stream.write_u64_le(token).await?;
            stream.write_u32_le(bytes.len() as u32).await?;
            stream.write_all(&bytes).await?;
        }
    }

    fn evaluate(&self, term: &Value) -> Result<Value, String> {
        let kind = term[0].as_u64().unwrap_or_default();
        let args = &term[1];
        let mut state = self.lock();

        match kind {
            DB_LIST => Ok(json!(state.databases.keys().collect::<Vec<_>>())),
            DB_CREATE => {
                let name = string_arg(&args[0])?;
                if state.databases.contains_key(&name) {
                    return Err(format!("Database `{name}` already exists."));
                }
                state.databases.insert(name, BTreeMap::new());
                Ok(json!({"dbs_created": 1}))
            }
            TABLE_LIST => {
                let db = db_name(&args[0])?;
                let tables = state
                    .databases
                    .get(&db)
                    .ok_or_else(|| format!("Database `{db}` does not exist."))?;
                Ok(json!(tables.keys().collect::<Vec<_>>()))
            }
            TABLE_CREATE => {
                let db = db_name(&args[0])?;
                let table = string_arg(&args[1])?;
                let primary_key = term[2]["primary_key"].as_str().unwrap_or("id").to_string();
                let tables = state
                    .databases
                    .get_mut(&db)
                    .ok_or_else(|| format!("Database `{db}` does not exist."))?;
                if tables.contains_key(&table) {
                    return Err(format!("Table `{db}.{table}` already exists."));
                }
                tables.insert(
                    table,
                    FakeTable {
                        primary_key,
                        rows: BTreeMap::new(),
                    },
                );
                Ok(json!({"tables_created": 1}))
            }
            INFO => {
                let (db, table) = table_name(&args[0])?;
                let found = state
                    .databases
                    .get(&db)
                    .and_then(|tables| tables.get(&table))
                    .ok_or_else(|| format!("Table `{db}.{table}` does not exist."))?;
                Ok(json!({"type": "TABLE", "name": table, "primary_key": found.primary_key}))
            }
            INSERT => {
                let (db, table) = table_name(&args[0])?;
                let rows = plain(&args[1]);
                let replace = term[2]["conflict"] == "replace";
                state.insert_queries += 1;
                let mut generated = state.generated_keys;

                let target = state
                    .databases
                    .get_mut(&db)
                    .and_then(|tables| tables.get_mut(&table))
                    .ok_or_else(|| format!("Table `{db}.{table}` does not exist."))?;

                let (mut inserted, mut replaced, mut errors) = (0, 0, 0);
                let mut first_error = None;
                for row in rows.as_array().into_iter().flatten() {
                    let key = match row.get(&target.primary_key) {
                        Some(key) => key.to_string(),
                        None => {
                            generated += 1;
                            format!("generated-{generated}")
                        }
                    };
                    if target.rows.contains_key(&key) {
                        if !replace {
                            errors += 1;
                            first_error.get_or_insert_with(|| {
                                format!("Duplicate primary key `{}`: {key}", target.primary_key)
                            });
                            continue;
                        }
                        replaced += 1;
                    } else {
                        inserted += 1;
                    }
                    target.rows.insert(key, row.clone());
                }
                state.generated_keys = generated;

                Ok(json!({
                    "inserted": inserted,
                    "replaced": replaced,
                    "unchanged": 0,
                    "errors": errors,
                    "first_error": first_error,
                }))
            }
            other => Err(format!("Unsupported term {other}")),
        }
    }
}

fn string_arg(value: &Value) -> Result<String, String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| format!("expected a string, got {value}"))
}

/// `[DB, [name]]`
fn db_name(term: &Value) -> Result<String, String> {
    string_arg(&term[1][0])
}

/// `[TABLE, [[DB, [db]], name]]`
fn table_name(term: &Value) -> Result<(String, String), String> {
    Ok((db_name(&term[1][0])?, string_arg(&term[1][1])?))
}

/// Strips `MAKE_ARRAY` wrappers from a datum.
fn plain(value: &Value) -> Value {
    match value {
        Value::Array(items) if items.len() == 2 && items[0] == MAKE_ARRAY => {
            Value::Array(items[1].as_array().into_iter().flatten().map(plain).collect())
        }
        Value::Object(map) => Value::Object(map.iter().map(|(k, v)| (k.clone(), plain(v))).collect()),
        other => other.clone(),
    }
}
