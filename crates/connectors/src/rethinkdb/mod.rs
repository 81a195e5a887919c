use crate::{
    rethinkdb::protocol::{query_type, response_type},
    store::{
        InsertOptions, InsertSummary, StoreConnection, StoreConnector, TableInfo,
        error::StoreError,
    },
};
use async_trait::async_trait;
use model::core::{identifiers::TableRef, value::Record};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};
use tracing::debug;

pub mod protocol;
pub mod term;

pub const DEFAULT_PORT: u16 = 28015;

#[derive(Debug, Clone)]
pub struct RethinkConnector {
    host: String,
    port: u16,
    auth_key: String,
}

impl RethinkConnector {
    pub fn new(host: impl Into<String>, port: u16, auth_key: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            auth_key: auth_key.into(),
        }
    }
}

#[async_trait]
impl StoreConnector for RethinkConnector {
    async fn connect(&self) -> Result<Box<dyn StoreConnection>, StoreError> {
        let stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|source| StoreError::Connect {
                address: self.describe(),
                source,
            })?;
        stream.set_nodelay(true)?;

        let connection = RethinkConnection::handshake(stream, &self.auth_key).await?;
        debug!(address = %self.describe(), "Connected");
        Ok(Box::new(connection))
    }

    fn describe(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A single authenticated session. Queries run one at a time.
pub struct RethinkConnection<S> {
    stream: S,
    next_token: u64,
}

impl<S> RethinkConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub async fn handshake(mut stream: S, auth_key: &str) -> Result<Self, StoreError> {
        protocol::handshake(&mut stream, auth_key).await?;
        Ok(Self {
            stream,
            next_token: 1,
        })
    }

    /// Runs `term` to completion, following partial sequences until the
    /// server reports the last chunk.
    pub async fn run(&mut self, term: Value) -> Result<Value, StoreError> {
        let token = self.next_token;
        self.next_token += 1;

        protocol::write_query(&mut self.stream, token, &json!([query_type::START, term, {}]))
            .await?;

        let mut sequence = Vec::new();
        loop {
            let (reply_token, response) = protocol::read_response(&mut self.stream).await?;
            if reply_token != token {
                return Err(StoreError::UnexpectedResponse(format!(
                    "reply for query {reply_token} while waiting for {token}"
                )));
            }

            match response.kind {
                response_type::SUCCESS_ATOM => {
                    return response.results.into_iter().next().ok_or_else(|| {
                        StoreError::UnexpectedResponse("empty atom response".to_string())
                    });
                }
                response_type::SUCCESS_SEQUENCE => {
                    sequence.extend(response.results);
                    return Ok(Value::Array(sequence));
                }
                response_type::SUCCESS_PARTIAL => {
                    sequence.extend(response.results);
                    protocol::write_query(&mut self.stream, token, &json!([query_type::CONTINUE]))
                        .await?;
                }
                response_type::CLIENT_ERROR => return Err(StoreError::Client(response.message())),
                response_type::COMPILE_ERROR => {
                    return Err(StoreError::Compile(response.message()));
                }
                response_type::RUNTIME_ERROR => {
                    return Err(StoreError::Runtime(response.message()));
                }
                other => {
                    return Err(StoreError::UnexpectedResponse(format!(
                        "unknown response type {other}"
                    )));
                }
            }
        }
    }

    async fn run_as<T: DeserializeOwned>(&mut self, term: Value) -> Result<T, StoreError> {
        let value = self.run(term).await?;
        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl<S> StoreConnection for RethinkConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn list_databases(&mut self) -> Result<Vec<String>, StoreError> {
        self.run_as(term::db_list()).await
    }

    async fn create_database(&mut self, db: &str) -> Result<(), StoreError> {
        self.run(term::db_create(db)).await.map(|_| ())
    }

    async fn list_tables(&mut self, db: &str) -> Result<Vec<String>, StoreError> {
        self.run_as(term::table_list(db)).await
    }

    async fn create_table(
        &mut self,
        table: &TableRef,
        primary_key: Option<&str>,
    ) -> Result<(), StoreError> {
        self.run(term::table_create(table, primary_key))
            .await
            .map(|_| ())
    }

    async fn table_info(&mut self, table: &TableRef) -> Result<TableInfo, StoreError> {
        self.run_as(term::info(table)).await
    }

    async fn bulk_insert(
        &mut self,
        table: &TableRef,
        records: &[Record],
        options: InsertOptions,
    ) -> Result<InsertSummary, StoreError> {
        self.run_as(term::insert(table, records, options)).await
    }
}
