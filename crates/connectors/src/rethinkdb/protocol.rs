//! Framing for the V0_4 JSON wire protocol.

use crate::store::error::StoreError;
use bytes::{BufMut, BytesMut};
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const VERSION_V0_4: u32 = 0x400c_2d20;
pub const PROTOCOL_JSON: u32 = 0x7e69_70c7;

/// Largest response body accepted from the server.
const MAX_RESPONSE_LEN: usize = 64 * 1024 * 1024;

pub mod query_type {
    pub const START: u8 = 1;
    pub const CONTINUE: u8 = 2;
}

pub mod response_type {
    pub const SUCCESS_ATOM: u32 = 1;
    pub const SUCCESS_SEQUENCE: u32 = 2;
    pub const SUCCESS_PARTIAL: u32 = 3;
    pub const CLIENT_ERROR: u32 = 16;
    pub const COMPILE_ERROR: u32 = 17;
    pub const RUNTIME_ERROR: u32 = 18;
}

#[derive(Debug, Deserialize)]
pub struct Response {
    #[serde(rename = "t")]
    pub kind: u32,
    #[serde(rename = "r", default)]
    pub results: Vec<Value>,
}

impl Response {
    /// Error text carried by an error response.
    pub fn message(&self) -> String {
        match self.results.first() {
            Some(Value::String(message)) => message.clone(),
            Some(other) => other.to_string(),
            None => "no error message".to_string(),
        }
    }
}

pub async fn handshake<S>(stream: &mut S, auth_key: &str) -> Result<(), StoreError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = BytesMut::with_capacity(12 + auth_key.len());
    buf.put_u32_le(VERSION_V0_4);
    buf.put_u32_le(auth_key.len() as u32);
    buf.put_slice(auth_key.as_bytes());
    buf.put_u32_le(PROTOCOL_JSON);
    stream.write_all(&buf).await?;
    stream.flush().await?;

    let reply = read_nul_terminated(stream).await?;
    if reply != "SUCCESS" {
        return Err(StoreError::Handshake(reply));
    }
    Ok(())
}

pub async fn write_query<S>(stream: &mut S, token: u64, query: &Value) -> Result<(), StoreError>
where
    S: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(query)?;
    let mut buf = BytesMut::with_capacity(12 + body.len());
    buf.put_u64_le(token);
    buf.put_u32_le(body.len() as u32);
    buf.put_slice(&body);
    stream.write_all(&buf).await?;
    stream.flush().await?;
    Ok(())
}

pub async fn read_response<S>(stream: &mut S) -> Result<(u64, Response), StoreError>
where
    S: AsyncRead + Unpin,
{
    let token = stream.read_u64_le().await?;
    let len = stream.read_u32_le().await? as usize;
    if len > MAX_RESPONSE_LEN {
        return Err(StoreError::UnexpectedResponse(format!(
            "response of {len} bytes exceeds the {MAX_RESPONSE_LEN} byte limit"
        )));
    }

    let mut body = vec![0; len];
    stream.read_exact(&mut body).await?;
    Ok((token, serde_json::from_slice(&body)?))
}

async fn read_nul_terminated<S>(stream: &mut S) -> Result<String, StoreError>
where
    S: AsyncRead + Unpin,
{
    let mut bytes = Vec::new();
    loop {
        match stream.read_u8().await? {
            0 => break,
            byte => bytes.push(byte),
        }
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
