//! Server List Ping: the handshake + status request every Minecraft
//! server answers on its game port, before any login.
//!
//! Packets are `varint length | varint packet id | payload`; strings are
//! varint-length-prefixed UTF-8.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::ProbeError;

/// Any version works for a status query, servers reply regardless.
const PROTOCOL_VERSION: i32 = 47;
const NEXT_STATE_STATUS: i32 = 1;
const PACKET_ID: i32 = 0x00;

/// Status JSON is small; anything bigger is not a game server.
const MAX_PACKET: usize = 2 * 1024 * 1024;

pub fn write_varint(buf: &mut Vec<u8>, value: i32) {
    let mut v = value as u32;
    loop {
        if v & !0x7f == 0 {
            buf.push(v as u8);
            return;
        }
        buf.push((v & 0x7f) as u8 | 0x80);
        v >>= 7;
    }
}

pub async fn read_varint<R: AsyncRead + Unpin>(r: &mut R) -> Result<i32, ProbeError> {
    let mut value = 0u32;

    for i in 0..5 {
        let b = r.read_u8().await?;
        value |= ((b & 0x7f) as u32) << (7 * i);
        if b & 0x80 == 0 {
            return Ok(value as i32);
        }
    }

    Err(ProbeError::Protocol("varint longer than 5 bytes"))
}

fn write_string(buf: &mut Vec<u8>, s: &str) {
    write_varint(buf, s.len() as i32);
    buf.extend_from_slice(s.as_bytes());
}

fn frame(body: Vec<u8>) -> Vec<u8> {
    let mut packet = Vec::with_capacity(body.len() + 5);
    write_varint(&mut packet, body.len() as i32);
    packet.extend(body);
    packet
}

pub fn handshake(host: &str, port: u16) -> Vec<u8> {
    let mut body = vec![];
    write_varint(&mut body, PACKET_ID);
    write_varint(&mut body, PROTOCOL_VERSION);
    write_string(&mut body, host);
    body.extend_from_slice(&port.to_be_bytes());
    write_varint(&mut body, NEXT_STATE_STATUS);

    frame(body)
}

pub fn status_request() -> Vec<u8> {
    let mut body = vec![];
    write_varint(&mut body, PACKET_ID);

    frame(body)
}

/// Reads one framed packet, returning its id and payload.
pub async fn read_packet<R: AsyncRead + Unpin>(r: &mut R) -> Result<(i32, Vec<u8>), ProbeError> {
    let len = read_varint(r).await?;
    let len = usize::try_from(len).map_err(|_| ProbeError::Protocol("negative packet length"))?;
    if len == 0 || len > MAX_PACKET {
        return Err(ProbeError::Protocol("bad packet length"));
    }

    let mut body = vec![0; len];
    r.read_exact(&mut body).await?;

    let mut cursor = &body[..];
    let id = read_varint(&mut cursor).await?;
    let payload = cursor.to_vec();

    Ok((id, payload))
}

async fn read_string(mut payload: &[u8]) -> Result<String, ProbeError> {
    let len = read_varint(&mut payload).await?;
    let len = usize::try_from(len).map_err(|_| ProbeError::Protocol("negative string length"))?;

    let bytes = payload
        .get(..len)
        .ok_or(ProbeError::Protocol("string runs past packet"))?;

    String::from_utf8(bytes.to_vec()).map_err(|_| ProbeError::Protocol("string isn't utf-8"))
}

/// Runs the exchange on an open connection, returning the raw status JSON.
pub async fn query<S>(stream: &mut S, host: &str, port: u16) -> Result<String, ProbeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut out = handshake(host, port);
    out.extend(status_request());
    stream.write_all(&out).await?;
    stream.flush().await?;

    let (id, payload) = read_packet(stream).await?;
    if id != PACKET_ID {
        return Err(ProbeError::Protocol("unexpected packet id"));
    }

    read_string(&payload).await
}
