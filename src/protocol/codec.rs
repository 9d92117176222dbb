//! Reading and writing control messages on a stream
//!
//! There is no length framing on the wire: a request is one bare JSON object.
//! The reader therefore try-parses after every chunk. A document that is
//! merely incomplete keeps the read going; a document that can no longer
//! become valid JSON is rejected immediately, without waiting for the client
//! to close its end.

use crate::error::{Error, Result};
use crate::protocol::message::{ControlRequest, ControlResponse};
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Default upper bound on a request payload. A well-formed request is well
/// under 200 bytes; anything approaching this limit is garbage.
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 64 * 1024;

const READ_CHUNK: usize = 1024;

/// Read one control request from the stream, bounded at `max_size` bytes.
///
/// Returns a protocol error for an empty stream, a payload that exceeds the
/// bound, or bytes that cannot parse as a request object.
pub async fn read_request<R: AsyncRead + Unpin>(
    reader: &mut R,
    max_size: usize,
) -> Result<ControlRequest> {
    let mut buf = BytesMut::with_capacity(READ_CHUNK);

    loop {
        let n = reader.read_buf(&mut buf).await?;

        if n == 0 {
            // EOF: whatever we have is the whole payload
            if buf.is_empty() {
                return Err(Error::Protocol("Empty request".to_string()));
            }
            return parse(&buf);
        }

        if buf.len() > max_size {
            return Err(Error::Protocol(format!(
                "Request exceeds {} byte limit",
                max_size
            )));
        }

        match serde_json::from_slice::<ControlRequest>(&buf) {
            Ok(req) => return Ok(req),
            // Document still incomplete: keep reading
            Err(e) if e.is_eof() => continue,
            Err(e) => return Err(Error::Protocol(format!("Malformed request: {}", e))),
        }
    }
}

fn parse(buf: &[u8]) -> Result<ControlRequest> {
    serde_json::from_slice(buf).map_err(|e| Error::Protocol(format!("Malformed request: {}", e)))
}

/// Write a control response to the stream and flush it
pub async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &ControlResponse,
) -> Result<()> {
    let encoded = serde_json::to_vec(response)?;
    writer.write_all(&encoded).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_read_request_complete_document() {
        let mut input = Cursor::new(br#"{"service":"booking-event-worker","action":"start"}"#.to_vec());
        let req = read_request(&mut input, DEFAULT_MAX_REQUEST_SIZE).await.unwrap();
        assert_eq!(req.service, "booking-event-worker");
        assert_eq!(req.action, "start");
    }

    #[tokio::test]
    async fn test_read_request_no_half_close_needed() {
        // A duplex pair where the client writes but never shuts down its end
        let (mut client, mut server) = tokio::io::duplex(256);
        tokio::io::AsyncWriteExt::write_all(
            &mut client,
            br#"{"service":"google-calendar-worker","action":"status"}"#,
        )
        .await
        .unwrap();

        let req = read_request(&mut server, DEFAULT_MAX_REQUEST_SIZE).await.unwrap();
        assert_eq!(req.service, "google-calendar-worker");
        assert_eq!(req.action, "status");
        drop(client);
    }

    #[tokio::test]
    async fn test_read_request_truncated_is_error() {
        let mut input = Cursor::new(br#"{"service":"booking"#.to_vec());
        let err = read_request(&mut input, DEFAULT_MAX_REQUEST_SIZE).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn test_read_request_non_json_is_error() {
        let mut input = Cursor::new(b"restart the worker please".to_vec());
        let err = read_request(&mut input, DEFAULT_MAX_REQUEST_SIZE).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn test_read_request_empty_is_error() {
        let mut input = Cursor::new(Vec::new());
        let err = read_request(&mut input, DEFAULT_MAX_REQUEST_SIZE).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn test_read_request_oversized_is_error() {
        // Valid JSON prefix that never terminates within the bound
        let mut payload = br#"{"service":""#.to_vec();
        payload.extend(std::iter::repeat(b'a').take(8 * 1024));
        payload.extend(br#"","action":"start"}"#);
        let mut input = Cursor::new(payload);

        let err = read_request(&mut input, 4096).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn test_read_request_io_error_propagates() {
        let mut reader = tokio_test::io::Builder::new()
            .read(br#"{"service""#)
            .read_error(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            ))
            .build();

        let err = read_request(&mut reader, DEFAULT_MAX_REQUEST_SIZE).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[tokio::test]
    async fn test_encode_decode_round_trip() {
        let req = ControlRequest::new("booking-event-worker", "restart");
        let bytes = serde_json::to_vec(&req).unwrap();
        let mut input = Cursor::new(bytes);
        let back = read_request(&mut input, DEFAULT_MAX_REQUEST_SIZE).await.unwrap();
        assert_eq!(back.service, "booking-event-worker");
        assert_eq!(back.action, "restart");
    }

    #[tokio::test]
    async fn test_write_response_bytes() {
        let mut out = Vec::new();
        write_response(&mut out, &ControlResponse::ok("ok\n")).await.unwrap();
        let parsed: ControlResponse = serde_json::from_slice(&out).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.output.as_deref(), Some("ok\n"));
        assert!(parsed.error.is_none());
    }
}
