// Stream framing and handshake
//
// The debug bridge hands us an ordered byte stream already addressed to
// `jdwp:<pid>` (usually `adb forward tcp:<port> jdwp:<pid>`). Everything
// after the 14-byte handshake belongs to exactly one JDWP packet.

use crate::protocol::{JdwpError, JdwpResult, HEADER_SIZE, JDWP_HANDSHAKE};
use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

/// Default cap on a single JDWP packet (10MB).
/// This prevents memory exhaustion from malicious or buggy VMs.
pub const DEFAULT_MAX_PACKET_SIZE: usize = 10 * 1024 * 1024;

/// Recovers whole JDWP packets from arbitrarily chunked reads.
///
/// Bytes are appended as they arrive; `next_packet` drains one complete
/// packet at a time. Whatever remains is always a strict prefix of the next
/// packet.
#[derive(Debug)]
pub struct FrameDecoder {
    pending: BytesMut,
    max_packet_size: usize,
}

impl FrameDecoder {
    pub fn new(max_packet_size: usize) -> Self {
        Self {
            pending: BytesMut::new(),
            max_packet_size,
        }
    }

    /// Seed or append raw stream bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Pop the next complete packet, header included.
    ///
    /// Returns `Ok(None)` when the buffer holds less than a whole packet. A
    /// length field below the header size (or above the cap) means the
    /// stream is desynchronized and the connection must be torn down.
    pub fn next_packet(&mut self) -> JdwpResult<Option<Bytes>> {
        if self.pending.len() < HEADER_SIZE {
            return Ok(None);
        }

        let length = u32::from_be_bytes([
            self.pending[0],
            self.pending[1],
            self.pending[2],
            self.pending[3],
        ]) as usize;

        if length < HEADER_SIZE {
            return Err(JdwpError::malformed(format!(
                "packet length {length} below header size"
            )));
        }
        if length > self.max_packet_size {
            return Err(JdwpError::malformed(format!(
                "packet length {} exceeds cap of {} bytes",
                length, self.max_packet_size
            )));
        }

        if self.pending.len() < length {
            return Ok(None);
        }

        Ok(Some(self.pending.split_to(length).freeze()))
    }

    /// Bytes buffered towards the next packet.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Perform the opening ASCII handshake on a fresh stream.
///
/// Writes the 14 handshake bytes, then reads until 14 bytes have arrived and
/// verifies them. Any bytes received past the 14th belong to the first JDWP
/// packet and are returned so the caller can seed the frame decoder with
/// them; dropping them would desynchronize the stream.
pub async fn handshake<S>(stream: &mut S) -> JdwpResult<Vec<u8>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    debug!("performing JDWP handshake");

    stream.write_all(JDWP_HANDSHAKE).await?;
    stream.flush().await?;

    let mut buf = BytesMut::with_capacity(64);
    while buf.len() < JDWP_HANDSHAKE.len() {
        let n = stream.read_buf(&mut buf).await?;
        if n == 0 {
            warn!("stream closed during handshake");
            return Err(JdwpError::Handshake);
        }
    }

    if &buf[..JDWP_HANDSHAKE.len()] != JDWP_HANDSHAKE {
        warn!("invalid handshake response: {:?}", &buf[..]);
        return Err(JdwpError::Handshake);
    }

    buf.advance(JDWP_HANDSHAKE.len());
    debug!(leftover = buf.len(), "JDWP handshake successful");
    Ok(buf.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(id: u32, payload: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&((HEADER_SIZE + payload.len()) as u32).to_be_bytes());
        bytes.extend_from_slice(&id.to_be_bytes());
        bytes.push(0x80);
        bytes.extend_from_slice(&[0, 0]);
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn test_split_packet_delivered_once_complete() {
        let mut decoder = FrameDecoder::new(DEFAULT_MAX_PACKET_SIZE);
        let bytes = packet(1, &[0xAB; 34]); // 45 bytes total

        // First read: 10 bytes (not even a full header)
        decoder.extend(&bytes[..10]);
        assert!(decoder.next_packet().unwrap().is_none());

        // Second read: the remaining 35 bytes
        decoder.extend(&bytes[10..]);
        let delivered = decoder.next_packet().unwrap().unwrap();
        assert_eq!(&delivered[..], &bytes[..]);
        assert_eq!(decoder.pending_len(), 0);
        assert!(decoder.next_packet().unwrap().is_none());
    }

    #[test]
    fn test_tail_plus_head_in_one_read() {
        let mut decoder = FrameDecoder::new(DEFAULT_MAX_PACKET_SIZE);
        let first = packet(1, b"abc");
        let second = packet(2, b"defgh");

        // One read carries the tail of packet 1 and the head of packet 2.
        decoder.extend(&first[..6]);
        assert!(decoder.next_packet().unwrap().is_none());

        let mut rest = first[6..].to_vec();
        rest.extend_from_slice(&second[..4]);
        decoder.extend(&rest);

        assert_eq!(&decoder.next_packet().unwrap().unwrap()[..], &first[..]);
        assert!(decoder.next_packet().unwrap().is_none());
        // the head of packet 2 is still buffered, byte for byte
        assert_eq!(decoder.pending_len(), 4);

        decoder.extend(&second[4..]);
        assert_eq!(&decoder.next_packet().unwrap().unwrap()[..], &second[..]);
    }

    #[test]
    fn test_two_packets_in_one_read() {
        let mut decoder = FrameDecoder::new(DEFAULT_MAX_PACKET_SIZE);
        let first = packet(1, b"x");
        let second = packet(2, b"y");
        let mut both = first.clone();
        both.extend_from_slice(&second);

        decoder.extend(&both);
        assert_eq!(&decoder.next_packet().unwrap().unwrap()[..], &first[..]);
        assert_eq!(&decoder.next_packet().unwrap().unwrap()[..], &second[..]);
        assert!(decoder.next_packet().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_length_is_fatal() {
        let mut decoder = FrameDecoder::new(DEFAULT_MAX_PACKET_SIZE);
        // length = 5 < 11
        decoder.extend(&[0, 0, 0, 5, 0, 0, 0, 1, 0, 0, 0]);
        assert!(matches!(
            decoder.next_packet(),
            Err(JdwpError::MalformedPacket(_))
        ));
    }

    #[test]
    fn test_oversized_length_is_fatal() {
        let mut decoder = FrameDecoder::new(64);
        decoder.extend(&[0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 0]); // length = 256 > cap 64
        assert!(matches!(
            decoder.next_packet(),
            Err(JdwpError::MalformedPacket(_))
        ));
    }

    #[tokio::test]
    async fn test_handshake_pushes_back_extra_bytes() {
        let (mut client, mut server) = tokio::io::duplex(256);

        let trailing = packet(9, b"early");
        let server_task = tokio::spawn(async move {
            let mut buf = [0u8; 14];
            server.read_exact(&mut buf).await.unwrap();
            assert_eq!(&buf, JDWP_HANDSHAKE);
            // reply and the first packet arrive in the same chunk
            let mut reply = JDWP_HANDSHAKE.to_vec();
            reply.extend_from_slice(&trailing);
            server.write_all(&reply).await.unwrap();
            trailing
        });

        let leftover = handshake(&mut client).await.unwrap();
        let trailing = server_task.await.unwrap();
        assert_eq!(leftover, trailing);
    }

    #[tokio::test]
    async fn test_handshake_mismatch() {
        let (mut client, mut server) = tokio::io::duplex(256);

        tokio::spawn(async move {
            let mut buf = [0u8; 14];
            server.read_exact(&mut buf).await.unwrap();
            server.write_all(b"HTTP/1.1 200 O").await.unwrap();
        });

        assert!(matches!(
            handshake(&mut client).await,
            Err(JdwpError::Handshake)
        ));
    }

    #[tokio::test]
    async fn test_handshake_short_read() {
        let (mut client, mut server) = tokio::io::duplex(256);

        tokio::spawn(async move {
            let mut buf = [0u8; 14];
            server.read_exact(&mut buf).await.unwrap();
            server.write_all(b"JDWP").await.unwrap();
            // server drops: EOF before 14 bytes
        });

        assert!(matches!(
            handshake(&mut client).await,
            Err(JdwpError::Handshake)
        ));
    }
}
