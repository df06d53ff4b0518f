//! RPC message framing and first-level dispatch (RFC 5531 sections 9 and 11).
//!
//! On TCP every message is preceded by a record mark: a big-endian word whose
//! high bit flags the last fragment and whose low 31 bits give the fragment
//! length. Incoming records may span several fragments; replies are always a
//! single fragment. On UDP a datagram is exactly one message.

use std::io::Cursor;
use std::net::SocketAddr;

use anyhow::anyhow;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, trace, warn};

use super::{Context, ProcError, ServerRegistry, Transport};
use crate::protocol::xdr::rpc::{accept_stat, call_body, mismatch_info, CALL, RPC_VERSION};
use crate::protocol::xdr::{self, deserialize, Serialize, XdrBuffer};
use crate::server::ServerState;

/// Largest record accepted from a TCP client.
pub const MAX_RPC_RECORD_LENGTH: usize = 1024 * 1024;

/// Reply buffer size; large enough for the biggest READ plus headers.
pub const REPLY_BUFFER_CAPACITY: usize = 128 * 1024;

const LAST_FRAGMENT: u32 = 1 << 31;

/// Replaces everything from the accept status on with `stat`.
fn patch_status(output: &mut XdrBuffer, stat_pos: usize, stat: accept_stat) {
    output.truncate(stat_pos);
    // Writes into an XdrBuffer cannot fail.
    let _ = stat.serialize(output);
}

/// Processes one RPC message and returns the reply bytes.
///
/// Returns `None` when no reply must be sent: the message is too short to
/// carry an XID, or it is not a CALL. Everything else gets a reply, whatever
/// the input: malformed call headers and arguments become `GARBAGE_ARGS`,
/// unknown programs `PROG_UNAVAIL`, unsupported versions `PROG_MISMATCH`,
/// unimplemented procedures `PROC_UNAVAIL`, and a wrong RPC version a
/// `MSG_DENIED / RPC_MISMATCH`. For TCP the reply starts with its record mark.
pub fn handle_rpc(
    registry: &ServerRegistry,
    state: &mut ServerState,
    transport: Transport,
    input: &[u8],
    client_addr: SocketAddr,
) -> Option<Vec<u8>> {
    let mut input = Cursor::new(input);
    let mut output = XdrBuffer::with_capacity(REPLY_BUFFER_CAPACITY);
    if transport == Transport::Tcp {
        let _ = 0_u32.serialize(&mut output);
    }

    let Ok(xid) = deserialize::<u32>(&mut input) else {
        trace!("dropping {} byte message from {}: no xid", input.get_ref().len(), client_addr);
        return None;
    };
    match deserialize::<u32>(&mut input) {
        Ok(CALL) => {}
        Ok(msg_type) => {
            debug!("dropping message type {} (xid {}) from {}", msg_type, xid, client_addr);
            return None;
        }
        Err(_) => {
            warn!("truncated call header (xid {}) from {}", xid, client_addr);
            let stat_pos = xdr::rpc::write_accepted_header(xid, &mut output).ok()?;
            patch_status(&mut output, stat_pos, accept_stat::GARBAGE_ARGS);
            return Some(finish(output, transport));
        }
    }

    let call = match deserialize::<call_body>(&mut input) {
        Ok(call) => call,
        Err(e) => {
            warn!("malformed call header (xid {}) from {}: {}", xid, client_addr, e);
            let stat_pos = xdr::rpc::write_accepted_header(xid, &mut output).ok()?;
            patch_status(&mut output, stat_pos, accept_stat::GARBAGE_ARGS);
            return Some(finish(output, transport));
        }
    };

    if call.rpcvers != RPC_VERSION {
        warn!("Invalid RPC version {} != {}", call.rpcvers, RPC_VERSION);
        let _ = xdr::rpc::rpc_vers_mismatch(xid).serialize(&mut output);
        return Some(finish(output, transport));
    }

    let stat_pos = xdr::rpc::write_accepted_header(xid, &mut output).ok()?;
    let Some(program) = registry.lookup(call.prog) else {
        warn!("Unknown RPC program {} (xid {})", call.prog, xid);
        patch_status(&mut output, stat_pos, accept_stat::PROG_UNAVAIL);
        return Some(finish(output, transport));
    };
    let versions = program.versions();
    if !versions.contains(&call.vers) {
        warn!(
            "Unsupported {} version {} (supported {:?}, xid {})",
            program.name(),
            call.vers,
            versions,
            xid
        );
        patch_status(&mut output, stat_pos, accept_stat::PROG_MISMATCH);
        let range = mismatch_info { low: *versions.start(), high: *versions.end() };
        let _ = range.serialize(&mut output);
        return Some(finish(output, transport));
    }

    let mut context = Context {
        xid,
        vers: call.vers,
        transport,
        client_addr,
        auth: call.cred.unix_credentials(),
        state,
    };
    match program.call(call.proc, &mut input, &mut output, &mut context) {
        Ok(()) => {}
        Err(ProcError::NotImplemented) => {
            debug!("{} v{} procedure {} not implemented", program.name(), call.vers, call.proc);
            patch_status(&mut output, stat_pos, accept_stat::PROC_UNAVAIL);
        }
        Err(ProcError::GarbageArgs(e)) => {
            warn!("{} procedure {} (xid {}): bad arguments: {}", program.name(), call.proc, xid, e);
            patch_status(&mut output, stat_pos, accept_stat::GARBAGE_ARGS);
        }
    }
    if output.is_truncated() {
        error!("reply to xid {} exceeds {} bytes", xid, output.capacity());
        patch_status(&mut output, stat_pos, accept_stat::SYSTEM_ERR);
    }
    Some(finish(output, transport))
}

/// Back-patches the record mark for TCP replies.
fn finish(mut output: XdrBuffer, transport: Transport) -> Vec<u8> {
    if transport == Transport::Tcp {
        let length = (output.len() - 4) as u32;
        let end = output.position();
        output.set_position(0);
        let _ = (LAST_FRAGMENT | length).serialize(&mut output);
        output.set_position(end);
    }
    output.into_inner()
}

/// Reads one record-marked fragment and appends it to `append_to`.
///
/// Returns true if it was the last fragment of the record.
async fn read_fragment<R: AsyncRead + Unpin>(
    socket: &mut R,
    append_to: &mut Vec<u8>,
) -> Result<bool, anyhow::Error> {
    let mut header_buf = [0_u8; 4];
    socket.read_exact(&mut header_buf).await?;
    let fragment_header = u32::from_be_bytes(header_buf);
    let is_last = fragment_header & LAST_FRAGMENT != 0;
    let length = (fragment_header & !LAST_FRAGMENT) as usize;
    trace!("Reading fragment length:{}, last:{}", length, is_last);
    if append_to.len().saturating_add(length) > MAX_RPC_RECORD_LENGTH {
        return Err(anyhow!("RPC record length {} exceeds max {}", length, MAX_RPC_RECORD_LENGTH));
    }
    let start_offset = append_to.len();
    append_to.resize(start_offset + length, 0);
    socket.read_exact(&mut append_to[start_offset..]).await?;
    Ok(is_last)
}

/// Reads a complete record, reassembling its fragments.
pub async fn read_record<R: AsyncRead + Unpin>(socket: &mut R) -> Result<Vec<u8>, anyhow::Error> {
    let mut record = Vec::new();
    while !read_fragment(socket, &mut record).await? {}
    Ok(record)
}

/// Writes `buf` as a single last fragment.
///
/// Replies from [`handle_rpc`] already carry their mark and are written as
/// they are; this is for callers holding a bare message.
pub async fn write_fragment<W: AsyncWrite + Unpin>(
    socket: &mut W,
    buf: &[u8],
) -> Result<(), anyhow::Error> {
    if buf.len() > (!LAST_FRAGMENT) as usize {
        return Err(anyhow!("RPC message of {} bytes does not fit one fragment", buf.len()));
    }
    let fragment_header = LAST_FRAGMENT | buf.len() as u32;
    socket.write_all(&fragment_header.to_be_bytes()).await?;
    trace!("Writing fragment length:{}", buf.len());
    socket.write_all(buf).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reassembles_fragments() {
        let mut stream: &[u8] = &[0, 0, 0, 2, 1, 2, 0x80, 0, 0, 3, 3, 4, 5];
        let record = read_record(&mut stream).await.expect("record");
        assert_eq!(record, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn rejects_oversized_records() {
        let header = (LAST_FRAGMENT | (MAX_RPC_RECORD_LENGTH as u32 + 1)).to_be_bytes();
        let mut stream: &[u8] = &header;
        assert!(read_record(&mut stream).await.is_err());
    }

    #[tokio::test]
    async fn writes_single_fragment() {
        let mut out = Vec::new();
        write_fragment(&mut out, &[9, 9, 9]).await.expect("write");
        assert_eq!(out, vec![0x80, 0, 0, 3, 9, 9, 9]);
    }
}
