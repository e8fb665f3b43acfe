//! Host side of the chip's request/response transport.
//!
//! Application calls are multiplexed over a fixed-MTU datagram bus. One
//! call is a half-duplex conversation: make sure the app is idle, stream
//! the request in MTU-sized data datagrams, issue the "go" command, poll
//! the status record until the app reports done, then stream the reply
//! back and clear the status for the next caller. Checksums cover both
//! directions; transient mismatches are retried a bounded number of times.

use bincode::Encode;
use log::{debug, error, trace};

use nos_datagram::{Datagram, DatagramExt, MAX_DEVICE_TRANSFER};

use crate::{
    command::{CMD_IS_DATA, CMD_IS_READ, CMD_MORE_TO_COME, CMD_TRANSPORT, cmd_id, cmd_param,
              cmd_set_param},
    crc16::{crc16, crc16_update},
    err::Error,
    status::{STATUS_WIRE_SIZE, StatusError, TransportStatus},
};

pub mod command;
pub mod crc16;
pub mod err;
pub mod status;


type Result<T> = core::result::Result<T, Error>;

/* Well-known app ids */
pub const APP_ID_NUGGET: u8 = 0x00;

/* Status codes common to all applications */
pub const APP_SUCCESS: u32 = 0;
pub const APP_ERROR_BOGUS_ARGS: u32 = 1;
pub const APP_ERROR_INTERNAL: u32 = 2;
pub const APP_ERROR_TOO_MUCH: u32 = 3;
pub const APP_ERROR_IO: u32 = 4;
pub const APP_ERROR_RPC: u32 = 5;
pub const APP_ERROR_CHECKSUM: u32 = 6;
pub const APP_ERROR_BUSY: u32 = 7;
pub const APP_ERROR_TIMEOUT: u32 = 8;

/// Apps define their own codes upwards from here
pub const APP_SPECIFIC_ERROR: u32 = 0x20;
/// Codes above this encode a chip-side line number
pub const APP_LINE_NUMBER_BASE: u32 = 0x7000_0000;

/// The app sets this bit when the reply is valid; everything below it is
/// the result code.
pub const APP_STATUS_DONE: u32 = 0x8000_0000;
pub const APP_STATUS_IDLE: u32 = 0x0000_0000;

pub const fn app_status_code(status: u32) -> u32 {
    status & 0x7fff_ffff
}

/// In case of CRC error, try to retransmit
pub const CRC_RETRY_COUNT: u32 = 3;

/// Encoding for everything that crosses the wire: packed little-endian,
/// fixed-width integers.
pub fn wire_config() -> impl bincode::config::Config {
    bincode::config::standard()
        .with_little_endian()
        .with_fixed_int_encoding()
}

/// Trailer of the "go" datagram. Legacy devices ignore it; current ones
/// use the CRC to validate everything they were just sent.
#[derive(Encode)]
struct CommandInfo {
    version: u8,
    reserved: u8,
    reply_len_hint: u16,
    crc: u16,
}

struct Call<'a> {
    dev: &'a mut dyn Datagram,
    app_id: u8,
    params: u16,
    args: &'a [u8],
    reply_len_hint: u16,
}

impl Call<'_> {
    /// Get the status regardless of framing, re-reading on bit errors.
    fn get_status(&mut self) -> Result<TransportStatus> {
        let mut mismatch = StatusError::Crc { theirs: 0, ours: 0 };
        for _ in 0..CRC_RETRY_COUNT {
            let mut raw = [0u8; STATUS_WIRE_SIZE];
            let command = cmd_id(self.app_id) | CMD_IS_READ | CMD_TRANSPORT;
            self.dev.read_retry(command, &mut raw).map_err(|e| {
                error!("Failed to read device status");
                e
            })?;

            match TransportStatus::parse(&raw) {
                Ok(status) => return Ok(status),
                Err(e @ StatusError::Version(_)) => {
                    error!("{e}");
                    return Err(e.into());
                }
                Err(e @ StatusError::Crc { .. }) => {
                    error!("{e}");
                    mismatch = e;
                }
            }
        }

        error!("Unable to get valid checksum on status");
        Err(mismatch.into())
    }

    fn clear_status(&mut self) -> Result<()> {
        let command = cmd_id(self.app_id) | CMD_TRANSPORT;
        self.dev.write_retry(command, &[]).map_err(|e| {
            error!("Failed to clear device status");
            Error::from(e)
        })
    }

    /// Ensure the app is idle and ready for a fresh transaction, clearing
    /// stale state if it isn't.
    fn make_ready(&mut self) -> Result<()> {
        match self.get_status() {
            Ok(status) => {
                debug!(
                    "Inspection status=0x{:08x} reply_len={} protocol={:?}",
                    status.status, status.reply_len, status.version
                );
                if status.status == APP_STATUS_IDLE {
                    return Ok(());
                }
                /* Stale state; fall through and clear it */
            }
            Err(e @ Error::Datagram(_)) => {
                error!("Failed to inspect device");
                return Err(e);
            }
            /* Protocol confusion may just be garbage; a clear can fix it */
            Err(_) => {}
        }

        debug!("Clearing previous status");
        self.clear_status()?;

        let status = self.get_status().map_err(|e| {
            error!("Failed to get cleared status");
            e
        })?;
        debug!(
            "Cleared status=0x{:08x} reply_len={}",
            status.status, status.reply_len
        );

        /* It's ignoring us and is still not ready, so it's broken */
        if status.status != APP_STATUS_IDLE {
            error!("Device is not responding");
            return Err(Error::NotIdle);
        }

        Ok(())
    }

    /// Stream the request as data datagrams, then issue the "go" command.
    fn send_command(&mut self) -> Result<()> {
        trace!("Send command data ({} bytes)", self.args.len());

        let mut command = cmd_id(self.app_id) | CMD_IS_DATA | CMD_TRANSPORT;
        let mut remaining = self.args;
        loop {
            /* The param field tells the device how many bytes this datagram
             * carries. Legacy devices expect at least one data datagram,
             * so an empty request still sends an empty one. */
            let ulen = remaining.len().min(MAX_DEVICE_TRANSFER);
            let (chunk, rest) = remaining.split_at(ulen);
            command = cmd_set_param(command, ulen as u16);

            debug!("Write command 0x{command:08x}, bytes {ulen}");
            self.dev.write_retry(command, chunk).map_err(|e| {
                error!("Failed to send datagram to device");
                Error::from(e)
            })?;

            command |= CMD_MORE_TO_COME;
            remaining = rest;
            if remaining.is_empty() {
                break;
            }
        }

        let command = cmd_id(self.app_id) | cmd_param(self.params);

        /* The outgoing CRC covers the 16-bit request length, the request
         * itself, the 16-bit reply length hint and the 32-bit "go" word. */
        let arg_len = self.args.len() as u16;
        let mut crc = crc16(&arg_len.to_le_bytes());
        crc = crc16_update(self.args, crc);
        crc = crc16_update(&self.reply_len_hint.to_le_bytes(), crc);
        crc = crc16_update(&command.to_le_bytes(), crc);

        let command_info = CommandInfo {
            version: status::TRANSPORT_V1 as u8,
            reserved: 0,
            reply_len_hint: self.reply_len_hint,
            crc,
        };
        let payload = bincode::encode_to_vec(&command_info, wire_config())?;

        debug!("Write command 0x{command:08x}, crc {crc:04x}...");
        self.dev.write_retry(command, &payload).map_err(|e| {
            error!("Failed to send command datagram to device");
            Error::from(e)
        })
    }

    /// Keep polling until the app says it is done.
    fn poll_until_done(&mut self) -> Result<TransportStatus> {
        let mut poll_count = 0u32;
        trace!("Poll the app status until it's done");
        loop {
            let status = self.get_status()?;
            poll_count += 1;
            debug!(
                "poll={poll_count} status=0x{:08x} reply_len={}",
                status.status, status.reply_len
            );
            if status.status & APP_STATUS_DONE != 0 {
                trace!(
                    "status=0x{:08x} reply_len={}...",
                    status.status, status.reply_len
                );
                return Ok(status);
            }
        }
    }

    /// Reconstruct the reply from the datagram stream, re-reading the whole
    /// reply on a CRC mismatch. Legacy devices don't send a reply CRC, so
    /// their replies are taken as-is.
    fn receive_reply(&mut self, status: &TransportStatus, reply: &mut [u8]) -> Result<usize> {
        for _ in 0..CRC_RETRY_COUNT {
            trace!("Read the reply data ({} bytes)", status.reply_len);

            let mut command = cmd_id(self.app_id) | CMD_IS_READ | CMD_IS_DATA | CMD_TRANSPORT;
            let total = reply.len().min(status.reply_len as usize);
            let mut got = 0;
            let mut crc = 0u16;
            while got < total {
                let gimme = (total - got).min(MAX_DEVICE_TRANSFER);
                let chunk = &mut reply[got..got + gimme];

                debug!("Read command=0x{command:08x}, bytes={gimme}");
                self.dev.read_retry(command, chunk).map_err(|e| {
                    error!("Failed to receive datagram from device");
                    Error::from(e)
                })?;

                /* Further reads of the same reply set the MORE bit; its
                 * absence is what tells the device to start over. */
                command |= CMD_MORE_TO_COME;
                crc = crc16_update(chunk, crc);
                got += gimme;
            }

            if status.version.is_legacy() {
                return Ok(got);
            }
            if crc == status.reply_crc {
                return Ok(got);
            }
            error!(
                "Reply CRC mismatch: theirs={:04x} ours={:04x}",
                status.reply_crc, crc
            );
        }

        error!("Unable to get valid checksum on reply data");
        Err(Error::ReplyCrc)
    }
}

/// Drive one full application call and return the app's status code along
/// with the number of reply bytes written into `reply`.
///
/// The reply buffer's length doubles as the reply-length hint offered to
/// the device; pass an empty slice when no reply is expected. Device and
/// protocol failures come back as [`APP_ERROR_IO`]; everything the app
/// itself reports crosses unchanged.
pub fn call_application(
    dev: &mut dyn Datagram,
    app_id: u8,
    params: u16,
    args: &[u8],
    reply: &mut [u8],
) -> (u32, usize) {
    if args.len() > u32::MAX as usize {
        return (APP_ERROR_TOO_MUCH, 0);
    }

    trace!("Calling app {app_id} with params 0x{params:04x}");

    let mut call = Call {
        dev,
        app_id,
        params,
        args,
        reply_len_hint: reply.len().min(u16::MAX as usize) as u16,
    };

    let mut retries = CRC_RETRY_COUNT;
    let status = loop {
        /* Wake the chip up and wait for it to be ready */
        if let Err(e) = call.make_ready() {
            error!("{e}");
            return (APP_ERROR_IO, 0);
        }

        /* Tell the app what to do */
        if let Err(e) = call.send_command() {
            error!("{e}");
            return (APP_ERROR_IO, 0);
        }

        /* Wait until the app has finished */
        let status = match call.poll_until_done() {
            Ok(status) => status,
            Err(e) => {
                error!("{e}");
                return (APP_ERROR_IO, 0);
            }
        };

        let code = app_status_code(status.status);
        if code == APP_SUCCESS {
            break status;
        }
        if code != APP_ERROR_CHECKSUM {
            /* The app rejected the call; leave it idle for the next one */
            let _ = call.clear_status();
            return (code, 0);
        }

        retries -= 1;
        debug!("Request checksum error: {retries}");
        if retries == 0 {
            return (APP_ERROR_IO, 0);
        }
    };

    /* Get the reply, but only if the app produced data and the caller
     * wants it */
    let mut got = 0;
    if !reply.is_empty() && status.reply_len != 0 {
        match call.receive_reply(&status, reply) {
            Ok(n) => got = n,
            Err(e) => {
                error!("{e}");
                let _ = call.clear_status();
                return (APP_ERROR_IO, 0);
            }
        }
    }

    trace!("Clear the reply manually for the next caller");
    /* Best effort; the next call's make-ready recovers if this fails */
    let _ = call.clear_status();

    (app_status_code(status.status), got)
}
