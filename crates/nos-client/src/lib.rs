//! Client session over the chip transport.
//!
//! A [`NuggetClient`] owns one bus handle for its lifetime and serialises
//! application calls over it. [`AppClient`] narrows a session to a single
//! app id, which is how the callers above this crate use it.

use std::path::PathBuf;

use derive_ctor::ctor;
use log::debug;

use nos_datagram::{CharDevice, Datagram};
use nos_transport::{
    APP_ERROR_BOGUS_ARGS, APP_ERROR_BUSY, APP_ERROR_CHECKSUM, APP_ERROR_INTERNAL, APP_ERROR_IO,
    APP_ERROR_RPC, APP_ERROR_TIMEOUT, APP_ERROR_TOO_MUCH, APP_LINE_NUMBER_BASE,
    APP_SPECIFIC_ERROR, APP_SUCCESS, call_application,
};

pub mod err;

pub type Result<T> = core::result::Result<T, err::Error>;

pub struct NuggetClient {
    path: Option<PathBuf>,
    device: Option<Box<dyn Datagram>>,
}

impl NuggetClient {
    /// A client that will connect straight to the kernel driver, at `path`
    /// or the default device node.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path, device: None }
    }

    /// A client over an already-open bus handle: a proxy connection or a
    /// test double. Device paths don't apply to these.
    pub fn from_device(device: Box<dyn Datagram>) -> Self {
        Self {
            path: None,
            device: Some(device),
        }
    }

    /// Acquire the bus handle. Opening an open client is a no-op.
    pub fn open(&mut self) -> Result<()> {
        if self.device.is_none() {
            let device = CharDevice::open(self.path.as_deref())?;
            debug!("Connected to {}", device.path().display());
            self.device = Some(Box::new(device));
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    /// Call an app, offering `reply_cap` bytes for its reply. Returns the
    /// app's status code and whatever reply arrived; calling a closed
    /// client is an I/O error.
    pub fn call_app(
        &mut self,
        app_id: u8,
        param: u16,
        request: &[u8],
        reply_cap: usize,
    ) -> (u32, Vec<u8>) {
        if request.len() > u32::MAX as usize {
            return (APP_ERROR_TOO_MUCH, Vec::new());
        }
        let Some(device) = self.device.as_mut() else {
            return (APP_ERROR_IO, Vec::new());
        };

        let mut reply = vec![0u8; reply_cap];
        let (code, got) = call_application(device.as_mut(), app_id, param, request, &mut reply);
        reply.truncate(got);
        (code, reply)
    }
}

/// A session narrowed to one app id.
#[derive(ctor)]
pub struct AppClient<'a> {
    client: &'a mut NuggetClient,
    app_id: u8,
}

impl AppClient<'_> {
    pub fn call(&mut self, param: u16, request: &[u8], reply_cap: usize) -> (u32, Vec<u8>) {
        self.client.call_app(self.app_id, param, request, reply_cap)
    }
}

/// Human-readable rendering of an app status code.
pub fn status_code_string(code: u32) -> String {
    match code {
        APP_SUCCESS => "APP_SUCCESS".into(),
        APP_ERROR_BOGUS_ARGS => "APP_ERROR_BOGUS_ARGS".into(),
        APP_ERROR_INTERNAL => "APP_ERROR_INTERNAL".into(),
        APP_ERROR_TOO_MUCH => "APP_ERROR_TOO_MUCH".into(),
        APP_ERROR_IO => "APP_ERROR_IO".into(),
        APP_ERROR_RPC => "APP_ERROR_RPC".into(),
        APP_ERROR_CHECKSUM => "APP_ERROR_CHECKSUM".into(),
        APP_ERROR_BUSY => "APP_ERROR_BUSY".into(),
        APP_ERROR_TIMEOUT => "APP_ERROR_TIMEOUT".into(),
        _ if code >= APP_LINE_NUMBER_BASE => {
            format!("APP_LINE_NUMBER {}", code - APP_LINE_NUMBER_BASE)
        }
        _ if code >= APP_SPECIFIC_ERROR => {
            format!("APP_SPECIFIC_ERROR {}", code - APP_SPECIFIC_ERROR)
        }
        _ => "unknown".into(),
    }
}
