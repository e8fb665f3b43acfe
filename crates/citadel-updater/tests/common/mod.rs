//! A chip emulator: the device side of the transport protocol wrapped
//! around a scripted management app, for driving the updater end to end.

use std::{cell::RefCell, ops::Range, rc::Rc};

use sha1::{Digest, Sha1};

use citadel_updater::{
    image::CHIP_FLASH_BANK_SIZE,
    proto::{
        NUGGET_ERROR_LOCKED, NUGGET_ERROR_RETRY, NUGGET_PARAM_CHANGE_UPDATE_PASSWORD,
        NUGGET_PARAM_ENABLE_UPDATE, NUGGET_PARAM_FLASH_BLOCK, NUGGET_PARAM_NUKE_FROM_ORBIT,
        NUGGET_PARAM_REBOOT, NUGGET_PARAM_VERSION,
    },
};
use nos_datagram::{Datagram, MAX_DEVICE_TRANSFER, Result};
use nos_transport::{
    APP_ERROR_BOGUS_ARGS, APP_STATUS_DONE, APP_STATUS_IDLE, APP_SUCCESS,
    command::{CMD_IS_DATA, CMD_MORE_TO_COME, CMD_TRANSPORT},
    crc16::{crc16, crc16_update},
    status::{TransportStatus, TransportVersion},
};

/// What the fake chip records, and the knobs tests can turn.
#[derive(Default)]
pub struct ChipState {
    /* knobs */
    pub version_string: String,
    /// flash offsets whose slot pretends to be active (write-protected)
    pub locked: Vec<Range<u32>>,
    /// answer this many flash writes with `NUGGET_ERROR_RETRY` first
    pub retries_to_demand: u32,
    /// fail calls with this param using this code
    pub fail: Option<(u16, u32)>,

    /* recordings */
    pub calls: Vec<u16>,
    pub attempts: Vec<u32>,
    pub written: Vec<(u32, Vec<u8>)>,
    pub reboots: Vec<u8>,
    pub change_pw_requests: Vec<Vec<u8>>,
    pub enable_requests: Vec<Vec<u8>>,
    pub erases: Vec<u32>,

    /* transport engine */
    status: u32,
    reply: Vec<u8>,
    cursor: usize,
    args: Vec<u8>,
}

impl ChipState {
    fn dispatch(&mut self, param: u16, args: &[u8]) -> (u32, Vec<u8>) {
        if let Some((failing, code)) = self.fail {
            if failing == param {
                return (code, Vec::new());
            }
        }

        match param {
            NUGGET_PARAM_VERSION => (APP_SUCCESS, self.version_string.as_bytes().to_vec()),
            NUGGET_PARAM_FLASH_BLOCK => self.flash_block(args),
            NUGGET_PARAM_REBOOT => {
                self.reboots.push(args[0]);
                (APP_SUCCESS, Vec::new())
            }
            NUGGET_PARAM_CHANGE_UPDATE_PASSWORD => {
                self.change_pw_requests.push(args.to_vec());
                (APP_SUCCESS, Vec::new())
            }
            NUGGET_PARAM_ENABLE_UPDATE => {
                self.enable_requests.push(args.to_vec());
                (APP_SUCCESS, Vec::new())
            }
            NUGGET_PARAM_NUKE_FROM_ORBIT => {
                self.erases
                    .push(u32::from_le_bytes(args.try_into().unwrap()));
                (APP_SUCCESS, Vec::new())
            }
            _ => (APP_ERROR_BOGUS_ARGS, Vec::new()),
        }
    }

    fn flash_block(&mut self, args: &[u8]) -> (u32, Vec<u8>) {
        if args.len() != 8 + CHIP_FLASH_BANK_SIZE {
            return (APP_ERROR_BOGUS_ARGS, Vec::new());
        }
        let digest = u32::from_le_bytes(args[0..4].try_into().unwrap());
        let offset = u32::from_le_bytes(args[4..8].try_into().unwrap());

        /* The block digest must cover offset||payload */
        let mut hasher = Sha1::new();
        hasher.update(&args[4..]);
        let expect = u32::from_le_bytes(hasher.finalize()[..4].try_into().unwrap());
        if digest != expect {
            return (APP_ERROR_BOGUS_ARGS, Vec::new());
        }

        self.attempts.push(offset);
        if self.locked.iter().any(|range| range.contains(&offset)) {
            return (NUGGET_ERROR_LOCKED, Vec::new());
        }
        if self.retries_to_demand > 0 {
            self.retries_to_demand -= 1;
            return (NUGGET_ERROR_RETRY, Vec::new());
        }

        self.written.push((offset, args[8..].to_vec()));
        (APP_SUCCESS, Vec::new())
    }
}

pub struct FakeNugget {
    state: Rc<RefCell<ChipState>>,
}

impl FakeNugget {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(ChipState {
                version_string: "citadel_v1.0".into(),
                ..Default::default()
            })),
        }
    }

    /// A handle the test keeps after the device is moved into the client.
    pub fn handle(&self) -> Rc<RefCell<ChipState>> {
        Rc::clone(&self.state)
    }
}

impl Datagram for FakeNugget {
    fn read(&mut self, command: u32, buf: &mut [u8]) -> Result<()> {
        let mut chip = self.state.borrow_mut();
        assert!(buf.len() <= MAX_DEVICE_TRANSFER);

        if command & CMD_IS_DATA == 0 {
            let status = TransportStatus {
                version: TransportVersion::V1,
                status: chip.status,
                reply_len: chip.reply.len() as u16,
                reply_crc: crc16(&chip.reply),
            };
            let raw = status.to_wire();
            buf.copy_from_slice(&raw[..buf.len()]);
        } else {
            if command & CMD_MORE_TO_COME == 0 {
                chip.cursor = 0;
            }
            let end = chip.cursor + buf.len();
            buf.copy_from_slice(&chip.reply[chip.cursor..end]);
            chip.cursor = end;
        }
        Ok(())
    }

    fn write(&mut self, command: u32, buf: &[u8]) -> Result<()> {
        let mut chip = self.state.borrow_mut();
        assert!(buf.len() <= MAX_DEVICE_TRANSFER);

        if command & CMD_TRANSPORT != 0 {
            if command & CMD_IS_DATA != 0 {
                assert_eq!(
                    (command & 0xffff) as usize,
                    buf.len(),
                    "param must announce the datagram length"
                );
                if command & CMD_MORE_TO_COME == 0 {
                    chip.args.clear();
                }
                chip.args.extend_from_slice(buf);
            } else {
                assert!(buf.is_empty(), "clear-status carries no payload");
                chip.status = APP_STATUS_IDLE;
                chip.reply.clear();
                chip.cursor = 0;
            }
            return Ok(());
        }

        /* The "go" command: check the command info like a real device */
        assert_eq!(buf.len(), 6, "go datagram must carry the command info");
        let hint = u16::from_le_bytes(buf[2..4].try_into().unwrap());
        let theirs = u16::from_le_bytes(buf[4..6].try_into().unwrap());

        let mut crc = crc16(&(chip.args.len() as u16).to_le_bytes());
        crc = crc16_update(&chip.args, crc);
        crc = crc16_update(&hint.to_le_bytes(), crc);
        crc = crc16_update(&command.to_le_bytes(), crc);
        assert_eq!(theirs, crc, "command info CRC must cover the whole request");

        let param = (command & 0xffff) as u16;
        chip.calls.push(param);

        let args = std::mem::take(&mut chip.args);
        let (code, mut reply) = chip.dispatch(param, &args);
        reply.truncate(hint as usize);

        chip.status = APP_STATUS_DONE | code;
        chip.reply = reply;
        chip.cursor = 0;
        Ok(())
    }
}
