//! Opening the device a command operates on

use mtx_core::{Settings, Storage, StorageId};
use mtx_mirror::MirrorDevice;

use super::{Context, report};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// An opened device plus the storage selected for this invocation
#[derive(Debug)]
pub struct Session<'a> {
    device: MirrorDevice,
    settings: &'a Settings,
    storage: StorageId,
}

impl<'a> Session<'a> {
    /// Open the device named by `--device`, `MTX_DEVICE` or the config file
    ///
    /// Errors are printed through `formatter`; the returned exit code is
    /// ready to hand back to the caller.
    pub fn open(ctx: &'a Context, formatter: &Formatter) -> Result<Self, ExitCode> {
        let Some(root) = &ctx.device else {
            formatter.error("No device given. Pass --device <DIR>, set MTX_DEVICE, or set [device] root in the config file.");
            return Err(ExitCode::UsageError);
        };

        let device = MirrorDevice::open(root)
            .map_err(|e| report(formatter, "Failed to open device", &e))?;

        let storage = match &ctx.storage {
            Some(raw) => parse_storage_id(raw).map_err(|e| {
                formatter.error(&e);
                ExitCode::UsageError
            })?,
            None => device.default_storage(),
        };

        tracing::debug!(root = %root.display(), %storage, "session opened");
        Ok(Self {
            device,
            settings: &ctx.settings,
            storage,
        })
    }

    /// Engine view of the selected storage
    pub fn storage(&self) -> Storage<'_, MirrorDevice> {
        Storage::new(&self.device, self.settings, self.storage)
    }
}

/// Parse a storage id given in decimal or `0x`-prefixed hex
pub fn parse_storage_id(raw: &str) -> Result<StorageId, String> {
    let trimmed = raw.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => trimmed.parse::<u32>(),
    };
    parsed
        .map(StorageId)
        .map_err(|_| format!("Invalid storage id: '{raw}'"))
}
