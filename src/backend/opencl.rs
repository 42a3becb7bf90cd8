//! OpenCL device backend
//!
//! Both kernels are built from embedded source when the backend opens. The
//! input buffers are rebuilt on every [`Backend::prepare`]; the record buffer
//! is reused and only grows.

use ocl::enums::{DeviceInfo, DeviceInfoResult};
use ocl::flags::{self, DeviceType};
use ocl::{Buffer, Context, Device, Kernel, Platform, Program, Queue};
use tracing::debug;

use super::cl_kernels::NONCE_KERNELS;
use super::{Backend, BackendInfo, BackendSource, Capabilities, DeviceClass};
use crate::algorithm::{
    hit_from_index, hits_from_records, BatchResults, KernelParams, KernelVariant, Midstate,
    BLOCK_SIZE, LANE_RECORD_SIZE, NO_HIT,
};
use crate::error::BackendError;

fn platforms() -> Result<Vec<Platform>, BackendError> {
    let ids = ocl::core::get_platform_ids().map_err(ocl::Error::from)?;
    Ok(ids.into_iter().map(Platform::new).collect())
}

fn info_number(device: &Device, kind: DeviceInfo) -> Option<u64> {
    match device.info(kind).ok()? {
        DeviceInfoResult::MaxComputeUnits(n) => Some(n as u64),
        DeviceInfoResult::MaxWorkGroupSize(n) => Some(n as u64),
        DeviceInfoResult::GlobalMemSize(n) => Some(n),
        _ => None,
    }
}

fn device_class(device: &Device) -> DeviceClass {
    match device.info(DeviceInfo::Type) {
        Ok(DeviceInfoResult::Type(t)) if t.contains(DeviceType::GPU) => DeviceClass::Gpu,
        Ok(DeviceInfoResult::Type(t)) if t.contains(DeviceType::CPU) => DeviceClass::Cpu,
        _ => DeviceClass::Other,
    }
}

fn describe(platform: &Platform, device: &Device, source: BackendSource) -> BackendInfo {
    BackendInfo {
        name: device.name().unwrap_or_default(),
        vendor: device.vendor().unwrap_or_default(),
        version: device
            .info(DeviceInfo::Version)
            .map(|v| v.to_string())
            .unwrap_or_default(),
        platform: platform.name().ok(),
        caps: Capabilities {
            class: device_class(device),
            compute_units: info_number(device, DeviceInfo::MaxComputeUnits).unwrap_or(1) as u32,
            group_size: info_number(device, DeviceInfo::MaxWorkGroupSize).map(|n| n as usize),
            global_mem: info_number(device, DeviceInfo::GlobalMemSize),
        },
        source,
    }
}

/// Every device on every platform, in platform order.
pub fn enumerate() -> Result<Vec<BackendInfo>, BackendError> {
    let mut all = Vec::new();
    for (p, platform) in platforms()?.iter().enumerate() {
        let devices = match Device::list_all(platform) {
            Ok(devices) => devices,
            Err(e) => {
                debug!("Failed to get devices from platform {}: {}", p, e);
                continue;
            }
        };
        for (d, device) in devices.iter().enumerate() {
            all.push(describe(
                platform,
                device,
                BackendSource::OpenCl {
                    platform: p,
                    device: d,
                },
            ));
        }
    }
    Ok(all)
}

enum ClJob {
    Generic {
        input: Buffer<u8>,
        len: i32,
        nonce_offset: i32,
        digit_width: i32,
        difficulty: i32,
    },
    Midstate {
        tail: Buffer<u8>,
        tail_len: i32,
        prefix_len: i32,
        midstate: Buffer<u32>,
        nonce_offset: i32,
        digit_width: i32,
        difficulty: i32,
    },
}

/// A single OpenCL device with both kernels built
pub struct OpenClBackend {
    info: BackendInfo,
    _context: Context,
    queue: Queue,
    program: Program,
    job: Option<ClJob>,
    records: Option<Buffer<u8>>,
    found: Buffer<u32>,
}

impl OpenClBackend {
    pub fn new(info: BackendInfo) -> Result<Self, BackendError> {
        let BackendSource::OpenCl { platform, device } = info.source else {
            return Err(BackendError::NoBackend);
        };
        let platform = platforms()?
            .get(platform)
            .cloned()
            .ok_or(BackendError::NoBackend)?;
        let device = Device::list_all(platform)?
            .get(device)
            .cloned()
            .ok_or(BackendError::NoBackend)?;

        let context = Context::builder()
            .platform(platform)
            .devices(device)
            .build()?;
        let queue = Queue::new(&context, device, None)?;
        let program = Program::builder()
            .src(NONCE_KERNELS)
            .devices(device)
            .build(&context)?;
        let found = Buffer::<u32>::builder()
            .queue(queue.clone())
            .len(1)
            .build()?;

        debug!("Built nonce kernels for {}", info.name);
        Ok(Self {
            info,
            _context: context,
            queue,
            program,
            job: None,
            records: None,
            found,
        })
    }

    fn upload(&self, bytes: &[u8]) -> Result<Buffer<u8>, BackendError> {
        Ok(Buffer::<u8>::builder()
            .queue(self.queue.clone())
            .flags(flags::MEM_READ_ONLY)
            .len(bytes.len())
            .copy_host_slice(bytes)
            .build()?)
    }

    fn ensure_records(&mut self, lanes: usize) -> Result<(), BackendError> {
        let needed = lanes * LANE_RECORD_SIZE;
        if self.records.as_ref().map_or(true, |b| b.len() < needed) {
            debug!(lanes, "allocating result buffer");
            self.records = Some(
                Buffer::<u8>::builder()
                    .queue(self.queue.clone())
                    .flags(flags::MEM_WRITE_ONLY)
                    .len(needed)
                    .build()?,
            );
        }
        Ok(())
    }
}

fn split_nonce(base_nonce: u64) -> (u32, u32) {
    (base_nonce as u32, (base_nonce >> 32) as u32)
}

impl Backend for OpenClBackend {
    fn info(&self) -> &BackendInfo {
        &self.info
    }

    fn prepare(
        &mut self,
        variant: KernelVariant,
        params: KernelParams<'_>,
    ) -> Result<(), BackendError> {
        let job = match variant {
            KernelVariant::Generic => ClJob::Generic {
                input: self.upload(params.message)?,
                len: params.message.len() as i32,
                nonce_offset: params.nonce_offset as i32,
                digit_width: params.digit_width as i32,
                difficulty: params.difficulty as i32,
            },
            KernelVariant::Midstate => {
                let prefix_len =
                    (params.nonce_offset.min(params.message.len()) / BLOCK_SIZE) * BLOCK_SIZE;
                let midstate = Midstate::absorb(&params.message[..prefix_len]);
                let tail = &params.message[prefix_len..];
                ClJob::Midstate {
                    tail: self.upload(tail)?,
                    tail_len: tail.len() as i32,
                    prefix_len: prefix_len as i32,
                    midstate: Buffer::<u32>::builder()
                        .queue(self.queue.clone())
                        .flags(flags::MEM_READ_ONLY)
                        .len(midstate.words().len())
                        .copy_host_slice(midstate.words())
                        .build()?,
                    nonce_offset: (params.nonce_offset - prefix_len) as i32,
                    digit_width: params.digit_width as i32,
                    difficulty: params.difficulty as i32,
                }
            }
        };
        self.job = Some(job);
        Ok(())
    }

    fn dispatch(&mut self, base_nonce: u64, lanes: usize) -> Result<BatchResults, BackendError> {
        let (base_lo, base_hi) = split_nonce(base_nonce);
        if matches!(self.job, Some(ClJob::Generic { .. })) {
            self.ensure_records(lanes)?;
        }

        let hits = match self.job.as_ref().ok_or(BackendError::NotPrepared)? {
            ClJob::Generic {
                input,
                len,
                nonce_offset,
                digit_width,
                difficulty,
            } => {
                let records = self.records.as_ref().ok_or(BackendError::NotPrepared)?;
                let kernel = Kernel::builder()
                    .program(&self.program)
                    .name("mine_nonce")
                    .queue(self.queue.clone())
                    .global_work_size(lanes)
                    .arg(input)
                    .arg(len)
                    .arg(nonce_offset)
                    .arg(difficulty)
                    .arg(&base_lo)
                    .arg(&base_hi)
                    .arg(records)
                    .arg(digit_width)
                    .build()?;

                unsafe {
                    kernel.enq()?;
                }
                self.queue.finish()?;

                let mut host = vec![0u8; lanes * LANE_RECORD_SIZE];
                records.read(&mut host).enq()?;
                hits_from_records(&host, lanes)
            }
            ClJob::Midstate {
                tail,
                tail_len,
                prefix_len,
                midstate,
                nonce_offset,
                digit_width,
                difficulty,
            } => {
                self.found.write(&vec![NO_HIT]).enq()?;

                let kernel = Kernel::builder()
                    .program(&self.program)
                    .name("mine_nonce_midstate")
                    .queue(self.queue.clone())
                    .global_work_size(lanes)
                    .arg(tail)
                    .arg(tail_len)
                    .arg(prefix_len)
                    .arg(midstate)
                    .arg(nonce_offset)
                    .arg(difficulty)
                    .arg(&base_lo)
                    .arg(&base_hi)
                    .arg(digit_width)
                    .arg(&self.found)
                    .build()?;

                unsafe {
                    kernel.enq()?;
                }
                self.queue.finish()?;

                let mut found = vec![NO_HIT];
                self.found.read(&mut found).enq()?;
                hit_from_index(base_nonce, found[0], lanes).into_iter().collect()
            }
        };

        Ok(BatchResults { lanes, hits })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::{run_batch, LaneResult, PreparedKernel};
    use crate::event::{locate_nonce_placeholder, Event};

    fn job_message() -> (Vec<u8>, usize) {
        let mut event = Event {
            pubkey: "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798".into(),
            created_at: 1_700_000_000,
            kind: 1,
            tags: vec![vec!["t".into(), "opencl".into()]],
            content: "kernel agreement".repeat(20),
            ..Default::default()
        };
        event.set_nonce_tag("0000000000", 8);
        let message = event.serialize();
        let offset = locate_nonce_placeholder(&message, "0000000000").unwrap();
        (message, offset)
    }

    #[test]
    fn test_device_kernels_match_host_kernel() {
        let devices = enumerate().unwrap_or_default();
        if devices.is_empty() {
            eprintln!("no OpenCL device, skipping");
            return;
        }

        let (message, nonce_offset) = job_message();
        // Placeholder past the first block, so the midstate path runs
        assert!(nonce_offset > BLOCK_SIZE);
        let params = KernelParams {
            message: &message,
            nonce_offset,
            digit_width: 10,
            difficulty: 8,
        };
        let base = 1_000_000_000;
        let lanes = 20_000;

        for info in devices {
            let mut backend = OpenClBackend::new(info.clone()).unwrap();
            for variant in KernelVariant::ALL {
                let host = PreparedKernel::new(variant, params);

                backend.prepare(variant, params).unwrap();
                let device = backend.dispatch(base, lanes).unwrap();
                assert_eq!(device, run_batch(&host, base, lanes), "{} on {}", variant, info.name);

                let first = device.first().unwrap();
                match host.evaluate(base, first.lane as u64) {
                    LaneResult::Found { nonce, digest } => {
                        assert_eq!(nonce, first.nonce);
                        if let Some(d) = first.digest {
                            assert_eq!(d, digest);
                        }
                    }
                    LaneResult::NotFound => panic!("{} lane {} not a hit on host", variant, first.lane),
                }
            }
        }
    }

    #[test]
    fn test_split_nonce() {
        assert_eq!(split_nonce(0x0000_0002_0000_0001), (1, 2));
        assert_eq!(split_nonce(9_999_999_999), (1_410_065_407, 2));
    }
}
