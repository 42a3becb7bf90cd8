//! CPU worker pool backend
//!
//! Lanes are spread over a dedicated rayon pool so the thread count is
//! independent of the global pool.

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::trace;

use super::{Backend, BackendInfo, BackendSource, Capabilities, DeviceClass};
use crate::algorithm::{run_batch, BatchResults, KernelParams, KernelVariant, PreparedKernel};
use crate::error::BackendError;

/// Lanes a CPU worker is treated as handling per scheduling round, for batch
/// sizing. Plays the role of an OpenCL work-group size.
pub const CPU_WORKER_GROUP: usize = 16_384;

/// The job bound by the last [`Backend::prepare`]
#[derive(Debug, Clone)]
struct CpuJob {
    variant: KernelVariant,
    message: Vec<u8>,
    nonce_offset: usize,
    digit_width: u32,
    difficulty: u32,
}

impl CpuJob {
    fn params(&self) -> KernelParams<'_> {
        KernelParams {
            message: &self.message,
            nonce_offset: self.nonce_offset,
            digit_width: self.digit_width,
            difficulty: self.difficulty,
        }
    }
}

/// Multi-threaded host backend
pub struct CpuBackend {
    info: BackendInfo,
    pool: ThreadPool,
    job: Option<CpuJob>,
}

impl CpuBackend {
    /// Create a pool with `threads` workers (at least one).
    pub fn new(threads: usize) -> Result<Self, BackendError> {
        let threads = threads.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("nip13-worker-{}", i))
            .build()?;

        Ok(Self {
            info: Self::describe(threads),
            pool,
            job: None,
        })
    }

    /// Enumeration entry for a pool of `threads` workers.
    pub fn describe(threads: usize) -> BackendInfo {
        let threads = threads.max(1);
        BackendInfo {
            name: format!("CPU worker pool ({} threads)", threads),
            vendor: "host".to_string(),
            version: format!("rayon, {} logical cores", num_cpus::get()),
            platform: None,
            caps: Capabilities {
                class: DeviceClass::Cpu,
                compute_units: threads as u32,
                group_size: Some(CPU_WORKER_GROUP),
                global_mem: None,
            },
            source: BackendSource::CpuPool { threads },
        }
    }
}

impl Backend for CpuBackend {
    fn info(&self) -> &BackendInfo {
        &self.info
    }

    fn prepare(
        &mut self,
        variant: KernelVariant,
        params: KernelParams<'_>,
    ) -> Result<(), BackendError> {
        self.job = Some(CpuJob {
            variant,
            message: params.message.to_vec(),
            nonce_offset: params.nonce_offset,
            digit_width: params.digit_width,
            difficulty: params.difficulty,
        });
        Ok(())
    }

    fn dispatch(&mut self, base_nonce: u64, lanes: usize) -> Result<BatchResults, BackendError> {
        let job = self.job.as_ref().ok_or(BackendError::NotPrepared)?;
        let kernel = PreparedKernel::new(job.variant, job.params());

        let results = self.pool.install(|| run_batch(&kernel, base_nonce, lanes));
        trace!(base_nonce, lanes, hits = results.hits.len(), "cpu batch done");
        Ok(results)
    }
}
