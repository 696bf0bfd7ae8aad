//! CPU backend using rayon for parallelization.

use rayon::prelude::*;

#[allow(unused_imports)]
use tracing::{debug, trace};

use fgrain_core::{PlaneView, PlaneViewMut};

use super::{GrainBackend, check_planes};
use crate::ComputeResult;
use crate::kernel::{GrainModel, KernelParams};

/// Rayon backend: rows are rendered in parallel on the current pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        Self
    }

    pub fn is_available() -> bool {
        true
    }
}

impl GrainBackend for CpuBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn synthesize(
        &self,
        src: PlaneView<'_, f32>,
        mut dst: PlaneViewMut<'_, f32>,
        params: &KernelParams,
    ) -> ComputeResult<()> {
        if !check_planes(&src, &dst)? {
            return Ok(());
        }
        let model = GrainModel::new(params)?;

        let width = dst.width() as usize;
        let height = dst.height() as usize;
        let stride = dst.stride();
        trace!(width, height, threads = rayon::current_num_threads(), "cpu synthesize");

        dst.data_mut()
            .par_chunks_mut(stride)
            .take(height)
            .enumerate()
            .for_each(|(y, row)| {
                model.render_row(&src, y as u32, &mut row[..width]);
            });
        Ok(())
    }
}
