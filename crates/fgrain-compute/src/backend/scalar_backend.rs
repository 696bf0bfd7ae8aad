//! Single-threaded reference backend.

use fgrain_core::{PlaneView, PlaneViewMut};

use super::{GrainBackend, check_planes};
use crate::ComputeResult;
use crate::kernel::{GrainModel, KernelParams};

/// Renders row by row on the calling thread.
///
/// Useful as a reference for [`CpuBackend`](super::CpuBackend) and inside
/// hosts that already saturate every core with frame-level parallelism.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScalarBackend;

impl ScalarBackend {
    pub fn new() -> Self {
        Self
    }
}

impl GrainBackend for ScalarBackend {
    fn name(&self) -> &'static str {
        "scalar"
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
        for (y, row) in dst.rows_mut().enumerate() {
            model.render_row(&src, y as u32, row);
        }
        Ok(())
    }
}
