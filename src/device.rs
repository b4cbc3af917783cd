//! Launch parameters shared by the device-wide operations.

use blockwise_copy::{CopyWidth, Target};
use blockwise_exec::LaunchConfig;

use crate::{DEFAULT_GROUP_SIZE, DEFAULT_MAX_GROUPS};

/// Shape and capabilities of the simulated accelerator.
///
/// ```rust
/// use blockwise::{CopyWidth, Device, Target};
///
/// let device = Device::new().with_group_size(64).with_target(Target::new(130));
/// assert_eq!(device.group_size, 64);
/// assert_eq!(device.copy_width, CopyWidth::Byte);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Device {
    /// Lanes per group.
    pub group_size: usize,
    /// Upper bound on the number of intervals (and groups) per launch.
    pub max_groups: usize,
    /// Access granularity of bulk copies.
    pub copy_width: CopyWidth,
}

impl Default for Device {
    fn default() -> Self {
        Self {
            group_size: DEFAULT_GROUP_SIZE,
            max_groups: default_max_groups(),
            copy_width: CopyWidth::BUILD_DEFAULT,
        }
    }
}

impl Device {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group_size(mut self, group_size: usize) -> Self {
        self.group_size = group_size;
        self
    }

    pub fn with_max_groups(mut self, max_groups: usize) -> Self {
        self.max_groups = max_groups;
        self
    }

    pub fn with_copy_width(mut self, copy_width: CopyWidth) -> Self {
        self.copy_width = copy_width;
        self
    }

    /// Use the copy width `target` supports.
    pub fn with_target(self, target: Target) -> Self {
        self.with_copy_width(target.copy_width())
    }

    pub(crate) fn launch_config(&self, groups: usize) -> LaunchConfig {
        LaunchConfig::new(groups, self.group_size)
    }
}

fn default_max_groups() -> usize {
    #[cfg(feature = "parallel")]
    let workers = rayon::current_num_threads();
    #[cfg(not(feature = "parallel"))]
    let workers = 1;

    workers.clamp(1, DEFAULT_MAX_GROUPS)
}
