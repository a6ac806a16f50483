//! The kernel registry: lazy, cached compilation of kernel programs from a resource directory,
//! keyed by kernel name so a program is compiled at most once per session.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tengu_backend::{Error, Kind, Result};

/// Default location kernel sources are read from, relative to the crate.
pub const DEFAULT_KERNEL_DIR: &str = "kernels";

pub struct KernelRegistry {
    source_dir: PathBuf,
    programs: RefCell<HashMap<String, tengu_ocl::Program>>,
}

impl KernelRegistry {
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            programs: RefCell::new(HashMap::new()),
        }
    }

    /// Returns the compiled program for `op`, compiling and caching it on first use.
    ///
    /// Kernel source files are named `<op>.cl` in the registry's resource directory; a single
    /// file may expose several dtype/variant entry points (`add_fp`, `add_c_fp`, `add_b_int`, …).
    pub fn program(&self, device: &tengu_ocl::Device, op: &str) -> Result<tengu_ocl::Program> {
        if let Some(program) = self.programs.borrow().get(op) {
            return Ok(program.clone());
        }
        let path = self.source_path(op);
        let source = std::fs::read_to_string(&path).map_err(|e| {
            Error::execution(
                Kind::KernelBuildFailure {
                    op: op.to_string(),
                    log: format!("cannot read kernel source at {}: {e}", path.display()),
                },
                op,
                None,
            )
        })?;
        let program = device.program().build(&source).map_err(|e| {
            Error::execution(
                Kind::KernelBuildFailure {
                    op: op.to_string(),
                    log: e.to_string(),
                },
                op,
                None,
            )
        })?;
        self.programs.borrow_mut().insert(op.to_string(), program.clone());
        tracing::debug!("Compiled kernel program for operation '{op}'");
        Ok(program)
    }

    fn source_path(&self, op: &str) -> PathBuf {
        Path::new(&self.source_dir).join(format!("{op}.cl"))
    }
}
