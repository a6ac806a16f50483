//! Small helper for binding a type-erased `DeviceMem` as a kernel buffer argument without forcing
//! every call site in the dispatcher to match on the dtype family itself.

use crate::buffer::DeviceMem;

pub fn bind<'a>(builder: tengu_ocl::KernelBuilder<'a>, mem: &'a DeviceMem) -> tengu_ocl::KernelBuilder<'a> {
    match mem {
        DeviceMem::Fp32(buf) => builder.arg_buf(buf),
        DeviceMem::Int32(buf) => builder.arg_buf(buf),
    }
}
