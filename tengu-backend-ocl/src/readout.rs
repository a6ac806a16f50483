//! The result reader's device-to-host primitive: issues `read-buffer` against a device buffer's
//! current device memory, waiting on its last-write event, blocks until the queue finishes, and
//! updates the buffer's host mirror in place. Used both by the evaluator's final result
//! materialization and by any operation that genuinely needs host data mid-walk (broadcast,
//! reshape with `-1`, argmin/argmax, reductions) per the concurrency model's "suspension points".

use std::cell::RefCell;
use std::rc::Rc;

use tengu_backend::Result;

use crate::buffer::{DeviceBuffer, DeviceMem, HostArray};
use crate::session::SessionCache;

/// Reads `buffer`'s device memory back into its host mirror and returns a clone of the refreshed
/// host array. A buffer with no device memory (a zero-element buffer) is returned as-is.
pub fn read_to_host(session: &SessionCache, buffer: &Rc<RefCell<DeviceBuffer>>) -> Result<HostArray> {
    let wait_for = {
        let buffer = buffer.borrow();
        tengu_ocl::wait_list([buffer.last_event()])
    };
    let device = session.device();
    let mut buffer = buffer.borrow_mut();
    match (buffer.host().clone(), buffer.device()) {
        (HostArray::Fp32(mut v), Some(DeviceMem::Fp32(mem))) => {
            mem.read(device.queue(), &mut v, &wait_for)?;
            *buffer.host_mut() = HostArray::Fp32(v.clone());
            Ok(HostArray::Fp32(v))
        }
        (HostArray::Int32(mut v), Some(DeviceMem::Int32(mem))) => {
            mem.read(device.queue(), &mut v, &wait_for)?;
            *buffer.host_mut() = HostArray::Int32(v.clone());
            Ok(HostArray::Int32(v))
        }
        (HostArray::Bool(mut v), Some(DeviceMem::Int32(mem))) => {
            mem.read(device.queue(), &mut v, &wait_for)?;
            *buffer.host_mut() = HostArray::Bool(v.clone());
            Ok(HostArray::Bool(v))
        }
        (host, None) => Ok(host),
        _ => unreachable!("device memory dtype always matches host array dtype, see DeviceBuffer invariants"),
    }
}
