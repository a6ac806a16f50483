//! Type coercion: promotes mismatched binary operand dtypes by enqueuing a cast kernel on the
//! second operand, producing a fresh buffer in the first operand's dtype family. Any dtype
//! mismatch other than `fp32`/`int32` (e.g. involving `bool`) is accepted unchanged.

use std::cell::RefCell;
use std::rc::Rc;

use tengu_backend::Result;

use crate::args::bind;
use crate::buffer::DeviceBuffer;
use crate::buffer_factory::create_result_buffer;
use crate::dims::dims2;
use crate::session::SessionCache;

/// Coerces `(a, b)` to a common dtype, casting `b` into `a`'s dtype family if they differ and
/// both sides are in the `fp32`/`int32` family. Returns the pair unchanged otherwise.
pub fn coerce_pair(
    session: &SessionCache,
    a: Rc<RefCell<DeviceBuffer>>,
    b: Rc<RefCell<DeviceBuffer>>,
) -> Result<(Rc<RefCell<DeviceBuffer>>, Rc<RefCell<DeviceBuffer>>)> {
    let a_dtype = a.borrow().dtype();
    let b_dtype = b.borrow().dtype();
    if a_dtype == b_dtype {
        return Ok((a, b));
    }
    let kernel = match (a_dtype.is_float(), b_dtype.is_float()) {
        (true, false) => "cast_int_fp",
        (false, true) => "cast_fp_int",
        _ => return Ok((a, b)),
    };
    let b = cast(session, &b, a_dtype, kernel)?;
    Ok((a, b))
}

fn cast(session: &SessionCache, src: &Rc<RefCell<DeviceBuffer>>, target: tengu_backend::Dtype, kernel_name: &str) -> Result<Rc<RefCell<DeviceBuffer>>> {
    let (shape, src_name) = {
        let src = src.borrow();
        (src.shape().to_vec(), src.name().to_string())
    };
    let result_name = format!("{kernel_name}({src_name})");
    let result = create_result_buffer(session, &result_name, &shape, target)?;

    let device = session.device();
    let program = session.registry().program(device, kernel_name)?;
    let (m, n) = dims2(&shape);
    let wait_for = {
        let src = src.borrow();
        tengu_ocl::wait_list([src.last_event()])
    };

    let event = {
        let src = src.borrow();
        let result_ref = result.borrow();
        let builder = program
            .kernel(device, kernel_name)
            .global_work_size(m, n)
            .arg_scalar(m as i32)
            .arg_scalar(n as i32);
        let builder = bind(builder, src.device().expect("source buffer must be materialized"));
        let builder = bind(builder, result_ref.device().expect("result buffer must be allocated"));
        unsafe { builder.enqueue(&wait_for)? }
    };
    result.borrow_mut().set_last_event(event);
    Ok(result)
}
