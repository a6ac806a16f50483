//! Helpers for building OpenCL event wait-lists from a buffer's "last write" event, the way the
//! evaluator tracks cross-kernel dependencies without a host round-trip.

/// Builds an `ocl::EventList` out of the given optional last-write events, dropping any that are
/// absent. Mirrors `Buffer.last_event` from the evaluator's data model: a nullable back-reference
/// consumed once as a wait-list entry.
pub fn wait_list(events: impl IntoIterator<Item = Option<ocl::Event>>) -> ocl::EventList {
    let mut list = ocl::EventList::new();
    for event in events.into_iter().flatten() {
        list.push(event);
    }
    list
}
