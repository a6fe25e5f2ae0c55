/// Configuration for a ring: the two segment names and the requested data
/// capacity. Loading these three scalars from a file, environment, or
/// argument list is explicitly out of scope for this crate — see
/// `SPEC_FULL.md` §6.3 and §10.3.
#[derive(Debug, Clone)]
pub struct Spec {
    /// Name of the shared-memory segment holding the three-word [`crate::State`].
    pub index_name: String,
    /// Name of the shared-memory segment holding the ring's data bytes.
    pub data_name: String,
    /// Requested capacity, in bytes, of the data segment.
    pub capacity: usize,
}

impl Spec {
    pub fn new(index_name: impl Into<String>, data_name: impl Into<String>, capacity: usize) -> Self {
        Self {
            index_name: index_name.into(),
            data_name: data_name.into(),
            capacity,
        }
    }

    pub(crate) fn writer_semaphore_name(&self) -> String {
        format!("{}-writer", self.data_name)
    }
}
