//! Shared segment/state plumbing used by both [`crate::Writer`] and
//! [`crate::Reader`].
//!
//! The spec frames this as "a mixin of contracts" and leaves the sharing
//! mechanism open. This implementation shares it by composition: both
//! handles hold a `RingAttachment`, rather than deriving from a common base
//! — matching the teacher's preference for concrete structs over trait
//! hierarchies on the hot path.

use framed_ring_shm::SharedSegment;

use crate::state::State;
use crate::{Result, Spec};

pub struct RingAttachment {
    state_segment: SharedSegment,
    data_segment: SharedSegment,
    capacity: usize,
}

impl RingAttachment {
    pub fn open(spec: &Spec) -> Result<Self> {
        crate::ring::validate_capacity(spec.capacity)?;

        let state_segment = SharedSegment::new(&spec.index_name, std::mem::size_of::<State>())?;
        let data_segment = SharedSegment::new(&spec.data_name, spec.capacity)?;

        Ok(Self {
            state_segment,
            data_segment,
            capacity: spec.capacity,
        })
    }

    pub fn state(&self) -> &State {
        // SAFETY: state_segment was sized to exactly size_of::<State>(),
        // so as_struct always succeeds here.
        self.state_segment
            .as_struct::<State>()
            .expect("state segment sized to exactly size_of::<State>()")
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn data(&self) -> &[u8] {
        self.data_segment.as_bytes()
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        self.data_segment.as_bytes_mut()
    }

    /// Borrows the state and data segments disjointly and simultaneously.
    /// The two segments are unrelated shared-memory mappings, so splitting
    /// the borrow here (rather than through two sequential method calls on
    /// `&mut self`) is sound and lets the Writer publish indices while
    /// copying frame bytes in the same scope.
    pub fn split_mut(&mut self) -> (&State, &mut [u8]) {
        let Self {
            state_segment,
            data_segment,
            ..
        } = self;
        let state = state_segment
            .as_struct::<State>()
            .expect("state segment sized to exactly size_of::<State>()");
        let data = data_segment.as_bytes_mut();
        (state, data)
    }
}
