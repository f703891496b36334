//! Data slot tables: typed, indexed device arrays attached to a graph
//!
//! Callers pick how many slots a graph carries and what each index means
//! (distances in vertex slot 0, predecessors in slot 1, a mask in edge slot 0,
//! ...). The engine never interprets indices itself; traversal configurations
//! name them explicitly. Slots are kind-tagged word arrays with bounds-checked
//! access, so attaching arbitrary typed data stays possible without dynamic
//! dispatch.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::device::{MemoryReservation, MemoryTracker};
use crate::error::{GraphError, Result};

/// Element type of a data slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// 32-bit signed integer. The kind consumed and produced by traversal
    /// (distances, predecessors, edge masks).
    Int32,
    /// 32-bit float. Attachable payload data; not consumed by traversal.
    Float32,
}

impl ElementKind {
    /// Size of one element in bytes.
    #[must_use]
    pub const fn size_bytes(self) -> usize {
        match self {
            Self::Int32 | Self::Float32 => 4,
        }
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for i32 {}
    impl Sealed for f32 {}
}

/// Host element types that can be copied into and out of data slots.
///
/// Every supported kind is 32 bits wide; slot storage is a word array and
/// host buffers reinterpret it per element type.
pub trait SlotElement: bytemuck::Pod + sealed::Sealed {
    /// The slot kind this element type matches.
    const KIND: ElementKind;
}

impl SlotElement for i32 {
    const KIND: ElementKind = ElementKind::Int32;
}

impl SlotElement for f32 {
    const KIND: ElementKind = ElementKind::Float32;
}

fn read_guard(lock: &RwLock<Vec<i32>>) -> RwLockReadGuard<'_, Vec<i32>> {
    lock.read().unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn write_guard(lock: &RwLock<Vec<i32>>) -> RwLockWriteGuard<'_, Vec<i32>> {
    lock.write().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// One device-resident array, kind-tagged and length-fixed at allocation.
#[derive(Debug)]
pub(crate) struct DataSlot {
    kind: ElementKind,
    len: usize,
    words: RwLock<Vec<i32>>,
    _reservation: MemoryReservation,
}

impl DataSlot {
    fn allocate(kind: ElementKind, len: usize, tracker: &Arc<MemoryTracker>) -> Result<Arc<Self>> {
        let reservation = tracker.reserve((len * kind.size_bytes()) as u64)?;
        Ok(Arc::new(Self {
            kind,
            len,
            words: RwLock::new(vec![0i32; len]),
            _reservation: reservation,
        }))
    }

    pub(crate) fn kind(&self) -> ElementKind {
        self.kind
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    fn check_host_buffer<T: SlotElement>(&self, host_len: usize) -> Result<()> {
        if T::KIND != self.kind {
            return Err(GraphError::InvalidValue(format!(
                "element kind mismatch: slot holds {:?}, host buffer is {:?}",
                self.kind,
                T::KIND
            )));
        }
        if host_len != self.len {
            return Err(GraphError::InvalidValue(format!(
                "host buffer has {host_len} elements, slot holds {}",
                self.len
            )));
        }
        Ok(())
    }

    /// Copy a host buffer into the slot.
    pub(crate) fn write_from<T: SlotElement>(&self, host: &[T]) -> Result<()> {
        self.check_host_buffer::<T>(host.len())?;
        write_guard(&self.words).copy_from_slice(bytemuck::cast_slice(host));
        Ok(())
    }

    /// Copy the slot into a host buffer.
    pub(crate) fn read_into<T: SlotElement>(&self, host: &mut [T]) -> Result<()> {
        self.check_host_buffer::<T>(host.len())?;
        bytemuck::cast_slice_mut(host).copy_from_slice(&read_guard(&self.words));
        Ok(())
    }

    /// Device-side snapshot of the raw words (kernel mask input).
    pub(crate) fn snapshot_i32(&self) -> Vec<i32> {
        read_guard(&self.words).clone()
    }

    /// Device-side overwrite of the raw words (kernel result output).
    pub(crate) fn store_i32(&self, values: &[i32]) {
        write_guard(&self.words).copy_from_slice(values);
    }
}

/// Indexed collection of slots, all of one length (`n` or `nnz`).
#[derive(Debug, Default)]
pub(crate) struct SlotTable {
    slots: Vec<Arc<DataSlot>>,
}

impl SlotTable {
    /// Reserve `kinds.len()` arrays of `len` elements each, replacing any
    /// previous allocation wholesale. The old arrays are released before the
    /// new reservation so re-allocation never double-counts device memory.
    pub(crate) fn allocate(
        &mut self,
        kinds: &[ElementKind],
        len: usize,
        tracker: &Arc<MemoryTracker>,
    ) -> Result<()> {
        self.slots.clear();
        let mut slots = Vec::with_capacity(kinds.len());
        for &kind in kinds {
            slots.push(DataSlot::allocate(kind, len, tracker)?);
        }
        self.slots = slots;
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn get(&self, index: usize) -> Result<&Arc<DataSlot>> {
        self.slots.get(index).ok_or(GraphError::InvalidSlotIndex {
            index,
            allocated: self.slots.len(),
        })
    }
}
