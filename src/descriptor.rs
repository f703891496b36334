//! Graph descriptors: one topology plus its data slots, under one handle
//!
//! A descriptor progresses `Created → TopologyInstalled → Ready` and only a
//! `Ready` descriptor (topology installed, vertex slots allocated) can be
//! traversed. Destruction consumes the descriptor, so the double-destroy
//! caller error of handle-based C APIs is unrepresentable here; use after the
//! owning handle is destroyed is still checked at runtime.

use std::sync::Arc;

use crate::error::{GraphError, Result};
use crate::handle::HandleInner;
use crate::slots::{ElementKind, SlotElement, SlotTable};
use crate::topology::{DeviceTopology, TopologyDescriptor};

/// Lifecycle state of a [`GraphDescriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorState {
    /// Fresh descriptor; no topology installed.
    Created,
    /// Topology installed; no vertex data allocated yet.
    TopologyInstalled,
    /// Topology installed and vertex slots allocated; traversal is valid.
    Ready,
}

/// A graph resident on the device: immutable CSR topology plus typed vertex
/// and edge data slots.
///
/// Created with [`GraphHandle::create_graph`](crate::handle::GraphHandle::create_graph);
/// all device memory it owns is released when it is destroyed or dropped.
#[derive(Debug)]
pub struct GraphDescriptor {
    handle: Arc<HandleInner>,
    id: u64,
    topology: Option<Arc<DeviceTopology>>,
    vertex_slots: SlotTable,
    edge_slots: SlotTable,
}

impl GraphDescriptor {
    pub(crate) fn new(handle: Arc<HandleInner>, id: u64) -> Self {
        Self {
            handle,
            id,
            topology: None,
            vertex_slots: SlotTable::default(),
            edge_slots: SlotTable::default(),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> DescriptorState {
        match (&self.topology, self.vertex_slots.is_empty()) {
            (None, _) => DescriptorState::Created,
            (Some(_), true) => DescriptorState::TopologyInstalled,
            (Some(_), false) => DescriptorState::Ready,
        }
    }

    /// Vertex count of the installed topology.
    #[must_use]
    pub fn num_vertices(&self) -> Option<usize> {
        self.topology.as_ref().map(|t| t.num_vertices())
    }

    /// Edge count of the installed topology.
    #[must_use]
    pub fn num_edges(&self) -> Option<usize> {
        self.topology.as_ref().map(|t| t.num_edges())
    }

    /// Install the graph structure.
    ///
    /// The arrays are validated for orientation and length consistency, then
    /// copied to device-resident storage. The topology is immutable once
    /// installed; build a new descriptor to traverse a different graph.
    ///
    /// # Errors
    ///
    /// - [`GraphError::InvalidTopology`] for a CSC orientation or array
    ///   lengths inconsistent with the declared counts
    /// - [`GraphError::InvalidValue`] if a topology is already installed
    /// - [`GraphError::AllocationFailure`] if device capacity is exhausted
    /// - [`GraphError::InvalidHandle`] after the owning handle is destroyed
    pub fn install_topology(&mut self, desc: &TopologyDescriptor<'_>) -> Result<()> {
        self.handle.ensure_alive()?;
        if self.topology.is_some() {
            return Err(GraphError::InvalidValue(
                "topology already installed; create a new descriptor to replace it".to_owned(),
            ));
        }
        let topology = DeviceTopology::install(desc, &self.handle.tracker)?;
        log::debug!(
            "descriptor {}: topology installed (n={}, nnz={})",
            self.id,
            topology.num_vertices(),
            topology.num_edges()
        );
        self.topology = Some(topology);
        Ok(())
    }

    /// Allocate `kinds.len()` vertex slots, each an array of `n` elements of
    /// the declared kind. Calling again replaces the previous vertex-slot
    /// allocation wholesale; it does not grow it.
    ///
    /// # Errors
    ///
    /// - [`GraphError::NotReady`] before a topology is installed
    /// - [`GraphError::AllocationFailure`] if device capacity is exhausted
    /// - [`GraphError::InvalidHandle`] after the owning handle is destroyed
    pub fn allocate_vertex_data(&mut self, kinds: &[ElementKind]) -> Result<()> {
        self.handle.ensure_alive()?;
        let n = self
            .topology
            .as_ref()
            .ok_or(GraphError::NotReady("topology must be installed before allocating vertex data"))?
            .num_vertices();
        self.vertex_slots.allocate(kinds, n, &self.handle.tracker)?;
        log::debug!(
            "descriptor {}: {} vertex slot(s) of {} element(s) allocated",
            self.id,
            kinds.len(),
            n
        );
        Ok(())
    }

    /// Allocate `kinds.len()` edge slots, each an array of `nnz` elements of
    /// the declared kind. Calling again replaces the previous edge-slot
    /// allocation wholesale.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`allocate_vertex_data`](Self::allocate_vertex_data).
    pub fn allocate_edge_data(&mut self, kinds: &[ElementKind]) -> Result<()> {
        self.handle.ensure_alive()?;
        let nnz = self
            .topology
            .as_ref()
            .ok_or(GraphError::NotReady("topology must be installed before allocating edge data"))?
            .num_edges();
        self.edge_slots.allocate(kinds, nnz, &self.handle.tracker)?;
        log::debug!(
            "descriptor {}: {} edge slot(s) of {} element(s) allocated",
            self.id,
            kinds.len(),
            nnz
        );
        Ok(())
    }

    /// Copy a host buffer into vertex slot `slot`. The buffer length must
    /// equal `n` and `T` must match the slot's element kind.
    ///
    /// # Errors
    ///
    /// [`GraphError::InvalidSlotIndex`] outside the allocated range,
    /// [`GraphError::InvalidValue`] on kind or length mismatch,
    /// [`GraphError::InvalidHandle`] after handle destruction.
    pub fn set_vertex_data<T: SlotElement>(&self, slot: usize, host: &[T]) -> Result<()> {
        self.handle.ensure_alive()?;
        self.vertex_slots.get(slot)?.write_from(host)
    }

    /// Copy vertex slot `slot` back into a host buffer of exactly `n`
    /// elements.
    ///
    /// Reading while a traversal submitted against this descriptor has not
    /// been synchronized yields unspecified (but memory-safe) contents.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`set_vertex_data`](Self::set_vertex_data).
    pub fn get_vertex_data<T: SlotElement>(&self, slot: usize, host: &mut [T]) -> Result<()> {
        self.handle.ensure_alive()?;
        self.vertex_slots.get(slot)?.read_into(host)
    }

    /// Copy a host buffer into edge slot `slot` (length `nnz`).
    ///
    /// # Errors
    ///
    /// Same failure modes as [`set_vertex_data`](Self::set_vertex_data).
    pub fn set_edge_data<T: SlotElement>(&self, slot: usize, host: &[T]) -> Result<()> {
        self.handle.ensure_alive()?;
        self.edge_slots.get(slot)?.write_from(host)
    }

    /// Copy edge slot `slot` back into a host buffer of exactly `nnz`
    /// elements.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`set_vertex_data`](Self::set_vertex_data).
    pub fn get_edge_data<T: SlotElement>(&self, slot: usize, host: &mut [T]) -> Result<()> {
        self.handle.ensure_alive()?;
        self.edge_slots.get(slot)?.read_into(host)
    }

    /// Release the descriptor and all device memory it owns.
    ///
    /// Dropping has the same effect; `destroy` additionally reports whether
    /// the owning handle was already gone.
    ///
    /// # Errors
    ///
    /// [`GraphError::InvalidHandle`] if the owning handle was destroyed first
    /// (the descriptor's memory is released either way).
    pub fn destroy(self) -> Result<()> {
        let alive = self.handle.ensure_alive();
        log::debug!("descriptor {} destroyed", self.id);
        drop(self);
        alive
    }

    pub(crate) fn handle_inner(&self) -> &Arc<HandleInner> {
        &self.handle
    }

    pub(crate) fn topology(&self) -> Option<&Arc<DeviceTopology>> {
        self.topology.as_ref()
    }

    pub(crate) fn vertex_slots(&self) -> &SlotTable {
        &self.vertex_slots
    }

    pub(crate) fn edge_slots(&self) -> &SlotTable {
        &self.edge_slots
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }
}
