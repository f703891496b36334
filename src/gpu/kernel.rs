//! WGSL traversal kernel dispatch
//!
//! Mirrors the host frontier kernel on a wgpu device: the level loop runs on
//! the CPU, each iteration dispatches one compute pass over all vertices and
//! reads back a single `updated` flag to decide whether another level is
//! needed. Adjacency buffers are uploaded once per topology and cached;
//! per-call buffers (mask, distances, predecessors) are released after
//! readback so repeated traversals hold device memory steady.

use std::sync::mpsc;
use std::sync::OnceLock;

use super::GpuDevice;
use crate::error::{GraphError, Result};
use crate::topology::{AdjacencyView, DeviceTopology};
use crate::traversal::{KernelOutput, NO_PREDECESSOR, UNREACHABLE};

const WORKGROUP_SIZE: u32 = 256;

/// Per-dispatch uniform block; layout shared with `shaders/bfs_level.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct KernelParams {
    num_vertices: u32,
    current_level: i32,
    use_mask: u32,
    use_edge_ids: u32,
}

/// Device-resident adjacency, uploaded once per topology.
#[derive(Debug)]
struct GpuAdjacency {
    offsets: wgpu::Buffer,
    indices: wgpu::Buffer,
    /// Present for the symmetrized structure; maps arcs to input edges.
    edge_ids: Option<wgpu::Buffer>,
}

impl GpuAdjacency {
    fn upload(device: &GpuDevice, adjacency: AdjacencyView<'_>) -> Self {
        let offsets = device.create_buffer_init(
            "adjacency offsets",
            bytemuck::cast_slice(adjacency.offsets),
            wgpu::BufferUsages::STORAGE,
        );
        let indices = device.create_buffer_init(
            "adjacency indices",
            bytemuck::cast_slice(adjacency.indices),
            wgpu::BufferUsages::STORAGE,
        );
        let edge_ids = adjacency.edge_ids.map(|ids| {
            device.create_buffer_init(
                "adjacency edge ids",
                bytemuck::cast_slice(ids),
                wgpu::BufferUsages::STORAGE,
            )
        });
        Self {
            offsets,
            indices,
            edge_ids,
        }
    }
}

/// Lazily uploaded adjacency buffers hanging off a topology.
#[derive(Debug, Default)]
pub(crate) struct AdjacencyCache {
    forward: OnceLock<GpuAdjacency>,
    symmetric: OnceLock<GpuAdjacency>,
}

impl AdjacencyCache {
    fn get_or_upload(
        &self,
        device: &GpuDevice,
        adjacency: AdjacencyView<'_>,
    ) -> &GpuAdjacency {
        let cell = if adjacency.edge_ids.is_some() {
            &self.symmetric
        } else {
            &self.forward
        };
        cell.get_or_init(|| GpuAdjacency::upload(device, adjacency))
    }
}

fn internal(context: &str, detail: impl std::fmt::Display) -> GraphError {
    GraphError::InternalError(format!("{context}: {detail}"))
}

/// Copy a buffer of `elements` i32 values back to the host. Blocks on the
/// calling (device) thread until the copy is observable.
fn read_back_i32(device: &GpuDevice, buffer: &wgpu::Buffer, elements: usize) -> Result<Vec<i32>> {
    let size = (elements * std::mem::size_of::<i32>()) as u64;
    let staging = device.create_buffer(
        "readback staging",
        size,
        wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
    );

    let mut encoder = device
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
    encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
    device.queue().submit(Some(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.device().poll(wgpu::Maintain::Wait);
    rx.recv()
        .map_err(|e| internal("readback channel", e))?
        .map_err(|e| internal("buffer mapping", e))?;

    let mapped = slice.get_mapped_range();
    let values: Vec<i32> = bytemuck::cast_slice(&mapped).to_vec();
    drop(mapped);
    staging.unmap();
    Ok(values)
}

fn read_updated_flag(device: &GpuDevice, buffer: &wgpu::Buffer) -> Result<u32> {
    let value = read_back_i32(device, buffer, 1)?;
    value
        .first()
        .map(|&v| v as u32)
        .ok_or_else(|| internal("updated flag readback", "empty buffer"))
}

/// Run the traversal kernel. Level-synchronous like the host path, so the
/// distance determinism contract carries over unchanged.
#[allow(clippy::cast_possible_truncation)] // counts bounded by i32::MAX at install
pub(crate) fn execute(
    device: &GpuDevice,
    topology: &DeviceTopology,
    adjacency: AdjacencyView<'_>,
    mask: Option<&[i32]>,
    source: u32,
) -> Result<KernelOutput> {
    let num_vertices = adjacency.offsets.len() - 1;
    let use_edge_ids = adjacency.edge_ids.is_some();
    let gpu_adjacency = topology.gpu.get_or_upload(device, adjacency);

    let shader = device
        .device()
        .create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("bfs level shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/bfs_level.wgsl").into()),
        });

    let bind_group_layout =
        device
            .device()
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("bfs bind group layout"),
                entries: &[
                    uniform_entry(0),
                    storage_entry(1, true),
                    storage_entry(2, true),
                    storage_entry(3, true),
                    storage_entry(4, true),
                    storage_entry(5, false),
                    storage_entry(6, false),
                    storage_entry(7, false),
                ],
            });

    let pipeline_layout = device
        .device()
        .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("bfs pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

    let pipeline = device
        .device()
        .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("bfs pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: "bfs_level",
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });

    let params_buffer = device.create_buffer_init(
        "bfs params",
        bytemuck::bytes_of(&KernelParams {
            num_vertices: num_vertices as u32,
            current_level: 0,
            use_mask: u32::from(mask.is_some()),
            use_edge_ids: u32::from(use_edge_ids),
        }),
        wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    );

    // Unbound slots still need a buffer behind the binding; a one-element
    // placeholder is never read because the matching flag is zero.
    let edge_ids_placeholder = device.create_buffer_init(
        "edge ids placeholder",
        bytemuck::bytes_of(&0u32),
        wgpu::BufferUsages::STORAGE,
    );
    let edge_ids_buffer = gpu_adjacency
        .edge_ids
        .as_ref()
        .unwrap_or(&edge_ids_placeholder);
    let mask_values_placeholder = [1i32];
    let mask_buffer = device.create_buffer_init(
        "edge mask",
        bytemuck::cast_slice(mask.unwrap_or(&mask_values_placeholder)),
        wgpu::BufferUsages::STORAGE,
    );

    let mut initial_distances = vec![UNREACHABLE; num_vertices];
    initial_distances[source as usize] = 0;
    let distances_buffer = device.create_buffer_init(
        "bfs distances",
        bytemuck::cast_slice(&initial_distances),
        wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
    );
    let predecessors_buffer = device.create_buffer_init(
        "bfs predecessors",
        bytemuck::cast_slice(&vec![NO_PREDECESSOR; num_vertices]),
        wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
    );
    let updated_buffer = device.create_buffer_init(
        "bfs updated flag",
        bytemuck::bytes_of(&0u32),
        wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
    );

    let bind_group = device
        .device()
        .create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bfs bind group"),
            layout: &bind_group_layout,
            entries: &[
                bind(0, &params_buffer),
                bind(1, &gpu_adjacency.offsets),
                bind(2, &gpu_adjacency.indices),
                bind(3, edge_ids_buffer),
                bind(4, &mask_buffer),
                bind(5, &distances_buffer),
                bind(6, &predecessors_buffer),
                bind(7, &updated_buffer),
            ],
        });

    let workgroups = (num_vertices as u32).div_ceil(WORKGROUP_SIZE).max(1);
    for level in 0..num_vertices {
        device
            .queue()
            .write_buffer(&updated_buffer, 0, bytemuck::bytes_of(&0u32));
        device.queue().write_buffer(
            &params_buffer,
            0,
            bytemuck::bytes_of(&KernelParams {
                num_vertices: num_vertices as u32,
                current_level: level as i32,
                use_mask: u32::from(mask.is_some()),
                use_edge_ids: u32::from(use_edge_ids),
            }),
        );

        let mut encoder = device
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("bfs level encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("bfs level pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(workgroups, 1, 1);
        }
        device.queue().submit(Some(encoder.finish()));
        device.device().poll(wgpu::Maintain::Wait);

        if read_updated_flag(device, &updated_buffer)? == 0 {
            break;
        }
    }

    let distances = read_back_i32(device, &distances_buffer, num_vertices)?;
    let predecessors = read_back_i32(device, &predecessors_buffer, num_vertices)?;
    let visited = distances.iter().filter(|&&d| d != UNREACHABLE).count();
    let levels = distances
        .iter()
        .filter(|&&d| d != UNREACHABLE)
        .max()
        .copied()
        .unwrap_or(0);

    Ok(KernelOutput {
        distances,
        predecessors,
        visited,
        levels,
    })
}

const fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

const fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn bind(binding: u32, buffer: &wgpu::Buffer) -> wgpu::BindGroupEntry<'_> {
    wgpu::BindGroupEntry {
        binding,
        resource: buffer.as_entire_binding(),
    }
}
