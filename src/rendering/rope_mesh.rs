//! GPU mesh sync for the rope tube.
//!
//! The tube is regenerated at render rate, so the previous frame's buffers
//! are explicitly destroyed before the replacements are created. That
//! ordering is a correctness rule, not an optimization: leaking one buffer
//! per frame exhausts device memory in minutes.

use wgpu::util::DeviceExt;

use super::tube::TubeVertex;

/// Owns the rope tube's GPU resources for the current frame.
#[derive(Default)]
pub struct RopeMesh {
    vertex_buffer: Option<wgpu::Buffer>,
    index_buffer: Option<wgpu::Buffer>,
    index_count: u32,
}

impl RopeMesh {
    const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x3, // normal
        2 => Float32x2, // uv
    ];

    pub fn new() -> Self {
        Self::default()
    }

    /// Vertex layout matching [`TubeVertex`], for pipeline creation.
    pub fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<TubeVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::VERTEX_ATTRIBUTES,
        }
    }

    /// Replace the mesh with this frame's geometry. The previous buffers are
    /// destroyed first, unconditionally - dispose-before-create is the
    /// structural guarantee against per-frame leaks.
    pub fn rebuild(&mut self, device: &wgpu::Device, vertices: &[TubeVertex], indices: &[u32]) {
        if let Some(buffer) = self.vertex_buffer.take() {
            buffer.destroy();
        }
        if let Some(buffer) = self.index_buffer.take() {
            buffer.destroy();
        }
        self.index_count = 0;

        if vertices.is_empty() || indices.is_empty() {
            return;
        }

        self.vertex_buffer = Some(device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("rope_tube_vertex_buffer"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            },
        ));
        self.index_buffer = Some(device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("rope_tube_index_buffer"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            },
        ));
        self.index_count = indices.len() as u32;
    }

    /// Detach and release everything, e.g. on rope teardown.
    pub fn dispose(&mut self) {
        if let Some(buffer) = self.vertex_buffer.take() {
            buffer.destroy();
        }
        if let Some(buffer) = self.index_buffer.take() {
            buffer.destroy();
        }
        self.index_count = 0;
    }

    /// Issue the draw if the mesh currently holds geometry.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        let (Some(vertex_buffer), Some(index_buffer)) =
            (self.vertex_buffer.as_ref(), self.index_buffer.as_ref())
        else {
            return;
        };
        render_pass.set_vertex_buffer(0, vertex_buffer.slice(..));
        render_pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}
