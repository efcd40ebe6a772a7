use wgpu::util::DeviceExt;

use crate::gpu::layouts::DrawIndirectArgs;

/// Holds the single indirect draw record the splat renderer consumes
///
/// `vertex_count` is fixed at creation; `instance_count` is written on the
/// device at the end of every sort.
pub struct IndirectDrawBuffer {
    /// The GPU buffer storing the record
    buffer: wgpu::Buffer,
}

impl IndirectDrawBuffer {
    pub fn new(device: &wgpu::Device, vertex_count: u32) -> Self {
        let args = DrawIndirectArgs::new(vertex_count, 0);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Splat Draw Indirect Buffer"),
            contents: bytemuck::bytes_of(&args),
            usage: wgpu::BufferUsages::INDIRECT
                | wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
        });

        Self { buffer }
    }

    /// Zero the instance count without touching the rest of the record
    pub fn clear_instance_count(&self, encoder: &mut wgpu::CommandEncoder) {
        encoder.clear_buffer(
            &self.buffer,
            DrawIndirectArgs::INSTANCE_COUNT_OFFSET,
            Some(std::mem::size_of::<u32>() as u64),
        );
    }

    /// Get the GPU buffer for `draw_indirect`
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Get buffer binding for compute shaders
    pub fn as_binding(&self) -> wgpu::BindingResource<'_> {
        self.buffer.as_entire_binding()
    }

    pub fn destroy(&self) {
        self.buffer.destroy();
    }
}
