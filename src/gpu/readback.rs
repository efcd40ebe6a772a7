//! Device to host buffer readback
//!
//! Only tools, tests and telemetry read device buffers back; the per-frame sort
//! never waits on the host.

use bytemuck::Pod;

use crate::error::{buffer_mapping_error, SortResult};

/// Copy `count` elements of `buffer` into a fresh staging buffer and read them
///
/// `buffer` needs `COPY_SRC`. Polls the device until the mapping completes.
pub async fn read_buffer<T: Pod>(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    buffer: &wgpu::Buffer,
    count: usize,
) -> SortResult<Vec<T>> {
    let size = (count * std::mem::size_of::<T>()) as wgpu::BufferAddress;
    if size == 0 {
        return Ok(Vec::new());
    }

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Staging Buffer"),
        size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Readback Encoder"),
    });
    encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
    queue.submit(Some(encoder.finish()));

    let values = map_staging::<T>(device, &staging).await;
    staging.destroy();
    values
}

/// Map an already filled `MAP_READ` buffer and copy its contents out
pub async fn map_staging<T: Pod>(device: &wgpu::Device, staging: &wgpu::Buffer) -> SortResult<Vec<T>> {
    let buffer_slice = staging.slice(..);
    let (sender, receiver) = futures::channel::oneshot::channel();

    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        sender.send(result).ok();
    });
    device.poll(wgpu::Maintain::Wait);

    receiver
        .await
        .map_err(|e| buffer_mapping_error("readback", e))?
        .map_err(|e| buffer_mapping_error("readback", e))?;

    let data = buffer_slice.get_mapped_range();
    let values = bytemuck::cast_slice::<u8, T>(&data[..]).to_vec();

    drop(data);
    staging.unmap();

    Ok(values)
}
