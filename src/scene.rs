//! Splat cloud as handed over by scene management
//!
//! The scene owns a flat `f32` buffer with a fixed number of floats per splat;
//! the first three floats of every record are the world-space position. The
//! sorter binds it read-only and never looks past the position.

use glam::Vec3;
use wgpu::util::DeviceExt;

use crate::error::{SortError, SortResult};

pub struct SplatCloud {
    count: u32,
    stride: u32,
    buffer: wgpu::Buffer,
}

impl SplatCloud {
    /// Wrap an existing splat buffer
    pub fn new(count: u32, stride: u32, buffer: wgpu::Buffer) -> SortResult<Self> {
        if stride < 3 {
            return Err(SortError::InvalidConfig(format!(
                "splat stride must hold a position, got {} floats",
                stride
            )));
        }

        let expected = count as u64 * stride as u64 * std::mem::size_of::<f32>() as u64;
        if buffer.size() < expected {
            return Err(SortError::SplatBufferMismatch {
                expected,
                actual: buffer.size(),
            });
        }

        Ok(Self {
            count,
            stride,
            buffer,
        })
    }

    /// Upload a position-only cloud (stride 3)
    pub fn from_positions(device: &wgpu::Device, positions: &[Vec3]) -> SortResult<Self> {
        let floats: Vec<f32> = positions.iter().flat_map(|p| p.to_array()).collect();
        Self::from_floats(device, &floats, 3)
    }

    /// Upload raw splat records
    pub fn from_floats(device: &wgpu::Device, floats: &[f32], stride: u32) -> SortResult<Self> {
        if stride == 0 || floats.len() % stride as usize != 0 {
            return Err(SortError::InvalidConfig(format!(
                "{} floats do not divide into records of {}",
                floats.len(),
                stride
            )));
        }

        // Storage bindings must not be empty
        let contents: &[f32] = if floats.is_empty() { &[0.0; 4] } else { floats };

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Splat Buffer"),
            contents: bytemuck::cast_slice(contents),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        });

        Self::new((floats.len() / stride as usize) as u32, stride, buffer)
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Floats per splat record
    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn destroy(&self) {
        self.buffer.destroy();
    }
}
