//! Camera uniforms as handed over by the camera controller
//!
//! The controller owns the buffer and rewrites it when the camera moves; the
//! sorter only reads `view` to derive view-space depth.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct CameraUniforms {
    /// World to view transform (column-major)
    pub view: [[f32; 4]; 4],

    /// View to clip transform (column-major)
    pub projection: [[f32; 4]; 4],
}

impl Default for CameraUniforms {
    fn default() -> Self {
        Self::from_matrices(&Mat4::IDENTITY, &Mat4::IDENTITY)
    }
}

impl CameraUniforms {
    pub fn from_matrices(view: &Mat4, projection: &Mat4) -> Self {
        Self {
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
        }
    }

    /// Right-handed perspective camera looking from `eye` at `target`
    pub fn look_at(eye: Vec3, target: Vec3, fov_y_radians: f32, aspect: f32) -> Self {
        let view = Mat4::look_at_rh(eye, target, Vec3::Y);
        let projection = Mat4::perspective_rh(fov_y_radians, aspect, 0.1, 1000.0);
        Self::from_matrices(&view, &projection)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.view)
    }

    /// Create the uniform buffer the controller would normally own
    pub fn create_buffer(&self, device: &wgpu::Device) -> wgpu::Buffer {
        use wgpu::util::DeviceExt;

        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Uniform Buffer"),
            contents: bytemuck::bytes_of(self),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        })
    }

    pub fn write(&self, queue: &wgpu::Queue, buffer: &wgpu::Buffer) {
        queue.write_buffer(buffer, 0, bytemuck::bytes_of(self));
    }
}
