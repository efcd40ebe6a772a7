//! Per-frame GPU depth sort of a splat cloud
//!
//! Built once per scene load. Every frame [`SplatSorter::record_sort`] records
//! key derivation, four 8-bit digit passes (histogram then one-sweep binning)
//! and the indirect draw count into the caller's encoder. Nothing here waits on
//! the device; the renderer's draw reads the sorted entries and the draw record
//! later in the same submission.

use wgpu::util::DeviceExt;

use crate::config::SortConfig;
use crate::constants::{status, tiles, PASS_COUNT};
use crate::error::{gpu_operation_error, SortError, SortResult};
use crate::gpu::layouts::{dispatch_grid, DrawIndirectArgs, SortUniforms};
use crate::gpu::readback::read_buffer;
use crate::gpu::shader_includes::build_sort_shader;
use crate::renderer::indirect_draw::IndirectDrawBuffer;
use crate::renderer::pass_timer::{PassInstrumentation, SortEvent};
use crate::renderer::sort_buffers::SortBuffers;
use crate::scene::SplatCloud;
use crate::sort::key::Entry;
use crate::sort::passes::{final_buffer, pass_buffers};

pub struct SplatSorter {
    config: SortConfig,
    entry_count: u32,

    /// Workgroup grid covering every tile
    grid: (u32, u32),

    buffers: SortBuffers,
    draw_buffer: IndirectDrawBuffer,

    /// One uniform buffer per digit pass
    pass_uniforms: Vec<wgpu::Buffer>,

    /// One bind group per digit pass, source and destination swapped by parity
    bind_groups: Vec<wgpu::BindGroup>,

    derive_keys_pipeline: wgpu::ComputePipeline,
    histogram_pipeline: wgpu::ComputePipeline,
    bin_pipeline: wgpu::ComputePipeline,
    publish_pipeline: wgpu::ComputePipeline,
}

impl SplatSorter {
    /// Build the sorter for a scene
    ///
    /// `camera_buffer` holds [`crate::camera::CameraUniforms`] and is only read.
    /// All sizing and allocation failures are reported here.
    pub async fn new(
        device: &wgpu::Device,
        camera_buffer: &wgpu::Buffer,
        scene: &SplatCloud,
        config: SortConfig,
    ) -> SortResult<Self> {
        config.validate_for_device()?;

        let entry_count = scene.count();
        if entry_count > status::MAX_ENTRY_COUNT {
            return Err(SortError::TooManyPrimitives {
                count: entry_count as u64,
                max: status::MAX_ENTRY_COUNT,
            });
        }

        let limits = device.limits();
        if config.tile_size > limits.max_compute_invocations_per_workgroup
            || config.tile_size > limits.max_compute_workgroup_size_x
        {
            return Err(SortError::InvalidConfig(format!(
                "tile_size {} exceeds the device workgroup limit of {}",
                config.tile_size,
                limits
                    .max_compute_invocations_per_workgroup
                    .min(limits.max_compute_workgroup_size_x)
            )));
        }

        let buffers = SortBuffers::new(device, entry_count, config.tile_size).await?;
        let tile_count = buffers.tile_count();
        let grid = dispatch_grid(
            tile_count,
            limits
                .max_compute_workgroups_per_dimension
                .min(tiles::MAX_WORKGROUPS_PER_DIMENSION),
        );

        log::info!(
            "[SplatSorter] Allocated sort buffers for {} entries ({} tiles, grid {}x{})",
            entry_count,
            tile_count,
            grid.0,
            grid.1
        );

        let source = match build_sort_shader(config.tile_size) {
            Ok(source) => source,
            Err(error) => {
                buffers.destroy();
                return Err(error);
            }
        };

        // Failures below surface through these scopes
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);

        let draw_buffer = IndirectDrawBuffer::new(device, config.vertices_per_splat);

        let pass_uniforms: Vec<wgpu::Buffer> = (0..PASS_COUNT)
            .map(|pass| {
                let uniforms = SortUniforms::new(pass, entry_count, tile_count, grid.0, scene.stride(), &config);
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("Sort Pass {} Uniforms", pass)),
                    contents: bytemuck::bytes_of(&uniforms),
                    usage: wgpu::BufferUsages::UNIFORM,
                })
            })
            .collect();

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Splat Sort Shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let bind_group_layout = create_bind_group_layout(device);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Splat Sort Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = |entry_point: &str| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(entry_point),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point,
            })
        };

        let derive_keys_pipeline = pipeline("derive_keys");
        let histogram_pipeline = pipeline("histogram");
        let bin_pipeline = pipeline("bin");
        let publish_pipeline = pipeline("publish_draw_args");

        let bind_groups = (0..PASS_COUNT)
            .map(|pass| {
                let roles = pass_buffers(pass);
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("Sort Pass {} Bind Group", pass)),
                    layout: &bind_group_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: camera_buffer.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: scene.buffer().as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: pass_uniforms[pass as usize].as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 3,
                            resource: buffers.entries(roles.source).as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 4,
                            resource: buffers.entries(roles.destination).as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 5,
                            resource: buffers.tile_histograms.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 6,
                            resource: buffers.status.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 7,
                            resource: buffers.digit_totals.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 8,
                            resource: draw_buffer.as_binding(),
                        },
                    ],
                })
            })
            .collect();

        let out_of_memory = device.pop_error_scope().await;
        let validation = device.pop_error_scope().await;

        let failure = match (out_of_memory, validation) {
            (Some(error), _) => Some(SortError::OutOfDeviceMemory(error.to_string())),
            (None, Some(error)) => Some(gpu_operation_error("create sort pipelines", error)),
            (None, None) => None,
        };

        if let Some(error) = failure {
            log::error!("[SplatSorter] Initialization failed: {}", error);
            buffers.destroy();
            draw_buffer.destroy();
            for uniforms in &pass_uniforms {
                uniforms.destroy();
            }
            return Err(error);
        }

        Ok(Self {
            config,
            entry_count,
            grid,
            buffers,
            draw_buffer,
            pass_uniforms,
            bind_groups,
            derive_keys_pipeline,
            histogram_pipeline,
            bin_pipeline,
            publish_pipeline,
        })
    }

    /// Record this frame's sort into `encoder`
    ///
    /// With no entries only the draw record's instance count is cleared.
    pub fn record_sort(&self, encoder: &mut wgpu::CommandEncoder, instrumentation: Option<&dyn PassInstrumentation>) {
        if self.entry_count == 0 {
            self.draw_buffer.clear_instance_count(encoder);
            return;
        }

        log::trace!("[SplatSorter] Recording sort of {} entries", self.entry_count);

        self.dispatch(encoder, SortEvent::DeriveKeys, &self.derive_keys_pipeline, 0, self.grid, instrumentation);

        for pass in 0..PASS_COUNT {
            self.buffers.clear_pass_state(encoder);
            self.dispatch(encoder, SortEvent::Histogram(pass), &self.histogram_pipeline, pass, self.grid, instrumentation);
            self.dispatch(encoder, SortEvent::Bin(pass), &self.bin_pipeline, pass, self.grid, instrumentation);
        }

        self.dispatch(encoder, SortEvent::Publish, &self.publish_pipeline, 0, (1, 1), instrumentation);

        if let Some(instrumentation) = instrumentation {
            instrumentation.resolve(encoder);
        }
    }

    fn dispatch(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        event: SortEvent,
        pipeline: &wgpu::ComputePipeline,
        pass: u32,
        (x, y): (u32, u32),
        instrumentation: Option<&dyn PassInstrumentation>,
    ) {
        let label = event.label();
        let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(&label),
            timestamp_writes: instrumentation.and_then(|i| i.timestamp_writes(event)),
        });
        compute_pass.set_pipeline(pipeline);
        compute_pass.set_bind_group(0, &self.bind_groups[pass as usize], &[]);
        compute_pass.dispatch_workgroups(x, y, 1);
    }

    /// Sorted entries after a submitted sort (entry buffer A)
    pub fn sorted_entries(&self) -> &wgpu::Buffer {
        self.buffers.entries(final_buffer(PASS_COUNT))
    }

    /// Indirect draw record for `draw_indirect(buffer, 0)`
    pub fn draw_indirect_buffer(&self) -> &wgpu::Buffer {
        self.draw_buffer.buffer()
    }

    pub fn entry_count(&self) -> u32 {
        self.entry_count
    }

    pub fn tile_count(&self) -> u32 {
        self.buffers.tile_count()
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    /// Read the sorted entries back (tools and tests only)
    pub async fn read_sorted_entries(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> SortResult<Vec<Entry>> {
        read_buffer::<Entry>(device, queue, self.sorted_entries(), self.entry_count as usize).await
    }

    /// Read the indirect draw record back (tools and tests only)
    pub async fn read_draw_args(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> SortResult<DrawIndirectArgs> {
        let args = read_buffer::<DrawIndirectArgs>(device, queue, self.draw_buffer.buffer(), 1).await?;
        args.into_iter()
            .next()
            .ok_or_else(|| SortError::BufferMapping("draw args readback was empty".to_string()))
    }

    /// Release every buffer the sorter owns
    pub fn destroy(&self) {
        log::debug!("[SplatSorter] Releasing sort buffers");
        self.buffers.destroy();
        self.draw_buffer.destroy();
        for uniforms in &self.pass_uniforms {
            uniforms.destroy();
        }
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
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

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
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

fn create_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Splat Sort Bind Group Layout"),
        entries: &[
            // Camera
            uniform_entry(0),
            // Splats
            storage_entry(1, true),
            // Pass parameters
            uniform_entry(2),
            // Source entries
            storage_entry(3, false),
            // Destination entries
            storage_entry(4, false),
            // Tile histograms
            storage_entry(5, false),
            // Lookback status
            storage_entry(6, false),
            // Digit totals
            storage_entry(7, false),
            // Draw record
            storage_entry(8, false),
        ],
    })
}
