//! Optional GPU timing of the sort's compute passes
//!
//! The sorter asks an instrumentation hook for timestamp writes around each
//! compute pass it records. Passing no hook, or a timer on a device without
//! `TIMESTAMP_QUERY`, records exactly the same work.

use parking_lot::Mutex;

use crate::constants::PASS_COUNT;
use crate::error::SortResult;
use crate::gpu::readback::map_staging;

/// A compute pass recorded by the sorter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortEvent {
    DeriveKeys,
    Histogram(u32),
    Bin(u32),
    Publish,
}

impl SortEvent {
    /// Number of distinct events per frame
    pub const COUNT: u32 = 2 + 2 * PASS_COUNT;

    /// Every event in recording order
    pub fn all() -> Vec<SortEvent> {
        let mut events = vec![SortEvent::DeriveKeys];
        for pass in 0..PASS_COUNT {
            events.push(SortEvent::Histogram(pass));
            events.push(SortEvent::Bin(pass));
        }
        events.push(SortEvent::Publish);
        events
    }

    /// Dense index in recording order
    pub fn index(self) -> u32 {
        match self {
            SortEvent::DeriveKeys => 0,
            SortEvent::Histogram(pass) => 1 + 2 * pass,
            SortEvent::Bin(pass) => 2 + 2 * pass,
            SortEvent::Publish => Self::COUNT - 1,
        }
    }

    pub fn label(self) -> String {
        match self {
            SortEvent::DeriveKeys => "derive_keys".to_string(),
            SortEvent::Histogram(pass) => format!("histogram[{}]", pass),
            SortEvent::Bin(pass) => format!("bin[{}]", pass),
            SortEvent::Publish => "publish".to_string(),
        }
    }
}

/// Hook bracketing the sorter's compute passes
pub trait PassInstrumentation {
    /// Timestamp writes for the compute pass running `event`, if any
    fn timestamp_writes(&self, event: SortEvent) -> Option<wgpu::ComputePassTimestampWrites<'_>>;

    /// Called once after the last pass of a frame
    fn resolve(&self, encoder: &mut wgpu::CommandEncoder);
}

/// Measured duration of one event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventTiming {
    pub event: SortEvent,
    pub micros: f64,
}

struct TimerQueries {
    query_set: wgpu::QuerySet,
    resolve_buffer: wgpu::Buffer,
    result_buffer: wgpu::Buffer,
}

/// Timestamp-query implementation of [`PassInstrumentation`]
pub struct GpuPassTimer {
    queries: Option<TimerQueries>,

    /// Nanoseconds per timestamp tick
    period: f32,

    /// Set once a frame's timestamps have been copied into the result buffer
    resolved: Mutex<bool>,
}

impl GpuPassTimer {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        if !device.features().contains(wgpu::Features::TIMESTAMP_QUERY) {
            log::warn!("[GpuPassTimer] TIMESTAMP_QUERY not supported, sort passes will not be timed");
            return Self {
                queries: None,
                period: 0.0,
                resolved: Mutex::new(false),
            };
        }

        let query_count = 2 * SortEvent::COUNT;
        let size = query_count as u64 * std::mem::size_of::<u64>() as u64;

        let query_set = device.create_query_set(&wgpu::QuerySetDescriptor {
            label: Some("Sort Timestamp Queries"),
            ty: wgpu::QueryType::Timestamp,
            count: query_count,
        });

        let resolve_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Sort Timestamp Resolve Buffer"),
            size,
            usage: wgpu::BufferUsages::QUERY_RESOLVE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let result_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Sort Timestamp Result Buffer"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            queries: Some(TimerQueries {
                query_set,
                resolve_buffer,
                result_buffer,
            }),
            period: queue.get_timestamp_period(),
            resolved: Mutex::new(false),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.queries.is_some()
    }

    /// Read back the last resolved frame's timings in microseconds
    ///
    /// Returns `None` when the device cannot time passes or nothing has been
    /// resolved since the previous read. The frame's commands must have been
    /// submitted.
    pub async fn read_durations_us(&self, device: &wgpu::Device) -> SortResult<Option<Vec<EventTiming>>> {
        let Some(queries) = &self.queries else {
            return Ok(None);
        };

        {
            let mut resolved = self.resolved.lock();
            if !*resolved {
                return Ok(None);
            }
            *resolved = false;
        }

        let ticks = map_staging::<u64>(device, &queries.result_buffer).await?;
        let period = self.period as f64;

        let timings = SortEvent::all()
            .into_iter()
            .map(|event| {
                let begin = ticks[2 * event.index() as usize];
                let end = ticks[2 * event.index() as usize + 1];
                EventTiming {
                    event,
                    micros: end.saturating_sub(begin) as f64 * period / 1000.0,
                }
            })
            .collect();

        Ok(Some(timings))
    }
}

impl PassInstrumentation for GpuPassTimer {
    fn timestamp_writes(&self, event: SortEvent) -> Option<wgpu::ComputePassTimestampWrites<'_>> {
        let queries = self.queries.as_ref()?;
        Some(wgpu::ComputePassTimestampWrites {
            query_set: &queries.query_set,
            beginning_of_pass_write_index: Some(2 * event.index()),
            end_of_pass_write_index: Some(2 * event.index() + 1),
        })
    }

    fn resolve(&self, encoder: &mut wgpu::CommandEncoder) {
        let Some(queries) = &self.queries else {
            return;
        };

        encoder.resolve_query_set(&queries.query_set, 0..2 * SortEvent::COUNT, &queries.resolve_buffer, 0);
        encoder.copy_buffer_to_buffer(
            &queries.resolve_buffer,
            0,
            &queries.result_buffer,
            0,
            queries.result_buffer.size(),
        );
        *self.resolved.lock() = true;
    }
}
