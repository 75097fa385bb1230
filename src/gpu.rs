//! wgpu buffers for one effect.
//!
//! The core never touches the GPU on its own. A renderer that uses wgpu can
//! hand the active effect to [`GpuEffectBuffers`], which keeps one vertex
//! buffer per attribute plus one uniform buffer, and re-uploads only what
//! changed since the last [`sync`](GpuEffectBuffers::sync).
//!
//! Attributes are per-instance: draw `capacity` instances of a quad (or
//! point) and read the particle from the vertex input struct returned by
//! [`crate::motion::vertex_input_wgsl`]. The uniform buffer binds at
//! `@group(0) @binding(0)`.
//!
//! ```ignore
//! let mut buffers = GpuEffectBuffers::new(&device, host.active());
//!
//! // Each frame, after host.frame(...)
//! buffers.sync(&queue, host.active_mut());
//! ```

use crate::attributes::Attribute;
use crate::effects::EffectModule;
use wgpu::util::DeviceExt;

static VERTEX_ATTRIBUTES: [[wgpu::VertexAttribute; 1]; 7] = [
    wgpu::vertex_attr_array![0 => Float32x3], // position
    wgpu::vertex_attr_array![1 => Float32x3], // spawnOrigin
    wgpu::vertex_attr_array![2 => Float32x3], // prevSpawnOrigin
    wgpu::vertex_attr_array![3 => Float32],   // startTime
    wgpu::vertex_attr_array![4 => Float32],   // size
    wgpu::vertex_attr_array![5 => Float32x3], // velocity
    wgpu::vertex_attr_array![6 => Float32],   // angle
];

/// GPU copies of an effect's attributes and parameter bindings.
pub struct GpuEffectBuffers {
    attributes: Vec<wgpu::Buffer>,
    uniform_buffer: wgpu::Buffer,
    uniform_size: usize,
    capacity: usize,
}

impl GpuEffectBuffers {
    /// Allocate and fill buffers for `module`'s current state.
    pub fn new(device: &wgpu::Device, module: &dyn EffectModule) -> Self {
        let buffers = module.renderable_buffers();
        let attributes = Attribute::ALL
            .iter()
            .map(|attr| {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} {} buffer", module.name(), attr.name())),
                    contents: buffers.get(*attr).as_bytes(),
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                })
            })
            .collect();

        let uniform_data = module.parameter_bindings().to_bytes();
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} uniform buffer", module.name())),
            contents: &uniform_data,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        log::debug!(
            "gpu buffers for {}: {} particles, {} uniform bytes",
            module.name(),
            buffers.capacity(),
            uniform_data.len()
        );

        Self {
            attributes,
            uniform_buffer,
            uniform_size: uniform_data.len(),
            capacity: buffers.capacity(),
        }
    }

    /// Upload dirty attributes and the current bindings, then clear the
    /// module's dirty flags.
    ///
    /// Returns the number of attribute arrays uploaded. `module` must be the
    /// effect these buffers were created for; rebuild after a swap.
    pub fn sync(&mut self, queue: &wgpu::Queue, module: &mut dyn EffectModule) -> usize {
        let buffers = module.renderable_buffers();
        if buffers.capacity() != self.capacity {
            log::warn!(
                "gpu buffers hold {} particles but {} has {}; skipping upload",
                self.capacity,
                module.name(),
                buffers.capacity()
            );
            return 0;
        }

        let mut uploaded = 0;
        for (attr, data) in buffers.dirty_attributes() {
            queue.write_buffer(&self.attributes[attr as usize], 0, data.as_bytes());
            uploaded += 1;
        }

        let uniform_data = module.parameter_bindings().to_bytes();
        if uniform_data.len() == self.uniform_size {
            queue.write_buffer(&self.uniform_buffer, 0, &uniform_data);
        } else {
            log::warn!(
                "uniform layout of {} changed ({} -> {} bytes)",
                module.name(),
                self.uniform_size,
                uniform_data.len()
            );
        }

        module.clear_dirty();
        uploaded
    }

    pub fn attribute_buffer(&self, attr: Attribute) -> &wgpu::Buffer {
        &self.attributes[attr as usize]
    }

    pub fn uniform_buffer(&self) -> &wgpu::Buffer {
        &self.uniform_buffer
    }

    /// Number of instances to draw.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// One per-instance vertex buffer layout per attribute, in
/// [`Attribute::ALL`] order. Shader locations match the attribute index.
pub fn vertex_layouts() -> [wgpu::VertexBufferLayout<'static>; 7] {
    Attribute::ALL.map(|attr| wgpu::VertexBufferLayout {
        array_stride: (attr.components() * std::mem::size_of::<f32>()) as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &VERTEX_ATTRIBUTES[attr as usize],
    })
}
