//! Packed per-entity GPU record

use bytemuck::{Pod, Zeroable};

use crate::sim::Entity;

/// One entity as the shaders see it, in store order
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuEntity {
    /// Render-space position (pixels)
    pub position: [f32; 2],
    pub payload: u32,
    /// `EntityKind` code
    pub kind: u32,
}

impl GpuEntity {
    pub const SIZE: wgpu::BufferAddress = std::mem::size_of::<GpuEntity>() as wgpu::BufferAddress;

    pub const ATTRIBUTES: [wgpu::VertexAttribute; 3] = [
        wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x2,
        },
        wgpu::VertexAttribute {
            offset: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
            shader_location: 1,
            format: wgpu::VertexFormat::Uint32,
        },
        wgpu::VertexAttribute {
            offset: (std::mem::size_of::<[f32; 2]>() + std::mem::size_of::<u32>())
                as wgpu::BufferAddress,
            shader_location: 2,
            format: wgpu::VertexFormat::Uint32,
        },
    ];

    /// One instance per entity; the quad corners come from the vertex index
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: Self::SIZE,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

impl From<&Entity> for GpuEntity {
    fn from(e: &Entity) -> Self {
        Self {
            position: e.pos.to_array(),
            payload: e.payload(),
            kind: e.kind().code(),
        }
    }
}
