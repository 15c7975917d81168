use smallvec::smallvec;

use marpii_render_graph::{
    BeginRenderingInfo, CopyBufferToImageInfo, DispatchInfo, DrawInfo, EndRenderingInfo,
    RenderGraph, RenderingAttachment, ResourceAccessInfo, ResourceOwner, Scheduler,
    SynchronizationInfo,
    ash::vk::{self, Handle},
};

//Native handles would come from the device. The graph only uses them as keys.
fn main() {
    simple_logger::SimpleLogger::new().init().unwrap();

    let mut graph = RenderGraph::new();
    let tracker = graph.resources();
    let staging = vk::Buffer::from_raw(1);
    let particles = vk::Buffer::from_raw(2);
    let albedo = vk::Image::from_raw(3);
    let swapchain = vk::Image::from_raw(4);

    tracker.register_buffer(staging);
    tracker.register_buffer(particles);
    tracker.register_image(albedo, ResourceOwner::Application, vk::ImageLayout::UNDEFINED);
    tracker.register_swapchain_image(swapchain);

    let mut scheduler = Scheduler::new();

    for frame in 0..2 {
        graph.debug_group_begin("frame", [1.0, 1.0, 1.0, 1.0]);

        graph.debug_group_begin("upload", [0.2, 0.2, 0.8, 1.0]);
        graph.add_node(CopyBufferToImageInfo {
            src_buffer: staging,
            dst_image: albedo,
            region: vk::BufferImageCopy {
                image_subresource: vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: 0,
                    base_array_layer: 0,
                    layer_count: 1,
                },
                image_extent: vk::Extent3D {
                    width: 512,
                    height: 512,
                    depth: 1,
                },
                ..Default::default()
            },
        });
        graph.debug_group_end();

        graph.add_node(BeginRenderingInfo {
            render_area: vk::Rect2D {
                offset: vk::Offset2D::default(),
                extent: vk::Extent2D {
                    width: 1280,
                    height: 720,
                },
            },
            layer_count: 1,
            color_attachments: smallvec![RenderingAttachment {
                image: swapchain,
                layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
                load_op: vk::AttachmentLoadOp::CLEAR,
                store_op: vk::AttachmentStoreOp::STORE,
                clear_value: vk::ClearValue::default(),
            }],
            depth_attachment: None,
            stencil_attachment: None,
        });
        //recorded inside the scope, but scheduled in front of it
        graph.add_node(DispatchInfo {
            pipeline: vk::Pipeline::null(),
            group_count: [64, 1, 1],
            resources: ResourceAccessInfo::default().with_buffer(
                particles,
                vk::AccessFlags2::SHADER_STORAGE_READ | vk::AccessFlags2::SHADER_STORAGE_WRITE,
            ),
        });
        graph.add_node(DrawInfo {
            pipeline: vk::Pipeline::null(),
            vertex_count: 6,
            instance_count: 1024,
            first_vertex: 0,
            first_instance: 0,
            resources: ResourceAccessInfo::default()
                .with_image(
                    albedo,
                    vk::AccessFlags2::SHADER_SAMPLED_READ,
                    vk::ImageAspectFlags::COLOR,
                )
                .with_buffer(particles, vk::AccessFlags2::SHADER_STORAGE_READ),
        });
        graph.add_node(EndRenderingInfo);
        graph.add_node(SynchronizationInfo {
            image: swapchain,
            layout: vk::ImageLayout::PRESENT_SRC_KHR,
            aspect: vk::ImageAspectFlags::COLOR,
        });

        graph.debug_group_end();

        println!("Frame {frame}:");
        let tables = graph.tables();
        for handle in scheduler.select_nodes(tables) {
            let links = tables.links(*handle);
            println!(
                "    {:?} [{}] reads {:?} writes {:?}",
                tables.node(*handle).node_type(),
                tables.full_debug_group(*handle),
                links.reads().collect::<Vec<_>>(),
                links.writes().collect::<Vec<_>>(),
            );
        }

        graph.reset();
        graph.resources().reset_swapchain_layouts();
    }
}
