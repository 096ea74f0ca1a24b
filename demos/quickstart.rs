//! # Quickstart
//!
//! Builds a small two-model scene in memory, clusters it by category,
//! plays the transition into the clustered layout and back, and prints
//! where every element ended up.

use std::rc::Rc;

use anyhow::{bail, Context};
use cluster_layout::prelude::*;

const FRAME: f32 = 1.0 / 60.0;

fn build_model(id: u32, offset: f32) -> MemorySource {
    let mut model = MemorySource::new(SourceId(id), 0);
    model.set_property_db(true);

    let categories = ["Walls", "Doors", "Windows", "Doors", "Furniture", ""];
    for (index, category) in categories.iter().enumerate() {
        let element = 10 + index as ElementId;
        let x = offset + index as f32 * 1.5;
        model
            .add_element(element, 0, &format!("Element {}", element))
            .set_property(element, "Category", *category);

        // Geometry primitive below the element, promoted through `parent`
        let mesh = 100 + index as ElementId;
        model
            .add_element(mesh, element, "Mesh")
            .set_property(mesh, "parent", element as i64);
        model.add_box_fragment(
            mesh,
            AABB::new(
                Vector3::new(x, 0.0, 0.0),
                Vector3::new(x + 1.0, 0.5 + index as f32 * 0.25, 2.0),
            ),
        );
    }
    model
}

fn play(extension: &ClusteringExtension<MemoryScene>) {
    let mut frames = 0;
    while extension.update(FRAME) {
        frames += 1;
    }
    log::info!("transition finished after {} frames", frames);
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let scene = Rc::new(MemoryScene::new());
    scene.add_source(build_model(1, 0.0));
    scene.add_source(build_model(2, 12.0));

    let config = ClusterConfig::default()
        .with_rotation_alignment(true)
        .with_transition(0.75, Easing::EaseInOutCubic);
    let extension = ClusteringExtension::new(scene.clone(), config);
    extension.load();

    if let Availability::Unavailable { reason } = extension.availability() {
        bail!("clustering unavailable: {}", reason);
    }

    extension.subscribe(|event| println!("event: {:?}", event));

    let outcome = pollster::block_on(extension.set_layout_active(true))
        .context("failed to cluster the scene")?;
    println!("activated: {:?}", outcome);
    play(&extension);

    for (name, region) in extension.cluster_regions() {
        let size = region.size();
        println!(
            "{:<14} center ({:>6.2}, {:>6.2})  size {:.2} x {:.2}",
            name,
            region.center().x,
            region.center().y,
            size.x,
            size.y
        );
    }
    for shape in scene.moved_shapes() {
        let t = scene.transform_of(&shape).translation;
        println!("{} moved by ({:.2}, {:.2}, {:.2})", shape, t.x, t.y, t.z);
    }

    let outcome = pollster::block_on(extension.set_layout_active(false))?;
    println!("deactivated: {:?}", outcome);
    play(&extension);
    println!("{} shapes still displaced", scene.moved_shapes().len());

    extension.unload();
    Ok(())
}
