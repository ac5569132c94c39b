//! The `sources` command: list registered providers.

use anyhow::Result;

use tilevault::source::SourceRegistry;

pub fn handle_sources() -> Result<()> {
    let registry = SourceRegistry::with_defaults();

    println!("{:<4} {:<14} {:<10} {:<8} Hostname", "Id", "Label", "Scales", "Tile px");
    for source in registry.iter() {
        let descriptor = source.descriptor();
        println!(
            "{:<4} {:<14} {:<10} {:<8} {}",
            descriptor.id,
            descriptor.label,
            format!("{}-{}", descriptor.min_scale, descriptor.max_scale),
            descriptor.tile_size_px,
            descriptor.hostname
        );
    }
    Ok(())
}
