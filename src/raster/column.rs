use crate::chunk::{Chunk, CHUNK_SIDE, SECTION_SIDE};
use crate::color::Color;
use crate::palette::Palette;

/// Minimum effective alpha for a voxel to raise the shading height
pub const SHADE_OPACITY_CUTOFF: u8 = 0x20;

/// Surface color and shading height of every column of one chunk, indexed
/// `[z][x]`.
#[derive(Debug, Clone)]
pub struct ChunkSurface {
    pub colors: [[Color; CHUNK_SIDE]; CHUNK_SIDE],
    pub heights: [[i16; CHUNK_SIDE]; CHUNK_SIDE],
}

impl Default for ChunkSurface {
    fn default() -> Self {
        Self {
            colors: [[Color::TRANSPARENT; CHUNK_SIDE]; CHUNK_SIDE],
            heights: [[0; CHUNK_SIDE]; CHUNK_SIDE],
        }
    }
}

/// Composite every column of a chunk down to one straight-alpha color
pub fn chunk_surface(chunk: &Chunk, palette: &Palette) -> ChunkSurface {
    let mut surface = ChunkSurface::default();
    let Some(highest) = chunk.highest_populated_section() else {
        return surface;
    };

    for z in 0..CHUNK_SIDE {
        for x in 0..CHUNK_SIDE {
            let (color, height) = column_surface(chunk, palette, highest, x, z);
            surface.colors[z][x] = color;
            surface.heights[z][x] = height as i16;
        }
    }
    surface
}

/// Color of one voxel after biome tinting; absent sections are clear air
fn voxel_color(chunk: &Chunk, palette: &Palette, x: usize, y: usize, z: usize) -> Color {
    match chunk.material_at(x, y, z) {
        Some(material) => palette.effective_color(material, chunk.biome_at(x, z)),
        None => Color::TRANSPARENT,
    }
}

/// Height of the highest fully opaque voxel in a column, scanning down from
/// the top of section `highest`.
fn highest_opaque(chunk: &Chunk, palette: &Palette, highest: usize, x: usize, z: usize) -> Option<usize> {
    (0..=highest).rev().find_map(|index| {
        let section = chunk.section(index)?;
        (0..SECTION_SIDE)
            .rev()
            .find(|&y| palette.is_fully_opaque(section.material_at(x, y, z)))
            .map(|y| index * SECTION_SIDE + y)
    })
}

fn column_surface(
    chunk: &Chunk,
    palette: &Palette,
    highest: usize,
    x: usize,
    z: usize,
) -> (Color, usize) {
    let top = (highest + 1) * SECTION_SIDE;

    // a column with no opaque floor composites over nothing from y=0
    let (mut pixel, mut height, start) = match highest_opaque(chunk, palette, highest, x, z) {
        Some(y) => (voxel_color(chunk, palette, x, y, z), y, y + 1),
        None => (Color::TRANSPARENT, 0, 0),
    };

    for y in start..top {
        let color = voxel_color(chunk, palette, x, y, z);
        pixel = pixel.overlay(color);
        if color.a >= SHADE_OPACITY_CUTOFF {
            height = y;
        }
    }

    (pixel.demultiply_alpha(), height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{pack_nibbles, voxel_index, Section, SECTION_VOLUME};
    use crate::palette::{BiomeColors, BlockColors};

    const BLOCKS: &str = "\
default 0xffff00ff
0 0x00000000 # air
1 0xff808080 # stone
2 0xffffffff biome_grass # grass
8 0x40000080 # water
9 0x10ffffff # faint
";

    const BIOMES: &str = "\
default 0xff00ff00 0xff00ff00 0xff00ff00
3 0xffff0000 0xffff0000 0xffff0000
";

    fn palette() -> Palette {
        Palette::new(
            BlockColors::from_text(BLOCKS).unwrap(),
            BiomeColors::from_text(BIOMES).unwrap(),
        )
    }

    /// Section filled from `fill(x, y, z)`
    fn section(index: usize, fill: impl Fn(usize, usize, usize) -> u8) -> Section {
        let mut ids = vec![0u8; SECTION_VOLUME];
        for y in 0..16 {
            for z in 0..16 {
                for x in 0..16 {
                    ids[voxel_index(x, y, z)] = fill(x, y, z);
                }
            }
        }
        Section::from_arrays(index, ids, None, vec![pack_nibbles(0, 0); SECTION_VOLUME / 2])
    }

    #[test]
    fn test_empty_chunk_is_transparent() {
        let surface = chunk_surface(&Chunk::default(), &palette());
        assert_eq!(surface.colors[3][4], Color::TRANSPARENT);
        assert_eq!(surface.heights[3][4], 0);
    }

    #[test]
    fn test_opaque_floor_sets_color_and_height() {
        // stone up to y=4 in section 0, air above
        let chunk = Chunk::default().with_section(section(0, |_, y, _| if y <= 4 { 1 } else { 0 }));
        let surface = chunk_surface(&chunk, &palette());
        assert_eq!(surface.colors[0][0], Color::from_argb(0xff80_8080));
        assert_eq!(surface.heights[7][9], 4);
    }

    #[test]
    fn test_translucent_layers_composite_over_floor() {
        // stone at y=2, water at y=3..=4
        let chunk = Chunk::default().with_section(section(0, |_, y, _| match y {
            0..=2 => 1,
            3 | 4 => 8,
            _ => 0,
        }));
        let palette = palette();
        let surface = chunk_surface(&chunk, &palette);

        let water = Color::from_argb(0x4000_0080);
        let expected = Color::from_argb(0xff80_8080)
            .overlay(water)
            .overlay(water)
            .overlay_repeat(Color::TRANSPARENT, 11)
            .demultiply_alpha();
        assert_eq!(surface.colors[5][5], expected);
        // water alpha 0x40 is opaque enough to raise the shading height
        assert_eq!(surface.heights[5][5], 4);
    }

    #[test]
    fn test_faint_layers_do_not_raise_height() {
        let chunk = Chunk::default().with_section(section(0, |_, y, _| match y {
            0 => 1,
            1 => 9,
            _ => 0,
        }));
        let surface = chunk_surface(&chunk, &palette());
        assert_eq!(surface.heights[0][0], 0);
        assert_ne!(surface.colors[0][0], Color::from_argb(0xff80_8080));
    }

    #[test]
    fn test_opaque_search_crosses_absent_sections() {
        // stone floor in section 0, an air-only section 2 on top
        let chunk = Chunk::default()
            .with_section(section(0, |_, y, _| if y == 0 { 1 } else { 0 }))
            .with_section(section(2, |_, _, _| 0));
        let surface = chunk_surface(&chunk, &palette());
        assert_eq!(surface.colors[1][1], Color::from_argb(0xff80_8080));
        assert_eq!(surface.heights[1][1], 0);
    }

    #[test]
    fn test_biome_tints_grass() {
        let mut biomes = vec![0u8; 256];
        biomes[0] = 3;
        let chunk = Chunk::default()
            .with_section(section(0, |_, y, _| if y == 0 { 2 } else { 0 }))
            .with_biomes(biomes);
        let surface = chunk_surface(&chunk, &palette());
        // column (0,0) is in biome 3, the rest fall back to the default row
        assert_eq!(surface.colors[0][0], Color::RED);
        assert_eq!(surface.colors[0][1], Color::GREEN);
    }

    #[test]
    fn test_column_without_floor_starts_transparent() {
        let chunk = Chunk::default().with_section(section(0, |x, y, _| if x == 0 && y == 3 { 8 } else { 0 }));
        let surface = chunk_surface(&chunk, &palette());
        assert_eq!(surface.colors[0][1], Color::TRANSPARENT);
        let water = surface.colors[0][0];
        assert_eq!(water.a, 0x40);
        assert_eq!(surface.heights[0][0], 3);
    }
}
