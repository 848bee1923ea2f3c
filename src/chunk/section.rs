use crate::error::{nbt_error, QuadMapResult};
use crate::nbt::Compound;
use crate::palette::MaterialId;

/// Voxels along each axis of a section
pub const SECTION_SIDE: usize = 16;

/// Voxels in one section
pub const SECTION_VOLUME: usize = SECTION_SIDE * SECTION_SIDE * SECTION_SIDE;

const NIBBLE_BYTES: usize = SECTION_VOLUME / 2;

/// Unpack 4-bit value `index` from a nibble array: byte `index / 2`, low
/// nibble for even indices, high nibble for odd ones.
pub fn nibble(array: &[u8], index: usize) -> u8 {
    let byte = array[index / 2];
    if index % 2 == 1 {
        byte >> 4
    } else {
        byte & 0x0f
    }
}

/// Pack two 4-bit values the way [`nibble`] reads them back
pub fn pack_nibbles(even: u8, odd: u8) -> u8 {
    (odd & 0x0f) << 4 | (even & 0x0f)
}

/// Index of a voxel within a section, y-major then z then x
pub fn voxel_index(x: usize, y: usize, z: usize) -> usize {
    y * SECTION_SIDE * SECTION_SIDE + z * SECTION_SIDE + x
}

/// One 16x16x16 slab of a chunk
#[derive(Debug, Clone)]
pub struct Section {
    index: usize,
    ids_low: Vec<u8>,
    ids_high: Option<Vec<u8>>,
    variants: Vec<u8>,
}

impl Section {
    /// Decode a section record. `Blocks` and `Data` are required, `Add` is
    /// optional; short arrays are rejected.
    pub fn from_nbt(tag: &Compound) -> QuadMapResult<Self> {
        let index = tag
            .int("Y")
            .ok_or_else(|| nbt_error("section without a Y index"))?;
        let index = usize::try_from(index)
            .ok()
            .filter(|&i| i < super::SECTIONS_PER_CHUNK)
            .ok_or_else(|| nbt_error(format!("section index {} out of range", index)))?;

        let ids_low = required(tag, "Blocks", SECTION_VOLUME)?;
        let variants = required(tag, "Data", NIBBLE_BYTES)?;
        let ids_high = match tag.byte_array("Add") {
            Some(add) if add.len() >= NIBBLE_BYTES => Some(add[..NIBBLE_BYTES].to_vec()),
            Some(add) => {
                return Err(nbt_error(format!(
                    "section {} Add array has {} bytes",
                    index,
                    add.len()
                )))
            }
            None => None,
        };

        Ok(Self {
            index,
            ids_low,
            ids_high,
            variants,
        })
    }

    /// Build a section from raw arrays
    pub fn from_arrays(
        index: usize,
        ids_low: Vec<u8>,
        ids_high: Option<Vec<u8>>,
        variants: Vec<u8>,
    ) -> Self {
        debug_assert_eq!(ids_low.len(), SECTION_VOLUME);
        debug_assert_eq!(variants.len(), NIBBLE_BYTES);
        Self {
            index,
            ids_low,
            ids_high,
            variants,
        }
    }

    /// Vertical index of this section within its chunk
    pub fn index(&self) -> usize {
        self.index
    }

    /// Material at section-local coordinates
    pub fn material_at(&self, x: usize, y: usize, z: usize) -> MaterialId {
        let i = voxel_index(x, y, z);
        let mut id = self.ids_low[i] as u16;
        if let Some(high) = &self.ids_high {
            id |= (nibble(high, i) as u16) << 8;
        }
        MaterialId::new(id, nibble(&self.variants, i))
    }
}

fn required(tag: &Compound, name: &str, len: usize) -> QuadMapResult<Vec<u8>> {
    let bytes = tag
        .byte_array(name)
        .ok_or_else(|| nbt_error(format!("section without {}", name)))?;
    if bytes.len() < len {
        return Err(nbt_error(format!(
            "section {} array has {} bytes, expected {}",
            name,
            bytes.len(),
            len
        )));
    }
    Ok(bytes[..len].to_vec())
}
