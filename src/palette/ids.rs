use std::fmt;

/// Number of concrete variants a material id can carry
pub const VARIANTS_PER_MATERIAL: u8 = 16;

/// Largest material id expressible with the 12-bit id encoding
pub const MAX_MATERIAL_ID: u16 = 0x0fff;

/// Concrete material identifier: 12-bit id plus 4-bit variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId {
    id: u16,
    variant: u8,
}

impl MaterialId {
    pub const AIR: MaterialId = MaterialId { id: 0, variant: 0 };

    pub const fn new(id: u16, variant: u8) -> Self {
        Self {
            id: id & MAX_MATERIAL_ID,
            variant: variant & 0x0f,
        }
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn variant(&self) -> u8 {
        self.variant
    }

    /// Dense index in `0..4096 * 16`
    pub(crate) fn slot(&self) -> usize {
        self.id as usize * VARIANTS_PER_MATERIAL as usize + self.variant as usize
    }
}

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}:{:x}", self.id, self.variant)
    }
}

/// Material selector as written in a color table row. A missing variant
/// applies to every variant of the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialKey {
    pub id: u16,
    pub variant: Option<u8>,
}

impl MaterialKey {
    /// Every concrete id this selector covers
    pub fn expand(&self) -> Vec<MaterialId> {
        match self.variant {
            Some(variant) => vec![MaterialId::new(self.id, variant)],
            None => (0..VARIANTS_PER_MATERIAL)
                .map(|variant| MaterialId::new(self.id, variant))
                .collect(),
        }
    }
}

impl fmt::Display for MaterialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.variant {
            Some(variant) => write!(f, "{:x}:{:x}", self.id, variant),
            None => write!(f, "{:x}", self.id),
        }
    }
}

/// Biome identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BiomeId(u8);

impl BiomeId {
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for BiomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_id_masks_components() {
        let id = MaterialId::new(0x1234, 0x1f);
        assert_eq!(id.id(), 0x234);
        assert_eq!(id.variant(), 0xf);
        assert_eq!(id.to_string(), "234:f");
    }

    #[test]
    fn test_slots_are_dense_and_unique() {
        assert_eq!(MaterialId::AIR.slot(), 0);
        assert_eq!(MaterialId::new(1, 0).slot(), 16);
        assert_eq!(MaterialId::new(MAX_MATERIAL_ID, 15).slot(), 4096 * 16 - 1);
    }

    #[test]
    fn test_key_expansion() {
        let all = MaterialKey { id: 0x12, variant: None }.expand();
        assert_eq!(all.len(), 16);
        assert!(all.iter().all(|m| m.id() == 0x12));
        assert_eq!(all[15].variant(), 15);

        let one = MaterialKey { id: 0x12, variant: Some(3) }.expand();
        assert_eq!(one, vec![MaterialId::new(0x12, 3)]);
    }

    #[test]
    fn test_ids_order_for_diagnostics() {
        let mut ids = vec![MaterialId::new(5, 1), MaterialId::new(1, 9), MaterialId::new(5, 0)];
        ids.sort();
        assert_eq!(ids[0], MaterialId::new(1, 9));
        assert_eq!(ids[2], MaterialId::new(5, 1));
    }
}
