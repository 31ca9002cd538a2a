use serde::{Deserialize, Serialize};

pub const BIN_COUNT: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    pub id: String,
    pub description: String,
    /// Capacity of each of the four bins.
    pub qty_per_bin: u32,
    pub bins: [u32; BIN_COUNT],
}

impl Material {
    pub fn new(id: &str, description: &str, qty_per_bin: u32, bins: [u32; BIN_COUNT]) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            qty_per_bin,
            bins,
        }
    }

    /// Wide on purpose: four bins of u32 stock can exceed u32.
    pub fn total_stock(&self) -> u64 {
        self.bins.iter().map(|&b| b as u64).sum()
    }

    pub fn total_capacity(&self) -> u64 {
        self.qty_per_bin as u64 * BIN_COUNT as u64
    }

    pub fn is_available(&self) -> bool {
        self.total_stock() > 0
    }

    /// Bin quantity for a 1-based bin number.
    pub fn bin(&self, bin: u8) -> Option<u32> {
        if (1..=BIN_COUNT as u8).contains(&bin) {
            Some(self.bins[bin as usize - 1])
        } else {
            None
        }
    }

    /// Rounded fill percentage across all four bins.
    pub fn utilization(&self) -> u32 {
        percentage(self.total_stock(), self.total_capacity())
    }
}

pub(crate) fn percentage(stock: u64, capacity: u64) -> u32 {
    if capacity == 0 {
        0
    } else {
        (stock as f64 / capacity as f64 * 100.0).round() as u32
    }
}

/// Case-insensitive substring search over id and description.
pub fn filter_materials<'a>(materials: &'a [Material], query: &str) -> Vec<&'a Material> {
    let query = query.to_lowercase();
    materials
        .iter()
        .filter(|m| {
            query.is_empty()
                || m.id.to_lowercase().contains(&query)
                || m.description.to_lowercase().contains(&query)
        })
        .collect()
}

/// Fixed catalog loaded on first run and by the `seed` command.
pub fn seed_catalog() -> Vec<Material> {
    vec![
        Material::new("X/A013604BA", "Joint 3 ways", 8, [0, 0, 0, 0]),
        Material::new("X/G005294AB", "Cover joint 3 ways", 25, [0, 0, 0, 0]),
        Material::new("X/G005320AB", "Screw Ejot type G", 385, [385, 385, 0, 0]),
        Material::new("R04B40HEXM12035", "Baut m12x35 SS304", 25, [25, 0, 0, 0]),
        Material::new("R04WCTM12E", "Contact washer m12", 50, [0, 0, 0, 0]),
        Material::new("R04WCTM06E", "Contact washer m6", 500, [500, 500, 0, 0]),
        Material::new("R04B88HEXM06015E", "Bolt stell m6x15 ELG", 400, [202, 0, 0, 0]),
        Material::new("R04NUTCGM06E", "Cage nut M6", 200, [0, 0, 0, 0]),
        Material::new("X/Y377A3", "Screw ejot type Y", 500, [0, 0, 0, 0]),
        Material::new("R04BEYB12035", "Eye bolt m12", 25, [25, 25, 0, 0]),
        Material::new("2005372", "LABEL FOR BROTHER TZE-211 SZ 6MM WHITE", 3, [0, 0, 0, 0]),
        Material::new("2005373", "LABEL FOR BROTHER TZE-221 SZ 9MM WHITE", 3, [0, 0, 0, 0]),
        Material::new("2005369", "LABEL FOR BROTHER TZE-231 SZ 12MM WHITE", 3, [2, 3, 0, 0]),
        Material::new("2005395", "SCHOEN BLADE 1.25-18 RED", 375, [0, 0, 0, 0]),
        Material::new("2005397", "SCHOEN BLADE 2.5-18 BLUE", 250, [100, 250, 0, 0]),
        Material::new("2005406", "SCHOEN FERRULES 2-5 NON INSULATED", 500, [500, 500, 0, 0]),
        Material::new("2005436", "SCHOEN RING 2.5-10 NON INSULATED", 100, [100, 100, 100, 100]),
        Material::new("2005433", "SCHOEN RING 2.5-5 NON INSULATED", 750, [750, 750, 0, 0]),
        Material::new("2005412", "SCHOEN RING 2-4 NON INSULATED", 250, [0, 0, 0, 0]),
        Material::new("2005420", "SCHOEN RING 6-6 NON INSULATED", 125, [125, 125, 125, 0]),
        Material::new("2005477", "SCHOEN Y 1.25-3 NON INSULATED", 2000, [2000, 0, 0, 0]),
        Material::new("2005481", "SCHOEN Y 2.5-4 NON INSULATED", 500, [500, 500, 500, 500]),
        Material::new("2005505", "VINYL CABLE 2.5MM2 BK", 375, [375, 375, 375, 0]),
        Material::new("2005506", "VINYL CABLE 2.5MM2 BL", 375, [375, 375, 0, 0]),
        Material::new("2005507", "VINYL CABLE 2.5MM2 BR", 375, [375, 375, 375, 0]),
        Material::new("2005509", "VINYL CABLE 2.5MM2 GR", 375, [375, 375, 375, 375]),
        Material::new("2005547", "VINYL CABLE 6MM2 G", 250, [250, 250, 0, 0]),
    ]
}
