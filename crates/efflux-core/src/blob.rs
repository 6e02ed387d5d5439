//! Material blobs.
//!
//! A blob is a fixed-shape record of non-negative quantities. Blobs are
//! plain values: they merge with [`Blob::add`] and divide fairly with
//! [`Blob::split`]. Concurrency lives in the split pools that own them.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Upper bound for [`LigandBlob::inflammation`] after a merge.
pub const LIGAND_INFLAMMATION_MAX: u64 = 100;

/// Common behaviour of every material record.
pub trait Blob: Clone + Default + Debug + PartialEq + Send + Sync + 'static {
    /// Merge `other` into `self`, field by field.
    fn add(&mut self, other: &Self);

    /// Split `self` in two and return the caller's share.
    ///
    /// Every field greater than one is halved: the returned share receives
    /// the larger half (`ceil(v / 2)`) and `self` keeps `floor(v / 2)`. A
    /// field holding exactly one is not divided and stays in `self`.
    /// The sum of the share and the remainder always equals the original.
    fn split(&mut self) -> Self;

    /// Sum of all fields.
    fn total(&self) -> u64;

    /// True when every field is zero.
    fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Halve one field in place and return the caller's share.
fn split_field(value: &mut u64) -> u64 {
    if *value <= 1 {
        return 0;
    }
    let kept = *value / 2;
    let share = *value - kept;
    *value = kept;
    share
}

/// Quantities saturate at `u64::MAX` instead of wrapping.
fn saturating_sum(fields: &[u64]) -> u64 {
    fields.iter().fold(0, |acc, v| acc.saturating_add(*v))
}

/// Satisfy as much of `need` as `have` allows.
fn consume_field(have: &mut u64, need: &mut u64) {
    let taken = (*have).min(*need);
    *have -= taken;
    *need -= taken;
}

/// Oxygen and nutrients carried by the blood.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceBlob {
    pub o2: u64,
    pub glucose: u64,
    pub vitamins: u64,
}

impl ResourceBlob {
    /// Take from `self` whatever part of `need` it can cover.
    ///
    /// Both records stay non-negative; whatever is left in `need` is the
    /// unsatisfied remainder.
    pub fn consume(&mut self, need: &mut ResourceBlob) {
        consume_field(&mut self.o2, &mut need.o2);
        consume_field(&mut self.glucose, &mut need.glucose);
        consume_field(&mut self.vitamins, &mut need.vitamins);
    }
}

impl Blob for ResourceBlob {
    fn add(&mut self, other: &Self) {
        self.o2 = self.o2.saturating_add(other.o2);
        self.glucose = self.glucose.saturating_add(other.glucose);
        self.vitamins = self.vitamins.saturating_add(other.vitamins);
    }

    fn split(&mut self) -> Self {
        Self {
            o2: split_field(&mut self.o2),
            glucose: split_field(&mut self.glucose),
            vitamins: split_field(&mut self.vitamins),
        }
    }

    fn total(&self) -> u64 {
        saturating_sum(&[self.o2, self.glucose, self.vitamins])
    }
}

/// Metabolic waste waiting to be exhaled or filtered out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WasteBlob {
    pub co2: u64,
    pub creatinine: u64,
}

impl WasteBlob {
    /// Clear from `self` whatever part of `need` it holds.
    pub fn consume(&mut self, need: &mut WasteBlob) {
        consume_field(&mut self.co2, &mut need.co2);
        consume_field(&mut self.creatinine, &mut need.creatinine);
    }
}

impl Blob for WasteBlob {
    fn add(&mut self, other: &Self) {
        self.co2 = self.co2.saturating_add(other.co2);
        self.creatinine = self.creatinine.saturating_add(other.creatinine);
    }

    fn split(&mut self) -> Self {
        Self {
            co2: split_field(&mut self.co2),
            creatinine: split_field(&mut self.creatinine),
        }
    }

    fn total(&self) -> u64 {
        saturating_sum(&[self.co2, self.creatinine])
    }
}

/// Local signalling molecules.
///
/// `growth` asks the organ to grow more cells; the others report distress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LigandBlob {
    pub growth: u64,
    pub hunger: u64,
    pub asphyxia: u64,
    pub inflammation: u64,
}

impl Blob for LigandBlob {
    fn add(&mut self, other: &Self) {
        self.growth = self.growth.saturating_add(other.growth);
        self.hunger = self.hunger.saturating_add(other.hunger);
        self.asphyxia = self.asphyxia.saturating_add(other.asphyxia);
        self.inflammation = self
            .inflammation
            .saturating_add(other.inflammation)
            .min(LIGAND_INFLAMMATION_MAX);
    }

    fn split(&mut self) -> Self {
        Self {
            growth: split_field(&mut self.growth),
            hunger: split_field(&mut self.hunger),
            asphyxia: split_field(&mut self.asphyxia),
            inflammation: split_field(&mut self.inflammation),
        }
    }

    fn total(&self) -> u64 {
        saturating_sum(&[self.growth, self.hunger, self.asphyxia, self.inflammation])
    }
}

/// Blood-borne hormones that recruit immune cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HormoneBlob {
    pub granulocyte_csf: u64,
    pub macrophage_csf: u64,
    pub interleukin_3: u64,
    pub interleukin_2: u64,
}

impl Blob for HormoneBlob {
    fn add(&mut self, other: &Self) {
        self.granulocyte_csf = self.granulocyte_csf.saturating_add(other.granulocyte_csf);
        self.macrophage_csf = self.macrophage_csf.saturating_add(other.macrophage_csf);
        self.interleukin_3 = self.interleukin_3.saturating_add(other.interleukin_3);
        self.interleukin_2 = self.interleukin_2.saturating_add(other.interleukin_2);
    }

    fn split(&mut self) -> Self {
        Self {
            granulocyte_csf: split_field(&mut self.granulocyte_csf),
            macrophage_csf: split_field(&mut self.macrophage_csf),
            interleukin_3: split_field(&mut self.interleukin_3),
            interleukin_2: split_field(&mut self.interleukin_2),
        }
    }

    fn total(&self) -> u64 {
        saturating_sum(&[
            self.granulocyte_csf,
            self.macrophage_csf,
            self.interleukin_3,
            self.interleukin_2,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merged<B: Blob>(a: &B, b: &B) -> B {
        let mut out = a.clone();
        out.add(b);
        out
    }

    #[test]
    fn test_split_conserves_resources() {
        let original = ResourceBlob {
            o2: 10000,
            glucose: 333,
            vitamins: 7,
        };
        let mut pool = original;
        let share = pool.split();
        assert_eq!(merged(&share, &pool), original);
        assert_eq!(share.o2, 5000);
        assert_eq!(share.glucose, 167);
        assert_eq!(pool.glucose, 166);
        assert_eq!(share.vitamins, 4);
        assert_eq!(pool.vitamins, 3);
    }

    #[test]
    fn test_split_conserves_every_blob() {
        let mut waste = WasteBlob {
            co2: 9,
            creatinine: 4,
        };
        let share = waste.split();
        assert_eq!(share.total() + waste.total(), 13);

        let mut hormones = HormoneBlob {
            granulocyte_csf: 3,
            macrophage_csf: 0,
            interleukin_3: 11,
            interleukin_2: 2,
        };
        let share = hormones.split();
        assert_eq!(share.total() + hormones.total(), 16);

        let mut ligands = LigandBlob {
            growth: 100,
            hunger: 5,
            asphyxia: 1,
            inflammation: 50,
        };
        let share = ligands.split();
        assert_eq!(share.total() + ligands.total(), 156);
    }

    #[test]
    fn test_split_leaves_single_units_in_pool() {
        let mut pool = ResourceBlob {
            o2: 1,
            glucose: 1,
            vitamins: 1,
        };
        let share = pool.split();
        assert!(share.is_empty());
        assert_eq!(pool.total(), 3);
    }

    #[test]
    fn test_add_saturates_at_max() {
        let mut pool = ResourceBlob {
            o2: 10000,
            glucose: 1,
            vitamins: 0,
        };
        pool.add(&ResourceBlob {
            o2: u64::MAX,
            glucose: u64::MAX,
            vitamins: 2,
        });
        assert_eq!(pool.o2, u64::MAX);
        assert_eq!(pool.glucose, u64::MAX);
        assert_eq!(pool.vitamins, 2);
        assert_eq!(pool.total(), u64::MAX);

        let mut hormones = HormoneBlob {
            interleukin_2: u64::MAX,
            ..Default::default()
        };
        let same = hormones;
        hormones.add(&same);
        assert_eq!(hormones.interleukin_2, u64::MAX);

        let mut ligands = LigandBlob {
            inflammation: 90,
            ..Default::default()
        };
        ligands.add(&LigandBlob {
            growth: u64::MAX,
            inflammation: u64::MAX,
            ..Default::default()
        });
        assert_eq!(ligands.inflammation, LIGAND_INFLAMMATION_MAX);
        assert_eq!(ligands.total(), u64::MAX);

        let mut waste = WasteBlob {
            co2: u64::MAX,
            creatinine: u64::MAX,
        };
        waste.add(&WasteBlob {
            co2: 1,
            creatinine: 0,
        });
        assert_eq!(waste.total(), u64::MAX);
    }

    #[test]
    fn test_split_zero_is_idempotent() {
        let mut pool = HormoneBlob::default();
        for _ in 0..3 {
            let share = pool.split();
            assert!(share.is_empty());
            assert!(pool.is_empty());
        }
    }

    #[test]
    fn test_consume_clamps_at_zero() {
        let mut have = ResourceBlob {
            o2: 5,
            glucose: 20,
            vitamins: 0,
        };
        let mut need = ResourceBlob {
            o2: 8,
            glucose: 3,
            vitamins: 2,
        };
        have.consume(&mut need);
        assert_eq!(
            have,
            ResourceBlob {
                o2: 0,
                glucose: 17,
                vitamins: 0
            }
        );
        assert_eq!(
            need,
            ResourceBlob {
                o2: 3,
                glucose: 0,
                vitamins: 2
            }
        );
    }

    #[test]
    fn test_consume_waste() {
        let mut have = WasteBlob {
            co2: 10,
            creatinine: 1,
        };
        let mut need = WasteBlob {
            co2: 4,
            creatinine: 4,
        };
        have.consume(&mut need);
        assert_eq!(have.co2, 6);
        assert_eq!(have.creatinine, 0);
        assert_eq!(need.co2, 0);
        assert_eq!(need.creatinine, 3);
    }

    #[test]
    fn test_ligand_inflammation_is_capped() {
        let mut ligands = LigandBlob {
            inflammation: 90,
            ..Default::default()
        };
        ligands.add(&LigandBlob {
            growth: 1,
            inflammation: 30,
            ..Default::default()
        });
        assert_eq!(ligands.inflammation, LIGAND_INFLAMMATION_MAX);
        assert_eq!(ligands.growth, 1);
    }

    #[test]
    fn test_add_merges_fields() {
        let mut a = ResourceBlob {
            o2: 1,
            glucose: 2,
            vitamins: 3,
        };
        a.add(&ResourceBlob {
            o2: 10,
            glucose: 20,
            vitamins: 30,
        });
        assert_eq!(a.total(), 66);
    }
}
