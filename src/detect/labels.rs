//! Class label table.
//!
//! Maps network class identifiers to the words spoken in warnings. Only classes
//! present in the table can ever produce an alert.

use std::collections::BTreeMap;

pub const HUMAN: u32 = 1;
pub const BICYCLE: u32 = 2;
pub const CAR: u32 = 3;
pub const MOTORCYCLE: u32 = 4;
pub const BUS: u32 = 6;
pub const TRAIN: u32 = 7;
pub const TRUCK: u32 = 8;
pub const DOG: u32 = 16;
pub const CAT: u32 = 17;

/// Classes on the long cooldown: people and pets.
pub const BENIGN_CLASSES: [u32; 3] = [HUMAN, DOG, CAT];

/// Immutable class id to label mapping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelTable {
    labels: BTreeMap<u32, String>,
}

impl LabelTable {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (u32, S)>,
        S: Into<String>,
    {
        Self {
            labels: entries
                .into_iter()
                .map(|(id, label)| (id, label.into()))
                .collect(),
        }
    }

    /// Tracked COCO classes: pedestrians, vehicles and common animals.
    pub fn coco_hazards() -> Self {
        Self::new([
            (HUMAN, "Human"),
            (BICYCLE, "Bicycle"),
            (CAR, "Car"),
            (MOTORCYCLE, "Motorcycle"),
            (BUS, "Bus"),
            (TRAIN, "Train"),
            (TRUCK, "Truck"),
            (DOG, "Dog"),
            (CAT, "Cat"),
        ])
    }

    pub fn label(&self, class_id: u32) -> Option<&str> {
        self.labels.get(&class_id).map(String::as_str)
    }

    pub fn contains(&self, class_id: u32) -> bool {
        self.labels.contains_key(&class_id)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        self.labels.iter().map(|(id, label)| (*id, label.as_str()))
    }
}

impl Default for LabelTable {
    fn default() -> Self {
        Self::coco_hazards()
    }
}
