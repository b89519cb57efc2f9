//! Authored level definitions and the fixed progression order.
//!
//! The catalog is immutable after load. Levels are looked up by id and walked
//! through [`LevelCatalog::next_level`] to drive unlocking.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::hash::Hasher;
use std::sync::OnceLock;
use thiserror::Error;
use twox_hash::XxHash64;

use crate::constants::{CONNECTOR_OFFSET_X, CONNECTOR_OFFSET_Y};
use crate::progress::ConnectionCategory;

const DEFAULT_LEVEL_DATA: &str = include_str!("../assets/data/levels.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("level catalog could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unknown level `{id}`")]
    UnknownLevel { id: String },
    #[error("level `{id}` is defined more than once")]
    DuplicateLevel { id: String },
    #[error("level `{id}` is listed in the progression order but never defined")]
    UndefinedLevel { id: String },
    #[error("level `{id}` is defined but missing from the progression order")]
    UnorderedLevel { id: String },
    #[error("level `{id}` is grouped under {listed} but declares category {declared}")]
    CategoryMismatch {
        id: String,
        listed: LevelCategory,
        declared: LevelCategory,
    },
    #[error("level `{level}` has a rule for {cable} but its manifest supplies none")]
    RuleWithoutCable { level: String, cable: CableType },
}

/// Typed connection point on a piece of equipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectorType {
    PowerIn,
    PowerOut,
    XlrIn,
    XlrOut,
    WirelessIn,
    WirelessOut,
    DmxIn,
    DmxOut,
    HdmiIn,
    HdmiOut,
    EthernetIn,
    EthernetOut,
    SdiOut,
    TallyIn,
    ControlIn,
}

impl ConnectorType {
    pub const ALL: [Self; 15] = [
        Self::PowerIn,
        Self::PowerOut,
        Self::XlrIn,
        Self::XlrOut,
        Self::WirelessIn,
        Self::WirelessOut,
        Self::DmxIn,
        Self::DmxOut,
        Self::HdmiIn,
        Self::HdmiOut,
        Self::EthernetIn,
        Self::EthernetOut,
        Self::SdiOut,
        Self::TallyIn,
        Self::ControlIn,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::PowerIn => "power-in",
            Self::PowerOut => "power-out",
            Self::XlrIn => "xlr-in",
            Self::XlrOut => "xlr-out",
            Self::WirelessIn => "wireless-in",
            Self::WirelessOut => "wireless-out",
            Self::DmxIn => "dmx-in",
            Self::DmxOut => "dmx-out",
            Self::HdmiIn => "hdmi-in",
            Self::HdmiOut => "hdmi-out",
            Self::EthernetIn => "ethernet-in",
            Self::EthernetOut => "ethernet-out",
            Self::SdiOut => "sdi-out",
            Self::TallyIn => "tally-in",
            Self::ControlIn => "control-in",
        }
    }

    /// Display colour of the connector dot, keyed by signal family.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::PowerIn | Self::PowerOut => "#ff4757",
            Self::XlrIn | Self::XlrOut => "#00ff88",
            Self::WirelessIn | Self::WirelessOut => "#a29bfe",
            Self::DmxIn | Self::DmxOut => "#ffa502",
            Self::HdmiIn | Self::HdmiOut => "#00d2d3",
            Self::EthernetIn | Self::EthernetOut => "#ffdd59",
            Self::SdiOut | Self::TallyIn | Self::ControlIn => "#ffffff",
        }
    }
}

impl fmt::Display for ConnectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CableType {
    PowerCable,
    XlrCable,
    WirelessCable,
    EthernetCable,
    DmxCable,
    HdmiCable,
    UsbCable,
}

impl CableType {
    pub const ALL: [Self; 7] = [
        Self::PowerCable,
        Self::XlrCable,
        Self::WirelessCable,
        Self::EthernetCable,
        Self::DmxCable,
        Self::HdmiCable,
        Self::UsbCable,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::PowerCable => "power-cable",
            Self::XlrCable => "xlr-cable",
            Self::WirelessCable => "wireless-cable",
            Self::EthernetCable => "ethernet-cable",
            Self::DmxCable => "dmx-cable",
            Self::HdmiCable => "hdmi-cable",
            Self::UsbCable => "usb-cable",
        }
    }

    /// Progress bucket this cable counts toward. USB cables are not tracked.
    #[must_use]
    pub const fn category(self) -> Option<ConnectionCategory> {
        match self {
            Self::PowerCable => Some(ConnectionCategory::Power),
            Self::XlrCable => Some(ConnectionCategory::Xlr),
            Self::WirelessCable => Some(ConnectionCategory::Wireless),
            Self::EthernetCable => Some(ConnectionCategory::Ethernet),
            Self::DmxCable => Some(ConnectionCategory::Dmx),
            Self::HdmiCable => Some(ConnectionCategory::Hdmi),
            Self::UsbCable => None,
        }
    }
}

impl fmt::Display for CableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Animation {
    PowerGlow,
    WirelessSignal,
    AudioPulse,
    DmxCircle,
    VideoPulse,
    NetworkPulse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelCategory {
    Audio,
    Lighting,
    Video,
    Set,
}

impl LevelCategory {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Lighting => "lighting",
            Self::Video => "video",
            Self::Set => "set",
        }
    }
}

impl fmt::Display for LevelCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

/// Side of the equipment body a connector is mounted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountPosition {
    Top,
    Bottom,
    Left,
    Right,
    Front,
    Back,
}

impl MountPosition {
    /// Offset of the connector from the equipment's placement point.
    #[must_use]
    pub const fn offset(self) -> (f32, f32) {
        match self {
            Self::Top => (0.0, -CONNECTOR_OFFSET_Y),
            Self::Bottom => (0.0, CONNECTOR_OFFSET_Y),
            Self::Left => (-CONNECTOR_OFFSET_X, 0.0),
            Self::Right => (CONNECTOR_OFFSET_X, 0.0),
            Self::Front => (CONNECTOR_OFFSET_X / 2.0, CONNECTOR_OFFSET_Y),
            Self::Back => (-CONNECTOR_OFFSET_X / 2.0, -CONNECTOR_OFFSET_Y),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorSpec {
    #[serde(rename = "type")]
    pub kind: ConnectorType,
    pub position: MountPosition,
    pub label: String,
}

/// Toolbar entry: a kind of equipment and how many may be placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub icon: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub wireless: bool,
    #[serde(default)]
    pub requires_power: bool,
    #[serde(default)]
    pub connectors: SmallVec<[ConnectorSpec; 4]>,
}

/// Connection-manifest entry. `quantity` is the number of connections of
/// this cable the level requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CableSpec {
    #[serde(rename = "type")]
    pub cable: CableType,
    pub name: String,
    pub icon: String,
    pub quantity: u32,
    pub color: String,
}

/// Directional rule: a connection from `from` to `to` is valid with `cable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRule {
    pub from: ConnectorType,
    pub to: ConnectorType,
    pub cable: CableType,
    pub animation: Animation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewMember {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageZone {
    pub name: String,
    pub x_pct: f32,
    pub y_pct: f32,
    pub width_pct: f32,
    pub height_pct: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageLayout {
    pub width_pct: f32,
    pub height_pct: f32,
    #[serde(default)]
    pub zones: Vec<StageZone>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub id: String,
    pub title: String,
    pub category: LevelCategory,
    pub difficulty: Difficulty,
    pub description: String,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub equipment: Vec<EquipmentSpec>,
    #[serde(default)]
    pub connections: Vec<CableSpec>,
    #[serde(default)]
    pub rules: Vec<ConnectionRule>,
    #[serde(default)]
    pub settings: Vec<SettingSpec>,
    /// Equipment type to the crew ids qualified to operate it.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub crew_requirements: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub crew: Vec<CrewMember>,
    pub stage: StageLayout,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_hint: Option<String>,
    /// Per-category solution text that replaces the generic detailed hint.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub solution_notes: BTreeMap<ConnectionCategory, String>,
}

impl Level {
    /// Whether completion is driven by cabling. Levels with an empty
    /// connection manifest complete once the toolbar is fully placed.
    #[must_use]
    pub fn requires_connections(&self) -> bool {
        !self.connections.is_empty()
    }

    #[must_use]
    pub fn equipment_slot(&self, name: &str) -> Option<usize> {
        self.equipment.iter().position(|spec| spec.name == name)
    }

    #[must_use]
    pub fn toolbar_total(&self) -> u32 {
        self.equipment
            .iter()
            .fold(0_u32, |acc, spec| acc.saturating_add(spec.quantity))
    }

    #[must_use]
    pub fn cable_spec(&self, cable: CableType) -> Option<&CableSpec> {
        self.connections.iter().find(|spec| spec.cable == cable)
    }

    /// Crew ids qualified for an equipment type; empty when none are required.
    #[must_use]
    pub fn crew_for(&self, kind: &str) -> &[String] {
        self.crew_requirements
            .get(kind)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    #[must_use]
    pub fn crew_member(&self, id: &str) -> Option<&CrewMember> {
        self.crew.iter().find(|member| member.id == id)
    }

    /// Connector types present on any equipment in the toolbar.
    #[must_use]
    pub fn connector_types(&self) -> HashSet<ConnectorType> {
        self.equipment
            .iter()
            .flat_map(|spec| spec.connectors.iter().map(|c| c.kind))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogFile {
    order: Vec<String>,
    #[serde(default)]
    categories: BTreeMap<LevelCategory, Vec<String>>,
    levels: Vec<Level>,
}

/// Ordered, validated set of levels.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LevelCatalog {
    order: Vec<String>,
    categories: BTreeMap<LevelCategory, Vec<String>>,
    levels: Vec<Level>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl LevelCatalog {
    /// Parse and validate a catalog document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the order, grouping, and
    /// level table disagree.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::from_parts(file.order, file.categories, file.levels)
    }

    /// # Errors
    ///
    /// Returns an error if the parts do not describe a consistent catalog.
    pub fn from_parts(
        order: Vec<String>,
        categories: BTreeMap<LevelCategory, Vec<String>>,
        levels: Vec<Level>,
    ) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(levels.len());
        for (idx, level) in levels.iter().enumerate() {
            if index.insert(level.id.clone(), idx).is_some() {
                return Err(CatalogError::DuplicateLevel {
                    id: level.id.clone(),
                });
            }
            for rule in &level.rules {
                if level.cable_spec(rule.cable).is_none() {
                    return Err(CatalogError::RuleWithoutCable {
                        level: level.id.clone(),
                        cable: rule.cable,
                    });
                }
            }
        }

        let mut seen = HashSet::with_capacity(order.len());
        for id in &order {
            if !index.contains_key(id) {
                return Err(CatalogError::UndefinedLevel { id: id.clone() });
            }
            if !seen.insert(id.as_str()) {
                return Err(CatalogError::DuplicateLevel { id: id.clone() });
            }
        }
        if let Some(level) = levels.iter().find(|level| !seen.contains(level.id.as_str())) {
            return Err(CatalogError::UnorderedLevel {
                id: level.id.clone(),
            });
        }

        for (listed, ids) in &categories {
            for id in ids {
                let level = index
                    .get(id)
                    .and_then(|&idx| levels.get(idx))
                    .ok_or_else(|| CatalogError::UndefinedLevel { id: id.clone() })?;
                if level.category != *listed {
                    return Err(CatalogError::CategoryMismatch {
                        id: id.clone(),
                        listed: *listed,
                        declared: level.category,
                    });
                }
            }
        }

        Ok(Self {
            order,
            categories,
            levels,
            index,
        })
    }

    /// # Errors
    ///
    /// Returns an error if the embedded level data is invalid.
    pub fn load_from_static() -> Result<Self, CatalogError> {
        Self::from_json(DEFAULT_LEVEL_DATA)
    }

    /// Level lookup by id.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownLevel`] when no level has this id.
    pub fn get_level(&self, id: &str) -> Result<&Level, CatalogError> {
        self.index
            .get(id)
            .and_then(|&idx| self.levels.get(idx))
            .ok_or_else(|| CatalogError::UnknownLevel { id: id.to_string() })
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    #[must_use]
    pub fn level_order(&self) -> &[String] {
        &self.order
    }

    #[must_use]
    pub const fn categories(&self) -> &BTreeMap<LevelCategory, Vec<String>> {
        &self.categories
    }

    #[must_use]
    pub fn first_level(&self) -> Option<&str> {
        self.order.first().map(String::as_str)
    }

    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.order.iter().position(|candidate| candidate == id)
    }

    /// Successor of `id` in the progression order; `None` for the last level
    /// or an unknown id.
    #[must_use]
    pub fn next_level(&self, id: &str) -> Option<&str> {
        let pos = self.position(id)?;
        self.order.get(pos + 1).map(String::as_str)
    }

    /// Levels in progression order.
    pub fn levels(&self) -> impl Iterator<Item = &Level> {
        self.order.iter().filter_map(|id| self.get_level(id).ok())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Stable content hash, used to tag reports with the data they ran against.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(&canonical);
        hasher.finish()
    }

    /// Ids of levels whose rules use the given cable.
    #[must_use]
    pub fn levels_using(&self, cable: CableType) -> SmallVec<[&str; 8]> {
        self.levels()
            .filter(|level| level.rules.iter().any(|rule| rule.cable == cable))
            .map(|level| level.id.as_str())
            .collect()
    }
}

/// Shared catalog built from the embedded level data.
#[must_use]
pub fn catalog() -> &'static LevelCatalog {
    static CATALOG: OnceLock<LevelCatalog> = OnceLock::new();
    CATALOG.get_or_init(|| {
        LevelCatalog::load_from_static().unwrap_or_else(|err| {
            log::error!("embedded level catalog rejected: {err}");
            LevelCatalog::default()
        })
    })
}
