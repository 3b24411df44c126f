use std::fmt;

/// Opaque handle to an object owned by the host engine.
///
/// Handles are only meaningful for the host that issued them. Holders that
/// cache a handle must re-resolve through the registry after an identifier is
/// overwritten.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityHandle(pub u32);

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to a tag known by the tag collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TagHandle(pub u16);

/// Identifier namespaces. Each namespace owns one registry table.
///
/// Items, effect presets and enchantments are keyed by integers; status
/// effects, recipes and characters are keyed by strings.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Namespace {
    Item,
    StatusEffect,
    EffectPreset,
    Recipe,
    Enchantment,
    Character,
}

impl Namespace {
    /// Returns true if identifiers in this namespace are integers.
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Item | Self::EffectPreset | Self::Enchantment)
    }

    /// Returns true if `key` has the shape this namespace expects.
    pub fn accepts(self, key: &EntityKey) -> bool {
        matches!(
            (self.is_numeric(), key),
            (true, EntityKey::Id(_)) | (false, EntityKey::Name(_))
        )
    }
}

/// Stable identifier of an entity inside its namespace.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntityKey {
    Id(i32),
    Name(String),
}

impl EntityKey {
    pub fn as_id(&self) -> Option<i32> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Name(_) => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Id(_) => None,
            Self::Name(name) => Some(name),
        }
    }
}

impl From<i32> for EntityKey {
    fn from(id: i32) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for EntityKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for EntityKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}
