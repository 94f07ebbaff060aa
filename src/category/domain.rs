//! Core category domain types.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, database_id::CategoryId, owner::OwnerId, transaction::TransactionKind};

/// A validated, non-empty category name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyCategoryName] if `name` is
    /// an empty string.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyCategoryName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CategoryName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CategoryName::new(s)
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The icon identifiers clients know how to render.
///
/// Stored and serialized as the identifier text. Identifiers this version
/// does not recognize fall back to [CategoryIcon::DollarSign] instead of
/// failing the row, so data written by newer clients still renders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum CategoryIcon {
    /// The fallback icon.
    #[default]
    DollarSign,
    /// A briefcase, typically for salary income.
    Briefcase,
    /// Angle brackets, typically for freelance or contract work.
    Code,
    /// An upward chart, typically for investment income.
    TrendingUp,
    /// Cutlery, typically for food and dining.
    Utensils,
    /// A car, typically for transport costs.
    Car,
    /// A house, typically for rent or mortgage payments.
    Home,
    /// A lightning bolt, typically for utilities.
    Zap,
    /// A heart, typically for health costs.
    Heart,
    /// A film reel, typically for entertainment.
    Film,
    /// A shopping bag.
    ShoppingBag,
    /// A graduation cap, typically for education costs.
    GraduationCap,
    /// A smartphone.
    Smartphone,
    /// A laptop.
    Laptop,
    /// A plane, typically for travel.
    Plane,
    /// A coffee cup.
    Coffee,
    /// A gift box.
    Gift,
    /// A musical note.
    Music,
}

impl CategoryIcon {
    /// The identifier as stored and sent over the wire.
    pub fn name(self) -> &'static str {
        match self {
            Self::DollarSign => "DollarSign",
            Self::Briefcase => "Briefcase",
            Self::Code => "Code",
            Self::TrendingUp => "TrendingUp",
            Self::Utensils => "Utensils",
            Self::Car => "Car",
            Self::Home => "Home",
            Self::Zap => "Zap",
            Self::Heart => "Heart",
            Self::Film => "Film",
            Self::ShoppingBag => "ShoppingBag",
            Self::GraduationCap => "GraduationCap",
            Self::Smartphone => "Smartphone",
            Self::Laptop => "Laptop",
            Self::Plane => "Plane",
            Self::Coffee => "Coffee",
            Self::Gift => "Gift",
            Self::Music => "Music",
        }
    }

    /// Look up an icon by its identifier, falling back to the default for
    /// unrecognized identifiers.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Briefcase" => Self::Briefcase,
            "Code" => Self::Code,
            "TrendingUp" => Self::TrendingUp,
            "Utensils" => Self::Utensils,
            "Car" => Self::Car,
            "Home" => Self::Home,
            "Zap" => Self::Zap,
            "Heart" => Self::Heart,
            "Film" => Self::Film,
            "ShoppingBag" => Self::ShoppingBag,
            "GraduationCap" => Self::GraduationCap,
            "Smartphone" => Self::Smartphone,
            "Laptop" => Self::Laptop,
            "Plane" => Self::Plane,
            "Coffee" => Self::Coffee,
            "Gift" => Self::Gift,
            "Music" => Self::Music,
            _ => Self::DollarSign,
        }
    }
}

impl From<String> for CategoryIcon {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl Display for CategoryIcon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A labeled bucket that transactions and recurring rules point at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The owner the category belongs to.
    pub owner_id: OwnerId,
    /// The display name.
    pub name: CategoryName,
    /// Whether the category collects income or expenses.
    pub kind: TransactionKind,
    /// Display color as a hex string, e.g. "#22c55e".
    pub color: String,
    /// The icon clients render next to the name.
    pub icon: CategoryIcon,
    /// True for the starter set seeded on an owner's first access.
    pub is_default: bool,
    /// When the category was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A category that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCategory {
    /// The display name.
    pub name: CategoryName,
    /// Whether the category collects income or expenses.
    pub kind: TransactionKind,
    /// Display color as a hex string.
    pub color: String,
    /// The icon clients render next to the name.
    pub icon: CategoryIcon,
}

/// A partial update to a category. Fields left as `None` keep their stored
/// value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryPatch {
    /// Replacement display name.
    #[serde(default)]
    pub name: Option<CategoryName>,
    /// Replacement kind.
    #[serde(default)]
    pub kind: Option<TransactionKind>,
    /// Replacement color.
    #[serde(default)]
    pub color: Option<String>,
    /// Replacement icon.
    #[serde(default)]
    pub icon: Option<CategoryIcon>,
}
