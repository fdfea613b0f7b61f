//! Content identifiers (strongly-typed ids).
//!
//! The distribution service hands out plain 32-bit integers for apps, depots
//! and packages. They live in separate namespaces, so we wrap them in a
//! generic `Id<T>` with a phantom marker: an `AppId` can never be passed where
//! a `DepotId` is expected, and the wrapper costs nothing at runtime.
//!
//! On disk every id is a bare JSON number (`#[serde(transparent)]`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// IdMarker はマーカー型ごとの表示用プレフィックスを提供
pub trait IdMarker: Send + Sync + 'static {
    /// Prefix used by `Display` (e.g. "app-").
    fn prefix() -> &'static str;
}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent, bound = "")]
pub struct Id<T: IdMarker> {
    value: u32,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub const fn new(value: u32) -> Self {
        Self {
            value,
            _marker: PhantomData,
        }
    }

    pub const fn get(self) -> u32 {
        self.value
    }
}

impl<T: IdMarker> From<u32> for Id<T> {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.value)
    }
}

// ========================================
// マーカー型の定義
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum App {}

impl IdMarker for App {
    fn prefix() -> &'static str {
        "app-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Depot {}

impl IdMarker for Depot {
    fn prefix() -> &'static str {
        "depot-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Package {}

impl IdMarker for Package {
    fn prefix() -> &'static str {
        "pkg-"
    }
}

/// Identifier of an application (the unit the operator selects).
pub type AppId = Id<App>;

/// Identifier of a depot (a set of files belonging to an app).
pub type DepotId = Id<Depot>;

/// Identifier of a license package.
pub type PackageId = Id<Package>;
