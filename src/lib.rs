//! Embedded Hilbert R-tree spatial index for points of interest.
//!
//! Poidex stores POIs by location and category in a self-balancing,
//! page-oriented R-tree ordered by a Hilbert space-filling curve. Insertion
//! and deletion never split or merge a page in isolation: entries are
//! redistributed across a small window of sibling pages, and a split is
//! deferred until the whole window is full.
//!
//! ```rust
//! use bytes::Bytes;
//! use poidex::{CategoryTaxonomy, MultiTreeIndex, Poi, PoiIndex};
//!
//! let taxonomy = CategoryTaxonomy::from_categories([
//!     ("root".to_string(), None),
//!     ("shop".to_string(), Some("root".to_string())),
//!     ("shop=bakery".to_string(), Some("shop".to_string())),
//! ])?;
//! let mut index = MultiTreeIndex::new(taxonomy);
//!
//! index.insert_poi(Poi::new(1, 13.4050, 52.5200, "shop=bakery", Bytes::from("Zeit für Brot")))?;
//!
//! let rect = geo::Rect::new(
//!     geo::coord! { x: 13.0, y: 52.0 },
//!     geo::coord! { x: 14.0, y: 53.0 },
//! );
//! // The bakery is visible under its ancestor category.
//! assert_eq!(index.find_in_rect(&rect, "shop", 0).len(), 1);
//! # Ok::<(), poidex::PoidexError>(())
//! ```

pub mod category;
pub mod config;
pub mod db;
pub mod error;
pub mod hilbert;
pub mod rtree;
pub mod shape;

pub use category::CategoryTaxonomy;
pub use config::Config;
pub use db::{MultiTreeIndex, Poi, PoiIndex, PoiIndexStats, VolumeIndex};
pub use error::{PoidexError, Result};
pub use rtree::{IndexStats, SpatialIndex};
pub use shape::{Box3, Rect, SpatialShape};

#[cfg(feature = "sync")]
pub use db::SyncPoiIndex;

pub use geo::{Point, Rect as GeoRect};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{CategoryTaxonomy, Config, PoidexError, Result};

    pub use crate::{MultiTreeIndex, Poi, PoiIndex, VolumeIndex};

    pub use crate::{Box3, Rect, SpatialIndex, SpatialShape};

    #[cfg(feature = "sync")]
    pub use crate::SyncPoiIndex;

    pub use geo::Point;
}
