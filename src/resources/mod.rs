//! Resource caching
//!
//! Images, stylesheets and other assets referenced by chapters are
//! downloaded once into memory and written next to the merged book.

mod naming;
mod store;

pub use naming::{base_file_name, NameRegistry};
pub use store::{
    CachedResource, ResourceDownloadError, ResourceLocation, ResourceMap, ResourceStore,
};
