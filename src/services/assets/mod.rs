//! Asset Naming & Storage
//!
//! Deterministic filename generation/parsing, image acquisition (HTTP
//! download or inline base64), and staged persistence into the asset
//! collection.

pub mod acquire;
pub mod naming;
pub mod store;

pub use acquire::{AcquiredImage, ImageFetcher, DOWNLOAD_TIMEOUT_SECS};
pub use naming::{
    extension_for, generate_filename, parse_filename, sanitize_component, slugify_subject,
    FilenameParts, MAX_SLUG_LEN,
};
pub use store::AssetStore;
