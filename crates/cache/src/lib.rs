//! Lazily generated image derivatives cached in an object store.
//!
//! A derivative is a resized, cropped or padded copy of a source image. It is
//! produced on first request by a named transform, uploaded next to the
//! source under `_resampled/`, and reused while it exists:
//!
//! - [`TransformRegistry`] maps format names to transforms.
//! - [`CacheKeyBuilder`] derives the object key for a request.
//! - [`DerivationEngine`] fetches, transforms, encodes and uploads.
//! - [`DerivedImageCache`] decides between hit, miss and forced refresh.
//! - [`InvalidationSweeper`] removes all derivatives of a source.

pub mod cache;
pub mod codec;
pub mod engine;
pub mod error;
pub mod facade;
pub mod hooks;
pub mod key;
pub mod registry;
pub mod sweeper;
pub mod transforms;

pub use cache::{DerivedImageCache, GetOptions};
pub use engine::{DerivationEngine, Derivative};
pub use error::{CacheError, CacheResult};
pub use facade::FormattedImages;
pub use hooks::{BeforeDeleteHook, SourceLifecycle};
pub use key::{CacheKey, CacheKeyBuilder};
pub use registry::{RegisteredTransform, TransformArgs, TransformFn, TransformRegistry};
pub use sweeper::InvalidationSweeper;
