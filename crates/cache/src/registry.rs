//! Format name to transform lookup.
//!
//! Formats are registered explicitly at startup. A format name is the exact
//! string that appears at the front of every derivative name it produces, so
//! names are compared case-sensitively here and case-insensitively only when
//! sweeping.

use crate::error::{CacheError, CacheResult};
use crate::transforms;
use image::DynamicImage;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use vignette_core::{DEFAULT_MAX_DIMENSION, DerivativeConfig, TransformArg, TransformRequest};

/// Arguments handed to a transform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransformArgs {
    args: [Option<TransformArg>; 2],
    max_dimension: u32,
}

impl Default for TransformArgs {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl TransformArgs {
    pub fn new(arg1: Option<TransformArg>, arg2: Option<TransformArg>) -> Self {
        Self {
            args: [arg1, arg2],
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }

    pub fn from_request(request: &TransformRequest) -> Self {
        Self::new(request.arg1.clone(), request.arg2.clone())
    }

    /// Cap applied by [`TransformArgs::dimension`].
    pub fn with_max_dimension(mut self, max: u32) -> Self {
        self.max_dimension = max;
        self
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    pub fn get(&self, index: usize) -> Option<&TransformArg> {
        self.args.get(index).and_then(Option::as_ref)
    }

    /// Argument `index` as a positive pixel size no larger than the cap.
    pub fn dimension(&self, index: usize) -> Option<u32> {
        self.get(index)
            .and_then(TransformArg::as_dimension)
            .filter(|v| *v <= self.max_dimension)
    }

    /// First two arguments as `(width, height)`.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        Some((self.dimension(0)?, self.dimension(1)?))
    }
}

/// A pure image transform. Returns `None` to decline.
pub type TransformFn = Arc<dyn Fn(&DynamicImage, &TransformArgs) -> Option<DynamicImage> + Send + Sync>;

/// A transform together with its registration metadata.
#[derive(Clone)]
pub struct RegisteredTransform {
    name: String,
    arity: usize,
    func: TransformFn,
}

impl RegisteredTransform {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of arguments the transform reads.
    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn apply(&self, img: &DynamicImage, args: &TransformArgs) -> Option<DynamicImage> {
        (self.func)(img, args)
    }
}

impl fmt::Debug for RegisteredTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredTransform")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Registry of named transforms.
#[derive(Clone, Debug)]
pub struct TransformRegistry {
    transforms: BTreeMap<String, RegisteredTransform>,
    max_dimension: u32,
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self {
            transforms: BTreeMap::new(),
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

impl TransformRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in format, with fixed sizes taken from `config`.
    pub fn with_builtins(config: &DerivativeConfig) -> Self {
        let mut registry = Self::new();
        registry.max_dimension = config.max_dimension;
        transforms::register_builtins(&mut registry, config);
        registry
    }

    /// Largest width or height handed to a transform.
    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    pub fn set_max_dimension(&mut self, max: u32) -> &mut Self {
        self.max_dimension = max;
        self
    }

    /// Arguments of `request`, capped at this registry's maximum dimension.
    pub fn args_for(&self, request: &TransformRequest) -> TransformArgs {
        TransformArgs::from_request(request).with_max_dimension(self.max_dimension)
    }

    /// Register `func` under `name`, replacing any earlier registration.
    pub fn register<F>(&mut self, name: impl Into<String>, arity: usize, func: F) -> &mut Self
    where
        F: Fn(&DynamicImage, &TransformArgs) -> Option<DynamicImage> + Send + Sync + 'static,
    {
        let name = name.into();
        let previous = self.transforms.insert(
            name.clone(),
            RegisteredTransform {
                name: name.clone(),
                arity: arity.min(2),
                func: Arc::new(func),
            },
        );
        if previous.is_some() {
            tracing::debug!(format = %name, "Replaced registered transform");
        }
        self
    }

    pub fn lookup(&self, name: &str) -> CacheResult<&RegisteredTransform> {
        self.transforms
            .get(name)
            .ok_or_else(|| CacheError::TransformNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    /// Registered format names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.transforms.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredTransform> {
        self.transforms.values()
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_unknown_format_fails() {
        let registry = TransformRegistry::new();
        assert!(matches!(
            registry.lookup("NoSuchFormat"),
            Err(CacheError::TransformNotFound(name)) if name == "NoSuchFormat"
        ));
    }

    #[test]
    fn builtins_are_registered_with_arity() {
        let registry = TransformRegistry::with_builtins(&DerivativeConfig::default());
        let expected = [
            ("AssetLibraryPreview", 0),
            ("AssetLibraryThumbnail", 0),
            ("CMSThumbnail", 0),
            ("CroppedImage", 2),
            ("PaddedImage", 2),
            ("ResizedImage", 2),
            ("SetHeight", 1),
            ("SetRatioSize", 2),
            ("SetSize", 2),
            ("SetWidth", 1),
            ("StripThumbnail", 0),
        ];
        let actual: Vec<_> = registry.iter().map(|t| (t.name(), t.arity())).collect();
        assert_eq!(actual, expected);
        assert!(registry.contains("SetWidth"));
        assert!(!registry.contains("setwidth"));
    }

    #[test]
    fn register_replaces_existing() {
        let mut registry = TransformRegistry::new();
        registry.register("Identity", 0, |img, _| Some(img.clone()));
        registry.register("Identity", 1, |_, _| None);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("Identity").unwrap().arity(), 1);
    }

    #[test]
    fn args_as_dimensions() {
        let args = TransformArgs::new(Some(TransformArg::from(200)), Some(TransformArg::from("x")));
        assert_eq!(args.dimension(0), Some(200));
        assert_eq!(args.dimension(1), None);
        assert_eq!(args.dimensions(), None);

        let args = TransformArgs::new(Some(TransformArg::from("120")), Some(TransformArg::from(80)));
        assert_eq!(args.dimensions(), Some((120, 80)));
    }

    #[test]
    fn dimensions_above_cap_are_rejected() {
        let args = TransformArgs::new(Some(TransformArg::from(4_000_000_000u32)), None);
        assert_eq!(args.dimension(0), None);

        let args = TransformArgs::new(Some(TransformArg::from(500)), Some(TransformArg::from(501)))
            .with_max_dimension(500);
        assert_eq!(args.dimension(0), Some(500));
        assert_eq!(args.dimension(1), None);
    }

    #[test]
    fn registry_caps_request_args() {
        let config = DerivativeConfig {
            max_dimension: 1000,
            ..DerivativeConfig::default()
        };
        let registry = TransformRegistry::with_builtins(&config);
        let args = registry.args_for(&TransformRequest::with_args("SetSize", 1000, 1001));
        assert_eq!(args.max_dimension(), 1000);
        assert_eq!(args.dimensions(), None);
    }
}
