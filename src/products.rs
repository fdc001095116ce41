// Product list - which HID interfaces belong to supported controllers
// Loaded from a JSON file of `{ "products": [ ... ] }`

use std::path::Path;

use djhid_transport::{DeviceInfo, ProductInfo};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Deserialize)]
struct ProductsFile {
    #[serde(default)]
    products: Vec<ProductInfo>,
}

/// Known controller interfaces
#[derive(Debug, Clone, Default)]
pub struct ProductList {
    products: Vec<ProductInfo>,
}

impl ProductList {
    pub fn new(products: Vec<ProductInfo>) -> Self {
        Self { products }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let list = Self::load_from_json(&content)?;
        info!(
            "Loaded {} product definitions from {}",
            list.products.len(),
            path.display()
        );
        Ok(list)
    }

    pub fn load_from_json(json: &str) -> Result<Self, ConfigError> {
        let file: ProductsFile = serde_json::from_str(json)?;
        Ok(Self::new(file.products))
    }

    pub fn products(&self) -> &[ProductInfo] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// First product definition matching the device
    pub fn find(&self, device: &DeviceInfo) -> Option<&ProductInfo> {
        let found = self.products.iter().find(|p| p.matches(device));
        if found.is_none() {
            debug!("No product definition for {}", device.format_name());
        }
        found
    }

    pub fn is_supported(&self, device: &DeviceInfo) -> bool {
        self.find(device).is_some()
    }
}
