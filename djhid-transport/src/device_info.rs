//! Device identity and product matching

use std::fmt;

use serde::Deserialize;

/// Physical bus a HID device is attached through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BusType {
    Usb,
    Bluetooth,
    I2c,
    Spi,
    #[default]
    Unknown,
}

impl From<hidapi::BusType> for BusType {
    fn from(bus: hidapi::BusType) -> Self {
        match bus {
            hidapi::BusType::Usb => BusType::Usb,
            hidapi::BusType::Bluetooth => BusType::Bluetooth,
            hidapi::BusType::I2c => BusType::I2c,
            hidapi::BusType::Spi => BusType::Spi,
            _ => BusType::Unknown,
        }
    }
}

/// Identity of one HID interface as reported by enumeration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Device release number in BCD
    pub release_number: u16,
    pub usage_page: u16,
    pub usage: u16,
    /// USB interface number, `None` when the backend does not know it
    pub interface_number: Option<i32>,
    pub path: String,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub bus_type: BusType,
}

impl From<&hidapi::DeviceInfo> for DeviceInfo {
    fn from(info: &hidapi::DeviceInfo) -> Self {
        let interface_number = info.interface_number();
        Self {
            vendor_id: info.vendor_id(),
            product_id: info.product_id(),
            release_number: info.release_number(),
            usage_page: info.usage_page(),
            usage: info.usage(),
            interface_number: (interface_number >= 0).then_some(interface_number),
            path: info.path().to_string_lossy().into_owned(),
            serial_number: info.serial_number().map(str::to_owned),
            manufacturer: info.manufacturer_string().map(str::to_owned),
            product: info.product_string().map(str::to_owned),
            bus_type: info.bus_type().into(),
        }
    }
}

impl DeviceInfo {
    pub fn format_vid(&self) -> String {
        format!("{:04x}", self.vendor_id)
    }

    pub fn format_pid(&self) -> String {
        format!("{:04x}", self.product_id)
    }

    pub fn format_release(&self) -> String {
        format!("{:x}", self.release_number)
    }

    /// `pppp:uuuu`, empty when both usage page and usage are 0
    pub fn format_usage(&self) -> String {
        if self.usage_page == 0 && self.usage == 0 {
            return String::new();
        }
        format!("{:04x}:{:04x}", self.usage_page, self.usage)
    }

    /// `#N`, empty when the interface number is unknown
    pub fn format_interface(&self) -> String {
        self.interface_number
            .map(|n| format!("#{n}"))
            .unwrap_or_default()
    }

    /// Product name with the last four serial characters and the interface number
    ///
    /// Tells apart several identical controllers attached at the same time.
    pub fn format_name(&self) -> String {
        let product = self.product.as_deref().unwrap_or_default();
        let serial = self.serial_number.as_deref().unwrap_or_default();
        let tail_start = serial
            .char_indices()
            .rev()
            .nth(3)
            .map(|(i, _)| i)
            .unwrap_or(0);
        let mut name = format!("{product} {}", &serial[tail_start..]);
        if let Some(interface) = self.interface_number {
            name.push_str(&format!("_{interface}"));
        }
        name
    }

    pub fn matches(&self, product: &ProductInfo) -> bool {
        product.matches(self)
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = vec![format!(
            "{}:{} r{}",
            self.format_vid(),
            self.format_pid(),
            self.format_release()
        )];
        let usage = self.format_usage();
        if !usage.is_empty() {
            parts.push(format!("Usage: {usage}"));
        }
        if self.interface_number.is_some() {
            parts.push(format!("Interface: {}", self.format_interface()));
        }
        let strings = [
            ("Manufacturer", &self.manufacturer),
            ("Product", &self.product),
            ("S/N", &self.serial_number),
        ];
        for (label, value) in strings {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                parts.push(format!("{label}: {value}"));
            }
        }
        write!(f, "{{ {} }}", parts.join(" | "))
    }
}

/// A product entry of a controller mapping, with hex-string ids
///
/// ```
/// use djhid_transport::{DeviceInfo, ProductInfo};
///
/// let product = ProductInfo {
///     vendor_id: "0x17cc".into(),
///     product_id: "1130".into(),
///     interface_number: Some("0x3".into()),
///     ..Default::default()
/// };
/// let device = DeviceInfo {
///     vendor_id: 0x17cc,
///     product_id: 0x1130,
///     interface_number: Some(3),
///     ..Default::default()
/// };
/// assert!(product.matches(&device));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductInfo {
    pub vendor_id: String,
    pub product_id: String,
    #[serde(default)]
    pub interface_number: Option<String>,
    #[serde(default)]
    pub usage_page: Option<String>,
    #[serde(default)]
    pub usage: Option<String>,
}

/// Parse a hex number with optional `0x` prefix
fn parse_hex(value: &str) -> Option<u32> {
    let value = value.trim();
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u32::from_str_radix(digits, 16).ok()
}

fn field_equals(field: Option<&str>, actual: u32) -> bool {
    field.and_then(parse_hex) == Some(actual)
}

impl ProductInfo {
    /// Vendor and product always have to match; the interface number decides
    /// when the device reports one, usage page and usage otherwise
    pub fn matches(&self, device: &DeviceInfo) -> bool {
        if !field_equals(Some(&self.vendor_id), u32::from(device.vendor_id)) {
            return false;
        }
        if !field_equals(Some(&self.product_id), u32::from(device.product_id)) {
            return false;
        }
        match device.interface_number {
            Some(interface) => match u32::try_from(interface) {
                Ok(interface) => field_equals(self.interface_number.as_deref(), interface),
                Err(_) => false,
            },
            None => {
                field_equals(self.usage_page.as_deref(), u32::from(device.usage_page))
                    && field_equals(self.usage.as_deref(), u32::from(device.usage))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kontrol() -> DeviceInfo {
        DeviceInfo {
            vendor_id: 0x17cc,
            product_id: 0x1130,
            release_number: 0x0102,
            usage_page: 0xff01,
            usage: 0x0001,
            interface_number: Some(3),
            path: "/dev/hidraw4".into(),
            serial_number: Some("8A1C2F3D".into()),
            manufacturer: Some("Native Instruments".into()),
            product: Some("Traktor Kontrol S4".into()),
            bus_type: BusType::Usb,
        }
    }

    #[test]
    fn test_format_helpers() {
        let info = kontrol();
        assert_eq!(info.format_vid(), "17cc");
        assert_eq!(info.format_pid(), "1130");
        assert_eq!(info.format_release(), "102");
        assert_eq!(info.format_usage(), "ff01:0001");
        assert_eq!(info.format_interface(), "#3");
        assert_eq!(info.format_name(), "Traktor Kontrol S4 2F3D_3");
    }

    #[test]
    fn test_format_name_short_serial_without_interface() {
        let info = DeviceInfo {
            serial_number: Some("42".into()),
            interface_number: None,
            ..kontrol()
        };
        assert_eq!(info.format_name(), "Traktor Kontrol S4 42");

        let info = DeviceInfo {
            serial_number: None,
            ..info
        };
        assert_eq!(info.format_name(), "Traktor Kontrol S4 ");
    }

    #[test]
    fn test_empty_usage_and_interface() {
        let info = DeviceInfo::default();
        assert_eq!(info.format_usage(), "");
        assert_eq!(info.format_interface(), "");
    }

    #[test]
    fn test_display() {
        assert_eq!(
            kontrol().to_string(),
            "{ 17cc:1130 r102 | Usage: ff01:0001 | Interface: #3 | \
             Manufacturer: Native Instruments | Product: Traktor Kontrol S4 | S/N: 8A1C2F3D }"
        );
        let bare = DeviceInfo {
            vendor_id: 1,
            product_id: 2,
            ..Default::default()
        };
        assert_eq!(bare.to_string(), "{ 0001:0002 r0 }");
    }

    #[test]
    fn test_match_by_interface() {
        let product = ProductInfo {
            vendor_id: "0x17cc".into(),
            product_id: "0x1130".into(),
            interface_number: Some("3".into()),
            usage_page: Some("0x1".into()),
            usage: Some("0x2".into()),
        };
        // usage is not consulted when the interface number is known
        assert!(product.matches(&kontrol()));

        let other_interface = DeviceInfo {
            interface_number: Some(4),
            ..kontrol()
        };
        assert!(!product.matches(&other_interface));
    }

    #[test]
    fn test_match_by_usage() {
        let device = DeviceInfo {
            interface_number: None,
            ..kontrol()
        };
        let product = ProductInfo {
            vendor_id: "17CC".into(),
            product_id: "1130".into(),
            interface_number: None,
            usage_page: Some("0xff01".into()),
            usage: Some("0x1".into()),
        };
        assert!(product.matches(&device));

        let missing_usage = ProductInfo {
            usage: None,
            ..product.clone()
        };
        assert!(!missing_usage.matches(&device));
    }

    #[test]
    fn test_unparseable_ids_never_match() {
        let product = ProductInfo {
            vendor_id: "Native".into(),
            product_id: "0x1130".into(),
            interface_number: Some("3".into()),
            ..Default::default()
        };
        assert!(!product.matches(&kontrol()));

        let product = ProductInfo {
            vendor_id: "0x17cc".into(),
            product_id: "0x1130".into(),
            interface_number: Some("three".into()),
            ..Default::default()
        };
        assert!(!product.matches(&kontrol()));
    }

    #[test]
    fn test_product_from_json() {
        let product: ProductInfo =
            serde_json::from_str(r#"{ "vendor_id": "0x17cc", "product_id": "0x1130" }"#).unwrap();
        assert_eq!(product.interface_number, None);
        assert!(!product.matches(&kontrol()));
    }
}
