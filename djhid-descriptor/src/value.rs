//! Reading and writing control values inside a report payload

use crate::error::ValueError;
use crate::model::Control;

impl Control {
    fn check_bounds(&self, len: usize) -> Result<(), ValueError> {
        if self.bit_size > 32 {
            return Err(ValueError::UnsupportedWidth(self.bit_size));
        }
        let end_bit = self.bit_offset() + u64::from(self.bit_size);
        let needed = end_bit.div_ceil(8) as usize;
        if needed > len {
            return Err(ValueError::OutOfBounds {
                needed,
                available: len,
            });
        }
        Ok(())
    }

    /// Raw bits of this control, little-endian, without sign handling
    pub fn extract_raw(&self, payload: &[u8]) -> Result<u32, ValueError> {
        self.check_bounds(payload.len())?;
        let start = self.bit_offset();
        let mut value = 0u32;
        for i in 0..u64::from(self.bit_size) {
            let bit = start + i;
            let byte = payload[(bit / 8) as usize];
            if byte >> (bit % 8) & 1 != 0 {
                value |= 1 << i;
            }
        }
        Ok(value)
    }

    /// Value of this control in `payload`
    ///
    /// Sign-extends when the logical range allows negative values.
    pub fn extract(&self, payload: &[u8]) -> Result<i64, ValueError> {
        let raw = self.extract_raw(payload)?;
        if self.logical_minimum < 0 && self.bit_size > 0 && self.bit_size < 32 {
            let shift = 32 - self.bit_size;
            Ok(i64::from(((raw << shift) as i32) >> shift))
        } else if self.logical_minimum < 0 {
            Ok(i64::from(raw as i32))
        } else {
            Ok(i64::from(raw))
        }
    }

    /// Write the low `bit_size` bits of `value`, leaving neighbouring bits untouched
    pub fn insert(&self, payload: &mut [u8], value: i64) -> Result<(), ValueError> {
        self.check_bounds(payload.len())?;
        let start = self.bit_offset();
        for i in 0..u64::from(self.bit_size) {
            let bit = start + i;
            let byte = &mut payload[(bit / 8) as usize];
            let mask = 1u8 << (bit % 8);
            if (value >> i) & 1 != 0 {
                *byte |= mask;
            } else {
                *byte &= !mask;
            }
        }
        Ok(())
    }
}
